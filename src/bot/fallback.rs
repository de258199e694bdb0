//! Deterministic replies used when the completion service fails or returns
//! nothing usable, plus every fixed canned notice the bot sends. No network
//! calls anywhere in this module; every function is total.

use crate::bot::lang::Lang;
use crate::bot::topic::TopicEntry;

/// Equipment classes the responder can diagnose without the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equipment {
    SawBlade,
    Motor,
    Bearing,
    Drive,
    Compressor,
}

/// Millimeters per inch.
const MM_PER_INCH: f64 = 25.4;

impl Equipment {
    /// Bilingual keywords. Entries shorter than four chars only match whole
    /// tokens ("اره" is a substring of unrelated words like "دوباره").
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Equipment::SawBlade => &["تیغه", "اره", "blade", "saw"],
            Equipment::Motor => &["الکتروموتور", "موتور", "motor"],
            Equipment::Bearing => &["بلبرینگ", "یاتاقان", "bearing"],
            Equipment::Drive => &["اینورتر", "درایو", "inverter", "drive", "vfd"],
            Equipment::Compressor => &["کمپرسور", "compressor"],
        }
    }

    /// Smallest dimension that is plausible for this class, if the class has
    /// a meaningful length dimension at all. Industrial circular saw blades
    /// start around 200 mm.
    pub fn min_plausible_mm(&self) -> Option<i64> {
        match self {
            Equipment::SawBlade => Some(200),
            _ => None,
        }
    }

    pub fn label(&self, lang: Lang) -> &'static str {
        match (self, lang) {
            (Equipment::SawBlade, Lang::Fa) => "تیغه اره",
            (Equipment::SawBlade, Lang::En) => "saw blade",
            (Equipment::Motor, Lang::Fa) => "الکتروموتور",
            (Equipment::Motor, Lang::En) => "electric motor",
            (Equipment::Bearing, Lang::Fa) => "بلبرینگ",
            (Equipment::Bearing, Lang::En) => "bearing",
            (Equipment::Drive, Lang::Fa) => "اینورتر",
            (Equipment::Drive, Lang::En) => "variable-frequency drive",
            (Equipment::Compressor, Lang::Fa) => "کمپرسور",
            (Equipment::Compressor, Lang::En) => "compressor",
        }
    }

    fn causes(&self, lang: Lang) -> &'static [&'static str] {
        match (self, lang) {
            (Equipment::SawBlade, Lang::Fa) => &[
                "کند یا آسیب‌دیده بودن دندانه‌ها",
                "بالا بودن نرخ پیشروی برای جنس قطعه",
                "ناهم‌راستایی تیغه یا انتخاب تیغه نامناسب",
            ],
            (Equipment::SawBlade, Lang::En) => &[
                "dull or damaged teeth",
                "feed rate too high for the material",
                "blade misalignment or the wrong blade for the stock",
            ],
            (Equipment::Motor, Lang::Fa) => &[
                "اضافه‌بار یا گیر کردن بار",
                "عدم تعادل یا افت ولتاژ تغذیه",
                "گرفتگی مسیر خنک‌کاری یا خرابی بلبرینگ",
            ],
            (Equipment::Motor, Lang::En) => &[
                "overload or a jammed load",
                "supply voltage imbalance or undervoltage",
                "blocked ventilation or failing bearings",
            ],
            (Equipment::Bearing, Lang::Fa) => &[
                "کمبود یا کهنگی گریس",
                "ناهم‌محوری یا بار بیش از حد",
                "ورود آلودگی به داخل رینگ",
            ],
            (Equipment::Bearing, Lang::En) => &[
                "insufficient or aged lubrication",
                "misalignment or excessive load",
                "contamination inside the race",
            ],
            (Equipment::Drive, Lang::Fa) => &[
                "کوچک بودن درایو نسبت به بار موتور",
                "داغ شدن به‌خاطر گرفتگی هیت‌سینک",
                "تنظیم نادرست پارامترها برای کاربرد",
            ],
            (Equipment::Drive, Lang::En) => &[
                "undersized drive for the motor load",
                "overheating from a blocked heatsink",
                "wrong parameter set for the application",
            ],
            (Equipment::Compressor, Lang::Fa) => &[
                "نشتی هوا در سمت فشار",
                "فرسودگی رینگ پیستون یا سوپاپ‌ها",
                "گرفتگی فیلتر هوای ورودی",
            ],
            (Equipment::Compressor, Lang::En) => &[
                "air leaks on the pressure side",
                "worn piston rings or valves",
                "clogged intake filter",
            ],
        }
    }

    fn checks(&self, lang: Lang) -> &'static [&'static str] {
        match (self, lang) {
            (Equipment::SawBlade, Lang::Fa) => &[
                "دندانه‌ها را از نظر سایش، لب‌پریدگی و رسوب بررسی کن",
                "لنگی محور و سفت بودن فلنج را کنترل کن",
                "قطر و تعداد دندانه تیغه را با مشخصات دستگاه مقایسه کن",
                "دور اسپیندل را با دور مجاز تیغه مقایسه کن",
                "روی ضایعات با پیشروی کمتر برش آزمایشی بزن",
            ],
            (Equipment::SawBlade, Lang::En) => &[
                "inspect teeth for wear, chipping and pitch build-up",
                "check arbor runout and flange tightness",
                "compare blade diameter and tooth count with the machine rating",
                "compare spindle RPM with the blade's rated speed",
                "test-cut on scrap at a lower feed rate",
            ],
            (Equipment::Motor, Lang::Fa) => &[
                "جریان خط را با جریان نامی پلاک مقایسه کن",
                "ولتاژ هر سه فاز را در ترمینال اندازه بگیر",
                "مسیر تهویه و فن خنک‌کننده را تمیز کن",
                "در حالت بی‌باری به صدای بلبرینگ گوش کن",
                "مقاومت عایقی سیم‌پیچ را اندازه بگیر",
            ],
            (Equipment::Motor, Lang::En) => &[
                "measure line current against the nameplate rating",
                "check terminal voltage on every phase",
                "clear the vents and check the cooling fan",
                "listen for bearing noise at no load",
                "measure the winding insulation resistance",
            ],
            (Equipment::Bearing, Lang::Fa) => &[
                "با چرخاندن دستی، لقی و زبری را حس کن",
                "گریس را از نظر ذرات فلزی بررسی کن",
                "هم‌محوری شفت و هوزینگ را کنترل کن",
                "دمای کارکرد را بعد از پانزده دقیقه اندازه بگیر",
            ],
            (Equipment::Bearing, Lang::En) => &[
                "feel for play and roughness by rotating it by hand",
                "inspect the grease for metal particles",
                "check shaft and housing alignment",
                "measure the running temperature after fifteen minutes",
            ],
            (Equipment::Drive, Lang::Fa) => &[
                "کد خطای دقیق را بخوان و یادداشت کن",
                "هیت‌سینک و فن را از گرد و غبار تمیز کن",
                "مشخصات پلاک موتور را با پارامترهای درایو تطبیق بده",
                "پایداری ولتاژ ورودی را کنترل کن",
                "کابل خروجی و عایق موتور را بازرسی کن",
            ],
            (Equipment::Drive, Lang::En) => &[
                "read and note the exact fault code",
                "clean dust off the heatsink and fan",
                "verify the motor nameplate data in the drive parameters",
                "check the input voltage stability",
                "inspect the output cable and motor insulation",
            ],
            (Equipment::Compressor, Lang::Fa) => &[
                "زمان پر شدن مخزن از حالت خالی را اندازه بگیر",
                "با مخزن پر، صدای نشتی اتصالات را بررسی کن",
                "فیلتر ورودی را بازرسی و در صورت کثیفی تعویض کن",
                "سطح و وضعیت روغن را کنترل کن",
                "تنظیم قطع و وصل پرشر سوییچ را بررسی کن",
            ],
            (Equipment::Compressor, Lang::En) => &[
                "time how long the tank takes to fill from empty",
                "listen for leaks at the fittings with the tank full",
                "inspect the intake filter and replace it if dirty",
                "check the oil level and condition",
                "verify the pressure switch cut-in and cut-out settings",
            ],
        }
    }

    fn next_action(&self, lang: Lang) -> &'static str {
        match (self, lang) {
            (Equipment::SawBlade, Lang::Fa) => "تیغه را تمیز کن و با پیشروی کمتر یک برش آزمایشی بزن",
            (Equipment::SawBlade, Lang::En) => "clean the blade and re-run a test cut at reduced feed",
            (Equipment::Motor, Lang::Fa) => "موتور را جدا از بار روشن کن و جریان بی‌باری را مقایسه کن",
            (Equipment::Motor, Lang::En) => "run the motor uncoupled and compare the no-load current",
            (Equipment::Bearing, Lang::Fa) => "با گریس مشخص‌شده دوباره گریس‌کاری و تست کن",
            (Equipment::Bearing, Lang::En) => "re-grease with the specified lubricant and re-test",
            (Equipment::Drive, Lang::Fa) => "درایو را ریست کن و ببین اول کدام کد خطا برمی‌گردد",
            (Equipment::Drive, Lang::En) => "reset the drive and watch which fault code returns first",
            (Equipment::Compressor, Lang::Fa) => "اتصالات و شیر یک‌طرفه را با کف صابون نشت‌یابی کن",
            (Equipment::Compressor, Lang::En) => "soap-test the fittings and the check valve for leaks",
        }
    }

    fn follow_up(&self, lang: Lang) -> &'static str {
        match (self, lang) {
            (Equipment::SawBlade, Lang::Fa) => "چه جنسی را با چه نرخ پیشروی برش می‌زنی؟",
            (Equipment::SawBlade, Lang::En) => "What material are you cutting, and at what feed rate?",
            (Equipment::Motor, Lang::Fa) => "موتور بلافاصله قطع می‌کند یا فقط زیر بار؟",
            (Equipment::Motor, Lang::En) => "Does the motor trip immediately, or only under load?",
            (Equipment::Bearing, Lang::Fa) => "صدا یکنواخت است یا تیک‌تیک متناوب؟",
            (Equipment::Bearing, Lang::En) => "Is the noise a steady hum or a periodic clicking?",
            (Equipment::Drive, Lang::Fa) => "درایو دقیقاً چه کد خطایی نشان می‌دهد؟",
            (Equipment::Drive, Lang::En) => "Which fault code does the drive display?",
            (Equipment::Compressor, Lang::Fa) => "وقتی کمپرسور خاموش است، فشار مخزن افت می‌کند؟",
            (Equipment::Compressor, Lang::En) => "Does the tank lose pressure while the compressor is off?",
        }
    }
}

/// A dimension parsed out of the user's text, normalized to millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub mm: i64,
    /// Set when the magnitude is implausible for the recognized class,
    /// which usually means the unit was entered wrong.
    pub low_confidence: bool,
}

/// First equipment class whose keywords appear in the text.
pub fn recognize_equipment(text: &str) -> Option<Equipment> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation() || "،؟؛".contains(c)))
        .collect();

    const CLASSES: [Equipment; 5] = [
        Equipment::SawBlade,
        Equipment::Motor,
        Equipment::Bearing,
        Equipment::Drive,
        Equipment::Compressor,
    ];

    CLASSES.into_iter().find(|class| {
        class.keywords().iter().any(|kw| {
            if kw.chars().count() < 4 {
                tokens.iter().any(|t| t == kw)
            } else {
                lowered.contains(kw)
            }
        })
    })
}

fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            _ => c,
        })
        .collect()
}

/// Best-effort scan for the first number carrying a recognized length unit.
/// Inches convert at 25.4 mm, centimeters at 10 mm; Persian digits are
/// normalized first. Bare numbers without a unit are skipped.
pub fn parse_measurement_mm(text: &str) -> Option<i64> {
    // Longest spellings first so "سانتی‌متر" wins over its prefix "سانت".
    const UNITS: &[(&str, f64)] = &[
        ("میلی\u{200c}متر", 1.0),
        ("میلیمتر", 1.0),
        ("mm", 1.0),
        ("سانتی\u{200c}متر", 10.0),
        ("سانتیمتر", 10.0),
        ("سانت", 10.0),
        ("cm", 10.0),
        ("اینچ", MM_PER_INCH),
        ("inch", MM_PER_INCH),
        ("\"", MM_PER_INCH),
        ("″", MM_PER_INCH),
    ];

    let norm = normalize_digits(text).to_lowercase();
    let s = norm.as_str();
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        let Some(first) = rest.chars().next() else {
            break;
        };
        if !first.is_ascii_digit() {
            i += first.len_utf8();
            continue;
        }
        let num_len = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .map(char::len_utf8)
            .sum::<usize>();
        let (number, tail) = rest.split_at(num_len);
        if let Ok(value) = number.trim_end_matches('.').parse::<f64>() {
            let tail = tail.trim_start();
            for (unit, factor) in UNITS {
                if tail.starts_with(unit) {
                    return Some((value * factor).round() as i64);
                }
            }
        }
        i += num_len;
    }
    None
}

/// Parse a dimension and judge its plausibility for the recognized class.
pub fn measure(text: &str, subject: Equipment) -> Option<Measurement> {
    let mm = parse_measurement_mm(text)?;
    let low_confidence = subject.min_plausible_mm().is_some_and(|min| mm < min);
    Some(Measurement { mm, low_confidence })
}

/// Deterministic reply for `text`: continuation of a remembered topic, a
/// class-specific diagnostic, or the generic structured fallback. Always
/// non-empty, never errors.
pub fn respond(text: &str, lang: Lang, remembered: Option<&TopicEntry>) -> String {
    let subject = recognize_equipment(text);
    if let Some(entry) = remembered {
        // A message that names new equipment is not a continuation.
        if subject.is_none() && is_continuation(text) {
            return continuation_reply(entry, lang);
        }
    }
    if let Some(subject) = subject {
        return equipment_reply(subject, measure(text, subject), lang);
    }
    generic_reply(lang)
}

/// Low-information phrases that only make sense as "more of the same".
fn is_continuation(text: &str) -> bool {
    const PHRASES: &[&str] = &[
        "سوال دیگ",
        "سؤال دیگ",
        "یه سوال",
        "بعدش",
        "ادامه",
        "دیگه چی",
        "خب بعد",
        "another question",
        "one more question",
        "and then",
        "what next",
        "what else",
        "follow up",
        "next question",
    ];
    let lowered = text.trim().to_lowercase();
    lowered.chars().count() <= 60 && PHRASES.iter().any(|p| lowered.contains(p))
}

fn continuation_reply(entry: &TopicEntry, lang: Lang) -> String {
    let label = entry.subject.label(lang);
    let summary = match (lang, entry.dimension_mm) {
        (Lang::Fa, Some(mm)) => format!(
            "در ادامهٔ موضوع قبلی ({label}، حدود {mm} میلی‌متر) جمع‌بندی زیر را ببین."
        ),
        (Lang::Fa, None) => format!("در ادامهٔ موضوع قبلی ({label}) جمع‌بندی زیر را ببین."),
        (Lang::En, Some(mm)) => {
            format!("Picking up your earlier topic ({label}, about {mm} mm), here is where to go next.")
        }
        (Lang::En, None) => {
            format!("Picking up your earlier topic ({label}), here is where to go next.")
        }
    };
    let question = match lang {
        Lang::Fa => "دقیقاً کدام مرحله به نتیجه نرسید؟",
        Lang::En => "Which step exactly did not work out?",
    };
    render(
        lang,
        &summary,
        None,
        entry.subject.causes(lang),
        entry.subject.checks(lang),
        entry.subject.next_action(lang),
        question,
    )
}

fn equipment_reply(subject: Equipment, measurement: Option<Measurement>, lang: Lang) -> String {
    let label = subject.label(lang);
    let summary = match (lang, measurement) {
        (Lang::Fa, Some(m)) => {
            format!("برای {label} با اندازهٔ حدود {} میلی‌متر، از مسیر زیر شروع کن.", m.mm)
        }
        (Lang::Fa, None) => format!("برای عیب‌یابی {label}، از مسیر زیر شروع کن."),
        (Lang::En, Some(m)) => {
            format!("For a {label} around {} mm, start with the path below.", m.mm)
        }
        (Lang::En, None) => format!("To troubleshoot the {label}, start with the path below."),
    };
    let caveat = measurement.filter(|m| m.low_confidence).map(|m| match lang {
        Lang::Fa => format!(
            "⚠️ مقدار {} میلی‌متر برای {label} غیرمعمول است؛ احتمالاً واحد اشتباه وارد شده.",
            m.mm
        ),
        Lang::En => format!(
            "⚠️ {} mm is unusual for a {label}; the unit was probably entered wrong.",
            m.mm
        ),
    });
    render(
        lang,
        &summary,
        caveat.as_deref(),
        subject.causes(lang),
        subject.checks(lang),
        subject.next_action(lang),
        subject.follow_up(lang),
    )
}

fn generic_reply(lang: Lang) -> String {
    match lang {
        Lang::Fa => render(
            lang,
            "اطلاعات هنوز برای تشخیص دقیق کافی نیست؛ از جمع‌بندی کلی زیر شروع کن.",
            None,
            &[
                "مشکل تغذیه یا برق دستگاه",
                "سایش یا لقی مکانیکی",
                "تنظیمات یا پارامترهای نادرست",
            ],
            &[
                "برق ورودی و فیوزها را کنترل کن",
                "اتصالات شل و کابل‌ها را بازرسی کن",
                "روانکاری قطعات متحرک را بررسی کن",
                "کدهای خطا یا چراغ‌های هشدار را یادداشت کن",
            ],
            "دستگاه را در حالت بی‌باری تست کن و علائم را ثبت کن",
            "دستگاه دقیقاً چه مدلی است و چه علائمی دارد؟",
        ),
        Lang::En => render(
            lang,
            "There is not enough detail for a precise diagnosis yet; start from this general path.",
            None,
            &[
                "power supply problems",
                "mechanical wear or play",
                "incorrect settings or parameters",
            ],
            &[
                "check the incoming power and fuses",
                "inspect for loose connections and damaged cables",
                "check lubrication of the moving parts",
                "note any error codes or warning lights",
            ],
            "test the machine unloaded and write down the symptoms",
            "What is the exact machine model, and what are the symptoms?",
        ),
    }
}

fn render(
    lang: Lang,
    summary: &str,
    caveat: Option<&str>,
    causes: &[&str],
    checks: &[&str],
    action: &str,
    question: &str,
) -> String {
    let (summary_h, causes_h, checks_h, action_h, question_h) = match lang {
        Lang::Fa => ("خلاصه:", "علت‌های محتمل:", "بررسی‌ها:", "اقدام بعدی:", "سؤال:"),
        Lang::En => ("Summary:", "Likely causes:", "Checks:", "Next step:", "Question:"),
    };

    let mut out = format!("{summary_h} {summary}\n");
    if let Some(caveat) = caveat {
        out.push_str(caveat);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(causes_h);
    out.push('\n');
    for cause in causes {
        out.push_str("- ");
        out.push_str(cause);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(checks_h);
    out.push('\n');
    for check in checks {
        out.push_str("- ");
        out.push_str(check);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(action_h);
    out.push(' ');
    out.push_str(action);
    out.push('\n');
    out.push_str(question_h);
    out.push(' ');
    out.push_str(question);
    out
}

// ── Fixed canned notices ───────────────────────────────────────────────────

pub fn welcome() -> &'static str {
    "👋 سلام! دستیار فنی صنعتی هستم.\n\
     سوال فنی‌ات را بنویس یا ویس بفرست؛ عکس قطعه را هم می‌توانم بررسی کنم.\n\n\
     Hi! I'm an industrial technical assistant. Send text, a voice note, \
     or a photo of the part."
}

pub fn unsupported_notice(lang: Lang) -> &'static str {
    match lang {
        Lang::Fa => "این نوع پیام پشتیبانی نمی‌شود. لطفاً متن، ویس یا عکس بفرست.",
        Lang::En => "Unsupported message type. Please send text, a voice note, or a photo.",
    }
}

pub fn audio_failure_notice(lang: Lang) -> &'static str {
    match lang {
        Lang::Fa => "نتوانستم فایل صوتی را پردازش کنم. لطفاً دوباره بفرست یا سوال را بنویس.",
        Lang::En => "Couldn't process that audio. Please try again, or type your question.",
    }
}

pub fn image_failure_notice(lang: Lang) -> &'static str {
    match lang {
        Lang::Fa => "نتوانستم تصویر را بررسی کنم. لطفاً دوباره بفرست یا مشکل را بنویس.",
        Lang::En => "Couldn't analyze that image. Please resend it, or describe the problem.",
    }
}
