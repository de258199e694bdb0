/// Reply language, picked per message by character-set inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// Persian, the primary audience; also the default when a message
    /// carries no text to inspect.
    Fa,
    En,
}

impl Lang {
    /// One-line hint appended to the persona instructions so the model
    /// answers in the user's language.
    pub fn reply_hint(&self) -> &'static str {
        match self {
            Lang::Fa => "پاسخ را به فارسی بنویس.",
            Lang::En => "Reply in English.",
        }
    }
}

/// Classify text by script: any Arabic-script code point means Persian.
pub fn detect(text: &str) -> Lang {
    if text.chars().any(is_arabic_script) {
        Lang::Fa
    } else {
        Lang::En
    }
}

// Base block plus the presentation-form blocks Telegram clients sometimes emit.
fn is_arabic_script(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}' | '\u{FB50}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persian_text_is_fa() {
        assert_eq!(detect("تیغه اره برش نمی‌دهد"), Lang::Fa);
    }

    #[test]
    fn single_persian_char_among_ascii_is_fa() {
        assert_eq!(detect("motor م"), Lang::Fa);
    }

    #[test]
    fn ascii_text_is_en() {
        assert_eq!(detect("the motor keeps tripping"), Lang::En);
    }

    #[test]
    fn empty_text_is_en() {
        assert_eq!(detect(""), Lang::En);
    }

    #[test]
    fn detection_is_deterministic() {
        let text = "بلبرینگ ۶۲۰۵";
        assert_eq!(detect(text), detect(text));
    }
}
