use serde::Deserialize;

/// One update as delivered by the Telegram webhook. Only the fields this
/// service acts on are modeled; everything else is ignored on decode.
#[derive(Debug, Deserialize)]
pub struct WebhookUpdate {
    #[serde(default)]
    pub update_id: i64,
    pub message: Option<WireMessage>,
    pub edited_message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub chat: WireChat,
    pub text: Option<String>,
    pub voice: Option<WireFile>,
    pub audio: Option<WireFile>,
    /// Size-ordered, smallest first.
    pub photo: Option<Vec<PhotoVariant>>,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct WireFile {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoVariant {
    pub file_id: String,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

/// A normalized inbound event: one chat, exactly one kind. Created once from
/// the wire shape and consumed once by the router.
#[derive(Debug)]
pub struct InboundUpdate {
    pub chat_id: i64,
    pub kind: UpdateKind,
}

#[derive(Debug)]
pub enum UpdateKind {
    Command(String),
    Text(String),
    Voice(String),
    Audio(String),
    Photo {
        variants: Vec<PhotoVariant>,
        caption: Option<String>,
    },
    /// Document, sticker, location: anything this service does not handle.
    Other,
}

impl WebhookUpdate {
    /// Normalize a webhook body into an `InboundUpdate`. `None` means the
    /// body carried no message at all (the webhook still answers "ok").
    pub fn into_inbound(self) -> Option<InboundUpdate> {
        let msg = self.message.or(self.edited_message)?;
        let chat_id = msg.chat.id;

        // Kind priority: command > voice > audio > photo > text > other.
        let kind = if let Some(text) = msg.text.as_deref().filter(|t| t.starts_with('/')) {
            UpdateKind::Command(text.to_string())
        } else if let Some(voice) = msg.voice {
            UpdateKind::Voice(voice.file_id)
        } else if let Some(audio) = msg.audio {
            UpdateKind::Audio(audio.file_id)
        } else if let Some(variants) = msg.photo.filter(|p| !p.is_empty()) {
            UpdateKind::Photo {
                variants,
                caption: msg.caption,
            }
        } else if let Some(text) = msg.text {
            UpdateKind::Text(text)
        } else {
            UpdateKind::Other
        };

        Some(InboundUpdate { chat_id, kind })
    }
}
