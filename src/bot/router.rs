use std::sync::Arc;

use tracing::{error, info, warn};

use crate::ai::CompletionService;
use crate::bot::fallback;
use crate::bot::gateway::MessagingGateway;
use crate::bot::lang::{self, Lang};
use crate::bot::media::MediaPreprocessor;
use crate::bot::topic::TopicMemory;
use crate::bot::update::{InboundUpdate, UpdateKind};

/// Top-level per-update decision logic. Every recognized update ends in
/// exactly one outbound reply to the originating chat; nothing is retried
/// and nothing loops back.
pub struct UpdateRouter {
    gateway: Arc<dyn MessagingGateway>,
    ai: Arc<dyn CompletionService>,
    media: MediaPreprocessor,
    topics: TopicMemory,
    persona: String,
    max_output_tokens: u32,
}

impl UpdateRouter {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        ai: Arc<dyn CompletionService>,
        topics: TopicMemory,
        persona: String,
        max_output_tokens: u32,
    ) -> Self {
        let media = MediaPreprocessor::new(Arc::clone(&gateway), Arc::clone(&ai));
        Self {
            gateway,
            ai,
            media,
            topics,
            persona,
            max_output_tokens,
        }
    }

    /// Handle one update to completion. Never errors: every failure mode is
    /// converted into a user-facing reply or logged, so the webhook can
    /// always acknowledge with "ok".
    pub async fn handle(&self, update: InboundUpdate) {
        let chat_id = update.chat_id;

        let reply = match update.kind {
            UpdateKind::Command(cmd) => {
                info!(chat_id, %cmd, "command");
                fallback::welcome().to_string()
            }

            UpdateKind::Voice(file_id) | UpdateKind::Audio(file_id) => {
                self.gateway.send_typing(chat_id).await.ok();
                match self.media.transcribe(&file_id).await {
                    Ok(text) if !text.is_empty() => {
                        info!(chat_id, "voice transcribed: {text}");
                        self.respond_to_text(chat_id, &text).await
                    }
                    Ok(_) => fallback::audio_failure_notice(Lang::Fa).to_string(),
                    Err(err) => {
                        warn!(chat_id, "could not transcribe: {err:#}");
                        fallback::audio_failure_notice(Lang::Fa).to_string()
                    }
                }
            }

            UpdateKind::Photo { variants, caption } => {
                self.gateway.send_typing(chat_id).await.ok();
                let lang = caption.as_deref().map(lang::detect).unwrap_or(Lang::Fa);
                // Ties keep the later entry, so an ordered list yields its last.
                match variants
                    .iter()
                    .max_by_key(|v| i64::from(v.width) * i64::from(v.height))
                {
                    Some(best) => match self.gateway.file_url(&best.file_id).await {
                        Ok(url) => self.media.describe_image(&self.persona, &url, lang).await,
                        Err(err) => {
                            warn!(chat_id, "photo url lookup failed: {err:#}");
                            fallback::image_failure_notice(lang).to_string()
                        }
                    },
                    None => fallback::image_failure_notice(lang).to_string(),
                }
            }

            UpdateKind::Text(text) => self.respond_to_text(chat_id, &text).await,

            UpdateKind::Other => fallback::unsupported_notice(Lang::Fa).to_string(),
        };

        if let Err(err) = self.gateway.send_message(chat_id, &reply).await {
            error!(chat_id, "delivery failed: {err:#}");
        }
    }

    /// Shared tail of the text, voice and audio paths: upstream completion
    /// first, deterministic fallback on empty/error, then a best-effort
    /// topic-memory note when the input names known equipment.
    async fn respond_to_text(&self, chat_id: i64, text: &str) -> String {
        let detected = lang::detect(text);
        let instructions = format!("{}\n\n{}", self.persona, detected.reply_hint());

        self.gateway.send_typing(chat_id).await.ok();

        let reply = match self
            .ai
            .complete(&instructions, text, self.max_output_tokens)
            .await
        {
            Ok(answer) => answer,
            Err(err) => {
                warn!(chat_id, "completion unusable, using fallback: {err}");
                let remembered = self.topics.recall(chat_id);
                fallback::respond(text, detected, remembered.as_ref())
            }
        };

        if let Some(subject) = fallback::recognize_equipment(text) {
            let dimension = fallback::measure(text, subject).map(|m| m.mm);
            self.topics.remember(chat_id, subject, dimension);
        }

        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::ai::CompletionError;
    use crate::bot::update::PhotoVariant;

    /// Gateway stub that records every logical send.
    struct RecordingGateway {
        sent: Mutex<Vec<(i64, String)>>,
        fail_downloads: bool,
    }

    impl RecordingGateway {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_downloads: false,
            }
        }

        fn failing_downloads() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_downloads: true,
            }
        }

        fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingGateway for RecordingGateway {
        async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }

        async fn send_typing(&self, _chat_id: i64) -> Result<()> {
            Ok(())
        }

        async fn file_url(&self, file_id: &str) -> Result<String> {
            Ok(format!("https://files.test/{file_id}"))
        }

        async fn download_to(&self, _file_id: &str, dest: &Path) -> Result<()> {
            if self.fail_downloads {
                anyhow::bail!("download refused");
            }
            std::fs::write(dest, b"OggS")?;
            Ok(())
        }

        async fn register_webhook(&self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn unregister_webhook(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Scripted completion service outcomes.
    #[derive(Clone, Copy)]
    enum Script {
        Reply(&'static str),
        Empty,
        Timeout,
    }

    impl Script {
        fn run(self) -> Result<String, CompletionError> {
            match self {
                Script::Reply(text) => Ok(text.to_string()),
                Script::Empty => Err(CompletionError::Empty),
                Script::Timeout => Err(CompletionError::Upstream("timed out".into())),
            }
        }
    }

    struct StubAi {
        complete: Script,
        transcribe: Script,
        describe: Script,
        described_urls: Mutex<Vec<String>>,
    }

    impl StubAi {
        fn healthy(reply: &'static str) -> Self {
            Self {
                complete: Script::Reply(reply),
                transcribe: Script::Reply("transcript"),
                describe: Script::Reply("a described image"),
                described_urls: Mutex::new(Vec::new()),
            }
        }

        fn broken() -> Self {
            Self {
                complete: Script::Timeout,
                transcribe: Script::Timeout,
                describe: Script::Timeout,
                described_urls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionService for StubAi {
        async fn complete(
            &self,
            _instructions: &str,
            _input: &str,
            _max_output_tokens: u32,
        ) -> Result<String, CompletionError> {
            self.complete.run()
        }

        async fn transcribe(
            &self,
            _audio: Vec<u8>,
            _file_name: &str,
        ) -> Result<String, CompletionError> {
            self.transcribe.run()
        }

        async fn describe_image(
            &self,
            _instructions: &str,
            _prompt: &str,
            image_url: &str,
        ) -> Result<String, CompletionError> {
            self.described_urls.lock().unwrap().push(image_url.to_string());
            self.describe.run()
        }
    }

    fn router(gateway: Arc<RecordingGateway>, ai: Arc<StubAi>) -> UpdateRouter {
        UpdateRouter::new(
            gateway,
            ai,
            TopicMemory::new(16),
            "test persona".to_string(),
            800,
        )
    }

    fn update(chat_id: i64, kind: UpdateKind) -> InboundUpdate {
        InboundUpdate { chat_id, kind }
    }

    #[tokio::test]
    async fn healthy_text_relays_the_model_reply() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi::healthy("Hi there"));
        let r = router(Arc::clone(&gateway), ai);

        r.handle(update(42, UpdateKind::Text("hello".into()))).await;

        assert_eq!(gateway.sent(), vec![(42, "Hi there".to_string())]);
    }

    #[tokio::test]
    async fn upstream_timeout_yields_a_fallback_reply() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi::broken());
        let r = router(Arc::clone(&gateway), ai);

        r.handle(update(7, UpdateKind::Text("دستگاه روشن نمی‌شود".into())))
            .await;

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 7);
        assert!(!sent[0].1.is_empty());
        assert!(sent[0].1.contains('؟'));
    }

    #[tokio::test]
    async fn empty_completion_also_falls_back() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi {
            complete: Script::Empty,
            transcribe: Script::Empty,
            describe: Script::Empty,
            described_urls: Mutex::new(Vec::new()),
        });
        let r = router(Arc::clone(&gateway), ai);

        r.handle(update(7, UpdateKind::Text("help".into()))).await;

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains('?'));
    }

    #[tokio::test]
    async fn unsupported_update_gets_the_fixed_notice() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi::healthy("unused"));
        let r = router(Arc::clone(&gateway), ai);

        r.handle(update(3, UpdateKind::Other)).await;

        assert_eq!(
            gateway.sent(),
            vec![(3, fallback::unsupported_notice(Lang::Fa).to_string())]
        );
    }

    #[tokio::test]
    async fn photo_uses_the_largest_variant_and_sends_verbatim() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi::healthy("unused"));
        let r = router(Arc::clone(&gateway), Arc::clone(&ai));

        let variants = vec![
            PhotoVariant {
                file_id: "small".into(),
                width: 90,
                height: 90,
            },
            PhotoVariant {
                file_id: "large".into(),
                width: 1280,
                height: 960,
            },
        ];
        r.handle(update(9, UpdateKind::Photo { variants, caption: None }))
            .await;

        assert_eq!(
            ai.described_urls.lock().unwrap().as_slice(),
            ["https://files.test/large"]
        );
        assert_eq!(gateway.sent(), vec![(9, "a described image".to_string())]);
    }

    #[tokio::test]
    async fn failed_image_analysis_notice_is_sent_verbatim() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi::broken());
        let r = router(Arc::clone(&gateway), ai);

        let variants = vec![PhotoVariant {
            file_id: "p".into(),
            width: 1,
            height: 1,
        }];
        r.handle(update(9, UpdateKind::Photo { variants, caption: None }))
            .await;

        assert_eq!(
            gateway.sent(),
            vec![(9, fallback::image_failure_notice(Lang::Fa).to_string())]
        );
    }

    #[tokio::test]
    async fn voice_transcript_goes_through_the_text_path() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi::healthy("voice answer"));
        let r = router(Arc::clone(&gateway), ai);

        r.handle(update(5, UpdateKind::Voice("v1".into()))).await;

        assert_eq!(gateway.sent(), vec![(5, "voice answer".to_string())]);
    }

    #[tokio::test]
    async fn failed_download_sends_the_audio_apology() {
        let gateway = Arc::new(RecordingGateway::failing_downloads());
        let ai = Arc::new(StubAi::healthy("unused"));
        let r = router(Arc::clone(&gateway), ai);

        r.handle(update(5, UpdateKind::Audio("a1".into()))).await;

        assert_eq!(
            gateway.sent(),
            vec![(5, fallback::audio_failure_notice(Lang::Fa).to_string())]
        );
    }

    #[tokio::test]
    async fn command_gets_the_welcome_message() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi::healthy("unused"));
        let r = router(Arc::clone(&gateway), ai);

        r.handle(update(1, UpdateKind::Command("/start".into()))).await;

        assert_eq!(gateway.sent(), vec![(1, fallback::welcome().to_string())]);
    }

    #[tokio::test]
    async fn every_kind_produces_exactly_one_send() {
        let kinds = || {
            vec![
                UpdateKind::Command("/help".into()),
                UpdateKind::Voice("v".into()),
                UpdateKind::Audio("a".into()),
                UpdateKind::Photo {
                    variants: vec![PhotoVariant {
                        file_id: "p".into(),
                        width: 1,
                        height: 1,
                    }],
                    caption: None,
                },
                UpdateKind::Text("t".into()),
                UpdateKind::Other,
            ]
        };

        // Once against a healthy backend, once against a broken one: the
        // send count must not depend on upstream health.
        for ai in [Arc::new(StubAi::healthy("ok")), Arc::new(StubAi::broken())] {
            let gateway = Arc::new(RecordingGateway::new());
            let r = router(Arc::clone(&gateway), ai);
            for (i, kind) in kinds().into_iter().enumerate() {
                r.handle(update(i as i64, kind)).await;
            }
            let sent = gateway.sent();
            assert_eq!(sent.len(), 6);
            for (i, (chat_id, text)) in sent.iter().enumerate() {
                assert_eq!(*chat_id, i as i64);
                assert!(!text.is_empty());
            }
        }
    }

    #[tokio::test]
    async fn continuation_after_equipment_exchange_reuses_the_topic() {
        let gateway = Arc::new(RecordingGateway::new());
        let ai = Arc::new(StubAi::broken());
        let r = router(Arc::clone(&gateway), ai);

        // First exchange names equipment; the reply comes from the fallback
        // but the subject is still remembered.
        r.handle(update(7, UpdateKind::Text("تیغه 300mm برش نمیده".into())))
            .await;
        // Low-information follow-up re-engages the remembered subject.
        r.handle(update(7, UpdateKind::Text("یه سوال دیگه".into())))
            .await;

        let sent = gateway.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].1.contains("تیغه اره"));
        assert!(sent[1].1.contains("300"));
    }
}
