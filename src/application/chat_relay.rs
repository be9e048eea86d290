use crate::domain::models::{ChatMessage, MessageKind, Sender};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::speech::SpeechRecognizer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

pub const CHAT_FALLBACK_MESSAGE: &str = "Oops! Something went wrong.";
pub const DICTATION_LANGUAGE: &str = "en-US";

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Handle for a request whose reply has not arrived yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub message: String,
    placeholder_index: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum DictationOutcome {
    Recognized(String),
    NoSpeech,
    Busy,
    Unavailable,
    Failed(String),
}

/// Append-only chat transcript with a typing placeholder per in-flight request.
pub struct ChatRelay {
    transcript: Vec<ChatMessage>,
    draft: String,
    listening: bool,
    now_provider: NowProvider,
}

impl Default for ChatRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatRelay {
    pub fn new() -> Self {
        Self {
            transcript: Vec::new(),
            draft: String::new(),
            listening: false,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_waiting(&self) -> bool {
        self.transcript.iter().any(ChatMessage::is_typing)
    }

    /// Appends the user message and a typing placeholder. Blank input is ignored.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingReply> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }

        self.push(Sender::User, MessageKind::Message, message.to_string());
        self.push(Sender::Bot, MessageKind::Typing, String::new());
        self.draft.clear();

        Some(PendingReply {
            message: message.to_string(),
            placeholder_index: self.transcript.len() - 1,
        })
    }

    /// Swaps the placeholder for the reply, or for the apology on failure.
    pub fn finish_send(&mut self, pending: PendingReply, reply: Result<String, InfraError>) -> &ChatMessage {
        let text = match reply {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(error = %error, "chat request failed");
                CHAT_FALLBACK_MESSAGE.to_string()
            }
        };
        let message = ChatMessage {
            sender: Sender::Bot,
            kind: MessageKind::Message,
            text,
            sent_at: (self.now_provider)(),
        };

        let index = pending.placeholder_index;
        let placeholder_present = self
            .transcript
            .get(index)
            .map(ChatMessage::is_typing)
            .unwrap_or(false);
        if placeholder_present {
            self.transcript[index] = message;
            return &self.transcript[index];
        }
        self.transcript.push(message);
        &self.transcript[self.transcript.len() - 1]
    }

    pub fn begin_dictation<R>(&mut self, recognizer: &R) -> Result<(), DictationOutcome>
    where
        R: SpeechRecognizer + ?Sized,
    {
        if !recognizer.is_available() {
            return Err(DictationOutcome::Unavailable);
        }
        if self.listening {
            return Err(DictationOutcome::Busy);
        }
        self.listening = true;
        Ok(())
    }

    /// The first recognized transcript replaces the draft input.
    pub fn finish_dictation(&mut self, result: Result<Option<String>, InfraError>) -> DictationOutcome {
        self.listening = false;
        match result {
            Ok(Some(transcript)) if !transcript.trim().is_empty() => {
                let transcript = transcript.trim().to_string();
                self.draft = transcript.clone();
                DictationOutcome::Recognized(transcript)
            }
            Ok(_) => DictationOutcome::NoSpeech,
            Err(InfraError::Unsupported(_)) => DictationOutcome::Unavailable,
            Err(error) => {
                tracing::warn!(error = %error, "speech recognition failed");
                DictationOutcome::Failed(error.to_string())
            }
        }
    }

    fn push(&mut self, sender: Sender, kind: MessageKind, text: String) {
        self.transcript.push(ChatMessage {
            sender,
            kind,
            text,
            sent_at: (self.now_provider)(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::chat_client::ChatTransport;
    use crate::infrastructure::speech::UnavailableRecognizer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeChatTransport {
        fail: bool,
        calls: AtomicUsize,
        received: Mutex<Vec<String>>,
    }

    impl FakeChatTransport {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatTransport for FakeChatTransport {
        async fn send_message(&self, message: &str) -> Result<String, InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.received
                .lock()
                .expect("received mutex poisoned")
                .push(message.to_string());
            if self.fail {
                return Err(InfraError::Http("connection refused".to_string()));
            }
            Ok(format!("echo: {message}"))
        }
    }

    struct FakeRecognizer {
        result: Mutex<Option<Result<Option<String>, InfraError>>>,
    }

    impl FakeRecognizer {
        fn returning(result: Result<Option<String>, InfraError>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
            }
        }
    }

    #[async_trait]
    impl SpeechRecognizer for FakeRecognizer {
        fn is_available(&self) -> bool {
            true
        }

        async fn recognize_once(&self, language: &str) -> Result<Option<String>, InfraError> {
            assert_eq!(language, DICTATION_LANGUAGE);
            self.result
                .lock()
                .expect("result mutex poisoned")
                .take()
                .unwrap_or(Ok(None))
        }
    }

    async fn send(relay: &mut ChatRelay, transport: &FakeChatTransport, text: &str) -> Option<ChatMessage> {
        let pending = relay.begin_send(text)?;
        let reply = transport.send_message(&pending.message).await;
        Some(relay.finish_send(pending, reply).clone())
    }

    async fn dictate<R: SpeechRecognizer>(relay: &mut ChatRelay, recognizer: &R) -> DictationOutcome {
        if let Err(outcome) = relay.begin_dictation(recognizer) {
            return outcome;
        }
        let result = recognizer.recognize_once(DICTATION_LANGUAGE).await;
        relay.finish_dictation(result)
    }

    #[tokio::test]
    async fn blank_input_appends_nothing_and_sends_nothing() {
        let transport = FakeChatTransport::default();
        let mut relay = ChatRelay::new();
        assert_eq!(send(&mut relay, &transport, "").await, None);
        assert_eq!(send(&mut relay, &transport, "  \t\n").await, None);
        assert!(relay.transcript().is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn successful_send_replaces_placeholder_with_reply() {
        let transport = FakeChatTransport::default();
        let mut relay = ChatRelay::new();
        let reply = send(&mut relay, &transport, "  hello ").await.expect("reply");

        assert_eq!(reply.text, "echo: hello");
        let transcript = relay.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].sender, Sender::User);
        assert_eq!(transcript[0].text, "hello");
        assert_eq!(transcript[1].sender, Sender::Bot);
        assert!(!relay.is_waiting());
        assert_eq!(
            transport.received.lock().expect("received mutex poisoned").as_slice(),
            &["hello".to_string()]
        );
    }

    #[tokio::test]
    async fn failing_transport_leaves_fallback_and_no_placeholder() {
        let transport = FakeChatTransport::failing();
        let mut relay = ChatRelay::new();
        send(&mut relay, &transport, "hello").await;

        let transcript = relay.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(
            transcript.iter().filter(|message| message.sender == Sender::User).count(),
            1
        );
        assert_eq!(
            transcript.iter().filter(|message| message.sender == Sender::Bot).count(),
            1
        );
        let last = transcript.last().expect("bot message");
        assert_eq!(last.text, CHAT_FALLBACK_MESSAGE);
        assert_eq!(last.kind, MessageKind::Message);
        assert!(transcript.iter().all(|message| !message.is_typing()));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn placeholder_is_visible_while_waiting() {
        let mut relay = ChatRelay::new();
        relay.set_draft("typed text");
        let pending = relay.begin_send("question").expect("pending");
        assert!(relay.is_waiting());
        assert_eq!(relay.draft(), "");
        assert_eq!(relay.transcript().last().map(|m| m.kind), Some(MessageKind::Typing));

        relay.finish_send(pending, Ok("answer".to_string()));
        assert!(!relay.is_waiting());
    }

    #[test]
    fn overlapping_replies_land_on_their_own_placeholders() {
        let mut relay = ChatRelay::new();
        let first = relay.begin_send("one").expect("first");
        let second = relay.begin_send("two").expect("second");
        relay.finish_send(second, Ok("reply two".to_string()));
        relay.finish_send(first, Ok("reply one".to_string()));

        let texts = relay
            .transcript()
            .iter()
            .map(|message| message.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["one", "reply one", "two", "reply two"]);
    }

    #[tokio::test]
    async fn dictation_fills_draft_with_first_transcript() {
        let recognizer = FakeRecognizer::returning(Ok(Some(" explain recursion ".to_string())));
        let mut relay = ChatRelay::new();
        let outcome = dictate(&mut relay, &recognizer).await;
        assert_eq!(outcome, DictationOutcome::Recognized("explain recursion".to_string()));
        assert_eq!(relay.draft(), "explain recursion");
        assert!(!relay.is_listening());
    }

    #[tokio::test]
    async fn dictation_reports_missing_capability_and_failures() {
        let mut relay = ChatRelay::new();
        assert_eq!(
            dictate(&mut relay, &UnavailableRecognizer).await,
            DictationOutcome::Unavailable
        );

        let broken = FakeRecognizer::returning(Err(InfraError::Http("mic busy".to_string())));
        assert!(matches!(dictate(&mut relay, &broken).await, DictationOutcome::Failed(_)));

        let silent = FakeRecognizer::returning(Ok(None));
        relay.set_draft("kept");
        assert_eq!(dictate(&mut relay, &silent).await, DictationOutcome::NoSpeech);
        assert_eq!(relay.draft(), "kept");
    }

    #[test]
    fn second_dictation_is_rejected_while_listening() {
        let recognizer = FakeRecognizer::returning(Ok(None));
        let mut relay = ChatRelay::new();
        relay.begin_dictation(&recognizer).expect("first start");
        assert!(relay.is_listening());
        assert_eq!(relay.begin_dictation(&recognizer), Err(DictationOutcome::Busy));
    }
}
