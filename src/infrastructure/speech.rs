use crate::infrastructure::error::InfraError;
use async_trait::async_trait;

/// Platform speech-to-text, supplied by the host shell when it has one.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool;

    /// Listens for a single utterance. `Ok(None)` means nothing was recognized.
    async fn recognize_once(&self, language: &str) -> Result<Option<String>, InfraError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRecognizer;

#[async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn recognize_once(&self, _language: &str) -> Result<Option<String>, InfraError> {
        Err(InfraError::Unsupported(
            "speech recognition is not available on this platform".to_string(),
        ))
    }
}
