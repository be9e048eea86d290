use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends one message and returns the bot's reply.
    async fn send_message(&self, message: &str) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestChatClient {
    client: Client,
    endpoint: Url,
}

impl ReqwestChatClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct ChatResponse {
    response: String,
}

pub fn parse_chat_payload(body: &str) -> Result<String, InfraError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|error| InfraError::Http(format!("invalid chat payload: {error}")))?;
    Ok(parsed.response)
}

#[async_trait]
impl ChatTransport for ReqwestChatClient {
    async fn send_message(&self, message: &str) -> Result<String, InfraError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while sending chat message: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading chat response: {error}")))?;

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                format!("chat endpoint error: http {}", status.as_u16())
            } else {
                format!("chat endpoint error: http {}; body={body}", status.as_u16())
            };
            return Err(InfraError::Http(message));
        }
        parse_chat_payload(&body)
    }
}
