use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteQuote {
    pub quote: String,
    pub author: String,
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_random(&self) -> Result<RemoteQuote, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestQuoteClient {
    client: Client,
    endpoint: Url,
}

impl ReqwestQuoteClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct QuoteItem {
    q: Option<String>,
    a: Option<String>,
}

/// zenquotes shape: `[{"q": "...", "a": "..."}]`. Only the first entry is used.
pub fn parse_quote_payload(body: &str) -> Result<RemoteQuote, InfraError> {
    let items: Vec<QuoteItem> = serde_json::from_str(body)
        .map_err(|error| InfraError::Http(format!("invalid quote payload: {error}")))?;
    let first = items
        .into_iter()
        .next()
        .ok_or_else(|| InfraError::Http("no quote received".to_string()))?;

    let quote = first.q.as_deref().map(str::trim).unwrap_or_default();
    if quote.is_empty() {
        return Err(InfraError::Http("quote text is empty".to_string()));
    }
    let author = first
        .a
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("Unknown");

    Ok(RemoteQuote {
        quote: quote.to_string(),
        author: author.to_string(),
    })
}

#[async_trait]
impl QuoteSource for ReqwestQuoteClient {
    async fn fetch_random(&self) -> Result<RemoteQuote, InfraError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while fetching quote: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading quote response: {error}")))?;

        if !status.is_success() {
            return Err(InfraError::Http(format!(
                "quote api error: http {}",
                status.as_u16()
            )));
        }
        parse_quote_payload(&body)
    }
}
