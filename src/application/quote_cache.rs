use crate::domain::models::DailyQuote;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::quote_client::{QuoteSource, RemoteQuote};
use crate::infrastructure::storage::{KeyValueStore, DAILY_QUOTE_KEY};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;

pub const FALLBACK_QUOTE: &str = "The only way to do great work is to love what you do.";
pub const FALLBACK_AUTHOR: &str = "Steve Jobs";
pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch quote";

// Same shape as the browser's `Date.toDateString()`, e.g. "Fri Oct 16 2026".
const DATE_KEY_FORMAT: &str = "%a %b %d %Y";

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuoteOrigin {
    Cache,
    Network,
    Fallback,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuoteOutcome {
    pub quote: String,
    pub author: String,
    pub origin: QuoteOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuoteOutcome {
    fn fallback() -> Self {
        Self {
            quote: FALLBACK_QUOTE.to_string(),
            author: FALLBACK_AUTHOR.to_string(),
            origin: QuoteOrigin::Fallback,
            error: Some(FETCH_ERROR_MESSAGE.to_string()),
        }
    }
}

/// One remote quote per local calendar day. Failures are never cached.
pub struct QuoteCache<Q>
where
    Q: QuoteSource,
{
    source: Arc<Q>,
    store: Arc<dyn KeyValueStore>,
    timezone: Tz,
    now_provider: NowProvider,
}

impl<Q> QuoteCache<Q>
where
    Q: QuoteSource,
{
    pub fn new(source: Arc<Q>, store: Arc<dyn KeyValueStore>, timezone: Tz) -> Self {
        Self {
            source,
            store,
            timezone,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn today_key(&self) -> String {
        (self.now_provider)()
            .with_timezone(&self.timezone)
            .format(DATE_KEY_FORMAT)
            .to_string()
    }

    pub async fn get_quote(&self) -> QuoteOutcome {
        let today = self.today_key();
        if let Some(cached) = self.cached().filter(|cached| cached.date == today) {
            return QuoteOutcome {
                quote: cached.quote,
                author: cached.author,
                origin: QuoteOrigin::Cache,
                error: None,
            };
        }
        self.fetch_and_store(today).await
    }

    /// Manual refresh: skips the date check, keeps the old cache on failure.
    pub async fn refresh(&self) -> QuoteOutcome {
        let today = self.today_key();
        self.fetch_and_store(today).await
    }

    fn cached(&self) -> Option<DailyQuote> {
        let raw = match self.store.get(DAILY_QUOTE_KEY) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!(error = %error, "failed reading cached daily quote");
                return None;
            }
        };
        match serde_json::from_str::<DailyQuote>(&raw) {
            Ok(quote) => Some(quote),
            Err(error) => {
                tracing::warn!(error = %error, "ignoring unreadable cached daily quote");
                None
            }
        }
    }

    async fn fetch_and_store(&self, today: String) -> QuoteOutcome {
        let RemoteQuote { quote, author } = match self.source.fetch_random().await {
            Ok(remote) => remote,
            Err(error) => {
                tracing::warn!(error = %error, "quote fetch failed; using fallback quote");
                return QuoteOutcome::fallback();
            }
        };

        let cached = DailyQuote {
            quote: quote.clone(),
            author: author.clone(),
            date: today,
        };
        if let Err(error) = self.store_quote(&cached) {
            tracing::warn!(error = %error, "failed caching daily quote");
        }

        QuoteOutcome {
            quote,
            author,
            origin: QuoteOrigin::Network,
            error: None,
        }
    }

    fn store_quote(&self, quote: &DailyQuote) -> Result<(), InfraError> {
        let payload = serde_json::to_string(quote)?;
        self.store.set(DAILY_QUOTE_KEY, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryKeyValueStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    enum FakeQuoteResponse {
        Success(&'static str, &'static str),
        NetworkError,
    }

    #[derive(Debug, Default)]
    struct FakeQuoteSource {
        responses: Mutex<VecDeque<FakeQuoteResponse>>,
        calls: AtomicUsize,
    }

    impl FakeQuoteSource {
        fn with_responses(responses: Vec<FakeQuoteResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for FakeQuoteSource {
        async fn fetch_random(&self) -> Result<RemoteQuote, InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self
                .responses
                .lock()
                .expect("responses mutex poisoned")
                .pop_front()
                .unwrap_or(FakeQuoteResponse::NetworkError);
            match response {
                FakeQuoteResponse::Success(quote, author) => Ok(RemoteQuote {
                    quote: quote.to_string(),
                    author: author.to_string(),
                }),
                FakeQuoteResponse::NetworkError => {
                    Err(InfraError::Http("connection refused".to_string()))
                }
            }
        }
    }

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    struct Harness {
        source: Arc<FakeQuoteSource>,
        store: Arc<InMemoryKeyValueStore>,
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl Harness {
        fn new(responses: Vec<FakeQuoteResponse>) -> Self {
            Self {
                source: Arc::new(FakeQuoteSource::with_responses(responses)),
                store: Arc::new(InMemoryKeyValueStore::default()),
                now: Arc::new(Mutex::new(fixed_time("2026-10-16T09:00:00Z"))),
            }
        }

        fn cache(&self, timezone: Tz) -> QuoteCache<FakeQuoteSource> {
            let now = Arc::clone(&self.now);
            QuoteCache::new(self.source.clone(), self.store.clone(), timezone).with_now_provider(
                Arc::new(move || *now.lock().expect("clock mutex poisoned")),
            )
        }

        fn set_now(&self, value: &str) {
            *self.now.lock().expect("clock mutex poisoned") = fixed_time(value);
        }
    }

    #[tokio::test]
    async fn same_day_calls_hit_the_network_once() {
        let harness = Harness::new(vec![FakeQuoteResponse::Success("Stay curious.", "Anon")]);
        let cache = harness.cache(Tz::UTC);

        let first = cache.get_quote().await;
        harness.set_now("2026-10-16T23:59:00Z");
        let second = cache.get_quote().await;

        assert_eq!(first.origin, QuoteOrigin::Network);
        assert_eq!(second.origin, QuoteOrigin::Cache);
        assert_eq!((first.quote.as_str(), first.author.as_str()), ("Stay curious.", "Anon"));
        assert_eq!((second.quote, second.author), (first.quote, first.author));
        assert_eq!(harness.source.calls(), 1);
    }

    #[tokio::test]
    async fn next_day_triggers_exactly_one_fetch() {
        let harness = Harness::new(vec![
            FakeQuoteResponse::Success("Day one.", "A"),
            FakeQuoteResponse::Success("Day two.", "B"),
        ]);
        let cache = harness.cache(Tz::UTC);
        cache.get_quote().await;

        harness.set_now("2026-10-17T00:00:01Z");
        let next = cache.get_quote().await;
        let again = cache.get_quote().await;

        assert_eq!(next.quote, "Day two.");
        assert_eq!(again.origin, QuoteOrigin::Cache);
        assert_eq!(harness.source.calls(), 2);
    }

    #[tokio::test]
    async fn day_boundary_follows_configured_timezone() {
        let harness = Harness::new(vec![
            FakeQuoteResponse::Success("Morning.", "A"),
            FakeQuoteResponse::Success("Evening.", "B"),
        ]);
        let cache = harness.cache(chrono_tz::Asia::Kolkata);
        harness.set_now("2026-10-16T17:00:00Z");
        cache.get_quote().await;
        // 19:00 UTC is already the 17th in Kolkata.
        harness.set_now("2026-10-16T19:00:00Z");
        let later = cache.get_quote().await;

        assert_eq!(later.quote, "Evening.");
        assert_eq!(cache.today_key(), "Sat Oct 17 2026");
    }

    #[tokio::test]
    async fn failure_returns_uncached_fallback_and_retries_next_call() {
        let harness = Harness::new(vec![
            FakeQuoteResponse::NetworkError,
            FakeQuoteResponse::Success("Back online.", "C"),
        ]);
        let cache = harness.cache(Tz::UTC);

        let failed = cache.get_quote().await;
        assert_eq!(failed.origin, QuoteOrigin::Fallback);
        assert_eq!(failed.quote, FALLBACK_QUOTE);
        assert_eq!(failed.author, FALLBACK_AUTHOR);
        assert_eq!(failed.error.as_deref(), Some(FETCH_ERROR_MESSAGE));
        assert_eq!(harness.store.get(DAILY_QUOTE_KEY).expect("get"), None);

        let recovered = cache.get_quote().await;
        assert_eq!(recovered.quote, "Back online.");
        assert_eq!(harness.source.calls(), 2);
    }

    #[tokio::test]
    async fn refresh_bypasses_cache_and_keeps_it_on_failure() {
        let harness = Harness::new(vec![
            FakeQuoteResponse::Success("First.", "A"),
            FakeQuoteResponse::Success("Second.", "B"),
            FakeQuoteResponse::NetworkError,
        ]);
        let cache = harness.cache(Tz::UTC);
        cache.get_quote().await;

        let refreshed = cache.refresh().await;
        assert_eq!(refreshed.quote, "Second.");

        let failed = cache.refresh().await;
        assert_eq!(failed.origin, QuoteOrigin::Fallback);

        let cached = cache.get_quote().await;
        assert_eq!(cached.origin, QuoteOrigin::Cache);
        assert_eq!(cached.quote, "Second.");
        assert_eq!(harness.source.calls(), 3);
    }

    #[tokio::test]
    async fn corrupt_cache_is_treated_as_missing() {
        let harness = Harness::new(vec![FakeQuoteResponse::Success("Fresh.", "D")]);
        harness.store.set(DAILY_QUOTE_KEY, "not json").expect("seed");
        let cache = harness.cache(Tz::UTC);
        let outcome = cache.get_quote().await;
        assert_eq!(outcome.origin, QuoteOrigin::Network);
        assert_eq!(harness.source.calls(), 1);
    }

    #[tokio::test]
    async fn reads_cache_written_by_the_dashboard() {
        let harness = Harness::new(Vec::new());
        harness
            .store
            .set(
                DAILY_QUOTE_KEY,
                r#"{"quote":"Saved earlier.","author":"E","date":"Fri Oct 16 2026"}"#,
            )
            .expect("seed");
        let cache = harness.cache(Tz::UTC);
        let outcome = cache.get_quote().await;
        assert_eq!(outcome.origin, QuoteOrigin::Cache);
        assert_eq!(outcome.quote, "Saved earlier.");
        assert_eq!(harness.source.calls(), 0);
    }
}
