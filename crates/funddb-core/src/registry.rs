use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::adapters::{
    AmmufgAdapter, CacheBuster, FidelityAdapter, PictetAdapter, TokiomarineamAdapter,
};
use crate::data_source::{QuoteSource, SourceError};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::{FetchId, MarketClock, ProviderId, Quote};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Deadline and cancellation applied around a single fetch.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub cancel: CancellationToken,
    pub timeout: Duration,
}

impl FetchContext {
    pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
        Self { cancel, timeout }
    }
}

/// Dispatches fetch identifiers to the adapter registered for their scheme.
pub struct AdapterRegistry {
    sources: HashMap<ProviderId, Arc<dyn QuoteSource>>,
}

impl AdapterRegistry {
    /// Register `sources`; a later source replaces an earlier one with the
    /// same provider id.
    pub fn new(sources: Vec<Arc<dyn QuoteSource>>) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.id(), source))
            .collect();
        Self { sources }
    }

    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::default()
    }

    /// Registered providers in scheme order.
    pub fn providers(&self) -> Vec<ProviderId> {
        let mut providers = self.sources.keys().copied().collect::<Vec<_>>();
        providers.sort();
        providers
    }

    /// Resolve `fetch_id` and fetch the latest quote.
    ///
    /// Cancellation wins over completion when both are ready.
    pub async fn fetch(&self, fetch_id: &str, ctx: &FetchContext) -> Result<Quote, SourceError> {
        let fetch_id = FetchId::parse(fetch_id).map_err(SourceError::invalid_identifier)?;
        let provider = fetch_id
            .provider()
            .map_err(|_| SourceError::unknown_scheme(fetch_id.scheme()))?;
        let source = self
            .sources
            .get(&provider)
            .ok_or_else(|| SourceError::adapter_not_registered(provider))?;

        tracing::debug!(provider = %provider, code = fetch_id.code(), "fetching latest quote");

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(SourceError::cancelled()),
            outcome = tokio::time::timeout(ctx.timeout, source.latest(fetch_id.code())) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::timeout(duration_ms(ctx.timeout))),
                }
            }
        }
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builds a registry holding the four provider adapters around one shared
/// HTTP client.
///
/// ```rust
/// use funddb_core::{AdapterRegistry, MarketClock, ProviderId};
///
/// let clock = MarketClock::tokyo().with_close_hour(15)?;
/// let registry = AdapterRegistry::builder()
///     .with_provider_clock(ProviderId::Fidelity, clock)
///     .build();
/// assert_eq!(registry.providers().len(), 4);
/// # Ok::<(), funddb_core::ValidationError>(())
/// ```
#[derive(Default)]
pub struct AdapterRegistryBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    clocks: BTreeMap<ProviderId, MarketClock>,
    cache_buster: CacheBuster,
    request_timeout_ms: Option<u64>,
    overrides: Vec<Arc<dyn QuoteSource>>,
}

impl AdapterRegistryBuilder {
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_provider_clock(mut self, provider: ProviderId, clock: MarketClock) -> Self {
        self.clocks.insert(provider, clock);
        self
    }

    pub fn with_cache_buster(mut self, cache_buster: CacheBuster) -> Self {
        self.cache_buster = cache_buster;
        self
    }

    /// HTTP-level timeout handed to every adapter request.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = Some(timeout_ms);
        self
    }

    /// Replace the built-in adapter for `source.id()`.
    pub fn with_source(mut self, source: Arc<dyn QuoteSource>) -> Self {
        self.overrides.push(source);
        self
    }

    pub fn build(self) -> AdapterRegistry {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::default()));
        let timeout_ms = self
            .request_timeout_ms
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        let clock = |provider| self.clocks.get(&provider).copied().unwrap_or_default();

        let mut sources: Vec<Arc<dyn QuoteSource>> = vec![
            Arc::new(
                AmmufgAdapter::new(Arc::clone(&http_client))
                    .with_clock(clock(ProviderId::Ammufg))
                    .with_timeout_ms(timeout_ms),
            ),
            Arc::new(
                FidelityAdapter::new(Arc::clone(&http_client))
                    .with_clock(clock(ProviderId::Fidelity))
                    .with_timeout_ms(timeout_ms),
            ),
            Arc::new(
                TokiomarineamAdapter::new(Arc::clone(&http_client))
                    .with_clock(clock(ProviderId::Tokiomarineam))
                    .with_cache_buster(self.cache_buster.clone())
                    .with_timeout_ms(timeout_ms),
            ),
            Arc::new(
                PictetAdapter::new(Arc::clone(&http_client))
                    .with_clock(clock(ProviderId::Pictet))
                    .with_timeout_ms(timeout_ms),
            ),
        ];
        sources.extend(self.overrides);

        AdapterRegistry::new(sources)
    }
}
