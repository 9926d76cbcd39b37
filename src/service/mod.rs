//! 建议请求处理：缓存查找、AI 生成、种子数据与默认兜底的完整链路。
//!
//! # Suggestion Service
//!
//! Orchestrates one suggestion request:
//!
//! 1. normalize the body and derive the cache key
//! 2. on a live cache entry, record a hit and return it with `source = cache`
//! 3. otherwise record a miss and walk the fallback chain
//!    (AI generator, seeded `(origin, budget bucket)` table, hardcoded defaults)
//! 4. store whatever the chain produced and return it
//!
//! [`SuggestionService::handle`] never fails. A panicking generator is an AI
//! failure like any other. If the pipeline itself breaks outside generation the
//! caller still receives the defaults with `source = default_fallback` and an
//! `error` message.

mod coalesce;

pub use coalesce::KeyCoalescer;

use crate::cache::{
    CacheKeyBuilder, CacheMetrics, CacheStats, NormalizedSuggestionParams, TtlCache,
};
use crate::config::ServiceConfig;
use crate::generator::{GenerationError, OpenAiGenerator, OpenAiSettings, SuggestionGenerator};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::suggestions::{
    default_suggestions, SeedTable, SuggestionRecord, SuggestionResponse, SuggestionSource,
};
use crate::Result;
use arc_swap::ArcSwap;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

pub type SuggestionCache = TtlCache<Vec<SuggestionRecord>>;

/// Counters and sizes exposed by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    #[serde(flatten)]
    pub cache: CacheStats,
    pub entries: usize,
    pub capacity: usize,
    pub ai_enabled: bool,
    pub seeds: usize,
}

pub struct SuggestionService {
    keys: CacheKeyBuilder,
    cache: Arc<SuggestionCache>,
    metrics: Arc<CacheMetrics>,
    generator: Option<Arc<dyn SuggestionGenerator>>,
    breaker: Option<Arc<CircuitBreaker>>,
    seeds: ArcSwap<SeedTable>,
    ai_timeout: Duration,
    coalescer: Option<KeyCoalescer>,
}

impl SuggestionService {
    pub fn builder() -> SuggestionServiceBuilder {
        SuggestionServiceBuilder::new()
    }

    /// Wire the service from configuration. AI stays off when disabled or when
    /// no API key could be resolved.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let keys = CacheKeyBuilder::new();
        let seeds = match &config.seeds_path {
            Some(path) => SeedTable::from_path(path, &keys)?,
            None => SeedTable::builtin(&keys)?,
        };

        let mut builder = SuggestionServiceBuilder::new()
            .with_key_builder(keys)
            .with_cache(Arc::new(TtlCache::new(
                config.cache_capacity,
                config.cache_ttl,
            )))
            .with_seeds(seeds)
            .with_ai_timeout(config.ai.timeout)
            .with_coalescing(config.coalesce_inflight);

        match (&config.ai.api_key, config.ai.enabled) {
            (Some(key), true) => {
                let mut settings = OpenAiSettings::new(key.clone())
                    .with_base_url(config.ai.base_url.clone())
                    .with_model(config.ai.model.clone())
                    .with_timeout(config.ai.timeout);
                settings.proxy_url = config.ai.proxy_url.clone();
                settings.pool_max_idle_per_host = config.ai.pool_max_idle_per_host;
                let generator = OpenAiGenerator::new(&settings)?;
                builder = builder.with_generator(Arc::new(generator)).with_circuit_breaker(
                    Arc::new(CircuitBreaker::new(
                        CircuitBreakerConfig::new()
                            .with_failure_threshold(config.ai.breaker_failure_threshold)
                            .with_cooldown(config.ai.breaker_cooldown),
                    )),
                );
                tracing::info!(model = %config.ai.model, "AI generation enabled");
            }
            (None, true) => tracing::warn!("no API key configured, AI generation disabled"),
            (_, false) => tracing::info!("AI generation disabled by configuration"),
        }

        builder.build()
    }

    /// Handle a parsed request body. Never fails.
    pub async fn handle(&self, body: &Value) -> SuggestionResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("suggestions", request_id = %request_id);
        guarded(&request_id, self.respond(body, &request_id))
            .instrument(span)
            .await
    }

    /// Handle a raw request body. An empty body counts as `{}`; an unparseable
    /// one is a total failure.
    pub async fn handle_bytes(&self, body: &[u8]) -> SuggestionResponse {
        if body.iter().all(u8::is_ascii_whitespace) {
            return self.handle(&Value::Object(Default::default())).await;
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => self.handle(&value).await,
            Err(e) => {
                tracing::error!(error = %e, "unparseable suggestion request body");
                Self::failure_response(format!("invalid request body: {}", e))
            }
        }
    }

    pub fn failure_response(error: impl Into<String>) -> SuggestionResponse {
        SuggestionResponse {
            suggestions: default_suggestions(),
            source: SuggestionSource::DefaultFallback,
            cache_stats: None,
            error: Some(error.into()),
        }
    }

    async fn respond(&self, body: &Value, request_id: &str) -> SuggestionResponse {
        let params = self.keys.normalize(body);
        let key = self.keys.build(&params);

        let _inflight = match &self.coalescer {
            Some(coalescer) => Some(coalescer.acquire(key.as_str()).await),
            None => None,
        };

        if let Some(cached) = self.cache.get(key.as_str()) {
            self.metrics.record_hit();
            tracing::debug!(key = %key, origin = %params.origin, "cache hit");
            return SuggestionResponse {
                suggestions: cached,
                source: SuggestionSource::Cache,
                cache_stats: Some(self.metrics.stats()),
                error: None,
            };
        }

        self.metrics.record_miss();
        tracing::debug!(key = %key, origin = %params.origin, "cache miss");

        let (suggestions, source) = self.generate(&params, request_id).await;
        self.cache.insert(key.as_str(), suggestions.clone());
        tracing::info!(
            source = %source,
            origin = %params.origin,
            count = suggestions.len(),
            "suggestions served"
        );

        SuggestionResponse {
            suggestions,
            source,
            cache_stats: Some(self.metrics.stats()),
            error: None,
        }
    }

    async fn generate(
        &self,
        params: &NormalizedSuggestionParams,
        request_id: &str,
    ) -> (Vec<SuggestionRecord>, SuggestionSource) {
        if let Some(generator) = &self.generator {
            match self.generate_with_ai(generator.as_ref(), params, request_id).await {
                Ok(records) => return (records, SuggestionSource::Ai),
                Err(e) => tracing::warn!(
                    generator = generator.name(),
                    error = %e,
                    "AI generation failed, falling back"
                ),
            }
        }

        let bucket = self.keys.bucket(params.budget);
        if let Some(seeded) = self.seeds.load().lookup(&params.origin, bucket) {
            return (seeded.to_vec(), SuggestionSource::Fallback);
        }
        tracing::debug!(origin = %params.origin, bucket = %bucket, "no seeded suggestions");
        (default_suggestions(), SuggestionSource::DefaultFallback)
    }

    async fn generate_with_ai(
        &self,
        generator: &dyn SuggestionGenerator,
        params: &NormalizedSuggestionParams,
        request_id: &str,
    ) -> std::result::Result<Vec<SuggestionRecord>, GenerationError> {
        if let Some(breaker) = &self.breaker {
            if !breaker.allow() {
                return Err(GenerationError::CircuitOpen);
            }
        }

        let call = AssertUnwindSafe(generator.generate(params, request_id)).catch_unwind();
        let result = match tokio::time::timeout(self.ai_timeout, call).await {
            Ok(Ok(Ok(records))) if records.is_empty() => Err(GenerationError::Empty),
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(GenerationError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(GenerationError::Timeout(self.ai_timeout)),
        };

        if let Some(breaker) = &self.breaker {
            match &result {
                Ok(_) => breaker.on_success(),
                Err(_) => breaker.on_failure(),
            }
        }
        result
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.metrics.stats(),
            entries: self.cache.len(),
            capacity: self.cache.capacity(),
            ai_enabled: self.generator.is_some(),
            seeds: self.seeds.load().len(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.metrics.stats()
    }

    pub fn key_builder(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    /// Swap the seed table; in-flight requests keep the table they loaded.
    pub fn replace_seeds(&self, seeds: SeedTable) {
        self.seeds.store(Arc::new(seeds));
    }

    /// Load and validate a seed file, then swap it in. On error the current
    /// table stays in place.
    pub fn reload_seeds(&self, path: impl AsRef<Path>) -> Result<usize> {
        let table = SeedTable::from_path(path, &self.keys)?;
        let count = table.len();
        self.replace_seeds(table);
        tracing::info!(seeds = count, "seed table reloaded");
        Ok(count)
    }
}

/// Catches panics outside the generator call: the caller gets the defaults,
/// `error` is set and nothing is cached.
async fn guarded<F>(request_id: &str, pipeline: F) -> SuggestionResponse
where
    F: Future<Output = SuggestionResponse>,
{
    match AssertUnwindSafe(pipeline).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            tracing::error!(request_id = %request_id, error = %msg, "suggestion pipeline failed");
            SuggestionService::failure_response(format!("suggestion pipeline failed: {}", msg))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct SuggestionServiceBuilder {
    keys: CacheKeyBuilder,
    cache: Option<Arc<SuggestionCache>>,
    metrics: Option<Arc<CacheMetrics>>,
    generator: Option<Arc<dyn SuggestionGenerator>>,
    breaker: Option<Arc<CircuitBreaker>>,
    seeds: Option<SeedTable>,
    ai_timeout: Duration,
    coalesce: bool,
}

impl SuggestionServiceBuilder {
    pub fn new() -> Self {
        Self {
            keys: CacheKeyBuilder::new(),
            cache: None,
            metrics: None,
            generator: None,
            breaker: None,
            seeds: None,
            ai_timeout: Duration::from_secs(20),
            coalesce: false,
        }
    }

    pub fn with_key_builder(mut self, keys: CacheKeyBuilder) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_cache(mut self, cache: Arc<SuggestionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<CacheMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn SuggestionGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_seeds(mut self, seeds: SeedTable) -> Self {
        self.seeds = Some(seeds);
        self
    }

    pub fn with_ai_timeout(mut self, timeout: Duration) -> Self {
        self.ai_timeout = timeout;
        self
    }

    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce = enabled;
        self
    }

    pub fn build(self) -> Result<SuggestionService> {
        let seeds = match self.seeds {
            Some(seeds) => seeds,
            None => SeedTable::builtin(&self.keys)?,
        };
        Ok(SuggestionService {
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(TtlCache::new(500, Duration::from_secs(3600)))),
            metrics: self.metrics.unwrap_or_default(),
            keys: self.keys,
            generator: self.generator,
            breaker: self.breaker,
            seeds: ArcSwap::from_pointee(seeds),
            ai_timeout: self.ai_timeout,
            coalescer: self.coalesce.then(KeyCoalescer::new),
        })
    }
}

impl Default for SuggestionServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_default_fallback_then_cache() {
        let service = SuggestionService::builder().build().unwrap();
        let body = json!({"from": "Nowhere", "budget": 2000});

        let first = service.handle(&body).await;
        assert_eq!(first.source, SuggestionSource::DefaultFallback);
        assert_eq!(first.cache_stats, Some(CacheStats::new(0, 1)));
        assert!(first.error.is_none());

        let second = service.handle(&body).await;
        assert_eq!(second.source, SuggestionSource::Cache);
        assert_eq!(second.suggestions, first.suggestions);
        assert_eq!(second.cache_stats, Some(CacheStats::new(1, 1)));
    }

    #[tokio::test]
    async fn test_seeded_fallback() {
        let service = SuggestionService::builder().build().unwrap();
        let response = service
            .handle(&json!({"from": "Toronto", "budget": 3200}))
            .await;
        assert_eq!(response.source, SuggestionSource::Fallback);
        assert!(!response.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_body() {
        let service = SuggestionService::builder().build().unwrap();
        let response = service.handle_bytes(b"{not json").await;
        assert_eq!(response.source, SuggestionSource::DefaultFallback);
        assert!(response.cache_stats.is_none());
        assert!(response.error.unwrap().starts_with("invalid request body"));
        assert_eq!(service.cache_stats().total(), 0);
    }

    #[tokio::test]
    async fn test_empty_body_uses_defaults() {
        let service = SuggestionService::builder().build().unwrap();
        let response = service.handle_bytes(b"").await;
        assert!(response.error.is_none());
        assert_eq!(response.cache_stats, Some(CacheStats::new(0, 1)));
    }

    #[test]
    fn test_stats_snapshot() {
        let service = SuggestionService::builder()
            .with_cache(Arc::new(TtlCache::new(8, Duration::from_secs(60))))
            .build()
            .unwrap();
        let stats = service.stats();
        assert_eq!(stats.capacity, 8);
        assert_eq!(stats.entries, 0);
        assert!(!stats.ai_enabled);
        assert!(stats.seeds > 0);
        let wire = serde_json::to_value(&stats).unwrap();
        assert_eq!(wire["hitRate"], 0.0);
        assert_eq!(wire["aiEnabled"], false);
    }

    fn corrupted_pipeline() -> SuggestionResponse {
        panic!("seed table corrupted")
    }

    #[tokio::test]
    async fn test_panic_outside_generation_returns_defaults() {
        let response = guarded("req-1", async { corrupted_pipeline() }).await;
        assert_eq!(response.source, SuggestionSource::DefaultFallback);
        assert_eq!(response.suggestions, default_suggestions());
        assert!(response.cache_stats.is_none());
        assert!(response.error.unwrap().contains("seed table corrupted"));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
