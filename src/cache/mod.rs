//! 建议缓存模块：请求归一化、带 TTL 的内存缓存以及命中率统计。
//!
//! # Suggestion Cache Module
//!
//! Keeps generated destination suggestions in memory so identical trip
//! preferences are answered without calling the AI service again.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheKeyBuilder`] | Request defaulting, normalization and key digests |
//! | [`TtlCache`] | Capacity-bounded store with per-entry expiry |
//! | [`CacheMetrics`] | Process-lifetime hit/miss counters |
//! | [`Clock`] | Time source, swappable for tests |
//!
//! ## Example
//!
//! ```rust
//! use where_next::cache::{CacheKeyBuilder, TtlCache};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let builder = CacheKeyBuilder::new();
//! let key = builder.build_from_json(&json!({"from": "Toronto", "vibes": ["food"]}));
//!
//! let cache: TtlCache<Vec<String>> = TtlCache::new(100, Duration::from_secs(3600));
//! cache.insert(key.as_str(), vec!["Montreal".to_string()]);
//! assert!(cache.has(key.as_str()));
//! ```
//!
//! ## Key Generation
//!
//! Keys digest the normalized origin, budget bucket, vibe set and party size.
//! Dates and free-text details shape the AI prompt but never the key.

mod clock;
mod key;
mod metrics;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{
    normalize_origin, BudgetBucket, CacheKey, CacheKeyBuilder, NormalizedSuggestionParams,
    BUDGET_BUCKET_SIZE, DEFAULT_ADULTS, DEFAULT_BUDGET, DEFAULT_KIDS, DEFAULT_ORIGIN,
};
pub use metrics::{CacheMetrics, CacheStats};
pub use ttl::TtlCache;
