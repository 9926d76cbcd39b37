//! # where-next
//!
//! 目的地建议服务：请求归一化、TTL 缓存与 AI → 种子数据 → 默认值的兜底链路。
//!
//! Destination suggestion service for Where Next. Given an origin, a budget,
//! travellers and a few "vibes", it returns a short list of trip ideas.
//!
//! ## Overview
//!
//! Equivalent requests are normalized into a stable cache key, so
//! `{"from": " Vancouver ", "vibes": ["Food", "beach"]}` and
//! `{"from": "vancouver", "vibes": ["beach", "food"]}` share one entry.
//! On a miss the service walks a fallback chain and caches whatever it produced:
//!
//! 1. an OpenAI-compatible chat model ([`generator::OpenAiGenerator`])
//! 2. seeded suggestions for the `(origin, budget bucket)` pair
//! 3. hardcoded defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use where_next::{SuggestionService, SuggestionSource};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> where_next::Result<()> {
//!     let service = SuggestionService::builder().build()?;
//!     let response = service
//!         .handle(&json!({"from": "Toronto", "budget": 3000, "vibes": ["food"]}))
//!         .await;
//!     assert_ne!(response.source, SuggestionSource::Cache);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Key normalization, TTL cache and hit/miss metrics |
//! | [`suggestions`] | Suggestion records, seeds and defaults |
//! | [`generator`] | AI generation behind the [`generator::SuggestionGenerator`] trait |
//! | [`service`] | The request handler and its fallback chain |
//! | [`server`] | axum routes |
//! | [`config`] | Environment and YAML configuration |
//! | [`resilience`] | Circuit breaker around the AI service |
//! | [`transport`] | HTTP client for the AI service |
//! | [`telemetry`] | Logging setup |

pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod resilience;
pub mod server;
pub mod service;
pub mod suggestions;
pub mod telemetry;
pub mod transport;

pub use cache::{CacheKey, CacheKeyBuilder, CacheMetrics, CacheStats, TtlCache};
pub use config::ServiceConfig;
pub use error::{Error, ErrorContext};
pub use service::{SuggestionService, SuggestionServiceBuilder};
pub use suggestions::{SuggestionRecord, SuggestionResponse, SuggestionSource};

pub type Result<T> = std::result::Result<T, Error>;
