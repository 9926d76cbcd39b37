//! 弹性模块：为 AI 调用提供熔断保护。
//!
//! # Resilience Module
//!
//! AI failures already degrade to seeded data; the breaker only stops the
//! service from paying a full timeout on every request while the AI endpoint
//! is down.
//!
//! ```rust
//! use where_next::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig::new()
//!         .with_failure_threshold(5)
//!         .with_cooldown(Duration::from_secs(30)),
//! );
//! if breaker.allow() {
//!     // call the AI service, then report the outcome
//!     breaker.on_success();
//! }
//! ```

pub mod circuit_breaker;
