//! 目的地建议模块：建议记录类型、来源标记、种子数据与默认兜底。
//!
//! # Suggestions Module
//!
//! Data types for destination suggestions and the two non-AI sources of the
//! fallback chain.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`SuggestionRecord`] | One destination with cost estimates |
//! | [`SuggestionSource`] | Which fallback step produced a response |
//! | [`SuggestionResponse`] | Wire body returned to callers |
//! | [`SeedTable`] | Validated `(origin, budget bucket)` lookup table |
//! | [`SuggestionValidator`] | Schema check for model output |
//! | [`default_suggestions`] | Hardcoded last resort |

mod defaults;
mod schema;
mod seed;
mod types;

pub use defaults::default_suggestions;
pub use schema::{suggestion_list_schema, SuggestionValidator};
pub use seed::{SeedKey, SeedTable};
pub use types::{SuggestionRecord, SuggestionResponse, SuggestionSource};
