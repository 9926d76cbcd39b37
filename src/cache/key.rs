//! Request normalization and cache key generation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

pub const DEFAULT_ORIGIN: &str = "Vancouver";
pub const DEFAULT_BUDGET: u64 = 2000;
pub const DEFAULT_ADULTS: u32 = 2;
pub const DEFAULT_KIDS: u32 = 0;
pub const BUDGET_BUCKET_SIZE: u64 = 1000;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Budget rounded to the nearest bucket boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetBucket(pub u64);

impl BudgetBucket {
    pub fn from_budget(budget: u64, bucket_size: u64) -> Self {
        let size = bucket_size.max(1);
        Self(budget.saturating_add(size / 2) / size * size)
    }
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BudgetBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trip preferences after defaulting.
///
/// `origin` is the normalized form used for keys and seed lookups; `origin_label`
/// keeps the caller's spelling for prompts. `vibes` keeps display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSuggestionParams {
    pub origin: String,
    pub origin_label: String,
    pub budget: u64,
    pub vibes: Vec<String>,
    pub adults: u32,
    pub kids: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl NormalizedSuggestionParams {
    /// Vibes as an order-independent set: lower-cased, trimmed, de-duplicated, sorted.
    pub fn vibe_set(&self) -> Vec<String> {
        self.vibes
            .iter()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Serialize)]
struct KeyMaterial<'a> {
    version: u8,
    origin: &'a str,
    budget_bucket: u64,
    vibes: Vec<String>,
    adults: u32,
    kids: u32,
}

/// Maps raw suggestion requests onto normalized parameters and deterministic keys.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    bucket_size: u64,
}

impl CacheKeyBuilder {
    pub fn new() -> Self {
        Self {
            bucket_size: BUDGET_BUCKET_SIZE,
        }
    }

    pub fn with_bucket_size(mut self, size: u64) -> Self {
        self.bucket_size = size.max(1);
        self
    }

    pub fn bucket(&self, budget: u64) -> BudgetBucket {
        BudgetBucket::from_budget(budget, self.bucket_size)
    }

    /// Apply the defaulting policy to a raw request body. Never fails: anything
    /// malformed is replaced by its default.
    pub fn normalize(&self, request: &Value) -> NormalizedSuggestionParams {
        let empty = serde_json::Map::new();
        let obj = request.as_object().unwrap_or(&empty);

        let origin_label = obj
            .get("from")
            .and_then(Value::as_str)
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        let origin = normalize_origin(&origin_label);

        let budget = obj
            .get("budget")
            .and_then(parse_amount)
            .or_else(|| obj.get("budgetAmount").and_then(parse_amount))
            .unwrap_or(DEFAULT_BUDGET);

        let vibes = match obj.get("vibes") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(collapse_whitespace)
                .filter(|v| !v.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        let adults = obj
            .get("adults")
            .and_then(parse_amount)
            .filter(|n| *n >= 1)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(DEFAULT_ADULTS);
        let kids = obj
            .get("kids")
            .and_then(parse_amount)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(DEFAULT_KIDS);

        NormalizedSuggestionParams {
            origin,
            origin_label,
            budget,
            vibes,
            adults,
            kids,
            additional_details: optional_text(obj.get("additionalDetails")),
            start_date: optional_text(obj.get("startDate")),
            end_date: optional_text(obj.get("endDate")),
        }
    }

    /// Digest of `(origin, budget_bucket, sorted_vibes, adults, kids)`.
    pub fn build(&self, params: &NormalizedSuggestionParams) -> CacheKey {
        let material = KeyMaterial {
            version: 1,
            origin: &params.origin,
            budget_bucket: self.bucket(params.budget).value(),
            vibes: params.vibe_set(),
            adults: params.adults,
            kids: params.kids,
        };
        let canonical = serde_json::to_string(&material).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        CacheKey::new(hash)
    }

    pub fn build_from_json(&self, request: &Value) -> CacheKey {
        self.build(&self.normalize(request))
    }
}

impl Default for CacheKeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Origin as used in keys and seed lookups: trimmed, whitespace-collapsed, lower-cased.
pub fn normalize_origin(raw: &str) -> String {
    collapse_whitespace(raw).to_lowercase()
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Non-negative whole amount from a JSON number or a numeric string like "$2,500".
fn parse_amount(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse::<f64>()
            .ok()?,
        _ => return None,
    };
    if !n.is_finite() || n < 0.0 || n > u64::MAX as f64 {
        return None;
    }
    Some(n.round() as u64)
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
