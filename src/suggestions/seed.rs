//! Seeded suggestions used when AI generation is unavailable.

use super::types::SuggestionRecord;
use crate::cache::{normalize_origin, BudgetBucket, CacheKeyBuilder};
use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_SEEDS: &str = include_str!("seeds.yaml");

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeedKey {
    pub origin: String,
    pub budget: BudgetBucket,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    seeds: Vec<SeedEntry>,
}

#[derive(Debug, Deserialize)]
struct SeedEntry {
    origin: String,
    budget: u64,
    suggestions: Vec<SuggestionRecord>,
}

/// Validated `(origin, budget bucket) -> suggestions` table.
///
/// Malformed entries are rejected when the table is built, so lookups never fail.
#[derive(Debug, Clone, Default)]
pub struct SeedTable {
    entries: HashMap<SeedKey, Vec<SuggestionRecord>>,
}

impl SeedTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table shipped with the crate.
    pub fn builtin(keys: &CacheKeyBuilder) -> Result<Self> {
        Self::from_yaml_str(BUILTIN_SEEDS, keys)
    }

    /// Parse YAML (or JSON, which YAML accepts) seed data.
    pub fn from_yaml_str(content: &str, keys: &CacheKeyBuilder) -> Result<Self> {
        let file: SeedFile = serde_yaml::from_str(content)?;
        Self::from_entries(file.seeds, keys)
    }

    pub fn from_path(path: impl AsRef<Path>, keys: &CacheKeyBuilder) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read seed file: {}", e),
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("seed_loader"),
            )
        })?;
        let table = Self::from_yaml_str(&content, keys)?;
        tracing::info!(path = %path.display(), seeds = table.len(), "loaded seed table");
        Ok(table)
    }

    fn from_entries(seeds: Vec<SeedEntry>, keys: &CacheKeyBuilder) -> Result<Self> {
        let mut entries = HashMap::with_capacity(seeds.len());
        for (i, seed) in seeds.into_iter().enumerate() {
            let origin = normalize_origin(&seed.origin);
            if origin.is_empty() {
                return Err(invalid(format!("seeds[{}].origin", i), "origin must not be empty"));
            }
            if seed.suggestions.is_empty() {
                return Err(invalid(
                    format!("seeds[{}].suggestions", i),
                    "at least one suggestion is required",
                ));
            }
            for (j, record) in seed.suggestions.iter().enumerate() {
                record
                    .check()
                    .map_err(|msg| invalid(format!("seeds[{}].suggestions[{}]", i, j), msg))?;
            }
            let key = SeedKey {
                origin,
                budget: keys.bucket(seed.budget),
            };
            if entries.contains_key(&key) {
                return Err(invalid(
                    format!("seeds[{}]", i),
                    format!("duplicate seed for {} / {}", key.origin, key.budget),
                ));
            }
            entries.insert(key, seed.suggestions);
        }
        Ok(Self { entries })
    }

    pub fn lookup(&self, origin: &str, budget: BudgetBucket) -> Option<&[SuggestionRecord]> {
        self.entries
            .get(&SeedKey {
                origin: origin.to_string(),
                budget,
            })
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn invalid(field: String, msg: impl Into<String>) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("seed_loader"),
    )
}
