use crate::cache::CacheStats;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One suggested destination with rough trip costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    /// City or region name, e.g. "Lisbon, Portugal".
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Flights plus lodging for the whole party, in the request's currency.
    /// Fractional amounts are rounded.
    #[serde(deserialize_with = "amount::whole")]
    #[schemars(with = "f64")]
    pub estimated_total: u64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "amount::optional_whole"
    )]
    #[schemars(with = "Option<f64>")]
    pub flight_estimate: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "amount::optional_whole"
    )]
    #[schemars(with = "Option<f64>")]
    pub hotel_estimate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibes: Vec<String>,
}

impl SuggestionRecord {
    pub fn new(destination: impl Into<String>, estimated_total: u64) -> Self {
        Self {
            destination: destination.into(),
            country: None,
            estimated_total,
            flight_estimate: None,
            hotel_estimate: None,
            description: None,
            vibes: Vec::new(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_vibes(mut self, vibes: &[&str]) -> Self {
        self.vibes = vibes.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Checks the schema cannot express.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.destination.trim().is_empty() {
            return Err("destination must not be empty".into());
        }
        Ok(())
    }
}

mod amount {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    fn round(n: f64) -> Result<u64, String> {
        if !n.is_finite() || n < 0.0 {
            return Err(format!("amount must be a non-negative number, got {}", n));
        }
        Ok(n.round() as u64)
    }

    pub fn whole<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        round(f64::deserialize(d)?).map_err(D::Error::custom)
    }

    pub fn optional_whole<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(round)
            .transpose()
            .map_err(D::Error::custom)
    }
}

/// Which step of the fallback chain produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Cache,
    Ai,
    Fallback,
    DefaultFallback,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionSource::Cache => "cache",
            SuggestionSource::Ai => "ai",
            SuggestionSource::Fallback => "fallback",
            SuggestionSource::DefaultFallback => "default_fallback",
        }
    }
}

impl std::fmt::Display for SuggestionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body returned for every suggestion request.
///
/// `error` is only set when the whole pipeline failed and `suggestions` holds the
/// hardcoded defaults; `cache_stats` is omitted in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub suggestions: Vec<SuggestionRecord>,
    pub source: SuggestionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_stats: Option<CacheStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_wire_names() {
        assert_eq!(serde_json::to_value(SuggestionSource::Cache).unwrap(), "cache");
        assert_eq!(serde_json::to_value(SuggestionSource::Ai).unwrap(), "ai");
        assert_eq!(serde_json::to_value(SuggestionSource::Fallback).unwrap(), "fallback");
        assert_eq!(
            serde_json::to_value(SuggestionSource::DefaultFallback).unwrap(),
            "default_fallback"
        );
        assert_eq!(SuggestionSource::DefaultFallback.to_string(), "default_fallback");
    }

    #[test]
    fn test_record_camel_case_round_trip() {
        let value = json!({
            "destination": "Lisbon",
            "country": "Portugal",
            "estimatedTotal": 2400,
            "flightEstimate": 1100
        });
        let record: SuggestionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.estimated_total, 2400);
        assert_eq!(record.flight_estimate, Some(1100));
        assert!(record.vibes.is_empty());

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["estimatedTotal"], 2400);
        assert!(out.get("hotelEstimate").is_none());
    }

    #[test]
    fn test_record_check() {
        assert!(SuggestionRecord::new("Lisbon", 2000).check().is_ok());
        assert!(SuggestionRecord::new("  ", 2000).check().is_err());
    }

    #[test]
    fn test_response_omits_empty_optionals() {
        let response = SuggestionResponse {
            suggestions: vec![SuggestionRecord::new("Lisbon", 2000)],
            source: SuggestionSource::Ai,
            cache_stats: None,
            error: None,
        };
        let out = serde_json::to_value(&response).unwrap();
        assert_eq!(out["source"], "ai");
        assert!(out.get("cacheStats").is_none());
        assert!(out.get("error").is_none());
    }
}
