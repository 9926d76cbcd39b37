//! Service configuration sourced from environment variables, with an optional
//! YAML override file named by `WHERE_NEXT_CONFIG`.

use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub proxy_url: Option<String>,
    pub pool_max_idle_per_host: usize,
    pub breaker_failure_threshold: u32,
    pub breaker_cooldown: Duration,
}

impl AiConfig {
    /// AI generation runs only when enabled and a key is present.
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            timeout: Duration::from_secs(20),
            proxy_url: None,
            pool_max_idle_per_host: 8,
            breaker_failure_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub coalesce_inflight: bool,
    pub seeds_path: Option<PathBuf>,
    pub ai: AiConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cache_capacity: 500,
            cache_ttl: Duration::from_secs(3600),
            coalesce_inflight: false,
            seeds_path: None,
            ai: AiConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceConfigOverride {
    bind_addr: Option<String>,
    cache_capacity: Option<usize>,
    cache_ttl_secs: Option<u64>,
    coalesce_inflight: Option<bool>,
    seeds_path: Option<PathBuf>,
    ai_enabled: Option<bool>,
    ai_base_url: Option<String>,
    ai_model: Option<String>,
    ai_timeout_secs: Option<u64>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        // Keyring first, then OPENAI_API_KEY.
        if let Some(key) = HttpTransport::lookup_api_key("openai") {
            config.ai.api_key = Some(key);
        }
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("WHERE_NEXT_CONFIG") {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                Error::configuration_with_context(
                    format!("cannot read config file: {}", e),
                    ErrorContext::new()
                        .with_field_path("WHERE_NEXT_CONFIG")
                        .with_details(path.clone())
                        .with_source("config"),
                )
            })?;
            config.apply_yaml(&contents)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Build from an arbitrary variable source; `from_env` passes `std::env::var`.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = get("WHERE_NEXT_BIND") {
            config.bind_addr = parse_var("WHERE_NEXT_BIND", &v)?;
        }
        if let Some(v) = get("WHERE_NEXT_CACHE_CAPACITY") {
            config.cache_capacity = parse_var("WHERE_NEXT_CACHE_CAPACITY", &v)?;
        }
        if let Some(v) = get("WHERE_NEXT_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(parse_var("WHERE_NEXT_CACHE_TTL_SECS", &v)?);
        }
        if let Some(v) = get("WHERE_NEXT_COALESCE") {
            config.coalesce_inflight = parse_flag("WHERE_NEXT_COALESCE", &v)?;
        }
        config.seeds_path = get("WHERE_NEXT_SEEDS")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        if let Some(v) = get("WHERE_NEXT_AI_ENABLED") {
            config.ai.enabled = parse_flag("WHERE_NEXT_AI_ENABLED", &v)?;
        }
        if let Some(v) = get("WHERE_NEXT_AI_TIMEOUT_SECS") {
            config.ai.timeout = Duration::from_secs(parse_var("WHERE_NEXT_AI_TIMEOUT_SECS", &v)?);
        }
        config.ai.api_key = get("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        if let Some(v) = get("OPENAI_BASE_URL") {
            config.ai.base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            config.ai.model = v;
        }
        config.ai.proxy_url = get("AI_PROXY_URL");
        if let Some(v) = get("WHERE_NEXT_HTTP_POOL_MAX_IDLE_PER_HOST") {
            config.ai.pool_max_idle_per_host =
                parse_var("WHERE_NEXT_HTTP_POOL_MAX_IDLE_PER_HOST", &v)?;
        }
        if let Some(v) = get("WHERE_NEXT_BREAKER_FAILURE_THRESHOLD") {
            config.ai.breaker_failure_threshold =
                parse_var("WHERE_NEXT_BREAKER_FAILURE_THRESHOLD", &v)?;
        }
        if let Some(v) = get("WHERE_NEXT_BREAKER_COOLDOWN_SECS") {
            config.ai.breaker_cooldown =
                Duration::from_secs(parse_var("WHERE_NEXT_BREAKER_COOLDOWN_SECS", &v)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let o: ServiceConfigOverride = serde_yaml::from_str(contents)?;
        if let Some(v) = o.bind_addr {
            self.bind_addr = parse_var("bind_addr", &v)?;
        }
        if let Some(v) = o.cache_capacity {
            self.cache_capacity = v;
        }
        if let Some(v) = o.cache_ttl_secs {
            self.cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = o.coalesce_inflight {
            self.coalesce_inflight = v;
        }
        if let Some(v) = o.seeds_path {
            self.seeds_path = Some(v);
        }
        if let Some(v) = o.ai_enabled {
            self.ai.enabled = v;
        }
        if let Some(v) = o.ai_base_url {
            self.ai.base_url = v;
        }
        if let Some(v) = o.ai_model {
            self.ai.model = v;
        }
        if let Some(v) = o.ai_timeout_secs {
            self.ai.timeout = Duration::from_secs(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(invalid("cache_capacity", "must be at least 1"));
        }
        if self.ai.timeout.is_zero() {
            return Err(invalid("ai.timeout", "must be greater than zero"));
        }
        if self.ai.model.trim().is_empty() {
            return Err(invalid("ai.model", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, msg: &str) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("config"),
    )
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        Error::configuration_with_context(
            format!("cannot parse {}: {}", name, e),
            ErrorContext::new()
                .with_field_path(name)
                .with_details(raw.to_string())
                .with_source("config"),
        )
    })
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration_with_context(
            format!("cannot parse {} as a boolean", name),
            ErrorContext::new()
                .with_field_path(name)
                .with_details(raw.to_string())
                .with_source("config"),
        )),
    }
}
