use super::prompt::{build_prompt, SYSTEM_PROMPT};
use super::{GenerationError, SuggestionGenerator};
use crate::cache::NormalizedSuggestionParams;
use crate::suggestions::{SuggestionRecord, SuggestionValidator};
use crate::transport::{HttpTransport, TransportSettings};
use crate::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub proxy_url: Option<String>,
    pub pool_max_idle_per_host: usize,
}

impl OpenAiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(20),
            proxy_url: None,
            pool_max_idle_per_host: 8,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Generates suggestions through an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    transport: HttpTransport,
    model: String,
    temperature: f32,
    validator: SuggestionValidator,
}

impl OpenAiGenerator {
    pub fn new(settings: &OpenAiSettings) -> Result<Self> {
        let transport = HttpTransport::new(&TransportSettings {
            base_url: settings.base_url.clone(),
            api_key: Some(settings.api_key.clone()),
            timeout: settings.timeout,
            proxy_url: settings.proxy_url.clone(),
            pool_max_idle_per_host: settings.pool_max_idle_per_host,
        })?;
        Ok(Self {
            transport,
            model: settings.model.clone(),
            temperature: settings.temperature,
            validator: SuggestionValidator::new()?,
        })
    }

    fn request_body(&self, params: &NormalizedSuggestionParams) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(params)},
            ],
        })
    }
}

#[async_trait]
impl SuggestionGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        params: &NormalizedSuggestionParams,
        request_id: &str,
    ) -> std::result::Result<Vec<SuggestionRecord>, GenerationError> {
        let body = self.request_body(params);
        let reply = self
            .transport
            .post_json("chat/completions", &body, Some(request_id))
            .await?;
        let content = reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GenerationError::Malformed("missing choices[0].message.content".into())
            })?;
        let records = self.validator.parse(content)?;
        tracing::debug!(
            request_id,
            model = %self.model,
            count = records.len(),
            "AI suggestions parsed"
        );
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
