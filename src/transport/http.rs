use crate::{Error, ErrorContext, Result};
use keyring::Entry;
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use url::Url;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub proxy_url: Option<String>,
    pub pool_max_idle_per_host: usize,
}

/// JSON-over-HTTP client for the AI service.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        let base_url = validate_base_url(&settings.base_url)?;

        let mut builder = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout.min(Duration::from_secs(10)))
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = &settings.proxy_url {
            match Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!(error = %e, "ignoring invalid proxy url"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key.clone(),
        })
    }

    /// Resolve an API key: OS keyring entry `where-next/<provider>` first, then
    /// the `<PROVIDER>_API_KEY` environment variable.
    pub fn lookup_api_key(provider: &str) -> Option<String> {
        if let Ok(entry) = Entry::new("where-next", provider) {
            if let Ok(key) = entry.get_password() {
                if !key.trim().is_empty() {
                    return Some(key);
                }
            }
        }
        let env_var = format!("{}_API_KEY", provider.to_uppercase());
        env::var(env_var).ok().filter(|k| !k.trim().is_empty())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// POST a JSON body and decode a JSON reply. Non-2xx statuses become
    /// [`TransportError::Status`] carrying the (truncated) response body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        request_id: Option<&str>,
    ) -> std::result::Result<serde_json::Value, TransportError> {
        let mut req = self.client.post(self.endpoint(path)).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        if let Some(id) = request_id {
            req = req.header("x-request-id", id);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: text.chars().take(300).collect(),
            });
        }
        Ok(response.json().await?)
    }
}

fn validate_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid AI base url: {}", e),
            ErrorContext::new()
                .with_field_path("ai.base_url")
                .with_details(raw.to_string())
                .with_source("transport"),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::configuration_with_context(
            "AI base url must be an absolute http(s) url",
            ErrorContext::new()
                .with_field_path("ai.base_url")
                .with_details(raw.to_string())
                .with_source("transport"),
        ));
    }
    Ok(url)
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Other(String),
}
