//! HTTP-backed capability implementation
//!
//! One implementation covers the four protocol families; only the endpoint
//! path and auth header convention differ. Base URLs are normalized so a
//! configured URL with or without the version segment works the same way.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{EffectiveConfig, ProtocolKind};
use crate::{Backend, BackendError, BackendFactory, Result};

/// How much upstream error body to keep in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Default request timeout for backend calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Capability that speaks one protocol family over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    protocol: ProtocolKind,
    base_url: String,
    api_key: String,
}

impl HttpBackend {
    /// Endpoint URL for a request against `model`.
    ///
    /// Tolerates base URLs that already carry the version segment: for
    /// OpenAI-style bases ending in `/v1` (or Gemini bases ending in
    /// `/v1beta`) the segment is not repeated.
    fn endpoint_url(&self, model: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.protocol {
            ProtocolKind::OpenAiChat => {
                if base.ends_with("/v1") {
                    format!("{base}/chat/completions")
                } else {
                    format!("{base}/v1/chat/completions")
                }
            }
            ProtocolKind::OpenAiResponses => {
                if base.ends_with("/v1") {
                    format!("{base}/responses")
                } else {
                    format!("{base}/v1/responses")
                }
            }
            ProtocolKind::Claude => {
                if base.ends_with("/v1") {
                    format!("{base}/messages")
                } else {
                    format!("{base}/v1/messages")
                }
            }
            ProtocolKind::Gemini => {
                if base.ends_with("/v1beta") {
                    format!("{base}/models/{model}:generateContent")
                } else {
                    format!("{base}/v1beta/models/{model}:generateContent")
                }
            }
        }
    }

    /// Apply the protocol's auth convention to a request builder.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.protocol {
            ProtocolKind::OpenAiChat | ProtocolKind::OpenAiResponses => {
                request.bearer_auth(&self.api_key)
            }
            ProtocolKind::Claude => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
            ProtocolKind::Gemini => request.header("x-goog-api-key", &self.api_key),
        }
    }
}

impl Backend for HttpBackend {
    fn generate_content<'a>(
        &'a self,
        model: &'a str,
        request: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.endpoint_url(model);
            debug!(url = %url, model, "backend request");

            let response = self
                .authorize(self.client.post(&url))
                .json(request)
                .send()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| BackendError::Transport(format!("reading response: {e}")))
            } else {
                let body = response.text().await.unwrap_or_default();
                Err(BackendError::Upstream {
                    status: status.as_u16(),
                    body: body.chars().take(ERROR_BODY_LIMIT).collect(),
                })
            }
        })
    }
}

/// Factory producing `HttpBackend` capabilities.
///
/// A shared client serves direct configurations; configs carrying a
/// `proxyUrl` field get a dedicated client routed through that proxy.
pub struct HttpBackendFactory {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackendFactory {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(format!("building http client: {e}")))?;
        Ok(Self { client, timeout })
    }

    fn default_base_url(protocol: ProtocolKind) -> &'static str {
        match protocol {
            ProtocolKind::OpenAiChat | ProtocolKind::OpenAiResponses => "https://api.openai.com",
            ProtocolKind::Claude => "https://api.anthropic.com",
            ProtocolKind::Gemini => "https://generativelanguage.googleapis.com",
        }
    }
}

impl BackendFactory for HttpBackendFactory {
    fn construct(&self, config: &EffectiveConfig) -> Result<Arc<dyn Backend>> {
        let protocol = config.protocol();

        let api_key = config
            .api_key()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                BackendError::Config(format!(
                    "provider '{}' has no apiKey in effective configuration",
                    config.provider_type
                ))
            })?
            .to_string();

        let base_url = config
            .base_url()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| Self::default_base_url(protocol))
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BackendError::Config(format!(
                "baseUrl must start with http:// or https://, got: {base_url}"
            )));
        }

        let client = match config.proxy_url() {
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(proxy_url)
                    .map_err(|e| BackendError::Config(format!("invalid proxyUrl: {e}")))?;
                reqwest::Client::builder()
                    .timeout(self.timeout)
                    .proxy(proxy)
                    .build()
                    .map_err(|e| BackendError::Config(format!("building proxied client: {e}")))?
            }
            None => self.client.clone(),
        };

        Ok(Arc::new(HttpBackend {
            client,
            protocol,
            base_url,
            api_key,
        }))
    }
}
