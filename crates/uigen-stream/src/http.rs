//! HTTP transport for OpenAI-compatible chat-completion services

use crate::error::TransportError;
use crate::service::{event_stream, ChatMessage, EventStream, GenerationService, ServiceRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for [`HttpGenerationService`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service root, without the `/v1/...` path
    pub base_url: String,
    /// Model name sent with every call
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Bearer token
    pub api_key: Option<String>,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7878".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            api_key: None,
            connect_timeout_secs: 10,
        }
    }
}

impl ServiceConfig {
    /// Chat-completions endpoint
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

/// Streams chat completions over HTTP
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: reqwest::Client,
    config: ServiceConfig,
    endpoint: String,
}

impl HttpGenerationService {
    /// Build client for `config`
    ///
    /// # Errors
    /// Returns error if the base URL is unusable or the TLS backend fails.
    pub fn new(config: ServiceConfig) -> Result<Self, TransportError> {
        let endpoint = config.endpoint();
        reqwest::Url::parse(&endpoint)
            .map_err(|e| TransportError::InvalidConfig(format!("{endpoint}: {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("uigen/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn open(&self, request: &ServiceRequest) -> Result<EventStream, TransportError> {
        let body = ChatCompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            max_tokens: request.max_output_tokens,
            temperature: self.config.temperature,
            stream: true,
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            messages = request.messages.len(),
            max_tokens = request.max_output_tokens,
            "opening generation call"
        );
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(event_stream(response.bytes_stream()))
    }
}
