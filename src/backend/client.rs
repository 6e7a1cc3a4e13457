//! Fallback client and the live HTTP transport.
//!
//! The client tries the primary endpoint and, on any failure, retries the
//! identical request exactly once against the secondary. The per-endpoint
//! attempt sits behind the [`Transport`] trait so tests can observe attempt
//! order and payloads without a network.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::config::{BackendConfig, Endpoint};
use super::{GenerationFuture, GenerationRequest, Generator};
use crate::error::BackendError;

/// Boxed future type alias used by [`Transport`] to keep the trait dyn-compatible.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// One outbound attempt against a single endpoint.
pub trait Transport: Send + Sync {
    /// Performs one attempt and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, timeout, a non-success status,
    /// or an unparseable response body.
    fn attempt<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        model: &'a str,
        request: &'a GenerationRequest,
    ) -> TransportFuture<'a>;
}

/// Backend client that tries the primary endpoint first and falls back to
/// the secondary exactly once.
pub struct FallbackClient {
    config: BackendConfig,
    transport: Box<dyn Transport>,
}

impl FallbackClient {
    /// Creates a client with the live HTTP transport.
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        let transport = Box::new(HttpTransport::new(config.timeout));
        Self { config, transport }
    }

    /// Creates a client with an injected transport, for tests.
    #[must_use]
    pub fn with_transport(config: BackendConfig, transport: Box<dyn Transport>) -> Self {
        Self { config, transport }
    }
}

impl Generator for FallbackClient {
    fn send(&self, request: &GenerationRequest) -> GenerationFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let endpoints = self.config.endpoints();
            if endpoints.is_empty() {
                return Err(BackendError::MissingCredentials);
            }

            let mut failures = Vec::new();
            for (index, endpoint) in endpoints.iter().enumerate() {
                match self.transport.attempt(endpoint, &self.config.model, &request).await {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        if index + 1 < endpoints.len() {
                            warn!(endpoint = %endpoint.name, error = %e, "endpoint failed, falling back");
                        }
                        failures.push(format!("{}: {e}", endpoint.name));
                    }
                }
            }

            Err(BackendError::Unavailable { details: failures.join("; ") })
        })
    }
}

/// Request body sent to a chat-completions endpoint.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// A single message in the chat-completions request.
#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Top-level response from a chat-completions endpoint.
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// One completion choice in the response.
#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// The assistant message inside a completion choice.
#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Error body returned by a chat-completions endpoint.
#[derive(Deserialize)]
struct ChatError {
    error: ChatErrorDetail,
}

/// Detail inside a chat-completions error body.
#[derive(Deserialize)]
struct ChatErrorDetail {
    message: String,
}

/// Live [`Transport`] over reqwest.
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport with the given per-attempt timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { client: Client::new(), timeout }
    }
}

impl Transport for HttpTransport {
    fn attempt<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        model: &'a str,
        request: &'a GenerationRequest,
    ) -> TransportFuture<'a> {
        Box::pin(async move {
            let body = ChatRequest {
                model,
                messages: vec![
                    ChatMessage { role: "system", content: &request.system_prompt },
                    ChatMessage { role: "user", content: &request.user_prompt },
                ],
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            };

            let response = self
                .client
                .post(&endpoint.url)
                .timeout(self.timeout)
                .bearer_auth(&endpoint.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| -> Box<dyn Error + Send + Sync> {
                    format!("request failed: {e}").into()
                })?;

            let status = response.status();
            let response_text = response.text().await.map_err(
                |e| -> Box<dyn Error + Send + Sync> {
                    format!("failed to read response body: {e}").into()
                },
            )?;

            if !status.is_success() {
                let msg = serde_json::from_str::<ChatError>(&response_text)
                    .map(|e| e.error.message)
                    .unwrap_or(response_text);
                return Err(format!("status {}: {msg}", status.as_u16()).into());
            }

            let parsed: ChatResponse = serde_json::from_str(&response_text).map_err(
                |e| -> Box<dyn Error + Send + Sync> {
                    format!("failed to parse response body: {e}").into()
                },
            )?;

            parsed
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| "response contained no choices".into())
        })
    }
}
