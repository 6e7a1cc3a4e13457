//! Backend client: the generation port, endpoint configuration, and the
//! fallback client with its live HTTP transport.

mod client;
mod config;

pub use client::{FallbackClient, HttpTransport, Transport, TransportFuture};
pub use config::{BackendConfig, Endpoint, DEFAULT_MODEL, NIM_URL, OPENROUTER_URL};

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Boxed future type alias used by [`Generator`] to keep the trait dyn-compatible.
pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>>;

/// A single chat-style generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The system instruction framing the assistant's role.
    pub system_prompt: String,
    /// The user instruction for this call.
    pub user_prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
}

/// Sends generation requests to a text-generation backend.
///
/// Pipeline stages depend on this trait only, so tests can script responses
/// without any network.
pub trait Generator: Send + Sync {
    /// Generates a completion for the given request.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::MissingCredentials`] when no endpoint is
    /// configured, or [`BackendError::Unavailable`] when every configured
    /// endpoint failed.
    fn send(&self, request: &GenerationRequest) -> GenerationFuture<'_>;
}
