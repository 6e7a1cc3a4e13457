//! Endpoint and credential configuration for the backend client.
//!
//! Credentials are resolved once, at construction time, and handed to the
//! client as a value. Nothing in the pipeline reads the process environment
//! after this point.

use std::env;
use std::time::Duration;

/// Primary endpoint: NVIDIA NIM chat completions.
pub const NIM_URL: &str = "https://integrate.api.nvidia.com/v1/chat/completions";

/// Secondary endpoint: OpenRouter chat completions.
pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model requested from either endpoint.
pub const DEFAULT_MODEL: &str = "nvidia/llama-3.3-nemotron-super-49b-v1";

/// Upper bound on a single outbound attempt.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// One endpoint/credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Short name used in logs and error messages.
    pub name: String,
    /// Chat-completions URL.
    pub url: String,
    /// Bearer credential for this endpoint.
    pub api_key: String,
}

impl Endpoint {
    /// Creates an endpoint from its parts.
    #[must_use]
    pub fn new(name: &str, url: &str, api_key: &str) -> Self {
        Self { name: name.to_string(), url: url.to_string(), api_key: api_key.to_string() }
    }
}

/// Resolved backend configuration handed to the client at construction.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Primary endpoint, tried first when present.
    pub primary: Option<Endpoint>,
    /// Secondary endpoint, tried once when the primary fails or is absent.
    pub secondary: Option<Endpoint>,
    /// Model identifier sent with every request.
    pub model: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    /// Resolves endpoints from `.env` / process environment.
    ///
    /// `NVIDIA_API_KEY` enables the NIM primary, `OPENROUTER_API_KEY` the
    /// OpenRouter secondary. Either may be absent; the client reports a
    /// configuration error only when both are.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let primary = env::var("NVIDIA_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(|key| Endpoint::new("nim", NIM_URL, &key));
        let secondary = env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(|key| Endpoint::new("openrouter", OPENROUTER_URL, &key));

        Self { primary, secondary, model: DEFAULT_MODEL.to_string(), timeout: ATTEMPT_TIMEOUT }
    }

    /// Configured endpoints in attempt order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<&Endpoint> {
        self.primary.iter().chain(self.secondary.iter()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(primary: bool, secondary: bool) -> BackendConfig {
        BackendConfig {
            primary: primary.then(|| Endpoint::new("nim", NIM_URL, "key-a")),
            secondary: secondary.then(|| Endpoint::new("openrouter", OPENROUTER_URL, "key-b")),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn endpoints_keep_attempt_order() {
        let config = config_with(true, true);
        let names: Vec<&str> = config.endpoints().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["nim", "openrouter"]);
    }

    #[test]
    fn missing_primary_leaves_only_secondary() {
        let config = config_with(false, true);
        let names: Vec<&str> = config.endpoints().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["openrouter"]);
    }

    #[test]
    fn no_credentials_means_no_endpoints() {
        assert!(config_with(false, false).endpoints().is_empty());
    }
}
