//! Best-effort rationale generation for a finished bundle.

use crate::backend::{GenerationRequest, Generator};
use crate::error::BackendError;
use crate::pipeline::artifact::ArtifactBundle;
use crate::prompts;

/// Requests a markdown explanation of the bundle's reward design.
///
/// The orchestrator treats any failure here as a missing explanation, never
/// as a run failure.
///
/// # Errors
///
/// Propagates backend failures for the caller to swallow.
pub async fn explain(
    backend: &dyn Generator,
    bundle: &ArtifactBundle,
    description: &str,
) -> Result<String, BackendError> {
    let request = GenerationRequest {
        system_prompt: prompts::system_prompt().to_string(),
        user_prompt: prompts::explain_prompt(description, &bundle.primary_file),
        temperature: 0.3,
        max_tokens: 4096,
    };
    backend.send(&request).await
}
