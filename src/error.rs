//! Error types for the generation pipeline.
//!
//! Fatal kinds abort a run and carry enough context to name the stage and
//! endpoint that failed. Validation findings are not errors in this sense:
//! they travel inside the validation report alongside the bundle.

use std::fmt;

use thiserror::Error;

/// Errors produced by the backend client.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No endpoint has a credential configured; nothing was attempted.
    #[error("no backend credential configured; set NVIDIA_API_KEY or OPENROUTER_API_KEY")]
    MissingCredentials,
    /// Every configured endpoint failed for a single call.
    #[error("backend unavailable: {details}")]
    Unavailable {
        /// Per-endpoint failure summary, in attempt order.
        details: String,
    },
}

/// Pipeline stage attribution for backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Task analysis (free text to structured specification).
    Analyze,
    /// Artifact generation (specification and context to candidate bundle).
    Generate,
    /// Explanation (best-effort rationale for the final artifact).
    Explain,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Analyze => "analyze",
            Stage::Generate => "generate",
            Stage::Explain => "explain",
        };
        f.write_str(name)
    }
}

/// Fatal errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A backend call failed during the named stage.
    #[error("{stage} stage failed: {source}")]
    Backend {
        /// The stage whose backend call failed.
        stage: Stage,
        /// The underlying backend failure.
        source: BackendError,
    },
    /// The analysis response could not be parsed as a task record after one retry.
    #[error("task analysis failed: {detail}")]
    Analysis {
        /// What the parser saw, truncated for display.
        detail: String,
    },
    /// An explicitly requested subject is incompatible with the analyzed category.
    #[error("subject {subject} is not compatible with category {category}")]
    IncompatibleSubject {
        /// The requested subject.
        subject: String,
        /// The category the analyzer settled on.
        category: String,
    },
}
