//! The generated artifact bundle.

/// The set of generated text files produced for one request.
///
/// Created empty when a run starts. Each generation attempt replaces the
/// file fields and the raw response wholesale; `explanation` is filled once,
/// after validation concludes, and may stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactBundle {
    /// The environment configuration source (the file validation inspects).
    pub primary_file: String,
    /// The gym registration module.
    pub registration_file: String,
    /// The training launch script.
    pub launch_script: String,
    /// Human-readable rationale for the artifact; best-effort.
    pub explanation: String,
    /// The unmodified backend output, retained for diagnostics.
    pub raw_response: String,
    /// Module-style identifier, stable across retries within a run.
    pub task_name: String,
    /// Downstream gym registration id derived alongside `task_name`.
    pub task_id: String,
}
