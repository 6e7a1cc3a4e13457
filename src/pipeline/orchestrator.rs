//! The retry-bounded pipeline state machine.
//!
//! Stage order: analyze, build context, then up to two generate/validate
//! cycles, then a best-effort explanation. The attempt counter is the only
//! loop control; there is no recursion and no unbounded retry. A second
//! validation failure does not abort the run: the degraded bundle and its
//! report are returned together so findings are never hidden.

use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::backend::Generator;
use crate::error::PipelineError;
use crate::pipeline::artifact::ArtifactBundle;
use crate::pipeline::task::{Subject, TaskSpecification};
use crate::pipeline::validator::ValidationReport;
use crate::pipeline::{analyzer, context, explainer, generator, validator};
use crate::prompts;

/// Upper bound on generation attempts per run.
pub const MAX_GENERATION_ATTEMPTS: u32 = 2;

/// Final result of a pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The analyzed task specification.
    pub spec: TaskSpecification,
    /// The generated bundle, possibly degraded.
    pub bundle: ArtifactBundle,
    /// The report for the last validation attempt.
    pub report: ValidationReport,
}

/// Runs the full pipeline for one free-text description.
///
/// `subject_override` replaces the analyzed subject when the caller asked
/// for a specific platform; it must be compatible with the analyzed
/// category.
///
/// # Errors
///
/// Returns a [`PipelineError`] for the fatal kinds: unusable backend
/// configuration, backend unavailability during analyze/generate, an
/// unparseable analysis after its retry, or an incompatible subject
/// override. Validation findings are never an error.
pub async fn run(
    backend: &dyn Generator,
    description: &str,
    subject_override: Option<Subject>,
) -> Result<PipelineOutcome, PipelineError> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("pipeline", %run_id);
    run_stages(backend, description, subject_override).instrument(span).await
}

async fn run_stages(
    backend: &dyn Generator,
    description: &str,
    subject_override: Option<Subject>,
) -> Result<PipelineOutcome, PipelineError> {
    let mut spec = analyzer::analyze(backend, description).await?;

    if let Some(subject) = subject_override {
        if !spec.category.allows(subject) {
            return Err(PipelineError::IncompatibleSubject {
                subject: subject.to_string(),
                category: spec.category.to_string(),
            });
        }
        spec.subject = subject;
    }
    info!(
        category = spec.category.as_str(),
        subject = spec.subject.as_str(),
        "task analyzed"
    );

    let context = context::assemble(&spec);
    debug!(bytes = context.len(), "context assembled");

    let mut attempt = 0u32;
    let mut addendum: Option<String> = None;
    let (bundle, report) = loop {
        attempt += 1;
        debug!(attempt, "generating");

        let mut bundle = generator::generate(backend, &spec, &context, addendum.as_deref())
            .await
            .map_err(|source| PipelineError::Backend {
                stage: crate::error::Stage::Generate,
                source,
            })?;

        let (corrected, corrections) = validator::auto_correct(&bundle.primary_file);
        bundle.primary_file = corrected;

        let report =
            ValidationReport { corrections, ..validator::validate(&bundle.primary_file) };

        if report.is_acceptable() || attempt >= MAX_GENERATION_ATTEMPTS {
            break (bundle, report);
        }

        warn!(errors = report.errors.len(), "validation failed, retrying once");
        let hint = validator::whitelist_hint(&report.errors);
        addendum = Some(prompts::corrective_addendum(&report.errors, hint.as_deref()));
    };

    if !report.is_acceptable() {
        warn!(
            errors = report.errors.len(),
            "bundle is degraded after the retry; surfacing findings with the result"
        );
    }

    let mut bundle = bundle;
    match explainer::explain(backend, &bundle, description).await {
        Ok(text) => bundle.explanation = text,
        Err(e) => warn!(error = %e, "explanation failed, continuing without one"),
    }

    Ok(PipelineOutcome { spec, bundle, report })
}
