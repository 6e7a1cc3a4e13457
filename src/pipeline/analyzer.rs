//! Turns free text into a structured task specification.
//!
//! One backend call, one strict retry. The response is expected to be a flat
//! JSON record; extraction tolerates fences and surrounding prose before
//! giving up. A pair the compatibility table rejects is not an error: the
//! subject is overridden to the category's canonical one so context
//! selection stays deterministic.

use serde::Deserialize;
use tracing::debug;

use crate::backend::{GenerationRequest, Generator};
use crate::error::{PipelineError, Stage};
use crate::pipeline::parser;
use crate::pipeline::task::{Difficulty, Subject, TaskCategory, TaskSpecification};
use crate::prompts;

/// Wire record the analysis prompt instructs the backend to emit.
#[derive(Debug, Deserialize)]
struct AnalysisRecord {
    category: TaskCategory,
    subject: Subject,
    #[serde(default)]
    objectives: Vec<String>,
    #[serde(default)]
    constraints: Vec<String>,
    #[serde(default)]
    difficulty: Option<Difficulty>,
    #[serde(default)]
    episode_length_s: Option<f64>,
    #[serde(default)]
    instance_count: Option<u32>,
}

/// Extracts the analysis record from a response that may carry fences or
/// surrounding prose: direct parse, then fence strip, then the outermost
/// brace-delimited slice.
fn extract_record(text: &str) -> Option<AnalysisRecord> {
    let trimmed = text.trim();
    if let Ok(record) = serde_json::from_str(trimmed) {
        return Some(record);
    }

    let unfenced = parser::strip_code_fences(trimmed);
    if let Ok(record) = serde_json::from_str(&unfenced) {
        return Some(record);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Builds the final specification from a parsed record, applying the
/// compatibility override and numeric clamping.
fn build_specification(record: AnalysisRecord, description: &str) -> TaskSpecification {
    let category = record.category;
    let subject = if category.allows(record.subject) {
        record.subject
    } else {
        debug!(
            category = category.as_str(),
            proposed = record.subject.as_str(),
            "incompatible pair, overriding subject"
        );
        category.canonical_subject()
    };

    let objectives = if record.objectives.is_empty() {
        vec![description.to_string()]
    } else {
        record.objectives
    };

    TaskSpecification {
        category,
        subject,
        description: description.to_string(),
        objectives,
        constraints: record.constraints,
        difficulty: record.difficulty.unwrap_or_default(),
        episode_length_s: TaskSpecification::clamp_episode_length(
            record.episode_length_s,
            category,
        ),
        instance_count: TaskSpecification::clamp_instance_count(record.instance_count),
    }
}

fn parse_analysis(response: &str, description: &str) -> Option<TaskSpecification> {
    extract_record(response).map(|record| build_specification(record, description))
}

/// Analyzes a free-text task description into a [`TaskSpecification`].
///
/// # Errors
///
/// Returns [`PipelineError::Backend`] when the backend is unusable, or
/// [`PipelineError::Analysis`] when neither attempt yields a parseable
/// record. Both are fatal to the run.
pub async fn analyze(
    backend: &dyn Generator,
    description: &str,
) -> Result<TaskSpecification, PipelineError> {
    let request = GenerationRequest {
        system_prompt: prompts::system_prompt().to_string(),
        user_prompt: prompts::analyze_prompt(description),
        temperature: 0.1,
        max_tokens: 1024,
    };
    let response = backend
        .send(&request)
        .await
        .map_err(|source| PipelineError::Backend { stage: Stage::Analyze, source })?;

    if let Some(spec) = parse_analysis(&response, description) {
        return Ok(spec);
    }
    debug!("analysis response did not parse, retrying with strict instruction");

    let strict = GenerationRequest {
        system_prompt: prompts::system_prompt().to_string(),
        user_prompt: format!(
            "{}\n\n{}",
            prompts::strict_record_preamble(),
            prompts::analyze_prompt(description)
        ),
        temperature: 0.0,
        max_tokens: 1024,
    };
    let response = backend
        .send(&strict)
        .await
        .map_err(|source| PipelineError::Backend { stage: Stage::Analyze, source })?;

    parse_analysis(&response, description).ok_or_else(|| PipelineError::Analysis {
        detail: format!(
            "response is not a task record after one retry: {}",
            response.chars().take(200).collect::<String>()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "category": "classic-balance",
        "subject": "pole-cart",
        "objectives": ["keep the pole upright"],
        "constraints": [],
        "difficulty": "easy",
        "episode_length_s": 5.0,
        "instance_count": 1024
    }"#;

    #[test]
    fn direct_record_parses() {
        let spec = parse_analysis(RECORD, "balance a pole").unwrap();
        assert_eq!(spec.category, TaskCategory::ClassicBalance);
        assert_eq!(spec.subject, Subject::PoleCart);
        assert_eq!(spec.difficulty, Difficulty::Easy);
        assert_eq!(spec.instance_count, 1024);
        assert_eq!(spec.description, "balance a pole");
    }

    #[test]
    fn fenced_record_parses() {
        let fenced = format!("```json\n{RECORD}\n```");
        assert!(parse_analysis(&fenced, "x").is_some());
    }

    #[test]
    fn prose_wrapped_record_parses() {
        let wrapped = format!("Here is the classification you asked for:\n{RECORD}\nHope it helps!");
        assert!(parse_analysis(&wrapped, "x").is_some());
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!(parse_analysis("I could not classify that task.", "x").is_none());
    }

    #[test]
    fn incompatible_subject_is_overridden_to_canonical() {
        let record = RECORD.replace("pole-cart", "quadruped");
        let spec = parse_analysis(&record, "x").unwrap();
        assert_eq!(spec.subject, Subject::PoleCart);
    }

    #[test]
    fn empty_objectives_fall_back_to_the_description() {
        let record = RECORD.replace("[\"keep the pole upright\"]", "[]");
        let spec = parse_analysis(&record, "balance a pole").unwrap();
        assert_eq!(spec.objectives, ["balance a pole"]);
    }

    #[test]
    fn missing_numeric_fields_get_defaults() {
        let record = r#"{"category": "locomotion-flat", "subject": "quadruped"}"#;
        let spec = parse_analysis(record, "walk").unwrap();
        assert_eq!(spec.episode_length_s, 20.0);
        assert_eq!(spec.instance_count, 4096);
        assert_eq!(spec.difficulty, Difficulty::Medium);
    }
}
