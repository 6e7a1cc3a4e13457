//! Splits a raw multi-file backend response into named artifacts.
//!
//! The wire format is a literal marker line per file:
//!
//! ```text
//! ### FILE: <name>
//! <content until the next marker or end of text>
//! ```
//!
//! A response with no markers at all is still usable: the whole text is
//! treated as the primary file. That is a degraded result, not an error.

use super::artifact::ArtifactBundle;

/// Literal marker introducing each file segment.
pub const FILE_MARKER: &str = "### FILE:";

/// A named file segment extracted from a raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSegment {
    /// File name taken from the marker line.
    pub name: String,
    /// Segment content with enclosing code fences stripped.
    pub content: String,
}

/// Splits `raw` into `(name, content)` segments on marker lines.
///
/// Text before the first marker is discarded. Each segment's content runs
/// to the next marker or the end of the text, with enclosing fenced-code
/// delimiters removed.
#[must_use]
pub fn split_segments(raw: &str) -> Vec<FileSegment> {
    let mut segments = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix(FILE_MARKER) {
            if let Some((name, lines)) = current.take() {
                segments.push(FileSegment { name, content: strip_code_fences(&lines.join("\n")) });
            }
            let name = rest.trim().trim_end_matches(':').to_string();
            current = Some((name, Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((name, lines)) = current.take() {
        segments.push(FileSegment { name, content: strip_code_fences(&lines.join("\n")) });
    }

    segments
}

/// Removes an enclosing pair of fenced-code delimiters, if present.
#[must_use]
pub fn strip_code_fences(content: &str) -> String {
    let trimmed = content.trim();
    let mut lines: Vec<&str> = trimmed.lines().collect();

    if lines.first().is_some_and(|first| first.trim_start().starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|last| last.trim() == "```") {
        lines.pop();
    }

    lines.join("\n").trim().to_string()
}

/// Parses a raw response into the bundle's three file fields.
///
/// Only the file fields are filled; the caller owns the raw response and
/// the naming fields. Segment names route by pattern: `env_cfg` to the
/// primary file, `__init__` to the registration module, shell scripts and
/// `train` names to the launch script. Unrecognized names are dropped.
/// With zero markers the entire text becomes the primary file.
#[must_use]
pub fn parse_response(raw: &str) -> ArtifactBundle {
    let segments = split_segments(raw);
    let mut bundle = ArtifactBundle::default();

    if segments.is_empty() {
        bundle.primary_file = strip_code_fences(raw);
        return bundle;
    }

    for segment in segments {
        let name = segment.name.to_lowercase();
        if name.contains("env_cfg") {
            bundle.primary_file = segment.content;
        } else if name.contains("__init__") {
            bundle.registration_file = segment.content;
        } else if name.ends_with(".sh") || name.contains("train") {
            bundle.launch_script = segment.content;
        }
    }

    bundle
}
