//! `envforge generate` command.
//!
//! Runs the pipeline and persists the resulting bundle. Everything the run
//! found — corrections, warnings, and errors — is printed, even when the
//! bundle is written successfully.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{BackendConfig, FallbackClient};
use crate::pipeline::orchestrator::{self, PipelineOutcome};
use crate::pipeline::Subject;

/// Execute the `generate` command.
///
/// # Errors
///
/// Returns an error string for fatal pipeline errors, an unknown subject
/// name, or output-directory I/O failures.
pub fn run(
    description: &str,
    output: Option<&Path>,
    subject: Option<&str>,
    verbose: bool,
) -> Result<(), String> {
    let subject_override = subject.map(str::parse::<Subject>).transpose()?;

    let client = FallbackClient::new(BackendConfig::from_env());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;

    let outcome = runtime
        .block_on(orchestrator::run(&client, description, subject_override))
        .map_err(|e| e.to_string())?;

    present(&outcome, verbose);
    let out_dir = write_bundle(&outcome, output)?;

    println!();
    println!("Wrote bundle to {}/", out_dir.display());
    println!("To train: copy the folder to an Isaac Lab machine and run ./train.sh");

    Ok(())
}

fn present(outcome: &PipelineOutcome, verbose: bool) {
    let spec = &outcome.spec;
    println!("Detected: {} with {}", spec.category.as_str(), spec.subject.as_str());
    println!("Objectives: {}", spec.objectives.join(", "));
    if !spec.constraints.is_empty() {
        println!("Constraints: {}", spec.constraints.join(", "));
    }

    if verbose {
        println!("\n--- raw backend response ---");
        println!("{}", outcome.bundle.raw_response);
        println!("--- end response ---\n");
    }

    let report = &outcome.report;
    for correction in &report.corrections {
        println!("Auto-corrected: {correction}");
    }
    for warning in &report.warnings {
        println!("Warning: {warning}");
    }
    if !report.is_acceptable() {
        for error in &report.errors {
            println!("Error: {error}");
        }
        println!("Validation still failing after the retry; writing the best attempt for inspection.");
    }
}

fn write_bundle(outcome: &PipelineOutcome, output: Option<&Path>) -> Result<PathBuf, String> {
    let bundle = &outcome.bundle;
    let out_dir = output
        .map_or_else(|| PathBuf::from("output").join(&bundle.task_name), Path::to_path_buf);

    fs::create_dir_all(&out_dir)
        .map_err(|e| format!("failed to create {}: {e}", out_dir.display()))?;

    let mut files = vec![
        (format!("{}_env_cfg.py", bundle.task_name), &bundle.primary_file),
        ("__init__.py".to_string(), &bundle.registration_file),
        ("train.sh".to_string(), &bundle.launch_script),
    ];
    if !bundle.explanation.is_empty() {
        files.push(("README.md".to_string(), &bundle.explanation));
    }

    for (name, content) in files {
        let path = out_dir.join(&name);
        fs::write(&path, content).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        println!("  - {name}");
    }

    Ok(out_dir)
}
