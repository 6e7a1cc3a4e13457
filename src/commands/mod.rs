//! Command dispatch and handlers.

pub mod generate;

use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Generate { description, output, subject, verbose } => {
            generate::run(description, output.as_deref(), subject.as_deref(), *verbose)
        }
    }
}
