//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `envforge`.
#[derive(Debug, Parser)]
#[command(name = "envforge", version, about = "Generate Isaac Lab environments from natural language")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate an environment configuration bundle from a task description.
    Generate {
        /// Natural-language description of the learning task.
        description: String,
        /// Output directory (default: output/<task_name>/).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the platform (arm-manipulator, pole-cart, quadruped).
        #[arg(short, long)]
        subject: Option<String>,
        /// Print the raw backend response.
        #[arg(short, long)]
        verbose: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_generate_subcommand() {
        let cli = Cli::parse_from(["envforge", "generate", "balance a pole on a cart"]);
        match cli.command {
            Command::Generate { description, output, subject, verbose } => {
                assert_eq!(description, "balance a pole on a cart");
                assert!(output.is_none());
                assert!(subject.is_none());
                assert!(!verbose);
            }
        }
    }

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::parse_from([
            "envforge", "generate", "walk", "-o", "out", "-s", "quadruped", "-v",
        ]);
        match cli.command {
            Command::Generate { output, subject, verbose, .. } => {
                assert_eq!(output.unwrap().to_string_lossy(), "out");
                assert_eq!(subject.as_deref(), Some("quadruped"));
                assert!(verbose);
            }
        }
    }
}
