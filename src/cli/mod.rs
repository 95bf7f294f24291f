//! CLI module for Scout.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Scout - a research agent
///
/// Reasons step by step, searches the web, does math, checks the date and
/// queries company documents.
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the built-in batch of test questions
    Run,

    /// Ask a single question with every tool available
    Ask {
        /// The question to ask
        question: String,

        /// Override the model from the configuration
        #[arg(short, long)]
        model: Option<String>,

        /// Print each reasoning step
        #[arg(short, long)]
        steps: bool,
    },

    /// Start an interactive chat session in the terminal
    Chat {
        /// Override the model from the configuration
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start the chat web UI
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search the company document index directly
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "4")]
        limit: usize,
    },

    /// List source documents in the index
    Sources,

    /// List the tools available to the agent
    Tools,

    /// Check credentials, document index and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

/// Log level for the `-v` count, falling back to the configured level.
pub fn log_level(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_prefers_flags_over_config() {
        assert_eq!(log_level(0, "error"), "error");
        assert_eq!(log_level(1, "error"), "info");
        assert_eq!(log_level(2, "error"), "debug");
        assert_eq!(log_level(5, "error"), "trace");
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_flags() {
        let cli = Cli::parse_from(["scout", "-vv", "ask", "What is 15 * 8?", "--steps"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask {
                question, steps, ..
            } => {
                assert_eq!(question, "What is 15 * 8?");
                assert!(steps);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_takes_no_arguments() {
        assert!(Cli::try_parse_from(["scout", "run"]).is_ok());
        assert!(Cli::try_parse_from(["scout", "run", "extra"]).is_err());
    }
}
