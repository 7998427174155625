//! Command-line interface definition for Sidekick
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to summarize, question, chat with and extract pages,
//! and to manage the persisted settings.

use crate::content::ExtractionMode;
use crate::protocol::BrowserTarget;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sidekick - page assistant backed by a local Ollama proxy
///
/// Loads a page into a headless browser and runs the sidebar flows against
/// it: summaries, suggested questions and free-form chat.
#[derive(Parser, Debug, Clone)]
#[command(name = "sidekick")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Browser flavor to host (firefox, chrome-side-panel, chrome)
    #[arg(short, long)]
    pub target: Option<BrowserTarget>,

    /// Settings database path
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Sidekick
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Summarize a page
    Summarize {
        /// HTML file path or http(s) URL
        page: String,

        /// Use the popup's one-shot summary instead of the sidebar flow
        #[arg(long)]
        quick: bool,
    },

    /// Suggest three questions about a page
    Questions {
        /// HTML file path or http(s) URL
        page: String,
    },

    /// Chat interactively about a page
    Chat {
        /// HTML file path or http(s) URL
        page: String,
    },

    /// Print the text extracted from a page
    Extract {
        /// HTML file path or http(s) URL
        page: String,

        /// Extraction mode: prioritized or full-body
        #[arg(short, long, default_value = "prioritized")]
        mode: ExtractionMode,
    },

    /// Manage persisted settings
    Settings {
        /// Settings subcommand
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

/// Settings management subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SettingsCommand {
    /// Show the effective settings
    Show,

    /// Change one setting by its storage key
    Set {
        /// endpoint, model, maxLength or maxTokens, systemPrompt, autoSummarize
        key: String,

        /// New value
        value: String,
    },

    /// Remove every stored setting so defaults apply again
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_summarize() {
        let cli = Cli::try_parse_from(["sidekick", "summarize", "page.html"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("config/config.yaml"));
        match cli.command {
            Commands::Summarize { page, quick } => {
                assert_eq!(page, "page.html");
                assert!(!quick);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_target_and_store() {
        let cli = Cli::try_parse_from([
            "sidekick",
            "--target",
            "chrome-side-panel",
            "--store",
            "/tmp/s.db",
            "-v",
            "questions",
            "https://example.com",
        ])
        .unwrap();
        assert_eq!(cli.target, Some(BrowserTarget::ChromeSidePanel));
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s.db")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_rejects_unknown_target() {
        let result = Cli::try_parse_from(["sidekick", "--target", "safari", "chat", "a.html"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_extract_mode() {
        let cli =
            Cli::try_parse_from(["sidekick", "extract", "a.html", "--mode", "full-body"]).unwrap();
        match cli.command {
            Commands::Extract { mode, .. } => assert_eq!(mode, ExtractionMode::FullBody),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_settings_set() {
        let cli =
            Cli::try_parse_from(["sidekick", "settings", "set", "model", "mistral"]).unwrap();
        match cli.command {
            Commands::Settings { command } => assert_eq!(
                command,
                SettingsCommand::Set {
                    key: "model".to_string(),
                    value: "mistral".to_string()
                }
            ),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
