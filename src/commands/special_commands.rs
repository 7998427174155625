//! Special commands parser for interactive chat mode
//!
//! Special commands trigger the sidebar's buttons from the chat prompt:
//! summarize, suggest questions, ask a suggested question, reset the
//! conversation, show status, and leave. Commands are prefixed with `/`
//! and are case-insensitive.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Summarize the page
    Summarize,

    /// Suggest three questions about the page
    Questions,

    /// Ask a suggested question by its 1-based number
    Ask(usize),

    /// Clear the conversation and reload the page
    Reset,

    /// Display page and session status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; the input is a chat question
    None,
}

/// Parse user input into a special command
///
/// # Examples
///
/// ```
/// use sidekick::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/summarize").unwrap(), SpecialCommand::Summarize);
/// assert_eq!(parse_special_command("/ask 2").unwrap(), SpecialCommand::Ask(2));
/// assert_eq!(parse_special_command("What is this?").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "/summarize" | "/summary" => Ok(SpecialCommand::Summarize),
        "/questions" => Ok(SpecialCommand::Questions),
        "/ask" => Err(CommandError::MissingArgument {
            command: "/ask".to_string(),
            usage: "/ask <number>".to_string(),
        }),
        input if input.starts_with("/ask ") => {
            let arg = input[5..].trim();
            match arg.parse::<usize>() {
                Ok(number) if number > 0 => Ok(SpecialCommand::Ask(number)),
                _ => Err(CommandError::UnsupportedArgument {
                    command: "/ask".to_string(),
                    arg: arg.to_string(),
                }),
            }
        }
        "/reset" | "/new" => Ok(SpecialCommand::Reset),
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print the special command reference
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

PAGE ACTIONS:
  /summarize      - Summarize the current page
  /questions      - Suggest three questions about the page
  /ask <n>        - Ask suggested question number n

SESSION:
  /reset          - Clear the conversation and reload the page
  /status         - Show page, token estimate and status line
  /help           - Show this help message
  /exit, exit     - Leave interactive mode

Anything else is sent as a question about the page.
"#
    );
}
