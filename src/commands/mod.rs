/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes the page commands:

- `summarize`: Summarize a page (sidebar flow or popup quick summary)
- `questions`: Suggest three questions about a page
- `chat`: Interactive chat about a page
- `extract`: Print the extracted page text

and `settings` for the persisted settings. Each page command loads the
page into a headless browser, opens the UI surface and drives the same
session the sidebar uses.
*/

use crate::config::Config;
use crate::error::Result;
use crate::proxy::{CompletionClient, ProxyClient};
use crate::storage::{SettingsStore, SledStore};
use colored::Colorize;
use std::sync::Arc;

pub mod page;
pub mod settings;
pub mod special_commands;
pub mod workspace;

pub use page::{load_page, LoadedPage};
pub use workspace::Workspace;

/// Open the settings store named by `config`
pub fn open_store(config: &Config) -> Result<Arc<dyn SettingsStore>> {
    let store = SledStore::new(config.store_path()?)?;
    tracing::debug!("Using settings store at {}", store.path().display());
    Ok(Arc::new(store))
}

/// Load `page` and open it with the UI surface showing
pub async fn open_workspace(config: &Config, page: &str) -> Result<Workspace> {
    let loaded = load_page(page).await?;
    let client: Arc<dyn CompletionClient> = Arc::new(ProxyClient::new()?);
    Workspace::open(
        config.target,
        &loaded,
        client,
        open_store(config)?,
        config.default_settings(),
    )
    .await
}

fn print_status(status: &str) {
    if status.starts_with("Error") {
        eprintln!("{}", status.red());
    } else {
        println!("{}", status.dimmed());
    }
}

// Summarize command handler
pub mod summarize {
    //! Summarize a page and print the result.

    use super::*;
    use crate::session::quick_summary;

    /// Summarize `page`
    ///
    /// With `quick`, the popup's one-shot summary is used instead of the
    /// sidebar flow.
    pub async fn run_summarize(config: Config, page: String, quick: bool) -> Result<()> {
        let mut workspace = open_workspace(&config, &page).await?;

        if quick {
            let settings = workspace.session().settings()?;
            let client = ProxyClient::new()?;
            let summary = quick_summary(workspace.relay().as_ref(), &client, &settings).await?;
            println!("\n{}\n", summary);
            return Ok(());
        }

        let session = workspace.session_mut();
        let result = match session.summary() {
            // Auto-summarize already ran on the page change
            Some(summary) => Ok(summary.to_string()),
            None => session.summarize().await,
        };
        match result {
            Ok(summary) => {
                println!("\n{}\n", summary);
                print_status(session.status());
                Ok(())
            }
            Err(e) => {
                print_status(session.status());
                Err(e)
            }
        }
    }
}

// Questions command handler
pub mod questions {
    //! Suggest questions about a page.

    use super::*;

    /// Print three suggested questions about `page`
    pub async fn run_questions(config: Config, page: String) -> Result<()> {
        let mut workspace = open_workspace(&config, &page).await?;
        let session = workspace.session_mut();

        match session.generate_questions().await {
            Ok(questions) => {
                if questions.is_empty() {
                    println!("{}", "The model did not return a numbered list".yellow());
                }
                for (index, question) in questions.iter().enumerate() {
                    println!("{}. {}", (index + 1).to_string().cyan(), question);
                }
                print_status(session.status());
                Ok(())
            }
            Err(e) => {
                print_status(session.status());
                Err(e)
            }
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Opens the page, then runs a readline-based loop: special commands
    //! trigger the sidebar buttons and any other line is sent as a chat
    //! question.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::session::{ChatRole, SidebarSession};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat about `page`
    pub async fn run_chat(config: Config, page: String) -> Result<()> {
        let mut workspace = open_workspace(&config, &page).await?;
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(workspace.session());

        loop {
            match rl.readline(&format!("{} ", ">>".green())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    };

                    let session = workspace.session_mut();
                    let outcome = match command {
                        SpecialCommand::Summarize => session.summarize().await.map(Some),
                        SpecialCommand::Questions => {
                            session.generate_questions().await.map(|questions| {
                                for (index, question) in questions.iter().enumerate() {
                                    println!("{}. {}", (index + 1).to_string().cyan(), question);
                                }
                                None
                            })
                        }
                        SpecialCommand::Ask(number) => session.ask_question(number - 1).await,
                        SpecialCommand::Reset => {
                            session.reset_conversation().await;
                            print_last_assistant(session);
                            continue;
                        }
                        SpecialCommand::ShowStatus => {
                            print_status_display(session);
                            continue;
                        }
                        SpecialCommand::Help => {
                            print_help();
                            continue;
                        }
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => session.send_chat(trimmed).await,
                    };

                    match outcome {
                        Ok(Some(answer)) => println!("\n{}\n", answer),
                        Ok(None) => {}
                        Err(_) => print_last_assistant(session),
                    }
                    print_status(session.status());
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_last_assistant(session: &SidebarSession) {
        if let Some(message) = session
            .chat()
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)
        {
            println!("\n[{}] {}\n", message.time_label().dimmed(), message.text);
        }
    }

    fn print_welcome_banner(session: &SidebarSession) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                Sidekick Interactive Chat                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        let page = session.page();
        println!("Page:   {}", page.title.bold());
        println!("URL:    {}", page.url);
        print_last_assistant(session);
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    fn print_status_display(session: &SidebarSession) {
        let page = session.page();
        println!("\nPage:              {}", page.title);
        println!("URL:               {}", page.url);
        println!("Token Estimate:    {}", page.token_estimate);
        println!("Conversation Size: {} messages", session.chat().len());
        println!("Suggested:         {} questions", session.questions().len());
        println!("Status:            {}\n", session.status());
    }
}

// Extract command handler
pub mod extract {
    //! Print the text extracted from a page.

    use super::*;
    use crate::content::{extract_content, ExtractionMode, HtmlDocument};
    use crate::truncation::estimate_tokens;

    /// Extract `page` with `mode` and print the text and its token estimate
    pub async fn run_extract(page: String, mode: ExtractionMode) -> Result<()> {
        let loaded = load_page(&page).await?;
        let document = HtmlDocument::parse(&loaded.url, &loaded.html);
        let content = extract_content(&document, mode);

        println!("{}", content);
        println!(
            "{}",
            format!(
                "{} characters, ~{} tokens ({:?})",
                content.chars().count(),
                estimate_tokens(&content),
                mode
            )
            .dimmed()
        );
        Ok(())
    }
}
