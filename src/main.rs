//! Sidekick - page assistant CLI
//!
#![doc = "Main entry point for the Sidekick application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sidekick::cli::{Cli, Commands};
use sidekick::commands;
use sidekick::config::{Config, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;
    tracing::debug!("Hosting target: {}", config.target);

    match cli.command {
        Commands::Summarize { page, quick } => {
            tracing::info!("Summarizing {}", page);
            commands::summarize::run_summarize(config, page, quick).await?;
            Ok(())
        }
        Commands::Questions { page } => {
            tracing::info!("Generating questions for {}", page);
            commands::questions::run_questions(config, page).await?;
            Ok(())
        }
        Commands::Chat { page } => {
            tracing::info!("Starting interactive chat about {}", page);
            commands::chat::run_chat(config, page).await?;
            Ok(())
        }
        Commands::Extract { page, mode } => {
            commands::extract::run_extract(page, mode).await?;
            Ok(())
        }
        Commands::Settings { command } => {
            let store = commands::open_store(&config)?;
            commands::settings::handle_settings(
                command,
                store.as_ref(),
                &config.default_settings(),
            )?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins over the verbosity flag when set.
fn init_tracing(verbose: bool, json_logs: bool) {
    let default_directive = if verbose { "sidekick=debug" } else { "sidekick=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
