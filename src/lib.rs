//! Sidekick - page assistant library
//!
//! This library provides the core of the Sidekick browser add-on: the page
//! context the sidebar keeps, content extraction and truncation, the
//! background relay between browser and UI surface, and the request
//! dispatcher talking to the local Ollama proxy.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Sidebar session with page context, transcript and actions
//! - `relay`: Background relay routing browser events and runtime messages
//! - `host`: Headless browser hosting tabs, windows and the UI surface
//! - `content`: HTML document model, extraction and the content script
//! - `truncation`: Token estimation and budget fitting
//! - `proxy`: Completion client for the local proxy
//! - `prompts`: Prompt templates and question parsing
//! - `settings` / `storage`: Persisted user settings
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sidekick::commands::{load_page, Workspace};
//! use sidekick::proxy::ProxyClient;
//! use sidekick::storage::MemoryStore;
//! use sidekick::{BrowserTarget, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let page = load_page("https://example.com").await?;
//!     let mut workspace = Workspace::open(
//!         BrowserTarget::Firefox,
//!         &page,
//!         Arc::new(ProxyClient::new()?),
//!         Arc::new(MemoryStore::new()),
//!         config.default_settings(),
//!     )
//!     .await?;
//!     println!("{}", workspace.session_mut().summarize().await?);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod host;
pub mod prompts;
pub mod protocol;
pub mod proxy;
pub mod relay;
pub mod session;
pub mod settings;
pub mod storage;
pub mod truncation;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SidekickError};
pub use host::HeadlessBrowser;
pub use protocol::{BrowserTarget, PageContentResponse, RelayMessage};
pub use relay::BackgroundRelay;
pub use session::SidebarSession;
pub use settings::Settings;

#[cfg(test)]
pub mod test_utils;
