//! Configuration management for Sidekick
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Configuration decides which browser flavor is hosted, where settings
//! are stored, and what a fresh settings store starts with. The local proxy
//! address is a fixed contract and is not configurable here.

use crate::error::{Result, SidekickError};
use crate::protocol::BrowserTarget;
use crate::settings::{Settings, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use crate::storage::default_store_path;
use crate::truncation::ContentBudget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Main configuration structure for Sidekick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Browser flavor to host
    #[serde(default = "default_target")]
    pub target: BrowserTarget,

    /// Settings store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Initial values for settings missing from the store
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

fn default_target() -> BrowserTarget {
    BrowserTarget::Firefox
}

/// Settings store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database path; the platform data directory when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Defaults applied when the settings store has no value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Model server endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Budget limit in the target's unit; the target default when absent
    #[serde(default)]
    pub budget_limit: Option<usize>,

    /// Persona prepended to prompts
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Summarize automatically after a page change
    #[serde(default)]
    pub auto_summarize: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            budget_limit: None,
            system_prompt: default_system_prompt(),
            auto_summarize: false,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SidekickError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| SidekickError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(target) = std::env::var("SIDEKICK_TARGET") {
            match target.parse() {
                Ok(value) => self.target = value,
                Err(_) => tracing::warn!("Invalid SIDEKICK_TARGET: {}", target),
            }
        }

        if let Ok(path) = std::env::var("SIDEKICK_STORE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(endpoint) = std::env::var("SIDEKICK_ENDPOINT") {
            self.defaults.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("SIDEKICK_MODEL") {
            self.defaults.model = model;
        }

        if let Ok(auto) = std::env::var("SIDEKICK_AUTO_SUMMARIZE") {
            match auto.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.defaults.auto_summarize = true,
                "0" | "false" | "no" | "off" => self.defaults.auto_summarize = false,
                _ => tracing::warn!("Invalid SIDEKICK_AUTO_SUMMARIZE: {}", auto),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(target) = cli.target {
            tracing::debug!("Using target override from CLI: {}", target);
            self.target = target;
        }

        if let Some(store) = &cli.store {
            tracing::debug!("Using store override from CLI: {}", store.display());
            self.storage.path = Some(store.clone());
        }
    }

    /// Defaults for a fresh settings store, in this target's budget unit
    pub fn default_settings(&self) -> Settings {
        let budget = match (self.target.default_budget(), self.defaults.budget_limit) {
            (ContentBudget::Tokens(_), Some(limit)) => ContentBudget::Tokens(limit),
            (ContentBudget::Characters(_), Some(limit)) => ContentBudget::Characters(limit),
            (budget, None) => budget,
        };
        Settings {
            endpoint: self.defaults.endpoint.clone(),
            model: self.defaults.model.clone(),
            budget,
            system_prompt: self.defaults.system_prompt.clone(),
            auto_summarize: self.defaults.auto_summarize,
        }
    }

    /// Resolved settings database path
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => default_store_path(),
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `SidekickError::Config` for an invalid default endpoint, an
    /// empty model or system prompt, or a zero budget.
    pub fn validate(&self) -> Result<()> {
        if self.defaults.system_prompt.trim().is_empty() {
            return Err(SidekickError::Config(
                "defaults.system_prompt cannot be empty".to_string(),
            )
            .into());
        }

        self.default_settings().validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: default_target(),
            storage: StorageConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}
