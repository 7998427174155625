//! User settings persisted in the key-value store
//!
//! Keys and defaults match the extension's storage layout. Absent, empty or
//! malformed values fall back to the defaults every time settings are read.

use crate::error::{Result, SidekickError};
use crate::storage::SettingsStore;
use crate::truncation::ContentBudget;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Storage key for the model server endpoint
pub const KEY_ENDPOINT: &str = "endpoint";
/// Storage key for the model name
pub const KEY_MODEL: &str = "model";
/// Storage key for a character budget
pub const KEY_MAX_LENGTH: &str = "maxLength";
/// Storage key for a token budget
pub const KEY_MAX_TOKENS: &str = "maxTokens";
/// Storage key for the system prompt
pub const KEY_SYSTEM_PROMPT: &str = "systemPrompt";
/// Storage key for the auto-summarize toggle
pub const KEY_AUTO_SUMMARIZE: &str = "autoSummarize";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_MAX_LENGTH: usize = 6000;
pub const DEFAULT_MAX_TOKENS: usize = 8000;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes web content concisely and accurately.";

/// Settings read by every outbound request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Model server endpoint the proxy forwards to
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Content budget; its unit decides which storage key holds the limit
    pub budget: ContentBudget,
    /// Persona prepended to every prompt
    pub system_prompt: String,
    /// Summarize automatically after a page change
    pub auto_summarize: bool,
}

impl Settings {
    /// Default settings using `budget` as the default content budget
    pub fn with_budget(budget: ContentBudget) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            budget,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            auto_summarize: false,
        }
    }

    /// Storage key holding the budget limit
    pub fn budget_key(&self) -> &'static str {
        budget_key(self.budget)
    }

    /// Read settings from `store`, taking every missing value from `defaults`
    ///
    /// The budget unit always comes from `defaults`; only its limit is read.
    pub fn load(store: &dyn SettingsStore, defaults: &Settings) -> Result<Self> {
        let budget_key = defaults.budget_key();
        let stored = store.get_many(&[
            KEY_ENDPOINT,
            KEY_MODEL,
            budget_key,
            KEY_SYSTEM_PROMPT,
            KEY_AUTO_SUMMARIZE,
        ])?;

        let limit = stored
            .get(budget_key)
            .and_then(value_as_limit)
            .unwrap_or_else(|| defaults.budget.limit());
        let budget = match defaults.budget {
            ContentBudget::Tokens(_) => ContentBudget::Tokens(limit),
            ContentBudget::Characters(_) => ContentBudget::Characters(limit),
        };

        Ok(Self {
            endpoint: non_empty_string(stored.get(KEY_ENDPOINT))
                .unwrap_or_else(|| defaults.endpoint.clone()),
            model: non_empty_string(stored.get(KEY_MODEL))
                .unwrap_or_else(|| defaults.model.clone()),
            budget,
            system_prompt: non_empty_string(stored.get(KEY_SYSTEM_PROMPT))
                .unwrap_or_else(|| defaults.system_prompt.clone()),
            auto_summarize: stored
                .get(KEY_AUTO_SUMMARIZE)
                .and_then(Value::as_bool)
                .unwrap_or(defaults.auto_summarize),
        })
    }

    /// Write every field to `store`
    pub fn save(&self, store: &dyn SettingsStore) -> Result<()> {
        let mut values = Map::new();
        values.insert(KEY_ENDPOINT.to_string(), json!(self.endpoint.trim()));
        values.insert(KEY_MODEL.to_string(), json!(self.model.trim()));
        values.insert(self.budget_key().to_string(), json!(self.budget.limit()));
        values.insert(
            KEY_SYSTEM_PROMPT.to_string(),
            json!(self.system_prompt.trim()),
        );
        values.insert(KEY_AUTO_SUMMARIZE.to_string(), json!(self.auto_summarize));
        store.set_many(values)?;
        tracing::info!("Settings saved: endpoint={}, model={}", self.endpoint, self.model);
        Ok(())
    }

    /// Update one field from its storage key and a textual value
    ///
    /// # Errors
    ///
    /// Returns `SidekickError::Config` for unknown keys, a budget key of
    /// the other unit, or values that do not parse.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            KEY_ENDPOINT => self.endpoint = value.to_string(),
            KEY_MODEL => self.model = value.to_string(),
            KEY_SYSTEM_PROMPT => self.system_prompt = value.to_string(),
            KEY_AUTO_SUMMARIZE => {
                self.auto_summarize = value.parse::<bool>().map_err(|_| {
                    SidekickError::Config(format!("{} must be true or false", KEY_AUTO_SUMMARIZE))
                })?
            }
            KEY_MAX_LENGTH | KEY_MAX_TOKENS => {
                if key != self.budget_key() {
                    return Err(SidekickError::Config(format!(
                        "This target stores its budget under {}, not {}",
                        self.budget_key(),
                        key
                    ))
                    .into());
                }
                let limit = value.parse::<usize>().map_err(|_| {
                    SidekickError::Config(format!("{} must be a positive integer", key))
                })?;
                self.budget = match self.budget {
                    ContentBudget::Tokens(_) => ContentBudget::Tokens(limit),
                    ContentBudget::Characters(_) => ContentBudget::Characters(limit),
                };
            }
            other => {
                return Err(SidekickError::Config(format!("Unknown setting: {}", other)).into())
            }
        }
        Ok(())
    }

    /// Validate the settings
    ///
    /// # Errors
    ///
    /// Returns `SidekickError::Config` for an endpoint that is not an
    /// absolute http(s) URL, an empty model, or a zero budget.
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.endpoint).map_err(|e| {
            SidekickError::Config(format!("Invalid endpoint {}: {}", self.endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SidekickError::Config(format!(
                "Endpoint must use http or https: {}",
                self.endpoint
            ))
            .into());
        }

        if self.model.trim().is_empty() {
            return Err(SidekickError::Config("Model cannot be empty".to_string()).into());
        }

        if self.budget.limit() == 0 {
            return Err(SidekickError::Config(format!(
                "{} must be greater than 0",
                self.budget_key()
            ))
            .into());
        }

        Ok(())
    }

    /// Settings as stored, keyed by storage key
    pub fn to_storage_map(&self) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert(KEY_ENDPOINT.to_string(), json!(self.endpoint));
        values.insert(KEY_MODEL.to_string(), json!(self.model));
        values.insert(self.budget_key().to_string(), json!(self.budget.limit()));
        values.insert(KEY_SYSTEM_PROMPT.to_string(), json!(self.system_prompt));
        values.insert(KEY_AUTO_SUMMARIZE.to_string(), json!(self.auto_summarize));
        values
    }
}

/// Storage key holding the limit of `budget`
pub fn budget_key(budget: ContentBudget) -> &'static str {
    match budget {
        ContentBudget::Tokens(_) => KEY_MAX_TOKENS,
        ContentBudget::Characters(_) => KEY_MAX_LENGTH,
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Positive integer limit stored as a number or a numeric string
fn value_as_limit(value: &Value) -> Option<usize> {
    let limit = match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }?;
    (limit > 0).then_some(limit)
}
