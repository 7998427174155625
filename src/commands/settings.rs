//! `sidekick settings` handlers

use crate::cli::SettingsCommand;
use crate::error::Result;
use crate::settings::{
    Settings, KEY_AUTO_SUMMARIZE, KEY_ENDPOINT, KEY_MAX_LENGTH, KEY_MAX_TOKENS, KEY_MODEL,
    KEY_SYSTEM_PROMPT,
};
use crate::storage::SettingsStore;
use colored::Colorize;

/// Every key the settings panel can write
const ALL_KEYS: [&str; 6] = [
    KEY_ENDPOINT,
    KEY_MODEL,
    KEY_MAX_LENGTH,
    KEY_MAX_TOKENS,
    KEY_SYSTEM_PROMPT,
    KEY_AUTO_SUMMARIZE,
];

/// Run a settings subcommand against `store`
pub fn handle_settings(
    command: SettingsCommand,
    store: &dyn SettingsStore,
    defaults: &Settings,
) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let settings = Settings::load(store, defaults)?;
            print_settings(&settings);
        }
        SettingsCommand::Set { key, value } => {
            let settings = set_setting(store, defaults, &key, &value)?;
            println!("{}", "Settings saved!".green());
            print_settings(&settings);
        }
        SettingsCommand::Reset => {
            reset_settings(store)?;
            println!("{}", "Settings reset to defaults".green());
            print_settings(&Settings::load(store, defaults)?);
        }
    }
    Ok(())
}

/// Change one stored setting and return the saved settings
pub fn set_setting(
    store: &dyn SettingsStore,
    defaults: &Settings,
    key: &str,
    value: &str,
) -> Result<Settings> {
    let mut settings = Settings::load(store, defaults)?;
    settings.set_field(key, value)?;
    settings.validate()?;
    settings.save(store)?;
    Ok(settings)
}

/// Remove every stored setting
pub fn reset_settings(store: &dyn SettingsStore) -> Result<()> {
    for key in ALL_KEYS {
        store.remove(key)?;
    }
    tracing::info!("Settings store cleared");
    Ok(())
}

fn print_settings(settings: &Settings) {
    for (key, value) in settings.to_storage_map() {
        println!("{:<14} {}", key.cyan(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::truncation::ContentBudget;
    use serde_json::json;

    #[test]
    fn test_set_setting_validates_before_saving() {
        let store = MemoryStore::new();
        let defaults = Settings::with_budget(ContentBudget::Characters(6000));

        let saved = set_setting(&store, &defaults, KEY_MAX_LENGTH, "1200").unwrap();
        assert_eq!(saved.budget, ContentBudget::Characters(1200));
        assert_eq!(store.get(KEY_MAX_LENGTH).unwrap(), Some(json!(1200)));

        assert!(set_setting(&store, &defaults, KEY_ENDPOINT, "nonsense").is_err());
        assert_eq!(
            store.get(KEY_ENDPOINT).unwrap(),
            Some(json!("http://localhost:11434"))
        );
    }

    #[test]
    fn test_reset_clears_store() {
        let store = MemoryStore::new();
        let defaults = Settings::with_budget(ContentBudget::Tokens(8000));
        set_setting(&store, &defaults, KEY_MODEL, "phi3").unwrap();
        reset_settings(&store).unwrap();
        assert!(store.get(KEY_MODEL).unwrap().is_none());
        assert_eq!(Settings::load(&store, &defaults).unwrap(), defaults);
    }
}
