//! Global bot settings - a read-only name→value table.
//!
//! Settings are loaded once and handed into the evaluator as an explicit
//! object; template tags that need a process-wide value (the bot's name,
//! its version string) read it from here rather than from ambient state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading bot settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("malformed settings document: {0}")]
    Malformed(#[from] toml::de::Error),

    #[error("setting `{key}` is not a string")]
    NonStringValue { key: String },
}

/// Read-only global settings for a bot instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotSettings {
    values: HashMap<String, String>,
}

impl BotSettings {
    /// Create an empty settings table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a setting, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Load settings from a flat TOML table of string values.
    pub fn from_toml(document: &str) -> Result<Self, SettingsError> {
        let table: toml::Table = document.parse()?;

        let mut values = HashMap::new();
        for (key, value) in table {
            // Non-string scalars are common in hand-edited files;
            // stringify them rather than rejecting the document.
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                _ => return Err(SettingsError::NonStringValue { key }),
            };
            values.insert(key, value);
        }

        Ok(Self { values })
    }

    /// Look up a setting by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of settings in the table.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let settings = BotSettings::new()
            .with("name", "Reni")
            .with("version", "0.1.0");

        assert_eq!(settings.get("name"), Some("Reni"));
        assert_eq!(settings.get("version"), Some("0.1.0"));
        assert_eq!(settings.get("missing"), None);
        assert_eq!(settings.len(), 2);
    }

    #[test]
    fn test_from_toml() {
        let settings = BotSettings::from_toml(
            r#"
            name = "Reni"
            version = "0.1.0"
            max-sessions = 20
            "#,
        )
        .unwrap();

        assert_eq!(settings.get("name"), Some("Reni"));
        assert_eq!(settings.get("max-sessions"), Some("20"));
    }

    #[test]
    fn test_from_toml_rejects_tables() {
        let result = BotSettings::from_toml("nested = { a = 1 }");
        assert!(matches!(
            result,
            Err(SettingsError::NonStringValue { key }) if key == "nested"
        ));
    }

    #[test]
    fn test_from_toml_malformed() {
        assert!(matches!(
            BotSettings::from_toml("not valid toml ="),
            Err(SettingsError::Malformed(_))
        ));
    }
}
