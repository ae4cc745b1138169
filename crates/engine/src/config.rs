//! Engine configuration, read from TOML.
//!
//! ```toml
//! database_path = "/var/lib/sitecms/content.db"
//! busy_timeout_ms = 5000
//!
//! [scope_titles]
//! mittelstand = "Digitalisierung im Mittelstand"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

pub const IN_MEMORY: &str = ":memory:";

fn default_busy_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// SQLite file path, or `:memory:`.
    pub database_path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Titles for scopes created on first write. Overrides the built-in table.
    #[serde(default)]
    pub scope_titles: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl EngineConfig {
    pub fn in_memory() -> Self {
        Self {
            database_path: IN_MEMORY.to_string(),
            busy_timeout_ms: default_busy_timeout_ms(),
            scope_titles: BTreeMap::new(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "busy_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if let Some((slug, _)) = self
            .scope_titles
            .iter()
            .find(|(slug, title)| slug.trim().is_empty() || title.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "scope_titles",
                reason: format!("blank slug or title for entry {slug:?}"),
            });
        }
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = EngineConfig::from_toml_str(
            r#"
            database_path = "/tmp/content.db"
            busy_timeout_ms = 250

            [scope_titles]
            mittelstand = "Digitalisierung im Mittelstand"
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path, "/tmp/content.db");
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.scope_titles.get("mittelstand").map(String::as_str),
            Some("Digitalisierung im Mittelstand")
        );
        assert!(!config.is_in_memory());
    }

    #[test]
    fn applies_defaults() {
        let config = EngineConfig::from_toml_str(r#"database_path = ":memory:""#).unwrap();
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.scope_titles.is_empty());
        assert!(config.is_in_memory());
    }

    #[test]
    fn rejects_invalid_values() {
        let zero = EngineConfig::from_toml_str(
            r#"
            database_path = "a.db"
            busy_timeout_ms = 0
            "#,
        );
        assert!(matches!(
            zero,
            Err(ConfigError::InvalidValue { field: "busy_timeout_ms", .. })
        ));

        let blank = EngineConfig::from_toml_str(r#"database_path = " ""#);
        assert!(matches!(
            blank,
            Err(ConfigError::InvalidValue { field: "database_path", .. })
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = EngineConfig::from_toml_str(
            r#"
            database_path = "a.db"
            cache = true
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
