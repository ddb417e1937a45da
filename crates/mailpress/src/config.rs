//! Service configuration.
//!
//! A JSON file under the platform config dir holds the stable
//! settings; secrets come from the environment and override whatever
//! the file says.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration of the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database path.
    pub database_path: String,
    /// Directory holding raw message blobs.
    pub mail_dir: String,
    /// Base URL for read links in notifications and alerts.
    pub read_link_base: String,
    /// Chat model used for summarization and translation.
    pub model: String,
    /// OpenAI API key; normally supplied via `OPENAI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    /// Operator webhook for the received-mail log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_webhook_url: Option<String>,
    /// Operator webhook for unknown-sender alerts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_sender_webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailpress");
        Self {
            database_path: data_dir.join("mailpress.db").to_string_lossy().into_owned(),
            mail_dir: data_dir.join("mail").to_string_lossy().into_owned(),
            read_link_base: "https://mailpress.example".to_string(),
            model: "gpt-4o-mini".to_string(),
            openai_api_key: None,
            log_webhook_url: None,
            unknown_sender_webhook_url: None,
        }
    }
}

impl Config {
    /// Path of the config file.
    #[must_use]
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailpress")
            .join("config.json")
    }

    /// Loads the config file, falling back to defaults when it does
    /// not exist, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        let path = Self::path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config: {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("MAILPRESS_LOG_WEBHOOK_URL") {
            self.log_webhook_url = Some(url);
        }
        if let Ok(url) = std::env::var("MAILPRESS_UNKNOWN_SENDER_WEBHOOK_URL") {
            self.unknown_sender_webhook_url = Some(url);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_as_json() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.database_path, config.database_path);
        assert_eq!(restored.model, "gpt-4o-mini");
        assert!(restored.openai_api_key.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{
            "database_path": "/tmp/mp.db",
            "mail_dir": "/tmp/mail",
            "read_link_base": "https://mail.press",
            "model": "gpt-4o"
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert!(config.log_webhook_url.is_none());
    }
}
