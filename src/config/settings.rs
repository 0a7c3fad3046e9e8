//! Collaborator settings.
//!
//! Loads and saves `~/.aurafin/config.json`. Each setting resolves with
//! the priority: environment variable > config file > built-in default.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_AI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_AI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;

const DEFAULT_MESSAGING_API: &str = "https://graph.facebook.com/v20.0";
const DEFAULT_MESSAGING_TIMEOUT_SECS: u64 = 15;

/// Contents of `config.json`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraFinConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging: Option<MessagingSettings>,
}

/// AI collaborator section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Messaging section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Resolved AI settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Resolved messaging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingConfig {
    pub api_base: String,
    pub phone_number_id: Option<String>,
    pub access_token: Option<String>,
    pub verify_token: Option<String>,
    pub timeout: Duration,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_secs(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.trim().parse().ok())
}

impl AiConfig {
    /// Resolve from the process environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the config file exists but cannot be read.
    pub fn resolve() -> Result<Self> {
        let file = load_config()?.ai.unwrap_or_default();
        Ok(Self::layer(&file, env_var))
    }

    /// Layer `env` over `file` over the defaults.
    ///
    /// Environment: `AURAFIN_AI_ENDPOINT`, `AURAFIN_AI_MODEL`,
    /// `AURAFIN_AI_KEY` (or `GEMINI_API_KEY`), `AURAFIN_AI_TIMEOUT`.
    pub fn layer(file: &AiSettings, env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            endpoint: env("AURAFIN_AI_ENDPOINT")
                .or_else(|| file.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_AI_ENDPOINT.to_string()),
            model: env("AURAFIN_AI_MODEL")
                .or_else(|| file.model.clone())
                .unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            api_key: env("AURAFIN_AI_KEY")
                .or_else(|| env("GEMINI_API_KEY"))
                .or_else(|| file.api_key.clone()),
            timeout: Duration::from_secs(
                parse_secs(env("AURAFIN_AI_TIMEOUT"))
                    .or(file.timeout_secs)
                    .unwrap_or(DEFAULT_AI_TIMEOUT_SECS),
            ),
        }
    }
}

impl MessagingConfig {
    /// Resolve from the process environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the config file exists but cannot be read.
    pub fn resolve() -> Result<Self> {
        let file = load_config()?.messaging.unwrap_or_default();
        Ok(Self::layer(&file, env_var))
    }

    /// Layer `env` over `file` over the defaults.
    ///
    /// Environment: `WHATSAPP_API_BASE`, `WHATSAPP_PHONE_NUMBER_ID`,
    /// `WHATSAPP_ACCESS_TOKEN`, `WHATSAPP_VERIFY_TOKEN`.
    pub fn layer(file: &MessagingSettings, env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_base: env("WHATSAPP_API_BASE")
                .or_else(|| file.api_base.clone())
                .unwrap_or_else(|| DEFAULT_MESSAGING_API.to_string()),
            phone_number_id: env("WHATSAPP_PHONE_NUMBER_ID")
                .or_else(|| file.phone_number_id.clone()),
            access_token: env("WHATSAPP_ACCESS_TOKEN").or_else(|| file.access_token.clone()),
            verify_token: env("WHATSAPP_VERIFY_TOKEN").or_else(|| file.verify_token.clone()),
            timeout: Duration::from_secs(
                file.timeout_secs.unwrap_or(DEFAULT_MESSAGING_TIMEOUT_SECS),
            ),
        }
    }

    /// The verify token, required for subscription checks.
    ///
    /// # Errors
    ///
    /// Returns `Config` when no verify token is configured.
    pub fn require_verify_token(&self) -> Result<&str> {
        self.verify_token
            .as_deref()
            .ok_or_else(|| Error::Config("no messaging verify token configured".into()))
    }
}

/// Get the config file path.
///
/// # Errors
///
/// Returns `Config` if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    super::global_aurafin_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load `~/.aurafin/config.json`, or defaults when it does not exist.
///
/// # Errors
///
/// Returns `Config` if the file cannot be read or parsed.
pub fn load_config() -> Result<AuraFinConfig> {
    load_config_from(&config_path()?)
}

/// Load a config file, or defaults when it does not exist.
///
/// # Errors
///
/// Returns `Config` if the file cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<AuraFinConfig> {
    if !path.exists() {
        return Ok(AuraFinConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save `~/.aurafin/config.json`.
///
/// # Errors
///
/// Returns `Config` if the file cannot be written.
pub fn save_config(config: &AuraFinConfig) -> Result<()> {
    save_config_to(&config_path()?, config)
}

/// Save a config file, creating its directory.
///
/// # Errors
///
/// Returns `Config` if the file cannot be written.
pub fn save_config_to(path: &Path, config: &AuraFinConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_ai_defaults() {
        let ai = AiConfig::layer(&AiSettings::default(), env_from(&[]));
        assert_eq!(ai.model, DEFAULT_AI_MODEL);
        assert!(ai.api_key.is_none());
        assert_eq!(ai.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_env_beats_file_beats_default() {
        let file = AiSettings {
            model: Some("file-model".into()),
            api_key: Some("file-key".into()),
            timeout_secs: Some(5),
            ..AiSettings::default()
        };

        let ai = AiConfig::layer(&file, env_from(&[("AURAFIN_AI_MODEL", "env-model")]));
        assert_eq!(ai.model, "env-model");
        assert_eq!(ai.api_key.as_deref(), Some("file-key"));
        assert_eq!(ai.timeout, Duration::from_secs(5));
        assert_eq!(ai.endpoint, DEFAULT_AI_ENDPOINT);

        let ai = AiConfig::layer(&file, env_from(&[("GEMINI_API_KEY", "g")]));
        assert_eq!(ai.api_key.as_deref(), Some("g"));
    }

    #[test]
    fn test_messaging_verify_token_required() {
        let m = MessagingConfig::layer(&MessagingSettings::default(), env_from(&[]));
        assert!(matches!(m.require_verify_token(), Err(Error::Config(_))));

        let m = MessagingConfig::layer(
            &MessagingSettings::default(),
            env_from(&[("WHATSAPP_VERIFY_TOKEN", "tok")]),
        );
        assert_eq!(m.require_verify_token().unwrap(), "tok");
        assert_eq!(m.api_base, DEFAULT_MESSAGING_API);
    }

    #[test]
    fn test_config_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");

        assert_eq!(load_config_from(&path).unwrap(), AuraFinConfig::default());

        let config = AuraFinConfig {
            ai: Some(AiSettings {
                model: Some("m".into()),
                ..AiSettings::default()
            }),
            messaging: None,
        };
        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("messaging"));
    }

    #[test]
    fn test_unparsable_config_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(Error::Config(_))));
    }
}
