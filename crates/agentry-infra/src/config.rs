//! Global configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.agentry/` in production)
//! and deserializes it into [`Settings`]. Falls back to sensible defaults
//! when the file is missing or malformed. Environment variables override the
//! file; credentials come from the environment only and never live in the
//! file.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

/// Environment variables consulted for the LLM API key, in priority order.
const LLM_API_KEY_VARS: &[&str] = &["AGENTRY_LLM_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Address the HTTP API binds to.
    pub bind_addr: String,
    /// SQLite URL; derived from the data directory when absent.
    pub database_url: Option<String>,
    pub llm: LlmSettings,
    pub poll: PollSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            database_url: None,
            llm: LlmSettings::default(),
            poll: PollSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmSettings {
    /// Provider name recorded in logs.
    pub provider: String,
    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            base_url: "https://api.openai.com/v1".into(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    pub twitter_secs: u64,
    pub telegram_secs: u64,
    /// How often the autonomous scheduler rescans agent configs.
    pub autonomous_rescan_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            twitter_secs: 60,
            telegram_secs: 5,
            autonomous_rescan_secs: 60,
        }
    }
}

/// The data directory: `AGENTRY_DATA_DIR` when set, else `~/.agentry`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AGENTRY_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agentry")
}

/// Load settings from `{data_dir}/config.toml`, then apply env overrides.
///
/// - If the file does not exist, starts from [`Settings::default()`].
/// - If the file exists but fails to parse, logs a warning and starts from
///   the default.
pub async fn load_settings(data_dir: &Path) -> Settings {
    let config_path = data_dir.join("config.toml");

    let mut settings = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => match toml::from_str::<Settings>(&content) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(
                    "failed to parse {}: {err}, using defaults",
                    config_path.display()
                );
                Settings::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            Settings::default()
        }
        Err(err) => {
            tracing::warn!(
                "failed to read {}: {err}, using defaults",
                config_path.display()
            );
            Settings::default()
        }
    };

    settings.apply_env_with(|name| std::env::var(name).ok());
    settings
}

impl Settings {
    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("AGENTRY_BIND") {
            self.bind_addr = bind;
        }
        if let Some(url) = lookup("AGENTRY_DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(base_url) = lookup("AGENTRY_LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(provider) = lookup("AGENTRY_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
    }
}

/// The LLM API key from the environment, if any.
pub fn llm_api_key() -> Option<SecretString> {
    LLM_API_KEY_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(settings.poll.telegram_secs, 5);
    }

    #[tokio::test]
    async fn test_valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
bind_addr = "0.0.0.0:9000"

[llm]
base_url = "http://localhost:11434/v1"
provider = "ollama"

[poll]
twitter_secs = 300
"#,
        )
        .await
        .unwrap();

        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.bind_addr, "0.0.0.0:9000");
        assert_eq!(settings.llm.provider, "ollama");
        assert_eq!(settings.poll.twitter_secs, 300);
        // Unset fields keep their defaults.
        assert_eq!(settings.poll.telegram_secs, 5);
    }

    #[tokio::test]
    async fn test_invalid_toml_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml")
            .await
            .unwrap();

        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut settings = Settings::default();
        settings.apply_env_with(|name| match name {
            "AGENTRY_BIND" => Some("0.0.0.0:8888".into()),
            "AGENTRY_DATABASE_URL" => Some("sqlite:///tmp/agentry-test.db".into()),
            _ => None,
        });

        assert_eq!(settings.bind_addr, "0.0.0.0:8888");
        assert_eq!(
            settings.database_url.as_deref(),
            Some("sqlite:///tmp/agentry-test.db")
        );
        assert_eq!(settings.llm.provider, "openai");
    }
}
