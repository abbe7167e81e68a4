use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use url::Url;

use crate::connection::ReconnectPolicy;

pub const CONFIG_DIRECTORY_NAME: &str = "alpaca";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const ENV_PREFIX: &str = "ALPACA_";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl ReconnectSettings {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_retries: self.max_retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    /// Overrides where preferences are stored.
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            reconnect: ReconnectSettings::default(),
            preferences_path: None,
        }
    }
}

impl ClientConfig {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(CONFIG_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".alpaca"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(CONFIG_FILE_NAME)
    }

    /// Defaults, then the JSON file at `path` if present, then `ALPACA_*`
    /// environment variables (`__` separates nested keys).
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(ClientConfig::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_config_path();
        tracing::debug!(path = %path.display(), "loading client config");
        Self::from_figment(Self::figment(&path))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config = figment
            .extract::<ClientConfig>()
            .map_err(Box::new)
            .context(ExtractSnafu {
                stage: "extract-client-config",
            })?;
        config.server_url()?;
        Ok(config)
    }

    pub fn server_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.server_url.trim()).context(InvalidServerUrlSnafu {
            stage: "validate-server-url",
            raw: self.server_url.clone(),
        })
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(crate::preferences::PreferencesStore::default_path)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read client config on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        source: Box<figment::Error>,
    },
    #[snafu(display("server URL '{raw}' is invalid on `{stage}`: {source}"))]
    InvalidServerUrl {
        stage: &'static str,
        raw: String,
        source: url::ParseError,
    },
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> Result<ClientConfig, ConfigError> {
        ClientConfig::from_figment(
            Figment::from(Serialized::defaults(ClientConfig::default())).merge(Json::string(json)),
        )
    }

    #[test]
    fn defaults_match_a_local_server() {
        let config = from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.server_url().unwrap().as_str(), "http://localhost:5000/");
        assert_eq!(
            config.reconnect.policy(),
            ReconnectPolicy {
                base_delay: Duration::from_secs(1),
                max_retries: 3,
            }
        );
    }

    #[test]
    fn file_values_override_nested_defaults() {
        let config = from_json(
            r#"{"server_url": "https://chat.example.test", "reconnect": {"max_retries": 0}}"#,
        )
        .unwrap();
        assert_eq!(config.server_url, "https://chat.example.test");
        assert_eq!(config.reconnect.max_retries, 0);
        assert_eq!(config.reconnect.base_delay_ms, 1000);
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        let error = from_json(r#"{"server_url": "not a url"}"#).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidServerUrl { .. }));
    }

    #[test]
    fn wrong_types_fail_extraction() {
        let error = from_json(r#"{"reconnect": {"max_retries": "many"}}"#).unwrap_err();
        assert!(matches!(error, ConfigError::Extract { .. }));
    }

    #[test]
    fn explicit_preferences_path_wins() {
        let config = from_json(r#"{"preferences_path": "/tmp/prefs.json"}"#).unwrap();
        assert_eq!(config.preferences_path(), PathBuf::from("/tmp/prefs.json"));
    }
}
