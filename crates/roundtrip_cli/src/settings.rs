//! User settings stored as JSON.
//!
//! The file is looked up at `$ROUNDTRIP_CONFIG_PATH`, then
//! `$XDG_CONFIG_HOME/roundtrip/config.json`, then
//! `~/.config/roundtrip/config.json`. A missing file means defaults.

use roundtrip_sync_engine::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the settings path.
pub const CONFIG_PATH_ENV: &str = "ROUNDTRIP_CONFIG_PATH";

const MASK: &str = "********";

/// Errors loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// No settings path could be determined.
    #[error("cannot determine the configuration directory; set ROUNDTRIP_CONFIG_PATH")]
    NoConfigDir,

    /// The settings file exists but cannot be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// Settings path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for the settings shape.
    #[error("invalid settings in {}: {source}", .path.display())]
    Parse {
        /// Settings path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// All user settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP behavior.
    pub connection_config: ConnectionConfig,
    /// Credentials.
    pub auth: AuthConfig,
}

/// HTTP retry and TLS behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Retry failed requests with exponential backoff.
    pub backoff_and_retry: bool,
    /// Backoff multiplier.
    pub backoff_factor: u32,
    /// Upper bound of a single backoff, in seconds.
    pub max_backoff_seconds: u64,
    /// Retries after the first attempt.
    pub max_backoff_retries: u32,
    /// Status codes that trigger a retry.
    pub retry_status_codes: Vec<u16>,
    /// Verify TLS certificates.
    pub verify_ssl: bool,
    /// Per-request timeout, in seconds.
    pub timeout_seconds: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            backoff_and_retry: true,
            backoff_factor: 2,
            max_backoff_seconds: 60,
            max_backoff_retries: 5,
            retry_status_codes: vec![413, 429, 502, 503, 504],
            verify_ssl: true,
            timeout_seconds: 60,
        }
    }
}

impl ConnectionConfig {
    /// Converts the settings into the engine's retry configuration.
    pub fn retry_config(&self) -> RetryConfig {
        if !self.backoff_and_retry {
            return RetryConfig::no_retry();
        }
        RetryConfig::new(self.max_backoff_retries.saturating_add(1))
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(f64::from(self.backoff_factor))
            .with_max_delay(Duration::from_secs(self.max_backoff_seconds))
            .with_retry_status_codes(self.retry_status_codes.clone())
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Credentials per service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Confluence instance.
    pub confluence: ApiDetails,
}

/// Location and credentials of one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiDetails {
    /// Base URL, including any context path such as `/wiki`.
    pub url: String,
    /// User name for basic authentication.
    pub username: String,
    /// API token for basic authentication.
    pub api_token: String,
    /// Personal access token; takes precedence over basic authentication.
    pub pat: String,
}

impl ApiDetails {
    /// Returns true if either a PAT or a username/token pair is set.
    pub fn has_credentials(&self) -> bool {
        !self.pat.is_empty() || (!self.username.is_empty() && !self.api_token.is_empty())
    }
}

impl Settings {
    /// Loads settings from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns a copy safe to print: tokens are replaced by a mask.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        let confluence = &mut masked.auth.confluence;
        for secret in [&mut confluence.api_token, &mut confluence.pat] {
            if !secret.is_empty() {
                *secret = MASK.to_string();
            }
        }
        masked
    }
}

/// Resolves the settings path from the process environment.
pub fn config_path() -> Result<PathBuf, SettingsError> {
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    resolve_config_path(|name| std::env::var(name).ok(), home)
}

/// Resolves the settings path from an environment lookup and a home directory.
pub fn resolve_config_path(
    env: impl Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> Result<PathBuf, SettingsError> {
    let non_empty = |name: &str| env(name).filter(|value| !value.is_empty());

    if let Some(path) = non_empty(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    if let Some(config_home) = non_empty("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home)
            .join("roundtrip")
            .join("config.json"));
    }
    home.map(|home| home.join(".config").join("roundtrip").join("config.json"))
        .ok_or(SettingsError::NoConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn connection_defaults() {
        let config = ConnectionConfig::default();
        assert!(config.backoff_and_retry);
        assert_eq!(config.backoff_factor, 2);
        assert_eq!(config.max_backoff_seconds, 60);
        assert_eq!(config.max_backoff_retries, 5);
        assert_eq!(config.retry_status_codes, vec![413, 429, 502, 503, 504]);
        assert!(config.verify_ssl);
    }

    #[test]
    fn retry_config_from_settings() {
        let retry = ConnectionConfig::default().retry_config();
        assert_eq!(retry.max_attempts, 6);
        assert!(retry.should_retry_status(429));

        let disabled = ConnectionConfig {
            backoff_and_retry: false,
            ..ConnectionConfig::default()
        };
        assert_eq!(disabled.retry_config().max_attempts, 1);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"auth": {"confluence": {"url": "https://example.atlassian.net"}},
                "connection_config": {"verify_ssl": false}}"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.auth.confluence.url, "https://example.atlassian.net");
        assert!(!settings.connection_config.verify_ssl);
        assert_eq!(settings.connection_config.backoff_factor, 2);
    }

    #[test]
    fn missing_file_is_default_and_invalid_json_is_error() {
        let dir = tempdir().unwrap();
        assert_eq!(
            Settings::load(&dir.path().join("absent.json")).unwrap(),
            Settings::default()
        );

        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn masking_hides_tokens_only() {
        let mut settings = Settings::default();
        settings.auth.confluence.username = "jdoe".into();
        settings.auth.confluence.api_token = "secret".into();

        let masked = settings.masked();
        assert_eq!(masked.auth.confluence.username, "jdoe");
        assert_eq!(masked.auth.confluence.api_token, MASK);
        assert_eq!(masked.auth.confluence.pat, "");
    }

    #[test]
    fn credentials_check() {
        let mut details = ApiDetails::default();
        assert!(!details.has_credentials());
        details.username = "jdoe".into();
        assert!(!details.has_credentials());
        details.api_token = "token".into();
        assert!(details.has_credentials());
        assert!(ApiDetails {
            pat: "pat".into(),
            ..ApiDetails::default()
        }
        .has_credentials());
    }

    #[test]
    fn path_resolution_order() {
        let home = Some(PathBuf::from("/home/u"));

        let explicit = resolve_config_path(
            |name| (name == CONFIG_PATH_ENV).then(|| "/etc/rt.json".to_string()),
            home.clone(),
        )
        .unwrap();
        assert_eq!(explicit, PathBuf::from("/etc/rt.json"));

        let xdg = resolve_config_path(
            |name| (name == "XDG_CONFIG_HOME").then(|| "/xdg".to_string()),
            home.clone(),
        )
        .unwrap();
        assert_eq!(xdg, PathBuf::from("/xdg/roundtrip/config.json"));

        let fallback = resolve_config_path(|_| None, home).unwrap();
        assert_eq!(fallback, PathBuf::from("/home/u/.config/roundtrip/config.json"));

        assert!(matches!(
            resolve_config_path(|_| None, None),
            Err(SettingsError::NoConfigDir)
        ));
    }
}
