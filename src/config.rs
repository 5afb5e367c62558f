//! Runtime settings, read from a TOML file.
//!
//! Every field has a default, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

/// Transport behaviour. The request engine itself never times out; these
/// only configure the HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Whole-request timeout in milliseconds. Must be greater than 0.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
    /// Only used when `follow_redirects` is true.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Disabling this accepts invalid or self-signed certificates.
    #[serde(default = "default_true")]
    pub validate_ssl: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            follow_redirects: true,
            max_redirects: default_max_redirects(),
            validate_ssl: true,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to `<data dir>/dispatch/history.jsonl`.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            file: None,
        }
    }
}

impl HistorySettings {
    pub fn resolved_file(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(|| {
            let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            base.join("dispatch").join("history.jsonl")
        })
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_redirects() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("dispatch/{}", env!("CARGO_PKG_VERSION"))
}

impl Settings {
    /// Load settings from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let settings = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str::<Settings>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => return Err(e.into()),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Default location: `<config dir>/dispatch/config.toml`.
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("dispatch").join("config.toml")
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.network.timeout_ms == 0 {
            return Err(AppError::validation("network.timeout_ms must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.network.timeout_ms, 30_000);
        assert!(s.network.follow_redirects);
        assert_eq!(s.network.max_redirects, 10);
        assert!(s.history.enabled);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let s: Settings = toml::from_str("[network]\ntimeout_ms = 500\n").unwrap();
        assert_eq!(s.network.timeout_ms, 500);
        assert!(s.network.validate_ssl);
        assert!(s.history.file.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let s: Settings = toml::from_str("[network]\ntimeout_ms = 0\n").unwrap();
        assert!(matches!(s.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(s.network.timeout_ms, 30_000);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[history]\nenabled = false\nfile = \"/tmp/h.jsonl\"\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert!(!s.history.enabled);
        assert_eq!(s.history.resolved_file(), PathBuf::from("/tmp/h.jsonl"));
    }
}
