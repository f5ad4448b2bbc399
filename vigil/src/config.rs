//! Configuration management for vigil.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (VIGIL_*)
//! 2. Config file ($VIGIL_CONFIG or <data dir>/config.toml)
//! 3. Default values

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vigil_core::SessionConfig;

use crate::error::{VigilError, VigilResult};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Session timing and probe settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Paths
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base directory for vigil data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite session store
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "vigil", "vigil") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vigil")
    }
}

fn default_database_path() -> PathBuf {
    default_data_dir().join("sessions.db")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: default_database_path(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        Ok(Self::from_toml(&content).context("Failed to parse config file")?)
    }

    pub fn from_toml(content: &str) -> VigilResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> VigilResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = self.to_toml().context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("VIGIL_CONFIG") {
            PathBuf::from(path)
        } else {
            default_data_dir().join("config.toml")
        }
    }

    /// Apply `VIGIL_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("VIGIL_DATABASE_PATH").filter(|p| !p.is_empty()) {
            self.paths.database_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("VIGIL_PROBE_HOST").filter(|h| !h.trim().is_empty()) {
            self.session.probe_host = host;
        }
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> VigilResult<()> {
        std::fs::create_dir_all(&self.paths.data_dir)?;
        if let Some(parent) = self.paths.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Reject a config the session guard cannot run with.
    pub fn validate(&self) -> VigilResult<()> {
        self.session
            .validate()
            .map_err(|e| VigilError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use vigil_core::ProbeMethod;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.session.timeout_minutes, 2);
        assert_eq!(config.session.check_interval_secs, 30);
        assert_eq!(config.session.latency_threshold_ms, 200);
        assert!(config.paths.database_path.ends_with("sessions.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [session]
            timeout_minutes = 5
            probe_method = "ping"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.timeout_minutes, 5);
        assert_eq!(config.session.probe_method, ProbeMethod::Ping);
        assert_eq!(config.session.check_interval_secs, 30);
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("[session\ntimeout_minutes = ").unwrap_err();
        assert!(matches!(err, VigilError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = Config::from_toml("[session]\ncheck_interval_secs = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(VigilError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().expect("Failed to create temp dir");
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.session.probe_host = "example.com".to_string();
        config.paths.database_path = temp.path().join("sessions.db");

        config.save_to(&path).expect("Failed to save config");
        assert!(path.exists());

        let loaded = Config::load_from(&path).expect("Failed to load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp = tempdir().expect("Failed to create temp dir");
        let loaded = Config::load_from(&temp.path().join("missing.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VIGIL_DATABASE_PATH", "/tmp/vigil-test.db"),
            ("VIGIL_PROBE_HOST", "internal.example"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.paths.database_path, PathBuf::from("/tmp/vigil-test.db"));
        assert_eq!(config.session.probe_host, "internal.example");
    }

    #[test]
    fn test_blank_env_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_ensure_dirs_creates_directories() {
        let temp = tempdir().expect("Failed to create temp dir");
        let config = Config {
            paths: PathsConfig {
                data_dir: temp.path().join("data"),
                database_path: temp.path().join("db").join("sessions.db"),
            },
            ..Config::default()
        };

        assert!(!config.paths.data_dir.exists());
        config.ensure_dirs().expect("Failed to create directories");

        assert!(config.paths.data_dir.exists());
        assert!(temp.path().join("db").exists());
    }
}
