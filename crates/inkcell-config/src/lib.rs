use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Debounce and echo timings for the sync engine, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Pure formatting-mark changes
    pub format_debounce_ms: u64,
    /// Text insertion and structural edits
    pub text_debounce_ms: u64,
    /// How long to wait for the surface to report our own installation
    pub echo_timeout_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            format_debounce_ms: 50,
            text_debounce_ms: 300,
            echo_timeout_ms: 100,
        }
    }
}

impl SyncSettings {
    pub fn format_debounce(&self) -> Duration {
        Duration::from_millis(self.format_debounce_ms)
    }

    pub fn text_debounce(&self) -> Duration {
        Duration::from_millis(self.text_debounce_ms)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub notebook_path: PathBuf,
    #[serde(default)]
    pub sync: SyncSettings,
}

impl Config {
    pub fn new(notebook_path: impl Into<PathBuf>) -> Self {
        Self {
            notebook_path: notebook_path.into(),
            sync: SyncSettings::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the notebook path
        config.notebook_path =
            Self::expand_path(&config.notebook_path).unwrap_or(config.notebook_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/inkcell");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/inkcell/config.toml"));
    }

    #[test]
    fn test_sync_section_is_optional() {
        let config: Config = toml::from_str(r#"notebook_path = "/tmp/demo.json""#).unwrap();

        assert_eq!(config.sync, SyncSettings::default());
        assert_eq!(config.sync.format_debounce(), Duration::from_millis(50));
        assert_eq!(config.sync.text_debounce(), Duration::from_millis(300));
        assert_eq!(config.sync.echo_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_sync_section_keeps_other_defaults() {
        let config_content = r#"
notebook_path = "/tmp/demo.json"

[sync]
text_debounce_ms = 500
"#;
        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.sync.text_debounce_ms, 500);
        assert_eq!(config.sync.format_debounce_ms, 50);
        assert_eq!(config.sync.echo_timeout_ms, 100);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/demo.json");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/demo.json"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("INKCELL_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$INKCELL_TEST_VAR/demo.json");
        let expanded = Config::expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/path/demo.json"));

        unsafe {
            env::remove_var("INKCELL_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_relative_path() {
        let path = PathBuf::from("relative/demo.json");
        assert_eq!(Config::expand_path(&path).unwrap(), path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_toml_reports_the_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "notebook_path = ").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::ConfigParseError { config_path, .. } if *config_path == config_file
        ));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/config.toml");
        let mut test_config = Config::new("/tmp/demo.cells.json");
        test_config.sync.echo_timeout_ms = 250;

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config.notebook_path, test_config.notebook_path);
        assert_eq!(loaded_config.sync, test_config.sync);
    }
}
