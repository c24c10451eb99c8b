use crate::errors::{ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the papers suite
///
/// Values come from an optional TOML file overlaid with environment
/// variables; the environment always wins. The Gemini API key is the one
/// setting the server cannot start without.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PapersConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    /// Command used by the host to spawn the tool server.
    pub server_command: Option<String>,
    pub log_level: Option<String>,
}

impl Default for PapersConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: Some("gemini-2.5-pro".to_string()),
            server_command: None,
            log_level: None,
        }
    }
}

impl PapersConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ProviderResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ProviderError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                ProviderError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Default config file location (`<config dir>/papers-cli/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("papers-cli").join("config.toml"))
    }

    /// Loads the default config file (when present) and applies environment
    /// overrides: `GOOGLE_API_KEY`, `PAPERS_MODEL`, `PAPERS_SERVER_CMD`,
    /// `PAPERS_LOG`.
    pub fn load() -> Self {
        let mut config = Self::default_path()
            .and_then(|path| Self::load_from_file(&path).ok())
            .unwrap_or_default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("PAPERS_MODEL") {
            if !model.is_empty() {
                self.model_name = Some(model);
            }
        }
        if let Ok(cmd) = std::env::var("PAPERS_SERVER_CMD") {
            if !cmd.is_empty() {
                self.server_command = Some(cmd);
            }
        }
        if let Ok(level) = std::env::var("PAPERS_LOG") {
            if !level.is_empty() {
                self.log_level = Some(level);
            }
        }
    }

    /// The API key, or a configuration error suitable for startup-fatal
    /// reporting. The generation provider is unusable without it.
    pub fn require_api_key(&self) -> ProviderResult<String> {
        self.api_key.clone().ok_or_else(|| {
            ProviderError::ConfigError(
                "GOOGLE_API_KEY is not set; the generation provider requires it".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = PapersConfig::load_from_file(&path).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.model_name.as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            api_key = "k-123"
            model_name = "gemini-2.0-flash"
            server_command = "target/debug/papers-server"
            "#,
        )
        .unwrap();

        let config = PapersConfig::load_from_file(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.model_name.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(
            config.server_command.as_deref(),
            Some("target/debug/papers-server")
        );
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "api_key = [not toml").unwrap();
        assert!(PapersConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn require_api_key_fails_when_unset() {
        let config = PapersConfig::default();
        assert!(config.require_api_key().is_err());
    }
}
