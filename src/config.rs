use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Fixed development key the API accepts out of the box.
pub const DEFAULT_API_KEY: &str = "cursor-sim-dev-key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .activity-etl.toml.
///
/// All fields are optional — the tool works with zero config, falling back
/// to the fixed dev key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// API key sent as the basic-auth username. If None, falls back to the
    /// ACTIVITY_API_KEY env var.
    pub key: Option<String>,
}

impl Config {
    /// Load configuration from .activity-etl.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".activity-etl.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the API key: config file value takes precedence, falls back
    /// to the ACTIVITY_API_KEY env var, then the fixed dev key.
    pub fn api_key(&self) -> String {
        self.api
            .key
            .clone()
            .or_else(|| std::env::var("ACTIVITY_API_KEY").ok())
            .unwrap_or_else(|| DEFAULT_API_KEY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_key() {
        let config = Config::default();
        assert!(config.api.key.is_none());
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[api]
key = "secret-key"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.key.as_deref(), Some("secret-key"));
        assert_eq!(config.api_key(), "secret-key");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".activity-etl.toml");
        fs::write(&path, "[api]\nkey = \"from-file\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_key(), "from-file");
    }
}
