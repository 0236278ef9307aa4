use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Environment variable that overrides `api_key` from the config file.
pub const API_KEY_ENV: &str = "FXCONV_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub exchangerate: Option<ExchangeRateProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            exchangerate: Some(ExchangeRateProviderConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DefaultsConfig {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_amount")]
    pub amount: f64,
}

fn default_source() -> String {
    "INR".to_string()
}

fn default_target() -> String {
    "USD".to_string()
}

fn default_amount() -> f64 {
    1.0
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            source: default_source(),
            target: default_target(),
            amount: default_amount(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl AppConfig {
    /// Loads the config at the default location, falling back to built-in
    /// defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        self.providers
            .exchangerate
            .as_ref()
            .map_or(DEFAULT_BASE_URL, |p| &p.base_url)
    }

    /// Resolves the API key, preferring the environment over the file.
    pub fn resolve_api_key(&self) -> Result<String> {
        Self::pick_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }

    fn pick_api_key(from_env: Option<String>, from_file: Option<&str>) -> Result<String> {
        let key = from_env
            .filter(|k| !k.trim().is_empty())
            .or_else(|| from_file.map(str::to_string))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        match key {
            Some(key) => Ok(key),
            None => bail!("No API key configured. Set {API_KEY_ENV} or `api_key` in the config file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
api_key: "secret"
providers:
  exchangerate:
    base_url: "http://example.com/rates"
defaults:
  source: "EUR"
  target: "GBP"
  amount: 25.0
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.base_url(), "http://example.com/rates");
        assert_eq!(config.defaults.source, "EUR");
        assert_eq!(config.defaults.target, "GBP");
        assert_eq!(config.defaults.amount, 25.0);
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("api_key: abc\n").unwrap();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.defaults.source, "INR");
        assert_eq!(config.defaults.target, "USD");
        assert_eq!(config.defaults.amount, 1.0);

        let config: AppConfig = serde_yaml::from_str("defaults:\n  source: USD\n").unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.defaults.source, "USD");
        assert_eq!(config.defaults.target, "USD");
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        fs::write(file.path(), "api_key: from-file\n")?;
        let config = AppConfig::load_from_path(file.path())?;
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
        Ok(())
    }

    #[test]
    fn test_load_from_invalid_path() {
        let result = AppConfig::load_from_path("/nonexistent/fxconv/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_api_key_precedence() {
        let key = AppConfig::pick_api_key(Some("env".to_string()), Some("file")).unwrap();
        assert_eq!(key, "env");

        let key = AppConfig::pick_api_key(None, Some(" file ")).unwrap();
        assert_eq!(key, "file");

        let key = AppConfig::pick_api_key(Some("  ".to_string()), Some("file")).unwrap();
        assert_eq!(key, "file");

        let err = AppConfig::pick_api_key(None, None).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
    }
}
