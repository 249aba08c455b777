//! Configuration management for mockup.
//!
//! Loads configuration from ${MOCKUP_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::gemini::{DEFAULT_IMAGE_MODEL, GeminiConfig, GeminiImageOptions};

/// Commented template written by `mockup config init`.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for mockup configuration.
    //!
    //! MOCKUP_HOME resolution order:
    //! 1. MOCKUP_HOME environment variable (if set)
    //! 2. ~/.config/mockup (default)

    use std::path::PathBuf;

    /// Returns the mockup home directory.
    pub fn mockup_home() -> PathBuf {
        if let Ok(home) = std::env::var("MOCKUP_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("mockup")
    }

    /// `${MOCKUP_HOME}/config.toml`.
    pub fn config_path() -> PathBuf {
        mockup_home().join("config.toml")
    }
}

/// Credentials and endpoint for the image service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Takes precedence over `GEMINI_API_KEY`.
    pub api_key: Option<String>,
    /// Endpoint override; `GEMINI_BASE_URL` wins over it.
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gemini: ProviderConfig,
}

/// Settings loaded from `config.toml`. Missing keys fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image-capable model used for generate and edit requests
    pub model: String,

    /// File stem for saved mockups
    pub output_name: String,

    /// Output aspect ratio hint
    pub aspect_ratio: Option<String>,

    /// Output size preset
    pub image_size: Option<String>,

    /// Timeout for a single request in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// Provider configuration (API keys, base URLs).
    pub providers: ProvidersConfig,
}

impl Config {
    const DEFAULT_OUTPUT_NAME: &str = "mockup";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 120;

    /// Loads `${MOCKUP_HOME}/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Missing file means defaults.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the commented template to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Returns the request timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        }
    }

    /// Returns the output file stem, falling back to the default when blank.
    pub fn effective_output_name(&self) -> &str {
        let trimmed = self.output_name.trim();
        if trimmed.is_empty() {
            Self::DEFAULT_OUTPUT_NAME
        } else {
            trimmed
        }
    }

    pub fn image_options(&self) -> GeminiImageOptions {
        GeminiImageOptions {
            aspect_ratio: self.aspect_ratio.clone(),
            image_size: self.image_size.clone(),
        }
    }

    /// Builds the Gemini client config, honoring an optional model override.
    ///
    /// # Errors
    /// Returns an error if no API key is available or the base URL is invalid.
    pub fn gemini_config(&self, model_override: Option<&str>) -> Result<GeminiConfig> {
        let model = model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.model)
            .to_string();

        GeminiConfig::from_env(
            model,
            self.providers.gemini.effective_base_url(),
            self.providers.gemini.effective_api_key(),
            self.image_options(),
            self.request_timeout(),
        )
    }

    /// Temp file plus rename, creating parent directories first.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_IMAGE_MODEL.to_string(),
            output_name: Self::DEFAULT_OUTPUT_NAME.to_string(),
            aspect_ratio: None,
            image_size: None,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            providers: ProvidersConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.output_name, "mockup");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "aspect_ratio = \"4:5\"\n[providers.gemini]\nbase_url = \"http://localhost:9999\"\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.aspect_ratio.as_deref(), Some("4:5"));
        assert_eq!(
            config.providers.gemini.effective_base_url(),
            Some("http://localhost:9999")
        );
        assert_eq!(config.providers.gemini.effective_api_key(), None);
    }

    #[test]
    fn load_invalid_toml_is_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "model = ").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("gemini-2.5-flash-image"));
        assert!(contents.contains("# aspect_ratio ="));

        let loaded = Config::load_from(&config_path).unwrap();
        assert_eq!(loaded.model, Config::default().model);
        assert_eq!(loaded.output_name, Config::default().output_name);
    }

    #[test]
    fn init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn request_timeout_zero_disables() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn blank_output_name_falls_back() {
        let config = Config {
            output_name: "  ".to_string(),
            ..Config::default()
        };
        assert_eq!(config.effective_output_name(), "mockup");
    }

    #[test]
    fn gemini_config_uses_override_and_config_key() {
        let config = Config {
            providers: ProvidersConfig {
                gemini: ProviderConfig {
                    api_key: Some("config-key".to_string()),
                    base_url: None,
                },
            },
            aspect_ratio: Some("1:1".to_string()),
            ..Config::default()
        };

        let gemini = config.gemini_config(Some("gemini-test-image")).unwrap();
        assert_eq!(gemini.model, "gemini-test-image");
        assert_eq!(gemini.api_key, "config-key");
        assert_eq!(gemini.options.aspect_ratio.as_deref(), Some("1:1"));
    }
}
