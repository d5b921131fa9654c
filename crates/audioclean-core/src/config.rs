//! Configuration management for audioclean

use crate::error::ConfigError;
use audioclean_enhance::ModelConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub output: OutputConfig,
    pub batch: BatchConfig,
    pub temp: TempConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the archive (and split outputs) are written
    pub directory: PathBuf,
    /// File name of the bundled archive
    pub archive_name: String,
    /// WAV sample encoding
    pub sample_format: SampleFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Int16,
    Int24,
    Float32,
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleFormat::Int16 => write!(f, "16-bit PCM"),
            SampleFormat::Int24 => write!(f, "24-bit PCM"),
            SampleFormat::Float32 => write!(f, "32-bit float"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// What to do when two uploads map to the same archive entry
    pub on_duplicate: DuplicatePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Append " (2)", " (3)", ... before the extension
    Rename,
    /// Abort the batch before any processing
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempConfig {
    /// Remove the scratch directory after each batch
    pub cleanup: bool,
    /// Custom scratch root (uses system temp if not set)
    pub directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            output: OutputConfig {
                directory: PathBuf::from("."),
                archive_name: "enhanced_audio.zip".to_string(),
                sample_format: SampleFormat::Int16,
            },
            batch: BatchConfig {
                on_duplicate: DuplicatePolicy::Rename,
            },
            temp: TempConfig {
                cleanup: true,
                directory: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Load from default config directory
        if let Some(path) = Self::default_path() {
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::LoadError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        // Nested keys use a double underscore: AUDIOCLEAN_MODEL__STRENGTH
        figment = figment.merge(Env::prefixed("AUDIOCLEAN_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/audioclean/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("audioclean/config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.model.strength) {
            return Err(ConfigError::InvalidValue(format!(
                "model.strength must be within [0, 1], got {}",
                self.model.strength
            )));
        }
        if self.output.archive_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "output.archive_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Get scratch root
    pub fn temp_dir(&self) -> PathBuf {
        self.temp.directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.archive_name, "enhanced_audio.zip");
        assert_eq!(config.batch.on_duplicate, DuplicatePolicy::Rename);
        assert_eq!(config.output.sample_format, SampleFormat::Int16);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[model]
strength = 0.5

[output]
sample_format = "float32"

[batch]
on_duplicate = "fail"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.model.strength, 0.5);
        assert_eq!(config.output.sample_format, SampleFormat::Float32);
        assert_eq!(config.batch.on_duplicate, DuplicatePolicy::Fail);
        // Untouched keys keep their defaults
        assert_eq!(config.output.archive_name, "enhanced_audio.zip");
        assert!(config.temp.cleanup);
    }

    #[test]
    fn test_rejects_out_of_range_strength() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[model]\nstrength = 3.0\n").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(Some(&dir.path().join("nope.toml"))),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
