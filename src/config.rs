use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    video::sink::{default_candidates, EncoderCandidate},
};

/// Main configuration for frame-sweep
///
/// Only collaborator settings live here. Transform parameters (contrast
/// curve, final angle, rotation center) are passed as arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Encoder and decoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Pipeline run settings
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.encoder.validate()?;
        self.run.validate()?;
        Ok(())
    }
}

/// ffmpeg collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// ffmpeg binary name or path
    pub ffmpeg: String,

    /// ffprobe binary name or path
    pub ffprobe: String,

    /// Output quality (1-100, higher is better)
    pub quality: u8,

    /// Container/codec pairs tried in order when opening an output
    pub candidates: Vec<EncoderCandidate>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            quality: 85,
            candidates: default_candidates(),
        }
    }
}

impl EncoderConfig {
    fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "encoder.quality".to_string(),
                value: self.quality.to_string()
            }.into());
        }

        if self.candidates.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "encoder.candidates".to_string(),
                value: "[]".to_string()
            }.into());
        }

        let incomplete = |c: &&EncoderCandidate| c.extension.is_empty() || c.codec.is_empty();
        if let Some(bad) = self.candidates.iter().find(incomplete) {
            return Err(ConfigError::InvalidValue {
                key: "encoder.candidates".to_string(),
                value: bad.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Pipeline run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// How many progress lines to log over a clip
    pub progress_report_steps: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            progress_report_steps: 10,
        }
    }
}

impl RunConfig {
    fn validate(&self) -> Result<()> {
        if self.progress_report_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "run.progress_report_steps".to_string(),
                value: self.progress_report_steps.to_string()
            }.into());
        }

        Ok(())
    }
}
