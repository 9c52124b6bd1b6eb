//! Layered configuration for perfseq.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/perfseq/config.toml` (system)
//! 2. `~/.config/perfseq/config.toml` (user)
//! 3. `./perfseq.toml`, or the path given with `--config`
//! 4. Environment variables (`PERFSEQ_*`, plus `RUST_LOG` for the log level)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! data_dir = "~/datasets/maestro-v1.0.0"
//!
//! [dataset]
//! window_len = 50
//! target_segments = 10000
//! seed = 1234
//!
//! [export]
//! ticks_per_beat = 480
//! tempo_bpm = 120.0
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{DatasetConfig, ExportConfig, PathsConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to render config: {0}")]
    Render(String),
}

/// Complete perfseq configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PerfseqConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl PerfseqConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` replace `./perfseq.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        let (mut config, mut sources) = loader::load_files(&files)?;
        loader::apply_env_overrides(&mut config, &mut sources, |key| std::env::var(key).ok());
        Ok((config, sources))
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(self).map_err(|e| ConfigError::Render(e.to_string()))?;
        Ok(format!("# perfseq configuration\n\n{}", body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PerfseqConfig::default();
        assert_eq!(config.dataset.window_len, 50);
        assert_eq!(config.dataset.target_segments, 10_000);
        assert_eq!(config.export.ticks_per_beat, 480);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_to_toml_parses_back() {
        let mut config = PerfseqConfig::default();
        config.dataset.seed = Some(99);
        let rendered = config.to_toml().unwrap();

        assert!(rendered.contains("[dataset]"));
        assert!(rendered.contains("[telemetry]"));
        let parsed: PerfseqConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let parsed: PerfseqConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, PerfseqConfig::default());
    }
}
