//! Configuration sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root searched recursively for MIDI files.
    /// Default: ./data
    #[serde(default = "PathsConfig::default_data_dir")]
    pub data_dir: PathBuf,
}

impl PathsConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("data")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
        }
    }
}

/// Training dataset construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Tokens per segment, excluding the first one.
    /// Default: 50
    #[serde(default = "DatasetConfig::default_window_len")]
    pub window_len: usize,

    /// Stop collecting once more than this many segments exist.
    /// Default: 10000
    #[serde(default = "DatasetConfig::default_target_segments")]
    pub target_segments: usize,

    /// Shuffle seed. Unset draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// File extensions treated as MIDI.
    /// Default: ["mid", "midi"]
    #[serde(default = "DatasetConfig::default_extensions")]
    pub extensions: Vec<String>,
}

impl DatasetConfig {
    fn default_window_len() -> usize {
        50
    }

    fn default_target_segments() -> usize {
        10_000
    }

    fn default_extensions() -> Vec<String> {
        vec!["mid".to_string(), "midi".to_string()]
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            window_len: Self::default_window_len(),
            target_segments: Self::default_target_segments(),
            seed: None,
            extensions: Self::default_extensions(),
        }
    }
}

/// MIDI export of decoded performances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Default: 480
    #[serde(default = "ExportConfig::default_ticks_per_beat")]
    pub ticks_per_beat: u16,

    /// Default: 120.0
    #[serde(default = "ExportConfig::default_tempo_bpm")]
    pub tempo_bpm: f64,
}

impl ExportConfig {
    fn default_ticks_per_beat() -> u16 {
        480
    }

    fn default_tempo_bpm() -> f64 {
        120.0
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ticks_per_beat: Self::default_ticks_per_beat(),
            tempo_bpm: Self::default_tempo_bpm(),
        }
    }
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
