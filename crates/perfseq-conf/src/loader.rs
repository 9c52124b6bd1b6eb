//! Config file discovery, layering, and environment variable overlay.

use crate::{ConfigError, PerfseqConfig};
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only existing
/// files are returned.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/perfseq/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("perfseq/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("perfseq.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file into a raw table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    // Validate this file on its own so errors point at it
    to_config(table.clone(), path)?;
    Ok(table)
}

/// Merge `overlay` into `base`. Nested tables merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Load and layer `files` over the compiled defaults.
pub fn load_files(files: &[PathBuf]) -> Result<(PerfseqConfig, ConfigSources), ConfigError> {
    let mut sources = ConfigSources::default();
    let mut merged = toml::Table::new();

    for path in files {
        merge_tables(&mut merged, load_table(path)?);
        sources.files.push(path.clone());
    }

    let origin = files
        .last()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("<defaults>"));
    let mut config = to_config(merged, &origin)?;
    config.paths.data_dir = expand_path(&config.paths.data_dir.to_string_lossy());
    Ok((config, sources))
}

fn to_config(table: toml::Table, path: &Path) -> Result<PerfseqConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Apply environment variable overrides to config.
///
/// `lookup` resolves a variable name; pass `|k| std::env::var(k).ok()` for
/// the process environment. Unparseable numeric values are ignored.
pub fn apply_env_overrides(
    config: &mut PerfseqConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("PERFSEQ_DATA_DIR") {
        config.paths.data_dir = expand_path(&v);
        sources.env_overrides.push("PERFSEQ_DATA_DIR".to_string());
    }

    if let Some(Ok(window)) = lookup("PERFSEQ_WINDOW_LEN").map(|v| v.parse::<usize>()) {
        config.dataset.window_len = window;
        sources.env_overrides.push("PERFSEQ_WINDOW_LEN".to_string());
    }
    if let Some(Ok(target)) = lookup("PERFSEQ_TARGET_SEGMENTS").map(|v| v.parse::<usize>()) {
        config.dataset.target_segments = target;
        sources.env_overrides.push("PERFSEQ_TARGET_SEGMENTS".to_string());
    }
    if let Some(Ok(seed)) = lookup("PERFSEQ_SEED").map(|v| v.parse::<u64>()) {
        config.dataset.seed = Some(seed);
        sources.env_overrides.push("PERFSEQ_SEED".to_string());
    }

    if let Some(v) = lookup("PERFSEQ_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("PERFSEQ_LOG_LEVEL".to_string());
    }
    // RUST_LOG wins over everything
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        return directories::BaseDirs::new()
            .map(|d| d.home_dir().join(stripped))
            .unwrap_or_else(|| PathBuf::from(path));
    }

    if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        let (var_name, rest) = match stripped.find('/') {
            Some(slash) => (&stripped[..slash], Some(&stripped[slash + 1..])),
            None => (stripped, None),
        };
        return match (std::env::var(var_name), rest) {
            (Ok(value), Some(rest)) => PathBuf::from(value).join(rest),
            (Ok(value), None) => PathBuf::from(value),
            (Err(_), _) => PathBuf::from(path),
        };
    }

    PathBuf::from(path)
}
