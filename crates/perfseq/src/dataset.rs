//! Training datasets: many MIDI files encoded and segmented into one batch.

use crate::encode::encode_file;
use crate::segment::{segment, DEFAULT_WINDOW_LEN};
use crate::vocab::Token;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Parameters for [`build`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetOptions {
    /// Segment window length. Default: 50.
    pub window_len: usize,
    /// Stop once more than this many segments are collected. Default: 10000.
    pub target_segments: usize,
    /// Shuffle seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            target_segments: 10_000,
            seed: None,
        }
    }
}

/// Stacked training segments and where they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub window_len: usize,
    /// Each segment holds `window_len + 1` tokens.
    pub segments: Vec<Vec<Token>>,
    pub files_used: Vec<PathBuf>,
    /// Files that failed to load or were too short to segment.
    pub skipped: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Recursively find files under `dir` whose extension matches one of
/// `extensions` (case-insensitive). Sorted so shuffles are reproducible.
pub fn discover(dir: impl AsRef<Path>, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        })
        .collect();
    files.sort();
    files
}

/// Shuffle `paths`, then encode and segment files until more than
/// `target_segments` segments are collected.
pub fn build(paths: &[PathBuf], options: &DatasetOptions) -> Result<Dataset> {
    if paths.is_empty() {
        return Err(Error::NoMidiFiles);
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut order = paths.to_vec();
    order.shuffle(&mut rng);

    let mut dataset = Dataset {
        window_len: options.window_len,
        segments: Vec::new(),
        files_used: Vec::new(),
        skipped: 0,
    };

    for path in order {
        let segments = match encode_file(&path).and_then(|t| segment(&t, options.window_len)) {
            Ok(segments) => segments,
            Err(e @ Error::WindowTooSmall(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping file");
                dataset.skipped += 1;
                continue;
            }
        };

        tracing::debug!(path = %path.display(), segments = segments.len(), "segmented file");
        dataset.segments.extend(segments);
        dataset.files_used.push(path);

        if dataset.segments.len() > options.target_segments {
            break;
        }
    }

    tracing::info!(
        segments = dataset.segments.len(),
        files = dataset.files_used.len(),
        skipped = dataset.skipped,
        "built dataset"
    );
    Ok(dataset)
}
