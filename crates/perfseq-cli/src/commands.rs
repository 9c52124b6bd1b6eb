//! CLI command implementations

use anyhow::{bail, Context, Result};
use perfseq::decode::{decode_input, DecoderInput, Diagnostic, DiagnosticSink, TracingSink};
use perfseq::{dataset, midi, synth, ExportOptions, Performance, Token};
use perfseq_conf::{ConfigSources, PerfseqConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Windows cut from a single file.
#[derive(Debug, Serialize)]
struct SegmentReport {
    source: PathBuf,
    window_len: usize,
    token_count: usize,
    segments: Vec<Vec<Token>>,
}

/// Logs each repair and counts them for the summary line.
#[derive(Default)]
struct CountingSink {
    count: usize,
}

impl DiagnosticSink for CountingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.count += 1;
        TracingSink.report(diagnostic);
    }
}

fn export_options(config: &PerfseqConfig) -> ExportOptions {
    ExportOptions {
        ticks_per_beat: config.export.ticks_per_beat,
        tempo_bpm: config.export.tempo_bpm,
    }
}

/// Serialize `value` to `path` if given, otherwise to `out`.
fn emit<T: Serialize>(value: &T, path: Option<&Path>, out: &mut impl Write) -> Result<()> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            serde_json::to_writer(&mut writer, value)?;
            writer.flush()?;
        }
        None => {
            serde_json::to_writer(&mut *out, value)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn encode(midi: &Path, output: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let tokens = perfseq::encode_file(midi)
        .with_context(|| format!("Failed to encode {}", midi.display()))?;
    tracing::info!(tokens = tokens.len(), "encoded {}", midi.display());
    emit(&tokens, output, out)
}

pub fn decode(input: &Path, output: &Path, config: &PerfseqConfig) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let parsed: DecoderInput = serde_json::from_str(&text).with_context(|| {
        format!(
            "{} is neither a token array nor a score matrix",
            input.display()
        )
    })?;

    let mut sink = CountingSink::default();
    let performance = decode_input(&parsed, &mut sink)?;
    write_midi(output, &performance, config)?;

    eprintln!(
        "{} notes, {} repairs -> {}",
        performance.note_count(),
        sink.count,
        output.display()
    );
    Ok(())
}

pub fn segment(
    midi: &Path,
    window: usize,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let tokens = perfseq::encode_file(midi)
        .with_context(|| format!("Failed to encode {}", midi.display()))?;
    let segments = perfseq::segment(&tokens, window)?;

    let report = SegmentReport {
        source: midi.to_path_buf(),
        window_len: window,
        token_count: tokens.len(),
        segments,
    };
    emit(&report, output, out)
}

pub fn dataset(config: &PerfseqConfig, output: &Path) -> Result<()> {
    let data_dir = &config.paths.data_dir;
    if !data_dir.is_dir() {
        bail!("Data directory not found: {}", data_dir.display());
    }

    let files = dataset::discover(data_dir, &config.dataset.extensions);
    tracing::info!(files = files.len(), "scanning {}", data_dir.display());

    let options = perfseq::DatasetOptions {
        window_len: config.dataset.window_len,
        target_segments: config.dataset.target_segments,
        seed: config.dataset.seed,
    };
    let built = dataset::build(&files, &options)?;
    emit(&built, Some(output), &mut std::io::sink())?;

    eprintln!(
        "{} segments from {} files ({} skipped) -> {}",
        built.len(),
        built.files_used.len(),
        built.skipped,
        output.display()
    );
    Ok(())
}

pub fn random(
    output: &Path,
    notes: usize,
    seed: Option<u64>,
    config: &PerfseqConfig,
) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let performance = synth::random_performance(notes, &mut rng);
    write_midi(output, &performance, config)?;
    tracing::info!(notes, "wrote {}", output.display());
    Ok(())
}

pub fn show_config(
    config: &PerfseqConfig,
    sources: &ConfigSources,
    out: &mut impl Write,
) -> Result<()> {
    if sources.files.is_empty() {
        writeln!(out, "# no config files found, using defaults")?;
    }
    for file in &sources.files {
        writeln!(out, "# loaded {}", file.display())?;
    }
    for var in &sources.env_overrides {
        writeln!(out, "# env override {}", var)?;
    }
    writeln!(out)?;
    write!(out, "{}", config.to_toml()?)?;
    Ok(())
}

fn write_midi(path: &Path, performance: &Performance, config: &PerfseqConfig) -> Result<()> {
    midi::write(path, performance, &export_options(config))
        .with_context(|| format!("Failed to write {}", path.display()))
}
