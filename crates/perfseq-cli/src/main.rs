//! perfseq - encode MIDI performances to tokens, decode tokens to MIDI
//!
//! Subcommands:
//! - `perfseq encode <midi>` - Token sequence of a MIDI file as JSON
//! - `perfseq decode <json> <midi>` - Tokens or score matrix back to MIDI
//! - `perfseq segment <midi>` - Overlapping training windows of one file
//! - `perfseq dataset -o <json>` - Segments from a directory of MIDI files
//! - `perfseq random <midi>` - Synthetic piano performance
//! - `perfseq config` - Effective configuration and its sources

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perfseq_conf::PerfseqConfig;
use std::path::PathBuf;

mod commands;
mod telemetry;

#[derive(Parser)]
#[command(name = "perfseq")]
#[command(about = "Reversible token codec for MIDI performances")]
#[command(version)]
struct Cli {
    /// Config file replacing ./perfseq.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a MIDI file into tokens
    Encode {
        /// MIDI file to encode
        midi: PathBuf,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode tokens (or per-step scores) into a MIDI file
    Decode {
        /// JSON array of tokens, or array of score arrays
        input: PathBuf,

        /// MIDI file to write
        output: PathBuf,
    },

    /// Encode a MIDI file and cut it into training windows
    Segment {
        /// MIDI file to segment
        midi: PathBuf,

        /// Window length (defaults to config)
        #[arg(short, long)]
        window: Option<usize>,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a training set from a directory of MIDI files
    Dataset {
        /// Directory searched recursively (defaults to config)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Target segment count (defaults to config)
        #[arg(short = 'n', long)]
        target: Option<usize>,

        /// Window length (defaults to config)
        #[arg(short, long)]
        window: Option<usize>,

        /// Shuffle seed (defaults to config)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a random piano performance
    Random {
        /// MIDI file to write
        output: PathBuf,

        /// Number of notes
        #[arg(short = 'n', long, default_value = "100")]
        notes: usize,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = PerfseqConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    telemetry::init(&config.telemetry.log_level);

    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Encode { midi, output } => {
            commands::encode(&midi, output.as_deref(), &mut stdout)?;
        }
        Commands::Decode { input, output } => {
            commands::decode(&input, &output, &config)?;
        }
        Commands::Segment {
            midi,
            window,
            output,
        } => {
            let window = window.unwrap_or(config.dataset.window_len);
            commands::segment(&midi, window, output.as_deref(), &mut stdout)?;
        }
        Commands::Dataset {
            data_dir,
            target,
            window,
            seed,
            output,
        } => {
            let mut config = config;
            if let Some(dir) = data_dir {
                config.paths.data_dir = dir;
            }
            if let Some(target) = target {
                config.dataset.target_segments = target;
            }
            if let Some(window) = window {
                config.dataset.window_len = window;
            }
            if seed.is_some() {
                config.dataset.seed = seed;
            }
            commands::dataset(&config, &output)?;
        }
        Commands::Random {
            output,
            notes,
            seed,
        } => {
            commands::random(&output, notes, seed, &config)?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources, &mut stdout)?;
        }
    }

    Ok(())
}
