//! Lossy, reversible codec between note performances and flat token sequences.
//!
//! A performance (pitch, velocity, onset, offset per note) is flattened into a
//! time-ordered stream of note-on, note-off, time-shift and velocity-change
//! events, each mapped to one integer token below [`VOCAB_SIZE`]. Decoding
//! replays tokens against an open-note table and repairs malformed streams
//! instead of failing, since token sequences often come from generative models.
//!
//! ```
//! use perfseq::{decode, encode, Note, Performance};
//!
//! let perf = Performance::piano(vec![
//!     Note::new(60, 80, 0.0, 0.5),
//!     Note::new(64, 80, 0.5, 1.0),
//! ]);
//! let tokens = encode(&perf).unwrap();
//! let back = decode(&tokens).unwrap();
//! assert_eq!(back.notes().len(), 2);
//! ```

pub mod dataset;
pub mod decode;
pub mod encode;
pub mod event;
pub mod midi;
pub mod model;
pub mod note;
pub mod segment;
pub mod synth;
pub mod vocab;

pub use dataset::{Dataset, DatasetOptions};
pub use decode::{
    decode, decode_input, decode_scores, decode_with, DecoderInput, Diagnostic, DiagnosticSink,
    TracingSink,
};
pub use encode::{encode, encode_file, encode_notes};
pub use event::{Decoded, Event, TimedEvent};
pub use midi::ExportOptions;
pub use note::{Instrument, Note, Performance};
pub use segment::{segment, DEFAULT_WINDOW_LEN};
pub use vocab::{Token, SEGMENT_SENTINEL, VELOCITY_STEP, VOCAB_SIZE};

use std::path::PathBuf;

/// Errors from encoding, decoding, segmentation and MIDI I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pitch {0} is outside the MIDI range 0-127")]
    PitchOutOfRange(u8),

    #[error("{kind} bucket {bucket} is outside [0, {limit})")]
    BucketOutOfRange {
        kind: &'static str,
        bucket: u8,
        limit: u8,
    },

    #[error("note {pitch} has a non-finite time (onset {onset}, offset {offset})")]
    NonFiniteTime { pitch: u8, onset: f64, offset: f64 },

    #[error("token {0} is outside the vocabulary [0, {limit})", limit = VOCAB_SIZE)]
    TokenOutOfRange(Token),

    #[error("score row {0} is empty")]
    EmptyScoreRow(usize),

    #[error("sequence of length {len} is too short to segment with window {window}")]
    SequenceTooShort { len: usize, window: usize },

    #[error("window length {0} is too small; it must be at least 2")]
    WindowTooSmall(usize),

    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no MIDI files to build a dataset from")]
    NoMidiFiles,
}

pub type Result<T> = std::result::Result<T, Error>;
