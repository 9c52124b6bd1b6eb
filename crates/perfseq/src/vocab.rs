//! Token code layout.
//!
//! Codes are laid out in four contiguous ranges:
//!
//! | Range        | Meaning                         |
//! |--------------|---------------------------------|
//! | `[0,128)`    | note-on, pitch = code           |
//! | `[128,256)`  | note-off, pitch = code - 128    |
//! | `[256,356)`  | time-shift, bucket = code - 256 |
//! | `[356,382)`  | velocity, bucket = code - 356   |

/// One quantized event code, always below [`VOCAB_SIZE`] when produced by the encoder.
pub type Token = u32;

/// Width of one velocity bucket.
pub const VELOCITY_STEP: u8 = 5;

pub const PITCH_COUNT: u32 = 128;
pub const TIME_SHIFT_BUCKETS: u32 = 100;
/// `ceil(126 / VELOCITY_STEP)`.
pub const VELOCITY_BUCKETS: u32 = 126u32.div_ceil(VELOCITY_STEP as u32);

pub const NOTE_ON_OFFSET: Token = 0;
pub const NOTE_OFF_OFFSET: Token = NOTE_ON_OFFSET + PITCH_COUNT;
pub const TIME_SHIFT_OFFSET: Token = NOTE_OFF_OFFSET + PITCH_COUNT;
pub const VELOCITY_OFFSET: Token = TIME_SHIFT_OFFSET + TIME_SHIFT_BUCKETS;

/// Number of distinct tokens; size a model's output distribution with this.
pub const VOCAB_SIZE: usize = (VELOCITY_OFFSET + VELOCITY_BUCKETS) as usize;

/// Begin-of-segment marker placed at the head of the first training window.
///
/// Numerically it is the time-shift code for bucket 1; only the training
/// pipeline interprets it, as a marker.
pub const SEGMENT_SENTINEL: Token = TIME_SHIFT_OFFSET + 1;

/// Seconds represented by one time-shift bucket step.
pub const TIME_RESOLUTION: f64 = 0.01;

/// Largest span a single time-shift chunk covers before the resolution is taken off.
pub const MAX_SHIFT: f64 = 1.0;

/// Velocity assumed by the decoder until the first velocity token.
pub const DEFAULT_DECODE_VELOCITY: u8 = 40;

/// Encoder velocities above this share the top bucket.
pub const VELOCITY_CLAMP: u8 = 125;
