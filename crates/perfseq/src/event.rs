//! Single-event codec: one semantic event to one token and back.

use crate::vocab::{
    Token, NOTE_OFF_OFFSET, NOTE_ON_OFFSET, PITCH_COUNT, TIME_RESOLUTION, TIME_SHIFT_BUCKETS,
    TIME_SHIFT_OFFSET, VELOCITY_BUCKETS, VELOCITY_OFFSET, VELOCITY_STEP, VOCAB_SIZE,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A quantized performance event, as carried by one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Event {
    NoteOn(u8),
    NoteOff(u8),
    /// Time-shift bucket in `[0, 100)`
    TimeShift(u8),
    /// Velocity bucket in `[0, 26)`
    VelocityChange(u8),
}

/// An event paired with the source time it was derived from.
///
/// The time only orders events during encoding; it is not transmitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    pub time: f64,
    pub event: Event,
}

/// A token expanded back into continuous values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Decoded {
    NoteOn(u8),
    NoteOff(u8),
    /// Seconds to advance the clock
    TimeShift(f64),
    /// Representative velocity of the bucket
    Velocity(u8),
}

impl Event {
    /// Map this event to its token code.
    ///
    /// Out-of-range pitches and buckets are contract violations and error out.
    pub fn encode(self) -> Result<Token> {
        match self {
            Event::NoteOn(pitch) => Ok(NOTE_ON_OFFSET + check_pitch(pitch)?),
            Event::NoteOff(pitch) => Ok(NOTE_OFF_OFFSET + check_pitch(pitch)?),
            Event::TimeShift(bucket) => Ok(TIME_SHIFT_OFFSET
                + check_bucket("time-shift", bucket, TIME_SHIFT_BUCKETS)?),
            Event::VelocityChange(bucket) => Ok(VELOCITY_OFFSET
                + check_bucket("velocity", bucket, VELOCITY_BUCKETS)?),
        }
    }

    /// Parse a token into its quantized event. Total over `[0, VOCAB_SIZE)`.
    pub fn from_token(token: Token) -> Result<Self> {
        if token as usize >= VOCAB_SIZE {
            return Err(Error::TokenOutOfRange(token));
        }
        let event = if token < NOTE_OFF_OFFSET {
            Event::NoteOn((token - NOTE_ON_OFFSET) as u8)
        } else if token < TIME_SHIFT_OFFSET {
            Event::NoteOff((token - NOTE_OFF_OFFSET) as u8)
        } else if token < VELOCITY_OFFSET {
            Event::TimeShift((token - TIME_SHIFT_OFFSET) as u8)
        } else {
            Event::VelocityChange((token - VELOCITY_OFFSET) as u8)
        };
        Ok(event)
    }

    /// Expand the bucketed payload into the value the decoder replays.
    pub fn to_decoded(self) -> Decoded {
        match self {
            Event::NoteOn(pitch) => Decoded::NoteOn(pitch),
            Event::NoteOff(pitch) => Decoded::NoteOff(pitch),
            Event::TimeShift(bucket) => Decoded::TimeShift(shift_seconds(bucket)),
            Event::VelocityChange(bucket) => Decoded::Velocity(bucket_velocity(bucket)),
        }
    }
}

impl Decoded {
    /// Decode a token straight to continuous values.
    pub fn from_token(token: Token) -> Result<Self> {
        Event::from_token(token).map(Event::to_decoded)
    }
}

/// Seconds represented by a time-shift bucket: `bucket / 100 + 0.01`.
pub fn shift_seconds(bucket: u8) -> f64 {
    bucket as f64 / TIME_SHIFT_BUCKETS as f64 + TIME_RESOLUTION
}

/// Velocity bucket for a note velocity. Velocities above 125 share the top bucket.
pub fn velocity_bucket(velocity: u8) -> u8 {
    velocity.min(crate::vocab::VELOCITY_CLAMP) / VELOCITY_STEP
}

/// Midpoint velocity of a bucket: `bucket * 5 + 2`.
///
/// Buckets past the top one decode as the top one.
pub fn bucket_velocity(bucket: u8) -> u8 {
    let bucket = bucket.min((VELOCITY_BUCKETS - 1) as u8);
    bucket * VELOCITY_STEP + VELOCITY_STEP / 2
}

fn check_pitch(pitch: u8) -> Result<Token> {
    if (pitch as u32) < PITCH_COUNT {
        Ok(pitch as Token)
    } else {
        Err(Error::PitchOutOfRange(pitch))
    }
}

fn check_bucket(kind: &'static str, bucket: u8, limit: u32) -> Result<Token> {
    if (bucket as u32) < limit {
        Ok(bucket as Token)
    } else {
        Err(Error::BucketOutOfRange {
            kind,
            bucket,
            limit: limit as u8,
        })
    }
}
