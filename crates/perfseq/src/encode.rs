//! Performance to token sequence.

use crate::event::{velocity_bucket, Event, TimedEvent};
use crate::note::{Note, Performance};
use crate::vocab::{Token, MAX_SHIFT, TIME_RESOLUTION, TIME_SHIFT_BUCKETS, VOCAB_SIZE};
use crate::{Error, Result};
use std::path::Path;

/// Encode the first instrument of a performance.
///
/// A performance with no instruments encodes to an empty sequence.
pub fn encode(performance: &Performance) -> Result<Vec<Token>> {
    encode_notes(performance.notes())
}

/// Load a MIDI file and encode its first instrument.
pub fn encode_file(path: impl AsRef<Path>) -> Result<Vec<Token>> {
    let path = path.as_ref();
    let performance = crate::midi::load(path)?;
    let tokens = encode(&performance)?;
    tracing::debug!(
        path = %path.display(),
        notes = performance.notes().len(),
        tokens = tokens.len(),
        "encoded MIDI file"
    );
    Ok(tokens)
}

/// Encode notes, in the order given, into tokens.
///
/// Notes with a NaN or infinite onset or offset are rejected.
pub fn encode_notes(notes: &[Note]) -> Result<Vec<Token>> {
    if let Some(note) = notes
        .iter()
        .find(|n| !n.onset.is_finite() || !n.offset.is_finite())
    {
        return Err(Error::NonFiniteTime {
            pitch: note.pitch,
            onset: note.onset,
            offset: note.offset,
        });
    }

    let tokens = with_time_shifts(note_events(notes))
        .into_iter()
        .map(Event::encode)
        .collect::<Result<Vec<_>>>()?;

    debug_assert!(tokens.iter().all(|&t| (t as usize) < VOCAB_SIZE));
    Ok(tokens)
}

/// Expand notes into velocity, note-on and note-off events, sorted by time.
///
/// A velocity change is emitted whenever a note's velocity differs from the
/// previous note's (starting from 0). The sort is stable, so a velocity
/// change stays ahead of the note-on it belongs to.
pub fn note_events(notes: &[Note]) -> Vec<TimedEvent> {
    let mut events = Vec::with_capacity(notes.len() * 3);
    let mut velocity = 0u8;

    for note in notes {
        if note.velocity != velocity {
            events.push(TimedEvent {
                time: note.onset,
                event: Event::VelocityChange(velocity_bucket(note.velocity)),
            });
            velocity = note.velocity;
        }
        events.push(TimedEvent {
            time: note.onset,
            event: Event::NoteOn(note.pitch),
        });
        events.push(TimedEvent {
            time: note.offset,
            event: Event::NoteOff(note.pitch),
        });
    }

    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}

/// Interleave time-shift events between time-ordered events.
fn with_time_shifts(events: Vec<TimedEvent>) -> Vec<Event> {
    let mut out = Vec::with_capacity(events.len() * 2);
    let mut clock = 0.0;

    for timed in events {
        out.extend(shift_chunks(timed.time - clock).into_iter().map(Event::TimeShift));
        clock = timed.time;
        out.push(timed.event);
    }

    out
}

/// Split a gap into time-shift buckets, each covering at most ~0.99s.
///
/// Gaps of 0.01s or less are absorbed without a token. Negative and
/// non-finite gaps yield nothing.
pub fn shift_chunks(gap: f64) -> Vec<u8> {
    let mut chunks = Vec::new();
    if !gap.is_finite() {
        return chunks;
    }
    let mut remaining = gap;

    while remaining > TIME_RESOLUTION {
        let chunk = remaining.min(MAX_SHIFT) - TIME_RESOLUTION;
        let bucket = (chunk * TIME_SHIFT_BUCKETS as f64).floor() as u8;
        chunks.push(bucket);
        let next = remaining - chunk;
        // past ~1.8e16 subtracting a chunk no longer changes the value
        if next >= remaining {
            break;
        }
        remaining = next;
    }

    chunks
}
