//! Standard MIDI File loading and writing.
//!
//! Loading turns ticks into seconds through the file's tempo map and groups
//! notes into instruments by (track, channel). Writing produces a format-1
//! file at a fixed tempo: a tempo track followed by one track per instrument.

use crate::note::{Instrument, Note, Performance};
use crate::{Error, Result};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const DRUM_CHANNEL: u8 = 9;
const DEFAULT_TEMPO_USEC: u32 = 500_000;

/// Options for MIDI export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Ticks per quarter note. Default: 480.
    pub ticks_per_beat: u16,
    /// Fixed tempo the seconds are laid out at. Default: 120.
    pub tempo_bpm: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ticks_per_beat: 480,
            tempo_bpm: 120.0,
        }
    }
}

impl ExportOptions {
    fn tempo_usec(&self) -> u32 {
        let bpm = if self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0 {
            self.tempo_bpm
        } else {
            120.0
        };
        ((60_000_000.0 / bpm).round() as u32).clamp(1, 0x00FF_FFFF)
    }

    fn seconds_to_tick(&self, seconds: f64) -> u64 {
        let beats = seconds.max(0.0) * 1_000_000.0 / self.tempo_usec() as f64;
        (beats * self.ticks_per_beat.max(1) as f64).round() as u64
    }
}

/// Read and parse a MIDI file.
pub fn load(path: impl AsRef<Path>) -> Result<Performance> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&bytes)
}

/// Parse MIDI bytes into a performance.
pub fn parse(bytes: &[u8]) -> Result<Performance> {
    let smf = Smf::parse(bytes).map_err(|e| Error::MidiParse(e.to_string()))?;
    let tempo = TempoMap::from_smf(&smf);

    let mut instruments: Vec<Instrument> = Vec::new();
    let mut index: HashMap<(usize, u8), usize> = HashMap::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut tick: u64 = 0;
        let mut programs = [0u8; 16];
        // (channel, pitch) → stack of (onset_tick, velocity), matched last-in-first-out
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();
        let mut track_name: Option<String> = None;

        for event in track {
            tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                    track_name = Some(String::from_utf8_lossy(name).trim().to_string());
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::ProgramChange { program } => {
                            programs[ch as usize] = program.as_int();
                        }
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            index.entry((track_index, ch)).or_insert_with(|| {
                                instruments.push(new_instrument(
                                    track_name.as_deref(),
                                    programs[ch as usize],
                                    ch,
                                ));
                                instruments.len() - 1
                            });
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push((tick, vel.as_int()));
                        }
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            let key = (ch, key.as_int());
                            let matched = pending.get_mut(&key).and_then(|stack| stack.pop());
                            let slot = index.get(&(track_index, ch)).copied();
                            if let (Some((onset, velocity)), Some(slot)) = (matched, slot) {
                                instruments[slot].notes.push(Note::new(
                                    key.1,
                                    velocity,
                                    tempo.seconds(onset),
                                    tempo.seconds(tick),
                                ));
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Close anything left sounding at the track's final tick
        for ((ch, pitch), stack) in pending {
            let Some(&slot) = index.get(&(track_index, ch)) else {
                continue;
            };
            for (onset, velocity) in stack {
                instruments[slot].notes.push(Note::new(
                    pitch,
                    velocity,
                    tempo.seconds(onset),
                    tempo.seconds(tick),
                ));
            }
        }
    }

    for instrument in &mut instruments {
        instrument
            .notes
            .sort_by(|a, b| a.onset.total_cmp(&b.onset).then(a.pitch.cmp(&b.pitch)));
    }
    instruments.retain(|i| !i.notes.is_empty());

    Ok(Performance { instruments })
}

fn new_instrument(track_name: Option<&str>, program: u8, channel: u8) -> Instrument {
    Instrument {
        name: track_name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("channel {}", channel)),
        program,
        is_drum: channel == DRUM_CHANNEL,
        notes: Vec::new(),
    }
}

/// Piecewise-linear tick → seconds mapping.
#[derive(Debug, Clone)]
struct TempoMap {
    /// (tick, seconds at tick, seconds per tick from here on)
    segments: Vec<(u64, f64, f64)>,
}

impl TempoMap {
    fn from_smf(smf: &Smf) -> Self {
        let ppq = match smf.header.timing {
            Timing::Metrical(ticks) => ticks.as_int().max(1) as f64,
            Timing::Timecode(fps, subframes) => {
                let per_second = fps.as_f32() as f64 * subframes.max(1) as f64;
                return Self {
                    segments: vec![(0, 0.0, 1.0 / per_second)],
                };
            }
        };

        let mut changes: Vec<(u64, u32)> = Vec::new();
        for track in &smf.tracks {
            let mut tick = 0u64;
            for event in track {
                tick += event.delta.as_int() as u64;
                if let TrackEventKind::Meta(MetaMessage::Tempo(usec)) = event.kind {
                    changes.push((tick, usec.as_int()));
                }
            }
        }
        Self::from_changes(ppq, changes)
    }

    fn from_changes(ppq: f64, mut changes: Vec<(u64, u32)>) -> Self {
        changes.sort_by_key(|(tick, _)| *tick);

        let per_tick = |usec: u32| usec as f64 / 1_000_000.0 / ppq;
        let mut segments = vec![(0u64, 0.0f64, per_tick(DEFAULT_TEMPO_USEC))];

        for (tick, usec) in changes {
            let Some(&(last_tick, last_seconds, last_rate)) = segments.last() else {
                continue;
            };
            if tick == last_tick {
                // later change at the same tick wins
                if let Some(last) = segments.last_mut() {
                    last.2 = per_tick(usec);
                }
            } else {
                let seconds = last_seconds + (tick - last_tick) as f64 * last_rate;
                segments.push((tick, seconds, per_tick(usec)));
            }
        }

        Self { segments }
    }

    fn seconds(&self, tick: u64) -> f64 {
        let i = self.segments.partition_point(|(t, _, _)| *t <= tick);
        match self.segments.get(i.saturating_sub(1)) {
            Some(&(start, seconds, rate)) => seconds + (tick - start) as f64 * rate,
            None => 0.0,
        }
    }
}

/// Write a performance to a MIDI file.
pub fn write(
    path: impl AsRef<Path>,
    performance: &Performance,
    options: &ExportOptions,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_smf(performance, options)?;
    std::fs::write(path, bytes).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Render a performance as format-1 Standard MIDI File bytes.
///
/// Track 0 holds the tempo. Tracks 1+ hold one instrument each, with a track
/// name and program change. Drums go on channel 9; melodic instruments take
/// the remaining channels in order.
pub fn to_smf(performance: &Performance, options: &ExportOptions) -> Result<Vec<u8>> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(options.ticks_per_beat.clamp(1, 0x7FFF))),
    ));

    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(options.tempo_usec()))),
        },
        end_of_track(0),
    ]);

    let mut next_channel = 0u8;
    for instrument in &performance.instruments {
        let channel = if instrument.is_drum {
            DRUM_CHANNEL
        } else {
            let ch = next_channel;
            // past channel 15 every further instrument shares it
            if next_channel < 15 {
                next_channel += 1;
                if next_channel == DRUM_CHANNEL {
                    next_channel += 1;
                }
            }
            ch
        };
        smf.tracks.push(instrument_track(instrument, channel, options));
    }

    let mut buf = Vec::new();
    smf.write_std(&mut buf)
        .map_err(|e| Error::MidiParse(format!("failed to serialize MIDI: {}", e)))?;
    Ok(buf)
}

fn instrument_track<'a>(
    instrument: &'a Instrument,
    channel: u8,
    options: &ExportOptions,
) -> Track<'a> {
    let channel = u4::new(channel);
    let mut track: Track<'a> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(instrument.name.as_bytes())),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(instrument.program.min(127)),
                },
            },
        },
    ];

    // (tick, is_note_on, pitch, velocity)
    let mut events: Vec<(u64, bool, u8, u8)> = Vec::with_capacity(instrument.notes.len() * 2);
    for note in &instrument.notes {
        let pitch = note.pitch.min(127);
        let velocity = note.velocity.clamp(1, 127);
        events.push((options.seconds_to_tick(note.onset), true, pitch, velocity));
        events.push((options.seconds_to_tick(note.offset), false, pitch, 0));
    }
    // note-offs before note-ons at the same tick
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut last_tick = 0u64;
    for (tick, is_on, pitch, velocity) in events {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(velocity),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(pitch),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: delta(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(end_of_track(0));
    track
}

fn delta(ticks: u64) -> u28 {
    u28::new(ticks.min(0x0FFF_FFFF) as u32)
}

fn end_of_track(delta_ticks: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta_ticks),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}
