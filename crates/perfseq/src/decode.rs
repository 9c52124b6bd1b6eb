//! Token sequence to performance.
//!
//! Decoding replays tokens against a table of open notes keyed by pitch. Token
//! streams from generative models carry no well-formedness guarantee, so every
//! structural anomaly degrades to a [`Diagnostic`] and a dropped token. The only
//! hard error is a token outside the vocabulary, which means the caller and the
//! vocabulary disagree.

use crate::event::Decoded;
use crate::note::{Note, Performance};
use crate::vocab::{Token, DEFAULT_DECODE_VELOCITY};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A repair the decoder made while replaying tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A note-on arrived for a pitch that was already sounding; the new one was dropped.
    DuplicateNoteOn {
        pitch: u8,
        open_onset: f64,
        time: f64,
    },
    /// A note-off arrived for a pitch with no open note.
    OrphanNoteOff { pitch: u8, time: f64 },
    /// A note closed at or before its onset and was discarded.
    NonPositiveDuration { pitch: u8, onset: f64 },
    /// A note was still open when the tokens ran out and was closed at the final clock.
    Unterminated { pitch: u8, onset: f64, kept: bool },
}

/// Receives decoder repairs as they happen.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

/// Forwards diagnostics to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::DuplicateNoteOn {
                pitch,
                open_onset,
                time,
            } => {
                tracing::debug!(pitch, open_onset, time, "consecutive note-ons, dropping the later")
            }
            Diagnostic::OrphanNoteOff { pitch, time } => {
                tracing::debug!(pitch, time, "note-off without note-on")
            }
            Diagnostic::NonPositiveDuration { pitch, onset } => {
                tracing::debug!(pitch, onset, "note with non-positive duration")
            }
            Diagnostic::Unterminated { pitch, onset, kept } => {
                tracing::debug!(pitch, onset, kept, "note still open at end of sequence")
            }
        }
    }
}

/// What a decoder can be fed: tokens, or one score vector per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecoderInput {
    Tokens(Vec<Token>),
    Scores(Vec<Vec<f32>>),
}

/// Decode tokens, logging repairs through `tracing`.
pub fn decode(tokens: &[Token]) -> Result<Performance> {
    decode_with(tokens, &mut TracingSink)
}

/// Decode tokens, reporting repairs to `sink`.
pub fn decode_with(tokens: &[Token], sink: &mut impl DiagnosticSink) -> Result<Performance> {
    let mut state = DecodeState::new();
    for &token in tokens {
        state.apply(Decoded::from_token(token)?, sink);
    }
    Ok(Performance::piano(state.finish(sink)))
}

/// Decode per-step score vectors by taking the highest-scoring token at each step.
///
/// Ties resolve to the lowest token.
pub fn decode_scores<R: AsRef<[f32]>>(
    rows: &[R],
    sink: &mut impl DiagnosticSink,
) -> Result<Performance> {
    let tokens = rows
        .iter()
        .enumerate()
        .map(|(step, row)| argmax(row.as_ref()).ok_or(Error::EmptyScoreRow(step)))
        .collect::<Result<Vec<_>>>()?;
    decode_with(&tokens, sink)
}

/// Decode either input form.
pub fn decode_input(input: &DecoderInput, sink: &mut impl DiagnosticSink) -> Result<Performance> {
    match input {
        DecoderInput::Tokens(tokens) => decode_with(tokens, sink),
        DecoderInput::Scores(rows) => decode_scores(rows, sink),
    }
}

fn argmax(row: &[f32]) -> Option<Token> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in row.iter().enumerate() {
        match best {
            Some((_, top)) if score.total_cmp(&top).is_le() => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i as Token)
}

#[derive(Debug, Clone, Copy)]
struct OpenNote {
    velocity: u8,
    onset: f64,
}

/// Working tables for one decode call.
struct DecodeState {
    open: BTreeMap<u8, OpenNote>,
    clock: f64,
    velocity: u8,
    notes: Vec<Note>,
}

impl DecodeState {
    fn new() -> Self {
        Self {
            open: BTreeMap::new(),
            clock: 0.0,
            velocity: DEFAULT_DECODE_VELOCITY,
            notes: Vec::new(),
        }
    }

    fn apply(&mut self, event: Decoded, sink: &mut impl DiagnosticSink) {
        match event {
            Decoded::TimeShift(seconds) => self.clock += seconds,
            Decoded::Velocity(velocity) => {
                self.velocity = velocity;
                // A note-on that shares its timestamp with this velocity change
                // may have been ordered ahead of it.
                for note in self.open.values_mut() {
                    if note.onset == self.clock {
                        note.velocity = velocity;
                    }
                }
            }
            Decoded::NoteOn(pitch) => {
                if let Some(open) = self.open.get(&pitch) {
                    sink.report(Diagnostic::DuplicateNoteOn {
                        pitch,
                        open_onset: open.onset,
                        time: self.clock,
                    });
                } else {
                    self.open.insert(
                        pitch,
                        OpenNote {
                            velocity: self.velocity,
                            onset: self.clock,
                        },
                    );
                }
            }
            Decoded::NoteOff(pitch) => match self.open.remove(&pitch) {
                Some(open) if self.clock > open.onset => {
                    self.notes
                        .push(Note::new(pitch, open.velocity, open.onset, self.clock));
                }
                Some(open) => sink.report(Diagnostic::NonPositiveDuration {
                    pitch,
                    onset: open.onset,
                }),
                None => sink.report(Diagnostic::OrphanNoteOff {
                    pitch,
                    time: self.clock,
                }),
            },
        }
    }

    /// Close everything still open at the final clock.
    fn finish(mut self, sink: &mut impl DiagnosticSink) -> Vec<Note> {
        let open = std::mem::take(&mut self.open);
        for (pitch, note) in open {
            let kept = self.clock > note.onset;
            if kept {
                self.notes
                    .push(Note::new(pitch, note.velocity, note.onset, self.clock));
            }
            sink.report(Diagnostic::Unterminated {
                pitch,
                onset: note.onset,
                kept,
            });
        }
        self.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_notes;
    use crate::vocab::VOCAB_SIZE;
    use pretty_assertions::assert_eq;

    const SHIFT_HALF: Token = 256 + 49; // 0.50s
    const VELO_80: Token = 356 + 16;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn two_note_scenario_round_trips() {
        let notes = vec![Note::new(60, 80, 0.0, 0.5), Note::new(64, 80, 0.5, 1.0)];
        let tokens = encode_notes(&notes).unwrap();

        let mut diagnostics = Vec::new();
        let perf = decode_with(&tokens, &mut diagnostics).unwrap();
        let decoded = perf.notes();

        assert!(diagnostics.is_empty(), "unexpected repairs: {:?}", diagnostics);
        assert_eq!(decoded.len(), 2);
        assert_eq!((decoded[0].pitch, decoded[1].pitch), (60, 64));
        for (got, want) in decoded.iter().zip(&notes) {
            assert_eq!(got.velocity, 82);
            assert!(close(got.onset, want.onset, 0.02), "{:?} vs {:?}", got, want);
            assert!(close(got.offset, want.offset, 0.02), "{:?} vs {:?}", got, want);
        }
    }

    #[test]
    fn notes_before_any_velocity_use_default() {
        let perf = decode(&[60, SHIFT_HALF, 128 + 60]).unwrap();
        assert_eq!(perf.notes()[0].velocity, DEFAULT_DECODE_VELOCITY);
    }

    #[test]
    fn velocity_applies_retroactively_at_same_onset() {
        // note-on precedes its velocity change at the same clock
        let tokens = [SHIFT_HALF, 60, VELO_80, SHIFT_HALF, 128 + 60];
        let perf = decode(&tokens).unwrap();
        assert_eq!(perf.notes()[0].velocity, 82);
    }

    #[test]
    fn velocity_does_not_touch_earlier_notes() {
        let tokens = [60, SHIFT_HALF, VELO_80, 62, SHIFT_HALF, 128 + 60, 128 + 62];
        let perf = decode(&tokens).unwrap();
        let by_pitch: BTreeMap<u8, u8> =
            perf.notes().iter().map(|n| (n.pitch, n.velocity)).collect();
        assert_eq!(by_pitch[&60], DEFAULT_DECODE_VELOCITY);
        assert_eq!(by_pitch[&62], 82);
    }

    #[test]
    fn stray_note_off_costs_one_note() {
        let notes = vec![Note::new(60, 80, 0.0, 0.5), Note::new(64, 80, 0.5, 1.0)];
        let mut tokens = encode_notes(&notes).unwrap();
        let on_60 = tokens.iter().position(|&t| t == 60).unwrap();
        tokens.insert(on_60 + 1, 128 + 60);

        let mut diagnostics = Vec::new();
        let perf = decode_with(&tokens, &mut diagnostics).unwrap();

        assert_eq!(perf.notes().len(), 1);
        assert_eq!(perf.notes()[0].pitch, 64);
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::NonPositiveDuration {
                    pitch: 60,
                    onset: 0.0
                },
                Diagnostic::OrphanNoteOff {
                    pitch: 60,
                    time: perf.notes()[0].onset
                },
            ]
        );
    }

    #[test]
    fn orphan_note_off_alone_reports_and_continues() {
        let mut diagnostics = Vec::new();
        let perf = decode_with(&[128 + 40, 40, SHIFT_HALF, 128 + 40], &mut diagnostics).unwrap();

        assert_eq!(perf.notes().len(), 1);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::OrphanNoteOff {
                pitch: 40,
                time: 0.0
            }]
        );
    }

    #[test]
    fn duplicate_note_on_keeps_first() {
        let mut diagnostics = Vec::new();
        let tokens = [60, SHIFT_HALF, 60, SHIFT_HALF, 128 + 60];
        let perf = decode_with(&tokens, &mut diagnostics).unwrap();

        assert_eq!(perf.notes().len(), 1);
        assert_eq!(perf.notes()[0].onset, 0.0);
        assert!(close(perf.notes()[0].offset, 1.0, 1e-9));
        assert!(matches!(
            diagnostics[0],
            Diagnostic::DuplicateNoteOn { pitch: 60, open_onset, .. } if open_onset == 0.0
        ));
    }

    #[test]
    fn zero_duration_note_is_discarded() {
        let mut diagnostics = Vec::new();
        let perf = decode_with(&[60, 128 + 60], &mut diagnostics).unwrap();

        assert!(perf.notes().is_empty());
        assert_eq!(
            diagnostics,
            vec![Diagnostic::NonPositiveDuration {
                pitch: 60,
                onset: 0.0
            }]
        );
    }

    #[test]
    fn trailing_open_notes_close_at_final_clock() {
        let mut diagnostics = Vec::new();
        let perf = decode_with(&[60, SHIFT_HALF, 64], &mut diagnostics).unwrap();

        assert_eq!(perf.notes().len(), 1);
        assert_eq!(perf.notes()[0].pitch, 60);
        assert!(close(perf.notes()[0].offset, 0.5, 1e-9));
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.contains(&Diagnostic::Unterminated {
            pitch: 64,
            onset: perf.notes()[0].offset,
            kept: false
        }));
    }

    #[test]
    fn every_token_decodes_without_error() {
        let tokens: Vec<Token> = (0..VOCAB_SIZE as Token).collect();
        assert!(decode_with(&tokens, &mut Vec::new()).is_ok());
        let reversed: Vec<Token> = tokens.iter().rev().copied().collect();
        assert!(decode_with(&reversed, &mut Vec::new()).is_ok());
    }

    #[test]
    fn out_of_vocabulary_token_is_an_error() {
        let err = decode(&[60, 382]).unwrap_err();
        assert!(matches!(err, Error::TokenOutOfRange(382)));
    }

    #[test]
    fn scores_reduce_by_argmax() {
        let one_hot = |token: usize| {
            let mut row = vec![0.0f32; VOCAB_SIZE];
            row[token] = 1.0;
            row
        };
        let rows = vec![one_hot(60), one_hot(SHIFT_HALF as usize), one_hot(128 + 60)];
        let perf = decode_scores(&rows, &mut Vec::new()).unwrap();
        assert_eq!(perf.notes().len(), 1);
        assert_eq!(perf.notes()[0].pitch, 60);
    }

    #[test]
    fn argmax_prefers_first_of_ties() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn empty_score_row_is_an_error() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0], vec![]];
        assert!(matches!(
            decode_scores(&rows, &mut Vec::new()),
            Err(Error::EmptyScoreRow(1))
        ));
    }

    #[test]
    fn decoder_input_accepts_both_json_forms() {
        let tokens: DecoderInput = serde_json::from_str("[60, 305, 188]").unwrap();
        assert_eq!(tokens, DecoderInput::Tokens(vec![60, 305, 188]));

        let scores: DecoderInput = serde_json::from_str("[[0.0, 1.0], [1.0, 0.0]]").unwrap();
        assert!(matches!(scores, DecoderInput::Scores(ref rows) if rows.len() == 2));
    }

    #[test]
    fn empty_sequence_decodes_to_empty_performance() {
        let perf = decode(&[]).unwrap();
        assert_eq!(perf.instruments.len(), 1);
        assert!(perf.notes().is_empty());
    }
}
