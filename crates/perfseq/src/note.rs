use serde::{Deserialize, Serialize};

/// A single note with onset and offset in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub onset: f64,
    pub offset: f64,
}

impl Note {
    pub fn new(pitch: u8, velocity: u8, onset: f64, offset: f64) -> Self {
        Self {
            pitch,
            velocity,
            onset,
            offset,
        }
    }

    pub fn duration(&self) -> f64 {
        self.offset - self.onset
    }
}

/// One voice of a performance: a program and its notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    /// General MIDI program number (0 = acoustic grand piano)
    pub program: u8,
    pub is_drum: bool,
    pub notes: Vec<Note>,
}

impl Instrument {
    pub fn piano(notes: Vec<Note>) -> Self {
        Self {
            name: "piano".to_string(),
            program: 0,
            is_drum: false,
            notes,
        }
    }

    /// Time of the latest note offset, or 0 when empty.
    pub fn end_time(&self) -> f64 {
        self.notes.iter().map(|n| n.offset).fold(0.0, f64::max)
    }
}

/// A polyphonic performance. Only the first instrument takes part in encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub instruments: Vec<Instrument>,
}

impl Performance {
    /// Single-instrument piano performance.
    pub fn piano(notes: Vec<Note>) -> Self {
        Self {
            instruments: vec![Instrument::piano(notes)],
        }
    }

    /// Notes of the first instrument, the one the encoder sees.
    pub fn notes(&self) -> &[Note] {
        self.instruments
            .first()
            .map(|i| i.notes.as_slice())
            .unwrap_or(&[])
    }

    pub fn note_count(&self) -> usize {
        self.instruments.iter().map(|i| i.notes.len()).sum()
    }

    pub fn end_time(&self) -> f64 {
        self.instruments
            .iter()
            .map(Instrument::end_time)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_come_from_first_instrument() {
        let mut perf = Performance::piano(vec![Note::new(60, 80, 0.0, 1.0)]);
        perf.instruments.push(Instrument {
            name: "bass".to_string(),
            program: 32,
            is_drum: false,
            notes: vec![Note::new(36, 90, 0.0, 2.5), Note::new(38, 90, 2.5, 3.0)],
        });

        assert_eq!(perf.notes().len(), 1);
        assert_eq!(perf.note_count(), 3);
        assert_eq!(perf.end_time(), 3.0);
    }

    #[test]
    fn empty_performance_has_no_notes() {
        let perf = Performance::default();
        assert!(perf.notes().is_empty());
        assert_eq!(perf.end_time(), 0.0);
    }
}
