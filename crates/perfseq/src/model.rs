//! Interfaces for models that generate or judge token sequences.
//!
//! No model lives in this crate; these traits pin down what a model consumes
//! and produces so training and sampling code can be written against them.

use crate::vocab::Token;
use serde::{Deserialize, Serialize};

/// A trainable model.
pub trait Model {
    /// One training batch.
    type Batch;
    type Error: std::error::Error;

    /// Train on one batch and return its mean loss.
    fn train(&mut self, batch: &Self::Batch) -> Result<f64, Self::Error>;
}

/// A model that generates token sequences.
pub trait Composer: Model<Batch = Vec<Vec<Token>>> {
    /// Generate `len` tokens. The result may be malformed; decode repairs it.
    fn compose(&mut self, len: usize) -> Result<Vec<Token>, Self::Error>;
}

/// A model that scores token sequences.
pub trait Critic: Model<Batch = LabeledBatch> {
    /// Quality in `[0, 1]`; closer to 1 is better.
    fn score(&mut self, tokens: &[Token]) -> Result<f64, Self::Error>;
}

/// Segments paired with one quality label each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledBatch {
    pub segments: Vec<Vec<Token>>,
    pub labels: Vec<f64>,
}

impl LabeledBatch {
    /// Label real segments 1 and generated ones 0.
    pub fn real_vs_generated(real: Vec<Vec<Token>>, generated: Vec<Vec<Token>>) -> Self {
        let labels = std::iter::repeat_n(1.0, real.len())
            .chain(std::iter::repeat_n(0.0, generated.len()))
            .collect();
        let mut segments = real;
        segments.extend(generated);
        Self { segments, labels }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_with;
    use crate::segment::segment;
    use crate::vocab::VOCAB_SIZE;

    #[derive(Debug, thiserror::Error)]
    #[error("untrained")]
    struct Untrained;

    /// Replays the most common token of its training data.
    #[derive(Default)]
    struct MajorityComposer {
        counts: Vec<usize>,
    }

    impl Model for MajorityComposer {
        type Batch = Vec<Vec<Token>>;
        type Error = Untrained;

        fn train(&mut self, batch: &Self::Batch) -> Result<f64, Self::Error> {
            self.counts.resize(VOCAB_SIZE, 0);
            for token in batch.iter().flatten() {
                self.counts[*token as usize] += 1;
            }
            Ok(0.0)
        }
    }

    impl Composer for MajorityComposer {
        fn compose(&mut self, len: usize) -> Result<Vec<Token>, Self::Error> {
            let (token, _) = self
                .counts
                .iter()
                .enumerate()
                .max_by_key(|(_, count)| **count)
                .ok_or(Untrained)?;
            Ok(vec![token as Token; len])
        }
    }

    /// Scores by the fraction of note-on tokens.
    struct DensityCritic;

    impl Model for DensityCritic {
        type Batch = LabeledBatch;
        type Error = Untrained;

        fn train(&mut self, batch: &Self::Batch) -> Result<f64, Self::Error> {
            Ok(batch.labels.iter().sum::<f64>() / batch.len().max(1) as f64)
        }
    }

    impl Critic for DensityCritic {
        fn score(&mut self, tokens: &[Token]) -> Result<f64, Self::Error> {
            let ons = tokens.iter().filter(|&&t| t < 128).count();
            Ok(ons as f64 / tokens.len().max(1) as f64)
        }
    }

    #[test]
    fn composer_output_always_decodes() {
        let mut composer = MajorityComposer::default();
        assert!(composer.compose(4).is_err());

        let data: Vec<Token> = (0..40).map(|i| if i % 2 == 0 { 60 } else { 300 }).collect();
        let segments = segment(&data, 10).unwrap();
        composer.train(&segments).unwrap();

        let generated = composer.compose(32).unwrap();
        assert_eq!(generated.len(), 32);
        let mut diagnostics = Vec::new();
        assert!(decode_with(&generated, &mut diagnostics).is_ok());
    }

    #[test]
    fn critic_batches_label_real_and_generated() {
        let batch =
            LabeledBatch::real_vs_generated(vec![vec![60, 188]], vec![vec![300], vec![301]]);
        assert_eq!(batch.labels, vec![1.0, 0.0, 0.0]);

        let mut critic = DensityCritic;
        let loss = critic.train(&batch).unwrap();
        assert!((loss - 1.0 / 3.0).abs() < 1e-9);
        let score = critic.score(&batch.segments[0]).unwrap();
        assert!((0.0..=1.0).contains(&score));
    }
}
