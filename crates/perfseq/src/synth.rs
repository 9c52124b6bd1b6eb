//! Random piano performances for smoke-testing the codec and downstream models.

use crate::note::{Note, Performance};
use rand::Rng;

/// Onset of the first generated note, in seconds.
const FIRST_ONSET: f64 = 0.5;

/// Generate `n` random piano notes.
///
/// Pitches are uniform over 0-127 and velocities over 10-79. Durations are
/// `|N(0,1) + 1|` seconds and onsets advance by `|0.2 N(0,1) + 0.3|` seconds.
pub fn random_performance<R: Rng>(n: usize, rng: &mut R) -> Performance {
    let mut time = FIRST_ONSET;
    let notes = (0..n)
        .map(|_| {
            let pitch = rng.random_range(0..128u8);
            let velocity = rng.random_range(10..80u8);
            let duration = (standard_normal(rng) + 1.0).abs();
            let note = Note::new(pitch, velocity, time, time + duration);
            time += (0.2 * standard_normal(rng) + 0.3).abs();
            note
        })
        .collect();
    Performance::piano(notes)
}

/// Box-Muller sample from N(0, 1).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // 1 - [0, 1) keeps the logarithm finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_with, encode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generates_requested_notes_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let perf = random_performance(200, &mut rng);
        let notes = perf.notes();

        assert_eq!(notes.len(), 200);
        assert_eq!(notes[0].onset, FIRST_ONSET);
        assert!(notes.iter().all(|n| n.pitch < 128));
        assert!(notes.iter().all(|n| (10..80).contains(&n.velocity)));
        assert!(notes.iter().all(|n| n.offset >= n.onset));
        assert!(notes.windows(2).all(|w| w[1].onset >= w[0].onset));
    }

    #[test]
    fn same_seed_same_performance() {
        let a = random_performance(50, &mut StdRng::seed_from_u64(11));
        let b = random_performance(50, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn random_performances_survive_the_codec() {
        let perf = random_performance(300, &mut StdRng::seed_from_u64(99));
        let tokens = encode(&perf).unwrap();
        let decoded = decode_with(&tokens, &mut Vec::new()).unwrap();

        // overlapping repeats of a pitch get repaired away, never invented
        assert!(!decoded.notes().is_empty());
        assert!(decoded.notes().len() <= perf.notes().len());
    }

    #[test]
    fn normal_samples_look_standard() {
        let mut rng = StdRng::seed_from_u64(5);
        let samples: Vec<f64> = (0..20_000).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.05, "variance {}", var);
    }
}
