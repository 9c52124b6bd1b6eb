//! Fixed-length overlapping training windows.

use crate::vocab::{Token, SEGMENT_SENTINEL};
use crate::{Error, Result};

pub const DEFAULT_WINDOW_LEN: usize = 50;

/// Slice `tokens` into windows of `window + 1` tokens with 50% overlap.
///
/// The first window is the sentinel followed by `tokens[..window]`. Later
/// windows are raw slices starting at multiples of `window / 2`, kept while
/// they fit entirely inside the sequence.
pub fn segment(tokens: &[Token], window: usize) -> Result<Vec<Vec<Token>>> {
    if window < 2 {
        return Err(Error::WindowTooSmall(window));
    }
    if tokens.len() <= window {
        return Err(Error::SequenceTooShort {
            len: tokens.len(),
            window,
        });
    }

    let stride = window / 2;
    let mut segments = Vec::with_capacity(segment_count(tokens.len(), window));

    let mut first = Vec::with_capacity(window + 1);
    first.push(SEGMENT_SENTINEL);
    first.extend_from_slice(&tokens[..window]);
    segments.push(first);

    let mut start = stride;
    while start + window < tokens.len() {
        segments.push(tokens[start..start + window + 1].to_vec());
        start += stride;
    }

    Ok(segments)
}

/// Number of windows [`segment`] yields for a sequence of `len` tokens.
pub fn segment_count(len: usize, window: usize) -> usize {
    if window < 2 || len <= window {
        return 0;
    }
    (len - window - 1) / (window / 2) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ramp(len: usize) -> Vec<Token> {
        (0..len as Token).collect()
    }

    #[test]
    fn first_window_is_prefixed() {
        let segments = segment(&ramp(120), 50).unwrap();
        assert_eq!(segments[0][0], SEGMENT_SENTINEL);
        assert_eq!(&segments[0][1..], &ramp(50)[..]);
    }

    #[test]
    fn coverage_for_120_tokens() {
        let tokens = ramp(120);
        let segments = segment(&tokens, 50).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], tokens[25..76].to_vec());
        assert_eq!(segments[2], tokens[50..101].to_vec());
        assert!(segments.iter().all(|s| s.len() == 51));
        assert_eq!(segment_count(120, 50), 3);
    }

    #[test]
    fn window_ending_exactly_at_sequence_end_is_kept() {
        // 25 + 51 == 76
        let segments = segment(&ramp(76), 50).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(*segments[1].last().unwrap(), 75);
    }

    #[test]
    fn shortest_segmentable_sequence() {
        let segments = segment(&ramp(51), 50).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn too_short_sequences_fail() {
        assert!(matches!(
            segment(&ramp(50), 50),
            Err(Error::SequenceTooShort { len: 50, window: 50 })
        ));
        assert!(segment(&[], 50).is_err());
    }

    #[test]
    fn degenerate_windows_fail() {
        assert!(matches!(segment(&ramp(10), 1), Err(Error::WindowTooSmall(1))));
        assert!(matches!(segment(&ramp(10), 0), Err(Error::WindowTooSmall(0))));
    }

    #[test]
    fn count_matches_enumeration() {
        for len in 3..400 {
            for window in [2, 3, 7, 50, 64] {
                let expected = segment(&ramp(len), window).map(|s| s.len()).unwrap_or(0);
                assert_eq!(segment_count(len, window), expected, "len {len} window {window}");
            }
        }
    }
}
