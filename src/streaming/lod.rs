//! Distance-band LOD selection
//!
//! Bands are an ascending list of distance thresholds. A chunk whose bounds
//! are farther than the last threshold is hidden; otherwise it shows the
//! band its distance first fits into. Distance exactly on a threshold stays
//! in the finer band.

use crate::core::config::LodBand;

/// Outcome of evaluating a chunk's distance against the band table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodDecision {
    /// Beyond the last band
    Hidden,
    /// Inside band `band`
    Visible { band: usize },
}

impl LodDecision {
    pub fn is_visible(self) -> bool {
        matches!(self, LodDecision::Visible { .. })
    }

    pub fn band(self) -> Option<usize> {
        match self {
            LodDecision::Visible { band } => Some(band),
            LodDecision::Hidden => None,
        }
    }
}

/// Select the band index for `distance`
///
/// Scans the thresholds in order and only advances while the distance
/// strictly exceeds the current one. Past the final threshold the last
/// index is returned; visibility is decided separately.
///
/// # Examples
/// ```
/// use terrastream::streaming::lod::select_band;
///
/// let bands = [50.0, 100.0, 200.0];
/// assert_eq!(select_band(&bands, 49.0), 0);
/// assert_eq!(select_band(&bands, 50.0), 0);
/// assert_eq!(select_band(&bands, 51.0), 1);
/// assert_eq!(select_band(&bands, 200.0), 2);
/// assert_eq!(select_band(&bands, 201.0), 2);
/// ```
pub fn select_band(thresholds: &[f32], distance: f32) -> usize {
    scan(thresholds.iter().copied(), distance)
}

fn scan(thresholds: impl ExactSizeIterator<Item = f32>, distance: f32) -> usize {
    let last = thresholds.len().saturating_sub(1);
    let mut index = 0;
    for (i, threshold) in thresholds.enumerate().take(last) {
        if distance > threshold {
            index = i + 1;
        } else {
            break;
        }
    }
    index
}

/// Whether `distance` is inside the last threshold
pub fn within_view(thresholds: &[f32], distance: f32) -> bool {
    thresholds.last().is_some_and(|&max| distance <= max)
}

/// Evaluate a band table for a chunk at `distance`
pub fn evaluate_bands(bands: &[LodBand], distance: f32) -> LodDecision {
    let max_view = match bands.last() {
        Some(band) => band.max_distance,
        None => return LodDecision::Hidden,
    };
    if distance > max_view {
        return LodDecision::Hidden;
    }

    let band = scan(bands.iter().map(|b| b.max_distance), distance);
    LodDecision::Visible { band }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands() -> Vec<LodBand> {
        vec![LodBand::new(0, 50.0), LodBand::new(1, 100.0), LodBand::new(2, 200.0)]
    }

    #[test]
    fn test_select_band() {
        let thresholds = [50.0, 100.0, 200.0];
        let cases = [(49.0, 0), (50.0, 0), (51.0, 1), (200.0, 2), (201.0, 2)];
        for (distance, expected) in cases {
            assert_eq!(
                select_band(&thresholds, distance),
                expected,
                "Distance {} should be band {}",
                distance,
                expected
            );
        }
    }

    #[test]
    fn test_select_band_edges() {
        assert_eq!(select_band(&[], 10.0), 0);
        assert_eq!(select_band(&[5.0], 1000.0), 0);
        assert_eq!(select_band(&[10.0, 20.0], 0.0), 0);
        assert_eq!(select_band(&[10.0, 20.0], 10.0001), 1);
    }

    #[test]
    fn test_within_view() {
        let thresholds = [50.0, 100.0, 200.0];
        assert!(within_view(&thresholds, 0.0));
        assert!(within_view(&thresholds, 200.0));
        assert!(!within_view(&thresholds, 201.0));
        assert!(!within_view(&[], 0.0));
    }

    #[test]
    fn test_evaluate_bands() {
        let bands = bands();
        assert_eq!(evaluate_bands(&bands, 49.0), LodDecision::Visible { band: 0 });
        assert_eq!(evaluate_bands(&bands, 50.0), LodDecision::Visible { band: 0 });
        assert_eq!(evaluate_bands(&bands, 51.0), LodDecision::Visible { band: 1 });
        assert_eq!(evaluate_bands(&bands, 200.0), LodDecision::Visible { band: 2 });
        assert_eq!(evaluate_bands(&bands, 201.0), LodDecision::Hidden);
        assert_eq!(evaluate_bands(&[], 0.0), LodDecision::Hidden);
    }

    #[test]
    fn test_decision_accessors() {
        assert!(LodDecision::Visible { band: 1 }.is_visible());
        assert_eq!(LodDecision::Visible { band: 1 }.band(), Some(1));
        assert!(!LodDecision::Hidden.is_visible());
        assert_eq!(LodDecision::Hidden.band(), None);
    }

    #[test]
    fn test_band_monotonic_in_distance() {
        let thresholds = [50.0, 100.0, 200.0];
        let mut prev = 0;
        for i in 0..300 {
            let band = select_band(&thresholds, i as f32);
            assert!(band >= prev, "Band index should never decrease with distance");
            prev = band;
        }
    }
}
