use crate::error::KernelError;
use serde::{Deserialize, Serialize};

/// Evenly spaced energy axis over `[min, max]`.
///
/// Immutable once built; rebuild it when the range or size changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyGrid {
    values: Vec<f64>,
}

impl EnergyGrid {
    /// Build `count` evenly spaced energies from `min` to `max` (both included).
    ///
    /// # Errors
    /// Returns [`KernelError::InvalidRange`] if `min >= max`, either bound is
    /// not finite, `count < 2`, or the range is too narrow for `count`
    /// strictly increasing points.
    pub fn build(min: f64, max: f64, count: usize) -> Result<Self, KernelError> {
        let invalid = KernelError::InvalidRange { min, max, count };
        if !min.is_finite() || !max.is_finite() || min >= max || count < 2 {
            return Err(invalid);
        }

        let span = max - min;
        let last = count - 1;
        let mut values: Vec<f64> = (0..count)
            .map(|i| min + (i as f64 / last as f64) * span)
            .collect();
        // Pin the end points so they match the requested bounds exactly.
        values[0] = min;
        values[last] = max;

        if values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid);
        }

        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.values[0]
    }

    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Spacing between neighbouring points.
    pub fn step(&self) -> f64 {
        (self.max() - self.min()) / (self.len() - 1) as f64
    }

    /// Position of `energy` along the axis, clamped to `[0, 1]`.
    pub fn ratio(&self, energy: f64) -> f64 {
        ((energy - self.min()) / (self.max() - self.min())).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_spacing() {
        for &(min, max, count) in &[(0.0, 5.0, 300), (-2.0, 4.0, 2), (0.1, 0.3, 257)] {
            let grid = EnergyGrid::build(min, max, count).unwrap();
            assert_eq!(grid.len(), count);
            assert_eq!(grid.min(), min);
            assert_eq!(grid.max(), max);
            assert!(grid.values().windows(2).all(|w| w[0] < w[1]));

            let step = grid.step();
            for w in grid.values().windows(2) {
                assert!((w[1] - w[0] - step).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(matches!(
            EnergyGrid::build(1.0, 1.0, 10),
            Err(KernelError::InvalidRange { .. })
        ));
        assert!(EnergyGrid::build(2.0, 1.0, 10).is_err());
        assert!(EnergyGrid::build(0.0, 1.0, 1).is_err());
        assert!(EnergyGrid::build(0.0, 1.0, 0).is_err());
        assert!(EnergyGrid::build(f64::NAN, 1.0, 10).is_err());
        assert!(EnergyGrid::build(0.0, f64::INFINITY, 10).is_err());
    }

    #[test]
    fn ratio_is_clamped() {
        let grid = EnergyGrid::build(0.0, 4.0, 5).unwrap();
        assert_eq!(grid.ratio(-1.0), 0.0);
        assert_eq!(grid.ratio(2.0), 0.5);
        assert_eq!(grid.ratio(9.0), 1.0);
    }
}
