//! Mapping from physical energies to display attributes.
//!
//! Every cosmetic scaling constant lives here so the sampling kernel stays
//! in physical units.

use serde::{Deserialize, Serialize};

/// Lowest thermal energy (eV) used to derive velocity spreads.
const MIN_SPREAD_ENERGY: f64 = 1e-9;

/// Attributes a particle relaxes toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualTarget {
    pub speed: f64,
    pub size: f64,
    pub hue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualMap {
    /// Display velocity per `sqrt(eV)`.
    pub velocity_scale: f64,
    /// Hue (degrees) of the lowest energy.
    pub hue_cold: f64,
    /// Hue drop from the lowest to the highest energy.
    pub hue_span: f64,
    pub size_base: f64,
    /// Relative size growth from the lowest to the highest energy.
    pub size_span: f64,
}

impl Default for VisualMap {
    fn default() -> Self {
        Self {
            velocity_scale: 0.06,
            hue_cold: 140.0,
            hue_span: 120.0,
            size_base: 0.04,
            size_span: 0.5,
        }
    }
}

impl VisualMap {
    /// Display attributes for `energy` on an axis spanning `[min, max]`.
    pub fn target(&self, energy: f64, min: f64, max: f64) -> VisualTarget {
        let ratio = if max > min {
            ((energy - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        VisualTarget {
            speed: self.velocity_scale * (2.0 * (energy - min).max(0.0)).sqrt(),
            size: self.size_base * (1.0 + self.size_span * ratio),
            hue: self.hue_cold - self.hue_span * ratio,
        }
    }

    /// Per-component velocity spread for a thermal energy `kt` in eV.
    pub fn thermal_sigma(&self, kt: f64) -> f64 {
        kt.max(MIN_SPREAD_ENERGY).sqrt() * self.velocity_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_runs_from_cold_to_hot() {
        let map = VisualMap::default();
        assert_eq!(map.target(0.0, 0.0, 5.0).hue, 140.0);
        assert_eq!(map.target(5.0, 0.0, 5.0).hue, 20.0);
        assert_eq!(map.target(50.0, 0.0, 5.0).hue, 20.0);
    }

    #[test]
    fn speed_and_size_grow_with_energy() {
        let map = VisualMap::default();
        let low = map.target(0.5, 0.0, 5.0);
        let high = map.target(4.5, 0.0, 5.0);
        assert!(high.speed > low.speed);
        assert!(high.size > low.size);
        assert_eq!(map.target(-1.0, 0.0, 5.0).speed, 0.0);
    }

    #[test]
    fn thermal_sigma_has_a_floor() {
        let map = VisualMap::default();
        assert!(map.thermal_sigma(0.0) > 0.0);
        assert!((map.thermal_sigma(1.0) - 0.06).abs() < 1e-15);
    }
}
