//! Density of states modeled as a superposition of Gaussian peaks.

use crate::grid::EnergyGrid;
use serde::{Deserialize, Serialize};

/// Narrowest width a peak is evaluated with.
pub const MIN_WIDTH: f64 = 1e-3;

/// Gaussian contribution to the density of states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub id: u32,
    pub amplitude: f64,
    pub center: f64,
    pub width: f64,
}

impl Peak {
    fn weight_at(&self, energy: f64) -> f64 {
        let width = self.width.max(MIN_WIDTH);
        let z = (energy - self.center) / width;
        self.amplitude.max(0.0) * (-0.5 * z * z).exp()
    }
}

/// Editable collection of peaks.
///
/// Ids are assigned on insertion and never reused.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakSet {
    peaks: Vec<Peak>,
    next_id: u32,
}

impl PeakSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peak and return its id.
    pub fn add(&mut self, amplitude: f64, center: f64, width: f64) -> u32 {
        self.next_id += 1;
        let id = self.next_id;
        self.peaks.push(Peak {
            id,
            amplitude,
            center,
            width,
        });
        id
    }

    /// Remove the peak with `id`, returning it if present.
    pub fn remove(&mut self, id: u32) -> Option<Peak> {
        let idx = self.peaks.iter().position(|peak| peak.id == id)?;
        Some(self.peaks.remove(idx))
    }

    /// Replace the shape of the peak with `id`. Returns `false` if absent.
    pub fn update(&mut self, id: u32, amplitude: f64, center: f64, width: f64) -> bool {
        match self.peaks.iter_mut().find(|peak| peak.id == id) {
            Some(peak) => {
                peak.amplitude = amplitude;
                peak.center = center;
                peak.width = width;
                true
            }
            None => false,
        }
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}

/// Evaluate the L1-normalized density of states `g(E)` over `grid`.
///
/// When every peak vanishes on the grid (no peaks, zero amplitudes, or peaks
/// far outside the range) the result is the uniform curve `1 / N`.
pub fn density_of_states(grid: &EnergyGrid, peaks: &[Peak]) -> Vec<f64> {
    let raw: Vec<f64> = grid
        .values()
        .iter()
        .map(|&energy| peaks.iter().map(|peak| peak.weight_at(energy)).sum())
        .collect();

    normalize_or_uniform(raw, "density of states")
}

/// Divide every value by the total, or fall back to a uniform curve.
pub(crate) fn normalize_or_uniform(mut curve: Vec<f64>, what: &str) -> Vec<f64> {
    let sum: f64 = curve.iter().sum();
    let n = curve.len() as f64;
    if sum > 0.0 && sum.is_finite() {
        curve.iter_mut().for_each(|val| *val /= sum);
    } else {
        log::warn!("{what} sums to {sum}, falling back to a uniform curve");
        curve.iter_mut().for_each(|val| *val = 1.0 / n);
    }
    curve
}
