//! Inverse-CDF sampling of energies from the joint curve `g(E) f(E)`.

use crate::dos::normalize_or_uniform;
use crate::error::KernelError;
use crate::grid::EnergyGrid;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Joint curve and its cumulative distribution, built once per curve change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSampler {
    joint: Vec<f64>,
    cdf: Vec<f64>,
    occupied: f64,
}

/// Scalar diagnostics of a joint curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSummary {
    /// Expected energy under the joint curve.
    pub mean_energy: f64,
    /// Unnormalized weight `sum g f` before the joint curve was normalized.
    pub occupied: f64,
}

impl WeightedSampler {
    /// Combine a density and an occupation curve into a sampler.
    ///
    /// Falls back to a uniform joint curve when the product sums to zero, so
    /// [`WeightedSampler::sample`] never fails.
    ///
    /// # Errors
    /// Returns [`KernelError::LengthMismatch`] if the curves differ in length
    /// or are empty.
    pub fn new(density: &[f64], occupation: &[f64]) -> Result<Self, KernelError> {
        if density.len() != occupation.len() || density.is_empty() {
            return Err(KernelError::LengthMismatch {
                expected: density.len(),
                found: occupation.len(),
            });
        }

        let product: Vec<f64> = density
            .iter()
            .zip(occupation)
            .map(|(g, f)| g * f)
            .collect();
        let occupied: f64 = product.iter().sum();
        let joint = normalize_or_uniform(product, "joint curve");

        let mut acc = 0.0;
        let mut cdf: Vec<f64> = joint
            .iter()
            .map(|p| {
                acc += p;
                acc
            })
            .collect();
        let n = cdf.len();
        let last = cdf[n - 1];
        if last > 0.0 && last.is_finite() {
            cdf.iter_mut().for_each(|c| *c /= last);
        } else {
            cdf.iter_mut()
                .enumerate()
                .for_each(|(i, c)| *c = (i + 1) as f64 / n as f64);
        }

        log::debug!("built cdf over {n} points (occupied weight {occupied:.6e})");

        Ok(Self {
            joint,
            cdf,
            occupied: if occupied.is_finite() { occupied } else { 0.0 },
        })
    }

    /// Normalized joint curve.
    pub fn joint(&self) -> &[f64] {
        &self.joint
    }

    /// Cumulative distribution; non-decreasing with a last element of 1.
    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    /// Draw one energy.
    ///
    /// Finds the first index `i` with `cdf[i] >= r` by binary search, then
    /// draws uniformly between `grid[i - 1]` and `grid[i]` (`grid[0]` when
    /// `i == 0`).
    pub fn sample<R: Rng + ?Sized>(&self, grid: &EnergyGrid, rng: &mut R) -> f64 {
        let values = grid.values();
        let last = values.len().min(self.cdf.len()) - 1;

        // Draw from (0, 1] so zero-weight leading cells are never picked.
        let r: f64 = 1.0 - rng.random::<f64>();
        let idx = self.cdf.partition_point(|&c| c < r).min(last);

        let right = values[idx];
        let left = values[idx.saturating_sub(1)];
        let u: f64 = rng.random();
        left + u * (right - left)
    }

    /// Mean energy and occupied weight of the joint curve.
    pub fn summary(&self, grid: &EnergyGrid) -> JointSummary {
        JointSummary {
            mean_energy: self.mean_energy(grid),
            occupied: self.occupied,
        }
    }

    /// Expected grid energy under the joint curve.
    pub fn mean_energy(&self, grid: &EnergyGrid) -> f64 {
        grid.values()
            .iter()
            .zip(&self.joint)
            .map(|(e, p)| e * p)
            .sum()
    }
}
