//! Occupation functions `f(E)` for classical, Fermi-like and Bose-like particles.

use crate::grid::EnergyGrid;
use serde::{Deserialize, Serialize};

/// Boltzmann constant in eV/K.
pub const K_B_EV: f64 = 8.617333262e-5;

/// Lowest temperature (K) used for evaluation.
pub const MIN_TEMPERATURE: f64 = 1e-6;

/// Lowest thermal energy (eV) used for evaluation.
pub const MIN_THERMAL_ENERGY: f64 = 1e-10;

/// Bose denominators at or below this are treated as divergent.
pub const BOSE_EPSILON: f64 = 1e-8;

/// Finite stand-in for a divergent occupation.
pub const OCCUPATION_CEILING: f64 = 1e8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    #[serde(alias = "maxwell")]
    Classical,
    #[serde(alias = "fermi")]
    FermiLike,
    #[serde(alias = "bose")]
    BoseLike,
}

/// Thermal energy `kT` in eV, with the temperature clamped to a positive floor.
pub fn thermal_energy(temperature: f64) -> f64 {
    let temperature = if temperature.is_nan() {
        MIN_TEMPERATURE
    } else {
        temperature.max(MIN_TEMPERATURE)
    };
    (K_B_EV * temperature).max(MIN_THERMAL_ENERGY)
}

/// Physical occupation over `grid`.
///
/// Values are finite and non-negative: divergences are replaced by
/// [`OCCUPATION_CEILING`].
pub fn occupation_raw(
    grid: &EnergyGrid,
    kind: DistributionKind,
    temperature: f64,
    chemical_potential: f64,
) -> Vec<f64> {
    let kt = thermal_energy(temperature);
    grid.values()
        .iter()
        .map(|&energy| {
            let val = match kind {
                DistributionKind::Classical => (-energy / kt).exp(),
                DistributionKind::FermiLike => {
                    1.0 / (((energy - chemical_potential) / kt).exp() + 1.0)
                }
                DistributionKind::BoseLike => {
                    let denom = ((energy - chemical_potential) / kt).exp() - 1.0;
                    if denom <= BOSE_EPSILON {
                        OCCUPATION_CEILING
                    } else {
                        1.0 / denom
                    }
                }
            };
            if val.is_nan() {
                0.0
            } else {
                val.clamp(0.0, OCCUPATION_CEILING)
            }
        })
        .collect()
}

/// Occupation over `grid` as plotted.
///
/// Classical and Bose-like curves are rescaled so their maximum is 1; this is a
/// display convenience, not a probability. Fermi-like values are already in `[0, 1]`.
pub fn occupation(
    grid: &EnergyGrid,
    kind: DistributionKind,
    temperature: f64,
    chemical_potential: f64,
) -> Vec<f64> {
    match kind {
        DistributionKind::FermiLike => {
            occupation_raw(grid, kind, temperature, chemical_potential)
        }
        DistributionKind::Classical => {
            // exp(-E/kT) peaks at the lowest grid energy, so shift by it
            // instead of dividing by a possibly overflowing maximum.
            let kt = thermal_energy(temperature);
            let e0 = grid.min();
            grid.values()
                .iter()
                .map(|&energy| (-(energy - e0) / kt).exp())
                .collect()
        }
        DistributionKind::BoseLike => {
            let mut curve = occupation_raw(grid, kind, temperature, chemical_potential);
            let max = curve.iter().copied().fold(0.0, f64::max);
            if max > 0.0 {
                curve
                    .iter_mut()
                    .for_each(|val| *val = (*val / max).clamp(0.0, 1.0));
            }
            curve
        }
    }
}
