//! Boltzmann populations over a ladder of discrete energy levels.

use crate::occupation::thermal_energy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPopulation {
    /// Occupation probability of each level; sums to 1.
    pub probabilities: Vec<f64>,
    /// `ln Z`, kept in log form so cold ladders do not overflow.
    pub log_partition_function: f64,
}

/// Evenly spaced ladder `base, base + step, ...` with `count` levels.
pub fn ladder(base: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| base + i as f64 * step).collect()
}

/// Boltzmann probabilities `exp(-E_i / kT) / Z` of each level.
///
/// Weights are taken relative to the lowest level, so the result is finite at
/// any temperature; `T <= 0` is clamped like the occupation curves.
pub fn boltzmann_populations(levels: &[f64], temperature: f64) -> LevelPopulation {
    if levels.is_empty() {
        return LevelPopulation {
            probabilities: Vec::new(),
            log_partition_function: f64::NEG_INFINITY,
        };
    }

    let kt = thermal_energy(temperature);
    let e_min = levels.iter().copied().fold(f64::INFINITY, f64::min);
    let weights: Vec<f64> = levels
        .iter()
        .map(|&energy| (-(energy - e_min) / kt).exp())
        .collect();
    let z_rel: f64 = weights.iter().sum();

    LevelPopulation {
        probabilities: weights.iter().map(|w| w / z_rel).collect(),
        log_partition_function: z_rel.ln() - e_min / kt,
    }
}

/// Split `total` particles across levels in proportion to `weights`.
///
/// Each level gets the floor of its share; the leftovers go to the levels
/// with the largest fractional parts (ties to the lower level). The counts
/// always sum to `total`. Non-positive weights get nothing unless every
/// weight is non-positive, in which case the split is uniform.
pub fn integer_counts(weights: &[f64], total: usize) -> Vec<usize> {
    let n_lvl = weights.len();
    if n_lvl == 0 {
        return Vec::new();
    }

    let clean: Vec<f64> = weights
        .iter()
        .map(|&w| if w.is_finite() { w.max(0.0) } else { 0.0 })
        .collect();
    let sum: f64 = clean.iter().sum();
    let expected: Vec<f64> = if sum > 0.0 {
        clean.iter().map(|w| w / sum * total as f64).collect()
    } else {
        vec![total as f64 / n_lvl as f64; n_lvl]
    };

    let mut counts: Vec<usize> = expected.iter().map(|e| e.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();
    let remainder = total.saturating_sub(assigned).min(n_lvl);

    let mut order: Vec<usize> = (0..n_lvl).collect();
    order.sort_by(|&a, &b| {
        let frac_a = expected[a] - expected[a].floor();
        let frac_b = expected[b] - expected[b].floor();
        frac_b.total_cmp(&frac_a).then(a.cmp(&b))
    });
    for &i_lvl in order.iter().take(remainder) {
        counts[i_lvl] += 1;
    }

    counts
}

/// Whether an upper level holds more particles than the level below it.
pub fn is_inverted(counts: &[usize]) -> bool {
    counts.windows(2).any(|pair| pair[1] > pair[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupation::K_B_EV;

    #[test]
    fn probabilities_follow_boltzmann_ratios() {
        let levels = ladder(0.0, 0.05, 6);
        let temperature = 600.0;
        let pop = boltzmann_populations(&levels, temperature);

        let sum: f64 = pop.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);

        let kt = K_B_EV * temperature;
        let ratio = pop.probabilities[1] / pop.probabilities[0];
        assert!((ratio - (-0.05 / kt).exp()).abs() < 1e-12);
        assert!(pop.probabilities.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn cold_ladder_stays_finite() {
        let levels = ladder(1.0, 1.0, 8);
        let pop = boltzmann_populations(&levels, 0.0);
        assert_eq!(pop.probabilities[0], 1.0);
        assert!(pop.probabilities.iter().all(|p| p.is_finite()));
        assert!(pop.log_partition_function.is_finite());
    }

    #[test]
    fn log_partition_function_matches_direct_sum() {
        let levels = ladder(0.0, 0.01, 4);
        let pop = boltzmann_populations(&levels, 300.0);
        let kt = K_B_EV * 300.0;
        let z: f64 = levels.iter().map(|e| (-e / kt).exp()).sum();
        assert!((pop.log_partition_function - z.ln()).abs() < 1e-12);
    }

    #[test]
    fn counts_sum_to_total() {
        let weights = [0.5, 0.3, 0.2];
        assert_eq!(integer_counts(&weights, 10), vec![5, 3, 2]);
        assert_eq!(integer_counts(&weights, 7).iter().sum::<usize>(), 7);

        let thirds = [1.0, 1.0, 1.0];
        assert_eq!(integer_counts(&thirds, 10), vec![4, 3, 3]);

        assert_eq!(integer_counts(&[0.0, 0.0], 5), vec![3, 2]);
        assert_eq!(integer_counts(&[], 5), Vec::<usize>::new());
        assert_eq!(integer_counts(&[1.0, f64::NAN], 4), vec![4, 0]);
    }

    #[test]
    fn inversion_is_detected() {
        assert!(!is_inverted(&[5, 3, 2]));
        assert!(is_inverted(&[2, 5, 3]));
        assert!(!is_inverted(&[]));
    }
}
