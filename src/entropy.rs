//! Histogram-based Shannon entropy normalized to `[0, 1]`.

use crate::particle::Particle;
use serde::{Deserialize, Serialize};

/// Shannon entropy of `values` binned into `bin_count` equal-width bins,
/// divided by `ln(bin_count)`.
///
/// Returns 0 for empty or constant samples, for fewer than two bins, and
/// when the spread is not finite.
pub fn normalized_entropy(values: &[f64], bin_count: usize) -> f64 {
    if values.is_empty() || bin_count < 2 {
        return 0.0;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if min == max || !range.is_finite() {
        return 0.0;
    }

    let mut counts = vec![0usize; bin_count];
    for &val in values {
        let pos = ((val - min) / range * bin_count as f64).floor();
        // NaN casts to 0; the upper edge lands on the last bin.
        let idx = (pos as usize).min(bin_count - 1);
        counts[idx] += 1;
    }

    let total = values.len() as f64;
    let entropy: f64 = counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.ln()
        })
        .sum();

    (entropy / (bin_count as f64).ln()).clamp(0.0, 1.0)
}

/// Bin count and weight of one particle attribute in the gauge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub bins: usize,
    pub weight: f64,
}

/// Combined disorder gauge over particle speed, size and hue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyGauge {
    pub speed: Channel,
    pub size: Channel,
    pub hue: Channel,
}

impl Default for EntropyGauge {
    fn default() -> Self {
        Self {
            speed: Channel {
                bins: 12,
                weight: 1.0,
            },
            size: Channel {
                bins: 8,
                weight: 1.0,
            },
            hue: Channel {
                bins: 12,
                weight: 1.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntropyReport {
    pub speed: f64,
    pub size: f64,
    pub hue: f64,
    /// Weighted mean of the three channels, in `[0, 1]`.
    pub combined: f64,
}

impl EntropyGauge {
    pub fn observe(&self, particles: &[Particle]) -> EntropyReport {
        let speeds: Vec<f64> = particles.iter().map(|p| p.speed).collect();
        let sizes: Vec<f64> = particles.iter().map(|p| p.size).collect();
        let hues: Vec<f64> = particles.iter().map(|p| p.hue).collect();

        let speed = normalized_entropy(&speeds, self.speed.bins);
        let size = normalized_entropy(&sizes, self.size.bins);
        let hue = normalized_entropy(&hues, self.hue.bins);

        let weight_sum = self.speed.weight + self.size.weight + self.hue.weight;
        let combined = if weight_sum > 0.0 {
            (self.speed.weight * speed + self.size.weight * size + self.hue.weight * hue)
                / weight_sum
        } else {
            0.0
        };

        EntropyReport {
            speed,
            size,
            hue,
            combined: combined.clamp(0.0, 1.0),
        }
    }
}
