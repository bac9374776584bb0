//! Settling and correlation statistics of frame observables.
//!
//! A gauge such as the combined entropy jumps after a resample or a preset and
//! then drifts back toward a settled level. [`Trace`] locates the frame where
//! the drift ends and summarizes the settled part, correcting its error bar
//! for the correlation between consecutive frames.

use serde::{Deserialize, Serialize};

/// Half-width of the settle band in standard deviations of the reference tail.
const SETTLE_BAND_SIGMAS: f64 = 3.0;

/// Smallest settle band, relative to the settled level.
const SETTLE_BAND_FLOOR: f64 = 1e-9;

/// Sokal window: sum correlations up to lag `SOKAL_WINDOW * tau`.
const SOKAL_WINDOW: f64 = 5.0;

/// Range and mean of an uncorrelated observable.
#[derive(Debug, Clone)]
pub struct Extent {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtentReport {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Extent {
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.count += 1;
        self.sum += val;
        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }

    pub fn report(&self) -> ExtentReport {
        if self.count == 0 {
            return ExtentReport {
                count: 0,
                mean: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        ExtentReport {
            count: self.count,
            mean: self.sum / self.count as f64,
            min: self.min,
            max: self.max,
        }
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-frame values of a gauge, in save order.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    vals: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceReport {
    /// Mean over the settled frames.
    pub mean: f64,
    pub std_dev: f64,
    /// Standard error of `mean`, inflated by the autocorrelation time.
    pub sem: f64,
    /// Integrated autocorrelation time of the settled frames, in frames.
    pub autocorr_time: f64,
    /// First frame inside the band around the settled level.
    pub settle_frame: usize,
    /// Whether the gauge settled within the first half of the trace.
    pub settled: bool,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    pub fn report(&self) -> TraceReport {
        let n = self.vals.len();
        let settle_frame = settle_frame(&self.vals);
        let settled = &self.vals[settle_frame..];
        let m = settled.len();

        let var = variance(settled);
        let tau = autocorr_time(settled);
        TraceReport {
            mean: mean(settled),
            std_dev: var.sqrt(),
            sem: (var * 2.0 * tau / m as f64).sqrt(),
            autocorr_time: tau,
            settle_frame,
            settled: n > 0 && settle_frame < n / 2,
        }
    }
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn variance(vals: &[f64]) -> f64 {
    let n = vals.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// First index whose value lies within the settle band.
///
/// The settled level and the band width come from the last quarter of the
/// trace. Returns `vals.len()` if no value enters the band.
fn settle_frame(vals: &[f64]) -> usize {
    let n = vals.len();
    if n == 0 {
        return 0;
    }

    let tail = &vals[n - (n / 4).max(1)..];
    let level = mean(tail);
    let spread = if tail.len() > 1 {
        variance(tail).sqrt()
    } else {
        0.0
    };
    let band = (SETTLE_BAND_SIGMAS * spread).max(SETTLE_BAND_FLOOR * level.abs().max(1.0));

    vals.iter()
        .position(|&val| (val - level).abs() <= band)
        .unwrap_or(n)
}

/// Integrated autocorrelation time with Sokal's automatic window.
///
/// Never below `0.5`, the value of uncorrelated frames; flat or short
/// series report `0.5`.
fn autocorr_time(vals: &[f64]) -> f64 {
    let n = vals.len();
    if n < 2 {
        return 0.5;
    }

    let mean = mean(vals);
    let devs: Vec<f64> = vals.iter().map(|&val| val - mean).collect();
    let c0 = devs.iter().map(|d| d * d).sum::<f64>() / n as f64;
    if c0 <= 0.0 {
        return 0.5;
    }

    let mut tau = 0.5;
    for lag in 1..n {
        let c = devs[..n - lag]
            .iter()
            .zip(&devs[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        tau += c / c0;
        if lag as f64 >= SOKAL_WINDOW * tau {
            break;
        }
    }

    tau.max(0.5)
}
