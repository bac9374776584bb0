use crate::config::Config;
use crate::model::Frame;
use crate::stats::{Extent, Trace};
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, frame: &Frame) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Combined entropy gauge, with the frame where it settles.
pub struct CombinedEntropy {
    series: Trace,
}

impl CombinedEntropy {
    pub fn new() -> Self {
        Self {
            series: Trace::new(),
        }
    }
}

impl Obs for CombinedEntropy {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        self.series.push(frame.entropy.combined);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "combined_entropy": self.series.report() })
    }
}

/// Per-channel entropy range and average.
pub struct ChannelEntropy {
    speed: Extent,
    size: Extent,
    hue: Extent,
}

impl ChannelEntropy {
    pub fn new() -> Self {
        Self {
            speed: Extent::new(),
            size: Extent::new(),
            hue: Extent::new(),
        }
    }
}

impl Obs for ChannelEntropy {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        self.speed.add(frame.entropy.speed);
        self.size.add(frame.entropy.size);
        self.hue.add(frame.entropy.hue);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "channel_entropy": {
                "speed": self.speed.report(),
                "size": self.size.report(),
                "hue": self.hue.report(),
            }
        })
    }
}

/// Sample mean energy against the expectation of the joint curve.
pub struct MeanEnergy {
    series: Trace,
    expected: Extent,
}

impl MeanEnergy {
    pub fn new() -> Self {
        Self {
            series: Trace::new(),
            expected: Extent::new(),
        }
    }
}

impl Obs for MeanEnergy {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        if frame.mean_energy.is_finite() {
            self.series.push(frame.mean_energy);
        }
        self.expected.add(frame.expected_energy);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "mean_energy": self.series.report(),
            "expected_energy": self.expected.report(),
        })
    }
}

/// Population size; only varies under particle exchange.
pub struct ParticleCount {
    series: Trace,
}

impl ParticleCount {
    pub fn new() -> Self {
        Self {
            series: Trace::new(),
        }
    }
}

impl Obs for ParticleCount {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        self.series.push(frame.particle_count() as f64);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "particle_count": self.series.report() })
    }
}

/// Histogram of particle energies over the grid range, pooled over frames.
pub struct EnergyHistogram {
    min: f64,
    max: f64,
    counts: Vec<u64>,
}

impl EnergyHistogram {
    pub fn new(cfg: &Config) -> Self {
        Self {
            min: cfg.grid.energy_min,
            max: cfg.grid.energy_max,
            counts: vec![0; cfg.output.hist_bins],
        }
    }

    fn bin(&self, energy: f64) -> usize {
        let n_bins = self.counts.len();
        let ratio = (energy - self.min) / (self.max - self.min);
        ((ratio * n_bins as f64).floor().max(0.0) as usize).min(n_bins - 1)
    }
}

impl Obs for EnergyHistogram {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        for &energy in &frame.energies {
            let i_bin = self.bin(energy);
            self.counts[i_bin] += 1;
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let total: u64 = self.counts.iter().sum();
        let width = (self.max - self.min) / self.counts.len() as f64;
        let centers: Vec<f64> = (0..self.counts.len())
            .map(|i| self.min + (i as f64 + 0.5) * width)
            .collect();
        let density: Vec<f64> = self
            .counts
            .iter()
            .map(|&c| {
                if total > 0 {
                    c as f64 / (total as f64 * width)
                } else {
                    0.0
                }
            })
            .collect();
        serde_json::json!({
            "energy_histogram": {
                "centers": centers,
                "counts": self.counts,
                "density": density,
            }
        })
    }
}

/// Reads trajectory files and aggregates every observable.
pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
    n_frames: usize,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(CombinedEntropy::new()),
            Box::new(ChannelEntropy::new()),
            Box::new(MeanEnergy::new()),
            Box::new(ParticleCount::new()),
            Box::new(EnergyHistogram::new(&cfg)),
        ];
        Self {
            cfg,
            obs_ptr_vec,
            n_frames: 0,
        }
    }

    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    pub fn add_frame(&mut self, frame: &Frame) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(frame).context("failed to update observable")?;
        }
        self.n_frames += 1;
        Ok(())
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.output.saves_per_file {
            let frame: Frame = decode::from_read(&mut reader).context("failed to read frame")?;
            self.add_frame(&frame)?;
        }
        Ok(())
    }

    pub fn results(&self) -> serde_json::Value {
        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::json!({
            "n_frames": self.n_frames,
            "observables": reports,
        })
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, &self.results())
            .context("failed to serialize results")?;
        Ok(())
    }
}
