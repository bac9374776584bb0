use crate::config::{Config, PeakConfig};
use crate::dos::{PeakSet, density_of_states};
use crate::ensemble::{self, Ensemble};
use crate::entropy::EntropyReport;
use crate::evolver::{ParticleStateEvolver, Preset, mark_stale};
use crate::grid::EnergyGrid;
use crate::model::Frame;
use crate::occupation::{DistributionKind, occupation, thermal_energy};
use crate::particle::Particle;
use crate::sampler::{JointSummary, WeightedSampler};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Everything needed to resume a session bit-exactly.
#[derive(Serialize, Deserialize)]
struct Checkpoint {
    cfg: Config,
    peaks: PeakSet,
    particles: Vec<Particle>,
    step: usize,
    rng: ChaCha12Rng,
}

/// Live sampling session.
///
/// Owns the configuration, the derived curves, the particle population and
/// the random number generator. Curves are rebuilt only when the
/// configuration changes.
pub struct Session {
    cfg: Config,
    peaks: PeakSet,
    grid: EnergyGrid,
    density: Vec<f64>,
    occupation: Vec<f64>,
    sampler: WeightedSampler,
    evolver: ParticleStateEvolver,
    particles: Vec<Particle>,
    step: usize,
    rng: ChaCha12Rng,
}

impl Session {
    /// Create a new `Session` with the given configuration and an OS-seeded generator.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let rng = ChaCha12Rng::try_from_os_rng()?;
        Self::with_rng(cfg, rng)
    }

    /// Create a new `Session` with a fixed seed.
    pub fn from_seed(cfg: Config, seed: u64) -> Result<Self> {
        Self::with_rng(cfg, ChaCha12Rng::seed_from_u64(seed))
    }

    fn with_rng(cfg: Config, rng: ChaCha12Rng) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let mut peaks = PeakSet::new();
        for peak in &cfg.peaks {
            peaks.add(peak.amplitude, peak.center, peak.width);
        }

        let mut session = Self::assemble(cfg, peaks, Vec::new(), 0, rng)?;
        session.populate().context("failed to populate particles")?;
        Ok(session)
    }

    fn assemble(
        cfg: Config,
        peaks: PeakSet,
        particles: Vec<Particle>,
        step: usize,
        rng: ChaCha12Rng,
    ) -> Result<Self> {
        let grid = EnergyGrid::build(cfg.grid.energy_min, cfg.grid.energy_max, cfg.grid.n_points)
            .context("failed to build energy grid")?;
        let density = density_of_states(&grid, peaks.peaks());
        let occupation = occupation(
            &grid,
            cfg.occupation.kind,
            cfg.occupation.temperature,
            cfg.occupation.chemical_potential,
        );
        let sampler =
            WeightedSampler::new(&density, &occupation).context("failed to build sampler")?;
        let evolver = ParticleStateEvolver::new(cfg.visual);

        Ok(Self {
            cfg,
            peaks,
            grid,
            density,
            occupation,
            sampler,
            evolver,
            particles,
            step,
            rng,
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn grid(&self) -> &EnergyGrid {
        &self.grid
    }

    pub fn peaks(&self) -> &PeakSet {
        &self.peaks
    }

    /// Normalized density of states `g(E)`.
    pub fn density(&self) -> &[f64] {
        &self.density
    }

    /// Display occupation curve `f(E)`.
    pub fn occupation(&self) -> &[f64] {
        &self.occupation
    }

    /// Normalized joint curve `g(E) f(E)`.
    pub fn joint(&self) -> &[f64] {
        self.sampler.joint()
    }

    pub fn summary(&self) -> JointSummary {
        self.sampler.summary(&self.grid)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn entropy(&self) -> EntropyReport {
        self.cfg.entropy.observe(&self.particles)
    }

    /// Add a density-of-states peak and return its id.
    pub fn add_peak(&mut self, amplitude: f64, center: f64, width: f64) -> Result<u32> {
        let mut peaks = self.peaks.clone();
        let id = peaks.add(amplitude, center, width);
        self.replace_peaks(peaks).context("failed to add peak")?;
        Ok(id)
    }

    /// Remove a peak; returns `false` if no peak has `id`.
    pub fn remove_peak(&mut self, id: u32) -> Result<bool> {
        let mut peaks = self.peaks.clone();
        if peaks.remove(id).is_none() {
            return Ok(false);
        }
        self.replace_peaks(peaks).context("failed to remove peak")?;
        Ok(true)
    }

    /// Reshape a peak; returns `false` if no peak has `id`.
    pub fn update_peak(&mut self, id: u32, amplitude: f64, center: f64, width: f64) -> Result<bool> {
        let mut peaks = self.peaks.clone();
        if !peaks.update(id, amplitude, center, width) {
            return Ok(false);
        }
        self.replace_peaks(peaks).context("failed to update peak")?;
        Ok(true)
    }

    /// Change the occupation function and rebuild the dependent curves.
    pub fn set_occupation(
        &mut self,
        kind: DistributionKind,
        temperature: f64,
        chemical_potential: f64,
    ) -> Result<()> {
        let mut cfg = self.cfg.clone();
        cfg.occupation.kind = kind;
        cfg.occupation.temperature = temperature;
        cfg.occupation.chemical_potential = chemical_potential;
        self.commit_cfg(cfg)?;

        self.occupation = occupation(&self.grid, kind, temperature, chemical_potential);
        self.refresh_sampler().context("failed to refresh sampler")
    }

    /// Replace the population with `count` freshly drawn particles.
    pub fn set_particle_count(&mut self, count: usize) -> Result<()> {
        let mut cfg = self.cfg.clone();
        cfg.particles.count = count;
        self.commit_cfg(cfg)?;
        self.populate()
    }

    pub fn apply_preset(&mut self, preset: Preset) -> Result<usize> {
        let touched = self
            .evolver
            .apply_preset(&mut self.particles, preset, &self.sampler, &self.grid, &mut self.rng)
            .with_context(|| format!("failed to apply {preset:?}"))?;
        Ok(touched)
    }

    /// Snapshot of the current population.
    pub fn observe(&self) -> Frame {
        let energies: Vec<f64> = self.particles.iter().map(|p| p.energy).collect();
        let mean_energy = if energies.is_empty() {
            f64::NAN
        } else {
            energies.iter().sum::<f64>() / energies.len() as f64
        };
        Frame {
            step: self.step,
            entropy: self.entropy(),
            mean_energy,
            expected_energy: self.sampler.mean_energy(&self.grid),
            energies,
        }
    }

    /// Perform the simulation and save the resulting frames to a binary file.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let saves_per_file = self.cfg.output.saves_per_file;
        for i_save in 0..saves_per_file {
            for _ in 0..self.cfg.output.steps_per_save {
                self.perform_step().context("failed to perform step")?;
            }

            encode::write(&mut writer, &self.observe()).context("failed to serialize frame")?;

            let progress = 100.0 * (i_save + 1) as f64 / saves_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire session state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let checkpoint = Checkpoint {
            cfg: self.cfg.clone(),
            peaks: self.peaks.clone(),
            particles: self.particles.clone(),
            step: self.step,
            rng: self.rng.clone(),
        };

        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &checkpoint).context("failed to serialize checkpoint")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved session checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let checkpoint: Checkpoint =
            decode::from_read(&mut reader).context("failed to deserialize checkpoint")?;
        checkpoint
            .cfg
            .validate()
            .context("failed to validate checkpoint config")?;

        Self::assemble(
            checkpoint.cfg,
            checkpoint.peaks,
            checkpoint.particles,
            checkpoint.step,
            checkpoint.rng,
        )
    }

    /// Advance the session by one step.
    pub fn perform_step(&mut self) -> Result<()> {
        self.step += 1;

        // Redraw part of the population from the current curves.
        let ptc = &self.cfg.particles;
        if ptc.auto_resample && self.step % ptc.resample_interval == 0 {
            self.evolver
                .resample(
                    &mut self.particles,
                    &self.sampler,
                    &self.grid,
                    ptc.resample_fraction,
                    &mut self.rng,
                )
                .context("failed to resample particles")?;
        }

        // Ease display attributes toward the particles' energies.
        self.evolver
            .relax_toward_energy(&mut self.particles, &self.grid, ptc.relax_rate);

        // Apply the ensemble constraint.
        self.apply_ensemble().context("failed to apply ensemble")?;

        Ok(())
    }

    fn apply_ensemble(&mut self) -> Result<()> {
        let ens = &self.cfg.ensemble;
        let kt = thermal_energy(self.cfg.occupation.temperature);
        let sigma = self.evolver.visual().thermal_sigma(kt);

        match ens.kind {
            Ensemble::Free => {}
            Ensemble::Microcanonical => {
                ensemble::rescale_to_total_energy(&mut self.particles, ens.total_energy);
            }
            Ensemble::Canonical => {
                ensemble::thermostat(&mut self.particles, sigma, ens.thermostat_nudge, &mut self.rng);
            }
            Ensemble::Mixed => {
                ensemble::rescale_to_total_energy(&mut self.particles, ens.total_energy);
                ensemble::thermostat(&mut self.particles, sigma, ens.thermostat_nudge, &mut self.rng);
            }
            Ensemble::GrandCanonical => {
                if self.step % ens.exchange_interval == 0 {
                    let exchange = ensemble::grand_canonical_tick(
                        &mut self.particles,
                        self.cfg.occupation.chemical_potential,
                        kt,
                        ens.max_particles,
                        &mut self.rng,
                        |id, rng| self.evolver.spawn(id, &self.sampler, &self.grid, rng),
                    )?;
                    log::debug!("exchange at step {}: {exchange:?}", self.step);
                }
            }
        }

        Ok(())
    }

    fn populate(&mut self) -> Result<()> {
        self.particles = self
            .evolver
            .populate(
                self.cfg.particles.count,
                &self.sampler,
                &self.grid,
                &mut self.rng,
            )
            .context("failed to draw particles")?;
        Ok(())
    }

    /// Swap in a validated configuration; the current one is kept on error.
    fn commit_cfg(&mut self, cfg: Config) -> Result<()> {
        cfg.validate().context("failed to validate config")?;
        self.cfg = cfg;
        Ok(())
    }

    fn replace_peaks(&mut self, peaks: PeakSet) -> Result<()> {
        let mut cfg = self.cfg.clone();
        cfg.peaks = peaks
            .peaks()
            .iter()
            .map(|peak| PeakConfig {
                amplitude: peak.amplitude,
                center: peak.center,
                width: peak.width,
            })
            .collect();
        self.commit_cfg(cfg)?;
        self.peaks = peaks;

        self.density = density_of_states(&self.grid, self.peaks.peaks());
        self.refresh_sampler().context("failed to refresh sampler")
    }

    /// Rebuild the sampler and, if enabled, redraw part of the population.
    fn refresh_sampler(&mut self) -> Result<()> {
        self.sampler = WeightedSampler::new(&self.density, &self.occupation)?;
        log::debug!("rebuilt sampler, mean energy {:.4}", self.sampler.mean_energy(&self.grid));

        mark_stale(&mut self.particles);
        let ptc = &self.cfg.particles;
        if ptc.auto_resample {
            self.evolver.resample(
                &mut self.particles,
                &self.sampler,
                &self.grid,
                ptc.resample_fraction,
                &mut self.rng,
            )?;
        }
        Ok(())
    }
}
