//! Evolution of the particle population fed to the renderer.

use crate::display::{VisualMap, VisualTarget};
use crate::error::KernelError;
use crate::grid::EnergyGrid;
use crate::particle::{Particle, Phase};
use crate::sampler::WeightedSampler;
use rand::Rng;
use rand::seq::index;
use rand_distr::{Distribution, UnitSphere};
use serde::{Deserialize, Serialize};

/// Relative distance under which a relaxing attribute counts as settled.
const SETTLE_TOLERANCE: f64 = 1e-3;

/// One-shot population rearrangements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Give every particle the mean energy of the joint curve.
    Equalize,
    /// Redraw every particle's energy.
    Scramble,
}

/// Draws particle energies from a sampler and eases their display
/// attributes toward targets derived from those energies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleStateEvolver {
    visual: VisualMap,
}

impl ParticleStateEvolver {
    pub fn new(visual: VisualMap) -> Self {
        Self { visual }
    }

    pub fn visual(&self) -> &VisualMap {
        &self.visual
    }

    /// Display target for `energy` on `grid`.
    pub fn target(&self, grid: &EnergyGrid, energy: f64) -> VisualTarget {
        self.visual.target(energy, grid.min(), grid.max())
    }

    /// Create a settled particle with a freshly drawn energy and a random heading.
    pub fn spawn<R: Rng + ?Sized>(
        &self,
        id: usize,
        sampler: &WeightedSampler,
        grid: &EnergyGrid,
        rng: &mut R,
    ) -> Result<Particle, KernelError> {
        let energy = sampler.sample(grid, rng);
        check_energy(id, energy)?;

        let target = self.target(grid, energy);
        let heading: [f64; 3] = UnitSphere.sample(rng);
        Ok(Particle {
            id,
            energy,
            heading,
            speed: target.speed,
            size: target.size,
            hue: target.hue,
            phase: Phase::Settled,
        })
    }

    /// Create `count` particles with ids `0..count`.
    pub fn populate<R: Rng + ?Sized>(
        &self,
        count: usize,
        sampler: &WeightedSampler,
        grid: &EnergyGrid,
        rng: &mut R,
    ) -> Result<Vec<Particle>, KernelError> {
        (0..count)
            .map(|id| self.spawn(id, sampler, grid, rng))
            .collect()
    }

    /// Redraw the energy of a random `fraction` of distinct particles.
    ///
    /// At least one particle is redrawn whenever `fraction > 0`. Returns the
    /// number of redrawn particles.
    pub fn resample<R: Rng + ?Sized>(
        &self,
        particles: &mut [Particle],
        sampler: &WeightedSampler,
        grid: &EnergyGrid,
        fraction: f64,
        rng: &mut R,
    ) -> Result<usize, KernelError> {
        let n = particles.len();
        if n == 0 || !(fraction > 0.0) {
            return Ok(0);
        }
        let amount = ((n as f64 * fraction.min(1.0)).round() as usize).clamp(1, n);

        for i_ptc in index::sample(rng, n, amount) {
            let energy = sampler.sample(grid, rng);
            let particle = &mut particles[i_ptc];
            check_energy(particle.id, energy)?;
            particle.energy = energy;
            particle.phase = Phase::Resampling;
        }

        Ok(amount)
    }

    /// Blend every particle's speed, size and hue toward `target(energy)`.
    ///
    /// `rate` is the blend factor per call, clamped to `[0, 1]`; the heading
    /// of the velocity is kept.
    pub fn relax<F>(particles: &mut [Particle], target: F, rate: f64)
    where
        F: Fn(f64) -> VisualTarget,
    {
        let rate = rate.clamp(0.0, 1.0);
        for particle in particles.iter_mut() {
            let goal = target(particle.energy);

            particle.speed = blend(particle.speed, goal.speed, rate);
            particle.size = blend(particle.size, goal.size, rate);
            particle.hue = blend(particle.hue, goal.hue, rate);

            let settled = is_close(particle.speed, goal.speed)
                && is_close(particle.size, goal.size)
                && is_close(particle.hue, goal.hue);
            particle.phase = if settled {
                Phase::Settled
            } else if particle.phase == Phase::Settled {
                Phase::Stale
            } else {
                particle.phase
            };
        }
    }

    /// [`ParticleStateEvolver::relax`] toward this evolver's display targets.
    pub fn relax_toward_energy(&self, particles: &mut [Particle], grid: &EnergyGrid, rate: f64) {
        Self::relax(particles, |energy| self.target(grid, energy), rate);
    }

    /// Apply a preset; returns the number of particles touched.
    pub fn apply_preset<R: Rng + ?Sized>(
        &self,
        particles: &mut [Particle],
        preset: Preset,
        sampler: &WeightedSampler,
        grid: &EnergyGrid,
        rng: &mut R,
    ) -> Result<usize, KernelError> {
        match preset {
            Preset::Equalize => {
                let energy = sampler.mean_energy(grid);
                for particle in particles.iter_mut() {
                    check_energy(particle.id, energy)?;
                    particle.energy = energy;
                }
                self.relax_toward_energy(particles, grid, 1.0);
                Ok(particles.len())
            }
            Preset::Scramble => self.resample(particles, sampler, grid, 1.0, rng),
        }
    }
}

/// Mark every particle as out of date with the current curves.
pub fn mark_stale(particles: &mut [Particle]) {
    particles
        .iter_mut()
        .for_each(|particle| particle.phase = Phase::Stale);
}

/// Non-finite energies mean the curves were built wrong; never clamp them.
fn check_energy(id: usize, energy: f64) -> Result<(), KernelError> {
    if energy.is_finite() {
        Ok(())
    } else {
        Err(KernelError::NonFiniteEnergy { id, energy })
    }
}

fn blend(val: f64, goal: f64, rate: f64) -> f64 {
    if rate >= 1.0 {
        goal
    } else {
        val + (goal - val) * rate
    }
}

fn is_close(val: f64, goal: f64) -> bool {
    (val - goal).abs() <= SETTLE_TOLERANCE * goal.abs().max(1e-6)
}
