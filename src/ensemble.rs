//! Statistical-ensemble constraints applied to the particle population.

use crate::error::KernelError;
use crate::occupation::K_B_EV;
use crate::particle::Particle;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Population never shrinks below this many particles.
pub const MIN_EXCHANGE_POPULATION: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ensemble {
    /// No constraint beyond resampling.
    #[default]
    Free,
    /// Fixed total kinetic energy.
    Microcanonical,
    /// Weak coupling to a heat bath.
    Canonical,
    /// Particle exchange with a reservoir.
    GrandCanonical,
    /// Fixed total energy plus heat-bath noise.
    Mixed,
}

/// Outcome of a grand-canonical exchange attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Added(usize),
    Removed(usize),
    Unchanged,
}

/// Scale all velocities so the total kinetic energy equals `target`.
///
/// Returns the applied factor; a population at rest is left untouched.
pub fn rescale_to_total_energy(particles: &mut [Particle], target: f64) -> f64 {
    let current: f64 = particles.iter().map(Particle::kinetic_energy).sum();
    if current <= 1e-9 {
        return 1.0;
    }
    let factor = (target.max(1e-8) / current).sqrt();
    scale_speeds(particles, factor);
    factor
}

/// Multiply every speed by `factor`, keeping headings.
pub fn scale_speeds(particles: &mut [Particle], factor: f64) {
    particles
        .iter_mut()
        .for_each(|particle| particle.speed *= factor);
}

/// Nudge every velocity component toward an independent Gaussian draw of
/// spread `sigma`.
pub fn thermostat<R: Rng + ?Sized>(particles: &mut [Particle], sigma: f64, nudge: f64, rng: &mut R) {
    let nudge = nudge.clamp(0.0, 1.0);
    for particle in particles.iter_mut() {
        let mut velocity = particle.velocity();
        for c in velocity.iter_mut() {
            let z: f64 = StandardNormal.sample(rng);
            *c += (z * sigma - *c) * nudge;
        }
        particle.set_velocity(velocity);
    }
}

/// Probability that a reservoir exchange adds a particle.
pub fn addition_probability(chemical_potential: f64) -> f64 {
    1.0 / (1.0 + (-chemical_potential).exp())
}

/// Attempt one particle exchange with the reservoir.
///
/// A particle is added with probability `p (0.6 + min(0.4, kT))` where
/// `p = 1 / (1 + exp(-mu))`; otherwise one is removed with probability
/// `(1 - p) (0.6 + min(0.4, kT))`. The population stays within
/// `[MIN_EXCHANGE_POPULATION, max_particles]`.
pub fn grand_canonical_tick<R, F>(
    particles: &mut Vec<Particle>,
    chemical_potential: f64,
    kt: f64,
    max_particles: usize,
    rng: &mut R,
    spawn: F,
) -> Result<Exchange, KernelError>
where
    R: Rng + ?Sized,
    F: FnOnce(usize, &mut R) -> Result<Particle, KernelError>,
{
    let p_add = addition_probability(chemical_potential);
    let activity = 0.6 + kt.clamp(0.0, 0.4);

    if rng.random::<f64>() < p_add * activity && particles.len() < max_particles {
        let id = particles.iter().map(|p| p.id + 1).max().unwrap_or(0);
        particles.push(spawn(id, rng)?);
        return Ok(Exchange::Added(id));
    }

    if rng.random::<f64>() < (1.0 - p_add) * activity && particles.len() > MIN_EXCHANGE_POPULATION
    {
        let i_ptc = rng.random_range(0..particles.len());
        let removed = particles.swap_remove(i_ptc);
        return Ok(Exchange::Removed(removed.id));
    }

    Ok(Exchange::Unchanged)
}

/// Floor on reservoir temperatures (K).
const MIN_RESERVOIR_TEMPERATURE: f64 = 1e-6;

/// Rate (1/s) at which particle speeds follow a reservoir temperature change.
const SPEED_FOLLOW_RATE: f64 = 6.0;

/// Ideal-gas reservoir of `count` particles at `temperature` (K).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reservoir {
    pub count: usize,
    pub temperature: f64,
}

impl Reservoir {
    /// Heat capacity `3/2 N kB` in eV/K; an empty reservoir counts as one particle.
    pub fn heat_capacity(&self) -> f64 {
        1.5 * self.count.max(1) as f64 * K_B_EV
    }

    /// Internal energy `3/2 N kB T` in eV.
    pub fn internal_energy(&self) -> f64 {
        self.heat_capacity() * self.temperature
    }
}

/// Result of one conduction step between two reservoirs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conduction {
    /// Heat moved from left to right (eV).
    pub heat: f64,
    /// Speed factor to apply to the left population.
    pub left_scale: f64,
    /// Speed factor to apply to the right population.
    pub right_scale: f64,
}

/// Move heat `K (T_left - T_right) dt` across a wall of conductance `K` (eV/K/s).
///
/// Temperatures are updated from the new internal energies and floored at
/// `1e-6` K. The returned speed factors are `sqrt(T_new / T_old)` raised to
/// `min(1, 6 dt)`, so particle motion follows the temperature gradually.
pub fn conduct(left: &mut Reservoir, right: &mut Reservoir, conductance: f64, dt: f64) -> Conduction {
    let dt = dt.max(0.0);
    let heat = conductance * (left.temperature - right.temperature) * dt;

    let left_new = ((left.internal_energy() - heat) / left.heat_capacity())
        .max(MIN_RESERVOIR_TEMPERATURE);
    let right_new = ((right.internal_energy() + heat) / right.heat_capacity())
        .max(MIN_RESERVOIR_TEMPERATURE);

    let alpha = (dt * SPEED_FOLLOW_RATE).min(1.0);
    let scale = |old: f64, new: f64| {
        if old > 0.0 {
            (new / old).max(1e-12).sqrt().powf(alpha)
        } else {
            1.0
        }
    };

    let conduction = Conduction {
        heat,
        left_scale: scale(left.temperature, left_new),
        right_scale: scale(right.temperature, right_new),
    };
    left.temperature = left_new;
    right.temperature = right_new;
    conduction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Phase;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn particle(id: usize, velocity: [f64; 3]) -> Particle {
        let mut particle = Particle {
            id,
            energy: 1.0,
            heading: [1.0, 0.0, 0.0],
            speed: 0.0,
            size: 1.0,
            hue: 0.0,
            phase: Phase::Settled,
        };
        particle.set_velocity(velocity);
        particle
    }

    #[test]
    fn rescale_hits_the_target() {
        let mut particles = vec![particle(0, [1.0, 0.0, 0.0]), particle(1, [0.0, 2.0, 2.0])];
        rescale_to_total_energy(&mut particles, 9.0);
        let total: f64 = particles.iter().map(Particle::kinetic_energy).sum();
        assert!((total - 9.0).abs() < 1e-12);

        let mut resting = vec![particle(0, [0.0; 3])];
        assert_eq!(rescale_to_total_energy(&mut resting, 9.0), 1.0);
        assert_eq!(resting[0].velocity(), [0.0; 3]);
    }

    #[test]
    fn thermostat_drives_toward_bath_spread() {
        let mut rng = ChaCha12Rng::seed_from_u64(21);
        let mut particles: Vec<Particle> = (0..2000).map(|i| particle(i, [0.0; 3])).collect();
        let sigma = 0.5;
        for _ in 0..200 {
            thermostat(&mut particles, sigma, 0.12, &mut rng);
        }
        // Stationary variance of the lerp is sigma^2 * nudge / (2 - nudge).
        let nudge: f64 = 0.12;
        let expected = sigma * sigma * nudge / (2.0 - nudge);
        let var = particles.iter().map(|p| p.velocity()[0].powi(2)).sum::<f64>()
            / particles.len() as f64;
        assert!((var - expected).abs() < 0.15 * expected, "{var} vs {expected}");
    }

    #[test]
    fn conduction_conserves_energy() {
        let mut left = Reservoir { count: 50, temperature: 900.0 };
        let mut right = Reservoir { count: 150, temperature: 100.0 };
        let total = left.internal_energy() + right.internal_energy();

        for _ in 0..100 {
            let step = conduct(&mut left, &mut right, 1e-3, 0.05);
            assert!(step.heat > 0.0);
            assert!(step.left_scale < 1.0 && step.right_scale > 1.0);
        }
        let after = left.internal_energy() + right.internal_energy();
        assert!((after - total).abs() < 1e-12 * total);
    }

    #[test]
    fn temperatures_meet_at_the_weighted_mean() {
        let mut left = Reservoir { count: 50, temperature: 900.0 };
        let mut right = Reservoir { count: 150, temperature: 100.0 };
        let expected = (50.0 * 900.0 + 150.0 * 100.0) / 200.0;

        for _ in 0..4000 {
            conduct(&mut left, &mut right, 1e-3, 0.05);
        }
        assert!((left.temperature - expected).abs() < 1e-3, "{}", left.temperature);
        assert!((right.temperature - expected).abs() < 1e-3, "{}", right.temperature);

        let step = conduct(&mut left, &mut right, 1e-3, 0.05);
        assert!((step.left_scale - 1.0).abs() < 1e-9);
    }

    #[test]
    fn equal_temperatures_exchange_nothing() {
        let mut left = Reservoir { count: 10, temperature: 300.0 };
        let mut right = Reservoir { count: 30, temperature: 300.0 };
        let step = conduct(&mut left, &mut right, 1.0, 0.1);
        assert_eq!(step.heat, 0.0);
        assert!((step.left_scale - 1.0).abs() < 1e-12);
        assert!((left.temperature - 300.0).abs() < 1e-9);
        assert!((right.temperature - 300.0).abs() < 1e-9);
    }

    #[test]
    fn addition_probability_is_logistic() {
        assert_eq!(addition_probability(0.0), 0.5);
        assert!(addition_probability(10.0) > 0.99);
        assert!(addition_probability(-10.0) < 0.01);
    }

    #[test]
    fn exchange_respects_bounds() {
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let spawn = |id, _: &mut ChaCha12Rng| Ok(particle(id, [0.1, 0.0, 0.0]));

        let mut particles: Vec<Particle> = (0..3).map(|i| particle(i, [0.0; 3])).collect();
        for _ in 0..500 {
            grand_canonical_tick(&mut particles, 20.0, 0.4, 10, &mut rng, spawn).unwrap();
            assert!(particles.len() <= 10);
        }
        assert_eq!(particles.len(), 10);

        for _ in 0..500 {
            grand_canonical_tick(&mut particles, -20.0, 0.4, 10, &mut rng, spawn).unwrap();
            assert!(particles.len() >= MIN_EXCHANGE_POPULATION);
        }
        assert_eq!(particles.len(), MIN_EXCHANGE_POPULATION);
    }

    #[test]
    fn added_particles_get_fresh_ids() {
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let mut particles = vec![particle(4, [0.0; 3]), particle(9, [0.0; 3])];
        let mut added = None;
        while added.is_none() {
            if let Exchange::Added(id) = grand_canonical_tick(
                &mut particles,
                20.0,
                0.4,
                100,
                &mut rng,
                |id, _| Ok(particle(id, [0.0; 3])),
            )
            .unwrap()
            {
                added = Some(id);
            }
        }
        assert_eq!(added, Some(10));
    }
}
