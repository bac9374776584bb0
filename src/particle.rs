use serde::{Deserialize, Serialize};

/// Animation easing state of a particle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Attributes no longer match the current curves.
    Stale,
    /// Energy was just redrawn; attributes are relaxing toward their targets.
    Resampling,
    /// Attributes match the energy within tolerance.
    #[default]
    Settled,
}

/// Plain numeric particle state read by a renderer each frame.
///
/// Motion is stored as a unit heading and a scalar speed, so the speed a
/// renderer or gauge reads is exactly the one that was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: usize,
    /// Energy in eV, drawn from the joint curve.
    pub energy: f64,
    /// Unit direction of motion.
    pub heading: [f64; 3],
    /// Speed in display units.
    pub speed: f64,
    pub size: f64,
    /// Hue in degrees.
    pub hue: f64,
    pub phase: Phase,
}

impl Particle {
    pub fn velocity(&self) -> [f64; 3] {
        self.heading.map(|c| c * self.speed)
    }

    /// Split `velocity` into heading and speed; a zero velocity keeps the heading.
    pub fn set_velocity(&mut self, velocity: [f64; 3]) {
        let speed = velocity.iter().map(|v| v * v).sum::<f64>().sqrt();
        if speed > 0.0 {
            self.heading = velocity.map(|c| c / speed);
        }
        self.speed = speed;
    }

    /// Kinetic energy `|v|^2 / 2` in display units.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.speed * self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle() -> Particle {
        Particle {
            id: 0,
            energy: 1.0,
            heading: [1.0, 0.0, 0.0],
            speed: 2.0,
            size: 1.0,
            hue: 0.0,
            phase: Phase::Settled,
        }
    }

    #[test]
    fn velocity_round_trips_through_heading() {
        let mut p = particle();
        assert_eq!(p.velocity(), [2.0, 0.0, 0.0]);
        assert_eq!(p.kinetic_energy(), 2.0);

        p.set_velocity([0.0, 3.0, 4.0]);
        assert_eq!(p.speed, 5.0);
        assert_eq!(p.heading, [0.0, 0.6, 0.8]);
    }

    #[test]
    fn zero_velocity_keeps_heading() {
        let mut p = particle();
        p.set_velocity([0.0; 3]);
        assert_eq!(p.speed, 0.0);
        assert_eq!(p.heading, [1.0, 0.0, 0.0]);
    }
}
