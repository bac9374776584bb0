//! Records written to trajectory files.

use crate::entropy::EntropyReport;
use serde::{Deserialize, Serialize};

/// Snapshot of the particle population at a given step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Current session step.
    pub step: usize,

    /// Entropy gauge of the current population.
    pub entropy: EntropyReport,

    /// Mean particle energy (eV).
    pub mean_energy: f64,

    /// Expected energy under the joint curve (eV).
    pub expected_energy: f64,

    /// Energy of every particle (eV).
    pub energies: Vec<f64>,
}

impl Frame {
    pub fn particle_count(&self) -> usize {
        self.energies.len()
    }
}
