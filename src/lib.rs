//! Sample particle energies from a density of states weighted by an
//! occupation function, and gauge the disorder of the resulting population.

pub mod analysis;
pub mod config;
pub mod display;
pub mod dos;
pub mod ensemble;
pub mod entropy;
pub mod error;
pub mod evolver;
pub mod grid;
pub mod levels;
pub mod manager;
pub mod model;
pub mod occupation;
pub mod particle;
pub mod sampler;
pub mod session;
pub mod stats;

pub use error::KernelError;
pub use grid::EnergyGrid;
pub use occupation::DistributionKind;
pub use sampler::WeightedSampler;
pub use session::Session;
