use crate::display::VisualMap;
use crate::ensemble::{Ensemble, MIN_EXCHANGE_POPULATION};
use crate::entropy::{Channel, EntropyGauge};
use crate::occupation::DistributionKind;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    ops::{Bound, RangeBounds},
    path::Path,
};

/// Session configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    /// Gaussian peaks of the density of states; may be empty.
    #[serde(default)]
    pub peaks: Vec<PeakConfig>,
    pub occupation: OccupationConfig,
    pub particles: ParticlesConfig,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub entropy: EntropyGauge,
    #[serde(default)]
    pub visual: VisualMap,
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Lowest energy (eV).
    pub energy_min: f64,
    /// Highest energy (eV).
    pub energy_max: f64,
    /// Number of grid points.
    pub n_points: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PeakConfig {
    pub amplitude: f64,
    /// Peak position (eV).
    pub center: f64,
    /// Standard deviation (eV).
    pub width: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OccupationConfig {
    pub kind: DistributionKind,
    /// Temperature (K).
    pub temperature: f64,
    /// Chemical potential (eV).
    #[serde(default)]
    pub chemical_potential: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ParticlesConfig {
    /// Number of particles.
    pub count: usize,
    /// Periodically redraw part of the population.
    #[serde(default = "default_auto_resample")]
    pub auto_resample: bool,
    /// Fraction of particles redrawn per resample.
    #[serde(default = "default_resample_fraction")]
    pub resample_fraction: f64,
    /// Steps between resamples.
    #[serde(default = "default_resample_interval")]
    pub resample_interval: usize,
    /// Blend factor per step toward display targets.
    #[serde(default = "default_relax_rate")]
    pub relax_rate: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub kind: Ensemble,
    /// Total kinetic energy held by the microcanonical constraint (display units).
    pub total_energy: f64,
    /// Blend factor of the canonical thermostat.
    pub thermostat_nudge: f64,
    /// Steps between grand-canonical exchange attempts.
    pub exchange_interval: usize,
    /// Upper bound on the population under particle exchange.
    pub max_particles: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            kind: Ensemble::Free,
            total_energy: 1.0,
            thermostat_nudge: 0.12,
            exchange_interval: 42,
            max_particles: 1200,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of steps between frame saves.
    pub steps_per_save: usize,
    /// Number of frames written per trajectory file.
    pub saves_per_file: usize,
    /// Number of bins of the analyzed energy histogram.
    #[serde(default = "default_hist_bins")]
    pub hist_bins: usize,
}

fn default_auto_resample() -> bool {
    true
}

fn default_resample_fraction() -> f64 {
    0.4
}

fn default_resample_interval() -> usize {
    30
}

fn default_relax_rate() -> f64 {
    0.06
}

fn default_hist_bins() -> usize {
    32
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Check every value against its allowed range.
    pub(crate) fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        check_num(grid.energy_min, -1e6..=1e6).context("invalid minimum energy")?;
        check_num(grid.energy_max, -1e6..=1e6).context("invalid maximum energy")?;
        if grid.energy_min >= grid.energy_max {
            bail!(
                "minimum energy must be below maximum energy, but {} >= {}",
                grid.energy_min,
                grid.energy_max
            );
        }
        check_num(grid.n_points, 2..=100_000).context("invalid number of grid points")?;

        for (i_peak, peak) in self.peaks.iter().enumerate() {
            check_peak(peak, grid).with_context(|| format!("invalid peak {i_peak}"))?;
        }

        let occ = &self.occupation;
        check_num(occ.temperature, 0.0..=1e8).context("invalid temperature")?;
        check_num(occ.chemical_potential, -1e6..=1e6).context("invalid chemical potential")?;

        let ptc = &self.particles;
        check_num(ptc.count, 1..=100_000).context("invalid number of particles")?;
        check_num(ptc.resample_fraction, unit_interval()).context("invalid resample fraction")?;
        check_num(ptc.resample_interval, 1..=1_000_000).context("invalid resample interval")?;
        check_num(ptc.relax_rate, unit_interval()).context("invalid relax rate")?;

        let ens = &self.ensemble;
        check_num(ens.total_energy, 0.0..=1e6).context("invalid total energy")?;
        check_num(ens.thermostat_nudge, 0.0..=1.0).context("invalid thermostat nudge")?;
        check_num(ens.exchange_interval, 1..=1_000_000).context("invalid exchange interval")?;
        // The bound only caps growth under particle exchange.
        let min_max_particles = match ens.kind {
            Ensemble::GrandCanonical => ptc.count,
            _ => MIN_EXCHANGE_POPULATION,
        };
        check_num(ens.max_particles, min_max_particles..=100_000)
            .context("invalid maximum number of particles")?;

        let ent = &self.entropy;
        check_channel(&ent.speed).context("invalid speed entropy channel")?;
        check_channel(&ent.size).context("invalid size entropy channel")?;
        check_channel(&ent.hue).context("invalid hue entropy channel")?;
        if ent.speed.weight + ent.size.weight + ent.hue.weight <= 0.0 {
            bail!("entropy weights must not all be zero");
        }

        let vis = &self.visual;
        check_num(vis.velocity_scale, 0.0..=1e6).context("invalid velocity scale")?;
        check_num(vis.hue_cold, 0.0..=360.0).context("invalid cold hue")?;
        check_num(vis.hue_span, -360.0..=360.0).context("invalid hue span")?;
        check_num(vis.size_base, 0.0..=1e6).context("invalid base size")?;
        check_num(vis.size_span, 0.0..=1e6).context("invalid size span")?;

        let out = &self.output;
        check_num(out.steps_per_save, 1..=1_000_000).context("invalid number of steps per save")?;
        check_num(out.saves_per_file, 1..=100_000).context("invalid number of saves per file")?;
        check_num(out.hist_bins, 2..=10_000).context("invalid number of histogram bins")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

/// The interval `(0, 1]`.
fn unit_interval() -> (Bound<f64>, Bound<f64>) {
    (Bound::Excluded(0.0), Bound::Included(1.0))
}

fn check_peak(peak: &PeakConfig, grid: &GridConfig) -> Result<()> {
    check_num(peak.amplitude, 0.0..=1e6).context("invalid amplitude")?;
    check_num(peak.center, grid.energy_min..=grid.energy_max).context("invalid center")?;
    check_num(peak.width, 0.0..=1e6).context("invalid width")?;
    if peak.width == 0.0 {
        bail!("width must be positive");
    }
    Ok(())
}

fn check_channel(channel: &Channel) -> Result<()> {
    check_num(channel.bins, 2..=1024).context("invalid number of bins")?;
    check_num(channel.weight, 0.0..=1e6).context("invalid weight")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[grid]
energy_min = 0.0
energy_max = 5.0
n_points = 300

[[peaks]]
amplitude = 1.0
center = 0.6
width = 0.2

[occupation]
kind = "fermi"
temperature = 300.0
chemical_potential = 0.7

[particles]
count = 220

[output]
steps_per_save = 16
saves_per_file = 8
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(cfg.peaks.len(), 1);
        assert_eq!(cfg.occupation.kind, DistributionKind::FermiLike);
        assert!(cfg.particles.auto_resample);
        assert_eq!(cfg.particles.resample_fraction, 0.4);
        assert_eq!(cfg.ensemble, EnsembleConfig::default());
        assert_eq!(cfg.entropy, EntropyGauge::default());
        assert_eq!(cfg.visual, VisualMap::default());
        assert_eq!(cfg.output.hist_bins, 32);
    }

    #[test]
    fn rejects_inverted_range() {
        let text = MINIMAL.replace("energy_max = 5.0", "energy_max = -1.0");
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn rejects_peak_outside_range() {
        let text = MINIMAL.replace("center = 0.6", "center = 7.5");
        let err = Config::from_toml(&text).unwrap_err();
        assert!(format!("{err:#}").contains("invalid peak 0"));
    }

    #[test]
    fn rejects_zero_width() {
        let text = MINIMAL.replace("width = 0.2", "width = 0.0");
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let text = MINIMAL.replace("kind = \"fermi\"", "kind = \"boltzmann\"");
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn rejects_small_exchange_bound() {
        let text = format!("{MINIMAL}\n[ensemble]\nkind = \"grand_canonical\"\nmax_particles = 10\n");
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn large_population_without_exchange() {
        let text = MINIMAL.replace("count = 220", "count = 5000");
        let cfg = Config::from_toml(&text).unwrap();
        assert_eq!(cfg.particles.count, 5000);
        assert_eq!(cfg.ensemble.kind, Ensemble::Free);

        let text = format!("{text}\n[ensemble]\nkind = \"canonical\"\n");
        assert!(Config::from_toml(&text).is_ok());
    }

    #[test]
    fn exchange_bound_must_cover_population() {
        let text = MINIMAL.replace("count = 220", "count = 5000");
        let text = format!("{text}\n[ensemble]\nkind = \"grand_canonical\"\n");
        let err = Config::from_toml(&text).unwrap_err();
        assert!(format!("{err:#}").contains("invalid maximum number of particles"));
    }

    #[test]
    fn rejects_zero_rates() {
        let text = MINIMAL.replace("count = 220", "count = 220\nresample_fraction = 0.0");
        assert!(Config::from_toml(&text).is_err());
        let text = MINIMAL.replace("count = 220", "count = 220\nrelax_rate = 0.0");
        assert!(Config::from_toml(&text).is_err());
        let text = MINIMAL.replace("count = 220", "count = 220\nrelax_rate = 1.0");
        assert!(Config::from_toml(&text).is_ok());
    }
}
