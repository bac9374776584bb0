use anyhow::{Context, Result};
use boltzkit::ensemble::{self, Reservoir};
use boltzkit::levels;
use boltzkit::manager::Manager;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Simulation directory holding config.toml; needed by run commands.
    #[arg(long)]
    sim_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new run.
    Create,

    /// Continue a run from its checkpoint.
    Resume {
        #[arg(long)]
        run_idx: usize,
    },

    /// Summarize every run into results.json.
    Analyze,

    /// Remove every run directory.
    Clean,

    /// Print Boltzmann populations of an evenly spaced level ladder.
    Levels {
        /// Energy of the lowest level (eV).
        #[arg(long, default_value_t = 0.0)]
        base: f64,

        /// Spacing between levels (eV).
        #[arg(long, default_value_t = 0.025)]
        step: f64,

        #[arg(long, default_value_t = 6)]
        count: usize,

        /// Temperature (K).
        #[arg(long, default_value_t = 300.0)]
        temperature: f64,

        /// Number of particles split across levels.
        #[arg(long, default_value_t = 100)]
        particles: usize,
    },

    /// Print the temperatures of two reservoirs exchanging heat through a wall.
    Conduct {
        /// Left temperature (K).
        #[arg(long, default_value_t = 600.0)]
        left_temperature: f64,

        /// Right temperature (K).
        #[arg(long, default_value_t = 200.0)]
        right_temperature: f64,

        #[arg(long, default_value_t = 60)]
        left_count: usize,

        #[arg(long, default_value_t = 60)]
        right_count: usize,

        /// Wall conductance (eV/K/s).
        #[arg(long, default_value_t = 1e-3)]
        conductance: f64,

        /// Time step (s).
        #[arg(long, default_value_t = 0.02)]
        dt: f64,

        #[arg(long, default_value_t = 500)]
        steps: usize,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = Cli::parse();
    log::info!("{args:#?}");

    match args.command {
        Command::Create => {
            manager(args.sim_dir)?
                .create_run()
                .context("failed to create run")?;
        }
        Command::Resume { run_idx } => manager(args.sim_dir)?
            .resume_run(run_idx)
            .context("failed to resume run")?,
        Command::Analyze => manager(args.sim_dir)?
            .analyze_sim()
            .context("failed to analyze sim")?,
        Command::Clean => manager(args.sim_dir)?
            .clean_sim()
            .context("failed to clean sim")?,
        Command::Levels {
            base,
            step,
            count,
            temperature,
            particles,
        } => {
            let ladder = levels::ladder(base, step, count);
            let pop = levels::boltzmann_populations(&ladder, temperature);
            let counts = levels::integer_counts(&pop.probabilities, particles);
            print_json(&serde_json::json!({
                "levels": ladder,
                "probabilities": pop.probabilities,
                "log_partition_function": pop.log_partition_function,
                "counts": counts,
                "inverted": levels::is_inverted(&counts),
            }))?;
        }
        Command::Conduct {
            left_temperature,
            right_temperature,
            left_count,
            right_count,
            conductance,
            dt,
            steps,
        } => {
            let mut left = Reservoir {
                count: left_count,
                temperature: left_temperature,
            };
            let mut right = Reservoir {
                count: right_count,
                temperature: right_temperature,
            };
            let mut heat = 0.0;
            for _ in 0..steps {
                heat += ensemble::conduct(&mut left, &mut right, conductance, dt).heat;
            }
            print_json(&serde_json::json!({
                "left": left,
                "right": right,
                "heat": heat,
                "elapsed": dt * steps as f64,
            }))?;
        }
    }

    Ok(())
}

fn manager(sim_dir: Option<PathBuf>) -> Result<Manager> {
    let sim_dir = sim_dir.context("--sim-dir is required for this command")?;
    Manager::new(sim_dir).context("failed to construct mgr")
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    println!("{text}");
    Ok(())
}
