use std::{fs, path::Path, path::PathBuf, process::Command};

const CONFIG: &str = r#"
[grid]
energy_min = 0.0
energy_max = 5.0
n_points = 300

[[peaks]]
amplitude = 1.0
center = 0.6
width = 0.2

[[peaks]]
amplitude = 0.8
center = 1.6
width = 0.18

[occupation]
kind = "fermi"
temperature = 300.0
chemical_potential = 1.2

[particles]
count = 120
resample_interval = 8

[ensemble]
kind = "grand_canonical"
exchange_interval = 4
max_particles = 200

[output]
steps_per_save = 16
saves_per_file = 32
hist_bins = 16
"#;

fn run_bin(args: &[&str]) -> String {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_boltzkit"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );

    stdout_str.to_string()
}

fn read_results(file: &Path) -> serde_json::Value {
    let text = fs::read_to_string(file).expect("failed to read results");
    serde_json::from_str(&text).expect("failed to parse results")
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(test_dir.join("config.toml"), CONFIG).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "create"]);

    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]);
    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]);

    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]);

    let run_0 = test_dir.join("run-0000");
    assert!(run_0.join("trajectory-0002.msgpack").is_file());
    assert!(run_0.join("checkpoint.msgpack").is_file());

    run_bin(&["--sim-dir", test_dir_str, "analyze"]);

    let results = read_results(&run_0.join("results.json"));
    assert_eq!(results["n_frames"], 96);
    let results = read_results(&test_dir.join("run-0001").join("results.json"));
    assert_eq!(results["n_frames"], 64);

    let observables = results["observables"].as_array().unwrap();
    let entropy = observables[0]["combined_entropy"]["mean"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&entropy));
    let count = observables[3]["particle_count"]["mean"].as_f64().unwrap();
    assert!((2.0..=200.0).contains(&count));

    run_bin(&["--sim-dir", test_dir_str, "clean"]);
    assert!(!run_0.exists());
    assert!(test_dir.join("config.toml").is_file());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn resume_requires_existing_run() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("resume_missing");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(test_dir.join("config.toml"), CONFIG).expect("failed to write config file");

    let bin = PathBuf::from(env!("CARGO_BIN_EXE_boltzkit"));
    let status = Command::new(bin)
        .args(["--sim-dir", test_dir.to_str().unwrap(), "resume", "--run-idx", "3"])
        .status()
        .expect("failed to execute command");
    assert!(!status.success());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn levels_prints_populations() {
    let stdout = run_bin(&[
        "levels",
        "--step",
        "0.05",
        "--count",
        "4",
        "--particles",
        "50",
    ]);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("invalid json");

    let counts: Vec<u64> = report["counts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_u64().unwrap())
        .collect();
    assert_eq!(counts.len(), 4);
    assert_eq!(counts.iter().sum::<u64>(), 50);
    assert_eq!(report["inverted"], false);
}

#[test]
fn conduct_reaches_common_temperature() {
    let stdout = run_bin(&[
        "conduct",
        "--left-temperature",
        "900",
        "--right-temperature",
        "100",
        "--left-count",
        "50",
        "--right-count",
        "150",
        "--steps",
        "4000",
        "--dt",
        "0.05",
    ]);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("invalid json");

    let left = report["left"]["temperature"].as_f64().unwrap();
    let right = report["right"]["temperature"].as_f64().unwrap();
    assert!((left - 300.0).abs() < 1e-3, "{left}");
    assert!((right - 300.0).abs() < 1e-3, "{right}");
    assert!(report["heat"].as_f64().unwrap() > 0.0);
}

#[test]
fn run_commands_require_sim_dir() {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_boltzkit"));
    let status = Command::new(bin)
        .arg("create")
        .status()
        .expect("failed to execute command");
    assert!(!status.success());
}
