use std::{env, fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_virodyn"));

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
}

fn setup_test_dir(name: &str, config_contents: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    fs::write(test_dir.join("config.toml"), config_contents)
        .expect("failed to write config file");

    test_dir
}

#[test]
fn basic_workflow() {
    let config_contents = String::new()
        + "seed = 2024\n"
        + "\n"
        + "[model]\n"
        + "kind = \"resistant\"\n"
        + "max_birth_prob = 0.1\n"
        + "clear_prob = 0.05\n"
        + "mut_prob = 0.005\n"
        + "resistances = { guttagonol = false, grimpex = false }\n"
        + "\n"
        + "[init]\n"
        + "n_viruses = 100\n"
        + "max_pop = 1000\n"
        + "\n"
        + "[treatment]\n"
        + "prescriptions = [ { drug = \"guttagonol\", step = 20 }, { drug = \"grimpex\", step = 40 } ]\n"
        + "\n"
        + "[output]\n"
        + "n_steps = 60\n"
        + "n_trials = 4\n"
        + "cure_threshold = 50\n"
        + "hist_bins = 5\n";

    let test_dir = setup_test_dir("basic_workflow", &config_contents);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "create"]);

    for run in ["run-0000", "run-0001"] {
        for trial in 0..4 {
            let file = test_dir.join(run).join(format!("trajectory-{trial:04}.msgpack"));
            assert!(file.is_file(), "missing {file:?}");
        }
    }

    run_bin(&["--sim-dir", test_dir_str, "analyze"]);

    let results = fs::read_to_string(test_dir.join("run-0000").join("results.json"))
        .expect("failed to read results");
    for key in ["total_pop", "resist_pop", "resist_pop_all", "final_pop", "cured_frac"] {
        assert!(results.contains(key), "results are missing {key:?}");
    }

    run_bin(&["--sim-dir", test_dir_str, "clean"]);
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn untreated_workflow() {
    let config_contents = String::new()
        + "[model]\n"
        + "kind = \"simple\"\n"
        + "max_birth_prob = 0.1\n"
        + "clear_prob = 0.05\n"
        + "\n"
        + "[init]\n"
        + "n_viruses = 100\n"
        + "max_pop = 1000\n"
        + "\n"
        + "[output]\n"
        + "n_steps = 50\n"
        + "n_trials = 2\n"
        + "cure_threshold = 50\n"
        + "hist_bins = 4\n";

    let test_dir = setup_test_dir("untreated_workflow", &config_contents);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "analyze"]);
    assert!(test_dir.join("run-0000").join("results.json").is_file());
    run_bin(&["--sim-dir", test_dir_str, "clean"]);

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_fails() {
    let config_contents = String::new()
        + "[model]\n"
        + "kind = \"simple\"\n"
        + "max_birth_prob = 1.5\n"
        + "clear_prob = 0.05\n"
        + "\n"
        + "[init]\n"
        + "n_viruses = 100\n"
        + "max_pop = 1000\n"
        + "\n"
        + "[output]\n"
        + "n_steps = 50\n"
        + "n_trials = 2\n"
        + "cure_threshold = 50\n"
        + "hist_bins = 4\n";

    let test_dir = setup_test_dir("invalid_config_fails", &config_contents);

    let output = Command::new(env!("CARGO_BIN_EXE_virodyn"))
        .args(["--sim-dir", test_dir.to_str().unwrap(), "create"])
        .output()
        .expect("failed to execute command");
    assert!(!output.status.success());
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}
