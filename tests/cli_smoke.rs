//! Smoke tests for the `apn` binary.

use assert_cmd::Command;
use predicates::prelude::*;

const LINE_CONFIG: &str = r#"{
    "model": { "sequential": { "layers": [ { "adaptive_power": { "dim": [1, 1], "max_power": 1 } } ] } },
    "optimizer": { "gradient_descent": { "learning_rate": 0.1 } },
    "dataset": { "data": [0, 1, 1, 3, 2, 5], "x_size": 1, "y_size": 1 },
    "loss": "mse",
    "init": { "const": { "value": 0.0 } },
    "epochs": 20,
    "batch_size": 3,
    "seed": 5
}"#;

fn cmd() -> Command {
    Command::cargo_bin("apn").unwrap()
}

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn info_prints_the_package_descriptor() {
    cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("adaptive-power-neurons"))
        .stdout(predicate::str::contains(
            "A neural network library using Adaptive Power Neurons.",
        ));
}

#[test]
fn train_missing_config_fails() {
    cmd()
        .args(["train", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn train_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    let checkpoint = dir.path().join("model.json");
    let inputs = dir.path().join("inputs.json");
    std::fs::write(&config, LINE_CONFIG).unwrap();
    std::fs::write(&inputs, "[[0.0], [1.0], [2.0]]").unwrap();

    cmd()
        .arg("train")
        .arg(&config)
        .arg("-o")
        .arg(&checkpoint)
        .assert()
        .success();
    assert!(checkpoint.exists());

    cmd()
        .arg("predict")
        .arg(&checkpoint)
        .arg(&inputs)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[["));
}

#[test]
fn zero_epochs_logs_no_loss() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    let checkpoint = dir.path().join("model.json");
    let raw = LINE_CONFIG.replace("\"epochs\": 20", "\"epochs\": 0");
    std::fs::write(&config, raw).unwrap();

    cmd()
        .env("RUST_LOG", "info")
        .arg("train")
        .arg(&config)
        .arg("-o")
        .arg(&checkpoint)
        .assert()
        .success()
        .stderr(predicate::str::contains("checkpoint written"))
        .stderr(predicate::str::contains("NaN").not());
    assert!(checkpoint.exists());
}

#[test]
fn predict_rejects_ragged_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    let checkpoint = dir.path().join("model.json");
    let inputs = dir.path().join("inputs.json");
    std::fs::write(&config, LINE_CONFIG).unwrap();
    std::fs::write(&inputs, "[[0.0], [1.0, 2.0]]").unwrap();

    cmd()
        .arg("train")
        .arg(&config)
        .arg("-o")
        .arg(&checkpoint)
        .assert()
        .success();

    cmd()
        .arg("predict")
        .arg(&checkpoint)
        .arg(&inputs)
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 1"));
}
