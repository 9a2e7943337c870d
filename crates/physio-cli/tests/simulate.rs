use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;
use std::fs;
use tempfile::tempdir;

fn stdout_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn offline_run_prints_one_status_line_per_period() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("physio");
    cmd.args([
        "simulate",
        "--offline",
        "--duration",
        "5",
        "--sink",
        "null",
        "--seed",
        "3",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let lines = stdout_lines(&output);

    assert_eq!(lines.len(), 4);
    for line in &lines {
        assert!(line.starts_with("HR="), "unexpected status line: {line}");
        assert!(line.contains(" /min | HRV="));
        assert!(line.contains("| BR="));
        assert!(line.ends_with(" ms"));
    }
    Ok(())
}

#[test]
fn records_metrics_and_writes_json_lines() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let record = temp.path().join("metrics.tsv");
    let out = temp.path().join("samples.jsonl");

    let mut cmd = cargo_bin_cmd!("physio");
    cmd.args([
        "simulate",
        "--offline",
        "--duration",
        "5",
        "--fs",
        "50",
        "--sink",
        "jsonl",
        "--out",
        out.to_str().expect("utf8 path"),
        "--record",
        record.to_str().expect("utf8 path"),
    ]);
    cmd.assert().success();

    let recorded = fs::read_to_string(&record)?;
    let mut rows = recorded.lines();
    assert_eq!(rows.next(), Some("onset\thr\thrv\tbr\tbrv"));
    let rows: Vec<&str> = rows.collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[0].starts_with("1.000\t"));
    assert_eq!(rows[3].split('\t').count(), 5);

    let samples = fs::read_to_string(&out)?;
    let mut counts = [0usize; 3];
    for line in samples.lines() {
        let value: Value = serde_json::from_str(line)?;
        let values = value["values"].as_array().expect("values");
        match value["stream"].as_str() {
            Some("EKG_raw") => {
                assert_eq!(values.len(), 1);
                counts[0] += 1;
            }
            Some("RSP_raw") => {
                assert_eq!(values.len(), 1);
                counts[1] += 1;
            }
            Some("physio_metrics") => {
                assert_eq!(values.len(), 4);
                counts[2] += 1;
            }
            other => panic!("unexpected stream {other:?}"),
        }
    }
    assert_eq!(counts, [250, 250, 4]);
    Ok(())
}

#[test]
fn session_file_sets_metrics_period() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let config = temp.path().join("session.toml");
    fs::write(&config, "metrics_period_s = 0.5\nwaveform = \"sine\"\n")?;

    let mut cmd = cargo_bin_cmd!("physio");
    cmd.args([
        "simulate",
        "--config",
        config.to_str().expect("utf8 path"),
        "--offline",
        "--duration",
        "3",
        "--sink",
        "null",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    assert_eq!(stdout_lines(&output).len(), 5);
    Ok(())
}

#[test]
fn rejects_invalid_settings() {
    cargo_bin_cmd!("physio")
        .args([
            "simulate",
            "--offline",
            "--duration",
            "2",
            "--fs",
            "0",
            "--sink",
            "null",
        ])
        .assert()
        .failure();
    cargo_bin_cmd!("physio")
        .args([
            "simulate",
            "--fs",
            "1e-20",
            "--duration",
            "1",
            "--sink",
            "null",
        ])
        .assert()
        .failure()
        .code(1);
    cargo_bin_cmd!("physio")
        .args([
            "simulate",
            "--offline",
            "--duration",
            "1",
            "--window-s",
            "1e12",
            "--sink",
            "null",
        ])
        .assert()
        .failure()
        .code(1);
    cargo_bin_cmd!("physio")
        .args(["simulate", "--offline", "--sink", "null"])
        .assert()
        .failure();
    cargo_bin_cmd!("physio")
        .args([
            "simulate",
            "--offline",
            "--duration",
            "2",
            "--sink",
            "jsonl",
        ])
        .assert()
        .failure();
}

#[test]
fn realtime_run_stops_at_duration() {
    let output = cargo_bin_cmd!("physio")
        .args(["simulate", "--duration", "1.5", "--sink", "null"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(!lines.iter().any(|l| l == "Stopped."));
}
