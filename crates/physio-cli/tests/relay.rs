use assert_cmd::cargo::cargo_bin_cmd;
use std::error::Error;
use std::fs;
use tempfile::tempdir;

#[test]
fn relay_normalizes_belt_payloads() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("physio");
    cmd.args(["relay", "--layout", "breath-belt", "--sink", "null"])
        .write_stdin("00000064 ff\n00 00 01 2c\n01\n0x000000c8\n");
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output)?;
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        ["0.0000", "1.0000", "0.5000"]
    );
    Ok(())
}

#[test]
fn relay_passes_heart_rate_through() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let feed = temp.path().join("hr.txt");
    let out = temp.path().join("hr.jsonl");
    fs::write(&feed, "# polar capture\n00 48\n01 4a 00\n")?;

    let mut cmd = cargo_bin_cmd!("physio");
    cmd.args([
        "relay",
        "--layout",
        "heart-rate",
        "--input",
        feed.to_str().expect("utf8 path"),
        "--sink",
        "jsonl",
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    assert_eq!(String::from_utf8(output)?.lines().count(), 2);

    let lines: Vec<String> = fs::read_to_string(&out)?
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(
        lines,
        [
            r#"{"stream":"physio_metrics","values":[72.0]}"#,
            r#"{"stream":"physio_metrics","values":[74.0]}"#,
        ]
    );
    Ok(())
}

#[test]
fn relay_fails_on_missing_feed() {
    cargo_bin_cmd!("physio")
        .args([
            "relay",
            "--input",
            "/nonexistent/feed.txt",
            "--sink",
            "null",
        ])
        .assert()
        .failure();
}

#[test]
fn relay_rejects_oversized_normalization_window() {
    cargo_bin_cmd!("physio")
        .args(["relay", "--normalization-s", "1e15", "--sink", "null"])
        .write_stdin("00000064\n")
        .assert()
        .failure()
        .code(1);
}
