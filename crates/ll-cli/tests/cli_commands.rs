// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use tempfile::TempDir;

const LIVE_LOG: &str = "\
0 10 2015-04-30_23:59:59.000 1
500 6 120
300 1 10 20
0 10 2015-05-01_00:00:01.000 1
5 9 x
";

fn output_of(cmd: &mut assert_cmd::Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

#[test]
fn stats_reports_size_and_lines() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("living-log.log");
    fs::write(&log, LIVE_LOG).unwrap();

    let mut cmd = cargo_bin_cmd!("living-log");
    let text = output_of(cmd.arg("--log").arg(&log).arg("stats"));
    assert!(text.contains("5 lines"), "{text}");
}

#[test]
fn stats_of_missing_log_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("living-log");
    let text = output_of(cmd.arg("stats").arg(dir.path().join("none.log")));
    assert!(text.contains("does not exist"), "{text}");
}

#[test]
fn split_writes_monthly_archives() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("living-log.log");
    fs::write(&log, LIVE_LOG).unwrap();

    let mut cmd = cargo_bin_cmd!("living-log");
    let text = output_of(
        cmd.env("LIVING_LOG_FILE", &log)
            .arg("split")
            .arg("--split-block-size")
            .arg("2"),
    );
    assert!(text.contains("Archived 5 records into 2 file(s)"), "{text}");

    assert_eq!(fs::read_to_string(&log).unwrap(), "");
    let april = fs::read_to_string(dir.path().join("living-log.2015-04.log")).unwrap();
    let may = fs::read_to_string(dir.path().join("living-log.2015-05.log")).unwrap();
    assert!(april.contains(" 10 2015-04-30_23:59:59.000 1\n500 6 120\n300 1 10 20\n"), "{april}");
    assert_eq!(april.lines().count(), 3);
    assert!(may.contains(" 10 2015-05-01_00:00:01.000 1\n"), "{may}");
    assert_eq!(may.lines().count(), 2);
}

#[test]
fn failed_split_exits_with_error_and_keeps_log() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("living-log.log");
    fs::write(&log, LIVE_LOG).unwrap();
    fs::create_dir(dir.path().join("living-log.2015-05.log")).unwrap();

    let mut cmd = cargo_bin_cmd!("living-log");
    cmd.arg("split").arg(&log).assert().failure();

    assert_eq!(fs::read_to_string(&log).unwrap(), LIVE_LOG);
    assert!(!dir.path().join("living-log.2015-04.log").exists());
}

#[test]
fn repair_reorders_a_log() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("archive.log");
    fs::write(
        &log,
        "0 10 2015-04-01_00:00:00.000 1\n20 6 2\n0 10 2015-04-01_00:00:00.000 1\n10 6 1\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("living-log");
    let text = output_of(cmd.arg("repair").arg(&log));
    assert!(text.contains("3 records"), "{text}");
    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        "1427846400000 10 2015-04-01_00:00:00.000 1\n10 6 1\n10 6 2\n"
    );
}

#[test]
fn zero_interval_is_rejected() {
    let mut cmd = cargo_bin_cmd!("living-log");
    cmd.arg("--dump-interval-secs")
        .arg("0")
        .arg("stats")
        .assert()
        .failure();
}
