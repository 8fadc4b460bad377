// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{process::Command,
          time::{Duration, Instant}};

use pretty_assertions::assert_eq;

const COUNTER_EXE: &str = env!("CARGO_BIN_EXE_periodic_counter");

#[test]
fn test_counter_lines_are_a_period_apart() {
    let start = Instant::now();
    let output = Command::new(COUNTER_EXE)
        .args(["--period-ms", "100", "--iterations", "4"])
        .output()
        .unwrap();
    let elapsed = start.elapsed();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let counters: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(counters, vec!["0", "1", "2", "3"]);

    // Three waits of one period each.
    assert!(elapsed >= Duration::from_millis(300), "elapsed: {elapsed:?}");
}

#[test]
fn test_invalid_deadline_fails() {
    let output = Command::new(COUNTER_EXE)
        .args(["--period-ms", "100", "--deadline-ms", "200", "--iterations", "1"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("deadline must not exceed period"), "stderr: {stderr}");
}
