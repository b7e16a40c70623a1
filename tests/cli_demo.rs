//! CLI integration tests for the demo and bench modes.

use std::collections::HashSet;
use std::io::Write;
use std::process::{Command, Stdio};

fn task_lines(stdout: &str) -> Vec<u64> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("Task "))
        .filter_map(|rest| rest.split_once(" latency: "))
        .map(|(id, _)| id.parse().expect("task id"))
        .collect()
}

#[test]
fn demo_cli_runs_all_scenarios_with_prompts() {
    let bin = env!("CARGO_BIN_EXE_latency_lab");
    let mut child = Command::new(bin)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to run demo binary");

    // Three Enter presses for the pauses between four scenarios.
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"\n\n\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("demo output");

    assert!(
        output.status.success(),
        "demo exited with non-zero status: {:?}",
        output.status
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let headers: Vec<&str> = stdout.lines().filter(|line| line.starts_with("=== ")).collect();
    assert_eq!(
        headers,
        vec![
            "=== LOW LATENCY MODE ===",
            "=== HIGH THROUGHPUT MODE ===",
            "=== LOW LATENCY MODE (SLOW FETCH) ===",
            "=== HIGH THROUGHPUT MODE (SLOW FETCH) ===",
        ]
    );
    assert_eq!(
        stdout
            .lines()
            .filter(|line| *line == "Press Enter to continue...")
            .count(),
        3
    );
    assert_eq!(stdout.lines().filter(|line| line.starts_with("Total time: ")).count(), 4);
    assert_eq!(
        stdout
            .lines()
            .filter(|line| line.starts_with("Average latency: "))
            .count(),
        4
    );
    assert_eq!(task_lines(&stdout).len(), 40);
}

#[test]
fn bench_cli_reports_each_task_once() {
    let bin = env!("CARGO_BIN_EXE_latency_lab");
    let output = Command::new(bin)
        .args(["bench", "12", "1", "2", "3"])
        .stderr(Stdio::null())
        .output()
        .expect("failed to run bench");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let ids: HashSet<u64> = task_lines(&stdout).into_iter().collect();
    assert_eq!(ids, (0..12).collect::<HashSet<_>>());

    let row = stdout.lines().last().expect("summary row");
    assert!(row.starts_with("12,1,2,3,"), "unexpected row: {row}");
}

fn run_expecting_usage(args: &[&str]) -> String {
    let bin = env!("CARGO_BIN_EXE_latency_lab");
    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to run bench");
    assert_eq!(output.status.code(), Some(2), "args {args:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage:"));
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn bench_cli_rejects_zero_workers() {
    let stderr = run_expecting_usage(&["bench", "5", "0", "0", "0"]);
    assert!(stderr.contains("workers out of range: 0"));
}

#[test]
fn bench_cli_rejects_oversized_task_count() {
    let stderr = run_expecting_usage(&["bench", "100000000000000000", "0", "0", "1"]);
    assert!(stderr.contains("tasks out of range"));
}

#[test]
fn bench_cli_rejects_oversized_worker_count() {
    let stderr = run_expecting_usage(&["bench", "5", "0", "0", "100000"]);
    assert!(stderr.contains("workers out of range"));
}

#[test]
fn bench_cli_rejects_serial_with_many_workers() {
    let stderr = run_expecting_usage(&["bench", "3", "0", "0", "4", "serial"]);
    assert!(stderr.contains("serial runs on one thread"));
}

#[test]
fn bench_cli_serial_exports_ordered_latencies() {
    let bin = env!("CARGO_BIN_EXE_latency_lab");
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_arg = format!("csv={}", dir.path().display());
    let output = Command::new(bin)
        .args(["bench", "5", "1", "2", "serial", csv_arg.as_str()])
        .stderr(Stdio::null())
        .output()
        .expect("failed to run bench");
    assert!(output.status.success(), "bench exited with {:?}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let ids = task_lines(&stdout);
    assert_eq!(ids, (0..5).collect::<Vec<_>>());
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    let row = stdout.lines().last().expect("summary row");
    assert!(row.starts_with("5,1,2,1,"), "unexpected row: {row}");

    let export = dir.path().join("latencies_benchmark.csv");
    let contents = std::fs::read_to_string(&export).expect("latency export");
    let exported: Vec<u64> = contents
        .lines()
        .map(|line| line.split(',').next().expect("task id").parse().expect("id"))
        .collect();
    assert_eq!(exported, (0..5).collect::<Vec<_>>());
}

#[test]
fn demo_cli_no_pause_skips_prompts_and_exports() {
    let bin = env!("CARGO_BIN_EXE_latency_lab");
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_arg = format!("csv={}", dir.path().display());
    let output = Command::new(bin)
        .args(["demo", "no-pause", csv_arg.as_str()])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .expect("failed to run demo");
    assert!(output.status.success(), "demo exited with {:?}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Press Enter to continue..."));
    assert_eq!(task_lines(&stdout).len(), 40);

    for name in [
        "latencies_low_latency_mode.csv",
        "latencies_high_throughput_mode.csv",
        "latencies_low_latency_mode__slow_fetch_.csv",
        "latencies_high_throughput_mode__slow_fetch_.csv",
    ] {
        assert!(dir.path().join(name).exists(), "missing export {name}");
    }
}

#[test]
fn unknown_command_exits_with_usage() {
    let bin = env!("CARGO_BIN_EXE_latency_lab");
    let output = Command::new(bin)
        .arg("bogus")
        .output()
        .expect("failed to run binary");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage:"));
}
