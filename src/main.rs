mod console;
mod error;
mod export;
mod latency;
mod logging;
mod sim;
mod stages;
mod task_queue;
mod types;

use std::path::PathBuf;

use crate::sim::DemoOptions;

fn print_usage(program: &str) {
    println!("Latency Lab CLI");
    println!("Usage:");
    println!("  {program} (run the four demo scenarios, pausing between them)");
    println!("  {program} demo [no-pause] [csv=<dir>]");
    println!("  {program} bench [tasks] [fetch_ms] [process_ms] [workers] [serial] [csv=<dir>]");
    println!("  {program} --help");
    println!();
    println!("Omit trailing numbers to keep their defaults.");
    println!("workers defaults to the hardware thread count, or 1 with serial.");
    println!("Defaults:");
    println!("  bench  tasks=10 fetch_ms=10 process_ms=20");
    println!("Limits:");
    println!(
        "  tasks=1..={} workers=1..={} (serial requires workers=1)",
        sim::MAX_TASK_COUNT,
        sim::MAX_WORKER_COUNT
    );
    println!("Flags:");
    println!("  no-pause   do not wait for Enter between scenarios");
    println!("  serial     fetch and process on one thread instead of a worker pool");
    println!("  csv=<dir>  write latencies_<label>.csv files into <dir>");
}

fn exit_with_usage(program: &str, message: &str) -> ! {
    eprintln!("{message}");
    print_usage(program);
    std::process::exit(2);
}

fn parse_csv_dir(arg: &str) -> Option<PathBuf> {
    let dir = arg.strip_prefix("csv=")?;
    if dir.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(dir))
}

fn run_or_exit(result: Result<(), error::SimError>) {
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn main() {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "latency_lab".to_string());
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("demo") => {
            let mut options = DemoOptions {
                pause: true,
                export_dir: None,
            };
            for arg in args {
                if arg == "no-pause" {
                    options.pause = false;
                } else if let Some(dir) = parse_csv_dir(&arg) {
                    options.export_dir = Some(dir);
                } else {
                    exit_with_usage(&program, &format!("demo: unexpected argument: {arg}"));
                }
            }
            run_or_exit(sim::run_demo(&options));
        }
        Some("bench") => {
            let mut numbers: Vec<u64> = Vec::new();
            let mut serial = false;
            let mut export_dir: Option<PathBuf> = None;
            for arg in args {
                if arg == "serial" {
                    serial = true;
                } else if let Some(dir) = parse_csv_dir(&arg) {
                    export_dir = Some(dir);
                } else if let Ok(value) = arg.parse::<u64>() {
                    if numbers.len() == 4 {
                        exit_with_usage(&program, &format!("bench: unexpected argument: {arg}"));
                    }
                    numbers.push(value);
                } else {
                    exit_with_usage(&program, &format!("bench: invalid value: {arg}"));
                }
            }
            let tasks = numbers.first().map(|&v| usize::try_from(v).unwrap_or(usize::MAX));
            let fetch_ms = numbers.get(1).copied();
            let process_ms = numbers.get(2).copied();
            let workers = numbers.get(3).map(|&v| usize::try_from(v).unwrap_or(usize::MAX));
            if let Some(tasks) = tasks.filter(|&t| t == 0 || t > sim::MAX_TASK_COUNT) {
                exit_with_usage(&program, &format!("bench: tasks out of range: {tasks}"));
            }
            if let Some(workers) = workers.filter(|&w| w == 0 || w > sim::MAX_WORKER_COUNT) {
                exit_with_usage(&program, &format!("bench: workers out of range: {workers}"));
            }
            if let (true, Some(workers)) = (serial, workers.filter(|&w| w != 1)) {
                exit_with_usage(
                    &program,
                    &format!("bench: serial runs on one thread, got workers={workers}"),
                );
            }
            run_or_exit(sim::run_benchmark(
                tasks,
                fetch_ms,
                process_ms,
                workers,
                serial,
                export_dir.as_deref(),
            ));
        }
        Some("--help") | Some("-h") | Some("help") => print_usage(&program),
        Some(other) => {
            exit_with_usage(&program, &format!("unknown command: {other}"));
        }
        None => run_or_exit(sim::run_demo(&DemoOptions {
            pause: true,
            export_dir: None,
        })),
    }
}
