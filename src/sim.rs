//! Simulation driver, scenario table, demo and benchmark runners.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::console::Console;
use crate::error::SimError;
use crate::export;
use crate::latency::LatencyTable;
use crate::log_dev;
use crate::stages::{self, Stages};
use crate::task_queue::TaskQueue;

// Defaults for `bench` when an argument is omitted.
const BENCH_TASKS: usize = 10;
const BENCH_FETCH_MS: u64 = 10;
const BENCH_PROCESS_MS: u64 = 20;

/// Largest run the latency table is allowed to size itself for.
pub const MAX_TASK_COUNT: usize = 1_000_000;
/// Upper bound on pool threads per run.
pub const MAX_WORKER_COUNT: usize = 1024;

const PAUSE_PROMPT: &str = "Press Enter to continue...";

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    // SAFETY: an all-zero rusage is a valid value for getrusage to overwrite.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Worker count matching the machine's hardware threads.
pub fn hardware_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// How tasks move from the fetch stage to the process stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The driver thread fetches, enqueues, dequeues and processes each task
    /// before fetching the next one.
    Serial,
    /// The driver only fetches; a pool of worker threads processes.
    Pooled,
}

/// Parameters of one simulated run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    pub label: String,
    pub task_count: usize,
    pub fetch_delay: Duration,
    pub process_delay: Duration,
    pub worker_count: usize,
    pub mode: ExecutionMode,
}

impl SimConfig {
    /// A pooled run with `worker_count` workers.
    pub fn new(
        label: impl Into<String>,
        task_count: usize,
        fetch_ms: u64,
        process_ms: u64,
        worker_count: usize,
    ) -> Self {
        Self {
            label: label.into(),
            task_count,
            fetch_delay: Duration::from_millis(fetch_ms),
            process_delay: Duration::from_millis(process_ms),
            worker_count,
            mode: ExecutionMode::Pooled,
        }
    }

    /// A strictly serial run on the driver thread.
    pub fn serial(
        label: impl Into<String>,
        task_count: usize,
        fetch_ms: u64,
        process_ms: u64,
    ) -> Self {
        Self {
            mode: ExecutionMode::Serial,
            ..Self::new(label, task_count, fetch_ms, process_ms, 1)
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.task_count == 0 {
            return Err(SimError::InvalidConfig("task_count must be > 0".into()));
        }
        if self.task_count > MAX_TASK_COUNT {
            return Err(SimError::InvalidConfig(format!(
                "task_count must be <= {MAX_TASK_COUNT}, got {}",
                self.task_count
            )));
        }
        if self.worker_count == 0 {
            return Err(SimError::InvalidConfig("worker_count must be > 0".into()));
        }
        if self.worker_count > MAX_WORKER_COUNT {
            return Err(SimError::InvalidConfig(format!(
                "worker_count must be <= {MAX_WORKER_COUNT}, got {}",
                self.worker_count
            )));
        }
        if self.mode == ExecutionMode::Serial && self.worker_count != 1 {
            return Err(SimError::InvalidConfig(format!(
                "serial mode runs on one thread, got worker_count={}",
                self.worker_count
            )));
        }
        Ok(())
    }

    /// Sleep-backed stages for this configuration.
    pub fn stages(&self) -> Stages {
        Stages::sleeping(self.fetch_delay, self.process_delay)
    }
}

/// The four demo scenarios: serial vs pooled, for a fast and a slow workload.
pub fn scenarios() -> Vec<SimConfig> {
    let pool = hardware_workers();
    vec![
        SimConfig::serial("LOW LATENCY MODE", 10, 10, 20),
        SimConfig::new("HIGH THROUGHPUT MODE", 10, 10, 20, pool),
        SimConfig::serial("LOW LATENCY MODE (SLOW FETCH)", 10, 30, 70),
        SimConfig::new("HIGH THROUGHPUT MODE (SLOW FETCH)", 10, 30, 70, pool),
    ]
}

/// Lifecycle of a single run; transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    NotStarted,
    WorkersRunning,
    Producing,
    Draining,
    Joined,
    Reported,
}

/// Per-run shared state handed to every worker.
pub struct SimContext<'a> {
    pub queue: TaskQueue,
    pub latencies: LatencyTable,
    pub console: &'a Console,
    phase: Mutex<RunPhase>,
}

impl<'a> SimContext<'a> {
    pub fn new(task_count: usize, console: &'a Console) -> Self {
        Self {
            queue: TaskQueue::new(),
            latencies: LatencyTable::new(task_count),
            console,
            phase: Mutex::new(RunPhase::NotStarted),
        }
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().expect("phase mutex poisoned")
    }

    fn advance(&self, next: RunPhase) {
        let mut guard = self.phase.lock().expect("phase mutex poisoned");
        debug_assert!(next > *guard, "run phase moved backwards: {:?} -> {:?}", *guard, next);
        log_dev!("[SIM] phase {:?} -> {:?}", *guard, next);
        *guard = next;
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub label: String,
    pub task_count: usize,
    pub worker_count: usize,
    pub total: Duration,
    pub average_latency_ms: f64,
    pub latencies: Vec<Option<u64>>,
    pub cpu_user_s: Option<f64>,
    pub cpu_sys_s: Option<f64>,
    pub phase: RunPhase,
}

impl RunReport {
    /// Tasks completed per second of wall time.
    pub fn throughput(&self) -> f64 {
        let secs = self.total.as_secs_f64();
        if secs > 0.0 {
            self.task_count as f64 / secs
        } else {
            0.0
        }
    }
}

/// Worker loop: drain the queue until it is closed and empty.
fn worker_loop(ctx: &SimContext<'_>, stages: &Stages) -> usize {
    let mut processed = 0usize;
    while let Some(task) = ctx.queue.pop_blocking_or_closed() {
        log_dev!("[WORKER] picked task {}", task.id);
        stages::process_task(task, stages.process.as_ref(), &ctx.latencies, ctx.console);
        processed += 1;
    }
    log_dev!("[WORKER] exiting after {processed} task(s)");
    processed
}

/// Fetch every task in id order and hand it to the queue, then close it.
fn produce(ctx: &SimContext<'_>, config: &SimConfig, stages: &Stages) {
    ctx.advance(RunPhase::Producing);
    for id in 0..config.task_count {
        let task = stages::fetch_task(id as u64, stages.fetch.as_ref());
        log_dev!("[QUEUE] enqueue task {}", task.id);
        if ctx.queue.push(task).is_err() {
            log_dev!("[QUEUE] queue closed early, task {id} dropped");
        }
    }
    ctx.queue.close();
    log_dev!("[QUEUE] production finished, {} task(s) pending", ctx.queue.len());
    ctx.advance(RunPhase::Draining);
}

/// Serial baseline: each task is fetched, queued, popped and processed on
/// the driver thread before the next fetch starts.
fn run_serial(ctx: &SimContext<'_>, config: &SimConfig, stages: &Stages) {
    ctx.advance(RunPhase::Producing);
    for id in 0..config.task_count {
        let task = stages::fetch_task(id as u64, stages.fetch.as_ref());
        if ctx.queue.push(task).is_err() {
            log_dev!("[QUEUE] queue closed early, task {id} dropped");
            continue;
        }
        if let Some(task) = ctx.queue.try_pop() {
            stages::process_task(task, stages.process.as_ref(), &ctx.latencies, ctx.console);
        }
    }
    ctx.queue.close();
    ctx.advance(RunPhase::Draining);
    ctx.advance(RunPhase::Joined);
}

/// Pooled run; returns how many workers panicked.
fn run_pooled(
    ctx: &SimContext<'_>,
    config: &SimConfig,
    stages: &Stages,
) -> Result<usize, SimError> {
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let spawned = thread::Builder::new()
                .name(format!("worker-{worker_id}"))
                .spawn_scoped(scope, move || worker_loop(ctx, stages));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    // Let already-running workers exit before the scope joins them.
                    ctx.queue.close();
                    return Err(SimError::Spawn(err));
                }
            }
        }
        ctx.advance(RunPhase::WorkersRunning);
        log_dev!("[SIM] {} worker(s) running", handles.len());

        produce(ctx, config, stages);

        let mut panicked = 0usize;
        for handle in handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        debug_assert!(ctx.queue.is_closed(), "queue left open after join");
        ctx.advance(RunPhase::Joined);
        Ok(panicked)
    })
}

/// Run one simulation and print its header, per-task lines and totals.
///
/// A pooled run spawns the workers first, fetches and enqueues every task,
/// closes the queue and joins the pool before reporting.
pub fn run_simulation(
    config: &SimConfig,
    stages: &Stages,
    console: &Console,
) -> Result<RunReport, SimError> {
    config.validate()?;
    let ctx = SimContext::new(config.task_count, console);
    console.line(format!("=== {} ===", config.label));

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();

    let panicked = match config.mode {
        ExecutionMode::Serial => {
            run_serial(&ctx, config, stages);
            0
        }
        ExecutionMode::Pooled => run_pooled(&ctx, config, stages)?,
    };
    if panicked > 0 {
        log_dev!("[SIM] missing latencies for tasks {:?}", ctx.latencies.missing());
        return Err(SimError::WorkerPanicked {
            panicked,
            workers: config.worker_count,
            latencies: ctx.latencies.snapshot(),
        });
    }

    debug_assert!(ctx.latencies.is_complete(), "unrecorded latencies after join");
    let total = start.elapsed();
    let average_latency_ms = ctx.latencies.mean();
    console.line(format!("Total time: {} ms", total.as_millis()));
    console.line(format!("Average latency: {average_latency_ms:.2} ms"));
    ctx.advance(RunPhase::Reported);

    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    Ok(RunReport {
        label: config.label.clone(),
        task_count: config.task_count,
        worker_count: config.worker_count,
        total,
        average_latency_ms,
        latencies: ctx.latencies.snapshot(),
        cpu_user_s,
        cpu_sys_s,
        phase: ctx.phase(),
    })
}

/// Block on one line of input; errors and closed input are ignored.
fn wait_for_enter(console: &Console, input: &mut dyn BufRead) {
    console.line(PAUSE_PROMPT);
    let mut line = String::new();
    let _ = input.read_line(&mut line);
}

fn export_report(dir: &Path, report: &RunReport) -> Result<(), SimError> {
    export::write_latencies(dir, &report.label, &report.latencies)?;
    Ok(())
}

/// Demo switches taken from the command line.
#[derive(Clone, Debug, Default)]
pub struct DemoOptions {
    pub pause: bool,
    pub export_dir: Option<PathBuf>,
}

/// Run every configuration in order, pausing for Enter between them.
pub fn run_scenarios(
    configs: &[SimConfig],
    options: &DemoOptions,
    console: &Console,
    input: &mut dyn BufRead,
    stages_for: impl Fn(&SimConfig) -> Stages,
) -> Result<Vec<RunReport>, SimError> {
    let mut reports = Vec::with_capacity(configs.len());
    for (index, config) in configs.iter().enumerate() {
        if index > 0 && options.pause {
            wait_for_enter(console, input);
        }
        let report = run_simulation(config, &stages_for(config), console)?;
        if let Some(dir) = options.export_dir.as_deref() {
            export_report(dir, &report)?;
        }
        reports.push(report);
    }
    Ok(reports)
}

/// Run the four built-in scenarios against stdout and stdin.
pub fn run_demo(options: &DemoOptions) -> Result<(), SimError> {
    log_dev!("[DEMO] start");
    let console = Console::stdout();
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let reports = run_scenarios(&scenarios(), options, &console, &mut input, SimConfig::stages)?;
    log_dev!("[DEMO] finished {} scenario(s)", reports.len());
    Ok(())
}

const BENCH_HEADER: &str = "tasks,fetch_ms,process_ms,workers,total_ms,avg_latency_ms,\
    throughput_tasks_per_s,cpu_user_s,cpu_sys_s";

fn bench_row(config: &SimConfig, report: &RunReport) -> String {
    let cpu_user = report
        .cpu_user_s
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string());
    let cpu_sys = report
        .cpu_sys_s
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string());
    format!(
        "{},{},{},{},{},{:.2},{:.2},{},{}",
        report.task_count,
        config.fetch_delay.as_millis(),
        config.process_delay.as_millis(),
        report.worker_count,
        report.total.as_millis(),
        report.average_latency_ms,
        report.throughput(),
        cpu_user,
        cpu_sys
    )
}

/// Run a single configuration with optional overrides and print a CSV summary.
pub fn run_benchmark(
    tasks: Option<usize>,
    fetch_ms: Option<u64>,
    process_ms: Option<u64>,
    workers: Option<usize>,
    serial: bool,
    export_dir: Option<&Path>,
) -> Result<(), SimError> {
    let default_workers = if serial { 1 } else { hardware_workers() };
    let mut config = SimConfig::new(
        "BENCHMARK",
        tasks.unwrap_or(BENCH_TASKS),
        fetch_ms.unwrap_or(BENCH_FETCH_MS),
        process_ms.unwrap_or(BENCH_PROCESS_MS),
        workers.unwrap_or(default_workers),
    );
    if serial {
        config.mode = ExecutionMode::Serial;
    }
    let console = Console::stdout();
    let report = run_simulation(&config, &config.stages(), &console)?;
    if let Some(dir) = export_dir {
        export_report(dir, &report)?;
    }
    console.line(BENCH_HEADER);
    console.line(bench_row(&config, &report));
    Ok(())
}
