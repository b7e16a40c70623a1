//! Latency CSV export, one `latencies_<label>.csv` file per run.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SimError;
use crate::log_dev;
use crate::types::TaskId;

#[derive(Debug, Serialize)]
struct LatencyRow {
    task_id: TaskId,
    latency_ms: u64,
}

/// Turn a scenario label into a file-name fragment.
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    out
}

pub fn latency_file_name(label: &str) -> String {
    format!("latencies_{}.csv", slug(label))
}

/// Write headerless `task_id,latency_ms` rows ordered by task id.
///
/// Slots that were never recorded are skipped.
pub fn write_latencies(
    dir: &Path,
    label: &str,
    latencies: &[Option<u64>],
) -> Result<PathBuf, SimError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(latency_file_name(label));
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    for (index, latency) in latencies.iter().enumerate() {
        if let Some(latency_ms) = latency {
            writer.serialize(LatencyRow {
                task_id: index as TaskId,
                latency_ms: *latency_ms,
            })?;
        }
    }
    writer.flush()?;
    log_dev!("[EXPORT] wrote {}", path.display());
    Ok(path)
}
