//! Concrete PID sources.
//!
//! # Async Safety
//!
//! Process-table and `/proc` reads run via `spawn_blocking` so a large
//! process table never stalls the runtime.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use sysinfo::{ProcessRefreshKind, RefreshKind, System};
use tokio::process::Command;
use tracing::trace;

use hud_core::WorkerPid;

use super::{DiscoveryError, PidSource};

// ============================================================================
// Fixed sources
// ============================================================================

/// An operator-supplied PID.
#[derive(Debug, Clone, Copy)]
pub struct ExplicitPid(pub WorkerPid);

#[async_trait]
impl PidSource for ExplicitPid {
    fn name(&self) -> &'static str {
        "override"
    }

    async fn resolve(&self) -> Result<Option<WorkerPid>, DiscoveryError> {
        Ok(Some(self.0))
    }
}

/// A file holding the worker PID as decimal text.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PidSource for PidFile {
    fn name(&self) -> &'static str {
        "pidfile"
    }

    async fn resolve(&self) -> Result<Option<WorkerPid>, DiscoveryError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DiscoveryError::PidFile {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        contents
            .parse::<WorkerPid>()
            .map(Some)
            .map_err(|e| DiscoveryError::PidFile {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }
}

// ============================================================================
// Scanning sources
// ============================================================================

/// Scans the process table for a process whose name or command line
/// contains the marker, preferring the most recently started one.
#[derive(Debug, Clone)]
pub struct ProcessTableScan {
    marker: String,
}

impl ProcessTableScan {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
        }
    }
}

#[async_trait]
impl PidSource for ProcessTableScan {
    fn name(&self) -> &'static str {
        "process-table"
    }

    async fn resolve(&self) -> Result<Option<WorkerPid>, DiscoveryError> {
        let marker = self.marker.clone();
        tokio::task::spawn_blocking(move || scan_process_table(&marker))
            .await
            .map_err(|e| DiscoveryError::Scan(e.to_string()))
    }
}

fn scan_process_table(marker: &str) -> Option<WorkerPid> {
    let system = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
    );
    let own_ids = own_task_ids();

    let candidates = system.processes().iter().filter_map(|(pid, process)| {
        let raw = pid.as_u32();
        // On Linux every thread is listed as its own entry; only thread-group
        // leaders are signalable workers
        if process.thread_kind().is_some() || own_ids.contains(&raw) {
            return None;
        }

        let name = process.name().to_string_lossy().to_lowercase();
        let cmd = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if !name.contains(marker) && !cmd.contains(marker) {
            return None;
        }

        trace!(pid = raw, name = %name, "Process table match");
        let pid = WorkerPid::new(raw).ok()?;
        Some((Some(process.start_time()), pid))
    });

    select_newest(candidates)
}

/// The relay's own PID plus every thread ID under `/proc/self/task`.
fn own_task_ids() -> HashSet<u32> {
    let own_pid = std::process::id();
    let mut ids = HashSet::from([own_pid]);

    let Ok(me) = procfs::process::Process::myself() else {
        return ids;
    };
    if let Ok(tasks) = me.tasks() {
        ids.extend(
            tasks
                .flatten()
                .filter_map(|task| u32::try_from(task.tid).ok()),
        );
    }
    ids
}

/// Asks `pgrep -f <marker>` for matching PIDs, preferring the most recently
/// started one (by `/proc/<pid>/stat` start time) and falling back to the
/// highest PID when start times are unavailable.
#[derive(Debug, Clone)]
pub struct PgrepScan {
    marker: String,
}

impl PgrepScan {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

#[async_trait]
impl PidSource for PgrepScan {
    fn name(&self) -> &'static str {
        "pgrep"
    }

    async fn resolve(&self) -> Result<Option<WorkerPid>, DiscoveryError> {
        let output = Command::new("pgrep")
            .arg("-f")
            .arg(&self.marker)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DiscoveryError::Pgrep(e.to_string()))?;

        // Exit status 1 means "no match"
        if !output.status.success() {
            return Ok(None);
        }

        let own_pid = std::process::id();
        let pids: Vec<WorkerPid> = parse_pgrep_output(&String::from_utf8_lossy(&output.stdout))
            .into_iter()
            .filter(|pid| pid.get() != own_pid)
            .collect();

        if pids.is_empty() {
            return Ok(None);
        }

        tokio::task::spawn_blocking(move || {
            select_newest(pids.into_iter().map(|pid| (proc_start_ticks(pid), pid)))
        })
        .await
        .map_err(|e| DiscoveryError::Scan(e.to_string()))
    }
}

/// Parses one PID per line, skipping anything that is not a valid PID.
pub(crate) fn parse_pgrep_output(stdout: &str) -> Vec<WorkerPid> {
    stdout
        .lines()
        .filter_map(|line| line.parse::<WorkerPid>().ok())
        .collect()
}

/// Reads a process start time in clock ticks since boot.
fn proc_start_ticks(pid: WorkerPid) -> Option<u64> {
    let process = procfs::process::Process::new(pid.as_raw()).ok()?;
    let stat = process.stat().ok()?;
    Some(stat.starttime)
}

/// Picks the candidate with the latest start time.
///
/// When no candidate has a known start time, the highest PID wins.
pub(crate) fn select_newest(
    candidates: impl IntoIterator<Item = (Option<u64>, WorkerPid)>,
) -> Option<WorkerPid> {
    let candidates: Vec<(Option<u64>, WorkerPid)> = candidates.into_iter().collect();

    let newest = candidates
        .iter()
        .filter_map(|(started, pid)| started.map(|s| (s, *pid)))
        .max();

    match newest {
        Some((_, pid)) => Some(pid),
        None => candidates.into_iter().map(|(_, pid)| pid).max(),
    }
}
