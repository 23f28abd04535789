//! Process sampler: enumeration, per-process CPU% from cursor, memory
//! resolution with PSS-dirty escalation for large processes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use crate::cancel::CancelFlag;
use crate::cursor;
use crate::models::{MemoryCalculation, ProcessCursorEntry, ProcessInfo, ProcessList};
use crate::probes::parser::{
    normalize_cmdline, parse_meminfo, parse_proc_stat, parse_proc_status, parse_pss_dirty,
};
use crate::probes::{FileSystem, ProbeError, Probes};

use super::{CLK_TCK, Engine, now_unix_ms};

/// RSS cutoff above which the sampler reads PSS-dirty instead. Shared
/// pages inflate RSS misleadingly for large processes, but the
/// smaps_rollup read is too expensive to do for every PID.
const PSS_ESCALATION_RSS_KB: u64 = 100 * 1024;

/// First-call bootstrap: how many processes get a baseline reading.
const BOOTSTRAP_MAX_PROCS: usize = 100;
const BOOTSTRAP_WINDOW: Duration = Duration::from_millis(200);

const MAX_WORKERS: usize = 8;

/// Requested sort order for the process listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcSortKey {
    #[default]
    Cpu,
    Memory,
    Name,
    Pid,
}

impl std::str::FromStr for ProcSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            "name" => Ok(Self::Name),
            "pid" => Ok(Self::Pid),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Parameters for one process listing call.
#[derive(Debug, Clone, Default)]
pub struct ProcessQuery {
    pub sort: ProcSortKey,
    /// 0 = unlimited.
    pub limit: usize,
    pub enable_cpu: bool,
    pub cursor: Option<String>,
}

/// CPU% from the cursor delta. Per-core-normalized by construction:
/// one fully-busy core accumulates one CPU-second per wall-second.
fn cursor_cpu_percent(prior: &ProcessCursorEntry, curr_cpu_secs: f64, now_ms: i64) -> f64 {
    if prior.timestamp == 0 || curr_cpu_secs <= prior.ticks {
        return 0.0;
    }
    let wall_secs = (now_ms - prior.timestamp) as f64 / 1000.0;
    if wall_secs <= 0.0 {
        return 0.0;
    }
    ((curr_cpu_secs - prior.ticks) / wall_secs * 100.0).clamp(0.0, 100.0)
}

impl<P: Probes> Engine<P> {
    /// Returns a sorted, possibly truncated process listing plus a cursor
    /// recording each returned process's cumulative CPU time.
    ///
    /// A process that disappears mid-enumeration is dropped silently; an
    /// unreadable field yields its zero value but the process is still
    /// returned. Cursor entries for PIDs that no longer exist are skipped.
    pub fn processes(
        &self,
        query: &ProcessQuery,
        cancel: &CancelFlag,
    ) -> Result<ProcessList, ProbeError> {
        let pids = self.list_pids()?;
        let now_ms = now_unix_ms();

        let mem_total_kb = self
            .probes
            .read_to_string(&self.proc_path.join("meminfo"))
            .ok()
            .and_then(|c| parse_meminfo(&c).ok())
            .map(|m| m.total)
            .unwrap_or(0);

        let prior_map: HashMap<u32, ProcessCursorEntry> = query
            .cursor
            .as_deref()
            .and_then(cursor::decode::<Vec<ProcessCursorEntry>>)
            .unwrap_or_default()
            .into_iter()
            .map(|e| (e.pid, e))
            .collect();

        // First call without a cursor: take a baseline for the first batch
        // and measure over a short window so CPU numbers are non-zero
        // without stalling for a full sampling interval.
        let mut bootstrap: HashMap<u32, ProcessCursorEntry> = HashMap::new();
        if query.enable_cpu && prior_map.is_empty() {
            let t0_ms = now_unix_ms();
            for &pid in pids.iter().take(BOOTSTRAP_MAX_PROCS) {
                if let Some(secs) = self.read_cpu_seconds(pid) {
                    bootstrap.insert(
                        pid,
                        ProcessCursorEntry {
                            pid,
                            ticks: secs,
                            timestamp: t0_ms,
                        },
                    );
                }
            }
            cancel.sleep(BOOTSTRAP_WINDOW);
        }

        let cores = self.cpu_identity().1.max(1);
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(1, MAX_WORKERS);

        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<ProcessInfo>();

        std::thread::scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                let pids = &pids;
                let prior_map = &prior_map;
                let bootstrap = &bootstrap;
                s.spawn(move || {
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        if idx >= pids.len() {
                            break;
                        }
                        if let Some(info) = self.read_process(
                            pids[idx],
                            prior_map,
                            bootstrap,
                            now_ms,
                            mem_total_kb,
                            query.enable_cpu,
                            cores,
                        ) {
                            let _ = tx.send(info);
                        }
                    }
                });
            }
            drop(tx);
        });

        let mut list: Vec<ProcessInfo> = rx.iter().collect();

        match query.sort {
            ProcSortKey::Cpu => list.sort_by(|a, b| {
                b.cpu_percent
                    .total_cmp(&a.cpu_percent)
                    .then(a.pid.cmp(&b.pid))
            }),
            ProcSortKey::Memory => list.sort_by(|a, b| {
                b.memory_percent
                    .total_cmp(&a.memory_percent)
                    .then(a.pid.cmp(&b.pid))
            }),
            ProcSortKey::Name => {
                list.sort_by(|a, b| a.command.cmp(&b.command).then(a.pid.cmp(&b.pid)))
            }
            ProcSortKey::Pid => list.sort_by_key(|p| p.pid),
        }

        if query.limit > 0 && list.len() > query.limit {
            list.truncate(query.limit);
        }

        let cursor_entries: Vec<ProcessCursorEntry> = list
            .iter()
            .map(|p| ProcessCursorEntry {
                pid: p.pid,
                ticks: p.cumulative_cpu_seconds,
                timestamp: now_ms,
            })
            .collect();

        Ok(ProcessList {
            processes: list,
            cursor: cursor::encode(&cursor_entries),
        })
    }

    fn read_cpu_seconds(&self, pid: u32) -> Option<f64> {
        let content = self
            .probes
            .read_to_string(&self.proc_path.join(pid.to_string()).join("stat"))
            .ok()?;
        let stat = parse_proc_stat(&content).ok()?;
        Some((stat.utime + stat.stime) as f64 / CLK_TCK as f64)
    }

    #[allow(clippy::too_many_arguments)]
    fn read_process(
        &self,
        pid: u32,
        prior_map: &HashMap<u32, ProcessCursorEntry>,
        bootstrap: &HashMap<u32, ProcessCursorEntry>,
        now_ms: i64,
        mem_total_kb: u64,
        enable_cpu: bool,
        cores: usize,
    ) -> Option<ProcessInfo> {
        let proc_dir = self.proc_path.join(pid.to_string());

        // stat is the one file a live process always has; anything else
        // missing degrades to zeros.
        let stat_content = self.probes.read_to_string(&proc_dir.join("stat")).ok()?;
        let stat = parse_proc_stat(&stat_content).ok()?;

        let status = self
            .probes
            .read_to_string(&proc_dir.join("status"))
            .map(|c| parse_proc_status(&c))
            .unwrap_or_default();
        let full_command = self
            .probes
            .read_to_string(&proc_dir.join("cmdline"))
            .map(|c| normalize_cmdline(&c))
            .unwrap_or_default();

        let cpu_seconds = (stat.utime + stat.stime) as f64 / CLK_TCK as f64;

        let cpu_percent = if enable_cpu {
            if let Some(prior) = prior_map.get(&pid) {
                cursor_cpu_percent(prior, cpu_seconds, now_ms)
            } else if let Some(baseline) = bootstrap.get(&pid) {
                // Short-window reading, normalized per core.
                let wall_secs = (now_unix_ms() - baseline.timestamp) as f64 / 1000.0;
                if wall_secs > 0.0 && cpu_seconds > baseline.ticks {
                    ((cpu_seconds - baseline.ticks) / wall_secs * 100.0 / cores as f64)
                        .clamp(0.0, 100.0)
                } else {
                    0.0
                }
            } else {
                0.0
            }
        } else {
            0.0
        };

        let rss_kb = status.vm_rss;
        let percent_of_total = |kb: u64| {
            if mem_total_kb > 0 {
                kb as f64 / mem_total_kb as f64 * 100.0
            } else {
                0.0
            }
        };
        let rss_percent = percent_of_total(rss_kb);

        let mut memory_kb = rss_kb;
        let mut memory_percent = rss_percent;
        let mut memory_calculation = MemoryCalculation::Rss;
        let mut pss_kb = 0;
        let mut pss_percent = 0.0;

        if rss_kb > PSS_ESCALATION_RSS_KB
            && let Ok(rollup) = self
                .probes
                .read_to_string(&proc_dir.join("smaps_rollup"))
            && let Some(pss_dirty) = parse_pss_dirty(&rollup)
            && pss_dirty > 0
        {
            pss_kb = pss_dirty;
            pss_percent = percent_of_total(pss_dirty);
            memory_kb = pss_dirty;
            memory_percent = pss_percent;
            memory_calculation = MemoryCalculation::PssDirty;
        }

        let command = if status.name.is_empty() {
            stat.comm.clone()
        } else {
            status.name.clone()
        };

        Some(ProcessInfo {
            pid,
            ppid: stat.ppid,
            cpu_percent,
            cumulative_cpu_seconds: cpu_seconds,
            memory_percent,
            memory_kb,
            memory_calculation,
            rss_kb,
            rss_percent,
            pss_kb,
            pss_percent,
            username: self.users.resolve(status.uid),
            command,
            full_command,
        })
    }
}
