//! Response envelopes and cursor payloads.
//!
//! Every module has a stable JSON schema; cursor payloads are serialized
//! through [`crate::cursor`] and never reach the client as plain JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cursor payloads
// ---------------------------------------------------------------------------

/// Prior CPU times (seconds) and the wall-clock instant they were observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuCursor {
    /// Aggregate ticks: user, nice, system, idle, iowait, irq, softirq, steal.
    pub total: Vec<f64>,
    /// Per-core ticks in index order, same layout as `total`.
    pub cores: Vec<Vec<f64>>,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// One prior process observation; the process cursor is an array of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessCursorEntry {
    pub pid: u32,
    /// Cumulative CPU seconds (user + system) at sample time.
    pub ticks: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// Per-interface counters carried in the network rate cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetCounters {
    pub bytes_recv: u64,
    pub bytes_sent: u64,
    pub packets_recv: u64,
    pub packets_sent: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetRateCursor {
    /// Unix milliseconds.
    pub timestamp: i64,
    pub interfaces: HashMap<String, NetCounters>,
}

/// Per-device counters carried in the disk rate cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_count: u64,
    pub write_count: u64,
    /// Milliseconds spent reading.
    pub read_time: u64,
    /// Milliseconds spent writing.
    pub write_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskRateCursor {
    /// Unix milliseconds.
    pub timestamp: i64,
    pub devices: HashMap<String, DiskCounters>,
}

// ---------------------------------------------------------------------------
// CPU
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuSnapshot {
    /// Logical core count.
    pub count: usize,
    pub model: String,
    pub frequency_mhz: f64,
    pub temperature_c: f64,
    /// Aggregate utilization over the cursor window, 0..=100.
    pub usage_percent: f64,
    /// Per-core utilization in index order; `len() == count`.
    pub core_usage_percent: Vec<f64>,
    /// Aggregate CPU seconds: user, nice, system, idle, iowait, irq, softirq, steal.
    pub total: Vec<f64>,
    /// Per-core CPU seconds, same layout as `total`.
    pub cores: Vec<Vec<f64>>,
    pub cursor: String,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// All sizes in KiB.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub total_kb: u64,
    pub used_kb: u64,
    pub used_percent: f64,
    pub free_kb: u64,
    pub available_kb: u64,
    pub buffers_kb: u64,
    /// Page cache excluding SReclaimable, plus ZFS ARC when present.
    pub cached_kb: u64,
    pub sreclaimable_kb: u64,
    pub shared_kb: u64,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
    pub zfs_arc_size_kb: u64,
}

// ---------------------------------------------------------------------------
// Processes
// ---------------------------------------------------------------------------

/// How `memory_kb` was derived for a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCalculation {
    #[default]
    Rss,
    PssDirty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub ppid: u32,
    /// Per-core-normalized: 100 means one fully-busy core.
    pub cpu_percent: f64,
    pub cumulative_cpu_seconds: f64,
    pub memory_percent: f64,
    pub memory_kb: u64,
    pub memory_calculation: MemoryCalculation,
    pub rss_kb: u64,
    pub rss_percent: f64,
    pub pss_kb: u64,
    pub pss_percent: f64,
    pub username: String,
    pub command: String,
    pub full_command: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessList {
    pub processes: Vec<ProcessInfo>,
    pub cursor: String,
}

// ---------------------------------------------------------------------------
// Disk
// ---------------------------------------------------------------------------

/// Cumulative I/O for one physical block device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskIoTotals {
    pub device: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskMount {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
    /// Human-readable binary units, `df -h` style.
    pub size: String,
    pub used: String,
    pub available: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskDeviceRate {
    pub device: String,
    pub read_bytes_total: u64,
    pub write_bytes_total: u64,
    pub read_rate_bytes_per_sec: f64,
    pub write_rate_bytes_per_sec: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskRateSnapshot {
    pub devices: Vec<DiskDeviceRate>,
    pub cursor: String,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Cumulative traffic for one interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetLink {
    pub interface: String,
    pub rx_total: u64,
    pub tx_total: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetInterfaceRate {
    pub interface: String,
    pub rx_total: u64,
    pub tx_total: u64,
    pub rx_rate: f64,
    pub tx_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetRateSnapshot {
    pub interfaces: Vec<NetInterfaceRate>,
    pub cursor: String,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    /// Runnable scheduling entities from loadavg.
    pub running: u32,
    /// Total scheduling entities (threads) from loadavg.
    pub threads: u32,
    /// Number of process directories currently present.
    pub processes: u64,
    pub procs_running: u32,
    pub procs_blocked: u32,
    pub uptime_secs: u64,
    /// Unix seconds.
    pub boot_time: u64,
}

// ---------------------------------------------------------------------------
// Hardware & GPU
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuIdentity {
    pub count: usize,
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiosInfo {
    pub vendor: String,
    pub motherboard: String,
    pub version: String,
    pub date: String,
}

/// Immutable for the process lifetime; cached after the first read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub cpu: CpuIdentity,
    pub bios: BiosInfo,
    pub kernel: String,
    pub hostname: String,
    pub arch: String,
    pub distro_pretty_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gpu {
    pub driver: String,
    pub vendor: String,
    pub display_name: String,
    pub full_name: String,
    /// `vvvv:dddd` lowercase hex.
    pub pci_id: String,
    pub temperature_c: f64,
    pub hwmon_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpuTemp {
    pub driver: String,
    pub hwmon: String,
    pub temperature_c: f64,
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesInfo {
    pub available: Vec<String>,
}

/// Merged result of a composite call. Only requested modules are populated;
/// a module that failed is absent rather than failing the whole snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<Vec<NetLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_rate: Option<NetRateSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<Vec<DiskIoTotals>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_rate: Option<DiskRateSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_mounts: Option<Vec<DiskMount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processes: Option<Vec<ProcessInfo>>,
    /// Cursor for the `processes` module.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Vec<Gpu>>,
}
