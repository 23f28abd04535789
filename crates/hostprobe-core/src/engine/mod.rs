//! The sampling engine.
//!
//! One `Engine` instance serves every module. It is fully synchronous
//! (each probe is a pseudo-filesystem read, a short sleep, or an external
//! command) and safe to share across threads; the composite dispatcher
//! fans out over it with one thread per module.
//!
//! The only state that survives between calls is a handful of caches with
//! explicit freshness windows (CPU identity, resolved temperature sensor
//! path, last frequency/temperature readings, hardware identity). Rates
//! are never derived from server-side state: the client-held cursor
//! carries the prior counters.

mod cpu;
mod disk;
mod gpu;
mod hardware;
mod memory;
mod network;
mod process;
mod system;

pub use process::{ProcSortKey, ProcessQuery};

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::models::HardwareInfo;
use crate::probes::parser::UserResolver;
use crate::probes::{FileSystem, Probes};

/// Clock ticks per second (USER_HZ). Standard value for Linux.
pub(crate) const CLK_TCK: u64 = 100;

/// Cached CPU identity and throttled sensor readings.
#[derive(Debug, Default)]
pub(crate) struct CpuTracker {
    pub model: String,
    pub count: usize,
    pub base_mhz: f64,
    pub identity_cached: bool,

    /// Resolved temperature sensor file, kept to skip rescans.
    pub temp_path: Option<PathBuf>,
    pub temp_value: f64,
    pub temp_read_at: Option<Instant>,

    pub freq_value: f64,
    pub freq_read_at: Option<Instant>,
}

/// Host telemetry engine over a probe bundle.
pub struct Engine<P: Probes> {
    pub(crate) probes: P,
    pub(crate) proc_path: PathBuf,
    pub(crate) sys_path: PathBuf,
    pub(crate) cpu_tracker: Mutex<CpuTracker>,
    pub(crate) hardware_cache: Mutex<Option<HardwareInfo>>,
    pub(crate) users: UserResolver,
}

impl<P: Probes> Engine<P> {
    /// Creates an engine with the default `/proc` and `/sys` roots.
    pub fn new(probes: P) -> Self {
        Self::with_roots(probes, "/proc", "/sys")
    }

    /// Creates an engine with custom pseudo-filesystem roots
    /// (for testing and containers).
    pub fn with_roots(
        probes: P,
        proc_path: impl Into<PathBuf>,
        sys_path: impl Into<PathBuf>,
    ) -> Self {
        let mut users = UserResolver::new();
        if let Ok(passwd) = probes.read_to_string(std::path::Path::new("/etc/passwd")) {
            users.load_from_content(&passwd);
        }

        Self {
            probes,
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
            cpu_tracker: Mutex::new(CpuTracker::default()),
            hardware_cache: Mutex::new(None),
            users,
        }
    }

    /// Numeric entries under the proc root, ascending.
    pub(crate) fn list_pids(&self) -> std::io::Result<Vec<u32>> {
        let entries = self.probes.read_dir(&self.proc_path)?;
        let mut pids: Vec<u32> = entries
            .iter()
            .filter_map(|p| p.file_name()?.to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }
}

/// Per-second rate between two counter readings.
///
/// Counter regressions (device reset, counter wrap) and non-positive
/// windows yield zero, never a negative rate or a spike.
pub(crate) fn rate_between(prev: u64, curr: u64, dt_secs: f64) -> f64 {
    if dt_secs <= 0.0 || curr < prev {
        return 0.0;
    }
    (curr - prev) as f64 / dt_secs
}

/// Current wall clock as Unix milliseconds.
pub(crate) fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::MockProbes;

    #[test]
    fn list_pids_filters_non_numeric() {
        let engine = Engine::new(MockProbes::typical_system());
        let pids = engine.list_pids().unwrap();
        assert_eq!(pids, vec![1, 1234, 4242]);
    }

    #[test]
    fn users_loaded_from_passwd() {
        let engine = Engine::new(MockProbes::typical_system());
        assert_eq!(engine.users.resolve(0), "root");
        assert_eq!(engine.users.resolve(1000), "user");
    }

    #[test]
    fn rate_between_mebibyte_over_one_second() {
        assert!((rate_between(0, 1_048_576, 1.0) - 1_048_576.0).abs() < 0.001);
    }

    #[test]
    fn rate_between_clamps_regressions_to_zero() {
        // Counter went backwards (100 MB down to 50 MB)
        assert_eq!(rate_between(100 * 1024 * 1024, 50 * 1024 * 1024, 1.0), 0.0);
        assert_eq!(rate_between(1000, 2000, 0.0), 0.0);
        assert_eq!(rate_between(1000, 2000, -1.0), 0.0);
        assert_eq!(rate_between(1000, 1000, 1.0), 0.0);
    }

    #[test]
    fn rate_between_fractional_window() {
        assert!((rate_between(0, 1024, 0.5) - 2048.0).abs() < 0.001);
    }
}
