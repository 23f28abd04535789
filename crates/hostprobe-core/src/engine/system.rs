//! System info sampler: load average, process/thread counts, uptime.

use crate::models::SystemSnapshot;
use crate::probes::parser::{parse_loadavg, parse_stat, parse_uptime};
use crate::probes::{FileSystem, ProbeError, Probes};

use super::Engine;

impl<P: Probes> Engine<P> {
    pub fn system(&self) -> Result<SystemSnapshot, ProbeError> {
        let loadavg = parse_loadavg(
            &self
                .probes
                .read_to_string(&self.proc_path.join("loadavg"))?,
        )?;

        let stat = self
            .probes
            .read_to_string(&self.proc_path.join("stat"))
            .ok()
            .and_then(|c| parse_stat(&c).ok())
            .unwrap_or_default();

        let uptime_secs = self
            .probes
            .read_to_string(&self.proc_path.join("uptime"))
            .ok()
            .and_then(|c| parse_uptime(&c).ok())
            .unwrap_or(0.0) as u64;

        let processes = self.list_pids().map(|p| p.len() as u64).unwrap_or(0);

        Ok(SystemSnapshot {
            load1: loadavg.load1,
            load5: loadavg.load5,
            load15: loadavg.load15,
            running: loadavg.running,
            threads: loadavg.total,
            processes,
            procs_running: stat.procs_running,
            procs_blocked: stat.procs_blocked,
            uptime_secs,
            boot_time: stat.btime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::MockProbes;

    #[test]
    fn system_snapshot_from_typical_files() {
        let engine = Engine::new(MockProbes::typical_system());
        let sys = engine.system().unwrap();

        assert!((sys.load1 - 0.52).abs() < 0.001);
        assert!((sys.load5 - 0.58).abs() < 0.001);
        assert!((sys.load15 - 0.59).abs() < 0.001);
        assert_eq!(sys.running, 2);
        assert_eq!(sys.threads, 1250);
        assert_eq!(sys.processes, 3);
        assert_eq!(sys.procs_running, 2);
        assert_eq!(sys.procs_blocked, 0);
        assert_eq!(sys.uptime_secs, 86400);
        assert_eq!(sys.boot_time, 1700000000);
    }

    #[test]
    fn missing_loadavg_is_an_error() {
        let engine = Engine::new(MockProbes::new());
        assert!(engine.system().is_err());
    }

    #[test]
    fn missing_stat_degrades_to_zero() {
        let mut probes = MockProbes::new();
        probes.fs.add_file("/proc/loadavg", "0.10 0.20 0.30 1/100 500\n");
        probes.fs.add_file("/proc/uptime", "100.00 200.00\n");
        let engine = Engine::new(probes);

        let sys = engine.system().unwrap();
        assert_eq!(sys.boot_time, 0);
        assert_eq!(sys.procs_running, 0);
        assert_eq!(sys.uptime_secs, 100);
    }
}
