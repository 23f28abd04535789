//! CPU sampler: identity, frequency, temperature, cursor-based utilization.

use std::time::Duration;

use crate::cancel::CancelFlag;
use crate::cursor;
use crate::models::{CpuCursor, CpuSnapshot};
use crate::probes::parser::{
    CpuTicks, parse_cpuinfo, parse_cpuinfo_current_mhz, parse_stat,
};
use crate::probes::{FileSystem, ProbeError, Probes};
use crate::thermal;

use super::{CLK_TCK, Engine, now_unix_ms};

/// hwmon driver names that identify the CPU package sensor. Matching is
/// exact: a broad scan would touch GPU sensors and wake sleeping cards.
const CPU_HWMON_NAMES: &[&str] = &["coretemp", "k10temp", "k8temp", "cpu_thermal", "zenpower"];

const FREQ_REFRESH: Duration = Duration::from_secs(2);
const TEMP_REFRESH: Duration = Duration::from_secs(5);

/// Window for the blocking fallback sample when no cursor is usable.
const FALLBACK_SAMPLE: Duration = Duration::from_millis(100);

/// Converts one `/proc/stat` line into seconds, fixed 8-tick order.
fn ticks_to_seconds(t: CpuTicks) -> Vec<f64> {
    let hz = CLK_TCK as f64;
    vec![
        t.user as f64 / hz,
        t.nice as f64 / hz,
        t.system as f64 / hz,
        t.idle as f64 / hz,
        t.iowait as f64 / hz,
        t.irq as f64 / hz,
        t.softirq as f64 / hz,
        t.steal as f64 / hz,
    ]
}

/// Utilization between two 8-tick samples.
///
/// busy = total − idle − iowait. Backwards busy counters yield 0, a stalled
/// total yields 100, everything else is clamped to [0, 100].
pub(crate) fn usage_between(prev: &[f64], curr: &[f64]) -> f64 {
    if prev.len() < 8 || curr.len() < 8 {
        return 0.0;
    }

    let prev_total: f64 = prev[..8].iter().sum();
    let curr_total: f64 = curr[..8].iter().sum();
    let prev_busy = prev_total - prev[3] - prev[4];
    let curr_busy = curr_total - curr[3] - curr[4];

    if curr_busy <= prev_busy {
        return 0.0;
    }
    if curr_total <= prev_total {
        return 100.0;
    }

    ((curr_busy - prev_busy) / (curr_total - prev_total) * 100.0).clamp(0.0, 100.0)
}

impl<P: Probes> Engine<P> {
    /// Produces a CPU snapshot.
    ///
    /// With a usable cursor the utilization covers the client's own window;
    /// without one a short blocking sample keeps the first call non-zero.
    pub fn cpu(&self, cursor_str: Option<&str>, cancel: &CancelFlag) -> Result<CpuSnapshot, ProbeError> {
        let mut snapshot = CpuSnapshot::default();

        let (model, count, _) = self.cpu_identity();
        snapshot.model = model;
        snapshot.count = count;

        {
            let mut tracker = self.cpu_tracker.lock().unwrap();

            let stale_freq = tracker
                .freq_read_at
                .is_none_or(|at| at.elapsed() > FREQ_REFRESH);
            if stale_freq {
                tracker.freq_value = self.read_current_mhz().unwrap_or(tracker.base_mhz);
                tracker.freq_read_at = Some(std::time::Instant::now());
            }
            snapshot.frequency_mhz = if tracker.freq_value > 0.0 {
                tracker.freq_value
            } else {
                tracker.base_mhz
            };

            let stale_temp = tracker
                .temp_read_at
                .is_none_or(|at| at.elapsed() > TEMP_REFRESH);
            if stale_temp {
                // Cached sensor path first; invalidate and rescan on failure.
                let mut temp = None;
                if let Some(path) = tracker.temp_path.clone() {
                    temp = thermal::read_millidegrees(&self.probes, &path);
                    if temp.is_none() {
                        tracker.temp_path = None;
                    }
                }
                if temp.is_none()
                    && let Some((t, path)) =
                        thermal::hwmon_temp_by_names(&self.probes, &self.sys_path, CPU_HWMON_NAMES)
                {
                    tracker.temp_path = Some(path);
                    temp = Some(t);
                }
                if temp.is_none()
                    && let Some((t, path)) =
                        thermal::max_acpitz_temp(&self.probes, &self.sys_path, 20.0, 100.0)
                {
                    tracker.temp_path = Some(path);
                    temp = Some(t);
                }
                tracker.temp_value = temp.unwrap_or(0.0);
                tracker.temp_read_at = Some(std::time::Instant::now());
            }
            snapshot.temperature_c = tracker.temp_value;
        }

        let stat = parse_stat(
            &self
                .probes
                .read_to_string(&self.proc_path.join("stat"))?,
        )?;
        snapshot.total = ticks_to_seconds(stat.total);
        snapshot.cores = stat.cores.iter().map(|c| ticks_to_seconds(*c)).collect();
        if snapshot.count == 0 {
            snapshot.count = snapshot.cores.len();
        }

        let now_ms = now_unix_ms();
        let prior: CpuCursor = cursor_str.map(cursor::decode_or_default).unwrap_or_default();

        if !prior.total.is_empty() && prior.timestamp > 0 && now_ms > prior.timestamp {
            snapshot.usage_percent = usage_between(&prior.total, &snapshot.total);
            snapshot.core_usage_percent = snapshot
                .cores
                .iter()
                .enumerate()
                .map(|(i, core)| {
                    prior
                        .cores
                        .get(i)
                        .map(|p| usage_between(p, core))
                        .unwrap_or(0.0)
                })
                .collect();
        } else if cancel.sleep(FALLBACK_SAMPLE) {
            // First call without delta state: measure over a short window.
            if let Ok(second) = self
                .probes
                .read_to_string(&self.proc_path.join("stat"))
                .map_err(ProbeError::from)
                .and_then(|c| parse_stat(&c).map_err(ProbeError::from))
            {
                let second_total = ticks_to_seconds(second.total);
                snapshot.usage_percent = usage_between(&snapshot.total, &second_total);
                snapshot.core_usage_percent = second
                    .cores
                    .iter()
                    .enumerate()
                    .map(|(i, core)| {
                        snapshot
                            .cores
                            .get(i)
                            .map(|p| usage_between(p, &ticks_to_seconds(*core)))
                            .unwrap_or(0.0)
                    })
                    .collect();
                snapshot.total = second_total;
                snapshot.cores = second.cores.iter().map(|c| ticks_to_seconds(*c)).collect();
            }
        } else {
            snapshot.core_usage_percent = vec![0.0; snapshot.cores.len()];
        }

        if snapshot.core_usage_percent.len() != snapshot.cores.len() {
            snapshot.core_usage_percent.resize(snapshot.cores.len(), 0.0);
        }

        snapshot.cursor = cursor::encode(&CpuCursor {
            total: snapshot.total.clone(),
            cores: snapshot.cores.clone(),
            timestamp: now_ms,
        });

        Ok(snapshot)
    }

    /// Model string, logical core count and base MHz, resolved once per
    /// process lifetime.
    pub(crate) fn cpu_identity(&self) -> (String, usize, f64) {
        let mut tracker = self.cpu_tracker.lock().unwrap();
        if !tracker.identity_cached {
            let content = self
                .probes
                .read_to_string(&self.proc_path.join("cpuinfo"))
                .unwrap_or_default();
            let identity = parse_cpuinfo(&content);
            tracker.model = identity.model;
            tracker.count = identity.count;
            tracker.base_mhz = identity.base_mhz;
            tracker.identity_cached = true;
        }
        (tracker.model.clone(), tracker.count, tracker.base_mhz)
    }

    fn read_current_mhz(&self) -> Option<f64> {
        if let Ok(content) = self.probes.read_to_string(&self.proc_path.join("cpuinfo"))
            && let Some(mhz) = parse_cpuinfo_current_mhz(&content)
        {
            return Some(mhz);
        }

        // cpufreq exposes kHz
        let scaling = self
            .sys_path
            .join("devices/system/cpu/cpu0/cpufreq/scaling_cur_freq");
        let khz: f64 = self
            .probes
            .read_to_string(&scaling)
            .ok()?
            .trim()
            .parse()
            .ok()?;
        Some(khz / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::MockProbes;

    #[test]
    fn usage_between_synthetic_ticks() {
        let prev = [1000.0, 0.0, 500.0, 8500.0, 0.0, 0.0, 0.0, 0.0];
        let curr = [2000.0, 0.0, 1000.0, 17000.0, 0.0, 0.0, 0.0, 0.0];
        // busy delta 1500, total delta 10000
        assert!((usage_between(&prev, &curr) - 15.0).abs() < 0.1);
    }

    #[test]
    fn usage_between_backwards_busy_is_zero() {
        let prev = [2000.0, 0.0, 1000.0, 17000.0, 0.0, 0.0, 0.0, 0.0];
        let curr = [1000.0, 0.0, 500.0, 18000.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(usage_between(&prev, &curr), 0.0);
    }

    #[test]
    fn usage_between_stalled_total_is_hundred() {
        let prev = [1000.0, 0.0, 500.0, 8500.0, 0.0, 0.0, 0.0, 0.0];
        let curr = [1100.0, 0.0, 500.0, 8300.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(usage_between(&prev, &curr), 100.0);
    }

    #[test]
    fn usage_between_short_slices_are_zero() {
        assert_eq!(usage_between(&[1.0, 2.0], &[3.0, 4.0]), 0.0);
        assert_eq!(usage_between(&[], &[]), 0.0);
    }

    #[test]
    fn snapshot_identity_and_sensors() {
        let engine = Engine::new(MockProbes::typical_system());
        let snap = engine.cpu(None, &CancelFlag::new()).unwrap();

        assert_eq!(snap.count, 2);
        assert_eq!(snap.model, "Intel(R) Core(TM) i7-9750H CPU @ 2.60GHz");
        assert!((snap.frequency_mhz - 2600.0).abs() < 0.001);
        assert!((snap.temperature_c - 45.0).abs() < 0.001);
        assert_eq!(snap.total.len(), 8);
        assert_eq!(snap.cores.len(), 2);
        assert_eq!(snap.core_usage_percent.len(), snap.count);
        assert!(!snap.cursor.is_empty());
    }

    #[test]
    fn cursor_driven_usage() {
        let engine = Engine::new(MockProbes::typical_system());

        let prior = crate::cursor::encode(&CpuCursor {
            total: vec![0.0; 8],
            cores: vec![vec![0.0; 8], vec![0.0; 8]],
            timestamp: now_unix_ms() - 1000,
        });
        let snap = engine.cpu(Some(&prior), &CancelFlag::new()).unwrap();

        // Mock counters are all non-zero, so a zero baseline gives busy > 0.
        assert!(snap.usage_percent > 0.0);
        assert!(snap.usage_percent <= 100.0);
        assert_eq!(snap.core_usage_percent.len(), 2);
        for pct in &snap.core_usage_percent {
            assert!((0.0..=100.0).contains(pct));
        }
    }

    #[test]
    fn corrupt_cursor_falls_back_without_panic() {
        let engine = Engine::new(MockProbes::typical_system());
        let cancel = CancelFlag::new();
        cancel.cancel(); // skip the fallback sleep

        let snap = engine.cpu(Some("!!corrupt!!"), &cancel).unwrap();
        assert_eq!(snap.usage_percent, 0.0);
        assert!(!snap.cursor.is_empty());
    }

    #[test]
    fn fallback_sample_when_no_cursor() {
        let engine = Engine::new(MockProbes::typical_system());
        let snap = engine.cpu(None, &CancelFlag::new()).unwrap();
        // Static mock counters: the short window sees no movement.
        assert_eq!(snap.usage_percent, 0.0);
        assert_eq!(snap.core_usage_percent.len(), 2);
    }

    #[test]
    fn identity_is_cached_across_calls() {
        let engine = Engine::new(MockProbes::typical_system());
        let first = engine.cpu(None, &CancelFlag::new()).unwrap();
        let second = engine.cpu(None, &CancelFlag::new()).unwrap();
        assert_eq!(first.model, second.model);
        assert_eq!(first.count, second.count);
    }
}
