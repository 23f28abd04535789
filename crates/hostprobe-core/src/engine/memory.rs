//! Memory sampler.

use crate::models::MemorySnapshot;
use crate::probes::parser::{parse_arcstats, parse_meminfo};
use crate::probes::{FileSystem, ProbeError, Probes};

use super::Engine;

impl<P: Probes> Engine<P> {
    /// Computes one consistent view of system memory, in KiB.
    ///
    /// The kernel's `Cached` counter folds in `SReclaimable`; it is
    /// subtracted back out so `cached_kb` means page cache proper. On ZFS
    /// hosts the ARC behaves like page cache but is accounted as anonymous
    /// memory, so its size is added to `cached_kb` and its shrinkable part
    /// (`size − c_min`) to `available_kb`.
    pub fn memory(&self) -> Result<MemorySnapshot, ProbeError> {
        let meminfo = parse_meminfo(
            &self
                .probes
                .read_to_string(&self.proc_path.join("meminfo"))?,
        )?;

        let mut cached = meminfo.cached.saturating_sub(meminfo.sreclaimable);
        let mut available = meminfo.available;

        // ZFS ARC, bytes in arcstats
        let arc = self
            .probes
            .read_to_string(&self.proc_path.join("spl/kstat/zfs/arcstats"))
            .map(|content| parse_arcstats(&content))
            .unwrap_or_default();
        let arc_size_kb = arc.size / 1024;
        let arc_min_kb = arc.c_min / 1024;
        cached += arc_size_kb;
        available += arc_size_kb.saturating_sub(arc_min_kb);

        let used_diff = meminfo.free + cached + meminfo.sreclaimable + meminfo.buffers;
        let used = if meminfo.total >= used_diff {
            meminfo.total - used_diff + meminfo.shared
        } else {
            meminfo.total - meminfo.free
        };

        let used_percent = if meminfo.total > 0 {
            used as f64 / meminfo.total as f64 * 100.0
        } else {
            0.0
        };

        Ok(MemorySnapshot {
            total_kb: meminfo.total,
            used_kb: used,
            used_percent,
            free_kb: meminfo.free,
            available_kb: available,
            buffers_kb: meminfo.buffers,
            cached_kb: cached,
            sreclaimable_kb: meminfo.sreclaimable,
            shared_kb: meminfo.shared,
            swap_total_kb: meminfo.swap_total,
            swap_free_kb: meminfo.swap_free,
            zfs_arc_size_kb: arc_size_kb,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::MockProbes;

    #[test]
    fn composition_from_typical_meminfo() {
        let engine = Engine::new(MockProbes::typical_system());
        let mem = engine.memory().unwrap();

        assert_eq!(mem.total_kb, 16384000);
        assert_eq!(mem.free_kb, 8192000);
        assert_eq!(mem.buffers_kb, 512000);
        // Cached excludes SReclaimable: 2048000 - 256000
        assert_eq!(mem.cached_kb, 1792000);
        assert_eq!(mem.sreclaimable_kb, 256000);
        assert_eq!(mem.shared_kb, 128000);
        // total - (free + cached + sreclaimable + buffers) + shared
        let expected_used = 16384000 - (8192000 + 1792000 + 256000 + 512000) + 128000;
        assert_eq!(mem.used_kb, expected_used);
        assert!(mem.used_kb <= mem.total_kb);
        let expected_pct = expected_used as f64 / 16384000.0 * 100.0;
        assert!((mem.used_percent - expected_pct).abs() < 0.001);
        assert_eq!(mem.zfs_arc_size_kb, 0);
    }

    #[test]
    fn zfs_arc_folds_into_cached_and_available() {
        let mut probes = MockProbes::typical_system();
        // size 2 GiB, c_min 1 GiB (bytes)
        probes.fs.add_file(
            "/proc/spl/kstat/zfs/arcstats",
            "name type data\nsize 4 2147483648\nc_min 4 1073741824\n",
        );
        let engine = Engine::new(probes);
        let mem = engine.memory().unwrap();

        let arc_kb = 2147483648 / 1024;
        let freeable_kb = (2147483648u64 - 1073741824) / 1024;
        assert_eq!(mem.zfs_arc_size_kb, arc_kb);
        assert_eq!(mem.cached_kb, 1792000 + arc_kb);
        assert_eq!(mem.available_kb, 12000000 + freeable_kb);
    }

    #[test]
    fn swap_passthrough() {
        let engine = Engine::new(MockProbes::typical_system());
        let mem = engine.memory().unwrap();
        assert_eq!(mem.swap_total_kb, 4096000);
        assert_eq!(mem.swap_free_kb, 4096000);
    }

    #[test]
    fn missing_meminfo_is_an_error() {
        let engine = Engine::new(MockProbes::new());
        assert!(engine.memory().is_err());
    }
}
