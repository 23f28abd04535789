//! Disk sampler: physical-device I/O totals and rates, mount listing.

use std::collections::HashMap;
use std::path::Path;

use crate::cursor;
use crate::fmt::format_size;
use crate::models::{
    DiskCounters, DiskDeviceRate, DiskIoTotals, DiskMount, DiskRateCursor, DiskRateSnapshot,
};
use crate::probes::parser::{DiskStats, parse_diskstats, parse_mounts};
use crate::probes::{FileSystem, MountUsage, ProbeError, Probes};

use super::{Engine, now_unix_ms, rate_between};

const SECTOR_SIZE: u64 = 512;

/// Physical block device prefixes. Partitions share the prefix and are
/// kept; loop/ram/zram devices are not.
const DEVICE_PREFIXES: &[&str] = &["sd", "nvme", "vd", "dm-", "mmcblk"];

/// Filesystem types that never correspond to a physical mount.
const VIRTUAL_FSTYPES: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "sysfs",
    "proc",
    "devpts",
    "cgroup",
    "cgroup2",
    "securityfs",
    "pstore",
    "efivarfs",
    "bpf",
    "autofs",
    "hugetlbfs",
    "mqueue",
    "debugfs",
    "tracefs",
    "fusectl",
    "configfs",
    "ramfs",
    "nsfs",
    "binfmt_misc",
    "fuse.gvfsd-fuse",
    "fuse.portal",
];

fn matches_device(name: &str) -> bool {
    DEVICE_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn is_virtual_fstype(fstype: &str) -> bool {
    VIRTUAL_FSTYPES.contains(&fstype)
}

fn is_virtual_mount(path: &str) -> bool {
    path.starts_with("/proc/") || path.starts_with("/sys/") || path.starts_with("/dev/")
}

impl<P: Probes> Engine<P> {
    fn read_diskstats(&self) -> Result<Vec<DiskStats>, ProbeError> {
        let content = self
            .probes
            .read_to_string(&self.proc_path.join("diskstats"))?;
        Ok(parse_diskstats(&content)
            .into_iter()
            .filter(|d| matches_device(&d.device))
            .collect())
    }

    /// Cumulative read/write byte totals per physical block device.
    pub fn disk_totals(&self) -> Result<Vec<DiskIoTotals>, ProbeError> {
        Ok(self
            .read_diskstats()?
            .into_iter()
            .map(|d| DiskIoTotals {
                device: d.device,
                read_bytes: d.read_sectors * SECTOR_SIZE,
                write_bytes: d.write_sectors * SECTOR_SIZE,
            })
            .collect())
    }

    /// Per-device throughput derived against the prior cursor.
    pub fn disk_rates(&self, cursor_str: Option<&str>) -> Result<DiskRateSnapshot, ProbeError> {
        let disks = self.read_diskstats()?;
        let now_ms = now_unix_ms();
        let prior: DiskRateCursor = cursor_str.map(cursor::decode_or_default).unwrap_or_default();
        let dt = (now_ms - prior.timestamp) as f64 / 1000.0;
        let has_prior = prior.timestamp > 0 && dt > 0.0;

        let mut devices = Vec::with_capacity(disks.len());
        let mut next_counters = HashMap::with_capacity(disks.len());

        for disk in &disks {
            let read_bytes = disk.read_sectors * SECTOR_SIZE;
            let write_bytes = disk.write_sectors * SECTOR_SIZE;

            let (read_rate, write_rate) = match prior.devices.get(&disk.device) {
                Some(prev) if has_prior => (
                    rate_between(prev.read_bytes, read_bytes, dt),
                    rate_between(prev.write_bytes, write_bytes, dt),
                ),
                _ => (0.0, 0.0),
            };

            devices.push(DiskDeviceRate {
                device: disk.device.clone(),
                read_bytes_total: read_bytes,
                write_bytes_total: write_bytes,
                read_rate_bytes_per_sec: read_rate,
                write_rate_bytes_per_sec: write_rate,
            });
            next_counters.insert(
                disk.device.clone(),
                DiskCounters {
                    read_bytes,
                    write_bytes,
                    read_count: disk.reads,
                    write_count: disk.writes,
                    read_time: disk.read_time,
                    write_time: disk.write_time,
                },
            );
        }

        Ok(DiskRateSnapshot {
            devices,
            cursor: cursor::encode(&DiskRateCursor {
                timestamp: now_ms,
                devices: next_counters,
            }),
        })
    }

    /// Mount table with usage, pseudo filesystems excluded.
    ///
    /// A mount whose statvfs fails (stale NFS handle, permissions) is
    /// dropped rather than failing the listing.
    pub fn disk_mounts(&self) -> Result<Vec<DiskMount>, ProbeError> {
        let content = self
            .probes
            .read_to_string(&self.proc_path.join("mounts"))?;

        let mut mounts = Vec::new();
        for entry in parse_mounts(&content) {
            if is_virtual_fstype(&entry.fstype) || is_virtual_mount(&entry.mount_point) {
                continue;
            }
            let Ok(usage) = self.probes.usage(Path::new(&entry.mount_point)) else {
                continue;
            };

            let percent = if usage.total > 0 {
                usage.used as f64 / usage.total as f64 * 100.0
            } else {
                0.0
            };
            mounts.push(DiskMount {
                device: entry.device,
                mount_point: entry.mount_point,
                fstype: entry.fstype,
                size: format_size(usage.total),
                used: format_size(usage.used),
                available: format_size(usage.available),
                percent,
            });
        }

        Ok(mounts)
    }
}
