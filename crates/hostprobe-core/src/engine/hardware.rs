//! Hardware identity sampler: DMI board/BIOS fields, distro, host identity.

use std::path::{Path, PathBuf};

use crate::models::{BiosInfo, CpuIdentity, HardwareInfo};
use crate::probes::parser::parse_os_release_pretty_name;
use crate::probes::{FileSystem, ProbeError, Probes};

use super::Engine;

const UNKNOWN: &str = "Unknown";

impl<P: Probes> Engine<P> {
    /// Static hardware identity, read once and cached for the process
    /// lifetime.
    pub fn hardware(&self) -> Result<HardwareInfo, ProbeError> {
        {
            let cache = self.hardware_cache.lock().unwrap();
            if let Some(info) = cache.as_ref() {
                return Ok(info.clone());
            }
        }

        let (model, count, _) = self.cpu_identity();
        let info = HardwareInfo {
            cpu: CpuIdentity {
                count,
                model: if model.is_empty() {
                    UNKNOWN.to_string()
                } else {
                    model
                },
            },
            bios: self.read_bios(),
            kernel: self.read_trimmed("sys/kernel/osrelease"),
            hostname: self.read_trimmed("sys/kernel/hostname"),
            arch: std::env::consts::ARCH.to_string(),
            distro_pretty_name: self
                .probes
                .read_to_string(Path::new("/etc/os-release"))
                .ok()
                .and_then(|c| parse_os_release_pretty_name(&c))
                .unwrap_or_else(|| UNKNOWN.to_string()),
        };

        *self.hardware_cache.lock().unwrap() = Some(info.clone());
        Ok(info)
    }

    fn read_trimmed(&self, proc_rel: &str) -> String {
        self.probes
            .read_to_string(&self.proc_path.join(proc_rel))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// Firmware identity from DMI. Two exposure points exist depending on
    /// kernel version; fall back between them.
    fn read_bios(&self) -> BiosInfo {
        let primary = self.sys_path.join("class/dmi/id");
        let dmi: PathBuf = if self.probes.exists(&primary) {
            primary
        } else {
            self.sys_path.join("devices/virtual/dmi/id")
        };

        let read_field = |name: &str| -> Option<String> {
            self.probes
                .read_to_string(&dmi.join(name))
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let vendor = read_field("board_vendor").unwrap_or_else(|| UNKNOWN.to_string());
        let board_name = read_field("board_name").unwrap_or_default();

        let motherboard = match (vendor.as_str(), board_name.as_str()) {
            (v, b) if v != UNKNOWN && !b.is_empty() => format!("{} {}", vendor, board_name),
            (_, b) if !b.is_empty() => board_name.clone(),
            _ => UNKNOWN.to_string(),
        };

        BiosInfo {
            vendor,
            motherboard,
            version: read_field("bios_version").unwrap_or_else(|| UNKNOWN.to_string()),
            date: read_field("bios_date").unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::MockProbes;

    #[test]
    fn hardware_from_typical_system() {
        let engine = Engine::new(MockProbes::typical_system());
        let hw = engine.hardware().unwrap();

        assert_eq!(hw.cpu.count, 2);
        assert_eq!(hw.cpu.model, "Intel(R) Core(TM) i7-9750H CPU @ 2.60GHz");
        assert_eq!(hw.bios.vendor, "ASUSTeK COMPUTER INC.");
        assert_eq!(hw.bios.motherboard, "ASUSTeK COMPUTER INC. PRIME X570-PRO");
        assert_eq!(hw.bios.version, "4021");
        assert_eq!(hw.bios.date, "08/09/2021");
        assert_eq!(hw.kernel, "6.6.30-lts");
        assert_eq!(hw.hostname, "workstation");
        assert_eq!(hw.distro_pretty_name, "Arch Linux");
        assert!(!hw.arch.is_empty());
    }

    #[test]
    fn dmi_fallback_location() {
        let mut probes = MockProbes::new();
        let fs = &mut probes.fs;
        // DMI only at the virtual path on this machine.
        fs.add_file("/proc/cpuinfo", "processor\t: 0\nmodel name\t: X\ncpu MHz\t: 1.0\n");
        fs.add_file("/sys/devices/virtual/dmi/id/board_vendor", "Lenovo\n");
        fs.add_file("/sys/devices/virtual/dmi/id/board_name", "20XW\n");
        fs.add_file("/sys/devices/virtual/dmi/id/bios_version", "N32ET75W\n");
        let engine = Engine::new(probes);
        let hw = engine.hardware().unwrap();

        assert_eq!(hw.bios.vendor, "Lenovo");
        assert_eq!(hw.bios.motherboard, "Lenovo 20XW");
        assert_eq!(hw.bios.version, "N32ET75W");
        assert_eq!(hw.bios.date, "");
    }

    #[test]
    fn missing_everything_degrades_to_unknown() {
        let engine = Engine::new(MockProbes::new());
        let hw = engine.hardware().unwrap();

        assert_eq!(hw.cpu.model, "Unknown");
        assert_eq!(hw.bios.vendor, "Unknown");
        assert_eq!(hw.bios.motherboard, "Unknown");
        assert_eq!(hw.distro_pretty_name, "Unknown");
        assert_eq!(hw.kernel, "");
    }

    #[test]
    fn identity_is_cached() {
        let engine = Engine::new(MockProbes::typical_system());
        let first = engine.hardware().unwrap();
        let second = engine.hardware().unwrap();
        assert_eq!(first.hostname, second.hostname);
        assert_eq!(first.bios.motherboard, second.bios.motherboard);
    }
}
