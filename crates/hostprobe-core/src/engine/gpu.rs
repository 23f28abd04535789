//! GPU sampler: PCI display-class enumeration, vendor resolution,
//! temperature without waking sleeping cards.

use std::path::Path;
use std::time::Duration;

use crate::models::{Gpu, GpuTemp};
use crate::probes::{CommandRunner, FileSystem, ProbeError, Probes};
use crate::thermal;

use super::Engine;

/// Standard search path for the PCI ID database.
const PCI_IDS_PATHS: &[&str] = &[
    "/usr/share/hwdata/pci.ids",
    "/usr/share/misc/pci.ids",
    "/var/lib/pciutils/pci.ids",
];

const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(2);

const VENDOR_PREFIXES: &[&str] = &[
    "NVIDIA Corporation ",
    "NVIDIA ",
    "Advanced Micro Devices, Inc. ",
    "AMD/ATI ",
    "AMD ",
    "ATI ",
    "Intel Corporation ",
    "Intel ",
];

#[derive(Debug, Clone)]
struct PciDisplayDevice {
    vendor_id: String,
    device_id: String,
    driver: String,
    priority: i32,
}

impl PciDisplayDevice {
    fn pci_id(&self) -> String {
        format!("{}:{}", self.vendor_id, self.device_id)
    }
}

fn vendor_from_driver(driver: &str) -> &'static str {
    match driver {
        "nvidia" | "nouveau" => "NVIDIA",
        "amdgpu" | "radeon" => "AMD",
        "i915" | "xe" => "Intel",
        _ => "Unknown",
    }
}

fn infer_vendor(vendor_id: &str, driver: &str) -> String {
    match vendor_id {
        "10de" => "NVIDIA".to_string(),
        "1002" => "AMD".to_string(),
        "8086" => "Intel".to_string(),
        _ => vendor_from_driver(driver).to_string(),
    }
}

/// Discrete NVIDIA > discrete AMD > AMD iGPU > Intel/unknown.
///
/// AMD integrated GPUs sit at device.function `00.x` on their bus; a
/// discrete Radeon shows up elsewhere.
fn gpu_priority(driver: &str, bdf: &str) -> i32 {
    match driver {
        "nvidia" => 3,
        "amdgpu" | "radeon" => {
            let device_func = bdf.split(':').nth(2).unwrap_or("");
            if device_func.starts_with("00.") { 1 } else { 2 }
        }
        _ => 0,
    }
}

/// Looks up a device name in pci.ids content.
///
/// Vendor lines start at column zero with the vendor id; device lines are
/// single-tab-indented `dddd  Name`; double-tab lines are subsystems.
fn find_device_name(content: &str, vendor_id: &str, device_id: &str) -> Option<String> {
    let mut in_vendor = false;

    for line in content.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        if !line.starts_with('\t') {
            in_vendor = line.starts_with(vendor_id);
            continue;
        }
        if !in_vendor || line.starts_with("\t\t") {
            continue;
        }

        let entry = line.trim_start_matches('\t');
        if let Some(rest) = entry.strip_prefix(device_id) {
            let name = rest.trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }

    None
}

/// Prefers the bracketed marketing name over the chip name:
/// `"AD102 [GeForce RTX 4090]"` becomes `"GeForce RTX 4090"`.
fn display_from_db_name(name: &str) -> String {
    if let (Some(open), Some(close)) = (name.rfind('['), name.rfind(']'))
        && close > open
    {
        return name[open + 1..close].trim().to_string();
    }
    name.trim().to_string()
}

fn strip_vendor_prefix(name: &str) -> String {
    let lower = name.to_lowercase();
    for prefix in VENDOR_PREFIXES {
        if lower.starts_with(&prefix.to_lowercase()) {
            return name[prefix.len()..].trim().to_string();
        }
    }
    name.trim().to_string()
}

fn build_full_name(vendor: &str, display_name: &str) -> String {
    if display_name == "Unknown" || vendor == "Unknown" {
        return display_name.to_string();
    }
    format!("{} {}", vendor, display_name)
}

impl<P: Probes> Engine<P> {
    /// Walks the PCI tree and keeps class `0x03*` (display controllers).
    fn pci_display_devices(&self) -> Vec<PciDisplayDevice> {
        let pci_root = self.sys_path.join("bus/pci/devices");
        let Ok(entries) = self.probes.read_dir(&pci_root) else {
            return Vec::new();
        };

        let mut devices = Vec::new();
        for entry in entries {
            let Ok(class) = self.probes.read_to_string(&entry.join("class")) else {
                continue;
            };
            if !class.trim().starts_with("0x03") {
                continue;
            }

            let read_id = |name: &str| -> Option<String> {
                let raw = self.probes.read_to_string(&entry.join(name)).ok()?;
                Some(raw.trim().trim_start_matches("0x").to_string())
            };
            let (Some(vendor_id), Some(device_id)) = (read_id("vendor"), read_id("device")) else {
                continue;
            };

            let bdf = entry
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let driver = self
                .probes
                .read_link(&entry.join("driver"))
                .ok()
                .and_then(|t| t.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_default();

            let priority = gpu_priority(&driver, &bdf);
            devices.push(PciDisplayDevice {
                vendor_id,
                device_id,
                driver,
                priority,
            });
        }

        devices.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.driver.cmp(&b.driver))
        });
        devices
    }

    fn lookup_pci_name(&self, vendor_id: &str, device_id: &str) -> String {
        for db_path in PCI_IDS_PATHS {
            let Ok(content) = self.probes.read_to_string(Path::new(db_path)) else {
                continue;
            };
            if let Some(name) = find_device_name(&content, vendor_id, device_id) {
                return name;
            }
            break; // one database is authoritative; a miss there is final
        }
        format!("GPU {}:{}", vendor_id, device_id)
    }

    /// Enumerates GPUs in priority order. No display-class devices is an
    /// empty list, not an error.
    pub fn gpus(&self) -> Result<Vec<Gpu>, ProbeError> {
        let gpus = self
            .pci_display_devices()
            .into_iter()
            .map(|dev| {
                let db_name = self.lookup_pci_name(&dev.vendor_id, &dev.device_id);
                let vendor = infer_vendor(&dev.vendor_id, &dev.driver);
                let display_name = strip_vendor_prefix(&display_from_db_name(&db_name));
                let full_name = build_full_name(&vendor, &display_name);
                Gpu {
                    driver: dev.driver.clone(),
                    vendor,
                    display_name,
                    full_name,
                    pci_id: dev.pci_id(),
                    temperature_c: 0.0,
                    hwmon_name: "unknown".to_string(),
                }
            })
            .collect();
        Ok(gpus)
    }

    /// Enumerates GPUs and fills in temperature for the requested PCI ids.
    pub fn gpus_with_temp(&self, pci_ids: &[String]) -> Result<Vec<Gpu>, ProbeError> {
        let mut gpus = self.gpus()?;
        if pci_ids.is_empty() {
            return Ok(gpus);
        }

        for gpu in &mut gpus {
            if !pci_ids.iter().any(|id| *id == gpu.pci_id) {
                continue;
            }
            if let Ok(temp) = self.gpu_temp(&gpu.pci_id) {
                gpu.temperature_c = temp.temperature_c;
                gpu.hwmon_name = temp.hwmon;
            }
        }
        Ok(gpus)
    }

    /// Temperature for one GPU addressed by `vvvv:dddd`.
    ///
    /// NVIDIA goes through the vendor tool (narrow query, hard timeout);
    /// everything else reads the hwmon under the matching DRM card only.
    /// Enumerating hwmon broadly is off the table: it powers up discrete
    /// GPUs that are in runtime suspend.
    pub fn gpu_temp(&self, pci_id: &str) -> Result<GpuTemp, ProbeError> {
        let devices = self.pci_display_devices();
        let target = devices
            .iter()
            .find(|d| d.pci_id() == pci_id)
            .ok_or_else(|| ProbeError::Missing(format!("GPU with PCI ID {}", pci_id)))?;

        let (temperature_c, hwmon) = if target.driver == "nvidia" {
            self.nvidia_temperature()
        } else {
            self.drm_hwmon_temperature(pci_id)
                .or_else(|| {
                    thermal::max_acpitz_temp(&self.probes, &self.sys_path, 20.0, 90.0)
                        .map(|(t, _)| (t, "acpitz".to_string()))
                })
                .unwrap_or((0.0, "unknown".to_string()))
        };

        Ok(GpuTemp {
            driver: target.driver.clone(),
            hwmon,
            temperature_c,
        })
    }

    fn nvidia_temperature(&self) -> (f64, String) {
        let output = self.probes.run(
            "nvidia-smi",
            &["--query-gpu=temperature.gpu", "--format=csv,noheader,nounits"],
            NVIDIA_SMI_TIMEOUT,
        );
        match output {
            Ok(out) => {
                let first = out.lines().next().unwrap_or("").trim();
                match first.parse::<f64>() {
                    Ok(temp) => (temp, "nvidia".to_string()),
                    Err(_) => (0.0, "unknown".to_string()),
                }
            }
            Err(_) => (0.0, "unknown".to_string()),
        }
    }

    /// Reads `hwmon*/temp1_input` under the DRM card whose vendor:device
    /// matches, and only that card.
    fn drm_hwmon_temperature(&self, pci_id: &str) -> Option<(f64, String)> {
        let drm_root = self.sys_path.join("class/drm");
        let cards = self.probes.read_dir(&drm_root).ok()?;

        for card in cards {
            let name = card.file_name()?.to_str()?;
            if !name.starts_with("card") || name.contains('-') {
                continue; // card0-HDMI-A-1 and friends are connectors
            }
            let device = card.join("device");

            let read_id = |file: &str| -> Option<String> {
                let raw = self.probes.read_to_string(&device.join(file)).ok()?;
                Some(raw.trim().trim_start_matches("0x").to_string())
            };
            let (Some(vendor_id), Some(device_id)) = (read_id("vendor"), read_id("device")) else {
                continue;
            };
            if format!("{}:{}", vendor_id, device_id) != pci_id {
                continue;
            }
            if !self.probes.exists(&device.join("driver")) {
                continue;
            }

            let hwmon_root = device.join("hwmon");
            let hwmons = self.probes.read_dir(&hwmon_root).ok()?;
            for hwmon in hwmons {
                let temp_path = hwmon.join("temp1_input");
                if let Some(temp) = thermal::read_millidegrees(&self.probes, &temp_path) {
                    let hwmon_name = hwmon
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    return Some((temp, hwmon_name));
                }
            }
        }

        None
    }
}
