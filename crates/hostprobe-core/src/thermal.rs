//! Shared hwmon / thermal_zone reading.
//!
//! Both the CPU and GPU samplers resolve temperatures through this module.
//! Lookups are strictly name-scoped: hwmon entries are matched by exact
//! driver name and thermal zones by type. There is deliberately no
//! "read every sensor" path; enumerating arbitrary hwmon devices powers
//! up discrete GPUs that are in runtime suspend.

use std::path::{Path, PathBuf};

use crate::probes::FileSystem;

/// Reads a millidegree sensor file and converts to degrees Celsius.
pub fn read_millidegrees<F: FileSystem>(fs: &F, path: &Path) -> Option<f64> {
    let content = fs.read_to_string(path).ok()?;
    let raw: i64 = content.trim().parse().ok()?;
    Some(raw as f64 / 1000.0)
}

/// Scans `<sys>/class/hwmon` for an entry whose `name` exactly matches one
/// of `names` and reads its `temp1_input`.
///
/// Returns the temperature and the sensor path so callers can cache it and
/// skip the scan next time.
pub fn hwmon_temp_by_names<F: FileSystem>(
    fs: &F,
    sys_path: &Path,
    names: &[&str],
) -> Option<(f64, PathBuf)> {
    let hwmon_root = sys_path.join("class/hwmon");
    let entries = fs.read_dir(&hwmon_root).ok()?;

    for entry in entries {
        let Ok(name) = fs.read_to_string(&entry.join("name")) else {
            continue;
        };
        let name = name.trim();
        if !names.contains(&name) {
            continue;
        }

        let temp_path = entry.join("temp1_input");
        if let Some(temp) = read_millidegrees(fs, &temp_path) {
            return Some((temp, temp_path));
        }
    }

    None
}

/// Scans `<sys>/class/thermal/thermal_zone*` entries of type `acpitz` and
/// returns the highest temperature inside `[min_c, max_c]` with its path.
///
/// The window rejects the bogus constants some firmwares report (-273, 0,
/// 255) while keeping anything a motherboard sensor could plausibly read.
pub fn max_acpitz_temp<F: FileSystem>(
    fs: &F,
    sys_path: &Path,
    min_c: f64,
    max_c: f64,
) -> Option<(f64, PathBuf)> {
    let thermal_root = sys_path.join("class/thermal");
    let entries = fs.read_dir(&thermal_root).ok()?;

    let mut best: Option<(f64, PathBuf)> = None;
    for entry in entries {
        let is_zone = entry
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("thermal_zone"));
        if !is_zone {
            continue;
        }

        let Ok(zone_type) = fs.read_to_string(&entry.join("type")) else {
            continue;
        };
        if zone_type.trim() != "acpitz" {
            continue;
        }

        let temp_path = entry.join("temp");
        let Some(temp) = read_millidegrees(fs, &temp_path) else {
            continue;
        };
        if temp < min_c || temp > max_c {
            continue;
        }
        if best.as_ref().is_none_or(|(t, _)| temp > *t) {
            best = Some((temp, temp_path));
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::MockFs;

    fn sys() -> &'static Path {
        Path::new("/sys")
    }

    #[test]
    fn hwmon_exact_name_match() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/hwmon/hwmon0/name", "nvme\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "38000\n");
        fs.add_file("/sys/class/hwmon/hwmon1/name", "k10temp\n");
        fs.add_file("/sys/class/hwmon/hwmon1/temp1_input", "55500\n");

        let (temp, path) =
            hwmon_temp_by_names(&fs, sys(), &["coretemp", "k10temp", "k8temp"]).unwrap();
        assert!((temp - 55.5).abs() < 0.001);
        assert_eq!(path, PathBuf::from("/sys/class/hwmon/hwmon1/temp1_input"));
    }

    #[test]
    fn hwmon_substring_is_not_a_match() {
        let mut fs = MockFs::new();
        // "coretemp2" must not match "coretemp"
        fs.add_file("/sys/class/hwmon/hwmon0/name", "coretemp2\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "40000\n");

        assert!(hwmon_temp_by_names(&fs, sys(), &["coretemp"]).is_none());
    }

    #[test]
    fn hwmon_missing_root_is_none() {
        let fs = MockFs::new();
        assert!(hwmon_temp_by_names(&fs, sys(), &["coretemp"]).is_none());
    }

    #[test]
    fn acpitz_picks_highest_in_window() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/thermal/thermal_zone0/type", "acpitz\n");
        fs.add_file("/sys/class/thermal/thermal_zone0/temp", "42000\n");
        fs.add_file("/sys/class/thermal/thermal_zone1/type", "acpitz\n");
        fs.add_file("/sys/class/thermal/thermal_zone1/temp", "61000\n");
        // Not acpitz, even hotter
        fs.add_file("/sys/class/thermal/thermal_zone2/type", "x86_pkg_temp\n");
        fs.add_file("/sys/class/thermal/thermal_zone2/temp", "75000\n");

        let (temp, path) = max_acpitz_temp(&fs, sys(), 20.0, 100.0).unwrap();
        assert!((temp - 61.0).abs() < 0.001);
        assert_eq!(path, PathBuf::from("/sys/class/thermal/thermal_zone1/temp"));
    }

    #[test]
    fn acpitz_window_rejects_outliers() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/thermal/thermal_zone0/type", "acpitz\n");
        fs.add_file("/sys/class/thermal/thermal_zone0/temp", "255000\n");
        fs.add_file("/sys/class/thermal/thermal_zone1/type", "acpitz\n");
        fs.add_file("/sys/class/thermal/thermal_zone1/temp", "5000\n");

        assert!(max_acpitz_temp(&fs, sys(), 20.0, 100.0).is_none());
    }
}
