//! In-memory probe doubles for testing samplers without a real `/proc`.
//!
//! `MockFs` simulates a filesystem (files, directories, symlinks) in
//! memory; `MockProbes` bundles it with canned mount usage and canned
//! command output so the whole engine can run inside a unit test.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{CommandRunner, FileSystem, FsUsage, MountUsage};

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
    symlinks: HashMap<PathBuf, PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content. Parent directories are
    /// created automatically.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symlink (used for PCI `driver` links).
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.symlinks
            .insert(path, target.as_ref().to_path_buf());
    }

    /// Adds a process with its typical `/proc/[pid]/` files.
    pub fn add_process(&mut self, pid: u32, stat: &str, status: &str, cmdline: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
        self.add_file(base.join("cmdline"), cmdline);
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();
        for file_path in self.files.keys().chain(self.symlinks.keys()) {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }
        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        let mut entries: Vec<PathBuf> = entries.into_iter().collect();
        entries.sort();
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.symlinks.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("symlink not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.directories.contains(path)
            || self.symlinks.contains_key(path)
    }
}

/// Full probe bundle for tests: mock filesystem, canned mount usage,
/// canned command output.
#[derive(Debug, Clone, Default)]
pub struct MockProbes {
    pub fs: MockFs,
    usages: HashMap<PathBuf, FsUsage>,
    commands: HashMap<String, String>,
}

impl MockProbes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_usage(&mut self, path: impl AsRef<Path>, usage: FsUsage) {
        self.usages.insert(path.as_ref().to_path_buf(), usage);
    }

    /// Registers canned stdout for a program name.
    pub fn add_command(&mut self, program: impl Into<String>, output: impl Into<String>) {
        self.commands.insert(program.into(), output.into());
    }

    /// Builds a plausible two-core Linux machine: three processes, one
    /// SATA disk and one NVMe disk, two interesting network interfaces,
    /// coretemp hwmon, DMI identity, and one Intel iGPU.
    pub fn typical_system() -> Self {
        let mut probes = Self::new();
        let fs = &mut probes.fs;

        fs.add_file(
            "/proc/stat",
            "cpu  10000 500 3000 80000 1000 200 100 50 0 0\n\
             cpu0 5000 250 1500 40000 500 100 50 25 0 0\n\
             cpu1 5000 250 1500 40000 500 100 50 25 0 0\n\
             ctxt 500000\n\
             btime 1700000000\n\
             processes 10000\n\
             procs_running 2\n\
             procs_blocked 0\n",
        );
        fs.add_file(
            "/proc/cpuinfo",
            "processor\t: 0\n\
             model name\t: Intel(R) Core(TM) i7-9750H CPU @ 2.60GHz\n\
             cpu MHz\t\t: 2600.000\n\
             \n\
             processor\t: 1\n\
             model name\t: Intel(R) Core(TM) i7-9750H CPU @ 2.60GHz\n\
             cpu MHz\t\t: 2600.000\n",
        );
        fs.add_file(
            "/proc/meminfo",
            "MemTotal:       16384000 kB\n\
             MemFree:         8192000 kB\n\
             MemAvailable:   12000000 kB\n\
             Buffers:          512000 kB\n\
             Cached:          2048000 kB\n\
             SwapTotal:       4096000 kB\n\
             SwapFree:        4096000 kB\n\
             Shmem:            128000 kB\n\
             SReclaimable:     256000 kB\n",
        );
        fs.add_file("/proc/loadavg", "0.52 0.58 0.59 2/1250 43210\n");
        fs.add_file("/proc/uptime", "86400.50 170000.00\n");
        fs.add_file(
            "/proc/diskstats",
            "   8       0 sda 1234 0 204800 100 5678 0 409600 200 0 150 300 0 0 0 0\n\
               8       1 sda1 1000 0 200000 80 5000 0 400000 180 0 130 260 0 0 0 0\n\
             259       0 nvme0n1 9999 0 2048000 500 8888 0 4096000 400 0 1000 2000 0 0 0 0\n\
               7       0 loop0 10 0 80 1 0 0 0 0 0 1 1 0 0 0 0\n",
        );
        fs.add_file(
            "/proc/mounts",
            "/dev/nvme0n1p2 / ext4 rw,relatime 0 0\n\
             /dev/sda1 /data ext4 rw,relatime 0 0\n\
             proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0\n\
             sysfs /sys/fs sysfs rw 0 0\n\
             tmpfs /run tmpfs rw,nosuid,nodev 0 0\n\
             cgroup2 /sys/fs/cgroup cgroup2 rw 0 0\n",
        );
        fs.add_file(
            "/proc/net/dev",
            "Inter-|   Receive                                                |  Transmit\n\
             face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n\
                lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0\n\
              eth0: 9876543     5678    0    0    0     0          0         0 87654321     4321    0    0    0     0       0          0\n\
             wlan0: 5000000     3000    0    0    0     0          0         0  2500000     1500    0    0    0     0       0          0\n\
             docker0: 100     10    0    0    0     0          0         0  100     10    0    0    0     0       0          0\n",
        );

        fs.add_process(
            1,
            "1 (systemd) S 0 1 1 0 -1 4194560 100 0 0 0 200 100 0 0 20 0 1 0 10 25000000 2000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "Name:\tsystemd\nPid:\t1\nPPid:\t0\nUid:\t0\t0\t0\t0\nVmRSS:\t   12000 kB\n",
            "/sbin/init\0splash\0",
        );
        fs.add_process(
            1234,
            "1234 (bash) S 1 1234 1234 0 -1 4194304 5000 0 0 0 100 50 0 0 20 0 1 0 100000 25000000 2000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "Name:\tbash\nPid:\t1234\nPPid:\t1\nUid:\t1000\t1000\t1000\t1000\nVmRSS:\t    8000 kB\n",
            "/bin/bash\0--login\0",
        );
        // Large process: RSS above the PSS escalation cutoff.
        fs.add_process(
            4242,
            "4242 (firefox) S 1 4242 4242 0 -1 4194304 100000 0 500 0 5000 1000 0 0 20 0 64 0 500000 2000000000 51200 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "Name:\tfirefox\nPid:\t4242\nPPid:\t1\nUid:\t1000\t1000\t1000\t1000\nVmRSS:\t  204800 kB\n",
            "/usr/lib/firefox/firefox\0",
        );
        fs.add_file(
            "/proc/4242/smaps_rollup",
            "Rss:              204800 kB\n\
             Pss:               80000 kB\n\
             Pss_Dirty:         49152 kB\n\
             Shared_Clean:      60000 kB\n",
        );

        fs.add_file(
            "/etc/passwd",
            "root:x:0:0:root:/root:/bin/bash\nuser:x:1000:1000:User:/home/user:/bin/bash\n",
        );
        fs.add_file(
            "/etc/os-release",
            "NAME=\"Arch Linux\"\nPRETTY_NAME=\"Arch Linux\"\nID=arch\n",
        );
        fs.add_file("/proc/sys/kernel/osrelease", "6.6.30-lts\n");
        fs.add_file("/proc/sys/kernel/hostname", "workstation\n");

        // CPU temperature sensor
        fs.add_file("/sys/class/hwmon/hwmon0/name", "coretemp\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "45000\n");
        // A sensor that must never be picked for the CPU
        fs.add_file("/sys/class/hwmon/hwmon1/name", "nvme\n");
        fs.add_file("/sys/class/hwmon/hwmon1/temp1_input", "38000\n");

        // DMI identity
        fs.add_file("/sys/class/dmi/id/board_vendor", "ASUSTeK COMPUTER INC.\n");
        fs.add_file("/sys/class/dmi/id/board_name", "PRIME X570-PRO\n");
        fs.add_file("/sys/class/dmi/id/bios_version", "4021\n");
        fs.add_file("/sys/class/dmi/id/bios_date", "08/09/2021\n");

        // One Intel iGPU on the PCI bus
        let gpu = "/sys/bus/pci/devices/0000:00:02.0";
        fs.add_file(format!("{}/class", gpu), "0x030000\n");
        fs.add_file(format!("{}/vendor", gpu), "0x8086\n");
        fs.add_file(format!("{}/device", gpu), "0x3e9b\n");
        fs.add_symlink(
            format!("{}/driver", gpu),
            "../../../bus/pci/drivers/i915",
        );
        // A non-display device that must be skipped
        let nic = "/sys/bus/pci/devices/0000:00:1f.6";
        fs.add_file(format!("{}/class", nic), "0x020000\n");
        fs.add_file(format!("{}/vendor", nic), "0x8086\n");
        fs.add_file(format!("{}/device", nic), "0x15bb\n");

        // DRM card backing the iGPU, with its own hwmon
        fs.add_file("/sys/class/drm/card0/device/vendor", "0x8086\n");
        fs.add_file("/sys/class/drm/card0/device/device", "0x3e9b\n");
        fs.add_symlink(
            "/sys/class/drm/card0/device/driver",
            "../../../bus/pci/drivers/i915",
        );
        fs.add_file(
            "/sys/class/drm/card0/device/hwmon/hwmon3/temp1_input",
            "52000\n",
        );

        probes.add_usage(
            "/",
            FsUsage {
                total: 500 * 1024 * 1024 * 1024,
                used: 200 * 1024 * 1024 * 1024,
                available: 300 * 1024 * 1024 * 1024,
            },
        );
        probes.add_usage(
            "/data",
            FsUsage {
                total: 1024 * 1024 * 1024 * 1024,
                used: 512 * 1024 * 1024 * 1024,
                available: 512 * 1024 * 1024 * 1024,
            },
        );

        probes
    }
}

impl FileSystem for MockProbes {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.fs.read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.fs.read_dir(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.fs.read_link(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.fs.exists(path)
    }
}

impl MountUsage for MockProbes {
    fn usage(&self, path: &Path) -> io::Result<FsUsage> {
        self.usages.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no usage registered for {:?}", path),
            )
        })
    }
}

impl CommandRunner for MockProbes {
    fn run(&self, program: &str, _args: &[&str], _timeout: Duration) -> io::Result<String> {
        self.commands.get(program).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no command registered for {:?}", program),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc")));
        assert_eq!(
            fs.read_to_string(Path::new("/proc/meminfo")).unwrap(),
            "MemTotal: 16384 kB\n"
        );
    }

    #[test]
    fn mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/stat", "stat content");
        fs.add_file("/proc/1/status", "status content");
        fs.add_file("/proc/2/stat", "stat content 2");

        let proc_entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(proc_entries.len(), 2); // /proc/1 and /proc/2

        let proc1_entries = fs.read_dir(Path::new("/proc/1")).unwrap();
        assert_eq!(proc1_entries.len(), 2);
    }

    #[test]
    fn mock_fs_symlink() {
        let mut fs = MockFs::new();
        fs.add_symlink("/sys/bus/pci/devices/0000:00:02.0/driver", "../drivers/i915");

        let target = fs
            .read_link(Path::new("/sys/bus/pci/devices/0000:00:02.0/driver"))
            .unwrap();
        assert_eq!(target, PathBuf::from("../drivers/i915"));
        assert!(fs.read_link(Path::new("/nope")).is_err());
    }

    #[test]
    fn mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn mock_usage_and_commands() {
        let mut probes = MockProbes::new();
        probes.add_usage(
            "/",
            FsUsage {
                total: 100,
                used: 40,
                available: 60,
            },
        );
        probes.add_command("nvidia-smi", "65\n");

        assert_eq!(probes.usage(Path::new("/")).unwrap().used, 40);
        assert!(probes.usage(Path::new("/boot")).is_err());
        assert_eq!(
            probes
                .run("nvidia-smi", &[], Duration::from_secs(2))
                .unwrap(),
            "65\n"
        );
        assert!(probes.run("rocm-smi", &[], Duration::from_secs(2)).is_err());
    }

    #[test]
    fn typical_system_has_core_files() {
        let probes = MockProbes::typical_system();
        assert!(probes.exists(Path::new("/proc/stat")));
        assert!(probes.exists(Path::new("/proc/meminfo")));
        assert!(probes.exists(Path::new("/proc/1234/stat")));
        assert!(probes.exists(Path::new("/sys/class/hwmon/hwmon0/name")));
    }
}
