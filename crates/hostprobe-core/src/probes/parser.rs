//! Parsers for pseudo-filesystem files.
//!
//! These are pure functions that parse the content of `/proc` and `/sys`
//! files into structured data. They are designed to be easily testable
//! with string inputs.

use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

// ============ /proc/stat ============

/// One CPU line from `/proc/stat`, in USER_HZ jiffies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

/// Global counters from `/proc/stat`.
#[derive(Debug, Clone, Default)]
pub struct StatInfo {
    /// The aggregate "cpu" line.
    pub total: CpuTicks,
    /// Per-core "cpuN" lines in index order.
    pub cores: Vec<CpuTicks>,
    pub btime: u64,
    pub processes: u64,
    pub procs_running: u32,
    pub procs_blocked: u32,
}

/// Parses `/proc/stat` content.
pub fn parse_stat(content: &str) -> Result<StatInfo, ParseError> {
    let mut info = StatInfo::default();
    let mut saw_total = false;

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        if parts[0].starts_with("cpu") {
            let get_val =
                |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };
            let ticks = CpuTicks {
                user: get_val(1),
                nice: get_val(2),
                system: get_val(3),
                idle: get_val(4),
                iowait: get_val(5),
                irq: get_val(6),
                softirq: get_val(7),
                steal: get_val(8),
            };
            if parts[0] == "cpu" {
                info.total = ticks;
                saw_total = true;
            } else {
                info.cores.push(ticks);
            }
        } else if parts[0] == "btime" {
            info.btime = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        } else if parts[0] == "processes" {
            info.processes = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        } else if parts[0] == "procs_running" {
            info.procs_running = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        } else if parts[0] == "procs_blocked" {
            info.procs_blocked = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        }
    }

    if !saw_total {
        return Err(ParseError::new("missing aggregate cpu line in stat"));
    }
    Ok(info)
}

// ============ /proc/cpuinfo ============

/// CPU identity resolved once per process.
#[derive(Debug, Clone, Default)]
pub struct CpuIdentityInfo {
    pub model: String,
    /// Base frequency from the first "cpu MHz" line.
    pub base_mhz: f64,
    /// Logical core count ("processor" entries).
    pub count: usize,
}

/// Parses `/proc/cpuinfo` for model name, base frequency and logical count.
pub fn parse_cpuinfo(content: &str) -> CpuIdentityInfo {
    let mut info = CpuIdentityInfo::default();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            match key.trim() {
                "processor" => info.count += 1,
                "model name" if info.model.is_empty() => info.model = value.trim().to_string(),
                "cpu MHz" if info.base_mhz == 0.0 => {
                    info.base_mhz = value.trim().parse().unwrap_or(0.0);
                }
                _ => {}
            }
        }
    }

    info
}

/// Extracts the first "cpu MHz" value, used for the 2-second frequency
/// refresh. Returns `None` on ARM and other machines that omit the field.
pub fn parse_cpuinfo_current_mhz(content: &str) -> Option<f64> {
    for line in content.lines() {
        if line.starts_with("cpu MHz")
            && let Some((_, value)) = line.split_once(':')
        {
            return value.trim().parse().ok();
        }
    }
    None
}

// ============ /proc/meminfo ============

/// Parsed data from `/proc/meminfo`, all values in KiB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    pub available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub sreclaimable: u64,
    pub shared: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Parses `/proc/meminfo` content.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();

    let parse_kb = |line: &str| -> u64 {
        line.split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };

    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            info.total = parse_kb(line);
        } else if line.starts_with("MemFree:") {
            info.free = parse_kb(line);
        } else if line.starts_with("MemAvailable:") {
            info.available = parse_kb(line);
        } else if line.starts_with("Buffers:") {
            info.buffers = parse_kb(line);
        } else if line.starts_with("Cached:") {
            info.cached = parse_kb(line);
        } else if line.starts_with("SReclaimable:") {
            info.sreclaimable = parse_kb(line);
        } else if line.starts_with("Shmem:") {
            info.shared = parse_kb(line);
        } else if line.starts_with("SwapTotal:") {
            info.swap_total = parse_kb(line);
        } else if line.starts_with("SwapFree:") {
            info.swap_free = parse_kb(line);
        }
    }

    if info.total == 0 {
        return Err(ParseError::new("missing MemTotal in meminfo"));
    }
    Ok(info)
}

// ============ ZFS ARC ============

/// ARC counters from `/proc/spl/kstat/zfs/arcstats`, in bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZfsArcStats {
    pub size: u64,
    pub c_min: u64,
}

/// Parses arcstats content. Lines are `name type data` triples.
pub fn parse_arcstats(content: &str) -> ZfsArcStats {
    let mut stats = ZfsArcStats::default();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            continue;
        }
        match fields[0] {
            "size" => stats.size = fields[2].parse().unwrap_or(0),
            "c_min" => stats.c_min = fields[2].parse().unwrap_or(0),
            _ => {}
        }
    }

    stats
}

// ============ /proc/[pid]/stat ============

/// Parsed data from `/proc/[pid]/stat` (the fields the engine needs).
#[derive(Debug, Clone, Default)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub utime: u64,
    pub stime: u64,
    pub num_threads: u32,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and
/// parentheses. Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;
    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;
    let comm = content[open_paren + 1..close_paren].to_string();

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < 18 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 18+, got {}",
            fields.len()
        )));
    }

    let get_val = |idx: usize| -> u64 { fields.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

    Ok(ProcStat {
        pid,
        comm,
        state: fields[0].chars().next().unwrap_or('?'),
        ppid: get_val(1) as u32,
        utime: get_val(11),
        stime: get_val(12),
        num_threads: get_val(17) as u32,
    })
}

// ============ /proc/[pid]/status ============

/// Parsed data from `/proc/[pid]/status` (the fields the engine needs).
#[derive(Debug, Clone, Default)]
pub struct ProcStatus {
    pub name: String,
    pub ppid: u32,
    pub uid: u32,
    /// VmRSS in KiB.
    pub vm_rss: u64,
}

/// Parses `/proc/[pid]/status` content. Format is `key:\tvalue` lines.
pub fn parse_proc_status(content: &str) -> ProcStatus {
    let mut status = ProcStatus::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" => status.name = value.to_string(),
            "PPid" => status.ppid = value.parse().unwrap_or(0),
            // Uid line is: real effective saved fs
            "Uid" => {
                status.uid = value
                    .split_whitespace()
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
            }
            "VmRSS" => {
                status.vm_rss = value
                    .split_whitespace()
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
            }
            _ => {}
        }
    }

    status
}

/// Converts `/proc/[pid]/cmdline` (NUL-separated) into a printable command line.
pub fn normalize_cmdline(raw: &str) -> String {
    raw.trim_end_matches('\0').replace('\0', " ")
}

// ============ /proc/[pid]/smaps_rollup ============

/// Extracts the `Pss_Dirty` value (KiB) from a smaps_rollup summary.
///
/// Only present on kernels >= 6.0; absent is not an error.
pub fn parse_pss_dirty(content: &str) -> Option<u64> {
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("Pss_Dirty:") {
            return rest.split_whitespace().next().and_then(|s| s.parse().ok());
        }
    }
    None
}

// ============ /proc/diskstats ============

/// Parsed line from `/proc/diskstats`.
#[derive(Debug, Clone, Default)]
pub struct DiskStats {
    pub device: String,
    /// Reads completed.
    pub reads: u64,
    pub read_sectors: u64,
    /// Time spent reading (ms).
    pub read_time: u64,
    /// Writes completed.
    pub writes: u64,
    pub write_sectors: u64,
    /// Time spent writing (ms).
    pub write_time: u64,
    pub io_in_progress: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes
/// w_merged w_sectors w_time io_pending io_time w_io_time [discards ...]
pub fn parse_diskstats(content: &str) -> Vec<DiskStats> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue; // Skip malformed lines
        }

        let get_val =
            |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        disks.push(DiskStats {
            device: parts[2].to_string(),
            reads: get_val(3),
            read_sectors: get_val(5),
            read_time: get_val(6),
            writes: get_val(7),
            write_sectors: get_val(9),
            write_time: get_val(10),
            io_in_progress: get_val(11),
        });
    }

    disks
}

// ============ /proc/mounts ============

/// One mount table entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
}

/// Decodes the octal escapes the kernel uses for spaces and tabs in mount
/// paths (`\040`, `\011`, `\012`, `\134`).
fn decode_mount_path(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let digits: String = chars.clone().take(3).collect();
            if digits.len() == 3
                && let Ok(code) = u8::from_str_radix(&digits, 8)
            {
                out.push(code as char);
                chars.nth(2);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Parses `/proc/mounts` content.
///
/// Format: device mount_point fstype options dump pass
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    let mut mounts = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        mounts.push(MountEntry {
            device: decode_mount_path(parts[0]),
            mount_point: decode_mount_path(parts[1]),
            fstype: parts[2].to_string(),
        });
    }

    mounts
}

// ============ /proc/net/dev ============

/// Parsed line from `/proc/net/dev`.
#[derive(Debug, Clone, Default)]
pub struct NetDevStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

/// Parses `/proc/net/dev` content.
pub fn parse_net_dev(content: &str) -> Vec<NetDevStats> {
    let mut devices = Vec::new();

    for line in content.lines() {
        // Skip header lines
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<&str> = rest.split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }

        let get_val =
            |idx: usize| -> u64 { values.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        devices.push(NetDevStats {
            interface: name.trim().to_string(),
            rx_bytes: get_val(0),
            rx_packets: get_val(1),
            tx_bytes: get_val(8),
            tx_packets: get_val(9),
        });
    }

    devices
}

// ============ /proc/loadavg ============

/// Parsed data from `/proc/loadavg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    pub running: u32,
    pub total: u32,
    pub last_pid: u32,
}

/// Parses `/proc/loadavg` content.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 5 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let load1 = parts[0]
        .parse()
        .map_err(|_| ParseError::new("invalid load1"))?;
    let load5 = parts[1]
        .parse()
        .map_err(|_| ParseError::new("invalid load5"))?;
    let load15 = parts[2]
        .parse()
        .map_err(|_| ParseError::new("invalid load15"))?;

    // Format: running/total
    let (running, total) = if let Some((r, t)) = parts[3].split_once('/') {
        (r.parse().unwrap_or(0), t.parse().unwrap_or(0))
    } else {
        (0, 0)
    };

    Ok(LoadAvg {
        load1,
        load5,
        load15,
        running,
        total,
        last_pid: parts[4].parse().unwrap_or(0),
    })
}

/// Parses `/proc/uptime` content, returning uptime seconds.
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::new("invalid uptime format"))
}

// ============ /etc/os-release ============

/// Extracts `PRETTY_NAME` from os-release content, quotes stripped.
pub fn parse_os_release_pretty_name(content: &str) -> Option<String> {
    for line in content.lines() {
        if let Some(value) = line.strip_prefix("PRETTY_NAME=") {
            return Some(value.trim().trim_matches('"').to_string());
        }
    }
    None
}

// ============ /etc/passwd ============

/// Parses `/etc/passwd` content into a UID -> username map.
///
/// Format: username:password:uid:gid:gecos:home:shell
pub fn parse_passwd(content: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() >= 3
            && let Ok(uid) = parts[2].parse::<u32>()
        {
            map.insert(uid, parts[0].to_string());
        }
    }
    map
}

/// Resolver for UID -> username mapping.
///
/// Caches the passwd file contents for efficient lookups.
#[derive(Debug, Clone, Default)]
pub struct UserResolver {
    uid_to_name: HashMap<u32, String>,
}

impl UserResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads user mappings from /etc/passwd content.
    pub fn load_from_content(&mut self, content: &str) {
        self.uid_to_name = parse_passwd(content);
    }

    /// Resolves UID to username, returns the UID as a string if not found.
    pub fn resolve(&self, uid: u32) -> String {
        self.uid_to_name
            .get(&uid)
            .cloned()
            .unwrap_or_else(|| uid.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat() {
        let content = "\
cpu  10000 500 3000 80000 1000 200 100 50 0 0
cpu0 5000 250 1500 40000 500 100 50 25 0 0
cpu1 5000 250 1500 40000 500 100 50 25 0 0
intr 123456 0 0
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 1
";
        let stat = parse_stat(content).unwrap();

        assert_eq!(stat.total.user, 10000);
        assert_eq!(stat.total.idle, 80000);
        assert_eq!(stat.total.steal, 50);
        assert_eq!(stat.cores.len(), 2);
        assert_eq!(stat.cores[0].user, 5000);
        assert_eq!(stat.cores[1].iowait, 500);
        assert_eq!(stat.btime, 1700000000);
        assert_eq!(stat.processes, 10000);
        assert_eq!(stat.procs_running, 2);
        assert_eq!(stat.procs_blocked, 1);
    }

    #[test]
    fn test_parse_stat_missing_cpu_line() {
        assert!(parse_stat("btime 1700000000\n").is_err());
    }

    #[test]
    fn test_parse_cpuinfo() {
        let content = "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-9750H CPU @ 2.60GHz
cpu MHz\t\t: 2600.000
cache size\t: 12288 KB

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-9750H CPU @ 2.60GHz
cpu MHz\t\t: 3100.251
";
        let info = parse_cpuinfo(content);
        assert_eq!(info.count, 2);
        assert_eq!(info.model, "Intel(R) Core(TM) i7-9750H CPU @ 2.60GHz");
        assert!((info.base_mhz - 2600.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_cpuinfo_current_mhz() {
        let content = "processor\t: 0\ncpu MHz\t\t: 3900.123\n";
        assert!((parse_cpuinfo_current_mhz(content).unwrap() - 3900.123).abs() < 0.001);

        // ARM cpuinfo has no "cpu MHz"
        let arm = "processor\t: 0\nBogoMIPS\t: 108.00\n";
        assert!(parse_cpuinfo_current_mhz(arm).is_none());
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:         1000 kB
SwapTotal:       4096000 kB
SwapFree:        4095000 kB
Shmem:            128000 kB
Slab:             512000 kB
SReclaimable:     256000 kB
";
        let info = parse_meminfo(content).unwrap();

        assert_eq!(info.total, 16384000);
        assert_eq!(info.free, 8192000);
        assert_eq!(info.available, 12000000);
        assert_eq!(info.buffers, 512000);
        assert_eq!(info.cached, 2048000);
        assert_eq!(info.sreclaimable, 256000);
        assert_eq!(info.shared, 128000);
        assert_eq!(info.swap_total, 4096000);
        assert_eq!(info.swap_free, 4095000);
    }

    #[test]
    fn test_parse_meminfo_empty_is_error() {
        assert!(parse_meminfo("").is_err());
    }

    #[test]
    fn test_parse_arcstats() {
        let content = "\
name                            type data
hits                            4    123456
size                            4    2147483648
c_min                           4    1073741824
c_max                           4    8589934592
";
        let stats = parse_arcstats(content);
        assert_eq!(stats.size, 2147483648);
        assert_eq!(stats.c_min, 1073741824);
    }

    #[test]
    fn test_parse_arcstats_absent_fields() {
        let stats = parse_arcstats("name type data\nhits 4 1\n");
        assert_eq!(stats.size, 0);
        assert_eq!(stats.c_min, 0);
    }

    #[test]
    fn test_parse_proc_stat_basic() {
        let content = "1234 (bash) S 1233 1234 1234 34816 1235 4194304 5000 50000 10 20 100 50 200 100 20 0 1 0 100000 25000000 2000 18446744073709551615 0 0 0 0 0 0 65536 3670020 1266777851 0 0 0 17 2 0 0 5 0 0 0 0 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.pid, 1234);
        assert_eq!(stat.comm, "bash");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1233);
        assert_eq!(stat.utime, 100);
        assert_eq!(stat.stime, 50);
        assert_eq!(stat.num_threads, 1);
    }

    #[test]
    fn test_parse_proc_stat_with_spaces_in_comm() {
        let content = "5000 (Web Content) S 4999 5000 4999 0 -1 4194304 100000 0 500 0 5000 1000 0 0 20 0 20 0 500000 2000000000 50000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.pid, 5000);
        assert_eq!(stat.comm, "Web Content");
        assert_eq!(stat.utime, 5000);
        assert_eq!(stat.stime, 1000);
        assert_eq!(stat.num_threads, 20);
    }

    #[test]
    fn test_parse_proc_stat_with_parentheses_in_comm() {
        let content = "5001 (test(1)) S 1 5001 5001 0 -1 4194304 1000 0 0 0 10 5 0 0 20 0 1 0 500100 10000000 1000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.pid, 5001);
        assert_eq!(stat.comm, "test(1)");
    }

    #[test]
    fn test_parse_proc_status() {
        let content = "\
Name:\tfirefox
Pid:\t4242
PPid:\t1
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
VmPeak:\t 3000000 kB
VmRSS:\t  204800 kB
";
        let status = parse_proc_status(content);
        assert_eq!(status.name, "firefox");
        assert_eq!(status.ppid, 1);
        assert_eq!(status.uid, 1000);
        assert_eq!(status.vm_rss, 204800);
    }

    #[test]
    fn test_parse_proc_status_missing_fields_zero() {
        let status = parse_proc_status("Name:\tkthreadd\n");
        assert_eq!(status.name, "kthreadd");
        assert_eq!(status.vm_rss, 0);
        assert_eq!(status.uid, 0);
    }

    #[test]
    fn test_normalize_cmdline() {
        assert_eq!(
            normalize_cmdline("/usr/bin/python3\0-m\0http.server\0"),
            "/usr/bin/python3 -m http.server"
        );
        assert_eq!(normalize_cmdline(""), "");
    }

    #[test]
    fn test_parse_pss_dirty() {
        let content = "\
Rss:              204800 kB
Pss:               80000 kB
Pss_Anon:          40000 kB
Pss_File:          30000 kB
Pss_Dirty:         49152 kB
Shared_Clean:      60000 kB
";
        assert_eq!(parse_pss_dirty(content), Some(49152));
    }

    #[test]
    fn test_parse_pss_dirty_absent_on_old_kernels() {
        let content = "Rss: 204800 kB\nPss: 80000 kB\n";
        assert_eq!(parse_pss_dirty(content), None);
    }

    #[test]
    fn test_parse_diskstats() {
        let content = "\
   8       0 sda 1234 0 56789 100 5678 0 98765 200 0 150 300 0 0 0 0
   8       1 sda1 1000 0 50000 80 5000 0 90000 180 0 130 260 0 0 0 0
 259       0 nvme0n1 9999 0 123456 500 8888 0 654321 400 5 1000 2000 0 0 0 0
";
        let disks = parse_diskstats(content);

        assert_eq!(disks.len(), 3);
        assert_eq!(disks[0].device, "sda");
        assert_eq!(disks[0].reads, 1234);
        assert_eq!(disks[0].read_sectors, 56789);
        assert_eq!(disks[0].read_time, 100);
        assert_eq!(disks[0].writes, 5678);
        assert_eq!(disks[0].write_sectors, 98765);
        assert_eq!(disks[0].write_time, 200);
        assert_eq!(disks[2].device, "nvme0n1");
        assert_eq!(disks[2].io_in_progress, 5);
    }

    #[test]
    fn test_parse_mounts() {
        let content = "\
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
tmpfs /run tmpfs rw,nosuid,nodev 0 0
/dev/sda1 /mnt/my\\040drive ext4 rw 0 0
";
        let mounts = parse_mounts(content);

        assert_eq!(mounts.len(), 4);
        assert_eq!(mounts[0].device, "/dev/nvme0n1p2");
        assert_eq!(mounts[0].mount_point, "/");
        assert_eq!(mounts[0].fstype, "ext4");
        // Octal escape decoding
        assert_eq!(mounts[3].mount_point, "/mnt/my drive");
    }

    #[test]
    fn test_parse_net_dev() {
        let content = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
  eth0: 9876543     5678    1    2    0     0          0        10 87654321     4321    3    4    0     0       0          0
";
        let devices = parse_net_dev(content);

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].interface, "lo");
        assert_eq!(devices[0].rx_bytes, 1234567);
        assert_eq!(devices[1].interface, "eth0");
        assert_eq!(devices[1].rx_bytes, 9876543);
        assert_eq!(devices[1].rx_packets, 5678);
        assert_eq!(devices[1].tx_bytes, 87654321);
        assert_eq!(devices[1].tx_packets, 4321);
    }

    #[test]
    fn test_parse_loadavg() {
        let content = "0.15 0.10 0.05 2/1250 43210\n";
        let load = parse_loadavg(content).unwrap();

        assert!((load.load1 - 0.15).abs() < 0.001);
        assert!((load.load5 - 0.10).abs() < 0.001);
        assert!((load.load15 - 0.05).abs() < 0.001);
        assert_eq!(load.running, 2);
        assert_eq!(load.total, 1250);
        assert_eq!(load.last_pid, 43210);
    }

    #[test]
    fn test_parse_uptime() {
        let uptime = parse_uptime("12345.67 45678.90\n").unwrap();
        assert!((uptime - 12345.67).abs() < 0.001);
        assert!(parse_uptime("").is_err());
    }

    #[test]
    fn test_parse_os_release_pretty_name() {
        let content = "\
NAME=\"Arch Linux\"
PRETTY_NAME=\"Arch Linux\"
ID=arch
";
        assert_eq!(
            parse_os_release_pretty_name(content).unwrap(),
            "Arch Linux"
        );
        assert!(parse_os_release_pretty_name("ID=arch\n").is_none());
    }

    #[test]
    fn test_parse_passwd() {
        let content = "\
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
user:x:1000:1000:User Name:/home/user:/bin/bash
";
        let map = parse_passwd(content);
        assert_eq!(map.get(&0), Some(&"root".to_string()));
        assert_eq!(map.get(&1000), Some(&"user".to_string()));
    }

    #[test]
    fn test_user_resolver() {
        let mut resolver = UserResolver::new();
        resolver.load_from_content(
            "root:x:0:0::/root:/bin/bash\nuser:x:1000:1000::/home/user:/bin/bash",
        );

        assert_eq!(resolver.resolve(0), "root");
        assert_eq!(resolver.resolve(1000), "user");
        assert_eq!(resolver.resolve(9999), "9999");
    }
}
