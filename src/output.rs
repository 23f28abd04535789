//! Terminal output: JSON envelopes or terse human-readable sections.

use serde::Serialize;

use hostprobe_core::models::{
    CpuSnapshot, DiskIoTotals, DiskMount, DiskRateSnapshot, Gpu, GpuTemp, HardwareInfo,
    MemorySnapshot, MetaSnapshot, NetLink, NetRateSnapshot, ProcessInfo, ProcessList,
    SystemSnapshot,
};

/// The `disk` command's combined envelope.
#[derive(Debug, Serialize)]
pub struct DiskReport {
    pub devices: Vec<DiskIoTotals>,
    pub mounts: Vec<DiskMount>,
}

/// Prints `value` as pretty JSON, or hands it to the human formatter.
pub fn emit<T: Serialize>(
    value: &T,
    json: bool,
    pretty: impl FnOnce(&T),
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        pretty(value);
    }
    Ok(())
}

fn kib(kb: u64) -> String {
    hostprobe_core::fmt::format_size(kb * 1024)
}

fn rate(bytes_per_sec: f64) -> String {
    format!(
        "{}/s",
        hostprobe_core::fmt::format_size(bytes_per_sec as u64)
    )
}

pub fn print_cpu(cpu: &CpuSnapshot) {
    println!(
        "{} ({} cores @ {:.0} MHz, {:.1}°C)",
        cpu.model, cpu.count, cpu.frequency_mhz, cpu.temperature_c
    );
    println!("usage: {:.1}%", cpu.usage_percent);
    let cores: Vec<String> = cpu
        .core_usage_percent
        .iter()
        .map(|p| format!("{:.1}", p))
        .collect();
    println!("cores: [{}]", cores.join(", "));
    println!("cursor: {}", cpu.cursor);
}

pub fn print_memory(mem: &MemorySnapshot) {
    println!(
        "memory: {} / {} used ({:.1}%)",
        kib(mem.used_kb),
        kib(mem.total_kb),
        mem.used_percent
    );
    println!(
        "free: {}  available: {}  buffers: {}  cached: {}  shared: {}",
        kib(mem.free_kb),
        kib(mem.available_kb),
        kib(mem.buffers_kb),
        kib(mem.cached_kb),
        kib(mem.shared_kb)
    );
    if mem.swap_total_kb > 0 {
        println!(
            "swap: {} / {} free",
            kib(mem.swap_free_kb),
            kib(mem.swap_total_kb)
        );
    }
    if mem.zfs_arc_size_kb > 0 {
        println!("zfs arc: {}", kib(mem.zfs_arc_size_kb));
    }
}

pub fn print_net_links(links: &Vec<NetLink>) {
    for link in links {
        println!(
            "{}: rx {}  tx {}",
            link.interface,
            hostprobe_core::fmt::format_size(link.rx_total),
            hostprobe_core::fmt::format_size(link.tx_total)
        );
    }
}

pub fn print_net_rates(snap: &NetRateSnapshot) {
    for iface in &snap.interfaces {
        println!(
            "{}: rx {} ({})  tx {} ({})",
            iface.interface,
            hostprobe_core::fmt::format_size(iface.rx_total),
            rate(iface.rx_rate),
            hostprobe_core::fmt::format_size(iface.tx_total),
            rate(iface.tx_rate)
        );
    }
    println!("cursor: {}", snap.cursor);
}

pub fn print_disk_totals(totals: &[DiskIoTotals]) {
    for disk in totals {
        println!(
            "{}: read {}  written {}",
            disk.device,
            hostprobe_core::fmt::format_size(disk.read_bytes),
            hostprobe_core::fmt::format_size(disk.write_bytes)
        );
    }
}

pub fn print_disk_mounts(mounts: &[DiskMount]) {
    for mount in mounts {
        println!(
            "{} on {} ({}): {} / {} used ({:.0}%), {} available",
            mount.device,
            mount.mount_point,
            mount.fstype,
            mount.used,
            mount.size,
            mount.percent,
            mount.available
        );
    }
}

pub fn print_disk_report(report: &DiskReport) {
    print_disk_totals(&report.devices);
    print_disk_mounts(&report.mounts);
}

pub fn print_disk_rates(snap: &DiskRateSnapshot) {
    for dev in &snap.devices {
        println!(
            "{}: read {} ({})  write {} ({})",
            dev.device,
            hostprobe_core::fmt::format_size(dev.read_bytes_total),
            rate(dev.read_rate_bytes_per_sec),
            hostprobe_core::fmt::format_size(dev.write_bytes_total),
            rate(dev.write_rate_bytes_per_sec)
        );
    }
    println!("cursor: {}", snap.cursor);
}

fn print_process_rows(processes: &[ProcessInfo]) {
    println!(
        "{:>7} {:>7} {:>6} {:>9} {:>6} {:<12} {}",
        "PID", "PPID", "CPU%", "MEM", "MEM%", "USER", "COMMAND"
    );
    for p in processes {
        println!(
            "{:>7} {:>7} {:>6.1} {:>9} {:>6.2} {:<12} {}",
            p.pid,
            p.ppid,
            p.cpu_percent,
            kib(p.memory_kb),
            p.memory_percent,
            p.username,
            p.command
        );
    }
}

pub fn print_processes(list: &ProcessList) {
    print_process_rows(&list.processes);
    println!("cursor: {}", list.cursor);
}

pub fn print_system(sys: &SystemSnapshot) {
    println!(
        "load: {:.2} {:.2} {:.2}",
        sys.load1, sys.load5, sys.load15
    );
    println!(
        "processes: {} ({} running, {} blocked), threads: {}",
        sys.processes, sys.procs_running, sys.procs_blocked, sys.threads
    );
    let days = sys.uptime_secs / 86400;
    let hours = (sys.uptime_secs % 86400) / 3600;
    let minutes = (sys.uptime_secs % 3600) / 60;
    println!("uptime: {}d {}h {}m", days, hours, minutes);
}

pub fn print_hardware(hw: &HardwareInfo) {
    println!("host: {} ({})", hw.hostname, hw.arch);
    println!("distro: {}", hw.distro_pretty_name);
    println!("kernel: {}", hw.kernel);
    println!("cpu: {} ({} cores)", hw.cpu.model, hw.cpu.count);
    println!("board: {}", hw.bios.motherboard);
    println!("bios: {} ({})", hw.bios.version, hw.bios.date);
}

pub fn print_gpus(gpus: &Vec<Gpu>) {
    if gpus.is_empty() {
        println!("no display controllers found");
        return;
    }
    for gpu in gpus {
        let temp = if gpu.temperature_c > 0.0 {
            format!(", {:.1}°C", gpu.temperature_c)
        } else {
            String::new()
        };
        println!(
            "{} [{}] driver={}{}",
            gpu.full_name, gpu.pci_id, gpu.driver, temp
        );
    }
}

pub fn print_gpu_temp(temp: &GpuTemp) {
    println!(
        "{:.1}°C (driver={}, sensor={})",
        temp.temperature_c, temp.driver, temp.hwmon
    );
}

pub fn print_meta(meta: &MetaSnapshot) {
    if let Some(hw) = &meta.hardware {
        print_hardware(hw);
        println!();
    }
    if let Some(cpu) = &meta.cpu {
        print_cpu(cpu);
        println!();
    }
    if let Some(mem) = &meta.memory {
        print_memory(mem);
        println!();
    }
    if let Some(sys) = &meta.system {
        print_system(sys);
        println!();
    }
    if let Some(links) = &meta.network {
        print_net_links(links);
        println!();
    }
    if let Some(rates) = &meta.net_rate {
        print_net_rates(rates);
        println!();
    }
    if let Some(totals) = &meta.disk {
        print_disk_totals(totals);
        println!();
    }
    if let Some(rates) = &meta.disk_rate {
        print_disk_rates(rates);
        println!();
    }
    if let Some(mounts) = &meta.disk_mounts {
        print_disk_mounts(mounts);
        println!();
    }
    if let Some(gpus) = &meta.gpu {
        print_gpus(gpus);
        println!();
    }
    if let Some(processes) = &meta.processes {
        print_process_rows(processes);
        if let Some(cursor) = &meta.cursor {
            println!("cursor: {}", cursor);
        }
    }
}
