//! hostprobe — host telemetry CLI and HTTP API.
//!
//! Every command maps onto one engine module (or the composite `meta`
//! call); rate-bearing commands accept the cursor emitted by the previous
//! invocation and print a fresh one alongside the data.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod output;
mod server;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;

use hostprobe_core::engine::{ProcSortKey, ProcessQuery};
use hostprobe_core::{CancelFlag, Engine, MetaParams, Module, RealProbes};

#[derive(Parser)]
#[command(name = "hostprobe", about = "Host telemetry engine", version)]
struct Cli {
    /// Output in JSON format.
    #[arg(long, global = true)]
    json: bool,

    /// Disable per-process CPU calculation for faster listings.
    #[arg(long, global = true)]
    no_cpu: bool,

    /// Path to the proc filesystem (for testing/mocking).
    #[arg(long, global = true, default_value = "/proc")]
    proc_path: String,

    /// Path to the sys filesystem (for testing/mocking).
    #[arg(long, global = true, default_value = "/sys")]
    sys_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum SortArg {
    #[default]
    Cpu,
    Memory,
    Name,
    Pid,
}

impl From<SortArg> for ProcSortKey {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Cpu => ProcSortKey::Cpu,
            SortArg::Memory => ProcSortKey::Memory,
            SortArg::Name => ProcSortKey::Name,
            SortArg::Pid => ProcSortKey::Pid,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ProcArgs {
    /// Sort processes by this key.
    #[arg(long, value_enum, default_value_t = SortArg::Cpu)]
    sort: SortArg,

    /// Limit number of processes (0 = no limit).
    #[arg(long, default_value_t = 0)]
    limit: usize,
}

#[derive(Debug, Clone, Args)]
struct CursorArgs {
    /// CPU cursor from a previous call.
    #[arg(long)]
    cpu_cursor: Option<String>,

    /// Process cursor from a previous call.
    #[arg(long)]
    proc_cursor: Option<String>,

    /// Network rate cursor from a previous call.
    #[arg(long)]
    net_cursor: Option<String>,

    /// Disk rate cursor from a previous call.
    #[arg(long)]
    disk_cursor: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Collect every module in one snapshot.
    All {
        #[command(flatten)]
        proc_args: ProcArgs,
        #[command(flatten)]
        cursors: CursorArgs,
        /// PCI IDs for GPU temperatures (e.g. 10de:2684,1002:164e).
        #[arg(long, value_delimiter = ',')]
        gpu_pci_ids: Vec<String>,
    },
    /// CPU utilization, frequency and temperature.
    Cpu {
        /// Cursor from a previous call.
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Memory composition.
    Memory,
    /// Network interface totals, or rates with --rate.
    Network {
        /// Derive rx/tx rates against the cursor.
        #[arg(long)]
        rate: bool,
        /// Cursor from a previous call (implies --rate).
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Block device totals and mounts, or rates with --rate.
    Disk {
        /// Derive read/write rates against the cursor.
        #[arg(long)]
        rate: bool,
        /// Cursor from a previous call (implies --rate).
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Process listing.
    Processes {
        #[command(flatten)]
        proc_args: ProcArgs,
        /// Cursor from a previous call.
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Load average, process/thread counts, uptime.
    System,
    /// Board, BIOS, distro and host identity.
    Hardware,
    /// GPU enumeration.
    Gpu {
        /// PCI IDs to read temperatures for.
        #[arg(long, value_delimiter = ',')]
        pci_ids: Vec<String>,
    },
    /// Temperature of one GPU.
    GpuTemp {
        /// PCI ID of the GPU (e.g. 10de:2684).
        #[arg(long)]
        pci_id: String,
    },
    /// Collect a chosen set of modules concurrently.
    Meta {
        /// Modules to include (comma separated; `all` for everything).
        #[arg(long, value_delimiter = ',', default_value = "all")]
        modules: Vec<String>,
        #[command(flatten)]
        proc_args: ProcArgs,
        #[command(flatten)]
        cursors: CursorArgs,
        /// PCI IDs for GPU temperatures.
        #[arg(long, value_delimiter = ',')]
        gpu_pci_ids: Vec<String>,
    },
    /// List available modules.
    Modules,
    /// Serve the engine over HTTP.
    Server {
        /// Listen address.
        #[arg(long, default_value = "0.0.0.0:9800", env = "HOSTPROBE_LISTEN")]
        listen: String,
    },
}

/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("hostprobe={}", level).parse().unwrap())
        .add_directive(format!("hostprobe_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let engine = Engine::with_roots(RealProbes::new(), &cli.proc_path, &cli.sys_path);

    if let Err(e) = run(cli, engine) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, engine: Engine<RealProbes>) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelFlag::new();
    let json = cli.json;

    match cli.command {
        Command::All {
            proc_args,
            cursors,
            gpu_pci_ids,
        } => {
            let params = meta_params(&proc_args, &cursors, gpu_pci_ids, cli.no_cpu);
            let meta = engine.meta(&Module::ALL, &params, &cancel);
            output::emit(&meta, json, output::print_meta)?;
        }
        Command::Cpu { cursor } => {
            let cpu = engine.cpu(cursor.as_deref(), &cancel)?;
            output::emit(&cpu, json, output::print_cpu)?;
        }
        Command::Memory => {
            let memory = engine.memory()?;
            output::emit(&memory, json, output::print_memory)?;
        }
        Command::Network { rate, cursor } => {
            if rate || cursor.is_some() {
                let rates = engine.network_rates(cursor.as_deref())?;
                output::emit(&rates, json, output::print_net_rates)?;
            } else {
                let links = engine.network()?;
                output::emit(&links, json, output::print_net_links)?;
            }
        }
        Command::Disk { rate, cursor } => {
            if rate || cursor.is_some() {
                let rates = engine.disk_rates(cursor.as_deref())?;
                output::emit(&rates, json, output::print_disk_rates)?;
            } else {
                let report = output::DiskReport {
                    devices: engine.disk_totals()?,
                    mounts: engine.disk_mounts()?,
                };
                output::emit(&report, json, output::print_disk_report)?;
            }
        }
        Command::Processes { proc_args, cursor } => {
            let query = ProcessQuery {
                sort: proc_args.sort.into(),
                limit: proc_args.limit,
                enable_cpu: !cli.no_cpu,
                cursor,
            };
            let list = engine.processes(&query, &cancel)?;
            output::emit(&list, json, output::print_processes)?;
        }
        Command::System => {
            let system = engine.system()?;
            output::emit(&system, json, output::print_system)?;
        }
        Command::Hardware => {
            let hardware = engine.hardware()?;
            output::emit(&hardware, json, output::print_hardware)?;
        }
        Command::Gpu { pci_ids } => {
            let gpus = engine.gpus_with_temp(&pci_ids)?;
            output::emit(&gpus, json, output::print_gpus)?;
        }
        Command::GpuTemp { pci_id } => {
            let temp = engine.gpu_temp(&pci_id)?;
            output::emit(&temp, json, output::print_gpu_temp)?;
        }
        Command::Meta {
            modules,
            proc_args,
            cursors,
            gpu_pci_ids,
        } => {
            let set = Module::parse_set(&modules)?;
            let params = meta_params(&proc_args, &cursors, gpu_pci_ids, cli.no_cpu);
            let meta = engine.meta(&set, &params, &cancel);
            output::emit(&meta, json, output::print_meta)?;
        }
        Command::Modules => {
            let info = hostprobe_core::dispatch::available_modules();
            output::emit(&info, json, |info| {
                for name in &info.available {
                    println!("{}", name);
                }
            })?;
        }
        Command::Server { listen } => {
            server::run(engine, &listen)?;
        }
    }

    Ok(())
}

fn meta_params(
    proc_args: &ProcArgs,
    cursors: &CursorArgs,
    gpu_pci_ids: Vec<String>,
    no_cpu: bool,
) -> MetaParams {
    MetaParams {
        sort: proc_args.sort.into(),
        proc_limit: proc_args.limit,
        enable_proc_cpu: !no_cpu,
        gpu_pci_ids,
        cpu_cursor: cursors.cpu_cursor.clone(),
        proc_cursor: cursors.proc_cursor.clone(),
        net_cursor: cursors.net_cursor.clone(),
        disk_cursor: cursors.disk_cursor.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sort_arg_maps_to_engine_keys() {
        assert_eq!(ProcSortKey::from(SortArg::Cpu), ProcSortKey::Cpu);
        assert_eq!(ProcSortKey::from(SortArg::Pid), ProcSortKey::Pid);
    }
}
