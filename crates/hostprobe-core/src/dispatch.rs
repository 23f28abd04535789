//! Composite dispatcher: parallel fan-out over the requested module set.
//!
//! Each module runs on its own thread; the coordinator assembles returned
//! values into one [`MetaSnapshot`]. Individual module failures are logged
//! and demoted: a dashboard asking for seven modules should not go blank
//! because GPU enumeration transiently failed. The only fatal input is an
//! unknown module name, rejected before any work starts.

use tracing::warn;

use crate::cancel::CancelFlag;
use crate::engine::{Engine, ProcessQuery};
use crate::models::{MetaSnapshot, ModulesInfo};
use crate::probes::{ProbeError, Probes};

/// One dispatchable probe family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Cpu,
    Memory,
    Network,
    NetRate,
    Disk,
    DiskRate,
    DiskMounts,
    Processes,
    System,
    Hardware,
    Gpu,
    GpuTemp,
}

impl Module {
    pub const ALL: [Module; 12] = [
        Module::Cpu,
        Module::Memory,
        Module::Network,
        Module::NetRate,
        Module::Disk,
        Module::DiskRate,
        Module::DiskMounts,
        Module::Processes,
        Module::System,
        Module::Hardware,
        Module::Gpu,
        Module::GpuTemp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Module::Cpu => "cpu",
            Module::Memory => "memory",
            Module::Network => "network",
            Module::NetRate => "net-rate",
            Module::Disk => "disk",
            Module::DiskRate => "disk-rate",
            Module::DiskMounts => "diskmounts",
            Module::Processes => "processes",
            Module::System => "system",
            Module::Hardware => "hardware",
            Module::Gpu => "gpu",
            Module::GpuTemp => "gpu-temp",
        }
    }

    fn from_name(name: &str) -> Option<Module> {
        Module::ALL
            .iter()
            .copied()
            .find(|m| m.name() == name)
    }

    /// Resolves a requested module list, expanding the `all` sentinel and
    /// deduplicating while preserving order. Unknown names are fatal.
    pub fn parse_set(names: &[String]) -> Result<Vec<Module>, DispatchError> {
        let mut modules = Vec::new();
        for raw in names {
            let name = raw.trim().to_ascii_lowercase();
            if name == "all" {
                return Ok(Module::ALL.to_vec());
            }
            let module = Module::from_name(&name)
                .ok_or_else(|| DispatchError::UnknownModule(raw.clone()))?;
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        Ok(modules)
    }
}

/// Fatal dispatcher errors. Everything below this level is demoted to a
/// warning and a missing module in the merged snapshot.
#[derive(Debug)]
pub enum DispatchError {
    UnknownModule(String),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::UnknownModule(name) => write!(f, "unknown module: {}", name),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Per-call knobs for the composite dispatcher.
#[derive(Debug, Clone, Default)]
pub struct MetaParams {
    pub sort: crate::engine::ProcSortKey,
    /// 0 = unlimited.
    pub proc_limit: usize,
    pub enable_proc_cpu: bool,
    pub gpu_pci_ids: Vec<String>,
    pub cpu_cursor: Option<String>,
    pub proc_cursor: Option<String>,
    pub net_cursor: Option<String>,
    pub disk_cursor: Option<String>,
}

/// The module list advertised to clients.
pub fn available_modules() -> ModulesInfo {
    ModulesInfo {
        available: Module::ALL.iter().map(|m| m.name().to_string()).collect(),
    }
}

enum ModuleOutput {
    Cpu(crate::models::CpuSnapshot),
    Memory(crate::models::MemorySnapshot),
    Network(Vec<crate::models::NetLink>),
    NetRate(crate::models::NetRateSnapshot),
    Disk(Vec<crate::models::DiskIoTotals>),
    DiskRate(crate::models::DiskRateSnapshot),
    DiskMounts(Vec<crate::models::DiskMount>),
    Processes(crate::models::ProcessList),
    System(crate::models::SystemSnapshot),
    Hardware(crate::models::HardwareInfo),
    Gpu(Vec<crate::models::Gpu>),
    Skipped,
}

impl<P: Probes> Engine<P> {
    /// Runs the requested modules concurrently and merges their results.
    ///
    /// Cancellation is observed before each module starts; a cancelled
    /// call returns whatever partial snapshot exists.
    pub fn meta(
        &self,
        modules: &[Module],
        params: &MetaParams,
        cancel: &CancelFlag,
    ) -> MetaSnapshot {
        let mut outputs: Vec<ModuleOutput> = Vec::with_capacity(modules.len());

        std::thread::scope(|s| {
            let handles: Vec<_> = modules
                .iter()
                .map(|&module| {
                    s.spawn(move || {
                        if cancel.is_cancelled() {
                            return ModuleOutput::Skipped;
                        }
                        self.run_module(module, params, cancel)
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(output) => outputs.push(output),
                    Err(_) => warn!("module task panicked"),
                }
            }
        });

        let mut meta = MetaSnapshot::default();
        for output in outputs {
            match output {
                ModuleOutput::Cpu(v) => meta.cpu = Some(v),
                ModuleOutput::Memory(v) => meta.memory = Some(v),
                ModuleOutput::Network(v) => meta.network = Some(v),
                ModuleOutput::NetRate(v) => meta.net_rate = Some(v),
                ModuleOutput::Disk(v) => meta.disk = Some(v),
                ModuleOutput::DiskRate(v) => meta.disk_rate = Some(v),
                ModuleOutput::DiskMounts(v) => meta.disk_mounts = Some(v),
                ModuleOutput::Processes(v) => {
                    meta.processes = Some(v.processes);
                    meta.cursor = Some(v.cursor);
                }
                ModuleOutput::System(v) => meta.system = Some(v),
                ModuleOutput::Hardware(v) => meta.hardware = Some(v),
                ModuleOutput::Gpu(v) => meta.gpu = Some(v),
                ModuleOutput::Skipped => {}
            }
        }
        meta
    }

    fn run_module(
        &self,
        module: Module,
        params: &MetaParams,
        cancel: &CancelFlag,
    ) -> ModuleOutput {
        let demote = |module: Module, e: ProbeError| {
            warn!(module = module.name(), error = %e, "module failed");
            ModuleOutput::Skipped
        };

        match module {
            Module::Cpu => match self.cpu(params.cpu_cursor.as_deref(), cancel) {
                Ok(v) => ModuleOutput::Cpu(v),
                Err(e) => demote(module, e),
            },
            Module::Memory => match self.memory() {
                Ok(v) => ModuleOutput::Memory(v),
                Err(e) => demote(module, e),
            },
            Module::Network => match self.network() {
                Ok(v) => ModuleOutput::Network(v),
                Err(e) => demote(module, e),
            },
            Module::NetRate => match self.network_rates(params.net_cursor.as_deref()) {
                Ok(v) => ModuleOutput::NetRate(v),
                Err(e) => demote(module, e),
            },
            Module::Disk => match self.disk_totals() {
                Ok(v) => ModuleOutput::Disk(v),
                Err(e) => demote(module, e),
            },
            Module::DiskRate => match self.disk_rates(params.disk_cursor.as_deref()) {
                Ok(v) => ModuleOutput::DiskRate(v),
                Err(e) => demote(module, e),
            },
            Module::DiskMounts => match self.disk_mounts() {
                Ok(v) => ModuleOutput::DiskMounts(v),
                Err(e) => demote(module, e),
            },
            Module::Processes => {
                let query = ProcessQuery {
                    sort: params.sort,
                    limit: params.proc_limit,
                    enable_cpu: params.enable_proc_cpu,
                    cursor: params.proc_cursor.clone(),
                };
                match self.processes(&query, cancel) {
                    Ok(v) => ModuleOutput::Processes(v),
                    Err(e) => demote(module, e),
                }
            }
            Module::System => match self.system() {
                Ok(v) => ModuleOutput::System(v),
                Err(e) => demote(module, e),
            },
            Module::Hardware => match self.hardware() {
                Ok(v) => ModuleOutput::Hardware(v),
                Err(e) => demote(module, e),
            },
            Module::Gpu | Module::GpuTemp => {
                match self.gpus_with_temp(&params.gpu_pci_ids) {
                    Ok(v) => ModuleOutput::Gpu(v),
                    Err(e) => demote(module, e),
                }
            }
        }
    }
}
