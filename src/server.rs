//! HTTP API: one endpoint per module plus the composite `/api/v1/meta`.
//!
//! Engine calls block on pseudo-filesystem reads, so every handler runs
//! them under `spawn_blocking`. Module failures map to 500, an unknown
//! PCI id to 404, and an unknown module name to 400: the same
//! fatal/demoted split the dispatcher applies internally.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use serde::Deserialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use hostprobe_core::dispatch::available_modules;
use hostprobe_core::engine::{ProcSortKey, ProcessQuery};
use hostprobe_core::models::{MetaSnapshot, ModulesInfo};
use hostprobe_core::{CancelFlag, Engine, MetaParams, Module, ProbeError, RealProbes};

type AppState = Arc<Engine<RealProbes>>;

/// Builds the runtime and serves until ctrl-c.
pub fn run(engine: Engine<RealProbes>, listen: &str) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(Arc::new(engine), listen))
}

async fn serve(state: AppState, listen: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/modules", get(handle_modules))
        .route("/api/v1/meta", get(handle_meta))
        .route("/api/v1/cpu", get(handle_cpu))
        .route("/api/v1/memory", get(handle_memory))
        .route("/api/v1/network", get(handle_network))
        .route("/api/v1/net-rate", get(handle_net_rate))
        .route("/api/v1/disk", get(handle_disk))
        .route("/api/v1/disk-rate", get(handle_disk_rate))
        .route("/api/v1/mounts", get(handle_mounts))
        .route("/api/v1/processes", get(handle_processes))
        .route("/api/v1/system", get(handle_system))
        .route("/api/v1/hardware", get(handle_hardware))
        .route("/api/v1/gpu", get(handle_gpu))
        .route("/api/v1/gpu-temp", get(handle_gpu_temp))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new());

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(listen, "hostprobe API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install ctrl-c handler");
    }
}

/// Runs a blocking engine call on the blocking pool and maps its error.
async fn blocking<T, F>(f: F) -> Result<Json<T>, StatusCode>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProbeError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(Json(value)),
        Ok(Err(ProbeError::Missing(what))) => {
            error!(what, "requested entity not found");
            Err(StatusCode::NOT_FOUND)
        }
        Ok(Err(e)) => {
            error!(error = %e, "probe failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(e) => {
            error!(error = %e, "blocking task failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_modules() -> Json<ModulesInfo> {
    Json(available_modules())
}

#[derive(Deserialize)]
struct CursorQuery {
    cursor: Option<String>,
}

async fn handle_cpu(
    State(state): State<AppState>,
    Query(q): Query<CursorQuery>,
) -> Result<Json<hostprobe_core::models::CpuSnapshot>, StatusCode> {
    blocking(move || state.cpu(q.cursor.as_deref(), &CancelFlag::new())).await
}

async fn handle_memory(
    State(state): State<AppState>,
) -> Result<Json<hostprobe_core::models::MemorySnapshot>, StatusCode> {
    blocking(move || state.memory()).await
}

async fn handle_network(
    State(state): State<AppState>,
) -> Result<Json<Vec<hostprobe_core::models::NetLink>>, StatusCode> {
    blocking(move || state.network()).await
}

async fn handle_net_rate(
    State(state): State<AppState>,
    Query(q): Query<CursorQuery>,
) -> Result<Json<hostprobe_core::models::NetRateSnapshot>, StatusCode> {
    blocking(move || state.network_rates(q.cursor.as_deref())).await
}

async fn handle_disk(
    State(state): State<AppState>,
) -> Result<Json<Vec<hostprobe_core::models::DiskIoTotals>>, StatusCode> {
    blocking(move || state.disk_totals()).await
}

async fn handle_disk_rate(
    State(state): State<AppState>,
    Query(q): Query<CursorQuery>,
) -> Result<Json<hostprobe_core::models::DiskRateSnapshot>, StatusCode> {
    blocking(move || state.disk_rates(q.cursor.as_deref())).await
}

async fn handle_mounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<hostprobe_core::models::DiskMount>>, StatusCode> {
    blocking(move || state.disk_mounts()).await
}

#[derive(Deserialize)]
struct ProcessesQuery {
    sort: Option<String>,
    limit: Option<usize>,
    no_cpu: Option<bool>,
    cursor: Option<String>,
}

fn parse_sort(sort: Option<&str>) -> Result<ProcSortKey, StatusCode> {
    match sort {
        None => Ok(ProcSortKey::default()),
        Some(raw) => raw.parse().map_err(|_| StatusCode::BAD_REQUEST),
    }
}

async fn handle_processes(
    State(state): State<AppState>,
    Query(q): Query<ProcessesQuery>,
) -> Result<Json<hostprobe_core::models::ProcessList>, StatusCode> {
    let query = ProcessQuery {
        sort: parse_sort(q.sort.as_deref())?,
        limit: q.limit.unwrap_or(0),
        enable_cpu: !q.no_cpu.unwrap_or(false),
        cursor: q.cursor,
    };
    blocking(move || state.processes(&query, &CancelFlag::new())).await
}

async fn handle_system(
    State(state): State<AppState>,
) -> Result<Json<hostprobe_core::models::SystemSnapshot>, StatusCode> {
    blocking(move || state.system()).await
}

async fn handle_hardware(
    State(state): State<AppState>,
) -> Result<Json<hostprobe_core::models::HardwareInfo>, StatusCode> {
    blocking(move || state.hardware()).await
}

#[derive(Deserialize)]
struct GpuQuery {
    /// Comma-separated PCI ids to read temperatures for.
    pci_ids: Option<String>,
}

fn split_ids(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

async fn handle_gpu(
    State(state): State<AppState>,
    Query(q): Query<GpuQuery>,
) -> Result<Json<Vec<hostprobe_core::models::Gpu>>, StatusCode> {
    let ids = split_ids(q.pci_ids.as_deref());
    blocking(move || state.gpus_with_temp(&ids)).await
}

#[derive(Deserialize)]
struct GpuTempQuery {
    pci_id: Option<String>,
}

async fn handle_gpu_temp(
    State(state): State<AppState>,
    Query(q): Query<GpuTempQuery>,
) -> Result<Json<hostprobe_core::models::GpuTemp>, StatusCode> {
    let pci_id = q.pci_id.filter(|id| !id.is_empty()).ok_or(StatusCode::BAD_REQUEST)?;
    blocking(move || state.gpu_temp(&pci_id)).await
}

#[derive(Deserialize)]
struct MetaQuery {
    /// Comma-separated module names; defaults to `all`.
    modules: Option<String>,
    sort: Option<String>,
    limit: Option<usize>,
    no_cpu: Option<bool>,
    gpu_pci_ids: Option<String>,
    cpu_cursor: Option<String>,
    proc_cursor: Option<String>,
    net_cursor: Option<String>,
    disk_cursor: Option<String>,
}

async fn handle_meta(
    State(state): State<AppState>,
    Query(q): Query<MetaQuery>,
) -> Result<Json<MetaSnapshot>, StatusCode> {
    let names: Vec<String> = q
        .modules
        .as_deref()
        .unwrap_or("all")
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    let modules = Module::parse_set(&names).map_err(|e| {
        error!(error = %e, "rejected meta request");
        StatusCode::BAD_REQUEST
    })?;

    let params = MetaParams {
        sort: parse_sort(q.sort.as_deref())?,
        proc_limit: q.limit.unwrap_or(0),
        enable_proc_cpu: !q.no_cpu.unwrap_or(false),
        gpu_pci_ids: split_ids(q.gpu_pci_ids.as_deref()),
        cpu_cursor: q.cpu_cursor,
        proc_cursor: q.proc_cursor,
        net_cursor: q.net_cursor,
        disk_cursor: q.disk_cursor,
    };

    match tokio::task::spawn_blocking(move || state.meta(&modules, &params, &CancelFlag::new()))
        .await
    {
        Ok(meta) => Ok(Json(meta)),
        Err(e) => {
            error!(error = %e, "meta task failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ids_handles_lists_and_blanks() {
        assert_eq!(
            split_ids(Some("10de:2684, 1002:164e")),
            vec!["10de:2684".to_string(), "1002:164e".to_string()]
        );
        assert!(split_ids(Some("")).is_empty());
        assert!(split_ids(None).is_empty());
    }

    #[test]
    fn sort_parsing() {
        assert_eq!(parse_sort(None).unwrap(), ProcSortKey::Cpu);
        assert_eq!(parse_sort(Some("memory")).unwrap(), ProcSortKey::Memory);
        assert!(parse_sort(Some("bogus")).is_err());
    }
}
