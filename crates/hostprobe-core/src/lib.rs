//! hostprobe-core — host telemetry sampling and rate-derivation engine.
//!
//! The engine reads raw counters from the Linux pseudo-filesystems, turns
//! monotonically-increasing counters into rates against a client-supplied
//! opaque cursor, and fans out over the requested module set in parallel.
//! All delta state lives in the cursor that is handed back to the caller,
//! so disconnected clients get correct rates without any server-side
//! session state.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Engine<P: Probes>                       │
//! │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌───────────┐ ┌───────┐  │
//! │  │   cpu   │ │ memory  │ │ disk/net │ │ processes │ │ gpu/hw│  │
//! │  └────┬────┘ └────┬────┘ └────┬─────┘ └─────┬─────┘ └───┬───┘  │
//! │       └───────────┴─────┬─────┴──────────────┴──────────┘      │
//! │                         │  dispatch::meta (parallel fan-out)   │
//! │                  ┌──────▼──────┐                               │
//! │                  │   Probes    │ (FileSystem + MountUsage      │
//! │                  └──────┬──────┘  + CommandRunner traits)      │
//! └─────────────────────────┼──────────────────────────────────────┘
//!                           │
//!               ┌───────────┼───────────┐
//!        ┌──────▼─────┐ ┌───▼──────┐ ┌──▼─────────┐
//!        │ RealProbes │ │MockProbes│ │ scenarios  │
//!        │ (Linux)    │ │ (tests)  │ │ (fixtures) │
//!        └────────────┘ └──────────┘ └────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use hostprobe_core::engine::Engine;
//! use hostprobe_core::probes::RealProbes;
//!
//! let engine = Engine::new(RealProbes::new());
//! let memory = engine.memory()?;
//! let cpu = engine.cpu(None, &Default::default())?;
//! // Feed cpu.cursor back into the next call for delta-based usage.
//! ```

pub mod cancel;
pub mod cursor;
pub mod dispatch;
pub mod engine;
pub mod fmt;
pub mod models;
pub mod probes;
pub mod thermal;

pub use cancel::CancelFlag;
pub use dispatch::{DispatchError, MetaParams, Module};
pub use engine::Engine;
pub use probes::{MockProbes, ProbeError, RealProbes};
