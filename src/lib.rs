//! loopy-api: service health and diagnostics for a MongoDB-backed CGM data API.
//!
//! Exposes `/health` and `/ping` liveness probes and a `/debug` probe that checks
//! connectivity to the `entries` collection and samples its most recent reading.

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod probe;
pub mod routes;
pub mod state;
pub mod store;

pub use config::{ConfigError, Settings};
pub use probe::{DebugProbe, DebugStatus, ProbeOutcome};
pub use routes::create_router;
pub use state::AppState;
