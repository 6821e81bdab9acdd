//! Database diagnostic endpoint.

use axum::{extract::State, Json};
use tracing::instrument;

use crate::probe::DebugStatus;
use crate::state::AppState;

/// Runs the store probe. Always answers 200; failures are reported in the body.
#[instrument(name = "debug::debug", skip(state))]
pub async fn debug(State(state): State<AppState>) -> Json<DebugStatus> {
    let status = state.probe.run(&state.settings).await;
    Json(status)
}
