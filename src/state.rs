//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::Settings;
use crate::probe::DebugProbe;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Settings are read-only after startup; the probe owns the store connector.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub probe: DebugProbe,
}

impl AppState {
    pub fn new(settings: Settings, probe: DebugProbe) -> Self {
        Self {
            settings: Arc::new(settings),
            probe,
        }
    }
}
