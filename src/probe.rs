//! Database diagnostic behind `GET /debug`.
//!
//! `DebugProbe::run` never fails: every connectivity problem is folded into
//! `ProbeOutcome::Error` so the handler can always answer 200 with a JSON body.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{Settings, MONGODB_URI_ENV};
use crate::store::{EntriesConnector, RecentSample, ScopedConnection, StoreError};

/// Result of one probe, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeOutcome {
    Connected {
        total_documents: u64,
        recent_document_sample: Option<RecentSample>,
    },
    Error {
        error: String,
    },
}

/// Body returned by `/debug`.
///
/// Only the URI template is exposed, never the resolved connection string.
#[derive(Debug, Clone, Serialize)]
pub struct DebugStatus {
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
    pub mongodb_database: String,
    pub mongodb_uri_template: String,
    pub env_mongodb_uri_set: bool,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct DebugProbe {
    connector: Arc<dyn EntriesConnector>,
    timeout: Duration,
}

impl DebugProbe {
    pub fn new(connector: Arc<dyn EntriesConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    pub async fn run(&self, settings: &Settings) -> DebugStatus {
        let outcome = match tokio::time::timeout(self.timeout, self.query(settings)).await {
            Ok(Ok((total_documents, recent_document_sample))) => ProbeOutcome::Connected {
                total_documents,
                recent_document_sample,
            },
            Ok(Err(e)) => failed(settings, e),
            Err(_) => failed(settings, StoreError::Timeout(self.timeout)),
        };

        DebugStatus {
            outcome,
            mongodb_database: settings.mongodb_database.clone(),
            mongodb_uri_template: settings.mongodb_uri_template.clone(),
            env_mongodb_uri_set: env_uri_set(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    async fn query(
        &self,
        settings: &Settings,
    ) -> Result<(u64, Option<RecentSample>), StoreError> {
        let conn = ScopedConnection::acquire(
            self.connector.as_ref(),
            &settings.mongodb_uri(),
            &settings.mongodb_database,
        )
        .await?;

        let result = async {
            let count = conn.count_entries().await?;
            let latest = conn.latest_entry().await?;
            Ok::<_, StoreError>((count, latest))
        }
        .await;

        conn.release().await;
        result
    }
}

fn failed(settings: &Settings, err: StoreError) -> ProbeOutcome {
    let error = settings.redact(&err.to_string());
    tracing::warn!(error = %error, database = %settings.mongodb_database, "Debug probe failed");
    ProbeOutcome::Error { error }
}

fn env_uri_set() -> bool {
    std::env::var_os(MONGODB_URI_ENV).is_some_and(|v| !v.is_empty())
}
