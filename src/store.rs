//! Read-only access to the CGM `entries` collection.
//!
//! The probe talks to the store through `EntriesConnector`, which hands out one
//! connection per call. `ScopedConnection` guarantees the connection is closed on
//! every exit path: explicitly via `release`, or from `Drop` when the owning future
//! is cancelled or unwinds before reaching it.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::Serialize;

use crate::config::{ENTRIES_COLLECTION, SERVICE_NAME};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection unavailable: {0}")]
    Unavailable(String),
}

/// Fields of the most recent reading exposed by `/debug`.
///
/// Absent fields serialize as `null` rather than being omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecentSample {
    pub sgv: Option<serde_json::Value>,
    pub date: Option<serde_json::Value>,
    #[serde(rename = "dateString")]
    pub date_string: Option<serde_json::Value>,
}

impl RecentSample {
    pub fn from_document(doc: &Document) -> Self {
        let field = |name: &str| doc.get(name).cloned().map(Bson::into_relaxed_extjson);
        Self {
            sgv: field("sgv"),
            date: field("date"),
            date_string: field("dateString"),
        }
    }
}

/// Opens request-scoped connections to the CGM store.
#[async_trait]
pub trait EntriesConnector: Send + Sync {
    async fn connect(
        &self,
        uri: &str,
        database: &str,
    ) -> Result<Box<dyn EntriesConnection>, StoreError>;
}

/// A live connection to the `entries` collection.
#[async_trait]
pub trait EntriesConnection: Send + Sync {
    /// Number of documents in the collection
    async fn count_entries(&self) -> Result<u64, StoreError>;

    /// Document with the greatest `date`, if any
    async fn latest_entry(&self) -> Result<Option<RecentSample>, StoreError>;

    /// Release the connection and its background resources
    async fn close(self: Box<Self>);
}

/// Connection that is closed when released or dropped.
pub struct ScopedConnection {
    conn: Option<Box<dyn EntriesConnection>>,
}

impl ScopedConnection {
    pub async fn acquire(
        connector: &dyn EntriesConnector,
        uri: &str,
        database: &str,
    ) -> Result<Self, StoreError> {
        let conn = connector.connect(uri, database).await?;
        Ok(Self { conn: Some(conn) })
    }

    fn get(&self) -> Result<&dyn EntriesConnection, StoreError> {
        self.conn
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("connection already released".to_string()))
    }

    pub async fn count_entries(&self) -> Result<u64, StoreError> {
        self.get()?.count_entries().await
    }

    pub async fn latest_entry(&self) -> Result<Option<RecentSample>, StoreError> {
        self.get()?.latest_entry().await
    }

    /// Close the connection, waiting for the close to finish.
    pub async fn release(mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close().await;
        }
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!("Connection dropped without release, closing in background");
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move { conn.close().await });
                }
                Err(_) => tracing::warn!("No runtime available to close dropped connection"),
            }
        }
    }
}

/// `EntriesConnector` backed by the MongoDB driver.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    timeout: Duration,
}

impl MongoConnector {
    /// Server selection and connect attempts are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl EntriesConnector for MongoConnector {
    async fn connect(
        &self,
        uri: &str,
        database: &str,
    ) -> Result<Box<dyn EntriesConnection>, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some(SERVICE_NAME.to_string());
        options.connect_timeout = Some(self.timeout);
        options.server_selection_timeout = Some(self.timeout);

        let client = Client::with_options(options)?;
        let collection = client
            .database(database)
            .collection::<Document>(ENTRIES_COLLECTION);

        tracing::debug!(database, collection = ENTRIES_COLLECTION, "Opened MongoDB client");
        Ok(Box::new(MongoConnection { client, collection }))
    }
}

struct MongoConnection {
    client: Client,
    collection: Collection<Document>,
}

#[async_trait]
impl EntriesConnection for MongoConnection {
    async fn count_entries(&self) -> Result<u64, StoreError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn latest_entry(&self) -> Result<Option<RecentSample>, StoreError> {
        let latest = self
            .collection
            .find_one(doc! {})
            .sort(doc! { "date": -1 })
            .await?;
        Ok(latest.as_ref().map(RecentSample::from_document))
    }

    async fn close(self: Box<Self>) {
        let MongoConnection { client, collection } = *self;
        drop(collection);
        client.shutdown().await;
        tracing::debug!("Closed MongoDB client");
    }
}
