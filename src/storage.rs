//! Persistent verdict storage with upsert-by-key semantics.
//!
//! Storage is an optional collaborator: the engine runs correctly with it
//! entirely absent, and a failed write is logged by the delivery worker
//! without blocking downstream forwarding.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, UpdateOneModel, WriteModel};
use mongodb::{Client, Namespace};

use crate::config::StorageConfig;
use crate::core::Verdict;
use crate::utils::{log_backend_event, EngineResult};

/// One deduplicated record staged for upsert: the dedup key is the document
/// identity, so repeated identical verdicts within a minute bucket collapse
/// into a single stored document (last write wins).
#[derive(Debug, Clone)]
pub struct StagedRecord {
    pub id: String,
    pub verdict: Verdict,
}

/// Sink for staged verdict batches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerdictStore: Send + Sync {
    async fn upsert_batch(&self, records: &[StagedRecord]) -> EngineResult<()>;
}

/// MongoDB-backed store writing each batch as one bulk operation.
pub struct MongoStore {
    client: Client,
    namespace: Namespace,
}

impl MongoStore {
    /// Connect and ping with a bounded server-selection timeout. A failure
    /// here leaves the engine storeless; the caller decides how to degrade.
    pub async fn connect(config: &StorageConfig, uri: &str) -> EngineResult<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.server_selection_timeout = Some(Duration::from_secs(2));
        let client = Client::with_options(options)?;

        // Force a round trip so an unreachable server fails now, not on the
        // first delivery cycle.
        client
            .database(&config.database)
            .run_command(doc! {"ping": 1})
            .await?;

        log_backend_event("storage", "mongodb_connected", true, Some(&config.database));
        Ok(Self {
            client,
            namespace: Namespace {
                db: config.database.clone(),
                coll: config.collection.clone(),
            },
        })
    }
}

#[async_trait]
impl VerdictStore for MongoStore {
    async fn upsert_batch(&self, records: &[StagedRecord]) -> EngineResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut models = Vec::with_capacity(records.len());
        for record in records {
            let mut document = bson::to_document(&record.verdict)?;
            document.insert("_id", record.id.clone());
            models.push(WriteModel::UpdateOne(
                UpdateOneModel::builder()
                    .namespace(self.namespace.clone())
                    .filter(doc! {"_id": &record.id})
                    .update(doc! {"$set": document})
                    .upsert(true)
                    .build(),
            ));
        }

        self.client.bulk_write(models).await?;
        Ok(())
    }
}
