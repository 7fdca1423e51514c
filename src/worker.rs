//! Background delivery worker: drains the log queue in bounded batches,
//! stages deduplicated upserts for storage, and forwards the ungrouped batch
//! to the downstream collector. Each sink fails independently; neither
//! failure reaches the decision path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::queue::LogQueue;
use crate::relay::RelayClient;
use crate::storage::{StagedRecord, VerdictStore};
use crate::utils::log_delivery;

const BATCH_SIZE: usize = 100;
const CYCLE_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one delivery cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    /// Records popped from the queue this cycle.
    pub drained: usize,
    /// Deduplicated records staged for storage.
    pub staged: usize,
    /// Whether the storage write succeeded (false also when no store is
    /// configured).
    pub persisted: bool,
    /// Whether the collector accepted the batch.
    pub forwarded: bool,
}

/// Recurring task relaying queued verdicts to storage and the collector.
pub struct DeliveryWorker {
    queue: Arc<LogQueue>,
    store: Option<Arc<dyn VerdictStore>>,
    relay: RelayClient,
}

impl DeliveryWorker {
    pub fn new(
        queue: Arc<LogQueue>,
        store: Option<Arc<dyn VerdictStore>>,
        relay: RelayClient,
    ) -> Self {
        Self { queue, store, relay }
    }

    /// Start the delivery loop. The loop runs one cycle at a time; a shutdown
    /// signal is honored between cycles, never mid-cycle, so a batch is
    /// always fully attempted at each sink or not attempted at all.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                queue_backend = %self.queue.backend_name(),
                collector = %self.relay.url(),
                storage = %self.store.is_some(),
                "delivery worker started"
            );
            let mut ticker = tokio::time::interval(CYCLE_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }
                self.drain_once().await;
            }
            tracing::info!("delivery worker stopped");
        })
    }

    /// Run one delivery cycle: pop, stage, persist, forward.
    pub async fn drain_once(&self) -> CycleReport {
        let batch = self.queue.pop_batch(BATCH_SIZE).await;
        if batch.is_empty() {
            return CycleReport::default();
        }

        let mut report = CycleReport {
            drained: batch.len(),
            ..CycleReport::default()
        };
        metrics::counter!("delivery_records_total", batch.len() as u64);

        // Stage upserts: later records for the same (ip, attack, minute)
        // bucket overwrite earlier ones.
        let mut staged: HashMap<String, StagedRecord> = HashMap::new();
        for verdict in &batch {
            let id = verdict.dedup_key();
            staged.insert(
                id.clone(),
                StagedRecord {
                    id,
                    verdict: verdict.clone(),
                },
            );
        }
        let staged: Vec<StagedRecord> = staged.into_values().collect();
        report.staged = staged.len();

        if let Some(store) = &self.store {
            match store.upsert_batch(&staged).await {
                Ok(()) => report.persisted = true,
                Err(e) => {
                    metrics::counter!("storage_failures_total", 1);
                    tracing::error!(error = %e, staged = %staged.len(), "storage write failed");
                }
            }
        }

        // The collector receives the batch as popped, not the deduplicated
        // form, and regardless of the storage outcome. One attempt only.
        match self.relay.forward(&batch).await {
            Ok(()) => report.forwarded = true,
            Err(e) => {
                metrics::counter!("relay_failures_total", 1);
                tracing::error!(error = %e, count = %batch.len(), "forwarding failed, batch dropped");
            }
        }

        log_delivery(report.drained, report.staged, report.persisted, report.forwarded);
        report
    }
}
