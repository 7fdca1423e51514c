//! Durable-preferred, volatile-fallback buffer of serialized verdict records.
//!
//! The preferred backend is a Redis list; when it is unreachable at startup
//! the queue runs on an in-process buffer instead. A push failure against
//! Redis mid-run redirects the record to the same in-process buffer, so a
//! push never fails the caller and no verdict is silently lost to a transient
//! backend error. Records spilled this way survive only as long as the
//! process does.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;

use crate::config::QueueConfig;
use crate::core::Verdict;
use crate::utils::log_backend_event;

enum Backend {
    Redis(ConnectionManager),
    Memory,
}

/// FIFO buffer of verdict records with downgrade-on-failure semantics.
pub struct LogQueue {
    backend: Backend,
    key: String,
    /// In-process FIFO: the active buffer in memory mode, the spill target
    /// when a Redis push fails.
    buffer: Mutex<VecDeque<String>>,
}

impl LogQueue {
    /// Probe the preferred backend and settle on it or the in-process
    /// fallback. The choice is fixed for the lifetime of the queue.
    pub async fn connect(config: &QueueConfig) -> Self {
        match Self::probe(config).await {
            Ok(conn) => {
                log_backend_event("queue", "redis_backend_active", true, Some(&config.url));
                Self {
                    backend: Backend::Redis(conn),
                    key: config.key.clone(),
                    buffer: Mutex::new(VecDeque::new()),
                }
            }
            Err(e) => {
                log_backend_event(
                    "queue",
                    "memory_backend_active",
                    true,
                    Some(&format!("redis unreachable: {}", e)),
                );
                Self::in_memory(&config.key)
            }
        }
    }

    /// Queue backed purely by the in-process buffer.
    pub fn in_memory(key: &str) -> Self {
        Self {
            backend: Backend::Memory,
            key: key.to_string(),
            buffer: Mutex::new(VecDeque::new()),
        }
    }

    async fn probe(config: &QueueConfig) -> Result<ConnectionManager, redis::RedisError> {
        let client = redis::Client::open(config.url.as_str())?;
        let connect = ConnectionManager::new(client);
        let mut conn = tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            connect,
        )
        .await
        .map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::IoError, "connection probe timed out"))
        })??;

        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(conn)
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Redis(_) => "redis",
            Backend::Memory => "memory",
        }
    }

    /// Append one record. Never fails the caller: a Redis error redirects the
    /// record to the in-process buffer.
    pub async fn push(&self, verdict: &Verdict) {
        let json = match serde_json::to_string(verdict) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize verdict, record dropped");
                return;
            }
        };

        if let Backend::Redis(conn) = &self.backend {
            let mut conn = conn.clone();
            match conn.lpush::<_, _, ()>(&self.key, &json).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "redis push failed, spilling to in-process buffer");
                }
            }
        }

        self.buffer.lock().await.push_back(json);
    }

    /// Pop up to `max` records in FIFO order.
    ///
    /// Reads the preferred backend first and returns its batch alone; the
    /// fallback buffer is drained only when the preferred backend yields
    /// nothing (or errors). The two sources are never mixed in one call, so
    /// per-source ordering stays intact.
    pub async fn pop_batch(&self, max: usize) -> Vec<Verdict> {
        let Some(count) = NonZeroUsize::new(max) else {
            return Vec::new();
        };

        if let Backend::Redis(conn) = &self.backend {
            let mut conn = conn.clone();
            match conn
                .rpop::<_, Vec<String>>(&self.key, Some(count))
                .await
            {
                Ok(items) if !items.is_empty() => return parse_records(items),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "redis pop failed, reading in-process buffer");
                }
            }
        }

        let mut buffer = self.buffer.lock().await;
        let take = max.min(buffer.len());
        let items: Vec<String> = buffer.drain(..take).collect();
        drop(buffer);
        parse_records(items)
    }

    /// Records currently sitting in the in-process buffer.
    pub async fn buffered_len(&self) -> usize {
        self.buffer.lock().await.len()
    }
}

fn parse_records(items: Vec<String>) -> Vec<Verdict> {
    items
        .into_iter()
        .filter_map(|json| match serde_json::from_str::<Verdict>(&json) {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed queued record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Classification, DecisionRequest};

    fn verdict(ip: &str, timestamp: i64) -> Verdict {
        let request = DecisionRequest::new(ip, "/", "GET");
        Verdict::from_classification(&request, Classification::allow(), timestamp)
    }

    #[test]
    fn memory_queue_is_fifo() {
        tokio_test::block_on(async {
            let queue = LogQueue::in_memory("test_queue");
            queue.push(&verdict("1.1.1.1", 1)).await;
            queue.push(&verdict("2.2.2.2", 2)).await;
            queue.push(&verdict("3.3.3.3", 3)).await;

            let batch = queue.pop_batch(2).await;
            assert_eq!(batch.len(), 2);
            assert_eq!(batch[0].ip, "1.1.1.1");
            assert_eq!(batch[1].ip, "2.2.2.2");

            let rest = queue.pop_batch(10).await;
            assert_eq!(rest.len(), 1);
            assert_eq!(rest[0].ip, "3.3.3.3");

            assert!(queue.pop_batch(10).await.is_empty());
        });
    }

    #[test]
    fn zero_sized_batch_is_empty() {
        tokio_test::block_on(async {
            let queue = LogQueue::in_memory("test_queue");
            queue.push(&verdict("1.1.1.1", 1)).await;
            assert!(queue.pop_batch(0).await.is_empty());
            assert_eq!(queue.buffered_len().await, 1);
        });
    }

    #[test]
    fn malformed_records_are_skipped() {
        tokio_test::block_on(async {
            let queue = LogQueue::in_memory("test_queue");
            queue.push(&verdict("1.1.1.1", 1)).await;
            queue.buffer.lock().await.push_back("not json".to_string());
            queue.push(&verdict("2.2.2.2", 2)).await;

            let batch = queue.pop_batch(10).await;
            assert_eq!(batch.len(), 2);
            assert_eq!(batch[1].ip, "2.2.2.2");
        });
    }
}
