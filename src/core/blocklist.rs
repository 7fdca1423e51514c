use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::verdict::AttackType;
use crate::utils::log_block_event;

/// State kept for one blocked address.
#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    /// Instant after which the block no longer applies.
    expires_at: Instant,
    /// The attack that triggered the block, reported back on repeat hits.
    attack_type: AttackType,
}

/// Time-bounded per-address enforcement state.
///
/// Entries are never deleted; they expire lazily by timestamp comparison at
/// read time. Memory stays bounded by the number of distinct offending
/// addresses seen since startup.
pub struct Blocklist {
    entries: RwLock<HashMap<String, BlockEntry>>,
}

impl Blocklist {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Block an address for `duration`, overwriting any existing entry.
    pub async fn block(&self, ip: &str, attack_type: AttackType, duration: Duration) {
        let entry = BlockEntry {
            expires_at: Instant::now() + duration,
            attack_type,
        };
        let mut entries = self.entries.write().await;
        entries.insert(ip.to_string(), entry);
        drop(entries);

        log_block_event(ip, attack_type.as_str(), duration.as_secs());
    }

    /// The attack that caused an active block, or `None` if the address is
    /// not blocked (or the block has expired).
    pub async fn active_block(&self, ip: &str) -> Option<AttackType> {
        let entries = self.entries.read().await;
        entries
            .get(ip)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.attack_type)
    }

    pub async fn is_blocked(&self, ip: &str) -> bool {
        self.active_block(ip).await.is_some()
    }

    /// Number of entries currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new()
    }
}
