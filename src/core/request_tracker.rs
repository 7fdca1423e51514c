use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Sliding-window thresholds for the per-address counters.
#[derive(Debug, Clone)]
pub struct TrackerLimits {
    /// Requests within `flood_window` before a flood is declared.
    pub flood_threshold: usize,
    pub flood_window: Duration,
    /// Failed login attempts within `login_window` before brute force is declared.
    pub login_threshold: usize,
    pub login_window: Duration,
    /// Distinct paths within `scan_window` before a directory scan is declared.
    pub scan_threshold: usize,
    pub scan_window: Duration,
}

impl Default for TrackerLimits {
    fn default() -> Self {
        Self {
            flood_threshold: 200,
            flood_window: Duration::from_secs(10),
            login_threshold: 10,
            login_window: Duration::from_secs(60),
            scan_threshold: 20,
            scan_window: Duration::from_secs(60),
        }
    }
}

/// Rolling activity for one address.
#[derive(Debug, Default)]
struct AddressActivity {
    /// Request instants inside the flood window.
    requests: VecDeque<Instant>,
    /// Login-attempt instants inside the brute-force window.
    login_attempts: VecDeque<Instant>,
    /// Path -> last access, pruned against the scan window.
    paths: HashMap<String, Instant>,
    last_seen: Option<Instant>,
}

/// Counts observed inside the current windows, taken after recording the
/// request being classified.
#[derive(Debug, Clone, Copy)]
pub struct ActivitySnapshot {
    pub request_count: usize,
    pub login_attempts: usize,
    pub distinct_paths: usize,
}

/// Per-address sliding-window counters backing the rate-based detection rules.
///
/// Owned by the classifier, separate from the blocklist. Stale per-address
/// state is evicted on an amortized schedule rather than by a background
/// sweep.
pub struct RequestTracker {
    limits: TrackerLimits,
    activity: Mutex<HashMap<String, AddressActivity>>,
    last_cleanup: Mutex<Instant>,
}

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

impl RequestTracker {
    pub fn new(limits: TrackerLimits) -> Self {
        Self {
            limits,
            activity: Mutex::new(HashMap::new()),
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    pub fn limits(&self) -> &TrackerLimits {
        &self.limits
    }

    /// Record one request and return the windowed counts including it.
    ///
    /// `login_attempt` marks requests that look like authentication attempts
    /// (the caller decides what qualifies).
    pub async fn observe(&self, ip: &str, path: &str, login_attempt: bool) -> ActivitySnapshot {
        let now = Instant::now();
        let mut activity = self.activity.lock().await;
        let entry = activity.entry(ip.to_string()).or_default();
        entry.last_seen = Some(now);

        entry.requests.push_back(now);
        prune_window(&mut entry.requests, now, self.limits.flood_window);

        if login_attempt {
            entry.login_attempts.push_back(now);
        }
        prune_window(&mut entry.login_attempts, now, self.limits.login_window);

        entry.paths.insert(path.to_string(), now);
        entry
            .paths
            .retain(|_, seen| now.duration_since(*seen) <= self.limits.scan_window);

        let snapshot = ActivitySnapshot {
            request_count: entry.requests.len(),
            login_attempts: entry.login_attempts.len(),
            distinct_paths: entry.paths.len(),
        };
        drop(activity);

        self.maybe_evict(now).await;
        snapshot
    }

    /// Drop addresses idle longer than the longest window. Runs at most once
    /// per `CLEANUP_INTERVAL`.
    async fn maybe_evict(&self, now: Instant) {
        let mut last_cleanup = self.last_cleanup.lock().await;
        if now.duration_since(*last_cleanup) < CLEANUP_INTERVAL {
            return;
        }
        *last_cleanup = now;
        drop(last_cleanup);

        let idle_cutoff = self
            .limits
            .flood_window
            .max(self.limits.login_window)
            .max(self.limits.scan_window);

        let mut activity = self.activity.lock().await;
        activity.retain(|_, entry| match entry.last_seen {
            Some(seen) => now.duration_since(seen) <= idle_cutoff,
            None => false,
        });
    }

    #[cfg(test)]
    pub async fn tracked_addresses(&self) -> usize {
        self.activity.lock().await.len()
    }
}

fn prune_window(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = events.front() {
        if now.duration_since(*front) > window {
            events.pop_front();
        } else {
            break;
        }
    }
}
