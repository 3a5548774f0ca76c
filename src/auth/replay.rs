//! Bounded in-memory nonce cache for replay attack prevention.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use super::clock::Clock;

/// Default nonce retention window.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of tracked nonces.
pub const DEFAULT_NONCE_CAPACITY: usize = 10_000;

#[derive(Default)]
struct NonceTable {
    /// Map of nonce -> expiry (unix seconds).
    live: HashMap<String, i64>,
    /// Insertion order. May hold stale entries whose nonce was re-inserted
    /// after expiring; those are skipped when popped.
    order: VecDeque<(String, i64)>,
}

impl NonceTable {
    /// Pop the oldest queue entry, removing it from the map if it is still
    /// the live record for that nonce. Returns whether a live record went.
    fn pop_oldest(&mut self) -> Option<bool> {
        let (nonce, expires_at) = self.order.pop_front()?;
        if self.live.get(&nonce) == Some(&expires_at) {
            self.live.remove(&nonce);
            Some(true)
        } else {
            Some(false)
        }
    }

    /// Pop expired records off the head of the insertion queue. With a
    /// fixed TTL the queue is also expiry-ordered, so this stops at the
    /// first live entry.
    fn purge_head(&mut self, now: i64) -> usize {
        let mut removed = 0;
        while let Some((_, expires_at)) = self.order.front() {
            if *expires_at > now {
                break;
            }
            if self.pop_oldest() == Some(true) {
                removed += 1;
            }
        }
        removed
    }

    /// Full sweep, also catching records inserted while the wall clock ran
    /// backwards and so sitting behind a younger head.
    fn purge_all(&mut self, now: i64) -> usize {
        let mut removed = self.purge_head(now);
        let before = self.live.len();
        self.live.retain(|_, expires_at| *expires_at > now);
        removed += before - self.live.len();
        let live = &self.live;
        self.order
            .retain(|(nonce, expires_at)| live.get(nonce) == Some(expires_at));
        removed
    }
}

/// Thread-safe nonce store with TTL expiry and a hard size bound.
///
/// The only way in is [`check_and_record`](Self::check_and_record), which
/// tests and inserts under a single lock so two concurrent requests with the
/// same nonce can never both be accepted.
pub struct ReplayGuard {
    table: Mutex<NonceTable>,
    ttl: i64,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl ReplayGuard {
    /// Create a new guard with the given TTL and capacity.
    pub fn new(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Mutex::new(NonceTable::default()),
            ttl: ttl.as_secs() as i64,
            capacity: capacity.max(1),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, NonceTable> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(), // Recover from mutex poisoning
        }
    }

    /// Record `nonce` if it has not been seen within the retention window.
    ///
    /// Returns `true` if the nonce is new, `false` if a live record already
    /// exists (in which case nothing is changed).
    pub fn check_and_record(&self, nonce: &str) -> bool {
        let now = self.clock.now();
        let mut table = self.lock();

        table.purge_head(now);

        if let Some(expires_at) = table.live.get(nonce) {
            if *expires_at > now {
                return false;
            }
        }

        // Evict oldest-inserted until there is room
        while table.live.len() >= self.capacity {
            match table.pop_oldest() {
                Some(true) => {
                    debug!(capacity = self.capacity, "Nonce cache full, evicted oldest entry");
                }
                Some(false) => {}
                None => break,
            }
        }

        let expires_at = now + self.ttl;
        table.live.insert(nonce.to_string(), expires_at);
        table.order.push_back((nonce.to_string(), expires_at));
        true
    }

    /// Drop every record whose expiry has passed. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.lock().purge_all(now)
    }

    /// Get the current number of live records (for monitoring).
    pub fn len(&self) -> usize {
        self.lock().live.len()
    }

    /// Check if the guard holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a background sweep.
    ///
    /// This spawns a tokio task that periodically purges expired nonces.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let guard = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                let removed = guard.purge_expired();
                if removed > 0 {
                    debug!(removed, "Purged expired nonces");
                }
            }
        });
    }
}
