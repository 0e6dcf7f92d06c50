/*!
 * Process-local cache tier (L1).
 *
 * Plain strings with wall-clock expiry. An expired entry is evicted when it
 * is read, and writes sweep every expired entry at most once per
 * [`SWEEP_INTERVAL`]. Time comes from an injectable [`Clock`] so expiry can
 * be tested without sleeping.
 */

use log::debug;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current instant
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// Real monotonic clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Minimum time between two sweeps of a store's expired entries
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Decides when an expiring store is due for a full sweep
#[derive(Debug, Clone)]
pub(crate) struct SweepSchedule {
    next: Arc<Mutex<Instant>>,
}

impl SweepSchedule {
    /// First sweep is due immediately
    pub(crate) fn starting_at(now: Instant) -> Self {
        Self {
            next: Arc::new(Mutex::new(now)),
        }
    }

    /// Whether a sweep should run now; claims the slot if so
    pub(crate) fn claim(&self, now: Instant) -> bool {
        let mut next = self.next.lock();
        if now < *next {
            return false;
        }
        *next = now + SWEEP_INTERVAL;
        true
    }
}

#[derive(Debug, Clone)]
struct LocalEntry {
    value: String,
    /// `None` never expires
    expires_at: Option<Instant>,
}

impl LocalEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process expiring string map
#[derive(Debug, Clone)]
pub struct LocalTier {
    entries: Arc<RwLock<HashMap<String, LocalEntry>>>,
    clock: Arc<dyn Clock>,
    sweep: SweepSchedule,
}

impl LocalTier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            sweep: SweepSchedule::starting_at(clock.now()),
            clock,
        }
    }

    /// Get a live value, evicting it if it has expired
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a writer may have refreshed it
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
            entries.remove(key);
            debug!("L1 entry expired: {}", key);
        }
        None
    }

    /// Store a value, replacing any previous one. `ttl` of `None` never expires.
    pub fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let now = self.clock.now();
        let expires_at = ttl.map(|ttl| now + ttl);
        let mut entries = self.entries.write();

        if self.sweep.claim(now) {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            if entries.len() < before {
                debug!("L1 sweep evicted {} expired entries", before - entries.len());
            }
        }

        entries.insert(
            key.to_string(),
            LocalEntry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Number of stored entries, including ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for LocalTier {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
