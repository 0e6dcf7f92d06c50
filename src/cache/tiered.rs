/*!
 * Two-tier translation cache.
 *
 * L1 is a process-local [`LocalTier`]; L2 is any [`RemoteTier`]. Full-text
 * and chunk keys live in separate L1 maps and carry their own TTLs. L2
 * failures never reach the caller: reads degrade to a miss and writes or
 * deletes become logged no-ops.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::key::{CacheKey, KeyNamespace};
use super::local::{Clock, LocalTier, SystemClock};
use super::remote::{MemoryRemoteTier, RemoteTier, compress, decompress};

/// Time-to-live settings per tier and namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// L1 lifetime of full-text entries
    pub local: Duration,
    /// L1 and L2 lifetime of chunk entries
    pub chunk: Duration,
    /// L2 lifetime of full-text entries
    pub remote: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            local: Duration::from_secs(300),
            chunk: Duration::from_secs(3600),
            remote: Duration::from_secs(3600),
        }
    }
}

/// L1 in front of L2, with per-namespace sub-caches
#[derive(Debug)]
pub struct TwoTierCache {
    full_text: LocalTier,
    chunks: LocalTier,
    remote: Arc<dyn RemoteTier>,
    ttls: CacheTtls,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl TwoTierCache {
    pub fn new(remote: Arc<dyn RemoteTier>, ttls: CacheTtls, clock: Arc<dyn Clock>) -> Self {
        Self {
            full_text: LocalTier::new(clock.clone()),
            chunks: LocalTier::new(clock),
            remote,
            ttls,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Cache backed only by process memory
    pub fn in_memory(ttls: CacheTtls) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new(Arc::new(MemoryRemoteTier::new(clock.clone())), ttls, clock)
    }

    fn local_for(&self, key: &CacheKey) -> &LocalTier {
        match key.namespace() {
            KeyNamespace::Translation => &self.full_text,
            KeyNamespace::Chunk => &self.chunks,
        }
    }

    fn local_ttl(&self, key: &CacheKey) -> Duration {
        match key.namespace() {
            KeyNamespace::Translation => self.ttls.local,
            KeyNamespace::Chunk => self.ttls.chunk,
        }
    }

    fn remote_ttl(&self, key: &CacheKey) -> Duration {
        match key.namespace() {
            KeyNamespace::Translation => self.ttls.remote,
            KeyNamespace::Chunk => self.ttls.chunk,
        }
    }

    /// L1 lifetime for an entry whose L2 lifetime is `remote_ttl`.
    ///
    /// L1 never outlives the L2 entry it mirrors.
    fn effective_local_ttl(&self, key: &CacheKey, remote_ttl: Duration) -> Duration {
        self.local_ttl(key).min(remote_ttl)
    }

    /// Look a key up in L1, then L2. An L2 hit is copied into L1.
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let id = key.to_string();
        let local = self.local_for(key);

        if let Some(value) = local.get(&id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("L1 hit for {}", id);
            return Some(value);
        }

        let value = match self.remote.get(&id).await {
            Ok(Some(blob)) => match decompress(&blob) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Unreadable {} cache entry {}: {}", self.remote.name(), id, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("{} cache read failed for {}: {}", self.remote.name(), id, e);
                None
            }
        };

        match value {
            Some(value) if !value.is_empty() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("L2 hit for {}", id);
                let local_ttl = self.effective_local_ttl(key, self.remote_ttl(key));
                local.set(&id, &value, Some(local_ttl));
                Some(value)
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", id);
                None
            }
        }
    }

    /// Write L1 unconditionally and L2 only if the key is unset there.
    ///
    /// `ttl` overrides the namespace's L2 lifetime and bounds the L1 lifetime.
    /// When another writer already owns the L2 entry, L1 is aligned to that
    /// value so both tiers agree on the first writer.
    pub async fn set(&self, key: &CacheKey, value: &str, ttl: Option<Duration>) {
        let id = key.to_string();
        let local = self.local_for(key);
        let ttl = ttl.unwrap_or_else(|| self.remote_ttl(key));
        let local_ttl = self.effective_local_ttl(key, ttl);
        local.set(&id, value, Some(local_ttl));

        let blob = match compress(value) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to compress cache value for {}: {}", id, e);
                return;
            }
        };

        match self.remote.add(&id, blob, ttl).await {
            Ok(true) => debug!("Stored {} in {} cache", id, self.remote.name()),
            Ok(false) => {
                if let Ok(Some(existing)) = self.remote.get(&id).await {
                    if let Ok(winner) = decompress(&existing) {
                        if winner != value {
                            debug!("Earlier writer owns {}, aligning L1", id);
                            local.set(&id, &winner, Some(local_ttl));
                        }
                    }
                }
            }
            Err(e) => warn!("{} cache write failed for {}: {}", self.remote.name(), id, e),
        }
    }

    /// Remove a key from both tiers; L2 failure is only logged
    pub async fn delete(&self, key: &CacheKey) {
        let id = key.to_string();
        self.local_for(key).delete(&id);

        if let Err(e) = self.remote.delete(&id).await {
            warn!("{} cache delete failed for {}: {}", self.remote.name(), id, e);
        }
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }
}
