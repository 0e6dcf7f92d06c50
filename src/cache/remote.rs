/*!
 * Shared cache tier (L2) abstraction.
 *
 * L2 stores compressed byte blobs and enforces TTLs itself. Writes are
 * insert-if-absent only. Two variants exist: [`MemoryRemoteTier`] for
 * single-process deployments and tests, and
 * [`RedisTier`](super::redis_tier::RedisTier) for a shared network store.
 */

use async_trait::async_trait;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::errors::CacheError;

use super::local::{Clock, SweepSchedule, SystemClock};

/// Result type for L2 operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Byte-level shared cache backend
#[async_trait]
pub trait RemoteTier: Send + Sync + std::fmt::Debug {
    /// Fetch a blob
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a blob only if the key is unset. Returns whether this call stored it.
    async fn add(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<bool>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// zlib-compress a cache value
pub fn compress(value: &str) -> CacheResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(value.as_bytes())
        .map_err(|e| CacheError::Codec(e.to_string()))?;
    encoder.finish().map_err(|e| CacheError::Codec(e.to_string()))
}

/// Decode an L2 blob.
///
/// Blobs written before compression was introduced are plain UTF-8, so a
/// blob that does not inflate is read as raw text.
pub fn decompress(blob: &[u8]) -> CacheResult<String> {
    let mut decoder = ZlibDecoder::new(blob);
    let mut inflated = String::new();
    match decoder.read_to_string(&mut inflated) {
        Ok(_) => Ok(inflated),
        Err(_) => String::from_utf8(blob.to_vec()).map_err(|e| CacheError::Codec(e.to_string())),
    }
}

#[derive(Debug)]
struct RemoteEntry {
    blob: Vec<u8>,
    expires_at: Instant,
}

/// In-process stand-in for a shared store, with store-side TTLs.
///
/// Expired blobs are dropped when read and swept on writes, at most once per
/// [`SWEEP_INTERVAL`](super::local::SWEEP_INTERVAL).
#[derive(Debug, Clone)]
pub struct MemoryRemoteTier {
    entries: Arc<RwLock<HashMap<String, RemoteEntry>>>,
    clock: Arc<dyn Clock>,
    available: Arc<AtomicBool>,
    sweep: SweepSchedule,
}

impl MemoryRemoteTier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            sweep: SweepSchedule::starting_at(clock.now()),
            clock,
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored blobs, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Raw access for tests that need to plant legacy payloads
    pub fn insert_raw(&self, key: &str, blob: Vec<u8>, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries
            .write()
            .insert(key.to_string(), RemoteEntry { blob, expires_at });
    }

    fn check_available(&self) -> CacheResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("memory store offline".to_string()))
        }
    }
}

impl Default for MemoryRemoteTier {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl RemoteTier for MemoryRemoteTier {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.check_available()?;
        let now = self.clock.now();

        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.blob.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn add(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<bool> {
        self.check_available()?;
        let now = self.clock.now();

        let mut entries = self.entries.write();
        if self.sweep.claim(now) {
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at > now);
            if entries.len() < before {
                debug!("L2 sweep purged {} expired blobs", before - entries.len());
            }
        }

        if let Some(entry) = entries.get(key) {
            if entry.expires_at > now {
                debug!("L2 add skipped, key present: {}", key);
                return Ok(false);
            }
        }
        entries.insert(
            key.to_string(),
            RemoteEntry {
                blob: value,
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check_available()?;
        self.entries.write().remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
