/*!
 * Redis-backed shared cache tier.
 *
 * Connects lazily so an unreachable Redis never prevents startup; every
 * operation is bounded by an operation timeout and reports
 * [`CacheError::Unavailable`] when the server cannot be reached.
 */

use async_trait::async_trait;
use log::{info, warn};
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::errors::CacheError;

use super::remote::{CacheResult, RemoteTier};

/// Shared cache tier on a Redis server
pub struct RedisTier {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
    operation_timeout: Duration,
}

impl std::fmt::Debug for RedisTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTier")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisTier {
    /// Create a tier for `url` (e.g. `redis://localhost:6379/1`). No connection is made yet.
    pub fn new(url: &str, operation_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Command(e.to_string()))?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            operation_timeout,
        })
    }

    async fn connection(&self) -> CacheResult<ConnectionManager> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = tokio::time::timeout(
            self.operation_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await
        .map_err(|_| CacheError::Unavailable("timed out connecting to redis".to_string()))??;

        info!("Connected to redis cache backend");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn run<T, F>(&self, op: F) -> CacheResult<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, op).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => {
                warn!("Redis operation timed out after {:?}", self.operation_timeout);
                Err(CacheError::Unavailable("redis operation timed out".to_string()))
            }
        }
    }
}

#[async_trait]
impl RemoteTier for RedisTier {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        self.run(async move {
            let blob: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
            Ok(blob)
        })
        .await
    }

    async fn add(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let ttl_secs = ttl.as_secs().max(1);
        self.run(async move {
            // SET NX replies OK when stored and nil when the key already exists
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value.as_slice())
                .arg("NX")
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await?;
            Ok(reply.is_some())
        })
        .await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        self.run(async move {
            let _removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
