use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use crate::cache::TwoTierCache;
use crate::database::{RecordEvent, RecordListener};

/// Drops a record's full-text cache entry whenever the record is created or deleted
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    cache: Arc<TwoTierCache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<TwoTierCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl RecordListener for CacheInvalidator {
    async fn on_record_event(&self, event: &RecordEvent) {
        let key = event.record().cache_key();
        debug!("Invalidating {} after {}", key, event);
        self.cache.delete(&key).await;
    }
}
