/*!
 * The assembled request pipeline.
 *
 * - `dispatcher`: validation and routing of a single request
 * - `worker`: the background job handler for long texts
 * - `invalidator`: keeps the full-text cache consistent with stored records
 *
 * [`Pipeline`] wires these together with the cache, the store, the job queue
 * and an upstream provider.
 */

use anyhow::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::cache::{MemoryRemoteTier, RedisTier, RemoteTier, SystemClock, TwoTierCache};
use crate::database::{DatabaseConnection, Repository};
use crate::jobs::LocalJobQueue;
use crate::providers::Provider;
use crate::providers::openrouter::OpenRouter;
use crate::translation::TranslationService;

pub mod dispatcher;
pub mod invalidator;
pub mod worker;

pub use dispatcher::{DispatchOutcome, Dispatcher, TranslateRequest, TranslateResponse, ValidatedRequest, validate};
pub use invalidator::CacheInvalidator;
pub use worker::BackgroundWorker;

/// Bound on each shared cache round trip
const REMOTE_CACHE_TIMEOUT: Duration = Duration::from_secs(2);

/// All pipeline components, wired
pub struct Pipeline {
    dispatcher: Dispatcher,
    cache: Arc<TwoTierCache>,
    store: Arc<Repository>,
    queue: Arc<LocalJobQueue>,
}

impl Pipeline {
    /// Build the production pipeline: OpenRouter upstream, Redis or in-process
    /// shared tier, SQLite store
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = Arc::new(OpenRouter::new(config.openrouter())?);

        let remote: Arc<dyn RemoteTier> = match &config.cache_url {
            Some(url) => {
                info!("Using shared cache at {}", url);
                Arc::new(RedisTier::new(url, REMOTE_CACHE_TIMEOUT)?)
            }
            None => {
                info!("No shared cache configured, using an in-process tier");
                Arc::new(MemoryRemoteTier::default())
            }
        };
        let cache = Arc::new(TwoTierCache::new(remote, config.cache_ttls(), Arc::new(SystemClock)));

        let repository = match &config.database_path {
            Some(path) => Repository::new(DatabaseConnection::new(path)?),
            None => Repository::new_default()?,
        };

        Ok(Self::assemble(config, provider, cache, repository))
    }

    /// Wire the given components using the limits from `config`
    pub fn assemble(
        config: &Config,
        provider: Arc<dyn Provider>,
        cache: Arc<TwoTierCache>,
        repository: Repository,
    ) -> Self {
        repository.subscribe(Arc::new(CacheInvalidator::new(cache.clone())));
        let store = Arc::new(repository);

        let service = TranslationService::new(provider, cache.clone(), config.translation_options());
        let worker = BackgroundWorker::new(service.clone(), store.clone());
        let queue = Arc::new(
            LocalJobQueue::new(Arc::new(worker), config.job_retry()).with_retention(config.job_retention()),
        );
        let dispatcher = Dispatcher::new(service, store.clone(), queue.clone(), config.async_threshold);

        Self {
            dispatcher,
            cache,
            store,
            queue,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn cache(&self) -> &Arc<TwoTierCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<Repository> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<LocalJobQueue> {
        &self.queue
    }
}
