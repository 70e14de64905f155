use std::{sync::Arc, time::Duration};

use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, trace};

use crate::{
    cache::{CacheValue, PendingFetch, QueryCache, ReadMode},
    error::{ClientError, RequestFailed},
    gateway::TransactionApi,
    keys::{KeyPrefix, QueryKey},
    retry::RetryPolicy,
};

mod mutations;
mod queries;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub query_retry: RetryPolicy,
    pub mutation_retry: RetryPolicy,
    /// Refetch observed stale entries when the host regains focus.
    pub refetch_on_focus: bool,
    pub read_mode: ReadMode,
    /// How often [`Maintenance`] refetches the health endpoint while someone
    /// subscribes to it. `None` disables polling.
    pub health_poll_interval: Option<Duration>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            query_retry: RetryPolicy::QUERY,
            mutation_retry: RetryPolicy::MUTATION,
            refetch_on_focus: false,
            read_mode: ReadMode::Blocking,
            health_poll_interval: Some(Duration::from_secs(60)),
        }
    }
}

/// Cached access to the transactions resource.
///
/// Reads go through the [`QueryCache`]; mutations call the gateway and then
/// bring every cached list in line with the result. Clones share the cache.
#[derive(Clone)]
pub struct TransactionStore {
    api: Arc<dyn TransactionApi>,
    cache: QueryCache,
    options: StoreOptions,
}

impl std::fmt::Debug for TransactionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TransactionStore {
    /// Return a builder for `TransactionStore`.
    pub fn builder(api: Arc<dyn TransactionApi>) -> TransactionStoreBuilder {
        TransactionStoreBuilder {
            api,
            cache: None,
            options: StoreOptions::default(),
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Same store and cache, answering stale reads according to `mode`.
    pub fn with_read_mode(&self, mode: ReadMode) -> Self {
        let mut store = self.clone();
        store.options.read_mode = mode;
        store
    }

    /// Host callback for the application regaining focus.
    pub fn on_focus_regained(&self) -> Vec<PendingFetch> {
        if !self.options.refetch_on_focus {
            return Vec::new();
        }
        debug!("focus regained");
        self.refetch_observed_stale()
    }

    /// Host callback for network connectivity coming back.
    pub fn on_connectivity_restored(&self) -> Vec<PendingFetch> {
        debug!("connectivity restored");
        self.refetch_observed_stale()
    }

    /// Refetches every cached key under `prefix`, fresh or not. The requests
    /// run to completion even if the returned handles are dropped.
    pub fn refetch_matching(&self, prefix: &KeyPrefix) -> Vec<PendingFetch> {
        self.cache
            .keys_matching(prefix)
            .into_iter()
            .map(|key| self.refetch(key))
            .collect()
    }

    /// Starts the periodic jobs of a long-lived host: garbage collection
    /// every `gc_time` and, when configured, health polling. They stop when
    /// the returned handle is dropped.
    pub fn spawn_maintenance(&self) -> Maintenance {
        let mut tasks = Vec::new();

        let cache = self.cache.clone();
        let gc_every = cache.config().gc_time;
        tasks.push(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + gc_every, gc_every);
            loop {
                ticks.tick().await;
                let evicted = cache.collect_garbage();
                trace!(evicted, "garbage collection");
            }
        }));

        if let Some(every) = self.options.health_poll_interval {
            let store = self.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticks = tokio::time::interval_at(Instant::now() + every, every);
                loop {
                    ticks.tick().await;
                    let observed = store
                        .cache
                        .read(&QueryKey::Health)
                        .is_some_and(|entry| entry.subscribers > 0);
                    if observed {
                        if let Err(err) = store.refetch(QueryKey::Health).await {
                            debug!("health poll failed: {err}");
                        }
                    }
                }
            }));
        }

        Maintenance { tasks }
    }

    fn refetch_observed_stale(&self) -> Vec<PendingFetch> {
        self.cache
            .active_stale_keys()
            .into_iter()
            .map(|key| self.refetch(key))
            .collect()
    }

    fn refetch(&self, key: QueryKey) -> PendingFetch {
        let load = self.load(&key);
        self.cache.refetch(key, move || load)
    }

    async fn read(&self, key: QueryKey) -> Result<CacheValue, RequestFailed> {
        let load = self.load(&key);
        self.cache.fetch(key, self.options.read_mode, move || load).await
    }

    /// Gateway request backing `key`, retried with the query policy.
    fn load(&self, key: &QueryKey) -> BoxFuture<'static, Result<CacheValue, RequestFailed>> {
        let api = Arc::clone(&self.api);
        let retry = self.options.query_retry;
        let key = key.clone();
        async move {
            match key {
                QueryKey::Health => retry
                    .run("health", || api.health())
                    .await
                    .map(CacheValue::Health),
                QueryKey::TransactionList(None) => retry
                    .run("list_all", || api.list_all())
                    .await
                    .map(CacheValue::Transactions),
                QueryKey::TransactionList(Some(params)) => retry
                    .run("list_paginated", || api.list_paginated(&params))
                    .await
                    .map(CacheValue::Page),
                QueryKey::TransactionDetail(id) => retry
                    .run("get", || api.get(&id))
                    .await
                    .map(CacheValue::Transaction),
            }
        }
        .boxed()
    }
}

/// Cache entry whose value does not belong to its key.
fn mismatch(key: &QueryKey, value: &CacheValue) -> RequestFailed {
    RequestFailed::local(ClientError::Decode {
        status: StatusCode::OK,
        message: format!("cache entry {key} holds {}", value.kind()),
    })
}

/// Background jobs started by [`TransactionStore::spawn_maintenance`].
/// Dropping it aborts them.
#[derive(Debug)]
pub struct Maintenance {
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for Maintenance {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// The builder for `TransactionStore`.
pub struct TransactionStoreBuilder {
    api: Arc<dyn TransactionApi>,
    cache: Option<QueryCache>,
    options: StoreOptions,
}

impl TransactionStoreBuilder {
    /// Share an existing cache. A default one is created otherwise.
    pub fn cache(mut self, cache: QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> TransactionStore {
        TransactionStore {
            api: self.api,
            cache: self.cache.unwrap_or_default(),
            options: self.options,
        }
    }
}
