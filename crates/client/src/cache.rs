//! In-memory query cache.
//!
//! Entries are addressed by [`QueryKey`] and carry their last result, the
//! instant it was stored, an invalidation flag and the set of subscribed
//! listeners. Each entry tracks at most one fetch: later readers attach to
//! it. Writing or invalidating an entry disowns its fetch, whose result is
//! then discarded.
//!
//! Fetches run on spawned tasks, so a reader that goes away never cancels a
//! request; the result still lands in the cache.
//!
//! Listeners are called synchronously by the operation that changed the
//! entry, after the internal lock has been released.
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use api_types::{
    health::Health,
    pagination::TransactionPage,
    transaction::Transaction,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{
    error::{ClientError, RequestFailed},
    keys::{KeyPrefix, QueryKey},
};

pub type Listener = Arc<dyn Fn(CacheEvent) + Send + Sync>;

/// Handle on a running fetch. Cloning it attaches another waiter.
pub type PendingFetch = Shared<BoxFuture<'static, Result<CacheValue, RequestFailed>>>;

#[derive(Clone, Debug, PartialEq)]
pub enum CacheValue {
    Health(Health),
    Transactions(Vec<Transaction>),
    Page(TransactionPage),
    Transaction(Transaction),
}

impl CacheValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Health(_) => "health",
            Self::Transactions(_) => "transactions",
            Self::Page(_) => "page",
            Self::Transaction(_) => "transaction",
        }
    }

    /// The records held by a list entry.
    pub fn transactions(&self) -> Option<&[Transaction]> {
        match self {
            Self::Transactions(list) => Some(list),
            Self::Page(page) => Some(&page.data),
            _ => None,
        }
    }

    /// Rebuilds a list entry from `f`'s output, keeping page metadata.
    /// Returns `None` when this is not a list or `f` declines the change.
    pub fn map_transactions<F>(&self, f: F) -> Option<CacheValue>
    where
        F: FnOnce(&[Transaction]) -> Option<Vec<Transaction>>,
    {
        match self {
            Self::Transactions(list) => f(list).map(Self::Transactions),
            Self::Page(page) => f(&page.data).map(|data| {
                Self::Page(TransactionPage {
                    data,
                    pagination: page.pagination.clone(),
                })
            }),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    Updated,
    Invalidated,
    Removed,
}

/// What a reader wants when the entry is stale but holds data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Wait for the refetch.
    #[default]
    Blocking,
    /// Return the stale data now and refresh in the background.
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub list_stale_time: Duration,
    pub detail_stale_time: Duration,
    pub health_stale_time: Duration,
    /// How long an entry without subscribers survives garbage collection.
    pub gc_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_stale_time: Duration::from_secs(5 * 60),
            detail_stale_time: Duration::from_secs(10 * 60),
            health_stale_time: Duration::from_secs(30),
            gc_time: Duration::from_secs(10 * 60),
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self, key: &QueryKey) -> Duration {
        match key {
            QueryKey::Health => self.health_stale_time,
            QueryKey::TransactionList(_) => self.list_stale_time,
            QueryKey::TransactionDetail(_) => self.detail_stale_time,
        }
    }
}

/// Snapshot of an entry returned by [`QueryCache::read`].
#[derive(Clone, Debug)]
pub struct CachedQuery {
    pub data: Option<CacheValue>,
    pub fetched_at: Option<Instant>,
    pub is_stale: bool,
    pub is_fetching: bool,
    pub subscribers: usize,
}

struct Entry {
    data: Option<CacheValue>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    subscribers: HashMap<u64, Listener>,
    inactive_since: Option<Instant>,
    in_flight: Option<(u64, PendingFetch)>,
}

impl Entry {
    fn new(now: Instant) -> Self {
        Self {
            data: None,
            fetched_at: None,
            invalidated: false,
            subscribers: HashMap::new(),
            inactive_since: Some(now),
            in_flight: None,
        }
    }

    fn is_stale(&self, now: Instant, stale_time: Duration) -> bool {
        match (&self.data, self.fetched_at) {
            (Some(_), Some(at)) => {
                self.invalidated || now.saturating_duration_since(at) >= stale_time
            }
            _ => true,
        }
    }

    fn store(&mut self, value: CacheValue, now: Instant) {
        self.data = Some(value);
        self.fetched_at = Some(now);
        self.invalidated = false;
    }

    fn listeners(&self) -> Vec<Listener> {
        self.subscribers.values().cloned().collect()
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<QueryKey, Entry>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

struct Inner {
    config: CacheConfig,
    state: Mutex<State>,
}

fn lock(inner: &Inner) -> MutexGuard<'_, State> {
    inner.state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn notify(listeners: Vec<Listener>, event: CacheEvent) {
    for listener in listeners {
        listener(event);
    }
}

/// Process-wide query cache. Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.inner)
    }

    pub fn read(&self, key: &QueryKey) -> Option<CachedQuery> {
        let now = Instant::now();
        let stale_time = self.inner.config.stale_time(key);
        let state = self.state();
        state.entries.get(key).map(|entry| CachedQuery {
            data: entry.data.clone(),
            fetched_at: entry.fetched_at,
            is_stale: entry.is_stale(now, stale_time),
            is_fetching: entry.in_flight.is_some(),
            subscribers: entry.subscribers.len(),
        })
    }

    /// Replaces the entry's data and restarts its freshness window. A fetch
    /// still running for the key is disowned.
    pub fn write(&self, key: QueryKey, value: CacheValue) {
        let listeners = {
            let mut state = self.state();
            let now = Instant::now();
            debug!(key = %key, kind = value.kind(), "cache write");
            let entry = state
                .entries
                .entry(key)
                .or_insert_with(|| Entry::new(now));
            entry.store(value, now);
            entry.in_flight = None;
            entry.listeners()
        };
        notify(listeners, CacheEvent::Updated);
    }

    /// Applies `transform` to every entry under `prefix` that holds data.
    ///
    /// A `None` from `transform` leaves that entry exactly as it was. Returns
    /// how many entries changed.
    pub fn patch_matching<F>(&self, prefix: &KeyPrefix, mut transform: F) -> usize
    where
        F: FnMut(&QueryKey, &CacheValue) -> Option<CacheValue>,
    {
        let mut listeners = Vec::new();
        let mut patched = 0;
        {
            let mut state = self.state();
            let now = Instant::now();
            for (key, entry) in state.entries.iter_mut() {
                if !prefix.matches(key) {
                    continue;
                }
                let Some(current) = &entry.data else {
                    continue;
                };
                match transform(key, current) {
                    Some(next) => {
                        debug!(key = %key, "cache patch");
                        entry.store(next, now);
                        listeners.extend(entry.listeners());
                        patched += 1;
                    }
                    None => trace!(key = %key, "cache patch skipped"),
                }
            }
        }
        notify(listeners, CacheEvent::Updated);
        patched
    }

    /// Marks every entry under `prefix` stale. The next read refetches.
    ///
    /// Fetches already running for those entries are disowned: they started
    /// before the change that caused the invalidation, so their results are
    /// discarded and the next read starts a new request.
    pub fn invalidate(&self, prefix: &KeyPrefix) -> usize {
        let mut listeners = Vec::new();
        let mut invalidated = 0;
        {
            let mut state = self.state();
            for (key, entry) in state.entries.iter_mut() {
                if prefix.matches(key) {
                    debug!(key = %key, "cache invalidate");
                    entry.invalidated = true;
                    if entry.in_flight.take().is_some() {
                        debug!(key = %key, "in-flight fetch disowned");
                    }
                    listeners.extend(entry.listeners());
                    invalidated += 1;
                }
            }
        }
        notify(listeners, CacheEvent::Invalidated);
        invalidated
    }

    /// Drops the entry's data. Subscribed listeners stay attached to the key
    /// and are told about the removal; an unobserved entry is deleted.
    ///
    /// A fetch still running for the key is disowned: its result is
    /// discarded.
    pub fn remove(&self, key: &QueryKey) -> bool {
        let listeners = {
            let mut state = self.state();
            let observed = match state.entries.get(key) {
                None => return false,
                Some(entry) => !entry.subscribers.is_empty(),
            };
            debug!(key = %key, "cache remove");
            if !observed {
                state.entries.remove(key);
                return true;
            }
            match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.data = None;
                    entry.fetched_at = None;
                    entry.invalidated = false;
                    entry.in_flight = None;
                    entry.listeners()
                }
                None => Vec::new(),
            }
        };
        notify(listeners, CacheEvent::Removed);
        true
    }

    /// Registers `listener` for `key`. Dropping the returned handle
    /// unsubscribes it.
    pub fn subscribe<F>(&self, key: QueryKey, listener: F) -> Subscription
    where
        F: Fn(CacheEvent) + Send + Sync + 'static,
    {
        let mut state = self.state();
        let id = state.next_id();
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(Instant::now()));
        entry.subscribers.insert(id, Arc::new(listener));
        entry.inactive_since = None;
        Subscription {
            cache: Arc::downgrade(&self.inner),
            key,
            id,
        }
    }

    pub fn keys_matching(&self, prefix: &KeyPrefix) -> Vec<QueryKey> {
        self.state()
            .entries
            .keys()
            .filter(|key| prefix.matches(key))
            .cloned()
            .collect()
    }

    /// Keys that have at least one subscriber and need a refetch.
    pub fn active_stale_keys(&self) -> Vec<QueryKey> {
        let now = Instant::now();
        let config = self.inner.config;
        self.state()
            .entries
            .iter()
            .filter(|(key, entry)| {
                !entry.subscribers.is_empty() && entry.is_stale(now, config.stale_time(key))
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Evicts entries that have had no subscriber for `gc_time` and are not
    /// being fetched. Returns the number of evicted entries.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let gc_time = self.inner.config.gc_time;
        let mut state = self.state();
        let before = state.entries.len();
        state.entries.retain(|key, entry| {
            let evict = entry.subscribers.is_empty()
                && entry.in_flight.is_none()
                && entry
                    .inactive_since
                    .is_some_and(|since| now.saturating_duration_since(since) >= gc_time);
            if evict {
                debug!(key = %key, "cache evict");
            }
            !evict
        });
        before - state.entries.len()
    }

    /// Returns fresh data from the cache, or fetches it.
    ///
    /// `fetcher` is only called when this reader has to start a new request;
    /// a reader that finds one already running waits for it instead.
    pub async fn fetch<F, Fut>(
        &self,
        key: QueryKey,
        mode: ReadMode,
        fetcher: F,
    ) -> Result<CacheValue, RequestFailed>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue, RequestFailed>> + Send + 'static,
    {
        let now = Instant::now();
        let stale_time = self.inner.config.stale_time(&key);
        let (pending, stale) = {
            let mut state = self.state();
            let fetch_id = state.next_id();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(now));
            if let Some(data) = &entry.data {
                if !entry.is_stale(now, stale_time) {
                    trace!(key = %key, "cache hit");
                    return Ok(data.clone());
                }
            }
            let stale = entry.data.clone();
            (self.start_or_attach(entry, fetch_id, &key, fetcher), stale)
        };

        match (mode, stale) {
            (ReadMode::Background, Some(data)) => Ok(data),
            _ => pending.await,
        }
    }

    /// Starts a fetch for `key` regardless of freshness, or attaches to the
    /// one already running. The request proceeds even if the returned handle
    /// is dropped.
    pub fn refetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> PendingFetch
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue, RequestFailed>> + Send + 'static,
    {
        let mut state = self.state();
        let fetch_id = state.next_id();
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(Instant::now()));
        self.start_or_attach(entry, fetch_id, &key, fetcher)
    }

    fn start_or_attach<F, Fut>(
        &self,
        entry: &mut Entry,
        fetch_id: u64,
        key: &QueryKey,
        fetcher: F,
    ) -> PendingFetch
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue, RequestFailed>> + Send + 'static,
    {
        if let Some((_, pending)) = &entry.in_flight {
            trace!(key = %key, "attaching to in-flight fetch");
            return pending.clone();
        }

        debug!(key = %key, "fetch started");
        let request = fetcher();
        let cache = self.clone();
        let owned_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = request.await;
            cache.finish_fetch(owned_key, fetch_id, &result);
            result
        });
        let pending = async move {
            handle.await.unwrap_or_else(|err| {
                Err(RequestFailed::local(ClientError::Network(format!(
                    "fetch task failed: {err}"
                ))))
            })
        }
        .boxed()
        .shared();

        entry.in_flight = Some((fetch_id, pending.clone()));
        pending
    }

    fn finish_fetch(&self, key: QueryKey, fetch_id: u64, result: &Result<CacheValue, RequestFailed>) {
        let listeners = {
            let mut state = self.state();
            let Some(entry) = state.entries.get_mut(&key) else {
                debug!(key = %key, "fetch finished for removed entry, discarding");
                return;
            };
            if !matches!(entry.in_flight, Some((id, _)) if id == fetch_id) {
                debug!(key = %key, "fetch finished after being disowned, discarding");
                return;
            }
            entry.in_flight = None;
            match result {
                Ok(value) => {
                    debug!(key = %key, kind = value.kind(), "fetch stored");
                    entry.store(value.clone(), Instant::now());
                    entry.listeners()
                }
                Err(err) => {
                    debug!(key = %key, "fetch failed: {err}");
                    Vec::new()
                }
            }
        };
        notify(listeners, CacheEvent::Updated);
    }
}

/// Keeps a listener registered. Dropping it unsubscribes.
pub struct Subscription {
    cache: Weak<Inner>,
    key: QueryKey,
    id: u64,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.cache.upgrade() else {
            return;
        };
        let mut state = lock(&inner);
        if let Some(entry) = state.entries.get_mut(&self.key) {
            entry.subscribers.remove(&self.id);
            if entry.subscribers.is_empty() {
                entry.inactive_since = Some(Instant::now());
            }
        }
    }
}
