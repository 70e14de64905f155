use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use api_types::{
    Money,
    health::Health,
    pagination::{PaginationMeta, PaginationParams, TransactionPage},
    transaction::{CreateTransaction, Transaction, TransactionKind, UpdateTransaction},
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use client::{
    CacheEvent, CacheValue, ClientError, KeyPrefix, QueryCache, QueryKey, ReadMode, RetryPolicy,
    StoreOptions, TransactionApi, TransactionStore,
};
use reqwest::StatusCode;

#[derive(Default)]
struct Calls {
    health: AtomicUsize,
    list_all: AtomicUsize,
    list_paginated: AtomicUsize,
    get: AtomicUsize,
    create: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
}

/// In-memory backend that counts every call. List endpoints answer with
/// the records as they were when the request arrived.
#[derive(Default)]
struct FakeApi {
    records: Mutex<Vec<Transaction>>,
    calls: Calls,
    latency: Option<Duration>,
    unavailable: AtomicBool,
}

impl FakeApi {
    fn with_records(records: Vec<Transaction>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    async fn call(&self, counter: &AtomicUsize) -> Result<(), ClientError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClientError::Server {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "maintenance".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(id: &str) -> ClientError {
        ClientError::Rejected {
            status: StatusCode::NOT_FOUND,
            message: format!("transaction {id} not found"),
        }
    }
}

#[async_trait]
impl TransactionApi for FakeApi {
    async fn health(&self) -> Result<Health, ClientError> {
        self.call(&self.calls.health).await?;
        Ok(Health {
            status: "ok".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        })
    }

    async fn list_all(&self) -> Result<Vec<Transaction>, ClientError> {
        let records = self.records.lock().unwrap().clone();
        self.call(&self.calls.list_all).await?;
        Ok(records)
    }

    async fn list_paginated(
        &self,
        params: &PaginationParams,
    ) -> Result<TransactionPage, ClientError> {
        let records = self.records.lock().unwrap().clone();
        self.call(&self.calls.list_paginated).await?;
        let page = params.page.unwrap_or(1).max(1) as usize;
        let limit = params.limit.unwrap_or(10).max(1) as usize;
        let total_pages = records.len().div_ceil(limit).max(1);
        let data: Vec<Transaction> = records
            .iter()
            .skip((page - 1) * limit)
            .take(limit)
            .cloned()
            .collect();
        Ok(TransactionPage {
            data,
            pagination: PaginationMeta {
                current_page: page as u32,
                total_pages: total_pages as u32,
                total_items: records.len() as u64,
                items_per_page: limit as u32,
                has_next_page: page < total_pages,
                has_previous_page: page > 1,
            },
        })
    }

    async fn get(&self, id: &str) -> Result<Transaction, ClientError> {
        self.call(&self.calls.get).await?;
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, payload: &CreateTransaction) -> Result<Transaction, ClientError> {
        self.call(&self.calls.create).await?;
        let now = Utc::now().fixed_offset();
        let created = Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            amount: payload.amount,
            description: payload.description.clone(),
            category: payload.category.clone(),
            kind: payload.kind,
            date: payload.date.unwrap_or(now),
            created_at: now,
            updated_at: None,
        };
        self.records.lock().unwrap().insert(0, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: &str,
        payload: &UpdateTransaction,
    ) -> Result<Transaction, ClientError> {
        self.call(&self.calls.update).await?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        if let Some(amount) = payload.amount {
            record.amount = amount;
        }
        if let Some(description) = &payload.description {
            record.description = description.clone();
        }
        if let Some(category) = &payload.category {
            record.category = category.clone();
        }
        if let Some(kind) = payload.kind {
            record.kind = kind;
        }
        if let Some(date) = payload.date {
            record.date = date;
        }
        record.updated_at = Some(Utc::now().fixed_offset());
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.call(&self.calls.delete).await?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|t| t.id != id);
        if records.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}

fn date(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value).unwrap()
}

fn tx(id: &str, kind: TransactionKind, cents: i64) -> Transaction {
    Transaction {
        id: id.to_string(),
        amount: Money::new(cents),
        description: format!("record {id}"),
        category: "Food".to_string(),
        kind,
        date: date("2025-03-01T10:00:00Z"),
        created_at: date("2025-03-01T10:00:00Z"),
        updated_at: None,
    }
}

fn seed() -> Vec<Transaction> {
    vec![
        tx("1", TransactionKind::Income, 500_000),
        tx("2", TransactionKind::Expense, 12_050),
        tx("3", TransactionKind::Expense, 4_500),
    ]
}

fn store_with(api: Arc<FakeApi>, options: StoreOptions) -> TransactionStore {
    TransactionStore::builder(api)
        .cache(QueryCache::default())
        .options(options)
        .build()
}

fn store(api: Arc<FakeApi>) -> TransactionStore {
    store_with(api, StoreOptions::default())
}

fn first_page() -> PaginationParams {
    PaginationParams {
        page: Some(1),
        limit: Some(2),
        ..PaginationParams::default()
    }
}

fn cached_list(store: &TransactionStore, key: &QueryKey) -> Vec<Transaction> {
    store
        .cache()
        .read(key)
        .and_then(|entry| entry.data)
        .and_then(|value| value.transactions().map(<[Transaction]>::to_vec))
        .unwrap_or_default()
}

fn slow_api() -> Arc<FakeApi> {
    Arc::new(FakeApi {
        records: Mutex::new(seed()),
        latency: Some(Duration::from_millis(100)),
        ..FakeApi::default()
    })
}

fn lunch() -> CreateTransaction {
    CreateTransaction {
        amount: Money::new(1_500),
        description: "Lunch".to_string(),
        category: "Food".to_string(),
        kind: TransactionKind::Expense,
        date: None,
    }
}

#[tokio::test(start_paused = true)]
async fn reads_within_freshness_window_hit_network_once() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));

    let first = store.transactions(&PaginationParams::default()).await.unwrap();
    let second = store.transactions(&PaginationParams::default()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
    store.transactions(&PaginationParams::default()).await.unwrap();
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_reads_share_one_request() {
    let api = Arc::new(FakeApi {
        records: Mutex::new(seed()),
        latency: Some(Duration::from_millis(100)),
        ..FakeApi::default()
    });
    let store = store(Arc::clone(&api));

    let params = first_page();
    let (a, b) = tokio::join!(store.transaction_page(&params), store.transaction_page(&params));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(api.calls.list_paginated.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn paginated_params_pick_the_paginated_endpoint() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));

    let records = store.transactions(&first_page()).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(api.calls.list_paginated.load(Ordering::SeqCst), 1);
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 0);

    let page = store.transaction_page(&first_page()).await.unwrap();
    assert!(page.pagination.has_next_page);
    assert_eq!(api.calls.list_paginated.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn create_prepends_to_every_cached_list() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);
    let page_key = QueryKey::TransactionList(Some(first_page()));

    store.transactions(&PaginationParams::default()).await.unwrap();
    store.transaction_page(&first_page()).await.unwrap();
    let detail = store.transaction("1").await.unwrap();
    let page_meta = match store.cache().read(&page_key).unwrap().data {
        Some(CacheValue::Page(page)) => page.pagination,
        other => panic!("unexpected entry: {other:?}"),
    };

    let created = store.create(&lunch()).await.unwrap();

    let all = cached_list(&store, &all_key);
    assert_eq!(all.len(), 4);
    assert_eq!(all[0], created);
    let page = cached_list(&store, &page_key);
    assert_eq!(page.len(), 3);
    assert_eq!(page[0], created);

    match store.cache().read(&page_key).unwrap().data {
        Some(CacheValue::Page(page)) => assert_eq!(page.pagination, page_meta),
        other => panic!("unexpected entry: {other:?}"),
    }
    assert!(store.cache().read(&all_key).unwrap().is_stale);
    assert_eq!(
        store.cache().read(&QueryKey::transaction("1")).unwrap().data,
        Some(CacheValue::Transaction(detail))
    );
}

#[tokio::test(start_paused = true)]
async fn update_replaces_record_in_place() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);

    let before = store.transactions(&PaginationParams::default()).await.unwrap();
    let change = UpdateTransaction {
        amount: Some(Money::new(9_900)),
        ..UpdateTransaction::default()
    };
    let updated = store.update("2", &change).await.unwrap();

    let after = cached_list(&store, &all_key);
    assert_eq!(after.len(), before.len());
    assert_eq!(after[1].id, "2");
    assert_eq!(after[1].amount, Money::new(9_900));
    assert_eq!(after[0], before[0]);
    assert_eq!(
        store.cache().read(&QueryKey::transaction("2")).unwrap().data,
        Some(CacheValue::Transaction(updated))
    );
}

#[tokio::test(start_paused = true)]
async fn update_refetches_lists_immediately() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);

    store.transactions(&PaginationParams::default()).await.unwrap();
    let change = UpdateTransaction {
        description: Some("Groceries".to_string()),
        ..UpdateTransaction::default()
    };
    store.update("3", &change).await.unwrap();
    assert!(store.cache().read(&all_key).unwrap().is_fetching);

    tokio::time::sleep(Duration::from_millis(1)).await;
    let entry = store.cache().read(&all_key).unwrap();
    assert!(!entry.is_stale);
    assert!(!entry.is_fetching);
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 2);
    assert_eq!(cached_list(&store, &all_key)[2].description, "Groceries");
}

#[tokio::test(start_paused = true)]
async fn list_without_updated_record_is_left_alone() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let page_key = QueryKey::TransactionList(Some(first_page()));

    let page = store.transaction_page(&first_page()).await.unwrap();
    assert!(page.data.iter().all(|t| t.id != "3"));

    let change = UpdateTransaction {
        amount: Some(Money::new(100)),
        ..UpdateTransaction::default()
    };
    store.update("3", &change).await.unwrap();

    assert_eq!(cached_list(&store, &page_key), page.data);
    assert!(store.cache().read(&page_key).unwrap().is_stale);
}

#[tokio::test(start_paused = true)]
async fn delete_drops_record_everywhere() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);
    let page_key = QueryKey::TransactionList(Some(first_page()));

    store.transactions(&PaginationParams::default()).await.unwrap();
    store.transaction_page(&first_page()).await.unwrap();
    store.transaction("2").await.unwrap();

    store.delete("2").await.unwrap();

    for key in [&all_key, &page_key] {
        assert!(cached_list(&store, key).iter().all(|t| t.id != "2"));
    }
    assert!(store.cache().read(&QueryKey::transaction("2")).is_none());

    let failed = store.transaction("2").await.unwrap_err();
    assert_eq!(failed.status(), 404);
    assert_eq!(failed.attempts, 1);
    assert_eq!(api.calls.get.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn list_response_older_than_create_is_discarded() {
    let api = slow_api();
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);
    store.transactions(&PaginationParams::default()).await.unwrap();

    let creating = tokio::spawn({
        let store = store.clone();
        async move { store.create(&lunch()).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    // Answers with the records from before the create lands.
    let older = store.refetch_matching(&KeyPrefix::TransactionLists);
    assert_eq!(older.len(), 1);

    let created = creating.await.unwrap().unwrap();
    let entry = store.cache().read(&all_key).unwrap();
    assert!(entry.is_stale);
    assert!(!entry.is_fetching);
    assert_eq!(cached_list(&store, &all_key)[0], created);

    let fresh = store.transactions(&PaginationParams::default()).await.unwrap();
    assert_eq!(fresh.len(), 4);
    assert_eq!(fresh[0], created);

    for result in futures::future::join_all(older).await {
        assert_eq!(result.unwrap().transactions().unwrap().len(), 3);
    }
    assert_eq!(cached_list(&store, &all_key), fresh);
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn list_response_older_than_delete_is_discarded() {
    let api = slow_api();
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);
    let page_key = QueryKey::TransactionList(Some(first_page()));
    store.transactions(&PaginationParams::default()).await.unwrap();
    store.transaction_page(&first_page()).await.unwrap();

    let deleting = tokio::spawn({
        let store = store.clone();
        async move { store.delete("2").await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let older = store.refetch_matching(&KeyPrefix::TransactionLists);
    assert_eq!(older.len(), 2);

    deleting.await.unwrap().unwrap();
    for result in futures::future::join_all(older).await {
        let value = result.unwrap();
        assert!(value.transactions().unwrap().iter().any(|t| t.id == "2"));
    }

    for key in [&all_key, &page_key] {
        assert!(!store.cache().read(key).unwrap().is_fetching);
        assert!(cached_list(&store, key).iter().all(|t| t.id != "2"));
    }
    let fresh = store.transactions(&PaginationParams::default()).await.unwrap();
    assert_eq!(fresh.len(), 2);
    assert!(fresh.iter().all(|t| t.id != "2"));
}

#[tokio::test(start_paused = true)]
async fn list_response_older_than_update_is_discarded() {
    let api = slow_api();
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);
    store.transactions(&PaginationParams::default()).await.unwrap();

    let change = UpdateTransaction {
        amount: Some(Money::new(9_900)),
        ..UpdateTransaction::default()
    };
    let updating = tokio::spawn({
        let store = store.clone();
        async move { store.update("2", &change).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let older = store.refetch_matching(&KeyPrefix::TransactionLists);

    updating.await.unwrap().unwrap();
    // The update starts its own refetch; the older response lands first.
    for result in futures::future::join_all(older).await {
        let value = result.unwrap();
        assert_eq!(value.transactions().unwrap()[1].amount, Money::new(12_050));
    }
    assert!(store.cache().read(&all_key).unwrap().is_fetching);
    assert_eq!(cached_list(&store, &all_key)[1].amount, Money::new(9_900));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let entry = store.cache().read(&all_key).unwrap();
    assert!(!entry.is_stale);
    assert!(!entry.is_fetching);
    assert_eq!(cached_list(&store, &all_key)[1].amount, Money::new(9_900));
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_mutation_leaves_cache_untouched() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);

    let before = store.transactions(&PaginationParams::default()).await.unwrap();
    api.unavailable.store(true, Ordering::SeqCst);

    let failed = store.create(&lunch()).await.unwrap_err();
    assert_eq!(failed.status(), 503);
    assert_eq!(failed.attempts, 3);
    assert_eq!(api.calls.create.load(Ordering::SeqCst), 3);

    let entry = store.cache().read(&all_key).unwrap();
    assert!(!entry.is_stale);
    assert_eq!(cached_list(&store, &all_key), before);
}

#[tokio::test(start_paused = true)]
async fn invalid_payload_never_reaches_gateway() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));

    let mut payload = lunch();
    payload.amount = Money::ZERO;
    let failed = store.create(&payload).await.unwrap_err();
    assert_eq!(failed.attempts, 0);
    assert!(matches!(failed.error, ClientError::Invalid(_)));

    let failed = store
        .update("1", &UpdateTransaction::default())
        .await
        .unwrap_err();
    assert!(matches!(failed.error, ClientError::Invalid(_)));

    assert_eq!(api.calls.create.load(Ordering::SeqCst), 0);
    assert_eq!(api.calls.update.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn subscribers_are_notified_until_dropped() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let subscription = store
        .cache()
        .subscribe(all_key.clone(), move |event| sink.lock().unwrap().push(event));

    store.transactions(&PaginationParams::default()).await.unwrap();
    store.create(&lunch()).await.unwrap();
    assert_eq!(
        *events.lock().unwrap(),
        [
            CacheEvent::Updated,
            CacheEvent::Updated,
            CacheEvent::Invalidated
        ]
    );

    drop(subscription);
    store.create(&lunch()).await.unwrap();
    assert_eq!(events.lock().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn host_triggers_refetch_observed_stale_entries() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let all_key = QueryKey::TransactionList(None);

    let _subscription = store.cache().subscribe(all_key.clone(), |_| {});
    store.transactions(&PaginationParams::default()).await.unwrap();
    store.transaction("1").await.unwrap();

    assert!(store.on_connectivity_restored().is_empty());

    store.cache().invalidate(&KeyPrefix::All);
    assert!(store.on_focus_regained().is_empty());

    let pending = store.on_connectivity_restored();
    assert_eq!(pending.len(), 1);
    for result in futures::future::join_all(pending).await {
        result.unwrap();
    }
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 2);
    // Unobserved detail entry stays stale until read.
    assert_eq!(api.calls.get.load(Ordering::SeqCst), 1);

    let focused = store_with(
        Arc::clone(&api),
        StoreOptions {
            refetch_on_focus: true,
            ..StoreOptions::default()
        },
    );
    let _focused_subscription = focused.cache().subscribe(all_key.clone(), |_| {});
    assert_eq!(focused.on_focus_regained().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn background_reads_return_stale_data_first() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api)).with_read_mode(ReadMode::Background);

    let before = store.transactions(&PaginationParams::default()).await.unwrap();
    api.records.lock().unwrap().pop();
    store.cache().invalidate(&KeyPrefix::TransactionLists);

    let stale = store.transactions(&PaginationParams::default()).await.unwrap();
    assert_eq!(stale, before);

    tokio::time::sleep(Duration::from_millis(1)).await;
    let fresh = store.transactions(&PaginationParams::default()).await.unwrap();
    assert_eq!(fresh.len(), before.len() - 1);
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn server_errors_on_reads_are_retried() {
    let api = Arc::new(FakeApi::with_records(seed()));
    api.unavailable.store(true, Ordering::SeqCst);
    let store = store_with(
        Arc::clone(&api),
        StoreOptions {
            query_retry: RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(10),
            },
            ..StoreOptions::default()
        },
    );

    let failed = store.transactions(&PaginationParams::default()).await.unwrap_err();
    assert_eq!(failed.attempts, 3);
    assert_eq!(api.calls.list_all.load(Ordering::SeqCst), 3);
    assert!(store.cache().read(&QueryKey::TransactionList(None)).unwrap().data.is_none());
}

#[tokio::test(start_paused = true)]
async fn unobserved_entries_are_collected() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));

    store.transaction("1").await.unwrap();
    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    assert_eq!(store.cache().collect_garbage(), 1);

    store.transaction("1").await.unwrap();
    assert_eq!(api.calls.get.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn maintenance_collects_garbage_on_schedule() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let detail_key = QueryKey::transaction("1");
    let all_key = QueryKey::TransactionList(None);

    let _subscription = store.cache().subscribe(all_key.clone(), |_| {});
    store.transactions(&PaginationParams::default()).await.unwrap();
    store.transaction("1").await.unwrap();
    let maintenance = store.spawn_maintenance();

    tokio::time::sleep(Duration::from_secs(9 * 60)).await;
    assert!(store.cache().read(&detail_key).is_some());

    tokio::time::sleep(Duration::from_secs(60 + 1)).await;
    assert!(store.cache().read(&detail_key).is_none());
    assert!(store.cache().read(&all_key).is_some());

    drop(maintenance);
    store.transaction("1").await.unwrap();
    tokio::time::sleep(Duration::from_secs(30 * 60)).await;
    assert!(store.cache().read(&detail_key).is_some());
}

#[tokio::test(start_paused = true)]
async fn maintenance_polls_health_while_observed() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store(Arc::clone(&api));
    let health_calls = || api.calls.health.load(Ordering::SeqCst);

    store.health().await.unwrap();
    let subscription = store.cache().subscribe(QueryKey::Health, |_| {});
    let maintenance = store.spawn_maintenance();

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(health_calls(), 1);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(health_calls(), 2);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(health_calls(), 3);

    drop(subscription);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(health_calls(), 3);

    let _subscription = store.cache().subscribe(QueryKey::Health, |_| {});
    drop(maintenance);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(health_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn health_polling_can_be_disabled() {
    let api = Arc::new(FakeApi::with_records(seed()));
    let store = store_with(
        Arc::clone(&api),
        StoreOptions {
            health_poll_interval: None,
            ..StoreOptions::default()
        },
    );

    let _subscription = store.cache().subscribe(QueryKey::Health, |_| {});
    let _maintenance = store.spawn_maintenance();
    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(api.calls.health.load(Ordering::SeqCst), 0);
}
