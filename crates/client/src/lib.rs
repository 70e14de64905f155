//! Client side of the transactions resource.
//!
//! [`HttpGateway`] talks to the server, [`QueryCache`] keeps query results
//! with their freshness, and [`TransactionStore`] ties both together: cached
//! reads, plus create/update/delete that keep every cached list consistent.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use client::{HttpGateway, QueryCache, TransactionStore, DEFAULT_TIMEOUT};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = HttpGateway::new("https://api.example.com", DEFAULT_TIMEOUT)?;
//! let store = TransactionStore::builder(Arc::new(gateway))
//!     .cache(QueryCache::default())
//!     .build();
//! let all = store.transactions(&Default::default()).await?;
//! println!("{} transactions", all.len());
//! # Ok(())
//! # }
//! ```
mod cache;
mod error;
mod gateway;
mod keys;
mod retry;
mod store;

pub use cache::{
    CacheConfig, CacheEvent, CacheValue, CachedQuery, Listener, PendingFetch, QueryCache,
    ReadMode, Subscription,
};
pub use error::{ClientError, RequestFailed};
pub use gateway::{DEFAULT_TIMEOUT, HttpGateway, StaticToken, TokenSource, TransactionApi};
pub use keys::{KeyPrefix, QueryKey};
pub use retry::RetryPolicy;
pub use store::{Maintenance, StoreOptions, TransactionStore, TransactionStoreBuilder};
