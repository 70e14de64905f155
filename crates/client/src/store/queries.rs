use api_types::{
    health::Health,
    pagination::{PaginationParams, TransactionPage},
    transaction::Transaction,
};

use crate::{
    cache::CacheValue,
    error::RequestFailed,
    keys::QueryKey,
};

use super::{TransactionStore, mismatch};

impl TransactionStore {
    pub async fn health(&self) -> Result<Health, RequestFailed> {
        let key = QueryKey::Health;
        match self.read(key.clone()).await? {
            CacheValue::Health(health) => Ok(health),
            other => Err(mismatch(&key, &other)),
        }
    }

    /// Records for `params`.
    ///
    /// Without `page` or `limit` this reads the whole collection; otherwise
    /// it reads one page and drops the metadata. Use
    /// [`transaction_page`](Self::transaction_page) to keep it.
    pub async fn transactions(
        &self,
        params: &PaginationParams,
    ) -> Result<Vec<Transaction>, RequestFailed> {
        let key = if params.is_paginated() {
            QueryKey::TransactionList(Some(params.clone()))
        } else {
            QueryKey::TransactionList(None)
        };
        match self.read(key.clone()).await? {
            CacheValue::Transactions(list) => Ok(list),
            CacheValue::Page(page) => Ok(page.data),
            other => Err(mismatch(&key, &other)),
        }
    }

    /// One page of records with its pagination metadata.
    pub async fn transaction_page(
        &self,
        params: &PaginationParams,
    ) -> Result<TransactionPage, RequestFailed> {
        let key = QueryKey::TransactionList(Some(params.clone()));
        match self.read(key.clone()).await? {
            CacheValue::Page(page) => Ok(page),
            other => Err(mismatch(&key, &other)),
        }
    }

    pub async fn transaction(&self, id: &str) -> Result<Transaction, RequestFailed> {
        let key = QueryKey::transaction(id);
        match self.read(key.clone()).await? {
            CacheValue::Transaction(transaction) => Ok(transaction),
            other => Err(mismatch(&key, &other)),
        }
    }
}
