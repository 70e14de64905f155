use std::sync::Arc;

use api_types::transaction::{CreateTransaction, Transaction, UpdateTransaction};
use tracing::{info, warn};

use crate::{
    cache::CacheValue,
    error::{ClientError, RequestFailed},
    keys::{KeyPrefix, QueryKey},
};

use super::TransactionStore;

impl TransactionStore {
    /// Creates a record and puts it at the head of every cached list.
    ///
    /// Lists are then marked stale so their pagination counts get refreshed
    /// from the server on the next read.
    pub async fn create(&self, payload: &CreateTransaction) -> Result<Transaction, RequestFailed> {
        payload
            .validate()
            .map_err(|err| RequestFailed::local(ClientError::Invalid(err)))?;

        let api = Arc::clone(&self.api);
        let created = self
            .options
            .mutation_retry
            .run("create", || api.create(payload))
            .await?;
        info!(id = %created.id, kind = created.kind.as_str(), "transaction created");

        self.cache
            .patch_matching(&KeyPrefix::TransactionLists, |_, value| {
                value.map_transactions(|list| prepend(list, &created))
            });
        self.cache.invalidate(&KeyPrefix::TransactionLists);
        Ok(created)
    }

    /// Updates a record, then refreshes its detail entry, its position in
    /// every cached list, and refetches those lists right away.
    pub async fn update(
        &self,
        id: &str,
        payload: &UpdateTransaction,
    ) -> Result<Transaction, RequestFailed> {
        if payload.is_empty() {
            return Err(RequestFailed::local(ClientError::Invalid(
                "update must change at least one field".to_string(),
            )));
        }
        payload
            .validate()
            .map_err(|err| RequestFailed::local(ClientError::Invalid(err)))?;

        let api = Arc::clone(&self.api);
        let updated = self
            .options
            .mutation_retry
            .run("update", || api.update(id, payload))
            .await?;
        info!(id = %updated.id, "transaction updated");

        self.cache.write(
            QueryKey::transaction(updated.id.clone()),
            CacheValue::Transaction(updated.clone()),
        );
        self.cache
            .patch_matching(&KeyPrefix::TransactionLists, |key, value| {
                let replaced = value.map_transactions(|list| replace(list, &updated));
                if replaced.is_none() && value.transactions().is_some() {
                    warn!(key = %key, id = %updated.id, "updated record missing from cached list");
                }
                replaced
            });
        self.cache.invalidate(&KeyPrefix::TransactionLists);
        // The refetches complete in the background.
        let _ = self.refetch_matching(&KeyPrefix::TransactionLists);
        Ok(updated)
    }

    /// Deletes a record and drops it from every cached list and its detail
    /// entry.
    pub async fn delete(&self, id: &str) -> Result<(), RequestFailed> {
        let api = Arc::clone(&self.api);
        self.options
            .mutation_retry
            .run("delete", || api.delete(id))
            .await?;
        info!(id, "transaction deleted");

        self.cache
            .patch_matching(&KeyPrefix::TransactionLists, |_, value| {
                value.map_transactions(|list| without(list, id))
            });
        self.cache.remove(&QueryKey::transaction(id));
        self.cache.invalidate(&KeyPrefix::TransactionLists);
        Ok(())
    }
}

/// `None` when the list already holds the record.
fn prepend(list: &[Transaction], created: &Transaction) -> Option<Vec<Transaction>> {
    if list.iter().any(|t| t.id == created.id) {
        return None;
    }
    let mut next = Vec::with_capacity(list.len() + 1);
    next.push(created.clone());
    next.extend_from_slice(list);
    Some(next)
}

/// `None` when the record is not in the list.
fn replace(list: &[Transaction], updated: &Transaction) -> Option<Vec<Transaction>> {
    let position = list.iter().position(|t| t.id == updated.id)?;
    let mut next = list.to_vec();
    next[position] = updated.clone();
    Some(next)
}

/// `None` when nothing was removed.
fn without(list: &[Transaction], id: &str) -> Option<Vec<Transaction>> {
    let next: Vec<Transaction> = list.iter().filter(|t| t.id != id).cloned().collect();
    (next.len() != list.len()).then_some(next)
}
