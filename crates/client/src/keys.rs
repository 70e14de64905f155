use std::fmt;

use api_types::pagination::PaginationParams;

/// Address of one cache entry.
///
/// Mirrors the path-like keys `["health"]`, `["transactions", "list",
/// params?]` and `["transactions", "detail", id]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Health,
    /// `None` is the unpaginated collection; `Some` is always a page.
    TransactionList(Option<PaginationParams>),
    TransactionDetail(String),
}

impl QueryKey {
    pub fn transaction(id: impl Into<String>) -> Self {
        Self::TransactionDetail(id.into())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Health => write!(f, "[health]"),
            Self::TransactionList(None) => write!(f, "[transactions, list]"),
            Self::TransactionList(Some(params)) => write!(
                f,
                "[transactions, list, page={:?} limit={:?} sort={:?}/{:?}]",
                params.page, params.limit, params.sort_by, params.sort_order
            ),
            Self::TransactionDetail(id) => write!(f, "[transactions, detail, {id}]"),
        }
    }
}

/// Selects a group of keys by their leading segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyPrefix {
    All,
    Transactions,
    TransactionLists,
    TransactionDetails,
    Exact(QueryKey),
}

impl KeyPrefix {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::All => true,
            Self::Transactions => !matches!(key, QueryKey::Health),
            Self::TransactionLists => matches!(key, QueryKey::TransactionList(_)),
            Self::TransactionDetails => matches!(key, QueryKey::TransactionDetail(_)),
            Self::Exact(exact) => exact == key,
        }
    }
}

impl From<QueryKey> for KeyPrefix {
    fn from(key: QueryKey) -> Self {
        Self::Exact(key)
    }
}
