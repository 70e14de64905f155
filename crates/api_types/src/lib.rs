pub use money::{Money, MoneyError};

mod money;

pub mod health {
    use serde::{Deserialize, Serialize};

    /// Body of `GET /health`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub timestamp: String,
    }
}

/// Error body the server attaches to non-2xx responses.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub mod transaction {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Serialize};

    use crate::Money;

    /// Direction of a transaction. The stored amount is always positive; the
    /// kind carries the sign.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    impl TransactionKind {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Income => "income",
                Self::Expense => "expense",
            }
        }

        /// `+1` for income, `-1` for expense.
        pub fn sign(self) -> i64 {
            match self {
                Self::Income => 1,
                Self::Expense => -1,
            }
        }
    }

    impl std::str::FromStr for TransactionKind {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_ascii_lowercase().as_str() {
                "income" => Ok(Self::Income),
                "expense" => Ok(Self::Expense),
                other => Err(format!("unknown transaction type: {other}")),
            }
        }
    }

    /// Server-owned transaction record.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Transaction {
        pub id: String,
        pub amount: Money,
        pub description: String,
        pub category: String,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        /// Economic date chosen by the user, distinct from `created_at`.
        #[serde(with = "economic_date")]
        pub date: DateTime<FixedOffset>,
        pub created_at: DateTime<FixedOffset>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub updated_at: Option<DateTime<FixedOffset>>,
    }

    impl Transaction {
        /// Amount with the sign implied by the kind.
        pub fn signed_amount(&self) -> Money {
            Money::new(self.amount.cents() * self.kind.sign())
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct CreateTransaction {
        pub amount: Money,
        pub description: String,
        pub category: String,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date: Option<DateTime<FixedOffset>>,
    }

    impl CreateTransaction {
        /// Checks the record invariants before the request leaves the client.
        pub fn validate(&self) -> Result<(), String> {
            validate_amount(self.amount)?;
            validate_description(&self.description)
        }
    }

    /// Partial update; absent fields are left untouched by the server.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct UpdateTransaction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount: Option<Money>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<String>,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        pub kind: Option<TransactionKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date: Option<DateTime<FixedOffset>>,
    }

    impl UpdateTransaction {
        pub fn is_empty(&self) -> bool {
            self.amount.is_none()
                && self.description.is_none()
                && self.category.is_none()
                && self.kind.is_none()
                && self.date.is_none()
        }

        pub fn validate(&self) -> Result<(), String> {
            if let Some(amount) = self.amount {
                validate_amount(amount)?;
            }
            if let Some(description) = &self.description {
                validate_description(description)?;
            }
            Ok(())
        }
    }

    fn validate_amount(amount: Money) -> Result<(), String> {
        if !amount.is_positive() {
            return Err(format!("amount must be greater than zero, got {amount}"));
        }
        Ok(())
    }

    fn validate_description(description: &str) -> Result<(), String> {
        if description.trim().is_empty() {
            return Err("description must not be empty".to_string());
        }
        Ok(())
    }

    /// The server sends either a full RFC 3339 timestamp or a bare
    /// `YYYY-MM-DD`; a bare date is read as UTC midnight.
    pub mod economic_date {
        use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn parse(value: &str) -> Option<DateTime<FixedOffset>> {
            if let Ok(date) = DateTime::parse_from_rfc3339(value) {
                return Some(date);
            }
            let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
            let midnight = day.and_hms_opt(0, 0, 0)?;
            Some(Utc.from_utc_datetime(&midnight).fixed_offset())
        }

        pub fn serialize<S: Serializer>(
            date: &DateTime<FixedOffset>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&date.to_rfc3339())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<DateTime<FixedOffset>, D::Error> {
            let raw = String::deserialize(deserializer)?;
            parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {raw}")))
        }
    }
}

pub mod pagination {
    use serde::{Deserialize, Serialize};

    use crate::transaction::Transaction;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum SortBy {
        Date,
        Amount,
        Description,
        Category,
        CreatedAt,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SortOrder {
        Asc,
        Desc,
    }

    /// Query string of the paginated list endpoint. Unset or zero values are
    /// not sent.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaginationParams {
        #[serde(default, skip_serializing_if = "is_unset")]
        pub page: Option<u32>,
        #[serde(default, skip_serializing_if = "is_unset")]
        pub limit: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub sort_by: Option<SortBy>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub sort_order: Option<SortOrder>,
    }

    impl PaginationParams {
        /// `true` when the request needs the paginated endpoint shape.
        pub fn is_paginated(&self) -> bool {
            !is_unset(&self.page) || !is_unset(&self.limit)
        }
    }

    fn is_unset(value: &Option<u32>) -> bool {
        !matches!(value, Some(n) if *n > 0)
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaginationMeta {
        pub current_page: u32,
        pub total_pages: u32,
        pub total_items: u64,
        pub items_per_page: u32,
        pub has_next_page: bool,
        pub has_previous_page: bool,
    }

    impl PaginationMeta {
        /// Metadata for a response that carried every item in one page.
        pub fn single_page(items: usize) -> Self {
            Self {
                current_page: 1,
                total_pages: 1,
                total_items: items as u64,
                items_per_page: u32::try_from(items).unwrap_or(u32::MAX),
                has_next_page: false,
                has_previous_page: false,
            }
        }

        pub fn is_consistent(&self) -> bool {
            self.has_next_page == (self.current_page < self.total_pages)
                && self.has_previous_page == (self.current_page > 1)
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransactionPage {
        pub data: Vec<Transaction>,
        pub pagination: PaginationMeta,
    }
}

/// Advisory category names. The data model accepts any label; these only
/// feed suggestions.
pub mod category {
    use crate::transaction::TransactionKind;

    pub const INCOME: &[&str] = &["salary", "freelance", "investment", "gift", "other_income"];

    pub const EXPENSE: &[&str] = &[
        "food",
        "transport",
        "shopping",
        "entertainment",
        "bills",
        "health",
        "education",
        "other_expense",
    ];

    pub fn suggested(kind: TransactionKind) -> &'static [&'static str] {
        match kind {
            TransactionKind::Income => INCOME,
            TransactionKind::Expense => EXPENSE,
        }
    }

    pub fn is_suggested(kind: TransactionKind, category: &str) -> bool {
        suggested(kind).contains(&category)
    }
}
