use std::collections::HashMap;

use api_types::{
    Money,
    transaction::{Transaction, TransactionKind},
};

/// Income and expense totals accumulated for one category label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryTotals {
    pub category: String,
    pub income: Money,
    pub expense: Money,
}

/// One category's weight within a single direction (income or expense).
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub amount: Money,
    /// Share of the direction total, `0.0..=100.0`.
    pub percentage: f64,
    pub transaction_count: usize,
}

/// Groups every transaction (whatever its date) by category, in first-seen
/// order.
///
/// Labels are matched literally: `"Food"` and `"food"` are two categories.
pub fn category_breakdown(transactions: &[Transaction]) -> Vec<CategoryTotals> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<CategoryTotals> = Vec::new();

    for tx in transactions {
        let slot = *index.entry(tx.category.as_str()).or_insert_with(|| {
            out.push(CategoryTotals {
                category: tx.category.clone(),
                income: Money::ZERO,
                expense: Money::ZERO,
            });
            out.len() - 1
        });
        let totals = &mut out[slot];
        match tx.kind {
            TransactionKind::Income => totals.income += tx.amount,
            TransactionKind::Expense => totals.expense += tx.amount,
        }
    }

    out
}

/// Per-category amounts for one direction, largest first.
pub fn category_shares(transactions: &[Transaction], kind: TransactionKind) -> Vec<CategoryShare> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<CategoryShare> = Vec::new();
    let mut total = Money::ZERO;

    for tx in transactions.iter().filter(|tx| tx.kind == kind) {
        let slot = *index.entry(tx.category.as_str()).or_insert_with(|| {
            out.push(CategoryShare {
                category: tx.category.clone(),
                amount: Money::ZERO,
                percentage: 0.0,
                transaction_count: 0,
            });
            out.len() - 1
        });
        out[slot].amount += tx.amount;
        out[slot].transaction_count += 1;
        total += tx.amount;
    }

    if total.is_positive() {
        for share in &mut out {
            share.percentage = share.amount.cents() as f64 * 100.0 / total.cents() as f64;
        }
    }
    // Stable: equal amounts keep first-seen order.
    out.sort_by(|a, b| b.amount.cmp(&a.amount));
    out
}
