use api_types::{
    Money,
    transaction::{Transaction, TransactionKind},
};
use chrono::{DateTime, TimeZone};

use crate::{CategoryTotals, category_breakdown, summary::is_same_month};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonthlyTotals {
    pub income: Money,
    pub expenses: Money,
    pub transactions: usize,
}

/// Figures for the statistics screen. Unlike [`crate::Summary`], the totals
/// and the average cover the whole list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    pub total_balance: Money,
    pub total_income: Money,
    pub total_expenses: Money,
    pub transaction_count: usize,
    /// Mean absolute amount per transaction.
    pub average_transaction: Money,
    pub monthly: MonthlyTotals,
    pub categories: Vec<CategoryTotals>,
}

pub fn statistics<Tz: TimeZone>(transactions: &[Transaction], now: &DateTime<Tz>) -> Statistics {
    if transactions.is_empty() {
        return Statistics::default();
    }

    let mut total_income = Money::ZERO;
    let mut total_expenses = Money::ZERO;
    let mut monthly = MonthlyTotals::default();

    for tx in transactions {
        let current = is_same_month(&tx.date, now);
        if current {
            monthly.transactions += 1;
        }
        match tx.kind {
            TransactionKind::Income => {
                total_income += tx.amount;
                if current {
                    monthly.income += tx.amount;
                }
            }
            TransactionKind::Expense => {
                total_expenses += tx.amount;
                if current {
                    monthly.expenses += tx.amount;
                }
            }
        }
    }

    Statistics {
        total_balance: total_income - total_expenses,
        total_income,
        total_expenses,
        transaction_count: transactions.len(),
        average_transaction: (total_income + total_expenses).div_round(transactions.len() as u64),
        monthly,
        categories: category_breakdown(transactions),
    }
}

/// The `n` most recent transactions by economic date. Equal dates keep their
/// input order.
pub fn recent(transactions: &[Transaction], n: usize) -> Vec<&Transaction> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.truncate(n);
    sorted
}
