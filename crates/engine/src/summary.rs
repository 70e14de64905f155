use api_types::{
    Money,
    transaction::{Transaction, TransactionKind},
};
use chrono::{DateTime, Datelike, TimeZone};

/// Headline figures shown on the home screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Signed sum over every transaction, whatever its date.
    pub total_balance: Money,
    pub monthly_income: Money,
    pub monthly_expenses: Money,
    /// `monthly_income - monthly_expenses`.
    pub savings: Money,
    /// Number of transactions dated in the current month.
    pub transaction_count: usize,
    /// Monthly volume (income plus expenses) divided by the calendar day of
    /// `now`, not by the number of days that actually had transactions.
    pub avg_daily: Money,
}

/// Returns `true` when `date` falls in the same calendar month and year as
/// `now`, both read in `now`'s time zone.
pub fn is_same_month<Tz: TimeZone, Tz2: TimeZone>(date: &DateTime<Tz2>, now: &DateTime<Tz>) -> bool {
    let local = date.with_timezone(&now.timezone());
    local.year() == now.year() && local.month() == now.month()
}

pub fn summarize<Tz: TimeZone>(transactions: &[Transaction], now: &DateTime<Tz>) -> Summary {
    if transactions.is_empty() {
        return Summary::default();
    }

    let total_balance: Money = transactions.iter().map(Transaction::signed_amount).sum();

    let mut monthly_income = Money::ZERO;
    let mut monthly_expenses = Money::ZERO;
    let mut transaction_count = 0;
    for tx in transactions.iter().filter(|tx| is_same_month(&tx.date, now)) {
        transaction_count += 1;
        match tx.kind {
            TransactionKind::Income => monthly_income += tx.amount,
            TransactionKind::Expense => monthly_expenses += tx.amount,
        }
    }

    let avg_daily = if transaction_count > 0 {
        (monthly_income + monthly_expenses).div_round(u64::from(now.day()))
    } else {
        Money::ZERO
    };

    Summary {
        total_balance,
        monthly_income,
        monthly_expenses,
        savings: monthly_income - monthly_expenses,
        transaction_count,
        avg_daily,
    }
}
