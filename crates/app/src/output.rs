use api_types::{
    Money,
    pagination::PaginationMeta,
    transaction::{Transaction, TransactionKind},
};
use chrono_tz::Tz;
use engine::{CategoryShare, Statistics, Summary};

fn signed(kind: TransactionKind, amount: Money) -> String {
    match kind {
        TransactionKind::Income => format!("+{amount}"),
        TransactionKind::Expense => format!("-{amount}"),
    }
}

pub fn transaction_line(tx: &Transaction, tz: Tz) -> String {
    format!(
        "{date}  {amount:>12}  {category:<16}  {description}  [{id}]",
        date = tx.date.with_timezone(&tz).format("%Y-%m-%d"),
        amount = signed(tx.kind, tx.amount),
        category = tx.category,
        description = tx.description,
        id = tx.id,
    )
}

pub fn transaction_detail(tx: &Transaction, tz: Tz) -> String {
    let mut out = format!(
        "id:          {}\ntype:        {}\namount:      {}\ndescription: {}\ncategory:    {}\ndate:        {}\ncreated:     {}",
        tx.id,
        tx.kind.as_str(),
        tx.amount,
        tx.description,
        tx.category,
        tx.date.with_timezone(&tz).format("%Y-%m-%d"),
        tx.created_at.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
    );
    if let Some(updated_at) = tx.updated_at {
        out.push_str(&format!(
            "\nupdated:     {}",
            updated_at.with_timezone(&tz).format("%Y-%m-%d %H:%M")
        ));
    }
    out
}

pub fn page_footer(meta: &PaginationMeta) -> String {
    let mut out = format!(
        "page {}/{} ({} transactions, {} per page)",
        meta.current_page, meta.total_pages, meta.total_items, meta.items_per_page
    );
    if meta.has_previous_page {
        out.push_str(" [prev]");
    }
    if meta.has_next_page {
        out.push_str(" [next]");
    }
    out
}

pub fn summary(summary: &Summary) -> String {
    format!(
        "balance:          {}\nmonthly income:   {}\nmonthly expenses: {}\nsavings:          {}\ntransactions:     {}\naverage per day:  {}",
        summary.total_balance,
        summary.monthly_income,
        summary.monthly_expenses,
        summary.savings,
        summary.transaction_count,
        summary.avg_daily,
    )
}

pub fn statistics(stats: &Statistics) -> String {
    let mut out = format!(
        "balance:        {}\ntotal income:   {}\ntotal expenses: {}\ntransactions:   {} (average {})\nthis month:     +{} / -{} over {} transactions",
        stats.total_balance,
        stats.total_income,
        stats.total_expenses,
        stats.transaction_count,
        stats.average_transaction,
        stats.monthly.income,
        stats.monthly.expenses,
        stats.monthly.transactions,
    );
    if !stats.categories.is_empty() {
        out.push_str("\n\ncategory          income     expense");
        for totals in &stats.categories {
            out.push_str(&format!(
                "\n{:<16}  {:>9}  {:>10}",
                totals.category, totals.income, totals.expense
            ));
        }
    }
    out
}

pub fn shares(title: &str, shares: &[CategoryShare]) -> String {
    let mut out = title.to_string();
    if shares.is_empty() {
        out.push_str("\n  (none)");
    }
    for share in shares {
        out.push_str(&format!(
            "\n  {:<16} {:>10} {:>5.1}%  ({})",
            share.category, share.amount, share.percentage, share.transaction_count
        ));
    }
    out
}
