use api_types::{
    Money,
    category,
    pagination::{PaginationParams, SortBy, SortOrder},
    transaction::{CreateTransaction, TransactionKind, UpdateTransaction, economic_date},
};
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use clap::{Args, Subcommand};
use client::TransactionStore;
use tracing::{debug, info};

use crate::{
    error::{AppError, Result},
    output,
};

const RECENT: usize = 5;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the server answers.
    Health,
    /// List transactions, optionally one page at a time.
    List(ListArgs),
    /// Show one transaction.
    Show { id: String },
    /// Record a new transaction.
    Add(AddArgs),
    /// Change fields of an existing transaction.
    Edit(EditArgs),
    Delete { id: String },
    /// Balance and current-month figures.
    Summary,
    /// Totals and category breakdown.
    Stats,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long, value_parser = parse_sort_by)]
    sort_by: Option<SortBy>,
    #[arg(long, value_parser = parse_sort_order)]
    sort_order: Option<SortOrder>,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long = "type")]
    kind: TransactionKind,
    /// Amount in major units, e.g. `12.50` or `12,50`.
    #[arg(long)]
    amount: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    category: String,
    /// `YYYY-MM-DD` or RFC 3339. Defaults to now on the server.
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<FixedOffset>>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    id: String,
    #[arg(long = "type")]
    kind: Option<TransactionKind>,
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, value_parser = parse_date)]
    date: Option<DateTime<FixedOffset>>,
}

fn parse_sort_by(raw: &str) -> std::result::Result<SortBy, String> {
    match raw {
        "date" => Ok(SortBy::Date),
        "amount" => Ok(SortBy::Amount),
        "description" => Ok(SortBy::Description),
        "category" => Ok(SortBy::Category),
        "createdAt" | "created-at" => Ok(SortBy::CreatedAt),
        other => Err(format!("unsupported sort field: {other}")),
    }
}

fn parse_sort_order(raw: &str) -> std::result::Result<SortOrder, String> {
    match raw {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        other => Err(format!("unsupported sort order: {other}")),
    }
}

fn parse_date(raw: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    economic_date::parse(raw).ok_or_else(|| format!("invalid date: {raw}"))
}

fn note_category(kind: TransactionKind, label: &str) {
    if !category::is_suggested(kind, label) {
        info!(category = label, kind = kind.as_str(), "category is not in the suggested list");
    }
}

pub async fn run(command: Command, store: &TransactionStore, tz: Tz) -> Result<()> {
    debug!(?command, "running command");
    match command {
        Command::Health => {
            let health = store.health().await?;
            println!("{} ({})", health.status, health.timestamp);
        }
        Command::List(args) => list(store, args, tz).await?,
        Command::Show { id } => {
            let tx = store.transaction(&id).await?;
            println!("{}", output::transaction_detail(&tx, tz));
        }
        Command::Add(args) => {
            let payload = CreateTransaction {
                amount: args.amount.parse::<Money>()?,
                description: args.description,
                category: args.category,
                kind: args.kind,
                date: args.date,
            };
            note_category(payload.kind, &payload.category);
            let created = store.create(&payload).await?;
            println!("{}", output::transaction_line(&created, tz));
        }
        Command::Edit(args) => {
            let payload = UpdateTransaction {
                amount: args.amount.as_deref().map(str::parse::<Money>).transpose()?,
                description: args.description,
                category: args.category,
                kind: args.kind,
                date: args.date,
            };
            if payload.is_empty() {
                return Err(AppError::Input("nothing to change".to_string()));
            }
            if let (Some(kind), Some(label)) = (payload.kind, payload.category.as_deref()) {
                note_category(kind, label);
            }
            let updated = store.update(&args.id, &payload).await?;
            println!("{}", output::transaction_line(&updated, tz));
        }
        Command::Delete { id } => {
            store.delete(&id).await?;
            println!("deleted {id}");
        }
        Command::Summary => {
            let all = store.transactions(&PaginationParams::default()).await?;
            let now = Utc::now().with_timezone(&tz);
            println!("{}", output::summary(&engine::summarize(&all, &now)));
            let recent = engine::recent(&all, RECENT);
            if !recent.is_empty() {
                println!("\nrecent:");
                for tx in recent {
                    println!("{}", output::transaction_line(tx, tz));
                }
            }
        }
        Command::Stats => {
            let all = store.transactions(&PaginationParams::default()).await?;
            let now = Utc::now().with_timezone(&tz);
            println!("{}", output::statistics(&engine::statistics(&all, &now)));
            println!(
                "\n{}",
                output::shares("expenses", &engine::category_shares(&all, TransactionKind::Expense))
            );
            println!(
                "\n{}",
                output::shares("income", &engine::category_shares(&all, TransactionKind::Income))
            );
        }
    }
    Ok(())
}

async fn list(store: &TransactionStore, args: ListArgs, tz: Tz) -> Result<()> {
    let params = PaginationParams {
        page: args.page,
        limit: args.limit,
        sort_by: args.sort_by,
        sort_order: args.sort_order,
    };
    if !params.is_paginated() {
        for tx in store.transactions(&params).await? {
            println!("{}", output::transaction_line(&tx, tz));
        }
        return Ok(());
    }

    let page = store.transaction_page(&params).await?;
    for tx in &page.data {
        println!("{}", output::transaction_line(tx, tz));
    }
    println!("{}", output::page_footer(&page.pagination));
    Ok(())
}
