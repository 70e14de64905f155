use std::sync::Arc;

use clap::Parser;
use client::{CacheConfig, HttpGateway, QueryCache, StaticToken, StoreOptions, TransactionStore};

use crate::error::Result;

mod commands;
mod config;
mod error;
mod output;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = config::Cli::parse();
    let raw = config::load(&cli)?;

    let cache_level = if raw.debug { "debug" } else { raw.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "finance_tracker={level},engine={level},client={cache_level}",
            level = raw.log_level
        ))
        .with_writer(std::io::stderr)
        .init();

    let settings = raw.resolve()?;
    tracing::debug!(base_url = %settings.base_url, timezone = %settings.timezone, "settings loaded");

    let gateway = HttpGateway::new(&settings.base_url, settings.timeout)?
        .with_token_source(Arc::new(StaticToken(settings.token.clone())));
    let store = TransactionStore::builder(Arc::new(gateway))
        .cache(QueryCache::new(CacheConfig::default()))
        .options(StoreOptions {
            refetch_on_focus: settings.debug,
            ..StoreOptions::default()
        })
        .build();
    let _maintenance = store.spawn_maintenance();

    commands::run(cli.command, &store, settings.timezone).await
}
