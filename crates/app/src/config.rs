use std::time::Duration;

use chrono_tz::Tz;
use clap::Parser;
use client::DEFAULT_TIMEOUT;
use serde::Deserialize;
use tracing::warn;

use crate::{
    commands::Command,
    error::{AppError, Result},
};

const DEFAULT_CONFIG_PATH: &str = "config/finance_tracker.toml";
const ENV_PREFIX: &str = "FINANCE_TRACKER";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub timeout_ms: i64,
    pub token: Option<String>,
    pub timezone: String,
    pub log_level: String,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as i64,
            token: None,
            timezone: "UTC".to_string(),
            log_level: "info".to_string(),
            debug: false,
        }
    }
}

/// Validated configuration the rest of the binary runs on.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub timeout: Duration,
    pub token: Option<String>,
    pub timezone: Tz,
    pub debug: bool,
}

impl AppConfig {
    /// Validates the raw values. Call after logging is up: recoverable
    /// problems are reported as warnings.
    pub fn resolve(self) -> Result<Settings> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::Settings(format!(
                "base_url is required (config file, {ENV_PREFIX}_BASE_URL or --base-url)"
            )));
        }
        if is_loopback(&base_url) {
            warn!(base_url = %base_url, "base_url points to this machine; other devices will not reach it");
        }

        let timeout = match u64::try_from(self.timeout_ms) {
            Ok(ms) if ms > 0 => Duration::from_millis(ms),
            _ => {
                warn!(
                    timeout_ms = self.timeout_ms,
                    "timeout must be positive, using {} ms",
                    DEFAULT_TIMEOUT.as_millis()
                );
                DEFAULT_TIMEOUT
            }
        };

        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| AppError::TimeZone(self.timezone.clone()))?;

        let token = self.token.filter(|token| !token.trim().is_empty());

        Ok(Settings {
            base_url,
            timeout,
            token,
            timezone,
            debug: self.debug,
        })
    }
}

fn is_loopback(base_url: &str) -> bool {
    let rest = base_url.split_once("://").map_or(base_url, |(_, rest)| rest);
    ["localhost", "127.0.0.1", "[::1]"].iter().any(|host| {
        rest.strip_prefix(host)
            .is_some_and(|tail| tail.is_empty() || tail.starts_with([':', '/']))
    })
}

#[derive(Debug, Parser)]
#[command(name = "finance_tracker", about = "Track income and expenses against a remote ledger")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Override base URL (e.g. https://api.example.com).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override request timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<i64>,
    /// Bearer token sent with every request.
    #[arg(long, global = true)]
    token: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long, global = true)]
    timezone: Option<String>,
    /// Override log level.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

pub fn load(args: &Cli) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.timeout_ms = timeout_ms;
    }
    if let Some(token) = &args.token {
        settings.token = Some(token.clone());
    }
    if let Some(timezone) = &args.timezone {
        settings.timezone = timezone.clone();
    }
    if let Some(log_level) = &args.log_level {
        settings.log_level = log_level.clone();
    }
    if args.debug {
        settings.debug = true;
    }

    Ok(settings)
}
