use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid settings: {0}")]
    Settings(String),
    #[error("unknown timezone: {0}")]
    TimeZone(String),
    #[error("client error: {0}")]
    Client(#[from] client::ClientError),
    #[error("request failed: {0}")]
    Request(#[from] client::RequestFailed),
    #[error("invalid amount: {0}")]
    Money(#[from] api_types::MoneyError),
    #[error("invalid input: {0}")]
    Input(String),
}
