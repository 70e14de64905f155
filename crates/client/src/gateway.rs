use std::{sync::Arc, time::Duration};

use api_types::{
    ErrorBody,
    health::Health,
    pagination::{PaginationMeta, PaginationParams, TransactionPage},
    transaction::{CreateTransaction, Transaction, UpdateTransaction},
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote transactions resource.
///
/// [`HttpGateway`] is the only implementation that performs I/O; the trait
/// exists so the store can run against any backend.
#[async_trait]
pub trait TransactionApi: Send + Sync {
    async fn health(&self) -> Result<Health, ClientError>;

    /// Whole collection. A body that is not an array reads as empty.
    async fn list_all(&self) -> Result<Vec<Transaction>, ClientError>;

    /// One page. A bare array body is wrapped as a single page.
    async fn list_paginated(
        &self,
        params: &PaginationParams,
    ) -> Result<TransactionPage, ClientError>;

    async fn get(&self, id: &str) -> Result<Transaction, ClientError>;

    async fn create(&self, payload: &CreateTransaction) -> Result<Transaction, ClientError>;

    async fn update(
        &self,
        id: &str,
        payload: &UpdateTransaction,
    ) -> Result<Transaction, ClientError>;

    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

/// Supplies the session token, if any, for each request.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A token fixed at startup (or no token at all).
#[derive(Clone, Debug, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Clone)]
pub struct HttpGateway {
    base_url: Url,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ClientError::Invalid(format!("invalid base_url: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::from)?;
        Ok(Self {
            base_url,
            http,
            tokens: Arc::new(StaticToken::default()),
        })
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, self.url(path));
        match self.tokens.bearer_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Sends the request and turns any non-2xx answer into an error.
    async fn send(&self, req: RequestBuilder) -> Result<Response, ClientError> {
        let res = req.send().await?;
        let status = res.status();
        debug!(status = %status, url = %res.url(), "response received");
        if status.is_success() {
            return Ok(res);
        }

        let message = match res.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "unknown error".to_string(),
        };
        Err(ClientError::from_status(status, message))
    }

    async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
        let status = res.status();
        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| decode_error(status, err))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let res = self.send(self.request(Method::GET, path)).await?;
        Self::read_json(res).await
    }
}

fn decode_error(status: StatusCode, err: serde_json::Error) -> ClientError {
    ClientError::Decode {
        status,
        message: err.to_string(),
    }
}

/// Accepts either `{data, pagination}` or a bare array.
fn normalize_page(status: StatusCode, body: Value) -> Result<TransactionPage, ClientError> {
    let is_page = body
        .as_object()
        .is_some_and(|map| map.contains_key("data") && map.contains_key("pagination"));
    if is_page {
        return serde_json::from_value(body).map_err(|err| decode_error(status, err));
    }

    match body {
        Value::Array(_) => {
            let data: Vec<Transaction> =
                serde_json::from_value(body).map_err(|err| decode_error(status, err))?;
            let pagination = PaginationMeta::single_page(data.len());
            Ok(TransactionPage { data, pagination })
        }
        other => {
            warn!(kind = json_kind(&other), "unexpected list body, treating as empty");
            Ok(TransactionPage {
                data: Vec::new(),
                pagination: PaginationMeta::single_page(0),
            })
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl TransactionApi for HttpGateway {
    async fn health(&self) -> Result<Health, ClientError> {
        self.get_json("health").await
    }

    async fn list_all(&self) -> Result<Vec<Transaction>, ClientError> {
        let res = self.send(self.request(Method::GET, "transactions")).await?;
        let status = res.status();
        match Self::read_json::<Value>(res).await? {
            body @ Value::Array(_) => {
                serde_json::from_value(body).map_err(|err| decode_error(status, err))
            }
            other => {
                warn!(kind = json_kind(&other), "transaction list is not an array, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn list_paginated(
        &self,
        params: &PaginationParams,
    ) -> Result<TransactionPage, ClientError> {
        let req = self.request(Method::GET, "transactions").query(params);
        let res = self.send(req).await?;
        let status = res.status();
        let body = Self::read_json::<Value>(res).await?;
        normalize_page(status, body)
    }

    async fn get(&self, id: &str) -> Result<Transaction, ClientError> {
        self.get_json(&format!("transactions/{id}")).await
    }

    async fn create(&self, payload: &CreateTransaction) -> Result<Transaction, ClientError> {
        let req = self.request(Method::POST, "transactions").json(payload);
        let res = self.send(req).await?;
        Self::read_json(res).await
    }

    async fn update(
        &self,
        id: &str,
        payload: &UpdateTransaction,
    ) -> Result<Transaction, ClientError> {
        let req = self
            .request(Method::PUT, &format!("transactions/{id}"))
            .json(payload);
        let res = self.send(req).await?;
        Self::read_json(res).await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("transactions/{id}")))
            .await?;
        Ok(())
    }
}
