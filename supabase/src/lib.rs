//! Minimal Supabase REST client.
//!
//! This crate provides a focused client for the PostgREST endpoint that every
//! Supabase project exposes under `/rest/v1`, with:
//! - Filtered, ordered and limited selects
//! - Inserts and updates that return the stored representation
//! - PostgREST error bodies surfaced as typed errors

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const REST_PATH: &str = "/rest/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when using the Supabase client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Supabase REST client bound to one project.
#[derive(Clone)]
pub struct Supabase {
    client: reqwest::Client,
    rest_url: String,
    api_key: String,
}

impl Supabase {
    /// Create a client for the given project URL and API key.
    ///
    /// The project URL is the bare `https://<ref>.supabase.co` address; the
    /// REST path is appended here.
    pub fn new(project_url: impl AsRef<str>, api_key: impl Into<String>) -> Result<Self, Error> {
        let project_url = project_url.as_ref().trim().trim_end_matches('/');
        if project_url.is_empty() {
            return Err(Error::Config("empty project URL".to_string()));
        }
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("empty API key".to_string()));
        }

        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)?,
            rest_url: format!("{project_url}{REST_PATH}"),
            api_key,
        })
    }

    /// Replace the request and connect timeouts.
    pub fn with_timeouts(mut self, request: Duration, connect: Duration) -> Result<Self, Error> {
        self.client = build_client(request, connect)?;
        Ok(self)
    }

    /// The REST base URL, e.g. `https://abc.supabase.co/rest/v1`.
    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    /// Select rows from `table` matching `query`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, Error> {
        let pairs = query.to_pairs();
        debug!(table, query = ?pairs, "supabase select");

        let response = self
            .client
            .get(self.table_url(table))
            .headers(self.build_headers(false)?)
            .query(&pairs)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        read_rows(response).await
    }

    /// Insert `rows` into `table` and return the stored rows.
    pub async fn insert<B, T>(&self, table: &str, rows: &[B]) -> Result<Vec<T>, Error>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        debug!(table, rows = rows.len(), "supabase insert");

        let response = self
            .client
            .post(self.table_url(table))
            .headers(self.build_headers(true)?)
            .query(&[("select", "*")])
            .json(rows)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        read_rows(response).await
    }

    /// Apply `patch` to every row of `table` matching `query` and return the updated rows.
    ///
    /// Only the query's filters are used; an update never carries order or limit.
    pub async fn update<B, T>(&self, table: &str, query: &Query, patch: &B) -> Result<Vec<T>, Error>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let mut pairs = query.filter_pairs();
        pairs.push(("select".to_string(), "*".to_string()));
        debug!(table, query = ?pairs, "supabase update");

        let response = self
            .client
            .patch(self.table_url(table))
            .headers(self.build_headers(true)?)
            .query(&pairs)
            .json(patch)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        read_rows(response).await
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn build_headers(&self, returning: bool) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        if returning {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }
        Ok(headers)
    }
}

fn build_client(timeout: Duration, connect_timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
}

async fn read_rows<T: DeserializeOwned>(response: reqwest::Response) -> Result<Vec<T>, Error> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            status,
            message: api_error_message(&body),
        });
    }

    response
        .json()
        .await
        .map_err(|e| Error::Parse(e.to_string()))
}

/// Pull the human-readable message out of a PostgREST error body, falling
/// back to the raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => match err.details {
            Some(details) if !details.is_empty() => format!("{} ({details})", err.message),
            _ => err.message,
        },
        Err(_) => body.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    details: Option<String>,
}

// ============================================================================
// Query building
// ============================================================================

/// Sort direction for an `order` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Descending,
}

impl Order {
    fn as_str(self) -> &'static str {
        match self {
            Order::Descending => "desc",
        }
    }
}

/// A PostgREST query over every column: equality filters, ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
    limit: Option<usize>,
}

impl Query {
    /// An empty query selecting every column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only rows where `column` equals `value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters
            .push((column.into(), format!("eq.{}", value.to_string())));
        self
    }

    /// Order rows by `column`.
    pub fn order(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order = Some((column.into(), order));
        self
    }

    /// Return at most `limit` rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the query as URL query pairs.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(self.filter_pairs());
        if let Some((column, order)) = &self.order {
            pairs.push(("order".to_string(), format!("{column}.{}", order.as_str())));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters.clone()
    }
}
