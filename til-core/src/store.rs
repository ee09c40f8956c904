//! The remote fact store as the core sees it.
//!
//! `FactStore` is the whole contract: a filtered listing, an insert and a vote
//! increment, each one network-bound and fallible. `SupabaseFactStore` is the
//! production implementation over the Supabase REST API; `testing::MemoryStore`
//! is the in-process one.

use crate::category::CategoryFilter;
use crate::config::StoreConfig;
use crate::fact::{Fact, FactId, NewFact, VoteField};
use async_trait::async_trait;
use supabase::{Order, Query, Supabase};
use thiserror::Error;
use tracing::{debug, warn};

/// Most facts a single listing returns.
pub const MAX_FACTS: usize = 1000;

/// Any failure reported by the store.
///
/// The controller treats every variant the same way; the split exists for
/// messages and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("store error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("could not decode store response: {0}")]
    Decode(String),

    #[error("fact {0} not found")]
    NotFound(FactId),

    #[error("store rejected the request: {0}")]
    Rejected(String),

    #[error("store misconfigured: {0}")]
    Config(String),
}

impl From<supabase::Error> for StoreError {
    fn from(err: supabase::Error) -> Self {
        match err {
            supabase::Error::Network(msg) => StoreError::Network(msg),
            supabase::Error::Api { status, message } => StoreError::Api { status, message },
            supabase::Error::Parse(msg) => StoreError::Decode(msg),
            supabase::Error::Config(msg) => StoreError::Config(msg),
        }
    }
}

/// Remote persistence for facts.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Facts admitted by `filter`, most interesting first, at most [`MAX_FACTS`].
    async fn list_by_category(&self, filter: CategoryFilter) -> Result<Vec<Fact>, StoreError>;

    /// Store a new fact and return it as the store recorded it.
    async fn insert(&self, fact: &NewFact) -> Result<Fact, StoreError>;

    /// Set `field` of fact `id` to `current + 1` and return the updated record.
    ///
    /// This is a write of a client-computed value, not an atomic server-side
    /// increment: two requests built from the same `current` record one vote.
    async fn increment_vote(
        &self,
        id: FactId,
        field: VoteField,
        current: u32,
    ) -> Result<Fact, StoreError>;
}

/// Next value of a counter, refusing to wrap.
pub(crate) fn next_vote(id: FactId, field: VoteField, current: u32) -> Result<u32, StoreError> {
    current
        .checked_add(1)
        .ok_or_else(|| StoreError::Rejected(format!("{field} counter of fact {id} is saturated")))
}

/// `FactStore` backed by a Supabase table.
#[derive(Clone)]
pub struct SupabaseFactStore {
    client: Supabase,
    table: String,
}

impl SupabaseFactStore {
    /// Connect using `config`.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Supabase::new(&config.url, config.key.clone())?
            .with_timeouts(config.timeout, config.connect_timeout)?;
        Ok(Self::with_client(client, config.table.clone()))
    }

    /// Wrap an existing client.
    pub fn with_client(client: Supabase, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn list_query(filter: CategoryFilter) -> Query {
        let query = match filter.category() {
            Some(category) => Query::new().eq("category", category),
            None => Query::new(),
        };
        query
            .order(VoteField::Interesting.column(), Order::Descending)
            .limit(MAX_FACTS)
    }

    fn vote_patch(field: VoteField, value: u32) -> serde_json::Value {
        let mut patch = serde_json::Map::new();
        patch.insert(field.column().to_string(), value.into());
        serde_json::Value::Object(patch)
    }
}

#[async_trait]
impl FactStore for SupabaseFactStore {
    async fn list_by_category(&self, filter: CategoryFilter) -> Result<Vec<Fact>, StoreError> {
        let mut facts: Vec<Fact> = self
            .client
            .select(&self.table, &Self::list_query(filter))
            .await
            .inspect_err(|e| warn!(%filter, error = %e, "listing facts failed"))?;

        // The server honours the limit; this only guards a misbehaving proxy.
        facts.truncate(MAX_FACTS);
        debug!(%filter, count = facts.len(), "listed facts");
        Ok(facts)
    }

    async fn insert(&self, fact: &NewFact) -> Result<Fact, StoreError> {
        let rows: Vec<Fact> = self
            .client
            .insert(&self.table, std::slice::from_ref(fact))
            .await
            .inspect_err(|e| warn!(category = %fact.category, error = %e, "insert failed"))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Rejected("insert returned no rows".to_string()))
    }

    async fn increment_vote(
        &self,
        id: FactId,
        field: VoteField,
        current: u32,
    ) -> Result<Fact, StoreError> {
        let value = next_vote(id, field, current)?;
        let rows: Vec<Fact> = self
            .client
            .update(
                &self.table,
                &Query::new().eq("id", id),
                &Self::vote_patch(field, value),
            )
            .await
            .inspect_err(|e| warn!(fact_id = %id, %field, error = %e, "vote update failed"))?;

        rows.into_iter().next().ok_or(StoreError::NotFound(id))
    }
}
