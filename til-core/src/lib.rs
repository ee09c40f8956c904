//! Sync core for the Today I Learned fact board.
//!
//! This crate provides:
//! - The fact data model and the fixed category set
//! - Submission validation
//! - The `FactStore` contract and its Supabase implementation
//! - `SyncController`, which keeps an in-memory board consistent with the store
//!   across category changes, submissions and votes
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use til_core::{Category, StoreConfig, SupabaseFactStore, SyncController, VoteField};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SupabaseFactStore::new(&StoreConfig::from_env()?)?;
//!     let board = SyncController::new(Arc::new(store));
//!
//!     board.change_category(Category::Science.into()).await?;
//!     let first = board.snapshot().facts().items()[0].id;
//!     board.cast_vote(first, VoteField::Mindblowing).await?;
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod category;
pub mod config;
pub mod controller;
pub mod fact;
pub mod list;
pub mod store;
pub mod testing;
pub mod validate;

// Primary public API
pub use board::{BoardState, FactDraft, FactForm, Notice, Operation};
pub use category::{Category, CategoryFilter, UnknownCategory};
pub use config::{ConfigError, StoreConfig};
pub use controller::{FetchOutcome, SyncController, SyncError};
pub use fact::{Fact, FactId, NewFact, VoteField};
pub use list::FactList;
pub use store::{FactStore, StoreError, SupabaseFactStore, MAX_FACTS};
pub use testing::{MemoryStore, StoreOp};
pub use validate::{is_submittable, validate, ValidationError, MAX_TEXT_CHARS};
