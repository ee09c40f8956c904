//! Testing utilities for the fact board.
//!
//! This module provides tools for integration testing:
//! - `MemoryStore`, an in-process `FactStore` that behaves like the real table
//! - Failure injection and request holds for exercising the controller's guards
//! - The seed facts the board started out with

use crate::category::{Category, CategoryFilter};
use crate::fact::{Fact, FactId, NewFact, VoteField};
use crate::store::{next_vote, FactStore, StoreError, MAX_FACTS};
use crate::validate::MAX_TEXT_CHARS;
use async_trait::async_trait;
use chrono::Datelike;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

/// Kinds of store request, for failure injection, holds and call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Insert,
    Vote,
}

/// A parked store request. The request completes once released.
///
/// Dropping a `Hold` without releasing it leaves the request parked.
#[derive(Debug, Clone)]
pub struct Hold {
    gate: Arc<Semaphore>,
}

impl Hold {
    /// Let the parked request proceed.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[derive(Default)]
struct Inner {
    rows: Vec<Fact>,
    next_id: i64,
    year: Option<i32>,
    failures: HashMap<StoreOp, VecDeque<StoreError>>,
    holds: HashMap<StoreOp, VecDeque<Arc<Semaphore>>>,
    calls: HashMap<StoreOp, usize>,
    vote_answer_id: Option<FactId>,
}

/// An in-memory fact table.
///
/// Assigns ids, zeroes counters and stamps the creation year on insert;
/// filters, sorts by interesting votes and caps listings like the real query;
/// writes the requested counter value on vote.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty table.
    pub fn new() -> Self {
        Self::with_facts(Vec::new())
    }

    /// A table holding `facts`. New ids continue after the largest one.
    pub fn with_facts(facts: Vec<Fact>) -> Self {
        let next_id = facts.iter().map(|f| f.id.get()).max().unwrap_or(0) + 1;
        Self {
            inner: Mutex::new(Inner {
                rows: facts,
                next_id,
                ..Inner::default()
            }),
        }
    }

    /// A table holding [`sample_facts`].
    pub fn with_sample_facts() -> Self {
        Self::with_facts(sample_facts())
    }

    /// Stamp inserted facts with `year` instead of the current one.
    pub fn with_year(self, year: i32) -> Self {
        self.lock().year = Some(year);
        self
    }

    /// Every stored row, in insertion order.
    pub fn rows(&self) -> Vec<Fact> {
        self.lock().rows.clone()
    }

    /// The stored row for `id`.
    pub fn row(&self, id: FactId) -> Option<Fact> {
        self.lock().rows.iter().find(|f| f.id == id).cloned()
    }

    /// Make the next `op` request fail with a network error.
    pub fn fail_next(&self, op: StoreOp) {
        self.fail_next_with(op, StoreError::Network("connection reset by peer".to_string()));
    }

    /// Make the next `op` request fail with `err`.
    pub fn fail_next_with(&self, op: StoreOp, err: StoreError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    /// Park the next `op` request until the returned hold is released.
    pub fn hold(&self, op: StoreOp) -> Hold {
        let gate = Arc::new(Semaphore::new(0));
        self.lock()
            .holds
            .entry(op)
            .or_default()
            .push_back(gate.clone());
        Hold { gate }
    }

    /// Answer every vote with the record of `id` instead of the voted fact.
    pub fn answer_votes_with(&self, id: FactId) {
        self.lock().vote_answer_id = Some(id);
    }

    /// How many `op` requests have been received.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the request, wait out any hold, then report an injected failure.
    async fn arrive(&self, op: StoreOp) -> Result<(), StoreError> {
        let gate = {
            let mut inner = self.lock();
            *inner.calls.entry(op).or_default() += 1;
            inner.holds.get_mut(&op).and_then(VecDeque::pop_front)
        };

        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| StoreError::Network("held request abandoned".to_string()))?;
        }

        let failure = self.lock().failures.get_mut(&op).and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FactStore for MemoryStore {
    async fn list_by_category(&self, filter: CategoryFilter) -> Result<Vec<Fact>, StoreError> {
        self.arrive(StoreOp::List).await?;

        let mut facts: Vec<Fact> = self
            .lock()
            .rows
            .iter()
            .filter(|f| filter.admits(f.category))
            .cloned()
            .collect();
        facts.sort_by(|a, b| b.votes_interesting.cmp(&a.votes_interesting));
        facts.truncate(MAX_FACTS);
        Ok(facts)
    }

    async fn insert(&self, fact: &NewFact) -> Result<Fact, StoreError> {
        self.arrive(StoreOp::Insert).await?;

        let len = fact.text.chars().count();
        if len == 0 || len > MAX_TEXT_CHARS {
            return Err(StoreError::Api {
                status: 400,
                message: "new row violates check constraint \"facts_text_check\"".to_string(),
            });
        }

        let mut inner = self.lock();
        let created_in = inner.year.unwrap_or_else(|| chrono::Utc::now().year());
        let stored = Fact {
            id: FactId::new(inner.next_id),
            text: fact.text.clone(),
            source: fact.source.clone(),
            category: fact.category,
            votes_interesting: 0,
            votes_mindblowing: 0,
            votes_false: 0,
            created_in,
        };
        inner.next_id += 1;
        inner.rows.push(stored.clone());
        Ok(stored)
    }

    async fn increment_vote(
        &self,
        id: FactId,
        field: VoteField,
        current: u32,
    ) -> Result<Fact, StoreError> {
        self.arrive(StoreOp::Vote).await?;
        let value = next_vote(id, field, current)?;

        let mut inner = self.lock();
        let answer_id = inner.vote_answer_id;
        let row = inner
            .rows
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::NotFound(id))?;
        *row.votes_mut(field) = value;

        let mut answer = row.clone();
        if let Some(other) = answer_id {
            answer.id = other;
        }
        Ok(answer)
    }
}

/// Build a fact with the given counters (interesting, mind-blowing, false).
pub fn fact(id: i64, category: Category, votes: [u32; 3]) -> Fact {
    Fact {
        id: FactId::new(id),
        text: format!("Fact number {id}"),
        source: format!("https://example.com/facts/{id}"),
        category,
        votes_interesting: votes[0],
        votes_mindblowing: votes[1],
        votes_false: votes[2],
        created_in: 2024,
    }
}

/// The three facts the board was seeded with.
pub fn sample_facts() -> Vec<Fact> {
    vec![
        Fact {
            id: FactId::new(1),
            text: "React is being developed by Meta (formerly facebook)".to_string(),
            source: "https://opensource.fb.com/".to_string(),
            category: Category::Technology,
            votes_interesting: 24,
            votes_mindblowing: 9,
            votes_false: 4,
            created_in: 2021,
        },
        Fact {
            id: FactId::new(2),
            text: "Millennial dads spend 3 times as much time with their kids than their fathers spent with them. In 1982, 43% of fathers had never changed a diaper. Today, that number is down to 3%".to_string(),
            source: "https://www.mother.ly/parenting/millennial-dads-spend-more-time-with-their-kids".to_string(),
            category: Category::Society,
            votes_interesting: 11,
            votes_mindblowing: 2,
            votes_false: 0,
            created_in: 2019,
        },
        Fact {
            id: FactId::new(3),
            text: "Lisbon is the capital of Portugal".to_string(),
            source: "https://en.wikipedia.org/wiki/Lisbon".to_string(),
            category: Category::Society,
            votes_interesting: 8,
            votes_mindblowing: 3,
            votes_false: 1,
            created_in: 2015,
        },
    ]
}
