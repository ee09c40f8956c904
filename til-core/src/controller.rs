//! SyncController - keeps the board in step with the fact store.
//!
//! The controller owns the [`BoardState`] and is the only thing that mutates
//! it. Each entry point issues at most one store request and applies its
//! result as a single `watch` update, so subscribers see either the previous
//! snapshot or the next one.
//!
//! Entry points take `&self`: a category change, a submission and votes on
//! several facts can all be awaiting the store at once on the same task.
//! Three guards keep them from trampling each other:
//! - a fetch generation, so only the latest category change may replace the list
//! - a per-fact voting set, so a fact has at most one vote in flight
//! - a submitting flag, so the form has at most one insert in flight
//!
//! Nothing is written before the store confirms it. Failures leave the state
//! as it was, record a [`Notice`] and are returned to the caller; nothing is
//! retried. A request whose future is dropped before the store answers
//! (timeout, `select!`, task abort) releases its guard and changes nothing else.

use crate::board::{BoardState, FactDraft, Notice, Operation};
use crate::category::CategoryFilter;
use crate::fact::{Fact, FactId, VoteField};
use crate::store::{FactStore, StoreError};
use crate::validate::ValidationError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Errors from controller entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("invalid fact: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("a fact is already being submitted")]
    SubmissionInFlight,

    #[error("a vote on fact {0} is already in progress")]
    VoteInFlight(FactId),

    #[error("fact {0} is not on the board")]
    UnknownFact(FactId),
}

/// What happened to a category listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The listing replaced the board's facts.
    Applied { count: usize },
    /// A later category change was issued first; this response was discarded.
    Superseded,
}

/// A busy flag held while a store request is outstanding.
#[derive(Debug, Clone, Copy)]
enum Busy {
    Loading { generation: u64 },
    Submitting,
    Voting(FactId),
}

/// Clears its busy flag when dropped.
///
/// Completion paths clear the flag themselves, so on those paths the drop
/// finds nothing to do and sends no notification. It only takes effect when
/// the request future is abandoned mid-flight.
struct InFlight<'a> {
    state: &'a watch::Sender<BoardState>,
    busy: Busy,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a watch::Sender<BoardState>, busy: Busy) -> Self {
        Self { state, busy }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let busy = self.busy;
        let released = self.state.send_if_modified(|s| match busy {
            Busy::Loading { generation } => {
                // A later fetch owns the flag.
                if s.fetch_generation != generation || !s.facts.is_loading() {
                    return false;
                }
                s.facts.set_loading(false);
                true
            }
            Busy::Submitting => std::mem::replace(&mut s.form.is_submitting, false),
            Busy::Voting(id) => s.voting.remove(&id),
        });
        if released {
            debug!(?busy, "request abandoned before the store answered");
        }
    }
}

/// Orchestrates category changes, submissions and votes against a [`FactStore`].
pub struct SyncController {
    store: Arc<dyn FactStore>,
    state: watch::Sender<BoardState>,
}

impl SyncController {
    /// Create a controller with an empty board showing all categories.
    ///
    /// Nothing is fetched until [`refresh`](Self::refresh) or
    /// [`change_category`](Self::change_category) is called.
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        let (state, _) = watch::channel(BoardState::default());
        Self { store, state }
    }

    /// A read handle on the board that is notified after every change.
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state.subscribe()
    }

    /// A copy of the current board.
    pub fn snapshot(&self) -> BoardState {
        self.state.borrow().clone()
    }

    /// Whether a vote on `id` is awaiting the store.
    pub fn is_voting(&self, id: FactId) -> bool {
        self.state.borrow().is_voting(id)
    }

    // ========================================================================
    // Category change
    // ========================================================================

    /// Fetch the active category again.
    pub async fn refresh(&self) -> Result<FetchOutcome, SyncError> {
        let filter = self.state.borrow().facts.active_category();
        self.change_category(filter).await
    }

    /// Show `filter`, replacing the list once the store answers.
    ///
    /// If another category change is issued before this one resolves, this
    /// response is discarded whatever order the answers arrive in. On failure
    /// the previous list stays up.
    pub async fn change_category(&self, filter: CategoryFilter) -> Result<FetchOutcome, SyncError> {
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.fetch_generation += 1;
            generation = s.fetch_generation;
            s.facts.set_active_category(filter);
            s.facts.set_loading(true);
        });
        let _in_flight = InFlight::new(&self.state, Busy::Loading { generation });
        debug!(%filter, generation, "fetching facts");

        match self.store.list_by_category(filter).await {
            Ok(facts) => {
                let received = facts.len();
                let mut dropped = 0;
                let applied = self.state.send_if_modified(|s| {
                    if s.fetch_generation != generation {
                        return false;
                    }
                    dropped = s.facts.replace_all(facts);
                    s.facts.set_loading(false);
                    true
                });

                if !applied {
                    debug!(%filter, generation, "discarding superseded listing");
                    return Ok(FetchOutcome::Superseded);
                }
                if dropped > 0 {
                    warn!(%filter, dropped, "store returned rows outside the filter or duplicated");
                }
                debug!(%filter, generation, count = received - dropped, "listing applied");
                Ok(FetchOutcome::Applied {
                    count: received - dropped,
                })
            }
            Err(err) => {
                let current = self.state.send_if_modified(|s| {
                    if s.fetch_generation != generation {
                        return false;
                    }
                    s.facts.set_loading(false);
                    s.notice = Some(Notice::new(Operation::LoadFacts, err.clone()));
                    true
                });

                if !current {
                    debug!(%filter, generation, error = %err, "discarding superseded failure");
                    return Ok(FetchOutcome::Superseded);
                }
                warn!(%filter, error = %err, "listing facts failed");
                Err(err.into())
            }
        }
    }

    // ========================================================================
    // Fact submission
    // ========================================================================

    /// Open the form if closed, close it if open. Returns the new state.
    ///
    /// The form stays as it is while a submission is in flight.
    pub fn toggle_form(&self) -> bool {
        let mut open = false;
        self.state.send_if_modified(|s| {
            if s.form.is_submitting {
                open = s.form.is_open;
                return false;
            }
            s.form.is_open = !s.form.is_open;
            open = s.form.is_open;
            true
        });
        open
    }

    pub fn open_form(&self) {
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.form.is_open, true));
    }

    /// Close the form. Ignored while a submission is in flight.
    pub fn close_form(&self) {
        self.state.send_if_modified(|s| {
            !s.form.is_submitting && std::mem::replace(&mut s.form.is_open, false)
        });
    }

    /// Change the draft. Ignored while a submission is in flight; returns
    /// whether the edit was applied.
    pub fn edit_draft(&self, edit: impl FnOnce(&mut FactDraft)) -> bool {
        self.state.send_if_modified(|s| {
            if s.form.is_submitting {
                return false;
            }
            edit(&mut s.form.draft);
            true
        })
    }

    /// Validate the draft and insert it.
    ///
    /// An invalid draft issues no request and leaves the fields as they are.
    /// On success the stored fact is put at the head of the list, the draft is
    /// cleared and the form closed. On failure the form stays open and filled.
    pub async fn submit(&self) -> Result<Fact, SyncError> {
        let mut checked = Err(SyncError::SubmissionInFlight);
        self.state.send_if_modified(|s| {
            if s.form.is_submitting {
                return false;
            }
            match s.form.draft.validate() {
                Ok(new_fact) => {
                    s.form.is_submitting = true;
                    s.form.rejection = None;
                    checked = Ok(new_fact);
                }
                Err(err) => {
                    s.form.rejection = Some(err.clone());
                    checked = Err(err.into());
                }
            }
            true
        });
        let new_fact = checked.inspect_err(|e| debug!(error = %e, "submission refused"))?;
        let _in_flight = InFlight::new(&self.state, Busy::Submitting);

        debug!(category = %new_fact.category, "inserting fact");
        match self.store.insert(&new_fact).await {
            Ok(fact) => {
                let mut shown = false;
                self.state.send_modify(|s| {
                    shown = s.facts.prepend(fact.clone());
                    s.form.draft.clear();
                    s.form.rejection = None;
                    s.form.is_open = false;
                    s.form.is_submitting = false;
                });
                info!(fact_id = %fact.id, category = %fact.category, shown, "fact created");
                Ok(fact)
            }
            Err(err) => {
                self.state.send_modify(|s| {
                    s.form.is_submitting = false;
                    s.notice = Some(Notice::new(Operation::SubmitFact, err.clone()));
                });
                warn!(error = %err, "fact submission failed");
                Err(err.into())
            }
        }
    }

    /// Fill the draft with the given fields and submit it.
    pub async fn submit_fact(
        &self,
        text: impl Into<String>,
        source: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Fact, SyncError> {
        let draft = FactDraft::new(text, source, category);
        let mut filled = false;
        self.state.send_if_modified(|s| {
            if s.form.is_submitting {
                return false;
            }
            s.form.is_open = true;
            s.form.draft = draft;
            filled = true;
            true
        });
        if !filled {
            return Err(SyncError::SubmissionInFlight);
        }
        self.submit().await
    }

    // ========================================================================
    // Vote casting
    // ========================================================================

    /// Add one vote to `field` of fact `id`.
    ///
    /// The fact's counters change only when the store answers, and then to
    /// exactly what it returned. Other facts stay votable meanwhile; a second
    /// vote on the same fact is refused until the first resolves.
    pub async fn cast_vote(&self, id: FactId, field: VoteField) -> Result<Fact, SyncError> {
        let mut checked = Err(SyncError::UnknownFact(id));
        self.state.send_if_modified(|s| {
            let Some(fact) = s.facts.get(id) else {
                return false;
            };
            if s.voting.contains(&id) {
                checked = Err(SyncError::VoteInFlight(id));
                return false;
            }
            checked = Ok(fact.votes(field));
            s.voting.insert(id);
            true
        });
        let current = checked.inspect_err(|e| debug!(error = %e, "vote refused"))?;
        let _in_flight = InFlight::new(&self.state, Busy::Voting(id));

        debug!(fact_id = %id, %field, current, "casting vote");
        let result = self
            .store
            .increment_vote(id, field, current)
            .await
            .and_then(|updated| {
                if updated.id == id {
                    Ok(updated)
                } else {
                    Err(StoreError::Rejected(format!(
                        "vote on fact {id} answered with fact {}",
                        updated.id
                    )))
                }
            });

        match result {
            Ok(updated) => {
                self.state.send_modify(|s| {
                    s.voting.remove(&id);
                    s.facts.replace_one(id, updated.clone());
                });
                info!(fact_id = %id, %field, votes = updated.votes(field), "vote recorded");
                Ok(updated)
            }
            Err(err) => {
                self.state.send_modify(|s| {
                    s.voting.remove(&id);
                    s.notice = Some(Notice::new(Operation::Vote(id), err.clone()));
                });
                warn!(fact_id = %id, %field, error = %err, "vote failed");
                Err(err.into())
            }
        }
    }

    // ========================================================================
    // Notices
    // ========================================================================

    /// Clear the current notice.
    pub fn dismiss_notice(&self) {
        self.state.send_if_modified(|s| s.notice.take().is_some());
    }
}
