//! Everything the presentation layer renders, as one snapshot.

use crate::fact::{FactId, NewFact};
use crate::list::FactList;
use crate::store::StoreError;
use crate::validate::{self, ValidationError};
use std::collections::HashSet;
use std::fmt;

/// A consistent view of the board: the list, what is busy, and the last problem.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub(crate) facts: FactList,
    pub(crate) voting: HashSet<FactId>,
    pub(crate) form: FactForm,
    pub(crate) notice: Option<Notice>,
    pub(crate) fetch_generation: u64,
}

impl BoardState {
    pub fn facts(&self) -> &FactList {
        &self.facts
    }

    /// Whether a vote on `id` is awaiting the store. Its vote buttons stay disabled meanwhile.
    pub fn is_voting(&self, id: FactId) -> bool {
        self.voting.contains(&id)
    }

    /// Number of votes awaiting the store.
    pub fn votes_in_flight(&self) -> usize {
        self.voting.len()
    }

    pub fn form(&self) -> &FactForm {
        &self.form
    }

    /// The last store failure, until dismissed.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }
}

/// The "share a fact" form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactForm {
    pub(crate) is_open: bool,
    pub(crate) draft: FactDraft,
    pub(crate) is_submitting: bool,
    pub(crate) rejection: Option<ValidationError>,
}

impl FactForm {
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn draft(&self) -> &FactDraft {
        &self.draft
    }

    /// Whether an insert is awaiting the store. Inputs are locked meanwhile.
    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// Why the last submit attempt was refused, for field-level display.
    pub fn rejection(&self) -> Option<&ValidationError> {
        self.rejection.as_ref()
    }
}

/// Field values typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactDraft {
    pub text: String,
    pub source: String,
    pub category: String,
}

impl FactDraft {
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            category: category.into(),
        }
    }

    /// Characters left for the text field.
    pub fn remaining_chars(&self) -> i64 {
        validate::remaining_chars(&self.text)
    }

    pub fn validate(&self) -> Result<NewFact, ValidationError> {
        validate::validate(&self.text, &self.source, &self.category)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Which entry point a notice came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadFacts,
    SubmitFact,
    Vote(FactId),
}

impl Operation {
    fn user_message(&self) -> &'static str {
        match self {
            Operation::LoadFacts => "There was a problem getting data",
            Operation::SubmitFact => "There was a problem saving the fact",
            Operation::Vote(_) => "There was a problem recording the vote",
        }
    }
}

/// A user-visible report of a failed store request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub operation: Operation,
    pub message: String,
    pub cause: StoreError,
}

impl Notice {
    pub(crate) fn new(operation: Operation, cause: StoreError) -> Self {
        Self {
            operation,
            message: operation.user_message().to_string(),
            cause,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.cause)
    }
}
