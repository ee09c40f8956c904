//! Fact records as stored in the `facts` table.

use crate::category::Category;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned identifier of a fact.
///
/// Only the store mints these; the client never fabricates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactId(i64);

impl FactId {
    /// Wrap a key returned by the store.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw store key.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FactId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// One of the three vote counters on a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteField {
    Interesting,
    Mindblowing,
    False,
}

impl VoteField {
    pub const ALL: [VoteField; 3] = [VoteField::Interesting, VoteField::Mindblowing, VoteField::False];

    /// Column holding this counter.
    pub fn column(&self) -> &'static str {
        match self {
            VoteField::Interesting => "votesInteresting",
            VoteField::Mindblowing => "votesMindblowing",
            VoteField::False => "votesFalse",
        }
    }

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            VoteField::Interesting => "interesting",
            VoteField::Mindblowing => "mindblowing",
            VoteField::False => "false",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            VoteField::Interesting => "👍",
            VoteField::Mindblowing => "🤯",
            VoteField::False => "⛔️",
        }
    }
}

impl fmt::Display for VoteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VoteField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoteField::ALL
            .into_iter()
            .find(|field| field.name() == s || field.column() == s)
            .ok_or_else(|| format!("unknown vote field: {s:?}"))
    }
}

/// A fact as confirmed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub id: FactId,
    pub text: String,
    pub source: String,
    pub category: Category,
    pub votes_interesting: u32,
    pub votes_mindblowing: u32,
    pub votes_false: u32,
    pub created_in: i32,
}

impl Fact {
    /// Current value of one vote counter.
    pub fn votes(&self, field: VoteField) -> u32 {
        match field {
            VoteField::Interesting => self.votes_interesting,
            VoteField::Mindblowing => self.votes_mindblowing,
            VoteField::False => self.votes_false,
        }
    }

    pub(crate) fn votes_mut(&mut self, field: VoteField) -> &mut u32 {
        match field {
            VoteField::Interesting => &mut self.votes_interesting,
            VoteField::Mindblowing => &mut self.votes_mindblowing,
            VoteField::False => &mut self.votes_false,
        }
    }

    /// More people called it false than found it interesting or mind-blowing.
    ///
    /// Computed on read; never stored.
    pub fn is_disputed(&self) -> bool {
        u64::from(self.votes_false)
            > u64::from(self.votes_interesting) + u64::from(self.votes_mindblowing)
    }
}

/// A validated submission, ready to insert.
///
/// Carries no id or counters: the store assigns those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFact {
    pub text: String,
    pub source: String,
    pub category: Category,
}
