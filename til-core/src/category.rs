//! The fixed set of fact categories and the list filter built on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic a fact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technology,
    Science,
    Finance,
    Society,
    Entertainment,
    Health,
    History,
    News,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 8] = [
        Category::Technology,
        Category::Science,
        Category::Finance,
        Category::Society,
        Category::Entertainment,
        Category::Health,
        Category::History,
        Category::News,
    ];

    /// The name stored in the `category` column.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Technology => "technology",
            Category::Science => "science",
            Category::Finance => "finance",
            Category::Society => "society",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::History => "history",
            Category::News => "news",
        }
    }

    /// Tag color used when rendering this category.
    pub fn color(&self) -> &'static str {
        match self {
            Category::Technology => "#3b82f6",
            Category::Science => "#16a34a",
            Category::Finance => "#ef4444",
            Category::Society => "#eab308",
            Category::Entertainment => "#db2777",
            Category::Health => "#14b8a6",
            Category::History => "#f97316",
            Category::News => "#8b5cf6",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Which facts the board is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Whether a fact of `category` belongs in a list filtered this way.
    pub fn admits(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(only) => *only == category,
        }
    }

    /// The category to filter on, or `None` for all.
    pub fn category(&self) -> Option<Category> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Only(category) => Some(*category),
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Only(category)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => category.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}
