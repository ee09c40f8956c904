//! The in-memory list of facts for the selected category.

use crate::category::CategoryFilter;
use crate::fact::{Fact, FactId};
use std::collections::HashSet;

/// Facts currently on the board, with the filter they were fetched for.
///
/// Every mutation is a single method call; the controller applies each one
/// inside one `watch` update so readers never see a half-applied change.
///
/// `active_category` is the user's selection and moves as soon as a new
/// category is picked; `listed_category` is the filter the items were fetched
/// for and only moves when a listing for the selection lands. Every item is
/// admitted by `listed_category`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactList {
    items: Vec<Fact>,
    is_loading: bool,
    active_category: CategoryFilter,
    listed_category: CategoryFilter,
}

impl FactList {
    /// An empty list showing every category.
    pub fn new() -> Self {
        Self::default()
    }

    /// Facts in display order.
    pub fn items(&self) -> &[Fact] {
        &self.items
    }

    pub fn get(&self, id: FactId) -> Option<&Fact> {
        self.items.iter().find(|f| f.id == id)
    }

    pub fn contains(&self, id: FactId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a listing for the active category is outstanding.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn active_category(&self) -> CategoryFilter {
        self.active_category
    }

    /// The filter the current items were fetched for.
    pub fn listed_category(&self) -> CategoryFilter {
        self.listed_category
    }

    /// Line shown under the list.
    pub fn summary(&self) -> String {
        if self.items.is_empty() {
            "No facts for this category yet! Create the first one ✌️".to_string()
        } else {
            format!(
                "There are {} facts in the database. Add your own!",
                self.items.len()
            )
        }
    }

    /// Swap in a freshly fetched list for the active category.
    ///
    /// Records outside the active category and repeated ids are dropped;
    /// returns how many were.
    pub fn replace_all(&mut self, mut items: Vec<Fact>) -> usize {
        let before = items.len();
        let filter = self.active_category;
        let mut seen = HashSet::with_capacity(items.len());
        items.retain(|f| filter.admits(f.category) && seen.insert(f.id));
        self.items = items;
        self.listed_category = filter;
        before - self.items.len()
    }

    /// Put a newly created fact at the head of the list.
    ///
    /// A record already holding the same id is dropped first, so ids stay
    /// unique. A fact the listed category does not admit is not shown and
    /// `false` is returned.
    pub fn prepend(&mut self, item: Fact) -> bool {
        if !self.listed_category.admits(item.category) {
            return false;
        }
        self.items.retain(|f| f.id != item.id);
        self.items.insert(0, item);
        true
    }

    /// Replace the record with `id` by `updated`, keeping its position.
    ///
    /// Returns `false` when no such record is on the list.
    pub fn replace_one(&mut self, id: FactId, updated: Fact) -> bool {
        match self.items.iter_mut().find(|f| f.id == id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_active_category(&mut self, filter: CategoryFilter) {
        self.active_category = filter;
    }
}
