//! Reorder buffer
//!
//! Workers finish in any order; progress must be committed in chunk-id order.
//! Results that arrive early wait in a holding map until every chunk before
//! them has been released.

use std::collections::{BTreeMap, VecDeque};

/// Releases items in a fixed order regardless of arrival order
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    /// Ids still to be released, in release order
    expected: VecDeque<u64>,
    holding: BTreeMap<u64, T>,
}

impl<T> ReorderBuffer<T> {
    /// `order` lists every id that will be inserted, in release order
    pub fn new(order: impl IntoIterator<Item = u64>) -> Self {
        Self {
            expected: order.into_iter().collect(),
            holding: BTreeMap::new(),
        }
    }

    /// Park `item` and return everything that is now releasable, in order
    pub fn insert(&mut self, id: u64, item: T) -> Vec<(u64, T)> {
        self.holding.insert(id, item);

        let mut released = Vec::new();
        while let Some(&next) = self.expected.front() {
            match self.holding.remove(&next) {
                Some(item) => {
                    self.expected.pop_front();
                    released.push((next, item));
                }
                None => break,
            }
        }
        released
    }

    /// Next id to be released
    pub fn cursor(&self) -> Option<u64> {
        self.expected.front().copied()
    }

    /// Number of items waiting on an earlier id
    pub fn held(&self) -> usize {
        self.holding.len()
    }

    pub fn is_drained(&self) -> bool {
        self.expected.is_empty()
    }
}
