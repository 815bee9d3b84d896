use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Values keyed by ISO date. Zero-padded dates sort lexically, so string keys
/// keep chronological order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct History<T>(BTreeMap<String, T>);

impl<T> History<T> {
    pub fn new() -> History<T> {
        History(BTreeMap::new())
    }

    pub fn insert(&mut self, date: String, value: T) -> Option<T> {
        self.0.insert(date, value)
    }

    pub fn contains(&self, date: &str) -> bool {
        self.0.contains_key(date)
    }

    pub fn latest(&self) -> Option<&str> {
        self.0.keys().next_back().map(String::as_str)
    }

    /// Closest dates strictly before and after `date`.
    pub fn neighbors(&self, date: &str) -> (Option<&str>, Option<&str>) {
        let prev = self
            .0
            .range::<str, _>((Bound::Unbounded, Bound::Excluded(date)))
            .next_back();
        let next = self
            .0
            .range::<str, _>((Bound::Excluded(date), Bound::Unbounded))
            .next();
        (prev.map(|(k, _)| k.as_str()), next.map(|(k, _)| k.as_str()))
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, T> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> Default for History<T> {
    fn default() -> History<T> {
        History::new()
    }
}
