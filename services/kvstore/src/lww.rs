//! Last-writer-wins register map
//!
//! Each key holds the value of the write with the greatest
//! `(timestamp, reversed writer id)`: a later timestamp wins, and among equal
//! timestamps the lexicographically smaller writer id wins. Applying the same
//! set of writes in any order yields the same map.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One stored write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub value: String,
    /// Wall-clock milliseconds at the accepting partition
    pub timestamp: i64,
    /// Unique id of the write's origin
    pub writer: String,
}

impl StoreEntry {
    pub fn new(value: impl Into<String>, timestamp: i64, writer: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            timestamp,
            writer: writer.into(),
        }
    }

    /// Whether `self` replaces `stored`
    pub fn supersedes(&self, stored: &StoreEntry) -> bool {
        self.timestamp > stored.timestamp
            || (self.timestamp == stored.timestamp && self.writer < stored.writer)
    }
}

#[derive(Debug, Default, Clone)]
pub struct LwwMap {
    entries: HashMap<String, StoreEntry>,
}

impl LwwMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one write; true when the stored state changed
    pub fn apply(&mut self, key: &str, incoming: &StoreEntry) -> bool {
        match self.entries.get_mut(key) {
            Some(stored) if incoming.supersedes(stored) => {
                *stored = incoming.clone();
                true
            }
            Some(_) => false,
            None => {
                self.entries.insert(key.to_string(), incoming.clone());
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&StoreEntry> {
        self.entries.get(key)
    }

    /// Values of every key starting with `prefix`
    pub fn list(&self, prefix: &str) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Full state, as sent to a newly joined peer group
    pub fn snapshot(&self) -> BTreeMap<String, StoreEntry> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_later_timestamp_wins() {
        let mut map = LwwMap::new();
        assert!(map.apply("k", &StoreEntry::new("old", 10, "b")));
        assert!(map.apply("k", &StoreEntry::new("new", 11, "z")));
        assert!(!map.apply("k", &StoreEntry::new("stale", 9, "a")));
        assert_eq!(map.get("k").unwrap().value, "new");
    }

    #[test]
    fn test_equal_timestamps_prefer_smaller_writer() {
        let mut map = LwwMap::new();
        map.apply("k", &StoreEntry::new("from-b", 10, "b"));
        assert!(map.apply("k", &StoreEntry::new("from-a", 10, "a")));
        assert!(!map.apply("k", &StoreEntry::new("from-c", 10, "c")));
        assert_eq!(map.get("k").unwrap().value, "from-a");
    }

    #[test]
    fn test_reapplying_is_a_no_op() {
        let mut map = LwwMap::new();
        let entry = StoreEntry::new("v", 1, "w");
        assert!(map.apply("k", &entry));
        assert!(!map.apply("k", &entry));
    }

    #[test]
    fn test_list_by_prefix() {
        let mut map = LwwMap::new();
        map.apply("cat/tabby", &StoreEntry::new("orange", 1, "w"));
        map.apply("cat/calico", &StoreEntry::new("patchy", 1, "w"));
        map.apply("dog/lab", &StoreEntry::new("yellow", 1, "w"));

        let cats = map.list("cat/");
        assert_eq!(cats.len(), 2);
        assert_eq!(cats["cat/tabby"], "orange");
        assert_eq!(map.list("").len(), 3);
        assert!(map.list("bird/").is_empty());
    }

    /// A (timestamp, writer) pair identifies one write, so it fixes the value
    fn arb_entry() -> impl Strategy<Value = (String, StoreEntry)> {
        (
            prop::sample::select(vec!["a", "b", "c"]),
            0i64..5,
            prop::sample::select(vec!["w1", "w2", "w3"]),
        )
            .prop_map(|(key, ts, writer)| {
                let value = format!("{}@{}", writer, ts);
                (key.to_string(), StoreEntry::new(value, ts, writer))
            })
    }

    proptest! {
        #[test]
        fn prop_merge_is_order_independent(
            (writes, shuffled) in prop::collection::vec(arb_entry(), 0..24)
                .prop_flat_map(|w| (Just(w.clone()), Just(w).prop_shuffle()))
        ) {
            let mut in_order = LwwMap::new();
            for (key, entry) in &writes {
                in_order.apply(key, entry);
            }
            let mut reordered = LwwMap::new();
            for (key, entry) in &shuffled {
                reordered.apply(key, entry);
            }

            prop_assert_eq!(in_order.snapshot(), reordered.snapshot());
        }
    }
}
