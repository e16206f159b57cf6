use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// A set whose insert reports whether the caller was first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize + Eq + Hash",
    deserialize = "K: Deserialize<'de> + Eq + Hash"
))]
pub struct OnceSet<K: Eq + Hash> {
    marked: HashSet<K>,
}

impl<K: Eq + Hash> Default for OnceSet<K> {
    fn default() -> Self {
        Self {
            marked: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash> OnceSet<K> {
    /// `true` for the first call with `key`, `false` for every later one.
    pub fn try_mark(&mut self, key: K) -> bool {
        self.marked.insert(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.marked.contains(key)
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.marked.remove(key)
    }

    pub fn retain(&mut self, f: impl FnMut(&K) -> bool) {
        self.marked.retain(f);
    }

    pub fn clear(&mut self) {
        self.marked.clear();
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }
}
