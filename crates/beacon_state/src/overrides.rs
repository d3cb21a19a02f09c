use indexmap::IndexMap;

use crate::StableKey;

/// "beacon enabled" per marker.
///
/// Only ever touched from the client update/render thread, so there is no locking.
/// Setting a value has no side effects, callers sync and re-filter themselves.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OverrideStore {
    entries: IndexMap<StableKey, bool>,
}

impl OverrideStore {
    /// false when there's no entry
    pub fn get(&self, key: &StableKey) -> bool {
        self.entries.get(key).copied().unwrap_or_default()
    }
    pub fn set(&mut self, key: StableKey, enabled: bool) {
        self.entries.insert(key, enabled);
    }
    pub fn contains(&self, key: &StableKey) -> bool {
        self.entries.contains_key(key)
    }
    pub fn clear(&mut self) {
        self.entries.clear();
    }
    /// Drops every entry and takes the given set instead.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = (StableKey, bool)>) {
        self.entries.clear();
        self.entries.extend(entries);
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&StableKey, bool)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }
}
