//! Keyed cache of rendered sheets.

use std::collections::BTreeMap;

/// A cached sheet with the ID used for display ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSheet<S> {
    pub order_id: u32,
    pub sheet: S,
}

/// Rendered sheets keyed by group name.
///
/// Independent of any UI toolkit: `S` is whatever the renderer produces
/// (a texture, an RGB buffer, a test marker).
#[derive(Debug, Clone)]
pub struct SheetCache<S> {
    entries: BTreeMap<String, CachedSheet<S>>,
}

impl<S> Default for SheetCache<S> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<S> SheetCache<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the sheet for `key`.
    pub fn upsert(&mut self, key: impl Into<String>, order_id: u32, sheet: S) {
        self.entries
            .insert(key.into(), CachedSheet { order_id, sheet });
    }

    /// Remove the sheet for `key`, returning it if present.
    pub fn evict(&mut self, key: &str) -> Option<S> {
        self.entries.remove(key).map(|e| e.sheet)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&S> {
        self.entries.get(key).map(|e| &e.sheet)
    }

    /// Cached keys in name order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sheets in display order: ascending order ID, ties broken by key.
    #[must_use]
    pub fn ordered(&self) -> Vec<(&str, &S)> {
        let mut items: Vec<(&String, &CachedSheet<S>)> = self.entries.iter().collect();
        items.sort_by(|a, b| a.1.order_id.cmp(&b.1.order_id).then_with(|| a.0.cmp(b.0)));
        items
            .into_iter()
            .map(|(k, e)| (k.as_str(), &e.sheet))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_by_id_then_key() {
        let mut cache = SheetCache::new();
        cache.upsert("zeta", 1, 'z');
        cache.upsert("beta", 3, 'b');
        cache.upsert("alpha", 3, 'a');
        let keys: Vec<&str> = cache.ordered().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn test_upsert_replaces_and_evict_returns() {
        let mut cache = SheetCache::new();
        cache.upsert("g", 1, 10);
        cache.upsert("g", 1, 20);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("g"), Some(&20));
        assert_eq!(cache.evict("g"), Some(20));
        assert_eq!(cache.evict("g"), None);
        assert!(cache.is_empty());
    }
}
