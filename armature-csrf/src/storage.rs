//! Token storage.
//!
//! A store maps token names to values and remembers insertion order, which
//! the manager uses as recency: the first entry is the oldest. Only
//! `get`/`set`/`delete` are required. Stores that cannot count or list their
//! entries keep the default `None` answers, and the manager then skips
//! eviction and persistent-mode reuse instead of failing.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a token store; its lifetime is the session's, not the guard's
pub type SharedTokenStore = Arc<dyn TokenStore>;

/// Ordered name → value token storage
pub trait TokenStore: Send + Sync {
    /// Look up the value stored under `name`
    fn get(&self, name: &str) -> Option<String>;

    /// Insert or overwrite; an overwritten name keeps its original position
    fn set(&self, name: &str, value: &str);

    /// Remove `name`; removing an absent name is a no-op
    fn delete(&self, name: &str);

    /// Number of live tokens, if the store can count
    fn count(&self) -> Option<usize> {
        None
    }

    /// Entries oldest-first, if the store can iterate in insertion order
    fn entries(&self) -> Option<Vec<(String, String)>> {
        None
    }

    /// Oldest entry, derived from iteration order
    fn oldest(&self) -> Option<(String, String)> {
        self.entries()?.into_iter().next()
    }

    /// Most recently inserted entry, derived from iteration order
    fn newest(&self) -> Option<(String, String)> {
        self.entries()?.pop()
    }

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// In-memory insertion-ordered token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<IndexMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store behind a shared handle
    pub fn shared() -> SharedTokenStore {
        Arc::new(Self::new())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, name: &str) -> Option<String> {
        self.tokens.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) {
        // IndexMap::insert keeps the slot of an existing key
        self.tokens.write().insert(name.to_string(), value.to_string());
    }

    fn delete(&self, name: &str) {
        self.tokens.write().shift_remove(name);
    }

    fn count(&self) -> Option<usize> {
        Some(self.tokens.read().len())
    }

    fn entries(&self) -> Option<Vec<(String, String)>> {
        Some(
            self.tokens
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    fn oldest(&self) -> Option<(String, String)> {
        self.tokens
            .read()
            .first()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    fn newest(&self) -> Option<(String, String)> {
        self.tokens
            .read()
            .last()
            .map(|(k, v)| (k.clone(), v.clone()))
    }
}
