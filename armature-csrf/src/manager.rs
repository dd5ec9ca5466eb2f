use crate::error::Result;
use crate::storage::SharedTokenStore;
use crate::token::{
    CsrfToken, EntropySource, OsEntropy, constant_time_eq, random_token_value, token_name,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Issues, checks and evicts tokens in a shared store
#[derive(Clone)]
pub struct TokenManager {
    store: SharedTokenStore,
    entropy: Arc<dyn EntropySource>,
    prefix: String,
    strength: usize,
    storage_limit: usize,
}

impl TokenManager {
    /// Create a manager over `store`.
    ///
    /// `strength` is not checked here; the guard validates its configuration
    /// before building a manager.
    pub fn new(
        store: SharedTokenStore,
        prefix: impl Into<String>,
        strength: usize,
        storage_limit: usize,
    ) -> Self {
        Self {
            store,
            entropy: Arc::new(OsEntropy),
            prefix: prefix.into(),
            strength,
            storage_limit,
        }
    }

    /// Replace the random source
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn store(&self) -> &SharedTokenStore {
        &self.store
    }

    pub fn storage_limit(&self) -> usize {
        self.storage_limit
    }

    pub fn strength(&self) -> usize {
        self.strength
    }

    /// Create a new random token value
    pub fn create_token(&self) -> Result<String> {
        random_token_value(self.entropy.as_ref(), self.strength)
    }

    /// Create a token pair and store it as the newest entry
    pub fn generate_token(&self) -> Result<CsrfToken> {
        let value = self.create_token()?;
        let name = loop {
            let candidate = token_name(&self.prefix);
            if !self.store.contains(&candidate) {
                break candidate;
            }
        };

        self.store.set(&name, &value);
        debug!(token_name = %name, "Issued CSRF token");
        Ok(CsrfToken { name, value })
    }

    /// Check a submitted pair against the store without modifying it
    pub fn validate_token(&self, name: &str, value: &str) -> bool {
        match self.store.get(name) {
            Some(stored) => constant_time_eq(&stored, value),
            None => false,
        }
    }

    /// Remove a single token
    pub fn remove_token(&self, name: &str) {
        self.store.delete(name);
        trace!(token_name = %name, "Removed CSRF token");
    }

    /// Evict the oldest tokens until the store is within the limit.
    ///
    /// The names to evict are taken from a single snapshot, so this issues at
    /// most `count - limit` deletes even if the store fails to drop them.
    /// Returns the number of deletes issued. Does nothing when the limit is
    /// `0` or the store cannot count and list its entries.
    pub fn enforce_storage_limit(&self) -> usize {
        if self.storage_limit == 0 {
            return 0;
        }

        let Some(count) = self.store.count() else {
            trace!("Token store cannot count entries, skipping eviction");
            return 0;
        };
        if count <= self.storage_limit {
            return 0;
        }
        let Some(entries) = self.store.entries() else {
            trace!("Token store cannot list entries, skipping eviction");
            return 0;
        };

        let excess = count - self.storage_limit;
        let mut evicted = 0;
        for (name, _) in entries.into_iter().take(excess) {
            self.store.delete(&name);
            evicted += 1;
        }

        if evicted > 0 {
            debug!(evicted, limit = self.storage_limit, "Evicted oldest CSRF tokens");
        }
        evicted
    }

    /// Most recently stored pair, without issuing a new one
    pub fn load_last_key_pair(&self) -> Option<CsrfToken> {
        self.store
            .newest()
            .map(|(name, value)| CsrfToken { name, value })
    }
}
