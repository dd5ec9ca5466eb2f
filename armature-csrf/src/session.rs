//! Session-backed token storage.
//!
//! Session bootstrapping belongs to the application. The guard only needs an
//! explicit handle to the active session; tokens live in that session's data
//! under the configured prefix, as a JSON object whose member order is the
//! token insertion order.

use crate::storage::{SharedTokenStore, TokenStore};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Shared handle to the active session
pub type SharedSession = Arc<RwLock<Session>>;

/// Session data as seen by the guard
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    /// Session data as key-value pairs
    pub data: HashMap<String, Value>,
}

impl Session {
    /// Create an empty session with a fresh identifier
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data: HashMap::new(),
        }
    }

    /// Create an empty session behind a shared handle
    pub fn shared() -> SharedSession {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }
}

/// Token store kept inside a session under a fixed key
#[derive(Debug, Clone)]
pub struct SessionTokenStore {
    session: SharedSession,
    key: String,
}

impl SessionTokenStore {
    pub fn new(session: SharedSession, key: impl Into<String>) -> Self {
        Self {
            session,
            key: key.into(),
        }
    }

    /// Create a store behind a shared handle
    pub fn shared(session: SharedSession, key: impl Into<String>) -> SharedTokenStore {
        Arc::new(Self::new(session, key))
    }

    /// Session key the tokens are stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    fn with_tokens<T>(&self, f: impl FnOnce(&Map<String, Value>) -> T) -> Option<T> {
        let session = self.session.read();
        match session.get(&self.key) {
            Some(Value::Object(tokens)) => Some(f(tokens)),
            _ => None,
        }
    }

    fn with_tokens_mut<T>(&self, f: impl FnOnce(&mut Map<String, Value>) -> T) -> T {
        let mut session = self.session.write();
        let mut tokens = match session.data.remove(&self.key) {
            Some(Value::Object(tokens)) => tokens,
            Some(_) => {
                trace!(key = %self.key, "Replacing non-object session value with token map");
                Map::new()
            }
            None => Map::new(),
        };
        let out = f(&mut tokens);
        session.data.insert(self.key.clone(), Value::Object(tokens));
        out
    }
}

fn string_entries(tokens: &Map<String, Value>) -> Vec<(String, String)> {
    tokens
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
        .collect()
}

impl TokenStore for SessionTokenStore {
    fn get(&self, name: &str) -> Option<String> {
        self.with_tokens(|tokens| tokens.get(name).and_then(Value::as_str).map(String::from))
            .flatten()
    }

    fn set(&self, name: &str, value: &str) {
        self.with_tokens_mut(|tokens| {
            tokens.insert(name.to_string(), Value::String(value.to_string()));
        });
    }

    fn delete(&self, name: &str) {
        let mut session = self.session.write();
        if let Some(Value::Object(tokens)) = session.data.get_mut(&self.key) {
            tokens.shift_remove(name);
        }
    }

    fn count(&self) -> Option<usize> {
        Some(
            self.with_tokens(|tokens| tokens.values().filter(|v| v.is_string()).count())
                .unwrap_or(0),
        )
    }

    fn entries(&self) -> Option<Vec<(String, String)>> {
        Some(self.with_tokens(string_entries).unwrap_or_default())
    }
}
