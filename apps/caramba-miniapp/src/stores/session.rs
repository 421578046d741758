use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Locally persisted pending-payment list, serialized as JSON.
pub const PENDING_PAYMENTS_KEY: &str = "pending_payments";

/// Session-scoped key/value records. Deliberately not durable: the
/// pending-payment and deep-link state never outlives the app session.
#[derive(Clone, Default)]
pub struct SessionStore {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.lock().unwrap().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.map.lock().unwrap().insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.map.lock().unwrap().remove(key);
    }
}
