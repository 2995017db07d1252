use super::CoordinationStore;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// An in-process stand-in for the shared coordination store, used by tests
/// and by the degraded-mode scenarios: the gateway must keep dispatching
/// with the store disabled.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) => {
                if entry.expires_at.map(|at| Instant::now() >= at).unwrap_or(false) {
                    entries.remove(key);
                    None
                } else {
                    Some(entry.value.clone())
                }
            }
            None => None,
        }
    }
}

#[async_trait]
impl CoordinationStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let current = entries
            .get(key)
            .map(|e| e.value.parse::<i64>().unwrap_or(0))
            .unwrap_or(0);
        let next = current + delta;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A store wrapper that always fails, used to exercise the gateway's
/// degraded-mode behavior without needing to actually sever a network
/// connection.
pub struct DisabledStore;

#[async_trait]
impl CoordinationStore for DisabledStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Connection("store disabled".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Connection("store disabled".to_string()))
    }

    async fn incr_by(&self, _key: &str, _delta: i64) -> Result<i64, StoreError> {
        Err(StoreError::Connection("store disabled".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Connection("store disabled".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Connection("store disabled".to_string()))
    }
}
