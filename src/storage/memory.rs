use std::collections::HashMap;
use std::sync::Mutex;

use crate::storage::{KeyValueStore, StorageError};

/// In-process store with an optional quota on the total size of all values.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    quota: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            quota: Mutex::new(Some(quota_bytes)),
        }
    }

    pub fn set_quota(&self, quota_bytes: Option<usize>) {
        if let Ok(mut q) = self.quota.lock() {
            *q = quota_bytes;
        }
    }

    /// Bytes currently held across all keys.
    pub fn used_bytes(&self) -> usize {
        self.values
            .lock()
            .map(|v| v.values().map(String::len).sum())
            .unwrap_or(0)
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let quota = self.quota.lock().ok().and_then(|q| *q);
        let mut values = self
            .values
            .lock()
            .map_err(|_| std::io::Error::other("memory store lock poisoned"))?;

        if let Some(quota) = quota {
            let others: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let needed = others + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let store = MemoryStore::new();
        assert!(store.read("k").is_none());
        store.write("k", "hello").unwrap();
        assert_eq!(store.read("k").as_deref(), Some("hello"));
        store.remove("k");
        assert!(store.read("k").is_none());
    }

    #[test]
    fn quota_counts_every_key_but_the_one_replaced() {
        let store = MemoryStore::with_quota(10);
        store.write("a", "12345").unwrap();
        store.write("b", "12345").unwrap();
        // Replacing "b" frees its old bytes first.
        store.write("b", "54321").unwrap();
        let err = store.write("c", "x").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let store = MemoryStore::with_quota(4);
        store.write("k", "abc").unwrap();
        assert!(store.write("k", "abcdef").is_err());
        assert_eq!(store.read("k").as_deref(), Some("abc"));
    }
}
