use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{KvError, KvStore};

/// Process-local key-value store with per-key expiry.
pub struct MemoryKv {
    /// key -> (value, expires_at)
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.value().1 > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| e.value().1 > now)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = Instant::now();
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        let (value, expires_at) = entry.value();
        if *expires_at <= now {
            return Ok(None);
        }
        Ok(Some(value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| KvError::from(format!("TTL out of range: {}s", ttl.as_secs())))?;
        self.entries.insert(key.to_string(), (value, expires_at));
        Ok(())
    }
}
