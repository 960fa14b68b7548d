pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryKv;

#[derive(Debug)]
pub struct KvError {
    pub message: String,
}

impl std::fmt::Display for KvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<String> for KvError {
    fn from(s: String) -> Self {
        KvError { message: s }
    }
}

impl From<&str> for KvError {
    fn from(s: &str) -> Self {
        KvError {
            message: s.to_string(),
        }
    }
}

/// External key-value collaborator backing the rate limiter and the record store.
/// Consistency (and atomicity of get-then-put) is whatever the backend offers.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError>;
}
