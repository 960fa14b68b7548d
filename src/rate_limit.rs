use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::RateLimitConfig;
use crate::kv::{KvError, KvStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateDecision {
    Allowed { count: u32 },
    Blocked,
}

/// Per-IP submission limiter using fixed windows stored in the key-value collaborator.
pub struct SubmissionRateLimiter {
    store: Arc<dyn KvStore>,
    limit: u32,
    window_secs: u64,
}

impl SubmissionRateLimiter {
    pub fn new(store: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            limit: config.limit,
            window_secs: config.window_secs.max(1),
        }
    }

    /// Counter key for `client` in the window containing `now`.
    pub fn bucket_key(&self, client: &str, now: DateTime<Utc>) -> String {
        let bucket = now.timestamp().div_euclid(self.window_secs as i64);
        format!("rl:{client}:{bucket}")
    }

    /// Check the client's window and count this submission if it fits.
    /// Check and increment are two store calls; a concurrent burst may slip one past the limit.
    pub async fn check_and_increment(
        &self,
        client: &str,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, KvError> {
        let key = self.bucket_key(client, now);

        let count = match self.store.get(&key).await? {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|e| KvError::from(format!("Corrupt counter at {key}: {e}")))?,
            None => 0,
        };

        if count >= self.limit {
            return Ok(RateDecision::Blocked);
        }

        let count = count + 1;
        self.store
            .put(&key, count.to_string(), Duration::from_secs(self.window_secs))
            .await?;

        Ok(RateDecision::Allowed { count })
    }
}
