use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::submission::metadata::RequestMeta;
use crate::submission::validate::ValidSubmission;

/// Untrusted request body. Every field is optional here; the validator decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionInput {
    pub email: Option<String>,
    pub badge: Option<String>,
    pub city: Option<String>,
    /// Kept as raw JSON so that `"true"` or `1` can be told apart from `true`.
    pub consent: Option<serde_json::Value>,
    pub session_id: Option<String>,
    pub referrer: Option<String>,
}

/// A validated submission plus the request metadata captured with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub email: String,
    pub city: String,
    pub badge: String,
    pub consent: bool,
    pub session_id: String,
    pub referrer: String,
    pub ip: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(valid: ValidSubmission, meta: &RequestMeta) -> Self {
        Self {
            email: valid.email,
            city: valid.city,
            badge: valid.badge,
            consent: valid.consent,
            session_id: valid.session_id,
            referrer: valid.referrer,
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            timestamp: meta.received_at,
        }
    }

    /// Record store key. Stable per session, so a resubmission overwrites.
    pub fn storage_key(&self) -> String {
        format!("badge:{}", self.session_id)
    }

    /// ISO-8601 capture time with millisecond precision.
    pub fn when(&self) -> String {
        self.timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}
