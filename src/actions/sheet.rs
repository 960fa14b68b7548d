use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{excerpt, ActionError, Delivery, SubmissionLogger};
use crate::config::SheetConfig;
use crate::models::SubmissionRecord;

/// Spreadsheet logging webhook (an Apps Script web app). The shared secret travels in the body,
/// which is what the script checks.
pub struct SheetLogger {
    client: reqwest::Client,
    url: String,
    secret: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetRow<'a> {
    secret: &'a str,
    email: &'a str,
    city: &'a str,
    badge: &'a str,
    session_id: &'a str,
    referrer: &'a str,
    ip: &'a str,
    ua: &'a str,
    timestamp: String,
}

impl SheetLogger {
    pub fn new(config: &SheetConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            secret: config.secret.clone(),
        })
    }
}

#[async_trait]
impl SubmissionLogger for SheetLogger {
    async fn log(&self, record: &SubmissionRecord) -> Result<Delivery, ActionError> {
        let row = SheetRow {
            secret: &self.secret,
            email: &record.email,
            city: &record.city,
            badge: &record.badge,
            session_id: &record.session_id,
            referrer: &record.referrer,
            ip: &record.ip,
            ua: &record.user_agent,
            timestamp: record.when(),
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&row)
            .send()
            .await
            .map_err(|e| ActionError::from(format!("Sheet request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(Delivery::Accepted);
        }

        let body = resp.text().await.unwrap_or_default();
        Ok(Delivery::Rejected {
            status: status.as_u16(),
            body: excerpt(&body, 1024),
        })
    }
}
