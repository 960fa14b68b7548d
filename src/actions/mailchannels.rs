use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{excerpt, ActionError, Delivery, MailSender, OutgoingMail};

/// MailChannels transactional API (`POST /tx/v1/send`).
pub struct MailChannelsSender {
    client: reqwest::Client,
    api_url: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<&'static str, &'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

impl MailChannelsSender {
    pub fn new(api_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_url })
    }
}

#[async_trait]
impl MailSender for MailChannelsSender {
    fn provider(&self) -> &str {
        "mailchannels"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery, ActionError> {
        let mut headers = BTreeMap::new();
        if let Some(reply_to) = mail.reply_to.as_deref() {
            headers.insert("Reply-To", reply_to);
        }

        let payload = SendRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &mail.to,
                    name: None,
                }],
            }],
            from: Address {
                email: &mail.from,
                name: mail.from_name.as_deref(),
            },
            subject: &mail.subject,
            content: vec![Content {
                kind: "text/plain",
                value: &mail.body,
            }],
            headers,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ActionError::from(format!("MailChannels request failed: {e}")))?;

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
