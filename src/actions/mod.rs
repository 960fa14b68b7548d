pub mod mailchannels;
pub mod sheet;
pub mod smtp;
pub mod template;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{MailConfig, MailProvider};
use crate::models::SubmissionRecord;

pub use mailchannels::MailChannelsSender;
pub use sheet::SheetLogger;
pub use smtp::SmtpSender;

/// What a collaborator said about a call that reached it.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Accepted,
    Rejected { status: u16, body: String },
}

/// The call never produced a collaborator response: transport failure, timeout, bad input.
#[derive(Debug)]
pub struct ActionError {
    pub message: String,
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<String> for ActionError {
    fn from(s: String) -> Self {
        ActionError { message: s }
    }
}

impl From<&str> for ActionError {
    fn from(s: &str) -> Self {
        ActionError {
            message: s.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub from: String,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Transactional mail provider.
#[async_trait]
pub trait MailSender: Send + Sync {
    fn provider(&self) -> &str;
    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery, ActionError>;
}

/// Fire-and-forget relay of each accepted submission to an external log.
#[async_trait]
pub trait SubmissionLogger: Send + Sync {
    async fn log(&self, record: &SubmissionRecord) -> Result<Delivery, ActionError>;
}

/// Build the configured mail provider.
pub fn build_mail_sender(
    config: &MailConfig,
    timeout: Duration,
) -> Result<Arc<dyn MailSender>, String> {
    let sender: Arc<dyn MailSender> = match &config.provider {
        MailProvider::MailChannels { api_url } => Arc::new(
            MailChannelsSender::new(api_url.clone(), timeout)
                .map_err(|e| format!("Failed to build MailChannels client: {e}"))?,
        ),
        MailProvider::Smtp(smtp) => Arc::new(SmtpSender::new(smtp, timeout)?),
    };
    Ok(sender)
}

/// First `max` characters of `s`, for error excerpts.
pub(crate) fn excerpt(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
