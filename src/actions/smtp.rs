use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{ActionError, Delivery, MailSender, OutgoingMail};
use crate::config::SmtpConfig;

/// Plain SMTP relay, for deployments without an HTTP mail API.
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSender {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, String> {
        Ok(Self {
            transport: build_smtp_transport(config, timeout)?,
        })
    }
}

#[async_trait]
impl MailSender for SmtpSender {
    fn provider(&self) -> &str {
        "smtp"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery, ActionError> {
        let message = build_message(mail)?;

        match self.transport.send(message).await {
            Ok(_) => Ok(Delivery::Accepted),
            Err(e) => smtp_failure(e.status().map(u16::from), e.to_string()),
        }
    }
}

/// A negative server reply is a rejection carrying its reply code; anything without a
/// code (connection, TLS, timeout) never reached an answer.
pub fn smtp_failure(reply_code: Option<u16>, message: String) -> Result<Delivery, ActionError> {
    match reply_code {
        Some(status) => Ok(Delivery::Rejected {
            status,
            body: message,
        }),
        None => Err(ActionError::from(format!("Failed to send email: {message}"))),
    }
}

pub fn build_message(mail: &OutgoingMail) -> Result<Message, ActionError> {
    let from = match &mail.from_name {
        Some(name) => format!("{} <{}>", name, mail.from),
        None => mail.from.clone(),
    };

    let mut builder = Message::builder()
        .from(
            from.parse::<Mailbox>()
                .map_err(|e| ActionError::from(format!("Invalid from address: {e}")))?,
        )
        .to(mail
            .to
            .parse::<Mailbox>()
            .map_err(|e| ActionError::from(format!("Invalid to address: {e}")))?)
        .subject(mail.subject.clone());

    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(
            reply_to
                .parse::<Mailbox>()
                .map_err(|e| ActionError::from(format!("Invalid reply-to address: {e}")))?,
        );
    }

    builder
        .header(ContentType::TEXT_PLAIN)
        .body(mail.body.clone())
        .map_err(|e| ActionError::from(format!("Failed to build email: {e}")))
}

fn build_smtp_transport(
    config: &SmtpConfig,
    timeout: Duration,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
    let creds = Credentials::new(config.user.clone(), config.pass.clone());

    let transport = match config.tls_mode.as_str() {
        "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| format!("SMTP relay error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(timeout))
            .build(),
        "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .credentials(creds)
            .timeout(Some(timeout))
            .build(),
        _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP starttls error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(timeout))
            .build(),
    };

    Ok(transport)
}
