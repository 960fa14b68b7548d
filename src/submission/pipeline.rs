use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::actions::template;
use crate::actions::{
    build_mail_sender, excerpt, Delivery, MailSender, OutgoingMail, SheetLogger, SubmissionLogger,
};
use crate::config::{Config, MailConfig, RateLimitConfig};
use crate::error::AppError;
use crate::kv::KvStore;
use crate::models::SubmissionRecord;
use crate::rate_limit::{RateDecision, SubmissionRateLimiter};

use super::metadata::RequestMeta;
use super::outcome::{StepOutcome, Steps, SubmissionResult};
use super::{parser, validate};

/// A step's outcome plus the message it adds to the response's `errors`, if any.
type StepReport = (StepOutcome, Option<String>);

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub require_consent: bool,
    pub site_name: String,
    pub send_confirmation: bool,
    pub record_ttl: Duration,
    pub step_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            require_consent: config.require_consent,
            site_name: config.site_name.clone(),
            send_confirmation: config.send_confirmation,
            record_ttl: Duration::from_secs(config.record_ttl_secs),
            step_timeout: Duration::from_secs(config.collaborator_timeout_secs),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            require_consent: false,
            site_name: "ReadyToRelate".to_string(),
            send_confirmation: false,
            record_ttl: Duration::from_secs(365 * 24 * 60 * 60),
            step_timeout: Duration::from_secs(10),
        }
    }
}

/// Addresses for the capture notification.
#[derive(Debug, Clone)]
pub struct MailRoute {
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
}

impl From<&MailConfig> for MailRoute {
    fn from(config: &MailConfig) -> Self {
        Self {
            to: config.to.clone(),
            from: config.from.clone(),
            reply_to: config.reply_to.clone(),
        }
    }
}

/// Validates one submission and fans it out to the configured collaborators.
pub struct Orchestrator {
    settings: PipelineSettings,
    store: Option<Arc<dyn KvStore>>,
    limiter: Option<SubmissionRateLimiter>,
    mailer: Option<(Arc<dyn MailSender>, MailRoute)>,
    logger: Option<Arc<dyn SubmissionLogger>>,
}

impl Orchestrator {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            store: None,
            limiter: None,
            mailer: None,
            logger: None,
        }
    }

    /// Wire the collaborators named in `config`. A collaborator that fails to build is
    /// logged and left out, so its step reports `skipped_missing_config`.
    pub fn from_config(config: &Config, store: Option<Arc<dyn KvStore>>) -> Self {
        let timeout = Duration::from_secs(config.collaborator_timeout_secs);
        let mut orchestrator = Self::new(PipelineSettings::from_config(config));

        if let Some(store) = store {
            orchestrator = orchestrator.with_store(store, config.rate_limit);
        }

        if let Some(mail) = &config.mail {
            match build_mail_sender(mail, timeout) {
                Ok(sender) => {
                    tracing::info!("Mail provider configured: {}", sender.provider());
                    orchestrator = orchestrator.with_mailer(sender, MailRoute::from(mail));
                }
                Err(e) => tracing::warn!("Mail provider not available: {e}"),
            }
        }

        if let Some(sheet) = &config.sheet {
            match SheetLogger::new(sheet, timeout) {
                Ok(logger) => {
                    tracing::info!("Sheet logging configured");
                    orchestrator = orchestrator.with_logger(Arc::new(logger));
                }
                Err(e) => tracing::warn!("Sheet logging not available: {e}"),
            }
        }

        orchestrator
    }

    pub fn with_store(
        mut self,
        store: Arc<dyn KvStore>,
        rate_limit: Option<RateLimitConfig>,
    ) -> Self {
        self.limiter = rate_limit.map(|cfg| SubmissionRateLimiter::new(store.clone(), cfg));
        self.store = Some(store);
        self
    }

    pub fn with_mailer(mut self, sender: Arc<dyn MailSender>, route: MailRoute) -> Self {
        self.mailer = Some((sender, route));
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn SubmissionLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Parse, validate, then run every step. Parse and validation failures return before
    /// any collaborator is touched; step failures never escape as errors.
    pub async fn handle(
        &self,
        body: &[u8],
        meta: RequestMeta,
    ) -> Result<SubmissionResult, AppError> {
        let input = parser::parse_body(body).map_err(AppError::BadRequest)?;

        let valid = validate::validate(input, self.settings.require_consent).map_err(|errors| {
            AppError::Validation(errors.iter().map(ToString::to_string).collect())
        })?;

        let record = SubmissionRecord::new(valid, &meta);
        Ok(self.process(&record).await)
    }

    /// Run the side-effect steps for an already validated record.
    async fn process(&self, record: &SubmissionRecord) -> SubmissionResult {
        let (rate_limit, rate_error) = self.check_rate_limit(record).await;
        if rate_limit == StepOutcome::Throttled {
            tracing::info!("Throttled submission from {}", record.ip);
            return SubmissionResult::throttled();
        }

        // Independent of one another; each outcome is captured on its own
        let (persist, notify, confirm, log) = tokio::join!(
            self.persist(record),
            self.notify(record),
            self.confirm(record),
            self.log(record),
        );

        let steps = Steps {
            rate_limit,
            persist: persist.0,
            notify: notify.0,
            confirm: confirm.0,
            log: log.0,
        };

        let errors: Vec<String> = [rate_error, persist.1, notify.1, confirm.1, log.1]
            .into_iter()
            .flatten()
            .collect();

        let result = SubmissionResult::from_steps(steps, errors);
        tracing::info!(
            "Submission {} processed: ok={} rate_limit={} persist={} notify={} confirm={} log={}",
            record.session_id,
            result.ok,
            result.steps.rate_limit,
            result.steps.persist,
            result.steps.notify,
            result.steps.confirm,
            result.steps.log,
        );
        result
    }

    async fn check_rate_limit(&self, record: &SubmissionRecord) -> StepReport {
        if self.store.is_none() {
            return (StepOutcome::SkippedMissingConfig, None);
        }
        let Some(limiter) = &self.limiter else {
            return (StepOutcome::Skipped, None);
        };

        let decision = bounded(
            self.settings.step_timeout,
            limiter.check_and_increment(&record.ip, record.timestamp),
        )
        .await;

        match decision {
            Ok(RateDecision::Allowed { .. }) => (StepOutcome::Stored, None),
            Ok(RateDecision::Blocked) => (StepOutcome::Throttled, None),
            Err(e) => {
                tracing::warn!("Rate limit check failed, letting submission through: {e}");
                (
                    StepOutcome::FailedException,
                    Some(format!("Rate limit exception: {}", excerpt(&e, 180))),
                )
            }
        }
    }

    async fn persist(&self, record: &SubmissionRecord) -> StepReport {
        let Some(store) = &self.store else {
            return (StepOutcome::SkippedMissingConfig, None);
        };

        let value = match serde_json::to_string(record) {
            Ok(v) => v,
            Err(e) => {
                return (
                    StepOutcome::FailedException,
                    Some(format!("Store error: {e}")),
                );
            }
        };

        let key = record.storage_key();
        match bounded(
            self.settings.step_timeout,
            store.put(&key, value, self.settings.record_ttl),
        )
        .await
        {
            Ok(()) => (StepOutcome::Stored, None),
            Err(e) => {
                tracing::warn!("Failed to store {key}: {e}");
                (
                    StepOutcome::FailedException,
                    Some(format!("Store error: {}", excerpt(&e, 180))),
                )
            }
        }
    }

    async fn notify(&self, record: &SubmissionRecord) -> StepReport {
        let Some((sender, route)) = &self.mailer else {
            return (StepOutcome::SkippedMissingConfig, None);
        };

        let mail = OutgoingMail {
            to: route.to.clone(),
            from: route.from.clone(),
            from_name: None,
            reply_to: route.reply_to.clone(),
            subject: template::notification_subject(&self.settings.site_name),
            body: template::notification_body(record),
        };

        let result = bounded(self.settings.step_timeout, sender.send(&mail)).await;
        delivery_report("Mail", StepOutcome::Sent, result)
    }

    async fn confirm(&self, record: &SubmissionRecord) -> StepReport {
        if !self.settings.send_confirmation {
            return (StepOutcome::Skipped, None);
        }
        let Some((sender, route)) = &self.mailer else {
            return (StepOutcome::SkippedMissingConfig, None);
        };

        let mail = OutgoingMail {
            to: record.email.clone(),
            from: route.from.clone(),
            from_name: Some(self.settings.site_name.clone()),
            reply_to: route.reply_to.clone(),
            subject: template::confirmation_subject(&self.settings.site_name),
            body: template::confirmation_body(record),
        };

        let result = bounded(self.settings.step_timeout, sender.send(&mail)).await;
        delivery_report("Confirmation mail", StepOutcome::Sent, result)
    }

    async fn log(&self, record: &SubmissionRecord) -> StepReport {
        let Some(logger) = &self.logger else {
            return (StepOutcome::SkippedMissingConfig, None);
        };

        let result = bounded(self.settings.step_timeout, logger.log(record)).await;
        delivery_report("Sheet", StepOutcome::Logged, result)
    }
}

/// Await a collaborator call, turning its error or a timeout into a message.
async fn bounded<T, E, F>(timeout: Duration, call: F) -> Result<T, String>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {timeout:?}")),
    }
}

fn delivery_report(
    label: &str,
    success: StepOutcome,
    result: Result<Delivery, String>,
) -> StepReport {
    match result {
        Ok(Delivery::Accepted) => (success, None),
        Ok(Delivery::Rejected { status, body }) => {
            tracing::warn!("{label} rejected with status {status}");
            (
                StepOutcome::Failed(status),
                Some(format!("{label} error {status}: {}", excerpt(&body, 200))),
            )
        }
        Err(e) => {
            tracing::warn!("{label} call failed: {e}");
            (
                StepOutcome::FailedException,
                Some(format!("{label} exception: {}", excerpt(&e, 180))),
            )
        }
    }
}
