use axum::http::StatusCode;
use serde::{Serialize, Serializer};

/// Result of one side-effect step, rendered on the wire as a flat status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Not attempted: disabled, or cut short by throttling.
    Skipped,
    /// Not attempted: the collaborator is not configured.
    SkippedMissingConfig,
    Stored,
    Sent,
    Logged,
    Throttled,
    /// The collaborator answered with a non-2xx status.
    Failed(u16),
    /// The call never got an answer.
    FailedException,
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed(_) | StepOutcome::FailedException)
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOutcome::Skipped => write!(f, "skipped"),
            StepOutcome::SkippedMissingConfig => write!(f, "skipped_missing_config"),
            StepOutcome::Stored => write!(f, "stored"),
            StepOutcome::Sent => write!(f, "sent"),
            StepOutcome::Logged => write!(f, "logged"),
            StepOutcome::Throttled => write!(f, "throttled"),
            StepOutcome::Failed(status) => write!(f, "failed_{status}"),
            StepOutcome::FailedException => write!(f, "failed_exception"),
        }
    }
}

impl Serialize for StepOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Steps {
    pub rate_limit: StepOutcome,
    pub persist: StepOutcome,
    pub notify: StepOutcome,
    pub confirm: StepOutcome,
    pub log: StepOutcome,
}

impl Default for Steps {
    fn default() -> Self {
        Self {
            rate_limit: StepOutcome::Skipped,
            persist: StepOutcome::Skipped,
            notify: StepOutcome::Skipped,
            confirm: StepOutcome::Skipped,
            log: StepOutcome::Skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub ok: bool,
    pub steps: Steps,
    pub errors: Vec<String>,
}

impl SubmissionResult {
    /// Accepted submissions are those that reached a person or a log: the notification
    /// was sent or the sheet row was written. Throttled requests are reported as accepted.
    pub fn from_steps(steps: Steps, errors: Vec<String>) -> Self {
        let ok = steps.rate_limit == StepOutcome::Throttled
            || steps.notify == StepOutcome::Sent
            || steps.log == StepOutcome::Logged;
        Self { ok, steps, errors }
    }

    pub fn throttled() -> Self {
        Self::from_steps(
            Steps {
                rate_limit: StepOutcome::Throttled,
                ..Steps::default()
            },
            Vec::new(),
        )
    }

    pub fn status(&self) -> StatusCode {
        if self.ok {
            StatusCode::OK
        } else {
            StatusCode::BAD_GATEWAY
        }
    }
}
