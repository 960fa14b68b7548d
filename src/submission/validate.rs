use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::models::SubmissionInput;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidEmail,
    MissingBadge,
    ConsentRequired,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidEmail => write!(f, "Missing or invalid email"),
            ValidationError::MissingBadge => write!(f, "Missing badge"),
            ValidationError::ConsentRequired => write!(f, "Consent required"),
        }
    }
}

/// Normalized input that passed validation. Only `validate` can build one.
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub(crate) email: String,
    pub(crate) badge: String,
    pub(crate) city: String,
    pub(crate) consent: bool,
    pub(crate) session_id: String,
    pub(crate) referrer: String,
}

impl ValidSubmission {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn badge(&self) -> &str {
        &self.badge
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Check every rule and report all violations, in rule order.
pub fn validate(
    input: SubmissionInput,
    require_consent: bool,
) -> Result<ValidSubmission, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let email = trimmed(input.email);
    if !is_email(&email) {
        errors.push(ValidationError::InvalidEmail);
    }

    let badge = trimmed(input.badge);
    if badge.is_empty() {
        errors.push(ValidationError::MissingBadge);
    }

    // Exactly `true`: "true", 1 and friends do not count.
    let consent = matches!(input.consent, Some(Value::Bool(true)));
    if require_consent && !consent {
        errors.push(ValidationError::ConsentRequired);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let session_id = match trimmed(input.session_id) {
        s if s.is_empty() => Uuid::now_v7().to_string(),
        s => s,
    };

    Ok(ValidSubmission {
        email,
        badge,
        city: trimmed(input.city),
        consent,
        session_id,
        referrer: trimmed(input.referrer),
    })
}

pub fn is_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

fn trimmed(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}
