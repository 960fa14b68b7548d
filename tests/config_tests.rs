use std::collections::HashMap;

use badge_relay::config::{
    Config, KvBackend, MailProvider, RateLimitConfig, DEFAULT_MAILCHANNELS_URL,
};

fn load(vars: &[(&str, &str)]) -> Result<Config, String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}

// ── Defaults ────────────────────────────────────────────────────

#[test]
fn empty_environment_uses_defaults() {
    let config = load(&[]).unwrap();

    assert_eq!(config.port, 8787);
    assert_eq!(config.site_name, "ReadyToRelate");
    assert_eq!(config.kv, KvBackend::Memory);
    assert_eq!(config.rate_limit, Some(RateLimitConfig::default()));
    assert_eq!(config.record_ttl_secs, 31_536_000);
    assert_eq!(config.collaborator_timeout_secs, 10);
    assert!(!config.require_consent);
    assert!(config.mail.is_none());
    assert!(config.sheet.is_none());
}

#[test]
fn blank_values_count_as_unset() {
    let config = load(&[
        ("BADGE_PORT", "  "),
        ("BADGE_CAPTURE_TO", ""),
        ("BADGE_SENDER_FROM", "no-reply@example.com"),
        ("BADGE_STATIC_DIR", " "),
    ])
    .unwrap();

    assert_eq!(config.port, 8787);
    assert!(config.mail.is_none());
    assert!(config.static_dir.is_none());
}

// ── Rate limiting and store ─────────────────────────────────────

#[test]
fn zero_rate_limit_disables_the_limiter() {
    let config = load(&[("BADGE_RATE_LIMIT", "0")]).unwrap();
    assert!(config.rate_limit.is_none());
}

#[test]
fn zero_rate_window_is_rejected() {
    let err = load(&[("BADGE_RATE_WINDOW_SECS", "0")]).unwrap_err();
    assert_eq!(err, "BADGE_RATE_WINDOW_SECS must be positive");
}

#[test]
fn kv_backend_must_be_known() {
    assert_eq!(load(&[("BADGE_KV", "off")]).unwrap().kv, KvBackend::Off);
    let err = load(&[("BADGE_KV", "redis")]).unwrap_err();
    assert_eq!(err, "Invalid BADGE_KV: redis");
}

// ── Mail ────────────────────────────────────────────────────────

#[test]
fn mail_needs_both_addresses() {
    assert!(load(&[("BADGE_CAPTURE_TO", "captures@example.com")])
        .unwrap()
        .mail
        .is_none());
    assert!(load(&[("BADGE_SENDER_FROM", "no-reply@example.com")])
        .unwrap()
        .mail
        .is_none());

    let config = load(&[
        ("BADGE_CAPTURE_TO", "captures@example.com"),
        ("BADGE_SENDER_FROM", "no-reply@example.com"),
    ])
    .unwrap();
    let mail = config.mail.unwrap();
    assert_eq!(mail.to, "captures@example.com");
    assert_eq!(
        mail.provider,
        MailProvider::MailChannels {
            api_url: DEFAULT_MAILCHANNELS_URL.to_string()
        }
    );
}

#[test]
fn reply_to_falls_back_to_capture_address() {
    let base = [
        ("BADGE_CAPTURE_TO", "captures@example.com"),
        ("BADGE_SENDER_FROM", "no-reply@example.com"),
    ];

    let mail = load(&base).unwrap().mail.unwrap();
    assert_eq!(mail.reply_to.as_deref(), Some("captures@example.com"));

    let mut vars = base.to_vec();
    vars.push(("BADGE_REPLY_TO", "team@example.com"));
    let mail = load(&vars).unwrap().mail.unwrap();
    assert_eq!(mail.reply_to.as_deref(), Some("team@example.com"));
}

#[test]
fn smtp_requires_host_user_and_pass() {
    let mut vars = vec![
        ("BADGE_CAPTURE_TO", "captures@example.com"),
        ("BADGE_SENDER_FROM", "no-reply@example.com"),
        ("BADGE_MAIL_PROVIDER", "smtp"),
        ("BADGE_SMTP_HOST", "smtp.example.com"),
        ("BADGE_SMTP_USER", "relay"),
    ];

    let err = load(&vars).unwrap_err();
    assert_eq!(err, "Missing required environment variable: BADGE_SMTP_PASS");

    vars.push(("BADGE_SMTP_PASS", "hunter2"));
    let mail = load(&vars).unwrap().mail.unwrap();
    match mail.provider {
        MailProvider::Smtp(smtp) => {
            assert_eq!(smtp.host, "smtp.example.com");
            assert_eq!(smtp.port, 587);
            assert_eq!(smtp.tls_mode, "starttls");
        }
        other => panic!("expected smtp provider, got {other:?}"),
    }
}

#[test]
fn unknown_mail_provider_is_an_error() {
    let err = load(&[
        ("BADGE_CAPTURE_TO", "captures@example.com"),
        ("BADGE_SENDER_FROM", "no-reply@example.com"),
        ("BADGE_MAIL_PROVIDER", "pigeon"),
    ])
    .unwrap_err();
    assert_eq!(err, "Invalid BADGE_MAIL_PROVIDER: pigeon");
}

// ── Lists ───────────────────────────────────────────────────────

#[test]
fn lists_are_split_and_validated() {
    let config = load(&[
        ("BADGE_ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
        ("BADGE_TRUSTED_PROXIES", "10.0.0.0/8, 173.245.48.0/20"),
    ])
    .unwrap();
    assert_eq!(
        config.allowed_origins,
        vec!["https://a.example".to_string(), "https://b.example".to_string()]
    );
    assert_eq!(config.trusted_proxies.len(), 2);

    let err = load(&[("BADGE_TRUSTED_PROXIES", "not-a-cidr")]).unwrap_err();
    assert!(err.starts_with("Invalid BADGE_TRUSTED_PROXIES entry 'not-a-cidr'"));
}
