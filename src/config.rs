use std::net::IpAddr;

use ipnet::IpNet;

pub const DEFAULT_MAILCHANNELS_URL: &str = "https://api.mailchannels.net/tx/v1/send";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<String>,
    pub site_name: String,
    pub require_consent: bool,
    pub mail: Option<MailConfig>,
    pub send_confirmation: bool,
    pub sheet: Option<SheetConfig>,
    pub kv: KvBackend,
    pub rate_limit: Option<RateLimitConfig>,
    pub record_ttl_secs: u64,
    pub collaborator_timeout_secs: u64,
}

/// Notification routing. Only present when both the capture and sender addresses are set.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
    pub provider: MailProvider,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MailProvider {
    MailChannels { api_url: String },
    Smtp(SmtpConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub tls_mode: String,
}

#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub url: String,
    pub secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KvBackend {
    Off,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 2,
            window_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let env = Env(&lookup);

        let host: IpAddr = env
            .or("BADGE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid BADGE_HOST: {e}"))?;

        let port: u16 = env
            .or("BADGE_PORT", "8787")
            .parse()
            .map_err(|e| format!("Invalid BADGE_PORT: {e}"))?;

        let log_level = env.or("BADGE_LOG_LEVEL", "info");

        let max_body_size: usize = env
            .or("BADGE_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid BADGE_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = split_list(&env.or("BADGE_TRUSTED_PROXIES", ""))
            .map(|s| {
                s.parse()
                    .map_err(|e| format!("Invalid BADGE_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let allowed_origins = split_list(&env.or("BADGE_ALLOWED_ORIGINS", ""))
            .map(|s| s.to_string())
            .collect();

        let static_dir = env.opt("BADGE_STATIC_DIR");
        let site_name = env.or("BADGE_SITE_NAME", "ReadyToRelate");
        let require_consent = env.flag("BADGE_REQUIRE_CONSENT");
        let send_confirmation = env.flag("BADGE_SEND_CONFIRMATION");

        let mail = match (env.opt("BADGE_CAPTURE_TO"), env.opt("BADGE_SENDER_FROM")) {
            (Some(to), Some(from)) => {
                let reply_to = env.opt("BADGE_REPLY_TO").or_else(|| Some(to.clone()));
                Some(MailConfig {
                    to,
                    from,
                    reply_to,
                    provider: mail_provider(&env)?,
                })
            }
            _ => None,
        };

        let sheet = match (env.opt("BADGE_SHEET_URL"), env.opt("BADGE_SHEET_SECRET")) {
            (Some(url), Some(secret)) => Some(SheetConfig { url, secret }),
            _ => None,
        };

        let kv = match env.or("BADGE_KV", "memory").as_str() {
            "memory" => KvBackend::Memory,
            "off" | "none" => KvBackend::Off,
            other => return Err(format!("Invalid BADGE_KV: {other}")),
        };

        let limit: u32 = env
            .or("BADGE_RATE_LIMIT", "2")
            .parse()
            .map_err(|e| format!("Invalid BADGE_RATE_LIMIT: {e}"))?;
        let window_secs: u64 = env
            .or("BADGE_RATE_WINDOW_SECS", "3600")
            .parse()
            .map_err(|e| format!("Invalid BADGE_RATE_WINDOW_SECS: {e}"))?;
        if window_secs == 0 {
            return Err("BADGE_RATE_WINDOW_SECS must be positive".to_string());
        }
        let rate_limit = (limit > 0).then_some(RateLimitConfig { limit, window_secs });

        let record_ttl_secs: u64 = env
            .or("BADGE_RECORD_TTL_SECS", "31536000")
            .parse()
            .map_err(|e| format!("Invalid BADGE_RECORD_TTL_SECS: {e}"))?;

        let collaborator_timeout_secs: u64 = env
            .or("BADGE_COLLABORATOR_TIMEOUT_SECS", "10")
            .parse()
            .map_err(|e| format!("Invalid BADGE_COLLABORATOR_TIMEOUT_SECS: {e}"))?;

        Ok(Config {
            host,
            port,
            log_level,
            max_body_size,
            trusted_proxies,
            allowed_origins,
            static_dir,
            site_name,
            require_consent,
            mail,
            send_confirmation,
            sheet,
            kv,
            rate_limit,
            record_ttl_secs,
            collaborator_timeout_secs,
        })
    }
}

fn mail_provider(env: &Env<'_>) -> Result<MailProvider, String> {
    match env.or("BADGE_MAIL_PROVIDER", "mailchannels").as_str() {
        "mailchannels" => Ok(MailProvider::MailChannels {
            api_url: env.or("BADGE_MAILCHANNELS_URL", DEFAULT_MAILCHANNELS_URL),
        }),
        "smtp" => Ok(MailProvider::Smtp(SmtpConfig {
            host: env.required("BADGE_SMTP_HOST")?,
            port: env
                .or("BADGE_SMTP_PORT", "587")
                .parse()
                .map_err(|e| format!("Invalid BADGE_SMTP_PORT: {e}"))?,
            user: env.required("BADGE_SMTP_USER")?,
            pass: env.required("BADGE_SMTP_PASS")?,
            tls_mode: env.or("BADGE_SMTP_TLS", "starttls"),
        })),
        other => Err(format!("Invalid BADGE_MAIL_PROVIDER: {other}")),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Variable source with the usual defaulting rules. Unset and blank values are treated the same.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String, String> {
        self.opt(key)
            .ok_or_else(|| format!("Missing required environment variable: {key}"))
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.opt(key).as_deref(), Some("true" | "1" | "yes"))
    }
}
