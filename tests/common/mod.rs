#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use badge_relay::actions::{ActionError, Delivery, MailSender, OutgoingMail, SubmissionLogger};
use badge_relay::config::{Config, KvBackend, MailConfig, MailProvider, SheetConfig};
use badge_relay::kv::{KvError, KvStore, MemoryKv};
use badge_relay::models::SubmissionRecord;
use badge_relay::state::SharedState;
use badge_relay::submission::RequestMeta;

// ── Running app ─────────────────────────────────────────────────

/// A running test server instance.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: SharedState,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Submit a JSON body to `/badge`, return (body, status).
    pub async fn submit_json(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/badge"))
            .json(data)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// Config with every collaborator switched off.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        log_level: "warn".to_string(),
        max_body_size: 65_536,
        trusted_proxies: vec![],
        allowed_origins: vec![],
        static_dir: None,
        site_name: "ReadyToRelate".to_string(),
        require_consent: false,
        mail: None,
        send_confirmation: false,
        sheet: None,
        kv: KvBackend::Off,
        rate_limit: None,
        record_ttl_secs: 31_536_000,
        collaborator_timeout_secs: 5,
    }
}

/// Config pointing mail and sheet at the given mock servers, with the in-memory store on.
pub fn wired_config(mail: &MockServer, sheet: &MockServer) -> Config {
    Config {
        mail: Some(MailConfig {
            to: "captures@example.com".to_string(),
            from: "no-reply@example.com".to_string(),
            reply_to: Some("captures@example.com".to_string()),
            provider: MailProvider::MailChannels {
                api_url: mail.url("/tx/v1/send"),
            },
        }),
        sheet: Some(SheetConfig {
            url: sheet.url("/exec"),
            secret: "s3cret".to_string(),
        }),
        kv: KvBackend::Memory,
        rate_limit: Some(Default::default()),
        ..test_config()
    }
}

pub async fn spawn_app(config: Config) -> TestApp {
    let (app, state) = badge_relay::build_app(config);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        state,
    }
}

// ── Mock HTTP collaborators ─────────────────────────────────────

/// Stand-in for an HTTP collaborator: answers every request with a fixed status and body
/// and records the JSON it was sent.
pub struct MockServer {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
    pub bodies: Arc<Mutex<Vec<Value>>>,
}

impl MockServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Value {
        self.bodies.lock().unwrap().last().cloned().unwrap_or(json!(null))
    }
}

pub async fn spawn_mock(status: u16, reply: &'static str) -> MockServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let status = axum::http::StatusCode::from_u16(status).unwrap();

    let h = hits.clone();
    let b = bodies.clone();
    let app = Router::new().fallback(move |Json(body): Json<Value>| {
        let h = h.clone();
        let b = b.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            b.lock().unwrap().push(body);
            (status, reply)
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server failed");
    });

    MockServer { addr, hits, bodies }
}

// ── In-process collaborators ────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Reply {
    Accept,
    Reject(u16, String),
    Error(&'static str),
    /// Never answers; only a timeout ends the call.
    Hang,
}

impl Reply {
    async fn resolve(&self) -> Result<Delivery, ActionError> {
        match self {
            Reply::Accept => Ok(Delivery::Accepted),
            Reply::Reject(status, body) => Ok(Delivery::Rejected {
                status: *status,
                body: body.clone(),
            }),
            Reply::Error(msg) => Err(ActionError::from(*msg)),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub struct FakeMailer {
    pub reply: Reply,
    pub calls: AtomicUsize,
    pub sent: Mutex<Vec<OutgoingMail>>,
}

impl FakeMailer {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailSender for FakeMailer {
    fn provider(&self) -> &str {
        "fake"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<Delivery, ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(mail.clone());
        self.reply.resolve().await
    }
}

pub struct FakeLogger {
    pub reply: Reply,
    pub calls: AtomicUsize,
}

impl FakeLogger {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionLogger for FakeLogger {
    async fn log(&self, _record: &SubmissionRecord) -> Result<Delivery, ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.resolve().await
    }
}

/// Memory store that counts traffic and can be told to fail every call.
pub struct FakeKv {
    pub inner: MemoryKv,
    pub fail: bool,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl FakeKv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKv::new(),
            fail: false,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKv::new(),
            fail: true,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for FakeKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(KvError::from("store unavailable"));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(KvError::from("store unavailable"));
        }
        self.inner.put(key, value, ttl).await
    }
}

// ── Request metadata ────────────────────────────────────────────

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 15, 0).unwrap()
}

pub fn meta(ip: &str) -> RequestMeta {
    meta_at(ip, fixed_time())
}

pub fn meta_at(ip: &str, received_at: DateTime<Utc>) -> RequestMeta {
    RequestMeta {
        ip: ip.to_string(),
        user_agent: "test-agent/1.0".to_string(),
        received_at,
    }
}

pub fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}
