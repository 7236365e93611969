// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared test harness: fake external collaborators and request builders.
//!
//! The fakes stand in for the three network dependencies (scoring API, DNS,
//! SMTP relay) so the full pipeline can be driven through the router with
//! observable, deterministic behavior.

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request};
use axum::routing::{any, get};
use axum::Router;
use contact_form_gateway::captcha::{CaptchaVerdict, TokenVerifier};
use contact_form_gateway::composer::ComposedMessage;
use contact_form_gateway::config::{
    CaptchaConfig, Config, GateConfig, MailConfig, RateLimitConfig, SmtpConfig,
};
use contact_form_gateway::domain::MailDomainLookup;
use contact_form_gateway::error::SubmitError;
use contact_form_gateway::handlers::{health, submit, AppState};
use contact_form_gateway::limiter::{MemorySessionStore, SessionStore, SlidingWindowLimiter};
use contact_form_gateway::mailer::{MailTransport, TransportError};
use http_body_util::BodyExt;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const OPERATOR: &str = "owner@forms.example.org";
pub const EXPECTED_HOSTNAME: &str = "forms.example.org";

/// Scoring-API fake. Counts calls so stage ordering is observable.
pub struct FakeVerifier {
    pub calls: AtomicUsize,
    behavior: FakeVerdict,
}

pub enum FakeVerdict {
    Verdict(CaptchaVerdict),
    Unreachable,
}

impl FakeVerifier {
    pub fn passing() -> Arc<Self> {
        Self::with_verdict(passing_verdict())
    }

    pub fn with_verdict(verdict: CaptchaVerdict) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            behavior: FakeVerdict::Verdict(verdict),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            behavior: FakeVerdict::Unreachable,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, _token: &str, _ip: IpAddr) -> Result<CaptchaVerdict, SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            FakeVerdict::Verdict(verdict) => Ok(verdict.clone()),
            FakeVerdict::Unreachable => {
                Err(SubmitError::CaptchaRequestFailed("connection refused".into()))
            }
        }
    }
}

/// A verdict that clears every check under [`test_config`].
pub fn passing_verdict() -> CaptchaVerdict {
    CaptchaVerdict {
        success: true,
        score: 0.9,
        action: "submit".into(),
        hostname: EXPECTED_HOSTNAME.into(),
        error_codes: vec![],
    }
}

/// DNS fake: every domain resolves, or none does.
pub struct FakeDomains {
    pub resolving: bool,
}

#[async_trait]
impl MailDomainLookup for FakeDomains {
    async fn has_mail_host(&self, _domain: &str) -> bool {
        self.resolving
    }
}

/// SMTP fake. Records every attempted recipient; sends to addresses listed
/// in `fail_recipients` error out.
pub struct FakeMailer {
    pub sent: Mutex<Vec<ComposedMessage>>,
    pub attempts: Mutex<Vec<String>>,
    fail_recipients: Vec<String>,
}

impl FakeMailer {
    pub fn working() -> Arc<Self> {
        Self::failing_for(&[])
    }

    pub fn failing_for(recipients: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
            fail_recipients: recipients.iter().map(|r| r.to_string()).collect(),
        })
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn attempted_recipients(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for FakeMailer {
    async fn send(&self, message: &ComposedMessage) -> Result<(), TransportError> {
        self.attempts
            .lock()
            .await
            .push(message.recipient_address.clone());
        if self.fail_recipients.contains(&message.recipient_address) {
            return Err(TransportError("relay refused the message".into()));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Configuration with fake-friendly values. Rate limiting is generous by
/// default so only the dedicated test exercises it.
pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".into(),
        gate: GateConfig::default(),
        rate_limit: RateLimitConfig {
            max_submissions: 100,
            window_secs: 3600,
        },
        captcha: CaptchaConfig {
            secret: "secret".into(),
            verify_url: "https://scoring.invalid/verify".into(),
            expected_action: "submit".into(),
            expected_hostname: EXPECTED_HOSTNAME.into(),
            min_score: 0.5,
            timeout_secs: 10,
        },
        smtp: SmtpConfig {
            host: "smtp.example.org".into(),
            port: 587,
            username: "user".into(),
            password: "pass".into(),
            encryption: Default::default(),
        },
        mail: MailConfig {
            operator_address: OPERATOR.into(),
            operator_name: "Site owner".into(),
            subject: "New message!".into(),
            acknowledge: false,
            ack_subject: "We received your message".into(),
        },
    }
}

/// Router over a state built from the given fakes, with a mocked peer
/// address so `ConnectInfo` resolves.
pub fn app(
    config: Config,
    captcha: Arc<FakeVerifier>,
    domains_resolve: bool,
    mailer: Arc<FakeMailer>,
) -> Router {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let limiter = SlidingWindowLimiter::new(config.rate_limit.clone(), store);
    let state = Arc::new(AppState {
        limiter,
        captcha,
        domains: Arc::new(FakeDomains {
            resolving: domains_resolve,
        }),
        mailer,
        config,
    });

    Router::new()
        .route("/health", get(health))
        .route("/submit", any(submit))
        .layer(MockConnectInfo(SocketAddr::from(([203, 0, 113, 9], 4711))))
        .with_state(state)
}

/// Form fields for a submission that should pass every stage.
pub fn ok_fields() -> Vec<(&'static str, String)> {
    vec![
        ("name", "Ada".into()),
        ("email", "ada@example.com".into()),
        ("message", "Hello\nWorld".into()),
        ("recaptcha_token", "tok".into()),
    ]
}

/// A browser-shaped POST of the given form fields.
pub fn post_form(fields: &[(&str, String)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    Request::builder()
        .method("POST")
        .uri("/submit")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64)")
        .header("x-requested-with", "XMLHttpRequest")
        .body(Body::from(body))
        .unwrap()
}

/// Decode a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
