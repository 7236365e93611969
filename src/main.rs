// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Form Gateway Service
//!
//! Accepts contact form submissions, filters abusive and automated
//! traffic, and relays legitimate messages to the site operator over SMTP.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honored). Required values:
//!
//! - `CAPTCHA_SECRET`: shared secret for the scoring endpoint
//! - `CAPTCHA_HOSTNAME`: hostname verdicts must carry
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`: transport settings
//! - `OPERATOR_ADDRESS`: mailbox receiving the notifications
//!
//! Optional values (defaults in parentheses):
//!
//! - `BIND_ADDR`: server bind address (0.0.0.0:8080)
//! - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS`: session window (3 / 3600)
//! - `CAPTCHA_MIN_SCORE`: minimum humanness score (0.5)
//! - `ACK_ENABLED`: send an acknowledgment to the submitter (false)

use axum::{
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_form_gateway::{
    config::Config,
    domain::DnsMailDomainLookup,
    handlers::{health, submit, AppState},
    limiter::{MemorySessionStore, SessionStore, SlidingWindowLimiter},
    mailer::SmtpMailer,
    RecaptchaVerifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration; a missing required value aborts here, before any
    // request is served.
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        rate_limit_max = config.rate_limit.max_submissions,
        rate_limit_window_secs = config.rate_limit.window_secs,
        captcha_min_score = config.captcha.min_score,
        acknowledge = config.mail.acknowledge,
        "Starting contact form gateway"
    );

    // Create application state
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let limiter = SlidingWindowLimiter::new(config.rate_limit.clone(), store);
    let captcha = RecaptchaVerifier::new(config.captcha.clone())?;
    let domains = DnsMailDomainLookup::from_system_conf()?;
    let mailer = SmtpMailer::new(
        &config.smtp,
        &config.mail.operator_address,
        &config.mail.operator_name,
    )?;

    let state = Arc::new(AppState {
        limiter,
        captcha: Arc::new(captcha),
        domains: Arc::new(domains),
        mailer: Arc::new(mailer),
        config,
    });

    // Spawn cleanup task for stale rate-limit sessions
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    // Build router
    let addr: SocketAddr = state.config.bind_addr.parse()?;
    let app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/submit", any(submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
