// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact form gateway.
//!
//! The submit handler runs the full decision pipeline in order: request
//! gate, client-signature check, rate limiter, field validation, honeypot,
//! mail-domain check, captcha verification, composition, dispatch. Each
//! stage either refines the request or produces the terminal JSON outcome;
//! nothing runs after the first rejection.

use crate::captcha::{evaluate_verdict, TokenVerifier};
use crate::composer;
use crate::config::Config;
use crate::domain::MailDomainLookup;
use crate::error::SubmitError;
use crate::limiter::{AdmitResult, SessionStore, SlidingWindowLimiter};
use crate::mailer::MailTransport;
use crate::validator::{self, RawSubmission};
use axum::{
    extract::{ConnectInfo, Form, FromRequest, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub limiter: SlidingWindowLimiter<Arc<dyn SessionStore>>,
    pub captcha: Arc<dyn TokenVerifier>,
    pub domains: Arc<dyn MailDomainLookup>,
    pub mailer: Arc<dyn MailTransport>,
}

/// The single caller-visible outcome, success or failure.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    /// Name of the offending form field, when the failure is field-scoped
    pub field: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-form-gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Accept or reject a contact form submission.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let ip = addr.ip();
    match run_pipeline(&state, ip, request).await {
        Ok(message) => {
            info!(%ip, "submission accepted and dispatched");
            (
                StatusCode::OK,
                Json(SubmitResponse {
                    success: true,
                    message,
                    field: None,
                }),
            )
                .into_response()
        }
        Err(error) => {
            info!(%ip, %error, "submission rejected");
            error.into_response()
        }
    }
}

/// The ordered stage chain. Returns the success message, or the first
/// stage's terminal error.
async fn run_pipeline(
    state: &AppState,
    ip: IpAddr,
    request: Request,
) -> Result<String, SubmitError> {
    // Stage 1: request gate. Runs before the body is touched.
    if request.method() != Method::POST {
        return Err(SubmitError::MethodNotAllowed);
    }
    check_origin(&state.config, request.headers())?;
    debug!(%ip, "request gate passed");

    // Stage 3: rate limiter. A slot is consumed here, at admission time,
    // so attempts rejected by a later stage still count toward the window.
    let session = ip.to_string();
    if let AdmitResult::Limited { retry_after } = state.limiter.admit(&session, Utc::now()).await {
        return Err(SubmitError::RateLimited { retry_after });
    }

    // Stage 4: field extraction and validation. A body that cannot be read
    // as a form behaves like an empty submission: the first field check
    // reports it.
    let raw = match Form::<RawSubmission>::from_request(request, &()).await {
        Ok(Form(raw)) => raw,
        Err(rejection) => {
            debug!(%ip, %rejection, "form body unreadable, validating as empty");
            RawSubmission::default()
        }
    };
    let submission = validator::validate(raw, ip, Utc::now())?;

    // Stage 5: honeypot.
    validator::check_honeypot(&submission)?;
    debug!(%ip, email = %submission.email, "fields validated");

    // Stage 6: mail-domain existence. Ordered before the captcha call so a
    // junk domain never costs a scoring-API round trip.
    if !state.domains.has_mail_host(&submission.email_domain).await {
        return Err(SubmitError::DomainInvalid);
    }

    // Stage 7: captcha verification.
    let verdict = state.captcha.verify(&submission.token, ip).await?;
    evaluate_verdict(&verdict, &state.config.captcha)?;
    debug!(%ip, score = verdict.score, "captcha verdict accepted");

    // Stages 8-9: compose and dispatch. An admin-notification failure is
    // terminal; an acknowledgment failure is logged and degraded silently.
    let mail = composer::compose(&submission, &state.config.mail);
    state
        .mailer
        .send(&mail.notification)
        .await
        .map_err(|e| SubmitError::DispatchError(e.to_string()))?;

    if let Some(ack) = &mail.acknowledgment {
        if let Err(e) = state.mailer.send(ack).await {
            warn!(%ip, recipient = %ack.recipient_address, error = %e, "acknowledgment send failed");
        }
    }

    Ok("Your message has been sent. Thank you!".to_string())
}

/// Stage 2: client-signature checks on request metadata.
fn check_origin(config: &Config, headers: &HeaderMap) -> Result<(), SubmitError> {
    if config.gate.require_xhr {
        let xhr = headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
        if !xhr {
            return Err(SubmitError::BotSignatureRejected {
                reason: "missing async origin header",
            });
        }
    }

    let agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if agent.trim().is_empty() {
        return Err(SubmitError::BotSignatureRejected {
            reason: "missing user agent",
        });
    }
    let agent = agent.to_lowercase();
    if config
        .gate
        .blocked_agent_fragments
        .iter()
        .any(|fragment| agent.contains(fragment))
    {
        return Err(SubmitError::BotSignatureRejected {
            reason: "blocked user agent",
        });
    }

    Ok(())
}

fn status_code(error: &SubmitError) -> StatusCode {
    match error {
        SubmitError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        SubmitError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        SubmitError::FieldValidation { .. } | SubmitError::DomainInvalid => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SubmitError::BotSignatureRejected { .. }
        | SubmitError::SpamDetected
        | SubmitError::CaptchaRejected { .. }
        | SubmitError::CaptchaActionMismatch { .. }
        | SubmitError::CaptchaHostnameMismatch { .. }
        | SubmitError::CaptchaLowScore { .. } => StatusCode::FORBIDDEN,
        SubmitError::CaptchaRequestFailed(_)
        | SubmitError::CaptchaHttpError(_)
        | SubmitError::CaptchaInvalidResponse(_) => StatusCode::BAD_GATEWAY,
        SubmitError::DispatchError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let body = Json(SubmitResponse {
            success: false,
            message: self.public_message().to_string(),
            field: self.field().map(str::to_string),
        });
        match self.retry_after_secs() {
            Some(secs) => (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response(),
            None => (status, body).into_response(),
        }
    }
}
