// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bot-score verification against the reCAPTCHA v3 siteverify endpoint.
//!
//! The network call is a single timed POST; nothing is retried. The verdict
//! checks run in a fixed order (success flag, action, hostname, score) and
//! the first violated condition determines the reported reason. Action and
//! hostname checks defend against token replay from an unrelated form or
//! another site.

use crate::config::CaptchaConfig;
use crate::error::SubmitError;
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Verdict returned by the scoring API. Transient; never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaVerdict {
    pub success: bool,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Client of the external scoring API.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Submit a token for scoring. Errors cover the transport, HTTP, and
    /// decoding failure modes; verdict semantics are judged separately by
    /// [`evaluate_verdict`].
    async fn verify(&self, token: &str, caller_ip: IpAddr) -> Result<CaptchaVerdict, SubmitError>;
}

/// reCAPTCHA v3 verifier.
pub struct RecaptchaVerifier {
    http: reqwest::Client,
    config: CaptchaConfig,
}

impl RecaptchaVerifier {
    /// Build a verifier with the configured call timeout baked into the
    /// HTTP client.
    pub fn new(config: CaptchaConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl TokenVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str, caller_ip: IpAddr) -> Result<CaptchaVerdict, SubmitError> {
        let params = [
            ("secret", self.config.secret.as_str()),
            ("response", token),
            ("remoteip", &caller_ip.to_string()),
        ];

        let response = self
            .http
            .post(&self.config.verify_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "captcha endpoint unreachable");
                SubmitError::CaptchaRequestFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "captcha endpoint returned error status");
            return Err(SubmitError::CaptchaHttpError(status.as_u16()));
        }

        let verdict: CaptchaVerdict = response.json().await.map_err(|e| {
            warn!(error = %e, "captcha response body malformed");
            SubmitError::CaptchaInvalidResponse(e.to_string())
        })?;

        debug!(
            success = verdict.success,
            score = verdict.score,
            action = %verdict.action,
            hostname = %verdict.hostname,
            "captcha verdict received"
        );
        Ok(verdict)
    }
}

/// Judge a verdict against the configured expectations.
///
/// Checked in fixed order: success flag, action, hostname, score. The first
/// violated condition wins.
pub fn evaluate_verdict(verdict: &CaptchaVerdict, config: &CaptchaConfig) -> Result<(), SubmitError> {
    if !verdict.success {
        return Err(SubmitError::CaptchaRejected {
            error_codes: verdict.error_codes.clone(),
        });
    }
    if verdict.action != config.expected_action {
        return Err(SubmitError::CaptchaActionMismatch {
            got: verdict.action.clone(),
        });
    }
    if verdict.hostname != config.expected_hostname {
        return Err(SubmitError::CaptchaHostnameMismatch {
            got: verdict.hostname.clone(),
        });
    }
    if verdict.score < config.min_score {
        return Err(SubmitError::CaptchaLowScore {
            score: verdict.score,
        });
    }
    Ok(())
}
