// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error taxonomy for the submission pipeline.
//!
//! Every variant is terminal: the first failing stage wins and the request
//! ends with a single JSON outcome. The variants carry internal diagnostic
//! detail for logging; the caller only ever sees [`SubmitError::public_message`]
//! and, where applicable, the offending field name.

use std::time::Duration;
use thiserror::Error;

/// Message shown for every automation rejection. The wording is deliberately
/// identical across the honeypot, bot-signature, and captcha-verdict paths so
/// the response does not reveal which check fired.
pub const ANTI_ABUSE_MESSAGE: &str = "Your message could not be verified. Please try again.";

/// Terminal pipeline errors, in rough stage order.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Request did not use the designated write method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Request metadata carried a missing or suspicious client signature.
    #[error("bot signature rejected: {reason}")]
    BotSignatureRejected { reason: &'static str },

    /// The caller's session exhausted its sliding-window allowance.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// A required field was missing or failed validation.
    #[error("invalid field {field}")]
    FieldValidation {
        field: &'static str,
        message: &'static str,
    },

    /// The hidden honeypot field was filled in.
    #[error("honeypot field was non-empty")]
    SpamDetected,

    /// The submitter's email domain has neither MX nor address records.
    #[error("email domain does not resolve")]
    DomainInvalid,

    /// The scoring API could not be reached at all.
    #[error("captcha request failed: {0}")]
    CaptchaRequestFailed(String),

    /// The scoring API answered with a non-success HTTP status.
    #[error("captcha endpoint returned HTTP {0}")]
    CaptchaHttpError(u16),

    /// The scoring API response body could not be decoded.
    #[error("captcha response malformed: {0}")]
    CaptchaInvalidResponse(String),

    /// The verdict's success flag was false.
    #[error("captcha rejected: {error_codes:?}")]
    CaptchaRejected { error_codes: Vec<String> },

    /// The verdict was issued for a different form action.
    #[error("captcha action mismatch: got {got:?}")]
    CaptchaActionMismatch { got: String },

    /// The verdict was issued for a different hostname.
    #[error("captcha hostname mismatch: got {got:?}")]
    CaptchaHostnameMismatch { got: String },

    /// The humanness score fell below the configured minimum.
    #[error("captcha score {score} below minimum")]
    CaptchaLowScore { score: f32 },

    /// The admin notification could not be handed to the mail transport.
    #[error("dispatch failed: {0}")]
    DispatchError(String),
}

impl SubmitError {
    /// Field name the caller should highlight, if the error is field-scoped.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::FieldValidation { field, .. } => Some(field),
            Self::DomainInvalid => Some("email"),
            _ => None,
        }
    }

    /// Concise, non-technical message for the caller. Internal detail stays
    /// in the tracing output.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "Invalid request method.",
            Self::RateLimited { .. } => "Too many messages sent. Please try again later.",
            Self::FieldValidation { message, .. } => message,
            Self::DomainInvalid => "Please enter an email address with a valid domain.",
            Self::CaptchaRequestFailed(_)
            | Self::CaptchaHttpError(_)
            | Self::CaptchaInvalidResponse(_) => {
                "The verification service is unavailable. Please try again later."
            }
            Self::BotSignatureRejected { .. }
            | Self::SpamDetected
            | Self::CaptchaRejected { .. }
            | Self::CaptchaActionMismatch { .. }
            | Self::CaptchaHostnameMismatch { .. }
            | Self::CaptchaLowScore { .. } => ANTI_ABUSE_MESSAGE,
            Self::DispatchError(_) => "Sorry, your message could not be sent.",
        }
    }

    /// Seconds the caller should wait before retrying, for the rate limiter.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => Some(retry_after.as_secs().max(1)),
            _ => None,
        }
    }
}

/// Startup configuration failures. Raised before any request is served.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
