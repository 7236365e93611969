// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Field extraction and validation for inbound submissions.
//!
//! The first missing or invalid field short-circuits with an error tagged
//! with that field's name, so the browser-side script can highlight it.
//! Email addresses are checked first, matching the order callers see their
//! mistakes most often. The honeypot and token fields are extracted as-is;
//! their semantics belong to later stages.

use crate::error::SubmitError;
use chrono::{DateTime, Utc};
use email_address::EmailAddress;
use serde::Deserialize;
use std::net::IpAddr;
use std::str::FromStr;

const NAME_MAX: usize = 128;
const SUBJECT_MAX: usize = 200;
const MESSAGE_MAX: usize = 5000;

/// Raw form fields as posted. Everything is optional here; presence is
/// enforced by [`validate`].
#[derive(Debug, Default, Deserialize)]
pub struct RawSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    /// Hidden field, named to look like an unrelated input so naive
    /// automated fillers populate it
    #[serde(rename = "website")]
    pub honeypot: Option<String>,
    pub recaptcha_token: Option<String>,
}

/// A validated submission. Immutable once built; lives for the request only.
#[derive(Debug, Clone)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub email_domain: String,
    pub subject: Option<String>,
    pub message: String,
    pub honeypot: String,
    pub token: String,
    pub caller_ip: IpAddr,
    pub received_at: DateTime<Utc>,
}

/// Validate raw fields into a [`Submission`].
pub fn validate(
    raw: RawSubmission,
    caller_ip: IpAddr,
    received_at: DateTime<Utc>,
) -> Result<Submission, SubmitError> {
    let email = sanitize_line(raw.email.as_deref().unwrap_or_default());
    let parsed = EmailAddress::from_str(&email).map_err(|_| SubmitError::FieldValidation {
        field: "email",
        message: "Please enter a valid email address.",
    })?;

    let name = sanitize_line(raw.name.as_deref().unwrap_or_default());
    if name.is_empty() {
        return Err(SubmitError::FieldValidation {
            field: "name",
            message: "Please enter your name.",
        });
    }
    if name.chars().count() > NAME_MAX {
        return Err(SubmitError::FieldValidation {
            field: "name",
            message: "Please enter a shorter name.",
        });
    }

    let message = sanitize_multiline(raw.message.as_deref().unwrap_or_default());
    if message.is_empty() {
        return Err(SubmitError::FieldValidation {
            field: "message",
            message: "Please enter your message.",
        });
    }
    if message.chars().count() > MESSAGE_MAX {
        return Err(SubmitError::FieldValidation {
            field: "message",
            message: "Please shorten your message.",
        });
    }

    let subject = {
        let s = sanitize_line(raw.subject.as_deref().unwrap_or_default());
        if s.chars().count() > SUBJECT_MAX {
            return Err(SubmitError::FieldValidation {
                field: "subject",
                message: "Please enter a shorter subject.",
            });
        }
        (!s.is_empty()).then_some(s)
    };

    let token = raw.recaptcha_token.map(|t| t.trim().to_string()).unwrap_or_default();
    if token.is_empty() {
        return Err(SubmitError::FieldValidation {
            field: "recaptcha_token",
            message: "Verification token missing. Please reload the page and try again.",
        });
    }

    Ok(Submission {
        name,
        email_domain: parsed.domain().to_string(),
        email,
        subject,
        message,
        honeypot: raw.honeypot.unwrap_or_default(),
        token,
        caller_ip,
        received_at,
    })
}

/// Reject the submission if the hidden honeypot field was filled in.
///
/// The field is invisible to human users, so any non-whitespace content
/// signals automated filling.
pub fn check_honeypot(submission: &Submission) -> Result<(), SubmitError> {
    if submission.honeypot.trim().is_empty() {
        Ok(())
    } else {
        Err(SubmitError::SpamDetected)
    }
}

/// Trim and drop control characters from a single-line field.
fn sanitize_line(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Like [`sanitize_line`] but preserves line breaks, normalized to `\n`.
fn sanitize_multiline(value: &str) -> String {
    value
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
