// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Form Gateway
//!
//! This crate accepts contact form submissions over HTTP, decides whether
//! each one is legitimate human-authored traffic, and dispatches one or two
//! notification emails for the ones that are. The decision pipeline, in
//! order:
//!
//! - Method and async-origin gating
//! - User-Agent signature check
//! - Per-session sliding-window rate limiting
//! - Field validation and sanitization
//! - Honeypot check
//! - Mail-domain DNS existence check
//! - Bot-score verification against an external scoring API
//!
//! Every stage is terminal on rejection; the caller always receives exactly
//! one JSON outcome.

pub mod captcha;
pub mod composer;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod validator;

pub use captcha::{CaptchaVerdict, RecaptchaVerifier, TokenVerifier};
pub use composer::{ComposedMail, ComposedMessage};
pub use config::Config;
pub use error::{ConfigError, SubmitError};
pub use limiter::{AdmitResult, MemorySessionStore, SessionStore, SlidingWindowLimiter};
pub use validator::Submission;
