// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact form gateway.
//!
//! Values are loaded from environment variables (optionally via a `.env`
//! file). Anything without a sensible default — the captcha secret, the
//! expected hostname, SMTP credentials, the operator address — is required,
//! and a missing value aborts startup before any request is served.

use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Request gate configuration
    #[serde(default)]
    pub gate: GateConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Captcha verification configuration
    pub captcha: CaptchaConfig,

    /// SMTP transport configuration
    pub smtp: SmtpConfig,

    /// Notification mail configuration
    pub mail: MailConfig,
}

/// Request gate: method and client-signature checks that run before any
/// field parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Require the `X-Requested-With: XMLHttpRequest` header set by the
    /// browser-side form script (default: true)
    #[serde(default = "default_true")]
    pub require_xhr: bool,

    /// User-Agent fragments rejected as automation signatures
    #[serde(default = "default_blocked_agents")]
    pub blocked_agent_fragments: Vec<String>,
}

/// Sliding-window rate limiting, per caller session.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum admitted submissions per window (default: 3)
    #[serde(default = "default_max_submissions")]
    pub max_submissions: u32,

    /// Window length in seconds (default: 3600)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

/// Captcha scoring API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Shared secret for the scoring endpoint (required)
    pub secret: String,

    /// Scoring endpoint URL
    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Action string the verdict must carry (default: "submit")
    #[serde(default = "default_action")]
    pub expected_action: String,

    /// Hostname the verdict must carry (required)
    pub expected_hostname: String,

    /// Minimum acceptable humanness score (default: 0.5)
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Verification call timeout in seconds (default: 10)
    #[serde(default = "default_captcha_timeout_secs")]
    pub timeout_secs: u64,
}

/// SMTP transport settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// SMTP server hostname (required)
    pub host: String,

    /// SMTP port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// SMTP username (required)
    pub username: String,

    /// SMTP password (required)
    pub password: String,

    /// Connection encryption mode (default: starttls)
    #[serde(default)]
    pub encryption: SmtpEncryption,
}

/// Encryption mode for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpEncryption {
    /// STARTTLS upgrade on a plaintext connection (port 587 convention)
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (port 465 convention)
    Implicit,
    /// No encryption; only for local test relays
    None,
}

impl FromStr for SmtpEncryption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tls" | "starttls" => Ok(Self::StartTls),
            "ssl" | "implicit" => Ok(Self::Implicit),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Notification content and addressing.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Operator mailbox receiving admin notifications (required)
    pub operator_address: String,

    /// Display name for the operator mailbox
    #[serde(default = "default_operator_name")]
    pub operator_name: String,

    /// Subject line used when the submitter provides none
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Send an acknowledgment back to the submitter (default: false)
    #[serde(default)]
    pub acknowledge: bool,

    /// Subject line for the acknowledgment
    #[serde(default = "default_ack_subject")]
    pub ack_subject: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_true() -> bool {
    true
}

fn default_blocked_agents() -> Vec<String> {
    ["curl", "wget", "python-requests", "scrapy", "go-http-client"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_submissions() -> u32 {
    3
}

fn default_window_secs() -> u64 {
    3600
}

fn default_verify_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

fn default_action() -> String {
    "submit".to_string()
}

fn default_min_score() -> f32 {
    0.5
}

fn default_captcha_timeout_secs() -> u64 {
    10
}

fn default_smtp_port() -> u16 {
    587
}

fn default_operator_name() -> String {
    "Contact form".to_string()
}

fn default_subject() -> String {
    "New message!".to_string()
}

fn default_ack_subject() -> String {
    "We received your message".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            require_xhr: default_true(),
            blocked_agent_fragments: default_blocked_agents(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_submissions: default_max_submissions(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Get the sliding window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl CaptchaConfig {
    /// Get the verification call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: var_or("BIND_ADDR", default_bind_addr),
            gate: GateConfig {
                require_xhr: parse_or("REQUIRE_XHR", true)?,
                blocked_agent_fragments: env::var("BLOCKED_AGENTS")
                    .map(|v| v.split(',').map(|s| s.trim().to_lowercase()).collect())
                    .unwrap_or_else(|_| default_blocked_agents()),
            },
            rate_limit: RateLimitConfig {
                max_submissions: parse_or("RATE_LIMIT_MAX", default_max_submissions())?,
                window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", default_window_secs())?,
            },
            captcha: CaptchaConfig {
                secret: required("CAPTCHA_SECRET")?,
                verify_url: var_or("CAPTCHA_VERIFY_URL", default_verify_url),
                expected_action: var_or("CAPTCHA_ACTION", default_action),
                expected_hostname: required("CAPTCHA_HOSTNAME")?,
                min_score: parse_or("CAPTCHA_MIN_SCORE", default_min_score())?,
                timeout_secs: parse_or("CAPTCHA_TIMEOUT_SECS", default_captcha_timeout_secs())?,
            },
            smtp: SmtpConfig {
                host: required("SMTP_HOST")?,
                port: parse_or("SMTP_PORT", default_smtp_port())?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
                encryption: parse_or("SMTP_ENCRYPTION", SmtpEncryption::StartTls)?,
            },
            mail: MailConfig {
                operator_address: required("OPERATOR_ADDRESS")?,
                operator_name: var_or("OPERATOR_NAME", default_operator_name),
                subject: var_or("MAIL_SUBJECT", default_subject),
                acknowledge: parse_or("ACK_ENABLED", false)?,
                ack_subject: var_or("ACK_SUBJECT", default_ack_subject),
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn var_or(name: &str, default: fn() -> String) -> String {
    env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or_else(default)
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(value) if !value.is_empty() => {
            value.parse().map_err(|_| ConfigError::Invalid { name, value })
        }
        _ => Ok(default),
    }
}
