// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter keyed by caller session.
//!
//! A sliding window was chosen over a fixed bucket so a burst straddling a
//! clock boundary cannot be admitted twice over. The window only throttles a
//! single repeat caller: state is per session, so a botnet spreading sessions
//! is out of scope here and handled by the captcha stage instead.
//!
//! Attempt timestamps live behind the [`SessionStore`] interface rather than
//! an ambient global. The bundled in-memory store does not make the
//! read-modify-write atomic across concurrent requests for the same session;
//! a double-submit race can admit one extra attempt past the window. That is
//! an accepted weakness, not a guarantee.

use crate::config::RateLimitConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Result of an admission check.
#[derive(Debug, Clone)]
pub enum AdmitResult {
    /// Attempt admitted and recorded
    Admitted {
        /// Remaining attempts in the current window
        remaining: u32,
    },
    /// Attempt rejected; nothing recorded
    Limited {
        /// Time until the oldest counted attempt leaves the window
        retry_after: Duration,
    },
}

impl AdmitResult {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmitResult::Admitted { .. })
    }
}

/// Keyed storage for per-session attempt timestamps.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Timestamps of prior admitted attempts for this session.
    async fn get(&self, session: &str) -> Vec<DateTime<Utc>>;

    /// Replace the stored timestamps for this session.
    async fn put(&self, session: &str, attempts: Vec<DateTime<Utc>>);

    /// Drop sessions whose newest attempt predates `horizon`.
    async fn prune(&self, horizon: DateTime<Utc>);
}

#[async_trait]
impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    async fn get(&self, session: &str) -> Vec<DateTime<Utc>> {
        (**self).get(session).await
    }

    async fn put(&self, session: &str, attempts: Vec<DateTime<Utc>>) {
        (**self).put(session, attempts).await
    }

    async fn prune(&self, horizon: DateTime<Utc>) {
        (**self).prune(horizon).await
    }
}

/// In-memory session store.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session: &str) -> Vec<DateTime<Utc>> {
        self.entries
            .read()
            .await
            .get(session)
            .cloned()
            .unwrap_or_default()
    }

    async fn put(&self, session: &str, attempts: Vec<DateTime<Utc>>) {
        self.entries
            .write()
            .await
            .insert(session.to_string(), attempts);
    }

    async fn prune(&self, horizon: DateTime<Utc>) {
        self.entries
            .write()
            .await
            .retain(|_, attempts| attempts.iter().any(|t| *t >= horizon));
    }
}

/// Sliding-window limiter over an injected session store.
pub struct SlidingWindowLimiter<S: SessionStore> {
    config: RateLimitConfig,
    store: S,
}

impl<S: SessionStore> SlidingWindowLimiter<S> {
    /// Create a limiter over the given store.
    pub fn new(config: RateLimitConfig, store: S) -> Self {
        Self { config, store }
    }

    /// Admit or reject an attempt at `now`.
    ///
    /// Timestamps strictly older than `now - window` are pruned first. If the
    /// remaining count has reached the maximum the attempt is rejected and
    /// `now` is not recorded; otherwise `now` is appended and the attempt is
    /// admitted. Recording happens at admission time, so an attempt that a
    /// later stage rejects still consumed its slot.
    pub async fn admit(&self, session: &str, now: DateTime<Utc>) -> AdmitResult {
        let window = ChronoDuration::seconds(self.config.window_secs as i64);
        let horizon = now - window;

        let mut attempts = self.store.get(session).await;
        attempts.retain(|t| *t >= horizon);

        if attempts.len() >= self.config.max_submissions as usize {
            // Oldest counted attempt decides when a slot opens again.
            let retry_after = attempts
                .iter()
                .min()
                .map(|oldest| (*oldest + window) - now)
                .and_then(|d| d.to_std().ok())
                .unwrap_or_default();
            debug!(session, ?retry_after, "session window full");
            self.store.put(session, attempts).await;
            return AdmitResult::Limited { retry_after };
        }

        attempts.push(now);
        let remaining = self.config.max_submissions - attempts.len() as u32;
        debug!(session, remaining, "attempt admitted");
        self.store.put(session, attempts).await;
        AdmitResult::Admitted { remaining }
    }

    /// Drop sessions with no attempt inside the current window
    /// (should be called periodically).
    pub async fn cleanup(&self) {
        let horizon = Utc::now() - ChronoDuration::seconds(self.config.window_secs as i64);
        self.store.prune(horizon).await;
    }
}
