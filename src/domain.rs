// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mail-domain existence checks.
//!
//! A domain passes if it publishes at least one MX record or, failing that,
//! at least one address record. This catches typo'd and invented domains
//! before the transport stage, where a bounce is slower and less
//! informative. Lookup failures of any kind count as "does not resolve";
//! the pipeline reports them all as the same terminal outcome.

use async_trait::async_trait;
use hickory_resolver::system_conf::read_system_conf;
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tracing::debug;

/// DNS-backed answer to "can this domain receive mail".
#[async_trait]
pub trait MailDomainLookup: Send + Sync {
    /// True if the domain has at least one MX record, or at least one
    /// address record when no MX exists.
    async fn has_mail_host(&self, domain: &str) -> bool;
}

/// Resolver-backed implementation over the system DNS configuration.
pub struct DnsMailDomainLookup {
    resolver: TokioAsyncResolver,
}

impl DnsMailDomainLookup {
    /// Build a resolver from the system configuration with a bounded
    /// per-lookup timeout.
    pub fn from_system_conf() -> Result<Self, hickory_resolver::error::ResolveError> {
        let (config, mut opts) = read_system_conf()?;
        opts.timeout = Duration::from_secs(5);
        opts.attempts = 1;
        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        })
    }
}

#[async_trait]
impl MailDomainLookup for DnsMailDomainLookup {
    async fn has_mail_host(&self, domain: &str) -> bool {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) if lookup.iter().next().is_some() => {
                debug!(domain, "MX record found");
                return true;
            }
            Ok(_) => debug!(domain, "MX lookup returned no records"),
            Err(e) => debug!(domain, error = %e, "MX lookup failed"),
        }

        match self.resolver.lookup_ip(domain).await {
            Ok(lookup) => {
                let found = lookup.iter().next().is_some();
                debug!(domain, found, "address fallback lookup");
                found
            }
            Err(e) => {
                debug!(domain, error = %e, "address lookup failed");
                false
            }
        }
    }
}
