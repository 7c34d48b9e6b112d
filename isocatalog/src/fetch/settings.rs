//! Fetch gateway settings.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::Semaphore;

/// Global ceiling on in-flight requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 150;

/// Default retry count after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Per-host concurrency ceilings.
///
/// Limits are clamped to `1..=Semaphore::MAX_PERMITS`.
///
/// A limit applies to the named host and to all of its subdomains, so
/// `sourceforge.net` also covers `downloads.sourceforge.net`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLimits {
    limits: BTreeMap<String, usize>,
}

impl HostLimits {
    pub fn empty() -> Self {
        Self {
            limits: BTreeMap::new(),
        }
    }

    pub fn with_limit(mut self, host: impl Into<String>, limit: usize) -> Self {
        self.insert(host, limit);
        self
    }

    pub fn insert(&mut self, host: impl Into<String>, limit: usize) {
        self.limits
            .insert(host.into().to_ascii_lowercase(), clamp_permits(limit));
    }

    /// Finds the configured host that governs `host`, with its limit.
    pub fn limit_for(&self, host: &str) -> Option<(&str, usize)> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.limits.iter().find_map(|(configured, limit)| {
            let governs = host == *configured
                || host
                    .strip_suffix(configured.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'));
            governs.then_some((configured.as_str(), *limit))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.limits.iter().map(|(host, limit)| (host.as_str(), *limit))
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

fn clamp_permits(limit: usize) -> usize {
    limit.clamp(1, Semaphore::MAX_PERMITS)
}

impl Default for HostLimits {
    /// Mirrors known to throttle aggressive clients.
    fn default() -> Self {
        Self::empty()
            .with_limit("sourceforge.net", 5)
            .with_limit("zrn.co", 3)
    }
}

/// Configuration for the fetch gateway.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Maximum requests in flight across all hosts.
    pub max_concurrent_requests: usize,

    /// Tighter ceilings for specific hosts.
    pub host_limits: HostLimits,

    /// Retries after the first attempt on transport errors, 429 and 5xx.
    pub max_retries: u32,

    /// Initial backoff; doubles on every retry.
    pub retry_base_delay: Duration,

    /// Upper bound for a single backoff sleep.
    pub retry_max_delay: Duration,

    /// Whole-request timeout, including the body.
    pub request_timeout: Duration,

    pub connect_timeout: Duration,

    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            host_limits: HostLimits::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("isocatalog/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = clamp_permits(max);
        self
    }

    pub fn with_host_limit(mut self, host: impl Into<String>, limit: usize) -> Self {
        self.host_limits.insert(host, limit);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Backoff before retry number `attempt` (zero-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(self.retry_max_delay)
    }
}
