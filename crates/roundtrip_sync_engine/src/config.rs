//! Configuration for the sync engines.

use std::time::Duration;

/// Configuration shared by pull, push and diff.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Page size of the descendant search.
    pub descendant_page_limit: u32,
    /// Page size of the attachment listing.
    pub attachment_page_limit: u32,
    /// Wall-clock limit for the external comparison tool.
    pub diff_timeout: Duration,
    /// Retry policy handed to the HTTP client that carries remote requests.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            descendant_page_limit: 100,
            attachment_page_limit: 50,
            diff_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the descendant search page size.
    pub fn with_descendant_page_limit(mut self, limit: u32) -> Self {
        self.descendant_page_limit = limit.max(1);
        self
    }

    /// Sets the attachment listing page size.
    pub fn with_attachment_page_limit(mut self, limit: u32) -> Self {
        self.attachment_page_limit = limit.max(1);
        self
    }

    /// Sets the comparison tool timeout.
    pub fn with_diff_timeout(mut self, timeout: Duration) -> Self {
        self.diff_timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
    /// HTTP status codes that are worth retrying.
    pub retry_status_codes: Vec<u16>,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: true,
            retry_status_codes: vec![413, 429, 502, 503, 504],
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
            retry_status_codes: Vec::new(),
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the retryable status codes.
    pub fn with_retry_status_codes(mut self, codes: impl Into<Vec<u16>>) -> Self {
        self.retry_status_codes = codes.into();
        self
    }

    /// Returns true if a response with this status should be retried.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // up to 25%
            let jitter = delay_secs * 0.25 * rand_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Cheap pseudo-random value in `[0, 1)` derived from the clock.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}
