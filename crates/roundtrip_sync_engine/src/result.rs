//! Outcome summaries of pull, push and diff runs.
//!
//! A result is created fresh per top-level invocation and handed back to the
//! caller. Per-item failures are recorded here instead of aborting the run.

/// Summary of a pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullResult {
    /// Pages written (or that would be written in a dry run).
    pub pages_downloaded: u64,
    /// Pages already up to date.
    pub pages_skipped: u64,
    /// Attachments written (or that would be written in a dry run).
    pub attachments_downloaded: u64,
    /// Attachments already up to date.
    pub attachments_skipped: u64,
    /// Failures, in the order they happened.
    pub errors: Vec<String>,
}

impl PullResult {
    /// Returns true if nothing failed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Summary of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushResult {
    /// Pages updated on the server.
    pub pages_updated: u64,
    /// Pages created on the server. Creation is not supported, so always 0.
    pub pages_created: u64,
    /// Pages unchanged or declined during review.
    pub pages_skipped: u64,
    /// Attachments uploaded.
    pub attachments_uploaded: u64,
    /// Attachments unchanged since the last pull or push.
    pub attachments_skipped: u64,
    /// Version conflicts that kept a page from being pushed.
    pub conflicts: Vec<String>,
    /// Failures, in the order they happened.
    pub errors: Vec<String>,
}

impl PushResult {
    /// Returns true if nothing failed and nothing conflicted.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.conflicts.is_empty()
    }
}

/// Summary of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Whether the comparison found differences.
    pub has_differences: bool,
    /// Failures of the snapshot pull and of the comparison itself.
    pub errors: Vec<String>,
}

impl DiffResult {
    /// Returns true if nothing failed. Differences are not failures.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
