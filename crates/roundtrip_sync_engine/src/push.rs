//! Push engine: sends local edits back to the remote.
//!
//! Each page goes through
//! `Load → CompareToServer → ConflictCheck → Confirm? → Update → RefreshLocal → PushAttachments`.
//! A page whose content matches the server is skipped outright, attachments
//! included. Pages are processed strictly in mirror pre-order, one at a time. A failure
//! is recorded against the page and the run moves on; only a reviewer abort
//! stops it.

use crate::client::{PageUpdate, RemoteClient};
use crate::compare::{ComparisonTool, DiffCommand};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::pull::PullEngine;
use crate::result::PushResult;
use roundtrip_mirror::{
    content_hash, find_page_dirs, not_attachments, save_file, AttachmentFile, ContentFormatter,
    MirrorError, PageDir,
};
use roundtrip_protocol::{attachment_size_record, PageId, PageNode};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer of a reviewer asked whether to update a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Update the page.
    Accept,
    /// Leave the page alone and continue.
    Skip,
    /// Stop the whole run.
    Abort,
}

/// Shows pending changes and asks for confirmation.
pub trait PushReviewer: Send + Sync {
    /// Shows the change about to be pushed for a page.
    fn show_diff(&self, title: &str, diff: &str);

    /// Asks whether to update a page.
    fn confirm(&self, title: &str) -> SyncResult<Confirmation>;
}

/// Reviewer that logs diffs and accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReviewer;

impl PushReviewer for LogReviewer {
    fn show_diff(&self, title: &str, diff: &str) {
        info!("Diff for: {title}");
        for line in diff.lines() {
            info!("{line}");
        }
    }

    fn confirm(&self, _title: &str) -> SyncResult<Confirmation> {
        Ok(Confirmation::Accept)
    }
}

/// Pushes local page directories to the remote.
pub struct PushEngine<C: RemoteClient> {
    client: Arc<C>,
    pull: PullEngine<C>,
    message: String,
    dry_run: bool,
    force: bool,
    interactive: bool,
    reviewer: Box<dyn PushReviewer>,
    comparison: Box<dyn ComparisonTool>,
}

impl<C: RemoteClient> PushEngine<C> {
    /// Creates an engine that records `message` as the version comment.
    pub fn new(client: Arc<C>, message: impl Into<String>, config: &SyncConfig) -> Self {
        Self {
            pull: PullEngine::new(Arc::clone(&client), ".", config),
            client,
            message: message.into(),
            dry_run: false,
            force: false,
            interactive: false,
            reviewer: Box::new(LogReviewer),
            comparison: Box::new(DiffCommand::files(config.diff_timeout)),
        }
    }

    /// Reports what would be pushed without changing anything remote.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Pushes even when the server has a newer version.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Asks the reviewer before each update.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Sets the reviewer that shows diffs and confirms updates.
    pub fn with_reviewer(mut self, reviewer: impl PushReviewer + 'static) -> Self {
        self.reviewer = Box::new(reviewer);
        self
    }

    /// Sets the tool used to render per-page diffs.
    pub fn with_comparison_tool(mut self, tool: impl ComparisonTool + 'static) -> Self {
        self.comparison = Box::new(tool);
        self
    }

    /// Sets the formatter applied to server content before comparison, and to
    /// refreshed content. Must match the one used on pull.
    pub fn with_formatter(mut self, formatter: Arc<dyn ContentFormatter>) -> Self {
        self.pull = self.pull.with_formatter(formatter);
        self
    }

    /// Pushes the page at `path` and, if `recursive`, every page below it.
    pub fn push_page(&self, path: &Path, recursive: bool) -> SyncResult<PushResult> {
        info!(path = %path.display(), recursive, "analyzing pages");
        let pages = if recursive {
            find_page_dirs(path, true, not_attachments)?
        } else {
            find_page_dirs(path, true, |_| false)?
        };
        if pages.first().map(PageDir::path) != Some(path) {
            warn!(path = %path.display(), "not a complete page directory");
        }
        self.push_all(&pages)
    }

    /// Pushes every page below a space directory.
    pub fn push_space(&self, path: &Path) -> SyncResult<PushResult> {
        info!(path = %path.display(), "analyzing space");
        let pages = find_page_dirs(path, false, not_attachments)?;
        self.push_all(&pages)
    }

    fn push_all(&self, pages: &[PageDir]) -> SyncResult<PushResult> {
        debug!(count = pages.len(), "page directories found");
        let mut result = PushResult::default();

        for dir in pages {
            match self.push_one(dir, &mut result) {
                Ok(()) => {}
                Err(SyncError::Aborted) => {
                    info!("quitting at user request");
                    return Err(SyncError::Aborted);
                }
                Err(e) => {
                    let message = format!("Failed to push {}: {e}", dir.path().display());
                    warn!("{message}");
                    result.errors.push(message);
                }
            }
        }

        Ok(result)
    }

    fn push_one(&self, dir: &PageDir, result: &mut PushResult) -> SyncResult<()> {
        let local = dir.read_content()?;
        let stored = dir.read_metadata()?;
        debug!(
            page_id = stored.id,
            title = %stored.title,
            hash = %content_hash(&local),
            "loaded local page"
        );

        let server = self.server_content(&stored);
        if local.trim() == server.trim() {
            debug!(title = %stored.title, "content unchanged");
            result.pages_skipped += 1;
            return Ok(());
        }

        let conflict = self.version_conflict(&stored);
        if let Some(conflict) = &conflict {
            if !self.force {
                warn!("{conflict}");
                result.conflicts.push(conflict.clone());
                return Ok(());
            }
        }

        let from = stored.version_number();
        if self.dry_run {
            let marker = if conflict.is_some() { " (force)" } else { "" };
            info!("WOULD UPDATE{marker}: {} (v{from} → v{})", stored.title, from + 1);
            self.show_diff(&stored.title, &server, &local);
        } else {
            if self.interactive {
                self.show_diff(&stored.title, &server, &local);
                match self.reviewer.confirm(&stored.title)? {
                    Confirmation::Accept => {}
                    Confirmation::Skip => {
                        info!(title = %stored.title, "skipped");
                        result.pages_skipped += 1;
                        return Ok(());
                    }
                    Confirmation::Abort => return Err(SyncError::Aborted),
                }
            }

            self.client.update_page(&PageUpdate {
                id: stored.id,
                title: stored.title.clone(),
                body: local.clone(),
                version_comment: self.message.clone(),
            })?;
            info!("Updated: {} (v{from} → v{})", stored.title, from + 1);
            result.pages_updated += 1;

            if let Err(e) = self.pull.refresh_page(stored.id, dir) {
                warn!(
                    path = %dir.path().display(),
                    error = %e,
                    "failed to refresh local page after push; pull it before the next push"
                );
            }
        }

        self.push_attachments(dir, stored.id, result)
    }

    /// Live body, formatted like pulled content. Falls back to the body stored
    /// in the metadata snapshot.
    fn server_content(&self, stored: &PageNode) -> String {
        let live = self
            .client
            .get_page_by_id(stored.id, "body.storage,version")
            .map(|page| {
                page.pointer("/body/storage/value")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            });
        match live {
            Ok(body) => self.pull.formatter().format(&body),
            Err(e) => {
                warn!(
                    page_id = stored.id,
                    error = %e,
                    "could not fetch server content, using stored content"
                );
                stored.body_storage.clone()
            }
        }
    }

    /// Describes a conflict if the server is ahead of the stored version.
    /// A failed check counts as no conflict.
    fn version_conflict(&self, stored: &PageNode) -> Option<String> {
        let server_version = match self.client.get_page_by_id(stored.id, "version") {
            Ok(page) => page
                .pointer("/version/number")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            Err(e) => {
                debug!(page_id = stored.id, error = %e, "could not check version");
                return None;
            }
        };

        let local_version = stored.version_number();
        debug!(page_id = stored.id, local_version, server_version, "version check");
        (server_version > local_version).then(|| {
            format!(
                "Conflict: {} - local version {local_version}, server version {server_version}",
                stored.title
            )
        })
    }

    fn show_diff(&self, title: &str, server: &str, local: &str) {
        match self.render_diff(server, local) {
            Ok(diff) if !diff.is_empty() => self.reviewer.show_diff(title, &diff),
            Ok(_) => {}
            Err(e) => warn!(title, error = %e, "could not render diff"),
        }
    }

    fn render_diff(&self, server: &str, local: &str) -> SyncResult<String> {
        let scratch = tempfile::tempdir().map_err(|source| MirrorError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let server_path = scratch.path().join("server");
        let local_path = scratch.path().join("local");
        save_file(&server_path, server.as_bytes())?;
        save_file(&local_path, local.as_bytes())?;
        Ok(self.comparison.compare(&server_path, &local_path)?.output)
    }

    fn push_attachments(
        &self,
        dir: &PageDir,
        page_id: PageId,
        result: &mut PushResult,
    ) -> SyncResult<()> {
        let files = dir.local_attachments()?;
        if !files.is_empty() {
            debug!(count = files.len(), path = %dir.path().display(), "analyzing attachments");
        }

        for file in files {
            if !file.needs_push()? {
                debug!(attachment = %file.name(), "attachment unchanged");
                result.attachments_skipped += 1;
                continue;
            }

            if self.dry_run {
                info!("WOULD UPLOAD: {}", file.name());
                continue;
            }

            let response = self
                .client
                .upload_attachment(page_id, &file.name(), file.path())?;
            file.write_metadata(&uploaded_record(&response, &file)?)?;
            info!("Uploaded: {}", file.name());
            result.attachments_uploaded += 1;
        }

        Ok(())
    }
}

/// Picks the attachment record out of an upload response, falling back to a
/// minimal size record.
fn uploaded_record(response: &Value, file: &AttachmentFile) -> SyncResult<Value> {
    let candidate = response.pointer("/results/0").unwrap_or(response);
    if candidate.pointer("/extensions/fileSize").is_some() {
        return Ok(candidate.clone());
    }
    Ok(attachment_size_record(file.current_size()?))
}
