//! Pull engine: materializes the remote tree in the local mirror.

use crate::client::RemoteClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::result::PullResult;
use crate::walker::TreeWalker;
use roundtrip_mirror::{
    build_page_path, is_attachment_up_to_date, is_page_up_to_date, ContentFormatter, PageDir,
    Verbatim,
};
use roundtrip_protocol::{Attachment, PageId, PageNode, SpaceInfo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pulls pages and attachments into a mirror root.
pub struct PullEngine<C: RemoteClient> {
    client: Arc<C>,
    walker: TreeWalker<C>,
    output_dir: PathBuf,
    dry_run: bool,
    formatter: Arc<dyn ContentFormatter>,
}

impl<C: RemoteClient> PullEngine<C> {
    /// Creates an engine writing below `output_dir`.
    pub fn new(client: Arc<C>, output_dir: impl Into<PathBuf>, config: &SyncConfig) -> Self {
        Self {
            walker: TreeWalker::new(Arc::clone(&client), config),
            client,
            output_dir: output_dir.into(),
            dry_run: false,
            formatter: Arc::new(Verbatim),
        }
    }

    /// Runs detection only: counters move, nothing is written or downloaded.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the formatter applied to page content before it is written.
    pub fn with_formatter(mut self, formatter: Arc<dyn ContentFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Returns the mirror root.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the content formatter.
    pub fn formatter(&self) -> &dyn ContentFormatter {
        self.formatter.as_ref()
    }

    /// Pulls the homepage of a space and everything below it.
    ///
    /// A space without a homepage yields an empty result.
    pub fn pull_space(&self, space_key: &str) -> PullResult {
        info!(space = space_key, "pulling space");

        let space = match self
            .client
            .get_space(space_key)
            .and_then(|value| SpaceInfo::from_value(&value).map_err(SyncError::from))
        {
            Ok(space) => space,
            Err(e) => {
                warn!(space = space_key, error = %e, "failed to fetch space");
                return PullResult {
                    errors: vec![format!("Failed to pull space {space_key}: {e}")],
                    ..PullResult::default()
                };
            }
        };

        match space.homepage_id {
            Some(homepage) => self.pull_page(homepage, true),
            None => {
                warn!(space = space_key, "space has no homepage");
                PullResult::default()
            }
        }
    }

    /// Pulls one page and, if `recursive`, all of its descendants.
    ///
    /// Descendants are pulled one by one in the order the search returns them;
    /// a failing page is recorded and the run continues.
    pub fn pull_page(&self, id: PageId, recursive: bool) -> PullResult {
        let mut result = PullResult::default();
        self.walker.clear_cache();

        if let Err(e) = self.pull_one(id, &mut result) {
            warn!(page_id = id, error = %e, "failed to pull page");
            result.errors.push(format!("Failed to pull page {id}: {e}"));
            return result;
        }

        if recursive {
            match self.walker.fetch_descendant_ids(id) {
                Ok(descendants) => {
                    info!(page_id = id, count = descendants.len(), "pulling descendants");
                    for descendant in descendants {
                        if let Err(e) = self.pull_one(descendant, &mut result) {
                            warn!(page_id = descendant, error = %e, "failed to pull page");
                            result
                                .errors
                                .push(format!("Failed to pull page {descendant}: {e}"));
                        }
                    }
                }
                Err(e) => {
                    warn!(page_id = id, error = %e, "failed to list descendants");
                    result
                        .errors
                        .push(format!("Failed to list descendants of page {id}: {e}"));
                }
            }
        }

        result
    }

    /// Re-fetches a page and rewrites its artifacts in an existing directory.
    pub fn refresh_page(&self, id: PageId, dir: &PageDir) -> SyncResult<PageNode> {
        let node = self.walker.fetch_page(id)?;
        dir.write_page(&self.formatter.format(&node.body_storage), &node.raw)?;
        debug!(
            page_id = id,
            version = node.version_number(),
            path = %dir.path().display(),
            "refreshed page"
        );
        Ok(node)
    }

    fn pull_one(&self, id: PageId, result: &mut PullResult) -> SyncResult<()> {
        let node = self.walker.fetch_page(id)?;
        let titles = self.walker.ancestor_titles(&node);
        let dir = PageDir::new(build_page_path(
            &self.output_dir,
            &node.space_key,
            &titles,
            &node.title,
        ));

        let existing = dir.load_metadata().unwrap_or_else(|e| {
            warn!(path = %dir.path().display(), error = %e, "ignoring unreadable metadata");
            None
        });

        if is_page_up_to_date(existing.as_ref(), &node) {
            debug!(page_id = id, version = node.version_number(), "page up to date");
            result.pages_skipped += 1;
        } else {
            if self.dry_run {
                info!(title = %node.title, "WOULD DOWNLOAD");
            } else {
                dir.write_page(&self.formatter.format(&node.body_storage), &node.raw)?;
                info!(title = %node.title, version = node.version_number(), "downloaded");
            }
            result.pages_downloaded += 1;
        }

        self.pull_attachments(&node, &dir, result);
        Ok(())
    }

    fn pull_attachments(&self, node: &PageNode, dir: &PageDir, result: &mut PullResult) {
        let attachments = match self.walker.fetch_attachments(node.id) {
            Ok(attachments) => attachments,
            Err(e) => {
                warn!(page_id = node.id, error = %e, "failed to list attachments");
                result.errors.push(format!(
                    "Failed to list attachments of page {}: {e}",
                    node.id
                ));
                return;
            }
        };

        for attachment in attachments {
            match self.pull_attachment(&attachment, dir) {
                Ok(true) => result.attachments_downloaded += 1,
                Ok(false) => result.attachments_skipped += 1,
                Err(e) => {
                    warn!(attachment = %attachment.title, error = %e, "failed to pull attachment");
                    result.errors.push(format!(
                        "Failed to pull attachment {}: {e}",
                        attachment.title
                    ));
                }
            }
        }
    }

    /// Returns whether the attachment was (or would be) downloaded.
    fn pull_attachment(&self, attachment: &Attachment, dir: &PageDir) -> SyncResult<bool> {
        let file = dir.attachment(&attachment.title);
        let recorded = file.recorded_size().unwrap_or_else(|e| {
            warn!(
                path = %file.path().display(),
                error = %e,
                "ignoring unreadable attachment metadata"
            );
            None
        });

        if is_attachment_up_to_date(recorded, attachment.file_size) {
            debug!(attachment = %attachment.title, "attachment up to date");
            return Ok(false);
        }

        if self.dry_run {
            info!(attachment = %attachment.title, "WOULD DOWNLOAD");
            return Ok(true);
        }

        if attachment.download_link.is_empty() {
            return Err(SyncError::Validation(format!(
                "attachment {} has no download link",
                attachment.title
            )));
        }

        let bytes = self.client.download_attachment(&attachment.download_link)?;
        file.write(&bytes, &attachment.raw)?;
        info!(attachment = %attachment.title, bytes = bytes.len(), "downloaded attachment");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockClient;
    use serde_json::json;
    use tempfile::tempdir;

    fn page(id: u64, title: &str, ancestors: &[u64], version: u64) -> serde_json::Value {
        let ancestors: Vec<_> = ancestors.iter().map(|a| json!({"id": a.to_string()})).collect();
        json!({
            "id": id.to_string(),
            "title": title,
            "space": {"key": "SPACE"},
            "body": {"storage": {"value": format!("<p>{title}</p>")}},
            "ancestors": ancestors,
            "version": {"number": version},
        })
    }

    #[test]
    fn writes_page_below_ancestors() {
        let dir = tempdir().unwrap();
        let client = Arc::new(MockClient::new());
        client.add_page(page(100, "Parent", &[], 1));
        client.add_page(page(1, "Child", &[100], 2));

        let engine = PullEngine::new(Arc::clone(&client), dir.path(), &SyncConfig::default());
        let result = engine.pull_page(1, false);

        assert!(result.is_success());
        assert_eq!(result.pages_downloaded, 1);
        let page_dir = PageDir::new(dir.path().join("SPACE").join("Parent").join("Child"));
        assert_eq!(page_dir.read_content().unwrap(), "<p>Child</p>");
        assert_eq!(page_dir.read_metadata().unwrap().version_number(), 2);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempdir().unwrap();
        let client = Arc::new(MockClient::new());
        client.add_page(page(1, "Home", &[], 1));
        client.push_attachments(
            1,
            json!({"results": [{
                "id": "att1",
                "title": "a.bin",
                "extensions": {"fileSize": 3},
                "_links": {"download": "/download/a.bin"},
            }]}),
        );
        client.add_download("/download/a.bin", b"abc".to_vec());

        let engine = PullEngine::new(Arc::clone(&client), dir.path(), &SyncConfig::default())
            .with_dry_run(true);
        let result = engine.pull_page(1, false);

        assert_eq!(result.pages_downloaded, 1);
        assert_eq!(result.attachments_downloaded, 1);
        assert!(!dir.path().join("SPACE").exists());
        assert_eq!(client.call_count("download_attachment"), 0);
    }

    #[test]
    fn failing_top_level_page_returns_early() {
        let dir = tempdir().unwrap();
        let client = Arc::new(MockClient::new());
        client.fail_page(1);
        client.push_descendants(1, json!({"results": [{"id": "2"}]}));

        let engine = PullEngine::new(Arc::clone(&client), dir.path(), &SyncConfig::default());
        let result = engine.pull_page(1, true);

        assert_eq!(result.pages_downloaded, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Failed to pull page 1: "));
        assert_eq!(client.call_count("search_descendants"), 0);
    }

    #[test]
    fn failing_descendant_search_keeps_top_level_page() {
        let dir = tempdir().unwrap();
        let client = Arc::new(MockClient::new());
        client.add_page(page(1, "Home", &[], 1));
        client.fail_descendants(1);

        let engine = PullEngine::new(Arc::clone(&client), dir.path(), &SyncConfig::default());
        let result = engine.pull_page(1, true);

        assert_eq!(result.pages_downloaded, 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn space_without_homepage_is_empty() {
        let dir = tempdir().unwrap();
        let client = Arc::new(MockClient::new());
        client.add_space(json!({"key": "EMPTY", "name": "Empty"}));

        let engine = PullEngine::new(Arc::clone(&client), dir.path(), &SyncConfig::default());
        assert_eq!(engine.pull_space("EMPTY"), PullResult::default());

        let missing = engine.pull_space("NOPE");
        assert_eq!(missing.errors.len(), 1);
    }

    #[test]
    fn refresh_rewrites_in_place() {
        let dir = tempdir().unwrap();
        let client = Arc::new(MockClient::new());
        client.add_page(page(1, "Home", &[], 4));

        let engine = PullEngine::new(Arc::clone(&client), dir.path(), &SyncConfig::default());
        let target = PageDir::new(dir.path().join("anywhere"));
        let node = engine.refresh_page(1, &target).unwrap();

        assert_eq!(node.version_number(), 4);
        assert!(target.is_complete());
    }
}
