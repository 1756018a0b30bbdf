//! Diff engine: compares the mirror with a fresh remote snapshot.

use crate::client::RemoteClient;
use crate::compare::{ComparisonTool, DiffCommand, Pager, PagerCommand};
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::pull::PullEngine;
use crate::result::{DiffResult, PullResult};
use roundtrip_mirror::{ContentFormatter, MirrorError, Verbatim};
use roundtrip_protocol::PageId;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Pulls a snapshot into a scratch directory and compares the local mirror
/// against it.
///
/// The scratch directory lives only for the duration of one call.
pub struct DiffEngine<C: RemoteClient> {
    client: Arc<C>,
    config: SyncConfig,
    local_dir: PathBuf,
    formatter: Arc<dyn ContentFormatter>,
    comparison: Box<dyn ComparisonTool>,
    pager: Box<dyn Pager>,
}

impl<C: RemoteClient> DiffEngine<C> {
    /// Creates an engine comparing the mirror rooted at `local_dir`.
    pub fn new(client: Arc<C>, local_dir: impl Into<PathBuf>, config: &SyncConfig) -> Self {
        Self {
            client,
            local_dir: local_dir.into(),
            formatter: Arc::new(Verbatim),
            comparison: Box::new(DiffCommand::trees(config.diff_timeout)),
            pager: Box::new(PagerCommand::from_env()),
            config: config.clone(),
        }
    }

    /// Sets the formatter used for the snapshot. Must match the one used on pull.
    pub fn with_formatter(mut self, formatter: Arc<dyn ContentFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Sets the comparison tool.
    pub fn with_comparison_tool(mut self, tool: impl ComparisonTool + 'static) -> Self {
        self.comparison = Box::new(tool);
        self
    }

    /// Sets the pager.
    pub fn with_pager(mut self, pager: impl Pager + 'static) -> Self {
        self.pager = Box::new(pager);
        self
    }

    /// Compares a page (and, if `recursive`, its descendants).
    pub fn diff_page(&self, id: PageId, recursive: bool) -> SyncResult<DiffResult> {
        info!(page_id = id, "pulling latest content");
        self.run(|pull| pull.pull_page(id, recursive))
    }

    /// Compares a whole space.
    pub fn diff_space(&self, space_key: &str) -> SyncResult<DiffResult> {
        info!(space = space_key, "pulling latest content");
        self.run(|pull| pull.pull_space(space_key))
    }

    fn run(&self, pull: impl FnOnce(&PullEngine<C>) -> PullResult) -> SyncResult<DiffResult> {
        let scratch = tempfile::tempdir().map_err(|source| MirrorError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let mut result = DiffResult::default();

        let engine = PullEngine::new(Arc::clone(&self.client), scratch.path(), &self.config)
            .with_formatter(Arc::clone(&self.formatter));
        let pulled = pull(&engine);
        for e in pulled.errors {
            warn!("{e}");
            result.errors.push(e);
        }

        match self.comparison.compare(&self.local_dir, scratch.path()) {
            Ok(comparison) if !comparison.has_differences => {
                info!("No differences found");
            }
            Ok(comparison) => {
                result.has_differences = true;
                if let Err(e) = self.pager.page(&comparison.output) {
                    warn!(error = %e, "pager failed, printing diff directly");
                    let mut stdout = std::io::stdout().lock();
                    if let Err(e) = stdout.write_all(comparison.output.as_bytes()) {
                        warn!(error = %e, "could not write diff");
                    }
                }
            }
            Err(e) => {
                error!("{e}");
                result.errors.push(e.to_string());
            }
        }

        Ok(result)
    }
}
