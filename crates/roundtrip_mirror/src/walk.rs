//! Discovery of page directories in the mirror.

use crate::error::{MirrorError, MirrorResult};
use crate::layout::{PageDir, ATTACHMENTS_DIR};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// Descent predicate that never enters `attachments/` directories.
pub fn not_attachments(dir: &Path) -> bool {
    dir.file_name().map_or(true, |name| name != ATTACHMENTS_DIR)
}

/// Lists the complete page directories under `root`, in pre-order.
///
/// Siblings are visited in file name order, so a parent always precedes its
/// children. `include_root` controls whether `root` itself may be returned;
/// `descend` decides which directories are entered at all. Directories that
/// are missing one of the two artifacts are skipped, but still searched.
pub fn find_page_dirs<F>(
    root: &Path,
    include_root: bool,
    mut descend: F,
) -> MirrorResult<Vec<PageDir>>
where
    F: FnMut(&Path) -> bool,
{
    let walker = WalkDir::new(root)
        .min_depth(if include_root { 0 } else { 1 })
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.file_type().is_dir() && (entry.depth() == 0 || descend(entry.path()))
        });

    let mut pages = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| MirrorError::Walk {
            path: root.to_path_buf(),
            source,
        })?;

        let dir = PageDir::new(entry.path());
        if dir.is_complete() {
            pages.push(dir);
        } else if dir.content_path().exists() || dir.metadata_path().exists() {
            warn!(path = %entry.path().display(), "skipping incomplete page directory");
        }
    }

    Ok(pages)
}
