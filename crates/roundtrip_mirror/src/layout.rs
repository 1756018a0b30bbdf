//! Page and attachment records on disk.

use crate::error::{MirrorError, MirrorResult};
use crate::sanitize::sanitize_filename;
use roundtrip_protocol::{recorded_attachment_size, PageNode};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Content artifact of a page directory.
pub const CONTENT_FILE: &str = "page.xml";
/// Metadata artifact of a page directory.
pub const METADATA_FILE: &str = "page.json";
/// Subdirectory holding a page's attachments.
pub const ATTACHMENTS_DIR: &str = "attachments";
/// Suffix of an attachment's sibling metadata file.
pub const METADATA_SUFFIX: &str = ".json";

/// Builds `root/space/ancestor.../title`, sanitizing every segment.
///
/// `ancestor_titles` is ordered root first; the immediate parent becomes the
/// deepest directory.
pub fn build_page_path(
    root: &Path,
    space_key: &str,
    ancestor_titles: &[String],
    title: &str,
) -> PathBuf {
    let mut path = root.join(sanitize_filename(space_key));
    for ancestor in ancestor_titles {
        path.push(sanitize_filename(ancestor));
    }
    path.push(sanitize_filename(title));
    path
}

/// Returns true iff stored metadata exists and records the remote version.
///
/// Content is never compared, only the version counter.
pub fn is_page_up_to_date(existing: Option<&PageNode>, remote: &PageNode) -> bool {
    existing.is_some_and(|stored| stored.version_number() == remote.version_number())
}

/// Returns true iff a size was recorded and equals the remote size.
///
/// Same size does not guarantee same content; this trades accuracy for not
/// downloading every attachment on every pull.
pub fn is_attachment_up_to_date(existing_size: Option<u64>, remote_size: u64) -> bool {
    existing_size == Some(remote_size)
}

/// Writes bytes to `path`, creating parent directories.
pub fn save_file(path: &Path, bytes: &[u8]) -> MirrorResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MirrorError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| MirrorError::io(path, e))
}

/// Writes a JSON document with two-space indentation.
pub fn save_json(path: &Path, value: &Value) -> MirrorResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| MirrorError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    save_file(path, text.as_bytes())
}

fn read_json(path: &Path) -> MirrorResult<Value> {
    let text = fs::read_to_string(path).map_err(|e| MirrorError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| MirrorError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// A page directory in the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDir {
    path: PathBuf,
}

impl PageDir {
    /// Wraps an existing or future page directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of `page.xml`.
    #[must_use]
    pub fn content_path(&self) -> PathBuf {
        self.path.join(CONTENT_FILE)
    }

    /// Returns the path of `page.json`.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILE)
    }

    /// Returns the path of the attachments subdirectory.
    #[must_use]
    pub fn attachments_dir(&self) -> PathBuf {
        self.path.join(ATTACHMENTS_DIR)
    }

    /// Returns true if both artifacts exist. Only complete records are pushed.
    pub fn is_complete(&self) -> bool {
        self.content_path().is_file() && self.metadata_path().is_file()
    }

    /// Reads the content artifact.
    pub fn read_content(&self) -> MirrorResult<String> {
        let path = self.content_path();
        fs::read_to_string(&path).map_err(|e| MirrorError::io(path, e))
    }

    /// Reads and converts the metadata artifact.
    pub fn read_metadata(&self) -> MirrorResult<PageNode> {
        let path = self.metadata_path();
        let value = read_json(&path)?;
        PageNode::from_value(&value).map_err(|source| MirrorError::Metadata { path, source })
    }

    /// Like [`read_metadata`](Self::read_metadata), but a missing file is `None`.
    pub fn load_metadata(&self) -> MirrorResult<Option<PageNode>> {
        if !self.metadata_path().exists() {
            return Ok(None);
        }
        self.read_metadata().map(Some)
    }

    /// Writes both artifacts: content first, then metadata.
    pub fn write_page(&self, content: &str, metadata: &Value) -> MirrorResult<()> {
        save_file(&self.content_path(), content.as_bytes())?;
        save_json(&self.metadata_path(), metadata)
    }

    /// Returns the record for an attachment, sanitizing its name.
    #[must_use]
    pub fn attachment(&self, name: &str) -> AttachmentFile {
        AttachmentFile::new(self.attachments_dir().join(sanitize_filename(name)))
    }

    /// Lists local attachment files (metadata files excluded), sorted by name.
    ///
    /// A missing attachments directory yields an empty list.
    pub fn local_attachments(&self) -> MirrorResult<Vec<AttachmentFile>> {
        let dir = self.attachments_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MirrorError::io(dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MirrorError::io(&dir, e))?;
            let path = entry.path();
            let is_metadata = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(METADATA_SUFFIX));
            if path.is_file() && !is_metadata {
                files.push(path);
            }
        }
        files.sort();

        Ok(files.into_iter().map(AttachmentFile::new).collect())
    }
}

/// An attachment file and its sibling metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    path: PathBuf,
}

impl AttachmentFile {
    /// Wraps an attachment path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the attachment path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file name.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Returns `<name>.json` next to the attachment.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(METADATA_SUFFIX);
        PathBuf::from(name)
    }

    /// Reads the size recorded in the metadata file.
    ///
    /// `None` means no metadata file exists. A metadata file without a size
    /// records zero.
    pub fn recorded_size(&self) -> MirrorResult<Option<u64>> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(None);
        }
        let metadata = read_json(&path)?;
        Ok(Some(recorded_attachment_size(&metadata).unwrap_or(0)))
    }

    /// Returns the current size of the attachment file.
    pub fn current_size(&self) -> MirrorResult<u64> {
        fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| MirrorError::io(&self.path, e))
    }

    /// Returns true if the attachment is new or its size changed since the
    /// metadata was recorded.
    pub fn needs_push(&self) -> MirrorResult<bool> {
        match self.recorded_size()? {
            None => Ok(true),
            Some(recorded) => Ok(self.current_size()? != recorded),
        }
    }

    /// Writes the attachment bytes, then its metadata.
    pub fn write(&self, bytes: &[u8], metadata: &Value) -> MirrorResult<()> {
        save_file(&self.path, bytes)?;
        self.write_metadata(metadata)
    }

    /// Rewrites only the metadata file.
    pub fn write_metadata(&self, metadata: &Value) -> MirrorResult<()> {
        save_json(&self.metadata_path(), metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn node(version: u64) -> PageNode {
        PageNode::from_value(&json!({"id": "1", "title": "T", "version": {"number": version}}))
            .unwrap()
    }

    #[test]
    fn simple_path() {
        let root = Path::new("/mirror");
        assert_eq!(
            build_page_path(root, "SPACEKEY", &[], "My Page"),
            root.join("SPACEKEY").join("My Page")
        );
    }

    #[test]
    fn path_with_ancestors_is_sanitized() {
        let root = Path::new("/mirror");
        let path = build_page_path(
            root,
            "SPACE",
            &["Parent/Name".to_string(), "Child".to_string()],
            "Page:Title",
        );
        assert_eq!(
            path,
            root.join("SPACE")
                .join("Parent_Name")
                .join("Child")
                .join("Page_Title")
        );
    }

    #[test]
    fn page_up_to_date_compares_versions_only() {
        assert!(!is_page_up_to_date(None, &node(1)));
        assert!(is_page_up_to_date(Some(&node(2)), &node(2)));
        assert!(!is_page_up_to_date(Some(&node(1)), &node(2)));
    }

    #[test]
    fn attachment_up_to_date_compares_sizes() {
        assert!(is_attachment_up_to_date(Some(1024), 1024));
        assert!(!is_attachment_up_to_date(Some(1024), 2048));
        assert!(!is_attachment_up_to_date(None, 0));
    }

    #[test]
    fn write_and_read_page() {
        let dir = tempdir().unwrap();
        let page = PageDir::new(dir.path().join("SPACE").join("Page"));
        assert!(!page.is_complete());
        assert_eq!(page.load_metadata().unwrap(), None);

        let metadata = json!({"id": "7", "title": "Page", "version": {"number": 4}});
        page.write_page("<p>x</p>", &metadata).unwrap();

        assert!(page.is_complete());
        assert_eq!(page.read_content().unwrap(), "<p>x</p>");
        let stored = page.read_metadata().unwrap();
        assert_eq!(stored.id, 7);
        assert_eq!(stored.version_number(), 4);

        let text = fs::read_to_string(page.metadata_path()).unwrap();
        assert!(text.contains("\"title\": \"Page\""));
    }

    #[test]
    fn malformed_metadata_is_validation_error() {
        let dir = tempdir().unwrap();
        let page = PageDir::new(dir.path());
        save_file(&page.metadata_path(), b"{not json").unwrap();
        assert!(page.read_metadata().unwrap_err().is_validation());

        save_file(&page.metadata_path(), b"{\"title\": \"no id\"}").unwrap();
        assert!(page.read_metadata().unwrap_err().is_validation());
    }

    #[test]
    fn attachment_change_detection() {
        let dir = tempdir().unwrap();
        let page = PageDir::new(dir.path());
        let attachment = page.attachment("file.bin");
        save_file(attachment.path(), &[0u8; 1024]).unwrap();

        // No metadata: always pushed.
        assert!(attachment.needs_push().unwrap());

        attachment
            .write_metadata(&json!({"extensions": {"fileSize": 1024}}))
            .unwrap();
        assert!(!attachment.needs_push().unwrap());

        save_file(attachment.path(), &[0u8; 2048]).unwrap();
        assert!(attachment.needs_push().unwrap());
    }

    #[test]
    fn local_attachments_skip_metadata_files() {
        let dir = tempdir().unwrap();
        let page = PageDir::new(dir.path());
        assert!(page.local_attachments().unwrap().is_empty());

        page.attachment("b.png").write(b"png", &json!({})).unwrap();
        page.attachment("a.pdf").write(b"pdf", &json!({})).unwrap();

        let names: Vec<String> = page
            .local_attachments()
            .unwrap()
            .iter()
            .map(AttachmentFile::name)
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.png"]);
        assert!(page
            .attachment("a.pdf")
            .metadata_path()
            .ends_with("a.pdf.json"));
    }
}
