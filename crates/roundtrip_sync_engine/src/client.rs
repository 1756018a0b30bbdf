//! Remote client abstraction.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use roundtrip_protocol::PageId;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// The capability set the engines need from the remote API.
///
/// Payloads are returned raw; conversion into typed entities happens in
/// `roundtrip_protocol`. Authentication, retries and rate limiting are the
/// implementation's concern.
pub trait RemoteClient: Send + Sync {
    /// Fetches a page. `expand` is a comma separated list of fields to inline.
    fn get_page_by_id(&self, id: PageId, expand: &str) -> SyncResult<Value>;

    /// Fetches a space including its homepage reference.
    fn get_space(&self, key: &str) -> SyncResult<Value>;

    /// Runs one page of the descendant search below `id`.
    ///
    /// `next` is the continuation reference from the previous response's
    /// `_links.next`, passed back verbatim; `None` starts the search.
    fn search_descendants(&self, id: PageId, next: Option<&str>, limit: u32)
        -> SyncResult<Value>;

    /// Lists one page of attachments of a page.
    fn list_attachments(&self, id: PageId, start: u32, limit: u32) -> SyncResult<Value>;

    /// Downloads attachment bytes from a download link.
    fn download_attachment(&self, link: &str) -> SyncResult<Vec<u8>>;

    /// Replaces the body of an existing page, creating a new version.
    fn update_page(&self, update: &PageUpdate) -> SyncResult<Value>;

    /// Uploads a file as an attachment, creating or updating it by name.
    fn upload_attachment(&self, id: PageId, name: &str, path: &Path) -> SyncResult<Value>;

    /// Checks connectivity and credentials.
    fn ping(&self) -> SyncResult<()>;
}

/// An update of an existing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUpdate {
    /// Page to update.
    pub id: PageId,
    /// Title (unchanged titles are sent as-is).
    pub title: String,
    /// New storage-format body.
    pub body: String,
    /// Version comment.
    pub version_comment: String,
}

/// An attachment upload recorded by [`MockClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Target page.
    pub page_id: PageId,
    /// Attachment name.
    pub name: String,
    /// Uploaded file.
    pub path: PathBuf,
}

#[derive(Debug, Default)]
struct MockState {
    pages: HashMap<PageId, Value>,
    failing_pages: HashSet<PageId>,
    failing_expansions: HashSet<(PageId, String)>,
    spaces: HashMap<String, Value>,
    descendants: HashMap<PageId, VecDeque<Value>>,
    failing_searches: HashSet<PageId>,
    attachments: HashMap<PageId, VecDeque<Value>>,
    downloads: HashMap<String, Vec<u8>>,
    failing_downloads: HashSet<String>,
    updates: Vec<PageUpdate>,
    uploads: Vec<RecordedUpload>,
    calls: HashMap<&'static str, usize>,
    offline: bool,
}

/// A scripted in-memory remote for testing.
///
/// Pages are stored as raw payloads; an update bumps the stored version and
/// replaces the body, like the real server. Descendant and attachment listing
/// responses are queued per page and consumed in order.
#[derive(Debug, Default)]
pub struct MockClient {
    state: Mutex<MockState>,
}

impl MockClient {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a page payload under its `id`.
    pub fn add_page(&self, page: Value) {
        let id = page
            .get("id")
            .and_then(|id| match id {
                Value::String(s) => s.parse().ok(),
                other => other.as_u64(),
            })
            .unwrap_or_default();
        self.state.lock().pages.insert(id, page);
    }

    /// Makes every fetch of a page fail.
    pub fn fail_page(&self, id: PageId) {
        self.state.lock().failing_pages.insert(id);
    }

    /// Makes fetches of a page fail only when requested with exactly this
    /// `expand` value.
    pub fn fail_page_expansion(&self, id: PageId, expand: impl Into<String>) {
        self.state
            .lock()
            .failing_expansions
            .insert((id, expand.into()));
    }

    /// Stores a space payload under its `key`.
    pub fn add_space(&self, space: Value) {
        let key = space
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.state.lock().spaces.insert(key, space);
    }

    /// Queues a descendant search response for a page.
    pub fn push_descendants(&self, id: PageId, response: Value) {
        self.state
            .lock()
            .descendants
            .entry(id)
            .or_default()
            .push_back(response);
    }

    /// Makes the descendant search below a page fail.
    pub fn fail_descendants(&self, id: PageId) {
        self.state.lock().failing_searches.insert(id);
    }

    /// Queues an attachment listing response for a page.
    pub fn push_attachments(&self, id: PageId, response: Value) {
        self.state
            .lock()
            .attachments
            .entry(id)
            .or_default()
            .push_back(response);
    }

    /// Serves bytes for a download link.
    pub fn add_download(&self, link: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.state.lock().downloads.insert(link.into(), bytes.into());
    }

    /// Makes downloads of a link fail.
    pub fn fail_download(&self, link: impl Into<String>) {
        self.state.lock().failing_downloads.insert(link.into());
    }

    /// Makes every call fail as if the server were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Returns the stored payload of a page.
    pub fn page(&self, id: PageId) -> Option<Value> {
        self.state.lock().pages.get(&id).cloned()
    }

    /// Returns the updates received so far.
    pub fn updates(&self) -> Vec<PageUpdate> {
        self.state.lock().updates.clone()
    }

    /// Returns the uploads received so far.
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().uploads.clone()
    }

    /// Returns how many times a capability was invoked, by method name.
    pub fn call_count(&self, method: &str) -> usize {
        self.state.lock().calls.get(method).copied().unwrap_or(0)
    }

    fn enter(&self, method: &'static str) -> SyncResult<parking_lot::MutexGuard<'_, MockState>> {
        let mut state = self.state.lock();
        *state.calls.entry(method).or_insert(0) += 1;
        if state.offline {
            return Err(SyncError::remote_retryable("connection refused"));
        }
        Ok(state)
    }
}

impl RemoteClient for MockClient {
    fn get_page_by_id(&self, id: PageId, expand: &str) -> SyncResult<Value> {
        let state = self.enter("get_page_by_id")?;
        if state.failing_pages.contains(&id)
            || state.failing_expansions.contains(&(id, expand.to_string()))
        {
            return Err(SyncError::remote_fatal(format!("page {id} could not be fetched")));
        }
        state
            .pages
            .get(&id)
            .cloned()
            .ok_or_else(|| SyncError::remote_fatal(format!("page {id} not found")))
    }

    fn get_space(&self, key: &str) -> SyncResult<Value> {
        let state = self.enter("get_space")?;
        state
            .spaces
            .get(key)
            .cloned()
            .ok_or_else(|| SyncError::remote_fatal(format!("space {key} not found")))
    }

    fn search_descendants(
        &self,
        id: PageId,
        _next: Option<&str>,
        _limit: u32,
    ) -> SyncResult<Value> {
        let mut state = self.enter("search_descendants")?;
        if state.failing_searches.contains(&id) {
            return Err(SyncError::remote_fatal(format!("search below {id} failed")));
        }
        Ok(state
            .descendants
            .get_mut(&id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| json!({ "results": [] })))
    }

    fn list_attachments(&self, id: PageId, _start: u32, _limit: u32) -> SyncResult<Value> {
        let mut state = self.enter("list_attachments")?;
        Ok(state
            .attachments
            .get_mut(&id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| json!({ "results": [], "size": 0 })))
    }

    fn download_attachment(&self, link: &str) -> SyncResult<Vec<u8>> {
        let state = self.enter("download_attachment")?;
        if state.failing_downloads.contains(link) {
            return Err(SyncError::remote_retryable(format!("download {link} timed out")));
        }
        state
            .downloads
            .get(link)
            .cloned()
            .ok_or_else(|| SyncError::remote_fatal(format!("download {link} not found")))
    }

    fn update_page(&self, update: &PageUpdate) -> SyncResult<Value> {
        let mut state = self.enter("update_page")?;
        if state.failing_pages.contains(&update.id) {
            return Err(SyncError::remote_fatal(format!(
                "page {} could not be updated",
                update.id
            )));
        }
        state.updates.push(update.clone());

        let page = state
            .pages
            .get_mut(&update.id)
            .ok_or_else(|| SyncError::remote_fatal(format!("page {} not found", update.id)))?;
        let version = page
            .pointer("/version/number")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        page["title"] = json!(update.title);
        page["body"] = json!({ "storage": { "value": update.body, "representation": "storage" } });
        page["version"] = json!({ "number": version + 1, "message": update.version_comment });
        Ok(page.clone())
    }

    fn upload_attachment(&self, id: PageId, name: &str, path: &Path) -> SyncResult<Value> {
        let mut state = self.enter("upload_attachment")?;
        let size = std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| SyncError::remote_fatal(format!("cannot read {}: {e}", path.display())))?;
        state.uploads.push(RecordedUpload {
            page_id: id,
            name: name.to_string(),
            path: path.to_path_buf(),
        });
        Ok(json!({
            "results": [{
                "title": name,
                "extensions": { "fileSize": size },
            }],
            "size": 1,
        }))
    }

    fn ping(&self) -> SyncResult<()> {
        self.enter("ping").map(|_| ())
    }
}
