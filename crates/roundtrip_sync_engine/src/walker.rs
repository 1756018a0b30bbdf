//! Remote tree traversal.

use crate::client::RemoteClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use parking_lot::RwLock;
use roundtrip_protocol::{Attachment, PageId, PageNode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fields inlined when fetching a page for the mirror.
pub const PAGE_EXPAND: &str = "body.storage,ancestors,space,version,metadata.labels";

/// Fetches pages, descendants and attachments, paging transparently.
///
/// Ancestor titles are cached; call [`clear_cache`](Self::clear_cache) at the
/// start of each top-level operation.
pub struct TreeWalker<C: RemoteClient> {
    client: Arc<C>,
    descendant_limit: u32,
    attachment_limit: u32,
    titles: RwLock<HashMap<PageId, String>>,
}

impl<C: RemoteClient> TreeWalker<C> {
    /// Creates a walker over `client`.
    pub fn new(client: Arc<C>, config: &SyncConfig) -> Self {
        Self {
            client,
            descendant_limit: config.descendant_page_limit,
            attachment_limit: config.attachment_page_limit,
            titles: RwLock::new(HashMap::new()),
        }
    }

    /// Forgets cached ancestor titles.
    pub fn clear_cache(&self) {
        self.titles.write().clear();
    }

    /// Fetches a page with everything the mirror stores.
    pub fn fetch_page(&self, id: PageId) -> SyncResult<PageNode> {
        let value = self.client.get_page_by_id(id, PAGE_EXPAND)?;
        PageNode::from_value(&value)
            .map_err(|e| SyncError::remote_fatal(format!("unusable page payload: {e}")))
    }

    /// Collects the ids of every descendant of `id`.
    ///
    /// The search continues for as long as a response carries `_links.next`.
    pub fn fetch_descendant_ids(&self, id: PageId) -> SyncResult<Vec<PageId>> {
        let mut ids = Vec::new();
        let mut next: Option<String> = None;

        loop {
            let response = self
                .client
                .search_descendants(id, next.as_deref(), self.descendant_limit)?;

            for result in results(&response) {
                match PageNode::from_value(result) {
                    Ok(node) => ids.push(node.id),
                    Err(e) => warn!(page_id = id, error = %e, "ignoring search result"),
                }
            }

            next = response
                .pointer("/_links/next")
                .and_then(Value::as_str)
                .map(str::to_string);
            if next.is_none() {
                break;
            }
            debug!(page_id = id, found = ids.len(), "following descendant continuation");
        }

        Ok(ids)
    }

    /// Lists every attachment of `id`.
    ///
    /// Paging stops when a response reports fewer items than requested.
    pub fn fetch_attachments(&self, id: PageId) -> SyncResult<Vec<Attachment>> {
        let limit = self.attachment_limit;
        let mut attachments = Vec::new();
        let mut start = 0u32;

        loop {
            let response = self.client.list_attachments(id, start, limit)?;
            let results = results(&response);
            for result in results {
                match Attachment::from_value(result) {
                    Ok(attachment) => attachments.push(attachment),
                    Err(e) => warn!(page_id = id, error = %e, "ignoring attachment entry"),
                }
            }

            let size = response
                .get("size")
                .and_then(Value::as_u64)
                .unwrap_or(results.len() as u64);
            if size == 0 || size < u64::from(limit) {
                break;
            }
            start = start.saturating_add(u32::try_from(size).unwrap_or(u32::MAX));
        }

        debug!(page_id = id, count = attachments.len(), "listed attachments");
        Ok(attachments)
    }

    /// Resolves the titles of a page's ancestors, root first.
    ///
    /// A failed lookup yields the ancestor's id in place of its title.
    pub fn ancestor_titles(&self, node: &PageNode) -> Vec<String> {
        node.ancestors
            .iter()
            .map(|&ancestor| self.ancestor_title(ancestor))
            .collect()
    }

    fn ancestor_title(&self, id: PageId) -> String {
        if let Some(title) = self.titles.read().get(&id) {
            return title.clone();
        }

        let fetched = self
            .client
            .get_page_by_id(id, "")
            .and_then(|value| PageNode::from_value(&value).map_err(SyncError::from));
        match fetched {
            Ok(node) => {
                self.titles.write().insert(id, node.title.clone());
                node.title
            }
            Err(e) => {
                warn!(ancestor_id = id, error = %e, "could not resolve ancestor title");
                id.to_string()
            }
        }
    }
}

fn results(response: &Value) -> &[Value] {
    response
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockClient;
    use serde_json::json;

    fn walker(client: &Arc<MockClient>) -> TreeWalker<MockClient> {
        TreeWalker::new(Arc::clone(client), &SyncConfig::default())
    }

    #[test]
    fn descendants_follow_next_links() {
        let client = Arc::new(MockClient::new());
        client.push_descendants(
            1,
            json!({"results": [{"id": "2"}], "_links": {"next": "/search?cursor=a"}}),
        );
        client.push_descendants(1, json!({"results": [{"id": "3"}, {"id": "4"}]}));

        let ids = walker(&client).fetch_descendant_ids(1).unwrap();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(client.call_count("search_descendants"), 2);
    }

    #[test]
    fn attachments_stop_on_short_page() {
        let client = Arc::new(MockClient::new());
        let full: Vec<Value> = (0..50)
            .map(|i| json!({"id": format!("att{i}"), "title": format!("f{i}")}))
            .collect();
        client.push_attachments(1, json!({"results": full, "size": 50}));
        client.push_attachments(
            1,
            json!({"results": [{"id": "att50", "title": "last"}], "size": 1}),
        );

        let attachments = walker(&client).fetch_attachments(1).unwrap();
        assert_eq!(attachments.len(), 51);
        assert_eq!(client.call_count("list_attachments"), 2);
    }

    #[test]
    fn attachment_size_defaults_to_result_count() {
        let client = Arc::new(MockClient::new());
        client.push_attachments(1, json!({"results": [{"id": "a", "title": "a"}]}));

        let attachments = walker(&client).fetch_attachments(1).unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(client.call_count("list_attachments"), 1);
    }

    #[test]
    fn malformed_attachment_entry_is_skipped() {
        let client = Arc::new(MockClient::new());
        client.push_attachments(
            1,
            json!({"results": [
                {"id": "a", "title": "a.txt"},
                {"id": "b", "title": ["not", "a", "name"]},
                "garbage",
                {"id": "c", "title": "c.txt"},
            ]}),
        );

        let attachments = walker(&client).fetch_attachments(1).unwrap();
        let titles: Vec<&str> = attachments.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a.txt", "c.txt"]);
    }

    #[test]
    fn ancestor_titles_are_cached_and_fall_back_to_id() {
        let client = Arc::new(MockClient::new());
        client.add_page(json!({"id": "100", "title": "Parent"}));
        let node = PageNode::from_value(&json!({
            "id": "1",
            "title": "Child",
            "ancestors": [{"id": "100"}, {"id": "404"}],
        }))
        .unwrap();

        let walker = walker(&client);
        assert_eq!(walker.ancestor_titles(&node), vec!["Parent", "404"]);
        assert_eq!(walker.ancestor_titles(&node), vec!["Parent", "404"]);
        // Parent once, the failing ancestor twice.
        assert_eq!(client.call_count("get_page_by_id"), 3);

        walker.clear_cache();
        walker.ancestor_titles(&node);
        assert_eq!(client.call_count("get_page_by_id"), 5);
    }

    #[test]
    fn unusable_page_payload_is_remote_error() {
        let client = Arc::new(MockClient::new());
        // Stored under id 0, but the payload id does not parse.
        client.add_page(json!({"id": "abc"}));
        let err = walker(&client).fetch_page(0).unwrap_err();
        assert!(matches!(err, SyncError::RemoteFetch { .. }));
    }
}
