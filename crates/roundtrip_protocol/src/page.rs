//! Page payloads.

use crate::error::{ProtocolError, ProtocolResult};
use crate::lenient::{opt_u64, string_or_empty, u64_or_zero, Lenient};
use crate::PageId;
use serde::Deserialize;
use serde_json::Value;

/// A user reference as embedded in version metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    /// Account identifier.
    #[serde(deserialize_with = "string_or_empty")]
    pub account_id: String,
    /// Login name (server deployments).
    #[serde(deserialize_with = "string_or_empty")]
    pub username: String,
    /// Display name.
    #[serde(deserialize_with = "string_or_empty")]
    pub display_name: String,
    /// Public name.
    #[serde(deserialize_with = "string_or_empty")]
    pub public_name: String,
    /// Email address, when visible.
    #[serde(deserialize_with = "string_or_empty")]
    pub email: String,
}

/// Version metadata of a page or attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Version {
    /// Monotonic version counter.
    #[serde(deserialize_with = "u64_or_zero")]
    pub number: u64,
    /// Timestamp of the version.
    #[serde(deserialize_with = "string_or_empty")]
    pub when: String,
    /// Human friendly timestamp.
    #[serde(deserialize_with = "string_or_empty")]
    pub friendly_when: String,
    /// Author of the version.
    pub by: User,
}

/// A label attached to a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Label {
    /// Label identifier.
    #[serde(deserialize_with = "string_or_empty")]
    pub id: String,
    /// Label name.
    #[serde(deserialize_with = "string_or_empty")]
    pub name: String,
    /// Label prefix (`global`, `my`, ...).
    #[serde(deserialize_with = "string_or_empty")]
    pub prefix: String,
}

/// Wire shape of a page. Only the fields the mirror uses are named.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PagePayload {
    id: Option<Lenient>,
    #[serde(deserialize_with = "string_or_empty")]
    title: String,
    space: Option<KeyRef>,
    body: Option<Body>,
    ancestors: Vec<IdRef>,
    version: Option<Version>,
    metadata: Option<Metadata>,
    #[serde(rename = "_expandable")]
    expandable: Option<Expandable>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeyRef {
    #[serde(deserialize_with = "string_or_empty")]
    key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IdRef {
    #[serde(deserialize_with = "opt_u64")]
    id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Body {
    storage: Option<Storage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Storage {
    #[serde(deserialize_with = "string_or_empty")]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metadata {
    labels: Option<Labels>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Labels {
    results: Vec<Label>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Expandable {
    #[serde(deserialize_with = "string_or_empty")]
    space: String,
}

/// Snapshot of a remote page at fetch time.
///
/// Superseded by re-fetching; never mutated after conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct PageNode {
    /// Page identity.
    pub id: PageId,
    /// Page title.
    pub title: String,
    /// Key of the owning space.
    pub space_key: String,
    /// Body in the canonical storage format.
    pub body_storage: String,
    /// Ancestor ids, root first, immediate parent last.
    pub ancestors: Vec<PageId>,
    /// Version metadata.
    pub version: Version,
    /// Labels on the page.
    pub labels: Vec<Label>,
    /// The raw payload this node was built from.
    pub raw: Value,
}

impl PageNode {
    const ENTITY: &'static str = "page";

    /// Converts a raw page payload.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not an object or carries no numeric `id`.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        if !value.is_object() {
            return Err(ProtocolError::NotAnObject {
                entity: Self::ENTITY,
            });
        }

        let payload = PagePayload::deserialize(value)
            .map_err(|e| ProtocolError::malformed(Self::ENTITY, e))?;
        let id = payload
            .id
            .as_ref()
            .ok_or(ProtocolError::MissingField {
                entity: Self::ENTITY,
                field: "id",
            })?
            .as_u64()
            .ok_or_else(|| ProtocolError::InvalidField {
                entity: Self::ENTITY,
                field: "id",
                value: value.get("id").map(Value::to_string).unwrap_or_default(),
            })?;

        let space_key = match payload.space {
            Some(space) if !space.key.is_empty() => space.key,
            // `/rest/api/space/KEY` when the space was not expanded.
            _ => payload
                .expandable
                .map(|links| links.space)
                .unwrap_or_default()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
        };

        Ok(Self {
            id,
            title: payload.title,
            space_key,
            body_storage: payload
                .body
                .and_then(|body| body.storage)
                .map(|storage| storage.value)
                .unwrap_or_default(),
            ancestors: payload.ancestors.iter().filter_map(|a| a.id).collect(),
            version: payload.version.unwrap_or_default(),
            labels: payload
                .metadata
                .and_then(|metadata| metadata.labels)
                .map(|labels| labels.results)
                .unwrap_or_default(),
            raw: value.clone(),
        })
    }

    /// Returns the version counter.
    pub fn version_number(&self) -> u64 {
        self.version.number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_from_full_payload() {
        let data = json!({
            "id": "12345",
            "title": "My Page",
            "space": {"key": "SPACE"},
            "body": {"storage": {"value": "<p>Storage content</p>"}},
            "metadata": {"labels": {"results": [{"id": "1", "name": "tag1", "prefix": "global"}]}},
            "ancestors": [{"id": "100"}, {"id": "200"}],
            "version": {"number": 3, "by": {"displayName": "Jo"}},
        });

        let page = PageNode::from_value(&data).unwrap();
        assert_eq!(page.id, 12345);
        assert_eq!(page.title, "My Page");
        assert_eq!(page.space_key, "SPACE");
        assert_eq!(page.body_storage, "<p>Storage content</p>");
        assert_eq!(page.ancestors, vec![100, 200]);
        assert_eq!(page.version_number(), 3);
        assert_eq!(page.version.by.display_name, "Jo");
        assert_eq!(page.labels.len(), 1);
        assert_eq!(page.labels[0].name, "tag1");
        assert_eq!(page.raw, data);
    }

    #[test]
    fn space_key_from_expandable_link() {
        let data = json!({
            "id": 12345,
            "title": "Page",
            "_expandable": {"space": "/rest/api/space/MYSPACE"},
        });
        let page = PageNode::from_value(&data).unwrap();
        assert_eq!(page.space_key, "MYSPACE");
    }

    #[test]
    fn title_only_payload_defaults() {
        let page = PageNode::from_value(&json!({"id": "1", "title": "Root"})).unwrap();
        assert_eq!(page.title, "Root");
        assert_eq!(page.body_storage, "");
        assert_eq!(page.version, Version::default());
        assert!(page.ancestors.is_empty());
    }

    #[test]
    fn rejects_missing_or_bad_id() {
        assert_eq!(
            PageNode::from_value(&json!({"title": "x"})),
            Err(ProtocolError::MissingField {
                entity: "page",
                field: "id"
            })
        );
        assert!(matches!(
            PageNode::from_value(&json!({"id": "abc"})),
            Err(ProtocolError::InvalidField { .. })
        ));
        assert!(matches!(
            PageNode::from_value(&json!({"id": 1, "ancestors": "none"})),
            Err(ProtocolError::Malformed { .. })
        ));
        assert!(matches!(
            PageNode::from_value(&json!([1, 2])),
            Err(ProtocolError::NotAnObject { .. })
        ));
    }

    #[test]
    fn version_from_payload() {
        let version = Version::deserialize(&json!({
            "number": "5",
            "when": "2024-01-15T10:30:00Z",
            "friendlyWhen": "Jan 15, 2024",
            "by": {"username": "jdoe", "email": null},
        }))
        .unwrap();
        assert_eq!(version.number, 5);
        assert_eq!(version.friendly_when, "Jan 15, 2024");
        assert_eq!(version.by.username, "jdoe");
    }

    #[test]
    fn user_from_empty_payload() {
        let user = User::deserialize(&json!({})).unwrap();
        assert_eq!(user, User::default());
    }
}
