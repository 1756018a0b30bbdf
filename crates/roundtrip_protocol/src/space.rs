//! Space payloads.

use crate::error::{ProtocolError, ProtocolResult};
use crate::lenient::{opt_u64, string_or_empty};
use crate::PageId;
use serde::Deserialize;
use serde_json::Value;

/// A space and the page its tree is anchored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceInfo {
    /// Space key.
    pub key: String,
    /// Space name.
    pub name: String,
    /// Plain-text description.
    pub description: String,
    /// Homepage id, if the space has one.
    pub homepage_id: Option<PageId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpacePayload {
    #[serde(deserialize_with = "string_or_empty")]
    key: String,
    #[serde(deserialize_with = "string_or_empty")]
    name: String,
    description: Option<Description>,
    homepage: Option<Homepage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Description {
    plain: Option<Plain>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Plain {
    #[serde(deserialize_with = "string_or_empty")]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Homepage {
    #[serde(deserialize_with = "opt_u64")]
    id: Option<PageId>,
}

impl SpaceInfo {
    /// Converts a raw space payload.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not an object or a field has the wrong shape.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        if !value.is_object() {
            return Err(ProtocolError::NotAnObject { entity: "space" });
        }

        let payload = SpacePayload::deserialize(value)
            .map_err(|e| ProtocolError::malformed("space", e))?;
        Ok(Self {
            key: payload.key,
            name: payload.name,
            description: payload
                .description
                .and_then(|description| description.plain)
                .map(|plain| plain.value)
                .unwrap_or_default(),
            homepage_id: payload.homepage.and_then(|homepage| homepage.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn space_with_homepage() {
        let space = SpaceInfo::from_value(&json!({
            "key": "SPACE",
            "name": "My Space",
            "description": {"plain": {"value": "Space description"}},
            "homepage": {"id": "12345"},
        }))
        .unwrap();
        assert_eq!(space.key, "SPACE");
        assert_eq!(space.description, "Space description");
        assert_eq!(space.homepage_id, Some(12345));
    }

    #[test]
    fn space_without_homepage() {
        let space = SpaceInfo::from_value(&json!({"key": "SPACE", "name": "My Space"})).unwrap();
        assert_eq!(space.homepage_id, None);
    }
}
