//! Attachment payloads.

use crate::error::{ProtocolError, ProtocolResult};
use crate::lenient::{opt_u64, string_or_empty, u64_or_zero};
use crate::page::Version;
use serde::Deserialize;
use serde_json::{json, Value};

/// A file attached to a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Attachment identity (e.g. `att123`).
    pub id: String,
    /// Display name, also used as the local file name.
    pub title: String,
    /// Size in bytes as reported by the server.
    pub file_size: u64,
    /// Media type.
    pub media_type: String,
    /// Server-side file identifier.
    pub file_id: String,
    /// Download reference, relative to the API base.
    pub download_link: String,
    /// Optional free-text comment.
    pub comment: Option<String>,
    /// Version metadata.
    pub version: Version,
    /// The raw payload this attachment was built from.
    pub raw: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AttachmentPayload {
    #[serde(deserialize_with = "string_or_empty")]
    id: String,
    #[serde(deserialize_with = "string_or_empty")]
    title: String,
    extensions: Option<Extensions>,
    #[serde(rename = "_links")]
    links: Option<Links>,
    version: Option<Version>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Extensions {
    #[serde(deserialize_with = "u64_or_zero")]
    file_size: u64,
    #[serde(deserialize_with = "string_or_empty")]
    media_type: String,
    #[serde(deserialize_with = "string_or_empty")]
    file_id: String,
    comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Links {
    #[serde(deserialize_with = "string_or_empty")]
    download: String,
}

/// Local attachment metadata; only the recorded size matters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SizeRecord {
    extensions: Option<RecordedExtensions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RecordedExtensions {
    #[serde(deserialize_with = "opt_u64")]
    file_size: Option<u64>,
}

impl Attachment {
    const ENTITY: &'static str = "attachment";

    /// Converts a raw attachment payload.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not an object or a field has the wrong shape.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        if !value.is_object() {
            return Err(ProtocolError::NotAnObject {
                entity: Self::ENTITY,
            });
        }

        let payload = AttachmentPayload::deserialize(value)
            .map_err(|e| ProtocolError::malformed(Self::ENTITY, e))?;
        let extensions = payload.extensions.unwrap_or_default();

        Ok(Self {
            id: payload.id,
            title: payload.title,
            file_size: extensions.file_size,
            media_type: extensions.media_type,
            file_id: extensions.file_id,
            download_link: payload.links.map(|links| links.download).unwrap_or_default(),
            comment: extensions.comment.filter(|comment| !comment.is_empty()),
            version: payload.version.unwrap_or_default(),
            raw: value.clone(),
        })
    }
}

/// Reads the byte size recorded in a local attachment metadata document.
///
/// Returns `None` when the document carries no usable `extensions.fileSize`.
pub fn recorded_attachment_size(metadata: &Value) -> Option<u64> {
    SizeRecord::deserialize(metadata)
        .ok()?
        .extensions?
        .file_size
}

/// Builds the minimal metadata document recording an attachment's size.
pub fn attachment_size_record(size: u64) -> Value {
    json!({ "extensions": { "fileSize": size } })
}
