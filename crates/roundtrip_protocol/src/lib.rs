//! # Roundtrip Protocol
//!
//! Typed views over the JSON payloads returned by the remote content API.
//!
//! The remote API hands back loosely shaped, dictionary-like documents. Every
//! payload is converted into a typed value exactly once, in this crate, so the
//! engines never poke at raw JSON:
//!
//! - [`PageNode`] - a page with its storage body, ancestor chain and version
//! - [`Attachment`] - a file attached to a page
//! - [`SpaceInfo`] - a space and its homepage reference
//!
//! Each type keeps the raw payload it was built from, because the local mirror
//! stores the full server snapshot next to the content.
//!
//! ## Defaults
//!
//! Payloads are decoded with serde. Missing or `null` fields become an empty
//! string or zero, and ids are accepted as numbers or numeric strings. Only
//! structural problems (a payload that is not an object, a field of the wrong
//! shape, a page without a usable id) are reported as [`ProtocolError`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attachment;
mod error;
mod lenient;
mod page;
mod space;

pub use attachment::{attachment_size_record, recorded_attachment_size, Attachment};
pub use error::{ProtocolError, ProtocolResult};
pub use page::{Label, PageNode, User, Version};
pub use space::SpaceInfo;

/// Numeric identity of a remote page.
pub type PageId = u64;
