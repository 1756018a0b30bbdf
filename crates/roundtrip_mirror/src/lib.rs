//! # Roundtrip Mirror
//!
//! The local mirror is the only durable state of roundtrip. This crate owns its
//! file system layout:
//!
//! ```text
//! <root>/
//! └─ <spaceKey>/
//!    └─ <ancestor>/.../<title>/
//!       ├─ page.xml          # storage-format content
//!       ├─ page.json         # full metadata snapshot
//!       └─ attachments/
//!          ├─ <name>
//!          └─ <name>.json    # at least {"extensions":{"fileSize": n}}
//! ```
//!
//! Every path segment is sanitized independently (see [`sanitize_filename`]).
//!
//! ## Change detection
//!
//! - A page is up to date when its stored version number equals the remote one.
//! - An attachment is up to date when its recorded size equals the remote size.
//!
//! Both rules are cheap heuristics: content is never byte-compared on pull.
//!
//! ## Durability
//!
//! Writes are atomic per artifact only. Content is written before metadata, so
//! an interrupted write can leave content newer than its metadata, never the
//! reverse.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod content;
mod error;
mod layout;
mod sanitize;
mod walk;

pub use content::{content_hash, ContentFormatter, Verbatim};
pub use error::{MirrorError, MirrorResult};
pub use layout::{
    build_page_path, is_attachment_up_to_date, is_page_up_to_date, save_file, save_json,
    AttachmentFile, PageDir, ATTACHMENTS_DIR, CONTENT_FILE, METADATA_FILE, METADATA_SUFFIX,
};
pub use sanitize::sanitize_filename;
pub use walk::{find_page_dirs, not_attachments};
