//! # Roundtrip Sync Engine
//!
//! Pull, push and diff between a remote page tree and the local mirror.
//!
//! This crate provides:
//! - A remote client abstraction with a REST adapter and a scripted mock
//! - Tree traversal with transparent pagination
//! - The pull engine (idempotent, version and size based change detection)
//! - The push engine with its version-conflict protocol
//! - The diff engine, backed by an external comparison tool and pager
//!
//! ## Architecture
//!
//! ```text
//! DiffEngine ──► PullEngine ──► TreeWalker ──► RemoteClient
//! PushEngine ──► PullEngine (refresh after update)
//!            └─► RemoteClient (version checks, updates, uploads)
//! ```
//!
//! ## Key Invariants
//!
//! - The server wins unless a push is forced
//! - A page is only updated when its trimmed content differs from the server's
//! - A conflict never updates the page; it is recorded and the run continues
//! - Per-page failures are recorded in the result, never abort a run
//! - Operations are sequential; there is no multi-page atomicity

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod compare;
mod config;
mod diff;
mod error;
mod http;
mod pull;
mod push;
mod result;
mod walker;

pub use client::{MockClient, PageUpdate, RecordedUpload, RemoteClient};
pub use compare::{
    classify_exit, Comparison, ComparisonTool, ComparisonToolError, DiffCommand, Pager,
    PagerCommand,
};
pub use config::{RetryConfig, SyncConfig};
pub use diff::DiffEngine;
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpError, RestClient};
pub use pull::PullEngine;
pub use push::{Confirmation, LogReviewer, PushEngine, PushReviewer};
pub use result::{DiffResult, PullResult, PushResult};
pub use walker::{TreeWalker, PAGE_EXPAND};
