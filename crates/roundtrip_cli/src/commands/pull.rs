//! Pull command implementation.

use super::{connect, print_errors, sync_config};
use crate::settings::Settings;
use roundtrip_sync_engine::{PullEngine, PullResult};
use std::path::Path;

/// What to pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullTarget {
    /// A whole space, by key.
    Space(String),
    /// A page, and optionally its descendants.
    Page {
        /// Page id.
        id: u64,
        /// Include descendants.
        recursive: bool,
    },
}

/// Runs the pull command.
pub fn run(
    settings: &Settings,
    target: &PullTarget,
    output: &Path,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = sync_config(settings);
    let remote = connect(settings, &config)?;
    let engine = PullEngine::new(remote, output, &config).with_dry_run(dry_run);

    if dry_run {
        println!("Dry run: nothing will be written");
    }
    let result = match target {
        PullTarget::Space(key) => {
            println!("Pulling space {key} into {}", output.display());
            engine.pull_space(key)
        }
        PullTarget::Page { id, recursive } => {
            println!("Pulling page {id} into {}", output.display());
            engine.pull_page(*id, *recursive)
        }
    };

    print_summary(&result);
    if result.is_success() {
        println!("✓ Pull complete");
        Ok(())
    } else {
        println!("✗ Pull finished with errors");
        Err("Pull failed".into())
    }
}

fn print_summary(result: &PullResult) {
    println!();
    println!("Pages downloaded:       {}", result.pages_downloaded);
    println!("Pages skipped:          {}", result.pages_skipped);
    println!("Attachments downloaded: {}", result.attachments_downloaded);
    println!("Attachments skipped:    {}", result.attachments_skipped);
    print_errors("Errors", &result.errors);
}
