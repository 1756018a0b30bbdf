//! Diff command implementation.

use super::{connect, print_errors, sync_config};
use crate::commands::pull::PullTarget;
use crate::settings::Settings;
use roundtrip_sync_engine::DiffEngine;
use std::path::Path;

/// Runs the diff command.
pub fn run(
    settings: &Settings,
    target: &PullTarget,
    local: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = sync_config(settings);
    let remote = connect(settings, &config)?;
    let engine = DiffEngine::new(remote, local, &config);

    let result = match target {
        PullTarget::Space(key) => engine.diff_space(key)?,
        PullTarget::Page { id, recursive } => engine.diff_page(*id, *recursive)?,
    };

    print_errors("Errors", &result.errors);
    if !result.is_success() {
        println!("✗ Diff finished with errors");
        return Err("Diff failed".into());
    }
    if !result.has_differences {
        println!("✓ No differences");
    }
    Ok(())
}
