//! Push command implementation.

use super::{connect, print_errors, sync_config};
use crate::settings::Settings;
use dialoguer::Input;
use roundtrip_sync_engine::{
    Confirmation, PushEngine, PushResult, PushReviewer, SyncError, SyncResult,
};
use std::path::Path;
use tracing::warn;

/// What to push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushTarget<'a> {
    /// A space directory; every page below it.
    Space(&'a Path),
    /// A page directory, and optionally its descendants.
    Page {
        /// Page directory.
        path: &'a Path,
        /// Include descendants.
        recursive: bool,
    },
}

/// Push flags.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Version message recorded on the server.
    pub message: String,
    /// Report without changing the server.
    pub dry_run: bool,
    /// Push even if the server has a newer version.
    pub force: bool,
    /// Ask before each page update.
    pub interactive: bool,
}

/// Reviewer that prints diffs and prompts on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalReviewer;

impl PushReviewer for TerminalReviewer {
    fn show_diff(&self, title: &str, diff: &str) {
        println!();
        println!("Diff for: {title}");
        println!("{diff}");
    }

    fn confirm(&self, title: &str) -> SyncResult<Confirmation> {
        let answer: String = match Input::new()
            .with_prompt(format!("Update '{title}'? [Y/n/q]"))
            .allow_empty(true)
            .interact_text()
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Failed to get user input: {e}");
                return Ok(Confirmation::Abort);
            }
        };
        Ok(parse_answer(&answer))
    }
}

/// Maps a prompt answer to a confirmation. Anything but `n` or `q` accepts.
pub fn parse_answer(answer: &str) -> Confirmation {
    match answer.trim().to_lowercase().as_str() {
        "n" | "no" => Confirmation::Skip,
        "q" | "quit" => Confirmation::Abort,
        _ => Confirmation::Accept,
    }
}

/// Runs the push command.
pub fn run(
    settings: &Settings,
    target: PushTarget<'_>,
    options: &PushOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = sync_config(settings);
    let remote = connect(settings, &config)?;
    let engine = PushEngine::new(remote, options.message.as_str(), &config)
        .with_dry_run(options.dry_run)
        .with_force(options.force)
        .with_interactive(options.interactive && !options.dry_run)
        .with_reviewer(TerminalReviewer);

    if options.dry_run {
        println!("Dry run: the server will not be changed");
    }
    let outcome = match target {
        PushTarget::Space(path) => {
            println!("Pushing space directory {}", path.display());
            engine.push_space(path)
        }
        PushTarget::Page { path, recursive } => {
            println!("Pushing page directory {}", path.display());
            engine.push_page(path, recursive)
        }
    };

    let result = match outcome {
        Ok(result) => result,
        Err(SyncError::Aborted) => {
            println!("Quitting at user request");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    print_summary(&result);
    if result.is_success() {
        println!("✓ Push complete");
        Ok(())
    } else {
        println!("✗ Push finished with conflicts or errors");
        Err("Push failed".into())
    }
}

fn print_summary(result: &PushResult) {
    println!();
    println!("Pages updated:        {}", result.pages_updated);
    println!("Pages created:        {}", result.pages_created);
    println!("Pages skipped:        {}", result.pages_skipped);
    println!("Attachments uploaded: {}", result.attachments_uploaded);
    println!("Attachments skipped:  {}", result.attachments_skipped);
    print_errors("Conflicts", &result.conflicts);
    print_errors("Errors", &result.errors);
    if !result.conflicts.is_empty() {
        println!();
        println!("Pull the conflicting pages, reapply your edits, or push with --force.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers() {
        assert_eq!(parse_answer(""), Confirmation::Accept);
        assert_eq!(parse_answer("y"), Confirmation::Accept);
        assert_eq!(parse_answer(" N "), Confirmation::Skip);
        assert_eq!(parse_answer("q"), Confirmation::Abort);
        assert_eq!(parse_answer("Q"), Confirmation::Abort);
    }
}
