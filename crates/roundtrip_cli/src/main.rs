//! Roundtrip CLI
//!
//! Mirror Confluence pages and attachments to a local directory tree, edit
//! them offline, and push the changes back.
//!
//! # Commands
//!
//! - `ping` - Check the configured URL and credentials
//! - `pull` - Download a space or page tree into the mirror
//! - `push` - Upload edited pages and attachments
//! - `diff` - Compare the mirror with the server
//! - `config` - Show the settings or their location

mod commands;
mod http;
mod settings;

use clap::{Parser, Subcommand};
use commands::pull::PullTarget;
use commands::push::{PushOptions, PushTarget};
use settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Confluence mirror tools.
#[derive(Parser)]
#[command(name = "roundtrip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity and credentials
    Ping,

    /// Download pages and attachments
    Pull {
        /// Space key to pull
        #[arg(short, long, conflicts_with = "page_id", required_unless_present = "page_id")]
        space: Option<String>,

        /// Page id to pull
        #[arg(short, long)]
        page_id: Option<u64>,

        /// Mirror root directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Pull only the page, not its descendants
        #[arg(long)]
        no_recursive: bool,

        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Upload edited pages and attachments
    Push {
        /// Space directory to push
        #[arg(long, conflicts_with = "page_path", required_unless_present = "page_path")]
        space_path: Option<PathBuf>,

        /// Page directory to push
        #[arg(long)]
        page_path: Option<PathBuf>,

        /// Version message
        #[arg(short, long, default_value = "Updated by roundtrip")]
        message: String,

        /// Include descendants of the page directory
        #[arg(short, long)]
        recursive: bool,

        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,

        /// Push even if the server has a newer version
        #[arg(short, long)]
        force: bool,

        /// Do not ask before each update
        #[arg(short, long)]
        yes: bool,
    },

    /// Compare the mirror with the server
    Diff {
        /// Space key to compare
        #[arg(short, long, conflicts_with = "page_id", required_unless_present = "page_id")]
        space: Option<String>,

        /// Page id to compare
        #[arg(short, long)]
        page_id: Option<u64>,

        /// Mirror root directory
        #[arg(short, long, default_value = ".")]
        local: PathBuf,

        /// Include descendants of the page
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show the settings or their location
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the settings with secrets masked
    Show,
    /// Print the settings file path
    Path,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = settings::config_path()?;

    match cli.command {
        Commands::Ping => {
            let settings = Settings::load(&config_path)?;
            commands::ping::run(&settings)?;
        }
        Commands::Pull {
            space,
            page_id,
            output,
            no_recursive,
            dry_run,
        } => {
            let settings = Settings::load(&config_path)?;
            let target = pull_target(space, page_id, !no_recursive)?;
            commands::pull::run(&settings, &target, &output, dry_run)?;
        }
        Commands::Push {
            space_path,
            page_path,
            message,
            recursive,
            dry_run,
            force,
            yes,
        } => {
            let settings = Settings::load(&config_path)?;
            let target = match (&space_path, &page_path) {
                (Some(path), _) => PushTarget::Space(path),
                (None, Some(path)) => PushTarget::Page { path, recursive },
                (None, None) => return Err("Either --space-path or --page-path is required".into()),
            };
            let options = PushOptions {
                message,
                dry_run,
                force,
                interactive: !yes,
            };
            commands::push::run(&settings, target, &options)?;
        }
        Commands::Diff {
            space,
            page_id,
            local,
            recursive,
        } => {
            let settings = Settings::load(&config_path)?;
            let target = pull_target(space, page_id, recursive)?;
            commands::diff::run(&settings, &target, &local)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config_path)?,
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }

    Ok(())
}

fn pull_target(
    space: Option<String>,
    page_id: Option<u64>,
    recursive: bool,
) -> Result<PullTarget, &'static str> {
    match (space, page_id) {
        (Some(key), _) => Ok(PullTarget::Space(key)),
        (None, Some(id)) => Ok(PullTarget::Page { id, recursive }),
        (None, None) => Err("Either --space or --page-id is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pull_needs_exactly_one_target() {
        assert!(Cli::try_parse_from(["roundtrip", "pull"]).is_err());
        assert!(Cli::try_parse_from(["roundtrip", "pull", "-s", "DOCS", "-p", "1"]).is_err());

        let cli = Cli::try_parse_from(["roundtrip", "pull", "--page-id", "42", "--no-recursive"])
            .unwrap();
        match cli.command {
            Commands::Pull {
                space,
                page_id,
                no_recursive,
                ..
            } => {
                assert_eq!(
                    pull_target(space, page_id, !no_recursive),
                    Ok(PullTarget::Page {
                        id: 42,
                        recursive: false
                    })
                );
            }
            _ => panic!("expected pull"),
        }
    }

    #[test]
    fn push_defaults_to_interactive() {
        let cli = Cli::try_parse_from(["roundtrip", "push", "--page-path", "DOCS/Home"]).unwrap();
        match cli.command {
            Commands::Push {
                yes,
                recursive,
                message,
                ..
            } => {
                assert!(!yes);
                assert!(!recursive);
                assert_eq!(message, "Updated by roundtrip");
            }
            _ => panic!("expected push"),
        }
    }
}
