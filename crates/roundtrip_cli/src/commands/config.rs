//! Config command implementation.

use crate::settings::Settings;
use std::path::Path;

/// Prints the settings as JSON, with secrets masked.
pub fn show(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load(path)?;
    println!("{}", serde_json::to_string_pretty(&settings.masked())?);
    Ok(())
}

/// Prints the resolved settings path.
pub fn path(path: &Path) {
    println!("{}", path.display());
}
