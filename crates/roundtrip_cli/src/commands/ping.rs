//! Ping command implementation.

use super::{connect, sync_config};
use crate::settings::Settings;
use roundtrip_sync_engine::RemoteClient;

/// Runs the ping command.
pub fn run(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let remote = connect(settings, &sync_config(settings))?;
    println!("Connecting to {}", remote.base_url());
    match remote.ping() {
        Ok(()) => {
            println!("✓ Connection OK");
            Ok(())
        }
        Err(e) => {
            println!("✗ Connection failed: {e}");
            Err("Ping failed".into())
        }
    }
}
