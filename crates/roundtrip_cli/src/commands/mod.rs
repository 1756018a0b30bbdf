//! CLI command implementations.

pub mod config;
pub mod diff;
pub mod ping;
pub mod pull;
pub mod push;

use crate::http::{Credentials, ReqwestClient};
use crate::settings::Settings;
use roundtrip_sync_engine::{RestClient, SyncConfig};
use std::error::Error;
use std::sync::Arc;

/// Number of errors printed before the rest are summarized.
const SHOWN_ERRORS: usize = 5;

/// Remote client used by every networked command.
pub type Remote = RestClient<ReqwestClient>;

/// Builds the remote client from the settings, retrying per `config.retry`.
pub fn connect(settings: &Settings, config: &SyncConfig) -> Result<Arc<Remote>, Box<dyn Error>> {
    let details = &settings.auth.confluence;
    if details.url.is_empty() {
        return Err("Confluence URL not configured (auth.confluence.url)".into());
    }
    if !details.has_credentials() {
        return Err("Confluence credentials not configured (username + api_token, or pat)".into());
    }
    let credentials =
        Credentials::from_details(details).ok_or("Confluence credentials are incomplete")?;
    let client = ReqwestClient::new(
        &settings.connection_config,
        credentials,
        config.retry.clone(),
    )
    .map_err(|e| e.message)?;
    Ok(Arc::new(RestClient::new(details.url.as_str(), client)))
}

/// Engine configuration derived from the settings.
pub fn sync_config(settings: &Settings) -> SyncConfig {
    SyncConfig::new().with_retry(settings.connection_config.retry_config())
}

/// Formats the first few errors, then a count of the rest.
pub fn error_lines(errors: &[String]) -> Vec<String> {
    let mut lines: Vec<String> = errors
        .iter()
        .take(SHOWN_ERRORS)
        .map(|e| format!("  - {e}"))
        .collect();
    if errors.len() > SHOWN_ERRORS {
        lines.push(format!("  ... and {} more", errors.len() - SHOWN_ERRORS));
    }
    lines
}

/// Prints a titled block of errors, if any.
pub fn print_errors(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!();
    println!("{title} ({}):", errors.len());
    for line in error_lines(errors) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_truncated_after_five() {
        let errors: Vec<String> = (1..=8).map(|i| format!("e{i}")).collect();
        let lines = error_lines(&errors);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "  - e1");
        assert_eq!(lines[4], "  - e5");
        assert_eq!(lines[5], "  ... and 3 more");
    }

    #[test]
    fn few_errors_are_all_shown() {
        let errors = vec!["only".to_string()];
        assert_eq!(error_lines(&errors), vec!["  - only".to_string()]);
    }

    #[test]
    fn retry_policy_follows_settings() {
        let mut settings = Settings::default();
        assert_eq!(sync_config(&settings).retry.max_attempts, 6);

        settings.connection_config.backoff_and_retry = false;
        assert_eq!(sync_config(&settings).retry.max_attempts, 1);
    }

    #[test]
    fn connect_requires_url_and_credentials() {
        let mut settings = Settings::default();
        let config = sync_config(&settings);
        assert!(connect(&settings, &config).is_err());

        settings.auth.confluence.url = "https://example.net/wiki/".into();
        assert!(connect(&settings, &config).is_err());

        settings.auth.confluence.pat = "pat".into();
        let remote = connect(&settings, &config).unwrap();
        assert_eq!(remote.base_url(), "https://example.net/wiki");
    }
}
