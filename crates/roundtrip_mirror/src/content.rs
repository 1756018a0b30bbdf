//! Content formatting and fingerprints.

use sha2::{Digest, Sha256};

/// Transforms storage-format content before it is written to the mirror.
///
/// The mirror itself stores whatever the formatter returns; push reads it
/// back unchanged, so formatters should be stable (formatting twice gives the
/// same result) to avoid spurious updates.
pub trait ContentFormatter: Send + Sync {
    /// Formats page content.
    fn format(&self, content: &str) -> String;
}

/// Writes content exactly as received.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl ContentFormatter for Verbatim {
    fn format(&self, content: &str) -> String {
        content.to_string()
    }
}

/// Hex SHA-256 of page content, used in diagnostics.
pub fn content_hash(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbatim_keeps_content() {
        assert_eq!(Verbatim.format("<p>a</p>\n"), "<p>a</p>\n");
    }

    #[test]
    fn hash_is_hex_sha256() {
        let hash = content_hash("");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(content_hash("a"), content_hash("b"));
    }
}
