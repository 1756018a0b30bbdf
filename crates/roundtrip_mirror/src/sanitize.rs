//! Path segment sanitization.

/// Characters that are invalid in file names on at least one platform.
const INVALID_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Device names reserved on Windows, with or without an extension.
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Turns a page or attachment title into a portable path segment.
///
/// Rules, in order:
/// 1. each of `< > : " / \ | ? *` becomes `_`
/// 2. trailing spaces and dots are stripped, then leading spaces
/// 3. reserved device names (`CON`, `AUX.txt`, `lpt1`, ...) get a `_` prefix
/// 4. an empty result becomes `_`
///
/// # Example
///
/// ```rust
/// use roundtrip_mirror::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Parent/Name"), "Parent_Name");
/// assert_eq!(sanitize_filename("CON"), "_CON");
/// assert_eq!(sanitize_filename("file. "), "file");
/// assert_eq!(sanitize_filename(""), "_");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let mut sanitized = replaced
        .trim_end_matches(|c: char| c == ' ' || c == '.')
        .trim_start_matches(' ')
        .to_string();

    if is_reserved(&sanitized) {
        sanitized.insert(0, '_');
    }

    if sanitized.is_empty() {
        return "_".to_string();
    }

    sanitized
}

fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or_default();
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn simple_names_unchanged() {
        assert_eq!(sanitize_filename("hello"), "hello");
        assert_eq!(sanitize_filename("my-page"), "my-page");
        assert_eq!(sanitize_filename("Test Page"), "Test Page");
    }

    #[test]
    fn replaces_invalid_characters() {
        assert_eq!(sanitize_filename("file<name>"), "file_name_");
        assert_eq!(sanitize_filename("file:name"), "file_name");
        assert_eq!(sanitize_filename("file/name"), "file_name");
        assert_eq!(sanitize_filename("file\\name"), "file_name");
        assert_eq!(sanitize_filename("file|name"), "file_name");
        assert_eq!(sanitize_filename("file?name"), "file_name");
        assert_eq!(sanitize_filename("file*name"), "file_name");
        assert_eq!(sanitize_filename("file\"name"), "file_name");
    }

    #[test]
    fn trims_trailing_and_leading() {
        assert_eq!(sanitize_filename("file."), "file");
        assert_eq!(sanitize_filename("file.."), "file");
        assert_eq!(sanitize_filename("file  "), "file");
        assert_eq!(sanitize_filename("file. "), "file");
        assert_eq!(sanitize_filename("  file"), "file");
    }

    #[test]
    fn prefixes_reserved_names() {
        assert_eq!(sanitize_filename("CON"), "_CON");
        assert_eq!(sanitize_filename("con"), "_con");
        assert_eq!(sanitize_filename("COM1"), "_COM1");
        assert_eq!(sanitize_filename("LPT9"), "_LPT9");
        assert_eq!(sanitize_filename("AUX.txt"), "_AUX.txt");
        assert_eq!(sanitize_filename("CONSOLE"), "CONSOLE");
    }

    #[test]
    fn empty_results_become_underscore() {
        assert_eq!(sanitize_filename(""), "_");
        assert_eq!(sanitize_filename("..."), "_");
        assert_eq!(sanitize_filename("   "), "_");
    }

    proptest! {
        #[test]
        fn output_is_a_safe_segment(name in ".{0,40}") {
            let sanitized = sanitize_filename(&name);
            prop_assert!(!sanitized.is_empty());
            prop_assert!(!sanitized.contains(&INVALID_CHARS[..]));
            prop_assert!(!sanitized.ends_with(' ') && !sanitized.ends_with('.'));
            prop_assert!(!sanitized.starts_with(' '));
        }

        #[test]
        fn sanitizing_is_idempotent(name in ".{0,40}") {
            let once = sanitize_filename(&name);
            prop_assert_eq!(sanitize_filename(&once), once);
        }
    }
}
