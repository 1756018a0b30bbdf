//! Deserializers for fields the API sends in more than one shape.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// An integer that may arrive as a JSON number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Lenient {
    Number(u64),
    Text(String),
    Other(IgnoredAny),
}

impl Lenient {
    pub(crate) fn as_u64(&self) -> Option<u64> {
        match self {
            Lenient::Number(n) => Some(*n),
            Lenient::Text(s) => s.trim().parse().ok(),
            Lenient::Other(_) => None,
        }
    }
}

/// Reads an optional integer; anything unusable becomes `None`.
pub(crate) fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Lenient>::deserialize(deserializer)?.and_then(|value| value.as_u64()))
}

/// Reads an integer; anything unusable becomes zero.
pub(crate) fn u64_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_u64(deserializer)?.unwrap_or(0))
}

/// Reads a string; `null` becomes an empty string.
pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
