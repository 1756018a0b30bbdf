//! Error types for payload conversion.

use thiserror::Error;

/// Result type for payload conversion.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while converting a raw payload into a typed value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The payload is not a JSON object.
    #[error("{entity} payload is not a JSON object")]
    NotAnObject {
        /// Kind of entity being converted.
        entity: &'static str,
    },

    /// A required field is absent.
    #[error("{entity} payload is missing field `{field}`")]
    MissingField {
        /// Kind of entity being converted.
        entity: &'static str,
        /// Dotted path of the missing field.
        field: &'static str,
    },

    /// A required field is present but unusable.
    #[error("{entity} payload has invalid `{field}`: {value}")]
    InvalidField {
        /// Kind of entity being converted.
        entity: &'static str,
        /// Dotted path of the field.
        field: &'static str,
        /// The offending value, rendered as JSON.
        value: String,
    },

    /// The payload does not have the expected shape.
    #[error("malformed {entity} payload: {message}")]
    Malformed {
        /// Kind of entity being converted.
        entity: &'static str,
        /// Deserializer message.
        message: String,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(entity: &'static str, err: serde_json::Error) -> Self {
        Self::Malformed {
            entity,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::MissingField {
            entity: "page",
            field: "id",
        };
        assert_eq!(err.to_string(), "page payload is missing field `id`");

        let err = ProtocolError::InvalidField {
            entity: "page",
            field: "id",
            value: "\"abc\"".into(),
        };
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn malformed_keeps_deserializer_message() {
        let source = serde_json::from_str::<u64>("\"x\"").unwrap_err();
        let err = ProtocolError::malformed("space", source);
        assert!(err.to_string().starts_with("malformed space payload: invalid type"));
    }
}
