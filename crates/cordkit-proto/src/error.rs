//! Error types for the wire model.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtoError`].
pub type Result<T, E = ProtoError> = std::result::Result<T, E>;

/// Errors raised while decoding platform payloads.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtoError {
    /// An integer enum carried a value this crate does not know.
    #[error("unknown {kind} value: {value}")]
    UnknownEnumValue {
        /// Name of the enum being decoded.
        kind: &'static str,
        /// The offending raw value.
        value: u64,
    },

    /// A snowflake string was not a base-10 unsigned integer.
    #[error("invalid snowflake: {0:?}")]
    InvalidSnowflake(String),

    /// A payload was missing a field the model requires.
    #[error("payload missing field `{0}`")]
    MissingField(&'static str),

    /// JSON decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtoError::UnknownEnumValue {
            kind: "CommandType",
            value: 9,
        };
        assert_eq!(err.to_string(), "unknown CommandType value: 9");
        assert_eq!(
            ProtoError::MissingField("id").to_string(),
            "payload missing field `id`"
        );
    }
}
