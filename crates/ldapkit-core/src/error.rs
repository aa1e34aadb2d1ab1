//! Error types for directory model operations.
//!
//! Parse entry points (distinguished names, attribute descriptions, filters) and schema
//! construction report failures through [`Error`]. Comparison, matching and filter compilation
//! never fail: they degrade to [`ConditionResult::Undefined`](crate::ConditionResult::Undefined)
//! instead.

use thiserror::Error;

/// Main error type for ldapkit operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed textual representation (DN, RDN, attribute description or filter).
    #[error("Unable to decode `{input}`: {reason}")]
    Decode {
        /// The text that was being decoded
        input: String,
        /// Human-readable description of the problem
        reason: String,
        /// Byte offset of the offending character, when known
        position: Option<usize>,
    },

    /// A syntactically valid name referenced an attribute type the schema does not define
    #[error("Unknown attribute type `{name}` in `{input}`")]
    UnknownAttributeType {
        /// The unresolvable attribute type name or OID
        name: String,
        /// The text that contained the reference
        input: String,
    },

    /// A schema definition referenced an element that does not exist
    #[error("Unknown schema element: {0}")]
    UnknownSchemaElement(String),

    /// Schema definitions are inconsistent with each other
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    /// An argument was outside the accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Specialized result type for ldapkit operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds a [`Error::Decode`] for a failure at a known byte offset.
    #[must_use]
    pub fn decode_at(input: impl Into<String>, position: usize, reason: impl Into<String>) -> Self {
        Self::Decode {
            input: input.into(),
            reason: reason.into(),
            position: Some(position),
        }
    }

    /// Builds a [`Error::Decode`] that is not tied to a single offset.
    #[must_use]
    pub fn decode(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            input: input.into(),
            reason: reason.into(),
            position: None,
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "DECODE_ERROR",
            Self::UnknownAttributeType { .. } => "UNKNOWN_ATTRIBUTE_TYPE",
            Self::UnknownSchemaElement(_) => "UNKNOWN_SCHEMA_ELEMENT",
            Self::SchemaConflict(_) => "SCHEMA_CONFLICT",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Returns the byte offset associated with a decode error.
    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        match self {
            Self::Decode { position, .. } => *position,
            _ => None,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    ///
    /// Decode errors and unknown attribute types are caused by caller input; schema and
    /// configuration problems point at a broken deployment.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::UnknownSchemaElement(_) | Self::SchemaConflict(_) | Self::ConfigError(_)
        )
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::decode("cn", "missing '='").error_code(),
            "DECODE_ERROR"
        );
        assert_eq!(
            Error::UnknownAttributeType {
                name: "foo".to_string(),
                input: "foo=bar".to_string()
            }
            .error_code(),
            "UNKNOWN_ATTRIBUTE_TYPE"
        );
        assert_eq!(
            Error::UnknownSchemaElement("test".to_string()).error_code(),
            "UNKNOWN_SCHEMA_ELEMENT"
        );
        assert_eq!(
            Error::SchemaConflict("test".to_string()).error_code(),
            "SCHEMA_CONFLICT"
        );
        assert_eq!(
            Error::InvalidArgument("test".to_string()).error_code(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(
            Error::ConfigError("test".to_string()).error_code(),
            "CONFIG_ERROR"
        );
        assert_eq!(
            Error::ValidationError("test".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::decode_at("cn=#abc", 3, "odd number of hex digits");
        assert_eq!(
            err.to_string(),
            "Unable to decode `cn=#abc`: odd number of hex digits"
        );
        assert_eq!(err.position(), Some(3));

        let err = Error::UnknownAttributeType {
            name: "fooBar".to_string(),
            input: "fooBar;lang-en".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown attribute type `fooBar` in `fooBar;lang-en`"
        );
        assert_eq!(err.position(), None);
    }

    #[test]
    fn test_should_log() {
        assert!(Error::SchemaConflict("test".to_string()).should_log());
        assert!(Error::ConfigError("test".to_string()).should_log());
        assert!(Error::UnknownSchemaElement("test".to_string()).should_log());

        assert!(!Error::decode("x", "y").should_log());
        assert!(!Error::InvalidArgument("test".to_string()).should_log());
    }

    #[test]
    fn test_error_partial_eq() {
        let err1 = Error::InvalidArgument("test".to_string());
        let err2 = Error::InvalidArgument("test".to_string());
        let err3 = Error::InvalidArgument("other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
