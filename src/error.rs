//! Error types for registry and injection operations

use crate::Key;
use thiserror::Error;

/// Boxed error returned by post-injection hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during registration, lookup, or injection
#[derive(Error, Debug)]
pub enum DiError {
    /// No service is registered to the key anywhere in the parent chain
    #[error("no service registered to key {key}")]
    NotFound { key: Key },

    /// The key, or another key with the same tag, is already registered
    #[error("duplicate service key {key}")]
    DuplicateKey { key: Key },

    /// An annotated field has no setter
    #[error("field '{field}' can not be set - it may be private")]
    InvalidField { field: &'static str },

    /// The resolved service cannot be converted to the field's declared type
    #[error("field '{field}' cannot be assigned a value of type {type_name}")]
    TypeMismatch {
        field: &'static str,
        type_name: &'static str,
    },

    /// The optionality annotation is not a boolean
    #[error("field '{field}' has an invalid optional tag")]
    InvalidTag { field: &'static str, value: String },

    /// A post-injection hook failed
    #[error("{0}")]
    Hook(BoxError),
}

impl DiError {
    /// Create a NotFound error for a key
    #[inline]
    pub fn not_found(key: &Key) -> Self {
        Self::NotFound { key: key.clone() }
    }

    /// Create a DuplicateKey error for a key
    #[inline]
    pub fn duplicate(key: &Key) -> Self {
        Self::DuplicateKey { key: key.clone() }
    }

    /// Create an InvalidField error
    #[inline]
    pub fn invalid_field(field: &'static str) -> Self {
        Self::InvalidField { field }
    }

    /// Create a TypeMismatch error
    #[inline]
    pub fn type_mismatch(field: &'static str, type_name: &'static str) -> Self {
        Self::TypeMismatch { field, type_name }
    }

    /// Create an InvalidTag error
    #[inline]
    pub fn invalid_tag(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidTag {
            field,
            value: value.into(),
        }
    }

    /// Wrap an error returned by a post-injection hook
    #[inline]
    pub fn hook(err: impl Into<BoxError>) -> Self {
        Self::Hook(err.into())
    }

    /// Whether this is a lookup miss
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for registry and injection operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct Plain;

    impl crate::ServiceKey for Plain {}

    #[test]
    fn test_messages() {
        assert_eq!(
            DiError::not_found(&Key::from("value")).to_string(),
            r#"no service registered to key "value""#
        );
        assert_eq!(
            DiError::duplicate(&Key::new(Plain)).to_string(),
            "duplicate service key Plain"
        );
        assert_eq!(
            DiError::invalid_field("value").to_string(),
            "field 'value' can not be set - it may be private"
        );
        assert_eq!(
            DiError::type_mismatch("Value", "nil").to_string(),
            "field 'Value' cannot be assigned a value of type nil"
        );
        assert_eq!(
            DiError::invalid_tag("Value", "yup").to_string(),
            "field 'Value' has an invalid optional tag"
        );
    }

    #[test]
    fn test_hook_is_verbatim() {
        let err = DiError::hook("oops");
        assert_eq!(err.to_string(), "oops");
        assert!(!err.is_not_found());
    }
}
