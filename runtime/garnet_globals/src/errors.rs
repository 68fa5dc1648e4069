//! Error types for binding resolution.

use thiserror::Error;

/// Result of a binding operation.
pub type BindingResult<T> = Result<T, BindingError>;

/// Failure of a global or scope-relative binding operation.
///
/// Names are rendered with their `$` sigil.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BindingError {
    /// The binding exists but currently has no value. Callers that check
    /// `is_defined` first never see this.
    #[error("global variable `${name}' not initialized")]
    NotDefined { name: String },

    #[error("${name} is a read-only variable")]
    ReadOnlyViolation { name: String },

    #[error("value of ${name} must be {expected}, {got} given")]
    TypeMismatch {
        name: String,
        expected: String,
        got: &'static str,
    },

    #[error("`{name}' is not allowed as a global variable name")]
    InvalidName { name: String },

    /// Rule-specific rejection by a computed special (e.g. lowering `$SAFE`).
    #[error("${name}: {message}")]
    InvalidValue { name: String, message: String },

    /// Frames must be popped innermost-first.
    #[error("cannot pop frame {got}: innermost frame is {expected}")]
    FrameMismatch { expected: u64, got: u64 },
}

impl BindingError {
    /// `true` for the recoverable "no current value" case.
    pub fn is_not_defined(&self) -> bool {
        matches!(self, BindingError::NotDefined { .. })
    }
}

pub(crate) fn not_defined(name: &str) -> BindingError {
    BindingError::NotDefined {
        name: name.to_string(),
    }
}

pub(crate) fn read_only(name: &str) -> BindingError {
    BindingError::ReadOnlyViolation {
        name: name.to_string(),
    }
}

pub(crate) fn type_mismatch(name: &str, expected: impl Into<String>, got: &'static str) -> BindingError {
    BindingError::TypeMismatch {
        name: name.to_string(),
        expected: expected.into(),
        got,
    }
}

pub(crate) fn invalid_value(name: &str, message: impl Into<String>) -> BindingError {
    BindingError::InvalidValue {
        name: name.to_string(),
        message: message.into(),
    }
}
