//! Error types for model declaration and lookup.

use thiserror::Error;

/// Result of a model operation.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A model, property or relationship name is not a legal identifier.
    #[error("`{name}' is not a valid name")]
    InvalidName { name: String },

    /// Relationship keys could not be found at first use.
    #[error("cannot resolve relationship `{relationship}' on {model}: {reason}")]
    UnresolvedRelationship {
        model: String,
        relationship: String,
        reason: String,
    },

    /// A live model is already bound to this name.
    #[error("model {name} is already registered")]
    DuplicateRegistration { name: String },

    #[error("unknown backend `{name}'")]
    UnknownBackend { name: String },

    #[error("invalid options for property `{property}': {message}")]
    InvalidOption { property: String, message: String },

    /// The descriptor was removed from the registry.
    #[error("model {name} has been removed")]
    Removed { name: String },

    #[error("{model} has no property `{property}'")]
    UnknownProperty { model: String, property: String },
}

pub(crate) fn invalid_name(name: &str) -> ModelError {
    ModelError::InvalidName {
        name: name.to_string(),
    }
}

pub(crate) fn invalid_option(property: &str, message: impl Into<String>) -> ModelError {
    ModelError::InvalidOption {
        property: property.to_string(),
        message: message.into(),
    }
}

pub(crate) fn unresolved(model: &str, relationship: &str, reason: impl Into<String>) -> ModelError {
    ModelError::UnresolvedRelationship {
        model: model.to_string(),
        relationship: relationship.to_string(),
        reason: reason.into(),
    }
}
