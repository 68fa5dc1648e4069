//! Errors surfaced by the runtime context.

use garnet_globals::BindingError;
use garnet_model::ModelError;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("unknown property type `{name}'")]
    UnknownType { name: String },

    #[error("uninitialized constant {name}")]
    UnknownModel { name: String },
}
