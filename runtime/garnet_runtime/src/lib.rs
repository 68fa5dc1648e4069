//! Garnet runtime context.
//!
//! Ties the binding layer ([`garnet_globals`]) and the model layer
//! ([`garnet_model`]) together behind one [`RuntimeContext`], configured by
//! a [`RuntimeConfig`] and driven by the front end's [`Operation`] stream.

mod config;
mod context;
mod errors;
mod operation;
mod tracing_setup;

pub use config::RuntimeConfig;
pub use context::RuntimeContext;
pub use errors::{RuntimeError, RuntimeResult};
pub use operation::{Operation, Outcome};
pub use tracing_setup::init_tracing;
