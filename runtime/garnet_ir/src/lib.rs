//! Identifiers shared by every Garnet runtime crate.
//!
//! - [`Name`]: compact interned identifier
//! - [`StringInterner`] / [`SharedInterner`]: sharded, thread-safe interning
//! - [`ident`]: identifier rules for global variables and model members

pub mod ident;
mod interner;
mod name;

pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
