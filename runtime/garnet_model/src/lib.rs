//! Live model metadata for the Garnet runtime.
//!
//! Models are declared through a [`ModelRegistry`], which owns every live
//! [`ModelDescriptor`]. A descriptor carries per-backend property sets,
//! relationships and validation rules; deriving a subtype copies all of
//! them, and properties declared on a model later flow down to its live
//! subtypes.

pub mod backend;
pub mod descriptor;
mod errors;
mod inherit;
pub mod property;
pub mod registry;
pub mod relationship;
pub mod validation;

pub use backend::{Backend, BackendCatalog, BackendId, NamingConvention, ResourceNaming};
pub use descriptor::{is_model_name, Lifecycle, ModelDescriptor, ModelId};
pub use errors::{ModelError, ModelResult};
pub use property::{
    Property, PropertyFlags, PropertyOptions, PropertySet, PropertyType, SharedProperty, Visibility,
};
pub use registry::{ModelRegistry, StoragePlanEntry};
pub use relationship::{
    KeyList, ModelHandle, Relationship, RelationshipKind, RelationshipOptions, ResolvedKeys,
};
pub use validation::{validate, FormatRule, Record, RuleKind, ValidationFailure, ValidationRule};
