//! The operation stream produced by the front end.
//!
//! Names arrive resolved: globals with or without their `$` sigil, models
//! by their full `Outer::Name`. Property options arrive as the literal
//! option dictionary.

use std::sync::Arc;

use garnet_model::{ModelDescriptor, SharedProperty};
use garnet_value::Value;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug)]
pub enum Operation {
    /// `$name = value`: assigns through the scope chain, creating a user
    /// global when nothing resolves the name.
    DefineGlobal { name: String, value: Value },
    /// `$name` in expression position; unset globals read as nil.
    ReadGlobal { name: String },
    /// `alias $new $old`
    AliasGlobal { new: String, old: String },
    /// A model body opening; `backend` overrides the default backend.
    DeclareModel { name: String, backend: Option<String> },
    /// `property :name, Type, options`
    DeclareProperty {
        model: String,
        name: String,
        type_name: String,
        options: FxHashMap<String, Value>,
    },
    /// `class Name < Parent`
    DeclareSubtype { name: String, parent: String },
    RemoveModel { name: String },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::DefineGlobal { .. } => "define_global",
            Operation::ReadGlobal { .. } => "read_global",
            Operation::AliasGlobal { .. } => "alias_global",
            Operation::DeclareModel { .. } => "declare_model",
            Operation::DeclareProperty { .. } => "declare_property",
            Operation::DeclareSubtype { .. } => "declare_subtype",
            Operation::RemoveModel { .. } => "remove_model",
        }
    }
}

/// Result of applying one operation.
#[derive(Clone, Debug)]
pub enum Outcome {
    Unit,
    Value(Value),
    Model(Arc<ModelDescriptor>),
    Property(SharedProperty),
    /// Whether a live model was removed.
    Removed(bool),
}

impl Outcome {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<Arc<ModelDescriptor>> {
        match self {
            Outcome::Model(model) => Some(model),
            _ => None,
        }
    }
}
