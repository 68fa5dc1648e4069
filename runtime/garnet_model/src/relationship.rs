//! Relationships between models.
//!
//! A relationship names its two models through non-owning [`ModelHandle`]s
//! and resolves its key properties lazily, on first use, against the models'
//! property sets. Resolution happens outside any descriptor lock: each
//! model's property set is read in turn, never both at once.

use std::fmt;
use std::sync::{Arc, Weak};

use garnet_ir::Name;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::backend::{demodulize, underscore, BackendId};
use crate::descriptor::{ModelDescriptor, ModelId};
use crate::errors::{unresolved, ModelError, ModelResult};
use crate::property::SharedProperty;

/// Resolved key properties; keys are almost always one or two columns.
pub type KeyList = SmallVec<[SharedProperty; 2]>;

pub(crate) type KeyNames = SmallVec<[Name; 2]>;

/// Non-owning reference to a model.
#[derive(Clone)]
pub struct ModelHandle {
    id: ModelId,
    name: String,
    model: Weak<ModelDescriptor>,
}

impl ModelHandle {
    pub(crate) fn new(id: ModelId, name: String, model: Weak<ModelDescriptor>) -> Self {
        ModelHandle { id, name, model }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The live descriptor, or `Removed`.
    pub fn upgrade(&self) -> ModelResult<Arc<ModelDescriptor>> {
        self.model
            .upgrade()
            .filter(|model| !model.is_removed())
            .ok_or_else(|| ModelError::Removed {
                name: self.name.clone(),
            })
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.name, self.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationshipKind {
    /// Declared on the child: `belongs_to :owner`.
    BelongsTo,
    /// Declared on the parent: `has n, :comments`.
    HasMany,
}

/// Declared relationship options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationshipOptions {
    pub child_key: Option<Vec<String>>,
    pub parent_key: Option<Vec<String>>,
    pub min: u32,
    /// `None` is unbounded.
    pub max: Option<u32>,
}

impl RelationshipOptions {
    #[must_use]
    pub fn child_key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.child_key = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn parent_key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_key = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// Key properties of a relationship, child and parent in matching order.
#[derive(Clone, Debug)]
pub struct ResolvedKeys {
    pub child_key: KeyList,
    pub parent_key: KeyList,
}

/// A named association between a child and a parent model.
pub struct Relationship {
    name: Name,
    label: &'static str,
    kind: RelationshipKind,
    backend: BackendId,
    owner: String,
    child_model: ModelHandle,
    parent_model: ModelHandle,
    child_key_names: Option<KeyNames>,
    parent_key_names: Option<KeyNames>,
    /// Default child key is `<prefix>_<parent key>`.
    key_prefix: String,
    min: u32,
    max: Option<u32>,
    resolved: RwLock<Option<ResolvedKeys>>,
}

/// Everything needed to build a relationship.
pub(crate) struct RelationshipParts {
    pub(crate) name: Name,
    pub(crate) label: &'static str,
    pub(crate) kind: RelationshipKind,
    pub(crate) backend: BackendId,
    pub(crate) child_model: ModelHandle,
    pub(crate) parent_model: ModelHandle,
    pub(crate) child_key_names: Option<KeyNames>,
    pub(crate) parent_key_names: Option<KeyNames>,
    pub(crate) min: u32,
    pub(crate) max: Option<u32>,
}

impl Relationship {
    pub(crate) fn new(parts: RelationshipParts) -> Self {
        let (owner, key_prefix) = match parts.kind {
            RelationshipKind::BelongsTo => (parts.child_model.name.clone(), parts.label.to_string()),
            RelationshipKind::HasMany => (
                parts.parent_model.name.clone(),
                underscore(demodulize(&parts.parent_model.name)),
            ),
        };
        Relationship {
            name: parts.name,
            label: parts.label,
            kind: parts.kind,
            backend: parts.backend,
            owner,
            child_model: parts.child_model,
            parent_model: parts.parent_model,
            child_key_names: parts.child_key_names,
            parent_key_names: parts.parent_key_names,
            key_prefix,
            min: parts.min,
            max: parts.max,
            resolved: RwLock::new(None),
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn kind(&self) -> RelationshipKind {
        self.kind
    }

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    pub fn child_model(&self) -> &ModelHandle {
        &self.child_model
    }

    pub fn parent_model(&self) -> &ModelHandle {
        &self.parent_model
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.read().is_some()
    }

    fn unresolved(&self, reason: impl Into<String>) -> ModelError {
        unresolved(&self.owner, self.label, reason)
    }

    fn lookup_keys(&self, model: &ModelDescriptor, names: &KeyNames) -> ModelResult<KeyList> {
        let properties = model.properties(self.backend);
        names
            .iter()
            .map(|name| {
                properties.get(*name).cloned().ok_or_else(|| {
                    let label = model.catalog().interner().lookup(*name);
                    self.unresolved(format!("{} has no property `{label}'", model.name()))
                })
            })
            .collect()
    }

    /// Resolve key properties; cached after the first success.
    pub fn resolve(&self) -> ModelResult<ResolvedKeys> {
        if let Some(keys) = self.resolved.read().as_ref() {
            return Ok(keys.clone());
        }

        let parent = self
            .parent_model
            .upgrade()
            .map_err(|_| self.unresolved(format!("{} has been removed", self.parent_model.name)))?;
        let parent_key: KeyList = match &self.parent_key_names {
            Some(names) => self.lookup_keys(&parent, names)?,
            None => parent.key(self.backend).into_iter().collect(),
        };
        if parent_key.is_empty() {
            return Err(self.unresolved(format!("{} has no key", parent.name())));
        }
        drop(parent);

        let child = self
            .child_model
            .upgrade()
            .map_err(|_| self.unresolved(format!("{} has been removed", self.child_model.name)))?;
        let child_key: KeyList = match &self.child_key_names {
            Some(names) => self.lookup_keys(&child, names)?,
            None => {
                let properties = child.properties(self.backend);
                parent_key
                    .iter()
                    .map(|parent_property| {
                        let wanted = format!("{}_{}", self.key_prefix, parent_property.label());
                        properties
                            .find(&wanted)
                            .cloned()
                            .ok_or_else(|| self.unresolved(format!("{} has no property `{wanted}'", child.name())))
                    })
                    .collect::<ModelResult<_>>()?
            }
        };
        if child_key.len() != parent_key.len() {
            return Err(self.unresolved(format!(
                "child key has {} properties but parent key has {}",
                child_key.len(),
                parent_key.len()
            )));
        }

        let keys = ResolvedKeys {
            child_key,
            parent_key,
        };
        tracing::trace!(relationship = self.label, owner = %self.owner, "resolved relationship keys");
        Ok(self.resolved.write().get_or_insert(keys).clone())
    }

    pub fn child_key(&self) -> ModelResult<KeyList> {
        self.resolve().map(|keys| keys.child_key)
    }

    pub fn parent_key(&self) -> ModelResult<KeyList> {
        self.resolve().map(|keys| keys.parent_key)
    }

    /// Copy for a subtype: references to `original` are repointed to
    /// `subtype`, other collaborators are kept. Keys resolve afresh.
    pub(crate) fn duplicate_for(&self, original: ModelId, subtype: &ModelHandle) -> Relationship {
        let repoint = |handle: &ModelHandle| {
            if handle.id == original {
                subtype.clone()
            } else {
                handle.clone()
            }
        };
        Relationship {
            name: self.name,
            label: self.label,
            kind: self.kind,
            backend: self.backend,
            owner: subtype.name.clone(),
            child_model: repoint(&self.child_model),
            parent_model: repoint(&self.parent_model),
            child_key_names: self.child_key_names.clone(),
            parent_key_names: self.parent_key_names.clone(),
            key_prefix: self.key_prefix.clone(),
            min: self.min,
            max: self.max,
            resolved: RwLock::new(None),
        }
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relationship")
            .field("name", &self.label)
            .field("kind", &self.kind)
            .field("child", &self.child_model)
            .field("parent", &self.parent_model)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
