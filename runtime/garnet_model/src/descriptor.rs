//! Model descriptors.
//!
//! A [`ModelDescriptor`] holds the runtime metadata of one declared model.
//! Identity fields are immutable; everything that changes after declaration
//! lives in one `RwLock<DescriptorState>`. No code path holds two descriptor
//! locks at once: propagation to subtypes collects the live children under
//! the parent's lock, releases it, then visits each child in turn.
//!
//! Descriptors are only created through the `ModelRegistry`.

use std::fmt;
use std::sync::{Arc, Weak};

use garnet_ir::ident::is_identifier;
use garnet_ir::Name;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::backend::{BackendCatalog, BackendId};
use crate::errors::{invalid_name, unresolved, ModelError, ModelResult};
use crate::property::{Property, PropertyOptions, PropertySet, PropertyType, SharedProperty};
use crate::relationship::{
    KeyNames, ModelHandle, Relationship, RelationshipKind, RelationshipOptions, RelationshipParts,
};
use crate::validation::{validate, Record, ValidationFailure, ValidationRule};

/// Registry-assigned model identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u32);

impl ModelId {
    pub(crate) const fn new(raw: u32) -> Self {
        ModelId(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// `Declared → Registered → HasSubtypes → Removed`; `Removed` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Declared,
    Registered,
    HasSubtypes,
    Removed,
}

/// `true` for `Name` and `Outer::Name` style model names.
pub fn is_model_name(name: &str) -> bool {
    name.split("::")
        .all(|segment| is_identifier(segment) && segment.starts_with(|c: char| c.is_uppercase()))
}

#[derive(Default)]
pub(crate) struct DescriptorState {
    pub(crate) storage_names: FxHashMap<BackendId, String>,
    pub(crate) properties: FxHashMap<BackendId, PropertySet>,
    /// Names declared on this model itself, as opposed to inherited.
    pub(crate) declared: FxHashSet<Name>,
    pub(crate) relationships: FxHashMap<BackendId, FxHashMap<Name, Arc<Relationship>>>,
    pub(crate) validations: Vec<ValidationRule>,
    pub(crate) children: Vec<Weak<ModelDescriptor>>,
    pub(crate) lifecycle: Lifecycle,
}

impl DescriptorState {
    /// The set for `backend`, derived from the `default` set when absent.
    pub(crate) fn properties_mut(&mut self, backend: BackendId, default: BackendId) -> &mut PropertySet {
        if !self.properties.contains_key(&backend) {
            let derived = self.properties.get(&default).cloned().unwrap_or_default();
            self.properties.insert(backend, derived);
        }
        self.properties.entry(backend).or_default()
    }

    /// Insert `property` into every other backend set that lacks its name.
    fn share_with_other_backends(&mut self, backend: BackendId, property: &SharedProperty) {
        for (id, set) in &mut self.properties {
            if *id != backend && !set.contains(property.name()) {
                set.insert(property.clone());
            }
        }
    }

    /// Children still allocated. Removal state is not checked here, since
    /// that would take the child's lock under this one.
    pub(crate) fn live_children(&mut self) -> Vec<Arc<ModelDescriptor>> {
        self.children.retain(|child| child.strong_count() > 0);
        self.children.iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn link_child(&mut self, child: &Arc<ModelDescriptor>) {
        self.children.push(Arc::downgrade(child));
        if self.lifecycle == Lifecycle::Registered {
            self.lifecycle = Lifecycle::HasSubtypes;
        }
    }
}

/// Runtime metadata of a declared model.
pub struct ModelDescriptor {
    id: ModelId,
    name: String,
    /// Base name fed to naming conventions: the root ancestor's name, so a
    /// hierarchy shares storage.
    storage_base: String,
    default_backend: BackendId,
    catalog: BackendCatalog,
    base_model: Option<Weak<ModelDescriptor>>,
    this: Weak<ModelDescriptor>,
    pub(crate) state: RwLock<DescriptorState>,
}

/// Identity and initial state of a descriptor under construction.
pub(crate) struct DescriptorParts {
    pub(crate) id: ModelId,
    pub(crate) name: String,
    pub(crate) storage_base: String,
    pub(crate) default_backend: BackendId,
    pub(crate) catalog: BackendCatalog,
    pub(crate) base_model: Option<Weak<ModelDescriptor>>,
}

impl ModelDescriptor {
    /// Build a descriptor; `init` fills the state once the descriptor's own
    /// handle is known.
    pub(crate) fn build(
        parts: DescriptorParts,
        init: impl FnOnce(&ModelHandle) -> DescriptorState,
    ) -> Arc<ModelDescriptor> {
        Arc::new_cyclic(|this| {
            let handle = ModelHandle::new(parts.id, parts.name.clone(), this.clone());
            let mut state = init(&handle);
            state.properties.entry(parts.default_backend).or_default();
            state.lifecycle = Lifecycle::Declared;
            ModelDescriptor {
                id: parts.id,
                name: parts.name,
                storage_base: parts.storage_base,
                default_backend: parts.default_backend,
                catalog: parts.catalog,
                base_model: parts.base_model,
                this: this.clone(),
                state: RwLock::new(state),
            }
        })
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage_base(&self) -> &str {
        &self.storage_base
    }

    pub fn default_backend(&self) -> BackendId {
        self.default_backend
    }

    pub fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    /// Non-owning handle to this descriptor.
    pub fn handle(&self) -> ModelHandle {
        ModelHandle::new(self.id, self.name.clone(), self.this.clone())
    }

    /// The parent descriptor, if it is still alive.
    pub fn base_model(&self) -> Option<Arc<ModelDescriptor>> {
        self.base_model.as_ref().and_then(Weak::upgrade)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.read().lifecycle
    }

    pub fn is_removed(&self) -> bool {
        self.lifecycle() == Lifecycle::Removed
    }

    pub(crate) fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.state.write().lifecycle = lifecycle;
    }

    fn removed(&self) -> ModelError {
        ModelError::Removed {
            name: self.name.clone(),
        }
    }

    /// Live subtypes derived directly from this model.
    pub fn children(&self) -> Vec<Arc<ModelDescriptor>> {
        let children = self.state.write().live_children();
        children.into_iter().filter(|child| !child.is_removed()).collect()
    }

    pub(crate) fn remove_child(&self, child: ModelId) {
        let mut state = self.state.write();
        state
            .children
            .retain(|weak| weak.upgrade().is_some_and(|live| live.id != child));
        if state.children.is_empty() && state.lifecycle == Lifecycle::HasSubtypes {
            state.lifecycle = Lifecycle::Registered;
        }
    }

    /// Physical storage name in `backend`, computed once and memoized.
    pub fn storage_name(&self, backend: BackendId) -> ModelResult<String> {
        if let Some(name) = self.state.read().storage_names.get(&backend) {
            return Ok(name.clone());
        }
        let computed = self.catalog.get(backend)?.storage_name(&self.storage_base);
        Ok(self
            .state
            .write()
            .storage_names
            .entry(backend)
            .or_insert(computed)
            .clone())
    }

    /// Property set for `backend`; derived from the default backend's set
    /// the first time it is asked for.
    pub fn properties(&self, backend: BackendId) -> PropertySet {
        if let Some(set) = self.state.read().properties.get(&backend) {
            return set.clone();
        }
        self.state
            .write()
            .properties_mut(backend, self.default_backend)
            .clone()
    }

    pub fn property(&self, backend: BackendId, label: &str) -> ModelResult<SharedProperty> {
        self.properties(backend)
            .find(label)
            .cloned()
            .ok_or_else(|| ModelError::UnknownProperty {
                model: self.name.clone(),
                property: label.to_string(),
            })
    }

    /// Key properties for `backend`.
    pub fn key(&self, backend: BackendId) -> Vec<SharedProperty> {
        self.properties(backend).key()
    }

    /// Field names in declaration order for `backend`.
    pub fn field_names(&self, backend: BackendId) -> ModelResult<Vec<String>> {
        let backend_info = self.catalog.get(backend)?;
        Ok(self
            .properties(backend)
            .iter()
            .map(|property| property.read().field(&backend_info))
            .collect())
    }

    fn intern_member(&self, name: &str) -> ModelResult<(Name, &'static str)> {
        if !is_identifier(name) {
            return Err(invalid_name(name));
        }
        let interner = self.catalog.interner();
        let key = interner.intern(name);
        Ok((key, interner.lookup(key)))
    }

    /// Declare a property on the default backend.
    ///
    /// When the default backend is the process default, the property is
    /// also added to every other backend set lacking that name. Live
    /// subtypes receive their own copy unless they declare the name
    /// themselves. Redeclaring a name replaces the old property; an
    /// incompatible replacement is logged.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %self.name, property = name))]
    pub fn declare_property(
        &self,
        name: &str,
        declared_type: PropertyType,
        options: PropertyOptions,
    ) -> ModelResult<SharedProperty> {
        let (key, label) = self.intern_member(name.strip_suffix('?').unwrap_or(name))?;
        let property = SharedProperty::new(Property::resolve(key, label, self.id, declared_type, options)?);
        let rules = ValidationRule::for_property(&property.read());
        let backend = self.default_backend;

        let children = {
            let mut state = self.state.write();
            if state.lifecycle == Lifecycle::Removed {
                return Err(self.removed());
            }
            let previous = state
                .properties_mut(backend, backend)
                .insert(property.clone());
            if let Some(previous) = previous {
                let old = previous.read();
                if old.is_compatible_with(&property.read()) {
                    tracing::debug!("replaced property");
                } else {
                    tracing::warn!(
                        model = %self.name,
                        property = label,
                        old = %old.declared_type(),
                        new = %declared_type,
                        "property redeclared with an incompatible shape"
                    );
                }
                let old_rules = ValidationRule::for_property(&old);
                drop(old);
                state.validations.retain(|rule| !old_rules.contains(rule));
                for (id, set) in &mut state.properties {
                    if *id != backend && set.get(key).is_some_and(|shared| shared.same(&previous)) {
                        set.insert(property.clone());
                    }
                }
            }
            if backend == self.catalog.default_backend() {
                state.share_with_other_backends(backend, &property);
            }
            state.declared.insert(key);
            state.validations.extend(rules);
            state.live_children()
        };

        for child in children {
            child.inherit_property(backend, &property);
        }
        Ok(property)
    }

    /// Receive a property declared on an ancestor after this model was
    /// derived. Names declared here win.
    fn inherit_property(&self, backend: BackendId, inherited: &SharedProperty) {
        let (copy, children) = {
            let mut state = self.state.write();
            if state.lifecycle == Lifecycle::Removed || state.declared.contains(&inherited.name()) {
                return;
            }
            let copy = inherited.duplicate_for(self.id);
            let previous = state
                .properties_mut(backend, self.default_backend)
                .insert(copy.clone());
            if let Some(previous) = previous {
                let old_rules = ValidationRule::for_property(&previous.read());
                state.validations.retain(|rule| !old_rules.contains(rule));
                for set in state.properties.values_mut() {
                    if set.get(copy.name()).is_some_and(|shared| shared.same(&previous)) {
                        set.insert(copy.clone());
                    }
                }
            }
            if backend == self.catalog.default_backend() {
                state.share_with_other_backends(backend, &copy);
            }
            state
                .validations
                .extend(ValidationRule::for_property(&copy.read()));
            (copy, state.live_children())
        };
        tracing::debug!(model = %self.name, property = copy.label(), "inherited property");
        for child in children {
            child.inherit_property(backend, &copy);
        }
    }

    /// Mutate one property of this model in place.
    pub fn update_property(
        &self,
        backend: BackendId,
        label: &str,
        update: impl FnOnce(&mut Property),
    ) -> ModelResult<()> {
        let property = self.property(backend, label)?;
        update(&mut property.write());
        Ok(())
    }

    fn declare_relationship(
        &self,
        name: &str,
        kind: RelationshipKind,
        other: &ModelDescriptor,
        options: RelationshipOptions,
    ) -> ModelResult<Arc<Relationship>> {
        let (key, label) = self.intern_member(name)?;
        let intern_keys = |names: Option<Vec<String>>| -> ModelResult<Option<KeyNames>> {
            names
                .map(|names| {
                    names
                        .iter()
                        .map(|name| self.intern_member(name).map(|(key, _)| key))
                        .collect::<ModelResult<KeyNames>>()
                })
                .transpose()
        };
        let (child_model, parent_model, max) = match kind {
            RelationshipKind::BelongsTo => (self.handle(), other.handle(), Some(1)),
            RelationshipKind::HasMany => (other.handle(), self.handle(), options.max),
        };
        let relationship = Arc::new(Relationship::new(RelationshipParts {
            name: key,
            label,
            kind,
            backend: self.default_backend,
            child_model,
            parent_model,
            child_key_names: intern_keys(options.child_key)?,
            parent_key_names: intern_keys(options.parent_key)?,
            min: options.min,
            max,
        }));

        let mut state = self.state.write();
        if state.lifecycle == Lifecycle::Removed {
            return Err(self.removed());
        }
        state
            .relationships
            .entry(self.default_backend)
            .or_default()
            .insert(key, Arc::clone(&relationship));
        tracing::debug!(model = %self.name, relationship = label, ?kind, "declared relationship");
        Ok(relationship)
    }

    /// `belongs_to`: this model is the child, `parent` holds the key.
    pub fn belongs_to(
        &self,
        name: &str,
        parent: &ModelDescriptor,
        options: RelationshipOptions,
    ) -> ModelResult<Arc<Relationship>> {
        self.declare_relationship(name, RelationshipKind::BelongsTo, parent, options)
    }

    /// `has n`: this model is the parent of `child`.
    pub fn has_many(
        &self,
        name: &str,
        child: &ModelDescriptor,
        options: RelationshipOptions,
    ) -> ModelResult<Arc<Relationship>> {
        self.declare_relationship(name, RelationshipKind::HasMany, child, options)
    }

    /// Relationships for `backend`, falling back to the default backend's
    /// table, sorted by name.
    pub fn relationships(&self, backend: BackendId) -> Vec<Arc<Relationship>> {
        let state = self.state.read();
        let table = state
            .relationships
            .get(&backend)
            .or_else(|| state.relationships.get(&self.default_backend));
        let mut relationships: Vec<Arc<Relationship>> = table
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default();
        relationships.sort_by_key(|relationship| relationship.label());
        relationships
    }

    /// A relationship with its keys resolved.
    ///
    /// Fails with `UnresolvedRelationship` if the name is unknown for the
    /// backend or its key properties cannot be found.
    pub fn relationship(&self, backend: BackendId, name: &str) -> ModelResult<Arc<Relationship>> {
        let relationship = self
            .relationships(backend)
            .into_iter()
            .find(|relationship| relationship.label() == name)
            .ok_or_else(|| {
                unresolved(
                    &self.name,
                    name,
                    format!("no such relationship in backend `{}'", self.catalog.label(backend)),
                )
            })?;
        relationship.resolve()?;
        Ok(relationship)
    }

    pub fn add_validation(&self, rule: ValidationRule) {
        self.state.write().validations.push(rule);
    }

    pub fn validations(&self) -> Vec<ValidationRule> {
        self.state.read().validations.clone()
    }

    /// Evaluate every validation rule against `record`.
    pub fn validate(&self, record: &Record) -> Vec<ValidationFailure> {
        let rules = self.validations();
        validate(&rules, record)
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("lifecycle", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
