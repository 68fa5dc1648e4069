//! The live set of model descriptors.
//!
//! Registration and removal are serialised by one `RwLock`. A descriptor is
//! visible from the moment it is fully built until it is removed; bulk
//! operations see exactly that membership.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::backend::{BackendCatalog, BackendId};
use crate::descriptor::{is_model_name, DescriptorParts, Lifecycle, ModelDescriptor, ModelId};
use crate::errors::{invalid_name, ModelError, ModelResult};
use crate::inherit::derive_subtype;

#[derive(Default)]
struct RegistryState {
    models: FxHashMap<ModelId, Arc<ModelDescriptor>>,
    /// Language-level name binding.
    names: FxHashMap<String, ModelId>,
}

/// One storage target of the storage plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoragePlanEntry {
    pub storage_name: String,
    /// Live models stored here, sorted.
    pub models: Vec<String>,
    /// Union of the models' fields in first-seen order.
    pub fields: Vec<String>,
}

/// Process-wide registry of live models.
pub struct ModelRegistry {
    catalog: BackendCatalog,
    next_id: AtomicU32,
    state: RwLock<RegistryState>,
}

impl ModelRegistry {
    pub fn new(catalog: BackendCatalog) -> Self {
        ModelRegistry {
            catalog,
            next_id: AtomicU32::new(1),
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    fn allocate_id(&self) -> ModelId {
        ModelId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn check_name(state: &RegistryState, name: &str) -> ModelResult<()> {
        if !is_model_name(name) {
            return Err(invalid_name(name));
        }
        if state.names.contains_key(name) {
            return Err(ModelError::DuplicateRegistration {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn publish(state: &mut RegistryState, descriptor: &Arc<ModelDescriptor>) {
        state
            .models
            .insert(descriptor.id(), Arc::clone(descriptor));
        state
            .names
            .insert(descriptor.name().to_string(), descriptor.id());
        descriptor.set_lifecycle(Lifecycle::Registered);
        tracing::debug!(model = descriptor.name(), id = descriptor.id().raw(), "registered model");
    }

    /// Declare a model on the default backend and register it.
    ///
    /// A name bound to a live model is rejected with `DuplicateRegistration`.
    pub fn declare(&self, name: &str) -> ModelResult<Arc<ModelDescriptor>> {
        self.declare_in(name, self.catalog.default_backend())
    }

    /// Declare a model whose default backend is `backend`.
    pub fn declare_in(&self, name: &str, backend: BackendId) -> ModelResult<Arc<ModelDescriptor>> {
        self.catalog.get(backend)?;
        let mut state = self.state.write();
        Self::check_name(&state, name)?;
        let descriptor = ModelDescriptor::build(
            DescriptorParts {
                id: self.allocate_id(),
                name: name.to_string(),
                storage_base: name.to_string(),
                default_backend: backend,
                catalog: self.catalog.clone(),
                base_model: None,
            },
            |_| Default::default(),
        );
        Self::publish(&mut state, &descriptor);
        Ok(descriptor)
    }

    /// Derive `name` from `parent` and register it. Either the subtype is
    /// fully built and registered, or nothing is.
    #[tracing::instrument(level = "debug", skip_all, fields(subtype = name, parent = %parent.name()))]
    pub fn derive(&self, name: &str, parent: &Arc<ModelDescriptor>) -> ModelResult<Arc<ModelDescriptor>> {
        let mut state = self.state.write();
        Self::check_name(&state, name)?;
        let registered = state
            .models
            .get(&parent.id())
            .is_some_and(|live| Arc::ptr_eq(live, parent));
        if !registered {
            return Err(ModelError::Removed {
                name: parent.name().to_string(),
            });
        }
        let subtype = derive_subtype(parent, self.allocate_id(), name.to_string())?;
        Self::publish(&mut state, &subtype);
        Ok(subtype)
    }

    /// Remove a descriptor and its name binding. Returns `false` if it was
    /// not live.
    ///
    /// The descriptor is detached from its parent's children, so later
    /// parent declarations no longer reach it. Its own subtypes stay
    /// registered; removing a model with live subtypes is logged.
    pub fn remove(&self, descriptor: &ModelDescriptor) -> bool {
        let mut state = self.state.write();
        let id = descriptor.id();
        if state.models.remove(&id).is_none() {
            return false;
        }
        if state.names.get(descriptor.name()) == Some(&id) {
            state.names.remove(descriptor.name());
        }
        Self::retire(descriptor);
        true
    }

    fn retire(descriptor: &ModelDescriptor) {
        let children = descriptor.children();
        if !children.is_empty() {
            tracing::warn!(
                model = descriptor.name(),
                subtypes = children.len(),
                "removing a model with live subtypes"
            );
        }
        if let Some(parent) = descriptor.base_model() {
            parent.remove_child(descriptor.id());
        }
        descriptor.set_lifecycle(Lifecycle::Removed);
        tracing::debug!(model = descriptor.name(), "removed model");
    }

    /// Remove every model. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.state.write();
        let models: Vec<Arc<ModelDescriptor>> = state.models.drain().map(|(_, model)| model).collect();
        state.names.clear();
        for model in &models {
            model.set_lifecycle(Lifecycle::Removed);
        }
        tracing::debug!(count = models.len(), "cleared model registry");
        models.len()
    }

    /// Exactly the descriptors declared and not yet removed, by id.
    pub fn enumerate_live(&self) -> Vec<Arc<ModelDescriptor>> {
        let mut live: Vec<Arc<ModelDescriptor>> = self.state.read().models.values().cloned().collect();
        live.sort_by_key(|model| model.id());
        live
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<ModelDescriptor>> {
        let state = self.state.read();
        state
            .names
            .get(name)
            .and_then(|id| state.models.get(id))
            .cloned()
    }

    pub fn get(&self, id: ModelId) -> Option<Arc<ModelDescriptor>> {
        self.state.read().models.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().models.is_empty()
    }

    /// Storage targets of every live model for `backend`, one entry per
    /// distinct storage name, sorted by storage name.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn storage_plan(&self, backend: BackendId) -> ModelResult<Vec<StoragePlanEntry>> {
        let mut plan: FxHashMap<String, StoragePlanEntry> = FxHashMap::default();
        for model in self.enumerate_live() {
            let storage_name = model.storage_name(backend)?;
            let fields = model.field_names(backend)?;
            let entry = plan
                .entry(storage_name.clone())
                .or_insert_with(|| StoragePlanEntry {
                    storage_name,
                    models: Vec::new(),
                    fields: Vec::new(),
                });
            entry.models.push(model.name().to_string());
            for field in fields {
                if !entry.fields.contains(&field) {
                    entry.fields.push(field);
                }
            }
        }
        let mut entries: Vec<StoragePlanEntry> = plan.into_values().collect();
        for entry in &mut entries {
            entry.models.sort();
        }
        entries.sort_by(|a, b| a.storage_name.cmp(&b.storage_name));
        Ok(entries)
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
