//! Deriving a subtype from a live model.
//!
//! The subtype receives, in this order:
//!
//! 1. a copy of the parent's memoized storage names;
//! 2. fresh property sets holding duplicates of the parent's properties
//!    (one duplicate per parent property, shared across the subtype's
//!    backends exactly as the originals were shared across the parent's);
//! 3. a weak `base_model` reference to the parent;
//! 4. duplicates of the parent's relationships, with references to the
//!    parent repointed to the subtype.
//!
//! Properties come before relationships because duplicated relationships
//! resolve their keys against the subtype's own properties. Registration is
//! left to the `ModelRegistry`, which only publishes a fully built subtype.
//!
//! The parent's state lock is held from the snapshot until the subtype is
//! linked as a child. A declaration on the parent either lands before the
//! snapshot or finds the subtype among the children and propagates to it.
//! No other descriptor lock is taken meanwhile: the subtype is not shared yet.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::descriptor::{DescriptorParts, DescriptorState, Lifecycle, ModelDescriptor, ModelId};
use crate::errors::{ModelError, ModelResult};
use crate::property::{PropertySet, SharedProperty};

#[tracing::instrument(level = "debug", skip_all, fields(parent = %parent.name(), subtype = %name))]
pub(crate) fn derive_subtype(
    parent: &Arc<ModelDescriptor>,
    id: ModelId,
    name: String,
) -> ModelResult<Arc<ModelDescriptor>> {
    let mut state = parent.state.write();
    if state.lifecycle == Lifecycle::Removed {
        return Err(ModelError::Removed {
            name: parent.name().to_string(),
        });
    }
    let parent_id = parent.id();

    let parts = DescriptorParts {
        id,
        name,
        storage_base: parent.storage_base().to_string(),
        default_backend: parent.default_backend(),
        catalog: parent.catalog().clone(),
        base_model: Some(Arc::downgrade(parent)),
    };

    let subtype = ModelDescriptor::build(parts, |handle| {
        let mut fresh_state = DescriptorState {
            storage_names: state.storage_names.clone(),
            validations: state.validations.clone(),
            ..DescriptorState::default()
        };

        let mut copies: FxHashMap<usize, SharedProperty> = FxHashMap::default();
        for (backend, set) in &state.properties {
            let mut fresh = PropertySet::new();
            for property in set.iter() {
                let copy = copies
                    .entry(property.identity())
                    .or_insert_with(|| property.duplicate_for(id))
                    .clone();
                fresh.insert(copy);
            }
            fresh_state.properties.insert(*backend, fresh);
        }

        for (backend, table) in &state.relationships {
            let duplicated = table
                .iter()
                .map(|(name, relationship)| (*name, Arc::new(relationship.duplicate_for(parent_id, handle))))
                .collect();
            fresh_state.relationships.insert(*backend, duplicated);
        }
        fresh_state
    });
    state.link_child(&subtype);
    drop(state);

    tracing::debug!(
        properties = subtype.properties(subtype.default_backend()).len(),
        "derived subtype"
    );
    Ok(subtype)
}
