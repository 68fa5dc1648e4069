//! Process-wide binding registry.
//!
//! Maps interned names to [`SlotRef`]s. The map sits behind one
//! `parking_lot::RwLock`; slot reads and writes happen after the lock is
//! released, so computed rules never run under it.

use std::sync::Arc;

use garnet_ir::ident::{is_global_name, strip_sigil};
use garnet_ir::{Name, SharedInterner};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use rustc_hash::FxHashMap;

use crate::errors::{BindingError, BindingResult};
use crate::slot::{BindingSlot, SlotContext, SlotOrigin, SlotRef};
use crate::special::{builtin_slots, BuiltinGlobals};

/// Name → slot table shared by every thread.
pub struct BindingRegistry {
    interner: SharedInterner,
    slots: RwLock<FxHashMap<Name, SlotRef>>,
    builtins: Option<BuiltinGlobals>,
}

impl BindingRegistry {
    /// An empty registry with no built-in specials.
    pub fn new(interner: SharedInterner) -> Self {
        BindingRegistry {
            interner,
            slots: RwLock::new(FxHashMap::default()),
            builtins: None,
        }
    }

    /// A registry with every built-in special installed.
    pub fn with_builtins(interner: SharedInterner, builtins: BuiltinGlobals) -> Self {
        let registry = BindingRegistry {
            interner,
            slots: RwLock::new(FxHashMap::default()),
            builtins: Some(builtins),
        };
        registry.install_builtins(&mut registry.slots.write());
        registry
    }

    fn install_builtins(&self, slots: &mut FxHashMap<Name, SlotRef>) {
        let Some(config) = &self.builtins else {
            return;
        };
        for entry in builtin_slots(config) {
            for &label in entry.names {
                slots.insert(self.interner.intern(label), Arc::clone(&entry.slot));
            }
        }
        tracing::debug!(count = slots.len(), "installed builtin globals");
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Validate and intern a global name; a leading `$` is ignored.
    pub fn intern_name(&self, name: &str) -> BindingResult<Name> {
        let bare = strip_sigil(name);
        if !is_global_name(bare) {
            return Err(BindingError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.interner.intern(bare))
    }

    /// Name already known to the interner, without interning.
    pub fn known_name(&self, name: &str) -> Option<Name> {
        self.interner.get(strip_sigil(name))
    }

    /// Insert or replace the slot for `name`.
    pub fn define(&self, name: &str, slot: SlotRef) -> BindingResult<Name> {
        let key = self.intern_name(name)?;
        let kind = slot.storage_kind();
        let previous = self.slots.write().insert(key, slot);
        if previous.is_some() {
            tracing::debug!(name = strip_sigil(name), ?kind, "replaced global slot");
        } else {
            tracing::debug!(name = strip_sigil(name), ?kind, "defined global slot");
        }
        Ok(key)
    }

    /// O(1) lookup; never creates a slot.
    pub fn lookup(&self, name: Name) -> Option<SlotRef> {
        self.slots.read().get(&name).cloned()
    }

    /// Lookup by string, without interning unknown names.
    pub fn lookup_str(&self, name: &str) -> Option<SlotRef> {
        self.known_name(name).and_then(|key| self.lookup(key))
    }

    /// The slot for `name`, creating an undefined user global if missing.
    pub fn resolve_or_create_user_global(&self, name: &str) -> BindingResult<SlotRef> {
        let key = self.intern_name(name)?;
        Ok(self.resolve_or_create(key))
    }

    pub(crate) fn resolve_or_create(&self, key: Name) -> SlotRef {
        let slots = self.slots.upgradable_read();
        if let Some(slot) = slots.get(&key) {
            return Arc::clone(slot);
        }
        let mut slots = RwLockUpgradableReadGuard::upgrade(slots);
        let label = self.interner.lookup(key);
        Arc::clone(slots.entry(key).or_insert_with(|| {
            tracing::trace!(name = label, "created user global");
            BindingSlot::global(label, None).shared()
        }))
    }

    /// Map `new` to the slot of `old`. A missing `old` is created as an
    /// undefined user global first, so both names share one slot.
    pub fn alias(&self, new: &str, old: &str) -> BindingResult<SlotRef> {
        let new_key = self.intern_name(new)?;
        let old_key = self.intern_name(old)?;
        let slot = self.resolve_or_create(old_key);
        self.slots.write().insert(new_key, Arc::clone(&slot));
        tracing::debug!(new = strip_sigil(new), old = strip_sigil(old), "aliased global");
        Ok(slot)
    }

    /// Remove `name`; other aliases of its slot are unaffected.
    pub fn delete(&self, name: &str) -> bool {
        let Some(key) = self.known_name(name) else {
            return false;
        };
        self.slots.write().remove(&key).is_some()
    }

    /// Names whose slot is enumerated and currently defined.
    ///
    /// Takes a snapshot under the lock and evaluates slots after releasing it.
    pub fn enumerate_defined(&self, cx: &SlotContext<'_>) -> Vec<&'static str> {
        let snapshot: Vec<(Name, SlotRef)> = self
            .slots
            .read()
            .iter()
            .map(|(name, slot)| (*name, Arc::clone(slot)))
            .collect();
        let mut names: Vec<&'static str> = snapshot
            .into_iter()
            .filter(|(_, slot)| slot.is_enumerated() && slot.is_defined(cx))
            .map(|(name, _)| self.interner.lookup(name))
            .collect();
        names.sort_unstable();
        names
    }

    /// Drop every user slot and re-install the built-ins with their initial
    /// values. Host slots are kept.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn reset_user_globals(&self) {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, slot| slot.origin() == SlotOrigin::Host);
        self.install_builtins(&mut slots);
        tracing::debug!(before, after = slots.len(), "reset globals");
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("slots", &self.len())
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
