//! Binding slots.
//!
//! A [`BindingSlot`] is one named cell with a storage policy. Slots are shared
//! as [`SlotRef`]; aliasing a global maps a second name to the same `SlotRef`,
//! so slot identity is pointer identity.

use std::sync::Arc;

use garnet_value::{Value, ValueShape};
use parking_lot::RwLock;

use crate::errors::{not_defined, read_only, type_mismatch, BindingResult};
use crate::scope::ScopeChain;
use crate::special::{ComputedRule, ScopedSpecial};
use crate::streams::StandardStreams;
use crate::thread::ThreadSpecials;

/// Shared handle to a slot.
pub type SlotRef = Arc<BindingSlot>;

/// Where a slot came from. Only `User` slots are dropped by
/// `reset_user_globals`; `Builtin` slots are re-installed fresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotOrigin {
    Builtin,
    Host,
    User,
}

/// Storage kind, as reported for introspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Global,
    ScopeRelative,
    Computed,
    ReadOnly,
}

/// Backing storage of a slot.
pub enum SlotStorage {
    /// Process-wide mutable cell; `None` until first assignment.
    Global {
        cell: RwLock<Option<Value>>,
        constraint: Option<ValueShape>,
    },
    /// Fixed at definition.
    ReadOnly(Value),
    /// Resolved against the caller's scope chain.
    ScopeRelative(ScopedSpecial),
    /// No stored value; every access runs the rule.
    Computed(ComputedRule),
}

/// Everything a slot may consult while being read or written.
///
/// Built per access by `ExecutionState::context`; never held across a
/// registry lock.
pub struct SlotContext<'a> {
    pub streams: &'a StandardStreams,
    pub thread: &'a mut ThreadSpecials,
    pub scope: &'a ScopeChain,
}

/// A named binding with its storage policy.
pub struct BindingSlot {
    label: String,
    origin: SlotOrigin,
    storage: SlotStorage,
}

impl BindingSlot {
    fn with_storage(label: impl Into<String>, storage: SlotStorage) -> Self {
        BindingSlot {
            label: label.into(),
            origin: SlotOrigin::User,
            storage,
        }
    }

    /// Mutable global; `None` leaves it undefined until the first write.
    pub fn global(label: impl Into<String>, initial: Option<Value>) -> Self {
        Self::with_storage(
            label,
            SlotStorage::Global {
                cell: RwLock::new(initial),
                constraint: None,
            },
        )
    }

    /// Mutable global whose writes must match `constraint`.
    pub fn constrained(label: impl Into<String>, constraint: ValueShape, initial: Option<Value>) -> Self {
        Self::with_storage(
            label,
            SlotStorage::Global {
                cell: RwLock::new(initial),
                constraint: Some(constraint),
            },
        )
    }

    pub fn read_only(label: impl Into<String>, value: Value) -> Self {
        Self::with_storage(label, SlotStorage::ReadOnly(value))
    }

    pub fn scope_relative(label: impl Into<String>, special: ScopedSpecial) -> Self {
        Self::with_storage(label, SlotStorage::ScopeRelative(special))
    }

    pub fn computed(label: impl Into<String>, rule: ComputedRule) -> Self {
        Self::with_storage(label, SlotStorage::Computed(rule))
    }

    #[must_use]
    pub fn with_origin(mut self, origin: SlotOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Wrap in a shareable handle.
    pub fn shared(self) -> SlotRef {
        Arc::new(self)
    }

    /// Name the slot was created under, without sigil.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn origin(&self) -> SlotOrigin {
        self.origin
    }

    pub fn storage(&self) -> &SlotStorage {
        &self.storage
    }

    pub fn storage_kind(&self) -> StorageKind {
        match self.storage {
            SlotStorage::Global { .. } => StorageKind::Global,
            SlotStorage::ReadOnly(_) => StorageKind::ReadOnly,
            SlotStorage::ScopeRelative(_) => StorageKind::ScopeRelative,
            SlotStorage::Computed(_) => StorageKind::Computed,
        }
    }

    /// Type constraint of a global slot.
    pub fn type_constraint(&self) -> Option<ValueShape> {
        match self.storage {
            SlotStorage::Global { constraint, .. } => constraint,
            _ => None,
        }
    }

    /// Read the slot. Fails with `NotDefined` when `is_defined` is false.
    pub fn get(&self, cx: &SlotContext<'_>) -> BindingResult<Value> {
        match &self.storage {
            SlotStorage::Global { cell, .. } => cell.read().clone().ok_or_else(|| not_defined(&self.label)),
            SlotStorage::ReadOnly(value) => Ok(value.clone()),
            SlotStorage::ScopeRelative(special) => special
                .get(cx.scope)
                .ok_or_else(|| not_defined(&self.label)),
            SlotStorage::Computed(rule) => {
                if rule.is_defined(cx) {
                    Ok(rule.get(cx))
                } else {
                    Err(not_defined(&self.label))
                }
            }
        }
    }

    /// Write the slot. Computed rules may have side effects beyond storage.
    pub fn set(&self, cx: &mut SlotContext<'_>, value: Value) -> BindingResult<()> {
        match &self.storage {
            SlotStorage::Global { cell, constraint } => {
                if let Some(constraint) = constraint {
                    if !constraint.contains(value.shape()) {
                        return Err(type_mismatch(&self.label, constraint.describe(), value.type_name()));
                    }
                }
                *cell.write() = Some(value);
                Ok(())
            }
            SlotStorage::ReadOnly(_) => Err(read_only(&self.label)),
            SlotStorage::ScopeRelative(special) => special.set(&self.label, cx.scope, value),
            SlotStorage::Computed(rule) => rule.set(&self.label, cx, value),
        }
    }

    pub fn is_defined(&self, cx: &SlotContext<'_>) -> bool {
        match &self.storage {
            SlotStorage::Global { cell, .. } => cell.read().is_some(),
            SlotStorage::ReadOnly(_) => true,
            SlotStorage::ScopeRelative(special) => special.is_defined(cx.scope),
            SlotStorage::Computed(rule) => rule.is_defined(cx),
        }
    }

    /// Whether introspection lists this slot at all.
    pub fn is_enumerated(&self) -> bool {
        match &self.storage {
            SlotStorage::ScopeRelative(special) => special.is_enumerated(),
            _ => true,
        }
    }
}

impl std::fmt::Debug for BindingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingSlot")
            .field("label", &self.label)
            .field("origin", &self.origin)
            .field("kind", &self.storage_kind())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
