//! Global variable access for the running program.
//!
//! [`Globals`] ties the binding registry to the standard streams and resolves
//! names through the caller's scope chain first.

use garnet_ir::ident::strip_sigil;
use garnet_ir::SharedInterner;
use garnet_value::Value;

use crate::errors::{not_defined, BindingResult};
use crate::registry::BindingRegistry;
use crate::scope::Binding;
use crate::slot::{BindingSlot, SlotContext, SlotOrigin, SlotRef};
use crate::special::BuiltinGlobals;
use crate::streams::StandardStreams;
use crate::thread::ExecutionState;

impl Binding {
    pub fn get(&self, cx: &SlotContext<'_>) -> BindingResult<Value> {
        match self {
            Binding::Scoped(cell) => Ok(cell.get()),
            Binding::Global(slot) => slot.get(cx),
        }
    }

    pub fn set(&self, cx: &mut SlotContext<'_>, value: Value) -> BindingResult<()> {
        match self {
            Binding::Scoped(cell) => cell.set(value),
            Binding::Global(slot) => slot.set(cx, value),
        }
    }

    pub fn is_defined(&self, cx: &SlotContext<'_>) -> bool {
        match self {
            Binding::Scoped(_) => true,
            Binding::Global(slot) => slot.is_defined(cx),
        }
    }
}

/// Process-wide globals: registry plus standard streams.
///
/// Shared across threads; each thread brings its own [`ExecutionState`].
#[derive(Debug)]
pub struct Globals {
    interner: SharedInterner,
    registry: BindingRegistry,
    streams: StandardStreams,
}

impl Globals {
    pub fn new(interner: SharedInterner, builtins: BuiltinGlobals) -> Self {
        Self::with_streams(interner, builtins, StandardStreams::new())
    }

    pub fn with_streams(interner: SharedInterner, builtins: BuiltinGlobals, streams: StandardStreams) -> Self {
        Globals {
            registry: BindingRegistry::with_builtins(interner.clone(), builtins),
            interner,
            streams,
        }
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn streams(&self) -> &StandardStreams {
        &self.streams
    }

    /// Fresh per-thread state.
    pub fn new_thread(&self) -> ExecutionState {
        ExecutionState::new(self.interner.clone())
    }

    fn resolve(&self, state: &ExecutionState, name: &str) -> Option<Binding> {
        let key = self.registry.known_name(name)?;
        state.chain.resolve_scoped(key, &self.registry)
    }

    /// Read `name`. Fails with `NotDefined` for unknown or unset globals.
    pub fn get(&self, state: &mut ExecutionState, name: &str) -> BindingResult<Value> {
        let binding = self.resolve(state, name).ok_or_else(|| not_defined(strip_sigil(name)))?;
        binding.get(&state.context(&self.streams))
    }

    /// Read `name` the way the language does: unset globals read as nil.
    pub fn read(&self, state: &mut ExecutionState, name: &str) -> BindingResult<Value> {
        match self.get(state, name) {
            Err(err) if err.is_not_defined() => Ok(Value::Nil),
            other => other,
        }
    }

    /// Assign `name`, creating a user global if nothing resolves it.
    pub fn set(&self, state: &mut ExecutionState, name: &str, value: Value) -> BindingResult<()> {
        let key = self.registry.intern_name(name)?;
        let binding = match state.chain.resolve_scoped(key, &self.registry) {
            Some(binding) => binding,
            None => Binding::Global(self.registry.resolve_or_create(key)),
        };
        binding.set(&mut state.context(&self.streams), value)
    }

    pub fn is_defined(&self, state: &mut ExecutionState, name: &str) -> bool {
        self.resolve(state, name)
            .is_some_and(|binding| binding.is_defined(&state.context(&self.streams)))
    }

    /// Define (or redefine) a mutable user global holding `value`.
    pub fn define_global(&self, name: &str, value: Value) -> BindingResult<SlotRef> {
        self.define_slot(name, BindingSlot::global(strip_sigil(name), Some(value)))
    }

    /// Define (or redefine) a read-only global.
    pub fn define_read_only(&self, name: &str, value: Value) -> BindingResult<SlotRef> {
        self.define_slot(name, BindingSlot::read_only(strip_sigil(name), value))
    }

    /// Register a host-provided slot; host slots survive `reset_user_globals`.
    pub fn define_host(&self, name: &str, slot: BindingSlot) -> BindingResult<SlotRef> {
        self.define_slot(name, slot.with_origin(SlotOrigin::Host))
    }

    pub fn define_slot(&self, name: &str, slot: BindingSlot) -> BindingResult<SlotRef> {
        let slot = slot.shared();
        self.registry.define(name, SlotRef::clone(&slot))?;
        Ok(slot)
    }

    pub fn alias(&self, new: &str, old: &str) -> BindingResult<SlotRef> {
        self.registry.alias(new, old)
    }

    pub fn delete(&self, name: &str) -> bool {
        self.registry.delete(name)
    }

    /// Names of enumerated, currently defined globals, sorted.
    pub fn enumerate_defined(&self, state: &mut ExecutionState) -> Vec<&'static str> {
        self.registry.enumerate_defined(&state.context(&self.streams))
    }

    /// Restore the pristine process state: built-ins re-installed, user
    /// globals dropped, standard streams rebound.
    pub fn reset_user_globals(&self) {
        self.registry.reset_user_globals();
        self.streams.reset();
    }

    /// Read one record from `$stdin` using `$/`, storing it in `$_`.
    pub fn gets(&self, state: &mut ExecutionState) -> BindingResult<Value> {
        let separator = self.read(state, "/")?;
        let stdin = self.streams.stdin();
        let line = Value::from_opt_str(stdin.read_record(separator.as_str()).as_deref());
        self.set(state, "_", line.clone())?;
        Ok(line)
    }

    /// Write `values` to `$stdout`, joined by `$,` and followed by `$\`.
    pub fn print(&self, state: &mut ExecutionState, values: &[Value]) -> BindingResult<()> {
        let field_separator = self.read(state, ",")?;
        let record_separator = self.read(state, "\\")?;
        let mut text = values
            .iter()
            .map(Value::to_display_string)
            .collect::<Vec<_>>()
            .join(field_separator.as_str().unwrap_or_default());
        if let Some(terminator) = record_separator.as_str() {
            text.push_str(terminator);
        }
        self.streams.write_output(&text);
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
