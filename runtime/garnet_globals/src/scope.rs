//! Scope chain for scope-relative bindings.
//!
//! Each thread owns one [`ScopeChain`]: a stack of frames linked to their
//! lexical parents. Closure frames (top-level, method and module bodies)
//! own the scope-relative specials `$~` and `$_`; block frames own nothing
//! unless a binding is declared on them and defer to their parent.
//!
//! Frames are `Rc`-based, so a chain can never leave its thread.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use garnet_ir::{Name, SharedInterner};
use garnet_value::{Value, ValueShape};
use rustc_hash::FxHashMap;

use crate::errors::{not_defined, type_mismatch, BindingError, BindingResult};
use crate::registry::BindingRegistry;
use crate::slot::SlotRef;

/// A single-threaded shared frame handle.
///
/// All frame allocations go through [`LocalScope::new`].
#[repr(transparent)]
pub struct LocalScope<T>(Rc<RefCell<T>>);

impl<T> LocalScope<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        LocalScope(Rc::new(RefCell::new(value)))
    }

    #[inline]
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// `true` if both handles refer to the same frame.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for LocalScope<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalScope(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalScope").field(&self.0).finish()
    }
}

/// What kind of lexical scope a frame represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    TopLevel,
    Method,
    Module,
    /// Block or lambda body; shares its parent's specials.
    Block,
}

impl FrameKind {
    /// Closure frames own their own `$~` and `$_`.
    #[inline]
    pub fn owns_specials(self) -> bool {
        !matches!(self, FrameKind::Block)
    }
}

/// A scope-relative value with an optional shape constraint.
#[derive(Clone, Debug)]
struct ScopedValue {
    value: Value,
    constraint: Option<ValueShape>,
}

/// One lexical frame.
#[derive(Debug)]
pub struct Frame {
    id: u64,
    kind: FrameKind,
    cells: FxHashMap<Name, ScopedValue>,
    parent: Option<LocalScope<Frame>>,
}

impl Frame {
    fn new(id: u64, kind: FrameKind, parent: Option<LocalScope<Frame>>, specials: &SpecialNames) -> Self {
        let mut cells = FxHashMap::default();
        if kind.owns_specials() {
            cells.insert(
                specials.current_match,
                ScopedValue {
                    value: Value::Nil,
                    constraint: Some(ValueShape::MATCH | ValueShape::NIL),
                },
            );
            cells.insert(
                specials.last_read_line,
                ScopedValue {
                    value: Value::Nil,
                    constraint: None,
                },
            );
        }
        Frame {
            id,
            kind,
            cells,
            parent,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// `true` if this frame owns a cell for `name`.
    pub fn owns(&self, name: Name) -> bool {
        self.cells.contains_key(&name)
    }
}

/// Names of the scope-relative specials seeded into closure frames.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpecialNames {
    pub(crate) current_match: Name,
    pub(crate) last_read_line: Name,
}

impl SpecialNames {
    pub(crate) fn new(interner: &SharedInterner) -> Self {
        SpecialNames {
            current_match: interner.intern("~"),
            last_read_line: interner.intern("_"),
        }
    }
}

/// Handle to a pushed frame, consumed by [`ScopeChain::pop_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "a pushed frame must be popped with its handle"]
pub struct FrameHandle {
    id: u64,
}

impl FrameHandle {
    pub fn id(self) -> u64 {
        self.id
    }
}

/// A frame chain captured at closure creation.
///
/// Invoking the closure later with [`ScopeChain::push_closure_frame`]
/// resolves scope-relative bindings against this chain, not the caller's.
#[derive(Clone, Debug)]
pub struct CapturedScope(LocalScope<Frame>);

/// A scope-relative cell owned by a specific frame.
#[derive(Clone, Debug)]
pub struct ScopedCell {
    frame: LocalScope<Frame>,
    name: Name,
    label: &'static str,
}

impl ScopedCell {
    pub fn name(&self) -> Name {
        self.name
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Id of the owning frame.
    pub fn frame_id(&self) -> u64 {
        self.frame.borrow().id
    }

    pub fn get(&self) -> Value {
        self.frame
            .borrow()
            .cells
            .get(&self.name)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    }

    pub fn set(&self, value: Value) -> BindingResult<()> {
        let mut frame = self.frame.borrow_mut();
        let Some(cell) = frame.cells.get_mut(&self.name) else {
            // cells are never removed from a live frame
            return Err(not_defined(self.label));
        };
        if let Some(constraint) = cell.constraint {
            if !constraint.contains(value.shape()) {
                return Err(type_mismatch(self.label, constraint.describe(), value.type_name()));
            }
        }
        cell.value = value;
        Ok(())
    }

    /// `true` if both cells are the same binding in the same frame.
    pub fn same(&self, other: &ScopedCell) -> bool {
        self.name == other.name && self.frame.ptr_eq(&other.frame)
    }
}

/// Result of resolving a name through the scope chain.
#[derive(Clone, Debug)]
pub enum Binding {
    /// Owned by a frame in the chain.
    Scoped(ScopedCell),
    /// Fell through to the binding registry.
    Global(SlotRef),
}

/// Per-thread stack of lexical frames.
///
/// The bottom frame is a top-level frame that is never popped.
pub struct ScopeChain {
    stack: Vec<LocalScope<Frame>>,
    next_id: u64,
    specials: SpecialNames,
    interner: SharedInterner,
}

impl ScopeChain {
    /// Create a chain holding only the top-level frame.
    pub fn new(interner: SharedInterner) -> Self {
        let specials = SpecialNames::new(&interner);
        let root = LocalScope::new(Frame::new(0, FrameKind::TopLevel, None, &specials));
        ScopeChain {
            stack: vec![root],
            next_id: 1,
            specials,
            interner,
        }
    }

    /// Number of frames on the stack, including the top-level frame.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn innermost(&self) -> &LocalScope<Frame> {
        // the root frame is never popped
        &self.stack[self.stack.len() - 1]
    }

    pub fn innermost_kind(&self) -> FrameKind {
        self.innermost().borrow().kind
    }

    fn allocate(&mut self, kind: FrameKind, parent: LocalScope<Frame>) -> FrameHandle {
        let id = self.next_id;
        self.next_id += 1;
        let frame = LocalScope::new(Frame::new(id, kind, Some(parent), &self.specials));
        self.stack.push(frame);
        tracing::trace!(frame = id, ?kind, depth = self.stack.len(), "push frame");
        FrameHandle { id }
    }

    /// Enter a nested scope whose lexical parent is the current innermost frame.
    pub fn push_frame(&mut self, kind: FrameKind) -> FrameHandle {
        let parent = self.innermost().clone();
        self.allocate(kind, parent)
    }

    /// Enter a block frame whose lexical parent is the captured chain.
    pub fn push_closure_frame(&mut self, captured: &CapturedScope) -> FrameHandle {
        self.allocate(FrameKind::Block, captured.0.clone())
    }

    /// Leave the innermost frame. Fails unless `handle` is that frame.
    pub fn pop_frame(&mut self, handle: FrameHandle) -> BindingResult<()> {
        let innermost = self.innermost().borrow().id;
        if self.stack.len() == 1 || innermost != handle.id {
            return Err(BindingError::FrameMismatch {
                expected: innermost,
                got: handle.id,
            });
        }
        self.stack.pop();
        tracing::trace!(frame = handle.id, depth = self.stack.len(), "pop frame");
        Ok(())
    }

    /// Push a frame that is popped when the guard drops.
    pub fn scoped(&mut self, kind: FrameKind) -> FrameGuard<'_> {
        let handle = self.push_frame(kind);
        FrameGuard {
            chain: self,
            handle,
        }
    }

    /// Run `f` inside a fresh frame of `kind`.
    pub fn with_frame<T>(&mut self, kind: FrameKind, f: impl FnOnce(&mut ScopeChain) -> T) -> T {
        let mut guard = self.scoped(kind);
        f(&mut guard)
    }

    /// Capture the current innermost frame for a closure.
    pub fn capture(&self) -> CapturedScope {
        CapturedScope(self.innermost().clone())
    }

    /// Declare a scope-relative binding on the innermost frame.
    ///
    /// Redeclaring keeps the current value but replaces the constraint.
    pub fn declare_scoped(&mut self, name: Name, constraint: Option<ValueShape>) {
        let mut frame = self.innermost().borrow_mut();
        frame
            .cells
            .entry(name)
            .and_modify(|cell| cell.constraint = constraint)
            .or_insert(ScopedValue {
                value: Value::Nil,
                constraint,
            });
    }

    /// Innermost frame in the lexical chain that owns `name`.
    pub fn owner_of(&self, name: Name) -> Option<ScopedCell> {
        let mut current = Some(self.innermost().clone());
        while let Some(frame) = current {
            if frame.borrow().owns(name) {
                return Some(ScopedCell {
                    frame,
                    name,
                    label: self.interner.lookup(name),
                });
            }
            current = frame.borrow().parent.clone();
        }
        None
    }

    /// Resolve `name`: the innermost owning frame wins, otherwise the registry.
    pub fn resolve_scoped(&self, name: Name, registry: &BindingRegistry) -> Option<Binding> {
        self.owner_of(name)
            .map(Binding::Scoped)
            .or_else(|| registry.lookup(name).map(Binding::Global))
    }

    /// Current `$~` as seen from the innermost frame.
    pub fn current_match(&self) -> Option<ScopedCell> {
        self.owner_of(self.specials.current_match)
    }

    /// Current `$_` as seen from the innermost frame.
    pub fn last_read_line(&self) -> Option<ScopedCell> {
        self.owner_of(self.specials.last_read_line)
    }
}

impl fmt::Debug for ScopeChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeChain")
            .field("depth", &self.stack.len())
            .field("innermost", &self.innermost().borrow().id)
            .finish()
    }
}

/// RAII guard that pops its frame on drop, even during unwinding.
pub struct FrameGuard<'chain> {
    chain: &'chain mut ScopeChain,
    handle: FrameHandle,
}

impl FrameGuard<'_> {
    pub fn handle(&self) -> FrameHandle {
        self.handle
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        // Frames pushed through the guard must have been popped by the guard's
        // own nested guards first; anything else is a programming error.
        if let Err(err) = self.chain.pop_frame(self.handle) {
            tracing::error!(%err, "frame guard released out of order");
        }
    }
}

impl Deref for FrameGuard<'_> {
    type Target = ScopeChain;

    fn deref(&self) -> &ScopeChain {
        self.chain
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut ScopeChain {
        self.chain
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
