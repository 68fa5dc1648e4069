//! Garnet Globals - global variable resolution.
//!
//! # Layout
//!
//! - [`slot`]: [`BindingSlot`], one named cell with a storage policy
//! - [`special`]: built-in special globals (`$~`, `$!`, `$stdout`, ...)
//! - [`registry`]: the process-wide [`BindingRegistry`]
//! - [`scope`]: the per-thread [`ScopeChain`] for scope-relative bindings
//! - [`thread`]: [`ExecutionState`], one per thread of execution
//! - [`streams`]: the process-wide [`StandardStreams`]
//! - [`globals`]: the [`Globals`] facade used by the runtime
//!
//! Names resolve through the scope chain first and fall through to the
//! registry. Registry and streams are `Sync`; scope chains are not `Send`.

mod errors;
pub mod globals;
pub mod registry;
pub mod scope;
pub mod slot;
pub mod special;
pub mod streams;
pub mod thread;

pub use errors::{BindingError, BindingResult};
pub use globals::Globals;
pub use registry::BindingRegistry;
pub use scope::{Binding, CapturedScope, FrameGuard, FrameHandle, FrameKind, LocalScope, ScopeChain, ScopedCell};
pub use slot::{BindingSlot, SlotContext, SlotOrigin, SlotRef, SlotStorage, StorageKind};
pub use special::{BuiltinGlobals, ComputedRule, GlobalAccessor, ScopedSpecial, VerboseFlag};
pub use streams::StandardStreams;
pub use thread::{ExecutionState, ThreadSpecials};
