//! Per-thread execution state.

use garnet_ir::SharedInterner;
use garnet_value::{ExceptionValue, Value};

use crate::scope::ScopeChain;
use crate::slot::SlotContext;
use crate::streams::StandardStreams;

/// Thread-local computed specials: `$!`, `$SAFE` and `$?`.
#[derive(Clone, Debug, Default)]
pub struct ThreadSpecials {
    current_exception: Value,
    safe_level: i64,
    child_status: Option<i64>,
}

impl ThreadSpecials {
    /// `$!`: an exception or nil.
    pub fn current_exception(&self) -> Value {
        self.current_exception.clone()
    }

    pub(crate) fn set_current_exception(&mut self, value: Value) {
        self.current_exception = value;
    }

    /// Record a raised exception as `$!`.
    pub fn raise(&mut self, exception: ExceptionValue) {
        self.current_exception = Value::exception(exception);
    }

    pub fn clear_exception(&mut self) {
        self.current_exception = Value::Nil;
    }

    pub fn safe_level(&self) -> i64 {
        self.safe_level
    }

    pub(crate) fn set_safe_level(&mut self, level: i64) {
        self.safe_level = level;
    }

    pub fn child_status(&self) -> Option<i64> {
        self.child_status
    }

    /// Record the exit status of the last child process for `$?`.
    pub fn set_child_status(&mut self, status: i64) {
        self.child_status = Some(status);
    }
}

/// Everything a single thread of execution owns: its scope chain and its
/// thread-local specials. Not `Send`.
#[derive(Debug)]
pub struct ExecutionState {
    pub chain: ScopeChain,
    pub specials: ThreadSpecials,
}

impl ExecutionState {
    pub fn new(interner: SharedInterner) -> Self {
        ExecutionState {
            chain: ScopeChain::new(interner),
            specials: ThreadSpecials::default(),
        }
    }

    /// Borrow this thread's state together with the process streams.
    pub fn context<'a>(&'a mut self, streams: &'a StandardStreams) -> SlotContext<'a> {
        SlotContext {
            streams,
            thread: &mut self.specials,
            scope: &self.chain,
        }
    }
}
