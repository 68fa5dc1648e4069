//! Built-in special globals.
//!
//! Scope-relative specials read the current frame chain; computed specials
//! run a rule on every access. Both are tagged enums dispatched by `match`.
//! [`builtin_slots`] lists every special installed at process start.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use garnet_value::{MatchData, Value, ValueShape};

use crate::errors::{invalid_value, read_only, type_mismatch, BindingResult};
use crate::scope::ScopeChain;
use crate::slot::{BindingSlot, SlotContext, SlotOrigin, SlotRef};

/// Highest `$n` group variable installed as a global.
pub const MAX_GROUP_GLOBAL: usize = 9;

/// Specials whose value lives in the innermost closure frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopedSpecial {
    /// `$~`
    CurrentMatch,
    /// `$_`
    LastReadLine,
    /// `$&`
    EntireMatch,
    /// `` $` ``
    PreMatch,
    /// `$'`
    PostMatch,
    /// `$+`
    LastGroup,
    /// `$1` .. `$9`
    Group(usize),
}

impl ScopedSpecial {
    fn current_match(scope: &ScopeChain) -> Option<Value> {
        scope
            .current_match()
            .map(|cell| cell.get())
            .filter(|value| value.as_match().is_some())
    }

    fn derive(self, m: &MatchData) -> Option<Value> {
        let text = match self {
            ScopedSpecial::EntireMatch => m.group(0),
            ScopedSpecial::PreMatch => Some(m.pre_match()),
            ScopedSpecial::PostMatch => Some(m.post_match()),
            ScopedSpecial::LastGroup => m.last_group(),
            ScopedSpecial::Group(n) => m.group(n),
            ScopedSpecial::CurrentMatch | ScopedSpecial::LastReadLine => None,
        };
        text.map(Value::string)
    }

    /// Current value, or `None` when there is nothing to derive from.
    pub fn get(self, scope: &ScopeChain) -> Option<Value> {
        match self {
            ScopedSpecial::CurrentMatch => Some(scope.current_match().map(|cell| cell.get()).unwrap_or_default()),
            ScopedSpecial::LastReadLine => Some(scope.last_read_line().map(|cell| cell.get()).unwrap_or_default()),
            _ => {
                let current = Self::current_match(scope)?;
                current.as_match().and_then(|m| self.derive(m))
            }
        }
    }

    pub fn set(self, label: &str, scope: &ScopeChain, value: Value) -> BindingResult<()> {
        let cell = match self {
            ScopedSpecial::CurrentMatch => scope.current_match(),
            ScopedSpecial::LastReadLine => scope.last_read_line(),
            _ => return Err(read_only(label)),
        };
        match cell {
            Some(cell) => cell.set(value),
            // the top-level frame owns both specials
            None => Err(read_only(label)),
        }
    }

    pub fn is_defined(self, scope: &ScopeChain) -> bool {
        match self {
            ScopedSpecial::CurrentMatch | ScopedSpecial::LastReadLine => true,
            _ => self.get(scope).is_some(),
        }
    }

    /// Numbered groups are not listed by introspection.
    pub fn is_enumerated(self) -> bool {
        !matches!(self, ScopedSpecial::Group(_))
    }
}

/// Host-provided computed global.
pub trait GlobalAccessor: Send + Sync {
    fn get(&self, cx: &SlotContext<'_>) -> Value;

    /// Defaults to read-only.
    fn set(&self, name: &str, _cx: &mut SlotContext<'_>, _value: Value) -> BindingResult<()> {
        Err(read_only(name))
    }

    fn is_defined(&self, _cx: &SlotContext<'_>) -> bool {
        true
    }
}

/// Tri-state `$VERBOSE` flag: nil, false or true.
///
/// A single atomic byte, so reads never take a lock.
#[derive(Debug)]
pub struct VerboseFlag(AtomicU8);

const VERBOSE_NIL: u8 = 0;
const VERBOSE_FALSE: u8 = 1;
const VERBOSE_TRUE: u8 = 2;

impl VerboseFlag {
    pub fn new(initial: Option<bool>) -> Self {
        VerboseFlag(AtomicU8::new(Self::encode(initial)))
    }

    fn encode(value: Option<bool>) -> u8 {
        match value {
            None => VERBOSE_NIL,
            Some(false) => VERBOSE_FALSE,
            Some(true) => VERBOSE_TRUE,
        }
    }

    pub fn load(&self) -> Option<bool> {
        match self.0.load(Ordering::Acquire) {
            VERBOSE_NIL => None,
            VERBOSE_FALSE => Some(false),
            _ => Some(true),
        }
    }

    /// Nil stays nil; any other value is stored by truthiness.
    pub fn store(&self, value: &Value) {
        let flag = if value.is_nil() {
            None
        } else {
            Some(value.is_truthy())
        };
        self.0.store(Self::encode(flag), Ordering::Release);
    }
}

/// Specials computed on every access.
pub enum ComputedRule {
    /// `$!`, thread-local.
    CurrentException,
    /// `$@`, backtrace of `$!`.
    ExceptionBacktrace,
    /// `$SAFE`, thread-local, never lowered.
    SafeLevel,
    /// `$?`, thread-local, read-only.
    ChildStatus,
    /// `$stdout`; writing swaps the process output sink.
    OutputStream,
    /// `$stderr`
    ErrorStream,
    /// `$stdin`
    InputStream,
    /// `$VERBOSE`
    Verbose(VerboseFlag),
    Host(Arc<dyn GlobalAccessor>),
}

impl ComputedRule {
    pub fn get(&self, cx: &SlotContext<'_>) -> Value {
        match self {
            ComputedRule::CurrentException => cx.thread.current_exception(),
            ComputedRule::ExceptionBacktrace => cx
                .thread
                .current_exception()
                .as_exception()
                .and_then(|e| e.backtrace.clone())
                .map_or(Value::Nil, Value::string_array),
            ComputedRule::SafeLevel => Value::Int(cx.thread.safe_level()),
            ComputedRule::ChildStatus => cx.thread.child_status().map_or(Value::Nil, Value::Int),
            ComputedRule::OutputStream => Value::stream(cx.streams.stdout()),
            ComputedRule::ErrorStream => Value::stream(cx.streams.stderr()),
            ComputedRule::InputStream => Value::stream(cx.streams.stdin()),
            ComputedRule::Verbose(flag) => flag.load().map_or(Value::Nil, Value::Bool),
            ComputedRule::Host(accessor) => accessor.get(cx),
        }
    }

    pub fn set(&self, label: &str, cx: &mut SlotContext<'_>, value: Value) -> BindingResult<()> {
        match self {
            ComputedRule::CurrentException => {
                require(label, ValueShape::EXCEPTION | ValueShape::NIL, &value)?;
                cx.thread.set_current_exception(value);
                Ok(())
            }
            ComputedRule::ExceptionBacktrace => {
                let current = cx.thread.current_exception();
                let Some(exception) = current.as_exception() else {
                    return Err(invalid_value(label, "$! not set"));
                };
                let backtrace = if value.is_nil() {
                    None
                } else {
                    Some(
                        value
                            .as_string_array()
                            .ok_or_else(|| type_mismatch(label, "Array of String", value.type_name()))?,
                    )
                };
                cx.thread
                    .set_current_exception(Value::exception(exception.with_backtrace(backtrace)));
                Ok(())
            }
            ComputedRule::SafeLevel => {
                require(label, ValueShape::INT, &value)?;
                let level = value.as_int().unwrap_or_default();
                let current = cx.thread.safe_level();
                if level < current {
                    return Err(invalid_value(
                        label,
                        format!("tried to downgrade safe level from {current} to {level}"),
                    ));
                }
                cx.thread.set_safe_level(level);
                Ok(())
            }
            ComputedRule::ChildStatus => Err(read_only(label)),
            ComputedRule::OutputStream | ComputedRule::ErrorStream | ComputedRule::InputStream => {
                let Some(stream) = value.as_stream() else {
                    return Err(type_mismatch(label, ValueShape::STREAM.describe(), value.type_name()));
                };
                match self {
                    ComputedRule::OutputStream => cx.streams.set_stdout(stream.clone()),
                    ComputedRule::ErrorStream => cx.streams.set_stderr(stream.clone()),
                    _ => cx.streams.set_stdin(stream.clone()),
                }
                Ok(())
            }
            ComputedRule::Verbose(flag) => {
                flag.store(&value);
                Ok(())
            }
            ComputedRule::Host(accessor) => accessor.set(label, cx, value),
        }
    }

    pub fn is_defined(&self, cx: &SlotContext<'_>) -> bool {
        match self {
            ComputedRule::Host(accessor) => accessor.is_defined(cx),
            _ => true,
        }
    }
}

impl fmt::Debug for ComputedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputedRule::CurrentException => write!(f, "CurrentException"),
            ComputedRule::ExceptionBacktrace => write!(f, "ExceptionBacktrace"),
            ComputedRule::SafeLevel => write!(f, "SafeLevel"),
            ComputedRule::ChildStatus => write!(f, "ChildStatus"),
            ComputedRule::OutputStream => write!(f, "OutputStream"),
            ComputedRule::ErrorStream => write!(f, "ErrorStream"),
            ComputedRule::InputStream => write!(f, "InputStream"),
            ComputedRule::Verbose(flag) => f.debug_tuple("Verbose").field(&flag.load()).finish(),
            ComputedRule::Host(_) => write!(f, "Host(..)"),
        }
    }
}

fn require(label: &str, accepted: ValueShape, value: &Value) -> BindingResult<()> {
    if accepted.contains(value.shape()) {
        Ok(())
    } else {
        Err(type_mismatch(label, accepted.describe(), value.type_name()))
    }
}

/// Initial values of the process-level built-in globals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltinGlobals {
    /// `$0`
    pub program_name: String,
    /// `$*`
    pub argv: Vec<String>,
    /// `$:`
    pub load_path: Vec<String>,
    /// `$"`
    pub loaded_features: Vec<String>,
    /// `$$`
    pub pid: i64,
    /// `$DEBUG`
    pub debug: bool,
    /// `$VERBOSE`; `None` is nil.
    pub verbose: Option<bool>,
    /// `$FILENAME`
    pub input_file_name: String,
}

impl Default for BuiltinGlobals {
    fn default() -> Self {
        BuiltinGlobals {
            program_name: "garnet".to_string(),
            argv: Vec::new(),
            load_path: Vec::new(),
            loaded_features: Vec::new(),
            pid: i64::from(std::process::id()),
            debug: false,
            verbose: Some(false),
            input_file_name: "-".to_string(),
        }
    }
}

/// A built-in slot and every name it is installed under.
#[derive(Clone, Debug)]
pub struct BuiltinSlot {
    pub names: &'static [&'static str],
    pub slot: SlotRef,
}

fn entry(names: &'static [&'static str], slot: SlotRef) -> BuiltinSlot {
    BuiltinSlot { names, slot }
}

/// Every built-in special. All names of an entry share one slot.
pub fn builtin_slots(config: &BuiltinGlobals) -> Vec<BuiltinSlot> {
    let builtin = |slot: BindingSlot| slot.with_origin(SlotOrigin::Builtin).shared();
    let scoped = |label: &str, special: ScopedSpecial| builtin(BindingSlot::scope_relative(label, special));
    let computed = |label: &str, rule: ComputedRule| builtin(BindingSlot::computed(label, rule));
    let string_or_nil =
        |label: &str, initial: Value| builtin(BindingSlot::constrained(label, ValueShape::STRING_OR_NIL, Some(initial)));

    const GROUP_NAMES: [&[&str]; MAX_GROUP_GLOBAL] =
        [&["1"], &["2"], &["3"], &["4"], &["5"], &["6"], &["7"], &["8"], &["9"]];

    let mut slots = vec![
        entry(&["~"], scoped("~", ScopedSpecial::CurrentMatch)),
        entry(&["_"], scoped("_", ScopedSpecial::LastReadLine)),
        entry(&["&"], scoped("&", ScopedSpecial::EntireMatch)),
        entry(&["`"], scoped("`", ScopedSpecial::PreMatch)),
        entry(&["'"], scoped("'", ScopedSpecial::PostMatch)),
        entry(&["+"], scoped("+", ScopedSpecial::LastGroup)),
        entry(&["!"], computed("!", ComputedRule::CurrentException)),
        entry(&["@"], computed("@", ComputedRule::ExceptionBacktrace)),
        entry(&["SAFE"], computed("SAFE", ComputedRule::SafeLevel)),
        entry(&["?"], computed("?", ComputedRule::ChildStatus)),
        entry(&["stdout", ">", "defout"], computed("stdout", ComputedRule::OutputStream)),
        entry(&["stderr"], computed("stderr", ComputedRule::ErrorStream)),
        entry(&["stdin", "<"], computed("stdin", ComputedRule::InputStream)),
        entry(
            &["VERBOSE", "-v", "-w"],
            computed("VERBOSE", ComputedRule::Verbose(VerboseFlag::new(config.verbose))),
        ),
        entry(
            &["DEBUG", "-d"],
            builtin(BindingSlot::global("DEBUG", Some(Value::Bool(config.debug)))),
        ),
        entry(&["/", "-0"], string_or_nil("/", Value::string("\n"))),
        entry(&["\\"], string_or_nil("\\", Value::Nil)),
        entry(&[","], string_or_nil(",", Value::Nil)),
        entry(&[";", "-F"], string_or_nil(";", Value::Nil)),
        entry(&["KCODE", "-K"], string_or_nil("KCODE", Value::Nil)),
        entry(
            &["0", "PROGRAM_NAME"],
            builtin(BindingSlot::constrained(
                "0",
                ValueShape::STRING,
                Some(Value::string(config.program_name.clone())),
            )),
        ),
        entry(
            &["*"],
            builtin(BindingSlot::read_only("*", Value::string_array(config.argv.iter().cloned()))),
        ),
        entry(&["$"], builtin(BindingSlot::read_only("$", Value::Int(config.pid)))),
        entry(
            &["LOAD_PATH", ":", "-I"],
            builtin(BindingSlot::read_only(
                "LOAD_PATH",
                Value::string_array(config.load_path.iter().cloned()),
            )),
        ),
        entry(
            &["LOADED_FEATURES", "\""],
            builtin(BindingSlot::read_only(
                "LOADED_FEATURES",
                Value::string_array(config.loaded_features.iter().cloned()),
            )),
        ),
        entry(
            &["FILENAME"],
            builtin(BindingSlot::read_only(
                "FILENAME",
                Value::string(config.input_file_name.clone()),
            )),
        ),
    ];

    for (index, names) in GROUP_NAMES.into_iter().enumerate() {
        let group = index + 1;
        slots.push(entry(names, scoped(names[0], ScopedSpecial::Group(group))));
    }

    slots
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
