//! Runtime values.

use std::fmt;

use garnet_ir::Name;
use rustc_hash::FxHashMap;

use crate::exception::ExceptionValue;
use crate::heap::Heap;
use crate::match_data::MatchData;
use crate::shape::ValueShape;
use crate::stream::SharedStream;

/// Dynamically-typed runtime value.
#[derive(Clone)]
pub enum Value {
    // Immediates
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Symbol(Name),

    // Heap types (use Heap<T> for enforced Arc usage)
    Str(Heap<String>),
    Array(Heap<Vec<Value>>),
    /// Hash with string keys.
    Hash(Heap<FxHashMap<String, Value>>),
    /// Match result, as held by `$~`.
    Match(Heap<MatchData>),
    /// Exception, as held by `$!`.
    Exception(Heap<ExceptionValue>),

    /// I/O stream; equality is identity.
    Stream(SharedStream),
}

// Factory methods
impl Value {
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    #[inline]
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Heap::new(items))
    }

    /// Array of strings, e.g. for `$*` or `$LOAD_PATH`.
    pub fn string_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::array(items.into_iter().map(Value::string).collect())
    }

    #[inline]
    pub fn hash(entries: FxHashMap<String, Value>) -> Self {
        Value::Hash(Heap::new(entries))
    }

    #[inline]
    pub fn match_data(m: MatchData) -> Self {
        Value::Match(Heap::new(m))
    }

    #[inline]
    pub fn exception(e: ExceptionValue) -> Self {
        Value::Exception(Heap::new(e))
    }

    #[inline]
    pub fn stream(s: SharedStream) -> Self {
        Value::Stream(s)
    }

    /// Convert an optional string into a string value or nil.
    pub fn from_opt_str(s: Option<&str>) -> Self {
        s.map_or(Value::Nil, Value::string)
    }
}

// Accessors
impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_match(&self) -> Option<&MatchData> {
        match self {
            Value::Match(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&ExceptionValue> {
        match self {
            Value::Exception(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&SharedStream> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Strings of an array of strings; `None` if any element is not a string.
    pub fn as_string_array(&self) -> Option<Vec<String>> {
        self.as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_owned))
            .collect()
    }

    /// Text written by `print` for this value.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => format!("{x:?}"),
            Value::Symbol(name) => name.raw().to_string(),
            Value::Str(s) => s.as_str().to_owned(),
            Value::Array(items) => items.iter().map(Value::to_display_string).collect(),
            Value::Hash(_) | Value::Match(_) | Value::Exception(_) | Value::Stream(_) => {
                format!("{self:?}")
            }
        }
    }

    /// The single shape bit describing this value.
    pub fn shape(&self) -> ValueShape {
        match self {
            Value::Nil => ValueShape::NIL,
            Value::Bool(_) => ValueShape::BOOL,
            Value::Int(_) => ValueShape::INT,
            Value::Float(_) => ValueShape::FLOAT,
            Value::Symbol(_) => ValueShape::SYMBOL,
            Value::Str(_) => ValueShape::STRING,
            Value::Array(_) => ValueShape::ARRAY,
            Value::Hash(_) => ValueShape::HASH,
            Value::Match(_) => ValueShape::MATCH,
            Value::Exception(_) => ValueShape::EXCEPTION,
            Value::Stream(_) => ValueShape::STREAM,
        }
    }

    /// Class name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "NilClass",
            Value::Bool(true) => "TrueClass",
            Value::Bool(false) => "FalseClass",
            Value::Int(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Symbol(_) => "Symbol",
            Value::Str(_) => "String",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
            Value::Match(_) => "MatchData",
            Value::Exception(_) => "Exception",
            Value::Stream(_) => "IO",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            #[allow(clippy::float_cmp, reason = "value equality is exact, like the language")]
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Match(a), Value::Match(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => a == b,
            (Value::Stream(a), Value::Stream(b)) => std::sync::Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Symbol(name) => write!(f, ":{}", name.raw()),
            Value::Str(s) => write!(f, "{:?}", s.as_str()),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Hash(map) => f.debug_map().entries(map.iter()).finish(),
            Value::Match(m) => write!(f, "#<MatchData {:?}>", m.group(0).unwrap_or_default()),
            Value::Exception(e) => write!(f, "#<{}: {}>", e.class_name, e.message),
            Value::Stream(s) => write!(f, "{s:?}"),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
