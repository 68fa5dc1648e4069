//! Exception payload carried by `$!`.

/// An exception object as seen by the binding layer.
///
/// Exceptions are immutable values; replacing the backtrace produces a new
/// exception (see [`ExceptionValue::with_backtrace`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionValue {
    pub class_name: String,
    pub message: String,
    pub backtrace: Option<Vec<String>>,
}

impl ExceptionValue {
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionValue {
            class_name: class_name.into(),
            message: message.into(),
            backtrace: None,
        }
    }

    #[must_use]
    pub fn with_backtrace(&self, backtrace: Option<Vec<String>>) -> Self {
        ExceptionValue {
            backtrace,
            ..self.clone()
        }
    }
}
