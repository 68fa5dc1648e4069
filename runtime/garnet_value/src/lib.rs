//! Garnet Value - the dynamically-typed payload stored in bindings and models.
//!
//! # Arc Enforcement
//!
//! Heap variants of [`Value`] wrap their contents in [`Heap<T>`], whose
//! constructor is private to this crate. Values are built through the
//! factory methods on `Value` (`Value::string`, `Value::array`, ...).
//!
//! # Streams
//!
//! [`StreamImpl`] is the runtime's I/O sink/source. It is shared as
//! [`SharedStream`] and compared by identity, so swapping `$stdout` is
//! observable by every holder of the previous handle.

mod exception;
mod heap;
mod match_data;
mod shape;
mod stream;
mod value;

pub use exception::ExceptionValue;
pub use heap::Heap;
pub use match_data::MatchData;
pub use shape::ValueShape;
pub use stream::{
    buffer_stream, buffer_stream_with_input, null_stream, stderr_stream, stdin_stream,
    stdout_stream, BufferStream, SharedStream, StdinStream, StreamImpl,
};
pub use value::Value;
