use super::*;
use garnet_value::{buffer_stream, buffer_stream_with_input};
use std::sync::Arc;

#[test]
fn swapping_stdout_redirects_output() {
    let first = buffer_stream();
    let streams = StandardStreams::with_streams(first.clone(), buffer_stream(), buffer_stream());
    streams.write_output("a");

    let second = buffer_stream();
    streams.set_stdout(second.clone());
    streams.write_output("b");

    assert_eq!(first.get_output(), "a");
    assert_eq!(second.get_output(), "b");
    assert!(Arc::ptr_eq(&streams.stdout(), &second));
}

#[test]
fn reset_rebinds_process_stdio() {
    let streams = StandardStreams::with_streams(
        buffer_stream(),
        buffer_stream(),
        buffer_stream_with_input("line\n"),
    );
    streams.reset();
    assert_eq!(streams.stdout().kind_name(), "stdout");
    assert_eq!(streams.stderr().kind_name(), "stderr");
    assert_eq!(streams.stdin().kind_name(), "stdin");
}
