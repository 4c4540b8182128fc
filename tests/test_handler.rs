//! Handler hook and outcome type tests.

use std::io;
use std::time::Instant;

use bytes::Bytes;
use harbor::conn::CloseOutcome;
use harbor::handler::{ConnInfo, EchoHandler, Handler, Reply};
use harbor::server::listener::is_transient;

fn info() -> ConnInfo {
    ConnInfo {
        id: 7,
        peer: "127.0.0.1:9999".parse().unwrap(),
        opened_at: Instant::now(),
    }
}

#[test]
fn test_echo_handler_returns_payload() {
    let reply = EchoHandler.handle(&info(), b"hello");
    assert_eq!(reply, Reply::Send(Bytes::from_static(b"hello")));
}

#[test]
fn test_closure_as_handler() {
    let hook = |_: &ConnInfo, payload: &[u8]| {
        if payload == b"quit" {
            Reply::Close
        } else {
            Reply::Send(Bytes::copy_from_slice(payload))
        }
    };

    assert_eq!(hook.handle(&info(), b"quit"), Reply::Close);
    assert_eq!(
        hook.handle(&info(), b"stay"),
        Reply::Send(Bytes::from_static(b"stay"))
    );
}

#[test]
fn test_close_outcome_display() {
    assert_eq!(CloseOutcome::Normal.to_string(), "normal");
    assert_eq!(CloseOutcome::Timeout.to_string(), "timeout");
    assert_eq!(CloseOutcome::Error.to_string(), "error");
    assert_eq!(CloseOutcome::Forced.to_string(), "forced");
    assert_eq!(
        CloseOutcome::CapacityExceeded.to_string(),
        "capacity_exceeded"
    );
}

#[test]
fn test_transient_accept_error_classification() {
    assert!(is_transient(&io::Error::from(
        io::ErrorKind::ConnectionAborted
    )));
    assert!(is_transient(&io::Error::from(io::ErrorKind::WouldBlock)));
    // EMFILE: out of file descriptors
    assert!(is_transient(&io::Error::from_raw_os_error(24)));

    assert!(!is_transient(&io::Error::from(
        io::ErrorKind::PermissionDenied
    )));
    assert!(!is_transient(&io::Error::other("listener gone")));
}
