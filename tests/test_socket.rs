//! Listening socket lifecycle tests.

use harbor::config::{Config, ServerConfig, TimeoutConfig};
use harbor::error::StartupError;
use harbor::server::{ListeningSocket, SocketState};

fn cfg_for(addr: &str) -> Config {
    Config {
        server: ServerConfig {
            listen_addr: addr.to_string(),
            backlog: 4,
            max_connections: 4,
        },
        timeouts: TimeoutConfig::default(),
    }
}

#[tokio::test]
async fn test_open_then_close_repeatedly_leaks_nothing() {
    for _ in 0..100 {
        let mut sock = ListeningSocket::open(&cfg_for("127.0.0.1:0")).unwrap();
        assert_eq!(sock.state(), SocketState::Listening);
        assert_ne!(sock.local_addr().port(), 0);
        sock.close();
        assert_eq!(sock.state(), SocketState::Closed);
    }
}

#[tokio::test]
async fn test_drop_releases_the_socket() {
    // Bind the same OS-assigned port twice in a row; the second open only
    // works if dropping the first actually released it.
    let addr = {
        let sock = ListeningSocket::open(&cfg_for("127.0.0.1:0")).unwrap();
        sock.local_addr().to_string()
    };
    let sock = ListeningSocket::open(&cfg_for(&addr)).unwrap();
    assert_eq!(sock.state(), SocketState::Listening);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let mut sock = ListeningSocket::open(&cfg_for("127.0.0.1:0")).unwrap();
    sock.close();
    sock.close();
    assert_eq!(sock.state(), SocketState::Closed);
}

#[tokio::test]
async fn test_invalid_listen_addr() {
    let err = ListeningSocket::open(&cfg_for("not-an-address")).unwrap_err();
    assert!(matches!(err, StartupError::InvalidAddr { .. }));
}

#[tokio::test]
async fn test_address_in_use() {
    let first = ListeningSocket::open(&cfg_for("127.0.0.1:0")).unwrap();
    let taken = first.local_addr().to_string();

    let err = ListeningSocket::open(&cfg_for(&taken)).unwrap_err();
    assert!(matches!(err, StartupError::AddressInUse { .. }));
}

#[tokio::test]
async fn test_reports_configured_backlog() {
    let sock = ListeningSocket::open(&cfg_for("127.0.0.1:0")).unwrap();
    assert_eq!(sock.backlog(), 4);
}
