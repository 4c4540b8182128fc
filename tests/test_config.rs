use std::time::Duration;

use harbor::config::Config;

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.backlog, 128);
    assert_eq!(cfg.server.max_connections, 1024);
    assert_eq!(cfg.read_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.write_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.drain_grace(), Duration::from_secs(2));
    assert_eq!(cfg.shutdown_grace(), Duration::from_secs(5));
}

#[test]
fn test_partial_yaml_fills_defaults() {
    let cfg: Config = serde_yaml::from_str(
        "server:\n  listen_addr: \"0.0.0.0:9000\"\n  max_connections: 32\n",
    )
    .unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:9000");
    assert_eq!(cfg.server.max_connections, 32);
    // everything unspecified keeps its default
    assert_eq!(cfg.server.backlog, 128);
    assert_eq!(cfg.read_timeout(), Duration::from_secs(30));
}

#[test]
fn test_yaml_timeouts() {
    let cfg: Config = serde_yaml::from_str(
        "timeouts:\n  read_ms: 250\n  write_ms: 500\n  drain_ms: 100\n  shutdown_grace_ms: 1000\n",
    )
    .unwrap();

    assert_eq!(cfg.read_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.write_timeout(), Duration::from_millis(500));
    assert_eq!(cfg.drain_grace(), Duration::from_millis(100));
    assert_eq!(cfg.shutdown_grace(), Duration::from_secs(1));
}

#[test]
fn test_env_overrides() {
    // A single test covers every env-dependent path so parallel test
    // threads never race on the variables.
    unsafe {
        std::env::remove_var("HARBOR_CONFIG");
        std::env::remove_var("LISTEN");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:3000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    unsafe {
        std::env::remove_var("LISTEN");
    }
}

#[test]
fn test_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
    assert_eq!(cfg1.server.max_connections, cfg2.server.max_connections);
}
