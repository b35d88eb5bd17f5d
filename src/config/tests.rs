use super::settings::Settings;
use super::{load_config, load_config_from};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.gateway.namespaces, vec!["/", "/admin"]);
    assert_eq!(settings.gateway.restart_event, "restart_server");
    assert_eq!(settings.gateway.restart_delay_ms, 2000);
    assert_eq!(settings.gateway.rebind_attempts, 5);
    assert_eq!(settings.heartbeat.ping_interval_ms, 25000);
    assert_eq!(settings.heartbeat.ping_timeout_ms, 20000);
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn test_heartbeat_deadline_adds_interval_and_timeout() {
    let settings = Settings::default();
    assert_eq!(settings.heartbeat.deadline().as_millis(), 45000);
    assert_eq!(settings.gateway.restart_delay().as_secs(), 2);
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // Create a temporary directory and set it as current dir so load_config
    // will pick up config/default.toml from there.
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [gateway]
        namespaces = ["/", "/admin", "/ops"]
        restart_delay_ms = 500
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config();

    // restore cwd before asserting so a failure does not leak the tempdir cwd
    env::set_current_dir(orig).expect("restore cwd");

    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.gateway.namespaces, vec!["/", "/admin", "/ops"]);
    assert_eq!(cfg.gateway.restart_delay_ms, 500);
    // untouched values keep their defaults
    assert_eq!(cfg.gateway.restart_event, "restart_server");
    assert_eq!(cfg.heartbeat.ping_interval_ms, 25000);
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().expect("create tempdir");
    let stem = tmp.path().join("gateway");
    fs::write(
        stem.with_extension("toml"),
        "[server]\nport = 9000\n[gateway]\nrestart_event = \"reboot\"\n",
    )
    .expect("write config file");

    temp_env::with_vars(
        [
            ("NSGATE_SERVER__PORT", Some("9100")),
            ("NSGATE_HEARTBEAT__PING_INTERVAL_MS", Some("1000")),
        ],
        || {
            let cfg = load_config_from(stem.to_str().unwrap()).expect("load config");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.heartbeat.ping_interval_ms, 1000);
            assert_eq!(cfg.gateway.restart_event, "reboot");
        },
    );
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let stem = tmp.path().join("absent");
    let cfg = load_config_from(stem.to_str().unwrap()).expect("load config");
    assert_eq!(cfg.server.port, Settings::default().server.port);
    assert_eq!(cfg.gateway.namespaces.len(), 2);
}

#[test]
#[serial]
fn zero_ping_interval_is_rejected() {
    let tmp = TempDir::new().expect("create tempdir");
    let stem = tmp.path().join("absent");

    temp_env::with_var("NSGATE_HEARTBEAT__PING_INTERVAL_MS", Some("0"), || {
        let err = load_config_from(stem.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("ping_interval_ms"));
    });
}

#[test]
fn overflowing_heartbeat_is_rejected() {
    let mut settings = Settings::default();
    settings.heartbeat.ping_interval_ms = u64::MAX;
    settings.heartbeat.ping_timeout_ms = 1;

    assert!(settings.validate().is_err());
    // still usable as a deadline without panicking
    assert_eq!(settings.heartbeat.deadline().as_millis(), u64::MAX as u128);
}

#[test]
fn default_settings_validate() {
    assert!(Settings::default().validate().is_ok());
}
