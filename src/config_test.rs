use super::*;
use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that touch the process environment.
fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// # Safety
/// Callers must hold [`env_guard`].
unsafe fn clear_live_env() {
    unsafe {
        std::env::remove_var("LIVE_UPDATES_ENABLED");
        std::env::remove_var("LIVE_UPDATES_URL");
        std::env::remove_var("LIVE_UPDATES_RECONNECT_MS");
    }
}

#[test]
fn from_env_defaults_to_disabled() {
    let _env = env_guard();
    unsafe { clear_live_env() };

    let cfg = LiveConfig::from_env().unwrap();
    assert!(!cfg.enabled);
    assert_eq!(cfg.url, DEFAULT_LIVE_UPDATES_URL);
    assert_eq!(cfg.reconnect_interval, Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS));
}

#[test]
fn from_env_parses_overrides() {
    let _env = env_guard();
    unsafe {
        clear_live_env();
        std::env::set_var("LIVE_UPDATES_ENABLED", "TRUE");
        std::env::set_var("LIVE_UPDATES_URL", "https://hub.example.test/live/");
        std::env::set_var("LIVE_UPDATES_RECONNECT_MS", "250");
    }

    let cfg = LiveConfig::from_env().unwrap();
    assert!(cfg.enabled);
    assert_eq!(cfg.url, "wss://hub.example.test/live");
    assert_eq!(cfg.reconnect_interval, Duration::from_millis(250));

    unsafe { clear_live_env() };
}

#[test]
fn from_env_unparsable_interval_uses_default() {
    let _env = env_guard();
    unsafe {
        clear_live_env();
        std::env::set_var("LIVE_UPDATES_RECONNECT_MS", "soon");
    }

    let cfg = LiveConfig::from_env().unwrap();
    assert_eq!(cfg.reconnect_interval, Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS));

    unsafe { clear_live_env() };
}

#[test]
fn from_env_zero_interval_errors() {
    let _env = env_guard();
    unsafe {
        clear_live_env();
        std::env::set_var("LIVE_UPDATES_RECONNECT_MS", "0");
    }

    let err = LiveConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::ZeroReconnectInterval));

    unsafe { clear_live_env() };
}

#[test]
fn from_env_bad_url_errors() {
    let _env = env_guard();
    unsafe {
        clear_live_env();
        std::env::set_var("LIVE_UPDATES_URL", "ftp://nope");
    }

    let err = LiveConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("ftp://nope"));

    unsafe { clear_live_env() };
}

#[test]
fn parse_flag_accepts_common_truthy_values() {
    for raw in ["true", "1", "yes", "on", " On "] {
        assert!(parse_flag(Some(raw)), "{raw} should enable");
    }
    for raw in ["false", "0", "", "enabled"] {
        assert!(!parse_flag(Some(raw)), "{raw} should not enable");
    }
    assert!(!parse_flag(None));
}

#[test]
fn endpoint_url_appends_token_query() {
    let cfg = LiveConfig::new("ws://localhost:3001").unwrap();
    assert_eq!(cfg.endpoint_url(Some("abc.def")), "ws://localhost:3001?token=abc.def");
    assert_eq!(cfg.endpoint_url(None), "ws://localhost:3001");
}

#[test]
fn endpoint_url_extends_existing_query() {
    let cfg = LiveConfig::new("wss://hub.test/live?v=2").unwrap();
    assert_eq!(cfg.endpoint_url(Some("t")), "wss://hub.test/live?v=2&token=t");
}

#[test]
fn new_is_enabled_and_rewrites_http_scheme() {
    let cfg = LiveConfig::new("http://127.0.0.1:9000/").unwrap();
    assert!(cfg.enabled);
    assert_eq!(cfg.url, "ws://127.0.0.1:9000");
}

#[test]
fn with_reconnect_ms_rejects_zero() {
    let cfg = LiveConfig::new("ws://x").unwrap();
    assert!(cfg.clone().with_reconnect_ms(0).is_err());
    assert_eq!(cfg.with_reconnect_ms(10).unwrap().reconnect_interval, Duration::from_millis(10));
}
