use super::*;

#[test]
fn test_defaults_when_sections_missing() {
    let cfg: Config = toml::from_str("").unwrap();
    assert_eq!(cfg.bot.api_url, "https://api.telegram.org");
    assert_eq!(cfg.poller.timeout_secs, 30);
    assert_eq!(cfg.poller.limit, 100);
    assert_eq!(cfg.dispatch.channel_capacity, 100);
    assert_eq!(cfg.dispatch.mode, DispatchMode::PerChat);
    assert!(!cfg.store.enabled);
}

#[test]
fn test_parse_full_config() {
    let toml_str = r#"
        [bot]
        token = "123456:ABC-def_ghi"
        api_url = "http://localhost:8081"
        request_timeout_secs = 5

        [poller]
        timeout_secs = 10
        allowed_updates = ["message", "callback_query"]
        backoff_max_secs = 4

        [dispatch]
        channel_capacity = 8
        mode = "sequential"

        [store]
        enabled = true
        db_path = "/tmp/offsets.db"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.bot.token, "123456:ABC-def_ghi");
    assert_eq!(cfg.bot.request_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.poller.timeout_secs, 10);
    assert_eq!(cfg.poller.allowed_updates, vec!["message", "callback_query"]);
    assert_eq!(cfg.poller.backoff_initial_ms, 500);
    assert_eq!(cfg.dispatch.channel_capacity, 8);
    assert_eq!(cfg.dispatch.mode, DispatchMode::Sequential);
    assert!(cfg.store.enabled);
}

#[test]
fn test_dispatch_mode_rejects_unknown() {
    let result: Result<DispatchConfig, _> = toml::from_str(r#"mode = "random""#);
    assert!(result.is_err());
}

#[test]
fn test_validate_token() {
    assert!(validate_token("123456:ABC-def_ghi").is_ok());
    assert!(validate_token("").is_err());
    assert!(validate_token("no-colon").is_err());
    assert!(validate_token("abc:secret").is_err());
    assert!(validate_token("123:").is_err());
    assert!(validate_token("123:bad secret").is_err());
}

#[test]
fn test_shellexpand_leaves_absolute_paths() {
    assert_eq!(shellexpand("/var/lib/offset.db"), "/var/lib/offset.db");
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__courier_config__.toml").unwrap();
    assert_eq!(cfg.poller.timeout_secs, 30);
}

#[test]
fn test_load_rejects_invalid_toml() {
    let tmp = std::env::temp_dir().join("__courier_test_bad_config__.toml");
    std::fs::write(&tmp, "[bot\ntoken = ").unwrap();
    let result = load(tmp.to_str().unwrap());
    assert!(matches!(result, Err(CourierError::Config(_))));
    let _ = std::fs::remove_file(&tmp);
}
