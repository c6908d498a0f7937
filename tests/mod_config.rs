use docsync::config::{AppConfig, DEFAULT_STREAM};
use docsync::errors::ErrorKind;
use std::collections::HashMap;
use std::io::Write;

#[test]
fn defaults_are_valid() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.store.database, "cams");
    assert_eq!(cfg.sync.stream, DEFAULT_STREAM);
    cfg.validate().unwrap();
}

#[test]
fn partial_toml_fills_defaults() {
    let cfg = AppConfig::from_toml_str(
        r#"
        [sync]
        page_size = 50

        [legacy]
        server = "dxtr.example"
        password = "hunter2"
        "#,
    )
    .unwrap();
    assert_eq!(cfg.sync.page_size, 50);
    assert_eq!(cfg.sync.max_concurrency, 8);
    assert_eq!(cfg.legacy.server, "dxtr.example");
    assert!(!format!("{:?}", cfg.legacy).contains("hunter2"));
}

#[test]
fn malformed_toml_is_server_config() {
    let err = AppConfig::from_toml_str("[sync\npage_size = ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerConfig);
}

#[test]
fn env_overrides_apply() {
    let env: HashMap<&str, &str> = [
        ("DOCSYNC_DATABASE", "cams-test"),
        ("DOCSYNC_SYNC_PAGE_SIZE", "25"),
        ("DOCSYNC_SYNC_STARTING_TX_ID", "900"),
    ]
    .into_iter()
    .collect();
    let mut cfg = AppConfig::default();
    cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.store.database, "cams-test");
    assert_eq!(cfg.sync.page_size, 25);
    assert_eq!(cfg.sync.starting_tx_id, "900");

    let err = cfg.apply_overrides(|k| (k == "DOCSYNC_SYNC_CONCURRENCY").then(|| "many".to_string())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerConfig);
}

#[test]
fn validation_rejects_bad_settings() {
    let mut cfg = AppConfig::default();
    cfg.sync.starting_tx_id = "abc".into();
    assert_eq!(cfg.validate().unwrap_err().kind(), ErrorKind::ServerConfig);
    let mut cfg = AppConfig::default();
    cfg.sync.max_concurrency = 0;
    assert!(cfg.validate().is_err());
    let mut cfg = AppConfig::default();
    cfg.store.database.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn load_reads_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docsync.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "[store]\ndatabase = \"from-file\"\n[sync]\nstream = \"TEST_STREAM\"").unwrap();
    drop(f);
    let cfg = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(cfg.sync.stream, "TEST_STREAM");
}
