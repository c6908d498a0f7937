use docsync::logger::{init_for_stream_in, parse_level, stream_config};
use log::LevelFilter;

#[test]
fn parse_level_defaults_to_info() {
    assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
    assert_eq!(parse_level(" warn "), LevelFilter::Warn);
    assert_eq!(parse_level("verbose"), LevelFilter::Info);
}

#[test]
fn stream_logging_writes_under_stream_dir() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = stream_config(dir.path(), "TEST_STREAM", LevelFilter::Info).unwrap();
    assert_eq!(cfg.appenders().len(), 2);
    assert!(dir.path().join("TEST_STREAM_logs").is_dir());

    let other = tempfile::tempdir().unwrap();
    init_for_stream_in(other.path(), "RUN", LevelFilter::Info).unwrap();
    log::info!("sync logger online");
    let app_log = other.path().join("RUN_logs").join("RUN.log");
    assert!(app_log.exists());
}
