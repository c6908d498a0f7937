use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

use crate::config::LoggingConfig;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const KEEP: u32 = 7;

/// Initializes the logging system from `log4rs.yaml` in the working directory.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file("log4rs.yaml", log4rs::config::Deserializers::default())?;
    Ok(())
}

/// Initializes the logging system from a specific config file path.
pub fn init_path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())?;
    Ok(())
}

pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(dir: &Path, stem: &str) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", dir.join(format!("{stem}.{{}}.log")).display()), KEEP)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(dir.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Builds the rolling-file configuration for a sync stream under
/// `{base}/{stream}_logs/`: `{stream}.log` for everything and
/// `{stream}_sync.log` for pipeline progress only.
pub fn stream_config(base_dir: &Path, stream: &str, level: LevelFilter) -> Result<Config, Box<dyn std::error::Error>> {
    let mut dir = PathBuf::from(base_dir);
    dir.push(format!("{stream}_logs"));
    std::fs::create_dir_all(&dir)?;

    let app = rolling(&dir, stream)?;
    let sync = rolling(&dir, &format!("{stream}_sync"))?;
    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(app)))
        .appender(Appender::builder().build("sync", Box::new(sync)))
        .logger(Logger::builder().appender("sync").build("docsync::sync", level))
        .build(Root::builder().appender("app").build(level))?;
    Ok(config)
}

/// Initializes logging into `{base}/{stream}_logs/`.
///
/// # Errors
/// Returns an error if the directory cannot be created or a logger is
/// already installed.
pub fn init_for_stream_in(base_dir: &Path, stream: &str, level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_config(stream_config(base_dir, stream, level)?)?;
    Ok(())
}

/// Initializes logging from application settings: an explicit log4rs file
/// wins, then a log directory, otherwise the working directory.
pub fn init_from(settings: &LoggingConfig, stream: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(file) = &settings.config_file {
        return init_path(file);
    }
    let base = match &settings.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    init_for_stream_in(&base, stream, parse_level(&settings.level))
}
