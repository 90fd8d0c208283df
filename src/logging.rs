//! Logging configuration for Liquid Vault
//!
//! Uses log4rs with appenders:
//! 1. ConsoleAppender - stderr output
//! 2. RollingFileAppender - log files with rotation

use crate::error::{NodeError, Result};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

const LOG_FILE_PREFIX: &str = "liquid-vault";
const MAX_LOG_SIZE: u64 = 20 * 1024 * 1024; // 20 MB
const MAX_LOG_FILES: u32 = 10;

/// Default directory for log files: `<data_dir>/liquid-vault/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LOG_FILE_PREFIX)
        .join("logs")
}

fn setup_err(e: impl std::fmt::Display) -> NodeError {
    NodeError::Configuration(format!("failed to configure logging: {}", e))
}

fn build_config(log_dir: &Path, level: LevelFilter) -> Result<Config> {
    // Console goes to stderr; stdout carries command results
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build();

    std::fs::create_dir_all(log_dir).map_err(setup_err)?;

    let log_file = log_dir.join(format!("{}.1.log", LOG_FILE_PREFIX));
    let log_pattern = log_dir.join(format!("{}.{{}}.log", LOG_FILE_PREFIX));
    let log_pattern = log_pattern.to_str().ok_or_else(|| {
        NodeError::Configuration(format!(
            "log directory is not valid UTF-8: {}",
            log_dir.display()
        ))
    })?;

    // Rolling file appender (20MB per file, 10 files max)
    let roller = FixedWindowRoller::builder()
        .base(1)
        .build(log_pattern, MAX_LOG_FILES)
        .map_err(setup_err)?;
    let trigger = SizeTrigger::new(MAX_LOG_SIZE);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let logfile = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(log_file, Box::new(policy))
        .map_err(setup_err)?;

    Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(
            Root::builder()
                .appender("console")
                .appender("logfile")
                .build(level),
        )
        .map_err(setup_err)
}

/// Initialize log4rs with console and rolling file appenders
///
/// # Log File Configuration
/// - File: `{log_dir}/liquid-vault.1.log`
/// - Max size: 20 MB per file
/// - Max count: 10 files (rotation)
/// - Pattern: `{timestamp} [{level}] {target} - {message}`
pub fn init_logger(log_dir: &Path, level: LevelFilter) -> Result<log4rs::Handle> {
    let config = build_config(log_dir, level)?;
    log4rs::init_config(config)
        .map_err(|e| NodeError::Configuration(format!("failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_creates_log_dir() {
        let root = TempDir::new().unwrap();
        let log_dir = root.path().join("nested").join("logs");

        let config = build_config(&log_dir, LevelFilter::Debug).unwrap();

        assert!(log_dir.is_dir());
        assert_eq!(config.root().level(), LevelFilter::Debug);
        assert_eq!(config.appenders().len(), 2);
    }

    #[test]
    fn test_default_log_dir_is_namespaced() {
        assert!(default_log_dir().ends_with("liquid-vault/logs"));
    }
}
