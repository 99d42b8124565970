use std::path::Path;

use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};

const CONSOLE_PATTERN: &str = "{h({d(%Y-%m-%d %H:%M:%S)} [{l}] from line {L} in {M})} - {m}{n}";
const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {M}:{L} - {m}{n}";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Could not open log file {0}")]
    LogFile(String),
    #[error("Invalid logging configuration: {0}")]
    Config(String),
    #[error("A logger was already set up")]
    AlreadySet,
}

/// Send log messages to stderr at `level`, and optionally to `log_file`.
///
/// The log file always records at least DEBUG messages, so that a record
/// of exactly which fields were replaced is kept even when the console is
/// quiet. An existing log file is appended to.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .target(Target::Stderr)
        .build();

    let mut builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");
    let mut root_level = level;

    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(path)
            .map_err(|e| LoggingError::LogFile(format!("{}: {e}", path.display())))?;
        let file_level = level.max(LevelFilter::Debug);
        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(file_level)))
                .build("file", Box::new(file)),
        );
        root = root.appender("file");
        root_level = file_level;
    }

    let config = builder
        .build(root.build(root_level))
        .map_err(|e| LoggingError::Config(e.to_string()))?;
    log4rs::init_config(config).map_err(|_| LoggingError::AlreadySet)?;
    Ok(())
}
