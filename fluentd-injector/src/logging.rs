use std::path::Path;

use fluentd_common::errors::FluentdServiceError;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const LOG_PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S)}] {l}: {m}{n}";
const STDOUT_APPENDER: &str = "stdout";

fn console_config() -> Result<Config, FluentdServiceError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    Config::builder()
        .appender(Appender::builder().build(STDOUT_APPENDER, Box::new(stdout)))
        .build(
            Root::builder()
                .appender(STDOUT_APPENDER)
                .build(LevelFilter::Info),
        )
        .map_err(FluentdServiceError::from_error("Unable to build logger config"))
}

/// Initializes log4rs from `log_config_file`, or with an `info` console
/// logger when the file does not exist.
pub fn init_logger(log_config_file: &Path) -> Result<(), FluentdServiceError> {
    if log_config_file.exists() {
        log4rs::init_file(log_config_file, Default::default()).map_err(
            FluentdServiceError::from_error(&format!(
                "Unable to load logger config from {}",
                log_config_file.display()
            )),
        )
    } else {
        log4rs::init_config(console_config()?)
            .map(|_| ())
            .map_err(FluentdServiceError::from_error("Unable to initialize logger"))
    }
}
