// Logging backend: `[LEVEL] message` lines on stderr

use log::{LevelFilter, Log, Metadata, Record};
use std::io::Write;

/// Environment variable holding the log level
pub const LOG_ENV: &str = "BOOTPREP_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the logger. Later calls only change the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Install the logger with the level from [`LOG_ENV`], `info` by default
pub fn init_from_env() {
    let value = std::env::var(LOG_ENV).ok();
    let level = value.as_deref().map(parse_level);

    init(level.flatten().unwrap_or(LevelFilter::Info));

    if let (Some(value), Some(None)) = (value, level) {
        log::warn!("{}={:?} is not a log level, using info", LOG_ENV, value);
    }
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}
