//! `log` backend writing to the global console

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

use crate::global::with_console;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "E",
            Level::Warn => "W",
            Level::Info => "I",
            Level::Debug => "D",
            Level::Trace => "T",
        };
        // records raised while the console is busy are dropped
        with_console(|console| {
            let _ = writeln!(console, "[{}][{}] {}", tag, record.target(), record.args());
        });
    }

    fn flush(&self) {}
}

/// Route `log` records up to `level` to the installed console
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
