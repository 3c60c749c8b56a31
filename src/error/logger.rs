//! Logging bootstrap
//!
//! `main.rs` calls [`ErrorLogger::new`] once at startup; library code logs
//! through the `log`/`tracing` facades (re-exported in [`crate::prelude`])
//! and never touches this module directly.

use std::sync::Once;

static INIT: Once = Once::new();

/// Thin wrapper around `env_logger::Builder` that installs the global
/// logger exactly once, regardless of how many times it is constructed.
pub struct ErrorLogger;

impl ErrorLogger {
    /// Initialize the global logger at the given verbosity. Safe to call
    /// more than once (e.g. from tests); only the first call takes effect.
    pub fn new(level: tracing::Level) -> Self {
        INIT.call_once(|| {
            let filter = match level {
                tracing::Level::ERROR => log::LevelFilter::Error,
                tracing::Level::WARN => log::LevelFilter::Warn,
                tracing::Level::INFO => log::LevelFilter::Info,
                tracing::Level::DEBUG => log::LevelFilter::Debug,
                tracing::Level::TRACE => log::LevelFilter::Trace,
            };
            env_logger::Builder::new()
                .filter_level(filter)
                .format_timestamp_millis()
                .try_init()
                .ok();
        });
        ErrorLogger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_init_does_not_panic() {
        let _a = ErrorLogger::new(tracing::Level::DEBUG);
        let _b = ErrorLogger::new(tracing::Level::INFO);
    }
}
