//! Logger initialisation.
//!
//! Sets up the `log` facade with a `fern` dispatcher writing timestamped
//! lines to stderr. The level defaults to `info` and can be overridden
//! with the `LEC_SIM_LOG_LEVEL` environment variable (`off`, `error`,
//! `warn`, `info`, `debug`, `trace`).

use std::env;

use log::LevelFilter;

/// Environment variable controlling the log level.
const LOG_LEVEL_ENV_VAR: &str = "LEC_SIM_LOG_LEVEL";

/// Initialises the program logger.
///
/// Unknown level names fall back to `info`. Calling this twice returns an
/// error from `fern`; callers that may run repeatedly (tests) can ignore it.
pub fn init() -> Result<(), fern::InitError> {
    let level = match env::var(LOG_LEVEL_ENV_VAR)
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {message}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
