mod clock;
mod config;
mod error;
mod format;
mod level;

pub use clock::{LogClock, LoggerTimeZone, init_local_offset};
pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Call once, early in `main`. For [`LoggerTimeZone::Local`] call
/// [`init_local_offset`] before the async runtime starts.
///
/// ```rust
/// use runfleet_observe::{LoggerConfig, init_logger};
///
/// init_logger(&LoggerConfig::default()).expect("logger");
/// tracing::info!("logger ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();
    let registry = tracing_subscriber::registry().with(filter);

    match cfg.format {
        LoggerFormat::Text => install(
            registry.with(
                fmt::layer()
                    .with_ansi(cfg.should_use_color())
                    .with_target(cfg.with_targets)
                    .with_timer(LogClock::new(cfg.tz)),
            ),
        ),
        LoggerFormat::Json => install(
            registry.with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(cfg.with_targets)
                    .with_current_span(true)
                    .with_timer(LogClock::new(cfg.tz)),
            ),
        ),
        LoggerFormat::Journald => install(registry.with(journald_layer()?)),
    }
}

#[cfg(target_os = "linux")]
fn journald_layer() -> LoggerResult<tracing_journald::Layer> {
    tracing_journald::layer()
        .map(|l| l.with_syslog_identifier("runfleetd".to_string()))
        .map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))
}

#[cfg(not(target_os = "linux"))]
fn journald_layer() -> LoggerResult<tracing_journald::Layer> {
    Err(LoggerError::JournaldNotSupported)
}

fn install<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        let cfg = LoggerConfig {
            use_color: false,
            ..LoggerConfig::default()
        };
        let first = init_logger(&cfg);
        let second = init_logger(&cfg);
        assert!(first.is_ok() || matches!(first, Err(LoggerError::AlreadyInitialized)));
        assert!(matches!(second, Err(LoggerError::AlreadyInitialized)));
    }
}
