use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::{LoggerFormat, LoggerLevel, LoggerTimeZone};

/// `[logger]` section of the daemon configuration.
///
/// Every key is optional; a missing key keeps its default (text output, `info`,
/// UTC timestamps, targets shown, colors on when stdout is a terminal).
///
/// # Examples
/// ```
/// use runfleet_observe::{LoggerConfig, LoggerFormat};
///
/// let cfg: LoggerConfig = toml::from_str(r#"
///     format = "json"
///     level = "runfleet_core=debug,info"
/// "#).unwrap();
/// assert_eq!(cfg.format, LoggerFormat::Json);
/// assert_eq!(cfg.level.as_str(), "runfleet_core=debug,info");
/// assert!(cfg.with_targets);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives; `RUST_LOG` is not consulted.
    pub level: LoggerLevel,
    pub tz: LoggerTimeZone,
    pub with_targets: bool,
    /// Colors are only emitted when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Whether the text formatter should emit ANSI colors.
    ///
    /// Requires the text format, `use_color` and a terminal on stdout; JSON
    /// output is never colored.
    ///
    /// # Examples
    /// ```
    /// use runfleet_observe::{LoggerConfig, LoggerFormat};
    ///
    /// let cfg = LoggerConfig { format: LoggerFormat::Json, ..LoggerConfig::default() };
    /// assert!(!cfg.should_use_color());
    /// ```
    pub fn should_use_color(&self) -> bool {
        self.format == LoggerFormat::Text && self.use_color && std::io::stdout().is_terminal()
    }

    /// Replace the level, e.g. from a command line flag.
    ///
    /// # Examples
    /// ```
    /// use runfleet_observe::{LoggerConfig, LoggerLevel};
    ///
    /// let cfg = LoggerConfig::default().with_level(LoggerLevel::new("warn").unwrap());
    /// assert_eq!(cfg.level.as_str(), "warn");
    /// ```
    pub fn with_level(mut self, level: LoggerLevel) -> Self {
        self.level = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = LoggerConfig::default();
        assert_eq!(cfg.format, LoggerFormat::Text);
        assert_eq!(cfg.tz, LoggerTimeZone::Utc);
        assert_eq!(cfg.level.as_str(), "info");
        assert!(cfg.with_targets);
    }

    #[test]
    fn partial_toml_section_keeps_defaults() {
        let cfg: LoggerConfig = toml::from_str(
            r#"
            format = "json"
            level = "runfleet_core=debug,info"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level.as_str(), "runfleet_core=debug,info");
        assert_eq!(cfg.tz, LoggerTimeZone::Utc);
        assert!(cfg.use_color);
    }

    #[test]
    fn invalid_level_rejects_section() {
        assert!(toml::from_str::<LoggerConfig>(r#"level = "x=loud""#).is_err());
    }

    #[test]
    fn json_never_uses_color() {
        let cfg = LoggerConfig {
            format: LoggerFormat::Json,
            ..LoggerConfig::default()
        };
        assert!(!cfg.should_use_color());
    }

    #[test]
    fn level_override() {
        let cfg = LoggerConfig::default().with_level("debug".parse().unwrap());
        assert_eq!(cfg.level.as_str(), "debug");
    }
}
