use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::LoggerError;

const DEFAULT_LEVEL: &str = "info";

/// Validated `tracing_subscriber::EnvFilter` directive string.
///
/// Holds the raw filter exactly as configured (e.g. `"info"` or
/// `"runfleet_core=debug,runfleet_docker=trace,info"`) after checking it with
/// `EnvFilter::try_new`, so turning it into a filter later cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// Validates and wraps a filter string. Surrounding whitespace is trimmed.
    ///
    /// # Examples
    /// ```
    /// use runfleet_observe::LoggerLevel;
    ///
    /// let lvl = LoggerLevel::new(" debug ").unwrap();
    /// assert_eq!(lvl.as_str(), "debug");
    ///
    /// assert!(LoggerLevel::new("runfleet_core=loud").is_err());
    /// ```
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    /// Returns the filter string as configured.
    ///
    /// # Examples
    /// ```
    /// use runfleet_observe::LoggerLevel;
    ///
    /// let lvl = "runfleet_core=debug,info".parse::<LoggerLevel>().unwrap();
    /// assert_eq!(lvl.as_str(), "runfleet_core=debug,info");
    /// ```
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the `EnvFilter` installed by the logger.
    ///
    /// # Examples
    /// ```
    /// use runfleet_observe::LoggerLevel;
    ///
    /// let lvl = "taskvisor=warn,info".parse::<LoggerLevel>().unwrap();
    /// let _filter = lvl.to_env_filter();
    /// ```
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.as_str()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    }
}

/// `info` for every target.
///
/// # Examples
/// ```
/// use runfleet_observe::LoggerLevel;
///
/// assert_eq!(LoggerLevel::default().as_str(), "info");
/// ```
impl Default for LoggerLevel {
    fn default() -> Self {
        Self(DEFAULT_LEVEL.to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let s = s.trim().to_string();
        if s.is_empty() {
            return Err(LoggerError::InvalidLevel("empty filter".into()));
        }
        EnvFilter::try_new(&s)
            .map(|_| LoggerLevel(s.clone()))
            .map_err(|e| LoggerError::InvalidLevel(format!("{s}: {e}")))
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}
