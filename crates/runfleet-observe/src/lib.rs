//! Logging for the runfleet daemon.
//!
//! - [`init_logger`] installs the global `tracing` subscriber (text, JSON or journald).
//! - [`SupervisorLog`] turns taskvisor lifecycle events into log records.
mod logger;
pub use logger::*;

mod supervisor_log;
pub use supervisor_log::SupervisorLog;
