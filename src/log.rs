//! Diagnostic events.
//!
//! The core reports what it notices (precedence conflicts in record
//! declarations, lossy conversions, unreadable binary tags) as [`LogEvent`]s.
//! Every event is forwarded to [`tracing`], and, when one is registered, to the
//! [`LogSink`] on the active [`Context`](crate::Context).
//!
//! Error and critical events are not optional: when no sink is registered they
//! surface as [`Error::UnhandledLogEvent`].
//!
//! ```rust
//! use flexjson::{Context, LogEvent, Options, Severity};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let ctx = Context::new(Options::new())
//!     .with_sink(move |event: &LogEvent| sink.lock().unwrap().push(event.severity));
//!
//! ctx.warn("something odd", None);
//! assert_eq!(seen.lock().unwrap().as_slice(), &[Severity::Warn]);
//! ```

use crate::{Error, Result, Value};
use std::fmt;

/// How serious a diagnostic event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Verbose,
    Info,
    Warn,
    Error,
    Critical,
    /// A positive milestone, e.g. a completed registration pass.
    Good,
}

impl Severity {
    /// Returns `true` for severities that must be handled by a sink.
    #[inline]
    #[must_use]
    pub const fn requires_sink(&self) -> bool {
        matches!(self, Severity::Error | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Verbose => "verbose",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
            Severity::Good => "good",
        };
        f.write_str(name)
    }
}

/// A single diagnostic event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub severity: Severity,
    pub message: String,
    pub data: Option<Value>,
}

impl LogEvent {
    pub fn new(severity: Severity, message: impl Into<String>, data: Option<Value>) -> Self {
        LogEvent {
            severity,
            message: message.into(),
            data,
        }
    }
}

/// Receives diagnostic events.
///
/// Implemented for any `Fn(&LogEvent) + Send + Sync` closure.
pub trait LogSink: Send + Sync {
    fn on_log(&self, event: &LogEvent);
}

impl<F> LogSink for F
where
    F: Fn(&LogEvent) + Send + Sync,
{
    fn on_log(&self, event: &LogEvent) {
        self(event)
    }
}

/// Forwards an event to `tracing`, then to the sink if there is one.
pub(crate) fn dispatch(sink: Option<&dyn LogSink>, event: LogEvent) -> Result<()> {
    let data = event
        .data
        .as_ref()
        .map(|data| crate::text::to_string(data))
        .unwrap_or_default();

    match event.severity {
        Severity::Verbose => tracing::trace!(data = %data, "{}", event.message),
        Severity::Info => tracing::info!(data = %data, "{}", event.message),
        Severity::Good => tracing::info!(good = true, data = %data, "{}", event.message),
        Severity::Warn => tracing::warn!(data = %data, "{}", event.message),
        Severity::Error => tracing::error!(data = %data, "{}", event.message),
        Severity::Critical => tracing::error!(critical = true, data = %data, "{}", event.message),
    }

    match sink {
        Some(sink) => {
            sink.on_log(&event);
            Ok(())
        }
        None if event.severity.requires_sink() => Err(Error::UnhandledLogEvent { event }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_unhandled_error_without_sink() {
        let result = dispatch(None, LogEvent::new(Severity::Error, "boom", None));
        match result {
            Err(Error::UnhandledLogEvent { event }) => assert_eq!(event.message, "boom"),
            other => panic!("expected unhandled event, got {:?}", other),
        }

        let result = dispatch(None, LogEvent::new(Severity::Critical, "boom", None));
        assert!(result.is_err());
    }

    #[test]
    fn test_lower_severities_without_sink() {
        for severity in [
            Severity::Verbose,
            Severity::Info,
            Severity::Warn,
            Severity::Good,
        ] {
            assert!(dispatch(None, LogEvent::new(severity, "fine", None)).is_ok());
        }
    }

    #[test]
    fn test_sink_receives_error_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let sink = move |event: &LogEvent| captured.lock().unwrap().push(event.clone());

        dispatch(
            Some(&sink),
            LogEvent::new(Severity::Error, "handled", Some(Value::from(42))),
        )
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].data, Some(Value::from(42)));
    }
}
