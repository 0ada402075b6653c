//! The coercion engine and its configuration.
//!
//! A [`Context`] bundles [`Options`] with an optional [`LogSink`]. Every
//! engine and codec entry point takes one explicitly; the convenience methods
//! on [`Document`] use [`Context::global`], which is installed at most once
//! with [`configure`].
//!
//! ## Required and optional values
//!
//! ```rust
//! use flexjson::{doc, Context, Error};
//!
//! let ctx = Context::default();
//! let d = doc!({ "age": "41", "nickname": null });
//!
//! let age: u8 = ctx.require(&d, "age").unwrap();
//! assert_eq!(age, 41);
//!
//! // absent keys fail for `require` and fall back for `optional`
//! assert!(matches!(ctx.require::<u8>(&d, "height"), Err(Error::MissingKey { .. })));
//! assert_eq!(ctx.optional::<u8>(&d, "height").unwrap(), 0);
//!
//! // a present null is not a usable required value
//! assert!(ctx.require::<Option<String>>(&d, "nickname").is_err());
//! ```

use crate::log::{dispatch, LogEvent, LogSink, Severity};
use crate::shape::{abstract_target, Shape};
use crate::{Document, Error, Options, Result, Value, WireFormat};
use std::fmt;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Context> = OnceLock::new();

/// Installs the process-wide context used by [`Document`] convenience methods.
///
/// Succeeds once. Later calls, and calls after the default context has
/// already been used, hand the context back unchanged.
pub fn configure(ctx: Context) -> std::result::Result<(), Context> {
    GLOBAL.set(ctx)
}

/// Options plus an optional diagnostic sink.
#[derive(Clone, Default)]
pub struct Context {
    options: Options,
    sink: Option<Arc<dyn LogSink>>,
    format: WireFormat,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options)
            .field("sink", &self.sink.is_some())
            .field("format", &self.format)
            .finish()
    }
}

impl Context {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Context {
            options,
            ..Context::default()
        }
    }

    /// Registers a sink for diagnostic events.
    #[must_use]
    pub fn with_sink(self, sink: impl LogSink + 'static) -> Self {
        self.with_shared_sink(Arc::new(sink))
    }

    #[must_use]
    pub fn with_shared_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The process-wide context; the default one if none was configured.
    pub fn global() -> &'static Context {
        GLOBAL.get_or_init(Context::default)
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// The wire format whose keys nested records are read with.
    #[must_use]
    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub(crate) fn for_format(&self, format: WireFormat) -> Context {
        Context {
            format,
            ..self.clone()
        }
    }

    /// Emits an event. Fails only for error and critical events with no sink.
    pub fn log(&self, severity: Severity, message: &str, data: Option<Value>) -> Result<()> {
        dispatch(self.sink.as_deref(), LogEvent::new(severity, message, data))
    }

    fn log_infallible(&self, severity: Severity, message: &str, data: Option<Value>) {
        // below error severity dispatch never fails
        let _ = self.log(severity, message, data);
    }

    pub fn verbose(&self, message: &str, data: Option<Value>) {
        self.log_infallible(Severity::Verbose, message, data);
    }

    pub fn info(&self, message: &str, data: Option<Value>) {
        self.log_infallible(Severity::Info, message, data);
    }

    pub fn warn(&self, message: &str, data: Option<Value>) {
        self.log_infallible(Severity::Warn, message, data);
    }

    pub fn good(&self, message: &str, data: Option<Value>) {
        self.log_infallible(Severity::Good, message, data);
    }

    pub fn error(&self, message: &str, data: Option<Value>) -> Result<()> {
        self.log(Severity::Error, message, data)
    }

    pub fn critical(&self, message: &str, data: Option<Value>) -> Result<()> {
        self.log(Severity::Critical, message, data)
    }

    /// Converts one value to `T`.
    ///
    /// Null produces the zero value (or the shape's null handling for
    /// enums); blank text counts as null for nullable shapes. Abstract
    /// targets are always rejected.
    pub fn translate<T: Shape>(&self, value: &Value) -> Result<T> {
        if T::is_abstract() {
            return Err(abstract_target::<T>());
        }
        match value {
            Value::Null => T::from_null(),
            Value::String(s) if T::nullable() && s.trim().is_empty() => T::from_null(),
            _ => T::from_value(value, self),
        }
    }

    /// Converts the value under `key`.
    ///
    /// Fails with [`Error::MissingKey`] when the key is absent and with
    /// [`Error::Conversion`] when the value cannot be converted, is out of an
    /// enum's declared range, or converts to null. Runs record validation
    /// when it is switched on.
    pub fn require<T: Shape>(&self, doc: &Document, key: &str) -> Result<T> {
        if T::is_abstract() {
            return Err(abstract_target::<T>());
        }
        let value = doc.require_value(key)?;
        let out: T = self.translate(&value)?;
        if out.is_none() {
            return Err(Error::deserialize(
                T::shape_name(),
                format!("required key '{}' converted to null", key),
            ));
        }
        self.validated(out)
    }

    /// Converts the value under `key`, degrading to the zero value.
    ///
    /// Absent keys and conversion failures produce the zero value; failures
    /// are reported as error events first, so with no sink registered they
    /// surface as [`Error::UnhandledLogEvent`]. Enum values outside the
    /// declared range clamp to the lowest declared value.
    pub fn optional<T: Shape>(&self, doc: &Document, key: &str) -> Result<T> {
        if T::is_abstract() {
            return Err(abstract_target::<T>());
        }
        let converted = match doc.try_get(key) {
            None => T::from_null().map_err(|err| (err, Value::Null)),
            Some(value) => self.translate(&value).map_err(|err| (err, value)),
        };
        let out = match converted {
            Ok(out) => out,
            Err(failure) => match T::floor() {
                Some(floor) => {
                    self.verbose(
                        "Value outside the declared range; using the lowest declared value.",
                        Some(Value::from(doc!({ "key": key, "type": (T::shape_name()) }))),
                    );
                    floor
                }
                None => {
                    let (err, value) = failure;
                    self.error(
                        "Could not convert data to a given type.",
                        Some(Value::from(doc!({
                            "key": key,
                            "type": (T::shape_name()),
                            "value": value,
                            "exception": (err.to_string())
                        }))),
                    )?;
                    T::zero()
                }
            },
        };
        self.validated(out)
    }

    fn validated<T: Shape>(&self, out: T) -> Result<T> {
        if self.options.validate_on_deserialize {
            out.validate_shape(self)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogEvent;
    use std::sync::Mutex;

    fn capturing() -> (Context, Arc<Mutex<Vec<LogEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let ctx = Context::default()
            .with_sink(move |event: &LogEvent| captured.lock().unwrap().push(event.clone()));
        (ctx, seen)
    }

    #[test]
    fn test_optional_failure_without_sink_is_unhandled() {
        let ctx = Context::default();
        let d = doc!({ "n": "abc" });
        let err = ctx.optional::<i32>(&d, "n").unwrap_err();
        assert!(matches!(err, Error::UnhandledLogEvent { .. }));
    }

    #[test]
    fn test_optional_failure_with_sink_degrades() {
        let (ctx, seen) = capturing();
        let d = doc!({ "n": "abc" });
        assert_eq!(ctx.optional::<i32>(&d, "n").unwrap(), 0);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].severity, Severity::Error);
    }

    #[test]
    fn test_require_conversion_failure() {
        let ctx = Context::default();
        let d = doc!({ "n": "abc" });
        assert!(ctx.require::<i32>(&d, "n").unwrap_err().is_conversion());
    }

    #[test]
    fn test_require_null_value() {
        let ctx = Context::default();
        let d = doc!({ "n": null });
        assert!(ctx.require::<Value>(&d, "n").unwrap_err().is_conversion());
        // non-nullable targets get their zero value
        assert_eq!(ctx.require::<i32>(&d, "n").unwrap(), 0);
    }

    #[test]
    fn test_global_configure_once() {
        let _ = Context::global();
        assert!(configure(Context::default()).is_err());
    }
}
