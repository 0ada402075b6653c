//! Error types for document access, coercion and the wire codecs.
//!
//! ## Error Categories
//!
//! - **Missing keys**: a required key was absent from a [`Document`]
//! - **Conversions**: a value could not be coerced to or from a target shape,
//!   including malformed wire input and enum range violations
//! - **Model validation**: a record's validation routine reported errors
//! - **Unhandled log events**: an error-level diagnostic fired with no sink
//!
//! ## Examples
//!
//! ```rust
//! use flexjson::{Document, Error};
//!
//! let doc = Document::new();
//! let result: Result<String, Error> = doc.require("name");
//! assert!(matches!(result, Err(Error::MissingKey { .. })));
//! ```

use crate::log::LogEvent;
use crate::{Document, Value};
use std::fmt;
use thiserror::Error;

/// Which way a failed conversion was travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Serialize,
    Deserialize,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Serialize => f.write_str("serialize"),
            Direction::Deserialize => f.write_str("deserialize"),
        }
    }
}

/// Represents every failure the core can report.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A required key was absent.
    #[error("Document did not contain required key '{key}'.")]
    MissingKey {
        key: String,
        document: Option<Document>,
    },

    /// A value could not be coerced to or from the requested shape.
    #[error("Unable to {direction} {shape}: {info}")]
    Conversion {
        shape: String,
        info: String,
        direction: Direction,
    },

    /// A record's validation routine reported one or more errors.
    #[error("{shape} failed validation: {}", errors.join("; "))]
    ModelValidation { shape: String, errors: Vec<String> },

    /// An error or critical diagnostic fired with no registered sink.
    #[error("Unhandled {} log event: {}", event.severity, event.message)]
    UnhandledLogEvent { event: LogEvent },
}

impl Error {
    /// Creates a missing key error without a document snapshot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::Error;
    ///
    /// let err = Error::missing_key("email");
    /// assert!(err.to_string().contains("'email'"));
    /// ```
    pub fn missing_key(key: &str) -> Self {
        Error::MissingKey {
            key: key.to_string(),
            document: None,
        }
    }

    /// Creates a missing key error carrying the document that was searched.
    pub fn missing_key_in(key: &str, document: &Document) -> Self {
        Error::MissingKey {
            key: key.to_string(),
            document: Some(document.deep_clone()),
        }
    }

    /// Creates a conversion error for a value travelling in `direction`.
    pub fn conversion<S: fmt::Display, I: fmt::Display>(
        shape: S,
        info: I,
        direction: Direction,
    ) -> Self {
        Error::Conversion {
            shape: shape.to_string(),
            info: info.to_string(),
            direction,
        }
    }

    /// Shorthand for a conversion error on deserialize.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::Error;
    ///
    /// let err = Error::deserialize("i32", "value out of range");
    /// assert_eq!(err.to_string(), "Unable to deserialize i32: value out of range");
    /// ```
    pub fn deserialize<S: fmt::Display, I: fmt::Display>(shape: S, info: I) -> Self {
        Self::conversion(shape, info, Direction::Deserialize)
    }

    /// Shorthand for a conversion error on serialize.
    pub fn serialize<S: fmt::Display, I: fmt::Display>(shape: S, info: I) -> Self {
        Self::conversion(shape, info, Direction::Serialize)
    }

    /// Creates a deserialize failure for malformed text input.
    pub fn syntax(line: usize, col: usize, msg: &str) -> Self {
        Self::deserialize(
            "Document",
            format!("syntax error at line {}, column {}: {}", line, col, msg),
        )
    }

    /// Creates a model validation error.
    pub fn model_validation(shape: &str, errors: Vec<String>) -> Self {
        Error::ModelValidation {
            shape: shape.to_string(),
            errors,
        }
    }

    /// Returns `true` for [`Error::MissingKey`].
    #[must_use]
    pub fn is_missing_key(&self) -> bool {
        matches!(self, Error::MissingKey { .. })
    }

    /// Returns `true` for [`Error::Conversion`].
    #[must_use]
    pub fn is_conversion(&self) -> bool {
        matches!(self, Error::Conversion { .. })
    }

    /// Renders the error as a document so it can be embedded in other
    /// documents and written by either codec.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::Error;
    ///
    /// let doc = Error::missing_key("id").to_document();
    /// assert_eq!(doc.get("missingKey").as_str(), Some("id"));
    /// ```
    #[must_use]
    pub fn to_document(&self) -> Document {
        let doc = Document::new();
        doc.set("message", self.to_string());
        match self {
            Error::MissingKey { key, document } => {
                doc.set("missingKey", key.as_str());
                if let Some(document) = document {
                    doc.set("document", document.clone());
                }
            }
            Error::Conversion {
                shape,
                info,
                direction,
            } => {
                doc.set("attemptedType", shape.as_str());
                doc.set("info", info.as_str());
                doc.set("onDeserialize", *direction == Direction::Deserialize);
            }
            Error::ModelValidation { shape, errors } => {
                doc.set("model", shape.as_str());
                doc.set(
                    "errors",
                    Value::Array(errors.iter().map(|e| Value::from(e.as_str())).collect()),
                );
            }
            Error::UnhandledLogEvent { event } => {
                doc.set("severity", event.severity.to_string());
                doc.set("event", event.message.as_str());
                if let Some(data) = &event.data {
                    doc.set("data", data.clone());
                }
            }
        }
        doc
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::serialize("value", msg)
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::deserialize("value", msg)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_keeps_document_as_searched() {
        let searched = doc!({ "a": 1, "nested": { "b": 2 } });
        let err = searched.require_value("absent").unwrap_err();
        searched.set("a", 99);
        searched.get("nested").as_object().unwrap().set("b", 99);

        match err {
            Error::MissingKey { key, document: Some(document) } => {
                assert_eq!(key, "absent");
                assert!(!document.ptr_eq(&searched));
                assert_eq!(document, doc!({ "a": 1, "nested": { "b": 2 } }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
