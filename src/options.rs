//! Configuration options for reading and writing documents.
//!
//! ## Examples
//!
//! ```rust
//! use flexjson::{doc, Context, Options};
//!
//! let ctx = Context::new(Options::pretty().with_indent(4));
//! let text = flexjson::text::document_to_string(&doc!({ "a": 1 }), &ctx);
//! assert_eq!(text, "{\n    \"a\": 1\n}");
//! ```

/// Configuration consulted by the coercion engine and both codecs.
///
/// # Examples
///
/// ```rust
/// use flexjson::Options;
///
/// // Default compact options
/// let options = Options::new();
/// assert!(!options.pretty);
///
/// // Custom configuration
/// let options = Options::new()
///     .with_validation(true)
///     .with_trimmed_strings(true);
/// assert!(options.validate_on_deserialize);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Run record validation after a record is produced by the engine.
    pub validate_on_deserialize: bool,
    /// Trim surrounding whitespace from string values read from text.
    pub trim_strings: bool,
    pub pretty: bool,
    pub indent: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            validate_on_deserialize: false,
            trim_strings: false,
            pretty: false,
            indent: 2,
        }
    }
}

impl Options {
    /// Creates default options (compact output, no validation, no trimming).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::Options;
    ///
    /// let options = Options::new();
    /// assert_eq!(options.indent, 2);
    /// assert!(!options.validate_on_deserialize);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for indented text output.
    #[must_use]
    pub fn pretty() -> Self {
        Options {
            pretty: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_on_deserialize = validate;
        self
    }

    #[must_use]
    pub fn with_trimmed_strings(mut self, trim: bool) -> Self {
        self.trim_strings = trim;
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the indentation width used when `pretty` is on.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}
