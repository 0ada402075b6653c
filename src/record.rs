//! Declarative record mapping.
//!
//! A [`Record`] describes its fields once, in a [`Schema`]. Each [`Field`]
//! may name its wire key per format and carry an [`Ignore`] policy; the
//! [`registry`](crate::registry) resolves those declarations into a mapping
//! the first time a record type is used.
//!
//! There are two ways to declare keys and policies:
//!
//! - unified: [`Field::keys`] (keys for both formats plus a policy) and
//!   [`Field::ignore`];
//! - per format: [`Field::text_name`], [`Field::binary_name`],
//!   [`Field::ignore_if_null`] and [`Field::ignore_if_default`].
//!
//! Unified declarations win. When both are present a warning is emitted.
//!
//! ## Examples
//!
//! ```rust
//! use flexjson::{Document, Field, Keys, Record, Schema, WireFormat};
//!
//! #[derive(Clone, Default)]
//! struct User {
//!     username: String,
//!     email_address: String,
//! }
//!
//! impl Record for User {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .field(Field::new("username", |u: &User| &u.username, |u| &mut u.username)
//!                 .keys(Keys::new().text("username").binary("sn")))
//!             .field(Field::new("email_address", |u: &User| &u.email_address, |u| &mut u.email_address)
//!                 .keys(Keys::new().binary("email")))
//!     }
//! }
//!
//! let user = User { username: "Joe".into(), email_address: "joe@x.com".into() };
//! let text = Document::from_model(&user, WireFormat::Text);
//! assert_eq!(text.to_text(), r#"{"username":"Joe","emailAddress":"joe@x.com"}"#);
//!
//! let binary = Document::from_model(&user, WireFormat::Binary);
//! assert_eq!(binary.keys(), vec!["sn", "email"]);
//! ```

use crate::shape::{Kind, Shape};
use crate::{Context, Document, Result, Value};
use bitflags::bitflags;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The two wire formats a record can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WireFormat {
    #[default]
    Text,
    Binary,
}

impl WireFormat {
    /// Key the identity field is always written under.
    #[must_use]
    pub const fn identity_key(&self) -> &'static str {
        match self {
            WireFormat::Text => "id",
            WireFormat::Binary => "_id",
        }
    }

    pub(crate) const fn excluded(&self) -> Ignore {
        match self {
            WireFormat::Text => Ignore::IN_TEXT,
            WireFormat::Binary => Ignore::IN_BINARY,
        }
    }

    pub(crate) const fn when_null(&self) -> Ignore {
        match self {
            WireFormat::Text => Ignore::WHEN_TEXT_NULL,
            WireFormat::Binary => Ignore::WHEN_BINARY_NULL,
        }
    }

    pub(crate) const fn when_default(&self) -> Ignore {
        match self {
            WireFormat::Text => Ignore::WHEN_TEXT_DEFAULT,
            WireFormat::Binary => Ignore::WHEN_BINARY_DEFAULT,
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Text => f.write_str("text"),
            WireFormat::Binary => f.write_str("binary"),
        }
    }
}

bitflags! {
    /// When a field is left out of a wire format.
    ///
    /// "Default" skipping only applies to value-kind fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Ignore: u32 {
        const IN_TEXT = 0b0000_0001;
        const IN_BINARY = 0b0000_0010;
        const WHEN_TEXT_NULL = 0b0001_0000;
        const WHEN_TEXT_DEFAULT = 0b0010_0000;
        const WHEN_TEXT_NULL_OR_DEFAULT = 0b0011_0000;
        const WHEN_BINARY_NULL = 0b0100_0000;
        const WHEN_BINARY_DEFAULT = 0b1000_0000;
        const WHEN_BINARY_NULL_OR_DEFAULT = 0b1100_0000;
        const WHEN_NULL = 0b0101_0000;
        const WHEN_DEFAULT = 0b1010_0000;
        const WHEN_NULL_OR_DEFAULT = 0b1111_0000;
        const ALWAYS = 0x7FFF_FFFF;
    }
}

impl Ignore {
    pub const NEVER: Ignore = Ignore::empty();
}

/// Unified key declaration: one key per format plus an ignore policy.
///
/// The policy defaults to [`Ignore::WHEN_NULL_OR_DEFAULT`].
#[derive(Debug, Clone, PartialEq)]
pub struct Keys {
    pub(crate) text: Option<String>,
    pub(crate) binary: Option<String>,
    pub(crate) ignore: Ignore,
}

impl Default for Keys {
    fn default() -> Self {
        Keys {
            text: None,
            binary: None,
            ignore: Ignore::WHEN_NULL_OR_DEFAULT,
        }
    }
}

impl Keys {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, key: impl Into<String>) -> Self {
        self.text = Some(key.into());
        self
    }

    #[must_use]
    pub fn binary(mut self, key: impl Into<String>) -> Self {
        self.binary = Some(key.into());
        self
    }

    #[must_use]
    pub fn ignore(mut self, ignore: Ignore) -> Self {
        self.ignore = ignore;
        self
    }

    pub(crate) fn key(&self, format: WireFormat) -> Option<&str> {
        let key = match format {
            WireFormat::Text => self.text.as_deref(),
            WireFormat::Binary => self.binary.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

type Reader<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Writer<T> = Box<dyn Fn(&mut T, &Value, &Context) -> Result<()> + Send + Sync>;
type Probe<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// One declared field of a record.
pub struct Field<T> {
    pub(crate) name: &'static str,
    pub(crate) kind: Kind,
    pub(crate) identity: bool,
    pub(crate) keys: Option<Keys>,
    pub(crate) ignore: Option<Ignore>,
    pub(crate) text_name: Option<String>,
    pub(crate) binary_name: Option<String>,
    /// Per-format null/default flags, combined.
    pub(crate) legacy: Ignore,
    pub(crate) read: Reader<T>,
    pub(crate) write: Writer<T>,
    pub(crate) is_default: Probe<T>,
}

impl<T: 'static> Field<T> {
    /// Declares a field through a pair of accessors.
    pub fn new<F: Shape + 'static>(
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        Field {
            name,
            kind: F::KIND,
            identity: false,
            keys: None,
            ignore: None,
            text_name: None,
            binary_name: None,
            legacy: Ignore::NEVER,
            read: Box::new(move |record| get(record).to_value()),
            write: Box::new(move |record, value, ctx| {
                *get_mut(record) = ctx.translate::<F>(value)?;
                Ok(())
            }),
            is_default: Box::new(move |record| get(record).is_zero()),
        }
    }

    #[must_use]
    pub fn keys(mut self, keys: Keys) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Sets the unified ignore policy. Overrides the policy carried by [`Keys`].
    #[must_use]
    pub fn ignore(mut self, ignore: Ignore) -> Self {
        self.ignore = Some(ignore);
        self
    }

    /// Per-format key for text output.
    #[must_use]
    pub fn text_name(mut self, key: impl Into<String>) -> Self {
        self.text_name = Some(key.into());
        self
    }

    /// Per-format key for binary output.
    #[must_use]
    pub fn binary_name(mut self, key: impl Into<String>) -> Self {
        self.binary_name = Some(key.into());
        self
    }

    #[must_use]
    pub fn ignore_if_null(mut self, format: WireFormat) -> Self {
        self.legacy |= format.when_null();
        self
    }

    #[must_use]
    pub fn ignore_if_default(mut self, format: WireFormat) -> Self {
        self.legacy |= format.when_default();
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn legacy_name(&self, format: WireFormat) -> Option<&str> {
        let key = match format {
            WireFormat::Text => self.text_name.as_deref(),
            WireFormat::Binary => self.binary_name.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    /// Legacy flags that concern `format`.
    pub(crate) fn legacy_for(&self, format: WireFormat) -> Ignore {
        self.legacy & (format.when_null() | format.when_default())
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .field("keys", &self.keys)
            .field("ignore", &self.ignore)
            .finish_non_exhaustive()
    }
}

/// The ordered field declarations of a record type.
pub struct Schema<T> {
    pub(crate) fields: Vec<Field<T>>,
}

impl<T: 'static> Schema<T> {
    #[must_use]
    pub fn new() -> Self {
        Schema { fields: Vec::new() }
    }

    #[must_use]
    pub fn field(mut self, field: Field<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares the identity field.
    ///
    /// It is written under `id` in text and `_id` in binary, is never
    /// ignored, and gets a fresh [`ObjectId`](crate::ObjectId) when blank.
    #[must_use]
    pub fn identity<F: Shape + 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        let mut field = Field::new(name, get, get_mut);
        field.identity = true;
        self.field(field)
    }

    /// Like [`Schema::identity`], for a field that also carries declarations.
    /// Key and policy declarations on it are overridden with a warning.
    #[must_use]
    pub fn identity_field(self, mut field: Field<T>) -> Self {
        field.identity = true;
        self.field(field)
    }
}

impl<T: 'static> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A typed record that can be mapped to and from documents.
pub trait Record: Any + Clone + Default + Send + Sync {
    fn schema() -> Schema<Self>;

    /// Reports validation errors. Called when validation is switched on.
    fn validate(&self, errors: &mut Vec<String>) {
        let _ = errors;
    }

    /// Short type name used in diagnostics.
    fn name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Text written in place of the record when it cannot be walked.
    fn display(&self) -> String {
        Self::name().to_string()
    }
}

/// Records a validation error unless `condition` holds.
///
/// # Examples
///
/// ```rust
/// let mut errors = Vec::new();
/// flexjson::check(1 + 1 == 2, "math works", &mut errors);
/// flexjson::check("".is_empty() == false, "name is required", &mut errors);
/// assert_eq!(errors, vec!["name is required".to_string()]);
/// ```
pub fn check(condition: bool, error: &str, errors: &mut Vec<String>) {
    if !condition {
        errors.push(error.to_string());
    }
}

pub(crate) trait ErasedRecord: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn display(&self) -> String;
    fn to_document(&self, format: WireFormat, ctx: &Context) -> Document;
    /// Every mapped field value, ignoring policies.
    fn field_values(&self, ctx: &Context) -> Vec<Value>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Record> ErasedRecord for T {
    fn type_name(&self) -> &'static str {
        T::name()
    }

    fn display(&self) -> String {
        Record::display(self)
    }

    fn to_document(&self, format: WireFormat, ctx: &Context) -> Document {
        crate::registry::mapping::<T>(ctx).write(self, format, ctx)
    }

    fn field_values(&self, ctx: &Context) -> Vec<Value> {
        crate::registry::mapping::<T>(ctx).field_values(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Stands in for a record of unknown type.
struct Opaque;

impl ErasedRecord for Opaque {
    fn type_name(&self) -> &'static str {
        "RecordHandle"
    }

    fn display(&self) -> String {
        "RecordHandle".to_string()
    }

    fn to_document(&self, _format: WireFormat, _ctx: &Context) -> Document {
        Document::new()
    }

    fn field_values(&self, _ctx: &Context) -> Vec<Value> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A shared, type-erased record stored inside a [`Value`].
///
/// Clones share the record, and the cycle check used by the writers works on
/// that shared identity.
#[derive(Clone)]
pub struct RecordHandle(Arc<dyn ErasedRecord>);

impl RecordHandle {
    pub fn new<T: Record>(record: T) -> Self {
        RecordHandle(Arc::new(record))
    }

    pub fn from_arc<T: Record>(record: Arc<T>) -> Self {
        RecordHandle(record)
    }

    pub(crate) fn opaque() -> Self {
        RecordHandle(Arc::new(Opaque))
    }

    #[must_use]
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    #[must_use]
    pub fn display(&self) -> String {
        self.0.display()
    }

    /// Maps the record to a document with the keys declared for `format`.
    #[must_use]
    pub fn to_document(&self, format: WireFormat, ctx: &Context) -> Document {
        self.0.to_document(format, ctx)
    }

    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &RecordHandle) -> bool {
        self.id() == other.id()
    }

    /// Records of the same type are equal when their mapped field values are.
    pub(crate) fn eq_in(&self, other: &RecordHandle, seen: &mut Vec<(usize, usize)>) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.0.as_any().type_id() != other.0.as_any().type_id() {
            return false;
        }
        let pair = (self.id(), other.id());
        if seen.contains(&pair) {
            return true;
        }
        seen.push(pair);
        let ctx = Context::global();
        let left = self.0.field_values(ctx);
        let right = other.0.field_values(ctx);
        left.len() == right.len()
            && left
                .iter()
                .zip(&right)
                .all(|(a, b)| crate::value::eq_in(a, b, seen))
    }

    pub(crate) fn hash_in<H: Hasher>(&self, state: &mut H, path: &mut Vec<usize>) {
        self.type_name().hash(state);
        let id = self.id();
        if path.contains(&id) {
            return;
        }
        path.push(id);
        for value in self.0.field_values(Context::global()) {
            crate::value::hash_in(&value, state, path);
        }
        path.pop();
    }

    /// Returns `true` if walking this record revisits an object already on
    /// the current path.
    #[must_use]
    pub fn has_cycle(&self, ctx: &Context) -> bool {
        visit_record(self, &mut Vec::new(), ctx)
    }
}

fn visit_record(handle: &RecordHandle, path: &mut Vec<usize>, ctx: &Context) -> bool {
    let id = handle.id();
    if path.contains(&id) {
        return true;
    }
    path.push(id);
    let found = handle
        .0
        .field_values(ctx)
        .iter()
        .any(|value| visit_value(value, path, ctx));
    path.pop();
    found
}

fn visit_value(value: &Value, path: &mut Vec<usize>, ctx: &Context) -> bool {
    match value {
        Value::Record(handle) => visit_record(handle, path, ctx),
        Value::Object(doc) => {
            let id = doc.id();
            if path.contains(&id) {
                return true;
            }
            path.push(id);
            let found = doc.values().iter().any(|value| visit_value(value, path, ctx));
            path.pop();
            found
        }
        Value::Array(items) => items.iter().any(|item| visit_value(item, path, ctx)),
        _ => false,
    }
}

impl PartialEq for RecordHandle {
    fn eq(&self, other: &Self) -> bool {
        self.eq_in(other, &mut Vec::new())
    }
}

impl fmt::Debug for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordHandle({})", self.type_name())
    }
}
