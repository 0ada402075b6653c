//! The thread-safe ordered document.
//!
//! [`Document`] is a handle to an insertion-ordered map of string keys to
//! [`Value`]s guarded by a [`parking_lot::Mutex`]. Cloning a handle is cheap
//! and shares the storage; use [`Document::deep_clone`] for an independent
//! copy.
//!
//! Every operation takes the lock for the shortest possible span. Recursive
//! operations copy the entries they need, release the lock, then descend, so
//! no two document locks are ever held at once and nested documents that are
//! being mutated from other threads cannot deadlock a reader.
//!
//! ## Examples
//!
//! ```rust
//! use flexjson::{Document, Value};
//!
//! let doc = Document::new();
//! doc.set("name", "Alice");
//! doc.set("age", 30);
//!
//! assert_eq!(doc.len(), 2);
//! assert_eq!(doc.get("name").as_str(), Some("Alice"));
//! assert_eq!(doc.get("missing"), Value::Null);
//! ```

use crate::shape::Shape;
use crate::{Context, Error, Record, Result, Value, WireFormat};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// A shared, lock-guarded, insertion-ordered map of keys to values.
///
/// # Examples
///
/// ```rust
/// use flexjson::Document;
///
/// let doc = Document::new();
/// doc.set("first", 1);
/// doc.set("second", 2);
///
/// // Iteration maintains insertion order
/// assert_eq!(doc.keys(), vec!["first", "second"]);
///
/// // Clones share storage
/// let alias = doc.clone();
/// alias.set("third", 3);
/// assert_eq!(doc.len(), 3);
/// ```
#[derive(Clone, Default)]
pub struct Document {
    inner: Arc<Mutex<IndexMap<String, Value>>>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Document::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Document::from(IndexMap::with_capacity(capacity))
    }

    /// Identity of the underlying storage, shared by every clone of this handle.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    /// Returns `true` if both handles point at the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Copies the entries out under the lock.
    pub(crate) fn snapshot(&self) -> IndexMap<String, Value> {
        self.inner.lock().clone()
    }

    /// Returns an independent copy, copying nested documents as well.
    #[must_use]
    pub fn deep_clone(&self) -> Document {
        self.deep_clone_in(&mut Vec::new())
    }

    fn deep_clone_in(&self, path: &mut Vec<(usize, Document)>) -> Document {
        if let Some((_, copy)) = path.iter().find(|(id, _)| *id == self.id()) {
            return copy.clone();
        }
        let copy = Document::new();
        path.push((self.id(), copy.clone()));
        for (key, value) in self.snapshot() {
            copy.set(key, deep_clone_value(value, path));
        }
        path.pop();
        copy
    }

    /// Returns the value for `key`, or [`Value::Null`] when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.try_get(key).unwrap_or_default()
    }

    /// Returns the value for `key`, or `None` when absent.
    #[must_use]
    pub fn try_get(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    /// Returns the value for `key`, failing with [`Error::MissingKey`] when absent.
    pub fn require_value(&self, key: &str) -> Result<Value> {
        self.try_get(key)
            .ok_or_else(|| Error::missing_key_in(key, self))
    }

    /// Sets `key` to `value`, replacing any previous value in place.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let previous = self.inner.lock().insert(key.into(), value.into());
        drop(previous);
    }

    /// Sets `key` and returns the previous value, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::{Document, Value};
    ///
    /// let doc = Document::new();
    /// assert!(doc.insert("key", 42).is_none());
    /// assert_eq!(doc.insert("key", 43), Some(Value::from(42)));
    /// ```
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.lock().insert(key.into(), value.into())
    }

    /// Stores any serializable value under `key` via the structural path.
    pub fn set_serialized<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = crate::to_value(value)?;
        self.set(key, value);
        Ok(())
    }

    /// Removes `key`, keeping the order of the remaining entries.
    /// Returns `true` if the key was present.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.inner.lock().shift_remove(key);
        removed.is_some()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.inner.lock());
        drop(entries);
    }

    /// Snapshot of the keys, in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Snapshot of the values, in insertion order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.inner.lock().values().cloned().collect()
    }

    /// Snapshot of the entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.snapshot().into_iter().collect()
    }

    /// Returns `true` if `key` appears here or in any nested document.
    ///
    /// Documents held inside arrays are not searched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::doc;
    ///
    /// let d = doc!({ "outer": { "inner": 1 } });
    /// assert!(d.contains_key_recursive("inner"));
    /// assert!(!d.contains_key_recursive("other"));
    /// ```
    #[must_use]
    pub fn contains_key_recursive(&self, key: &str) -> bool {
        self.contains_key_in(key, &mut HashSet::new())
    }

    fn contains_key_in(&self, key: &str, seen: &mut HashSet<usize>) -> bool {
        if !seen.insert(self.id()) {
            return false;
        }
        for (k, value) in self.snapshot() {
            if k == key {
                return true;
            }
            if let Value::Object(nested) = value {
                if nested.contains_key_in(key, seen) {
                    return true;
                }
            }
        }
        false
    }

    /// Returns `true` if `value` equals any value here or in a nested document.
    ///
    /// Documents held inside arrays are not searched.
    #[must_use]
    pub fn contains_value_recursive(&self, value: &Value) -> bool {
        self.contains_value_in(value, &mut HashSet::new())
    }

    fn contains_value_in(&self, target: &Value, seen: &mut HashSet<usize>) -> bool {
        if !seen.insert(self.id()) {
            return false;
        }
        for value in self.values() {
            if value == *target {
                return true;
            }
            if let Value::Object(nested) = value {
                if nested.contains_value_in(target, seen) {
                    return true;
                }
            }
        }
        false
    }

    /// Removes `key` from this document and from every nested document.
    ///
    /// With `fuzzy`, every key containing `key` case-insensitively is removed,
    /// and documents inside arrays are searched too.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::doc;
    ///
    /// let d = doc!({ "Password": "x", "nested": { "passwordHash": "y", "keep": 1 } });
    /// d.remove_recursive("password", true);
    /// assert_eq!(d.to_text(), r#"{"nested":{"keep":1}}"#);
    /// ```
    pub fn remove_recursive(&self, key: &str, fuzzy: bool) -> &Self {
        let mut seen = HashSet::new();
        if fuzzy {
            self.remove_fuzzy(&key.to_lowercase(), &mut seen);
        } else {
            self.remove_exact(key, &mut seen);
        }
        self
    }

    fn remove_exact(&self, key: &str, seen: &mut HashSet<usize>) {
        if !seen.insert(self.id()) {
            return;
        }
        let (removed, children): (Option<Value>, Vec<Document>) = {
            let mut map = self.inner.lock();
            let removed = map.shift_remove(key);
            let children = map
                .values()
                .filter_map(|v| v.as_object().cloned())
                .collect();
            (removed, children)
        };
        drop(removed);
        for child in children {
            child.remove_exact(key, seen);
        }
    }

    fn remove_fuzzy(&self, needle: &str, seen: &mut HashSet<usize>) {
        if !seen.insert(self.id()) {
            return;
        }
        let (removed, children): (Vec<Value>, Vec<Document>) = {
            let mut map = self.inner.lock();
            let matching: Vec<String> = map
                .keys()
                .filter(|k| k.to_lowercase().contains(needle))
                .cloned()
                .collect();
            let removed = matching
                .iter()
                .filter_map(|k| map.shift_remove(k))
                .collect();
            let mut found = Vec::new();
            for value in map.values() {
                collect_documents(value, &mut found);
            }
            (removed, found)
        };
        drop(removed);
        for child in children {
            child.remove_fuzzy(needle, seen);
        }
    }

    /// Returns a new document with keys in ascending order, recursively.
    ///
    /// Documents inside arrays keep their order.
    #[must_use]
    pub fn sort(&self) -> Document {
        self.sort_in(&mut Vec::new())
    }

    fn sort_in(&self, path: &mut Vec<usize>) -> Document {
        if path.contains(&self.id()) {
            return self.clone();
        }
        path.push(self.id());
        let mut entries = self.entries();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let sorted = Document::with_capacity(entries.len());
        for (key, value) in entries {
            let value = match value {
                Value::Object(nested) => Value::Object(nested.sort_in(path)),
                other => other,
            };
            sorted.set(key, value);
        }
        path.pop();
        sorted
    }

    /// Merges `other` into this document.
    ///
    /// A key from `other` is copied when this document lacks it, when its
    /// value here is null or blank text, or when `prioritize_other` is set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::doc;
    ///
    /// let a = doc!({ "x": 1, "y": "" });
    /// a.combine(&doc!({ "x": 2, "y": "filled", "z": 3 }), false);
    /// assert_eq!(a.to_text(), r#"{"x":1,"y":"filled","z":3}"#);
    /// ```
    pub fn combine(&self, other: &Document, prioritize_other: bool) -> &Self {
        if self.ptr_eq(other) {
            return self;
        }
        let incoming = other.snapshot();
        let mut displaced = Vec::new();
        let mut map = self.inner.lock();
        for (key, value) in incoming {
            let replace = prioritize_other
                || map.get(&key).map_or(true, Value::is_blank);
            if replace {
                displaced.extend(map.insert(key, value));
            }
        }
        drop(map);
        drop(displaced);
        self
    }

    /// Converts the value under `key`, failing if it is absent or unconvertible.
    ///
    /// Uses [`Context::global`]; see [`Context::require`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexjson::doc;
    ///
    /// let d = doc!({ "count": "12", "ratio": 2.5 });
    /// let count: i32 = d.require("count").unwrap();
    /// assert_eq!(count, 12);
    /// // 2.5 rounds half to even
    /// assert_eq!(d.require::<i64>("ratio").unwrap(), 2);
    /// ```
    pub fn require<T: Shape>(&self, key: &str) -> Result<T> {
        Context::global().require(self, key)
    }

    /// Converts the value under `key`, falling back to the zero value.
    ///
    /// Uses [`Context::global`]; see [`Context::optional`].
    pub fn optional<T: Shape>(&self, key: &str) -> Result<T> {
        Context::global().optional(self, key)
    }

    /// Writes this document as compact text.
    #[must_use]
    pub fn to_text(&self) -> String {
        crate::text::document_to_string(self, Context::global())
    }

    /// Writes this document as indented text.
    #[must_use]
    pub fn to_text_pretty(&self) -> String {
        let ctx = Context::global();
        crate::text::document_to_string_with(self, ctx, &ctx.options().clone().with_pretty(true))
    }

    /// Parses a document from text.
    pub fn parse(text: &str) -> Result<Document> {
        crate::text::parse_document(text, Context::global())
    }

    /// Writes this document in the binary format.
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        crate::binary::to_bytes(self, Context::global())
    }

    /// Reads a document from the binary format.
    pub fn from_binary(bytes: &[u8]) -> Result<Document> {
        crate::binary::from_bytes(bytes, Context::global())
    }

    /// Maps a record to a document using the keys declared for `format`.
    pub fn from_model<T: Record>(record: &T, format: WireFormat) -> Document {
        let ctx = Context::global();
        crate::registry::mapping::<T>(ctx).write(record, format, ctx)
    }

    /// Maps this document to a record using the keys declared for `format`.
    pub fn to_model<T: Record>(&self, format: WireFormat) -> Result<T> {
        let ctx = Context::global();
        let record = crate::registry::mapping::<T>(ctx).read(self, format, ctx)?;
        if ctx.options().validate_on_deserialize {
            record.validate_shape(ctx)?;
        }
        Ok(record)
    }
}

fn collect_documents(value: &Value, found: &mut Vec<Document>) {
    match value {
        Value::Object(doc) => found.push(doc.clone()),
        Value::Array(items) => {
            for item in items {
                collect_documents(item, found);
            }
        }
        _ => {}
    }
}

fn deep_clone_value(value: Value, path: &mut Vec<(usize, Document)>) -> Value {
    match value {
        Value::Object(doc) => Value::Object(doc.deep_clone_in(path)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| deep_clone_value(item, path))
                .collect(),
        ),
        other => other,
    }
}

impl Document {
    pub(crate) fn eq_in(&self, other: &Document, seen: &mut Vec<(usize, usize)>) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let pair = (self.id(), other.id());
        if seen.contains(&pair) {
            return true;
        }
        seen.push(pair);
        let left = self.snapshot();
        let right = other.snapshot();
        left.len() == right.len()
            && left.iter().all(|(key, value)| {
                right
                    .get(key)
                    .map_or(false, |other| crate::value::eq_in(value, other, seen))
            })
    }

    pub(crate) fn hash_in<H: Hasher>(&self, state: &mut H, path: &mut Vec<usize>) {
        let id = self.id();
        if path.contains(&id) {
            state.write_u8(0xFF);
            return;
        }
        path.push(id);
        let entries = self.snapshot();
        let mut combined: u64 = 0;
        for (key, value) in &entries {
            let mut entry = DefaultHasher::new();
            key.hash(&mut entry);
            crate::value::hash_in(value, &mut entry, path);
            combined = combined.wrapping_add(entry.finish());
        }
        path.pop();
        state.write_usize(entries.len());
        state.write_u64(combined);
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.eq_in(other, &mut Vec::new())
    }
}

/// Order-independent: two documents with the same entries hash alike.
impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_in(state, &mut Vec::new());
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.snapshot();
        f.debug_map().entries(entries.iter()).finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Document::parse(s)
    }
}

impl From<IndexMap<String, Value>> for Document {
    fn from(map: IndexMap<String, Value>) -> Self {
        Document {
            inner: Arc::new(Mutex::new(map)),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map: IndexMap<String, Value> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Document::from(map)
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let entries = self.snapshot();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (k, v) in &entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Object(doc) => Ok(doc),
            other => Err(serde::de::Error::invalid_type(
                serde::de::Unexpected::Other(other.kind_name()),
                &"a document",
            )),
        }
    }
}
