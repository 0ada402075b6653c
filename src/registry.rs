//! Resolved record mappings.
//!
//! The first time a record type is mapped, its [`Schema`] is resolved once
//! per wire format into a [`Mapping`]: the key every field is written under
//! and the ignore policy that applies to it. Mappings are cached for the life
//! of the process. Concurrent first uses may both resolve; the last one to
//! finish is kept, and both results are identical.
//!
//! ## Key resolution, per format
//!
//! 1. The identity field always uses `id` (text) or `_id` (binary).
//! 2. A key from [`Keys`](crate::Keys).
//! 3. A per-format key from [`Field::text_name`] or [`Field::binary_name`].
//! 4. The field name in camelCase.
//!
//! ## Policy resolution, per format
//!
//! 1. A unified policy: [`Field::ignore`], else the policy in [`Keys`](crate::Keys).
//! 2. Per-format null/default flags, combined.
//! 3. [`Ignore::NEVER`], with a warning noting that nothing was declared.
//!
//! The identity field is never ignored.

use crate::record::{Field, Schema};
use crate::shape::Kind;
use crate::{Context, Document, Ignore, ObjectId, Record, Result, Value, WireFormat};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

type Cache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static MAPPINGS: OnceLock<Cache> = OnceLock::new();

fn cache() -> &'static Cache {
    MAPPINGS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the mapping for `T`, resolving it on first use.
pub fn mapping<T: Record>(ctx: &Context) -> Arc<Mapping<T>> {
    let id = TypeId::of::<T>();
    let cached = cache().read().get(&id).cloned();
    if let Some(Ok(found)) = cached.map(|entry| entry.downcast::<Mapping<T>>()) {
        return found;
    }

    let resolved = Arc::new(Mapping::resolve(T::schema(), ctx));
    cache().write().insert(id, resolved.clone());
    resolved
}

/// One field's resolved key and policy for a single format.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub policy: Ignore,
    pub(crate) field: usize,
}

#[derive(Debug, Clone, Default)]
struct Table {
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
}

/// The resolved mapping of a record type.
pub struct Mapping<T> {
    name: &'static str,
    fields: Vec<Field<T>>,
    text: Table,
    binary: Table,
}

impl<T: Record> Mapping<T> {
    fn resolve(schema: Schema<T>, ctx: &Context) -> Self {
        let fields = schema.fields;
        let text = resolve_table(T::name(), &fields, WireFormat::Text, ctx);
        let binary = resolve_table(T::name(), &fields, WireFormat::Binary, ctx);
        Mapping {
            name: T::name(),
            fields,
            text,
            binary,
        }
    }

    fn table(&self, format: WireFormat) -> &Table {
        match format {
            WireFormat::Text => &self.text,
            WireFormat::Binary => &self.binary,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Resolved entries for `format`, in declaration order.
    #[must_use]
    pub fn entries(&self, format: WireFormat) -> &[Entry] {
        &self.table(format).entries
    }

    /// Resolved entry for the field named `field`.
    #[must_use]
    pub fn entry(&self, field: &str, format: WireFormat) -> Option<&Entry> {
        self.table(format)
            .entries
            .iter()
            .find(|entry| self.fields[entry.field].name == field)
    }

    /// Name of the field an entry was resolved from.
    #[must_use]
    pub fn field_name(&self, entry: &Entry) -> &'static str {
        self.fields[entry.field].name
    }

    #[must_use]
    pub fn is_identity(&self, entry: &Entry) -> bool {
        self.fields[entry.field].identity
    }

    /// Writes `record` as a document keyed for `format`.
    pub fn write(&self, record: &T, format: WireFormat, _ctx: &Context) -> Document {
        let doc = Document::with_capacity(self.fields.len());
        for entry in &self.table(format).entries {
            let field = &self.fields[entry.field];
            let value = (field.read)(record);

            if field.identity {
                doc.set(entry.key.clone(), identity_value(value, format));
                continue;
            }
            if entry.policy.contains(format.excluded()) {
                continue;
            }
            if value.is_null() && entry.policy.contains(format.when_null()) {
                continue;
            }
            if field.kind == Kind::Value
                && entry.policy.contains(format.when_default())
                && (field.is_default)(record)
            {
                continue;
            }
            doc.set(entry.key.clone(), value);
        }
        doc
    }

    /// Reads a record from a document keyed for `format`.
    ///
    /// Starts from `T::default()`. Unknown keys and fields excluded from the
    /// format are skipped.
    pub fn read(&self, doc: &Document, format: WireFormat, ctx: &Context) -> Result<T> {
        let ctx = ctx.for_format(format);
        let table = self.table(format);
        let mut record = T::default();
        for (key, value) in doc.entries() {
            if let Some(&index) = table.by_key.get(&key) {
                let field = &self.fields[table.entries[index].field];
                (field.write)(&mut record, &value, &ctx)?;
            }
        }
        Ok(record)
    }

    pub(crate) fn field_values(&self, record: &T) -> Vec<Value> {
        self.fields.iter().map(|field| (field.read)(record)).collect()
    }
}

/// Blank identities get a fresh id; binary output stores ids natively.
fn identity_value(value: Value, format: WireFormat) -> Value {
    let value = if value.is_blank() {
        Value::ObjectId(ObjectId::generate())
    } else {
        value
    };
    match (format, value) {
        (WireFormat::Text, Value::ObjectId(oid)) => Value::String(oid.to_hex()),
        (WireFormat::Binary, Value::String(s)) => match ObjectId::parse_hex(&s) {
            Ok(oid) => Value::ObjectId(oid),
            Err(_) => Value::String(s),
        },
        (_, other) => other,
    }
}

fn resolve_table<T: 'static>(
    record: &str,
    fields: &[Field<T>],
    format: WireFormat,
    ctx: &Context,
) -> Table {
    let mut table = Table::default();
    for (index, field) in fields.iter().enumerate() {
        let key = resolve_key(record, field, format, ctx);
        let policy = resolve_policy(record, field, format, ctx);

        if let Some(&previous) = table.by_key.get(&key) {
            ctx.warn(
                "Two fields map to the same key; the later one wins when reading.",
                Some(Value::from(crate::doc!({
                    "model": record,
                    "key": (key.as_str()),
                    "fields": [(fields[table.entries[previous].field].name), (field.name)],
                    "format": (format.to_string())
                }))),
            );
        }
        if field.identity || !policy.contains(format.excluded()) {
            table.by_key.insert(key.clone(), table.entries.len());
        }
        table.entries.push(Entry {
            key,
            policy,
            field: index,
        });
    }
    table
}

fn resolve_key<T: 'static>(record: &str, field: &Field<T>, format: WireFormat, ctx: &Context) -> String {
    let unified = field.keys.as_ref().and_then(|keys| keys.key(format));
    let legacy = field.legacy_name(format);

    if field.identity {
        if unified.is_some() || legacy.is_some() {
            ctx.warn(
                "The identity field's key cannot be changed; the declared key is ignored.",
                Some(Value::from(crate::doc!({
                    "model": record,
                    "field": (field.name),
                    "format": (format.to_string())
                }))),
            );
        }
        return format.identity_key().to_string();
    }

    match (unified, legacy) {
        (Some(unified), Some(legacy)) => {
            if unified != legacy {
                ctx.warn(
                    "Conflicting key declarations; the unified key wins.",
                    Some(Value::from(crate::doc!({
                        "model": record,
                        "field": (field.name),
                        "unified": unified,
                        "ignored": legacy,
                        "format": (format.to_string())
                    }))),
                );
            }
            unified.to_string()
        }
        (Some(key), None) | (None, Some(key)) => key.to_string(),
        (None, None) => camel_case(field.name),
    }
}

fn resolve_policy<T: 'static>(record: &str, field: &Field<T>, format: WireFormat, ctx: &Context) -> Ignore {
    let unified = field.ignore.or_else(|| field.keys.as_ref().map(|keys| keys.ignore));
    let legacy = field.legacy_for(format);

    let policy = match unified {
        Some(policy) => {
            if !legacy.is_empty() {
                ctx.warn(
                    "Conflicting ignore declarations; the unified policy wins.",
                    Some(Value::from(crate::doc!({
                        "model": record,
                        "field": (field.name),
                        "format": (format.to_string())
                    }))),
                );
            }
            policy
        }
        None if !legacy.is_empty() => legacy,
        None => {
            if !field.identity {
                ctx.warn(
                    "No ignore policy declared; the field is always written.",
                    Some(Value::from(crate::doc!({
                        "model": record,
                        "field": (field.name),
                        "format": (format.to_string())
                    }))),
                );
            }
            Ignore::NEVER
        }
    };

    if field.identity && policy != Ignore::NEVER {
        ctx.warn(
            "The identity field is never ignored; its policy is overridden.",
            Some(Value::from(crate::doc!({
                "model": record,
                "field": (field.name)
            }))),
        );
        return Ignore::NEVER;
    }
    policy
}

/// `email_address` becomes `emailAddress`.
pub(crate) fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, part) in name.split('_').filter(|part| !part.is_empty()).enumerate() {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("email_address"), "emailAddress");
        assert_eq!(camel_case("username"), "username");
        assert_eq!(camel_case("_private_field"), "privateField");
    }

    #[test]
    fn test_identity_value_per_format() {
        let oid = ObjectId::generate();
        assert_eq!(
            identity_value(Value::ObjectId(oid), WireFormat::Text),
            Value::String(oid.to_hex())
        );
        assert_eq!(
            identity_value(Value::String(oid.to_hex()), WireFormat::Binary),
            Value::ObjectId(oid)
        );
        assert!(matches!(
            identity_value(Value::from(""), WireFormat::Binary),
            Value::ObjectId(_)
        ));
        assert_eq!(
            identity_value(Value::from("custom"), WireFormat::Binary),
            Value::from("custom")
        );
    }
}
