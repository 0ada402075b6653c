use flexjson::{
    binary, doc, flex_enum, registry, text, Context, Document, Error, Field, Ignore, Keys,
    LogEvent, Options, Record, Schema, Severity, Value, WireFormat,
};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread;

#[derive(Clone, Default, Debug, PartialEq)]
struct User {
    username: String,
    email: String,
}

impl Record for User {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field(
                Field::new("username", |u: &User| &u.username, |u: &mut User| &mut u.username)
                    .keys(Keys::new().text("username").binary("sn")),
            )
            .field(
                Field::new("email", |u: &User| &u.email, |u: &mut User| &mut u.email)
                    .keys(Keys::new().text("emailAddress").binary("email")),
            )
    }
}

fn joe() -> User {
    User {
        username: "Joe".to_string(),
        email: "joe@x.com".to_string(),
    }
}

/// A context whose sink records every event.
fn capturing() -> (Context, Arc<Mutex<Vec<LogEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let ctx = Context::default().with_sink(move |event: &LogEvent| sink.lock().push(event.clone()));
    (ctx, events)
}

fn hash_of(doc: &Document) -> u64 {
    let mut hasher = DefaultHasher::new();
    doc.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_record_text_keys() {
    let doc = Document::from_model(&joe(), WireFormat::Text);
    assert_eq!(doc.to_text(), r#"{"username":"Joe","emailAddress":"joe@x.com"}"#);
}

#[test]
fn test_record_binary_keys() {
    let doc = Document::from_model(&joe(), WireFormat::Binary);
    assert_eq!(doc.keys(), vec!["sn", "email"]);
    let back: User = doc.to_model(WireFormat::Binary).unwrap();
    assert_eq!(back, joe());
}

#[test]
fn test_gh001_record_nested_under_a_key() {
    let json = Document::new();
    json.set("user", Value::record(joe()));
    assert_eq!(json.len(), 1);

    let indirect: User = json.require("user").unwrap();
    assert_eq!(indirect, joe());

    let raw = Document::from_model(&joe(), WireFormat::Text);
    assert_eq!(raw.len(), 2);
    let direct: User = raw.to_model(WireFormat::Text).unwrap();
    assert_eq!(direct, joe());

    // The same holds once the record has been through text
    let reparsed = Document::parse(&json.to_text()).unwrap();
    let from_text: User = reparsed.require("user").unwrap();
    assert_eq!(from_text, joe());
}

#[test]
fn test_gh002_record_read_as_document() {
    let json = Document::new();
    json.set("user", Value::record(joe()));

    let inner: Document = json.require("user").unwrap();
    assert_eq!(inner.get("emailAddress"), Value::from("joe@x.com"));

    let from_inner: User = inner.to_model(WireFormat::Text).unwrap();
    assert_eq!(from_inner, joe());
}

#[test]
fn test_unknown_keys_are_skipped() {
    let doc = Document::parse(r#"{"username":"Joe","emailAddress":"joe@x.com","age":40}"#).unwrap();
    let user: User = doc.to_model(WireFormat::Text).unwrap();
    assert_eq!(user, joe());
}

#[test]
fn test_record_through_binary_codec() {
    let ctx = Context::default();
    let bytes = binary::to_binary(&joe(), &ctx).unwrap();
    let doc = binary::from_bytes(&bytes, &ctx).unwrap();
    assert_eq!(doc.keys(), vec!["sn", "email"]);
    let back: User = binary::from_binary(&bytes, &ctx).unwrap();
    assert_eq!(back, joe());
}

#[test]
fn test_nested_record_uses_binary_keys() {
    let ctx = Context::default();
    let outer = Document::new();
    outer.set("user", Value::record(joe()));
    let back = binary::from_bytes(&binary::to_bytes(&outer, &ctx).unwrap(), &ctx).unwrap();
    let inner = back.get("user");
    assert_eq!(inner.as_object().map(Document::keys), Some(vec!["sn".to_string(), "email".to_string()]));
}

#[test]
fn test_require_optional_symmetry() {
    let doc = doc!({ "n": "42", "f": 1.5, "s": "text", "b": "TRUE" });

    assert_eq!(doc.require::<i32>("n").unwrap(), doc.optional::<i32>("n").unwrap());
    assert_eq!(doc.require::<f64>("f").unwrap(), doc.optional::<f64>("f").unwrap());
    assert_eq!(doc.require::<String>("s").unwrap(), doc.optional::<String>("s").unwrap());
    assert!(doc.require::<bool>("b").unwrap());

    assert!(doc.require::<i32>("absent").unwrap_err().is_missing_key());
    assert_eq!(doc.optional::<i32>("absent").unwrap(), 0);
    assert_eq!(doc.optional::<String>("absent").unwrap(), "");
    assert_eq!(doc.optional::<Option<i64>>("absent").unwrap(), None);
}

#[test]
fn test_null_values_and_blank_text() {
    let doc = doc!({ "nothing": null, "blank": "   " });
    // Present but null: zero value, not a missing key
    assert_eq!(doc.optional::<i32>("nothing").unwrap(), 0);
    assert_eq!(doc.optional::<Option<i32>>("blank").unwrap(), None);
    // Non-nullable targets still try to convert blank text
    assert!(doc.require::<i32>("blank").unwrap_err().is_conversion());
    // Nullable targets that end up null fail a require
    assert!(doc.require::<Option<i32>>("nothing").unwrap_err().is_conversion());
}

#[test]
fn test_optional_failure_needs_a_sink() {
    let doc = doc!({ "n": "not a number" });

    let (ctx, events) = capturing();
    assert_eq!(ctx.optional::<i32>(&doc, "n").unwrap(), 0);
    assert!(events.lock().iter().any(|e| e.severity == Severity::Error));

    let bare = Context::default();
    assert!(matches!(
        bare.optional::<i32>(&doc, "n"),
        Err(Error::UnhandledLogEvent { .. })
    ));
}

flex_enum! {
    enum Priority {
        Low = 1,
        Normal = 2,
        High = 3,
    }
}

#[test]
fn test_enum_bounds() {
    let doc = doc!({ "good": 3, "named": "normal", "bad": 17, "text": "urgent" });
    assert_eq!(doc.require::<Priority>("good").unwrap(), Priority::High);
    assert_eq!(doc.require::<Priority>("named").unwrap(), Priority::Normal);
    assert!(doc.require::<Priority>("bad").unwrap_err().is_conversion());
    assert!(doc.require::<Priority>("text").is_err());
    assert_eq!(doc.optional::<Priority>("bad").unwrap(), Priority::Low);
    assert_eq!(doc.optional::<Priority>("text").unwrap(), Priority::Low);
}

#[test]
fn test_combine_branches() {
    let base = doc!({ "kept": "mine", "blank": "  ", "shared": 1 });
    let other = doc!({ "kept": "theirs", "blank": "filled", "new": true, "shared": 2 });

    base.combine(&other, false);
    assert_eq!(base.get("kept"), Value::from("mine"));
    assert_eq!(base.get("blank"), Value::from("filled"));
    assert_eq!(base.get("new"), Value::Bool(true));
    assert_eq!(base.get("shared"), Value::Int32(1));

    base.combine(&other, true);
    assert_eq!(base.get("kept"), Value::from("theirs"));
    assert_eq!(base.get("shared"), Value::Int32(2));
}

#[test]
fn test_equality_ignores_order() {
    let a = doc!({ "x": 1, "y": [true], "z": { "k": "v" } });
    let b = doc!({ "z": { "k": "v" }, "x": 1, "y": [true] });
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));

    b.set("x", 2);
    assert_ne!(a, b);
}

#[test]
fn test_numeric_equality_across_kinds() {
    let parsed = Document::parse(r#"{"n": 5, "f": 2.5}"#).unwrap();
    let built = doc!({ "n": 5, "f": 2.5 });
    assert_eq!(parsed, built);
    assert_eq!(hash_of(&parsed), hash_of(&built));
}

#[test]
fn test_recursive_search_skips_arrays() {
    let doc = doc!({
        "nested": { "deep": { "needle": 1 } },
        "list": [{ "hidden": 2 }]
    });
    assert!(doc.contains_key_recursive("needle"));
    assert!(doc.contains_value_recursive(&Value::Int32(1)));
    assert!(!doc.contains_key_recursive("hidden"));
    assert!(!doc.contains_value_recursive(&Value::Int32(2)));
}

#[test]
fn test_remove_recursive() {
    let doc = doc!({
        "Secret": 1,
        "inner": { "mySecretKey": 2, "keep": 3 },
        "list": [{ "secret": 4, "other": 5 }]
    });

    doc.remove_recursive("Secret", false);
    assert!(!doc.contains_key("Secret"));
    assert!(doc.contains_key_recursive("mySecretKey"));

    doc.remove_recursive("secret", true);
    assert!(!doc.contains_key_recursive("mySecretKey"));
    let listed = doc.get("list");
    let first = listed.as_array().and_then(|items| items[0].as_object().cloned()).unwrap();
    assert_eq!(first.keys(), vec!["other"]);
}

#[test]
fn test_sort_returns_a_new_document() {
    let doc = doc!({ "b": 1, "a": { "d": 1, "c": 2 } });
    let sorted = doc.sort();
    assert_eq!(sorted.keys(), vec!["a", "b"]);
    assert_eq!(sorted.get("a").as_object().map(Document::keys), Some(vec!["c".to_string(), "d".to_string()]));
    assert_eq!(doc.keys(), vec!["b", "a"]);
}

#[derive(Clone, Default)]
struct Node {
    name: String,
    children: Document,
}

impl Record for Node {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new("name", |n: &Node| &n.name, |n: &mut Node| &mut n.name).keys(Keys::new()))
            .field(
                Field::new("children", |n: &Node| &n.children, |n: &mut Node| &mut n.children)
                    .keys(Keys::new()),
            )
    }

    fn display(&self) -> String {
        format!("Node({})", self.name)
    }
}

#[test]
fn test_cycle_guard() {
    let (ctx, events) = capturing();
    let children = Document::new();
    let node = Node {
        name: "root".into(),
        children: children.clone(),
    };
    children.set("me", Value::record(node.clone()));

    let written = text::to_string_with(&Value::record(node), &ctx);
    assert_eq!(written, r#""Node(root)""#);
    assert!(events
        .lock()
        .iter()
        .any(|event| event.severity == Severity::Warn));

    let holder = Document::new();
    holder.set(
        "node",
        Value::record(Node {
            name: "root".into(),
            children: children.clone(),
        }),
    );
    let bytes = binary::to_bytes(&holder, &ctx).unwrap();
    let back = binary::from_bytes(&bytes, &ctx).unwrap();
    assert_eq!(back.get("node"), Value::from("Node(root)"));
}

#[derive(Clone, Default)]
struct Signup {
    email: String,
    age: i32,
}

impl Record for Signup {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new("email", |s: &Signup| &s.email, |s: &mut Signup| &mut s.email).keys(Keys::new()))
            .field(Field::new("age", |s: &Signup| &s.age, |s: &mut Signup| &mut s.age).keys(Keys::new()))
    }

    fn validate(&self, errors: &mut Vec<String>) {
        flexjson::check(self.email.contains('@'), "email must contain '@'", errors);
        flexjson::check(self.age >= 13, "age must be at least 13", errors);
    }
}

#[test]
fn test_validation_when_switched_on() {
    let doc = doc!({ "form": { "email": "nobody", "age": 9 } });

    let lenient = Context::default();
    assert!(lenient.require::<Signup>(&doc, "form").is_ok());

    let strict = Context::new(Options::new().with_validation(true));
    match strict.require::<Signup>(&doc, "form") {
        Err(Error::ModelValidation { shape, errors }) => {
            assert_eq!(shape, "Signup");
            assert_eq!(errors.len(), 2);
        }
        other => panic!("expected a validation error, got {:?}", other.map(|_| ())),
    }

    let text = r#"{"email":"a@b.c","age":20}"#;
    assert!(text::from_text::<Signup>(text, &strict).is_ok());
}

#[test]
fn test_trimmed_strings() {
    let ctx = Context::new(Options::new().with_trimmed_strings(true));
    let doc = text::parse_document(r#"{"name": "  padded  "}"#, &ctx).unwrap();
    assert_eq!(doc.get("name"), Value::from("padded"));
}

#[test]
fn test_concurrent_writers() {
    let doc = Document::new();
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let doc = doc.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    doc.set(format!("k{}-{}", t, i), i);
                    let _ = doc.get(&format!("k{}-{}", t, i / 2));
                    let _ = doc.to_text();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(doc.len(), 800);
}

#[derive(Clone, Default)]
struct Tiers {
    id: String,
    unified: Option<String>,
    legacy: i32,
    undeclared: String,
}

impl Record for Tiers {
    fn schema() -> Schema<Self> {
        Schema::new()
            .identity_field(
                Field::new("id", |t: &Tiers| &t.id, |t: &mut Tiers| &mut t.id)
                    .binary_name("pk")
                    .ignore(Ignore::ALWAYS),
            )
            .field(
                Field::new("unified", |t: &Tiers| &t.unified, |t: &mut Tiers| &mut t.unified)
                    .ignore(Ignore::IN_TEXT)
                    .ignore_if_null(WireFormat::Binary),
            )
            .field(
                Field::new("legacy", |t: &Tiers| &t.legacy, |t: &mut Tiers| &mut t.legacy)
                    .ignore_if_null(WireFormat::Binary)
                    .ignore_if_default(WireFormat::Binary),
            )
            .field(Field::new("undeclared", |t: &Tiers| &t.undeclared, |t: &mut Tiers| {
                &mut t.undeclared
            }))
    }
}

#[test]
fn test_policy_precedence_tiers() {
    let (ctx, events) = capturing();
    let mapping = registry::mapping::<Tiers>(&ctx);

    // Identity: key and policy overrides are rejected
    let id = mapping.entry("id", WireFormat::Binary).unwrap();
    assert_eq!(id.key, "_id");
    assert_eq!(id.policy, Ignore::NEVER);

    // Unified beats legacy
    let unified = mapping.entry("unified", WireFormat::Binary).unwrap();
    assert_eq!(unified.policy, Ignore::IN_TEXT);

    // Legacy flags combine
    let legacy = mapping.entry("legacy", WireFormat::Binary).unwrap();
    assert_eq!(legacy.policy, Ignore::WHEN_BINARY_NULL_OR_DEFAULT);
    assert_eq!(mapping.entry("legacy", WireFormat::Text).unwrap().policy, Ignore::NEVER);

    // Nothing declared: never ignored
    let undeclared = mapping.entry("undeclared", WireFormat::Text).unwrap();
    assert_eq!(undeclared.policy, Ignore::NEVER);

    let warnings: Vec<String> = events
        .lock()
        .iter()
        .filter(|e| e.severity == Severity::Warn)
        .map(|e| e.message.clone())
        .collect();
    assert!(warnings.iter().any(|m| m.contains("identity field's key")));
    assert!(warnings.iter().any(|m| m.contains("identity field is never ignored")));
    assert!(warnings.iter().any(|m| m.contains("Conflicting ignore declarations")));
    assert!(warnings.iter().any(|m| m.contains("No ignore policy declared")));

    let record = Tiers::default();
    let text_doc = Document::from_model(&record, WireFormat::Text);
    assert_eq!(text_doc.keys(), vec!["id", "legacy", "undeclared"]);
    let binary_doc = Document::from_model(&record, WireFormat::Binary);
    assert_eq!(binary_doc.keys(), vec!["_id", "unified", "undeclared"]);
    assert!(matches!(binary_doc.get("_id"), Value::ObjectId(_)));
}

fn hash_value(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_records_with_blank_identity_compare_by_fields() {
    let a = Value::record(Tiers {
        legacy: 3,
        ..Tiers::default()
    });
    let b = Value::record(Tiers {
        legacy: 3,
        ..Tiers::default()
    });
    assert_eq!(a, b);
    assert_eq!(hash_value(&a), hash_value(&b));
    assert_ne!(
        a,
        Value::record(Tiers {
            legacy: 4,
            ..Tiers::default()
        })
    );
    assert_ne!(a, Value::record(joe()));
    assert_eq!(Value::record(joe()), Value::record(joe()));
}

#[test]
fn test_self_referencing_records_compare() {
    let make = || {
        let children = Document::new();
        let node = Node {
            name: "root".into(),
            children: children.clone(),
        };
        children.set("me", Value::record(node.clone()));
        Value::record(node)
    };
    let (a, b) = (make(), make());
    assert_eq!(a, b);
    assert_eq!(hash_value(&a), hash_value(&b));

    let other = Value::record(Node {
        name: "leaf".into(),
        children: Document::new(),
    });
    assert_ne!(a, other);
}

#[test]
fn test_error_documents() {
    let err = Document::new().require::<i32>("missing").unwrap_err();
    let rendered = err.to_document();
    assert_eq!(rendered.get("missingKey"), Value::from("missing"));

    let holder = doc!({ "error": (rendered.clone()) });
    assert!(holder.to_text().contains("missingKey"));
}
