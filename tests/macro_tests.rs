use flexjson::{doc, flex_enum, value, Document, Shape, Value};

#[test]
fn test_value_macro_null() {
    assert_eq!(value!(null), Value::Null);
}

#[test]
fn test_value_macro_booleans() {
    assert_eq!(value!(true), Value::Bool(true));
    assert_eq!(value!(false), Value::Bool(false));
}

#[test]
fn test_value_macro_numbers() {
    assert_eq!(value!(42), Value::Int32(42));
    assert_eq!(value!(3.5), Value::Double(3.5));
    assert_eq!(value!((-123)), Value::Int32(-123));
    assert_eq!(value!(5_000_000_000i64), Value::Int64(5_000_000_000));
}

#[test]
fn test_value_macro_strings() {
    assert_eq!(value!("hello world"), Value::String("hello world".to_string()));
    assert_eq!(value!(""), Value::String(String::new()));
}

#[test]
fn test_value_macro_arrays() {
    assert_eq!(value!([]), Value::Array(vec![]));
    assert_eq!(
        value!([1, 2, 3]),
        Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)])
    );

    let mixed = value!([1, "two", true, null, [3.5]]);
    let items = mixed.as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[1], Value::from("two"));
    assert_eq!(items[3], Value::Null);
    assert_eq!(items[4], Value::Array(vec![Value::Double(3.5)]));
}

#[test]
fn test_value_macro_objects() {
    let value = value!({ "name": "Alice", "age": 30 });
    let doc = value.as_object().unwrap();
    assert_eq!(doc.keys(), vec!["name", "age"]);
    assert_eq!(doc.get("age"), Value::Int32(30));
}

#[test]
fn test_doc_macro_empty() {
    let d = doc!({});
    assert!(d.is_empty());
    assert_eq!(d.to_text(), "{}");
}

#[test]
fn test_doc_macro_nested() {
    let d = doc!({
        "user": {
            "name": "Bob",
            "roles": ["admin", "dev"],
            "manager": null
        },
        "active": true,
    });
    assert_eq!(d.len(), 2);
    let user: Document = d.require("user").unwrap();
    assert_eq!(user.get("roles"), value!(["admin", "dev"]));
    assert!(user.contains_key("manager"));
    assert_eq!(
        d.to_text(),
        r#"{"user":{"name":"Bob","roles":["admin","dev"],"manager":null},"active":true}"#
    );
}

#[test]
fn test_doc_macro_expressions() {
    let name = String::from("Carol");
    let scores = vec![Value::from(1), Value::from(2)];
    let d = doc!({
        "name": (name.as_str()),
        "scores": (scores.clone()),
        "total": (1 + 2),
        "nested": (doc!({ "deep": true }))
    });
    assert_eq!(d.get("name"), Value::from("Carol"));
    assert_eq!(d.get("scores"), Value::Array(scores));
    assert_eq!(d.get("total"), Value::Int32(3));
    assert!(d.contains_key_recursive("deep"));
}

#[test]
fn test_doc_macro_builds_independent_documents() {
    let a = doc!({ "n": 1 });
    let b = doc!({ "n": 1 });
    assert_eq!(a, b);
    assert!(!a.ptr_eq(&b));
    a.set("n", 2);
    assert_eq!(b.get("n"), Value::Int32(1));
}

flex_enum! {
    /// Shipping state of an order.
    pub enum Status {
        Pending = 0,
        Shipped = 1,
        Delivered = 2,
    }
}

flex_enum! {
    enum Sparse {
        Ten = 10,
        Twenty = 20,
    }
}

#[test]
fn test_flex_enum_reads_numbers_and_names() {
    let d = doc!({ "a": 1, "b": "DELIVERED", "c": "2", "d": 2.0 });
    assert_eq!(d.require::<Status>("a").unwrap(), Status::Shipped);
    assert_eq!(d.require::<Status>("b").unwrap(), Status::Delivered);
    assert_eq!(d.require::<Status>("c").unwrap(), Status::Delivered);
    assert_eq!(d.require::<Status>("d").unwrap(), Status::Delivered);
}

#[test]
fn test_flex_enum_zero_and_default() {
    assert_eq!(Status::default(), Status::Pending);
    assert!(Status::Pending.is_zero());
    assert_eq!(Sparse::default(), Sparse::Ten);

    let d = doc!({ "empty": null });
    assert_eq!(d.require::<Status>("empty").unwrap(), Status::Pending);
    assert!(d.require::<Sparse>("empty").is_err());
    assert_eq!(d.optional::<Sparse>("empty").unwrap(), Sparse::Ten);
}

#[test]
fn test_flex_enum_writes_discriminants() {
    assert_eq!(Status::Delivered.to_value(), Value::Int32(2));
    let d = Document::new();
    d.set("status", Sparse::Twenty.to_value());
    assert_eq!(d.to_text(), r#"{"status":20}"#);
    assert_eq!(d.require::<Sparse>("status").unwrap(), Sparse::Twenty);
}

flex_enum! {
    #[repr(i64)]
    enum Wide {
        Small = 1,
        Huge = 5_000_000_000,
    }
}

#[test]
fn test_flex_enum_wide_discriminants() {
    assert_eq!(Wide::Huge.to_value(), Value::Int64(5_000_000_000));
    assert!(matches!(Wide::Small.to_value(), Value::Int32(1)));

    let d = Document::new();
    d.set("w", Wide::Huge.to_value());
    assert_eq!(d.to_text(), r#"{"w":5000000000}"#);
    assert_eq!(d.require::<Wide>("w").unwrap(), Wide::Huge);
}
