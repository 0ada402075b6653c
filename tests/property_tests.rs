//! Property-based tests for the guarantees every document must keep:
//! codec round trips, order-independent equality, and the agreement of
//! `require` and `optional` on present keys.

use flexjson::{binary, Context, Document, Value};
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        (-1.0e12f64..1.0e12).prop_map(Value::Double),
        "[a-zA-Z0-9 _\\-\"\\\\/\n\t\u{e9}\u{4e2d}]{0,16}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn document() -> impl Strategy<Value = Document> {
    prop::collection::vec(("[a-z]{1,8}", value()), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

fn hash_of(doc: &Document) -> u64 {
    let mut hasher = DefaultHasher::new();
    doc.hash(&mut hasher);
    hasher.finish()
}

proptest! {
    #[test]
    fn prop_text_round_trip(doc in document()) {
        let text = doc.to_text();
        let back = Document::parse(&text).unwrap();
        prop_assert_eq!(&back, &doc, "text was {}", text);
        prop_assert_eq!(hash_of(&back), hash_of(&doc));
    }

    #[test]
    fn prop_pretty_text_round_trip(doc in document()) {
        let back = Document::parse(&doc.to_text_pretty()).unwrap();
        prop_assert_eq!(back, doc);
    }

    #[test]
    fn prop_binary_round_trip(doc in document()) {
        let ctx = Context::default();
        let bytes = binary::to_bytes(&doc, &ctx).unwrap();
        prop_assert_eq!(bytes.len(), i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize);
        let back = binary::from_bytes(&bytes, &ctx).unwrap();
        prop_assert_eq!(back, doc);
    }

    #[test]
    fn prop_equality_ignores_key_order(doc in document()) {
        let mut entries = doc.entries();
        entries.reverse();
        let reversed: Document = entries.into_iter().collect();
        prop_assert_eq!(&reversed, &doc);
        prop_assert_eq!(hash_of(&reversed), hash_of(&doc));
    }

    #[test]
    fn prop_sort_preserves_equality(doc in document()) {
        let sorted = doc.sort();
        prop_assert_eq!(&sorted, &doc);
        let keys = sorted.keys();
        let mut expected = keys.clone();
        expected.sort();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn prop_require_matches_optional(n in any::<i64>(), s in "[a-z]{0,12}", b in any::<bool>()) {
        let doc = Document::new();
        doc.set("n", n);
        doc.set("s", s.clone());
        doc.set("b", b);
        prop_assert_eq!(doc.require::<i64>("n").unwrap(), doc.optional::<i64>("n").unwrap());
        prop_assert_eq!(doc.require::<String>("s").unwrap(), s);
        prop_assert_eq!(doc.optional::<bool>("b").unwrap(), b);
        prop_assert!(doc.require::<i64>("absent").unwrap_err().is_missing_key());
    }

    #[test]
    fn prop_numbers_as_text_coerce(n in any::<i32>()) {
        let doc = Document::new();
        doc.set("n", n.to_string());
        prop_assert_eq!(doc.require::<i32>("n").unwrap(), n);
        prop_assert_eq!(doc.require::<i64>("n").unwrap(), i64::from(n));
        prop_assert_eq!(doc.require::<f64>("n").unwrap(), f64::from(n));
    }

    #[test]
    fn prop_combine_keeps_existing(a in document(), b in document()) {
        let merged = a.deep_clone();
        merged.combine(&b, false);
        for (key, value) in a.entries() {
            if !value.is_blank() {
                prop_assert_eq!(merged.get(&key), value);
            }
        }
        for key in b.keys() {
            prop_assert!(merged.contains_key(&key));
        }
    }
}
