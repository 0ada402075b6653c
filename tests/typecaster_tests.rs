//! Every supported scalar shape read back through `require` and `optional`,
//! both from values set directly and from the same document after a trip
//! through text. Each shape gets ten values, duplicates included.

use bigdecimal::BigDecimal;
use flexjson::{Document, Shape, Stack, Value};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::str::FromStr;

fn key(i: usize) -> String {
    format!("key{}", i + 1)
}

fn store<T: Shape>(values: &[T]) -> Document {
    let doc = Document::new();
    for (i, value) in values.iter().enumerate() {
        doc.set(key(i), value.to_value());
    }
    doc.set("values", Value::Array(values.iter().map(Shape::to_value).collect()));
    doc
}

/// The stored document and its reparsed text form.
fn both<T: Shape>(values: &[T]) -> [Document; 2] {
    let typed = store(values);
    let raw = Document::parse(&typed.to_text()).unwrap();
    [typed, raw]
}

macro_rules! typecaster {
    ($module:ident, $ty:ty, [$($value:expr),+ $(,)?]) => {
        mod $module {
            use super::*;

            fn values() -> Vec<$ty> {
                vec![$($value),+]
            }

            #[test]
            fn require_each_value() {
                let values = values();
                for doc in both(&values) {
                    for (i, expected) in values.iter().enumerate() {
                        let actual: $ty = doc.require(&key(i)).unwrap();
                        assert_eq!(&actual, expected, "{}", key(i));
                    }
                    assert!(doc.require::<$ty>("absent").unwrap_err().is_missing_key());
                }
            }

            #[test]
            fn optional_each_value() {
                let values = values();
                for doc in both(&values) {
                    for (i, expected) in values.iter().enumerate() {
                        let actual: $ty = doc.optional(&key(i)).unwrap();
                        assert_eq!(&actual, expected, "{}", key(i));
                    }
                    let absent: $ty = doc.optional("absent").unwrap();
                    assert_eq!(absent, <$ty as Shape>::zero());
                }
            }

            #[test]
            fn ordered_sequences() {
                let values = values();
                for doc in both(&values) {
                    let list: Vec<$ty> = doc.require("values").unwrap();
                    assert_eq!(list, values);

                    let queue: VecDeque<$ty> = doc.optional("values").unwrap();
                    assert!(queue.iter().eq(values.iter()));

                    let mut stack: Stack<$ty> = doc.require("values").unwrap();
                    assert_eq!(stack.len(), values.len());
                    for expected in &values {
                        assert_eq!(stack.pop().as_ref(), Some(expected));
                    }
                    assert!(stack.is_empty());

                    let nullable: Option<Vec<$ty>> = doc.optional("absent").unwrap();
                    assert!(nullable.is_none());
                    assert!(doc.require::<Vec<$ty>>("absent").unwrap_err().is_missing_key());
                }
            }
        }
    };
}

macro_rules! typecaster_sets {
    ($module:ident, $ty:ty, [$($value:expr),+ $(,)?]) => {
        mod $module {
            use super::*;

            #[test]
            fn distinct_sets() {
                let values: Vec<$ty> = vec![$($value),+];
                for doc in both(&values) {
                    let hashed: HashSet<$ty> = doc.require("values").unwrap();
                    assert_eq!(hashed, values.iter().cloned().collect::<HashSet<$ty>>());

                    let ordered: BTreeSet<$ty> = doc.optional("values").unwrap();
                    assert_eq!(ordered.len(), hashed.len());
                    assert!(ordered.len() < values.len());
                }
            }
        }
    };
}

typecaster!(bools, bool, [true, false, true, true, false, false, true, false, true, true]);
typecaster!(int32s, i32, [0, 1, -1, 42, i32::MAX, i32::MIN, 42, 7, -300, 0]);
typecaster!(bytes, u8, [0, 1, 255, 128, 7, 7, 64, 3, 200, 1]);
typecaster!(signed_bytes, i8, [0, -128, 127, 5, -5, 5, 100, -100, 1, 0]);
typecaster!(shorts, i16, [0, i16::MIN, i16::MAX, 300, -300, 300, 12, -12, 1, 2]);
typecaster!(unsigned_shorts, u16, [0, u16::MAX, 1, 2, 3, 3, 4000, 5, 60000, 1]);
typecaster!(unsigned_ints, u32, [0, u32::MAX, 1, 2, 3, 3, 4_000_000, 5, 3_000_000_000, 1]);
typecaster!(longs, i64, [0, i64::MIN, i64::MAX, 1 << 40, -(1 << 40), 5, 5, -1, 1, 99]);
typecaster!(unsigned_longs, u64, [0, u64::MAX, 1, 1 << 63, 5, 5, 17, 18, 19, 20]);
typecaster!(floats, f32, [0.0, 0.5, -2.25, 1024.0, 0.5, 3.75, -0.125, 16.0, 1.0, 2.0]);
typecaster!(doubles, f64, [0.0, 0.1, -2.5, 1e10, 0.1, 3.14159, -1e-5, 123456.789, 1.0, 2.0]);
typecaster!(decimals, BigDecimal, [
    BigDecimal::from(0),
    BigDecimal::from_str("0.1").unwrap(),
    BigDecimal::from_str("-12.345").unwrap(),
    BigDecimal::from_str("79228162514264337593543950335").unwrap(),
    BigDecimal::from_str("0.1").unwrap(),
    BigDecimal::from(7),
    BigDecimal::from_str("1.000001").unwrap(),
    BigDecimal::from(-1),
    BigDecimal::from_str("3.5").unwrap(),
    BigDecimal::from(100),
]);
typecaster!(chars, char, ['a', 'Z', '0', ' ', 'a', 'é', '\u{1F600}', '"', '\\', 'x']);
typecaster!(strings, String, [
    "alpha".to_string(),
    "".to_string(),
    "with \"quotes\"".to_string(),
    "line\nbreak".to_string(),
    "alpha".to_string(),
    "ünïcödé".to_string(),
    "42".to_string(),
    "true".to_string(),
    "tab\tseparated".to_string(),
    "x".to_string(),
]);

typecaster_sets!(int32_sets, i32, [1, 2, 3, 2, 1, 4, 5, 4, 6, 7]);
typecaster_sets!(u64_sets, u64, [1, u64::MAX, 3, 3, 1, 4, 5, 4, 6, 7]);
typecaster_sets!(string_sets, String, [
    "a".to_string(),
    "b".to_string(),
    "a".to_string(),
    "c".to_string(),
    "b".to_string(),
    "d".to_string(),
    "e".to_string(),
    "f".to_string(),
    "g".to_string(),
    "h".to_string(),
]);
typecaster_sets!(char_sets, char, ['a', 'b', 'a', 'c', 'd', 'd', 'e', 'f', 'g', 'h']);
