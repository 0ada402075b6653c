/// Builds a [`Value`](crate::Value) from a literal.
///
/// Object and array values must be single token trees; wrap negative numbers
/// and other expressions in parentheses.
#[macro_export]
macro_rules! value {
    // Handle null
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::value!($elem)),*])
    };

    ({ $($body:tt)* }) => {
        $crate::Value::Object($crate::doc!({ $($body)* }))
    };

    // Any other expression goes through `From`
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

/// Builds a [`Document`](crate::Document) from a literal.
///
/// # Examples
///
/// ```rust
/// use flexjson::doc;
///
/// let d = doc!({
///     "name": "Alice",
///     "tags": ["a", "b"],
///     "address": { "city": "Oslo" },
///     "balance": (-12)
/// });
/// assert_eq!(d.len(), 4);
/// assert_eq!(d.to_text(), r#"{"name":"Alice","tags":["a","b"],"address":{"city":"Oslo"},"balance":-12}"#);
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::Document::new()
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let document = $crate::Document::new();
        $(
            document.set($key, $crate::value!($value));
        )*
        document
    }};
}

/// Declares a fieldless enum usable as a coercion target.
///
/// The enum accepts its integer discriminant or, case-insensitively, a
/// variant name, and is written as a 32-bit integer. Out-of-range input is
/// an error for required values and clamps to the lowest declared variant for
/// optional ones.
///
/// # Examples
///
/// ```rust
/// use flexjson::{doc, flex_enum};
///
/// flex_enum! {
///     pub enum Tier {
///         Bronze = 1,
///         Silver = 2,
///         Gold = 3,
///     }
/// }
///
/// let d = doc!({ "a": 2, "b": "gold", "c": 9 });
/// assert_eq!(d.require::<Tier>("a").unwrap(), Tier::Silver);
/// assert_eq!(d.require::<Tier>("b").unwrap(), Tier::Gold);
/// assert!(d.require::<Tier>("c").is_err());
/// assert_eq!(d.optional::<Tier>("c").unwrap(), Tier::Bronze);
/// ```
#[macro_export]
macro_rules! flex_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $discriminant:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $discriminant),+
        }

        impl $name {
            #[doc(hidden)]
            const VARIANTS: &'static [($name, &'static str, i64)] =
                &[$(($name::$variant, stringify!($variant), $name::$variant as i64)),+];
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                <$name as $crate::Shape>::zero()
            }
        }

        impl $crate::Shape for $name {
            const KIND: $crate::Kind = $crate::Kind::Value;

            fn shape_name() -> ::std::string::String {
                stringify!($name).to_string()
            }

            fn zero() -> Self {
                $crate::shape::enum_from_null(stringify!($name), Self::VARIANTS)
                    .ok()
                    .or_else(|| $crate::shape::enum_floor(Self::VARIANTS))
                    .unwrap_or(Self::VARIANTS[0].0)
            }

            fn from_value(value: &$crate::Value, _ctx: &$crate::Context) -> $crate::Result<Self> {
                $crate::shape::enum_from_value(stringify!($name), Self::VARIANTS, value)
            }

            fn to_value(&self) -> $crate::Value {
                let discriminant = *self as i64;
                match <i32 as ::std::convert::TryFrom<i64>>::try_from(discriminant) {
                    ::std::result::Result::Ok(small) => $crate::Value::Int32(small),
                    ::std::result::Result::Err(_) => $crate::Value::Int64(discriminant),
                }
            }

            fn is_zero(&self) -> bool {
                (*self as i64) == 0
            }

            fn from_null() -> $crate::Result<Self> {
                $crate::shape::enum_from_null(stringify!($name), Self::VARIANTS)
            }

            fn floor() -> ::std::option::Option<Self> {
                $crate::shape::enum_floor(Self::VARIANTS)
            }
        }
    };
}
