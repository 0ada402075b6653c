//! Twelve-byte identity values.
//!
//! Layout: a 4-byte big-endian Unix timestamp in seconds, 5 bytes chosen at
//! random once per process, and a 3-byte big-endian counter that starts at a
//! random value. Ids generated by one process sort by creation second.

use crate::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

const COUNTER_MASK: u32 = 0x00FF_FFFF;

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

/// A 12-byte identifier, written as 24 lowercase hex digits.
///
/// # Examples
///
/// ```rust
/// use flexjson::ObjectId;
///
/// let id = ObjectId::generate();
/// let parsed = ObjectId::parse_hex(&id.to_hex()).unwrap();
/// assert_eq!(id, parsed);
/// assert!(ObjectId::parse_hex("not hex").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    #[must_use]
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Generates a new id for the current second.
    #[must_use]
    pub fn generate() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as u32)
            .unwrap_or(0);
        let unique = PROCESS_UNIQUE.get_or_init(rand::random::<[u8; 5]>);
        let counter = COUNTER
            .get_or_init(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK))
            .fetch_add(1, Ordering::Relaxed)
            & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        ObjectId(bytes)
    }

    /// Seconds since the Unix epoch encoded in the id.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Parses 24 hex digits, either case.
    pub fn parse_hex(text: &str) -> Result<Self> {
        let invalid = || Error::deserialize("ObjectId", format!("'{}' is not 24 hex digits", text));
        if text.len() != 24 || !text.is_ascii() {
            return Err(invalid());
        }
        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&text[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(ObjectId(bytes))
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_differ() {
        let a = ObjectId::generate();
        let b = ObjectId::generate();
        assert_ne!(a, b);
        assert_eq!(a.bytes()[4..9], b.bytes()[4..9]);
    }

    #[test]
    fn test_hex_roundtrip_and_case() {
        let id = ObjectId::parse_hex("65E1A2B3C4D5E6F708192A3B").unwrap();
        assert_eq!(id.to_hex(), "65e1a2b3c4d5e6f708192a3b");
        assert_eq!(id.timestamp(), 0x65E1_A2B3);
    }

    #[test]
    fn test_rejects_bad_hex() {
        assert!(ObjectId::parse_hex("").is_err());
        assert!(ObjectId::parse_hex("zz e1a2b3c4d5e6f708192a3b").is_err());
        assert!(ObjectId::parse_hex("65e1a2b3c4d5e6f708192a3").is_err());
    }
}
