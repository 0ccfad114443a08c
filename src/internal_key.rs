//! # Internal Key Format
//!
//! Keys stored inside table blocks carry an 8-byte trailer after the user key.
//!
//! ## Format
//!
//! ```text
//! InternalKey:
//!   [user_key: bytes] [tag: u64 little-endian]
//!
//! tag = (sequence << 8) | type
//! ```
//!
//! The low byte of the tag is the value type (0 = deletion, 1 = value) and the
//! remaining 56 bits are the sequence number. The all-ones sequence is reserved
//! and never names a real write.

use crate::error::{Error, Result};
use serde::Serialize;

/// Size of the tag that follows the user key.
pub const TAG_SIZE: usize = 8;

/// Largest sequence number a real write can carry.
pub const MAX_SEQUENCE: u64 = (1 << 56) - 2;

/// Sequence value reserved as a decode terminator.
pub const SENTINEL_SEQUENCE: u64 = (1 << 56) - 1;

/// The type of a record.
///
/// - `Value`: A normal key-value pair
/// - `Deletion`: A tombstone marking that a key has been deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ValueType {
    /// A tombstone indicating the key has been deleted
    Deletion = 0,

    /// A normal value
    Value = 1,
}

impl ValueType {
    /// Converts a u8 to a ValueType.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ValueType::Deletion),
            1 => Some(ValueType::Value),
            _ => None,
        }
    }

    /// Converts the ValueType to a u8.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A user key together with its sequence number and value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalKey {
    user_key: Vec<u8>,
    sequence: u64,
    value_type: ValueType,
}

impl InternalKey {
    /// Creates a new InternalKey.
    ///
    /// # Example
    ///
    /// ```rust
    /// use leveldump::internal_key::{InternalKey, ValueType};
    ///
    /// let key = InternalKey::new(b"user_key".to_vec(), 42, ValueType::Value);
    /// assert_eq!(InternalKey::split(&key.encode()).unwrap(), key);
    /// ```
    pub fn new(user_key: Vec<u8>, sequence: u64, value_type: ValueType) -> Self {
        Self { user_key, sequence, value_type }
    }

    /// Returns the user key.
    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }

    /// Returns the sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Consumes the key and returns the user key bytes.
    pub fn into_user_key(self) -> Vec<u8> {
        self.user_key
    }

    /// Splits an encoded internal key into its parts.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInternalKey` if fewer than 8 bytes are supplied or the
    /// type byte is neither 0 nor 1.
    pub fn split(data: &[u8]) -> Result<Self> {
        let (user_key, sequence, type_byte) = split_tag(data)?;
        let value_type = ValueType::from_u8(type_byte)
            .ok_or_else(|| Error::malformed_key(format!("unknown value type {}", type_byte)))?;

        Ok(Self { user_key: user_key.to_vec(), sequence, value_type })
    }

    /// Encodes the key as `user_key ++ tag`.
    pub fn encode(&self) -> Vec<u8> {
        join(&self.user_key, self.sequence, self.value_type)
    }

    /// Returns true if this key carries the reserved terminator sequence.
    pub fn is_sentinel(&self) -> bool {
        self.sequence == SENTINEL_SEQUENCE
    }
}

/// Splits the trailing tag off `data` without interpreting the type byte.
///
/// Returns `(user_key, sequence, type_byte)`.
pub fn split_tag(data: &[u8]) -> Result<(&[u8], u64, u8)> {
    if data.len() < TAG_SIZE {
        return Err(Error::malformed_key(format!(
            "need at least {} bytes, got {}",
            TAG_SIZE,
            data.len()
        )));
    }

    let user_len = data.len() - TAG_SIZE;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&data[user_len..]);
    let tag = u64::from_le_bytes(tag);

    Ok((&data[..user_len], tag >> 8, tag as u8))
}

/// Builds an encoded internal key from its parts.
pub fn join(user_key: &[u8], sequence: u64, value_type: ValueType) -> Vec<u8> {
    let mut buf = Vec::with_capacity(user_key.len() + TAG_SIZE);
    buf.extend_from_slice(user_key);
    let tag = (sequence << 8) | u64::from(value_type.as_u8());
    buf.extend_from_slice(&tag.to_le_bytes());
    buf
}

/// A decoded key/value pair together with its internal key.
///
/// The value is only meaningful when the key's type is `Value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The internal key of this record.
    pub key: InternalKey,
    /// The stored value bytes.
    pub value: Vec<u8>,
}

impl Record {
    /// Creates a new record.
    pub fn new(key: InternalKey, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    /// Shorthand for a `Value` record.
    pub fn put(user_key: &[u8], sequence: u64, value: &[u8]) -> Self {
        Self::new(InternalKey::new(user_key.to_vec(), sequence, ValueType::Value), value.to_vec())
    }

    /// Shorthand for a `Deletion` record.
    pub fn delete(user_key: &[u8], sequence: u64) -> Self {
        Self::new(InternalKey::new(user_key.to_vec(), sequence, ValueType::Deletion), Vec::new())
    }

    /// Returns the user key.
    pub fn user_key(&self) -> &[u8] {
        self.key.user_key()
    }

    /// Returns the sequence number.
    pub fn sequence(&self) -> u64 {
        self.key.sequence()
    }

    /// Returns the value type.
    pub fn value_type(&self) -> ValueType {
        self.key.value_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_value_type_conversion() {
        assert_eq!(ValueType::Deletion.as_u8(), 0);
        assert_eq!(ValueType::Value.as_u8(), 1);

        assert_eq!(ValueType::from_u8(0), Some(ValueType::Deletion));
        assert_eq!(ValueType::from_u8(1), Some(ValueType::Value));
        assert_eq!(ValueType::from_u8(2), None);
    }

    #[test]
    fn test_split_known_bytes() {
        // "ab" + seq 0x0102 + type 1
        let data = [b'a', b'b', 0x01, 0x02, 0x01, 0, 0, 0, 0, 0];
        let key = InternalKey::split(&data).unwrap();
        assert_eq!(key.user_key(), b"ab");
        assert_eq!(key.sequence(), 0x0102);
        assert_eq!(key.value_type(), ValueType::Value);
    }

    #[test]
    fn test_split_empty_user_key() {
        let encoded = join(b"", 7, ValueType::Deletion);
        let key = InternalKey::split(&encoded).unwrap();
        assert!(key.user_key().is_empty());
        assert_eq!(key.sequence(), 7);
        assert_eq!(key.value_type(), ValueType::Deletion);
    }

    #[test]
    fn test_split_too_short() {
        let result = InternalKey::split(&[1, 2, 3, 4, 5, 6, 7]);
        assert!(matches!(result, Err(Error::MalformedInternalKey(_))));
    }

    #[test]
    fn test_split_unknown_type() {
        let mut data = b"key".to_vec();
        data.extend_from_slice(&((5u64 << 8) | 9).to_le_bytes());
        assert!(matches!(InternalKey::split(&data), Err(Error::MalformedInternalKey(_))));

        let (user_key, sequence, type_byte) = split_tag(&data).unwrap();
        assert_eq!(user_key, b"key");
        assert_eq!(sequence, 5);
        assert_eq!(type_byte, 9);
    }

    #[test]
    fn test_sentinel() {
        let key = InternalKey::split(&join(b"k", SENTINEL_SEQUENCE, ValueType::Value)).unwrap();
        assert!(key.is_sentinel());
        assert_eq!(key.sequence(), SENTINEL_SEQUENCE);

        let key = InternalKey::new(b"k".to_vec(), MAX_SEQUENCE, ValueType::Value);
        assert!(!key.is_sentinel());
    }

    #[test]
    fn test_record_accessors() {
        let record = Record::put(b"k", 3, b"v");
        assert_eq!(record.user_key(), b"k");
        assert_eq!(record.sequence(), 3);
        assert_eq!(record.value_type(), ValueType::Value);

        let record = Record::delete(b"k", 4);
        assert_eq!(record.value_type(), ValueType::Deletion);
        assert!(record.value.is_empty());
    }

    proptest! {
        #[test]
        fn prop_split_join(
            user_key in proptest::collection::vec(any::<u8>(), 0..64),
            sequence in 0u64..=MAX_SEQUENCE,
            is_value in any::<bool>(),
        ) {
            let value_type = if is_value { ValueType::Value } else { ValueType::Deletion };
            let key = InternalKey::split(&join(&user_key, sequence, value_type)).unwrap();
            prop_assert_eq!(key.user_key(), &user_key[..]);
            prop_assert_eq!(key.sequence(), sequence);
            prop_assert_eq!(key.value_type(), value_type);
        }
    }
}
