//! Per-key reconciliation of records gathered from every file.
//!
//! Records from log segments and tables are folded into a [`KeySnapshot`]
//! that keeps, for each user key, the record with the highest sequence
//! number. Deletions take part in that comparison, so a newer tombstone
//! hides an older value. [`LiveSnapshot`] is the final view with the
//! tombstones dropped.
//!
//! # Example
//!
//! ```rust
//! use leveldump::internal_key::Record;
//! use leveldump::snapshot::{fold_records, LiveValue};
//!
//! let snapshot = fold_records(vec![
//!     Record::put(b"k", 5, b"\x01old"),
//!     Record::put(b"k", 10, b"\x01new"),
//!     Record::delete(b"gone", 3),
//! ]);
//!
//! let live = snapshot.into_live();
//! assert_eq!(live.get(b"k"), Some(&LiveValue::Text("new".to_string())));
//! assert!(!live.contains_key(b"gone"));
//! ```

use std::borrow::Cow;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::internal_key::{Record, ValueType};

/// Marker byte in front of values that hold text.
pub const TEXT_MARKER: u8 = 1;

/// Prefix of user keys rendered as hex.
pub const HEX_KEY_PREFIX: &str = "hex:";

/// Render a user key as text without losing bytes.
///
/// UTF-8 keys are returned as is. Other keys, and UTF-8 keys that already
/// start with [`HEX_KEY_PREFIX`], become the prefix followed by lowercase hex,
/// so distinct keys never render the same.
pub fn render_key(key: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(key) {
        Ok(text) if !text.starts_with(HEX_KEY_PREFIX) => Cow::Borrowed(text),
        _ => Cow::Owned(format!("{}{}", HEX_KEY_PREFIX, hex::encode(key))),
    }
}

/// The record retained for one user key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Put or delete
    pub value_type: ValueType,
    /// Sequence number of the retained record
    pub sequence: u64,
    /// Value bytes; empty for deletions
    pub value: Vec<u8>,
}

/// One entry per user key, holding the record with the greatest sequence
/// number seen so far.
#[derive(Debug, Clone, Default)]
pub struct KeySnapshot {
    entries: BTreeMap<Vec<u8>, SnapshotEntry>,
}

impl KeySnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the snapshot.
    ///
    /// The record replaces the current entry only if its sequence number is
    /// strictly greater. Returns true if the record was retained.
    pub fn apply(&mut self, record: Record) -> bool {
        let sequence = record.sequence();
        let value_type = record.value_type();
        let Record { key, value } = record;

        match self.entries.entry(key.into_user_key()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(SnapshotEntry { value_type, sequence, value });
                true
            }
            btree_map::Entry::Occupied(mut slot) => {
                if sequence > slot.get().sequence {
                    slot.insert(SnapshotEntry { value_type, sequence, value });
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Get the retained entry for a user key
    pub fn get(&self, user_key: &[u8]) -> Option<&SnapshotEntry> {
        self.entries.get(user_key)
    }

    /// Number of distinct user keys, tombstones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no record has been folded in
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop tombstones and classify the remaining values
    pub fn into_live(self) -> LiveSnapshot {
        let entries = self
            .entries
            .into_iter()
            .filter(|(_, entry)| entry.value_type == ValueType::Value)
            .map(|(key, entry)| (key, LiveValue::from_bytes(&entry.value)))
            .collect();
        LiveSnapshot { entries }
    }
}

impl Extend<Record> for KeySnapshot {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        for record in iter {
            self.apply(record);
        }
    }
}

/// Fold records in iteration order; on equal sequence numbers the earlier
/// record wins.
pub fn fold_records<I: IntoIterator<Item = Record>>(records: I) -> KeySnapshot {
    let mut snapshot = KeySnapshot::new();
    snapshot.extend(records);
    snapshot
}

/// A live value, classified by the text marker convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveValue {
    /// Value began with the text marker and the rest is UTF-8
    Text(String),
    /// Anything else, kept verbatim
    Raw(Vec<u8>),
}

impl LiveValue {
    /// Classify stored value bytes
    pub fn from_bytes(value: &[u8]) -> Self {
        match value.split_first() {
            Some((&TEXT_MARKER, rest)) => match std::str::from_utf8(rest) {
                Ok(text) => LiveValue::Text(text.to_string()),
                Err(_) => LiveValue::Raw(value.to_vec()),
            },
            _ => LiveValue::Raw(value.to_vec()),
        }
    }

    /// Returns the text if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            LiveValue::Text(text) => Some(text),
            LiveValue::Raw(_) => None,
        }
    }
}

impl fmt::Display for LiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveValue::Text(text) => f.write_str(text),
            LiveValue::Raw(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

impl Serialize for LiveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The externally visible result: live user keys and their values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSnapshot {
    entries: BTreeMap<Vec<u8>, LiveValue>,
}

impl LiveSnapshot {
    /// Get the value for a user key
    pub fn get(&self, user_key: &[u8]) -> Option<&LiveValue> {
        self.entries.get(user_key)
    }

    /// Check if a user key is live
    pub fn contains_key(&self, user_key: &[u8]) -> bool {
        self.entries.contains_key(user_key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no live keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate live keys in byte order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &LiveValue)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    /// Render keys with [`render_key`] and values with their display form
    pub fn to_text_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(key, value)| (render_key(key).into_owned(), value.to_string()))
            .collect()
    }
}

impl Serialize for LiveSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(&render_key(key), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_delete_hides_put() {
        let live = fold_records(vec![Record::put(b"k", 5, b"\x01old"), Record::delete(b"k", 9)])
            .into_live();
        assert!(live.is_empty());
    }

    #[test]
    fn test_newer_put_beats_delete() {
        let live = fold_records(vec![Record::delete(b"k", 3), Record::put(b"k", 10, b"\x01v")])
            .into_live();
        assert_eq!(live.get(b"k").and_then(LiveValue::as_text), Some("v"));
    }

    #[test]
    fn test_order_does_not_matter_for_distinct_sequences() {
        let forward = fold_records(vec![Record::put(b"k", 1, b"\x01a"), Record::put(b"k", 2, b"\x01b")]);
        let backward = fold_records(vec![Record::put(b"k", 2, b"\x01b"), Record::put(b"k", 1, b"\x01a")]);
        assert_eq!(forward.get(b"k"), backward.get(b"k"));
        assert_eq!(forward.get(b"k").unwrap().sequence, 2);
    }

    #[test]
    fn test_delete_only_key_is_not_live() {
        let snapshot = fold_records(vec![Record::delete(b"ghost", 4), Record::put(b"x", 1, b"\x01y")]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(b"ghost").unwrap().value_type, ValueType::Deletion);

        let live = snapshot.into_live();
        assert_eq!(live.len(), 1);
        assert!(!live.contains_key(b"ghost"));
    }

    #[test]
    fn test_equal_sequence_keeps_first() {
        let mut snapshot = KeySnapshot::new();
        assert!(snapshot.apply(Record::put(b"k", 7, b"\x01first")));
        assert!(!snapshot.apply(Record::put(b"k", 7, b"\x01second")));
        assert_eq!(snapshot.get(b"k").unwrap().value, b"\x01first");
    }

    #[test]
    fn test_value_classification() {
        assert_eq!(LiveValue::from_bytes(b"\x01v1"), LiveValue::Text("v1".to_string()));
        assert_eq!(LiveValue::from_bytes(b"\x01"), LiveValue::Text(String::new()));
        assert_eq!(LiveValue::from_bytes(b"\x00abc"), LiveValue::Raw(b"\x00abc".to_vec()));
        assert_eq!(LiveValue::from_bytes(b""), LiveValue::Raw(Vec::new()));
        assert_eq!(LiveValue::from_bytes(&[1, 0xff, 0xfe]), LiveValue::Raw(vec![1, 0xff, 0xfe]));
    }

    #[test]
    fn test_raw_display_is_hex() {
        assert_eq!(LiveValue::Raw(vec![0x00, 0xab, 0x10]).to_string(), "00ab10");
        assert_eq!(LiveValue::Text("plain".to_string()).to_string(), "plain");
    }

    #[test]
    fn test_render_key() {
        assert_eq!(render_key(b"plain"), "plain");
        assert_eq!(render_key(&[0xff, 0x00]), "hex:ff00");
        assert_eq!(render_key(b"hex:41"), "hex:6865783a3431");
        assert_eq!(render_key(b""), "");
    }

    #[test]
    fn test_invalid_utf8_keys_stay_distinct() {
        let live = fold_records(vec![
            Record::put(&[0xff], 1, b"\x01first"),
            Record::put(&[0xfe], 2, b"\x01second"),
            Record::put(b"hex:ff", 3, b"\x01literal"),
        ])
        .into_live();
        assert_eq!(live.len(), 3);

        let map = live.to_text_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map["hex:ff"], "first");
        assert_eq!(map["hex:fe"], "second");
        assert_eq!(map["hex:6865783a6666"], "literal");

        let json: serde_json::Value = serde_json::to_value(&live).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 3);
        assert_eq!(json["hex:fe"], "second");
    }

    #[test]
    fn test_text_map_and_json() {
        let live = fold_records(vec![
            Record::put(b"b", 2, b"\x02\x03"),
            Record::put(b"a", 1, b"\x01hello"),
        ])
        .into_live();

        let map = live.to_text_map();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map["b"], "0203");

        let json = serde_json::to_string(&live).unwrap();
        assert_eq!(json, r#"{"a":"hello","b":"0203"}"#);
    }
}
