//! Team record model.
//!
//! A record is a free-form JSON object. Only `id` and `parent_id` carry
//! structure; every other field is passed through untouched and in order.

use serde_json::Value;
use std::fmt;

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "id";
/// Field holding the identifier of a record's parent (`null` or absent for the root).
pub const PARENT_ID_FIELD: &str = "parent_id";
/// Field holding the nested children of a node.
pub const CHILDREN_FIELD: &str = "children";

/// A flat team record, field order preserved.
pub type Record = serde_json::Map<String, Value>;

/// Hashable key for `id` / `parent_id` values.
///
/// Integers and canonical integer strings share one key space, so a child
/// with `"parent_id": "1"` lands under the parent with `"id": 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Derive a key from a JSON value. Returns `None` for unkeyable values.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(match canonical_int(s) {
                Some(i) => Self::Int(i),
                None => Self::Str(s.clone()),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Where a record hangs in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// `parent_id` is `null` or missing.
    Root,
    Id(RecordId),
    /// `parent_id` is present but cannot be used as a key.
    Invalid,
}

/// The record's own key, if it has a usable `id`.
pub fn record_id(record: &Record) -> Option<RecordId> {
    record.get(ID_FIELD).and_then(RecordId::from_value)
}

/// Classify the record's `parent_id`.
pub fn parent_ref(record: &Record) -> ParentRef {
    match record.get(PARENT_ID_FIELD) {
        None | Some(Value::Null) => ParentRef::Root,
        Some(value) => RecordId::from_value(value)
            .map(ParentRef::Id)
            .unwrap_or(ParentRef::Invalid),
    }
}

/// Parse a decimal integer string without leading zeros, `+` or `-0`.
fn canonical_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    if s == "-0" {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_integer_and_numeric_string_share_key() {
        assert_eq!(RecordId::from_value(&json!(7)), Some(RecordId::Int(7)));
        assert_eq!(RecordId::from_value(&json!("7")), Some(RecordId::Int(7)));
        assert_eq!(RecordId::from_value(&json!("-12")), Some(RecordId::Int(-12)));
    }

    #[test]
    fn test_non_canonical_strings_stay_strings() {
        assert_eq!(
            RecordId::from_value(&json!("007")),
            Some(RecordId::Str("007".to_string()))
        );
        assert_eq!(
            RecordId::from_value(&json!("-0")),
            Some(RecordId::Str("-0".to_string()))
        );
        assert_eq!(
            RecordId::from_value(&json!("team-a")),
            Some(RecordId::Str("team-a".to_string()))
        );
        // Overflows i64, so it cannot be an integer key.
        assert_eq!(
            RecordId::from_value(&json!("99999999999999999999")),
            Some(RecordId::Str("99999999999999999999".to_string()))
        );
    }

    #[test]
    fn test_unkeyable_values() {
        assert_eq!(RecordId::from_value(&json!(1.5)), None);
        assert_eq!(RecordId::from_value(&json!(true)), None);
        assert_eq!(RecordId::from_value(&json!([1])), None);
        assert_eq!(RecordId::from_value(&Value::Null), None);
    }

    #[test]
    fn test_parent_ref() {
        assert_eq!(parent_ref(&record(json!({"id": 1, "parent_id": null}))), ParentRef::Root);
        assert_eq!(parent_ref(&record(json!({"id": 1}))), ParentRef::Root);
        assert_eq!(
            parent_ref(&record(json!({"id": 2, "parent_id": 1}))),
            ParentRef::Id(RecordId::Int(1))
        );
        assert_eq!(
            parent_ref(&record(json!({"id": 2, "parent_id": false}))),
            ParentRef::Invalid
        );
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::Int(3).to_string(), "3");
        assert_eq!(RecordId::Str("ops".to_string()).to_string(), "ops");
        assert_eq!(record_id(&record(json!({"name": "x"}))), None);
    }
}
