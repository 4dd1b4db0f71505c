//! Decoded values stored in an archive's object arena

use std::collections::BTreeMap;
use std::time::SystemTime;

/// Key used by the XML and JSON renderings of a keyed archive for references
pub const UID_KEY: &str = "CF$UID";

/// Placeholder string the archiver stores at object index 0
const NULL_MARKER: &str = "$null";

/// A single decoded object from a keyed archive
///
/// `Null`, `Integer(0)`, `Boolean(false)` and `String("")` are all legitimate
/// decoded values. A key that does not resolve at all is reported by the
/// lookup methods as `None` instead, so the two can never be confused.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
    Data(Vec<u8>),
    Date(SystemTime),
    /// Reference to another object in the arena
    Uid(u64),
    Array(Vec<ArchiveValue>),
    Dictionary(BTreeMap<String, ArchiveValue>),
}

impl ArchiveValue {
    /// Object id this value points at, if it is a valid reference
    ///
    /// Both the native UID form and the `{"CF$UID": n}` dictionary form are
    /// accepted. Ids of zero or below are not valid references.
    pub fn as_reference(&self) -> Option<u64> {
        let id = match self {
            ArchiveValue::Uid(id) => *id,
            ArchiveValue::Dictionary(entries) if entries.len() == 1 => match entries.get(UID_KEY)? {
                ArchiveValue::Integer(id) => u64::try_from(*id).ok()?,
                ArchiveValue::Uid(id) => *id,
                _ => return None,
            },
            _ => return None,
        };

        (id > 0).then_some(id)
    }

    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, ArchiveValue>> {
        match self {
            ArchiveValue::Dictionary(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArchiveValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArchiveValue::Real(n) => Some(*n),
            ArchiveValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Integer value; reals are only accepted when they have no fraction
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArchiveValue::Integer(n) => Some(*n),
            ArchiveValue::Real(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Boolean value; archives frequently encode flags as 0/1 integers
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArchiveValue::Boolean(b) => Some(*b),
            ArchiveValue::Integer(n) => Some(*n != 0),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            ArchiveValue::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArchiveValue::Null)
    }
}

impl From<plist::Value> for ArchiveValue {
    fn from(value: plist::Value) -> Self {
        match value {
            plist::Value::Boolean(b) => ArchiveValue::Boolean(b),
            plist::Value::Integer(n) => match n.as_signed() {
                Some(signed) => ArchiveValue::Integer(signed),
                // Only unsigned values above i64::MAX end up here
                None => ArchiveValue::Real(n.as_unsigned().unwrap_or_default() as f64),
            },
            plist::Value::Real(n) => ArchiveValue::Real(n),
            plist::Value::String(s) if s == NULL_MARKER => ArchiveValue::Null,
            plist::Value::String(s) => ArchiveValue::String(s),
            plist::Value::Data(bytes) => ArchiveValue::Data(bytes),
            plist::Value::Date(date) => ArchiveValue::Date(SystemTime::from(date)),
            plist::Value::Uid(uid) => ArchiveValue::Uid(uid.get()),
            plist::Value::Array(items) => {
                ArchiveValue::Array(items.into_iter().map(ArchiveValue::from).collect())
            }
            plist::Value::Dictionary(entries) => ArchiveValue::Dictionary(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, ArchiveValue::from(value)))
                    .collect(),
            ),
            _ => ArchiveValue::Null,
        }
    }
}

impl From<&str> for ArchiveValue {
    fn from(s: &str) -> Self {
        ArchiveValue::String(s.to_string())
    }
}

impl From<i64> for ArchiveValue {
    fn from(n: i64) -> Self {
        ArchiveValue::Integer(n)
    }
}

impl From<f64> for ArchiveValue {
    fn from(n: f64) -> Self {
        ArchiveValue::Real(n)
    }
}

impl From<bool> for ArchiveValue {
    fn from(b: bool) -> Self {
        ArchiveValue::Boolean(b)
    }
}

impl From<Vec<u8>> for ArchiveValue {
    fn from(bytes: Vec<u8>) -> Self {
        ArchiveValue::Data(bytes)
    }
}
