//! Attribute values and record keys
//!
//! Attribute bags are kept deliberately small: a closed set of scalar kinds
//! that survives both JSON and YAML encodings unchanged.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Attribute name -> value mapping of a single record
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Scalar attribute value
///
/// Encoded untagged. Dates are written as RFC 3339 strings and always decode
/// as text; a store turns them back into dates for the columns it declares as
/// dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    #[serde(skip_deserializing)]
    Date(DateTime<Utc>),
    Text(String),
}

impl AttributeValue {
    /// Returns true for null and for empty or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            AttributeValue::Null => true,
            AttributeValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read a date, parsing RFC 3339 text
    pub fn to_date(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::Date(d) => Some(*d),
            AttributeValue::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            _ => None,
        }
    }
}

impl Default for AttributeValue {
    fn default() -> Self {
        AttributeValue::Null
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::Date(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Uuid> for AttributeValue {
    fn from(value: Uuid) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

/// Build an [`Attributes`] map from `(name, value)` pairs
pub fn attributes<K, V, I>(pairs: I) -> Attributes
where
    K: Into<String>,
    V: Into<AttributeValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Primary key of a persisted record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// Auto-incrementing integer primary key
    Integer(i64),
    /// UUID primary key
    Uuid(Uuid),
}

impl RecordKey {
    /// Convert an attribute value into a key.
    ///
    /// Integers and numeric strings become integer keys, UUID strings become
    /// UUID keys.
    pub fn from_value(value: &AttributeValue) -> StoreResult<Self> {
        match value {
            AttributeValue::Integer(i) => Ok(RecordKey::Integer(*i)),
            AttributeValue::Text(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(RecordKey::Integer(i));
                }
                Uuid::parse_str(s)
                    .map(RecordKey::Uuid)
                    .map_err(|_| StoreError::InvalidKey(format!("'{}' is not an integer or UUID", s)))
            }
            other => Err(StoreError::InvalidKey(format!(
                "'{}' cannot be used as a primary key",
                other
            ))),
        }
    }

    /// The key as it appears in an attribute bag
    pub fn to_value(&self) -> AttributeValue {
        match self {
            RecordKey::Integer(i) => AttributeValue::Integer(*i),
            RecordKey::Uuid(id) => AttributeValue::Text(id.to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RecordKey::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Integer(id) => write!(f, "{}", id),
            RecordKey::Uuid(id) => write!(f, "{}", id),
        }
    }
}
