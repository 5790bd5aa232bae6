//! SQL value type for cached result cells.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// A single column value held in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// String value (VARCHAR, CHAR, TEXT, etc.).
    String(String),
    /// 64-bit integer value.
    Integer(i64),
    /// Double-precision floating point value.
    Float(f64),
    /// Exact numeric value as decimal text (preserves precision).
    /// Can be converted to i64/f64 as needed.
    Numeric(String),
    /// Boolean value.
    Boolean(bool),
    /// Date value (no time component).
    Date(NaiveDate),
    /// Date/time value (no timezone).
    Timestamp(NaiveDateTime),
    /// Binary large object. `Bytes` keeps row duplication and
    /// original-value capture cheap.
    Blob(Bytes),
    /// Character large object.
    Clob(String),
}

impl SqlValue {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) => Some(s),
            SqlValue::Numeric(s) => Some(s),
            SqlValue::Clob(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Numeric(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Float(f) => Some(*f),
            SqlValue::Numeric(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get the value as binary data.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Check whether the value is one of the numeric variants.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlValue::Integer(_) | SqlValue::Float(_) | SqlValue::Numeric(_)
        )
    }

    /// Value equality as seen by dirty tracking.
    ///
    /// Numeric variants compare by numeric value across differing concrete
    /// types (`Integer(1)` equals `Numeric("1")`), binary values compare by
    /// content, everything else structurally.
    pub fn value_eq(&self, other: &SqlValue) -> bool {
        if self.is_numeric() && other.is_numeric() {
            // Prefer the exact comparison when both sides are integral.
            if let (Some(a), Some(b)) = (self.to_i64(), other.to_i64()) {
                return a == b;
            }
            return match (self.to_f64(), other.to_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => self == other,
            };
        }
        match (self, other) {
            (SqlValue::Blob(a), SqlValue::Blob(b)) => a == b,
            _ => self == other,
        }
    }

    /// Approximate in-memory size in bytes.
    ///
    /// Used by the population loop to enforce a memory budget.
    pub fn estimated_size(&self) -> usize {
        let payload = match self {
            SqlValue::Null | SqlValue::Boolean(_) => 0,
            SqlValue::Integer(_) | SqlValue::Float(_) => 8,
            SqlValue::Date(_) => 4,
            SqlValue::Timestamp(_) => 12,
            SqlValue::String(s) | SqlValue::Numeric(s) | SqlValue::Clob(s) => s.len(),
            SqlValue::Blob(b) => b.len(),
        };
        payload + std::mem::size_of::<SqlValue>()
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::String(s) => write!(f, "{}", s),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Float(x) => write!(f, "{}", x),
            SqlValue::Numeric(n) => write!(f, "{}", n),
            SqlValue::Boolean(b) => write!(f, "{}", b),
            SqlValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            SqlValue::Timestamp(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            SqlValue::Blob(b) => write!(f, "<BLOB: {} bytes>", b.len()),
            SqlValue::Clob(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::String(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::String(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Float(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_null() {
        let val = SqlValue::Null;
        assert!(val.is_null());
        assert_eq!(val.as_str(), None);
        assert_eq!(format!("{}", val), "NULL");
    }

    #[test]
    fn test_numeric_equality_across_variants() {
        assert!(SqlValue::Integer(42).value_eq(&SqlValue::Numeric("42".to_string())));
        assert!(SqlValue::Float(1.5).value_eq(&SqlValue::Numeric("1.5".to_string())));
        assert!(SqlValue::Integer(42).value_eq(&SqlValue::Float(42.0)));
        assert!(!SqlValue::Integer(42).value_eq(&SqlValue::Integer(43)));
    }

    #[test]
    fn test_large_integer_equality_is_exact() {
        // Values beyond f64's 53-bit mantissa must not collide.
        let a = SqlValue::Integer(9007199254740993);
        let b = SqlValue::Numeric("9007199254740992".to_string());
        assert!(!a.value_eq(&b));
    }

    #[test]
    fn test_blob_equality_by_content() {
        let a = SqlValue::Blob(Bytes::from_static(b"abc"));
        let b = SqlValue::Blob(Bytes::copy_from_slice(b"abc"));
        assert!(a.value_eq(&b));
        assert!(!a.value_eq(&SqlValue::Blob(Bytes::from_static(b"abd"))));
    }

    #[test]
    fn test_string_is_not_numeric() {
        assert!(!SqlValue::String("42".to_string()).value_eq(&SqlValue::Integer(42)));
    }

    #[test]
    fn test_estimated_size_tracks_payload() {
        let small = SqlValue::String("a".to_string()).estimated_size();
        let big = SqlValue::String("a".repeat(1000)).estimated_size();
        assert!(big > small + 900);
    }
}
