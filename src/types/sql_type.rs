//! Column data types with type-specific attributes.
//!
//! A small generic type system modeled on the JDBC type codes: just enough
//! detail for the cache to make binding decisions (fixed-width padding,
//! LOB streaming, array element splitting).
//!
//! Note: Nullability is a column property, not a type property.

use std::fmt;

/// Generic JDBC-style type codes for the types the cache special-cases.
pub const TYPE_CODE_VARCHAR: i32 = 12;
pub const TYPE_CODE_CHAR: i32 = 1;
pub const TYPE_CODE_INTEGER: i32 = 4;
pub const TYPE_CODE_NUMERIC: i32 = 2;
pub const TYPE_CODE_DOUBLE: i32 = 8;
pub const TYPE_CODE_BOOLEAN: i32 = 16;
pub const TYPE_CODE_DATE: i32 = 91;
pub const TYPE_CODE_TIMESTAMP: i32 = 93;
pub const TYPE_CODE_BLOB: i32 = 2004;
pub const TYPE_CODE_CLOB: i32 = 2005;
pub const TYPE_CODE_ARRAY: i32 = 2003;

/// Column data type with type-specific attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlType {
    /// VARCHAR(max_size) - variable-length string.
    Varchar { max_size: u32 },
    /// CHAR(max_size) - fixed-length string, padding candidate.
    Char { max_size: u32 },
    /// Integer type.
    Integer,
    /// NUMERIC(precision, scale) - exact numeric type.
    Numeric { precision: i8, scale: i8 },
    /// Double-precision floating point.
    Double,
    /// Boolean.
    Boolean,
    /// Date (no time component).
    Date,
    /// Date/time (no timezone).
    Timestamp,
    /// Binary Large Object.
    Blob,
    /// Character Large Object.
    Clob,
    /// Multi-valued column rendered as a delimited literal; split into
    /// elements at bind time.
    Array { delimiter: char },
    /// Any other driver-reported type, carrying its raw type code.
    Other(i32),
}

impl SqlType {
    /// Create from a raw JDBC-style type code and declared size/scale.
    pub fn from_code(code: i32, size: u32, precision: i8, scale: i8) -> Self {
        match code {
            TYPE_CODE_VARCHAR => SqlType::Varchar { max_size: size },
            TYPE_CODE_CHAR => SqlType::Char { max_size: size },
            TYPE_CODE_INTEGER => SqlType::Integer,
            TYPE_CODE_NUMERIC => SqlType::Numeric { precision, scale },
            TYPE_CODE_DOUBLE => SqlType::Double,
            TYPE_CODE_BOOLEAN => SqlType::Boolean,
            TYPE_CODE_DATE => SqlType::Date,
            TYPE_CODE_TIMESTAMP => SqlType::Timestamp,
            TYPE_CODE_BLOB => SqlType::Blob,
            TYPE_CODE_CLOB => SqlType::Clob,
            TYPE_CODE_ARRAY => SqlType::Array { delimiter: ',' },
            other => SqlType::Other(other),
        }
    }

    /// Get the JDBC-style type code.
    pub fn type_num(&self) -> i32 {
        match self {
            SqlType::Varchar { .. } => TYPE_CODE_VARCHAR,
            SqlType::Char { .. } => TYPE_CODE_CHAR,
            SqlType::Integer => TYPE_CODE_INTEGER,
            SqlType::Numeric { .. } => TYPE_CODE_NUMERIC,
            SqlType::Double => TYPE_CODE_DOUBLE,
            SqlType::Boolean => TYPE_CODE_BOOLEAN,
            SqlType::Date => TYPE_CODE_DATE,
            SqlType::Timestamp => TYPE_CODE_TIMESTAMP,
            SqlType::Blob => TYPE_CODE_BLOB,
            SqlType::Clob => TYPE_CODE_CLOB,
            SqlType::Array { .. } => TYPE_CODE_ARRAY,
            SqlType::Other(code) => *code,
        }
    }

    /// Get max_size (for sized types like Varchar/Char, 0 otherwise).
    pub fn max_size(&self) -> u32 {
        match self {
            SqlType::Varchar { max_size } => *max_size,
            SqlType::Char { max_size } => *max_size,
            _ => 0,
        }
    }

    /// Whether this is one of the LOB types.
    pub fn is_lob(&self) -> bool {
        matches!(self, SqlType::Blob | SqlType::Clob)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Varchar { max_size } => write!(f, "VARCHAR({})", max_size),
            SqlType::Char { max_size } => write!(f, "CHAR({})", max_size),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::Numeric { precision, scale } => {
                if *precision == 0 && *scale == 0 {
                    write!(f, "NUMERIC")
                } else if *scale == 0 {
                    write!(f, "NUMERIC({})", precision)
                } else {
                    write!(f, "NUMERIC({},{})", precision, scale)
                }
            }
            SqlType::Double => write!(f, "DOUBLE"),
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Date => write!(f, "DATE"),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
            SqlType::Blob => write!(f, "BLOB"),
            SqlType::Clob => write!(f, "CLOB"),
            SqlType::Array { .. } => write!(f, "ARRAY"),
            SqlType::Other(code) => write!(f, "TYPE({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_varchar() {
        let t = SqlType::from_code(TYPE_CODE_VARCHAR, 100, 0, 0);
        assert_eq!(t, SqlType::Varchar { max_size: 100 });
    }

    #[test]
    fn test_from_code_numeric() {
        let t = SqlType::from_code(TYPE_CODE_NUMERIC, 0, 10, 2);
        assert_eq!(
            t,
            SqlType::Numeric {
                precision: 10,
                scale: 2
            }
        );
    }

    #[test]
    fn test_from_code_unknown_round_trips() {
        let t = SqlType::from_code(-155, 0, 0, 0);
        assert_eq!(t, SqlType::Other(-155));
        assert_eq!(t.type_num(), -155);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SqlType::Varchar { max_size: 50 }), "VARCHAR(50)");
        assert_eq!(
            format!(
                "{}",
                SqlType::Numeric {
                    precision: 10,
                    scale: 2
                }
            ),
            "NUMERIC(10,2)"
        );
        assert_eq!(
            format!(
                "{}",
                SqlType::Numeric {
                    precision: 0,
                    scale: 0
                }
            ),
            "NUMERIC"
        );
    }
}
