use super::LiveColumnInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared, database-independent column type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogicalType {
    Integer32,
    Integer64,
    /// Text with an optional maximum length; `None` is unbounded.
    Text(Option<u32>),
    Boolean,
    Decimal,
    Timestamp,
    /// An optional field wrapping another type. Nullability of the column is
    /// declared separately; the wrapper never changes the SQL type.
    Nullable(Box<LogicalType>),
}

impl LogicalType {
    pub fn nullable(inner: LogicalType) -> Self {
        match inner {
            LogicalType::Nullable(_) => inner,
            other => LogicalType::Nullable(Box::new(other)),
        }
    }

    /// Strips any nullable wrapper.
    pub fn unwrapped(&self) -> &LogicalType {
        let mut current = self;
        while let LogicalType::Nullable(inner) = current {
            current = inner;
        }
        current
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.unwrapped(),
            LogicalType::Integer32 | LogicalType::Integer64
        )
    }

    pub fn sql_type(&self) -> SqlType {
        match self {
            LogicalType::Nullable(inner) => inner.sql_type(),
            LogicalType::Integer32 => SqlType::Int,
            LogicalType::Integer64 => SqlType::BigInt,
            LogicalType::Text(Some(len)) => SqlType::Varchar(*len),
            LogicalType::Text(None) => SqlType::Text,
            LogicalType::Boolean => SqlType::Boolean,
            LogicalType::Decimal => SqlType::Decimal,
            LogicalType::Timestamp => SqlType::Timestamp,
        }
    }
}

/// PostgreSQL column type produced from a [`LogicalType`].
///
/// The same value drives DDL rendering (`Display`) and comparison against the
/// catalog (`matches`), so create scripts always detect as clean afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SqlType {
    Int,
    BigInt,
    Varchar(u32),
    Text,
    Boolean,
    /// Fixed precision 18, scale 2.
    Decimal,
    Timestamp,
}

impl SqlType {
    pub const DECIMAL_PRECISION: u8 = 18;
    pub const DECIMAL_SCALE: u8 = 2;

    /// The name `information_schema.columns.data_type` reports for this type.
    pub fn catalog_name(&self) -> &'static str {
        match self {
            SqlType::Int => "integer",
            SqlType::BigInt => "bigint",
            SqlType::Varchar(_) => "character varying",
            SqlType::Text => "text",
            SqlType::Boolean => "boolean",
            SqlType::Decimal => "numeric",
            SqlType::Timestamp => "timestamp without time zone",
        }
    }

    /// Explicit length that must match the live `character_maximum_length`.
    pub fn max_length(&self) -> Option<u32> {
        match self {
            SqlType::Varchar(len) => Some(*len),
            _ => None,
        }
    }

    /// Case-insensitive comparison against a live column. Length is only
    /// checked when this type carries one.
    pub fn matches(&self, live: &LiveColumnInfo) -> bool {
        let live_type = crate::util::normalize_sql_whitespace(&live.data_type);
        if !live_type.eq_ignore_ascii_case(self.catalog_name()) {
            return false;
        }
        match self.max_length() {
            Some(len) => live.max_length == Some(len),
            None => true,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Int => write!(f, "INT"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Varchar(len) => write!(f, "VARCHAR({len})"),
            SqlType::Text => write!(f, "TEXT"),
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Decimal => write!(
                f,
                "DECIMAL({},{})",
                Self::DECIMAL_PRECISION,
                Self::DECIMAL_SCALE
            ),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}
