//! Canonical warehouse type system.
//!
//! Every source engine maps its native column types onto [`CanonicalType`],
//! which renders directly as warehouse DDL. The mapping is total: anything a
//! mapper does not recognize becomes [`CanonicalType::Unmapped`], which is
//! stored as `VARCHAR` and carries the original type name so the generated
//! DDL can explain the lossy conversion.
//!
//! ```text
//! PostgreSQL  numeric(10,2)  ─┐
//! MySQL       decimal(10,2)  ─┼─→  Number { 10, 2 }  ─→  NUMBER(10,2)
//! SQL Server  decimal(10,2)  ─┘
//! ```

use std::fmt;

use crate::core::schema::{Column, SourceEngine};

/// Largest precision the warehouse NUMBER type supports.
pub const MAX_NUMBER_PRECISION: u32 = 38;

/// Largest VARCHAR length the warehouse supports (16 MiB).
pub const MAX_VARCHAR_LENGTH: u32 = 16_777_216;

/// Canonical target type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Exact decimal. `None` precision means the source declared none.
    Number {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    /// Single precision floating point.
    Float,
    /// Double precision floating point.
    Double,
    /// Variable-length text. `None` is unbounded.
    Varchar(Option<u32>),
    /// Fixed-length text.
    Char(u32),
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day without date.
    Time,
    /// Timestamp without time zone.
    TimestampNtz,
    /// Timestamp with time zone.
    TimestampTz,
    /// Semi-structured document (JSON, XML, ...).
    Variant,
    /// Opaque binary data.
    Binary,
    /// Array whose elements were mapped to the inner type.
    Array(Box<CanonicalType>),
    /// Native type with no canonical counterpart; stored as unbounded text.
    Unmapped(String),
}

impl CanonicalType {
    /// Exact decimal with declared precision and scale.
    pub fn number(precision: u32, scale: u32) -> Self {
        CanonicalType::Number {
            precision: Some(precision),
            scale: Some(scale),
        }
    }

    /// Whether the type is an integer type that may carry IDENTITY.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            CanonicalType::SmallInt | CanonicalType::Integer | CanonicalType::BigInt
        ) || matches!(self, CanonicalType::Number { scale: Some(0), .. })
    }

    /// Render the type as warehouse DDL.
    pub fn sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalType::SmallInt => write!(f, "SMALLINT"),
            CanonicalType::Integer => write!(f, "INTEGER"),
            CanonicalType::BigInt => write!(f, "BIGINT"),
            CanonicalType::Number {
                precision: Some(p),
                scale,
            } => write!(f, "NUMBER({},{})", p, scale.unwrap_or(0)),
            CanonicalType::Number { precision: None, .. } => write!(f, "NUMBER"),
            CanonicalType::Float => write!(f, "FLOAT"),
            CanonicalType::Double => write!(f, "DOUBLE"),
            CanonicalType::Varchar(Some(n)) => write!(f, "VARCHAR({})", n),
            CanonicalType::Varchar(None) => write!(f, "VARCHAR"),
            CanonicalType::Char(n) => write!(f, "CHAR({})", n),
            CanonicalType::Boolean => write!(f, "BOOLEAN"),
            CanonicalType::Date => write!(f, "DATE"),
            CanonicalType::Time => write!(f, "TIME"),
            CanonicalType::TimestampNtz => write!(f, "TIMESTAMP_NTZ"),
            CanonicalType::TimestampTz => write!(f, "TIMESTAMP_TZ"),
            CanonicalType::Variant => write!(f, "VARIANT"),
            CanonicalType::Binary => write!(f, "BINARY"),
            // Warehouse arrays are untyped; the element type travels in the warning.
            CanonicalType::Array(_) => write!(f, "ARRAY"),
            CanonicalType::Unmapped(_) => write!(f, "VARCHAR"),
        }
    }
}

/// Result of mapping one native column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// The canonical target type.
    pub canonical_type: CanonicalType,
    /// Whether the column is an auto-increment column (`IDENTITY(1,1)`).
    pub identity: bool,
    /// Explanation of a lossy or unusual conversion, emitted as a DDL comment.
    pub warning: Option<String>,
}

impl TypeMapping {
    /// Create a lossless mapping.
    pub fn lossless(canonical_type: CanonicalType) -> Self {
        Self {
            canonical_type,
            identity: false,
            warning: None,
        }
    }

    /// Create a mapping that carries a warning.
    pub fn lossy(canonical_type: CanonicalType, warning: impl Into<String>) -> Self {
        Self {
            canonical_type,
            identity: false,
            warning: Some(warning.into()),
        }
    }

    /// Create the UNMAPPED fallback for a native type.
    pub fn unmapped(engine: SourceEngine, original: &str, reason: &str) -> Self {
        Self::lossy(
            CanonicalType::Unmapped(original.to_string()),
            format!(
                "UNMAPPED {} type '{}' stored as VARCHAR: {}",
                engine, original, reason
            ),
        )
    }

    /// Set the identity flag.
    pub fn with_identity(mut self, identity: bool) -> Self {
        self.identity = identity;
        self
    }

    /// Append a warning, joining with any existing one.
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        self.warning = Some(match self.warning.take() {
            Some(existing) => format!("{}; {}", existing, warning),
            None => warning,
        });
    }

    /// Whether the column should be flagged in generated DDL.
    pub fn is_flagged(&self) -> bool {
        self.warning.is_some()
    }
}

/// Map native column types of one source engine onto canonical types.
///
/// Implementations are pure: the same column always yields the same mapping,
/// and unknown types fall back to [`CanonicalType::Unmapped`] instead of
/// failing.
pub trait TypeMapper: Send + Sync {
    /// The engine this mapper handles.
    fn engine(&self) -> SourceEngine;

    /// Map a column's native type.
    fn map_column(&self, column: &Column) -> TypeMapping;

    /// Translate a default-value expression into warehouse syntax.
    ///
    /// Returns `None` when the default should be dropped (for example
    /// sequence-backed defaults that become `IDENTITY`).
    fn map_default(&self, expr: &str) -> Option<String>;
}
