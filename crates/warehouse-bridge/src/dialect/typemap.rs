//! Per-engine type mappers.
//!
//! Each engine's mapping is a static table of `(native name, Rule)` pairs.
//! A [`Rule`] says how the declared precision, scale and length of the
//! column flow into the canonical type, so the tables stay pure data and the
//! interpretation lives in one place ([`apply_rule`]). Engine-specific
//! quirks that depend on modifiers rather than names (MySQL `tinyint(1)`,
//! unsigned widening, PostgreSQL arrays) are handled before the lookup.
//!
//! Identity is detected independently of the base mapping and applied
//! afterwards, so `serial` and `integer` share the same integer logic.

use crate::core::schema::{Column, SourceEngine};

use super::canonical::{
    CanonicalType, TypeMapper, TypeMapping, MAX_NUMBER_PRECISION, MAX_VARCHAR_LENGTH,
};
use super::native::NativeType;

/// How a native type maps onto a canonical type.
#[derive(Debug, Clone, Copy)]
enum Rule {
    SmallInt,
    Integer,
    BigInt,
    /// Auto-incrementing integer pseudo-types (`serial`).
    SmallSerial,
    Serial,
    BigSerial,
    /// Exact decimal from declared precision/scale. When nothing is declared
    /// the engine default precision applies, or an unconstrained NUMBER.
    Decimal { default_precision: Option<u32> },
    /// Exact decimal with fixed precision and scale (money types).
    FixedNumber(u32, u32),
    Float,
    Double,
    /// Text bounded by the declared length; unbounded when none is declared.
    Varchar,
    /// Text with an engine-fixed length.
    FixedVarchar(u32),
    /// Fixed-length text, length 1 when none is declared.
    Char,
    /// Unbounded text.
    Text,
    Boolean,
    Date,
    Time,
    TimestampNtz,
    TimestampTz,
    Variant,
    Binary,
    /// Map as the inner rule and attach a warning.
    Lossy(&'static Rule, &'static str),
    /// No canonical counterpart.
    Unmapped(&'static str),
}

const POSTGRES_TYPES: &[(&str, Rule)] = &[
    ("bool", Rule::Boolean),
    ("boolean", Rule::Boolean),
    ("int2", Rule::SmallInt),
    ("smallint", Rule::SmallInt),
    ("int4", Rule::Integer),
    ("int", Rule::Integer),
    ("integer", Rule::Integer),
    ("int8", Rule::BigInt),
    ("bigint", Rule::BigInt),
    ("oid", Rule::BigInt),
    ("smallserial", Rule::SmallSerial),
    ("serial2", Rule::SmallSerial),
    ("serial", Rule::Serial),
    ("serial4", Rule::Serial),
    ("bigserial", Rule::BigSerial),
    ("serial8", Rule::BigSerial),
    ("numeric", Rule::Decimal { default_precision: None }),
    ("decimal", Rule::Decimal { default_precision: None }),
    ("money", Rule::FixedNumber(19, 2)),
    ("float4", Rule::Float),
    ("real", Rule::Float),
    ("float8", Rule::Double),
    ("float", Rule::Double),
    ("double precision", Rule::Double),
    ("varchar", Rule::Varchar),
    ("character varying", Rule::Varchar),
    ("char", Rule::Char),
    ("character", Rule::Char),
    ("bpchar", Rule::Char),
    ("text", Rule::Text),
    ("citext", Rule::Text),
    ("name", Rule::FixedVarchar(63)),
    ("uuid", Rule::FixedVarchar(36)),
    ("bytea", Rule::Binary),
    ("bit", Rule::Binary),
    ("varbit", Rule::Binary),
    ("bit varying", Rule::Binary),
    ("date", Rule::Date),
    ("time", Rule::Time),
    ("time without time zone", Rule::Time),
    (
        "timetz",
        Rule::Lossy(&Rule::Time, "time zone offset of TIME WITH TIME ZONE is not preserved"),
    ),
    (
        "time with time zone",
        Rule::Lossy(&Rule::Time, "time zone offset of TIME WITH TIME ZONE is not preserved"),
    ),
    ("timestamp", Rule::TimestampNtz),
    ("timestamp without time zone", Rule::TimestampNtz),
    ("timestamptz", Rule::TimestampTz),
    ("timestamp with time zone", Rule::TimestampTz),
    ("json", Rule::Variant),
    ("jsonb", Rule::Variant),
    ("xml", Rule::Variant),
    ("hstore", Rule::Variant),
    ("interval", Rule::Unmapped("interval has no warehouse equivalent")),
    ("inet", Rule::Unmapped("network address type")),
    ("cidr", Rule::Unmapped("network address type")),
    ("macaddr", Rule::Unmapped("network address type")),
    ("macaddr8", Rule::Unmapped("network address type")),
    ("tsvector", Rule::Unmapped("full-text search type")),
    ("tsquery", Rule::Unmapped("full-text search type")),
    ("point", Rule::Unmapped("geometric type")),
    ("line", Rule::Unmapped("geometric type")),
    ("lseg", Rule::Unmapped("geometric type")),
    ("box", Rule::Unmapped("geometric type")),
    ("path", Rule::Unmapped("geometric type")),
    ("polygon", Rule::Unmapped("geometric type")),
    ("circle", Rule::Unmapped("geometric type")),
    ("int4range", Rule::Unmapped("range type")),
    ("int8range", Rule::Unmapped("range type")),
    ("numrange", Rule::Unmapped("range type")),
    ("tsrange", Rule::Unmapped("range type")),
    ("tstzrange", Rule::Unmapped("range type")),
    ("daterange", Rule::Unmapped("range type")),
    ("user-defined", Rule::Unmapped("user-defined type")),
];

const MYSQL_TYPES: &[(&str, Rule)] = &[
    ("bool", Rule::Boolean),
    ("boolean", Rule::Boolean),
    ("tinyint", Rule::SmallInt),
    ("smallint", Rule::SmallInt),
    ("mediumint", Rule::Integer),
    ("int", Rule::Integer),
    ("integer", Rule::Integer),
    ("bigint", Rule::BigInt),
    ("serial", Rule::BigSerial),
    ("decimal", Rule::Decimal { default_precision: Some(10) }),
    ("numeric", Rule::Decimal { default_precision: Some(10) }),
    ("dec", Rule::Decimal { default_precision: Some(10) }),
    ("fixed", Rule::Decimal { default_precision: Some(10) }),
    ("float", Rule::Float),
    ("double", Rule::Double),
    ("double precision", Rule::Double),
    ("real", Rule::Double),
    ("char", Rule::Char),
    ("varchar", Rule::Varchar),
    ("tinytext", Rule::Text),
    ("text", Rule::Text),
    ("mediumtext", Rule::Text),
    ("longtext", Rule::Text),
    ("binary", Rule::Binary),
    ("varbinary", Rule::Binary),
    ("tinyblob", Rule::Binary),
    ("blob", Rule::Binary),
    ("mediumblob", Rule::Binary),
    ("longblob", Rule::Binary),
    ("bit", Rule::Binary),
    ("date", Rule::Date),
    ("time", Rule::Time),
    ("datetime", Rule::TimestampNtz),
    ("timestamp", Rule::TimestampTz),
    ("year", Rule::SmallInt),
    ("json", Rule::Variant),
    ("enum", Rule::Unmapped("enumeration values are not enforced")),
    ("set", Rule::Unmapped("set values are not enforced")),
    ("geometry", Rule::Unmapped("spatial type")),
    ("point", Rule::Unmapped("spatial type")),
    ("linestring", Rule::Unmapped("spatial type")),
    ("polygon", Rule::Unmapped("spatial type")),
    ("multipoint", Rule::Unmapped("spatial type")),
    ("multilinestring", Rule::Unmapped("spatial type")),
    ("multipolygon", Rule::Unmapped("spatial type")),
    ("geometrycollection", Rule::Unmapped("spatial type")),
];

const MSSQL_TYPES: &[(&str, Rule)] = &[
    ("bit", Rule::Boolean),
    ("tinyint", Rule::SmallInt),
    ("smallint", Rule::SmallInt),
    ("int", Rule::Integer),
    ("bigint", Rule::BigInt),
    ("decimal", Rule::Decimal { default_precision: Some(18) }),
    ("numeric", Rule::Decimal { default_precision: Some(18) }),
    ("money", Rule::FixedNumber(19, 4)),
    ("smallmoney", Rule::FixedNumber(10, 4)),
    ("float", Rule::Double),
    ("real", Rule::Float),
    ("char", Rule::Char),
    ("nchar", Rule::Char),
    ("varchar", Rule::Varchar),
    ("nvarchar", Rule::Varchar),
    ("text", Rule::Text),
    ("ntext", Rule::Text),
    ("binary", Rule::Binary),
    ("varbinary", Rule::Binary),
    ("image", Rule::Binary),
    (
        "timestamp",
        Rule::Lossy(&Rule::Binary, "rowversion values are generated by the source server"),
    ),
    (
        "rowversion",
        Rule::Lossy(&Rule::Binary, "rowversion values are generated by the source server"),
    ),
    ("date", Rule::Date),
    ("time", Rule::Time),
    ("datetime", Rule::TimestampNtz),
    ("datetime2", Rule::TimestampNtz),
    ("smalldatetime", Rule::TimestampNtz),
    ("datetimeoffset", Rule::TimestampTz),
    ("uniqueidentifier", Rule::FixedVarchar(36)),
    ("xml", Rule::Variant),
    ("sql_variant", Rule::Variant),
    ("geometry", Rule::Unmapped("spatial type")),
    ("geography", Rule::Unmapped("spatial type")),
    ("hierarchyid", Rule::Unmapped("CLR type")),
];

fn lookup(table: &'static [(&'static str, Rule)], base: &str) -> Option<Rule> {
    table
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, rule)| *rule)
}

/// Declared length: the column descriptor wins over the type string.
fn declared_length(native: &NativeType, column: &Column) -> Option<i64> {
    column.max_length.or_else(|| native.length_arg())
}

fn apply_rule(
    rule: Rule,
    engine: SourceEngine,
    native: &NativeType,
    column: &Column,
) -> TypeMapping {
    match rule {
        Rule::SmallInt => TypeMapping::lossless(CanonicalType::SmallInt),
        Rule::Integer => TypeMapping::lossless(CanonicalType::Integer),
        Rule::BigInt => TypeMapping::lossless(CanonicalType::BigInt),
        Rule::SmallSerial => TypeMapping::lossless(CanonicalType::SmallInt).with_identity(true),
        Rule::Serial => TypeMapping::lossless(CanonicalType::Integer).with_identity(true),
        Rule::BigSerial => TypeMapping::lossless(CanonicalType::BigInt).with_identity(true),
        Rule::Decimal { default_precision } => {
            let precision = column.precision.or_else(|| native.precision_arg());
            let scale = column.scale.or_else(|| native.scale_arg());
            match (precision, default_precision) {
                (Some(p), _) => {
                    let mut mapping =
                        TypeMapping::lossless(CanonicalType::number(p, scale.unwrap_or(0)));
                    if p > MAX_NUMBER_PRECISION {
                        mapping.push_warning(format!(
                            "precision {} exceeds the warehouse maximum of {}",
                            p, MAX_NUMBER_PRECISION
                        ));
                    }
                    mapping
                }
                (None, Some(p)) => {
                    TypeMapping::lossless(CanonicalType::number(p, scale.unwrap_or(0)))
                }
                (None, None) => match scale {
                    Some(s) => TypeMapping::lossy(
                        CanonicalType::number(MAX_NUMBER_PRECISION, s),
                        format!(
                            "{} '{}' declares scale {} without precision; using NUMBER({},{})",
                            engine, native.original, s, MAX_NUMBER_PRECISION, s
                        ),
                    ),
                    None => TypeMapping::lossy(
                        CanonicalType::Number {
                            precision: None,
                            scale: None,
                        },
                        format!(
                            "unconstrained {} '{}' takes the warehouse default NUMBER(38,0)",
                            engine, native.original
                        ),
                    ),
                },
            }
        }
        Rule::FixedNumber(p, s) => TypeMapping::lossless(CanonicalType::number(p, s)),
        Rule::Float => TypeMapping::lossless(CanonicalType::Float),
        Rule::Double => TypeMapping::lossless(CanonicalType::Double),
        Rule::Varchar => match declared_length(native, column) {
            Some(len) if len > 0 => bounded_text(CanonicalType::Varchar(Some(clamp_u32(len))), len),
            _ => TypeMapping::lossless(CanonicalType::Varchar(None)),
        },
        Rule::FixedVarchar(len) => TypeMapping::lossless(CanonicalType::Varchar(Some(len))),
        Rule::Char => match declared_length(native, column) {
            Some(len) if len > 0 => bounded_text(CanonicalType::Char(clamp_u32(len)), len),
            Some(len) if len < 0 => TypeMapping::lossless(CanonicalType::Varchar(None)),
            _ => TypeMapping::lossless(CanonicalType::Char(1)),
        },
        Rule::Text => TypeMapping::lossless(CanonicalType::Varchar(None)),
        Rule::Boolean => TypeMapping::lossless(CanonicalType::Boolean),
        Rule::Date => TypeMapping::lossless(CanonicalType::Date),
        Rule::Time => TypeMapping::lossless(CanonicalType::Time),
        Rule::TimestampNtz => TypeMapping::lossless(CanonicalType::TimestampNtz),
        Rule::TimestampTz => TypeMapping::lossless(CanonicalType::TimestampTz),
        Rule::Variant => TypeMapping::lossless(CanonicalType::Variant),
        Rule::Binary => TypeMapping::lossless(CanonicalType::Binary),
        Rule::Lossy(inner, warning) => {
            let mut mapping = apply_rule(*inner, engine, native, column);
            mapping.push_warning(warning);
            mapping
        }
        Rule::Unmapped(reason) => TypeMapping::unmapped(engine, &native.original, reason),
    }
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn bounded_text(canonical: CanonicalType, declared: i64) -> TypeMapping {
    let mut mapping = TypeMapping::lossless(canonical);
    if declared > i64::from(MAX_VARCHAR_LENGTH) {
        mapping.push_warning(format!(
            "declared length {} exceeds the warehouse maximum of {}",
            declared, MAX_VARCHAR_LENGTH
        ));
    }
    mapping
}

/// Apply the identity flag after the base mapping. Auto-increment only makes
/// sense on integer types; anything else keeps its type and gets a warning.
fn finish_identity(mut mapping: TypeMapping, identity: bool) -> TypeMapping {
    if !identity || mapping.identity {
        return mapping;
    }
    if mapping.canonical_type.is_integer() {
        mapping.identity = true;
    } else {
        mapping.push_warning(format!(
            "auto-increment ignored on non-integer type {}",
            mapping.canonical_type
        ));
    }
    mapping
}

fn map_with_table(
    engine: SourceEngine,
    table: &'static [(&'static str, Rule)],
    native: &NativeType,
    column: &Column,
) -> TypeMapping {
    match lookup(table, &native.base) {
        Some(rule) => apply_rule(rule, engine, native, column),
        None => TypeMapping::unmapped(engine, &native.original, "no mapping for this type"),
    }
}

/// Wrap an element mapping into an array mapping, recording the element type.
fn wrap_array(element: TypeMapping, element_type: &str) -> TypeMapping {
    let mut mapping = TypeMapping::lossy(
        CanonicalType::Array(Box::new(element.canonical_type.clone())),
        format!(
            "ARRAY elements of type '{}' (element maps to {})",
            element_type, element.canonical_type
        ),
    );
    if let Some(inner) = element.warning {
        mapping.push_warning(inner);
    }
    mapping
}

// ============================================================================
// Default expressions
// ============================================================================

fn is_null_literal(expr: &str) -> bool {
    expr.eq_ignore_ascii_case("null")
}

fn is_current_timestamp(expr: &str) -> bool {
    let lower = expr.to_lowercase();
    matches!(
        lower.as_str(),
        "current_timestamp"
            | "current_timestamp()"
            | "now()"
            | "localtimestamp"
            | "localtimestamp()"
            | "getdate()"
            | "sysdatetime()"
            | "getutcdate()"
            | "sysutcdatetime()"
            | "sysdatetimeoffset()"
    ) || lower.starts_with("current_timestamp(")
}

/// Words that continue a multi-word PostgreSQL type name
/// (`character varying`, `timestamp with time zone`).
const PG_TYPE_CONTINUATIONS: &[&str] = &["varying", "precision", "with", "without", "time", "zone"];

/// End of one type-name word starting at `pos`: a possibly schema-qualified
/// name whose parts are plain or double-quoted identifiers.
fn type_word_end(s: &str, mut pos: usize) -> Option<usize> {
    loop {
        let rest = &s[pos..];
        if let Some(quoted) = rest.strip_prefix('"') {
            pos += quoted.find('"')? + 2;
        } else {
            let first = rest.chars().next()?;
            if !(first.is_ascii_alphabetic() || first == '_') {
                return None;
            }
            pos += rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
                .unwrap_or(rest.len());
        }
        if s[pos..].starts_with('.') {
            pos += 1;
        } else {
            return Some(pos);
        }
    }
}

/// End of a bracketed group of type modifiers at `pos`, e.g. `(10,2)` or `[]`.
fn modifier_end(s: &str, pos: usize, open: char, close: char) -> Option<usize> {
    let rest = s[pos..].strip_prefix(open)?;
    let inner_len = rest.find(close)?;
    let inner = &rest[..inner_len];
    if inner
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',' || c == ' ')
    {
        Some(pos + inner_len + 2)
    } else {
        None
    }
}

/// Length of the type name following a `::` cast operator, if `s` starts with one.
fn cast_type_len(s: &str) -> Option<usize> {
    let mut pos = type_word_end(s, 0)?;
    loop {
        if let Some(end) = modifier_end(s, pos, '(', ')') {
            pos = end;
            continue;
        }
        let rest = &s[pos..];
        let trimmed = rest.trim_start_matches(' ');
        if trimmed.len() < rest.len() {
            let word_start = pos + (rest.len() - trimmed.len());
            if let Some(word_end) = type_word_end(s, word_start) {
                let word = s[word_start..word_end].to_lowercase();
                if PG_TYPE_CONTINUATIONS.contains(&word.as_str()) {
                    pos = word_end;
                    continue;
                }
            }
        }
        break;
    }
    while let Some(end) = modifier_end(s, pos, '[', ']') {
        pos = end;
    }
    Some(pos)
}

/// Remove every `::type` cast outside string literals. Only a cast whose
/// suffix parses as a complete type name is removed, so brackets that
/// close an enclosing expression are never consumed.
fn strip_pg_casts(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut in_quote = false;
    let mut rest = expr.trim();
    while let Some(c) = rest.chars().next() {
        if c == '\'' {
            in_quote = !in_quote;
        } else if !in_quote && rest.starts_with("::") {
            if let Some(len) = cast_type_len(&rest[2..]) {
                rest = &rest[2 + len..];
                continue;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out.trim().to_string()
}

fn strip_wrapping_parens(expr: &str) -> &str {
    let mut current = expr.trim();
    while current.starts_with('(') && current.ends_with(')') && wraps_whole(current) {
        current = current[1..current.len() - 1].trim();
    }
    current
}

/// Whether the opening parenthesis at position 0 closes at the last position.
fn wraps_whole(expr: &str) -> bool {
    let mut depth = 0usize;
    let mut in_quote = false;
    for (idx, c) in expr.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return idx == expr.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn common_default(expr: &str) -> Option<String> {
    let trimmed = expr.trim();
    if trimmed.is_empty() || is_null_literal(trimmed) {
        return None;
    }
    if is_current_timestamp(trimmed) {
        return Some("CURRENT_TIMESTAMP()".to_string());
    }
    Some(trimmed.to_string())
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// PostgreSQL type mapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresMapper;

impl PostgresMapper {
    fn map_native(&self, native: &NativeType, column: &Column) -> TypeMapping {
        if let Some(element) = native.element() {
            let inner = self.map_native(&element, column);
            return wrap_array(inner, &element.original);
        }
        // pg_type names of array types carry a leading underscore (`_int4`).
        if let Some(element_base) = native.base.strip_prefix('_') {
            let mut element = native.clone();
            element.base = element_base.to_string();
            element.original = native.original.trim_start_matches('_').to_string();
            let inner = self.map_native(&element, column);
            return wrap_array(inner, &element.original);
        }
        map_with_table(SourceEngine::Postgres, POSTGRES_TYPES, native, column)
    }
}

impl TypeMapper for PostgresMapper {
    fn engine(&self) -> SourceEngine {
        SourceEngine::Postgres
    }

    fn map_column(&self, column: &Column) -> TypeMapping {
        let native = NativeType::parse(&column.data_type);
        let mapping = self.map_native(&native, column);
        finish_identity(mapping, column.auto_increment || native.identity)
    }

    fn map_default(&self, expr: &str) -> Option<String> {
        let trimmed = expr.trim();
        if trimmed.to_lowercase().starts_with("nextval(") {
            return None;
        }
        common_default(strip_wrapping_parens(&strip_pg_casts(trimmed)))
    }
}

// ============================================================================
// MySQL
// ============================================================================

/// MySQL type mapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlMapper;

impl TypeMapper for MysqlMapper {
    fn engine(&self) -> SourceEngine {
        SourceEngine::Mysql
    }

    fn map_column(&self, column: &Column) -> TypeMapping {
        let native = NativeType::parse(&column.data_type);
        let identity = column.auto_increment || native.identity;

        // BOOLEAN is TINYINT(1) / BIT(1) in MySQL.
        let width = column.max_length.or_else(|| native.length_arg());
        let mapping = match native.base.as_str() {
            "tinyint" if width == Some(1) && !identity => {
                TypeMapping::lossless(CanonicalType::Boolean)
            }
            "bit" if width.unwrap_or(1) == 1 => TypeMapping::lossless(CanonicalType::Boolean),
            // Unsigned integers need the next wider signed type.
            "tinyint" | "smallint" | "mediumint" if native.unsigned => {
                let widened = if native.base == "tinyint" {
                    CanonicalType::SmallInt
                } else {
                    CanonicalType::Integer
                };
                TypeMapping::lossless(widened)
            }
            "int" | "integer" if native.unsigned => TypeMapping::lossless(CanonicalType::BigInt),
            "bigint" if native.unsigned => TypeMapping::lossless(CanonicalType::number(20, 0)),
            _ => map_with_table(SourceEngine::Mysql, MYSQL_TYPES, &native, column),
        };

        finish_identity(mapping, identity)
    }

    fn map_default(&self, expr: &str) -> Option<String> {
        common_default(expr)
    }
}

// ============================================================================
// SQL Server
// ============================================================================

/// SQL Server type mapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlMapper;

impl TypeMapper for MssqlMapper {
    fn engine(&self) -> SourceEngine {
        SourceEngine::Mssql
    }

    fn map_column(&self, column: &Column) -> TypeMapping {
        let native = NativeType::parse(&column.data_type);
        let mapping = map_with_table(SourceEngine::Mssql, MSSQL_TYPES, &native, column);
        finish_identity(mapping, column.auto_increment || native.identity)
    }

    fn map_default(&self, expr: &str) -> Option<String> {
        // sys.default_constraints wraps definitions in parentheses: ((0)), (getdate())
        let inner = strip_wrapping_parens(expr);
        if inner.eq_ignore_ascii_case("newid()") || inner.eq_ignore_ascii_case("newsequentialid()") {
            return Some("UUID_STRING()".to_string());
        }
        // Unicode literal prefix: N'text'
        let inner = match inner.strip_prefix('N') {
            Some(rest) if rest.starts_with('\'') => rest,
            _ => inner,
        };
        common_default(inner)
    }
}

// ============================================================================
// Engine dispatch
// ============================================================================

static POSTGRES: PostgresMapper = PostgresMapper;
static MYSQL: MysqlMapper = MysqlMapper;
static MSSQL: MssqlMapper = MssqlMapper;

/// Select the type mapper for a source engine.
pub fn mapper_for(engine: SourceEngine) -> &'static dyn TypeMapper {
    match engine {
        SourceEngine::Postgres => &POSTGRES,
        SourceEngine::Mysql => &MYSQL,
        SourceEngine::Mssql => &MSSQL,
    }
}

/// Map a column's native type for the given engine.
pub fn map_type(engine: SourceEngine, column: &Column) -> TypeMapping {
    mapper_for(engine).map_column(column)
}

/// Every native type name in an engine's mapping table.
pub fn known_types(engine: SourceEngine) -> Vec<&'static str> {
    let table = match engine {
        SourceEngine::Postgres => POSTGRES_TYPES,
        SourceEngine::Mysql => MYSQL_TYPES,
        SourceEngine::Mssql => MSSQL_TYPES,
    };
    table.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINES: [SourceEngine; 3] = [
        SourceEngine::Postgres,
        SourceEngine::Mysql,
        SourceEngine::Mssql,
    ];

    fn col(data_type: &str) -> Column {
        Column::new("c", data_type)
    }

    fn map(engine: SourceEngine, data_type: &str) -> TypeMapping {
        map_type(engine, &col(data_type))
    }

    #[test]
    fn test_numeric_preserves_precision_and_scale() {
        let c = col("numeric").with_precision(10, 2);
        let m = map_type(SourceEngine::Postgres, &c);
        assert_eq!(m.canonical_type, CanonicalType::number(10, 2));
        assert_eq!(m.canonical_type.sql(), "NUMBER(10,2)");
        assert!(m.warning.is_none());

        let m = map(SourceEngine::Mysql, "decimal(12,4)");
        assert_eq!(m.canonical_type, CanonicalType::number(12, 4));

        let c = col("decimal").with_precision(38, 10);
        let m = map_type(SourceEngine::Mssql, &c);
        assert_eq!(m.canonical_type.sql(), "NUMBER(38,10)");
    }

    #[test]
    fn test_every_decimal_type_preserves_declared_values() {
        for engine in ENGINES {
            for name in known_types(engine) {
                let c = col(name).with_precision(17, 5);
                let m = map_type(engine, &c);
                if let CanonicalType::Number { precision, scale } = &m.canonical_type {
                    if !name.contains("money") {
                        assert_eq!(*precision, Some(17), "{} {}", engine, name);
                        assert_eq!(*scale, Some(5), "{} {}", engine, name);
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_bounded_text_type_preserves_length() {
        for engine in ENGINES {
            for name in known_types(engine) {
                let m = map_type(engine, &col(name).with_length(77));
                match &m.canonical_type {
                    CanonicalType::Varchar(Some(n)) if *n != 63 && *n != 36 => {
                        assert_eq!(*n, 77, "{} {}", engine, name)
                    }
                    CanonicalType::Char(n) => assert_eq!(*n, 77, "{} {}", engine, name),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_declared_precision_beyond_warehouse_limit_is_kept() {
        let c = col("numeric").with_precision(60, 4);
        let m = map_type(SourceEngine::Postgres, &c);
        assert_eq!(m.canonical_type, CanonicalType::number(60, 4));
        assert!(m.warning.unwrap().contains("exceeds"));
    }

    #[test]
    fn test_unconstrained_numeric() {
        let m = map(SourceEngine::Postgres, "numeric");
        assert_eq!(m.canonical_type.sql(), "NUMBER");
        assert!(m.warning.is_some());

        // MSSQL and MySQL have engine defaults
        assert_eq!(map(SourceEngine::Mssql, "decimal").canonical_type.sql(), "NUMBER(18,0)");
        assert_eq!(map(SourceEngine::Mysql, "decimal").canonical_type.sql(), "NUMBER(10,0)");
    }

    #[test]
    fn test_numeric_scale_without_precision_is_kept() {
        let mut column = col("numeric");
        column.scale = Some(4);
        let m = map_type(SourceEngine::Postgres, &column);
        assert_eq!(m.canonical_type.sql(), "NUMBER(38,4)");
        let warning = m.warning.unwrap();
        assert!(warning.contains("scale 4 without precision"));
    }

    #[test]
    fn test_text_types() {
        assert_eq!(map(SourceEngine::Postgres, "text").canonical_type, CanonicalType::Varchar(None));
        assert_eq!(
            map(SourceEngine::Postgres, "character varying(120)").canonical_type,
            CanonicalType::Varchar(Some(120))
        );
        assert_eq!(map(SourceEngine::Postgres, "varchar").canonical_type, CanonicalType::Varchar(None));
        assert_eq!(map(SourceEngine::Postgres, "bpchar(3)").canonical_type, CanonicalType::Char(3));
        assert_eq!(map(SourceEngine::Postgres, "char").canonical_type, CanonicalType::Char(1));

        assert_eq!(map(SourceEngine::Mssql, "nvarchar(max)").canonical_type, CanonicalType::Varchar(None));
        assert_eq!(
            map_type(SourceEngine::Mssql, &col("varchar").with_length(-1)).canonical_type,
            CanonicalType::Varchar(None)
        );
        assert_eq!(
            map_type(SourceEngine::Mssql, &col("nchar").with_length(10)).canonical_type,
            CanonicalType::Char(10)
        );
        assert_eq!(map(SourceEngine::Mysql, "longtext").canonical_type, CanonicalType::Varchar(None));
        assert_eq!(map(SourceEngine::Mysql, "varchar(64)").canonical_type.sql(), "VARCHAR(64)");
    }

    #[test]
    fn test_descriptor_length_wins_over_type_string() {
        let c = col("varchar(10)").with_length(20);
        assert_eq!(
            map_type(SourceEngine::Mysql, &c).canonical_type,
            CanonicalType::Varchar(Some(20))
        );
    }

    #[test]
    fn test_integer_types() {
        assert_eq!(map(SourceEngine::Postgres, "int2").canonical_type, CanonicalType::SmallInt);
        assert_eq!(map(SourceEngine::Postgres, "int4").canonical_type, CanonicalType::Integer);
        assert_eq!(map(SourceEngine::Postgres, "int8").canonical_type, CanonicalType::BigInt);
        assert_eq!(map(SourceEngine::Mssql, "tinyint").canonical_type, CanonicalType::SmallInt);
        assert_eq!(map(SourceEngine::Mysql, "mediumint").canonical_type, CanonicalType::Integer);
        assert_eq!(map(SourceEngine::Mysql, "int(11)").canonical_type, CanonicalType::Integer);
    }

    #[test]
    fn test_mysql_unsigned_widening() {
        assert_eq!(map(SourceEngine::Mysql, "int unsigned").canonical_type, CanonicalType::BigInt);
        assert_eq!(
            map(SourceEngine::Mysql, "bigint(20) unsigned").canonical_type,
            CanonicalType::number(20, 0)
        );
        assert_eq!(
            map(SourceEngine::Mysql, "smallint unsigned").canonical_type,
            CanonicalType::Integer
        );
    }

    #[test]
    fn test_mysql_booleans() {
        assert_eq!(map(SourceEngine::Mysql, "tinyint(1)").canonical_type, CanonicalType::Boolean);
        assert_eq!(
            map_type(SourceEngine::Mysql, &col("tinyint").with_length(1)).canonical_type,
            CanonicalType::Boolean
        );
        assert_eq!(map(SourceEngine::Mysql, "tinyint(4)").canonical_type, CanonicalType::SmallInt);
        assert_eq!(map(SourceEngine::Mysql, "bit(1)").canonical_type, CanonicalType::Boolean);
        assert_eq!(map(SourceEngine::Mysql, "bit(8)").canonical_type, CanonicalType::Binary);
        assert_eq!(map(SourceEngine::Mssql, "bit").canonical_type, CanonicalType::Boolean);
    }

    #[test]
    fn test_identity_detection() {
        let m = map(SourceEngine::Postgres, "serial");
        assert_eq!(m.canonical_type, CanonicalType::Integer);
        assert!(m.identity);

        let m = map(SourceEngine::Postgres, "bigserial");
        assert_eq!(m.canonical_type, CanonicalType::BigInt);
        assert!(m.identity);

        let m = map(SourceEngine::Mssql, "int identity");
        assert_eq!(m.canonical_type, CanonicalType::Integer);
        assert!(m.identity);

        let m = map(SourceEngine::Mysql, "bigint auto_increment");
        assert_eq!(m.canonical_type, CanonicalType::BigInt);
        assert!(m.identity);

        let mut c = col("int4");
        c.auto_increment = true;
        let m = map_type(SourceEngine::Postgres, &c);
        assert_eq!(m.canonical_type, CanonicalType::Integer);
        assert!(m.identity);
        assert!(m.warning.is_none());

        // Same base mapping without the flag
        assert!(!map(SourceEngine::Postgres, "int4").identity);
    }

    #[test]
    fn test_identity_on_non_integer_is_ignored() {
        let mut c = col("varchar(10)");
        c.auto_increment = true;
        let m = map_type(SourceEngine::Mysql, &c);
        assert!(!m.identity);
        assert!(m.warning.unwrap().contains("auto-increment ignored"));

        let m = map(SourceEngine::Mssql, "decimal(18,0) identity");
        assert!(m.identity);
    }

    #[test]
    fn test_temporal_types() {
        assert_eq!(map(SourceEngine::Postgres, "timestamptz").canonical_type, CanonicalType::TimestampTz);
        assert_eq!(
            map(SourceEngine::Postgres, "timestamp(6) without time zone").canonical_type,
            CanonicalType::TimestampNtz
        );
        assert_eq!(map(SourceEngine::Mssql, "datetimeoffset").canonical_type, CanonicalType::TimestampTz);
        assert_eq!(map(SourceEngine::Mssql, "datetime2").canonical_type, CanonicalType::TimestampNtz);
        assert_eq!(map(SourceEngine::Mysql, "datetime").canonical_type, CanonicalType::TimestampNtz);
        assert_eq!(map(SourceEngine::Mysql, "timestamp").canonical_type, CanonicalType::TimestampTz);
        assert_eq!(map(SourceEngine::Postgres, "date").canonical_type, CanonicalType::Date);

        let m = map(SourceEngine::Postgres, "timetz");
        assert_eq!(m.canonical_type, CanonicalType::Time);
        assert!(m.warning.is_some());
    }

    #[test]
    fn test_semi_structured_and_binary() {
        assert_eq!(map(SourceEngine::Postgres, "jsonb").canonical_type, CanonicalType::Variant);
        assert_eq!(map(SourceEngine::Mysql, "json").canonical_type, CanonicalType::Variant);
        assert_eq!(map(SourceEngine::Mssql, "xml").canonical_type, CanonicalType::Variant);
        assert_eq!(map(SourceEngine::Postgres, "bytea").canonical_type, CanonicalType::Binary);
        assert_eq!(map(SourceEngine::Mysql, "longblob").canonical_type, CanonicalType::Binary);
        assert_eq!(map(SourceEngine::Mssql, "varbinary(max)").canonical_type, CanonicalType::Binary);

        let m = map(SourceEngine::Mssql, "rowversion");
        assert_eq!(m.canonical_type, CanonicalType::Binary);
        assert!(m.warning.is_some());
    }

    #[test]
    fn test_arrays_map_element_recursively() {
        let m = map(SourceEngine::Postgres, "integer[]");
        assert_eq!(
            m.canonical_type,
            CanonicalType::Array(Box::new(CanonicalType::Integer))
        );
        let warning = m.warning.unwrap();
        assert!(warning.contains("'integer'"));

        let m = map(SourceEngine::Postgres, "_int4");
        assert_eq!(
            m.canonical_type,
            CanonicalType::Array(Box::new(CanonicalType::Integer))
        );
        assert!(m.warning.unwrap().contains("'int4'"));

        let m = map(SourceEngine::Postgres, "text[][]");
        assert_eq!(
            m.canonical_type,
            CanonicalType::Array(Box::new(CanonicalType::Array(Box::new(
                CanonicalType::Varchar(None)
            ))))
        );

        // Unknown element types stay visible in the warning
        let m = map(SourceEngine::Postgres, "mood[]");
        assert_eq!(
            m.canonical_type,
            CanonicalType::Array(Box::new(CanonicalType::Unmapped("mood".into())))
        );
        assert!(m.warning.unwrap().contains("UNMAPPED"));
    }

    #[test]
    fn test_unknown_types_fall_back_to_unmapped() {
        for engine in ENGINES {
            for raw in ["Frobnicator", "my_schema.custom_type", "", "geometry(Point,4326)"] {
                let m = map(engine, raw);
                assert_eq!(
                    m.canonical_type,
                    CanonicalType::Unmapped(raw.trim().to_string()),
                    "{} {:?}",
                    engine,
                    raw
                );
                assert!(m.warning.unwrap().contains(&format!("'{}'", raw.trim())));
                assert!(!m.identity);
            }
        }
    }

    #[test]
    fn test_enum_keeps_verbatim_type() {
        let m = map(SourceEngine::Mysql, "enum('small','Large')");
        assert_eq!(
            m.canonical_type,
            CanonicalType::Unmapped("enum('small','Large')".into())
        );
        assert!(m.warning.unwrap().contains("enum('small','Large')"));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        for engine in ENGINES {
            for name in known_types(engine) {
                let c = col(name).with_precision(9, 3).with_length(12);
                assert_eq!(map_type(engine, &c), map_type(engine, &c));
            }
        }
    }

    #[test]
    fn test_mapper_dispatch() {
        for engine in ENGINES {
            assert_eq!(mapper_for(engine).engine(), engine);
        }
    }

    #[test]
    fn test_postgres_defaults() {
        let pg = PostgresMapper;
        assert_eq!(pg.map_default("nextval('orders_id_seq'::regclass)"), None);
        assert_eq!(
            pg.map_default("'pending'::character varying").as_deref(),
            Some("'pending'")
        );
        assert_eq!(pg.map_default("'{}'::jsonb").as_deref(), Some("'{}'"));
        assert_eq!(pg.map_default("now()").as_deref(), Some("CURRENT_TIMESTAMP()"));
        assert_eq!(pg.map_default("CURRENT_TIMESTAMP").as_deref(), Some("CURRENT_TIMESTAMP()"));
        assert_eq!(pg.map_default("0").as_deref(), Some("0"));
        assert_eq!(pg.map_default("true").as_deref(), Some("true"));
        assert_eq!(pg.map_default("NULL::text"), None);
        assert_eq!(pg.map_default("'a::b'").as_deref(), Some("'a::b'"));
        assert_eq!(pg.map_default("(-1)::integer").as_deref(), Some("-1"));
        assert_eq!(
            pg.map_default("(now() AT TIME ZONE 'utc'::text)").as_deref(),
            Some("now() AT TIME ZONE 'utc'")
        );
        assert_eq!(
            pg.map_default("ARRAY['a'::text, 'b'::text]").as_deref(),
            Some("ARRAY['a', 'b']")
        );
        assert_eq!(
            pg.map_default("(now() + '1 day'::interval)").as_deref(),
            Some("now() + '1 day'")
        );
    }

    #[test]
    fn test_postgres_default_casts_with_type_modifiers() {
        let pg = PostgresMapper;
        assert_eq!(pg.map_default("'0'::numeric(10,2)").as_deref(), Some("'0'"));
        assert_eq!(
            pg.map_default("'2020-01-01'::timestamp(3) with time zone").as_deref(),
            Some("'2020-01-01'")
        );
        assert_eq!(pg.map_default("'{}'::text[]").as_deref(), Some("'{}'"));
        assert_eq!(
            pg.map_default("'happy'::public.\"Mood\"").as_deref(),
            Some("'happy'")
        );
        assert_eq!(pg.map_default("'1'::text::integer").as_deref(), Some("'1'"));
        assert_eq!(
            pg.map_default("('now'::text)::date").as_deref(),
            Some("'now'")
        );
        assert_eq!(
            pg.map_default("'x'::text || 'y'::text").as_deref(),
            Some("'x' || 'y'")
        );
    }

    #[test]
    fn test_mssql_defaults() {
        let ms = MssqlMapper;
        assert_eq!(ms.map_default("((0))").as_deref(), Some("0"));
        assert_eq!(ms.map_default("(getdate())").as_deref(), Some("CURRENT_TIMESTAMP()"));
        assert_eq!(ms.map_default("(N'abc')").as_deref(), Some("'abc'"));
        assert_eq!(ms.map_default("(newid())").as_deref(), Some("UUID_STRING()"));
        assert_eq!(ms.map_default("((1)+(2))").as_deref(), Some("(1)+(2)"));
        assert_eq!(ms.map_default("(NULL)"), None);
    }

    #[test]
    fn test_mysql_defaults() {
        let my = MysqlMapper;
        assert_eq!(my.map_default("CURRENT_TIMESTAMP").as_deref(), Some("CURRENT_TIMESTAMP()"));
        assert_eq!(my.map_default("current_timestamp(6)").as_deref(), Some("CURRENT_TIMESTAMP()"));
        assert_eq!(my.map_default("'x'").as_deref(), Some("'x'"));
        assert_eq!(my.map_default("  "), None);
    }
}
