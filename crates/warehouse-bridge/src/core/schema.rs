//! Canonical schema model: tables, columns and keys.
//!
//! These types are the engine-agnostic description of a source schema. They
//! are produced by schema introspection, persisted inside a mapping artifact
//! and consumed by the DDL synthesizer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::identifier::validate_identifier;
use crate::error::{BridgeError, Result};

/// Source database engine of a schema description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceEngine {
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    Mysql,
    /// Microsoft SQL Server.
    Mssql,
}

impl SourceEngine {
    /// Engine identifier as used in artifacts and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEngine::Postgres => "postgres",
            SourceEngine::Mysql => "mysql",
            SourceEngine::Mssql => "mssql",
        }
    }

    /// Default listening port of the engine.
    pub fn default_port(&self) -> u16 {
        match self {
            SourceEngine::Postgres => 5432,
            SourceEngine::Mysql => 3306,
            SourceEngine::Mssql => 1433,
        }
    }
}

impl fmt::Display for SourceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceEngine {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(SourceEngine::Postgres),
            "mysql" | "mariadb" => Ok(SourceEngine::Mysql),
            "mssql" | "sqlserver" | "sql-server" => Ok(SourceEngine::Mssql),
            other => Err(BridgeError::Config(format!(
                "unknown source engine '{}' (expected postgres, mysql or mssql)",
                other
            ))),
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Native type name as reported by the source (e.g. "int4", "varchar(255)").
    pub data_type: String,

    /// Declared numeric precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    /// Declared numeric scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    /// Declared length for string/binary types (negative for MAX).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,

    /// Whether the column allows NULL.
    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Default value expression, verbatim from the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Ordinal position (1-based).
    #[serde(default)]
    pub ordinal_position: u32,

    /// Explicit auto-increment flag from introspection.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_increment: bool,
}

fn default_true() -> bool {
    true
}

impl Column {
    /// Create a nullable column with no declared modifiers.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            precision: None,
            scale: None,
            max_length: None,
            nullable: true,
            default: None,
            ordinal_position: 0,
            auto_increment: false,
        }
    }

    /// Set declared precision and scale.
    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Set declared length.
    pub fn with_length(mut self, length: i64) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the default expression.
    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// Primary key: ordered, non-empty list of column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryKey {
    pub columns: Vec<String>,
}

impl PrimaryKey {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Foreign key metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Local column names.
    pub columns: Vec<String>,

    /// Referenced schema name.
    pub referenced_schema: String,

    /// Referenced table name.
    pub referenced_table: String,

    /// Referenced column names, positionally matched to `columns`.
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Fully qualified name of the referenced table.
    pub fn referenced_full_name(&self) -> String {
        format!("{}.{}", self.referenced_schema, self.referenced_table)
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    /// Primary key, if any.
    #[serde(default)]
    pub primary_key: Option<PrimaryKey>,

    /// Foreign key constraints in declaration order.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create an empty table.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.primary_key
            .as_ref()
            .map(|pk| !pk.columns.is_empty())
            .unwrap_or(false)
    }

    /// Check the structural invariants of the table description.
    ///
    /// Every identifier must be a valid warehouse identifier. Column names
    /// must be unique, a primary key must be non-empty and name existing
    /// columns, and every foreign key must pair a non-zero number of existing
    /// local columns with the same number of referenced columns.
    pub fn validate(&self) -> Result<()> {
        let full_name = self.full_name();
        if self.schema.is_empty() || self.name.is_empty() {
            return Err(BridgeError::malformed(format!(
                "table '{}' must have a schema and a name",
                full_name
            )));
        }

        check_identifier(&full_name, "schema", &self.schema)?;
        check_identifier(&full_name, "name", &self.name)?;

        let mut seen = std::collections::HashSet::new();
        for col in &self.columns {
            if col.name.is_empty() {
                return Err(BridgeError::malformed(format!(
                    "table '{}' has a column without a name",
                    full_name
                )));
            }
            check_identifier(&full_name, "column", &col.name)?;
            if !seen.insert(col.name.as_str()) {
                return Err(BridgeError::malformed(format!(
                    "table '{}' has duplicate column '{}'",
                    full_name, col.name
                )));
            }
        }

        if let Some(pk) = &self.primary_key {
            if pk.columns.is_empty() {
                return Err(BridgeError::malformed(format!(
                    "table '{}' has an empty primary key",
                    full_name
                )));
            }
            if let Some(missing) = pk.columns.iter().find(|c| !seen.contains(c.as_str())) {
                return Err(BridgeError::malformed(format!(
                    "table '{}' primary key references unknown column '{}'",
                    full_name, missing
                )));
            }
        }

        for fk in &self.foreign_keys {
            if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
                return Err(BridgeError::malformed(format!(
                    "table '{}' foreign key to '{}' pairs {} local with {} referenced columns",
                    full_name,
                    fk.referenced_full_name(),
                    fk.columns.len(),
                    fk.referenced_columns.len()
                )));
            }
            if let Some(missing) = fk.columns.iter().find(|c| !seen.contains(c.as_str())) {
                return Err(BridgeError::malformed(format!(
                    "table '{}' foreign key to '{}' uses unknown column '{}'",
                    full_name,
                    fk.referenced_full_name(),
                    missing
                )));
            }
            check_identifier(&full_name, "foreign key schema", &fk.referenced_schema)?;
            check_identifier(&full_name, "foreign key table", &fk.referenced_table)?;
            for column in &fk.referenced_columns {
                check_identifier(&full_name, "foreign key column", column)?;
            }
        }

        Ok(())
    }
}

fn check_identifier(table: &str, what: &str, ident: &str) -> Result<()> {
    validate_identifier(ident).map_err(|e| match e {
        BridgeError::MalformedArtifact(msg) => {
            BridgeError::malformed(format!("table '{}' {}: {}", table, what, msg))
        }
        other => other,
    })
}

/// Distinct schema names of `tables` in order of first appearance.
pub fn schemas_in_order(tables: &[Table]) -> Vec<String> {
    let mut schemas: Vec<String> = Vec::new();
    for table in tables {
        if !schemas.contains(&table.schema) {
            schemas.push(table.schema.clone());
        }
    }
    schemas
}

/// Output of schema introspection: the tables of one source database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Engine the tables were read from.
    pub engine: SourceEngine,

    /// Tables in introspection order.
    pub tables: Vec<Table>,
}

impl SchemaSnapshot {
    /// Parse introspection output from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| BridgeError::malformed(format!("invalid schema snapshot: {}", e)))?;
        for table in &snapshot.tables {
            table.validate()?;
        }
        Ok(snapshot)
    }

    /// Load introspection output from a JSON file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
