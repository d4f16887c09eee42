//! Warehouse DDL synthesis from a mapping artifact.
//!
//! Statements are produced in two passes:
//!
//! 1. `CREATE SCHEMA IF NOT EXISTS` per selected schema, then one
//!    `CREATE TABLE IF NOT EXISTS` per table, in selection order.
//! 2. One `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` per foreign key,
//!    in table-then-declaration order.
//!
//! Every table exists before any constraint references it, so cyclic or
//! forward references need no dependency ordering. Synthesis never fails:
//! unmapped columns are emitted as `VARCHAR` with a trailing comment.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::artifact::MappingArtifact;
use crate::core::identifier::{qualify, quote_ident, quote_list};
use crate::core::schema::{ForeignKey, Table};
use crate::dialect::{mapper_for, TypeMapper};

/// Notice prepended to every script.
pub const DECLARATIVE_CONSTRAINTS_NOTICE: &str = "PRIMARY KEY and FOREIGN KEY constraints are declarative: \
the warehouse records them but does not enforce them. Verify referential integrity in the load process.";

/// Synthesized DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlScript {
    /// Header comment lines, each starting with `-- `.
    pub header: Vec<String>,
    /// Statements in execution order, each terminated by `;`.
    pub statements: Vec<String>,
    /// Lossy conversions and dangling foreign keys, for operator review.
    pub warnings: Vec<String>,
}

impl DdlScript {
    /// Render the script: header, blank line, statements separated by blank
    /// lines, trailing newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.header {
            out.push_str(line);
            out.push('\n');
        }
        for statement in &self.statements {
            out.push('\n');
            out.push_str(statement);
            out.push('\n');
        }
        out
    }
}

fn comment_text(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Constraint name `fk_<table>_<col1>[_<colN>]`, suffixed `_2`, `_3`, ... on
/// collision. Constraint names share one namespace per schema, so `used`
/// covers every table of the schema.
fn constraint_name(table: &Table, fk: &ForeignKey, used: &mut HashSet<String>) -> String {
    let base = format!("fk_{}_{}", table.name, fk.columns.join("_"));
    let mut name = base.clone();
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = format!("{}_{}", base, n);
        n += 1;
    }
    name
}

/// Render one `CREATE TABLE` statement. Returns the statement and the
/// warnings of flagged columns.
pub fn create_table_statement(table: &Table, mapper: &dyn TypeMapper) -> (String, Vec<String>) {
    let mut clauses: Vec<(String, Option<String>)> = Vec::with_capacity(table.columns.len() + 1);
    let mut warnings = Vec::new();

    for column in &table.columns {
        let mapping = mapper.map_column(column);
        let mut clause = format!("{} {}", quote_ident(&column.name), mapping.canonical_type);

        if mapping.identity {
            clause.push_str(" IDENTITY(1,1)");
        } else if let Some(default) = column
            .default
            .as_deref()
            .and_then(|expr| mapper.map_default(expr))
        {
            clause.push_str(" DEFAULT ");
            clause.push_str(&default);
        }

        if !column.nullable {
            clause.push_str(" NOT NULL");
        }

        let comment = mapping.warning.as_deref().map(comment_text);
        if let Some(text) = &comment {
            warnings.push(format!("{}.{}: {}", table.full_name(), column.name, text));
        }
        clauses.push((clause, comment));
    }

    if let Some(pk) = table.primary_key.as_ref().filter(|pk| !pk.columns.is_empty()) {
        clauses.push((format!("PRIMARY KEY ({})", quote_list(&pk.columns)), None));
    }

    let last = clauses.len().saturating_sub(1);
    let body: Vec<String> = clauses
        .into_iter()
        .enumerate()
        .map(|(i, (clause, comment))| {
            let sep = if i < last { "," } else { "" };
            match comment {
                Some(text) => format!("{}{} -- {}", clause, sep, text),
                None => format!("{}{}", clause, sep),
            }
        })
        .collect();

    let statement = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        qualify(&table.schema, &table.name),
        body.join("\n    ")
    );
    (statement, warnings)
}

/// Render one `ALTER TABLE ... FOREIGN KEY` statement.
pub fn foreign_key_statement(table: &Table, fk: &ForeignKey, name: &str) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
        qualify(&table.schema, &table.name),
        quote_ident(name),
        quote_list(&fk.columns),
        qualify(&fk.referenced_schema, &fk.referenced_table),
        quote_list(&fk.referenced_columns)
    )
}

/// Synthesize the warehouse DDL for an artifact.
///
/// Deterministic: the same artifact always produces byte-identical output.
pub fn synthesize(artifact: &MappingArtifact) -> DdlScript {
    let mapper = mapper_for(artifact.engine());
    let tables = artifact.ordered_tables();

    let header = vec![
        format!("-- Warehouse DDL for mapping '{}'", comment_text(&artifact.name)),
        format!(
            "-- Source: {} database {}, mapping created {}",
            artifact.engine(),
            comment_text(&artifact.source.connection.database),
            artifact.created_at.to_rfc3339()
        ),
        format!("-- {}", DECLARATIVE_CONSTRAINTS_NOTICE),
    ];

    let mut statements = Vec::new();
    let mut warnings = Vec::new();

    // Selected schemas are unique; artifact validation rejects repeats.
    for schema in &artifact.selected_schemas {
        statements.push(format!("CREATE SCHEMA IF NOT EXISTS {};", quote_ident(schema)));
    }

    for table in &tables {
        let (statement, column_warnings) = create_table_statement(table, mapper);
        for w in &column_warnings {
            warn!("{}", w);
        }
        warnings.extend(column_warnings);
        debug!("CREATE TABLE {}", table.full_name());
        statements.push(statement);
    }

    let selected: HashSet<(&str, &str)> = tables
        .iter()
        .map(|t| (t.schema.as_str(), t.name.as_str()))
        .collect();

    let mut used_names: HashMap<&str, HashSet<String>> = HashMap::new();
    for table in &tables {
        let used = used_names.entry(table.schema.as_str()).or_default();
        for fk in &table.foreign_keys {
            let name = constraint_name(table, fk, used);
            let target = (fk.referenced_schema.as_str(), fk.referenced_table.as_str());
            if !selected.contains(&target) {
                let message = format!(
                    "{}: foreign key {} references {}, which is not among the selected tables",
                    table.full_name(),
                    name,
                    fk.referenced_full_name()
                );
                warn!("{}", message);
                warnings.push(message);
            }
            debug!("FOREIGN KEY {} on {}", name, table.full_name());
            statements.push(foreign_key_statement(table, fk, &name));
        }
    }

    DdlScript {
        header,
        statements,
        warnings,
    }
}
