//! Core schema model shared by the mapper, the synthesizer and the artifact.
//!
//! - [`schema`]: Table, column and key metadata types
//! - [`identifier`]: Identifier validation and quoting for warehouse DDL

pub mod identifier;
pub mod schema;

pub use schema::{Column, ForeignKey, PrimaryKey, SchemaSnapshot, SourceEngine, Table};
