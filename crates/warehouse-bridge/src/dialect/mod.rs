//! Type mapping from source engines onto the canonical warehouse types.
//!
//! Every engine maps through the same canonical hub, so adding an engine is
//! one rule table and one [`TypeMapper`] implementation.
//!
//! # Available Mappers
//!
//! - [`PostgresMapper`]: PostgreSQL, including arrays and `serial` types
//! - [`MysqlMapper`]: MySQL / MariaDB, including unsigned widening
//! - [`MssqlMapper`]: SQL Server, including money and rowversion types
//!
//! # Usage
//!
//! ```rust
//! use warehouse_bridge::core::{Column, SourceEngine};
//! use warehouse_bridge::dialect::map_type;
//!
//! let column = Column::new("total", "numeric").with_precision(10, 2);
//! let mapping = map_type(SourceEngine::Postgres, &column);
//! assert_eq!(mapping.canonical_type.sql(), "NUMBER(10,2)");
//! ```

mod canonical;
mod native;
mod typemap;

pub use canonical::{
    CanonicalType, TypeMapper, TypeMapping, MAX_NUMBER_PRECISION, MAX_VARCHAR_LENGTH,
};
pub use native::NativeType;
pub use typemap::{known_types, map_type, mapper_for, MssqlMapper, MysqlMapper, PostgresMapper};
