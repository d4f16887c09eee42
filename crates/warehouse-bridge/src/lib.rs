//! # warehouse-bridge
//!
//! Source schema mapping and DDL synthesis for analytical warehouses.
//!
//! This library provides the core functionality for moving a relational
//! schema from PostgreSQL, MySQL or SQL Server into a warehouse:
//!
//! - **Type mapping** from each engine's native types onto canonical
//!   warehouse types, with UNMAPPED fallback for anything unknown
//! - **DDL synthesis** in two passes (tables, then foreign keys)
//! - **Encrypted credentials** with AES-256-GCM under one installation key
//! - **Mapping artifacts** that persist the schema and credentials as JSON
//!
//! ## Example
//!
//! ```rust,no_run
//! use warehouse_bridge::{ddl, KeyStore, MappingArtifact};
//!
//! fn main() -> warehouse_bridge::Result<()> {
//!     let service = KeyStore::new("/etc/warehouse-bridge/key").service()?;
//!     let artifact = MappingArtifact::load("mapping.json")?;
//!     let _password = artifact.decrypt_password(&service)?;
//!     print!("{}", ddl::synthesize(&artifact).render());
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod core;
pub mod crypto;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod persist;
pub mod vault;

// Re-exports for convenient access
pub use artifact::{
    ConnectionDescriptor, ConnectionParams, ExportFormat, ExportOptions, MappingArtifact,
    MappingRequest,
};
pub use config::Config;
pub use core::{Column, ForeignKey, PrimaryKey, SchemaSnapshot, SourceEngine, Table};
pub use crypto::{EncryptedPayload, EncryptionKey, EncryptionService, KeyStore};
pub use ddl::{synthesize, DdlScript};
pub use dialect::{map_type, CanonicalType, TypeMapper, TypeMapping};
pub use error::{BridgeError, Result};
pub use vault::{ConnectionStore, CredentialVault, SavedConnection};
