//! Mapping artifact: the persisted schema description plus encrypted
//! connection credentials.
//!
//! An artifact is created once by the mapping workflow and read by export
//! and DDL generation. It is never patched in place; a new mapping writes a
//! new artifact.
//!
//! ```text
//! {
//!   "version": 1,
//!   "name": "orders-nightly",
//!   "createdAt": "2026-10-19T08:00:00Z",
//!   "source": { "type": "postgres", "connection": { host, port, database, user, password, ssl } },
//!   "selectedSchemas": ["public"],
//!   "tables": [ ... ],
//!   "exportOptions": { "format": "parquet", "outputDir": "./export" }
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::core::identifier::validate_identifier;
use crate::core::schema::{schemas_in_order, SourceEngine, Table};
use crate::crypto::{EncryptedPayload, EncryptionService};
use crate::error::{BridgeError, Result};
use crate::persist;

/// Artifact format version written by this build.
pub const ARTIFACT_VERSION: u32 = 1;

/// Connection settings without the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub ssl: bool,
}

/// Connection descriptor as stored at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: EncryptedPayload,
    #[serde(default)]
    pub ssl: bool,
}

impl ConnectionDescriptor {
    /// Encrypt `password` and attach it to the connection parameters.
    pub fn seal(
        params: ConnectionParams,
        password: &str,
        service: &EncryptionService,
    ) -> Result<Self> {
        let password = service.encrypt(password)?;
        Ok(Self {
            host: params.host,
            port: params.port,
            database: params.database,
            user: params.user,
            password,
            ssl: params.ssl,
        })
    }

    /// Recover the plaintext password.
    pub fn decrypt_password(&self, service: &EncryptionService) -> Result<Zeroizing<String>> {
        service.decrypt(&self.password)
    }

    /// Check the required fields and the password payload shape.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("host", &self.host),
            ("database", &self.database),
            ("user", &self.user),
        ] {
            if value.trim().is_empty() {
                return Err(BridgeError::malformed(format!(
                    "connection {} is required",
                    field
                )));
            }
        }
        if self.port == 0 {
            return Err(BridgeError::malformed("connection port must be non-zero"));
        }
        self.password
            .check_shape()
            .map_err(|e| BridgeError::malformed(format!("connection password: {}", e)))
    }
}

/// Source engine and connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    #[serde(rename = "type")]
    pub engine: SourceEngine,
    pub connection: ConnectionDescriptor,
}

/// Output file format of the export engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Parquet,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Parquet => "parquet",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "parquet" => Ok(ExportFormat::Parquet),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(BridgeError::Config(format!(
                "unknown export format '{}' (expected parquet, csv or json)",
                other
            ))),
        }
    }
}

/// Export preferences handed to the export engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    #[serde(default)]
    pub format: ExportFormat,
    pub output_dir: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Parquet,
            output_dir: "./export".to_string(),
        }
    }
}

impl ExportOptions {
    /// Output file of one table: `<outputDir>/<schema>/<table>.<format>`.
    pub fn table_output_path(&self, table: &Table) -> PathBuf {
        Path::new(&self.output_dir)
            .join(&table.schema)
            .join(format!("{}.{}", table.name, self.format.extension()))
    }
}

/// Everything needed to create an artifact except the password.
#[derive(Debug, Clone)]
pub struct MappingRequest {
    pub name: String,
    pub engine: SourceEngine,
    pub connection: ConnectionParams,
    /// Selected schemas in operator order. Empty selects every schema of
    /// `tables` in order of first appearance.
    pub selected_schemas: Vec<String>,
    pub tables: Vec<Table>,
    pub export_options: ExportOptions,
}

/// The persisted mapping artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingArtifact {
    pub version: u32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub source: SourceDescriptor,
    pub selected_schemas: Vec<String>,
    pub tables: Vec<Table>,
    pub export_options: ExportOptions,
}

impl MappingArtifact {
    /// Encrypt the password and build a validated artifact.
    ///
    /// Tables outside the schema selection are dropped. Nothing is returned
    /// if encryption fails.
    pub fn create(
        request: MappingRequest,
        password: &str,
        service: &EncryptionService,
    ) -> Result<Self> {
        let MappingRequest {
            name,
            engine,
            connection,
            selected_schemas,
            tables,
            export_options,
        } = request;

        let selected_schemas = if selected_schemas.is_empty() {
            schemas_in_order(&tables)
        } else {
            selected_schemas
        };

        let total = tables.len();
        let tables: Vec<Table> = tables
            .into_iter()
            .filter(|t| selected_schemas.contains(&t.schema))
            .collect();
        if tables.len() < total {
            debug!(
                "Skipped {} tables outside the selected schemas",
                total - tables.len()
            );
        }

        let connection = ConnectionDescriptor::seal(connection, password, service)?;

        let artifact = Self {
            version: ARTIFACT_VERSION,
            name,
            created_at: Utc::now(),
            source: SourceDescriptor { engine, connection },
            selected_schemas,
            tables,
            export_options,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Parse and validate an artifact.
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)
            .map_err(|e| BridgeError::malformed(e.to_string()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Load and validate an artifact file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the artifact as pretty JSON (atomic).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        persist::write_atomic(path, content.as_bytes())?;
        info!(
            "Saved mapping '{}' ({} tables) to {:?}",
            self.name,
            self.tables.len(),
            path
        );
        Ok(())
    }

    /// Check every structural invariant. Failures are `MalformedArtifact`.
    pub fn validate(&self) -> Result<()> {
        if self.version != ARTIFACT_VERSION {
            return Err(BridgeError::malformed(format!(
                "unsupported version {} (expected {})",
                self.version, ARTIFACT_VERSION
            )));
        }
        if self.name.trim().is_empty() {
            return Err(BridgeError::malformed("name is required"));
        }

        self.source.connection.validate()?;

        if self.selected_schemas.is_empty() {
            return Err(BridgeError::malformed("at least one schema must be selected"));
        }
        let mut schemas = HashSet::new();
        for schema in &self.selected_schemas {
            validate_identifier(schema)?;
            if !schemas.insert(schema.as_str()) {
                return Err(BridgeError::malformed(format!(
                    "schema '{}' is selected twice",
                    schema
                )));
            }
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !schemas.contains(table.schema.as_str()) {
                return Err(BridgeError::malformed(format!(
                    "table '{}' belongs to unselected schema '{}'",
                    table.full_name(),
                    table.schema
                )));
            }
            if !seen.insert((table.schema.as_str(), table.name.as_str())) {
                return Err(BridgeError::malformed(format!(
                    "table '{}' appears twice",
                    table.full_name()
                )));
            }
            table.validate()?;
        }

        Ok(())
    }

    /// Source engine of the mapped schema.
    pub fn engine(&self) -> SourceEngine {
        self.source.engine
    }

    /// Tables grouped by selected schema order, artifact order within a schema.
    pub fn ordered_tables(&self) -> Vec<&Table> {
        self.selected_schemas
            .iter()
            .flat_map(|schema| self.tables.iter().filter(move |t| &t.schema == schema))
            .collect()
    }

    /// Recover the connection password.
    pub fn decrypt_password(&self, service: &EncryptionService) -> Result<Zeroizing<String>> {
        self.source.connection.decrypt_password(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ForeignKey, PrimaryKey};
    use crate::crypto::EncryptionKey;
    use tempfile::tempdir;

    fn service() -> EncryptionService {
        EncryptionService::new(EncryptionKey::new([5u8; 32]))
    }

    fn table(schema: &str, name: &str) -> Table {
        let mut t = Table::new(schema, name);
        t.columns.push(Column::new("id", "int4").not_null());
        t.primary_key = Some(PrimaryKey::new(["id"]));
        t
    }

    fn request(tables: Vec<Table>, schemas: Vec<&str>) -> MappingRequest {
        MappingRequest {
            name: "nightly".into(),
            engine: SourceEngine::Postgres,
            connection: ConnectionParams {
                host: "db.internal".into(),
                port: 5432,
                database: "shop".into(),
                user: "reader".into(),
                ssl: true,
            },
            selected_schemas: schemas.into_iter().map(String::from).collect(),
            tables,
            export_options: ExportOptions::default(),
        }
    }

    fn artifact() -> MappingArtifact {
        let mut orders = table("public", "orders");
        orders.columns.push(Column::new("customer_id", "int4"));
        orders.foreign_keys.push(ForeignKey {
            columns: vec!["customer_id".into()],
            referenced_schema: "public".into(),
            referenced_table: "customers".into(),
            referenced_columns: vec!["id".into()],
        });
        MappingArtifact::create(
            request(vec![orders, table("public", "customers")], vec![]),
            "s3cret",
            &service(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_encrypts_password() {
        let svc = service();
        let a = MappingArtifact::create(request(vec![table("public", "t")], vec![]), "s3cret", &svc)
            .unwrap();
        assert_eq!(a.version, ARTIFACT_VERSION);
        assert_eq!(a.selected_schemas, vec!["public".to_string()]);
        assert!(a.source.connection.password.encrypted);
        assert_eq!(a.decrypt_password(&svc).unwrap().as_str(), "s3cret");

        let json = serde_json::to_string(&a).unwrap();
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_create_filters_unselected_schemas() {
        let a = MappingArtifact::create(
            request(
                vec![table("sales", "a"), table("hr", "b"), table("sales", "c")],
                vec!["sales"],
            ),
            "pw",
            &service(),
        )
        .unwrap();
        let names: Vec<_> = a.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_json_field_names() {
        let value = serde_json::to_value(artifact()).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["createdAt"].is_string());
        assert_eq!(value["source"]["type"], "postgres");
        assert_eq!(value["source"]["connection"]["port"], 5432);
        assert_eq!(value["source"]["connection"]["ssl"], true);
        assert_eq!(value["source"]["connection"]["password"]["encrypted"], true);
        assert_eq!(value["selectedSchemas"][0], "public");
        assert_eq!(value["tables"][0]["primaryKey"][0], "id");
        assert_eq!(
            value["tables"][0]["foreignKeys"][0]["referencedTable"],
            "customers"
        );
        assert_eq!(value["exportOptions"]["format"], "parquet");
        assert_eq!(value["exportOptions"]["outputDir"], "./export");
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        let a = artifact();
        a.save(&path).unwrap();
        let loaded = MappingArtifact::load(&path).unwrap();
        assert_eq!(loaded, a);
    }

    #[test]
    fn test_rejects_wrong_version() {
        let mut value = serde_json::to_value(artifact()).unwrap();
        value["version"] = serde_json::json!(2);
        let err = MappingArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedArtifact(_)));
        assert!(err.to_string().contains("unsupported version 2"));
    }

    #[test]
    fn test_rejects_missing_fields() {
        let mut value = serde_json::to_value(artifact()).unwrap();
        value.as_object_mut().unwrap().remove("source");
        let err = MappingArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedArtifact(_)));

        let err = MappingArtifact::from_json("not json").unwrap_err();
        assert!(matches!(err, BridgeError::MalformedArtifact(_)));
    }

    #[test]
    fn test_rejects_unencrypted_password() {
        let mut value = serde_json::to_value(artifact()).unwrap();
        value["source"]["connection"]["password"]["encrypted"] = serde_json::json!(false);
        let err = MappingArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedArtifact(_)));
    }

    #[test]
    fn test_rejects_table_outside_selection() {
        let mut a = artifact();
        a.tables.push(table("other", "x"));
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_schema_and_table() {
        let mut a = artifact();
        a.selected_schemas.push("public".into());
        assert!(a.validate().is_err());

        let mut a = artifact();
        a.tables.push(table("public", "orders"));
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_rejects_dangling_foreign_key_identifiers() {
        let mut value = serde_json::to_value(artifact()).unwrap();
        value["tables"][0]["foreignKeys"][0]["referencedTable"] = serde_json::json!("");
        let err = MappingArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedArtifact(_)));

        let mut value = serde_json::to_value(artifact()).unwrap();
        value["tables"][0]["foreignKeys"][0]["columns"] = serde_json::json!(["missing_id"]);
        let err = MappingArtifact::from_json(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("unknown column 'missing_id'"));
    }

    #[test]
    fn test_rejects_empty_connection_fields() {
        let mut a = artifact();
        a.source.connection.host = " ".into();
        assert!(a.validate().unwrap_err().to_string().contains("host"));
    }

    #[test]
    fn test_wrong_key_cannot_decrypt() {
        let a = artifact();
        let other = EncryptionService::new(EncryptionKey::new([6u8; 32]));
        assert!(matches!(
            a.decrypt_password(&other),
            Err(BridgeError::Authentication)
        ));
    }

    #[test]
    fn test_ordered_tables_follow_schema_selection() {
        let a = MappingArtifact::create(
            request(
                vec![table("b", "t1"), table("a", "t2"), table("b", "t3")],
                vec!["a", "b"],
            ),
            "pw",
            &service(),
        )
        .unwrap();
        let names: Vec<_> = a.ordered_tables().iter().map(|t| t.full_name()).collect();
        assert_eq!(names, vec!["a.t2", "b.t1", "b.t3"]);
    }

    #[test]
    fn test_table_output_path() {
        let options = ExportOptions {
            format: ExportFormat::Csv,
            output_dir: "/data/out".into(),
        };
        assert_eq!(
            options.table_output_path(&table("sales", "orders")),
            PathBuf::from("/data/out/sales/orders.csv")
        );
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("Parquet".parse::<ExportFormat>().unwrap(), ExportFormat::Parquet);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
