//! warehouse-bridge CLI - Source schema mapping and warehouse DDL generation.

mod prompt;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn, Level};
use warehouse_bridge::dialect::map_type;
use warehouse_bridge::{
    ddl, persist, BridgeError, Column, Config, ConnectionParams, ConnectionStore,
    CredentialVault, ExportFormat, KeyStore, MappingArtifact, MappingRequest, SavedConnection,
    SchemaSnapshot, SourceEngine,
};

#[derive(Parser)]
#[command(name = "warehouse-bridge")]
#[command(about = "Map relational schemas to an analytical warehouse")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file [default: warehouse-bridge.yaml if present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log format: text or json
    #[arg(long, default_value = "text", global = true, value_parser = ["text", "json"])]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info", global = true, value_parser = ["debug", "info", "warn", "error"])]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the installation encryption key
    Init {
        /// Derive the key from a passphrase (WAREHOUSE_BRIDGE_PASSPHRASE or prompt)
        #[arg(long)]
        passphrase: bool,

        /// Replace an existing key; payloads encrypted under it become unreadable
        #[arg(long, short)]
        force: bool,
    },

    /// Remove the installation encryption key
    Teardown {
        /// Remove without confirmation
        #[arg(long, short)]
        force: bool,
    },

    /// Show how a native column type maps to the warehouse
    MapType {
        /// Source engine: postgres, mysql or mssql
        #[arg(long)]
        engine: SourceEngine,

        /// Native type, e.g. "numeric(10,2)" or "int identity"
        #[arg(long = "type")]
        data_type: String,

        /// Declared precision
        #[arg(long)]
        precision: Option<u32>,

        /// Declared scale
        #[arg(long)]
        scale: Option<u32>,

        /// Declared length (-1 for MAX)
        #[arg(long, allow_hyphen_values = true)]
        length: Option<i64>,

        /// Column is auto-increment
        #[arg(long)]
        auto_increment: bool,

        /// Print the mapping as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a mapping artifact from introspection output
    CreateMapping(CreateMappingArgs),

    /// Summarize a mapping artifact and its export plan
    Inspect {
        /// Mapping artifact file
        #[arg(long, short)]
        mapping: PathBuf,

        /// Verify the stored password decrypts under the installation key
        #[arg(long)]
        check_credentials: bool,
    },

    /// Generate warehouse DDL from a mapping artifact
    GenerateDdl {
        /// Mapping artifact file
        #[arg(long, short)]
        mapping: PathBuf,

        /// Output file [default: stdout]
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Manage encrypted credentials
    #[command(subcommand)]
    Vault(VaultCommand),

    /// Manage saved source connections
    #[command(subcommand)]
    Connections(ConnectionsCommand),
}

#[derive(Args)]
struct CreateMappingArgs {
    /// Introspection output: {"engine": ..., "tables": [...]}
    #[arg(long)]
    schema_file: PathBuf,

    /// Mapping name
    #[arg(long)]
    name: String,

    /// Use a saved connection instead of --host/--database/--user
    #[arg(long, conflicts_with_all = ["host", "database", "user"])]
    connection: Option<String>,

    /// Source host
    #[arg(long, required_unless_present = "connection")]
    host: Option<String>,

    /// Source port [default: engine default]
    #[arg(long)]
    port: Option<u16>,

    /// Source database
    #[arg(long, required_unless_present = "connection")]
    database: Option<String>,

    /// Source user
    #[arg(long, required_unless_present = "connection")]
    user: Option<String>,

    /// Connect with TLS
    #[arg(long)]
    ssl: bool,

    /// Comma-separated schema selection, in order [default: all]
    #[arg(long, value_delimiter = ',')]
    schemas: Vec<String>,

    /// Export format: parquet, csv or json [default: from config]
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Export output directory [default: from config]
    #[arg(long)]
    output_dir: Option<String>,

    /// Artifact output file
    #[arg(long, short)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum VaultCommand {
    /// Store a secret (WAREHOUSE_BRIDGE_PASSWORD or prompt)
    Set { name: String },
    /// Print a decrypted secret
    Get { name: String },
    /// List secret names
    List,
    /// Remove a secret
    Remove { name: String },
}

#[derive(Subcommand)]
enum ConnectionsCommand {
    /// Save a connection (password from WAREHOUSE_BRIDGE_PASSWORD or prompt)
    Save {
        #[arg(long)]
        name: String,
        #[arg(long)]
        engine: SourceEngine,
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        database: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        ssl: bool,
    },
    /// List saved connections
    List,
    /// Remove a saved connection
    Remove { name: String },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), BridgeError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::resolve(cli.config.as_deref())?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {:?}", path);
    }
    let key_store = KeyStore::new(config.key_file());

    match cli.command {
        Commands::Init { passphrase, force } => {
            let key = if passphrase {
                let secret = prompt::read_secret(prompt::PASSPHRASE_ENV, "Passphrase", true)?;
                key_store.init_from_passphrase(&secret, force)?
            } else {
                key_store.init_generated(force)?
            };
            println!(
                "Initialized encryption key at {} (fingerprint {})",
                key_store.path().display(),
                key.fingerprint()
            );
        }

        Commands::Teardown { force } => {
            if !key_store.is_initialized() {
                println!("No encryption key at {}", key_store.path().display());
                return Ok(());
            }
            let confirmed = force
                || prompt::confirm(
                    "Remove the encryption key? Every stored credential becomes unreadable",
                )?;
            if !confirmed {
                return Err(BridgeError::Config(
                    "teardown not confirmed; pass --force to remove the key".to_string(),
                ));
            }
            key_store.teardown()?;
            println!("Removed encryption key at {}", key_store.path().display());
        }

        Commands::MapType {
            engine,
            data_type,
            precision,
            scale,
            length,
            auto_increment,
            json,
        } => {
            let mut column = Column::new("column", data_type);
            column.precision = precision;
            column.scale = scale;
            column.max_length = length;
            column.auto_increment = auto_increment;

            let mapping = map_type(engine, &column);
            if json {
                let value = serde_json::json!({
                    "engine": engine.as_str(),
                    "nativeType": column.data_type,
                    "canonicalType": mapping.canonical_type.sql(),
                    "identity": mapping.identity,
                    "warning": mapping.warning,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", mapping.canonical_type);
                println!("  identity: {}", mapping.identity);
                if let Some(warning) = &mapping.warning {
                    println!("  warning: {}", warning);
                }
            }
        }

        Commands::CreateMapping(args) => create_mapping(args, &config, &key_store)?,

        Commands::Inspect {
            mapping,
            check_credentials,
        } => inspect(&mapping, check_credentials, &key_store)?,

        Commands::GenerateDdl { mapping, output } => {
            let artifact = MappingArtifact::load(&mapping)?;
            let script = ddl::synthesize(&artifact);
            if !script.warnings.is_empty() {
                warn!(
                    "{} columns or constraints need review (see comments in the DDL)",
                    script.warnings.len()
                );
            }
            let text = script.render();
            match output {
                Some(path) => {
                    persist::write_atomic(&path, text.as_bytes())?;
                    info!(
                        "Wrote {} statements to {:?}",
                        script.statements.len(),
                        path
                    );
                }
                None => print!("{}", text),
            }
        }

        Commands::Vault(command) => vault(command, &config, &key_store)?,

        Commands::Connections(command) => connections(command, &config, &key_store)?,
    }

    Ok(())
}

fn create_mapping(
    args: CreateMappingArgs,
    config: &Config,
    key_store: &KeyStore,
) -> Result<(), BridgeError> {
    // Fail on a missing key before reading anything else.
    let service = key_store.service()?;
    let snapshot = SchemaSnapshot::load(&args.schema_file)?;
    info!(
        "Read {} {} tables from {:?}",
        snapshot.tables.len(),
        snapshot.engine,
        args.schema_file
    );

    let (connection, password) = match &args.connection {
        Some(name) => {
            let store = ConnectionStore::load(config.connections_file())?;
            let saved = store.get(name).ok_or_else(|| {
                BridgeError::Vault(format!("no saved connection named '{}'", name))
            })?;
            if saved.engine != snapshot.engine {
                return Err(BridgeError::Config(format!(
                    "saved connection '{}' is {} but the schema file is {}",
                    name, saved.engine, snapshot.engine
                )));
            }
            let mut params = saved.params();
            if let Some(port) = args.port {
                params.port = port;
            }
            (params, saved.decrypt_password(&service)?)
        }
        None => {
            let params = ConnectionParams {
                host: args.host.clone().unwrap_or_default(),
                port: args.port.unwrap_or_else(|| snapshot.engine.default_port()),
                database: args.database.clone().unwrap_or_default(),
                user: args.user.clone().unwrap_or_default(),
                ssl: args.ssl,
            };
            let password = prompt::read_secret(prompt::PASSWORD_ENV, "Database password", false)?;
            (params, password)
        }
    };

    let mut export_options = config.export.to_options();
    if let Some(format) = args.format {
        export_options.format = format;
    }
    if let Some(dir) = args.output_dir {
        export_options.output_dir = dir;
    }

    let request = MappingRequest {
        name: args.name,
        engine: snapshot.engine,
        connection,
        selected_schemas: args.schemas,
        tables: snapshot.tables,
        export_options,
    };
    let artifact = MappingArtifact::create(request, &password, &service)?;
    artifact.save(&args.output)?;

    println!(
        "Created mapping '{}' with {} tables in {} schemas: {}",
        artifact.name,
        artifact.tables.len(),
        artifact.selected_schemas.len(),
        args.output.display()
    );
    Ok(())
}

fn inspect(path: &Path, check_credentials: bool, key_store: &KeyStore) -> Result<(), BridgeError> {
    let artifact = MappingArtifact::load(path)?;
    let connection = &artifact.source.connection;

    println!("Mapping: {}", artifact.name);
    println!("  Created: {}", artifact.created_at.to_rfc3339());
    println!(
        "  Source: {} {}@{}:{}/{}{}",
        artifact.engine(),
        connection.user,
        connection.host,
        connection.port,
        connection.database,
        if connection.ssl { " (ssl)" } else { "" }
    );
    println!("  Schemas: {}", artifact.selected_schemas.join(", "));
    println!(
        "  Export: {} to {}",
        artifact.export_options.format, artifact.export_options.output_dir
    );
    println!("\nTables ({}):", artifact.tables.len());

    for table in artifact.ordered_tables() {
        let flagged = table
            .columns
            .iter()
            .filter(|c| map_type(artifact.engine(), c).is_flagged())
            .count();
        println!(
            "  {} ({} columns{}{}, {} foreign keys) -> {}",
            table.full_name(),
            table.columns.len(),
            if table.has_pk() { ", pk" } else { "" },
            if flagged > 0 {
                format!(", {} flagged", flagged)
            } else {
                String::new()
            },
            table.foreign_keys.len(),
            artifact.export_options.table_output_path(table).display()
        );
    }

    if check_credentials {
        let service = key_store.service()?;
        artifact.decrypt_password(&service)?;
        println!(
            "\nCredentials: OK (key {})",
            service.key_fingerprint()
        );
    }
    Ok(())
}

fn vault(command: VaultCommand, config: &Config, key_store: &KeyStore) -> Result<(), BridgeError> {
    let mut vault = CredentialVault::load(config.vault_file())?;
    match command {
        VaultCommand::Set { name } => {
            let service = key_store.service()?;
            let secret = prompt::read_secret(prompt::PASSWORD_ENV, "Secret", true)?;
            vault.set(&name, &secret, &service)?;
            vault.save()?;
            println!("Stored credential '{}'", name);
        }
        VaultCommand::Get { name } => {
            let service = key_store.service()?;
            let secret = vault.get(&name, &service)?;
            println!("{}", secret.as_str());
        }
        VaultCommand::List => {
            for name in vault.names() {
                println!("{}", name);
            }
        }
        VaultCommand::Remove { name } => {
            if !vault.remove(&name) {
                return Err(BridgeError::Vault(format!("no credential named '{}'", name)));
            }
            vault.save()?;
            println!("Removed credential '{}'", name);
        }
    }
    Ok(())
}

fn connections(
    command: ConnectionsCommand,
    config: &Config,
    key_store: &KeyStore,
) -> Result<(), BridgeError> {
    let mut store = ConnectionStore::load(config.connections_file())?;
    match command {
        ConnectionsCommand::Save {
            name,
            engine,
            host,
            port,
            database,
            user,
            ssl,
        } => {
            let service = key_store.service()?;
            let password = prompt::read_secret(prompt::PASSWORD_ENV, "Database password", false)?;
            let params = ConnectionParams {
                host,
                port: port.unwrap_or_else(|| engine.default_port()),
                database,
                user,
                ssl,
            };
            let saved = SavedConnection::new(&name, engine, params, &password, &service)?;
            let replaced = store.upsert(saved);
            store.save()?;
            println!(
                "{} connection '{}'",
                if replaced { "Updated" } else { "Saved" },
                name
            );
        }
        ConnectionsCommand::List => {
            for saved in store.list() {
                let c = &saved.connection;
                println!(
                    "{}\t{}\t{}@{}:{}/{}",
                    saved.name, saved.engine, c.user, c.host, c.port, c.database
                );
            }
        }
        ConnectionsCommand::Remove { name } => {
            if !store.remove(&name) {
                return Err(BridgeError::Vault(format!("no saved connection named '{}'", name)));
            }
            store.save()?;
            println!("Removed connection '{}'", name);
        }
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout can carry DDL.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
