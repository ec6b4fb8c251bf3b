use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use fingerprint_analytics::config::{load_config, override_table, AnalyticsConfig};
use fingerprint_analytics::observability::logging;
use fingerprint_analytics::schema::{create_table_statement, ensure_table, verify_schema, SchemaStatus};
use fingerprint_analytics::store::{AnalyticsStore, ClickHouseStore};

#[derive(Parser)]
#[command(name = "analytics-cli")]
#[command(about = "Inspect and provision the fingerprint table", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured table name.
    #[arg(short, long)]
    table: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the existing table against the fingerprint schema
    Verify,
    /// Create the table if it does not exist
    Provision,
    /// Print the CREATE TABLE statement
    Ddl,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AnalyticsConfig::default(),
    };
    if let Some(table) = cli.table {
        config = override_table(config, table)?;
    }
    logging::init_logging("warn");

    let table = config.store.table.clone();

    if let Commands::Ddl = cli.command {
        println!("{};", create_table_statement(&table));
        return Ok(());
    }

    let store: Arc<dyn AnalyticsStore> = Arc::new(ClickHouseStore::new(&config.store)?);
    store.ping().await?;

    match cli.command {
        Commands::Verify => match verify_schema(store.as_ref(), &table).await? {
            SchemaStatus::Absent => println!("{}: absent", table),
            SchemaStatus::Matching => println!("{}: matching", table),
            SchemaStatus::Mismatched(mismatch) => {
                eprintln!("{}: {}", table, mismatch);
                store.close().await?;
                return Err(mismatch.into());
            }
        },
        Commands::Provision => {
            ensure_table(store.as_ref(), &table).await?;
            println!("{}: ready", table);
        }
        Commands::Ddl => {}
    }

    store.close().await?;
    Ok(())
}
