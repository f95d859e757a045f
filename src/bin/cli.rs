//! Trellis CLI
//!
//! Command-line interface for Trellis:
//! - Validate schema documents
//! - Execute operation chains against an in-memory store
//! - Generate a default config file

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trellis::config::{generate_default_config, Config};
use trellis::operation::wire::data_to_json;
use trellis::operation::OperationChain;
use trellis::store::{MapStore, User};
use trellis::Schema;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schema-governed graph store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a schema document and report every violation
    ValidateSchema {
        /// Path to the JSON schema
        path: PathBuf,
    },

    /// Run an operation chain against a fresh in-memory store
    Execute {
        /// Path to the JSON schema (default: the configured schema_path)
        #[arg(short, long)]
        schema: Option<PathBuf>,
        /// Path to the JSON operation chain, or a single operation
        #[arg(long)]
        chain: PathBuf,
        /// Requesting user id
        #[arg(short, long, default_value = "UNKNOWN")]
        user: String,
        /// Data authorisations, comma-separated
        #[arg(short, long, value_delimiter = ',')]
        auths: Vec<String>,
        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    // A second subscriber is only possible in tests; ignore it here
    let _ = trellis::telemetry::init(&config.logging);

    match cli.command {
        Commands::ValidateSchema { path } => {
            let content = std::fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
            let schema: Schema = serde_json::from_str(&content).with_context(|| format!("parsing {:?}", path))?;

            let errors = schema.validate();
            if errors.is_empty() {
                println!("{:?}: schema is valid", path);
            } else {
                for error in &errors {
                    eprintln!("  - {}", error);
                }
                bail!("{:?}: {} violation(s)", path, errors.len());
            }
        }

        Commands::Execute {
            schema,
            chain,
            user,
            auths,
            compact,
        } => {
            let schema_path = schema
                .or_else(|| config.store.schema_path.as_ref().map(PathBuf::from))
                .context("no schema given and no schema_path configured")?;
            let schema = Schema::from_path(&schema_path)?;

            let content = std::fs::read_to_string(&chain).with_context(|| format!("reading {:?}", chain))?;
            let chain = OperationChain::from_json(&content)?;

            let store = MapStore::create(config.store.clone(), schema)?;
            let mut context = store.create_context(User::new(user).data_auths(auths));

            let output = store.execute(chain, &mut context).await?;
            let json = data_to_json(output);
            if compact {
                println!("{}", serde_json::to_string(&json)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}
