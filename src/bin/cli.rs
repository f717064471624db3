//! AtlasDS CLI
//!
//! Command-line access to a filesystem datastore, optionally sharded.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use atlasds::sharding::{self, ShardFn};
use atlasds::{Datastore, FsConfig, FsDatastore, Key, Query, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasDS CLI
#[derive(Parser, Debug)]
#[command(name = "atlasds-cli")]
#[command(about = "Inspect and edit an AtlasDS filesystem store")]
#[command(version)]
struct Args {
    /// Store root directory
    #[arg(short, long, default_value = "./atlasds_data")]
    root: PathBuf,

    /// Open through the sharding protocol, e.g. `next-to-last/2`
    #[arg(short, long)]
    shard: Option<ShardFn>,

    /// Value file extension
    #[arg(long, default_value = ".data")]
    extension: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value
    Put {
        key: String,
        value: String,
    },

    /// Print a value
    Get {
        key: String,
    },

    /// Print whether a key exists
    Has {
        key: String,
    },

    /// Remove a key
    Delete {
        key: String,
    },

    /// List entries
    Query {
        /// Literal key prefix
        #[arg(short, long)]
        prefix: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long)]
        offset: Option<usize>,

        /// Print keys only
        #[arg(short, long)]
        keys_only: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,atlasds=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = FsConfig::builder().extension(&args.extension).build();
    let store = FsDatastore::open(&args.root, config).await?;

    match args.shard {
        Some(shard) => {
            let sharded = sharding::create_or_open(store, &shard).await?;
            execute(&sharded, args.command).await?;
            sharded.close().await
        }
        None => {
            execute(&store, args.command).await?;
            store.close().await
        }
    }
}

async fn execute(store: &dyn Datastore, command: Commands) -> Result<()> {
    let mut out = std::io::stdout().lock();

    match command {
        Commands::Put { key, value } => {
            store.put(&Key::new(key), Bytes::from(value)).await?;
        }
        Commands::Get { key } => {
            let value = store.get(&Key::new(key)).await?;
            out.write_all(&value)?;
            writeln!(out)?;
        }
        Commands::Has { key } => {
            writeln!(out, "{}", store.has(&Key::new(key)).await?)?;
        }
        Commands::Delete { key } => {
            store.delete(&Key::new(key)).await?;
        }
        Commands::Query {
            prefix,
            limit,
            offset,
            keys_only,
        } => {
            let mut query = Query::new().keys_only(keys_only);
            if let Some(prefix) = prefix {
                query = query.prefix(prefix);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            if let Some(offset) = offset {
                query = query.offset(offset);
            }

            let mut results = store.query(query);
            while let Some(entry) = results.next().await {
                let entry = entry?;
                match entry.value {
                    Some(value) => writeln!(out, "{}\t{}", entry.key, String::from_utf8_lossy(&value))?,
                    None => writeln!(out, "{}", entry.key)?,
                }
            }
        }
    }

    Ok(())
}
