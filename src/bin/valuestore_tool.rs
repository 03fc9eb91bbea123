//! valuestore maintenance tool
//!
//! Inspects and repairs a value store on disk.

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use valuestore::{Config, DataStore};

/// valuestore tool
#[derive(Parser, Debug)]
#[command(name = "valuestore-tool")]
#[command(about = "Inspect and repair a deduplicating value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./valuestore_data")]
    data_dir: String,

    /// File name prefix of the store files
    #[arg(short, long, default_value = "values")]
    prefix: String,

    /// Do not rebuild an inconsistent hash index on open
    #[arg(long)]
    no_repair: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print summary numbers
    Stats,

    /// Print every value and hash index entry
    Dump,

    /// Cross-check data file, ID file and hash index
    Verify,

    /// Rebuild the hash index from the data and ID files
    Rebuild,

    /// Print the value stored under an ID
    Get {
        /// The ID to resolve
        id: u32,
    },

    /// Print the ID of a value
    Lookup {
        /// The value to look up
        value: String,
    },

    /// Store a value and print its ID
    Put {
        /// The value to store
        value: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,valuestore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .file_prefix(&args.prefix)
        .repair_on_open(!args.no_repair)
        .build();

    let store = match DataStore::open(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&store, args.command).and_then(|()| store.close());
    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(store: &DataStore, command: Commands) -> valuestore::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Stats => {
            let stats = store.stats();
            writeln!(out, "max_id={}", stats.max_id)?;
            writeln!(out, "data_file_size={}", stats.data_file_size)?;
            writeln!(out, "hash_entries={}", stats.hash_entries)?;
        }
        Commands::Dump => store.dump(&mut out)?,
        Commands::Verify => {
            let report = store.verify()?;
            writeln!(out, "max_id={}", report.max_id)?;
            writeln!(out, "hash_entries={}", report.hash_entries)?;
            writeln!(out, "unset_ids={:?}", report.unset_ids)?;
            writeln!(out, "unindexed_ids={:?}", report.unindexed_ids)?;
            writeln!(out, "dangling_entries={:?}", report.dangling_entries)?;
            writeln!(out, "duplicate_ids={:?}", report.duplicate_ids)?;
            writeln!(
                out,
                "{}",
                if report.is_consistent() { "OK" } else { "INCONSISTENT" }
            )?;
        }
        Commands::Rebuild => {
            let entries = store.rebuild_hash_index()?;
            writeln!(out, "rebuilt {} hash index entries", entries)?;
        }
        Commands::Get { id } => match store.get_data(id)? {
            Some(data) => writeln!(out, "{}", String::from_utf8_lossy(&data))?,
            None => writeln!(out, "(not found)")?,
        },
        Commands::Lookup { value } => match store.get_id(value.as_bytes())? {
            Some(id) => writeln!(out, "{}", id)?,
            None => writeln!(out, "(not found)")?,
        },
        Commands::Put { value } => {
            let id = store.store(value.as_bytes())?;
            store.sync()?;
            writeln!(out, "{}", id)?;
        }
    }

    Ok(())
}
