//! Lists recordings that still need encoding and records finished ones.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tsencode::{config, queue};

#[derive(Parser)]
#[command(name = "tsencode-queue")]
#[command(author, version, about = "Track which broadcast recordings have been encoded")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print unprocessed recording filenames, one per line
    Pending {
        /// Scan this folder instead of asking the recorder server
        #[arg(long)]
        watch_dir: Option<PathBuf>,
    },

    /// Mark a recording filename as processed
    Mark {
        /// Recording file name as printed by `pending`
        filename: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tsencode::logging::init(cli.verbose);

    let mut config = config::load_config_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Pending { watch_dir } => {
            if watch_dir.is_some() {
                config.queue.watch_dir = watch_dir;
            }
            let ledger = queue::Ledger::load(config.queue.ledger_path());
            let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
            for filename in rt.block_on(queue::pending(&config.queue, &ledger))? {
                println!("{}", filename);
            }
            Ok(())
        }
        Commands::Mark { filename } => {
            if queue::mark_processed(&config.queue, &filename)? {
                println!("File '{}' has been marked as processed.", filename);
            } else {
                println!("File '{}' is already marked as processed.", filename);
            }
            Ok(())
        }
    }
}
