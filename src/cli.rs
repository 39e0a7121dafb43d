use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "talpa",
    about = "Incremental fuzzy search over a markdown note vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the index for a vault and print corpus statistics
    Index {
        /// Vault root directory
        vault: PathBuf,

        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where to write the file-cache blob
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Index a vault, run one query, and print ranked results
    Search {
        /// Vault root directory
        vault: PathBuf,

        /// Raw query string (phrases, filters, -excludes, OR, /regex/)
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Watch a vault and keep the index fresh until interrupted
    Watch {
        /// Vault root directory
        vault: PathBuf,

        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// File-cache blob to load on start and save on exit
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}
