//! CLI module for genoingest
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Source, LATEST_REVISION};

#[derive(Parser)]
#[command(name = "genoingest")]
#[command(about = "Load genomic reference and annotation sources into per-source databases")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    // ========================================================================
    // Config Commands
    // ========================================================================

    /// Validate a config file
    Check {
        /// Path to the JSON config
        config: PathBuf,
        /// Check as a template: placeholders are allowed and left alone
        #[arg(long)]
        template: bool,
        /// Directory that replaces '?' in path values
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Print the resolved, typed settings
    Describe {
        config: PathBuf,
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Compare two configs (use @N for bundled template revision N)
    Diff {
        old: String,
        new: String,
    },

    /// Print a bundled config template
    Template {
        #[arg(short, long, default_value_t = LATEST_REVISION)]
        revision: u32,
    },

    // ========================================================================
    // Ingest Commands
    // ========================================================================

    /// List the input files each mode would read
    Files {
        config: PathBuf,
        /// Only this mode
        #[arg(short, long, value_enum)]
        mode: Option<Source>,
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Load one data source
    Ingest {
        config: PathBuf,
        /// Data source to load
        #[arg(short, long, value_enum)]
        mode: Source,
        #[arg(long)]
        root: Option<PathBuf>,
        /// Directory holding the databases
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Show past ingest runs of a database
    Runs {
        /// Database name, as in '<source>.database'
        #[arg(long)]
        database: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Max results
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}
