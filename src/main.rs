//! genoingest - load genomic reference and annotation data into SQLite

mod cli;
mod config;
mod db;
mod files;
mod ingest;
mod readers;
mod tools;

use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tools::ToolError;

const DEFAULT_DATA_DIR: &str = ".genoingest";

fn main() {
    // Output goes to stdout, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GENOINGEST_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        // ====================================================================
        // Config Commands
        // ====================================================================
        Commands::Check { config, template, root } => {
            match tools::check_config(&config, template, resolve_root(root).as_deref()) {
                Ok(output) => {
                    let valid = output.valid;
                    match to_json(&output) {
                        Ok(text) if !valid => {
                            println!("{}", text);
                            std::process::exit(1);
                        }
                        other => other,
                    }
                }
                Err(e) => Err(e),
            }
        }

        Commands::Describe { config, root } => {
            tools::describe_config(&config, resolve_root(root).as_deref()).and_then(|r| to_json(&r))
        }

        Commands::Diff { old, new } => tools::diff_configs(&old, &new).and_then(|r| to_json(&r)),

        Commands::Template { revision } => tools::template_output(revision).map(str::to_string),

        // ====================================================================
        // Ingest Commands
        // ====================================================================
        Commands::Files { config, mode, root } => {
            tools::list_files(&config, mode, resolve_root(root).as_deref()).and_then(|r| to_json(&r))
        }

        Commands::Ingest { config, mode, root, data_dir } => tools::run_ingest(
            &config,
            mode,
            resolve_root(root).as_deref(),
            &resolve_data_dir(data_dir),
        )
        .and_then(|r| to_json(&r)),

        Commands::Runs { database, data_dir, limit } => {
            tools::list_ingest_runs(&resolve_data_dir(data_dir), &database, limit)
                .and_then(|r| to_json(&r))
        }
    };

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ToolError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Placeholder root: the flag, then GENOINGEST_ROOT
fn resolve_root(arg: Option<PathBuf>) -> Option<PathBuf> {
    arg.or_else(|| std::env::var_os("GENOINGEST_ROOT").map(PathBuf::from))
}

/// Database directory: the flag, then GENOINGEST_DATA_DIR, then `.genoingest`
fn resolve_data_dir(arg: Option<PathBuf>) -> PathBuf {
    arg.or_else(|| std::env::var_os("GENOINGEST_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
