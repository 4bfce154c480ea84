//! Lens DA CLI Library
//!
//! Command-line interface for archiving the Lens dataset to a DA ledger.
//!
//! # Overview
//!
//! - **Build**: pack the source database into chunks and a manifest (`lensda build`)
//! - **Submit**: push chunks to the ledger until all are final (`lensda submit`)
//! - **Status**: show how far submission has progressed (`lensda status`)
//! - **Verify**: re-check chunk files against the manifest (`lensda verify`)

pub mod commands;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use lensda_common::layout::DEFAULT_BUILD_DIR;
use lensda_common::types::DEFAULT_CHUNK_CEILING;
use lensda_submit::LedgerTarget;
use std::path::PathBuf;

/// Default source database
pub const DEFAULT_DB_DSN: &str = "postgres://postgres@localhost/lens_raw";

/// Lens DA - archive the Lens dataset to a data-availability ledger
#[derive(Parser, Debug)]
#[command(name = "lensda")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding chunks/, the manifest and the progress log
    #[arg(long, env = "BUILD_DIR", default_value = DEFAULT_BUILD_DIR, global = true)]
    pub build_dir: PathBuf,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack the source tables into chunks and write the manifest
    Build {
        /// Postgres connection string of the source dataset
        #[arg(long, env = "DB_DSN", default_value = DEFAULT_DB_DSN, hide_env_values = true)]
        db_dsn: String,

        /// Maximum chunk size in bytes
        #[arg(long, env = "CHUNK_CEILING", default_value_t = DEFAULT_CHUNK_CEILING)]
        chunk_ceiling: usize,
    },

    /// Submit built chunks to the ledger, resuming from the progress log
    Submit(SubmitArgs),

    /// Show submission progress
    Status,

    /// Recompute every chunk digest and compare it with the manifest
    Verify,
}

/// Flags of `lensda submit`; each one overrides its environment variable
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SubmitArgs {
    /// Ledger deployment (turbo, hex, mainnet)
    #[arg(long, env = "LEDGER_TARGET")]
    pub target: Option<LedgerTarget>,

    /// Number of chunks in flight
    #[arg(long, env = "CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Global ceiling on submission calls per second
    #[arg(long, env = "MAX_QPS")]
    pub max_qps: Option<u32>,

    /// Stop after this many cumulative manifest bytes
    #[arg(long, env = "MAX_TOTAL_BYTES")]
    pub max_total_bytes: Option<u64>,
}
