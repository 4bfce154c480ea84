//! `lensda build` command implementation
//!
//! Streams the merged source, packs it into chunks and publishes the manifest.

use crate::error::{CliError, Result};
use crate::progress::{create_spinner, format_bytes};
use colored::Colorize;
use lensda_common::layout::BuildLayout;
use lensda_common::types::LEDGER_BLOB_LIMIT;
use lensda_pack::{pipeline, PgRowSource};
use std::path::Path;

/// Reject ceilings the ledger could never accept
pub fn check_ceiling(chunk_ceiling: usize) -> Result<()> {
    if chunk_ceiling == 0 || chunk_ceiling >= LEDGER_BLOB_LIMIT {
        return Err(CliError::config(format!(
            "CHUNK_CEILING must be between 1 and {} bytes, got {}",
            LEDGER_BLOB_LIMIT - 1,
            chunk_ceiling
        )));
    }
    Ok(())
}

pub async fn run(build_dir: &Path, db_dsn: &str, chunk_ceiling: usize) -> Result<()> {
    check_ceiling(chunk_ceiling)?;
    let layout = BuildLayout::new(build_dir);

    let source = PgRowSource::connect(db_dsn).await?;

    let spinner = create_spinner("Packing chunks...");
    let result = pipeline::build(&source, &layout, chunk_ceiling).await;
    spinner.finish_and_clear();
    let summary = result?;

    println!("{} Build complete", "✓".green().bold());
    println!();
    println!("{}", "Summary:".cyan().bold());
    println!("  Chunks:   {}", summary.chunks);
    println!("  Records:  {}", summary.records);
    println!("  Size:     {}", format_bytes(summary.bytes));
    println!("  Manifest: {}", summary.manifest_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensda_common::types::DEFAULT_CHUNK_CEILING;

    #[test]
    fn test_check_ceiling() {
        assert!(check_ceiling(DEFAULT_CHUNK_CEILING).is_ok());
        assert!(check_ceiling(LEDGER_BLOB_LIMIT - 1).is_ok());
        assert!(check_ceiling(LEDGER_BLOB_LIMIT).is_err());
        assert!(check_ceiling(0).is_err());
    }
}
