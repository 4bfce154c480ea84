//! `lensda verify` command implementation
//!
//! Recomputes the digest and length of every chunk file listed in the manifest.

use crate::commands::load_manifest;
use crate::error::{CliError, Result};
use crate::progress::create_progress_bar;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use lensda_common::checksum::compute_file_digest;
use lensda_common::layout::BuildLayout;
use lensda_common::manifest::ManifestEntry;
use std::path::Path;
use tracing::warn;

/// Why a chunk failed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkProblem {
    Missing,
    LengthMismatch { expected: u64, actual: u64 },
    DigestMismatch { actual: String },
}

impl std::fmt::Display for ChunkProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkProblem::Missing => write!(f, "file missing"),
            ChunkProblem::LengthMismatch { expected, actual } => {
                write!(f, "expected {} bytes, found {}", expected, actual)
            }
            ChunkProblem::DigestMismatch { actual } => write!(f, "digest {}", actual),
        }
    }
}

/// Check one chunk file against its manifest entry
pub fn check_chunk(entry: &ManifestEntry) -> Result<Option<ChunkProblem>> {
    let path = Path::new(&entry.storage_location);
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Some(ChunkProblem::Missing))
        }
        Err(e) => return Err(CliError::Archive(e.into())),
    };
    if metadata.len() != entry.byte_length {
        return Ok(Some(ChunkProblem::LengthMismatch {
            expected: entry.byte_length,
            actual: metadata.len(),
        }));
    }

    let actual = compute_file_digest(path)?;
    if actual.eq_ignore_ascii_case(&entry.content_digest) {
        Ok(None)
    } else {
        Ok(Some(ChunkProblem::DigestMismatch { actual }))
    }
}

pub async fn run(build_dir: &Path) -> Result<()> {
    let layout = BuildLayout::new(build_dir);
    let manifest = load_manifest(&layout)?;

    let pb = create_progress_bar(manifest.len() as u64, "Verifying chunks");
    let mut failures = Vec::new();
    for entry in manifest.iter() {
        if let Some(problem) = check_chunk(entry)? {
            warn!(chunk_id = entry.chunk_id, problem = %problem, "Chunk failed verification");
            failures.push((entry.chunk_id, entry.storage_location.clone(), problem));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if failures.is_empty() {
        println!(
            "{} All {} chunks match the manifest",
            "✓".green().bold(),
            manifest.len()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Chunk", "Path", "Problem"]);
    for (chunk_id, location, problem) in &failures {
        table.add_row(vec![chunk_id.to_string(), location.clone(), problem.to_string()]);
    }
    println!("{}", "Verification failures:".red().bold());
    println!("{}", table);

    Err(CliError::VerificationFailed {
        failed: failures.len(),
        total: manifest.len(),
    })
}
