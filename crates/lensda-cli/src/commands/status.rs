//! `lensda status` command implementation
//!
//! Reads the manifest and the progress log without modifying either.

use crate::commands::load_manifest;
use crate::error::Result;
use crate::progress::format_bytes;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use lensda_common::layout::BuildLayout;
use lensda_common::manifest::Manifest;
use lensda_common::types::Reference;
use lensda_submit::ProgressSnapshot;
use std::path::Path;

/// Submission state of a build directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub chunks: usize,
    pub committed: usize,
    pub remaining: usize,
    pub total_bytes: u64,
    pub committed_bytes: u64,
    /// Lowest chunk id not yet committed
    pub next_chunk: Option<u64>,
    pub skipped_lines: usize,
}

impl StatusReport {
    pub fn new(manifest: &Manifest, progress: &ProgressSnapshot) -> Self {
        let mut committed = 0;
        let mut committed_bytes = 0;
        let mut next_chunk = None;

        for entry in manifest.iter() {
            if progress.done.contains(&entry.chunk_id) {
                committed += 1;
                committed_bytes += entry.byte_length;
            } else if next_chunk.is_none() {
                next_chunk = Some(entry.chunk_id);
            }
        }

        Self {
            chunks: manifest.len(),
            committed,
            remaining: manifest.len() - committed,
            total_bytes: manifest.total_bytes(),
            committed_bytes,
            next_chunk,
            skipped_lines: progress.skipped_lines,
        }
    }
}

fn reference_text(reference: Option<&Reference>) -> String {
    reference.map_or_else(|| "-".to_string(), Reference::to_string)
}

pub async fn run(build_dir: &Path) -> Result<()> {
    let layout = BuildLayout::new(build_dir);
    let manifest = load_manifest(&layout)?;
    let progress = ProgressSnapshot::load(layout.progress_path())?;
    let report = StatusReport::new(&manifest, &progress);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.add_row(vec!["Chunks".to_string(), report.chunks.to_string()]);
    table.add_row(vec![
        "Committed".to_string(),
        format!("{} ({})", report.committed, format_bytes(report.committed_bytes)),
    ]);
    table.add_row(vec!["Remaining".to_string(), report.remaining.to_string()]);
    table.add_row(vec!["Total size".to_string(), format_bytes(report.total_bytes)]);
    table.add_row(vec![
        "Next chunk".to_string(),
        report
            .next_chunk
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);

    println!("{}", "Submission Status:".cyan().bold());
    println!("{}", table);

    if let Some(ref last) = progress.last {
        println!();
        println!("{}", "Last committed:".cyan().bold());
        println!("  Chunk:       {}", last.chunk_id);
        println!("  Submission:  {}", last.submission_id);
        println!("  Block:       {}", reference_text(last.block_reference.as_ref()));
        println!(
            "  Transaction: {}",
            reference_text(last.transaction_reference.as_ref())
        );
        println!("  Uploaded:    {}", last.uploaded_at.to_rfc3339());
    }

    if report.skipped_lines > 0 {
        println!();
        println!(
            "{} {} unreadable progress lines ignored",
            "!".yellow().bold(),
            report.skipped_lines
        );
    }

    if report.remaining == 0 {
        println!();
        println!("{} All chunks committed", "✓".green().bold());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensda_common::manifest::ManifestEntry;

    fn manifest(count: u64) -> Manifest {
        Manifest::from_entries(
            (1..=count)
                .map(|chunk_id| ManifestEntry {
                    chunk_id,
                    content_digest: format!("{:064x}", chunk_id),
                    byte_length: 100,
                    storage_location: format!("chunks/{:07}.bin", chunk_id),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_report_counts() {
        let progress = ProgressSnapshot {
            done: [1, 2, 4].into_iter().collect(),
            ..ProgressSnapshot::default()
        };
        let report = StatusReport::new(&manifest(5), &progress);

        assert_eq!(report.chunks, 5);
        assert_eq!(report.committed, 3);
        assert_eq!(report.remaining, 2);
        assert_eq!(report.committed_bytes, 300);
        assert_eq!(report.next_chunk, Some(3));
    }

    #[test]
    fn test_report_ignores_ids_outside_manifest() {
        let progress = ProgressSnapshot {
            done: [1, 2, 9].into_iter().collect(),
            ..ProgressSnapshot::default()
        };
        let report = StatusReport::new(&manifest(2), &progress);

        assert_eq!(report.committed, 2);
        assert_eq!(report.remaining, 0);
        assert_eq!(report.next_chunk, None);
    }
}
