//! `lensda submit` command implementation
//!
//! Runs the scheduler over the manifest until every planned chunk is final.
//! Ctrl-C cancels the run; committed progress is kept for the next run.

use crate::commands::load_manifest;
use crate::error::Result;
use crate::progress::{create_spinner, format_bytes};
use crate::SubmitArgs;
use colored::Colorize;
use lensda_common::layout::BuildLayout;
use lensda_submit::{
    HttpLedger, ProgressLog, SchedulerSettings, SubmissionScheduler, SubmitConfig,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Configuration from the environment with command-line flags taking precedence
pub fn load_config(build_dir: &Path, args: &SubmitArgs) -> Result<SubmitConfig> {
    let mut overrides: HashMap<&str, String> = HashMap::new();
    overrides.insert("BUILD_DIR", build_dir.display().to_string());
    if let Some(target) = args.target {
        overrides.insert("LEDGER_TARGET", target.to_string());
    }
    if let Some(concurrency) = args.concurrency {
        overrides.insert("CONCURRENCY", concurrency.to_string());
    }
    if let Some(max_qps) = args.max_qps {
        overrides.insert("MAX_QPS", max_qps.to_string());
    }
    if let Some(max_total_bytes) = args.max_total_bytes {
        overrides.insert("MAX_TOTAL_BYTES", max_total_bytes.to_string());
    }

    let config = SubmitConfig::from_lookup(|key| {
        overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    })?;
    Ok(config)
}

pub async fn run(build_dir: &Path, args: &SubmitArgs, shutdown: CancellationToken) -> Result<()> {
    let config = load_config(build_dir, args)?;
    let layout = BuildLayout::new(&config.build_dir);
    let manifest = load_manifest(&layout)?;
    let mut progress = ProgressLog::open(layout.progress_path())?;

    println!(
        "{} Submitting {} chunks ({}) to {}",
        "↑".cyan(),
        manifest.len(),
        format_bytes(manifest.total_bytes()),
        config.target.to_string().bold()
    );
    if !progress.is_empty() {
        println!("  Resuming: {} chunks already committed", progress.len());
    }

    let ledger = Arc::new(HttpLedger::from_config(&config)?);
    let scheduler = SubmissionScheduler::new(ledger, SchedulerSettings::from_config(&config))
        .with_shutdown(shutdown);

    let spinner = create_spinner("Waiting for finality...");
    let result = scheduler.run(&manifest, &mut progress).await;
    spinner.finish_and_clear();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            println!(
                "{} Stopped after {} committed chunks; rerun to resume",
                "✗".red().bold(),
                progress.len()
            );
            return Err(e.into());
        }
    };

    println!("{} Submission complete", "✓".green().bold());
    println!();
    println!("{}", "Summary:".cyan().bold());
    println!("  Committed:    {}", summary.committed);
    println!("  Already done: {}", summary.already_done);
    println!("  Deferred:     {}", summary.deferred);
    println!("  Size:         {}", format_bytes(summary.bytes));
    println!("  Progress log: {}", progress.path().display());

    Ok(())
}
