//! Lens DA CLI - Main entry point

use clap::Parser;
use lensda_cli::{Cli, Commands};
use lensda_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed flags
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .output(LogOutput::Console)
        .log_file_prefix("lensda")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().with_env().unwrap_or(log_config);

    // The CLI works without logging; keep the guard so file output is flushed
    let _log_guard = init_logging(&log_config).ok().flatten();

    if let Err(e) = execute_command(&cli).await {
        if e.is_cancelled() {
            eprintln!("Interrupted. Committed progress is kept; rerun to resume.");
        } else {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
        }
        process::exit(e.exit_code());
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> lensda_cli::Result<()> {
    match &cli.command {
        Commands::Build {
            db_dsn,
            chunk_ceiling,
        } => lensda_cli::commands::build::run(&cli.build_dir, db_dsn, *chunk_ceiling).await,

        Commands::Submit(args) => {
            lensda_cli::commands::submit::run(&cli.build_dir, args, shutdown_on_ctrl_c()).await
        }

        Commands::Status => lensda_cli::commands::status::run(&cli.build_dir).await,

        Commands::Verify => lensda_cli::commands::verify::run(&cli.build_dir).await,
    }
}

/// Token cancelled on the first Ctrl-C
fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            signal.cancel();
        }
    });
    shutdown
}
