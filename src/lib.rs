pub mod cli;
pub mod config;
pub mod core_state;
pub mod db;
pub mod import_service; // single-flight guard for CSV imports
pub mod models;
pub mod pipeline;
pub mod records; // direct-entry validation
pub mod statistics;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub async fn run() -> ExitCode {
    let cli = cli::Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let state = match cli.db {
        Some(path) => core_state::CoreState::with_db_path(path),
        None => core_state::CoreState::new(),
    };
    tracing::debug!(db = %state.db_path().display(), "Using database");

    let mut stdout = std::io::stdout().lock();
    match cli::execute(&state, cli.command, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
