//! Run an import off the caller's thread.
//!
//! The import itself is blocking (file read + one connection per insert),
//! so it runs on tokio's blocking pool. The single-flight guard moves into
//! the task and is released when the task ends, whatever the outcome.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::importer::ImportPipeline;
use super::traits::RecordStore;
use super::writer::{ImportProgress, ImportSummary};
use super::ImportError;
use crate::config::ImportConfig;
use crate::import_service::ImportService;

/// Shared progress callback for background runs.
pub type ProgressFn = Arc<dyn Fn(ImportProgress) + Send + Sync>;

/// Start an import of `source` in the background.
///
/// Fails immediately with `AlreadyRunning` if another import holds the
/// service. The returned handle yields the run summary, or the fatal
/// error that aborted it.
pub fn spawn_import(
    service: &Arc<ImportService>,
    source: PathBuf,
    store: Arc<dyn RecordStore>,
    config: ImportConfig,
    progress: Option<ProgressFn>,
) -> Result<JoinHandle<Result<ImportSummary, ImportError>>, ImportError> {
    let Some(guard) = service.try_acquire(&source) else {
        if let Some(active) = service.current_import() {
            tracing::warn!(
                requested = %source.display(),
                running = %active.source.display(),
                since = %active.started_at,
                "Import refused, another import is running"
            );
        }
        return Err(ImportError::AlreadyRunning {
            source_name: source.display().to_string(),
        });
    };

    tracing::info!(source = %source.display(), "Background import scheduled");

    let handle = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let mut pipeline = ImportPipeline::new(config);
        let progress_ref = progress.as_deref().map(|p| p as &dyn Fn(ImportProgress));
        let result = pipeline.import_file(&source, store.as_ref(), progress_ref);
        if let Err(e) = &result {
            tracing::error!(source = %source.display(), error = %e, "Background import failed");
        }
        result
    });

    Ok(handle)
}

/// Await a background import, folding a panicked or cancelled task into
/// `ImportError::TaskFailed`.
pub async fn join_import(
    handle: JoinHandle<Result<ImportSummary, ImportError>>,
) -> Result<ImportSummary, ImportError> {
    handle
        .await
        .map_err(|e| ImportError::TaskFailed(e.to_string()))?
}
