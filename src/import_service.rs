//! Single-flight access to the import pipeline.
//!
//! Only one CSV import may run at a time. A second request while one is in
//! flight is refused rather than queued.
//!
//! - `ImportService` lives in `CoreState` (shared via `Arc`)
//! - `try_acquire()` hands out an owned guard, or `None` when busy
//! - `current_import()` reports which file is being imported and since when

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Snapshot of the running import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveImport {
    pub source: PathBuf,
    /// ISO 8601.
    pub started_at: String,
}

#[derive(Debug, Default)]
pub struct ImportService {
    busy: AtomicBool,
    current: Mutex<Option<ActiveImport>>,
}

impl ImportService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the pipeline without blocking.
    ///
    /// The guard is owned so it can travel into a background task. Dropping
    /// it frees the pipeline and clears the current import.
    pub fn try_acquire(self: &Arc<Self>, source: &Path) -> Option<ImportGuard> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(source = %source.display(), "Import refused, pipeline busy");
            return None;
        }
        self.set_current(source);
        Some(ImportGuard {
            service: Arc::clone(self),
        })
    }

    /// `None` when idle.
    pub fn current_import(&self) -> Option<ActiveImport> {
        self.current.lock().ok()?.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn set_current(&self, source: &Path) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(ActiveImport {
                source: source.to_path_buf(),
                started_at: chrono::Utc::now().to_rfc3339(),
            });
        }
    }

    fn release(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
        self.busy.store(false, Ordering::Release);
    }
}

/// RAII token for the running import.
pub struct ImportGuard {
    service: Arc<ImportService>,
}

impl Drop for ImportGuard {
    fn drop(&mut self) {
        self.service.release();
    }
}
