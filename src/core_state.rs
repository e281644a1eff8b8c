//! Shared application state.
//!
//! Holds where the database lives and the import single-flight service.
//! It never holds a connection: every operation opens its own through
//! `open_db()` or `store()` and drops it when done.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{self, ImportConfig};
use crate::db::{self, SqliteStore};
use crate::import_service::ImportService;

pub struct CoreState {
    db_path: PathBuf,
    import_config: ImportConfig,
    imports: Arc<ImportService>,
}

impl CoreState {
    /// State rooted at the configured database path.
    pub fn new() -> Self {
        Self::with_db_path(config::database_path())
    }

    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            import_config: ImportConfig::default(),
            imports: Arc::new(ImportService::new()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Create the database directory if it is missing.
    pub fn ensure_data_dir(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| CoreError::DataDir {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })?;
                tracing::info!(path = %parent.display(), "Created data directory");
            }
        }
        Ok(())
    }

    /// Open a connection for one operation. Migrations run on open.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        self.ensure_data_dir()?;
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    /// Store handle for the pipeline and statistics. Opens per call.
    pub fn store(&self) -> Result<SqliteStore, CoreError> {
        self.ensure_data_dir()?;
        Ok(SqliteStore::new(&self.db_path))
    }

    pub fn import_config(&self) -> &ImportConfig {
        &self.import_config
    }

    pub fn imports(&self) -> &Arc<ImportService> {
        &self.imports
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Cannot create data directory {path:?}: {reason}")]
    DataDir { path: PathBuf, reason: String },
}
