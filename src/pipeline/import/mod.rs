//! Bulk CSV import.
//!
//! ```text
//! source text → parser → rows → { synth (patient), mapper (exam) } → writer → store
//! ```
//!
//! Row-local defects (short lines, unparsable numbers, unknown labels,
//! per-row storage failures) never abort a run. Failing to read the
//! source does.

pub mod parser;
pub mod synth;
pub mod mapper;
pub mod traits;
pub mod writer;
pub mod importer;
pub mod background;

pub use parser::*;
pub use synth::*;
pub use mapper::*;
pub use traits::*;
pub use writer::*;
pub use importer::*;
pub use background::{join_import, spawn_import, ProgressFn};

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not read delimited source: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("An import is already running ({source_name})")]
    AlreadyRunning { source_name: String },

    #[error("Import task failed: {0}")]
    TaskFailed(String),
}
