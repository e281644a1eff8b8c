//! Persistence boundary consumed by the import pipeline.

use crate::db::DatabaseError;
use crate::models::{ClassCode, DiagnosisClass, NewExam, NewPatient};

/// Writes and reference lookups needed to import rows.
///
/// Each call stands alone: no transaction spans two calls.
pub trait RecordStore: Send + Sync {
    /// Insert a patient and return the assigned id.
    fn insert_patient(&self, patient: &NewPatient) -> Result<i64, DatabaseError>;

    /// Insert an exam and return the assigned id.
    fn insert_exam(&self, exam: &NewExam) -> Result<i64, DatabaseError>;

    /// Look up a diagnosis class by code; `Ok(None)` when it is not in the reference table.
    fn find_class_by_code(&self, code: ClassCode) -> Result<Option<DiagnosisClass>, DatabaseError>;
}
