//! SQLite-backed stores for the import pipeline and statistics.
//!
//! Every call opens its own connection and drops it before returning.
//! Nothing is shared between calls.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use super::repository;
use super::sqlite::open_database;
use super::{ClassAverages, ClassCount, DatabaseError};
use crate::models::{ClassCode, DiagnosisClass, NewExam, NewPatient};
use crate::pipeline::import::RecordStore;
use crate::statistics::StatisticsStore;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection. Closed when the returned value drops.
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        open_database(&self.path)
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let conn = self.connect()?;
        f(&conn)
    }
}

impl RecordStore for SqliteStore {
    fn insert_patient(&self, patient: &NewPatient) -> Result<i64, DatabaseError> {
        self.with_conn(|conn| repository::insert_patient(conn, patient))
    }

    fn insert_exam(&self, exam: &NewExam) -> Result<i64, DatabaseError> {
        self.with_conn(|conn| repository::insert_exam(conn, exam))
    }

    fn find_class_by_code(&self, code: ClassCode) -> Result<Option<DiagnosisClass>, DatabaseError> {
        self.with_conn(|conn| repository::find_diagnosis_class_by_code(conn, code))
    }
}

impl StatisticsStore for SqliteStore {
    fn count_exams_by_class(&self) -> Result<Vec<ClassCount>, DatabaseError> {
        self.with_conn(repository::count_exams_by_class)
    }

    fn average_indicators_by_class(&self) -> Result<Vec<ClassAverages>, DatabaseError> {
        self.with_conn(repository::average_indicators_by_class)
    }

    fn count_patients(&self) -> Result<i64, DatabaseError> {
        self.with_conn(repository::count_patients)
    }

    fn count_exams(&self) -> Result<i64, DatabaseError> {
        self.with_conn(repository::count_exams)
    }
}
