//! Direct-entry patients and exams.
//!
//! The form path validates before persisting. The import path does not go
//! through here: it trusts synthesized patients and may carry an unresolved
//! class id that the store then rejects.

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::models::{NewExam, NewPatient, Patient, Sex};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Patient name must not be blank")]
    BlankName,
    #[error("Sex must be M or F, got {0:?}")]
    InvalidSex(String),
    #[error("A patient must be selected")]
    MissingPatient,
    #[error("A diagnosis class must be selected")]
    MissingClass,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Parse a sex field from a form. Blank means not recorded.
pub fn parse_sex(raw: &str) -> Result<Option<Sex>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.to_ascii_uppercase()
        .parse::<Sex>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidSex(raw.to_string()))
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::BlankName);
    }
    Ok(())
}

pub fn validate_exam(exam: &NewExam) -> Result<(), ValidationError> {
    if exam.patient_id <= 0 {
        return Err(ValidationError::MissingPatient);
    }
    if exam.class_id <= 0 {
        return Err(ValidationError::MissingClass);
    }
    Ok(())
}

pub fn add_patient(conn: &Connection, patient: &NewPatient) -> Result<i64, RecordError> {
    validate_name(&patient.name)?;
    let id = db::insert_patient(conn, patient)?;
    tracing::info!(patient_id = id, "Patient added");
    Ok(id)
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), RecordError> {
    validate_name(&patient.name)?;
    db::update_patient(conn, patient)?;
    Ok(())
}

pub fn add_exam(conn: &Connection, exam: &NewExam) -> Result<i64, RecordError> {
    validate_exam(exam)?;
    let id = db::insert_exam(conn, exam)?;
    tracing::info!(exam_id = id, patient_id = exam.patient_id, "Exam added");
    Ok(id)
}

pub fn update_exam(conn: &Connection, id: i64, exam: &NewExam) -> Result<(), RecordError> {
    validate_exam(exam)?;
    db::update_exam(conn, id, exam)?;
    Ok(())
}
