use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_date, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, name, sex, birth_date, phone, created_at";

/// Insert a patient and return its assigned id.
pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (name, sex, birth_date, phone) VALUES (?1, ?2, ?3, ?4)",
        params![
            patient.name,
            patient.sex.map(|s| s.as_str()),
            patient.birth_date.map(|d| d.to_string()),
            patient.phone,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            read_patient_row,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// All patients, newest first.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY id DESC"
    ))?;
    let rows = stmt.query_map([], read_patient_row)?;
    rows.map(|r| patient_from_row(r?)).collect()
}

/// Substring match on name, newest first. A blank query lists everyone.
pub fn search_patients_by_name(conn: &Connection, query: &str) -> Result<Vec<Patient>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return list_patients(conn);
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE name LIKE ?1 ORDER BY id DESC"
    ))?;
    let rows = stmt.query_map(params![format!("%{query}%")], read_patient_row)?;
    rows.map(|r| patient_from_row(r?)).collect()
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET name = ?1, sex = ?2, birth_date = ?3, phone = ?4 WHERE id = ?5",
        params![
            patient.name,
            patient.sex.map(|s| s.as_str()),
            patient.birth_date.map(|d| d.to_string()),
            patient.phone,
            patient.id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

/// Delete a patient. Their exams go with them (ON DELETE CASCADE).
pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        });
    }
    tracing::info!(patient_id = id, "Patient deleted");
    Ok(())
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
}

type PatientRow = (i64, String, Option<String>, Option<String>, Option<String>, String);

fn read_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (id, name, sex, birth_date, phone, created_at) = row;
    Ok(Patient {
        id,
        name,
        sex: sex.as_deref().map(Sex::from_str).transpose()?,
        birth_date: birth_date.as_deref().and_then(parse_date),
        phone,
        created_at: parse_timestamp(&created_at)?,
    })
}
