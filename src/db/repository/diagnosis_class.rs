use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn get_diagnosis_class(conn: &Connection, id: i64) -> Result<Option<DiagnosisClass>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, code, description FROM diagnosis_classes WHERE id = ?1",
            params![id],
            read_class_row,
        )
        .optional()?;
    row.map(class_from_row).transpose()
}

pub fn find_diagnosis_class_by_code(
    conn: &Connection,
    code: ClassCode,
) -> Result<Option<DiagnosisClass>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, code, description FROM diagnosis_classes WHERE code = ?1",
            params![code.as_str()],
            read_class_row,
        )
        .optional()?;
    row.map(class_from_row).transpose()
}

pub fn list_diagnosis_classes(conn: &Connection) -> Result<Vec<DiagnosisClass>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, code, description FROM diagnosis_classes ORDER BY id")?;
    let rows = stmt.query_map([], read_class_row)?;
    rows.map(|r| class_from_row(r?)).collect()
}

type ClassRow = (i64, String, String);

fn read_class_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClassRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn class_from_row((id, code, description): ClassRow) -> Result<DiagnosisClass, DatabaseError> {
    Ok(DiagnosisClass {
        id,
        code: ClassCode::from_str(&code)?,
        description,
    })
}
