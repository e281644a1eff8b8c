use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_date, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

/// Rows per transaction in `insert_exams_chunked`.
pub const BULK_CHUNK_SIZE: usize = 100;

const EXAM_SELECT: &str =
    "SELECT e.id, e.patient_id, e.exam_date, e.pelvic_incidence, e.pelvic_tilt,
            e.lumbar_lordosis_angle, e.sacral_slope, e.pelvic_radius, e.degree_spondylolisthesis,
            e.class_id, e.notes, e.created_at, p.name, d.code, d.description
     FROM exams e
     JOIN patients p ON e.patient_id = p.id
     JOIN diagnosis_classes d ON e.class_id = d.id";

/// Insert an exam and return its assigned id.
///
/// The patient and class references must exist; the foreign keys reject
/// anything else, including `UNRESOLVED_CLASS_ID`.
pub fn insert_exam(conn: &Connection, exam: &NewExam) -> Result<i64, DatabaseError> {
    let ind = &exam.indicators;
    conn.execute(
        "INSERT INTO exams (patient_id, exam_date, pelvic_incidence, pelvic_tilt,
                            lumbar_lordosis_angle, sacral_slope, pelvic_radius,
                            degree_spondylolisthesis, class_id, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            exam.patient_id,
            exam.exam_date.to_string(),
            ind.pelvic_incidence,
            ind.pelvic_tilt,
            ind.lumbar_lordosis_angle,
            ind.sacral_slope,
            ind.pelvic_radius,
            ind.degree_spondylolisthesis,
            exam.class_id,
            exam.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert pre-built exams in transactions of `chunk_size` rows.
///
/// Each chunk commits or rolls back as a whole. Chunks before a failing one
/// stay committed; the error reports how many rows that was.
pub fn insert_exams_chunked(
    conn: &Connection,
    exams: &[NewExam],
    chunk_size: usize,
) -> Result<usize, DatabaseError> {
    let chunk_size = chunk_size.max(1);
    let mut committed = 0;

    for (chunk_index, chunk) in exams.chunks(chunk_size).enumerate() {
        let tx = conn.unchecked_transaction()?;

        let outcome = chunk
            .iter()
            .try_for_each(|exam| insert_exam(&tx, exam).map(|_| ()));

        match outcome {
            Ok(()) => {
                tx.commit()?;
                committed += chunk.len();
                tracing::debug!(chunk_index, rows = chunk.len(), committed, "Bulk chunk committed");
            }
            Err(e) => {
                tx.rollback()?;
                tracing::warn!(chunk_index, committed, error = %e, "Bulk chunk rolled back");
                return Err(DatabaseError::ChunkFailed {
                    committed,
                    chunk_index,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(committed)
}

pub fn get_exam(conn: &Connection, id: i64) -> Result<Option<Exam>, DatabaseError> {
    let row = conn
        .query_row(&format!("{EXAM_SELECT} WHERE e.id = ?1"), params![id], read_exam_row)
        .optional()?;
    row.map(exam_from_row).transpose()
}

/// All exams, most recent exam date first.
pub fn list_exams(conn: &Connection) -> Result<Vec<Exam>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{EXAM_SELECT} ORDER BY e.exam_date DESC, e.id DESC"))?;
    let rows = stmt.query_map([], read_exam_row)?;
    rows.map(|r| exam_from_row(r?)).collect()
}

pub fn list_exams_by_patient(conn: &Connection, patient_id: i64) -> Result<Vec<Exam>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{EXAM_SELECT} WHERE e.patient_id = ?1 ORDER BY e.exam_date DESC, e.id DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id], read_exam_row)?;
    rows.map(|r| exam_from_row(r?)).collect()
}

pub fn list_exams_by_class(conn: &Connection, class_id: i64) -> Result<Vec<Exam>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{EXAM_SELECT} WHERE e.class_id = ?1 ORDER BY e.exam_date DESC, e.id DESC"
    ))?;
    let rows = stmt.query_map(params![class_id], read_exam_row)?;
    rows.map(|r| exam_from_row(r?)).collect()
}

pub fn update_exam(conn: &Connection, id: i64, exam: &NewExam) -> Result<(), DatabaseError> {
    let ind = &exam.indicators;
    let updated = conn.execute(
        "UPDATE exams SET patient_id = ?1, exam_date = ?2, pelvic_incidence = ?3, pelvic_tilt = ?4,
                          lumbar_lordosis_angle = ?5, sacral_slope = ?6, pelvic_radius = ?7,
                          degree_spondylolisthesis = ?8, class_id = ?9, notes = ?10
         WHERE id = ?11",
        params![
            exam.patient_id,
            exam.exam_date.to_string(),
            ind.pelvic_incidence,
            ind.pelvic_tilt,
            ind.lumbar_lordosis_angle,
            ind.sacral_slope,
            ind.pelvic_radius,
            ind.degree_spondylolisthesis,
            exam.class_id,
            exam.notes,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Exam".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_exam(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM exams WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Exam".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn count_exams(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM exams", [], |row| row.get(0))?)
}

struct ExamRow {
    id: i64,
    patient_id: i64,
    exam_date: String,
    indicators: [f64; INDICATOR_COUNT],
    class_id: i64,
    notes: Option<String>,
    created_at: String,
    patient_name: String,
    class_code: String,
    class_description: String,
}

fn read_exam_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExamRow> {
    Ok(ExamRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        exam_date: row.get(2)?,
        indicators: [
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
        ],
        class_id: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        patient_name: row.get(12)?,
        class_code: row.get(13)?,
        class_description: row.get(14)?,
    })
}

fn exam_from_row(row: ExamRow) -> Result<Exam, DatabaseError> {
    Ok(Exam {
        id: row.id,
        patient_id: row.patient_id,
        exam_date: parse_date(&row.exam_date).ok_or_else(|| {
            DatabaseError::ConstraintViolation(format!("invalid exam date: {}", row.exam_date))
        })?,
        indicators: Indicators::from_array(row.indicators),
        class_id: row.class_id,
        notes: row.notes,
        created_at: parse_timestamp(&row.created_at)?,
        patient_name: row.patient_name,
        class_code: row.class_code,
        class_description: row.class_description,
    })
}
