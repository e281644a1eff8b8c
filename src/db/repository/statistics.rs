use std::str::FromStr;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::models::*;

/// Exam count for one diagnosis class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCount {
    pub code: ClassCode,
    pub description: String,
    pub count: i64,
}

/// Per-indicator means for one diagnosis class, in `INDICATOR_NAMES` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAverages {
    pub code: ClassCode,
    pub description: String,
    pub averages: [f64; INDICATOR_COUNT],
}

/// Exams per class. Classes without exams are absent.
pub fn count_exams_by_class(conn: &Connection) -> Result<Vec<ClassCount>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.code, d.description, COUNT(*) AS cnt
         FROM exams e
         JOIN diagnosis_classes d ON e.class_id = d.id
         GROUP BY d.id, d.code, d.description
         ORDER BY cnt DESC, d.description",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut counts = Vec::new();
    for row in rows {
        let (code, description, count) = row?;
        counts.push(ClassCount {
            code: ClassCode::from_str(&code)?,
            description,
            count,
        });
    }
    Ok(counts)
}

/// Mean of every indicator per class. Classes without exams are absent.
pub fn average_indicators_by_class(conn: &Connection) -> Result<Vec<ClassAverages>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.code, d.description,
                AVG(e.pelvic_incidence), AVG(e.pelvic_tilt), AVG(e.lumbar_lordosis_angle),
                AVG(e.sacral_slope), AVG(e.pelvic_radius), AVG(e.degree_spondylolisthesis)
         FROM exams e
         JOIN diagnosis_classes d ON e.class_id = d.id
         GROUP BY d.id, d.code, d.description
         ORDER BY d.description",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            [
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, f64>(7)?,
            ],
        ))
    })?;

    let mut averages = Vec::new();
    for row in rows {
        let (code, description, values) = row?;
        averages.push(ClassAverages {
            code: ClassCode::from_str(&code)?,
            description,
            averages: values,
        });
    }
    Ok(averages)
}
