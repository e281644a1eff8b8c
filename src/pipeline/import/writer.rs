//! Batch writer: persist one patient + one exam per row.
//!
//! Rows are independent. A failing row is logged and skipped; it never
//! stops the run. There is no transaction across the two inserts of a row,
//! so a row whose exam insert fails leaves its patient behind.

use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use super::mapper::ExamMapper;
use super::parser::Row;
use super::synth::PatientSynthesizer;
use super::traits::RecordStore;
use crate::db::DatabaseError;

/// Progress after one row attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    /// Rows attempted so far (1-based).
    pub current: usize,
    pub total: usize,
}

/// A row that could not be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// 1-based position among the accepted rows.
    pub row: usize,
    /// Line in the source text.
    pub line: u64,
    /// Patient id when the patient insert succeeded before the failure.
    pub orphan_patient_id: Option<i64>,
    pub error: String,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub run_id: Uuid,
    /// Rows that passed the length filter.
    pub attempted: usize,
    /// Rows whose patient and exam were both persisted.
    pub imported: usize,
    pub failures: Vec<RowFailure>,
    pub duration_ms: u64,
}

impl ImportSummary {
    pub fn empty() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            attempted: 0,
            imported: 0,
            failures: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Persist every row in order.
///
/// `progress` fires after each attempt, failed or not, with strictly
/// increasing `current` ending at `rows.len()`.
pub fn write_rows<P: Rng, E: Rng>(
    rows: &[Row],
    store: &dyn RecordStore,
    synthesizer: &mut PatientSynthesizer<P>,
    mapper: &mut ExamMapper<E>,
    progress_fn: Option<&dyn Fn(ImportProgress)>,
) -> ImportSummary {
    let start = Instant::now();
    let mut summary = ImportSummary::empty();
    let total = rows.len();
    summary.attempted = total;

    tracing::info!(run_id = %summary.run_id, total, "Import run started");

    for (i, row) in rows.iter().enumerate() {
        let mut orphan_patient_id = None;

        match write_row(row, store, synthesizer, mapper, &mut orphan_patient_id) {
            Ok(exam_id) => {
                summary.imported += 1;
                tracing::trace!(row = i + 1, exam_id, "Row imported");
            }
            Err(e) => {
                tracing::warn!(
                    row = i + 1,
                    line = row.line,
                    orphan_patient_id = ?orphan_patient_id,
                    error = %e,
                    "Failed to import row"
                );
                summary.failures.push(RowFailure {
                    row: i + 1,
                    line: row.line,
                    orphan_patient_id,
                    error: e.to_string(),
                });
            }
        }

        if let Some(progress) = progress_fn {
            progress(ImportProgress {
                current: i + 1,
                total,
            });
        }
    }

    summary.duration_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        run_id = %summary.run_id,
        imported = summary.imported,
        failed = summary.failures.len(),
        duration_ms = summary.duration_ms,
        "Import run finished"
    );

    summary
}

fn write_row<P: Rng, E: Rng>(
    row: &Row,
    store: &dyn RecordStore,
    synthesizer: &mut PatientSynthesizer<P>,
    mapper: &mut ExamMapper<E>,
    orphan_patient_id: &mut Option<i64>,
) -> Result<i64, DatabaseError> {
    let patient = synthesizer.next_patient();
    let patient_id = store.insert_patient(&patient)?;
    *orphan_patient_id = Some(patient_id);

    let exam = mapper.map_row(row, patient_id, store)?;
    let exam_id = store.insert_exam(&exam)?;
    *orphan_patient_id = None;

    Ok(exam_id)
}
