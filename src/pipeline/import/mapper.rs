//! Record mapper: one parsed row + patient id → one exam.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::parser::Row;
use super::synth::random_date;
use super::traits::RecordStore;
use crate::config::DateWindow;
use crate::db::DatabaseError;
use crate::models::*;

/// Field index of the class label.
pub const LABEL_FIELD: usize = INDICATOR_COUNT;

/// Parse one indicator. Anything unparsable becomes 0.0.
pub fn parse_indicator(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

/// Read the six positional indicators of a row.
pub fn parse_indicators(row: &Row) -> Indicators {
    let mut values = [0.0; INDICATOR_COUNT];
    for (i, value) in values.iter_mut().enumerate() {
        *value = parse_indicator(row.field(i));
    }
    Indicators::from_array(values)
}

/// Resolve a row label to a class id, or `UNRESOLVED_CLASS_ID` when the
/// mapped code has no reference row.
pub fn resolve_class_id(store: &dyn RecordStore, label: &str) -> Result<i64, DatabaseError> {
    let code = ClassCode::from_label(label);
    match store.find_class_by_code(code)? {
        Some(class) => Ok(class.id),
        None => {
            tracing::warn!(label, code = code.as_str(), "Diagnosis class missing from reference data");
            Ok(UNRESOLVED_CLASS_ID)
        }
    }
}

/// Builds exams from rows. The exam date is synthesized, not read from the row.
pub struct ExamMapper<R> {
    rng: R,
    exam_window: DateWindow,
    notes: String,
}

impl ExamMapper<StdRng> {
    pub fn from_entropy(exam_window: DateWindow, notes: impl Into<String>) -> Self {
        Self::new(StdRng::from_entropy(), exam_window, notes)
    }

    pub fn seeded(seed: u64, exam_window: DateWindow, notes: impl Into<String>) -> Self {
        Self::new(StdRng::seed_from_u64(seed), exam_window, notes)
    }
}

impl<R: Rng> ExamMapper<R> {
    pub fn new(rng: R, exam_window: DateWindow, notes: impl Into<String>) -> Self {
        Self {
            rng,
            exam_window,
            notes: notes.into(),
        }
    }

    /// Map a row with an already-resolved class id. Never fails.
    pub fn build_exam(&mut self, row: &Row, patient_id: i64, class_id: i64) -> NewExam {
        NewExam {
            patient_id,
            exam_date: random_date(&mut self.rng, &self.exam_window),
            indicators: parse_indicators(row),
            class_id,
            notes: Some(self.notes.clone()),
        }
    }

    /// Map a row, resolving its label against the store.
    ///
    /// Only a failing lookup is an error; a missing class yields
    /// `UNRESOLVED_CLASS_ID`.
    pub fn map_row(
        &mut self,
        row: &Row,
        patient_id: i64,
        store: &dyn RecordStore,
    ) -> Result<NewExam, DatabaseError> {
        let class_id = resolve_class_id(store, row.field(LABEL_FIELD).trim())?;
        Ok(self.build_exam(row, patient_id, class_id))
    }
}
