use serde::{Deserialize, Serialize};

use super::enums::ClassCode;

/// Reference row from `diagnosis_classes`. Seeded by migration, never written by the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisClass {
    pub id: i64,
    pub code: ClassCode,
    pub description: String,
}
