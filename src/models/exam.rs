use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Number of biomechanical indicators carried by every exam.
pub const INDICATOR_COUNT: usize = 6;

/// Display names, in storage order.
pub const INDICATOR_NAMES: [&str; INDICATOR_COUNT] = [
    "Pelvic Incidence (PI)",
    "Pelvic Tilt (PT)",
    "Lumbar Lordosis Angle (LL)",
    "Sacral Slope (SS)",
    "Pelvic Radius (PR)",
    "Degree of Spondylolisthesis (GS)",
];

/// Class id written when a label's code is missing from the reference table.
/// Never a valid foreign key.
pub const UNRESOLVED_CLASS_ID: i64 = -1;

/// The six indicator values of an exam, in `INDICATOR_NAMES` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub pelvic_incidence: f64,
    pub pelvic_tilt: f64,
    pub lumbar_lordosis_angle: f64,
    pub sacral_slope: f64,
    pub pelvic_radius: f64,
    pub degree_spondylolisthesis: f64,
}

impl Indicators {
    pub fn from_array(values: [f64; INDICATOR_COUNT]) -> Self {
        let [pelvic_incidence, pelvic_tilt, lumbar_lordosis_angle, sacral_slope, pelvic_radius, degree_spondylolisthesis] =
            values;
        Self {
            pelvic_incidence,
            pelvic_tilt,
            lumbar_lordosis_angle,
            sacral_slope,
            pelvic_radius,
            degree_spondylolisthesis,
        }
    }

    pub fn to_array(&self) -> [f64; INDICATOR_COUNT] {
        [
            self.pelvic_incidence,
            self.pelvic_tilt,
            self.lumbar_lordosis_angle,
            self.sacral_slope,
            self.pelvic_radius,
            self.degree_spondylolisthesis,
        ]
    }
}

/// An exam ready to insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExam {
    pub patient_id: i64,
    pub exam_date: NaiveDate,
    pub indicators: Indicators,
    pub class_id: i64,
    pub notes: Option<String>,
}

/// A stored exam joined with its patient name and diagnosis class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub patient_id: i64,
    pub exam_date: NaiveDate,
    pub indicators: Indicators,
    pub class_id: i64,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub patient_name: String,
    pub class_code: String,
    pub class_description: String,
}
