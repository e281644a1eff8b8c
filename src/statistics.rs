//! Class statistics over stored exams.
//!
//! Read-only. Grouped counts and per-indicator averages come from the store;
//! percentages are derived here. The normal share is the complement of the
//! abnormal share, which is only meaningful while two classes partition the
//! exams.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{ClassAverages, ClassCount, DatabaseError};
use crate::models::{ClassCode, INDICATOR_COUNT, INDICATOR_NAMES};

/// Read-only queries the statistics engine needs.
pub trait StatisticsStore: Send + Sync {
    fn count_exams_by_class(&self) -> Result<Vec<ClassCount>, DatabaseError>;
    fn average_indicators_by_class(&self) -> Result<Vec<ClassAverages>, DatabaseError>;
    fn count_patients(&self) -> Result<i64, DatabaseError>;
    fn count_exams(&self) -> Result<i64, DatabaseError>;
}

/// Which class group counts as abnormal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbnormalMatch {
    /// Groups whose class code equals this code.
    Code(ClassCode),
    /// Legacy: the first group, in description order, whose description
    /// contains this text. Other matching groups are ignored.
    DescriptionContains(String),
}

impl Default for AbnormalMatch {
    fn default() -> Self {
        Self::Code(ClassCode::Abnormal)
    }
}

impl AbnormalMatch {
    /// The description-substring behavior of the first release.
    pub fn legacy() -> Self {
        Self::DescriptionContains("Abnormal".into())
    }

    fn abnormal_count(&self, counts: &[ClassCount]) -> i64 {
        match self {
            Self::Code(code) => counts
                .iter()
                .filter(|c| c.code == *code)
                .map(|c| c.count)
                .sum(),
            Self::DescriptionContains(needle) => {
                let mut matching: Vec<&ClassCount> = counts
                    .iter()
                    .filter(|c| c.description.contains(needle.as_str()))
                    .collect();
                matching.sort_by(|a, b| a.description.cmp(&b.description));
                matching.first().map(|c| c.count).unwrap_or(0)
            }
        }
    }
}

/// Description → exam count.
pub fn counts_by_description(counts: &[ClassCount]) -> HashMap<String, i64> {
    counts
        .iter()
        .map(|c| (c.description.clone(), c.count))
        .collect()
}

/// Description → six indicator means.
pub fn averages_by_description(averages: &[ClassAverages]) -> HashMap<String, [f64; INDICATOR_COUNT]> {
    averages
        .iter()
        .map(|a| (a.description.clone(), a.averages))
        .collect()
}

/// Share of abnormal exams in percent; 0.0 when there are no exams.
pub fn abnormal_percentage(counts: &[ClassCount], matcher: &AbnormalMatch) -> f64 {
    let total: i64 = counts.iter().map(|c| c.count).sum();
    if total == 0 {
        return 0.0;
    }
    matcher.abnormal_count(counts) as f64 * 100.0 / total as f64
}

/// Complement of the abnormal share.
pub fn normal_percentage(abnormal_percentage: f64) -> f64 {
    100.0 - abnormal_percentage
}

/// Everything the statistics view renders.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub patient_count: i64,
    pub exam_count: i64,
    pub counts_by_class: HashMap<String, i64>,
    pub averages_by_class: HashMap<String, [f64; INDICATOR_COUNT]>,
    pub indicator_names: [&'static str; INDICATOR_COUNT],
    pub abnormal_percentage: f64,
    pub normal_percentage: f64,
}

/// Compute the full report from current stored state.
pub fn build_report(
    store: &dyn StatisticsStore,
    matcher: &AbnormalMatch,
) -> Result<StatisticsReport, DatabaseError> {
    let counts = store.count_exams_by_class()?;
    let averages = store.average_indicators_by_class()?;
    let abnormal = abnormal_percentage(&counts, matcher);

    let report = StatisticsReport {
        patient_count: store.count_patients()?,
        exam_count: store.count_exams()?,
        counts_by_class: counts_by_description(&counts),
        averages_by_class: averages_by_description(&averages),
        indicator_names: INDICATOR_NAMES,
        abnormal_percentage: abnormal,
        normal_percentage: normal_percentage(abnormal),
    };

    tracing::debug!(
        exams = report.exam_count,
        groups = report.counts_by_class.len(),
        abnormal_pct = report.abnormal_percentage,
        "Statistics computed"
    );

    Ok(report)
}
