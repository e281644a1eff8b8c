use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "VertebralCare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "VERTEBRALCARE_DB";

const DB_FILE_NAME: &str = "vertebralcare.db";

/// Get the application data directory
/// ~/VertebralCare/ on all platforms
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Database file: `$VERTEBRALCARE_DB` if set, else under the app data directory.
pub fn database_path() -> PathBuf {
    match std::env::var_os(DB_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir().join(DB_FILE_NAME),
    }
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "vertebralcare=info,vertebralcare_lib=info"
}

/// Inclusive calendar window used for synthesized dates.
///
/// `start <= end` always holds, including for deserialized windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDateWindow")]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl From<RawDateWindow> for DateWindow {
    fn from(raw: RawDateWindow) -> Self {
        Self::new(raw.start, raw.end)
    }
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days after `start` that still fall in the window.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Tunables for the CSV import pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Field delimiter of the source text.
    pub delimiter: u8,
    /// Lines with fewer fields are dropped before counting.
    pub min_fields: usize,
    /// A first line containing any of these (lowercased) is a header.
    pub header_sentinels: Vec<String>,
    /// Window for synthesized patient birth dates.
    pub birth_window: DateWindow,
    /// Window for synthesized exam dates.
    pub exam_window: DateWindow,
    /// Provenance tag written to every imported exam.
    pub notes: String,
    /// Rows per transaction for the bulk exam insert.
    pub bulk_chunk_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            min_fields: 7,
            header_sentinels: vec!["pelvic".into(), "class".into()],
            birth_window: DateWindow::new(ymd(1945, 1, 1), ymd(2005, 1, 1)),
            exam_window: DateWindow::new(ymd(2020, 1, 1), ymd(2025, 12, 1)),
            notes: "Imported from CSV".into(),
            bulk_chunk_size: crate::db::BULK_CHUNK_SIZE,
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
