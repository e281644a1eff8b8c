//! Command-line front end.
//!
//! Thin layer over the record store, the import pipeline and the
//! statistics engine. Output goes to the writer handed in so commands can
//! be exercised without a terminal.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::core_state::{CoreError, CoreState};
use crate::db::{self, DatabaseError};
use crate::models::{ClassCode, DiagnosisClass, Exam, Indicators, NewExam, NewPatient, Patient, INDICATOR_COUNT};
use crate::pipeline::import::{join_import, spawn_import, ImportError, ImportProgress, ProgressFn, RecordStore};
use crate::records::{self, RecordError};
use crate::statistics::{build_report, AbnormalMatch, StatisticsReport};

#[derive(Parser, Debug)]
#[command(name = "vertebralcare", version, about = "Spine exam records: CSV import and class statistics")]
pub struct Cli {
    /// Database file (defaults to $VERTEBRALCARE_DB, then ~/VertebralCare/vertebralcare.db).
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Import exams from a delimited file, one synthesized patient per row.
    Import { file: PathBuf },
    /// Class counts, percentages and indicator averages.
    Stats {
        #[arg(long)]
        json: bool,
        /// Find the abnormal group by description text instead of class code.
        #[arg(long)]
        legacy_match: bool,
    },
    /// List patients, newest first.
    Patients {
        #[arg(long, value_name = "NAME")]
        search: Option<String>,
    },
    /// List exams, newest exam date first.
    Exams {
        #[arg(long, value_name = "ID")]
        patient: Option<i64>,
        /// Class code (NO or AB).
        #[arg(long, value_name = "CODE")]
        class: Option<String>,
    },
    /// List diagnosis classes.
    Classes,
    /// Delete a patient and all of their exams.
    DeletePatient { id: i64 },
    /// Register a patient by hand.
    AddPatient {
        #[arg(long)]
        name: String,
        /// M or F.
        #[arg(long)]
        sex: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        birth_date: Option<NaiveDate>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Change the given fields of a patient; others are kept.
    UpdatePatient {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        sex: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        birth_date: Option<NaiveDate>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Record an exam by hand.
    AddExam(ExamArgs),
    /// Replace every field of an exam.
    UpdateExam {
        id: i64,
        #[command(flatten)]
        exam: ExamArgs,
    },
}

#[derive(Args, Debug, PartialEq)]
pub struct ExamArgs {
    #[arg(long, value_name = "ID")]
    pub patient: i64,
    /// Class code (NO or AB).
    #[arg(long, value_name = "CODE")]
    pub class: String,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: NaiveDate,
    /// Six comma-separated values: PI, PT, LL, SS, PR, GS.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
    pub indicators: Vec<f64>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("Unknown diagnosis class code {0:?}")]
    UnknownClass(String),
    #[error("Expected {INDICATOR_COUNT} indicator values, got {0}")]
    IndicatorCount(usize),
}

/// Run one parsed command against `state`.
pub async fn execute(state: &CoreState, command: Command, out: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Import { file } => import(state, file, out).await,
        Command::Stats { json, legacy_match } => {
            let matcher = if legacy_match {
                AbnormalMatch::legacy()
            } else {
                AbnormalMatch::default()
            };
            let report = build_report(&state.store()?, &matcher)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                print_report(&report, out)?;
            }
            Ok(())
        }
        Command::Patients { search } => {
            let conn = state.open_db()?;
            let patients = match search {
                Some(query) => db::search_patients_by_name(&conn, &query)?,
                None => db::list_patients(&conn)?,
            };
            for patient in &patients {
                print_patient(patient, out)?;
            }
            writeln!(out, "{} patient(s)", patients.len())?;
            Ok(())
        }
        Command::Exams { patient, class } => {
            let conn = state.open_db()?;
            let class = class.map(|raw| resolve_class(&conn, &raw)).transpose()?;
            let exams = match (patient, class) {
                (Some(patient_id), Some(class)) => {
                    let mut exams = db::list_exams_by_patient(&conn, patient_id)?;
                    exams.retain(|e| e.class_id == class.id);
                    exams
                }
                (Some(patient_id), None) => db::list_exams_by_patient(&conn, patient_id)?,
                (None, Some(class)) => db::list_exams_by_class(&conn, class.id)?,
                (None, None) => db::list_exams(&conn)?,
            };
            for exam in &exams {
                print_exam(exam, out)?;
            }
            writeln!(out, "{} exam(s)", exams.len())?;
            Ok(())
        }
        Command::Classes => {
            let conn = state.open_db()?;
            for class in db::list_diagnosis_classes(&conn)? {
                writeln!(out, "{:>3}  {}  {}", class.id, class.code, class.description)?;
            }
            Ok(())
        }
        Command::DeletePatient { id } => {
            let conn = state.open_db()?;
            db::delete_patient(&conn, id)?;
            writeln!(out, "Deleted patient {id}")?;
            Ok(())
        }
        Command::AddPatient { name, sex, birth_date, phone } => {
            let conn = state.open_db()?;
            let patient = NewPatient {
                name,
                sex: parse_sex(sex.as_deref())?,
                birth_date,
                phone,
            };
            let id = records::add_patient(&conn, &patient)?;
            writeln!(out, "Added patient {id}")?;
            Ok(())
        }
        Command::UpdatePatient { id, name, sex, birth_date, phone } => {
            let conn = state.open_db()?;
            let mut patient = db::get_patient(&conn, id)?.ok_or_else(|| DatabaseError::NotFound {
                entity_type: "Patient".into(),
                id: id.to_string(),
            })?;
            if let Some(name) = name {
                patient.name = name;
            }
            if sex.is_some() {
                patient.sex = parse_sex(sex.as_deref())?;
            }
            if birth_date.is_some() {
                patient.birth_date = birth_date;
            }
            if phone.is_some() {
                patient.phone = phone;
            }
            records::update_patient(&conn, &patient)?;
            writeln!(out, "Updated patient {id}")?;
            Ok(())
        }
        Command::AddExam(args) => {
            let conn = state.open_db()?;
            let exam = new_exam(&conn, args)?;
            let id = records::add_exam(&conn, &exam)?;
            writeln!(out, "Added exam {id}")?;
            Ok(())
        }
        Command::UpdateExam { id, exam } => {
            let conn = state.open_db()?;
            let exam = new_exam(&conn, exam)?;
            records::update_exam(&conn, id, &exam)?;
            writeln!(out, "Updated exam {id}")?;
            Ok(())
        }
    }
}

fn resolve_class(conn: &rusqlite::Connection, raw: &str) -> Result<DiagnosisClass, CliError> {
    let code = raw
        .trim()
        .to_ascii_uppercase()
        .parse::<ClassCode>()
        .map_err(|_| CliError::UnknownClass(raw.to_string()))?;
    db::find_diagnosis_class_by_code(conn, code)?.ok_or_else(|| CliError::UnknownClass(raw.to_string()))
}

fn parse_sex(raw: Option<&str>) -> Result<Option<crate::models::Sex>, CliError> {
    match raw {
        Some(raw) => records::parse_sex(raw).map_err(|e| CliError::Record(e.into())),
        None => Ok(None),
    }
}

fn new_exam(conn: &rusqlite::Connection, args: ExamArgs) -> Result<NewExam, CliError> {
    let values: [f64; INDICATOR_COUNT] = args
        .indicators
        .as_slice()
        .try_into()
        .map_err(|_| CliError::IndicatorCount(args.indicators.len()))?;
    let class = resolve_class(conn, &args.class)?;
    Ok(NewExam {
        patient_id: args.patient,
        exam_date: args.date,
        indicators: Indicators::from_array(values),
        class_id: class.id,
        notes: args.notes,
    })
}

async fn import(state: &CoreState, file: PathBuf, out: &mut dyn Write) -> Result<(), CliError> {
    let store: Arc<dyn RecordStore> = Arc::new(state.store()?);
    let progress: ProgressFn = Arc::new(|p: ImportProgress| {
        if p.current == p.total || p.current % 25 == 0 {
            eprintln!("  {}/{} rows", p.current, p.total);
        }
    });

    let handle = spawn_import(
        state.imports(),
        file,
        store,
        state.import_config().clone(),
        Some(progress),
    )?;
    let summary = join_import(handle).await?;

    writeln!(
        out,
        "Imported {} of {} rows in {} ms",
        summary.imported, summary.attempted, summary.duration_ms
    )?;
    for failure in &summary.failures {
        writeln!(out, "  row {} (line {}): {}", failure.row, failure.line, failure.error)?;
    }
    Ok(())
}

fn print_report(report: &StatisticsReport, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "Patients: {}", report.patient_count)?;
    writeln!(out, "Exams:    {}", report.exam_count)?;
    writeln!(out)?;

    let mut classes: Vec<_> = report.counts_by_class.iter().collect();
    classes.sort_by(|a, b| a.0.cmp(b.0));
    for (description, count) in classes {
        writeln!(out, "{description}: {count}")?;
        if let Some(averages) = report.averages_by_class.get(description) {
            for (name, value) in report.indicator_names.iter().zip(averages) {
                writeln!(out, "    {name}: {value:.2}")?;
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "Abnormal: {:.1}%", report.abnormal_percentage)?;
    writeln!(out, "Normal:   {:.1}%", report.normal_percentage)
}

fn print_patient(patient: &Patient, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>5}  {:<28} {:<2} {:<10} {}",
        patient.id,
        patient.name,
        patient.sex.map(|s| s.as_str()).unwrap_or("-"),
        patient.birth_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        patient.phone.as_deref().unwrap_or("-"),
    )
}

fn print_exam(exam: &Exam, out: &mut dyn Write) -> std::io::Result<()> {
    let values = exam
        .indicators
        .to_array()
        .iter()
        .map(|v| format!("{v:.2}"))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(
        out,
        "{:>5}  {}  {:<28} {}  [{}]",
        exam.id, exam.exam_date, exam.patient_name, exam.class_code, values
    )
}
