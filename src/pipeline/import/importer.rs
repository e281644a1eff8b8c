use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rand::rngs::StdRng;
use rand::Rng;
use rusqlite::Connection;

use super::mapper::ExamMapper;
use super::parser::parse_rows;
use super::synth::PatientSynthesizer;
use super::traits::RecordStore;
use super::writer::{write_rows, ImportProgress, ImportSummary};
use super::ImportError;
use crate::config::ImportConfig;
use crate::db::{self, DatabaseError};
use crate::models::NewExam;

/// Parser, synthesizer and mapper wired to one configuration.
pub struct ImportPipeline<P, E> {
    config: ImportConfig,
    synthesizer: PatientSynthesizer<P>,
    mapper: ExamMapper<E>,
}

impl ImportPipeline<StdRng, StdRng> {
    /// Pipeline drawing from OS entropy.
    pub fn new(config: ImportConfig) -> Self {
        let synthesizer = PatientSynthesizer::from_entropy(config.birth_window);
        let mapper = ExamMapper::from_entropy(config.exam_window, config.notes.clone());
        Self { config, synthesizer, mapper }
    }

    /// Deterministic pipeline: the same seed and input give the same records.
    pub fn seeded(config: ImportConfig, seed: u64) -> Self {
        let synthesizer = PatientSynthesizer::seeded(seed, config.birth_window);
        let mapper = ExamMapper::seeded(seed.wrapping_add(1), config.exam_window, config.notes.clone());
        Self { config, synthesizer, mapper }
    }
}

impl<P: Rng, E: Rng> ImportPipeline<P, E> {
    /// Import from any reader. A read failure aborts the run before any
    /// row is written.
    pub fn import_reader<R: Read>(
        &mut self,
        reader: R,
        store: &dyn RecordStore,
        progress_fn: Option<&dyn Fn(ImportProgress)>,
    ) -> Result<ImportSummary, ImportError> {
        let rows = parse_rows(reader, &self.config)?;
        if rows.is_empty() {
            tracing::info!("Import source has no data rows");
            return Ok(ImportSummary::empty());
        }
        Ok(write_rows(&rows, store, &mut self.synthesizer, &mut self.mapper, progress_fn))
    }

    pub fn import_text(
        &mut self,
        text: &str,
        store: &dyn RecordStore,
        progress_fn: Option<&dyn Fn(ImportProgress)>,
    ) -> Result<ImportSummary, ImportError> {
        self.import_reader(text.as_bytes(), store, progress_fn)
    }

    pub fn import_file(
        &mut self,
        path: &Path,
        store: &dyn RecordStore,
        progress_fn: Option<&dyn Fn(ImportProgress)>,
    ) -> Result<ImportSummary, ImportError> {
        tracing::info!(file = %path.display(), "Starting CSV import");
        let file = File::open(path)?;
        self.import_reader(BufReader::new(file), store, progress_fn)
    }
}

/// Insert pre-built exams without synthesizing patients.
///
/// Atomic per chunk of `config.bulk_chunk_size`, unlike the row-by-row
/// import which commits every row on its own.
pub fn bulk_insert_exams(
    conn: &Connection,
    exams: &[NewExam],
    config: &ImportConfig,
) -> Result<usize, DatabaseError> {
    let inserted = db::insert_exams_chunked(conn, exams, config.bulk_chunk_size)?;
    tracing::info!(inserted, "Bulk exam insert finished");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Write;

    use chrono::NaiveDate;

    use super::*;
    use crate::db::{open_memory_database, SqliteStore};
    use crate::models::*;
    use crate::statistics::{build_report, AbnormalMatch};

    const SAMPLE: &str = "pelvic_incidence,pelvic_tilt,lumbar_lordosis_angle,sacral_slope,pelvic_radius,degree_spondylolisthesis,Class\n\
                          10.5,20.1,30.2,40.3,50.4,0.1,Normal\n\
                          15,25,35,45,55,1,Abnormal\n";

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("import.db"));
        (dir, store)
    }

    #[test]
    fn end_to_end_import_and_statistics() {
        let (_dir, store) = temp_store();
        let mut pipeline = ImportPipeline::seeded(ImportConfig::default(), 99);

        let summary = pipeline.import_text(SAMPLE, &store, None).unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.attempted, 2);

        let report = build_report(&store, &AbnormalMatch::default()).unwrap();
        assert_eq!(report.patient_count, 2);
        assert_eq!(report.exam_count, 2);
        assert_eq!(report.counts_by_class.get("Normal"), Some(&1));
        assert_eq!(report.counts_by_class.get("Abnormal"), Some(&1));
        assert!((report.abnormal_percentage - 50.0).abs() < 1e-9);

        let conn = store.connect().unwrap();
        let exams = db::list_exams(&conn).unwrap();
        let normal = exams.iter().find(|e| e.class_code == "NO").unwrap();
        assert_eq!(normal.indicators.to_array(), [10.5, 20.1, 30.2, 40.3, 50.4, 0.1]);
        assert_eq!(normal.notes.as_deref(), Some("Imported from CSV"));
        assert!(ImportConfig::default().exam_window.contains(normal.exam_date));
    }

    #[test]
    fn importing_twice_doubles_records() {
        let (_dir, store) = temp_store();
        let mut pipeline = ImportPipeline::new(ImportConfig::default());
        pipeline.import_text(SAMPLE, &store, None).unwrap();
        pipeline.import_text(SAMPLE, &store, None).unwrap();

        let conn = store.connect().unwrap();
        assert_eq!(db::count_patients(&conn).unwrap(), 4);
        assert_eq!(db::count_exams(&conn).unwrap(), 4);
    }

    #[test]
    fn short_lines_are_not_attempted() {
        let (_dir, store) = temp_store();
        let mut pipeline = ImportPipeline::seeded(ImportConfig::default(), 1);
        let seen = RefCell::new(Vec::new());
        let progress = |p: ImportProgress| seen.borrow_mut().push((p.current, p.total));

        let text = "1,2,3,4,5,6,Normal\nshort,line\n7,8,9,10,11,12,abnormal\n1,2\n";
        let summary = pipeline.import_text(text, &store, Some(&progress)).unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.imported, 2);
        assert_eq!(seen.into_inner(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn garbage_numbers_are_stored_as_zero() {
        let (_dir, store) = temp_store();
        let mut pipeline = ImportPipeline::seeded(ImportConfig::default(), 1);
        pipeline
            .import_text("x,2,y,4,,6,Normal\n", &store, None)
            .unwrap();

        let conn = store.connect().unwrap();
        let exam = &db::list_exams(&conn).unwrap()[0];
        assert_eq!(exam.indicators.to_array(), [0.0, 2.0, 0.0, 4.0, 0.0, 6.0]);
    }

    #[test]
    fn unresolved_class_fails_row_and_leaves_patient() {
        let (_dir, store) = temp_store();
        {
            let conn = store.connect().unwrap();
            conn.execute("DELETE FROM diagnosis_classes WHERE code = 'AB'", []).unwrap();
        }
        let mut pipeline = ImportPipeline::seeded(ImportConfig::default(), 1);
        let summary = pipeline
            .import_text("1,2,3,4,5,6,Normal\n1,2,3,4,5,6,Abnormal\n", &store, None)
            .unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].row, 2);
        assert!(summary.failures[0].orphan_patient_id.is_some());

        let conn = store.connect().unwrap();
        assert_eq!(db::count_patients(&conn).unwrap(), 2);
        assert_eq!(db::count_exams(&conn).unwrap(), 1);
    }

    #[test]
    fn seeded_pipelines_synthesize_identical_patients() {
        let (_dir_a, a) = temp_store();
        let (_dir_b, b) = temp_store();
        ImportPipeline::seeded(ImportConfig::default(), 5).import_text(SAMPLE, &a, None).unwrap();
        ImportPipeline::seeded(ImportConfig::default(), 5).import_text(SAMPLE, &b, None).unwrap();

        let names = |store: &SqliteStore| -> Vec<(String, Option<Sex>, Option<NaiveDate>, Option<String>)> {
            let conn = store.connect().unwrap();
            db::list_patients(&conn)
                .unwrap()
                .into_iter()
                .map(|p| (p.name, p.sex, p.birth_date, p.phone))
                .collect()
        };
        assert_eq!(names(&a), names(&b));
    }

    #[test]
    fn missing_file_is_fatal() {
        let (dir, store) = temp_store();
        let mut pipeline = ImportPipeline::new(ImportConfig::default());
        let err = pipeline
            .import_file(&dir.path().join("nope.csv"), &store, None)
            .unwrap_err();
        assert!(matches!(err, ImportError::Io(_)));
    }

    #[test]
    fn invalid_utf8_source_is_fatal() {
        let (dir, store) = temp_store();
        let path = dir.path().join("bad.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"1,2,3,4,5,6,Norm\xffal\n").unwrap();
        drop(file);

        let mut pipeline = ImportPipeline::new(ImportConfig::default());
        let err = pipeline.import_file(&path, &store, None).unwrap_err();
        assert!(matches!(err, ImportError::Csv(_)));
        let conn = store.connect().unwrap();
        assert_eq!(db::count_patients(&conn).unwrap(), 0);
    }

    #[test]
    fn import_file_reads_from_disk() {
        let (dir, store) = temp_store();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut pipeline = ImportPipeline::new(ImportConfig::default());
        let summary = pipeline.import_file(&path, &store, None).unwrap();
        assert_eq!(summary.imported, 2);
    }

    #[test]
    fn bulk_insert_uses_configured_chunk_size() {
        let conn = open_memory_database().unwrap();
        let pid = db::insert_patient(&conn, &NewPatient {
            name: "Bulk".into(),
            sex: None,
            birth_date: None,
            phone: None,
        }).unwrap();
        let cid = db::find_diagnosis_class_by_code(&conn, ClassCode::Normal).unwrap().unwrap().id;
        let mut exams: Vec<NewExam> = (0..10)
            .map(|i| NewExam {
                patient_id: pid,
                exam_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                indicators: Indicators::from_array([i as f64; INDICATOR_COUNT]),
                class_id: cid,
                notes: None,
            })
            .collect();
        exams[7].patient_id = pid + 1000;

        let config = ImportConfig {
            bulk_chunk_size: 4,
            ..ImportConfig::default()
        };
        let err = bulk_insert_exams(&conn, &exams, &config).unwrap_err();
        assert!(matches!(err, DatabaseError::ChunkFailed { committed: 4, chunk_index: 1, .. }));
        assert_eq!(db::count_exams(&conn).unwrap(), 4);
    }
}
