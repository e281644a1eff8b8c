//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table plus the grouped statistics queries.
//! All public functions are re-exported here.

mod diagnosis_class;
mod exam;
mod patient;
mod statistics;

use chrono::{NaiveDate, NaiveDateTime};

use super::DatabaseError;

pub use diagnosis_class::*;
pub use exam::*;
pub use patient::*;
pub use statistics::*;

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("invalid timestamp {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::*;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_patient(conn: &Connection, name: &str) -> i64 {
        insert_patient(conn, &NewPatient {
            name: name.into(),
            sex: Some(Sex::Female),
            birth_date: Some(NaiveDate::from_ymd_opt(1970, 5, 17).unwrap()),
            phone: Some("(555) 123-4567".into()),
        }).unwrap()
    }

    fn class_id(conn: &Connection, code: ClassCode) -> i64 {
        find_diagnosis_class_by_code(conn, code).unwrap().unwrap().id
    }

    fn new_exam(patient_id: i64, class_id: i64, first: f64) -> NewExam {
        NewExam {
            patient_id,
            exam_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            indicators: Indicators::from_array([first, 10.0, 20.0, 30.0, 40.0, 0.5]),
            class_id,
            notes: Some("test".into()),
        }
    }

    #[test]
    fn patient_insert_and_retrieve() {
        let conn = test_db();
        let id = make_patient(&conn, "Mary Smith");
        let patient = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(patient.name, "Mary Smith");
        assert_eq!(patient.sex, Some(Sex::Female));
        assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(1970, 5, 17));
        assert!(get_patient(&conn, id + 100).unwrap().is_none());
    }

    #[test]
    fn patient_ids_are_distinct() {
        let conn = test_db();
        let a = make_patient(&conn, "A");
        let b = make_patient(&conn, "B");
        assert_ne!(a, b);
        assert_eq!(count_patients(&conn).unwrap(), 2);
    }

    #[test]
    fn patient_search_by_name_substring() {
        let conn = test_db();
        make_patient(&conn, "Mary Smith");
        make_patient(&conn, "John Smith");
        make_patient(&conn, "Linda Lee");

        let smiths = search_patients_by_name(&conn, "Smith").unwrap();
        assert_eq!(smiths.len(), 2);
        // Newest first
        assert_eq!(smiths[0].name, "John Smith");

        let all = search_patients_by_name(&conn, "   ").unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn patient_update_and_missing_update() {
        let conn = test_db();
        let id = make_patient(&conn, "Old Name");
        let mut patient = get_patient(&conn, id).unwrap().unwrap();
        patient.name = "New Name".into();
        patient.sex = None;
        update_patient(&conn, &patient).unwrap();

        let reloaded = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(reloaded.name, "New Name");
        assert_eq!(reloaded.sex, None);

        patient.id = 9999;
        assert!(matches!(update_patient(&conn, &patient), Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn deleting_patient_cascades_exams() {
        let conn = test_db();
        let pid = make_patient(&conn, "Cascade");
        let cid = class_id(&conn, ClassCode::Normal);
        insert_exam(&conn, &new_exam(pid, cid, 1.0)).unwrap();
        insert_exam(&conn, &new_exam(pid, cid, 2.0)).unwrap();
        assert_eq!(count_exams(&conn).unwrap(), 2);

        delete_patient(&conn, pid).unwrap();
        assert_eq!(count_exams(&conn).unwrap(), 0);
        assert!(matches!(delete_patient(&conn, pid), Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn exam_insert_and_joined_retrieve() {
        let conn = test_db();
        let pid = make_patient(&conn, "Joined");
        let cid = class_id(&conn, ClassCode::Abnormal);
        let eid = insert_exam(&conn, &new_exam(pid, cid, 63.03)).unwrap();

        let exam = get_exam(&conn, eid).unwrap().unwrap();
        assert_eq!(exam.patient_name, "Joined");
        assert_eq!(exam.class_code, "AB");
        assert_eq!(exam.class_description, "Abnormal");
        assert_eq!(exam.indicators.pelvic_incidence, 63.03);
        assert_eq!(exam.notes.as_deref(), Some("test"));
    }

    #[test]
    fn exam_rejects_unknown_patient_and_unresolved_class() {
        let conn = test_db();
        let pid = make_patient(&conn, "FK");
        let cid = class_id(&conn, ClassCode::Normal);

        assert!(insert_exam(&conn, &new_exam(pid + 42, cid, 1.0)).is_err());
        assert!(insert_exam(&conn, &new_exam(pid, UNRESOLVED_CLASS_ID, 1.0)).is_err());
        assert_eq!(count_exams(&conn).unwrap(), 0);
    }

    #[test]
    fn exam_list_filters() {
        let conn = test_db();
        let a = make_patient(&conn, "A");
        let b = make_patient(&conn, "B");
        let normal = class_id(&conn, ClassCode::Normal);
        let abnormal = class_id(&conn, ClassCode::Abnormal);
        insert_exam(&conn, &new_exam(a, normal, 1.0)).unwrap();
        insert_exam(&conn, &new_exam(a, abnormal, 2.0)).unwrap();
        insert_exam(&conn, &new_exam(b, abnormal, 3.0)).unwrap();

        assert_eq!(list_exams(&conn).unwrap().len(), 3);
        assert_eq!(list_exams_by_patient(&conn, a).unwrap().len(), 2);
        assert_eq!(list_exams_by_class(&conn, abnormal).unwrap().len(), 2);
    }

    #[test]
    fn exam_update_and_delete() {
        let conn = test_db();
        let pid = make_patient(&conn, "U");
        let cid = class_id(&conn, ClassCode::Normal);
        let eid = insert_exam(&conn, &new_exam(pid, cid, 1.0)).unwrap();

        update_exam(&conn, eid, &new_exam(pid, cid, 99.0)).unwrap();
        assert_eq!(get_exam(&conn, eid).unwrap().unwrap().indicators.pelvic_incidence, 99.0);

        delete_exam(&conn, eid).unwrap();
        assert!(get_exam(&conn, eid).unwrap().is_none());
        assert!(matches!(delete_exam(&conn, eid), Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn class_lookup_by_code_and_id() {
        let conn = test_db();
        let normal = find_diagnosis_class_by_code(&conn, ClassCode::Normal).unwrap().unwrap();
        assert_eq!(normal.description, "Normal");

        let abnormal = class_id(&conn, ClassCode::Abnormal);
        assert_eq!(get_diagnosis_class(&conn, abnormal).unwrap().unwrap().code, ClassCode::Abnormal);
        assert!(get_diagnosis_class(&conn, UNRESOLVED_CLASS_ID).unwrap().is_none());
        assert_eq!(list_diagnosis_classes(&conn).unwrap().len(), 2);
    }

    #[test]
    fn missing_reference_class_is_none() {
        let conn = test_db();
        conn.execute("DELETE FROM diagnosis_classes WHERE code = 'AB'", []).unwrap();
        assert!(find_diagnosis_class_by_code(&conn, ClassCode::Abnormal).unwrap().is_none());
    }

    #[test]
    fn bulk_insert_commits_all_chunks() {
        let conn = test_db();
        let pid = make_patient(&conn, "Bulk");
        let cid = class_id(&conn, ClassCode::Normal);
        let exams: Vec<NewExam> = (0..250).map(|i| new_exam(pid, cid, i as f64)).collect();

        let inserted = insert_exams_chunked(&conn, &exams, BULK_CHUNK_SIZE).unwrap();
        assert_eq!(inserted, 250);
        assert_eq!(count_exams(&conn).unwrap(), 250);
    }

    #[test]
    fn bulk_insert_rolls_back_failing_chunk_only() {
        let conn = test_db();
        let pid = make_patient(&conn, "Bulk");
        let cid = class_id(&conn, ClassCode::Normal);
        let mut exams: Vec<NewExam> = (0..250).map(|i| new_exam(pid, cid, i as f64)).collect();
        // Row 150 sits in the second chunk (100..200)
        exams[150].class_id = UNRESOLVED_CLASS_ID;

        let err = insert_exams_chunked(&conn, &exams, BULK_CHUNK_SIZE).unwrap_err();
        match err {
            DatabaseError::ChunkFailed { committed, chunk_index, .. } => {
                assert_eq!(committed, 100);
                assert_eq!(chunk_index, 1);
            }
            other => panic!("Expected ChunkFailed, got: {other}"),
        }
        assert_eq!(count_exams(&conn).unwrap(), 100);
    }

    #[test]
    fn grouped_counts_and_averages() {
        let conn = test_db();
        let pid = make_patient(&conn, "Stats");
        let normal = class_id(&conn, ClassCode::Normal);
        let abnormal = class_id(&conn, ClassCode::Abnormal);
        for v in [10.0, 20.0, 30.0] {
            insert_exam(&conn, &new_exam(pid, normal, v)).unwrap();
        }
        insert_exam(&conn, &new_exam(pid, abnormal, 100.0)).unwrap();

        let counts = count_exams_by_class(&conn).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].description, "Normal");
        assert_eq!(counts[0].count, 3);
        assert_eq!(counts[1].code, ClassCode::Abnormal);
        assert_eq!(counts[1].count, 1);

        let averages = average_indicators_by_class(&conn).unwrap();
        let normal_avg = averages.iter().find(|a| a.code == ClassCode::Normal).unwrap();
        assert!((normal_avg.averages[0] - 20.0).abs() < 1e-9);
        let abnormal_avg = averages.iter().find(|a| a.code == ClassCode::Abnormal).unwrap();
        assert!((abnormal_avg.averages[0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn grouped_queries_omit_empty_classes() {
        let conn = test_db();
        assert!(count_exams_by_class(&conn).unwrap().is_empty());
        assert!(average_indicators_by_class(&conn).unwrap().is_empty());
    }
}
