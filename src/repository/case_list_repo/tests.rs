use super::SqliteCaseListRepository;
use crate::config::CreateMode;
use crate::domain::{CaseList, CaseListCategory, Patient};
use crate::repository::case_list_store::CaseListStore;
use crate::repository::error::RepositoryError;
use crate::repository::patient_repo::{PatientRegistry, PatientRepository};
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()))
}

fn seed_patients(conn: &Arc<Mutex<Connection>>, ids: &[&str]) {
    PatientRepository::new(conn.clone()).batch_insert(ids).unwrap();
}

fn make_list(stable_id: &str, study: i64, name: &str, members: &[&str]) -> CaseList {
    CaseList::new(
        stable_id,
        study,
        name,
        CaseListCategory::AllCasesInStudy,
        format!("{} description", name),
    )
    .with_members(members.iter().copied())
}

fn member_set(list: &CaseList) -> HashSet<&str> {
    list.members.iter().map(String::as_str).collect()
}

#[test]
fn test_create_and_get_by_stable_id() {
    let conn = setup_test_db();
    seed_patients(&conn, &["P-1", "P-2", "P-3"]);
    let repo = SqliteCaseListRepository::from_connection(conn);

    let rows = repo
        .create(&make_list("brca_all", 7, "All", &["P-1", "P-2", "P-3"]))
        .unwrap();
    assert_eq!(rows, 4);

    let found = repo.get_by_stable_id("brca_all").unwrap().unwrap();
    assert!(found.list_id > 0);
    assert_eq!(found.cancer_study_id, 7);
    assert_eq!(found.name, "All");
    assert_eq!(found.category, CaseListCategory::AllCasesInStudy);
    assert_eq!(found.description, "All description");
    assert_eq!(member_set(&found), HashSet::from(["P-1", "P-2", "P-3"]));
}

#[test]
fn test_get_by_id_matches_stable_id_lookup() {
    let conn = setup_test_db();
    seed_patients(&conn, &["P-1"]);
    let repo = SqliteCaseListRepository::from_connection(conn);
    repo.create(&make_list("l1", 1, "One", &["P-1"])).unwrap();

    let by_stable = repo.get_by_stable_id("l1").unwrap().unwrap();
    let by_id = repo.get_by_id(by_stable.list_id).unwrap().unwrap();
    assert_eq!(by_stable, by_id);

    assert!(repo.get_by_id(by_stable.list_id + 100).unwrap().is_none());
}

#[test]
fn test_unknown_stable_id_is_absent() {
    let repo = SqliteCaseListRepository::from_connection(setup_test_db());
    assert!(repo.get_by_stable_id("never_inserted").unwrap().is_none());
}

#[test]
fn test_duplicate_stable_id_rejected() {
    let repo = SqliteCaseListRepository::from_connection(setup_test_db());
    repo.create(&make_list("dup", 1, "First", &[])).unwrap();

    let err = repo.create(&make_list("dup", 2, "Second", &[])).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

    let found = repo.get_by_stable_id("dup").unwrap().unwrap();
    assert_eq!(found.name, "First");
}

#[test]
fn test_empty_members_creates_no_membership_rows() {
    let repo = SqliteCaseListRepository::from_connection(setup_test_db());
    assert_eq!(repo.create(&make_list("empty", 1, "Empty", &[])).unwrap(), 1);
    assert_eq!(repo.count_memberships().unwrap(), 0);

    let found = repo.get_by_stable_id("empty").unwrap().unwrap();
    assert!(found.members.is_empty());
}

#[test]
fn test_get_all_for_study_sorted_by_name() {
    let conn = setup_test_db();
    seed_patients(&conn, &["P-1", "P-2"]);
    let repo = SqliteCaseListRepository::from_connection(conn);

    repo.create(&make_list("s7_b", 7, "B-list", &["P-1"])).unwrap();
    repo.create(&make_list("s8_x", 8, "0-other-study", &["P-2"])).unwrap();
    repo.create(&make_list("s7_a", 7, "A-list", &["P-2"])).unwrap();

    let lists = repo.get_all_for_study(7).unwrap();
    let names: Vec<&str> = lists.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["A-list", "B-list"]);
    assert_eq!(lists[0].members, vec!["P-2".to_string()]);
    assert_eq!(lists[1].members, vec!["P-1".to_string()]);

    assert!(repo.get_all_for_study(99).unwrap().is_empty());
    assert_eq!(repo.get_all().unwrap().len(), 3);
}

#[test]
fn test_patient_membership_check() {
    let conn = setup_test_db();
    seed_patients(&conn, &["PATIENT-42", "PATIENT-43"]);
    let repo = SqliteCaseListRepository::from_connection(conn);
    repo.create(&make_list("l1", 1, "One", &["PATIENT-42"])).unwrap();

    assert!(repo.patient_has_any_membership("PATIENT-42").unwrap());
    assert!(!repo.patient_has_any_membership("PATIENT-43").unwrap());

    let err = repo.patient_has_any_membership("PATIENT-404").unwrap_err();
    assert!(err.is_patient_not_found());
}

#[test]
fn test_atomic_create_rolls_back_on_unknown_member() {
    let conn = setup_test_db();
    seed_patients(&conn, &["P-1"]);
    let repo = SqliteCaseListRepository::from_connection(conn);
    assert_eq!(repo.create_mode(), CreateMode::Atomic);

    let err = repo
        .create(&make_list("broken", 1, "Broken", &["P-1", "P-missing"]))
        .unwrap_err();
    assert!(matches!(err, RepositoryError::PatientNotFound(ref s) if s == "P-missing"));

    assert!(repo.get_by_stable_id("broken").unwrap().is_none());
    assert_eq!(repo.count_memberships().unwrap(), 0);
}

#[test]
fn test_non_atomic_create_keeps_metadata_on_failure() {
    let conn = setup_test_db();
    seed_patients(&conn, &["P-1"]);
    let repo =
        SqliteCaseListRepository::from_connection(conn).with_create_mode(CreateMode::NonAtomic);

    let err = repo
        .create(&make_list("partial", 1, "Partial", &["P-1", "P-missing"]))
        .unwrap_err();
    assert!(err.is_patient_not_found());

    let found = repo.get_by_stable_id("partial").unwrap().unwrap();
    assert!(found.members.is_empty());
    assert_eq!(repo.count_memberships().unwrap(), 0);
}

#[test]
fn test_chunked_membership_insert() {
    let conn = setup_test_db();
    let ids: Vec<String> = (0..25).map(|i| format!("P-{:03}", i)).collect();
    seed_patients(&conn, &ids.iter().map(String::as_str).collect::<Vec<_>>());
    let repo = SqliteCaseListRepository::from_connection(conn).with_membership_chunk_size(4);

    let list = make_list("big", 3, "Big", &ids.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(repo.create(&list).unwrap(), 26);

    let found = repo.get_by_stable_id("big").unwrap().unwrap();
    let expected: HashSet<&str> = ids.iter().map(String::as_str).collect();
    assert_eq!(member_set(&found), expected);
}

#[test]
fn test_clear_all_empties_both_tables() {
    let conn = setup_test_db();
    seed_patients(&conn, &["P-1"]);
    let repo = SqliteCaseListRepository::from_connection(conn);
    repo.create(&make_list("l1", 5, "One", &["P-1"])).unwrap();
    let list_id = repo.get_by_stable_id("l1").unwrap().unwrap().list_id;

    repo.clear_all().unwrap();

    assert!(repo.get_all().unwrap().is_empty());
    assert!(repo.get_all_for_study(5).unwrap().is_empty());
    assert!(repo.get_by_stable_id("l1").unwrap().is_none());
    assert!(repo.get_by_id(list_id).unwrap().is_none());
    assert_eq!(repo.count_memberships().unwrap(), 0);
    assert!(!repo.patient_has_any_membership("P-1").unwrap());
}

#[test]
fn test_unknown_category_in_storage_fails_read() {
    let conn = setup_test_db();
    conn.lock()
        .unwrap()
        .execute(
            "INSERT INTO case_list (stable_id, cancer_study_id, name, category, description)
             VALUES ('legacy', 1, 'Legacy', 'all_cases_with_gistic_data', '')",
            [],
        )
        .unwrap();
    let repo = SqliteCaseListRepository::from_connection(conn);

    let err = repo.get_by_stable_id("legacy").unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidCategory(ref c) if c == "all_cases_with_gistic_data"));
}

#[test]
fn test_custom_resolver_from_registry() {
    let conn = setup_test_db();
    seed_patients(&conn, &["P-1", "P-2"]);
    let registry = PatientRegistry::load_from(&conn.lock().unwrap()).unwrap();
    let repo = SqliteCaseListRepository::with_resolver(conn, registry);

    repo.create(&make_list("cached", 1, "Cached", &["P-2"])).unwrap();
    let found = repo.get_by_stable_id("cached").unwrap().unwrap();
    assert_eq!(found.members, vec!["P-2".to_string()]);
}

#[test]
fn test_reassigned_registry_id_does_not_swap_members() {
    let conn = setup_test_db();
    seed_patients(&conn, &["A"]);
    let registry = PatientRegistry::new();
    registry.register(Patient::new(1, "A")).unwrap();
    registry.register(Patient::new(1, "B")).unwrap();
    let repo = SqliteCaseListRepository::with_resolver(conn, registry);

    let err = repo.create(&make_list("l", 1, "L", &["A"])).unwrap_err();
    assert!(matches!(err, RepositoryError::PatientNotFound(ref s) if s == "A"));
    assert!(repo.get_by_stable_id("l").unwrap().is_none());
}

#[test]
fn test_unresolvable_member_fails_every_read() {
    let conn = setup_test_db();
    seed_patients(&conn, &["P-1", "P-2"]);
    let sqlite_repo = SqliteCaseListRepository::from_connection(conn.clone());
    sqlite_repo
        .create(&make_list("l1", 4, "One", &["P-1", "P-2"]))
        .unwrap();
    let list_id = sqlite_repo.get_by_stable_id("l1").unwrap().unwrap().list_id;

    // 只认识 P-1 的解析器：P-2 的内部 ID 无法还原
    let registry = PatientRegistry::new();
    let p1 = PatientRepository::new(conn.clone())
        .find_by_stable_id("P-1")
        .unwrap()
        .unwrap();
    let p2_internal_id = PatientRepository::new(conn.clone())
        .find_by_stable_id("P-2")
        .unwrap()
        .unwrap()
        .internal_id;
    registry.register(p1).unwrap();
    let repo = SqliteCaseListRepository::with_resolver(conn, registry);

    let is_missing_p2 = |err: &RepositoryError| {
        matches!(err, RepositoryError::PatientInternalIdNotFound(id) if *id == p2_internal_id)
    };

    let err = repo.get_by_stable_id("l1").unwrap_err();
    assert!(is_missing_p2(&err));
    assert!(is_missing_p2(&repo.get_by_id(list_id).unwrap_err()));
    assert!(is_missing_p2(&repo.get_all_for_study(4).unwrap_err()));
    assert!(is_missing_p2(&repo.get_all().unwrap_err()));
}

#[test]
fn test_oversized_chunk_is_capped() {
    let conn = setup_test_db();
    let ids: Vec<String> = (0..20_000).map(|i| format!("P-{:05}", i)).collect();
    seed_patients(&conn, &ids.iter().map(String::as_str).collect::<Vec<_>>());
    let repo = SqliteCaseListRepository::from_connection(conn).with_membership_chunk_size(20_000);
    assert_eq!(repo.membership_chunk_size(), super::MAX_MEMBERSHIP_CHUNK_SIZE);
    assert_eq!(
        SqliteCaseListRepository::from_connection(setup_test_db())
            .with_membership_chunk_size(0)
            .membership_chunk_size(),
        1
    );

    let list = make_list("huge", 1, "Huge", &ids.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(repo.create(&list).unwrap(), 20_001);
    assert_eq!(repo.count_memberships().unwrap(), 20_000);
}
