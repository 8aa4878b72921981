use chrono::Duration;
use drive_core::model::{
    Attempt, CategoryId, OptionKey, PhaseId, ScenarioId, SessionId, SessionScope, SessionSummary,
};
use drive_core::time::fixed_now;
use storage::repository::{
    AUTH_TOKEN_KEY, DeviceStore, SessionResultRepository, Storage, StorageError,
};
use storage::sqlite::SqliteRepository;

/// `unsynced` holds attempt positions the backend never accepted.
fn summary(
    category: u32,
    phase: u32,
    answers: &[(u32, &str, bool)],
    unsynced: &[usize],
) -> SessionSummary {
    let now = fixed_now();
    let synced = (0..answers.len())
        .map(|position| !unsynced.contains(&position))
        .collect();
    let attempts = answers
        .iter()
        .map(|(id, option, correct)| {
            Attempt::new(
                ScenarioId::new(*id),
                OptionKey::parse(option).unwrap(),
                *correct,
                now,
            )
        })
        .collect();
    SessionSummary::from_attempts(
        SessionScope {
            session_id: SessionId::generate(),
            category_id: CategoryId::new(category),
            phase_id: PhaseId::new(phase),
            category_name: "Intersection".into(),
        },
        now,
        now + Duration::minutes(4),
        attempts,
        synced,
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_device_store_upserts_and_removes() {
    let repo = connect("memdb_device_store").await;

    assert_eq!(repo.get_item(AUTH_TOKEN_KEY).await.unwrap(), None);
    repo.set_item(AUTH_TOKEN_KEY, "first").await.unwrap();
    repo.set_item(AUTH_TOKEN_KEY, "second").await.unwrap();
    assert_eq!(
        repo.get_item(AUTH_TOKEN_KEY).await.unwrap().as_deref(),
        Some("second")
    );

    repo.remove_item(AUTH_TOKEN_KEY).await.unwrap();
    assert_eq!(repo.get_item(AUTH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_round_trips_session_result_with_unsynced_attempts() {
    let repo = connect("memdb_results_roundtrip").await;
    let original = summary(3, 1, &[(61, "A", true), (62, "c", false)], &[1]);

    let id = repo.append_result(&original).await.unwrap();
    let fetched = repo.get_result(id).await.unwrap();

    assert_eq!(fetched, original);
    assert_eq!(fetched.score(), 1);
    assert_eq!(fetched.unsynced(), vec![ScenarioId::new(62)]);
    assert_eq!(fetched.attempts()[1].selected_option().as_str(), "C");
}

#[tokio::test]
async fn sqlite_keeps_sync_status_per_attempt_of_a_repeated_scenario() {
    let repo = connect("memdb_results_repeated_scenario").await;
    // 61 answered twice: the first submission failed, the retry was accepted.
    let original = summary(3, 1, &[(61, "B", false), (61, "A", true), (62, "A", true)], &[0]);
    assert_eq!(original.unsynced(), vec![ScenarioId::new(61)]);

    let id = repo.append_result(&original).await.unwrap();
    let fetched = repo.get_result(id).await.unwrap();

    assert_eq!(fetched, original);
    assert_eq!(fetched.unsynced(), vec![ScenarioId::new(61)]);
    assert!(!fetched.is_synced(0));
    assert!(fetched.is_synced(1));

    let listed = repo.list_results(Some(CategoryId::new(3)), 1).await.unwrap();
    assert_eq!(listed[0].summary.unsynced_count(), 1);
}

#[tokio::test]
async fn sqlite_rejects_duplicate_session() {
    let repo = connect("memdb_results_conflict").await;
    let s = summary(1, 1, &[(1, "A", true)], &[]);
    repo.append_result(&s).await.unwrap();
    let err = repo.append_result(&s).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_lists_results_and_best_score() {
    let repo = connect("memdb_results_list").await;
    repo.append_result(&summary(3, 1, &[(61, "A", true), (62, "B", true)], &[]))
        .await
        .unwrap();
    repo.append_result(&summary(3, 1, &[(61, "B", false), (62, "B", true)], &[]))
        .await
        .unwrap();
    repo.append_result(&summary(4, 1, &[(91, "A", true)], &[]))
        .await
        .unwrap();

    let intersection = repo
        .list_results(Some(CategoryId::new(3)), 10)
        .await
        .unwrap();
    assert_eq!(intersection.len(), 2);
    assert!(intersection.iter().all(|r| r.summary.category_id() == CategoryId::new(3)));

    let limited = repo.list_results(None, 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    assert_eq!(
        repo.best_score(CategoryId::new(3), PhaseId::new(1))
            .await
            .unwrap(),
        Some(2)
    );
    assert_eq!(
        repo.best_score(CategoryId::new(2), PhaseId::new(1))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_sqlite_wires_trait_objects() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage_wiring?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage.device.set_item("k", "v").await.unwrap();
    assert_eq!(storage.device.get_item("k").await.unwrap().as_deref(), Some("v"));
    assert!(storage.results.list_results(None, 5).await.unwrap().is_empty());
}
