//! Integration tests for the pairing history service

use duodraft_domain::traits::{AdjacencyIndex, RoundPage, RoundStore};
use duodraft_domain::{
    AdjacencyMap, NewRound, Pair, Round, RoundId, StudentId, StudentRef, TeacherId,
};
use duodraft_history::{HistoryConfig, HistoryError, HistoryView, PairHistoryService};
use duodraft_store::{SqliteStore, StoreError};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Store that fails the next `merge_failures` merges and can stall reads
struct FaultyStore {
    inner: SqliteStore,
    merge_failures: Arc<AtomicUsize>,
    read_delay: Option<Duration>,
}

impl FaultyStore {
    fn new(merge_failures: Arc<AtomicUsize>) -> Self {
        Self {
            inner: SqliteStore::new(":memory:").unwrap(),
            merge_failures,
            read_delay: None,
        }
    }
}

impl RoundStore for FaultyStore {
    type Error = StoreError;

    fn append_round(&mut self, round: NewRound) -> Result<Round, Self::Error> {
        self.inner.append_round(round)
    }

    fn latest_round(&self, teacher: &TeacherId) -> Result<Option<Round>, Self::Error> {
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }
        self.inner.latest_round(teacher)
    }

    fn get_round(&self, teacher: &TeacherId, id: RoundId) -> Result<Option<Round>, Self::Error> {
        self.inner.get_round(teacher, id)
    }

    fn list_rounds(&self, teacher: &TeacherId, page: &RoundPage) -> Result<Vec<Round>, Self::Error> {
        self.inner.list_rounds(teacher, page)
    }

    fn count_rounds(&self, teacher: &TeacherId) -> Result<u64, Self::Error> {
        self.inner.count_rounds(teacher)
    }

    fn unindexed_rounds(&self) -> Result<Vec<Round>, Self::Error> {
        self.inner.unindexed_rounds()
    }

    fn rounds_with_students(&self, students: &BTreeSet<StudentId>) -> Result<Vec<Round>, Self::Error> {
        self.inner.rounds_with_students(students)
    }
}

impl AdjacencyIndex for FaultyStore {
    type Error = StoreError;

    fn merge(&mut self, round: &Round) -> Result<(), Self::Error> {
        let remaining = self.merge_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.merge_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::InvalidData("simulated disk failure".to_string()));
        }
        self.inner.merge(round)
    }

    fn resolve(&self, students: &BTreeSet<StudentId>) -> Result<AdjacencyMap, Self::Error> {
        self.inner.resolve(students)
    }

    fn clear(&mut self, students: &BTreeSet<StudentId>) -> Result<(), Self::Error> {
        self.inner.clear(students)
    }

    fn rebuild(&mut self, students: &BTreeSet<StudentId>, rounds: &[Round]) -> Result<(), Self::Error> {
        self.inner.rebuild(students, rounds)
    }
}

fn teacher(n: u8) -> TeacherId {
    TeacherId::parse(&format!("{:024x}", 0xf000 + n as u32)).unwrap()
}

fn sid(n: u8) -> StudentId {
    StudentId::parse(&format!("{:024x}", n)).unwrap()
}

fn student(n: u8) -> StudentRef {
    StudentRef::new(sid(n), format!("Student {}", n))
}

fn round(t: &TeacherId, pairs: &[(u8, Option<u8>)]) -> NewRound {
    let pairs = pairs
        .iter()
        .map(|&(a, b)| Pair {
            student1: student(a),
            student2: b.map(student),
        })
        .collect();
    NewRound::new(t.clone(), pairs, 1).unwrap()
}

fn set(ids: &[u8]) -> BTreeSet<StudentId> {
    ids.iter().map(|&n| sid(n)).collect()
}

fn fast_config() -> HistoryConfig {
    HistoryConfig {
        merge_backoff_ms: 1,
        ..Default::default()
    }
}

fn sqlite_service() -> PairHistoryService<SqliteStore> {
    PairHistoryService::new(SqliteStore::new(":memory:").unwrap(), fast_config())
}

#[tokio::test]
async fn test_no_history_for_new_teacher() {
    let service = sqlite_service();
    let err = service.latest_with_history(&teacher(1)).await.unwrap_err();
    assert!(matches!(err, HistoryError::NoHistory { .. }));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_save_then_latest_with_history() {
    let service = sqlite_service();
    let t1 = teacher(1);

    let saved = service.save_round(round(&t1, &[(1, Some(2))])).await.unwrap();
    let latest = service.latest_with_history(&t1).await.unwrap();

    assert_eq!(latest.round, saved);
    assert_eq!(latest.previous_pairs.partners(&sid(1)), Some(&set(&[2])));
    assert_eq!(latest.previous_pairs.partners(&sid(2)), Some(&set(&[1])));
}

#[tokio::test]
async fn test_history_union_grows_across_rounds() {
    let service = sqlite_service();
    let t1 = teacher(1);

    service.save_round(round(&t1, &[(1, Some(2))])).await.unwrap();
    service.save_round(round(&t1, &[(1, Some(3))])).await.unwrap();

    let map = service.resolve(set(&[1])).await.unwrap();
    assert_eq!(map.partners(&sid(1)), Some(&set(&[2, 3])));
}

#[tokio::test]
async fn test_odd_student_has_no_edges() {
    let service = sqlite_service();
    let t1 = teacher(1);

    service
        .save_round(round(&t1, &[(1, Some(2)), (4, None)]))
        .await
        .unwrap();

    let latest = service.latest_with_history(&t1).await.unwrap();
    assert_eq!(latest.previous_pairs.len(), 3);
    assert_eq!(latest.previous_pairs.partners(&sid(4)), Some(&BTreeSet::new()));
}

#[tokio::test]
async fn test_round_with_history_not_found() {
    let service = sqlite_service();
    let t1 = teacher(1);
    let t2 = teacher(2);
    let saved = service.save_round(round(&t1, &[(1, Some(2))])).await.unwrap();

    let missing = service
        .round_with_history(&t1, RoundId::new(), HistoryView::Current)
        .await
        .unwrap_err();
    assert!(matches!(missing, HistoryError::RoundNotFound { .. }));

    let other_teacher = service
        .round_with_history(&t2, saved.id, HistoryView::Current)
        .await
        .unwrap_err();
    assert!(matches!(other_teacher, HistoryError::RoundNotFound { .. }));
}

#[tokio::test]
async fn test_round_with_history_current_vs_as_of() {
    let service = sqlite_service();
    let t1 = teacher(1);

    let first = service.save_round(round(&t1, &[(1, Some(2))])).await.unwrap();
    let second = service.save_round(round(&t1, &[(1, Some(3))])).await.unwrap();

    let current = service
        .round_with_history(&t1, first.id, HistoryView::Current)
        .await
        .unwrap();
    assert_eq!(current.round, first);
    assert_eq!(current.previous_pairs.partners(&sid(1)), Some(&set(&[2, 3])));

    let as_of = service
        .round_with_history(&t1, first.id, HistoryView::AsOfRound)
        .await
        .unwrap();
    assert_eq!(as_of.previous_pairs.partners(&sid(1)), Some(&set(&[2])));

    // For the newest round both views agree
    let latest_current = service
        .round_with_history(&t1, second.id, HistoryView::Current)
        .await
        .unwrap();
    let latest_as_of = service
        .round_with_history(&t1, second.id, HistoryView::AsOfRound)
        .await
        .unwrap();
    assert_eq!(latest_current, latest_as_of);
}

#[tokio::test]
async fn test_list_rounds_pages_and_caps() {
    let service = PairHistoryService::new(
        SqliteStore::new(":memory:").unwrap(),
        HistoryConfig {
            max_page_size: 2,
            ..fast_config()
        },
    );
    let t1 = teacher(1);

    let mut saved = Vec::new();
    for i in 0..4 {
        saved.push(
            service
                .save_round(round(&t1, &[(1, Some(10 + i)), (20 + i, None)]))
                .await
                .unwrap(),
        );
    }

    let all = service.list_rounds(&t1, RoundPage::all()).await.unwrap();
    assert_eq!(all.total, 4);
    assert_eq!(all.rounds.len(), 4);
    assert_eq!(all.rounds[0].id, saved[3].id);
    assert_eq!(all.rounds[0].pair_count, 2);
    assert_eq!(all.rounds[0].student_count, 3);

    let capped = service
        .list_rounds(&t1, RoundPage::window(1, 50))
        .await
        .unwrap();
    assert_eq!(capped.offset, 1);
    assert_eq!(capped.rounds.len(), 2);
    assert_eq!(capped.rounds[0].id, saved[2].id);

    let empty = service.list_rounds(&teacher(9), RoundPage::all()).await.unwrap();
    assert_eq!(empty.total, 0);
    assert!(empty.rounds.is_empty());
}

#[tokio::test]
async fn test_merge_retry_recovers() {
    let failures = Arc::new(AtomicUsize::new(2));
    let service = PairHistoryService::new(FaultyStore::new(failures.clone()), fast_config());
    let t1 = teacher(1);

    service.save_round(round(&t1, &[(1, Some(2))])).await.unwrap();

    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert_eq!(service.pending_index_count().await.unwrap(), 0);
    let map = service.resolve(set(&[1])).await.unwrap();
    assert!(map.have_paired(&sid(1), &sid(2)));
}

#[tokio::test]
async fn test_index_inconsistency_then_catch_up() {
    let failures = Arc::new(AtomicUsize::new(usize::MAX));
    let service = PairHistoryService::new(
        FaultyStore::new(failures.clone()),
        HistoryConfig {
            merge_retries: 1,
            ..fast_config()
        },
    );
    let t1 = teacher(1);

    let err = service
        .save_round(round(&t1, &[(1, Some(2))]))
        .await
        .unwrap_err();
    let HistoryError::IndexInconsistency { round_id, .. } = &err else {
        panic!("expected IndexInconsistency, got {err:?}");
    };
    assert!(!err.is_client_error());
    let pending = service.pending_rounds().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, *round_id);

    // The ledger kept the round; the index did not
    let latest = service.latest_with_history(&t1).await.unwrap();
    assert_eq!(latest.previous_pairs.partners(&sid(1)), Some(&BTreeSet::new()));
    assert_eq!(service.pending_index_count().await.unwrap(), 1);

    let stuck = service.catch_up().await.unwrap();
    assert_eq!(stuck.failed.len(), 1);

    failures.store(0, Ordering::SeqCst);
    let repaired = service.catch_up().await.unwrap();
    assert_eq!(repaired.rounds_merged, 1);
    assert!(repaired.is_clean());
    assert_eq!(service.pending_index_count().await.unwrap(), 0);

    let latest = service.latest_with_history(&t1).await.unwrap();
    assert_eq!(latest.previous_pairs.partners(&sid(1)), Some(&set(&[2])));
}

#[tokio::test]
async fn test_rebuild_index_matches_incremental() {
    let service = sqlite_service();
    let t1 = teacher(1);

    service.save_round(round(&t1, &[(1, Some(2)), (3, Some(4))])).await.unwrap();
    service.save_round(round(&t1, &[(1, Some(3)), (2, Some(4))])).await.unwrap();
    service.save_round(round(&t1, &[(1, Some(4)), (2, None)])).await.unwrap();

    let students = set(&[1, 2, 3, 4]);
    let before = service.resolve(students.clone()).await.unwrap();

    let report = service.rebuild_index(&t1).await.unwrap();
    assert_eq!(report.rounds_replayed, 3);
    assert_eq!(report.students_reset, 4);
    assert_eq!(service.resolve(students).await.unwrap(), before);
}

#[tokio::test]
async fn test_rebuild_index_keeps_other_teachers_edges() {
    let service = sqlite_service();
    let (t1, t2) = (teacher(1), teacher(2));

    service.save_round(round(&t1, &[(1, Some(2))])).await.unwrap();
    service.save_round(round(&t2, &[(1, Some(3))])).await.unwrap();

    let students = set(&[1, 2, 3]);
    let before = service.resolve(students.clone()).await.unwrap();
    assert_eq!(before.partners(&sid(1)), Some(&set(&[2, 3])));

    let report = service.rebuild_index(&t1).await.unwrap();
    assert_eq!(report.students_reset, 2);
    assert_eq!(report.rounds_replayed, 2);

    let after = service.resolve(students).await.unwrap();
    assert_eq!(after.partners(&sid(1)), Some(&set(&[2, 3])));
    assert_eq!(after.partners(&sid(2)), Some(&set(&[1])));
    assert_eq!(after.partners(&sid(3)), Some(&set(&[1])));
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_rebuild_index_for_empty_teacher() {
    let service = sqlite_service();
    service.save_round(round(&teacher(2), &[(1, Some(3))])).await.unwrap();

    let report = service.rebuild_index(&teacher(1)).await.unwrap();
    assert_eq!(report.rounds_replayed, 0);
    assert_eq!(report.students_reset, 0);

    let map = service.resolve(set(&[1])).await.unwrap();
    assert_eq!(map.partners(&sid(1)), Some(&set(&[3])));
}

#[tokio::test]
async fn test_storage_timeout() {
    let mut store = FaultyStore::new(Arc::new(AtomicUsize::new(0)));
    store.read_delay = Some(Duration::from_millis(200));
    let service = PairHistoryService::new(
        store,
        HistoryConfig {
            storage_timeout_ms: 20,
            ..fast_config()
        },
    );

    let err = service.latest_with_history(&teacher(1)).await.unwrap_err();
    assert!(matches!(
        err,
        HistoryError::StorageTimeout {
            operation: "latest_with_history"
        }
    ));
}

#[tokio::test]
async fn test_concurrent_saves_keep_index_consistent() {
    let service = sqlite_service();
    let t1 = teacher(1);

    let mut handles = Vec::new();
    for i in 0..8u8 {
        let service = service.clone();
        let new_round = round(&t1, &[(1, Some(10 + i))]);
        handles.push(tokio::spawn(async move { service.save_round(new_round).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listing = service.list_rounds(&t1, RoundPage::all()).await.unwrap();
    assert_eq!(listing.total, 8);

    let map = service.resolve(set(&[1])).await.unwrap();
    let expected: BTreeSet<_> = (0..8u8).map(|i| sid(10 + i)).collect();
    assert_eq!(map.partners(&sid(1)), Some(&expected));

    let latest = service.latest_with_history(&t1).await.unwrap();
    assert_eq!(latest.round.id, listing.rounds[0].id);
}
