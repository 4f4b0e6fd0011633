//! Cross-module lifecycle checks: identity drivers behind the common
//! surface, the reconciliation retention rule, and the progression curve a
//! transferred score feeds into.

use promptback_client::identity::{FlatFileStore, RecordStore};
use promptback_client::reconcile::{apply_outcome, ReconcileOutcome};
use promptback_client::{level_from_total_xp, rank_from_level, IdentityStore};
use tempfile::tempdir;

fn drivers(dir: &std::path::Path) -> Vec<IdentityStore> {
    vec![
        IdentityStore::Flat(FlatFileStore::new(dir.join("flat"))),
        IdentityStore::Records(RecordStore::new(dir.join("records"))),
    ]
}

#[tokio::test]
async fn identity_contract_holds_across_file_drivers() {
    let dir = tempdir().unwrap();
    for store in drivers(dir.path()) {
        let first = store.get_or_create().await.unwrap();
        assert_eq!(first, store.get_or_create().await.unwrap());
        assert!(store.has_session().await.unwrap());

        store.clear().await.unwrap();
        assert!(!store.has_session().await.unwrap());

        let second = store.get_or_create().await.unwrap();
        assert_ne!(first, second);

        // Clearing twice is a no-op, not an error.
        store.clear().await.unwrap();
        store.clear().await.unwrap();
    }
}

#[tokio::test]
async fn transferred_outcome_leaves_no_identity_behind() {
    // A guest scores, then registers and the score moves over: the local
    // identity must be gone afterwards, in every driver.
    let dir = tempdir().unwrap();
    for store in drivers(dir.path()) {
        store.get_or_create().await.unwrap();
        apply_outcome(&store, &ReconcileOutcome::Transferred { score: 91 })
            .await
            .unwrap();
        assert!(store.current().await.unwrap().is_none());
    }
}

#[tokio::test]
async fn transfer_failure_keeps_identity_for_retry() {
    let dir = tempdir().unwrap();
    for store in drivers(dir.path()) {
        let id = store.get_or_create().await.unwrap();
        apply_outcome(&store, &ReconcileOutcome::TransferFailed)
            .await
            .unwrap();
        assert_eq!(store.current().await.unwrap().as_deref(), Some(id.as_str()));

        // A later retry that succeeds then clears it.
        apply_outcome(&store, &ReconcileOutcome::Transferred { score: 91 })
            .await
            .unwrap();
        assert!(store.current().await.unwrap().is_none());
    }
}

#[tokio::test]
async fn transfer_settles_even_when_storage_is_degraded() {
    // With an unwritable data dir the drivers run on an in-memory id. A
    // successful login whose score was transferred must still settle
    // cleanly: the caller keeps the auth session, the identity is gone.
    let degraded = std::path::PathBuf::from("/dev/null/nope");
    for store in [
        IdentityStore::Flat(FlatFileStore::new(degraded.clone())),
        IdentityStore::Records(RecordStore::new(degraded.clone())),
    ] {
        store.get_or_create().await.unwrap();
        apply_outcome(&store, &ReconcileOutcome::Transferred { score: 10 })
            .await
            .unwrap();
        assert!(store.current().await.unwrap().is_none());
    }
}

#[test]
fn transferred_score_feeds_the_progression_curve() {
    // Ten perfect daily scores worth 100 XP each.
    let info = level_from_total_xp(1_000);
    assert!(info.level >= 4, "1000 XP should clear several levels");
    assert!(info.progress_to_next_level >= 0.0 && info.progress_to_next_level <= 100.0);

    let rank = rank_from_level(info.level);
    assert!(info.level >= rank.min_level);
    if let Some(max) = rank.max_level {
        assert!(info.level <= max);
    }
}
