use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use download_portal_core::contract::{MockObjectDeleter, MockObjectLister, StoredObject};
use download_portal_core::prune::{prune, PruneRequest};

fn listing() -> Vec<StoredObject> {
    vec![
        StoredObject::new("macos/MyApp-v1.0.0-arm64.dmg", 10),
        StoredObject::new("macos/MyApp-v1.1.0-arm64.dmg", 11),
        StoredObject::new("macos/MyApp-v1.2.0-arm64.dmg", 12),
        StoredObject::new("windows/MyApp-1.1.0-x64.exe", 20),
        StoredObject::new("windows/MyApp-1.2.0-x64.exe", 21),
        StoredObject::new("docs/README.pdf", 5),
    ]
}

fn request(retain: usize, dry: bool) -> PruneRequest {
    PruneRequest {
        prefix: None,
        retain: NonZeroUsize::new(retain).unwrap(),
        dry,
    }
}

#[tokio::test]
async fn test_prune_deletes_obsolete_versions_and_lists_survivors() {
    let mut lister = MockObjectLister::new();
    lister.expect_list().return_once(|_| Ok(listing()));

    let deleted_keys = Arc::new(Mutex::new(Vec::new()));
    let recorder = deleted_keys.clone();
    let mut deleter = MockObjectDeleter::new();
    deleter.expect_delete().times(3).returning(move |key: &str| {
        recorder.lock().unwrap().push(key.to_string());
        Ok(())
    });

    let report = prune(&lister, &deleter, &request(1, false))
        .await
        .expect("prune should succeed");

    assert!(!report.dry);
    assert_eq!(
        report.deleted,
        vec![
            "macos/MyApp-v1.0.0-arm64.dmg",
            "macos/MyApp-v1.1.0-arm64.dmg",
            "windows/MyApp-1.1.0-x64.exe",
        ]
    );
    assert!(report.failed.is_empty());

    let mut calls = deleted_keys.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, report.deleted);

    let remaining: Vec<_> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        remaining,
        vec![
            "macos/MyApp-v1.2.0-arm64.dmg",
            "windows/MyApp-1.2.0-x64.exe",
            "docs/README.pdf",
        ]
    );
}

#[tokio::test]
async fn test_dry_run_never_calls_deleter() {
    let mut lister = MockObjectLister::new();
    lister.expect_list().return_once(|_| Ok(listing()));

    let mut deleter = MockObjectDeleter::new();
    deleter.expect_delete().times(0);

    let report = prune(&lister, &deleter, &request(1, true))
        .await
        .expect("dry run should succeed");

    assert!(report.dry);
    assert_eq!(report.deleted.len(), 3, "would-be deletions are still reported");
    assert_eq!(report.files.len(), 3);
}

#[tokio::test]
async fn test_one_failed_delete_does_not_stop_the_others() {
    let mut lister = MockObjectLister::new();
    lister.expect_list().return_once(|_| Ok(listing()));

    let mut deleter = MockObjectDeleter::new();
    deleter.expect_delete().times(3).returning(|key: &str| {
        if key == "macos/MyApp-v1.1.0-arm64.dmg" {
            Err("permission denied".into())
        } else {
            Ok(())
        }
    });

    let report = prune(&lister, &deleter, &request(1, false))
        .await
        .expect("a delete failure must not fail the pass");

    assert_eq!(
        report.deleted,
        vec!["macos/MyApp-v1.0.0-arm64.dmg", "windows/MyApp-1.1.0-x64.exe"]
    );
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, "macos/MyApp-v1.1.0-arm64.dmg");
    assert!(report.failed[0].error.contains("permission denied"));
    assert!(
        report
            .files
            .iter()
            .any(|f| f.path == "macos/MyApp-v1.1.0-arm64.dmg"),
        "a key that failed to delete is still listed"
    );
}

#[tokio::test]
async fn test_prefix_is_passed_to_lister() {
    let mut lister = MockObjectLister::new();
    lister
        .expect_list()
        .withf(|prefix| prefix.as_deref() == Some("macos/"))
        .return_once(|_| {
            Ok(listing()
                .into_iter()
                .filter(|o| o.key.starts_with("macos/"))
                .collect())
        });

    let mut deleter = MockObjectDeleter::new();
    deleter.expect_delete().times(1).returning(|_| Ok(()));

    let req = PruneRequest {
        prefix: Some("macos/".to_string()),
        ..request(2, false)
    };
    let report = prune(&lister, &deleter, &req).await.expect("prune");

    assert_eq!(report.deleted, vec!["macos/MyApp-v1.0.0-arm64.dmg"]);
    assert_eq!(report.files.len(), 2);
}

#[tokio::test]
async fn test_listing_failure_is_returned_to_caller() {
    let mut lister = MockObjectLister::new();
    lister
        .expect_list()
        .return_once(|_| Err("bucket unreachable".into()));

    let mut deleter = MockObjectDeleter::new();
    deleter.expect_delete().times(0);

    let err = prune(&lister, &deleter, &request(1, false))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("bucket unreachable"));
}

#[tokio::test]
async fn test_repeated_dry_runs_agree() {
    let mut lister = MockObjectLister::new();
    lister.expect_list().times(2).returning(|_| Ok(listing()));
    let deleter = MockObjectDeleter::new();

    let first = prune(&lister, &deleter, &request(1, true)).await.unwrap();
    let second = prune(&lister, &deleter, &request(1, true)).await.unwrap();

    assert_eq!(first.deleted, second.deleted);
}
