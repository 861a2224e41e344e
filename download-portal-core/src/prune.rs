//! High-level pipeline: list → decide → delete for one prune request.
//!
//! This module orchestrates a single retention pass over the bucket:
//!   - lists objects through an [`ObjectLister`] (optionally under a prefix)
//!   - runs the pure retention engine ([`crate::retention`])
//!   - unless the request is a dry run, deletes the obsolete keys through an
//!     [`ObjectDeleter`]
//!   - returns a [`PruneReport`] describing the remaining files, the removed
//!     keys and any per-key delete failures.
//!
//! # Error Handling
//! Only a listing failure aborts the pass (there is nothing to decide on).
//! Delete failures are best-effort: every key gets exactly one attempt, all
//! attempts run concurrently, and failures are reported per key instead of
//! failing the request. There is no retry.
//!
//! # State
//! Nothing is cached between calls; collaborators are passed in by the caller.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info};

use crate::contract::{FileItem, ObjectDeleter, ObjectLister, StorageError};
use crate::retention::{decide, group};

/// Parameters of one prune pass.
#[derive(Debug, Clone)]
pub struct PruneRequest {
    pub prefix: Option<String>,
    pub retain: NonZeroUsize,
    pub dry: bool,
}

impl Default for PruneRequest {
    fn default() -> Self {
        PruneRequest {
            prefix: None,
            retain: NonZeroUsize::MIN,
            dry: false,
        }
    }
}

/// A key whose delete attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub key: String,
    pub error: String,
}

/// Result of a prune pass, serialised as the `/api/files?prune=1` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Files left after the pass (or that would be left, for a dry run).
    pub files: Vec<FileItem>,
    /// Keys removed, or that would be removed when `dry`.
    pub deleted: Vec<String>,
    /// Keys whose delete failed; these are still present in `files`.
    pub failed: Vec<DeleteFailure>,
    pub dry: bool,
}

impl PruneReport {
    /// Report for a pass that found nothing to look at.
    pub fn empty(dry: bool) -> Self {
        PruneReport {
            files: Vec::new(),
            deleted: Vec::new(),
            failed: Vec::new(),
            dry,
        }
    }
}

/// Run one retention pass.
pub async fn prune<L, D>(
    lister: &L,
    deleter: &D,
    request: &PruneRequest,
) -> Result<PruneReport, StorageError>
where
    L: ObjectLister + ?Sized,
    D: ObjectDeleter + ?Sized,
{
    info!(
        prefix = request.prefix.as_deref().unwrap_or(""),
        retain = request.retain.get(),
        dry = request.dry,
        "[PRUNE] Starting retention pass"
    );

    let objects = lister.list(request.prefix.clone()).await.map_err(|e| {
        error!(error = ?e, "[PRUNE][ERROR] Listing failed");
        e
    })?;

    let groups = group(&objects);
    let decision = decide(&groups, request.retain);
    info!(
        objects = objects.len(),
        products = groups.len(),
        obsolete = decision.to_delete.len(),
        "[PRUNE] Retention decision made"
    );

    let (deleted, failed) = if request.dry {
        info!(would_delete = decision.to_delete.len(), "[PRUNE] Dry run, skipping deletes");
        (decision.to_delete, Vec::new())
    } else {
        delete_all(deleter, decision.to_delete).await
    };

    let removed: HashSet<&str> = deleted.iter().map(String::as_str).collect();
    let now = Utc::now();
    let files = objects
        .iter()
        .filter(|object| !removed.contains(object.key.as_str()))
        .map(|object| FileItem::from_object(object, now))
        .collect();

    Ok(PruneReport {
        files,
        deleted,
        failed,
        dry: request.dry,
    })
}

/// Attempt every delete once, concurrently. Returns (deleted, failed) with
/// each outcome attributed to its key.
pub async fn delete_all<D>(deleter: &D, keys: Vec<String>) -> (Vec<String>, Vec<DeleteFailure>)
where
    D: ObjectDeleter + ?Sized,
{
    let attempts = keys.into_iter().map(|key| async move {
        let outcome = deleter.delete(&key).await;
        (key, outcome)
    });

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for (key, outcome) in join_all(attempts).await {
        match outcome {
            Ok(()) => {
                info!(key = %key, "[PRUNE] Deleted obsolete object");
                deleted.push(key);
            }
            Err(e) => {
                error!(key = %key, error = %e, "[PRUNE][ERROR] Delete failed");
                failed.push(DeleteFailure {
                    key,
                    error: e.to_string(),
                });
            }
        }
    }
    (deleted, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockObjectDeleter;

    #[test]
    fn report_serialises_with_failures() {
        let mut report = PruneReport::empty(false);
        report.failed.push(DeleteFailure {
            key: "a-1.0.zip".into(),
            error: "denied".into(),
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "files": [],
                "deleted": [],
                "failed": [{ "key": "a-1.0.zip", "error": "denied" }],
                "dry": false
            })
        );
    }

    #[tokio::test]
    async fn delete_all_attributes_each_outcome_to_its_key() {
        let mut deleter = MockObjectDeleter::new();
        deleter.expect_delete().times(3).returning(|key: &str| {
            if key == "b-1.0.zip" {
                Err("access denied".into())
            } else {
                Ok(())
            }
        });

        let keys = vec!["a-1.0.zip".into(), "b-1.0.zip".into(), "c-1.0.zip".into()];
        let (deleted, failed) = delete_all(&deleter, keys).await;

        assert_eq!(deleted, vec!["a-1.0.zip", "c-1.0.zip"]);
        assert_eq!(
            failed,
            vec![DeleteFailure {
                key: "b-1.0.zip".into(),
                error: "access denied".into(),
            }]
        );
    }

    #[tokio::test]
    async fn delete_all_with_no_keys_does_nothing() {
        let mut deleter = MockObjectDeleter::new();
        deleter.expect_delete().times(0);

        let (deleted, failed) = delete_all(&deleter, Vec::new()).await;
        assert!(deleted.is_empty());
        assert!(failed.is_empty());
    }
}
