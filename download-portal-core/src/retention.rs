//! Version-aware retention: which build artifacts are obsolete.
//!
//! The engine is pure. [`group`] buckets a listing into logical products by
//! normalized name, and [`decide`] keeps the newest `retain` versions of each
//! product. Nothing here touches storage; [`crate::prune`] performs deletions.
//!
//! Invariants:
//! - an entry without a parsable version is never marked for deletion;
//! - the retain count is at least one (`NonZeroUsize`);
//! - the same listing always yields the same decision, whatever its order.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use tracing::debug;

use crate::contract::StoredObject;
use crate::normalize::normalize;
use crate::version::{parse_version, Version};

/// One object inside a product group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub key: String,
    pub name: String,
    pub version: Option<Version>,
}

/// Normalized name → entries of that product, in listing order.
pub type ProductGroups = BTreeMap<String, Vec<GroupEntry>>;

/// Outcome of [`decide`]: every listed key lands in exactly one of the two sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionDecision {
    pub to_delete: Vec<String>,
    pub kept: Vec<String>,
}

/// Group `objects` by the normalized form of their display name.
pub fn group(objects: &[StoredObject]) -> ProductGroups {
    let mut groups = ProductGroups::new();
    for object in objects {
        let name = object.name();
        let entry = GroupEntry {
            key: object.key.clone(),
            name: name.to_string(),
            version: parse_version(name),
        };
        groups.entry(normalize(name)).or_default().push(entry);
    }
    groups
}

/// Decide which keys to delete so that each product keeps its newest `retain`
/// versions.
///
/// Versioned entries are ordered by version, then by key, so the result does
/// not depend on listing order. Keys come out sorted within each set.
pub fn decide(groups: &ProductGroups, retain: NonZeroUsize) -> RetentionDecision {
    let retain = retain.get();
    let mut decision = RetentionDecision::default();

    for (product, entries) in groups {
        let mut versioned: Vec<(&Version, &GroupEntry)> = Vec::new();
        for entry in entries {
            match &entry.version {
                Some(version) => versioned.push((version, entry)),
                None => decision.kept.push(entry.key.clone()),
            }
        }

        if versioned.len() <= retain {
            decision
                .kept
                .extend(versioned.iter().map(|(_, entry)| entry.key.clone()));
            continue;
        }

        versioned.sort_by(|(a, a_entry), (b, b_entry)| {
            a.cmp(b).then_with(|| a_entry.key.cmp(&b_entry.key))
        });
        let cutoff = versioned.len() - retain;
        let (obsolete, newest) = versioned.split_at(cutoff);

        debug!(
            product = %product,
            versions = versioned.len(),
            deleting = obsolete.len(),
            "Product exceeds retain count"
        );

        decision
            .to_delete
            .extend(obsolete.iter().map(|(_, entry)| entry.key.clone()));
        decision
            .kept
            .extend(newest.iter().map(|(_, entry)| entry.key.clone()));
    }

    decision.to_delete.sort();
    decision.kept.sort();
    decision
}
