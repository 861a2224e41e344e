//! Storage backends. A backend is picked once, at startup, from
//! [`StorageConfig`] and shared as `Arc<dyn Bucket>` from then on.

mod manifest;
mod store_bucket;

pub use manifest::{ManifestBucket, ManifestError};
pub use store_bucket::{create_object_store_from_dsn, ObjectStoreBucket};

use std::sync::Arc;

use anyhow::Result;
use download_portal_core::contract::Bucket;
use tracing::info;

use crate::config::StorageConfig;

/// Build the configured backend.
pub fn connect(config: &StorageConfig) -> Result<Arc<dyn Bucket>> {
    match config {
        StorageConfig::ObjectStore { dsn, list_limit } => {
            info!("Connecting object store backend");
            Ok(Arc::new(ObjectStoreBucket::from_dsn(dsn, *list_limit)?))
        }
        StorageConfig::Manifest { path, public_url } => {
            info!("Connecting manifest backend");
            Ok(Arc::new(ManifestBucket::new(path.clone(), public_url.clone())))
        }
    }
}

/// Build the backend if one is configured; `None` means storage is not bound.
pub fn connect_optional(config: Option<&StorageConfig>) -> Result<Option<Arc<dyn Bucket>>> {
    match config {
        Some(config) => connect(config).map(Some),
        None => {
            info!("No storage configured, running unbound");
            Ok(None)
        }
    }
}
