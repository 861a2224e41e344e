//! # contract: storage collaborators and the data they exchange
//!
//! This module defines the interface between the portal and whatever holds the
//! build artifacts (an object store, a static manifest, a mock in tests).
//!
//! ## Interface & Extensibility
//! - [`ObjectLister`] lists stored objects under an optional key prefix.
//! - [`ObjectReader`] fetches a single object for download.
//! - [`ObjectDeleter`] removes a single key; each call may fail independently.
//! - [`Bucket`] is the full capability set and is blanket-implemented for any
//!   type providing all three, so a backend is chosen once and shared as
//!   `Arc<dyn Bucket>`.
//!
//! ## Mocking & Testing
//! - Each trait is annotated for `mockall`, exported behind the
//!   `test-export-mocks` feature so dependent crates can use the mocks too.
//!
//! ## Errors
//! - All collaborator errors are boxed trait objects ([`StorageError`]); the
//!   callers decide whether a failure is fatal, recorded, or swallowed.

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type for storage collaborators (simple boxed error).
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

/// One object as reported by the lister. Immutable once listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Storage-assigned unique key, e.g. `macos/MyApp-v1.2.0-arm64.dmg`.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when the backend knows it.
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoredObject {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
        }
    }

    /// Display name: the last path segment of the key.
    pub fn name(&self) -> &str {
        display_name(&self.key)
    }
}

/// Last path segment of `key`, or the whole key when it ends with `/`.
pub fn display_name(key: &str) -> &str {
    match key.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => key,
    }
}

/// Chunks of an object body, read lazily from the backend.
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// A fetched object. The body is streamed; nothing is buffered up front.
pub struct ObjectBody {
    pub stream: ByteStream,
    /// Total length in bytes, when the backend reports it.
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

impl ObjectBody {
    /// Body over an in-memory buffer.
    pub fn from_bytes(bytes: Bytes, content_type: Option<String>) -> Self {
        let size = bytes.len() as u64;
        Self {
            stream: stream::once(async move { Ok(bytes) }).boxed(),
            size: Some(size),
            content_type,
        }
    }

    /// Drain the stream into one buffer.
    pub async fn into_bytes(self) -> Result<Bytes, StorageError> {
        let mut buf = BytesMut::new();
        let mut stream = self.stream;
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBody")
            .field("size", &self.size)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// A file entry as served to the portal frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub path: String,
    pub created_at: String,
}

impl FileItem {
    /// Build the frontend entry for `object`. `now` stands in for objects
    /// without a modification time.
    pub fn from_object(object: &StoredObject, now: DateTime<Utc>) -> Self {
        let created = object.last_modified.unwrap_or(now);
        FileItem {
            id: object.key.clone(),
            name: object.name().to_string(),
            size: object.size,
            path: object.key.clone(),
            created_at: created.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Lists stored objects. Treated as a trusted, already-correct dependency.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// List every object whose key starts with `prefix` (all objects when `None`).
    async fn list(&self, prefix: Option<String>) -> Result<Vec<StoredObject>, StorageError>;
}

/// Fetches single objects for download.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectReader: Send + Sync {
    /// Fetch `key`. `Ok(None)` means the object does not exist.
    async fn get(&self, key: &str) -> Result<Option<ObjectBody>, StorageError>;
}

/// Removes single objects. Each call is independent and idempotent by key.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectDeleter: Send + Sync {
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Full storage capability: everything the portal needs from a backend.
pub trait Bucket: ObjectLister + ObjectReader + ObjectDeleter {}

impl<T> Bucket for T where T: ObjectLister + ObjectReader + ObjectDeleter {}
