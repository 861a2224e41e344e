//! Read-only [`Bucket`] over a static JSON manifest (`files.json`).
//!
//! The manifest is a JSON array of `{ "path": "...", "size": 123 }` entries;
//! other fields (`id`, `name`) are accepted and ignored since both are derived
//! from the path. When a `public_url` is configured, files are served from
//! `{public_url}/{path}` and missing sizes are discovered with a `HEAD` request.
//!
//! The manifest is re-read on every call; nothing is cached.
//!
//! [`Bucket`]: download_portal_core::contract::Bucket

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use download_portal_core::contract::{
    ObjectBody, ObjectDeleter, ObjectLister, ObjectReader, StorageError, StoredObject,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// Failures specific to the manifest backend.
#[derive(Debug)]
pub enum ManifestError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Http(reqwest::Error),
    Upstream { key: String, status: StatusCode },
    ReadOnly(String),
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io(e) => write!(f, "failed to read manifest: {e}"),
            ManifestError::Json(e) => write!(f, "failed to parse manifest: {e}"),
            ManifestError::Http(e) => write!(f, "request to public_url failed: {e}"),
            ManifestError::Upstream { key, status } => {
                write!(f, "upstream returned {status} for {key}")
            }
            ManifestError::ReadOnly(key) => {
                write!(f, "manifest storage is read-only, cannot delete {key}")
            }
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Io(e) => Some(e),
            ManifestError::Json(e) => Some(e),
            ManifestError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ManifestError {
    fn from(e: std::io::Error) -> Self {
        ManifestError::Io(e)
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(e: serde_json::Error) -> Self {
        ManifestError::Json(e)
    }
}

impl From<reqwest::Error> for ManifestError {
    fn from(e: reqwest::Error) -> Self {
        ManifestError::Http(e)
    }
}

/// HEAD requests in flight at once while filling in missing sizes.
pub const SIZE_LOOKUP_CONCURRENCY: usize = 8;

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    path: String,
    #[serde(default)]
    size: Option<u64>,
}

pub struct ManifestBucket {
    path: PathBuf,
    public_url: Option<String>,
    http: Client,
}

impl ManifestBucket {
    pub fn new(path: PathBuf, public_url: Option<String>) -> Self {
        info!(
            path = %path.display(),
            public_url = public_url.as_deref().unwrap_or(""),
            "Initialized manifest bucket"
        );
        Self {
            path,
            public_url,
            http: Client::new(),
        }
    }

    fn public_url_for(&self, key: &str) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key))
    }

    async fn read_entries(&self) -> Result<Vec<ManifestEntry>, ManifestError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            error!(error = ?e, path = %self.path.display(), "Failed to read manifest");
            ManifestError::from(e)
        })?;
        let entries: Vec<ManifestEntry> = serde_json::from_str(&content).map_err(|e| {
            error!(error = ?e, path = %self.path.display(), "Failed to parse manifest JSON");
            ManifestError::from(e)
        })?;
        Ok(entries)
    }

    /// Size from `content-length` of a HEAD request; 0 when unknown.
    async fn discover_size(&self, key: &str) -> u64 {
        let Some(url) = self.public_url_for(key) else {
            return 0;
        };
        match self.http.head(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0),
            Ok(resp) => {
                debug!(url = %url, status = %resp.status(), "HEAD for size was not successful");
                0
            }
            Err(e) => {
                debug!(url = %url, error = %e, "HEAD for size failed");
                0
            }
        }
    }
}

#[async_trait]
impl ObjectLister for ManifestBucket {
    async fn list(&self, prefix: Option<String>) -> Result<Vec<StoredObject>, StorageError> {
        let prefix = prefix.unwrap_or_default();
        let entries: Vec<ManifestEntry> = self
            .read_entries()
            .await?
            .into_iter()
            .filter(|entry| entry.path.starts_with(&prefix))
            .collect();

        let objects: Vec<StoredObject> = stream::iter(entries)
            .map(|entry| async move {
                let size = match entry.size {
                    Some(size) if size > 0 => size,
                    _ => self.discover_size(&entry.path).await,
                };
                StoredObject::new(entry.path, size)
            })
            .buffered(SIZE_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        debug!(prefix = %prefix, count = objects.len(), "Listed manifest entries");
        Ok(objects)
    }
}

#[async_trait]
impl ObjectReader for ManifestBucket {
    async fn get(&self, key: &str) -> Result<Option<ObjectBody>, StorageError> {
        let entries = self.read_entries().await?;
        let Some(entry) = entries.iter().find(|e| e.path == key) else {
            debug!(key = %key, "Key not present in manifest");
            return Ok(None);
        };
        let Some(url) = self.public_url_for(key) else {
            warn!(key = %key, "Manifest has no public_url, cannot serve file");
            return Ok(None);
        };

        let resp = self.http.get(&url).send().await.map_err(ManifestError::from)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            error!(url = %url, status = %resp.status(), "Upstream returned error for file");
            return Err(ManifestError::Upstream {
                key: key.to_string(),
                status: resp.status(),
            }
            .into());
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let size = resp
            .content_length()
            .or(entry.size.filter(|size| *size > 0));
        let stream = resp
            .bytes_stream()
            .map_err(|e| StorageError::from(ManifestError::from(e)))
            .boxed();
        Ok(Some(ObjectBody {
            stream,
            size,
            content_type,
        }))
    }
}

#[async_trait]
impl ObjectDeleter for ManifestBucket {
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        warn!(key = %key, "Refusing delete on manifest storage");
        Err(ManifestError::ReadOnly(key.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, routing::get, Router};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tokio::net::TcpListener;

    fn manifest(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp manifest");
        file.write_all(json.as_bytes()).expect("write manifest");
        file
    }

    #[tokio::test]
    async fn lists_entries_filtered_by_prefix() {
        let file = manifest(
            r#"[
                {"id": "1", "name": "ignored", "path": "macos/App-1.0.dmg", "size": 10},
                {"path": "windows/App-1.0.exe", "size": 20},
                {"path": "macos/App-1.1.dmg"}
            ]"#,
        );
        let bucket = ManifestBucket::new(file.path().to_path_buf(), None);

        let all = bucket.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].key, "macos/App-1.0.dmg");
        assert_eq!(all[0].size, 10);
        assert_eq!(all[2].size, 0, "no public_url means size stays unknown");

        let mac = bucket.list(Some("macos/".into())).await.unwrap();
        assert_eq!(mac.len(), 2);
    }

    #[tokio::test]
    async fn malformed_manifest_is_an_error() {
        let file = manifest("{not json");
        let bucket = ManifestBucket::new(file.path().to_path_buf(), None);
        let err = bucket.list(None).await.unwrap_err();
        assert!(err.to_string().contains("failed to parse manifest"));
    }

    #[tokio::test]
    async fn delete_is_refused() {
        let file = manifest("[]");
        let bucket = ManifestBucket::new(file.path().to_path_buf(), None);
        let err = bucket.delete("macos/App-1.0.dmg").await.unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn get_without_public_url_is_not_found() {
        let file = manifest(r#"[{"path": "a.zip", "size": 1}]"#);
        let bucket = ManifestBucket::new(file.path().to_path_buf(), None);
        assert!(bucket.get("a.zip").await.unwrap().is_none());
        assert!(bucket.get("b.zip").await.unwrap().is_none());
    }

    #[test]
    fn public_url_is_joined_without_double_slash() {
        let bucket = ManifestBucket::new(
            PathBuf::from("files.json"),
            Some("https://cdn.example.com/".into()),
        );
        assert_eq!(
            bucket.public_url_for("macos/App.dmg").as_deref(),
            Some("https://cdn.example.com/macos/App.dmg")
        );
    }

    #[derive(Clone, Default)]
    struct InFlight {
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    async fn slow_file(State(in_flight): State<InFlight>) -> Vec<u8> {
        let now = in_flight.current.fetch_add(1, Ordering::SeqCst) + 1;
        in_flight.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        in_flight.current.fetch_sub(1, Ordering::SeqCst);
        vec![b'x'; 512]
    }

    #[tokio::test]
    async fn size_lookups_are_bounded_and_keep_manifest_order() {
        let in_flight = InFlight::default();
        let app = Router::new()
            .route("/*path", get(slow_file))
            .with_state(in_flight.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let public_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await });

        let count = SIZE_LOOKUP_CONCURRENCY * 3;
        let entries: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"path": "builds/App-1.{i}.zip"}}"#))
            .collect();
        let file = manifest(&format!("[{}]", entries.join(",")));
        let bucket = ManifestBucket::new(file.path().to_path_buf(), Some(public_url));

        let objects = bucket.list(None).await.unwrap();

        assert_eq!(objects.len(), count);
        for (i, object) in objects.iter().enumerate() {
            assert_eq!(object.key, format!("builds/App-1.{i}.zip"));
            assert_eq!(object.size, 512);
        }
        let peak = in_flight.peak.load(Ordering::SeqCst);
        assert!(
            peak <= SIZE_LOOKUP_CONCURRENCY,
            "{peak} HEAD requests ran at once"
        );
    }
}
