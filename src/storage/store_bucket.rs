//! [`Bucket`] backed by an `object_store` implementation (in-memory, local
//! filesystem or S3-compatible), addressed by DSN.
//!
//! [`Bucket`]: download_portal_core::contract::Bucket

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use download_portal_core::contract::{
    ObjectBody, ObjectDeleter, ObjectLister, ObjectReader, StorageError, StoredObject,
};
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, ObjectStore};
use tracing::{debug, info};
use url::Url;

pub struct ObjectStoreBucket {
    store: Arc<dyn ObjectStore>,
    list_limit: usize,
}

impl ObjectStoreBucket {
    pub fn new(store: Arc<dyn ObjectStore>, list_limit: usize) -> Self {
        Self { store, list_limit }
    }

    pub fn from_dsn(dsn: &str, list_limit: usize) -> Result<Self> {
        let store = create_object_store_from_dsn(dsn)?;
        info!(list_limit, "Initialized object store bucket");
        Ok(Self::new(store, list_limit))
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

/// Object stores match prefixes by whole path segment; listings here match
/// by plain string prefix. List from the last complete segment and filter.
fn segment_prefix(prefix: &str) -> Option<ObjectPath> {
    prefix
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .filter(|dir| !dir.is_empty())
        .map(ObjectPath::from)
}

#[async_trait]
impl ObjectLister for ObjectStoreBucket {
    async fn list(&self, prefix: Option<String>) -> Result<Vec<StoredObject>, StorageError> {
        let prefix = prefix.unwrap_or_default();
        let base = segment_prefix(&prefix);
        let mut stream = self.store.list(base.as_ref());

        let mut objects = Vec::new();
        while let Some(meta_result) = stream.next().await {
            let meta = meta_result?;
            let key = meta.location.to_string();
            if !key.starts_with(&prefix) {
                continue;
            }
            objects.push(StoredObject {
                key,
                size: meta.size,
                last_modified: Some(meta.last_modified),
            });
            if objects.len() >= self.list_limit {
                debug!(list_limit = self.list_limit, "Listing truncated at limit");
                break;
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(prefix = %prefix, count = objects.len(), "Listed objects");
        Ok(objects)
    }
}

#[async_trait]
impl ObjectReader for ObjectStoreBucket {
    async fn get(&self, key: &str) -> Result<Option<ObjectBody>, StorageError> {
        let location = ObjectPath::from(key);
        let result = match self.store.get(&location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                debug!(key = %key, "Object not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| AsRef::<str>::as_ref(value).to_string());
        let size = result.meta.size;
        let stream = result.into_stream().map_err(StorageError::from).boxed();
        Ok(Some(ObjectBody {
            stream,
            size: Some(size),
            content_type,
        }))
    }
}

#[async_trait]
impl ObjectDeleter for ObjectStoreBucket {
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.store.delete(&ObjectPath::from(key)).await?;
        Ok(())
    }
}

/// Create an object store from a DSN string
pub fn create_object_store_from_dsn(dsn: &str) -> Result<Arc<dyn ObjectStore>> {
    let url =
        Url::parse(dsn).map_err(|e| anyhow::anyhow!("Invalid storage DSN '{}': {}", dsn, e))?;

    match url.scheme() {
        "file" => {
            let path = url.path();
            if path.is_empty() || path == "/" {
                return Err(anyhow::anyhow!(
                    "File DSN must specify a path: file:///path/to/storage"
                ));
            }
            Ok(Arc::new(LocalFileSystem::new_with_prefix(path)?))
        }
        "memory" => Ok(Arc::new(InMemory::new())),
        "s3" => {
            let builder = create_s3_builder_from_dsn(&url)?;
            Ok(Arc::new(builder.build()?))
        }
        scheme => Err(anyhow::anyhow!(
            "Unsupported storage scheme: {}. Supported: file, memory, s3",
            scheme
        )),
    }
}

/// DSN format: s3://[access_key:secret_key@]host[:port]/bucket
fn create_s3_builder_from_dsn(dsn: &Url) -> Result<AmazonS3Builder> {
    let host = dsn
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("Missing S3 host in DSN"))?;
    let bucket = dsn.path().trim_start_matches('/');
    if bucket.is_empty() {
        return Err(anyhow::anyhow!(
            "S3 DSN must specify a bucket: s3://host/bucket"
        ));
    }

    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

    let access_key = dsn.username();
    if !access_key.is_empty() {
        builder = builder
            .with_access_key_id(access_key)
            .with_secret_access_key(dsn.password().unwrap_or(""));
    }

    // Anything but AWS itself (R2, MinIO, ...) needs an explicit endpoint.
    if !host.contains("amazonaws.com") {
        let endpoint = match dsn.port() {
            None | Some(443) => format!("https://{host}"),
            Some(port) => format!("http://{host}:{port}"),
        };
        let allow_http = endpoint.starts_with("http://");
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(allow_http)
            .with_virtual_hosted_style_request(false);
    }

    Ok(builder)
}
