//! Object-store collaborator boundary.
//!
//! The pipeline only ever asks for "bytes by key" and "store bytes by
//! key"; scheduling, retries, and the real backing service live outside
//! this crate. [`FsStore`] maps buckets onto directories so the pipeline
//! can run against local snapshots and in tests.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },
    #[error("transfer failed for object '{key}' in bucket '{bucket}'")]
    Transfer {
        bucket: String,
        key: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait ObjectStore {
    fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;
    fn store(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Filesystem-backed store: `root/bucket/key`, with keys allowed to
/// contain `/` separators.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket);
        for part in key.split('/').filter(|part| !part.is_empty()) {
            path.push(part);
        }
        path
    }
}

impl ObjectStore for FsStore {
    fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key);
        fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => StoreError::Transfer {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: err,
            },
        })
    }

    fn store(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key);
        let transfer = |err| StoreError::Transfer {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: err,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(transfer)?;
        }
        fs::write(&path, bytes).map_err(transfer)
    }
}
