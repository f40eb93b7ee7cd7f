//! Blobstore client for Google Cloud Storage.
//!
//! [`GcsClient`] talks to the storage XML API with `reqwest`. Callers that
//! only need the five blobstore verbs should program against the
//! [`Blobstore`] trait.

pub mod client;
pub mod credentials;
pub mod error;
pub mod signer;

pub use client::GcsClient;
pub use error::{ClientError, Result};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream::BoxStream, Stream};
use gcsblob_models::SignAction;
use std::{io, pin::Pin, time::Duration};

/// Upload bodies go straight into `reqwest::Body::wrap_stream`, which needs `Sync`.
pub type UploadStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;
pub type DownloadStream = BoxStream<'static, io::Result<Bytes>>;

pub struct UploadBody {
    pub stream: UploadStream,
    /// Known for plain files, unknown for compressed uploads
    pub len: Option<u64>,
}

impl UploadBody {
    pub fn new(stream: UploadStream, len: Option<u64>) -> Self {
        Self { stream, len }
    }
}

pub struct Download {
    pub stream: DownloadStream,
    pub len: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Body is gzip compressed; stored with `Content-Encoding: gzip`.
    pub gzipped: bool,
}

#[async_trait]
pub trait Blobstore: Send + Sync {
    async fn put(&self, body: UploadBody, dst: &str, options: PutOptions) -> Result<()>;

    async fn get(&self, src: &str) -> Result<Download>;

    /// Deleting a blob that does not exist succeeds.
    async fn delete(&self, id: &str) -> Result<()>;

    async fn exists(&self, id: &str) -> Result<bool>;

    fn sign(&self, id: &str, action: SignAction, expiry: Duration) -> Result<String>;
}
