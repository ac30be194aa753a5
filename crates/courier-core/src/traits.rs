use crate::error::CourierError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::io::AsyncRead;

/// A readable byte stream produced by file resolution.
pub type FileStream = Box<dyn AsyncRead + Send + Unpin>;

/// A file part for multipart uploads.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Form field name (e.g. `photo`, `document`).
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Bot API transport -- the wire.
///
/// Issues calls against the remote API and classifies failures into
/// [`CourierError::Network`] and [`CourierError::Api`]. Implementations never
/// retry; retry policy belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Call an API method with JSON parameters, returning the `result` field.
    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, CourierError>;

    /// Call an API method with a multipart body carrying one file.
    async fn upload(
        &self,
        method: &str,
        params: Value,
        upload: Upload,
        timeout: Duration,
    ) -> Result<Value, CourierError>;

    /// Stream a file stored on the API server by its server-relative path.
    /// `timeout` bounds the whole transfer, body included.
    async fn download_file(
        &self,
        server_path: &str,
        timeout: Duration,
    ) -> Result<FileStream, CourierError>;

    /// Stream an arbitrary URL with a plain GET.
    async fn fetch_url(&self, url: &str, timeout: Duration) -> Result<FileStream, CourierError>;
}

/// Persisted update cursor.
///
/// Lets a restarted process resume from the last acknowledged offset
/// instead of the server's unconfirmed queue.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Last saved cursor, if any.
    async fn load(&self) -> Result<Option<i64>, CourierError>;

    /// Save the cursor (highest consumed update id + 1).
    async fn save(&self, offset: i64) -> Result<(), CourierError>;
}
