//! File references and their resolution to byte streams.

use courier_core::{
    error::CourierError,
    traits::{FileStream, Transport},
    types::File,
};
use serde_json::json;
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::OnceCell,
};
use tracing::debug;

/// A file that can be turned into a byte stream or uploaded.
pub enum FileRef {
    /// A file stored on the Bot API server. The server path is looked up
    /// at most once and cached.
    Remote {
        file_id: String,
        path: OnceCell<String>,
    },
    /// A file on local disk.
    Local(PathBuf),
    /// A file behind a public URL.
    Url(String),
    /// A caller-supplied stream. Consumed by the first resolution.
    Reader(Mutex<Option<FileStream>>),
}

impl FileRef {
    pub fn remote(file_id: impl Into<String>) -> Self {
        Self::Remote {
            file_id: file_id.into(),
            path: OnceCell::new(),
        }
    }

    /// A remote file whose server path is already known.
    pub fn remote_with_path(file_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Remote {
            file_id: file_id.into(),
            path: OnceCell::new_with(Some(path.into())),
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Reader(Mutex::new(Some(Box::new(reader))))
    }

    /// Server-side file id for remote files.
    pub fn file_id(&self) -> Option<&str> {
        match self {
            Self::Remote { file_id, .. } => Some(file_id),
            _ => None,
        }
    }

    /// Server path, if it has been looked up (or was known up front).
    pub fn cached_path(&self) -> Option<&str> {
        match self {
            Self::Remote { path, .. } => path.get().map(String::as_str),
            _ => None,
        }
    }

    /// Name to use for multipart uploads.
    pub(crate) fn upload_name(&self) -> Option<String> {
        match self {
            Self::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            Self::Url(url) => url
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            _ => None,
        }
    }
}

impl From<&File> for FileRef {
    fn from(file: &File) -> Self {
        match &file.file_path {
            Some(path) => Self::remote_with_path(&file.file_id, path),
            None => Self::remote(&file.file_id),
        }
    }
}

impl fmt::Debug for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote { file_id, path } => f
                .debug_struct("Remote")
                .field("file_id", file_id)
                .field("path", &path.get())
                .finish(),
            Self::Local(path) => f.debug_tuple("Local").field(path).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Turns [`FileRef`]s into byte streams.
#[derive(Clone)]
pub struct FileResolver {
    api: Arc<dyn Transport>,
    timeout: Duration,
}

impl FileResolver {
    pub fn new(api: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    /// File metadata for a server-side file id (`getFile`).
    pub async fn file_by_id(&self, file_id: &str) -> Result<File, CourierError> {
        let result = self
            .api
            .call("getFile", json!({"file_id": file_id}), self.timeout)
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Open a readable stream for `file`.
    ///
    /// The caller owns the stream and must drop it when done.
    pub async fn resolve(&self, file: &FileRef) -> Result<FileStream, CourierError> {
        match file {
            FileRef::Remote { file_id, path } => {
                let path = path
                    .get_or_try_init(|| async {
                        debug!("resolving server path for file {file_id}");
                        let meta = self.file_by_id(file_id).await?;
                        meta.file_path.ok_or_else(|| {
                            CourierError::NotFound(format!("file {file_id} has no server path"))
                        })
                    })
                    .await?;
                self.api.download_file(path, self.timeout).await
            }
            FileRef::Local(path) => match tokio::fs::File::open(path).await {
                Ok(f) => Ok(Box::new(f)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(CourierError::NotFound(path.display().to_string()))
                }
                Err(e) => Err(e.into()),
            },
            FileRef::Url(url) => self.api.fetch_url(url, self.timeout).await,
            FileRef::Reader(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or_else(|| CourierError::NotFound("reader already consumed".into())),
        }
    }

    /// Read `file` fully into memory.
    pub async fn read_all(&self, file: &FileRef) -> Result<Vec<u8>, CourierError> {
        let mut stream = self.resolve(file).await?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;
        Ok(bytes)
    }

    /// Copy `file` to `dest`, creating parent directories. Returns bytes written.
    pub async fn download(&self, file: &FileRef, dest: &Path) -> Result<u64, CourierError> {
        let mut stream = self.resolve(file).await?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut out = tokio::fs::File::create(dest).await?;
        let written = tokio::io::copy(&mut stream, &mut out).await?;
        debug!("downloaded {written} bytes to {}", dest.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;

    fn resolver(api: &Arc<FakeTransport>) -> FileResolver {
        FileResolver::new(api.clone(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_remote_path_fetched_once() {
        let api = Arc::new(FakeTransport::new());
        api.push_ok(
            "getFile",
            json!({"file_id": "abc", "file_unique_id": "u", "file_path": "docs/a.txt"}),
        );
        api.add_file("docs/a.txt", b"alpha");

        let files = resolver(&api);
        let file = FileRef::remote("abc");
        assert_eq!(file.cached_path(), None);

        let mut first = Vec::new();
        files
            .resolve(&file)
            .await
            .unwrap()
            .read_to_end(&mut first)
            .await
            .unwrap();
        let second = files.read_all(&file).await.unwrap();

        assert_eq!(first, b"alpha");
        assert_eq!(second, b"alpha");
        assert_eq!(api.call_count("getFile"), 1);
        assert_eq!(api.downloads(), vec!["docs/a.txt", "docs/a.txt"]);
        assert_eq!(file.cached_path(), Some("docs/a.txt"));
    }

    #[tokio::test]
    async fn test_remote_with_known_path_skips_lookup() {
        let api = Arc::new(FakeTransport::new());
        api.add_file("voice/v.ogg", b"ogg");

        let meta = File {
            file_id: "v1".into(),
            file_unique_id: "u".into(),
            file_size: Some(3),
            file_path: Some("voice/v.ogg".into()),
        };
        let file = FileRef::from(&meta);
        let bytes = resolver(&api).read_all(&file).await.unwrap();
        assert_eq!(bytes, b"ogg");
        assert_eq!(api.call_count("getFile"), 0);
    }

    #[tokio::test]
    async fn test_remote_without_path_is_not_found() {
        let api = Arc::new(FakeTransport::new());
        api.push_ok("getFile", json!({"file_id": "big"}));

        let err = match resolver(&api).resolve(&FileRef::remote("big")).await {
            Ok(_) => panic!("expected not found"),
            Err(e) => e,
        };
        assert!(matches!(err, CourierError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_lookup_is_retried_next_time() {
        let api = Arc::new(FakeTransport::new());
        api.push_err("getFile", CourierError::Network("timeout".into()));
        api.push_ok("getFile", json!({"file_id": "abc", "file_path": "a"}));
        api.add_file("a", b"x");

        let files = resolver(&api);
        let file = FileRef::remote("abc");
        assert!(files.resolve(&file).await.is_err());
        assert_eq!(files.read_all(&file).await.unwrap(), b"x");
        assert_eq!(api.call_count("getFile"), 2);
    }

    #[tokio::test]
    async fn test_local_file() {
        let dir = std::env::temp_dir().join(format!("__courier_files_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("note.txt");
        tokio::fs::write(&path, b"local bytes").await.unwrap();

        let api = Arc::new(FakeTransport::new());
        let file = FileRef::local(&path);
        assert_eq!(file.upload_name().as_deref(), Some("note.txt"));
        let bytes = resolver(&api).read_all(&file).await.unwrap();
        assert_eq!(bytes, b"local bytes");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_local_missing_is_not_found() {
        let api = Arc::new(FakeTransport::new());
        let file = FileRef::local("/nonexistent/__courier/missing.bin");
        let err = match resolver(&api).resolve(&file).await {
            Ok(_) => panic!("expected not found"),
            Err(e) => e,
        };
        assert!(matches!(err, CourierError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reader_is_single_use() {
        let api = Arc::new(FakeTransport::new());
        let file = FileRef::reader(std::io::Cursor::new(b"once".to_vec()));
        let files = resolver(&api);

        assert_eq!(files.read_all(&file).await.unwrap(), b"once");
        let err = match files.resolve(&file).await {
            Ok(_) => panic!("reader should be consumed"),
            Err(e) => e,
        };
        assert!(matches!(err, CourierError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_url_is_fetched() {
        let api = Arc::new(FakeTransport::new());
        api.add_url("https://example.com/cat.png", b"png");
        let file = FileRef::url("https://example.com/cat.png");
        assert_eq!(file.upload_name().as_deref(), Some("cat.png"));
        assert_eq!(resolver(&api).read_all(&file).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let api = Arc::new(FakeTransport::new());
        api.add_file("photos/p.jpg", b"jpeg");
        let dest = std::env::temp_dir()
            .join(format!("__courier_dl_{}", std::process::id()))
            .join("nested")
            .join("p.jpg");

        let file = FileRef::remote_with_path("p", "photos/p.jpg");
        let written = resolver(&api).download(&file, &dest).await.unwrap();
        assert_eq!(written, 4);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"jpeg");

        if let Some(root) = dest.parent().and_then(Path::parent) {
            let _ = tokio::fs::remove_dir_all(root).await;
        }
    }
}
