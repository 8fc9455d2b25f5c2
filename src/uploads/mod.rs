//! Blob store for customer reference images.
//!
//! Files are written under a local directory with generated names and
//! exposed to the rest of the app only as public `/uploads/<name>` paths.

use std::path::{Path, PathBuf};

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use rand::Rng;

use crate::config::MAX_UPLOAD_BYTES;
use crate::models::bookings::MAX_REFERENCE_FILES;

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only image files are allowed")]
    NotAnImage,
    #[error("File too large. Maximum size is 10MB")]
    TooLarge,
    #[error("Too many files. Maximum is 5")]
    TooManyFiles,
    #[error("Malformed upload: {0}")]
    Malformed(String),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh name and return its public path.
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String, UploadError> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = generate_filename(original_name);
        tokio::fs::write(self.dir.join(&filename), bytes).await?;

        Ok(format!("{PUBLIC_PREFIX}/{filename}"))
    }

    /// Best-effort removal of previously saved files, by public path.
    pub async fn remove_all(&self, public_paths: &[String]) {
        for path in public_paths {
            let Some(filename) = path
                .strip_prefix(PUBLIC_PREFIX)
                .map(|rest| rest.trim_start_matches('/'))
                .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
            else {
                continue;
            };

            if let Err(e) = tokio::fs::remove_file(self.dir.join(filename)).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path, error = %e, "Failed to remove upload");
                }
            }
        }
    }
}

/// Files stored for a single request; at most `MAX_REFERENCE_FILES`.
#[derive(Debug)]
pub struct UploadBatch<'a> {
    store: &'a UploadStore,
    saved: Vec<String>,
}

impl<'a> UploadBatch<'a> {
    pub fn new(store: &'a UploadStore) -> Self {
        Self {
            store,
            saved: Vec::new(),
        }
    }

    pub async fn add(&mut self, original_name: Option<&str>, bytes: &[u8]) -> Result<(), UploadError> {
        if self.saved.len() >= MAX_REFERENCE_FILES {
            return Err(UploadError::TooManyFiles);
        }
        let path = self.store.save(original_name, bytes).await?;
        self.saved.push(path);
        Ok(())
    }

    pub fn paths(&self) -> &[String] {
        &self.saved
    }

    /// Remove everything stored so far.
    pub async fn discard(self) {
        self.store.remove_all(&self.saved).await;
    }
}

/// `files-<unix millis>-<random><.ext>`, keeping a short alphanumeric extension.
pub fn generate_filename(original_name: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);

    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("files-{millis}-{suffix}{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_keeps_a_safe_extension() {
        let name = generate_filename(Some("My Photo.PNG"));
        assert!(name.starts_with("files-"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn filename_drops_suspicious_extensions() {
        assert!(!generate_filename(Some("x.p/h")).contains('/'));
        assert!(!generate_filename(None).contains('.'));
    }

    #[tokio::test]
    async fn save_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let path = store.save(Some("ref.jpg"), b"fake image").await.unwrap();
        assert!(path.starts_with("/uploads/files-"));
        let on_disk = dir.path().join(path.trim_start_matches("/uploads/"));
        assert!(on_disk.exists());

        store.remove_all(&[path]).await;
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn batch_refuses_a_sixth_file_and_discards_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let mut batch = UploadBatch::new(&store);

        for i in 0..MAX_REFERENCE_FILES {
            batch.add(Some(&format!("{i}.png")), b"img").await.unwrap();
        }
        assert!(matches!(
            batch.add(Some("6.png"), b"img").await,
            Err(UploadError::TooManyFiles)
        ));
        assert_eq!(batch.paths().len(), MAX_REFERENCE_FILES);

        batch.discard().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn oversized_files_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let big = vec![0u8; MAX_UPLOAD_BYTES + 1];

        assert!(matches!(
            store.save(Some("big.png"), &big).await,
            Err(UploadError::TooLarge)
        ));
    }
}
