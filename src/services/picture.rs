use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::services::ServiceError;

/// Reads event picture blobs stored under `general.images_path`.
pub struct PictureService {
    root: PathBuf,
}

impl PictureService {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Picture references are relative paths that stay inside the image root.
    pub fn validate_path(path: &str) -> Result<(), ServiceError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::validation("Picture path cannot be empty"));
        }

        let candidate = Path::new(trimmed);
        let escapes = candidate
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ServiceError::validation(
                "Picture path must be relative to the image directory",
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim())
    }

    /// Encodes the blob behind `path` as a `data:` URI, or `None` when it
    /// cannot be read.
    pub async fn preview(&self, path: &str) -> Option<String> {
        if Self::validate_path(path).is_err() {
            warn!(path, "Refusing to read picture outside the image directory");
            return None;
        }

        let full_path = self.resolve(path);
        match fs::read(&full_path).await {
            Ok(bytes) => Some(format!(
                "data:{};base64,{}",
                mime_for(&full_path),
                STANDARD.encode(bytes)
            )),
            Err(e) => {
                warn!(path = %full_path.display(), error = %e, "Event picture unreadable");
                None
            }
        }
    }
}

/// Guesses from the extension; blobs without a known one are served as jpeg.
fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map_or_else(|| "image/jpeg".to_string(), |mime| mime.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_paths_leaving_the_root() {
        assert!(PictureService::validate_path("events/poster.jpg").is_ok());
        assert!(PictureService::validate_path("./poster.jpg").is_ok());
        assert!(PictureService::validate_path("").is_err());
        assert!(PictureService::validate_path("../secret.jpg").is_err());
        assert!(PictureService::validate_path("/etc/passwd").is_err());
        assert!(PictureService::validate_path("a/../../b.jpg").is_err());
    }

    #[tokio::test]
    async fn preview_encodes_existing_blob() {
        let root = std::env::temp_dir().join(format!("campus-pictures-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("poster.jpg"), b"abc").unwrap();

        let pictures = PictureService::new(&root);
        assert_eq!(
            pictures.preview("poster.jpg").await.as_deref(),
            Some("data:image/jpeg;base64,YWJj")
        );
        assert!(pictures.preview("missing.jpg").await.is_none());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn mime_follows_the_extension() {
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("a.bmp")), "image/bmp");
        assert_eq!(mime_for(Path::new("events/a.gif")), "image/gif");
    }

    #[test]
    fn unknown_extension_falls_back_to_jpeg() {
        assert_eq!(mime_for(Path::new("poster")), "image/jpeg");
        assert_eq!(mime_for(Path::new("poster.campusblob")), "image/jpeg");
    }
}
