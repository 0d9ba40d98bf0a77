//! Opaque blob storage for uploaded images and resumes. Blobs land under
//! `media_root` with generated names and are served back via the static
//! `/media` route; the database only ever stores the URL.

use std::path::PathBuf;

use hirewire_common::error::Result;
use hirewire_common::Error;
use uuid::Uuid;

#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Write a blob under `category/` and return its public URL.
    pub async fn store(&self, category: &str, content_type: &str, bytes: &[u8]) -> Result<String> {
        let name = format!("{}{}", Uuid::new_v4(), extension_for(content_type));
        let dir = self.root.join(category);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::validation(format!("failed to store file: {e}")))?;
        tokio::fs::write(dir.join(&name), bytes)
            .await
            .map_err(|e| Error::validation(format!("failed to store file: {e}")))?;

        Ok(format!("{}/{category}/{name}", self.base_url))
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "application/pdf" => ".pdf",
        _ => ".bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(extension_for("image/png"), ".png");
        assert_eq!(extension_for("application/pdf"), ".pdf");
        assert_eq!(extension_for("application/x-whatever"), ".bin");
    }

    #[tokio::test]
    async fn stores_under_category_and_returns_url() {
        let dir = std::env::temp_dir().join(format!("media-test-{}", Uuid::new_v4()));
        let store = MediaStore::new(&dir, "/media");

        let url = store.store("posts", "image/png", b"fakepng").await.unwrap();
        assert!(url.starts_with("/media/posts/"));
        assert!(url.ends_with(".png"));

        let name = url.rsplit('/').next().unwrap();
        let bytes = tokio::fs::read(dir.join("posts").join(name)).await.unwrap();
        assert_eq!(bytes, b"fakepng");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
