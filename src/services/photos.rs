use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::UploadConfig;

#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("Please upload a file")]
    Missing,
    #[error("Please upload an image file")]
    NotAnImage,
    #[error("Please upload an image less than {0}")]
    TooLarge(usize),
    #[error("Problem with file upload")]
    Write(#[source] std::io::Error),
}

/// One uploaded file as read from the multipart body
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Saves bootcamp photos as `photo_<id><ext>` in one directory
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
    max_size: usize,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>, max_size: usize) -> Self {
        Self { dir: dir.into(), max_size }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.path.clone(), config.max_file_upload)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn check(&self, upload: &PhotoUpload) -> Result<(), PhotoError> {
        let is_image = upload.content_type.as_deref().is_some_and(|ct| ct.starts_with("image"));
        if !is_image {
            return Err(PhotoError::NotAnImage);
        }
        if upload.bytes.len() > self.max_size {
            return Err(PhotoError::TooLarge(self.max_size));
        }
        Ok(())
    }

    pub fn file_name_for(bootcamp_id: &str, original: &str) -> String {
        let ext = Path::new(original)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        format!("photo_{}{}", bootcamp_id, ext)
    }

    /// Validate and write the upload; returns the stored file name
    pub async fn save(&self, bootcamp_id: &str, upload: &PhotoUpload) -> Result<String, PhotoError> {
        self.check(upload)?;
        let name = Self::file_name_for(bootcamp_id, &upload.file_name);
        let path = self.dir.join(&name);

        let written = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, &upload.bytes).await
        }
        .await;
        if let Err(e) = written {
            error!("Failed to write {}: {}", path.display(), e);
            return Err(PhotoError::Write(e));
        }

        info!("Stored bootcamp photo {}", path.display());
        Ok(name)
    }
}
