//! Batch orchestration: album resolution, then caption, upload and commit
//! for each file in order.

use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

use crate::album::{create_album, verify_album};
use crate::asset::ImageAsset;
use crate::caption::CaptionExtractor;
use crate::committer::{MediaItemResult, commit};
use crate::error::BatchError;
use crate::photos_api::PhotosLibrary;
use crate::transport::upload_file;

/// Characters of a caption shown in the progress log
const CAPTION_PREVIEW_CHARS: usize = 50;

/// Where the batch's media items go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumTarget {
    /// Create a new album with this title
    Create(String),
    /// Use an album that already exists
    Existing(String),
}

impl AlbumTarget {
    /// Exactly one of the two options must be given. Blank values count as
    /// absent; present values are kept as given.
    pub fn from_options(album_name: Option<&str>, album_id: Option<&str>) -> Result<Self, BatchError> {
        fn present(value: Option<&str>) -> Option<&str> {
            value.filter(|v| !v.trim().is_empty())
        }

        match (present(album_name), present(album_id)) {
            (Some(_), Some(_)) => Err(BatchError::ConflictingAlbumOptions),
            (None, None) => Err(BatchError::MissingAlbumOption),
            (Some(name), None) => Ok(AlbumTarget::Create(name.to_string())),
            (None, Some(id)) => Ok(AlbumTarget::Existing(id.to_string())),
        }
    }
}

/// Pipeline stage a file failed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Upload,
    Commit,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Upload => write!(f, "upload"),
            FailureStage::Commit => write!(f, "commit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file_name: String,
    pub stage: FailureStage,
    pub reason: String,
}

/// Counts for a finished batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub album_id: Option<String>,
    pub failures: Vec<FileFailure>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Upload complete! {}/{} images uploaded successfully.",
            self.succeeded, self.attempted
        )
    }
}

fn caption_preview(caption: &str) -> String {
    if caption.chars().count() > CAPTION_PREVIEW_CHARS {
        let head: String = caption.chars().take(CAPTION_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        caption.to_string()
    }
}

/// Uploads a list of files into one album, one file at a time.
pub struct BatchUploader<'a> {
    library: &'a dyn PhotosLibrary,
    extractor: CaptionExtractor,
}

impl<'a> BatchUploader<'a> {
    pub fn new(library: &'a dyn PhotosLibrary) -> Self {
        Self::with_extractor(library, CaptionExtractor::new())
    }

    pub fn with_extractor(library: &'a dyn PhotosLibrary, extractor: CaptionExtractor) -> Self {
        Self { library, extractor }
    }

    /// Run the batch. Only album problems abort; per-file failures end up in
    /// [`BatchSummary::failures`].
    pub async fn run(
        &self,
        files: &[PathBuf],
        album_name: Option<&str>,
        album_id: Option<&str>,
    ) -> Result<BatchSummary, BatchError> {
        let target = AlbumTarget::from_options(album_name, album_id)?;

        if files.is_empty() {
            info!("No images to upload.");
            return Ok(BatchSummary::default());
        }

        let album_id = self.resolve_album(target).await?;

        let mut summary = BatchSummary {
            attempted: files.len(),
            album_id: Some(album_id.clone()),
            ..Default::default()
        };

        for (index, path) in files.iter().enumerate() {
            let asset = ImageAsset::from_path(path);
            info!("[{}/{}] Processing: {}", index + 1, files.len(), asset.file_name);

            match self.process(&asset, &album_id).await {
                Ok(()) => summary.succeeded += 1,
                Err(failure) => summary.failures.push(failure),
            }
        }

        info!("{}", summary);
        Ok(summary)
    }

    async fn resolve_album(&self, target: AlbumTarget) -> Result<String, BatchError> {
        match target {
            AlbumTarget::Create(title) => match create_album(self.library, &title).await {
                Some(id) => {
                    info!("Album ID: {}", id);
                    info!("Reuse it with --album-id {} to add more photos later", id);
                    Ok(id)
                }
                None => {
                    error!("Failed to create album '{}'", title);
                    Err(BatchError::AlbumCreationFailed(title))
                }
            },
            AlbumTarget::Existing(id) => {
                if verify_album(self.library, &id).await {
                    Ok(id)
                } else {
                    Err(BatchError::AlbumNotAccessible(id))
                }
            }
        }
    }

    async fn process(&self, asset: &ImageAsset, album_id: &str) -> Result<(), FileFailure> {
        let caption = self.extractor.extract(&asset.path);
        if let Some(caption) = &caption {
            info!("  Description: {}", caption_preview(caption));
        }

        let Some(token) = upload_file(self.library, asset).await else {
            return Err(FileFailure {
                file_name: asset.file_name.clone(),
                stage: FailureStage::Upload,
                reason: "upload request failed".to_string(),
            });
        };

        match commit(self.library, token, &asset.file_name, caption.as_deref(), Some(album_id)).await {
            MediaItemResult::Created { .. } => Ok(()),
            MediaItemResult::Failed { file_name, reason } => Err(FileFailure {
                file_name,
                stage: FailureStage::Commit,
                reason,
            }),
        }
    }
}
