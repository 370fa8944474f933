//! Errors that abort a whole batch
//!
//! Per-file problems never surface here; they are logged and counted in
//! [`crate::batch::BatchSummary`] instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Either an album name or an album ID must be provided")]
    MissingAlbumOption,

    #[error("Provide either an album name or an album ID, not both")]
    ConflictingAlbumOptions,

    #[error("Failed to create album '{0}'")]
    AlbumCreationFailed(String),

    #[error("Album {0} is not accessible")]
    AlbumNotAccessible(String),
}
