//! Bulk uploader for the Google Photos Library API
//!
//! Takes local image files, reads a caption from their embedded EXIF
//! metadata, uploads the bytes, and creates one media item per file inside
//! a new or existing album.
//!
//! The pipeline, per file and strictly in order:
//! - [`caption::CaptionExtractor`] reads the caption (optional)
//! - [`transport::upload_file`] posts the raw bytes and gets an upload token
//! - [`committer::commit`] turns the token into a media item
//!
//! [`batch::BatchUploader`] drives that loop after resolving the album, and
//! everything talks to the service through [`photos_api::PhotosLibrary`].

pub mod album;
pub mod asset;
pub mod auth;
pub mod batch;
pub mod caption;
pub mod committer;
pub mod discovery;
pub mod error;
pub mod oauth;
pub mod photos_api;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use asset::ImageAsset;
pub use auth::{AccessTokenSource, Authenticator, ClientConfig, StaticToken, TokenCache};
pub use batch::{AlbumTarget, BatchSummary, BatchUploader};
pub use caption::{CaptionExtractor, CaptionSource};
pub use committer::MediaItemResult;
pub use error::BatchError;
pub use photos_api::{PhotosClient, PhotosLibrary, UploadToken};
