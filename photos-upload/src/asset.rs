//! A local image queued for upload

use std::path::{Path, PathBuf};

/// File on disk plus the base name sent to the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub file_name: String,
}

impl ImageAsset {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, file_name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_base_name_only() {
        let asset = ImageAsset::from_path("/photos/2024/summer/beach.JPG");
        assert_eq!(asset.file_name, "beach.JPG");
        assert_eq!(asset.path, PathBuf::from("/photos/2024/summer/beach.JPG"));
    }
}
