//! Expanding command-line paths into the list of images to upload

use std::path::{Path, PathBuf};
use tracing::warn;

/// Extensions accepted as images, compared case-insensitively
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "bmp", "webp", "heic", "heif"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Images directly inside `dir`, sorted by path. Subdirectories are not entered.
pub fn image_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    files.sort();
    files
}

/// Expand files and directories, keeping the caller's order between arguments.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_dir() {
            images.extend(image_files(path));
        } else if path.is_file() {
            if is_image_file(path) {
                images.push(path.clone());
            } else {
                warn!("Skipping non-image file: {}", path.display());
            }
        } else {
            warn!("Path not found: {}", path.display());
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(is_image_file(Path::new("a.JPG")));
        assert!(is_image_file(Path::new("b.HeIc")));
        assert!(is_image_file(Path::new("c.tif")));
        assert!(!is_image_file(Path::new("d.gif")));
        assert!(!is_image_file(Path::new("README")));
    }

    #[test]
    fn directory_is_expanded_sorted_and_flat() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "notes.txt");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        touch(&nested, "deep.jpg");

        let found = image_files(dir.path());
        assert_eq!(found, vec![dir.path().join("a.jpg"), dir.path().join("b.png")]);
    }

    #[test]
    fn mixed_arguments_keep_order_and_skip_bad_entries() {
        let dir = tempdir().unwrap();
        let album = dir.path().join("album");
        fs::create_dir(&album).unwrap();
        touch(&album, "2.jpg");
        touch(&album, "1.jpg");
        let single = touch(dir.path(), "z.webp");
        let text = touch(dir.path(), "list.txt");

        let found = collect_images(&[
            single.clone(),
            text,
            dir.path().join("missing.jpg"),
            album.clone(),
        ]);

        assert_eq!(found, vec![single, album.join("1.jpg"), album.join("2.jpg")]);
    }

    #[test]
    fn nothing_found_is_empty() {
        let dir = tempdir().unwrap();
        assert!(collect_images(&[dir.path().to_path_buf()]).is_empty());
    }
}
