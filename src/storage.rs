// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for saving photos on this machine

use crate::app::state::PhotoRecord;
use crate::constants::photo_file_name;
use crate::errors::PhotoError;
use crate::pipelines::photo::CompositeResult;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Photo save directory (`~/Pictures/<folder>`)
pub fn photo_directory(folder: &str) -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(folder)
}

/// Write `image` to `path`, creating parent directories
pub async fn save_composite(path: &Path, image: &CompositeResult) -> Result<(), PhotoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &image.png[..]).await?;
    debug!(path = %path.display(), bytes = image.len(), "Wrote composite");
    Ok(())
}

/// Save a session photo as `photobooth_<ms>.png` in `dir`
pub async fn save_photo(dir: &Path, record: &PhotoRecord) -> Result<PathBuf, PhotoError> {
    let path = dir.join(photo_file_name(record.captured_at));
    save_composite(&path, &record.image).await?;
    info!(path = %path.display(), "Photo saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CaptureMode;
    use crate::pipelines::photo::encoding::encode_png;
    use image::RgbaImage;

    #[tokio::test]
    async fn test_save_photo_names_file_by_capture_time() {
        let dir = tempfile::tempdir().unwrap();
        let image = encode_png(&RgbaImage::new(3, 2), CaptureMode::Landscape).unwrap();
        let record = PhotoRecord::new(image.clone(), 1_700_000_000_123);

        let path = save_photo(&dir.path().join("nested"), &record).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "photobooth_1700000000123.png");
        assert_eq!(std::fs::read(&path).unwrap(), image.png.to_vec());
    }

    #[test]
    fn test_photo_directory_ends_with_folder() {
        assert!(photo_directory("Photobooth").ends_with("Photobooth"));
    }
}
