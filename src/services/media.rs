use std::path::{Path, PathBuf};

use image::ImageFormat;
use uuid::Uuid;

use crate::{
    constants::{IMAGE_FIELD, RECIPE_IMAGE_DIR},
    error::{Error, HtmlError},
};

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Local file storage for uploaded media. Stored paths are relative to the
/// root and are served under `/media/`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates the bytes as an image and writes them to
    /// `uploads/recipe/<uuid><ext>`. Returns the relative path.
    pub async fn save_recipe_image(
        &self,
        filename: Option<&str>,
        data: &[u8],
    ) -> Result<String, Error> {
        let format = validate_image(data)?;
        let relative = format!(
            "{RECIPE_IMAGE_DIR}/{}.{}",
            Uuid::new_v4(),
            extension(filename, format)
        );

        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(storage_error)?;
        }
        tokio::fs::write(&path, data).await.map_err(storage_error)?;

        log::info!("Stored image at {}", path.display());
        Ok(relative)
    }
}

fn storage_error(e: std::io::Error) -> Error {
    log::error!("Failed to write media file: {e}");
    HtmlError::InternalServerError.default()
}

/// Checks that `data` decodes as one of the supported formats.
pub fn validate_image(data: &[u8]) -> Result<ImageFormat, Error> {
    if data.is_empty() {
        return Err(Error::field(IMAGE_FIELD, "The submitted file is empty."));
    }

    let format = image::guess_format(data).map_err(|_| Error::field(IMAGE_FIELD, INVALID_IMAGE))?;
    image::load_from_memory_with_format(data, format)
        .map_err(|_| Error::field(IMAGE_FIELD, INVALID_IMAGE))?;

    Ok(format)
}

/// The uploaded file's own extension when it names the detected format
/// (`photo.JPEG` keeps `jpeg`), otherwise the format's canonical extension.
/// Files are served with a mime type guessed from it.
fn extension(filename: Option<&str>, format: ImageFormat) -> String {
    let known = format.extensions_str();
    let own = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| known.iter().any(|known| *known == ext.as_str()));

    own.unwrap_or_else(|| known.first().copied().unwrap_or("img").to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::DynamicImage;

    use super::*;

    fn png() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(4, 4)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn png_is_accepted() {
        assert_eq!(validate_image(&png()).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn text_is_rejected_on_image_field() {
        let err = validate_image(b"notanimage").unwrap_err();
        assert!(err.fields.contains_key(IMAGE_FIELD));
    }

    #[test]
    fn truncated_image_is_rejected() {
        let data = png();
        assert!(validate_image(&data[..data.len() / 2]).is_err());
    }

    #[test]
    fn extension_follows_detected_format() {
        assert_eq!(extension(Some("photo.JPEG"), ImageFormat::Jpeg), "jpeg");
        assert_eq!(extension(Some("photo.jpg"), ImageFormat::Png), "png");
        assert_eq!(extension(Some("page.html"), ImageFormat::Png), "png");
        assert_eq!(extension(Some("photo"), ImageFormat::Png), "png");
        assert_eq!(extension(None, ImageFormat::Jpeg), "jpg");
    }

    #[tokio::test]
    async fn saved_image_lands_under_uuid_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());

        let first = storage.save_recipe_image(Some("a.png"), &png()).await.unwrap();
        let second = storage.save_recipe_image(Some("a.png"), &png()).await.unwrap();

        assert!(first.starts_with("uploads/recipe/"));
        assert!(first.ends_with(".png"));
        assert_ne!(first, second);
        assert!(dir.path().join(&first).exists());
    }

    #[tokio::test]
    async fn invalid_image_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());

        assert!(storage.save_recipe_image(Some("a.png"), b"junk").await.is_err());
        assert!(!dir.path().join(RECIPE_IMAGE_DIR).exists());
    }
}
