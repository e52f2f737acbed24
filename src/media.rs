use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    constants::{IMAGE_FORMATS, RECIPE_IMAGE_DIR},
    error::{MediaError, ValidationError},
};

#[derive(Debug, PartialEq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Decodes `data:image/<type>;base64,<payload>`.
pub fn decode_image(data_uri: &str) -> Result<DecodedImage, potion::Error> {
    let (header, payload) = data_uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .ok_or_else(|| ValidationError::new("Image must be a base64 encoded data URI"))?;

    let extension = IMAGE_FORMATS
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(header))
        .map(|(_, extension)| *extension)
        .ok_or_else(|| ValidationError::new(format!("Unsupported image type '{header}'")))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| ValidationError::new("Image is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ValidationError::new("Image is empty").into());
    }

    Ok(DecodedImage { extension, bytes })
}

/// Writes the image under the media root and returns its path relative to it.
pub async fn save_image(data_uri: &str, media_root: &Path) -> Result<String, potion::Error> {
    let image = decode_image(data_uri)?;

    let relative = format!(
        "{RECIPE_IMAGE_DIR}/{}.{}",
        uuid::Uuid::new_v4().simple(),
        image.extension
    );
    let target = media_root.join(&relative);

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(MediaError::from)?;
    }
    tokio::fs::write(&target, &image.bytes)
        .await
        .map_err(MediaError::from)?;

    log::trace!("> Stored image {relative}");
    Ok(relative)
}

pub async fn remove_image(relative: &str, media_root: &Path) {
    if let Err(e) = tokio::fs::remove_file(media_root.join(relative)).await {
        log::error!("> Failed to remove image {relative}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn decodes_png_data_uri() {
        let Ok(image) = decode_image(PIXEL) else {
            panic!("data uri should decode");
        };

        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(decode_image("iVBORw0KGgo=").is_err());
        assert!(decode_image("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_image("data:image/png;base64,!!!").is_err());
        assert!(decode_image("data:image/png;base64,").is_err());
    }

    #[tokio::test]
    async fn save_and_remove() {
        let root = tempfile::tempdir().unwrap();

        let Ok(relative) = save_image(PIXEL, root.path()).await else {
            panic!("image should be stored");
        };
        assert!(relative.starts_with("recipes/images/"));
        assert!(relative.ends_with(".png"));
        assert!(root.path().join(&relative).exists());

        remove_image(&relative, root.path()).await;
        assert!(!root.path().join(&relative).exists());
    }
}
