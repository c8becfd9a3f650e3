use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use std::io::Cursor;

use crate::error::AppError;

/// Upload cap for profile pictures, in bytes.
pub const MAX_PICTURE_BYTES: usize = 50_000;
/// Side of the square every stored picture is cropped to.
pub const PICTURE_SIDE: u32 = 150;

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// process_profile_picture
///
/// Validates a raw upload, then decodes it (any format `image` recognizes),
/// crops it to a 150x150 square and re-encodes it as a JPEG data URI, which is
/// what the `users.profile_picture` column holds.
///
/// Decoding is CPU bound and runs on the blocking pool.
pub async fn process_profile_picture(bytes: Vec<u8>) -> Result<String, AppError> {
    if bytes.is_empty() {
        return Err(AppError::InvalidRequest);
    }
    if bytes.len() > MAX_PICTURE_BYTES {
        return Err(AppError::PayloadTooLarge);
    }
    tokio::task::spawn_blocking(move || encode_square_jpeg(&bytes))
        .await
        .map_err(|e| AppError::internal(format!("picture task failed: {}", e)))?
}

fn encode_square_jpeg(bytes: &[u8]) -> Result<String, AppError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| {
        tracing::debug!("picture rejected: {}", e);
        AppError::UnsupportedMediaType
    })?;

    // The JPEG encoder has no alpha channel.
    let square = decoded
        .resize_to_fill(PICTURE_SIDE, PICTURE_SIDE, FilterType::Triangle)
        .to_rgb8();

    let mut encoded = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(square)
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .map_err(|e| AppError::internal(format!("jpeg encoding failed: {}", e)))?;

    Ok(format!(
        "{}{}",
        DATA_URI_PREFIX,
        STANDARD.encode(encoded.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageBuffer, Rgba};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let buffer = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
        });
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(buffer)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[tokio::test]
    async fn pictures_become_square_jpeg_data_uris() {
        let uri = process_profile_picture(png(300, 120)).await.unwrap();
        let encoded = uri.strip_prefix(DATA_URI_PREFIX).unwrap();
        let jpeg = STANDARD.decode(encoded).unwrap();
        let reloaded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!(reloaded.dimensions(), (PICTURE_SIDE, PICTURE_SIDE));
    }

    #[tokio::test]
    async fn empty_upload_is_invalid() {
        assert!(matches!(
            process_profile_picture(Vec::new()).await,
            Err(AppError::InvalidRequest)
        ));
    }

    #[tokio::test]
    async fn oversized_upload_is_refused_before_decoding() {
        let bytes = vec![0u8; MAX_PICTURE_BYTES + 1];
        assert!(matches!(
            process_profile_picture(bytes).await,
            Err(AppError::PayloadTooLarge)
        ));
    }

    #[tokio::test]
    async fn non_image_bytes_are_unsupported() {
        let bytes = b"definitely not an image".to_vec();
        assert!(matches!(
            process_profile_picture(bytes).await,
            Err(AppError::UnsupportedMediaType)
        ));
    }
}
