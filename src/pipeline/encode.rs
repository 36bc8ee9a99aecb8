//! Image encoding: page or slice file → base64 `ImageData`.
//!
//! VLM APIs (OpenAI, Anthropic, Gemini) accept images as base64 data-URIs
//! embedded in the JSON request body. Pages and slices are already PNG files
//! on disk, so their bytes are sent as-is; anything `image` does not
//! recognise as PNG or JPEG is decoded and re-encoded to PNG first.
//! `detail: "high"` instructs GPT-4-class models to use the full image tile
//! budget; without it small bar marks and `C/C` suffixes are lost.

use crate::error::ScheduleError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Read an image file and wrap it for the VLM API.
pub async fn encode_file(path: &Path) -> Result<ImageData, ScheduleError> {
    let io_err = |detail: String| ScheduleError::ImageIo {
        path: path.to_path_buf(),
        detail,
    };
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_err(e.to_string()))?;
    encode_bytes(bytes).map_err(|e| io_err(e.to_string()))
}

/// Wrap encoded image bytes, re-encoding to PNG when the format is not one
/// every provider accepts.
pub fn encode_bytes(bytes: Vec<u8>) -> Result<ImageData, image::ImageError> {
    let (mime, payload) = match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => ("image/png", bytes),
        Ok(ImageFormat::Jpeg) => ("image/jpeg", bytes),
        _ => ("image/png", to_png(&image::load_from_memory(&bytes)?)?),
    };

    let b64 = STANDARD.encode(&payload);
    debug!("Encoded image → {} bytes base64 ({})", b64.len(), mime);

    Ok(ImageData::new(b64, mime).with_detail("high"))
}

fn to_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn png_bytes_pass_through() {
        let png = to_png(&red_square()).unwrap();
        let data = encode_bytes(png.clone()).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, png);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(encode_bytes(b"definitely not an image".to_vec()).is_err());
    }

    #[tokio::test]
    async fn encode_file_reads_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("page_1.png");
        red_square().save_with_format(&path, ImageFormat::Png).unwrap();
        let data = encode_file(&path).await.unwrap();
        assert!(!data.data.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_image_io() {
        let err = encode_file(Path::new("/nonexistent/page_1.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::ImageIo { .. }));
    }
}
