use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::DynamicImage;

use crate::DetectError;

/// Decode a base64 image payload, tolerating a `data:image/...;base64,`
/// header the way browser clients send it.
pub fn decode_base64_image(data: &str) -> crate::Result<DynamicImage> {
    let mut payload = data.trim();
    if payload.is_empty() {
        return Err(DetectError::NoImageProvided);
    }

    if let Some((head, tail)) = payload.split_once(',') {
        if head.starts_with("data:") {
            payload = tail;
        }
    }

    let bytes = BASE64.decode(payload).map_err(|e| {
        tracing::debug!(error = %e, "base64 decode failed");
        DetectError::InvalidImage
    })?;

    image::load_from_memory(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "image decode failed");
        DetectError::InvalidImage
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_base64() -> String {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        BASE64.encode(&bytes)
    }

    #[test]
    fn test_decodes_plain_base64() {
        let decoded = decode_base64_image(&png_base64()).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
    }

    #[test]
    fn test_strips_data_url_header() {
        let payload = format!("data:image/png;base64,{}", png_base64());
        assert!(decode_base64_image(&payload).is_ok());
    }

    #[test]
    fn test_empty_payload_is_no_image() {
        assert!(matches!(
            decode_base64_image("   "),
            Err(DetectError::NoImageProvided)
        ));
    }

    #[test]
    fn test_garbage_is_invalid_image() {
        assert!(matches!(
            decode_base64_image("not base64 at all!!"),
            Err(DetectError::InvalidImage)
        ));
        // Valid base64 that is not an image is still invalid.
        let bogus = BASE64.encode(b"hello world");
        assert!(matches!(
            decode_base64_image(&bogus),
            Err(DetectError::InvalidImage)
        ));
    }
}
