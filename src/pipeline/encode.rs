//! Image encoding: RGB pixels → PNG bytes → base64 payload.
//!
//! PNG is lossless, so rendered glyph edges reach the model exactly as
//! pdfium drew them, and encoding the same pixels twice yields the same
//! bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use tracing::debug;

pub const PNG_MIME: &str = "image/png";

/// Encode an RGB pixel buffer as PNG.
pub fn encode_png(pixels: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(pixels.clone()).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        pixels.width(),
        pixels.height(),
        buf.len()
    );
    Ok(buf)
}

/// Base64 (standard alphabet, padded) as expected by Ollama's `images` field.
pub fn to_base64(png: &[u8]) -> String {
    STANDARD.encode(png)
}

/// Wrap an already base64-encoded PNG for `edgequake_llm` providers.
///
/// `detail: "high"` keeps fine print legible for tiling providers.
pub fn to_image_data(png_base64: &str) -> ImageData {
    ImageData::new(png_base64.to_string(), PNG_MIME).with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn encode_small_image_is_png() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let png = encode_png(&img).expect("encode should succeed");
        assert_eq!(&png[..4], b"\x89PNG");

        let decoded = image::load_from_memory(&png).expect("valid png").to_rgb8();
        assert_eq!(decoded.get_pixel(3, 3), &Rgb([255, 0, 0]));
    }

    #[test]
    fn encoding_is_deterministic() {
        let img = RgbImage::from_fn(16, 8, |x, y| Rgb([x as u8, y as u8, 7]));
        assert_eq!(encode_png(&img).unwrap(), encode_png(&img).unwrap());
    }

    #[test]
    fn base64_round_trips() {
        let b64 = to_base64(b"\x89PNG\r\n");
        assert_eq!(STANDARD.decode(&b64).unwrap(), b"\x89PNG\r\n");
    }

    #[test]
    fn image_data_is_png() {
        let data = to_image_data("AAAA");
        assert_eq!(data.mime_type, PNG_MIME);
        assert_eq!(data.data, "AAAA");
    }
}
