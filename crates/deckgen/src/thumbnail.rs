//! Image post-processing.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::StageError;

/// Shrink an encoded image to a `size` x `size` RGB PNG.
///
/// Alpha is dropped and the aspect ratio is not preserved.
pub fn make_thumbnail(bytes: &[u8], size: u32) -> Result<Vec<u8>, StageError> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let resized = rgb.resize_exact(size, size, FilterType::Lanczos3);

    let mut out = Vec::new();
    resized.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 128]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_resizes_and_drops_alpha() {
        let thumb = make_thumbnail(&rgba_png(256, 200), 128).unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 128));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_rejects_garbage() {
        let result = make_thumbnail(b"definitely not an image", 128);
        assert!(matches!(result, Err(StageError::Image(_))));
    }
}
