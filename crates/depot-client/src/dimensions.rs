use image::ImageReader;
use std::io::Cursor;

/// Width and height read from the image header. `None` when the bytes are
/// not a recognizable image; the upload continues without dimensions.
pub fn measure_image(data: &[u8]) -> Option<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    reader.into_dimensions().ok()
}

/// Only image content types are measured.
pub fn is_measurable(content_type: &str) -> bool {
    content_type.trim().to_lowercase().starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_measures_png_header() {
        assert_eq!(measure_image(&png(37, 21)), Some((37, 21)));
    }

    #[test]
    fn test_garbage_has_no_dimensions() {
        assert_eq!(measure_image(b"definitely not an image"), None);
        assert_eq!(measure_image(&[]), None);
    }

    #[test]
    fn test_only_images_are_measurable() {
        assert!(is_measurable("image/png"));
        assert!(is_measurable(" IMAGE/JPEG"));
        assert!(!is_measurable("video/mp4"));
    }
}
