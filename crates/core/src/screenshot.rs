use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("unsupported image format (expected PNG or JPEG)")]
    UnsupportedFormat,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// An uploaded screenshot, decoded into memory.
#[derive(Debug, Clone)]
pub struct Screenshot {
    image: DynamicImage,
}

impl Screenshot {
    /// Decodes PNG or JPEG bytes. Other formats are rejected even if the decoder
    /// could handle them.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScreenshotError> {
        let format = image::guess_format(bytes).map_err(|_| ScreenshotError::UnsupportedFormat)?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(ScreenshotError::UnsupportedFormat);
        }
        let image = image::load_from_memory_with_format(bytes, format)?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Re-encodes as PNG and returns the base64 text of the PNG byte stream.
    pub fn to_png_base64(&self) -> Result<String, image::ImageError> {
        let mut png = Cursor::new(Vec::new());
        self.image.write_to(&mut png, ImageFormat::Png)?;
        Ok(STANDARD.encode(png.into_inner()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_and_reencodes_as_base64_png() {
        let shot = Screenshot::from_bytes(&png_bytes(3, 2)).unwrap();
        assert_eq!((shot.width(), shot.height()), (3, 2));

        let b64 = shot.to_png_base64().unwrap();
        let decoded = STANDARD.decode(b64).unwrap();
        assert_eq!(image::guess_format(&decoded).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn jpeg_is_transcoded_to_png() {
        let mut jpeg = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(4, 4)
            .write_to(&mut jpeg, ImageFormat::Jpeg)
            .unwrap();
        let shot = Screenshot::from_bytes(jpeg.get_ref()).unwrap();

        let decoded = STANDARD.decode(shot.to_png_base64().unwrap()).unwrap();
        assert!(decoded.starts_with(b"\x89PNG"));
    }

    #[test]
    fn rejects_non_image_bytes() {
        assert!(matches!(
            Screenshot::from_bytes(b"not an image"),
            Err(ScreenshotError::UnsupportedFormat)
        ));
    }

    #[test]
    fn rejects_truncated_png() {
        let bytes = png_bytes(2, 2);
        assert!(matches!(
            Screenshot::from_bytes(&bytes[..20]),
            Err(ScreenshotError::Decode(_))
        ));
    }
}
