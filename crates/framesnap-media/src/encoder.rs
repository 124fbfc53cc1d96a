use image::RgbImage;
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;

use crate::error::Result;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Turns a cropped surface into the bytes of an image file.
pub trait SurfaceEncoder: Send {
    /// File extension without the dot.
    fn extension(&self) -> &str;

    fn encode(&self, surface: &RgbImage) -> Result<Vec<u8>>;
}

/// Baseline JPEG via the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl SurfaceEncoder for JpegEncoder {
    fn extension(&self) -> &str {
        "jpg"
    }

    fn encode(&self, surface: &RgbImage) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = ImageJpegEncoder::new_with_quality(&mut out, self.quality);
            encoder.encode_image(surface)?;
        }
        Ok(out)
    }
}
