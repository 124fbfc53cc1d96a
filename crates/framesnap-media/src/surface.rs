use image::{RgbImage, imageops};

use framesnap_core::geometry::{BYTES_PER_PIXEL, Geometry};

use crate::error::{MediaError, Result};

/// Copy a raw BGRX frame buffer into an RGB surface of
/// `(pitch / 4) x lines` pixels, padding included.
///
/// This is the one copy out of decoder memory; the buffer can be released as
/// soon as it returns.
pub fn unpack_bgra(bytes: &[u8], geometry: &Geometry) -> Result<RgbImage> {
    if bytes.len() != geometry.buffer_len() {
        return Err(MediaError::DecoderError(format!(
            "frame buffer holds {} bytes, expected {} ({}x{})",
            bytes.len(),
            geometry.buffer_len(),
            geometry.pitch,
            geometry.lines
        )));
    }

    let surface_width = geometry.surface_width();
    let pixels = bytes.len() / BYTES_PER_PIXEL as usize;
    let mut rgb = Vec::with_capacity(pixels * 3);
    for px in bytes.chunks_exact(BYTES_PER_PIXEL as usize) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }

    RgbImage::from_raw(surface_width, geometry.lines, rgb).ok_or_else(|| {
        MediaError::DecoderError(format!(
            "cannot build {surface_width}x{} surface",
            geometry.lines
        ))
    })
}

/// Crop away the alignment padding: keep the `width x height` region
/// anchored at the top-left corner.
pub fn crop_to_picture(surface: RgbImage, geometry: &Geometry) -> RgbImage {
    if surface.dimensions() == (geometry.width, geometry.height) {
        return surface;
    }
    imageops::crop_imm(&surface, 0, 0, geometry.width, geometry.height).to_image()
}
