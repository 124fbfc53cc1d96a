use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Row stride and row count are padded to this many units.
pub const ALIGNMENT_GRAIN: u32 = 32;

/// Packed BGRA/BGRX: one byte per channel, four channels.
pub const BYTES_PER_PIXEL: u32 = 4;

/// Round `size` up to the next multiple of `grain`. Values that are already
/// aligned are returned unchanged.
///
/// Computed in `u64`, so the result is exact for every `u32` input. A zero
/// grain has no multiples to round to and leaves `size` as it is.
pub fn align(size: u32, grain: u32) -> u64 {
    let size = u64::from(size);
    match u64::from(grain) {
        0 => size,
        grain => size.div_ceil(grain) * grain,
    }
}

/// Like [`align`], but `None` when the rounded value does not fit in a `u32`
/// or `grain` is zero.
pub fn checked_align(size: u32, grain: u32) -> Option<u32> {
    if grain == 0 {
        return None;
    }
    u32::try_from(align(size, grain)).ok()
}

/// Shorthand for [`align`] with the default 32 grain.
pub fn align32(size: u32) -> u64 {
    align(size, ALIGNMENT_GRAIN)
}

/// Per-run frame layout: the logical picture and the padded raw buffer the
/// decoder writes into. Computed once before playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub pitch: u32,
    /// Padded row count.
    pub lines: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let invalid = || CoreError::InvalidGeometry { width, height };
        if width == 0 || height == 0 {
            return Err(invalid());
        }

        let row_bytes = width.checked_mul(BYTES_PER_PIXEL).ok_or_else(invalid)?;
        let pitch = checked_align(row_bytes, ALIGNMENT_GRAIN).ok_or_else(invalid)?;
        let lines = checked_align(height, ALIGNMENT_GRAIN).ok_or_else(invalid)?;

        // The buffer length must be addressable.
        (pitch as usize)
            .checked_mul(lines as usize)
            .ok_or_else(invalid)?;

        Ok(Self {
            width,
            height,
            pitch,
            lines,
        })
    }

    /// Size in bytes of one raw frame buffer (`pitch * lines`).
    pub fn buffer_len(&self) -> usize {
        self.pitch as usize * self.lines as usize
    }

    /// Width in pixels of the padded surface (`pitch / 4`).
    pub fn surface_width(&self) -> u32 {
        self.pitch / BYTES_PER_PIXEL
    }

    /// Bytes of real pixel data in each row, excluding padding.
    pub fn row_bytes(&self) -> usize {
        (self.width * BYTES_PER_PIXEL) as usize
    }

    pub fn is_padded(&self) -> bool {
        self.surface_width() != self.width || self.lines != self.height
    }
}
