use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use framesnap_core::buffer::{BufferLedger, BufferView, FrameBuffer};
use framesnap_core::capture::FrameCallbacks;
use framesnap_core::error::{CoreError, Result};
use framesnap_core::geometry::Geometry;
use framesnap_core::source::{Playback, StopObserver, VideoFormat, VideoSource};

/// Byte written into every padding pixel, so a crop that leaks padding is
/// visible in the output.
pub const PADDING_JUNK: [u8; 4] = [0xFF, 0x00, 0xFF, 0xFF];

/// Solid RGB color painted into the visible area of frame `frame_index`.
pub fn frame_color(frame_index: u64) -> [u8; 3] {
    let i = frame_index as u8;
    [i.wrapping_mul(37), 128u8.wrapping_add(i.wrapping_mul(11)), 255 - i]
}

/// Counters shared with a running [`SyntheticSource`].
#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    delivered: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
}

impl SourceStats {
    /// Frames that completed an open/ready cycle.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    /// Frames dropped because no buffer could be opened or written.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Acquire)
    }
}

/// In-process push decoder producing solid-color BGRA frames on its own
/// thread. Drives the same callbacks as a real decoder, without ffmpeg.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    frames: u64,
    interval: Duration,
    stall: bool,
    double_open_at: Option<u64>,
    abort_at: Option<u64>,
    format: Option<VideoFormat>,
    stats: SourceStats,
}

impl SyntheticSource {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            interval: Duration::ZERO,
            stall: false,
            double_open_at: None,
            abort_at: None,
            format: None,
            stats: SourceStats::default(),
        }
    }

    /// Sleep between frames.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// After the last frame, stay alive without reporting a stop until the
    /// playback is stopped.
    pub fn stall(mut self) -> Self {
        self.stall = true;
        self
    }

    /// Open a buffer twice for frame `frame_index` without completing the
    /// first, as a misbehaving decoder would.
    pub fn double_open_at(mut self, frame_index: u64) -> Self {
        self.double_open_at = Some(frame_index);
        self
    }

    /// Fail to write frame `frame_index` after opening its buffer, as a
    /// decoder whose pixel conversion broke would.
    pub fn abort_at(mut self, frame_index: u64) -> Self {
        self.abort_at = Some(frame_index);
        self
    }

    pub fn stats(&self) -> SourceStats {
        self.stats.clone()
    }
}

impl VideoSource for SyntheticSource {
    fn set_video_format(&mut self, format: VideoFormat) -> Result<()> {
        self.format = Some(format);
        Ok(())
    }

    fn play<C>(self, mut callbacks: C, on_stop: StopObserver) -> Result<Playback>
    where
        C: FrameCallbacks + 'static,
    {
        let format = self.format.ok_or(CoreError::FormatNotNegotiated)?;
        Playback::spawn("synthetic-decoder", move |stop| {
            for frame_index in 0..self.frames {
                if stop.is_stopped() {
                    break;
                }
                if self.double_open_at == Some(frame_index) {
                    let _ = callbacks.on_buffer_open();
                }
                match callbacks.on_buffer_open() {
                    Ok(mut view) => paint_frame(&mut view, &format, frame_index),
                    Err(_) => {
                        self.stats.skipped.fetch_add(1, Ordering::AcqRel);
                        continue;
                    }
                }
                if self.abort_at == Some(frame_index) {
                    let _ = callbacks.on_buffer_abort();
                    self.stats.skipped.fetch_add(1, Ordering::AcqRel);
                    continue;
                }
                if callbacks.on_buffer_ready().is_ok() {
                    self.stats.delivered.fetch_add(1, Ordering::AcqRel);
                }
                if !self.interval.is_zero() {
                    thread::sleep(self.interval);
                }
            }
            if self.stall {
                while !stop.is_stopped() {
                    thread::sleep(Duration::from_millis(2));
                }
            }
            on_stop();
        })
    }
}

/// Fill the visible `width x height` area with [`frame_color`] and every
/// padding pixel with [`PADDING_JUNK`].
pub fn paint_frame(view: &mut BufferView<'_>, format: &VideoFormat, frame_index: u64) {
    let [r, g, b] = frame_color(frame_index);
    let visible = [b, g, r, 0xFF];
    for y in 0..view.lines() {
        let Some(row) = view.row_mut(y) else {
            break;
        };
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            if x < format.width as usize && y < format.height as usize {
                px.copy_from_slice(&visible);
            } else {
                px.copy_from_slice(&PADDING_JUNK);
            }
        }
    }
}

/// A freshly allocated buffer holding frame `sequence`, as a decoder would
/// have left it.
pub fn painted_buffer(sequence: u64, geometry: &Geometry, ledger: Arc<BufferLedger>) -> FrameBuffer {
    let mut buffer = FrameBuffer::allocate(sequence, geometry.buffer_len(), ledger);
    let format = VideoFormat::bgra(geometry);
    let mut view = buffer
        .view_mut(geometry.pitch as usize, geometry.lines as usize)
        .expect("buffer length matches geometry");
    paint_frame(&mut view, &format, sequence);
    drop(view);
    buffer
}
