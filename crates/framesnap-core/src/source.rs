use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use crate::capture::FrameCallbacks;
use crate::error::{CoreError, Result};
use crate::geometry::Geometry;

/// The single packed layout negotiated with decoders: 4 bytes per pixel in
/// B, G, R, X/A order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Bgra,
}

/// Output format a decoder must write into each frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub pixel_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub lines: u32,
}

impl VideoFormat {
    pub fn bgra(geometry: &Geometry) -> Self {
        Self {
            pixel_format: PixelFormat::Bgra,
            width: geometry.width,
            height: geometry.height,
            pitch: geometry.pitch,
            lines: geometry.lines,
        }
    }
}

/// Called once on the decoder thread when the stream stops producing frames.
pub type StopObserver = Box<dyn FnOnce() + Send + 'static>;

/// A push-style decoder. It asks the callbacks for a buffer before writing
/// each picture and reports when the picture is complete.
pub trait VideoSource: Send + 'static {
    /// Fix the output layout. Must be called before [`VideoSource::play`].
    fn set_video_format(&mut self, format: VideoFormat) -> Result<()>;

    /// Start decoding on a dedicated thread.
    fn play<C>(self, callbacks: C, on_stop: StopObserver) -> Result<Playback>
    where
        C: FrameCallbacks + 'static;
}

// =============================================================================
// Playback
// =============================================================================

/// Cooperative stop request observed by a decoder thread.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn request(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Handle to a running decoder thread. Stopping (explicitly or by drop)
/// requests the thread to finish and joins it.
#[derive(Debug)]
pub struct Playback {
    token: StopToken,
    handle: Option<JoinHandle<()>>,
}

impl Playback {
    pub fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(StopToken) + Send + 'static,
    {
        let token = StopToken::default();
        let thread_token = token.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(thread_token))
            .map_err(CoreError::Io)?;
        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.token.request();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("decoder thread panicked");
            }
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.shutdown();
    }
}
