use std::ffi::{CString, c_int, c_void};
use std::ptr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rsmpeg::avcodec::{AVCodec, AVCodecContext};
use rsmpeg::avformat::AVFormatContextInput;
use rsmpeg::avutil::AVFrame;
use rsmpeg::ffi;
use rsmpeg::swscale::SwsContext;

use framesnap_core::capture::FrameCallbacks;
use framesnap_core::error::{CoreError, Result as CoreResult};
use framesnap_core::geometry::BYTES_PER_PIXEL;
use framesnap_core::source::{Playback, StopObserver, StopToken, VideoFormat, VideoSource};

use crate::error::{MediaError, Result};

/// Basic facts about the opened video stream.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec_name: String,
}

/// Push decoder over anything ffmpeg can demux: files, `rtsp://`,
/// `http://`. Only the first decodable video stream is used; audio packets
/// are skipped.
///
/// Each decoded picture is scaled and converted by swscale straight into
/// the buffer handed out by [`FrameCallbacks::on_buffer_open`].
///
/// Blocking reads are interrupted when playback is stopped or when no packet
/// arrives for the I/O timeout, so a stalled network peer ends the stream
/// instead of pinning the decoder thread.
pub struct FfmpegSource {
    uri: String,
    // Dropped before `interrupt`, which the context's callback points into.
    input_ctx: AVFormatContextInput,
    decode_ctx: AVCodecContext,
    video_stream_index: usize,
    stream_info: StreamInfo,
    format: Option<VideoFormat>,
    interrupt: Box<InterruptState>,
}

impl FfmpegSource {
    pub fn open(uri: &str) -> Result<Self> {
        let c_uri = CString::new(uri).map_err(|_| MediaError::OpenFailed(uri.to_string()))?;

        let mut input_ctx = AVFormatContextInput::open(&c_uri)
            .map_err(|e| MediaError::OpenFailed(format!("{uri}: {e}")))?;
        let interrupt = Box::new(InterruptState::new(DEFAULT_IO_TIMEOUT));
        // SAFETY: `interrupt` is heap allocated, owned by the source and
        // outlives `input_ctx` (field order), so `opaque` stays valid for
        // every read on this context.
        unsafe {
            (*input_ctx.as_mut_ptr()).interrupt_callback = ffi::AVIOInterruptCB {
                callback: Some(interrupt_io),
                opaque: &*interrupt as *const InterruptState as *mut c_void,
            };
        }

        let (video_stream_index, decoder) = {
            let streams = input_ctx.streams();
            let mut found = None;
            for (i, stream) in streams.iter().enumerate() {
                let codecpar = stream.codecpar();
                if codecpar.codec_type == ffi::AVMEDIA_TYPE_VIDEO {
                    if let Some(decoder) = AVCodec::find_decoder(codecpar.codec_id) {
                        found = Some((i, decoder));
                        break;
                    }
                }
            }
            found.ok_or(MediaError::NoVideoStream)?
        };

        let mut decode_ctx = AVCodecContext::new(&decoder);
        {
            let streams = input_ctx.streams();
            decode_ctx
                .apply_codecpar(&streams[video_stream_index].codecpar())
                .map_err(|e| MediaError::DecoderError(format!("apply_codecpar: {e}")))?;
        }
        decode_ctx
            .open(None)
            .map_err(|e| MediaError::DecoderError(format!("open: {e}")))?;

        let stream_info = {
            let streams = input_ctx.streams();
            let r = streams[video_stream_index].r_frame_rate;
            StreamInfo {
                width: decode_ctx.width as u32,
                height: decode_ctx.height as u32,
                fps: if r.den > 0 {
                    r.num as f64 / r.den as f64
                } else {
                    0.0
                },
                codec_name: decoder.name().to_string_lossy().to_string(),
            }
        };

        tracing::info!(
            uri,
            width = stream_info.width,
            height = stream_info.height,
            codec = %stream_info.codec_name,
            "opened video source"
        );

        Ok(Self {
            uri: uri.to_string(),
            input_ctx,
            decode_ctx,
            video_stream_index,
            stream_info,
            format: None,
            interrupt,
        })
    }

    /// Give up on a read after `timeout` without a packet. `None` waits as
    /// long as the protocol does.
    pub fn with_io_timeout(self, timeout: Option<Duration>) -> Self {
        self.interrupt.set_io_timeout(timeout);
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.stream_info
    }

    /// Decode until end of stream or until `stop` is requested, delivering
    /// every picture through `callbacks`. Returns the number of pictures
    /// delivered.
    fn decode_loop<C: FrameCallbacks>(
        &mut self,
        format: &VideoFormat,
        callbacks: &mut C,
        stop: &StopToken,
    ) -> Result<u64> {
        let mut scaler = Scaler::default();
        let mut delivered = 0u64;

        while !stop.is_stopped() {
            self.interrupt.mark_progress();
            let packet = self
                .input_ctx
                .read_packet()
                .map_err(|e| MediaError::DecoderError(format!("read_packet: {e}")))?;

            match &packet {
                Some(p) if p.stream_index as usize != self.video_stream_index => continue,
                Some(p) => self
                    .decode_ctx
                    .send_packet(Some(p))
                    .map_err(|e| MediaError::DecoderError(format!("send_packet: {e}")))?,
                // EOF: flush the decoder.
                None => {
                    self.decode_ctx.send_packet(None).ok();
                }
            }

            while let Ok(frame) = self.decode_ctx.receive_frame() {
                if stop.is_stopped() {
                    break;
                }
                if deliver(&frame, format, &mut scaler, callbacks)? {
                    delivered += 1;
                }
            }

            if packet.is_none() {
                break;
            }
        }

        Ok(delivered)
    }
}

impl VideoSource for FfmpegSource {
    fn set_video_format(&mut self, format: VideoFormat) -> CoreResult<()> {
        let row_bytes = format.width.checked_mul(BYTES_PER_PIXEL);
        if row_bytes.is_none_or(|row| row > format.pitch) || format.height > format.lines {
            return Err(CoreError::InvalidGeometry {
                width: format.width,
                height: format.height,
            });
        }
        self.format = Some(format);
        Ok(())
    }

    fn play<C>(mut self, mut callbacks: C, on_stop: StopObserver) -> CoreResult<Playback>
    where
        C: FrameCallbacks + 'static,
    {
        let format = self.format.ok_or(CoreError::FormatNotNegotiated)?;
        Playback::spawn("framesnap-decoder", move |stop| {
            self.interrupt.attach(stop.clone());
            match self.decode_loop(&format, &mut callbacks, &stop) {
                Ok(delivered) => {
                    tracing::info!(uri = %self.uri, delivered, "video source stopped")
                }
                Err(err) => tracing::error!(uri = %self.uri, error = %err, "decoding aborted"),
            }
            on_stop();
        })
    }
}

/// Lazily built swscale context; rebuilt if the source resolution or pixel
/// format changes mid-stream. The output side never changes.
#[derive(Default)]
struct Scaler {
    ctx: Option<SwsContext>,
    src: (i32, i32, i32),
}

impl Scaler {
    fn get(&mut self, frame: &AVFrame, format: &VideoFormat) -> Result<&mut SwsContext> {
        let src = (frame.width, frame.height, frame.format);
        if self.ctx.is_none() || self.src != src {
            let ctx = SwsContext::get_context(
                frame.width,
                frame.height,
                frame.format,
                format.width as i32,
                format.height as i32,
                ffi::AV_PIX_FMT_BGRA,
                ffi::SWS_BILINEAR,
                None,
                None,
                None,
            )
            .ok_or_else(|| MediaError::DecoderError("failed to create sws context".into()))?;
            self.src = src;
            self.ctx = Some(ctx);
        }
        self.ctx
            .as_mut()
            .ok_or_else(|| MediaError::DecoderError("sws context missing".into()))
    }
}

/// Run one buffer-open / write / buffer-ready cycle. Returns `false` when
/// the picture was skipped: no scaler for its format, no buffer, or a failed
/// conversion. A skipped picture never reaches the sampler.
fn deliver<C: FrameCallbacks>(
    frame: &AVFrame,
    format: &VideoFormat,
    scaler: &mut Scaler,
    callbacks: &mut C,
) -> Result<bool> {
    let sws = match scaler.get(frame, format) {
        Ok(sws) => sws,
        Err(err) => {
            tracing::warn!(error = %err, "skipping picture");
            return Ok(false);
        }
    };

    let mut view = match callbacks.on_buffer_open() {
        Ok(view) => view,
        Err(err) => {
            tracing::warn!(error = %err, "skipping frame");
            return Ok(false);
        }
    };

    let dst_data: [*mut u8; 4] = [
        view.as_mut_ptr(),
        ptr::null_mut(),
        ptr::null_mut(),
        ptr::null_mut(),
    ];
    let dst_linesize: [i32; 4] = [format.pitch as i32, 0, 0, 0];
    // SAFETY: the view spans pitch * lines bytes and swscale writes
    // `format.height <= lines` rows of `format.width * 4 <= pitch` bytes with
    // stride `pitch`. The view outlives the call.
    let scaled = unsafe {
        sws.scale(
            frame.data.as_ptr() as *const *const u8,
            frame.linesize.as_ptr(),
            0,
            frame.height,
            dst_data.as_ptr(),
            dst_linesize.as_ptr(),
        )
    };
    drop(view);

    if let Err(e) = scaled {
        tracing::warn!(error = %e, "scale failed, dropping picture");
        if let Err(err) = callbacks.on_buffer_abort() {
            tracing::warn!(error = %err, "abort rejected");
        }
        return Ok(false);
    }

    match callbacks.on_buffer_ready() {
        Ok(disposition) => {
            tracing::trace!(?disposition, "picture complete");
            Ok(true)
        }
        Err(err) => {
            tracing::warn!(error = %err, "buffer ready rejected");
            Ok(false)
        }
    }
}

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared with ffmpeg through the format context's interrupt callback.
struct InterruptState {
    started: Instant,
    /// Milliseconds since `started` of the last packet read.
    last_progress_ms: AtomicU64,
    /// 0 disables the I/O timeout.
    io_timeout_ms: AtomicU64,
    stop: OnceLock<StopToken>,
}

impl InterruptState {
    fn new(io_timeout: Duration) -> Self {
        let state = Self {
            started: Instant::now(),
            last_progress_ms: AtomicU64::new(0),
            io_timeout_ms: AtomicU64::new(0),
            stop: OnceLock::new(),
        };
        state.set_io_timeout(Some(io_timeout));
        state
    }

    fn set_io_timeout(&self, timeout: Option<Duration>) {
        let ms = timeout.map_or(0, |t| (t.as_millis() as u64).max(1));
        self.io_timeout_ms.store(ms, Ordering::Release);
    }

    fn attach(&self, stop: StopToken) {
        let _ = self.stop.set(stop);
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn mark_progress(&self) {
        self.last_progress_ms
            .store(self.elapsed_ms(), Ordering::Release);
    }

    fn should_interrupt(&self) -> bool {
        if self.stop.get().is_some_and(StopToken::is_stopped) {
            return true;
        }
        let timeout = self.io_timeout_ms.load(Ordering::Acquire);
        timeout > 0
            && self
                .elapsed_ms()
                .saturating_sub(self.last_progress_ms.load(Ordering::Acquire))
                > timeout
    }
}

unsafe extern "C" fn interrupt_io(opaque: *mut c_void) -> c_int {
    if opaque.is_null() {
        return 0;
    }
    // SAFETY: `opaque` is the `InterruptState` installed in `open`, alive for
    // as long as the format context.
    let state = unsafe { &*(opaque as *const InterruptState) };
    c_int::from(state.should_interrupt())
}
