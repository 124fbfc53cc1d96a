use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use framesnap_core::buffer::FrameBuffer;
use framesnap_core::cancel::CancellationSignal;
use framesnap_core::config::ExtractMode;
use framesnap_core::geometry::Geometry;
use framesnap_core::handoff::HandoffQueue;

use crate::encoder::{JpegEncoder, SurfaceEncoder};
use crate::error::{MediaError, Result};
use crate::extract_profile::{FrameTimings, ProfileCollector};
use crate::surface::{crop_to_picture, unpack_bgra};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a continuous run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousSummary {
    /// Files written, in order: `0000.jpg`, `0001.jpg`, ...
    pub files: Vec<String>,
    pub failed: u64,
    /// Buffers still queued at cancellation and dropped unprocessed.
    pub discarded: u64,
}

impl ContinuousSummary {
    pub fn written(&self) -> u64 {
        self.files.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Single-shot: file name of the snapshot inside the destination.
    Snapshot(String),
    Sequence(ContinuousSummary),
}

impl ExtractOutcome {
    pub fn snapshot(&self) -> Option<&str> {
        match self {
            Self::Snapshot(name) => Some(name),
            Self::Sequence(_) => None,
        }
    }
}

/// Zero-padded sequential output name, e.g. `0007.jpg`.
pub fn sequence_file_name(index: u64, extension: &str) -> String {
    format!("{index:04}.{extension}")
}

/// Globally unique output name, e.g. `3f2b...e1.jpg`.
pub fn unique_file_name(extension: &str) -> String {
    format!("{}.{extension}", Uuid::new_v4())
}

/// Consumer side of the pipeline: takes kept buffers off the hand-off queue,
/// turns them into image files and releases them.
pub struct ThumbnailExtractor<E = JpegEncoder> {
    geometry: Geometry,
    queue: HandoffQueue,
    cancel: CancellationSignal,
    encoder: E,
    destination: PathBuf,
    poll_interval: Duration,
    frame_timeout: Option<Duration>,
    profile: ProfileCollector,
}

impl<E: SurfaceEncoder> ThumbnailExtractor<E> {
    pub fn new(
        geometry: Geometry,
        queue: HandoffQueue,
        cancel: CancellationSignal,
        encoder: E,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            geometry,
            queue,
            cancel,
            encoder,
            destination: destination.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            frame_timeout: None,
            profile: ProfileCollector::disabled(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Single-shot gives up after this long without a written frame.
    pub fn with_frame_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.frame_timeout = timeout;
        self
    }

    pub fn with_profile(mut self, profile: ProfileCollector) -> Self {
        self.profile = profile;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn profile(&self) -> &ProfileCollector {
        &self.profile
    }

    /// Consume the extractor, releasing its queue handle.
    pub fn into_profile(self) -> ProfileCollector {
        self.profile
    }

    pub fn run(&mut self, mode: ExtractMode) -> Result<ExtractOutcome> {
        match mode {
            ExtractMode::SingleShot => self.run_single_shot().map(ExtractOutcome::Snapshot),
            ExtractMode::Continuous => self.run_continuous().map(ExtractOutcome::Sequence),
        }
    }

    /// Process kept buffers until one is written, and return its file name.
    ///
    /// Per-frame failures are logged and the loop keeps waiting. If the
    /// stream is cancelled or the frame timeout expires first, the last
    /// frame failure is returned, or `SourceUnavailable` if no buffer ever
    /// arrived.
    pub fn run_single_shot(&mut self) -> Result<String> {
        fs::create_dir_all(&self.destination)?;
        let started = Instant::now();
        let mut last_failure: Option<MediaError> = None;

        let outcome = loop {
            if self.cancel.is_raised() {
                break Err(last_failure.unwrap_or_else(|| {
                    MediaError::SourceUnavailable(
                        "stream ended before a frame was captured".into(),
                    )
                }));
            }
            if let Some(limit) = self.frame_timeout {
                if started.elapsed() >= limit {
                    break Err(last_failure.unwrap_or_else(|| {
                        MediaError::SourceUnavailable(format!(
                            "no frame captured within {limit:?}"
                        ))
                    }));
                }
            }

            let Some(buffer) = self.queue.pop_timeout(self.poll_interval) else {
                continue;
            };
            let name = unique_file_name(self.encoder.extension());
            match self.process_buffer(buffer, &name) {
                Ok(path) => {
                    tracing::info!(file = %path.display(), "snapshot written");
                    break Ok(name);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "snapshot attempt failed");
                    last_failure = Some(err);
                }
            }
        };

        self.discard_pending();
        outcome
    }

    /// Write every kept buffer as a sequentially numbered file until the
    /// cancellation signal is raised. Numbers only advance on success.
    pub fn run_continuous(&mut self) -> Result<ContinuousSummary> {
        fs::create_dir_all(&self.destination)?;
        let mut summary = ContinuousSummary::default();

        while !self.cancel.is_raised() {
            let Some(buffer) = self.queue.pop_timeout(self.poll_interval) else {
                continue;
            };
            let name = sequence_file_name(summary.written(), self.encoder.extension());
            match self.process_buffer(buffer, &name) {
                Ok(_) => {
                    tracing::debug!(file = %name, "frame written");
                    summary.files.push(name);
                }
                Err(err) if err.is_frame_failure() => {
                    tracing::warn!(error = %err, file = %name, "frame extraction failed");
                    summary.failed += 1;
                }
                Err(err) => {
                    tracing::error!(error = %err, "frame buffer unusable");
                    summary.failed += 1;
                }
            }
        }

        summary.discarded = self.discard_pending();
        tracing::info!(
            written = summary.written(),
            failed = summary.failed,
            discarded = summary.discarded,
            "continuous extraction stopped"
        );
        Ok(summary)
    }

    /// Unpack, crop, encode and persist one buffer as `file_name` inside
    /// the destination. The buffer is released exactly once whatever the
    /// outcome.
    pub fn process_buffer(&mut self, buffer: FrameBuffer, file_name: &str) -> Result<PathBuf> {
        let started = Instant::now();
        let mut timings = FrameTimings {
            sequence: buffer.sequence(),
            output: None,
            total_ms: 0.0,
            unpack_ms: 0.0,
            crop_ms: 0.0,
            encode_ms: 0.0,
            write_ms: 0.0,
            succeeded: false,
        };

        let result = self.extract(buffer, file_name, &mut timings);

        timings.total_ms = elapsed_ms(started);
        timings.succeeded = result.is_ok();
        if result.is_ok() {
            timings.output = Some(file_name.to_string());
        }
        self.profile.record_frame(timings);
        result
    }

    fn extract(
        &self,
        buffer: FrameBuffer,
        file_name: &str,
        timings: &mut FrameTimings,
    ) -> Result<PathBuf> {
        let t = Instant::now();
        let unpacked = unpack_bgra(buffer.as_bytes(), &self.geometry);
        // Nothing reads the raw buffer after the copy.
        drop(buffer);
        let surface = unpacked?;
        timings.unpack_ms = elapsed_ms(t);

        let t = Instant::now();
        let picture = crop_to_picture(surface, &self.geometry);
        timings.crop_ms = elapsed_ms(t);

        let t = Instant::now();
        let bytes = self.encoder.encode(&picture)?;
        timings.encode_ms = elapsed_ms(t);

        let t = Instant::now();
        let path = persist(&self.destination, file_name, &bytes)?;
        timings.write_ms = elapsed_ms(t);

        Ok(path)
    }

    fn discard_pending(&self) -> u64 {
        let mut discarded = 0;
        while let Some(buffer) = self.queue.try_pop() {
            drop(buffer);
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "dropped frames still queued after cancellation");
        }
        discarded
    }
}

/// Write through a temporary file in the same directory and rename, so a
/// reader never sees a partially written image.
fn persist(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = dir.join(file_name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
