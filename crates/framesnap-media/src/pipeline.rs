use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use framesnap_core::buffer::BufferLedger;
use framesnap_core::cancel::CancellationSignal;
use framesnap_core::capture::FrameCapture;
use framesnap_core::config::{ExtractMode, PipelineConfig};
use framesnap_core::geometry::Geometry;
use framesnap_core::handoff::HandoffQueue;
use framesnap_core::sampler::EveryNth;
use framesnap_core::source::{VideoFormat, VideoSource};

use crate::encoder::{JpegEncoder, SurfaceEncoder};
use crate::error::Result;
use crate::extract_profile::{
    PROFILE_FILE_NAME, ProfileCollector, ProfileConfig, is_profiling_enabled, profile_output_path,
    write_profile,
};
use crate::extractor::{ExtractOutcome, ThumbnailExtractor};

/// Wires a video source, the capture callbacks and the extractor into one
/// run. Every run gets its own geometry, queue, ledger and cancellation
/// signal, so pipelines can run side by side.
pub struct ThumbnailPipeline<E = JpegEncoder> {
    config: PipelineConfig,
    encoder: E,
    profiling: bool,
    profile_dir: Option<PathBuf>,
}

impl ThumbnailPipeline<JpegEncoder> {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let encoder = JpegEncoder::new(config.jpeg_quality);
        Self::with_encoder(config, encoder)
    }
}

impl<E: SurfaceEncoder + Clone> ThumbnailPipeline<E> {
    pub fn with_encoder(config: PipelineConfig, encoder: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            encoder,
            profiling: is_profiling_enabled(),
            profile_dir: None,
        })
    }

    /// Force profiling on or off regardless of `FRAMESNAP_PROFILE`.
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    /// Write the profile into `dir` instead of the `FRAMESNAP_PROFILE_DIR`
    /// or destination default.
    pub fn with_profile_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.profile_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn profile_path(&self) -> PathBuf {
        match &self.profile_dir {
            Some(dir) => dir.join(PROFILE_FILE_NAME),
            None => profile_output_path(&self.config.destination),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run<S: VideoSource>(&self, source: S) -> Result<ExtractOutcome> {
        self.run_with_ledger(source, Arc::new(BufferLedger::new()))
    }

    /// Like [`ThumbnailPipeline::run`], recording every frame buffer in
    /// `ledger` so the caller can check allocations against releases.
    pub fn run_with_ledger<S: VideoSource>(
        &self,
        mut source: S,
        ledger: Arc<BufferLedger>,
    ) -> Result<ExtractOutcome> {
        let started = Instant::now();
        let geometry = Geometry::new(self.config.width, self.config.height)?;
        let policy = EveryNth::new(self.config.sampling_period)?;
        let queue = HandoffQueue::new();
        let cancel = CancellationSignal::new();

        tracing::info!(
            source = %self.config.source_uri,
            width = geometry.width,
            height = geometry.height,
            pitch = geometry.pitch,
            lines = geometry.lines,
            period = policy.period(),
            mode = ?self.config.mode,
            "starting extraction"
        );

        let capture = FrameCapture::new(geometry, policy, queue.clone(), Arc::clone(&ledger));
        source.set_video_format(VideoFormat::bgra(&geometry))?;

        let stop_signal = cancel.clone();
        let grace = self.config.stop_grace();
        let playback = source.play(
            capture,
            Box::new(move || {
                tracing::debug!(?grace, "stream stopped, cancelling after grace period");
                stop_signal.raise_after(grace);
            }),
        )?;

        let mut profile = ProfileCollector::new(self.profiling);
        profile.set_start(started);
        profile.set_config(ProfileConfig {
            source_uri: self.config.source_uri.clone(),
            destination: self.config.destination.display().to_string(),
            mode: self.config.mode,
            geometry,
            sampling_period: self.config.sampling_period,
        });

        let mut extractor = ThumbnailExtractor::new(
            geometry,
            queue,
            cancel,
            self.encoder.clone(),
            &self.config.destination,
        )
        .with_poll_interval(self.config.poll_interval())
        .with_frame_timeout(match self.config.mode {
            ExtractMode::SingleShot => self.config.frame_timeout(),
            ExtractMode::Continuous => None,
        })
        .with_profile(profile);

        let outcome = extractor.run(self.config.mode);

        // Teardown: stop the decoder (dropping the capture and any in-flight
        // buffer), then the extractor with the last queue handle.
        playback.stop();
        let profile = extractor.into_profile();

        let buffers = ledger.snapshot();
        if buffers.is_balanced() {
            tracing::debug!(allocated = buffers.allocated, "all frame buffers released");
        } else {
            tracing::warn!(
                allocated = buffers.allocated,
                released = buffers.released,
                "frame buffers still outstanding after teardown"
            );
        }

        if let Some(report) = profile.finish(buffers) {
            let path = self.profile_path();
            match write_profile(&report, &path) {
                Ok(()) => tracing::info!(path = %path.display(), "extraction profile written"),
                Err(e) => tracing::warn!(error = %e, "could not write extraction profile"),
            }
        }

        match &outcome {
            Ok(ExtractOutcome::Snapshot(name)) => tracing::info!(file = %name, "snapshot taken"),
            Ok(ExtractOutcome::Sequence(summary)) => {
                tracing::info!(written = summary.written(), "sequence extracted")
            }
            Err(err) => tracing::warn!(error = %err, "extraction failed"),
        }
        outcome
    }
}
