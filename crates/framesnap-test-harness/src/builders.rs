use std::path::{Path, PathBuf};

use framesnap_core::config::{ExtractMode, PipelineConfig};

/// Builder for [`PipelineConfig`] with small, fast defaults for tests:
/// 64x48 pictures, every frame kept, short polling and grace periods.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new(source_uri: &str, destination: &Path) -> Self {
        let mut config = PipelineConfig::new(source_uri, destination);
        config.width = 64;
        config.height = 48;
        config.sampling_period = 1;
        config.poll_interval_ms = 5;
        config.stop_grace_ms = 20;
        config.frame_timeout_secs = Some(5);
        Self { config }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn sampling_period(mut self, period: u64) -> Self {
        self.config.sampling_period = period;
        self
    }

    pub fn continuous(mut self) -> Self {
        self.config.mode = ExtractMode::Continuous;
        self
    }

    pub fn stop_grace_ms(mut self, ms: u64) -> Self {
        self.config.stop_grace_ms = ms;
        self
    }

    pub fn frame_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.frame_timeout_secs = secs;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = destination.into();
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
