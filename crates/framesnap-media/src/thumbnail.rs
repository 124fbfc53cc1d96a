use std::path::Path;

use framesnap_core::config::{ExtractMode, PipelineConfig};
use framesnap_core::error::CoreError;

use crate::error::{MediaError, Result};
use crate::extractor::ExtractOutcome;
use crate::ffmpeg_source::FfmpegSource;
use crate::pipeline::ThumbnailPipeline;

/// Open `config.source_uri` with ffmpeg and run one extraction.
pub fn extract(config: &PipelineConfig) -> Result<ExtractOutcome> {
    let pipeline = ThumbnailPipeline::new(config.clone())?;
    let source = FfmpegSource::open(&config.source_uri)?.with_io_timeout(config.io_timeout());
    pipeline.run(source)
}

/// Take a single snapshot of `source_uri` with default settings and return
/// the generated file name inside `destination`.
pub fn snapshot(source_uri: &str, destination: &Path) -> Result<String> {
    let mut config = PipelineConfig::new(source_uri, destination);
    config.mode = ExtractMode::SingleShot;
    match extract(&config)? {
        ExtractOutcome::Snapshot(name) => Ok(name),
        ExtractOutcome::Sequence(_) => Err(MediaError::Core(CoreError::Config(
            "snapshot ran in continuous mode".into(),
        ))),
    }
}
