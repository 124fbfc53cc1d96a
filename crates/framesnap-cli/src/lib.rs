use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use framesnap_core::config::{ExtractMode, PipelineConfig};
use framesnap_core::source::VideoSource;
use framesnap_media::extractor::ExtractOutcome;
use framesnap_media::ffmpeg_source::FfmpegSource;
use framesnap_media::pipeline::ThumbnailPipeline;

/// Extract JPEG thumbnails from a video stream.
///
/// Settings are layered: built-in defaults, then the JSON config file, then
/// `FRAMESNAP_*` environment variables, then command-line flags.
#[derive(Debug, Parser)]
#[command(name = "framesnap", version)]
pub struct Cli {
    /// Stream or file to read (rtsp://, http://, file path)
    pub source: Option<String>,

    /// JSON pipeline configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the images are written to
    #[arg(short = 'o', long)]
    pub destination: Option<PathBuf>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Keep one frame out of every N
    #[arg(short = 'n', long)]
    pub sampling_period: Option<u64>,

    /// Write every kept frame as 0000.jpg, 0001.jpg, ... until the stream ends
    #[arg(long)]
    pub continuous: bool,

    /// Record per-frame timings to framesnap.profile.json
    #[arg(long)]
    pub profile: bool,
}

impl Cli {
    /// Build the pipeline configuration, reading environment variables
    /// through `lookup`.
    pub fn resolve_config<F>(&self, lookup: F) -> Result<PipelineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        config
            .apply_vars(lookup)
            .context("applying FRAMESNAP_* overrides")?;

        if let Some(source) = &self.source {
            config.source_uri = source.clone();
        }
        if let Some(destination) = &self.destination {
            config.destination = destination.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(period) = self.sampling_period {
            config.sampling_period = period;
        }
        if self.continuous {
            config.mode = ExtractMode::Continuous;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
/// Logs go to stderr so stdout only carries file names.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one extraction against an already opened source.
pub fn run_with_source<S: VideoSource>(
    config: PipelineConfig,
    source: S,
    profile: bool,
) -> Result<ExtractOutcome> {
    let mut pipeline = ThumbnailPipeline::new(config)?;
    if profile {
        pipeline = pipeline.with_profiling(true);
    }
    let outcome = pipeline.run(source)?;
    Ok(outcome)
}

/// Open the configured source with ffmpeg and run one extraction.
pub fn run(config: PipelineConfig, profile: bool) -> Result<ExtractOutcome> {
    let source = FfmpegSource::open(&config.source_uri)
        .with_context(|| format!("opening {}", config.source_uri))?
        .with_io_timeout(config.io_timeout());
    run_with_source(config, source, profile)
}

/// Plain-text result: the snapshot file name, or one line per sequence file.
pub fn render_outcome(outcome: &ExtractOutcome) -> String {
    match outcome {
        ExtractOutcome::Snapshot(name) => name.clone(),
        ExtractOutcome::Sequence(summary) => summary.files.join("\n"),
    }
}
