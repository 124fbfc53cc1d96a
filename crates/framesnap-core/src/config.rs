use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::sampler::DEFAULT_SAMPLING_PERIOD;

/// How the extractor consumes kept frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Stop after the first frame written successfully.
    #[default]
    SingleShot,
    /// Write every kept frame as `NNNN.jpg` until the stream ends.
    Continuous,
}

impl FromStr for ExtractMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single_shot" | "single-shot" | "single" => Ok(Self::SingleShot),
            "continuous" => Ok(Self::Continuous),
            other => Err(CoreError::Config(format!("unknown extract mode: {other}"))),
        }
    }
}

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source_uri: String,
    pub destination: PathBuf,
    pub width: u32,
    pub height: u32,
    pub sampling_period: u64,
    pub mode: ExtractMode,
    /// Longest idle wait on an empty queue before re-checking cancellation.
    pub poll_interval_ms: u64,
    /// Delay between the stream stopping and the extractor being cancelled.
    pub stop_grace_ms: u64,
    /// Single-shot gives up after this long without a written frame.
    /// `None` waits until the stream ends.
    pub frame_timeout_secs: Option<u64>,
    /// A network read with no data for this long ends the stream.
    /// `None` leaves it to the protocol.
    pub io_timeout_secs: Option<u64>,
    pub jpeg_quality: u8,
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_uri: String::new(),
            destination: std::env::temp_dir(),
            width: 800,
            height: 600,
            sampling_period: DEFAULT_SAMPLING_PERIOD,
            mode: ExtractMode::SingleShot,
            poll_interval_ms: 100,
            stop_grace_ms: 1000,
            frame_timeout_secs: Some(30),
            io_timeout_secs: Some(10),
            jpeg_quality: 90,
            log_level: "info".into(),
        }
    }
}

impl PipelineConfig {
    pub fn new(source_uri: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_uri: source_uri.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Override fields from `FRAMESNAP_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Override fields from any key lookup using the environment variable
    /// names.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("FRAMESNAP_SOURCE_URI") {
            self.source_uri = uri;
        }
        if let Some(dir) = lookup("FRAMESNAP_DESTINATION") {
            self.destination = PathBuf::from(dir);
        }
        if let Some(v) = lookup("FRAMESNAP_WIDTH") {
            self.width = parse_var("FRAMESNAP_WIDTH", &v)?;
        }
        if let Some(v) = lookup("FRAMESNAP_HEIGHT") {
            self.height = parse_var("FRAMESNAP_HEIGHT", &v)?;
        }
        if let Some(v) = lookup("FRAMESNAP_SAMPLING_PERIOD") {
            self.sampling_period = parse_var("FRAMESNAP_SAMPLING_PERIOD", &v)?;
        }
        if let Some(v) = lookup("FRAMESNAP_MODE") {
            self.mode = v.parse()?;
        }
        if let Some(v) = lookup("FRAMESNAP_FRAME_TIMEOUT_SECS") {
            self.frame_timeout_secs = match v.trim() {
                "" | "none" => None,
                secs => Some(parse_var("FRAMESNAP_FRAME_TIMEOUT_SECS", secs)?),
            };
        }
        if let Some(v) = lookup("FRAMESNAP_IO_TIMEOUT_SECS") {
            self.io_timeout_secs = match v.trim() {
                "" | "none" => None,
                secs => Some(parse_var("FRAMESNAP_IO_TIMEOUT_SECS", secs)?),
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_uri.trim().is_empty() {
            return Err(CoreError::Config("source_uri is empty".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CoreError::InvalidGeometry {
                width: self.width,
                height: self.height,
            });
        }
        if self.sampling_period == 0 {
            return Err(CoreError::InvalidSamplingPeriod);
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(CoreError::Config(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn frame_timeout(&self) -> Option<Duration> {
        self.frame_timeout_secs.map(Duration::from_secs)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{key}: cannot parse {value:?}")))
}
