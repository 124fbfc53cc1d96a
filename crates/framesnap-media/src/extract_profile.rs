use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use framesnap_core::buffer::LedgerSnapshot;
use framesnap_core::config::ExtractMode;
use framesnap_core::geometry::Geometry;

pub const PROFILE_FILE_NAME: &str = "framesnap.profile.json";

/// Snapshot of the run configuration for the profile report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub source_uri: String,
    pub destination: String,
    pub mode: ExtractMode,
    pub geometry: Geometry,
    pub sampling_period: u64,
}

/// Per-buffer timing breakdown in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameTimings {
    pub sequence: u64,
    pub output: Option<String>,
    pub total_ms: f64,
    pub unpack_ms: f64,
    pub crop_ms: f64,
    pub encode_ms: f64,
    pub write_ms: f64,
    pub succeeded: bool,
}

/// Cost distribution over every processed buffer, failed ones included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub processed: u64,
    pub failed: u64,
    pub avg_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
    /// Sequence number of the most expensive buffer.
    pub slowest_sequence: Option<u64>,
}

impl FrameStats {
    pub fn from_frames(frames: &[FrameTimings]) -> Self {
        let failed = frames.iter().filter(|f| !f.succeeded).count() as u64;

        let mut by_cost: Vec<(f64, u64)> =
            frames.iter().map(|f| (f.total_ms, f.sequence)).collect();
        by_cost.sort_by(|a, b| a.0.total_cmp(&b.0));

        let Some(&(max_ms, slowest)) = by_cost.last() else {
            return Self {
                failed,
                ..Self::default()
            };
        };

        let count = by_cost.len();
        let total: f64 = by_cost.iter().map(|(ms, _)| ms).sum();
        Self {
            processed: count as u64,
            failed,
            avg_ms: total / count as f64,
            median_ms: nearest_rank(&by_cost, 0.50),
            p95_ms: nearest_rank(&by_cost, 0.95),
            max_ms,
            slowest_sequence: Some(slowest),
        }
    }
}

/// Nearest-rank percentile of a non-empty slice sorted by cost.
fn nearest_rank(sorted: &[(f64, u64)], fraction: f64) -> f64 {
    let rank = (fraction * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1].0
}

/// Full profiling report, serialized to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractProfile {
    pub config: ProfileConfig,
    pub buffers: LedgerSnapshot,
    pub total_duration_secs: f64,
    pub stats: FrameStats,
    pub frames: Vec<FrameTimings>,
}

#[derive(Debug)]
struct Recording {
    config: Option<ProfileConfig>,
    started: Instant,
    frames: Vec<FrameTimings>,
}

/// Accumulates timings during a run. A disabled collector holds nothing and
/// ignores every call.
#[derive(Debug, Default)]
pub struct ProfileCollector {
    recording: Option<Recording>,
}

impl ProfileCollector {
    pub fn new(enabled: bool) -> Self {
        Self {
            recording: enabled.then(|| Recording {
                config: None,
                started: Instant::now(),
                frames: Vec::new(),
            }),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.recording.is_some()
    }

    pub fn set_config(&mut self, config: ProfileConfig) {
        if let Some(rec) = &mut self.recording {
            rec.config = Some(config);
        }
    }

    /// Measure the run from `instant` instead of from construction.
    pub fn set_start(&mut self, instant: Instant) {
        if let Some(rec) = &mut self.recording {
            rec.started = instant;
        }
    }

    pub fn record_frame(&mut self, timings: FrameTimings) {
        if let Some(rec) = &mut self.recording {
            rec.frames.push(timings);
        }
    }

    /// Close the recording. `None` if disabled or no config was set.
    pub fn finish(self, buffers: LedgerSnapshot) -> Option<ExtractProfile> {
        let rec = self.recording?;
        let config = rec.config?;
        Some(ExtractProfile {
            config,
            buffers,
            total_duration_secs: rec.started.elapsed().as_secs_f64(),
            stats: FrameStats::from_frames(&rec.frames),
            frames: rec.frames,
        })
    }
}

/// `FRAMESNAP_PROFILE` set to `1` or `true` (any case).
pub fn is_profiling_enabled() -> bool {
    std::env::var("FRAMESNAP_PROFILE")
        .is_ok_and(|v| matches!(v.trim(), "1") || v.trim().eq_ignore_ascii_case("true"))
}

/// `$FRAMESNAP_PROFILE_DIR/framesnap.profile.json` if set, otherwise the
/// same file name inside the output directory.
pub fn profile_output_path(destination: &Path) -> PathBuf {
    std::env::var_os("FRAMESNAP_PROFILE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| destination.to_path_buf())
        .join(PROFILE_FILE_NAME)
}

pub fn write_profile(profile: &ExtractProfile, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, profile).map_err(io::Error::other)?;
    out.flush()
}
