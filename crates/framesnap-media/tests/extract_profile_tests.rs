use std::path::PathBuf;
use std::time::Instant;

use framesnap_core::buffer::LedgerSnapshot;
use framesnap_core::config::ExtractMode;
use framesnap_core::geometry::Geometry;
use framesnap_media::extract_profile::{
    ExtractProfile, FrameStats, FrameTimings, ProfileCollector, ProfileConfig,
    is_profiling_enabled, profile_output_path, write_profile,
};

fn sample_config() -> ProfileConfig {
    ProfileConfig {
        source_uri: "rtsp://camera.local/stream".to_string(),
        destination: "/tmp/thumbs".to_string(),
        mode: ExtractMode::Continuous,
        geometry: Geometry::new(800, 600).unwrap(),
        sampling_period: 100,
    }
}

fn timings(sequence: u64, total_ms: f64, succeeded: bool) -> FrameTimings {
    FrameTimings {
        sequence,
        output: succeeded.then(|| format!("{sequence:04}.jpg")),
        total_ms,
        unpack_ms: 1.0,
        crop_ms: 0.5,
        encode_ms: total_ms - 2.0,
        write_ms: 0.5,
        succeeded,
    }
}

#[test]
fn test_profiling_disabled_produces_no_profile() {
    let collector = ProfileCollector::new(false);
    assert!(!collector.is_enabled());
    assert!(collector.finish(LedgerSnapshot::default()).is_none());
}

#[test]
fn test_profiling_enabled_without_config_produces_no_profile() {
    let collector = ProfileCollector::new(true);
    assert!(collector.finish(LedgerSnapshot::default()).is_none());
}

#[test]
fn test_profiling_enabled_produces_profile() {
    let mut collector = ProfileCollector::new(true);
    assert!(collector.is_enabled());

    collector.set_config(sample_config());
    collector.set_start(Instant::now());

    // total_ms: 10, 20, 30, 40, 50; the 40ms frame failed.
    for i in 0..5u64 {
        collector.record_frame(timings(i, (i + 1) as f64 * 10.0, i != 3));
    }

    let profile = collector
        .finish(LedgerSnapshot {
            allocated: 500,
            released: 500,
        })
        .unwrap();
    let stats = &profile.stats;
    assert_eq!(stats.processed, 5);
    assert_eq!(stats.failed, 1);
    assert!((stats.avg_ms - 30.0).abs() < 0.01);
    assert!((stats.median_ms - 30.0).abs() < 0.01);
    assert!((stats.p95_ms - 50.0).abs() < 0.01);
    assert!((stats.max_ms - 50.0).abs() < 0.01);
    assert_eq!(stats.slowest_sequence, Some(4));
    assert!(profile.buffers.is_balanced());
    assert_eq!(profile.config.geometry.pitch, 3200);
}

#[test]
fn test_frame_stats_without_frames() {
    let stats = FrameStats::from_frames(&[]);
    assert_eq!(stats, FrameStats::default());
    assert_eq!(stats.slowest_sequence, None);
}

#[test]
fn test_frame_stats_unsorted_input() {
    // Recorded out of cost order; ranks come from the sorted costs.
    let frames = [
        timings(0, 40.0, true),
        timings(1, 10.0, true),
        timings(2, 30.0, false),
        timings(3, 20.0, true),
    ];
    let stats = FrameStats::from_frames(&frames);
    assert_eq!(stats.processed, 4);
    assert_eq!(stats.failed, 1);
    assert!((stats.avg_ms - 25.0).abs() < 0.01);
    // rank ceil(0.5 * 4) = 2 -> 20ms
    assert!((stats.median_ms - 20.0).abs() < 0.01);
    // rank ceil(0.95 * 4) = 4 -> 40ms
    assert!((stats.p95_ms - 40.0).abs() < 0.01);
    assert_eq!(stats.slowest_sequence, Some(0));
}

#[test]
fn test_frame_stats_single_frame() {
    let stats = FrameStats::from_frames(&[timings(9, 12.0, true)]);
    assert!((stats.median_ms - 12.0).abs() < 0.01);
    assert!((stats.p95_ms - 12.0).abs() < 0.01);
    assert_eq!(stats.slowest_sequence, Some(9));
}

#[test]
fn test_disabled_collector_ignores_operations() {
    let mut collector = ProfileCollector::disabled();
    collector.set_config(sample_config());
    collector.set_start(Instant::now());
    collector.record_frame(timings(0, 10.0, true));
    assert!(collector.finish(LedgerSnapshot::default()).is_none());
}

#[test]
fn test_profile_output_path() {
    let destination = PathBuf::from("/srv/thumbs");

    unsafe { std::env::remove_var("FRAMESNAP_PROFILE_DIR") };
    assert_eq!(
        profile_output_path(&destination),
        PathBuf::from("/srv/thumbs/framesnap.profile.json")
    );

    unsafe { std::env::set_var("FRAMESNAP_PROFILE_DIR", "/tmp/profiles") };
    assert_eq!(
        profile_output_path(&destination),
        PathBuf::from("/tmp/profiles/framesnap.profile.json")
    );
    unsafe { std::env::remove_var("FRAMESNAP_PROFILE_DIR") };
}

#[test]
fn test_is_profiling_enabled_with_env() {
    unsafe { std::env::remove_var("FRAMESNAP_PROFILE") };
    assert!(!is_profiling_enabled());
    unsafe { std::env::set_var("FRAMESNAP_PROFILE", "1") };
    assert!(is_profiling_enabled());
    unsafe { std::env::set_var("FRAMESNAP_PROFILE", "TRUE") };
    assert!(is_profiling_enabled());
    unsafe { std::env::set_var("FRAMESNAP_PROFILE", "0") };
    assert!(!is_profiling_enabled());
    unsafe { std::env::remove_var("FRAMESNAP_PROFILE") };
}

#[test]
fn test_write_profile_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let profile_path = dir.path().join("framesnap.profile.json");

    let mut collector = ProfileCollector::new(true);
    collector.set_config(sample_config());
    collector.record_frame(timings(7, 12.5, true));
    let profile = collector
        .finish(LedgerSnapshot {
            allocated: 8,
            released: 8,
        })
        .unwrap();

    write_profile(&profile, &profile_path).unwrap();
    assert!(profile_path.exists());

    let content = std::fs::read_to_string(&profile_path).unwrap();
    let restored: ExtractProfile = serde_json::from_str(&content).unwrap();
    assert_eq!(restored.config.mode, ExtractMode::Continuous);
    assert_eq!(restored.frames.len(), 1);
    assert_eq!(restored.frames[0].output.as_deref(), Some("0007.jpg"));
    assert_eq!(restored.buffers.allocated, 8);
}
