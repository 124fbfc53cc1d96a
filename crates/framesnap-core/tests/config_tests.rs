use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use framesnap_core::config::{ExtractMode, PipelineConfig};
use framesnap_core::error::CoreError;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.width, 800);
    assert_eq!(config.height, 600);
    assert_eq!(config.sampling_period, 100);
    assert_eq!(config.mode, ExtractMode::SingleShot);
    assert_eq!(config.frame_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.poll_interval(), Duration::from_millis(100));
    assert_eq!(config.io_timeout(), Some(Duration::from_secs(10)));
    // No source configured yet.
    assert!(matches!(config.validate(), Err(CoreError::Config(_))));
}

#[test]
fn test_partial_json_uses_defaults() {
    let json = r#"{ "source_uri": "rtsp://camera/stream", "mode": "continuous", "sampling_period": 25 }"#;
    let config: PipelineConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.source_uri, "rtsp://camera/stream");
    assert_eq!(config.mode, ExtractMode::Continuous);
    assert_eq!(config.sampling_period, 25);
    assert_eq!(config.width, 800);
    assert_eq!(config.jpeg_quality, 90);
    config.validate().unwrap();
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("framesnap.json");

    let mut config = PipelineConfig::new("/videos/meter.mp4", "/tmp/out");
    config.frame_timeout_secs = None;
    config.save(&path).unwrap();

    let loaded = PipelineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_env_overrides() {
    let mut config = PipelineConfig::default();
    config
        .apply_vars(vars(&[
            ("FRAMESNAP_SOURCE_URI", "http://cam.local/live"),
            ("FRAMESNAP_DESTINATION", "/srv/snapshots"),
            ("FRAMESNAP_WIDTH", "640"),
            ("FRAMESNAP_HEIGHT", " 480 "),
            ("FRAMESNAP_SAMPLING_PERIOD", "10"),
            ("FRAMESNAP_MODE", "continuous"),
            ("FRAMESNAP_FRAME_TIMEOUT_SECS", "none"),
            ("FRAMESNAP_IO_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

    assert_eq!(config.source_uri, "http://cam.local/live");
    assert_eq!(config.destination, PathBuf::from("/srv/snapshots"));
    assert_eq!((config.width, config.height), (640, 480));
    assert_eq!(config.sampling_period, 10);
    assert_eq!(config.mode, ExtractMode::Continuous);
    assert_eq!(config.frame_timeout(), None);
    assert_eq!(config.io_timeout(), Some(Duration::from_secs(3)));
}

#[test]
fn test_bad_env_value_is_config_error() {
    let mut config = PipelineConfig::default();
    let err = config
        .apply_vars(vars(&[("FRAMESNAP_WIDTH", "wide")]))
        .unwrap_err();
    assert!(matches!(err, CoreError::Config(msg) if msg.contains("FRAMESNAP_WIDTH")));

    let err = config
        .apply_vars(vars(&[("FRAMESNAP_MODE", "sometimes")]))
        .unwrap_err();
    assert!(matches!(err, CoreError::Config(_)));
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = PipelineConfig::new("file.mp4", "/tmp");
    config.validate().unwrap();

    config.sampling_period = 0;
    assert!(matches!(config.validate(), Err(CoreError::InvalidSamplingPeriod)));

    config.sampling_period = 1;
    config.height = 0;
    assert!(matches!(config.validate(), Err(CoreError::InvalidGeometry { .. })));

    config.height = 600;
    config.jpeg_quality = 0;
    assert!(matches!(config.validate(), Err(CoreError::Config(_))));
}
