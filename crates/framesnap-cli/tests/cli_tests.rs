use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;

use framesnap_cli::{Cli, render_outcome, run_with_source};
use framesnap_core::config::{ExtractMode, PipelineConfig};
use framesnap_media::extractor::{ContinuousSummary, ExtractOutcome};
use framesnap_test_harness::assertions::assert_sequential_outputs;
use framesnap_test_harness::builders::PipelineConfigBuilder;
use framesnap_test_harness::synthetic::SyntheticSource;

fn no_env(_key: &str) -> Option<String> {
    None
}

#[test]
fn test_flags_override_defaults() {
    let cli = Cli::try_parse_from([
        "framesnap",
        "rtsp://camera.local/live",
        "-o",
        "/srv/thumbs",
        "--width",
        "320",
        "--height",
        "240",
        "-n",
        "25",
        "--continuous",
    ])
    .unwrap();

    let config = cli.resolve_config(no_env).unwrap();
    assert_eq!(config.source_uri, "rtsp://camera.local/live");
    assert_eq!(config.destination, PathBuf::from("/srv/thumbs"));
    assert_eq!((config.width, config.height), (320, 240));
    assert_eq!(config.sampling_period, 25);
    assert_eq!(config.mode, ExtractMode::Continuous);
}

#[test]
fn test_missing_source_is_rejected() {
    let cli = Cli::try_parse_from(["framesnap"]).unwrap();
    assert!(cli.resolve_config(no_env).is_err());
}

#[test]
fn test_layering_file_env_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("framesnap.json");
    let mut file_config = PipelineConfig::new("file.mp4", dir.path());
    file_config.width = 640;
    file_config.height = 480;
    file_config.sampling_period = 50;
    file_config.save(&path).unwrap();

    let env: HashMap<&str, &str> = [
        ("FRAMESNAP_SOURCE_URI", "http://env/stream"),
        ("FRAMESNAP_SAMPLING_PERIOD", "10"),
    ]
    .into_iter()
    .collect();
    let lookup = move |key: &str| env.get(key).map(|v| v.to_string());

    let cli = Cli::try_parse_from([
        "framesnap",
        "--config",
        path.to_str().unwrap(),
        "--height",
        "360",
    ])
    .unwrap();
    let config = cli.resolve_config(lookup).unwrap();

    // Env beats file, flag beats both.
    assert_eq!(config.source_uri, "http://env/stream");
    assert_eq!(config.sampling_period, 10);
    assert_eq!(config.width, 640);
    assert_eq!(config.height, 360);
    assert_eq!(config.mode, ExtractMode::SingleShot);
}

#[test]
fn test_bad_env_value_is_reported() {
    let cli = Cli::try_parse_from(["framesnap", "clip.mp4"]).unwrap();
    let err = cli
        .resolve_config(|key: &str| (key == "FRAMESNAP_WIDTH").then(|| "wide".to_string()))
        .unwrap_err();
    assert!(format!("{err:#}").contains("FRAMESNAP_WIDTH"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let cli = Cli::try_parse_from(["framesnap", "--config", "/nonexistent/framesnap.json"])
        .unwrap();
    let err = cli.resolve_config(no_env).unwrap_err();
    assert!(format!("{err:#}").contains("reading config"));
}

#[test]
fn test_render_outcome() {
    assert_eq!(
        render_outcome(&ExtractOutcome::Snapshot("abc.jpg".into())),
        "abc.jpg"
    );
    let summary = ContinuousSummary {
        files: vec!["0000.jpg".into(), "0001.jpg".into()],
        failed: 0,
        discarded: 0,
    };
    assert_eq!(
        render_outcome(&ExtractOutcome::Sequence(summary)),
        "0000.jpg\n0001.jpg"
    );
}

#[test]
fn test_run_with_synthetic_source() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfigBuilder::new("synthetic://", dir.path())
        .continuous()
        .sampling_period(4)
        .stop_grace_ms(500)
        .build();

    let outcome = run_with_source(config, SyntheticSource::new(12), false).unwrap();
    assert_eq!(render_outcome(&outcome), "0000.jpg\n0001.jpg\n0002.jpg");
    assert_sequential_outputs(dir.path(), 3, "jpg");
}
