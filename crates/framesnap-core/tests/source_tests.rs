use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use framesnap_core::geometry::Geometry;
use framesnap_core::source::{PixelFormat, Playback, VideoFormat};

#[test]
fn test_video_format_from_geometry() {
    let geometry = Geometry::new(800, 600).unwrap();
    let format = VideoFormat::bgra(&geometry);
    assert_eq!(format.pixel_format, PixelFormat::Bgra);
    assert_eq!(format.width, 800);
    assert_eq!(format.height, 600);
    assert_eq!(format.pitch, 3200);
    assert_eq!(format.lines, 608);
}

#[test]
fn test_playback_stop_joins_thread() {
    let iterations = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&iterations);
    let playback = Playback::spawn("test-decoder", move |stop| {
        while !stop.is_stopped() {
            counter.fetch_add(1, Ordering::Relaxed);
            thread::sleep(Duration::from_millis(1));
        }
    })
    .unwrap();

    thread::sleep(Duration::from_millis(20));
    playback.stop();

    let after_stop = iterations.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(iterations.load(Ordering::Relaxed), after_stop);
    assert!(after_stop > 0);
}

#[test]
fn test_playback_drop_stops_thread() {
    let finished = Arc::new(AtomicU64::new(0));
    let flag = Arc::clone(&finished);
    {
        let _playback = Playback::spawn("test-decoder", move |stop| {
            while !stop.is_stopped() {
                thread::sleep(Duration::from_millis(1));
            }
            flag.store(1, Ordering::Release);
        })
        .unwrap();
    }
    assert_eq!(finished.load(Ordering::Acquire), 1);
}

#[test]
fn test_playback_reports_finished_body() {
    let playback = Playback::spawn("test-decoder", |_stop| {}).unwrap();
    for _ in 0..500 {
        if playback.is_finished() {
            break;
        }
        thread::sleep(Duration::from_millis(2));
    }
    assert!(playback.is_finished());
}
