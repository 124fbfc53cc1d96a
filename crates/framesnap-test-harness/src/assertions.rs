use std::path::Path;

use framesnap_core::buffer::BufferLedger;

/// Assert every frame buffer allocated in a run was released.
pub fn assert_ledger_balanced(ledger: &BufferLedger) {
    let snapshot = ledger.snapshot();
    assert!(
        snapshot.is_balanced(),
        "{} buffers allocated but {} released",
        snapshot.allocated,
        snapshot.released
    );
}

/// Assert `dir` holds exactly `0000.<ext>` through `count - 1` with no gaps
/// and nothing past the end.
pub fn assert_sequential_outputs(dir: &Path, count: u64, extension: &str) {
    for i in 0..count {
        let path = dir.join(format!("{i:04}.{extension}"));
        assert!(path.exists(), "missing sequential output {}", path.display());
    }
    let next = dir.join(format!("{count:04}.{extension}"));
    assert!(!next.exists(), "unexpected output past the end: {}", next.display());
}

/// Assert the image at `path` decodes with the given dimensions.
pub fn assert_image_dimensions(path: &Path, width: u32, height: u32) {
    let (w, h) = image::image_dimensions(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    assert_eq!(
        (w, h),
        (width, height),
        "{} is {w}x{h}, expected {width}x{height}",
        path.display()
    );
}

/// Assert the center pixel of the image at `path` is within `tolerance` of
/// `expected` on every channel. Lossy codecs shift colors slightly.
pub fn assert_center_color_approx(path: &Path, expected: [u8; 3], tolerance: u8) {
    let img = image::open(path)
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", path.display()))
        .to_rgb8();
    let px = img.get_pixel(img.width() / 2, img.height() / 2).0;
    for (channel, (&got, &want)) in px.iter().zip(expected.iter()).enumerate() {
        assert!(
            got.abs_diff(want) <= tolerance,
            "{} channel {channel}: got {got}, expected {want} (tolerance {tolerance})",
            path.display()
        );
    }
}

/// Assert no temporary files were left behind in `dir`.
pub fn assert_no_partial_files(dir: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot list {}: {e}", dir.display()))
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "partial files left behind: {leftovers:?}");
}

/// Names of the files in `dir` with the given extension, sorted.
pub fn output_files(dir: &Path, extension: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot list {}: {e}", dir.display()))
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(&format!(".{extension}")))
        .collect();
    names.sort();
    names
}
