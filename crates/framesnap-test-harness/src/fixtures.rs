use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Generate a 320x240, 30 fps test video with no audio. Returns the path to
/// the generated file.
pub fn generate_test_video(output_dir: &Path, name: &str, duration_secs: f64) -> PathBuf {
    VideoFixture::new(name).duration(duration_secs).generate(output_dir)
}

/// An H.264 `testsrc` clip rendered by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct VideoFixture {
    name: String,
    duration_secs: f64,
    width: u32,
    height: u32,
    rate: u32,
    audio: bool,
}

impl VideoFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            duration_secs: 1.0,
            width: 320,
            height: 240,
            rate: 30,
            audio: false,
        }
    }

    pub fn duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Odd sizes exercise the padded buffer layout.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    /// Mux a 440 Hz AAC tone next to the video stream.
    pub fn with_audio(mut self) -> Self {
        self.audio = true;
        self
    }

    fn ffmpeg_args(&self, output_path: &Path) -> Vec<OsString> {
        let d = self.duration_secs;
        let mut args: Vec<OsString> = vec!["-y".into(), "-f".into(), "lavfi".into(), "-i".into()];
        args.push(
            format!(
                "testsrc=duration={d}:size={}x{}:rate={}",
                self.width, self.height, self.rate
            )
            .into(),
        );
        if self.audio {
            args.extend(["-f", "lavfi", "-i"].map(OsString::from));
            args.push(format!("sine=frequency=440:duration={d}").into());
        }
        args.extend(
            ["-c:v", "libx264", "-pix_fmt", "yuv420p", "-preset", "ultrafast"].map(OsString::from),
        );
        if self.audio {
            args.extend(["-c:a", "aac", "-shortest"].map(OsString::from));
        }
        args.push(output_path.as_os_str().to_os_string());
        args
    }

    pub fn generate(&self, output_dir: &Path) -> PathBuf {
        let output_path = output_dir.join(format!("{}.mp4", self.name));

        let status = Command::new("ffmpeg")
            .args(self.ffmpeg_args(&output_path))
            .stderr(std::process::Stdio::null())
            .status()
            .expect("ffmpeg must be installed to generate test fixtures");

        assert!(
            status.success(),
            "ffmpeg failed to generate fixture {} ({:?})",
            self.name,
            self
        );
        assert!(output_path.exists(), "fixture was not created: {}", self.name);

        output_path
    }
}

/// Generate an audio-only file, for sources without a video stream.
pub fn generate_audio_only(output_dir: &Path, name: &str, duration_secs: f64) -> PathBuf {
    let output_path = output_dir.join(format!("{name}.m4a"));

    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-f",
            "lavfi",
            "-i",
            &format!("sine=frequency=440:duration={duration_secs}"),
            "-c:a",
            "aac",
        ])
        .arg(&output_path)
        .stderr(std::process::Stdio::null())
        .status()
        .expect("ffmpeg must be installed to generate test fixtures");

    assert!(status.success(), "ffmpeg failed to generate audio {name}");

    output_path
}

/// Get a temporary directory for test fixtures that persists for the test run.
pub fn fixture_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("failed to create temp dir for fixtures")
}
