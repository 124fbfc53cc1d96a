use thiserror::Error;

use framesnap_core::error::CoreError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to open source: {0}")]
    OpenFailed(String),

    #[error("no video stream found")]
    NoVideoStream,

    #[error("decoder error: {0}")]
    DecoderError(String),

    #[error("encoder error: {0}")]
    EncoderError(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// True for failures of a single frame's crop/encode/write cycle, as
    /// opposed to the source never delivering a frame.
    pub fn is_frame_failure(&self) -> bool {
        matches!(
            self,
            Self::EncoderError(_) | Self::Image(_) | Self::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
