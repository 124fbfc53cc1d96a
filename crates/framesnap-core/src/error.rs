use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid frame geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("sampling period must be at least 1")]
    InvalidSamplingPeriod,

    #[error("buffer open while frame buffer #{sequence} is still in flight")]
    AllocationConflict { sequence: u64 },

    #[error("buffer ready for frame {frame_index} but no buffer is in flight")]
    NoBufferInFlight { frame_index: u64 },

    #[error("video format was not negotiated before playback")]
    FormatNotNegotiated,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
