use crate::error::{CoreError, Result};

pub const DEFAULT_SAMPLING_PERIOD: u64 = 100;

/// Decides whether a just-decoded frame is kept for extraction.
///
/// Implementations must depend only on the frame index so that the decision
/// is cheap and repeatable on the decoder thread.
pub trait SamplingPolicy: Send {
    fn keep(&self, frame_index: u64) -> bool;
}

/// Keeps frames `0, period, 2 * period, ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EveryNth {
    period: u64,
}

impl EveryNth {
    pub fn new(period: u64) -> Result<Self> {
        if period == 0 {
            return Err(CoreError::InvalidSamplingPeriod);
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// Number of frames kept among indices `0..=last_index`.
    pub fn kept_count(&self, last_index: u64) -> u64 {
        last_index / self.period + 1
    }
}

impl Default for EveryNth {
    fn default() -> Self {
        Self {
            period: DEFAULT_SAMPLING_PERIOD,
        }
    }
}

impl SamplingPolicy for EveryNth {
    fn keep(&self, frame_index: u64) -> bool {
        frame_index % self.period == 0
    }
}

impl<F> SamplingPolicy for F
where
    F: Fn(u64) -> bool + Send,
{
    fn keep(&self, frame_index: u64) -> bool {
        self(frame_index)
    }
}
