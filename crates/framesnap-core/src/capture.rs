use std::sync::Arc;

use crate::buffer::{BufferLedger, BufferView, FrameBuffer};
use crate::error::{CoreError, Result};
use crate::geometry::Geometry;
use crate::handoff::HandoffQueue;
use crate::sampler::{EveryNth, SamplingPolicy};

/// The two decoder-facing operations: hand out a writable buffer before a
/// picture is written, and take it back once the picture is complete.
///
/// Both run on the decoder thread, serialized with each other. They must not
/// block.
pub trait FrameCallbacks: Send {
    fn on_buffer_open(&mut self) -> Result<BufferView<'_>>;

    fn on_buffer_ready(&mut self) -> Result<FrameDisposition>;

    /// The picture could not be written. Releases the in-flight buffer
    /// without sampling it and returns its sequence number. The frame
    /// counter does not advance.
    fn on_buffer_abort(&mut self) -> Result<u64>;
}

/// What happened to a completed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Moved into the hand-off queue.
    Kept { frame_index: u64, sequence: u64 },
    /// Released in place.
    Discarded { frame_index: u64 },
}

impl FrameDisposition {
    pub fn is_kept(&self) -> bool {
        matches!(self, Self::Kept { .. })
    }
}

/// Per-run capture state owned by the decoder thread: the in-flight buffer,
/// the frame counter and the sampling policy.
pub struct FrameCapture<P = EveryNth> {
    geometry: Geometry,
    policy: P,
    queue: HandoffQueue,
    ledger: Arc<BufferLedger>,
    in_flight: Option<FrameBuffer>,
    frame_counter: u64,
    next_sequence: u64,
}

impl<P: SamplingPolicy> FrameCapture<P> {
    pub fn new(
        geometry: Geometry,
        policy: P,
        queue: HandoffQueue,
        ledger: Arc<BufferLedger>,
    ) -> Self {
        Self {
            geometry,
            policy,
            queue,
            ledger,
            in_flight: None,
            frame_counter: 0,
            next_sequence: 0,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Frames reported ready so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frame_counter
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

impl<P: SamplingPolicy> FrameCallbacks for FrameCapture<P> {
    fn on_buffer_open(&mut self) -> Result<BufferView<'_>> {
        if let Some(stale) = self.in_flight.take() {
            let sequence = stale.sequence();
            // Release the stale buffer so the next cycle starts clean.
            drop(stale);
            return Err(CoreError::AllocationConflict { sequence });
        }

        let pitch = self.geometry.pitch as usize;
        let lines = self.geometry.lines as usize;
        let buffer = FrameBuffer::allocate(
            self.next_sequence,
            self.geometry.buffer_len(),
            Arc::clone(&self.ledger),
        );
        self.next_sequence += 1;

        let buffer = self.in_flight.insert(buffer);
        buffer
            .view_mut(pitch, lines)
            .ok_or(CoreError::InvalidGeometry {
                width: self.geometry.width,
                height: self.geometry.height,
            })
    }

    fn on_buffer_ready(&mut self) -> Result<FrameDisposition> {
        let frame_index = self.frame_counter;
        self.frame_counter += 1;

        let buffer = self
            .in_flight
            .take()
            .ok_or(CoreError::NoBufferInFlight { frame_index })?;

        if self.policy.keep(frame_index) {
            let sequence = buffer.sequence();
            self.queue.push(buffer);
            tracing::debug!(frame_index, sequence, "frame kept");
            Ok(FrameDisposition::Kept {
                frame_index,
                sequence,
            })
        } else {
            drop(buffer);
            Ok(FrameDisposition::Discarded { frame_index })
        }
    }

    fn on_buffer_abort(&mut self) -> Result<u64> {
        let buffer = self
            .in_flight
            .take()
            .ok_or(CoreError::NoBufferInFlight {
                frame_index: self.frame_counter,
            })?;
        let sequence = buffer.sequence();
        drop(buffer);
        tracing::debug!(sequence, "frame aborted");
        Ok(sequence)
    }
}
