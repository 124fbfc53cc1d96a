use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::buffer::FrameBuffer;

/// Unbounded FIFO moving kept frame buffers from the decoder thread to the
/// extractor. Handles are cheap to clone and can be shared by several
/// producers and consumers.
///
/// Buffers still queued when the last handle is dropped are released with
/// the channel.
#[derive(Debug, Clone)]
pub struct HandoffQueue {
    tx: Sender<FrameBuffer>,
    rx: Receiver<FrameBuffer>,
}

impl HandoffQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Enqueue a buffer. Never blocks; ownership moves into the queue.
    pub fn push(&self, buffer: FrameBuffer) {
        // `self` holds a receiver, so the channel cannot be disconnected here.
        if let Err(err) = self.tx.send(buffer) {
            tracing::warn!(sequence = err.0.sequence(), "hand-off queue disconnected");
        }
    }

    /// Dequeue without waiting.
    pub fn try_pop(&self) -> Option<FrameBuffer> {
        match self.rx.try_recv() {
            Ok(buffer) => Some(buffer),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Dequeue, waiting up to `timeout` for an entry to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<FrameBuffer> {
        match self.rx.recv_timeout(timeout) {
            Ok(buffer) => Some(buffer),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::new()
    }
}
