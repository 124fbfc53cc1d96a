use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// =============================================================================
// BufferLedger
// =============================================================================

/// Counts frame buffer allocations and releases for one pipeline run.
///
/// Every [`FrameBuffer`] records itself here when it is created and again
/// when it is dropped, so `allocated == released` once every handle is gone.
#[derive(Debug, Default)]
pub struct BufferLedger {
    allocated: AtomicU64,
    released: AtomicU64,
}

/// Point-in-time copy of a [`BufferLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub allocated: u64,
    pub released: u64,
}

impl LedgerSnapshot {
    pub fn outstanding(&self) -> u64 {
        self.allocated - self.released
    }

    pub fn is_balanced(&self) -> bool {
        self.allocated == self.released
    }
}

impl BufferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Acquire)
    }

    /// Buffers currently alive anywhere in the pipeline.
    pub fn outstanding(&self) -> u64 {
        self.snapshot().outstanding()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        // Read `released` first so the snapshot never shows more releases
        // than allocations.
        let released = self.released.load(Ordering::Acquire);
        let allocated = self.allocated.load(Ordering::Acquire);
        LedgerSnapshot {
            allocated,
            released,
        }
    }

    fn record_allocation(&self) {
        self.allocated.fetch_add(1, Ordering::AcqRel);
    }

    fn record_release(&self) {
        self.released.fetch_add(1, Ordering::AcqRel);
    }
}

// =============================================================================
// FrameBuffer
// =============================================================================

/// One decoded frame at decoder-native stride: exactly `pitch * lines` bytes.
///
/// A buffer has a single owner at a time (the in-flight slot, the hand-off
/// queue, or the consumer). It cannot be cloned; dropping it is the release.
pub struct FrameBuffer {
    sequence: u64,
    data: Box<[u8]>,
    ledger: Arc<BufferLedger>,
}

impl FrameBuffer {
    /// Allocate a fresh zeroed region. Never reuses earlier storage.
    pub fn allocate(sequence: u64, len: usize, ledger: Arc<BufferLedger>) -> Self {
        let data = vec![0u8; len].into_boxed_slice();
        ledger.record_allocation();
        Self {
            sequence,
            data,
            ledger,
        }
    }

    /// Creation order among all buffers of the run, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Writable view with the row layout the decoder was told about.
    /// Returns `None` if `pitch * lines` does not match the buffer length.
    pub fn view_mut(&mut self, pitch: usize, lines: usize) -> Option<BufferView<'_>> {
        if pitch.checked_mul(lines)? != self.data.len() {
            return None;
        }
        Some(BufferView {
            data: &mut self.data[..],
            pitch,
            lines,
        })
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        self.ledger.record_release();
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("sequence", &self.sequence)
            .field("len", &self.data.len())
            .finish()
    }
}

// =============================================================================
// BufferView
// =============================================================================

/// Bounds-checked writable window over the in-flight buffer, handed to the
/// decoder between buffer-open and buffer-ready.
pub struct BufferView<'a> {
    data: &'a mut [u8],
    pitch: usize,
    lines: usize,
}

impl BufferView<'_> {
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Full row `y` including its alignment padding.
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.lines {
            return None;
        }
        let start = y * self.pitch;
        self.data.get_mut(start..start + self.pitch)
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    /// Base address for native writers. Valid for `len()` bytes while the
    /// view is alive.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.data.as_mut_ptr()
    }
}
