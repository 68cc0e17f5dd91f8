//! Hands finished frames from the renderer thread to the host tick.
//!
//! The ready bit, the context generation the frame was rendered under, and
//! the width and height share one `AtomicU64`, so a drain either sees a
//! complete frame or nothing. A second `present` before the drain overwrites
//! the first: frames are coalesced, not queued.

use std::sync::atomic::{AtomicU64, Ordering};

const READY: u64 = 1 << 63;
const DIMENSION_BITS: u32 = 20;
const DIMENSION_MASK: u64 = (1 << DIMENSION_BITS) - 1;
const GENERATION_SHIFT: u32 = 2 * DIMENSION_BITS;
/// Generations are kept modulo 2^23.
const GENERATION_MASK: u64 = (1 << (63 - GENERATION_SHIFT)) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPresent {
    /// Low bits of the context generation the frame belongs to.
    pub generation: u64,
    pub width: u32,
    pub height: u32,
}

impl PendingPresent {
    /// True when the frame was rendered under context `generation`.
    pub fn belongs_to(&self, generation: u64) -> bool {
        self.generation == generation & GENERATION_MASK
    }
}

#[derive(Default)]
pub struct PresentHandoff {
    slot: AtomicU64,
}

impl PresentHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a frame of the given size, rendered under context `generation`,
    /// as ready. Callable from any thread. Dimensions saturate at 2^20 - 1.
    pub fn present(&self, generation: u64, width: u32, height: u32) {
        let width = u64::from(width).min(DIMENSION_MASK);
        let height = u64::from(height).min(DIMENSION_MASK);
        let packed = READY
            | ((generation & GENERATION_MASK) << GENERATION_SHIFT)
            | (width << DIMENSION_BITS)
            | height;
        self.slot.store(packed, Ordering::Release);
    }

    /// Takes the pending frame, if any, leaving the slot empty.
    pub fn drain(&self) -> Option<PendingPresent> {
        let packed = self.slot.swap(0, Ordering::AcqRel);
        (packed & READY != 0).then(|| PendingPresent {
            generation: (packed >> GENERATION_SHIFT) & GENERATION_MASK,
            width: ((packed >> DIMENSION_BITS) & DIMENSION_MASK) as u32,
            height: (packed & DIMENSION_MASK) as u32,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.slot.load(Ordering::Acquire) & READY != 0
    }

    pub fn clear(&self) {
        self.slot.store(0, Ordering::Release);
    }
}
