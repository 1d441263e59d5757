use crate::{
    sync::{AtomicU64, Ordering},
    types::SequenceNr,
};
use std::sync::LazyLock;

/// Monotonic source of node sequence numbers.
///
/// Every draw is a single atomic increment, so numbers drawn on one thread are
/// strictly increasing in call order. Draws on different threads interleave
/// arbitrarily; nothing orders a node built on thread A against one built on
/// thread B.
#[derive(Debug)]
pub struct SequenceNrAllocator {
    next: AtomicU64,
}

impl Default for SequenceNrAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceNrAllocator {
    /// Allocator whose first draw returns 0.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Draw the next sequence number.
    #[inline]
    pub fn draw(&self) -> SequenceNr {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The number the next draw will return, at the time of the call.
    #[inline]
    pub fn peek(&self) -> SequenceNr {
        self.next.load(Ordering::Relaxed)
    }
}

static GLOBAL: LazyLock<SequenceNrAllocator> = LazyLock::new(SequenceNrAllocator::new);

/// Draw from the allocator shared by all nodes in the process.
pub fn next_sequence_nr() -> SequenceNr {
    GLOBAL.draw()
}
