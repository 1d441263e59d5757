use crate::{
    profiler::event::Event,
    sync::*,
    types::SyncUnsafeCell,
};
use core::{fmt, mem};

/// Events per storage block. Blocks are never reallocated, so appending does
/// not copy earlier events.
const EVENT_BLOCK_SIZE: usize = 1024;

/// The owner may append.
const IDLE: u8 = 0;
/// The owner is appending.
const WRITING: u8 = 1;
/// The consolidator owns the storage; appends are dropped.
const SEALED: u8 = 2;

/// Append-only event log of a single thread.
///
/// Appends take no lock. Access to the storage is handed between the owning
/// thread and the consolidating thread through the `access` state word: the
/// owner moves `IDLE -> WRITING -> IDLE` around each append, the consolidator
/// moves `IDLE -> SEALED` (waiting out an in-flight append) before reading.
pub(crate) struct RangeEventList {
    blocks: SyncUnsafeCell<Vec<Vec<Event>>>,
    access: AtomicU8,
}

impl RangeEventList {
    pub(crate) fn new(sealed: bool) -> Self {
        Self {
            blocks: SyncUnsafeCell::new(Vec::new()),
            access: AtomicU8::new(if sealed { SEALED } else { IDLE }),
        }
    }

    /// Append `event`. Returns `false` if the list is sealed and the event was
    /// dropped.
    pub(crate) fn record(&self, event: Event) -> bool {
        if self
            .access
            .compare_exchange(IDLE, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        // SAFETY: The successful `IDLE -> WRITING` transition grants exclusive
        // access to `blocks` until the state is released back to `IDLE`.
        unsafe {
            self.blocks.get_mut().with(|ptr| {
                let blocks = &mut *ptr;
                match blocks.last_mut() {
                    Some(block) if block.len() < EVENT_BLOCK_SIZE => block.push(event),
                    _ => {
                        let mut block = Vec::with_capacity(EVENT_BLOCK_SIZE);
                        block.push(event);
                        blocks.push(block);
                    }
                }
            });
        }
        self.access.store(IDLE, Ordering::Release);
        true
    }

    /// Seal the list and drain everything recorded so far, in recording order.
    ///
    /// Callers serialize consolidation through the profiler registry lock.
    pub(crate) fn consolidate(&self) -> Vec<Event> {
        loop {
            match self
                .access
                .compare_exchange(IDLE, SEALED, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) | Err(SEALED) => break,
                Err(_) => spin_loop(),
            }
        }
        // SAFETY: The list is sealed: the owner's `IDLE -> WRITING` transition
        // fails until `unseal`, so nobody else touches `blocks`. The Acquire
        // above synchronizes with the owner's last Release.
        let blocks = unsafe { self.blocks.get_mut().with(|ptr| mem::take(&mut *ptr)) };
        blocks.into_iter().flatten().collect()
    }

    /// Reopen a sealed list for appends.
    pub(crate) fn unseal(&self) {
        let _ = self
            .access
            .compare_exchange(SEALED, IDLE, Ordering::Release, Ordering::Relaxed);
    }
}

impl fmt::Debug for RangeEventList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.access.load(Ordering::Relaxed) {
            IDLE => "idle",
            WRITING => "writing",
            _ => "sealed",
        };
        f.debug_struct("RangeEventList")
            .field("state", &state)
            .finish_non_exhaustive()
    }
}
