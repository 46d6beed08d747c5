use std::cell::UnsafeCell;

use crossbeam_utils::CachePadded;

use crate::collidables::convex_polygon::ConvexPolygon;

/// Upper bound on concurrent query threads. Each thread gets one scratch
/// slot, selected by the caller-supplied thread index.
pub const MAX_THREAD_COUNT: usize = 16;

/// Reusable per-thread working storage for mesh queries: the face view fed
/// to the contact solver and the candidate-face index buffer.
#[derive(Default)]
pub struct ThreadScratch {
    pub polygon: ConvexPolygon,
    pub faces: Vec<u32>,
}

/// A fixed array of scratch slots, one per worker thread, padded so two
/// workers never share a cache line. There is no locking: the caller
/// guarantees that at most one in-flight query uses each thread index.
pub struct ScratchPool {
    slots: Box<[CachePadded<UnsafeCell<ThreadScratch>>]>,
}

// Distinct slots are independent; the thread-index contract makes aliased
// access a caller bug checked at the dispatch boundary.
unsafe impl Sync for ScratchPool {}

impl ScratchPool {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_THREAD_COUNT);
        for _ in 0..MAX_THREAD_COUNT {
            slots.push(CachePadded::new(UnsafeCell::new(ThreadScratch::default())));
        }
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    #[inline(always)]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Hands out the scratch slot for a thread index.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other live reference to the same slot
    /// exists, i.e. each thread index is used by one query at a time.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn scratch(&self, thread_index: usize) -> &mut ThreadScratch {
        debug_assert!(thread_index < self.slots.len());
        &mut *self.slots[thread_index].get()
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new()
    }
}
