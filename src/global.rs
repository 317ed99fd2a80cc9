//! `GlobalAlloc` adapter, gated behind the `global` feature.
//!
//! Mirrors the teacher pattern of a `Locked<Allocator>` wrapping a `spin::Mutex` purely to
//! satisfy `GlobalAlloc`'s `&self`-only methods — the allocator itself is still a single logical
//! actor; the mutex just serializes entry into it.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};

use crate::block::DSIZE;
use crate::heap::Heap;
use crate::provider::MemoryProvider;

/// Wraps a [`Heap`] behind a spinlock so it can be used as `#[global_allocator]`.
///
/// `Layout::align()` beyond the heap's natural doubleword alignment is not supported — this
/// matches the non-goal that multiple size classes / alignments are out of scope; requests with
/// an alignment greater than 8 fail (return a null pointer) rather than silently misalign.
pub struct LockedHeap<P: MemoryProvider> {
    inner: spin::Mutex<Option<Heap<P>>>,
}

impl<P: MemoryProvider> LockedHeap<P> {
    /// An uninitialized `LockedHeap`. Call [`Self::init`] before any allocation is attempted.
    pub const fn empty() -> Self {
        Self {
            inner: spin::Mutex::new(None),
        }
    }

    /// Initializes the underlying [`Heap`] from `provider`. Returns `false` if initialization
    /// fails (the provider couldn't satisfy the initial sentinel/chunk request).
    pub fn init(&self, provider: P) -> bool {
        match Heap::init(provider) {
            Some(heap) => {
                *self.inner.lock() = Some(heap);
                true
            }
            None => false,
        }
    }
}

unsafe impl<P: MemoryProvider> GlobalAlloc for LockedHeap<P> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > DSIZE {
            return ptr::null_mut();
        }
        let mut guard = self.inner.lock();
        let Some(heap) = guard.as_mut() else {
            return ptr::null_mut();
        };
        heap.allocate(layout.size())
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        let mut guard = self.inner.lock();
        let Some(heap) = guard.as_mut() else { return };
        heap.free(NonNull::new(ptr));
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > DSIZE {
            return ptr::null_mut();
        }
        let mut guard = self.inner.lock();
        let Some(heap) = guard.as_mut() else {
            return ptr::null_mut();
        };
        heap.resize(NonNull::new(ptr), new_size)
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }
}

unsafe impl<P: MemoryProvider + Send> Sync for LockedHeap<P> {}
