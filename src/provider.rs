//! The backing memory collaborator.
//!
//! `bfalloc` never owns physical or virtual memory itself: it asks a [`MemoryProvider`] to grow
//! a contiguous region and only ever walks forward inside whatever has already been granted.
//! This is the host described in the allocator's purpose: something that exposes `heap_extend`,
//! `heap_low`, `heap_high` and `heap_size`, and that the allocator is the sole caller of between
//! [`crate::heap::Heap::init`] and process exit.

use core::ptr::NonNull;

/// A source of growable, contiguous memory for a [`crate::heap::Heap`] to manage.
///
/// Implementors only need to guarantee that addresses already handed out by a prior
/// `heap_extend` call remain valid and stable for the provider's lifetime; `Heap` never asks for
/// memory back.
pub trait MemoryProvider {
    /// Grows the region by `bytes` and returns the address of the first new byte, or `None` if
    /// the provider cannot satisfy the request (out of memory).
    ///
    /// The returned address need not be aligned to anything in particular — [`crate::heap::Heap`]
    /// does not rely on it and aligns the very first byte itself during `init`. Every byte
    /// requested must still be contiguous with, and immediately follow, whatever was granted by
    /// the previous call.
    fn heap_extend(&mut self, bytes: usize) -> Option<NonNull<u8>>;

    /// Lowest address ever handed out by this provider.
    fn heap_low(&self) -> *const u8;

    /// One past the highest address currently owned by this provider.
    fn heap_high(&self) -> *const u8;

    /// Total number of bytes currently owned by this provider.
    fn heap_size(&self) -> usize;
}

/// A [`MemoryProvider`] backed by a fixed-size buffer supplied by the caller.
///
/// Growth never moves the buffer (there is nothing to reallocate, unlike a `Vec`), so every
/// pointer `heap_extend` returns stays valid for the lifetime of the `StaticRegion`. Extending
/// past the buffer's capacity fails exactly like a real allocator running into the limit of its
/// address space.
pub struct StaticRegion<'a> {
    buf: &'a mut [u8],
    used: usize,
}

impl<'a> StaticRegion<'a> {
    /// Wraps `buf` as an initially-empty region; `heap_extend` will hand out bytes from the
    /// front of `buf` as the heap grows into it.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, used: 0 }
    }

    /// Total capacity of the backing buffer, used and unused.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl MemoryProvider for StaticRegion<'_> {
    fn heap_extend(&mut self, bytes: usize) -> Option<NonNull<u8>> {
        let new_used = self.used.checked_add(bytes)?;
        if new_used > self.buf.len() {
            return None;
        }

        // SAFETY: `self.used` is within bounds by the check above, and stays within bounds of
        // `self.buf` for the lifetime of `self` since the buffer never moves or shrinks.
        let ptr = unsafe { self.buf.as_mut_ptr().add(self.used) };
        self.used = new_used;
        NonNull::new(ptr)
    }

    fn heap_low(&self) -> *const u8 {
        self.buf.as_ptr()
    }

    fn heap_high(&self) -> *const u8 {
        // SAFETY: `self.used <= self.buf.len()`, so this is at most one-past-the-end of `buf`.
        unsafe { self.buf.as_ptr().add(self.used) }
    }

    fn heap_size(&self) -> usize {
        self.used
    }
}
