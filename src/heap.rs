//! The allocator itself: ties block layout, the free list, coalescing, and the backing
//! [`MemoryProvider`] together behind the four public operations.

use core::cmp::max;
use core::ptr::NonNull;

use crate::block::{
    adjust_size, align_up, footer, header, next_blkp, read_tag, write_tag, Tag, DSIZE,
    MIN_BLOCK_SIZE, WSIZE,
};
use crate::coalesce::coalesce;
use crate::freelist::FreeList;
use crate::provider::MemoryProvider;

/// Bytes requested from the [`MemoryProvider`] when `find_fit` comes up empty.
///
/// Deliberately small: a big `CHUNKSIZE` wastes address space at program exit, and extending
/// again later is cheap. Tuning this value never changes correctness, only how often
/// `extend_heap` runs.
pub const CHUNKSIZE: usize = 256;

#[inline]
unsafe fn zero_links(bp: *mut u8) {
    (bp as *mut u32).write(0);
    (bp as *mut u32).add(1).write(0);
}

/// A boundary-tag, explicit-free-list heap driven by a [`MemoryProvider`] of type `P`.
///
/// `Heap` owns no memory itself — every byte it manages was handed to it by `P::heap_extend` —
/// and performs no locking; see the crate-level docs for the `global` feature if you need a
/// `GlobalAlloc` built on top of one.
pub struct Heap<P: MemoryProvider> {
    provider: P,
    /// Address of the prologue block's payload pointer. All free-list offsets are relative to
    /// this address, not to `provider.heap_low()` — the prologue sits between them by a fixed
    /// two-word pad+header offset.
    heap_base: *mut u8,
    freelist: FreeList,
}

impl<P: MemoryProvider> Heap<P> {
    /// Initializes a heap: lays down the alignment pad, the prologue and epilogue sentinels, and
    /// extends by one chunk so the first allocation doesn't have to.
    ///
    /// The provider is not trusted to hand back doubleword-aligned memory, so this requests
    /// `DSIZE - 1` extra bytes of slack and rounds the base up itself — every block boundary
    /// after the first is a fixed multiple of 8 past it, so aligning once here is sufficient for
    /// the whole heap.
    ///
    /// Returns `None` if the provider can't satisfy either the initial sentinel request or the
    /// first chunk extension.
    pub fn init(mut provider: P) -> Option<Self> {
        let raw = provider.heap_extend(4 * WSIZE + (DSIZE - 1))?.as_ptr();
        let base = align_up(raw, DSIZE);

        // SAFETY: `heap_extend` granted `4 * WSIZE + (DSIZE - 1)` bytes starting at `raw`, and
        // `base` is `raw` rounded up by at most `DSIZE - 1`, so the 16 bytes written below still
        // fall within that grant.
        unsafe {
            write_tag(base, Tag::pack(0, false)); // alignment pad
            write_tag(base.add(WSIZE), Tag::pack(DSIZE, true)); // prologue header
            write_tag(base.add(2 * WSIZE), Tag::pack(DSIZE, true)); // prologue footer
            write_tag(base.add(3 * WSIZE), Tag::pack(0, true)); // epilogue header
        }

        let heap_base = unsafe { base.add(2 * WSIZE) };
        let mut heap = Self {
            provider,
            heap_base,
            freelist: FreeList::new(),
        };

        // SAFETY: the sentinels above make `heap_base` a well-formed, empty heap.
        unsafe { heap.extend_heap(CHUNKSIZE / WSIZE)? };
        Some(heap)
    }

    /// Allocates at least `n` bytes, returning `None` if `n` is zero or the heap cannot grow
    /// enough to satisfy the request.
    pub fn allocate(&mut self, n: usize) -> Option<NonNull<u8>> {
        if n == 0 {
            return None;
        }
        let asize = adjust_size(n);

        // SAFETY: `self` is a well-formed heap; `find_fit`/`place` operate on it consistently.
        unsafe {
            if let Some(bp) = self.find_fit(asize) {
                self.place(bp, asize);
                return NonNull::new(bp);
            }

            let extend_words = max(asize, CHUNKSIZE) / WSIZE;
            let bp = self.extend_heap(extend_words)?;
            self.place(bp, asize);
            NonNull::new(bp)
        }
    }

    /// Frees a previously-allocated block. A `None` pointer is a no-op.
    pub fn free(&mut self, bp: Option<NonNull<u8>>) {
        let Some(bp) = bp else { return };
        let bp = bp.as_ptr();

        // SAFETY: caller guarantees `bp` is a live payload pointer from this heap.
        unsafe {
            let size = read_tag(header(bp)).size();
            write_tag(header(bp), Tag::pack(size, false));
            write_tag(footer(bp, size), Tag::pack(size, false));
            zero_links(bp);

            let merged = coalesce(self.heap_base, &mut self.freelist, bp);
            self.freelist.insert_head(self.heap_base, merged);
        }
    }

    /// Resizes a block in place when shrinking leaves a splittable remainder, or falls back to
    /// allocate-copy-free when growing. `bp == None` behaves like `allocate(n)`; `n == 0`
    /// behaves like `free(bp)` and returns `None`.
    pub fn resize(&mut self, bp: Option<NonNull<u8>>, n: usize) -> Option<NonNull<u8>> {
        let Some(bp) = bp else {
            return self.allocate(n);
        };

        if n == 0 {
            self.free(Some(bp));
            return None;
        }

        let raw = bp.as_ptr();
        // SAFETY: caller guarantees `raw` is a live payload pointer from this heap.
        let old = unsafe { read_tag(header(raw)).size() };
        let asize = adjust_size(n);

        if old >= asize {
            if old - asize < MIN_BLOCK_SIZE {
                // Can't split off a legal free block; keep the whole thing.
                return Some(bp);
            }

            // SAFETY: `old - asize >= MIN_BLOCK_SIZE`, so splitting leaves a legal free block.
            unsafe {
                write_tag(header(raw), Tag::pack(asize, true));
                write_tag(footer(raw, asize), Tag::pack(asize, true));

                let remainder = next_blkp(raw, asize);
                let rem_size = old - asize;
                write_tag(header(remainder), Tag::pack(rem_size, false));
                write_tag(footer(remainder, rem_size), Tag::pack(rem_size, false));
                zero_links(remainder);

                let merged = coalesce(self.heap_base, &mut self.freelist, remainder);
                self.freelist.insert_head(self.heap_base, merged);
            }
            return Some(bp);
        }

        // Growing: allocate-copy-free. If the allocation fails, `bp` is left untouched.
        let new_bp = self.allocate(n)?;
        // SAFETY: `raw` holds `old - DSIZE` live payload bytes; `new_bp`'s block is at least
        // `asize > old` bytes, so it has at least that many payload bytes to receive them.
        unsafe {
            core::ptr::copy_nonoverlapping(raw, new_bp.as_ptr(), old - DSIZE);
        }
        self.free(Some(bp));
        Some(new_bp)
    }

    /// Allocates space for `nmemb` elements of `size` bytes each and zero-fills the whole
    /// payload. Returns `None` on overflow of `nmemb * size`, or if the allocation itself fails.
    pub fn zero_allocate(&mut self, nmemb: usize, size: usize) -> Option<NonNull<u8>> {
        let bytes = nmemb.checked_mul(size)?;
        let ptr = self.allocate(bytes)?;

        // SAFETY: `ptr` is a freshly allocated block; its header holds the real block size, and
        // zero-filling its whole payload (not just `bytes`) is always in-bounds.
        unsafe {
            let payload_len = read_tag(header(ptr.as_ptr())).size() - DSIZE;
            ptr.as_ptr().write_bytes(0, payload_len);
        }
        Some(ptr)
    }

    /// First-fit search of the free list: the first block whose size is at least `asize`, in
    /// MRU (most-recently-freed) order.
    ///
    /// # Safety
    /// The free list must be well-formed.
    unsafe fn find_fit(&self, asize: usize) -> Option<*mut u8> {
        self.freelist
            .iter(self.heap_base)
            .find(|&bp| read_tag(header(bp)).size() >= asize)
    }

    /// Marks the free block at `bp` (of size `>= asize`) allocated, splitting off and
    /// re-inserting the remainder if it would be at least [`MIN_BLOCK_SIZE`].
    ///
    /// # Safety
    /// `bp` must currently be linked into `self.freelist` with a block size `>= asize`.
    unsafe fn place(&mut self, bp: *mut u8, asize: usize) {
        self.freelist.unlink(self.heap_base, bp);
        let csize = read_tag(header(bp)).size();

        if csize - asize >= MIN_BLOCK_SIZE {
            write_tag(header(bp), Tag::pack(asize, true));
            write_tag(footer(bp, asize), Tag::pack(asize, true));

            let remainder = next_blkp(bp, asize);
            let rem_size = csize - asize;
            write_tag(header(remainder), Tag::pack(rem_size, false));
            write_tag(footer(remainder, rem_size), Tag::pack(rem_size, false));
            zero_links(remainder);
            self.freelist.insert_head(self.heap_base, remainder);
        } else {
            write_tag(header(bp), Tag::pack(csize, true));
            write_tag(footer(bp, csize), Tag::pack(csize, true));
        }
    }

    /// Requests `words` (rounded up to even) more words from the provider, installs the new free
    /// block and epilogue, coalesces with the old tail if it was free, and links the result into
    /// the free list. Returns the resulting block's payload pointer.
    ///
    /// # Safety
    /// `self` must be a well-formed, initialized heap.
    unsafe fn extend_heap(&mut self, words: usize) -> Option<*mut u8> {
        let words = if words % 2 != 0 { words + 1 } else { words };
        let size = words * WSIZE;

        let bp = self.provider.heap_extend(size)?.as_ptr();

        write_tag(header(bp), Tag::pack(size, false));
        write_tag(footer(bp, size), Tag::pack(size, false));
        write_tag(header(next_blkp(bp, size)), Tag::pack(0, true)); // new epilogue
        zero_links(bp);

        let merged = coalesce(self.heap_base, &mut self.freelist, bp);
        self.freelist.insert_head(self.heap_base, merged);
        Some(merged)
    }

    /// Address of the prologue block's payload pointer — the origin free-list offsets are
    /// measured from. Exposed for [`crate::check`].
    pub(crate) fn heap_base(&self) -> *mut u8 {
        self.heap_base
    }

    /// Read-only access to the free list. Exposed for [`crate::check`].
    pub(crate) fn freelist(&self) -> &FreeList {
        &self.freelist
    }

    /// Read-only access to the backing provider. Exposed for [`crate::check`].
    pub(crate) fn provider(&self) -> &P {
        &self.provider
    }
}
