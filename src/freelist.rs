//! Free-list link encoding and operations.
//!
//! The free list is singly-threaded but doubly linked: each free block's payload begins with two
//! words, `prev_offset` and `next_offset`, both measured as byte offsets from the heap base with
//! `0` reserved to mean "none" (the first real block always sits at a positive offset, past the
//! prologue, so `0` can never be a legitimate link target). Using offsets instead of pointers
//! keeps each link at 4 bytes, which is what lets the two links fit inside the 16-byte minimum
//! block alongside the header and footer.

const NONE: u32 = 0;

#[inline]
pub(crate) unsafe fn addr_of(heap_base: *mut u8, offset: u32) -> *mut u8 {
    heap_base.add(offset as usize)
}

#[inline]
pub(crate) unsafe fn offset_of(heap_base: *mut u8, bp: *mut u8) -> u32 {
    (bp as usize - heap_base as usize) as u32
}

#[inline]
pub(crate) unsafe fn prev_offset(bp: *mut u8) -> u32 {
    (bp as *const u32).read()
}

#[inline]
pub(crate) unsafe fn next_offset(bp: *mut u8) -> u32 {
    (bp as *const u32).add(1).read()
}

#[inline]
unsafe fn set_prev_offset(bp: *mut u8, v: u32) {
    (bp as *mut u32).write(v);
}

#[inline]
unsafe fn set_next_offset(bp: *mut u8, v: u32) {
    (bp as *mut u32).add(1).write(v);
}

/// Head of the explicit free list: a single 32-bit heap-relative offset, `0` when empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct FreeList {
    head: u32,
}

impl FreeList {
    /// A freshly initialized, empty free list.
    pub const fn new() -> Self {
        Self { head: NONE }
    }

    /// Whether the list currently holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.head == NONE
    }

    /// Inserts `bp` at the head of the list (LIFO). `bp`'s link words are overwritten; its tag
    /// must already mark it free.
    ///
    /// # Safety
    /// `bp` must be a live free block's payload pointer within the heap rooted at `heap_base`,
    /// with at least two payload words available for the links.
    pub unsafe fn insert_head(&mut self, heap_base: *mut u8, bp: *mut u8) {
        set_prev_offset(bp, NONE);
        set_next_offset(bp, self.head);
        if self.head != NONE {
            set_prev_offset(addr_of(heap_base, self.head), offset_of(heap_base, bp));
        }
        self.head = offset_of(heap_base, bp);
    }

    /// Removes `bp` from the list, splicing its neighbors together.
    ///
    /// # Safety
    /// `bp` must currently be linked into this list.
    pub unsafe fn unlink(&mut self, heap_base: *mut u8, bp: *mut u8) {
        let p = prev_offset(bp);
        let q = next_offset(bp);

        if p != NONE {
            set_next_offset(addr_of(heap_base, p), q);
        } else {
            self.head = q;
        }

        if q != NONE {
            set_prev_offset(addr_of(heap_base, q), p);
        }
    }

    /// Walks the list from the head in MRU (most-recently-freed) order.
    ///
    /// # Safety
    /// `heap_base` must be the same base the list was built against, and every block linked into
    /// it must still be a valid, free block.
    pub unsafe fn iter(&self, heap_base: *mut u8) -> FreeListIter {
        FreeListIter {
            heap_base,
            next: self.head,
        }
    }
}

/// Iterator over the payload pointers of every block currently on a [`FreeList`], head to tail.
pub struct FreeListIter {
    heap_base: *mut u8,
    next: u32,
}

impl Iterator for FreeListIter {
    type Item = *mut u8;

    fn next(&mut self) -> Option<*mut u8> {
        if self.next == NONE {
            return None;
        }
        // SAFETY: caller of `FreeList::iter` upheld the list's validity for its lifetime.
        unsafe {
            let bp = addr_of(self.heap_base, self.next);
            self.next = next_offset(bp);
            Some(bp)
        }
    }
}
