//! Heap consistency checker.
//!
//! `check_heap` never mutates anything; it walks the physical block chain and the free list and
//! reports (via `log`, when the `logging` feature is enabled) every violation of invariants
//! I1–I4 it finds. It is a diagnostic tool, not part of the allocator's control flow.

use crate::block::{footer, header, next_blkp, read_tag, DSIZE};
use crate::freelist::{addr_of, next_offset, offset_of, prev_offset};
use crate::heap::Heap;
use crate::provider::MemoryProvider;

#[cfg(feature = "logging")]
macro_rules! report {
    ($verbose:expr, $($arg:tt)*) => {
        if $verbose {
            log::warn!($($arg)*);
        }
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! report {
    ($verbose:expr, $($arg:tt)*) => {
        let _ = $verbose;
    };
}

/// Walks the heap owned by `heap` and checks invariants I1–I4 (see the crate's data model docs):
/// every block's header equals its footer, no two physically adjacent blocks are both free, the
/// free list contains exactly the free blocks each exactly once, and free-list back-links are
/// symmetric. Returns `true` if no violation was found.
///
/// When `verbose` is true and the `logging` feature is enabled, every violation is reported
/// through `log::warn!`. Without the feature, violations are still counted (and reflected in the
/// return value) but nothing is printed.
pub fn check_heap<P: MemoryProvider>(heap: &Heap<P>, verbose: bool) -> bool {
    let mut ok = true;
    let low = heap.provider().heap_low();
    let high = heap.provider().heap_high();

    let mut physical_free_count = 0usize;
    let mut bp = heap.heap_base();

    loop {
        // SAFETY: `bp` starts at the prologue's payload pointer and each iteration advances to
        // the next physical block via a just-read, in-bounds size; the chain terminates at the
        // epilogue (size 0), which `init`/`extend_heap` always install.
        unsafe {
            let tag = read_tag(header(bp));
            let size = tag.size();

            if size == 0 {
                if !tag.is_allocated() {
                    report!(verbose, "epilogue block is not marked allocated");
                    ok = false;
                }
                break;
            }

            if (bp as usize) % DSIZE != 0 {
                report!(verbose, "block at {:p} is not doubleword aligned", bp);
                ok = false;
            }

            if read_tag(footer(bp, size)) != tag {
                report!(verbose, "block at {:p}: header does not match footer", bp);
                ok = false;
            }

            if (bp as *const u8) < low || (bp as *const u8) > high {
                report!(verbose, "block at {:p} lies outside the heap extent", bp);
                ok = false;
            }

            if !tag.is_allocated() {
                physical_free_count += 1;

                let prev_alloc = read_tag(bp.sub(DSIZE)).is_allocated();
                let next_bp = next_blkp(bp, size);
                let next_alloc = read_tag(header(next_bp)).is_allocated();
                if !prev_alloc || !next_alloc {
                    report!(
                        verbose,
                        "block at {:p} was not coalesced with a free neighbor",
                        bp
                    );
                    ok = false;
                }
            }

            bp = next_blkp(bp, size);
        }
    }

    let mut free_list_count = 0usize;
    let heap_base = heap.heap_base();

    // SAFETY: every block reachable from `heap.freelist()` is claimed free by construction; the
    // walk below only reads already-validated link words.
    unsafe {
        for bp in heap.freelist().iter(heap_base) {
            free_list_count += 1;

            if (bp as *const u8) < low || (bp as *const u8) > high {
                report!(verbose, "free-list entry at {:p} is out of bounds", bp);
                ok = false;
                continue;
            }

            if read_tag(header(bp)).is_allocated() {
                report!(verbose, "allocated block {:p} found in the free list", bp);
                ok = false;
            }

            let p = prev_offset(bp);
            let q = next_offset(bp);
            let self_offset = offset_of(heap_base, bp);

            if p != 0 && next_offset(addr_of(heap_base, p)) != self_offset {
                report!(verbose, "free-list back-link at {:p} is asymmetric", bp);
                ok = false;
            }
            if q != 0 && prev_offset(addr_of(heap_base, q)) != self_offset {
                report!(verbose, "free-list forward-link at {:p} is asymmetric", bp);
                ok = false;
            }
        }
    }

    if physical_free_count != free_list_count {
        report!(
            verbose,
            "free-block count mismatch: {} by physical walk, {} in free list",
            physical_free_count,
            free_list_count
        );
        ok = false;
    }

    ok
}
