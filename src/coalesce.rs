//! Boundary-tag coalescing: merging a just-freed block with its free physical neighbors.

use crate::block::{footer, header, next_blkp, prev_blkp_of, read_tag, write_tag, Tag, DSIZE};
use crate::freelist::FreeList;

/// Merges `bp` — a block whose header/footer are already marked free but which is **not yet**
/// linked into `freelist` — with any free physical neighbors, and returns the payload pointer of
/// the resulting (possibly larger) free block. The caller is responsible for inserting the
/// result into `freelist` afterwards; `coalesce` only unlinks neighbors it absorbs.
///
/// # Safety
/// `bp` must be a valid, currently-free block (header already rewritten) whose physical
/// neighbors (reachable via the prologue/epilogue sentinels) are valid blocks.
pub unsafe fn coalesce(heap_base: *mut u8, freelist: &mut FreeList, bp: *mut u8) -> *mut u8 {
    let mut size = read_tag(header(bp)).size();

    // The prologue sentinel is always allocated, so this read is always in-bounds even for the
    // very first real block.
    let prev_alloc = read_tag(bp.sub(DSIZE)).is_allocated();
    let next_bp = next_blkp(bp, size);
    let next_alloc = read_tag(header(next_bp)).is_allocated();

    let result = match (prev_alloc, next_alloc) {
        // Case 1: both neighbors allocated, nothing to merge.
        (true, true) => bp,

        // Case 2: next neighbor is free, absorb it.
        (true, false) => {
            freelist.unlink(heap_base, next_bp);
            size += read_tag(header(next_bp)).size();
            bp
        }

        // Case 3: previous neighbor is free, absorb it and become it.
        (false, true) => {
            let prev_bp = prev_blkp_of(bp);
            freelist.unlink(heap_base, prev_bp);
            size += read_tag(header(prev_bp)).size();
            prev_bp
        }

        // Case 4: both neighbors are free, absorb both.
        (false, false) => {
            let prev_bp = prev_blkp_of(bp);
            freelist.unlink(heap_base, next_bp);
            freelist.unlink(heap_base, prev_bp);
            size += read_tag(header(prev_bp)).size() + read_tag(header(next_bp)).size();
            prev_bp
        }
    };

    write_tag(header(result), Tag::pack(size, false));
    write_tag(footer(result, size), Tag::pack(size, false));
    result
}
