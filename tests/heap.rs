use core::ptr::NonNull;

use bfalloc::block::{self, adjust_size};
use bfalloc::{check_heap, Heap, StaticRegion};

const POOL: usize = 64 * 1024;

fn new_heap(pool: &mut [u8]) -> Heap<StaticRegion<'_>> {
    Heap::init(StaticRegion::new(pool)).expect("init should succeed with ample backing memory")
}

unsafe fn block_size(bp: NonNull<u8>) -> usize {
    block::read_tag(block::header(bp.as_ptr())).size()
}

unsafe fn is_allocated(bp: NonNull<u8>) -> bool {
    block::read_tag(block::header(bp.as_ptr())).is_allocated()
}

unsafe fn next_block(bp: NonNull<u8>) -> NonNull<u8> {
    NonNull::new(block::next_blkp_of(bp.as_ptr())).unwrap()
}

#[test]
fn allocate_returns_aligned_in_bounds_pointer() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.allocate(37).unwrap();
    assert_eq!(p.as_ptr() as usize % 8, 0, "payload pointer must be 8-aligned");
    assert!(check_heap(&heap, true));
}

#[test]
fn allocate_is_aligned_regardless_of_backing_buffer_alignment() {
    // `StaticRegion` makes no alignment promise about the slice it's handed — a plain `&mut
    // [u8]` has natural alignment 1. Slide the start across every byte offset so at least one
    // run begins on a genuinely unaligned address, and confirm `Heap::init` corrects for it
    // rather than relying on the backing buffer to happen to land on an 8-byte boundary.
    let mut raw = [0u8; POOL + 8];
    for offset in 0..8 {
        let mut heap = new_heap(&mut raw[offset..]);

        let p = heap.allocate(37).unwrap();
        assert_eq!(
            p.as_ptr() as usize % 8,
            0,
            "payload must be 8-aligned even with a provider base offset by {offset} bytes"
        );
        assert!(check_heap(&heap, true));
    }
}

#[test]
fn allocate_zero_returns_null_and_does_not_mutate() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.allocate(64).unwrap();
    assert!(heap.allocate(0).is_none());

    // The heap is unaffected: the earlier allocation is still exactly as it was.
    unsafe {
        assert!(is_allocated(p));
    }
    assert!(check_heap(&heap, true));
}

#[test]
fn free_of_null_is_a_no_op() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    heap.free(None);
    assert!(check_heap(&heap, true));
}

#[test]
fn resize_null_forwards_to_allocate() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.resize(None, 48).unwrap();
    unsafe {
        assert!(is_allocated(p));
        assert!(block_size(p) >= adjust_size(48));
    }
}

#[test]
fn resize_to_zero_frees_and_returns_none() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.allocate(48).unwrap();
    assert!(heap.resize(Some(p), 0).is_none());
    unsafe {
        assert!(!is_allocated(p));
    }
    assert!(check_heap(&heap, true));
}

#[test]
fn resize_to_same_size_is_a_no_op_pointer_wise() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.allocate(50).unwrap();
    let q = heap.resize(Some(p), 50).unwrap();
    assert_eq!(p, q);
    assert!(check_heap(&heap, true));
}

#[test]
fn zero_allocate_zero_fills_the_whole_payload() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.zero_allocate(10, 8).unwrap();
    unsafe {
        let size = block_size(p);
        let payload = core::slice::from_raw_parts(p.as_ptr(), size - block::DSIZE);
        assert!(payload.iter().all(|&b| b == 0));
        assert!(size - block::DSIZE >= 80);
    }
}

#[test]
fn zero_allocate_overflow_returns_none() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    assert!(heap.zero_allocate(usize::MAX, 2).is_none());
}

// init's sentinel pad (16 bytes) plus the first CHUNKSIZE extension, and nothing more — no
// room for `extend_heap` to satisfy a much larger request.
const TIGHT_POOL: usize = 16 + bfalloc::CHUNKSIZE;

#[test]
fn out_of_memory_leaves_heap_untouched() {
    let mut pool = [0u8; TIGHT_POOL];
    let mut heap = new_heap(&mut pool);

    let huge = heap.allocate(1_000_000);
    assert!(huge.is_none());
    assert!(check_heap(&heap, true));
}

#[test]
fn resize_grow_on_oom_leaves_block_live_and_unchanged() {
    let mut pool = [0u8; TIGHT_POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.allocate(16).unwrap();
    unsafe {
        p.as_ptr().write_bytes(0xAB, 8);
    }

    let result = heap.resize(Some(p), 1_000_000);
    assert!(result.is_none());

    // `p` must still be live, allocated, and untouched.
    unsafe {
        assert!(is_allocated(p));
        assert_eq!(*p.as_ptr(), 0xAB);
    }
}

/// Scenario 1 from the spec: allocate two minimum-size blocks out of the initial chunk, free
/// them in order, and watch them coalesce with the chunk's tail back into a single free block
/// exactly `CHUNKSIZE` bytes (the chunk was never split by anything else).
#[test]
fn scenario_free_then_free_coalesces_with_tail() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let a = heap.allocate(1).unwrap();
    let b = heap.allocate(1).unwrap();

    unsafe {
        assert_eq!(block_size(a), 16);
        assert_eq!(block_size(b), 16);
        assert_eq!(next_block(a), b, "a and b must be carved from the same chunk back to back");
    }

    heap.free(Some(a));
    assert!(check_heap(&heap, true));
    unsafe {
        assert!(!is_allocated(a));
        assert!(is_allocated(b), "freeing a alone must not touch its allocated neighbor b");
    }

    heap.free(Some(b));
    assert!(check_heap(&heap, true));
    unsafe {
        assert!(!is_allocated(a));
        // a absorbed b and the chunk's leftover tail: one block, the whole original chunk.
        assert_eq!(block_size(a), bfalloc::CHUNKSIZE);
    }
}

/// Scenario 2 from the spec: shrinking a block in place returns the same pointer and leaves a
/// free remainder big enough to split off.
#[test]
fn scenario_resize_shrink_returns_same_pointer() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.allocate(100).unwrap();
    let old_size = unsafe { block_size(p) };

    let q = heap.resize(Some(p), 50).unwrap();
    assert_eq!(p, q);

    unsafe {
        let new_size = block_size(p);
        assert_eq!(new_size, adjust_size(50));
        assert!(is_allocated(p));

        // Whatever wasn't kept became a free block immediately after p.
        let tail = next_block(p);
        assert!(!is_allocated(tail));
        assert!(block_size(tail) >= old_size - new_size);
    }
    assert!(check_heap(&heap, true));
}

/// Scenario 3 from the spec: growing a block moves it, preserves its payload, and leaves the
/// old block free.
#[test]
fn scenario_resize_grow_moves_and_preserves_data() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.allocate(100).unwrap();
    unsafe {
        for i in 0..100u8 {
            *p.as_ptr().add(i as usize) = i;
        }
    }

    let q = heap.resize(Some(p), 200).unwrap();
    assert_ne!(p, q);

    unsafe {
        assert!(is_allocated(q));
        assert!(block_size(q) >= adjust_size(200));
        assert!(!is_allocated(p), "the old block must have been freed");

        for i in 0..100u8 {
            assert_eq!(*q.as_ptr().add(i as usize), i, "byte {i} not preserved across grow");
        }
    }
    assert!(check_heap(&heap, true));
}

/// Scenario 4 from the spec: a request bigger than CHUNKSIZE forces extend_heap to ask for more
/// than the default chunk, and the resulting block is big enough to place the allocation.
#[test]
fn scenario_large_allocation_extends_beyond_chunksize() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.allocate(2000).unwrap();
    unsafe {
        assert!(block_size(p) >= adjust_size(2000));
        assert!(block_size(p) >= bfalloc::CHUNKSIZE);
    }
    assert!(check_heap(&heap, true));
}

/// Scenario 5 from the spec: three adjacent allocations, freed out of order, end up coalesced
/// into a single free run once the middle gap closes.
#[test]
fn scenario_three_blocks_coalesce_regardless_of_free_order() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let a = heap.allocate(32).unwrap();
    let b = heap.allocate(32).unwrap();
    let c = heap.allocate(32).unwrap();

    unsafe {
        assert_eq!(next_block(a), b);
        assert_eq!(next_block(b), c);
    }

    heap.free(Some(a));
    heap.free(Some(c));
    assert!(check_heap(&heap, true));
    unsafe {
        assert!(!is_allocated(a));
        assert!(is_allocated(b));
        assert!(!is_allocated(c));
    }

    heap.free(Some(b));
    assert!(check_heap(&heap, true));

    unsafe {
        // b must have pulled a and c together (P3: no two adjacent free blocks survive).
        assert!(!is_allocated(a));
        let merged_size = block_size(a);
        assert!(merged_size >= 3 * adjust_size(32));
        let after = next_block(a);
        assert!(is_allocated(after) || block_size(after) == 0);
    }
}

/// Scenario 6 from the spec: zero_allocate's payload is at least nmemb * size bytes, all zero.
#[test]
fn scenario_zero_allocate_ten_eights() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p = heap.zero_allocate(10, 8).unwrap();
    unsafe {
        assert!(block_size(p) - block::DSIZE >= 80);
        let bytes = core::slice::from_raw_parts(p.as_ptr(), 80);
        assert!(bytes.iter().all(|&b| b == 0));
    }
}

#[test]
fn repeated_alloc_free_of_same_size_reuses_the_block() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let p1 = heap.allocate(40).unwrap();
    heap.free(Some(p1));
    let p2 = heap.allocate(40).unwrap();

    assert_eq!(p1, p2, "first-fit over a LIFO free list must hand the block straight back");
    assert!(check_heap(&heap, true));
}

#[test]
fn many_interleaved_allocations_keep_the_heap_consistent() {
    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);

    let mut live = alloc_free_stress(&mut heap);
    assert!(check_heap(&heap, true));

    while let Some(p) = live.pop() {
        heap.free(Some(p));
        assert!(check_heap(&heap, true));
    }
}

fn alloc_free_stress(heap: &mut Heap<StaticRegion<'_>>) -> Vec<NonNull<u8>> {
    let mut live = Vec::new();
    let sizes = [8usize, 16, 1, 200, 64, 4096, 33, 7, 512];
    for (i, &size) in sizes.iter().cycle().take(64).enumerate() {
        let p = heap.allocate(size).unwrap();
        if i % 3 == 0 {
            if let Some(old) = live.pop() {
                heap.free(Some(old));
            }
        }
        live.push(p);
    }
    live
}

/// Exercises the `logging` feature end to end: installs `env_logger` as the active `log`
/// subscriber, corrupts a live block's footer behind `check_heap`'s back, and confirms the
/// resulting `log::warn!` call (routed through `check_heap`'s `report!` macro) runs without
/// panicking and that the corruption is actually caught.
#[cfg(feature = "logging")]
#[test]
fn check_heap_reports_corruption_through_env_logger() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut pool = [0u8; POOL];
    let mut heap = new_heap(&mut pool);
    let p = heap.allocate(32).unwrap();

    unsafe {
        let footer_addr = block::footer_of(p.as_ptr());
        (footer_addr as *mut u32).write(0xFFFF_FFFF);
    }

    assert!(!check_heap(&heap, true), "a corrupted footer must fail the consistency check");
}
