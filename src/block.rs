//! Block layout primitives: the header/footer word and the address arithmetic used to move
//! between a block's payload pointer and its header, footer, and physical neighbors.
//!
//! Every block is a contiguous, doubleword-aligned region: a 4-byte header, a payload, and a
//! 4-byte footer holding the same word as the header (the boundary tag). The low bit of that word
//! is the allocated flag; the remaining bits (always a multiple of 8) are the block's total size
//! including header and footer.

use bytemuck::{Pod, Zeroable};
use core::mem::size_of;

/// Word size in bytes — the unit all block metadata is expressed in.
pub const WSIZE: usize = 4;
/// Doubleword size in bytes — the unit all block sizes are expressed in.
pub const DSIZE: usize = 8;
/// Smallest legal block: header + footer + two free-list link words.
pub const MIN_BLOCK_SIZE: usize = 16;

const SIZE_MASK: u32 = !0x7;
const ALLOC_BIT: u32 = 0x1;

/// A packed header/footer word: bits `[31:3]` are the block size in bytes, bit `0` is the
/// allocated flag, bits `[2:1]` are reserved and always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(transparent)]
pub struct Tag(u32);

impl Tag {
    /// Packs a `size` (must already be a multiple of 8) and an allocated flag into a `Tag`.
    pub const fn pack(size: usize, allocated: bool) -> Self {
        Self(size as u32 | (allocated as u32))
    }

    /// The block's total size in bytes, header and footer included.
    pub const fn size(self) -> usize {
        (self.0 & SIZE_MASK) as usize
    }

    /// Whether the block this tag describes is currently allocated.
    pub const fn is_allocated(self) -> bool {
        self.0 & ALLOC_BIT != 0
    }
}

/// Reads the [`Tag`] at `addr`.
///
/// # Safety
/// `addr` must be valid for reads of 4 bytes and properly aligned for `u32`.
#[inline]
pub unsafe fn read_tag(addr: *const u8) -> Tag {
    Tag((addr as *const u32).read())
}

/// Writes `tag` at `addr`.
///
/// # Safety
/// `addr` must be valid for writes of 4 bytes and properly aligned for `u32`.
#[inline]
pub unsafe fn write_tag(addr: *mut u8, tag: Tag) {
    (addr as *mut u32).write(tag.0);
}

/// Header address of the block whose payload starts at `bp`.
#[inline]
pub fn header(bp: *mut u8) -> *mut u8 {
    unsafe { bp.sub(WSIZE) }
}

/// Footer address of the block whose payload starts at `bp`, given its header's size.
///
/// # Safety
/// `bp`'s header must already hold a valid size.
#[inline]
pub unsafe fn footer(bp: *mut u8, size: usize) -> *mut u8 {
    bp.add(size).sub(DSIZE)
}

/// Footer address of the block whose payload starts at `bp`, reading the size from its header.
///
/// # Safety
/// `bp`'s header must be readable and hold a valid size.
#[inline]
pub unsafe fn footer_of(bp: *mut u8) -> *mut u8 {
    footer(bp, read_tag(header(bp)).size())
}

/// Payload pointer of the block physically following the one at `bp`, given its size.
#[inline]
pub fn next_blkp(bp: *mut u8, size: usize) -> *mut u8 {
    unsafe { bp.add(size) }
}

/// Payload pointer of the block physically following the one at `bp`.
///
/// # Safety
/// `bp`'s header must be readable and hold a valid size.
#[inline]
pub unsafe fn next_blkp_of(bp: *mut u8) -> *mut u8 {
    next_blkp(bp, read_tag(header(bp)).size())
}

/// Payload pointer of the block physically preceding the one at `bp`, read via its footer (which
/// sits in the two words immediately before `bp`'s header).
///
/// # Safety
/// The doubleword immediately preceding `bp` must be a valid footer of a preceding block.
#[inline]
pub unsafe fn prev_blkp_of(bp: *mut u8) -> *mut u8 {
    let prev_footer = bp.sub(DSIZE);
    let prev_size = read_tag(prev_footer).size();
    bp.sub(prev_size)
}

/// Rounds a caller-visible allocation request up to a legal block size, per the allocator's
/// size-adjustment rule: zero maps to `None` (rejected upstream), small requests round up to the
/// minimum block, everything else rounds up to a multiple of 8 with header/footer overhead added.
#[inline]
pub fn adjust_size(n: usize) -> usize {
    if n <= DSIZE {
        MIN_BLOCK_SIZE
    } else {
        (n + 2 * WSIZE + (DSIZE - 1)) & !(DSIZE - 1)
    }
}

/// Size in bytes of a [`Tag`], exposed for callers laying out raw heap bytes by hand (prologue
/// and epilogue construction).
pub const TAG_SIZE: usize = size_of::<Tag>();

/// Rounds `addr` up to the next multiple of `align` (`align` must be a power of two).
///
/// A [`crate::provider::MemoryProvider`] makes no alignment promises about the base address it
/// hands back — a `StaticRegion` over a plain `&mut [u8]` has natural alignment 1 — so
/// [`crate::heap::Heap::init`] uses this to land the very first sentinel on a doubleword
/// boundary itself, rather than trusting the provider.
#[inline]
pub fn align_up(addr: *mut u8, align: usize) -> *mut u8 {
    let addr = addr as usize;
    ((addr + align - 1) & !(align - 1)) as *mut u8
}
