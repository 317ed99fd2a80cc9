//! A boundary-tag, explicit-free-list heap allocator with first-fit placement.
//!
//! `bfalloc` services variable-size allocation requests out of a contiguous, monotonically
//! growing region of memory supplied by a host [`provider::MemoryProvider`]. It keeps its
//! metadata entirely in-band: every block carries a header and a footer word (the boundary tag),
//! and every free block's payload doubles as two links (`prev`/`next`, as heap-relative offsets)
//! in a single doubly-linked free list.
//!
//! # What this crate does not do
//!
//! The core [`Heap`] is not thread-safe and does not defend against malicious or corrupted
//! metadata; it implements exactly one placement policy (single free list, first fit); and it
//! never returns memory to its provider. These are deliberate scope limits, not omissions — see
//! the module docs on [`heap`] for why. Enable the `global` feature for a `spin::Mutex`-locked
//! `GlobalAlloc` wrapper if you need to plug this in as `#[global_allocator]`.
//!
//! # Example
//!
//! ```
//! use bfalloc::{Heap, StaticRegion};
//!
//! let mut backing = [0u8; 4096];
//! let mut heap = Heap::init(StaticRegion::new(&mut backing)).unwrap();
//!
//! let a = heap.allocate(64).unwrap();
//! let b = heap.allocate(64).unwrap();
//! heap.free(Some(a));
//! heap.free(Some(b));
//!
//! assert!(bfalloc::check_heap(&heap, true));
//! ```

#![no_std]
#![allow(dead_code)]

pub mod block;
pub mod check;
pub mod coalesce;
pub mod error;
pub mod freelist;
#[cfg(feature = "global")]
pub mod global;
pub mod heap;
pub mod provider;

pub use check::check_heap;
pub use error::{BaseError, CanFail, HeapError};
#[cfg(feature = "global")]
pub use global::LockedHeap;
pub use heap::{Heap, CHUNKSIZE};
pub use provider::{MemoryProvider, StaticRegion};
