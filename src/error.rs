//! Error types for `bfalloc`.

use core::fmt::Debug;

/// `BaseError` is a common trait implemented by every error type defined in this crate.
///
/// It is dependent on the [`Debug`] trait, which makes sense as we are dealing with errors.
pub trait BaseError: Debug {}

/// `CanFail` is a return type for internal helpers that are allowed to fail and don't need to
/// return anything on success.
pub type CanFail<T> = Result<(), T>;

/// `HeapError` covers the three failure kinds a heap can run into.
///
/// Nothing in the public API (`allocate`, `free`, `resize`, `zero_allocate`) returns a
/// `HeapError` directly — those surface failure as `None`/no-op per the crate's in-band
/// null-return convention. `HeapError` exists for [`crate::check::check_heap`]'s diagnostic
/// channel and for callers that want a richer reason than "returned null" when driving a
/// [`crate::provider::MemoryProvider`] by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// The backing [`crate::provider::MemoryProvider`] could not grow the heap.
    OutOfMemory,
    /// The caller asked for something the public API rejects outright (e.g. a zero-size
    /// allocation, or `resize` of a null pointer handled by its own passthrough instead).
    InvalidRequest,
    /// A size computation (e.g. `zero_allocate`'s `nmemb * size`) would overflow `usize`.
    Overflow,
}

impl BaseError for HeapError {}
