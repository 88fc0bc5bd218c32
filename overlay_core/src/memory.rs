// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Memory allocation seam and the two region allocators the compositor uses.
//!
//! Pixel memory on this class of board lives in several regions with
//! different cache behaviour, so allocation is parameterised by
//! [`AllocationType`]. Allocators hand out [`Allocation`]s, which carry both
//! the aligned address callers use and the original block address the
//! allocator needs back on [`free`](MemoryAllocator::free).
//!
//! - [`BlockAllocator`] carves a region into fixed-size blocks and serves
//!   requests from first-fit runs of contiguous free blocks. It backs the
//!   non-cacheable frame-buffer pool and the rotation-cache pool, where a hard
//!   byte ceiling matters more than packing density.
//! - [`ReversePreloadAllocator`] grows downward from the top of its region and
//!   only reclaims the most recent allocation, for data loaded once at boot.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

/// Which memory region an allocation should come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllocationType {
    /// General-purpose heap.
    Default,
    /// Region excluded from the data cache, for buffers shared with DMA and
    /// the GPU.
    NonCacheable,
    /// Board-specific pool; here, the rotation cache.
    Custom,
    /// Region filled once at startup, growing downward.
    DefaultPreload,
}

/// A block of memory handed out by a [`MemoryAllocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Allocation {
    /// Aligned address for the caller to use.
    pub address: usize,
    /// Start of the underlying block, as the allocator tracks it.
    pub original: usize,
    /// Requested size in bytes.
    pub size: usize,
}

impl Allocation {
    /// Returns the byte range covered by the aligned allocation.
    #[must_use]
    pub const fn range(&self) -> core::ops::Range<usize> {
        self.address..self.address + self.size
    }
}

/// An aligned allocator over some memory region.
pub trait MemoryAllocator {
    /// Allocates `size` bytes aligned to `alignment` (a power of two).
    ///
    /// Returns `None` when the region cannot satisfy the request.
    fn aligned_alloc(&mut self, alignment: usize, size: usize) -> Option<Allocation>;

    /// Returns an allocation to the region.
    fn free(&mut self, allocation: Allocation);
}

impl<A: MemoryAllocator + ?Sized> MemoryAllocator for &mut A {
    fn aligned_alloc(&mut self, alignment: usize, size: usize) -> Option<Allocation> {
        (**self).aligned_alloc(alignment, size)
    }

    fn free(&mut self, allocation: Allocation) {
        (**self).free(allocation);
    }
}

impl<A: MemoryAllocator + ?Sized> MemoryAllocator for alloc::boxed::Box<A> {
    fn aligned_alloc(&mut self, alignment: usize, size: usize) -> Option<Allocation> {
        (**self).aligned_alloc(alignment, size)
    }

    fn free(&mut self, allocation: Allocation) {
        (**self).free(allocation);
    }
}

#[inline]
const fn align_up(value: usize, alignment: usize) -> Option<usize> {
    match value.checked_add(alignment - 1) {
        Some(v) => Some(v & !(alignment - 1)),
        None => None,
    }
}

// ---------------------------------------------------------------------------
// BlockAllocator
// ---------------------------------------------------------------------------

/// First-fit allocator over fixed-size blocks of an address range.
#[derive(Debug)]
pub struct BlockAllocator {
    base: usize,
    block_size: usize,
    used: Vec<bool>,
    /// Run length keyed by first block index.
    runs: BTreeMap<usize, usize>,
}

impl BlockAllocator {
    /// Creates an allocator over `len` bytes starting at `base`.
    ///
    /// Trailing bytes that do not fill a whole block are not used.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero.
    #[must_use]
    pub fn new(base: usize, len: usize, block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        Self {
            base,
            block_size,
            used: vec![false; len / block_size],
            runs: BTreeMap::new(),
        }
    }

    /// Returns the usable capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.used.len() * self.block_size
    }

    /// Returns the number of bytes held by live allocations, rounded up to
    /// whole blocks.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.runs.values().sum::<usize>() * self.block_size
    }

    /// Returns the block size in bytes.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn blocks_for(&self, start_block: usize, alignment: usize, size: usize) -> Option<usize> {
        let start = self.base + start_block * self.block_size;
        let aligned = align_up(start, alignment)?;
        let needed = aligned - start + size;
        Some(needed.div_ceil(self.block_size))
    }
}

impl MemoryAllocator for BlockAllocator {
    fn aligned_alloc(&mut self, alignment: usize, size: usize) -> Option<Allocation> {
        if size == 0 || !alignment.is_power_of_two() {
            return None;
        }
        let total = self.used.len();
        let mut first = 0;
        while first < total {
            if self.used[first] {
                first += 1;
                continue;
            }
            let count = self.blocks_for(first, alignment, size)?;
            if first + count > total {
                return None;
            }
            match self.used[first..first + count].iter().position(|&u| u) {
                Some(busy) => first += busy + 1,
                None => {
                    self.used[first..first + count].fill(true);
                    self.runs.insert(first, count);
                    let original = self.base + first * self.block_size;
                    let address = align_up(original, alignment)?;
                    return Some(Allocation {
                        address,
                        original,
                        size,
                    });
                }
            }
        }
        None
    }

    fn free(&mut self, allocation: Allocation) {
        let offset = allocation.original.wrapping_sub(self.base);
        let first = offset / self.block_size;
        match self.runs.remove(&first) {
            Some(count) if offset.is_multiple_of(self.block_size) => {
                self.used[first..first + count].fill(false);
            }
            Some(count) => {
                // Misaligned original: put the run back untouched.
                self.runs.insert(first, count);
                log::warn!("free of unknown block at {:#x}", allocation.original);
            }
            None => log::warn!("free of unknown block at {:#x}", allocation.original),
        }
    }
}

// ---------------------------------------------------------------------------
// ReversePreloadAllocator
// ---------------------------------------------------------------------------

/// Bump allocator growing downward from the top of its region.
///
/// Only the most recent allocation can be freed; freeing anything else is
/// ignored until [`reset`](Self::reset).
#[derive(Debug)]
pub struct ReversePreloadAllocator {
    base: usize,
    top: usize,
    cursor: usize,
}

impl ReversePreloadAllocator {
    /// Creates an allocator over `len` bytes starting at `base`.
    #[must_use]
    pub fn new(base: usize, len: usize) -> Self {
        let top = base.saturating_add(len);
        Self {
            base,
            top,
            cursor: top,
        }
    }

    /// Returns the number of bytes still available below the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cursor - self.base
    }

    /// Releases every allocation.
    pub fn reset(&mut self) {
        self.cursor = self.top;
    }
}

impl MemoryAllocator for ReversePreloadAllocator {
    fn aligned_alloc(&mut self, alignment: usize, size: usize) -> Option<Allocation> {
        if size == 0 || !alignment.is_power_of_two() {
            return None;
        }
        let address = self.cursor.checked_sub(size)? & !(alignment - 1);
        if address < self.base {
            return None;
        }
        let original = self.cursor;
        self.cursor = address;
        Some(Allocation {
            address,
            original,
            size,
        })
    }

    fn free(&mut self, allocation: Allocation) {
        if allocation.address == self.cursor {
            self.cursor = allocation.original;
        }
    }
}
