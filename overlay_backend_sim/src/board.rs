// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The simulated board.
//!
//! Addresses handed out by the simulated allocators follow a real memory
//! map but are never dereferenced; pixel memory only exists as numbers the
//! controller and GPU doubles record.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use overlay_core::memory::{BlockAllocator, ReversePreloadAllocator};
use overlay_core::output::Screen;
use overlay_core::time::Timestamp;
use overlay_core::vsync::Vsync;
use overlay_platform::board::{Board, BoardParts};

use crate::display::SimDisplay;
use crate::gpu::{SimGpu, SimRenderer};
use crate::semaphore::CondvarSemaphore;

/// Where each memory region lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryMap {
    /// Non-cacheable frame buffer region.
    pub frames: Range<usize>,
    /// Rotation cache pool.
    pub cache: Range<usize>,
    /// General-purpose heap.
    pub heap: Range<usize>,
    /// Preload region.
    pub preload: Range<usize>,
    /// Block size of the block allocators.
    pub block_size: usize,
}

impl MemoryMap {
    /// The 64 MiB SDRAM layout of the i.MX RT1170 evaluation kit.
    #[must_use]
    pub const fn rt1170() -> Self {
        Self {
            heap: 0x8000_0000..0x8200_0000,
            preload: 0x8200_0000..0x8280_0000,
            cache: 0x8280_0000..0x8300_0000,
            frames: 0x8300_0000..0x8400_0000,
            block_size: 64,
        }
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::rt1170()
    }
}

/// A board whose clock is the host's monotonic clock.
#[derive(Debug)]
pub struct SimBoard {
    boot: Instant,
    dcache_maintenance: Vec<(usize, usize)>,
}

impl SimBoard {
    /// Builds the parts of a simulated board with one `screen`.
    ///
    /// Semaphore waits use `tick` as the scheduler tick.
    #[must_use]
    pub fn parts(map: &MemoryMap, screen: Screen, tick: Duration) -> BoardParts<Self> {
        let block = |r: &Range<usize>| BlockAllocator::new(r.start, r.len(), map.block_size);
        BoardParts {
            board: Self {
                boot: Instant::now(),
                dcache_maintenance: Vec::new(),
            },
            controller: SimDisplay::new(),
            main_loop: CondvarSemaphore::new(tick),
            vsync_semaphore: CondvarSemaphore::new(tick),
            vsync: Arc::new(Vsync::new()),
            gpu: SimGpu::new(),
            renderer: SimRenderer::default(),
            frame_allocator: block(&map.frames),
            cache_allocator: block(&map.cache),
            heap_allocator: block(&map.heap),
            preload_allocator: ReversePreloadAllocator::new(map.preload.start, map.preload.len()),
            screens: vec![screen],
        }
    }

    /// Returns every `(address, len)` cleaned from the data cache.
    #[must_use]
    pub fn dcache_maintenance(&self) -> &[(usize, usize)] {
        &self.dcache_maintenance
    }
}

impl Board for SimBoard {
    type Controller = SimDisplay;
    type Semaphore = CondvarSemaphore;
    type Gpu = SimGpu;
    type Renderer = SimRenderer;
    type FrameAllocator = BlockAllocator;
    type CacheAllocator = BlockAllocator;
    type HeapAllocator = BlockAllocator;
    type PreloadAllocator = ReversePreloadAllocator;

    fn now(&self) -> Timestamp {
        let millis = self.boot.elapsed().as_millis();
        Timestamp(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    fn clean_invalidate_dcache(&mut self, address: usize, len: usize) {
        self.dcache_maintenance.push((address, len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_do_not_overlap() {
        let map = MemoryMap::rt1170();
        let mut regions = [&map.heap, &map.preload, &map.cache, &map.frames];
        regions.sort_by_key(|r| r.start);
        for pair in regions.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{pair:x?}");
        }
    }

    #[test]
    fn clock_starts_near_zero() {
        let parts = SimBoard::parts(&MemoryMap::rt1170(), Screen::rk055(), Duration::from_millis(1));
        assert!(parts.board.now() < Timestamp(1_000));
    }
}
