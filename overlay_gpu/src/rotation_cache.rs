// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded cache of GPU-resident copies of rotated textures.
//!
//! Sampling a rotated texture from linear memory is slow on the GPU, so the
//! engine keeps a tiled copy of each texture marked as rotated. Copies live
//! in a dedicated memory pool with a hard byte ceiling. When an allocation
//! fails, the least recently accessed copy is evicted and the allocation is
//! retried.
//!
//! Entries are keyed by source address plus the texture's recycling
//! generation, so memory reused for a different texture never hits a stale
//! copy.
//!
//! ```text
//!   add(key) ──► fits capacity? ──no──► warn, None
//!                    │yes
//!                    ▼
//!          ┌──► aligned_alloc ──ok──► blit into tiled copy ──► Some(copy)
//!          │         │fail
//!          │         ▼
//!          └── evict oldest (GPU finish, free) ── cache empty ──► fatal
//! ```

use alloc::collections::BTreeMap;

use overlay_core::error::{ErrorCode, fatal};
use overlay_core::memory::{Allocation, MemoryAllocator};
use overlay_core::surface::Texture;
use overlay_core::trace::{CacheAction, CacheEvent, TraceBuffer, TraceEvent, Tracer};

use crate::buffer::{GpuBuffer, ImageMode, Transparency};
use crate::device::{Filter, GpuBlend, GpuDevice};
use crate::transform::Matrix;

/// Identifies a cached texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    /// Source texture address.
    pub address: usize,
    /// Recycling generation of that address.
    pub generation: u32,
}

impl CacheKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(address: usize, generation: u32) -> Self {
        Self {
            address,
            generation,
        }
    }
}

impl From<&Texture> for CacheKey {
    fn from(texture: &Texture) -> Self {
        Self::new(texture.surface.address, texture.generation)
    }
}

#[derive(Debug)]
struct Entry {
    last_access: u64,
    buffer: GpuBuffer,
    allocation: Allocation,
}

/// Least-recently-used cache of tiled texture copies.
#[derive(Debug)]
pub struct RotationCache<A> {
    allocator: A,
    capacity: usize,
    alignment: usize,
    entries: BTreeMap<CacheKey, Entry>,
    resident: usize,
    /// Logical access clock. Every lookup or insertion takes the next tick.
    clock: u64,
    trace: TraceBuffer,
}

impl<A: MemoryAllocator> RotationCache<A> {
    /// Creates an empty cache over `allocator`, holding at most `capacity`
    /// bytes of copies aligned to `alignment`.
    #[must_use]
    pub fn new(allocator: A, capacity: usize, alignment: usize) -> Self {
        Self {
            allocator,
            capacity,
            alignment,
            entries: BTreeMap::new(),
            resident: 0,
            clock: 0,
            trace: TraceBuffer::new(),
        }
    }

    /// Returns the byte ceiling.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the bytes held by live copies.
    #[must_use]
    pub fn resident_bytes(&self) -> usize {
        self.resident
    }

    /// Returns the number of cached copies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the pool allocator.
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Returns whether a copy exists for `key`, without touching it.
    #[must_use]
    pub fn available(&self, key: CacheKey) -> bool {
        self.entries.contains_key(&key)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn record(&mut self, action: CacheAction, key: CacheKey, bytes: usize) {
        self.trace.record(TraceEvent::Cache(CacheEvent {
            action,
            key: key.address,
            bytes,
            resident_bytes: self.resident,
        }));
    }

    /// Returns the copy for `key` and marks it most recently used.
    pub fn get(&mut self, key: CacheKey) -> Option<GpuBuffer> {
        let now = self.tick();
        let entry = self.entries.get_mut(&key)?;
        entry.last_access = now;
        let (buffer, bytes) = (entry.buffer, entry.allocation.size);
        self.record(CacheAction::Hit, key, bytes);
        Some(buffer)
    }

    /// Copies `source` into the cache under `key` and returns the copy.
    ///
    /// Returns `None`, leaving the cache unchanged, when `source` alone is
    /// larger than the whole cache. Otherwise evicts least recently used
    /// copies until the allocation succeeds. Before an evicted copy's memory
    /// is freed, the GPU is drained so no queued blit still reads it.
    ///
    /// An existing copy under `key` is replaced.
    ///
    /// # Panics
    ///
    /// Halts with [`ErrorCode::CacheExhausted`] if the cache is empty and
    /// the pool still cannot satisfy the allocation.
    pub fn add<D: GpuDevice>(
        &mut self,
        key: CacheKey,
        source: &GpuBuffer,
        device: &mut D,
    ) -> Option<GpuBuffer> {
        let bytes = source.byte_len();
        if bytes > self.capacity {
            log::warn!(
                "texture ({} KB) cannot fit in the preprocess cache ({} KB)",
                bytes / 1024,
                self.capacity / 1024
            );
            self.record(CacheAction::Rejected, key, bytes);
            return None;
        }
        self.remove_key(key);

        let allocation = loop {
            if self.resident + bytes <= self.capacity
                && let Some(allocation) = self.allocator.aligned_alloc(self.alignment, bytes)
            {
                break allocation;
            }
            if !self.evict_oldest(device) {
                fatal(
                    ErrorCode::CacheExhausted,
                    i64::try_from(bytes).unwrap_or(i64::MAX),
                );
            }
        };

        let copy = GpuBuffer {
            address: allocation.address,
            tiled: true,
            image_mode: ImageMode::Multiply,
            transparency: Transparency::Transparent,
            ..*source
        };
        let plain = GpuBuffer {
            image_mode: ImageMode::Normal,
            ..*source
        };
        if let Err(err) = device.blit(
            &copy,
            &plain,
            &Matrix::IDENTITY,
            GpuBlend::None,
            0,
            Filter::Point,
        ) {
            log::error!("rotation cache copy failed: {err}");
        }

        let last_access = self.tick();
        self.entries.insert(
            key,
            Entry {
                last_access,
                buffer: copy,
                allocation,
            },
        );
        self.resident += bytes;
        self.record(CacheAction::Added, key, bytes);
        Some(copy)
    }

    /// Evicts the least recently accessed copy. Returns `false` if the cache
    /// was empty.
    fn evict_oldest<D: GpuDevice>(&mut self, device: &mut D) -> bool {
        let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(k, _)| *k)
        else {
            return false;
        };
        if let Err(err) = device.finish() {
            log::error!("gpu finish before eviction failed: {err}");
        }
        if let Some(entry) = self.entries.remove(&key) {
            let bytes = entry.allocation.size;
            self.release(entry);
            self.record(CacheAction::Evicted, key, bytes);
        }
        true
    }

    fn release(&mut self, entry: Entry) {
        self.allocator.free(entry.allocation);
        self.resident -= entry.allocation.size;
    }

    /// Drops the copy stored under exactly `key`. No-op if absent.
    pub fn remove_key(&mut self, key: CacheKey) {
        if let Some(entry) = self.entries.remove(&key) {
            let bytes = entry.allocation.size;
            self.release(entry);
            self.record(CacheAction::Removed, key, bytes);
        }
    }

    /// Drops every copy of the texture at `address`, whatever its
    /// generation. No-op if absent.
    pub fn remove(&mut self, address: usize) {
        let start = CacheKey::new(address, 0);
        let end = CacheKey::new(address, u32::MAX);
        let keys: alloc::vec::Vec<CacheKey> =
            self.entries.range(start..=end).map(|(k, _)| *k).collect();
        for key in keys {
            self.remove_key(key);
        }
    }

    /// Drops every copy.
    pub fn clear(&mut self) {
        let entries = core::mem::take(&mut self.entries);
        for (key, entry) in entries {
            let bytes = entry.allocation.size;
            self.release(entry);
            self.record(CacheAction::Removed, key, bytes);
        }
    }

    /// Forwards recorded cache events into `tracer`.
    pub fn drain_trace(&mut self, tracer: &mut Tracer<'_>) {
        self.trace.drain_into(tracer);
    }
}
