// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated overlay-plane registers.
//!
//! Writes land in a pending register set per plane. A shadow load copies the
//! pending set into the latched set, which is what the simulated panel scans
//! out.

use std::collections::BTreeMap;

use overlay_core::backend::{BlendConfig, BufferConfig, DisplayController};
use overlay_core::geometry::{Point, Size};

/// Register values for one plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaneState {
    /// Whether the plane is scanned out.
    pub enabled: bool,
    /// Alpha source.
    pub blend: Option<BlendConfig>,
    /// Plane size in pixels.
    pub size: Size,
    /// Position on the panel.
    pub offset: Point,
    /// Buffer format and stride.
    pub buffer: Option<BufferConfig>,
    /// Buffer address.
    pub address: usize,
}

#[derive(Clone, Copy, Debug, Default)]
struct Plane {
    pending: PlaneState,
    latched: PlaneState,
    shadow_loads: u32,
}

/// A display controller with shadow and latched register sets.
#[derive(Debug, Default)]
pub struct SimDisplay {
    planes: BTreeMap<u8, Plane>,
    writes: u64,
}

impl SimDisplay {
    /// Creates a controller with every plane disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the register values the panel currently scans out.
    #[must_use]
    pub fn latched(&self, plane: u8) -> PlaneState {
        self.planes.get(&plane).map(|p| p.latched).unwrap_or_default()
    }

    /// Returns the register values waiting for the next shadow load.
    #[must_use]
    pub fn pending(&self, plane: u8) -> PlaneState {
        self.planes.get(&plane).map(|p| p.pending).unwrap_or_default()
    }

    /// Returns how many shadow loads `plane` has seen.
    #[must_use]
    pub fn shadow_loads(&self, plane: u8) -> u32 {
        self.planes.get(&plane).map_or(0, |p| p.shadow_loads)
    }

    /// Returns the planes currently scanned out, in index order.
    pub fn enabled_planes(&self) -> impl Iterator<Item = u8> + '_ {
        self.planes
            .iter()
            .filter(|(_, p)| p.latched.enabled)
            .map(|(&i, _)| i)
    }

    /// Returns the number of register writes so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    fn pending_mut(&mut self, plane: u8) -> &mut PlaneState {
        self.writes += 1;
        &mut self.planes.entry(plane).or_default().pending
    }
}

impl DisplayController for SimDisplay {
    fn enable_plane(&mut self, plane: u8, enabled: bool) {
        self.pending_mut(plane).enabled = enabled;
    }

    fn set_blend(&mut self, plane: u8, blend: BlendConfig) {
        self.pending_mut(plane).blend = Some(blend);
    }

    fn set_size(&mut self, plane: u8, size: Size) {
        self.pending_mut(plane).size = size;
    }

    fn set_offset(&mut self, plane: u8, offset: Point) {
        self.pending_mut(plane).offset = offset;
    }

    fn set_buffer_config(&mut self, plane: u8, config: BufferConfig) {
        self.pending_mut(plane).buffer = Some(config);
    }

    fn set_buffer_address(&mut self, plane: u8, address: usize) {
        self.pending_mut(plane).address = address;
    }

    fn trigger_shadow_load(&mut self, plane: u8) {
        let p = self.planes.entry(plane).or_default();
        p.latched = p.pending;
        p.shadow_loads += 1;
        log::trace!("plane {plane} latched {:?}", p.latched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_invisible_until_shadow_load() {
        let mut d = SimDisplay::new();
        d.enable_plane(2, true);
        d.set_buffer_address(2, 0x8300_0000);
        assert_eq!(d.latched(2), PlaneState::default());
        assert_eq!(d.pending(2).address, 0x8300_0000);

        d.trigger_shadow_load(2);
        assert!(d.latched(2).enabled);
        assert_eq!(d.latched(2).address, 0x8300_0000);
        assert_eq!(d.shadow_loads(2), 1);
        assert_eq!(d.enabled_planes().collect::<Vec<_>>(), [2]);
        assert_eq!(d.write_count(), 2);
    }
}
