// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles shared by unit tests.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::backend::{BlendConfig, BufferConfig, DisplayController};
use crate::geometry::{Point, Size};
use crate::signal::{Semaphore, Suspension};
use crate::time::{Timebase, WaitTicks};
use crate::vsync::Vsync;

/// Records waits and signals; optionally simulates one vblank per wait.
#[derive(Debug, Default)]
pub(crate) struct CountingSemaphore {
    waits: RefCell<Vec<WaitTicks>>,
    signals: Cell<u32>,
    ticking: Option<Arc<Vsync>>,
}

impl CountingSemaphore {
    pub(crate) fn ticking(vsync: &Arc<Vsync>) -> Self {
        Self {
            ticking: Some(Arc::clone(vsync)),
            ..Self::default()
        }
    }

    pub(crate) fn waits(&self) -> Vec<WaitTicks> {
        self.waits.borrow().clone()
    }

    pub(crate) fn signals(&self) -> u32 {
        self.signals.get()
    }
}

impl Semaphore for CountingSemaphore {
    fn wait(&self, ticks: WaitTicks) -> bool {
        self.waits.borrow_mut().push(ticks);
        if let Some(vsync) = &self.ticking {
            vsync.tick();
        }
        true
    }

    fn signal(&self) {
        self.signals.set(self.signals.get() + 1);
    }
}

/// A suspension pair whose vsync semaphore advances `vsync` on every wait.
pub(crate) fn ticking_suspension(vsync: &Arc<Vsync>) -> Suspension<CountingSemaphore> {
    Suspension::new(
        CountingSemaphore::default(),
        CountingSemaphore::ticking(vsync),
        Timebase::MILLIS,
    )
}

/// One register write.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum RegisterWrite {
    Enable(u8, bool),
    Blend(u8, BlendConfig),
    Size(u8, Size),
    Offset(u8, Point),
    BufferConfig(u8, BufferConfig),
    Address(u8, usize),
    ShadowLoad(u8),
}

/// Latest register values for one plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct PlaneRegisters {
    pub(crate) enabled: bool,
    pub(crate) blend: Option<BlendConfig>,
    pub(crate) size: Size,
    pub(crate) offset: Point,
    pub(crate) config: Option<BufferConfig>,
    pub(crate) address: usize,
}

/// A display controller that logs every write.
#[derive(Debug, Default)]
pub(crate) struct RecordingController {
    pub(crate) writes: Vec<RegisterWrite>,
    pub(crate) planes: BTreeMap<u8, PlaneRegisters>,
}

impl RecordingController {
    pub(crate) fn plane(&self, plane: u8) -> PlaneRegisters {
        self.planes.get(&plane).copied().unwrap_or_default()
    }

    pub(crate) fn shadow_loads(&self) -> Vec<u8> {
        self.writes
            .iter()
            .filter_map(|w| match w {
                RegisterWrite::ShadowLoad(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn regs(&mut self, plane: u8) -> &mut PlaneRegisters {
        self.planes.entry(plane).or_default()
    }
}

impl DisplayController for RecordingController {
    fn enable_plane(&mut self, plane: u8, enabled: bool) {
        self.writes.push(RegisterWrite::Enable(plane, enabled));
        self.regs(plane).enabled = enabled;
    }

    fn set_blend(&mut self, plane: u8, blend: BlendConfig) {
        self.writes.push(RegisterWrite::Blend(plane, blend));
        self.regs(plane).blend = Some(blend);
    }

    fn set_size(&mut self, plane: u8, size: Size) {
        self.writes.push(RegisterWrite::Size(plane, size));
        self.regs(plane).size = size;
    }

    fn set_offset(&mut self, plane: u8, offset: Point) {
        self.writes.push(RegisterWrite::Offset(plane, offset));
        self.regs(plane).offset = offset;
    }

    fn set_buffer_config(&mut self, plane: u8, config: BufferConfig) {
        self.writes.push(RegisterWrite::BufferConfig(plane, config));
        self.regs(plane).config = Some(config);
    }

    fn set_buffer_address(&mut self, plane: u8, address: usize) {
        self.writes.push(RegisterWrite::Address(plane, address));
        self.regs(plane).address = address;
    }

    fn trigger_shadow_load(&mut self, plane: u8) {
        self.writes.push(RegisterWrite::ShadowLoad(plane));
    }
}
