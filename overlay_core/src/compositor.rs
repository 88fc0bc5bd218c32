// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The display compositor context object.
//!
//! [`DisplayCompositor`] owns everything the layer engine shares: the
//! [`LayerRegistry`], the vsync counter, the suspend/resume semaphores, and
//! the allocator that backs item-layer buffers. Nothing here is global; a
//! board creates one compositor and hands its [`VsyncIrq`] to the vblank
//! interrupt.
//!
//! # Frame cycle
//!
//! For each item layer, once per presented frame:
//!
//! 1. [`begin_frame`](DisplayCompositor::begin_frame) returns the back
//!    buffer. If the layer was committed on the current frame, its previous
//!    swap may not have been latched yet, so it first waits for the pending
//!    vblank.
//! 2. The caller draws into the returned surface.
//! 3. [`end_frame`](DisplayCompositor::end_frame) waits for the target frame,
//!    points the plane at the drawn buffer, and flips the buffer pair.
//! 4. [`commit`](DisplayCompositor::commit) triggers the shadow loads of all
//!    dirty planes at once and arms the waiting flag.

use alloc::sync::Arc;

use crate::backend::DisplayController;
use crate::config::CompositorConfig;
use crate::error::{AllocateError, ErrorCode, fatal};
use crate::format::bytes_per_line;
use crate::layer::{
    FrameState, ImageLayerProperties, ItemLayer, ItemLayerBuffer, ItemLayerProperties, ItemPlane,
    LayerId, LayerKind, LayerRegistry, SpriteId, SpriteProperties,
};
use crate::memory::MemoryAllocator;
use crate::output::Screen;
use crate::signal::{Semaphore, Suspension};
use crate::surface::{FramebufferFormat, SurfaceDescriptor};
use crate::trace::{SwapEvent, TraceEvent, Tracer};
use crate::vsync::{Vsync, VsyncIrq};

/// Allocate, update, and deallocate operations offered to the GUI engine.
pub trait LayerEngine {
    /// Creates a double-buffered item layer, optionally attached to `sprite`.
    fn allocate_item_layer(
        &mut self,
        screen: &Screen,
        properties: ItemLayerProperties,
        sprite: Option<SpriteId>,
    ) -> Result<LayerId, AllocateError>;

    /// Creates an image layer showing a texture, optionally attached to
    /// `sprite`.
    fn allocate_image_layer(
        &mut self,
        screen: &Screen,
        properties: ImageLayerProperties,
        sprite: Option<SpriteId>,
    ) -> Result<LayerId, AllocateError>;

    /// Creates a sprite.
    fn allocate_sprite_layer(
        &mut self,
        properties: SpriteProperties,
    ) -> Result<SpriteId, AllocateError>;

    /// Replaces an item layer's properties.
    fn update_item_layer(&mut self, layer: LayerId, properties: ItemLayerProperties);

    /// Replaces an image layer's properties.
    fn update_image_layer(&mut self, layer: LayerId, properties: ImageLayerProperties);

    /// Replaces a sprite's properties.
    fn update_sprite_layer(&mut self, sprite: SpriteId, properties: SpriteProperties);

    /// Destroys an item or image layer.
    fn deallocate_layer(&mut self, layer: LayerId);

    /// Destroys a sprite, detaching its layers.
    fn deallocate_sprite_layer(&mut self, sprite: SpriteId);
}

/// Owns the layer registry and the state shared with the vblank interrupt.
#[derive(Debug)]
pub struct DisplayCompositor<C, S, A> {
    registry: LayerRegistry<C>,
    vsync: Arc<Vsync>,
    suspension: Arc<Suspension<S>>,
    allocator: A,
}

impl<C, S, A> DisplayCompositor<C, S, A>
where
    C: DisplayController,
    S: Semaphore,
    A: MemoryAllocator,
{
    /// Creates a compositor.
    ///
    /// `allocator` backs item-layer buffers and should hand out memory the
    /// display controller can scan without cache maintenance.
    pub fn new(
        controller: C,
        allocator: A,
        suspension: Arc<Suspension<S>>,
        vsync: Arc<Vsync>,
        config: CompositorConfig,
    ) -> Self {
        Self {
            registry: LayerRegistry::new(controller, config),
            vsync,
            suspension,
            allocator,
        }
    }

    /// Returns the layer registry.
    #[must_use]
    pub fn registry(&self) -> &LayerRegistry<C> {
        &self.registry
    }

    /// Returns the layer registry mutably.
    pub fn registry_mut(&mut self) -> &mut LayerRegistry<C> {
        &mut self.registry
    }

    /// Returns the item-buffer allocator.
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Returns the item-buffer allocator mutably, for other users of the
    /// same region.
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    /// Returns the shared vsync counter.
    #[must_use]
    pub fn vsync(&self) -> &Arc<Vsync> {
        &self.vsync
    }

    /// Returns the shared semaphore pair.
    #[must_use]
    pub fn suspension(&self) -> &Arc<Suspension<S>> {
        &self.suspension
    }

    /// Returns a handler for the vblank interrupt.
    #[must_use]
    pub fn irq_handle(&self) -> VsyncIrq<S> {
        VsyncIrq::new(Arc::clone(&self.vsync), Arc::clone(&self.suspension))
    }

    /// Returns the current frame counter value.
    #[must_use]
    pub fn current_frame(&self) -> u32 {
        self.vsync.current_frame()
    }

    /// Makes all pending register writes visible at the next vblank.
    ///
    /// Returns the number of planes committed.
    pub fn commit(&mut self) -> u32 {
        let committed = self.registry.flush(self.vsync.current_frame());
        self.vsync.arm();
        committed
    }

    /// Starts a frame on an item layer and returns the buffer to draw into.
    ///
    /// `refresh_interval` is [`ASAP`](crate::layer::ASAP) to present on the
    /// next vblank, or the number of frames after the layer's last commit.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or does not refer to an item layer.
    pub fn begin_frame(&mut self, layer: LayerId, refresh_interval: i32) -> SurfaceDescriptor {
        let swap_frame = self.registry.layer(layer).swap_frame();
        if swap_frame == self.vsync.current_frame() {
            self.vsync.wait_for_vsync(&self.suspension);
        }
        let current = self.vsync.current_frame();

        let item = item_frames(&mut self.registry, layer);
        if item.state != FrameState::Idle {
            log::warn!("{layer:?}: begin_frame while {:?}", item.state);
        }
        item.target_frame = ItemLayer::target_for(refresh_interval, current, swap_frame);
        item.state = FrameState::Drawing;
        item.back_buffer().surface
    }

    /// Finishes a frame on an item layer.
    ///
    /// Blocks until the frame chosen by [`begin_frame`](Self::begin_frame)
    /// is reached, then programs the drawn buffer and flips. A target that
    /// has already passed does not block.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or does not refer to an item layer.
    pub fn end_frame(&mut self, layer: LayerId) {
        let item = item_frames(&mut self.registry, layer);
        if item.state != FrameState::Drawing {
            log::warn!("{layer:?}: end_frame without begin_frame");
        }
        item.state = FrameState::PendingPresent;
        let target_frame = item.target_frame;

        self.vsync.wait_for_frame(target_frame, &self.suspension);

        self.registry.program_scanout(layer);
        let item = item_frames(&mut self.registry, layer);
        let buffer = u8::from(item.buffer_id == 1);
        item.flip();
        self.registry.trace.record(TraceEvent::Swap(SwapEvent {
            layer,
            frame: self.vsync.current_frame(),
            target_frame,
            buffer,
        }));
    }

    /// Returns the most recently presented buffer of an item layer.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or does not refer to an item layer.
    #[must_use]
    pub fn front_buffer(&self, layer: LayerId) -> SurfaceDescriptor {
        match self.registry.layer(layer).item() {
            Some(item) => item.frames().front_buffer().surface,
            None => panic!("{layer:?} is not an item layer"),
        }
    }

    /// Describes the channel layout of an item layer's front buffer, for
    /// host-side readback.
    #[must_use]
    pub fn framebuffer_format(&self, layer: LayerId) -> Option<FramebufferFormat> {
        FramebufferFormat::describe(&self.front_buffer(layer))
    }

    /// Delivers recorded layer, commit, and swap events to `tracer`.
    pub fn drain_trace(&mut self, tracer: &mut Tracer<'_>) {
        self.registry.trace.drain_into(tracer);
    }

    fn allocate_buffer(&mut self, bytes: usize, surface: SurfaceDescriptor) -> ItemLayerBuffer {
        let alignment = self.registry.config().framebuffer_alignment;
        let Some(allocation) = self.allocator.aligned_alloc(alignment, bytes) else {
            fatal(
                ErrorCode::LayerAllocationFailed,
                i64::try_from(bytes).unwrap_or(i64::MAX),
            );
        };
        ItemLayerBuffer {
            allocation,
            surface: SurfaceDescriptor {
                address: allocation.address,
                ..surface
            },
        }
    }
}

fn item_frames<C: DisplayController>(
    registry: &mut LayerRegistry<C>,
    layer: LayerId,
) -> &mut ItemLayer {
    match registry.layer_mut(layer).item_mut() {
        Some(item) => &mut item.frames,
        None => panic!("{layer:?} is not an item layer"),
    }
}

impl<C, S, A> LayerEngine for DisplayCompositor<C, S, A>
where
    C: DisplayController,
    S: Semaphore,
    A: MemoryAllocator,
{
    fn allocate_item_layer(
        &mut self,
        screen: &Screen,
        properties: ItemLayerProperties,
        sprite: Option<SpriteId>,
    ) -> Result<LayerId, AllocateError> {
        self.registry.admit(screen, properties.size, sprite)?;

        let format = properties.color_depth.pixel_format();
        let stride = bytes_per_line(properties.color_depth.bits_per_pixel(), properties.size.width);
        let bytes = stride as usize * properties.size.height as usize;
        let surface = SurfaceDescriptor {
            address: 0,
            size: properties.size,
            format,
            bytes_per_line: stride,
        };
        let buffers = [
            self.allocate_buffer(bytes, surface),
            self.allocate_buffer(bytes, surface),
        ];
        let plane = ItemPlane {
            properties,
            frames: ItemLayer::new(buffers),
        };
        Ok(self.registry.insert(LayerKind::Item(plane), screen, sprite))
    }

    fn allocate_image_layer(
        &mut self,
        screen: &Screen,
        properties: ImageLayerProperties,
        sprite: Option<SpriteId>,
    ) -> Result<LayerId, AllocateError> {
        self.registry.allocate_image(screen, properties, sprite)
    }

    fn allocate_sprite_layer(
        &mut self,
        properties: SpriteProperties,
    ) -> Result<SpriteId, AllocateError> {
        self.registry.allocate_sprite(properties)
    }

    fn update_item_layer(&mut self, layer: LayerId, properties: ItemLayerProperties) {
        self.registry.update_item(layer, properties);
    }

    fn update_image_layer(&mut self, layer: LayerId, properties: ImageLayerProperties) {
        self.registry.update_image(layer, properties);
    }

    fn update_sprite_layer(&mut self, sprite: SpriteId, properties: SpriteProperties) {
        self.registry.update_sprite(sprite, properties);
    }

    fn deallocate_layer(&mut self, layer: LayerId) {
        let removed = self.registry.remove(layer);
        if let LayerKind::Item(item) = removed.kind {
            for buffer in item.frames.buffers {
                self.allocator.free(buffer.allocation);
            }
        }
    }

    fn deallocate_sprite_layer(&mut self, sprite: SpriteId) {
        self.registry.remove_sprite(sprite);
    }
}
