// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layer registry and hardware index allocator.
//!
//! [`LayerRegistry`] owns every registered layer and sprite and keeps the
//! display controller's planes in step with them. Its central invariant:
//! plane indices form a dense permutation of `0..len()` ordered by ascending
//! effective z, where layers of equal z keep the order in which they last
//! took their index (a layer entering a z level lands above the layers
//! already there).
//!
//! Every property change re-derives a layer's effective values from its
//! parent sprite and writes the plane registers immediately. The registers
//! are shadowed, so nothing becomes visible until [`LayerRegistry::flush`]
//! triggers the shadow loads of all dirty planes together.

use alloc::vec::Vec;
use core::fmt;

use crate::backend::{BlendConfig, BufferConfig, DisplayController};
use crate::config::{CompositorConfig, OverflowPolicy};
use crate::error::{AllocateError, ErrorCode, fatal};
use crate::geometry::{Size, to_coord};
use crate::output::Screen;
use crate::trace::{
    CommitEvent, LayerAllocatedEvent, LayerKindTag, LayerReleasedEvent, TraceBuffer, TraceEvent,
};

use super::id::{LayerId, SpriteId};
use super::plane::{Layer, LayerKind};
use super::props::{ImageLayerProperties, ItemLayerProperties, SpriteProperties};
use super::sprite::Sprite;

/// Whether [`LayerRegistry::reindex`] is making room for a layer or closing
/// the gap it leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reindex {
    Insert,
    Remove,
}

/// Owns registered layers and sprites and programs the display controller.
pub struct LayerRegistry<C> {
    controller: C,
    config: CompositorConfig,

    // -- Layers --
    layers: Vec<Option<Layer>>,
    layer_generation: Vec<u32>,
    free_layers: Vec<u32>,
    /// Live layer slots in registration order.
    order: Vec<u32>,

    // -- Sprites --
    sprites: Vec<Option<Sprite>>,
    sprite_generation: Vec<u32>,
    free_sprites: Vec<u32>,

    pub(crate) trace: TraceBuffer,
}

impl<C: fmt::Debug> fmt::Debug for LayerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("controller", &self.controller)
            .field("config", &self.config)
            .field("len", &self.order.len())
            .field("sprites", &self.sprite_count())
            .finish_non_exhaustive()
    }
}

impl<C> LayerRegistry<C> {
    /// Returns the number of registered layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether no layers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns whether every hardware plane is taken.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.order.len() >= self.config.max_layer_count
    }

    /// Returns the number of live sprites.
    #[must_use]
    pub fn sprite_count(&self) -> usize {
        self.sprites.iter().filter(|s| s.is_some()).count()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Returns the display controller.
    #[must_use]
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Returns the display controller mutably.
    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }
}

impl<C: DisplayController> LayerRegistry<C> {
    /// Creates an empty registry driving `controller`.
    #[must_use]
    pub fn new(controller: C, config: CompositorConfig) -> Self {
        Self {
            controller,
            config,
            layers: Vec::new(),
            layer_generation: Vec::new(),
            free_layers: Vec::new(),
            order: Vec::new(),
            sprites: Vec::new(),
            sprite_generation: Vec::new(),
            free_sprites: Vec::new(),
            trace: TraceBuffer::new(),
        }
    }

    // -- Queries --

    /// Returns whether `id` refers to a registered layer.
    #[must_use]
    pub fn contains(&self, id: LayerId) -> bool {
        self.layer_generation.get(id.idx as usize) == Some(&id.generation)
            && self.layers[id.idx as usize].is_some()
    }

    /// Returns whether `id` refers to a live sprite.
    #[must_use]
    pub fn contains_sprite(&self, id: SpriteId) -> bool {
        self.sprite_generation.get(id.idx as usize) == Some(&id.generation)
            && self.sprites[id.idx as usize].is_some()
    }

    /// Returns a registered layer.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> &Layer {
        let slot = self.validate(id);
        self.live(slot)
    }

    /// Returns a live sprite.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn sprite(&self, id: SpriteId) -> &Sprite {
        assert!(self.contains_sprite(id), "stale SpriteId");
        match &self.sprites[id.idx as usize] {
            Some(s) => s,
            None => unreachable!("live sprite slot is vacant"),
        }
    }

    /// Returns registered layers in registration order.
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &Layer)> + '_ {
        self.order
            .iter()
            .map(|&slot| (self.id_of(slot), self.live(slot)))
    }

    /// Returns `(layer, plane index)` pairs sorted by plane index.
    #[must_use]
    pub fn planes(&self) -> Vec<(LayerId, u8)> {
        let mut planes: Vec<_> = self
            .layers()
            .filter_map(|(id, l)| l.index.map(|i| (id, i)))
            .collect();
        planes.sort_by_key(|&(_, i)| i);
        planes
    }

    // -- Allocation --

    /// Applies the configured [`OverflowPolicy`] if every plane is taken.
    fn check_capacity(&self) -> Result<(), AllocateError> {
        if !self.is_full() {
            return Ok(());
        }
        match self.config.overflow {
            OverflowPolicy::Fatal => {
                log::error!(
                    "cannot allocate layer: all {} planes in use",
                    self.config.max_layer_count
                );
                fatal(
                    ErrorCode::LayerCountExceeded,
                    i64::try_from(self.order.len() + 1).unwrap_or(i64::MAX),
                );
            }
            OverflowPolicy::Reject => Err(AllocateError::Full {
                capacity: self.config.max_layer_count,
            }),
        }
    }

    /// Checks whether a layer of `size` may be added on `screen`.
    ///
    /// Capacity is checked first and follows the configured
    /// [`OverflowPolicy`]: under [`OverflowPolicy::Fatal`] a full registry
    /// halts here.
    pub fn admit(
        &self,
        screen: &Screen,
        size: Size,
        parent: Option<SpriteId>,
    ) -> Result<(), AllocateError> {
        self.check_capacity()?;
        if !screen.fits(size) {
            return Err(AllocateError::TooLarge {
                requested: size,
                screen: screen.size,
            });
        }
        if parent.is_some_and(|p| !self.contains_sprite(p)) {
            return Err(AllocateError::StaleHandle);
        }
        Ok(())
    }

    /// Registers an image layer.
    pub fn allocate_image(
        &mut self,
        screen: &Screen,
        properties: ImageLayerProperties,
        parent: Option<SpriteId>,
    ) -> Result<LayerId, AllocateError> {
        self.admit(screen, properties.texture.surface.size, parent)?;
        Ok(self.insert(LayerKind::Image(properties), screen, parent))
    }

    /// Registers a layer whose admission has already been checked.
    pub(crate) fn insert(
        &mut self,
        kind: LayerKind,
        screen: &Screen,
        parent: Option<SpriteId>,
    ) -> LayerId {
        let tag = match kind {
            LayerKind::Image(_) => LayerKindTag::Image,
            LayerKind::Item(_) => LayerKindTag::Item,
        };
        let layer = Layer::new(kind, screen.size);
        let idx = if let Some(idx) = self.free_layers.pop() {
            self.layer_generation[idx as usize] += 1;
            self.layers[idx as usize] = Some(layer);
            idx
        } else {
            let idx = u32::try_from(self.layers.len()).unwrap_or(u32::MAX);
            self.layers.push(Some(layer));
            self.layer_generation.push(0);
            idx
        };
        self.order.push(idx);
        let id = self.id_of(idx);

        if let Some(sprite) = parent {
            self.register_observer(sprite, id);
        }
        if self.live(idx).index.is_none() {
            self.on_updated(idx, None);
        }

        let layer = self.live(idx);
        self.trace.record(TraceEvent::LayerAllocated(LayerAllocatedEvent {
            layer: id,
            kind: tag,
            index: layer.index,
            z: layer.effective.z,
        }));
        id
    }

    /// Unregisters a layer and returns it.
    ///
    /// Higher planes shift down to close the gap, the vacated plane is
    /// committed, and the layer is detached from its sprite.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn remove(&mut self, id: LayerId) -> Layer {
        let slot = self.validate(id);
        self.reindex(slot, Reindex::Remove);
        let index = self.live(slot).index;
        if let Some(index) = index {
            self.controller.trigger_shadow_load(index);
        }
        if let Some(sprite) = self.live(slot).parent {
            if let Some(s) = self.sprite_slot_mut(sprite) {
                s.observers.remove(id);
            }
        }

        self.order.retain(|&s| s != slot);
        let mut layer = match self.layers[slot as usize].take() {
            Some(l) => l,
            None => unreachable!("validated layer slot is vacant"),
        };
        layer.dirty = false;
        layer.parent = None;
        self.layer_generation[slot as usize] += 1;
        self.free_layers.push(slot);

        self.trace
            .record(TraceEvent::LayerReleased(LayerReleasedEvent { layer: id, index }));
        layer
    }

    /// Creates a sprite.
    ///
    /// Sprites have no plane of their own and do not count against the
    /// layer capacity, but none can be created while every plane is taken.
    pub fn allocate_sprite(
        &mut self,
        properties: SpriteProperties,
    ) -> Result<SpriteId, AllocateError> {
        self.check_capacity()?;
        let sprite = Sprite::new(properties, self.config.max_layer_count);
        let idx = if let Some(idx) = self.free_sprites.pop() {
            self.sprite_generation[idx as usize] += 1;
            self.sprites[idx as usize] = Some(sprite);
            idx
        } else {
            let idx = u32::try_from(self.sprites.len()).unwrap_or(u32::MAX);
            self.sprites.push(Some(sprite));
            self.sprite_generation.push(0);
            idx
        };
        Ok(SpriteId {
            idx,
            generation: self.sprite_generation[idx as usize],
        })
    }

    /// Destroys a sprite, detaching every layer still attached to it.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn remove_sprite(&mut self, id: SpriteId) {
        let observers: Vec<LayerId> = self.sprite(id).observers.as_slice().to_vec();
        for layer in observers {
            self.unregister_observer(id, layer);
        }
        self.sprites[id.idx as usize] = None;
        self.sprite_generation[id.idx as usize] += 1;
        self.free_sprites.push(id.idx);
    }

    // -- Updates --

    /// Replaces an image layer's properties.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or does not refer to an image layer.
    pub fn update_image(&mut self, id: LayerId, properties: ImageLayerProperties) {
        let slot = self.validate(id);
        let layer = self.live_mut(slot);
        let old_z = layer.effective.z;
        match &mut layer.kind {
            LayerKind::Image(p) => *p = properties,
            LayerKind::Item(_) => panic!("{id:?} is not an image layer"),
        }
        self.on_updated(slot, Some(old_z));
    }

    /// Replaces an item layer's properties.
    ///
    /// Buffers are sized once at allocation, so a change of size or color
    /// depth is ignored with a warning; the remaining properties apply.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or does not refer to an item layer.
    pub fn update_item(&mut self, id: LayerId, properties: ItemLayerProperties) {
        let slot = self.validate(id);
        let layer = self.live_mut(slot);
        let old_z = layer.effective.z;
        match &mut layer.kind {
            LayerKind::Item(item) => {
                if item.properties.size != properties.size
                    || item.properties.color_depth != properties.color_depth
                {
                    log::warn!("{id:?}: item layer geometry is fixed at allocation");
                }
                item.properties.common = properties.common;
            }
            LayerKind::Image(_) => panic!("{id:?} is not an item layer"),
        }
        self.on_updated(slot, Some(old_z));
    }

    /// Replaces a sprite's properties and re-derives every attached layer.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn update_sprite(&mut self, id: SpriteId, properties: SpriteProperties) {
        assert!(self.contains_sprite(id), "stale SpriteId");
        let observers: Vec<LayerId> = match self.sprite_slot_mut(id) {
            Some(sprite) => {
                let old_z = sprite.replace(properties);
                if old_z != properties.common.z {
                    log::trace!("{id:?}: z {old_z} -> {}", properties.common.z);
                }
                sprite.observers.as_slice().to_vec()
            }
            None => return,
        };
        for layer in observers {
            if self.contains(layer) {
                let old_z = self.live(layer.idx).effective.z;
                self.on_updated(layer.idx, Some(old_z));
            }
        }
    }

    // -- Sprite observers --

    /// Attaches `layer` to `sprite`.
    ///
    /// Attaching is idempotent. On the first successful attach the layer
    /// immediately re-derives its properties from the sprite. A layer
    /// attached elsewhere is detached from its old sprite first.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn register_observer(&mut self, sprite: SpriteId, layer: LayerId) {
        let slot = self.validate(layer);
        assert!(self.contains_sprite(sprite), "stale SpriteId");
        if let Some(previous) = self.live(slot).parent.filter(|&p| p != sprite) {
            if let Some(s) = self.sprite_slot_mut(previous) {
                s.observers.remove(layer);
            }
            self.live_mut(slot).parent = None;
        }
        let added = self
            .sprite_slot_mut(sprite)
            .is_some_and(|s| s.observers.insert(layer));
        if added {
            let old_z = self.live(slot).index.map(|_| self.live(slot).effective.z);
            self.live_mut(slot).parent = Some(sprite);
            self.on_updated(slot, old_z);
        }
    }

    /// Detaches `layer` from `sprite`.
    ///
    /// The layer's parent reference is cleared even if it was not observing
    /// `sprite`, so detaching twice is harmless. A layer that was attached
    /// elsewhere is removed from that sprite's set too, keeping the
    /// one-parent invariant.
    ///
    /// # Panics
    ///
    /// Panics if the layer handle is stale.
    pub fn unregister_observer(&mut self, sprite: SpriteId, layer: LayerId) {
        let slot = self.validate(layer);
        if let Some(s) = self.sprite_slot_mut(sprite) {
            s.observers.remove(layer);
        }
        let Some(previous) = self.live_mut(slot).parent.take() else {
            return;
        };
        if previous != sprite {
            if let Some(s) = self.sprite_slot_mut(previous) {
                s.observers.remove(layer);
            }
        }
        let old_z = self.live(slot).effective.z;
        self.on_updated(slot, Some(old_z));
    }

    // -- Commit --

    /// Triggers the shadow load of every dirty plane, in registration
    /// order, stamping each with `frame`. Returns the number committed.
    pub fn flush(&mut self, frame: u32) -> u32 {
        let mut committed = 0;
        for pos in 0..self.order.len() {
            let slot = self.order[pos];
            let layer = self.live(slot);
            if !layer.dirty {
                continue;
            }
            if let Some(index) = layer.index {
                self.controller.trigger_shadow_load(index);
            }
            let layer = self.live_mut(slot);
            layer.dirty = false;
            layer.swap_frame = frame;
            committed += 1;
        }
        self.trace
            .record(TraceEvent::Commit(CommitEvent { frame, committed }));
        committed
    }

    /// Writes the current back buffer of an item layer to its plane.
    pub(crate) fn program_scanout(&mut self, id: LayerId) {
        let slot = self.validate(id);
        self.program_buffer(slot);
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> &mut Layer {
        let slot = self.validate(id);
        self.live_mut(slot)
    }

    // -- Internals --

    fn validate(&self, id: LayerId) -> u32 {
        assert!(self.contains(id), "stale LayerId");
        id.idx
    }

    fn id_of(&self, slot: u32) -> LayerId {
        LayerId {
            idx: slot,
            generation: self.layer_generation[slot as usize],
        }
    }

    fn live(&self, slot: u32) -> &Layer {
        match &self.layers[slot as usize] {
            Some(l) => l,
            None => unreachable!("layer slot {slot} is vacant"),
        }
    }

    fn live_mut(&mut self, slot: u32) -> &mut Layer {
        match &mut self.layers[slot as usize] {
            Some(l) => l,
            None => unreachable!("layer slot {slot} is vacant"),
        }
    }

    fn sprite_slot(&self, id: SpriteId) -> Option<&Sprite> {
        if self.contains_sprite(id) {
            self.sprites[id.idx as usize].as_ref()
        } else {
            None
        }
    }

    fn sprite_slot_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        if self.contains_sprite(id) {
            self.sprites[id.idx as usize].as_mut()
        } else {
            None
        }
    }

    /// Re-derives a layer after its own or its sprite's properties changed.
    ///
    /// `old_z` is the effective z before the change, or `None` if the layer
    /// has never been placed.
    fn on_updated(&mut self, slot: u32, old_z: Option<u16>) {
        let own_z = u16::from(self.live(slot).source().common().z);
        let parent_z = self
            .live(slot)
            .parent
            .and_then(|p| self.sprite_slot(p))
            .map_or(0, |s| u16::from(s.properties.common.z));
        let layer = self.live_mut(slot);
        layer.effective.z = own_z + parent_z;

        if layer.index.is_none() || old_z != Some(layer.effective.z) {
            self.reindex(slot, Reindex::Insert);
        } else {
            self.program_common(slot);
            if matches!(self.live(slot).kind, LayerKind::Image(_)) {
                self.program_buffer(slot);
            }
        }
    }

    /// Restores the plane-index invariant around `target`.
    ///
    /// If the target holds a plane, that plane is disabled and every higher
    /// plane shifts down by one. For [`Reindex::Remove`] that is all, plus a
    /// shadow load of the old top plane so the controller drops it.
    ///
    /// For [`Reindex::Insert`] every other layer with strictly greater z
    /// shifts up by one and the target takes the lowest index they vacated.
    /// If no layer has a greater z, the target goes on top.
    fn reindex(&mut self, target: u32, mode: Reindex) {
        if mode == Reindex::Insert && self.order.len() > self.config.max_layer_count {
            fatal(
                ErrorCode::LayerCountExceeded,
                i64::try_from(self.order.len()).unwrap_or(i64::MAX),
            );
        }

        if let Some(vacated) = self.live(target).index {
            self.controller.enable_plane(vacated, false);
            let mut highest = vacated;
            for pos in 0..self.order.len() {
                let slot = self.order[pos];
                let Some(index) = self.live(slot).index else {
                    continue;
                };
                highest = highest.max(index);
                if slot != target && index > vacated {
                    self.controller.enable_plane(index, false);
                    self.assign(slot, index - 1);
                }
            }
            if mode == Reindex::Remove {
                if highest > vacated {
                    self.controller.trigger_shadow_load(highest);
                }
                return;
            }
        } else if mode == Reindex::Remove {
            return;
        }

        let target_z = self.live(target).effective.z;
        let mut highest_z = 0;
        let mut highest_index: Option<u8> = None;
        let mut insert_at: Option<u8> = None;
        for pos in 0..self.order.len() {
            let slot = self.order[pos];
            if slot == target {
                continue;
            }
            let layer = self.live(slot);
            let z = layer.effective.z;
            let Some(index) = layer.index else {
                continue;
            };
            highest_z = highest_z.max(z);
            highest_index = Some(highest_index.map_or(index, |h| h.max(index)));
            if z > target_z {
                insert_at = Some(insert_at.map_or(index, |i| i.min(index)));
                self.assign(slot, index.saturating_add(1));
            }
        }

        let index = match insert_at {
            Some(i) if target_z < highest_z => i,
            _ => highest_index.map_or(0, |h| h.saturating_add(1)),
        };
        self.assign(target, index);
    }

    /// Moves a layer to plane `index` and writes all of its registers.
    fn assign(&mut self, slot: u32, index: u8) {
        #[cfg(feature = "trace-rich")]
        {
            let from = self.live(slot).index;
            if from != Some(index) {
                let layer = self.id_of(slot);
                self.trace
                    .record(TraceEvent::Reindex(crate::trace::ReindexEvent {
                        layer,
                        from,
                        to: index,
                    }));
            }
        }
        self.live_mut(slot).index = Some(index);
        self.program_common(slot);
        self.program_buffer(slot);
    }

    /// Writes enable, blend, size, and offset for a placed layer.
    fn program_common(&mut self, slot: u32) {
        let global_alpha = self.config.global_alpha;
        let layer = self.live(slot);
        let Some(index) = layer.index else {
            return;
        };
        let common = *layer.source().common();
        let size = layer.source().size();
        let screen = layer.screen;

        let mut opacity = common.opacity;
        let mut enabled = common.enabled;
        let mut position = common.position;
        if let Some(parent) = layer.parent.and_then(|p| self.sprite_slot(p)) {
            let parent = parent.properties.common;
            if global_alpha {
                opacity *= parent.opacity;
            }
            enabled &= parent.enabled;
            position = position + parent.position;
        }
        position.x = position.x.min(to_coord(screen.width) - to_coord(size.width));
        position.y = position.y.min(to_coord(screen.height) - to_coord(size.height));

        let blend = if global_alpha {
            BlendConfig::GlobalAlpha(alpha_byte(opacity))
        } else {
            BlendConfig::Embedded
        };

        let layer = self.live_mut(slot);
        layer.effective.opacity = opacity;
        layer.effective.enabled = enabled;
        layer.effective.position = position;
        layer.dirty = true;

        self.controller.enable_plane(index, enabled);
        self.controller.set_blend(index, blend);
        self.controller.set_size(index, size);
        self.controller.set_offset(index, position);
    }

    /// Writes buffer format, stride, and scan-out address for a placed layer.
    fn program_buffer(&mut self, slot: u32) {
        let layer = self.live(slot);
        let Some(index) = layer.index else {
            return;
        };
        let source = layer.source();
        let config = BufferConfig {
            format: source.format().controller_format(),
            stride: source.bytes_per_line(),
        };
        let address = source.scanout_address();

        self.live_mut(slot).dirty = true;
        self.controller.set_buffer_config(index, config);
        self.controller.set_buffer_address(index, address);
    }
}

/// Converts an opacity to the controller's 8-bit global alpha, truncating.
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to 0.0..=255.0 and truncation matches the hardware"
)]
fn alpha_byte(opacity: f32) -> u8 {
    (255.0 * opacity.clamp(0.0, 1.0)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use crate::geometry::Point;
    use crate::layer::props::CommonProperties;
    use crate::surface::{SurfaceDescriptor, Texture};
    use crate::testing::{RecordingController, RegisterWrite};

    fn registry() -> LayerRegistry<RecordingController> {
        LayerRegistry::new(RecordingController::default(), CompositorConfig::rt1170())
    }

    fn image(z: u8) -> ImageLayerProperties {
        image_at(z, Point::ZERO, Size::new(100, 100))
    }

    fn image_at(z: u8, position: Point, size: Size) -> ImageLayerProperties {
        ImageLayerProperties {
            common: CommonProperties {
                z,
                position,
                ..CommonProperties::default()
            },
            texture: Texture::new(SurfaceDescriptor::packed(
                0x8000_0000 + usize::from(z) * 0x1_0000,
                size,
                PixelFormat::Argb32,
            )),
        }
    }

    fn sprite_props(z: u8, opacity: f32, position: Point) -> SpriteProperties {
        SpriteProperties {
            common: CommonProperties {
                z,
                opacity,
                position,
                ..CommonProperties::default()
            },
        }
    }

    fn index_of(reg: &LayerRegistry<RecordingController>, id: LayerId) -> u8 {
        reg.layer(id).index().unwrap()
    }

    /// Asserts indices are a dense permutation ordered by effective z.
    fn assert_dense_by_z(reg: &LayerRegistry<RecordingController>) {
        let planes = reg.planes();
        for (expected, &(_, index)) in planes.iter().enumerate() {
            assert_eq!(usize::from(index), expected, "indices must be dense");
        }
        for pair in planes.windows(2) {
            assert!(
                reg.layer(pair[0].0).effective().z <= reg.layer(pair[1].0).effective().z,
                "indices must follow z"
            );
        }
    }

    #[test]
    fn indices_follow_z_with_ties_in_registration_order() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let a = reg.allocate_image(&screen, image(5), None).unwrap();
        let b = reg.allocate_image(&screen, image(1), None).unwrap();
        let c = reg.allocate_image(&screen, image(5), None).unwrap();
        let d = reg.allocate_image(&screen, image(3), None).unwrap();
        let e = reg.allocate_image(&screen, image(0), None).unwrap();

        assert_eq!(index_of(&reg, e), 0);
        assert_eq!(index_of(&reg, b), 1);
        assert_eq!(index_of(&reg, d), 2);
        assert_eq!(index_of(&reg, a), 3);
        assert_eq!(index_of(&reg, c), 4);
        assert_dense_by_z(&reg);
    }

    #[test]
    fn removal_compacts_and_reloads_old_top() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let low = reg.allocate_image(&screen, image(1), None).unwrap();
        let mid = reg.allocate_image(&screen, image(2), None).unwrap();
        let high = reg.allocate_image(&screen, image(3), None).unwrap();
        reg.controller_mut().writes.clear();

        reg.remove(mid);
        assert_eq!(index_of(&reg, low), 0);
        assert_eq!(index_of(&reg, high), 1);
        assert_dense_by_z(&reg);

        let writes = &reg.controller().writes;
        assert_eq!(writes[0], RegisterWrite::Enable(1, false));
        assert_eq!(writes[1], RegisterWrite::Enable(2, false));
        // Old top plane reloaded, then the vacated plane committed.
        assert_eq!(reg.controller().shadow_loads(), [2, 1]);
        assert_eq!(reg.controller().plane(1).address, 0x8003_0000);
    }

    #[test]
    fn removing_top_layer_needs_no_reload() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let _low = reg.allocate_image(&screen, image(1), None).unwrap();
        let top = reg.allocate_image(&screen, image(2), None).unwrap();
        reg.controller_mut().writes.clear();
        reg.remove(top);
        assert_eq!(reg.controller().shadow_loads(), [1]);
        assert!(!reg.controller().plane(1).enabled);
    }

    #[test]
    fn readding_equivalent_layer_restores_assignment() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let ids: Vec<_> = [4, 1, 7, 2]
            .into_iter()
            .map(|z| reg.allocate_image(&screen, image(z), None).unwrap())
            .collect();
        let before: Vec<_> = ids[..3].iter().map(|&id| index_of(&reg, id)).collect();
        let removed_index = index_of(&reg, ids[3]);

        reg.remove(ids[3]);
        let again = reg.allocate_image(&screen, image(2), None).unwrap();
        let after: Vec<_> = ids[..3].iter().map(|&id| index_of(&reg, id)).collect();
        assert_eq!(before, after);
        assert_eq!(index_of(&reg, again), removed_index);
        assert_dense_by_z(&reg);
    }

    #[test]
    fn z_change_moves_layer() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let a = reg.allocate_image(&screen, image(1), None).unwrap();
        let b = reg.allocate_image(&screen, image(2), None).unwrap();
        let c = reg.allocate_image(&screen, image(3), None).unwrap();

        reg.update_image(a, image(9));
        assert_eq!(index_of(&reg, b), 0);
        assert_eq!(index_of(&reg, c), 1);
        assert_eq!(index_of(&reg, a), 2);
        assert_dense_by_z(&reg);
    }

    #[test]
    fn property_change_without_z_change_keeps_index() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let a = reg.allocate_image(&screen, image(1), None).unwrap();
        let _b = reg.allocate_image(&screen, image(2), None).unwrap();
        reg.controller_mut().writes.clear();

        reg.update_image(a, image_at(1, Point::new(7, 8), Size::new(100, 100)));
        assert_eq!(index_of(&reg, a), 0);
        assert_eq!(reg.controller().plane(0).offset, Point::new(7, 8));
        assert!(
            !reg
                .controller()
                .writes
                .contains(&RegisterWrite::Enable(1, false)),
            "other planes are untouched"
        );
    }

    #[test]
    #[should_panic(expected = "layer count exceeded")]
    fn ninth_layer_is_fatal() {
        let mut reg = registry();
        let screen = Screen::rk055();
        for z in 0..8 {
            reg.allocate_image(&screen, image(z), None).unwrap();
        }
        assert!(reg.is_full());
        let _ = reg.allocate_image(&screen, image(8), None);
    }

    #[test]
    fn ninth_layer_is_rejected_under_reject_policy() {
        let mut reg = LayerRegistry::new(RecordingController::default(), CompositorConfig::host());
        let screen = Screen::rk055();
        for z in 0..8 {
            reg.allocate_image(&screen, image(z), None).unwrap();
        }
        assert_eq!(
            reg.allocate_image(&screen, image(8), None),
            Err(AllocateError::Full { capacity: 8 })
        );
        assert_eq!(reg.len(), 8);
        assert_dense_by_z(&reg);
    }

    #[test]
    fn sprite_is_refused_while_planes_are_full() {
        let mut reg = LayerRegistry::new(RecordingController::default(), CompositorConfig::host());
        let screen = Screen::rk055();
        let early = reg.allocate_sprite(SpriteProperties::default()).unwrap();
        for z in 0..8 {
            reg.allocate_image(&screen, image(z), None).unwrap();
        }
        assert_eq!(
            reg.allocate_sprite(SpriteProperties::default()),
            Err(AllocateError::Full { capacity: 8 })
        );
        assert!(reg.contains_sprite(early));
        assert_eq!(reg.sprite_count(), 1);
    }

    #[test]
    fn layer_wider_than_screen_is_rejected() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let result = reg.allocate_image(&screen, image_at(0, Point::ZERO, Size::new(600, 100)), None);
        assert_eq!(
            result,
            Err(AllocateError::TooLarge {
                requested: Size::new(600, 100),
                screen: Size::new(540, 960),
            })
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn sprite_composes_into_child() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let sprite = reg.allocate_sprite(sprite_props(5, 0.5, Point::new(10, 20))).unwrap();
        let mut props = image_at(2, Point::new(1, 2), Size::new(100, 100));
        props.common.opacity = 0.8;
        let child = reg.allocate_image(&screen, props, Some(sprite)).unwrap();

        let eff = *reg.layer(child).effective();
        assert_eq!(eff.z, 7);
        assert!((eff.opacity - 0.4).abs() < 1e-6);
        assert_eq!(eff.position, Point::new(11, 22));
        assert_eq!(reg.layer(child).parent(), Some(sprite));
        assert_eq!(
            reg.controller().plane(0).blend,
            Some(BlendConfig::GlobalAlpha(alpha_byte(eff.opacity)))
        );
        assert!(reg.sprite(sprite).observers().contains(child));
    }

    #[test]
    fn opacity_is_not_composed_without_global_alpha() {
        let config = CompositorConfig {
            global_alpha: false,
            ..CompositorConfig::rt1170()
        };
        let mut reg = LayerRegistry::new(RecordingController::default(), config);
        let sprite = reg.allocate_sprite(sprite_props(5, 0.5, Point::ZERO)).unwrap();
        let mut props = image(2);
        props.common.opacity = 0.8;
        let child = reg.allocate_image(&Screen::rk043(), props, Some(sprite)).unwrap();
        assert!((reg.layer(child).effective().opacity - 0.8).abs() < 1e-6);
        assert_eq!(reg.controller().plane(0).blend, Some(BlendConfig::Embedded));
    }

    #[test]
    fn position_clamps_to_far_edges_only() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let id = reg
            .allocate_image(&screen, image_at(0, Point::new(500, -20), Size::new(100, 100)), None)
            .unwrap();
        assert_eq!(reg.layer(id).effective().position, Point::new(440, -20));
        assert_eq!(reg.controller().plane(0).offset, Point::new(440, -20));
    }

    #[test]
    fn sprite_z_change_reorders_children() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let sprite = reg.allocate_sprite(sprite_props(0, 1.0, Point::ZERO)).unwrap();
        let child = reg.allocate_image(&screen, image(1), Some(sprite)).unwrap();
        let other = reg.allocate_image(&screen, image(3), None).unwrap();
        assert_eq!(index_of(&reg, child), 0);

        reg.update_sprite(sprite, sprite_props(5, 1.0, Point::ZERO));
        assert_eq!(reg.layer(child).effective().z, 6);
        assert_eq!(index_of(&reg, other), 0);
        assert_eq!(index_of(&reg, child), 1);

        // Repeated updates do not accumulate the parent's z.
        reg.update_sprite(sprite, sprite_props(5, 0.5, Point::ZERO));
        assert_eq!(reg.layer(child).effective().z, 6);
    }

    #[test]
    fn unregister_never_registered_pair_is_harmless() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let sprite = reg.allocate_sprite(sprite_props(1, 1.0, Point::ZERO)).unwrap();
        let attached = reg.allocate_image(&screen, image(0), Some(sprite)).unwrap();
        let loose = reg.allocate_image(&screen, image(4), None).unwrap();

        reg.unregister_observer(sprite, loose);
        assert_eq!(reg.sprite(sprite).observers().as_slice(), &[attached]);
        assert_eq!(reg.layer(loose).parent(), None);

        reg.unregister_observer(sprite, attached);
        reg.unregister_observer(sprite, attached);
        assert!(reg.sprite(sprite).observers().is_empty());
        assert_eq!(reg.layer(attached).parent(), None);
        assert_eq!(reg.layer(attached).effective().z, 0);
    }

    #[test]
    fn register_observer_is_idempotent_and_moves_between_sprites() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let first = reg.allocate_sprite(sprite_props(1, 1.0, Point::ZERO)).unwrap();
        let second = reg.allocate_sprite(sprite_props(2, 1.0, Point::ZERO)).unwrap();
        let layer = reg.allocate_image(&screen, image(0), Some(first)).unwrap();

        reg.register_observer(first, layer);
        assert_eq!(reg.sprite(first).observers().len(), 1);

        reg.register_observer(second, layer);
        assert!(reg.sprite(first).observers().is_empty());
        assert_eq!(reg.layer(layer).parent(), Some(second));
        assert_eq!(reg.layer(layer).effective().z, 2);
    }

    #[test]
    fn removing_sprite_detaches_children() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let sprite = reg.allocate_sprite(sprite_props(3, 1.0, Point::new(5, 5))).unwrap();
        let child = reg.allocate_image(&screen, image(1), Some(sprite)).unwrap();
        reg.remove_sprite(sprite);
        assert!(!reg.contains_sprite(sprite));
        assert_eq!(reg.layer(child).parent(), None);
        assert_eq!(reg.layer(child).effective().position, Point::ZERO);
        assert_eq!(reg.sprite_count(), 0);
    }

    #[test]
    fn removing_layer_detaches_from_sprite() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let sprite = reg.allocate_sprite(sprite_props(0, 1.0, Point::ZERO)).unwrap();
        let child = reg.allocate_image(&screen, image(1), Some(sprite)).unwrap();
        reg.remove(child);
        assert!(reg.sprite(sprite).observers().is_empty());
    }

    #[test]
    fn flush_commits_dirty_layers_once() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let a = reg.allocate_image(&screen, image(2), None).unwrap();
        let b = reg.allocate_image(&screen, image(1), None).unwrap();
        reg.controller_mut().writes.clear();

        assert_eq!(reg.flush(7), 2);
        // Registration order, not plane order.
        assert_eq!(reg.controller().shadow_loads(), [1, 0]);
        assert_eq!(reg.layer(a).swap_frame(), 7);
        assert!(!reg.layer(b).is_dirty());

        assert_eq!(reg.flush(8), 0);
        assert_eq!(reg.layer(a).swap_frame(), 7);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn stale_layer_id_panics() {
        let mut reg = registry();
        let id = reg.allocate_image(&Screen::rk043(), image(0), None).unwrap();
        reg.remove(id);
        let _ = reg.layer(id);
    }

    #[test]
    fn stale_parent_is_rejected() {
        let mut reg = registry();
        let sprite = reg.allocate_sprite(SpriteProperties::default()).unwrap();
        reg.remove_sprite(sprite);
        assert_eq!(
            reg.allocate_image(&Screen::rk043(), image(0), Some(sprite)),
            Err(AllocateError::StaleHandle)
        );
    }

    #[test]
    #[should_panic(expected = "unsupported pixel format")]
    fn unscannable_texture_is_fatal() {
        let mut reg = registry();
        let mut props = image(0);
        props.texture.surface.format = PixelFormat::Alpha8;
        let _ = reg.allocate_image(&Screen::rk043(), props, None);
    }

    #[test]
    fn debug_output_counts_sprites() {
        let mut reg = registry();
        reg.allocate_sprite(SpriteProperties::default()).unwrap();
        let text = alloc::format!("{reg:?}");
        assert!(text.contains("sprites: 1"), "unexpected debug output: {text}");
    }

    // ------------------------------------------------------------------------
    // Randomized operation sequences
    // ------------------------------------------------------------------------

    /// Deterministic linear congruential generator.
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            usize::try_from(self.0 >> 33).unwrap() % bound
        }

        fn z(&mut self, bound: usize) -> u8 {
            u8::try_from(self.below(bound)).unwrap()
        }
    }

    #[test]
    fn random_sequence_keeps_indices_dense_and_ties_stable() {
        let mut reg = registry();
        let screen = Screen::rk043();
        let mut rng = Lcg(0x00c0_ffee);
        let mut sprites: Vec<SpriteId> = Vec::new();
        // Layers in the order they last took a plane. A layer moves to the
        // end whenever it is allocated or its effective z changes, so layers
        // that keep their z stay in registration order.
        let mut placed: Vec<LayerId> = Vec::new();

        for step in 0..600_u32 {
            let before: Vec<(LayerId, u16)> = placed
                .iter()
                .map(|&id| (id, reg.layer(id).effective().z))
                .collect();
            let mut touched: Vec<LayerId> = Vec::new();

            match rng.below(10) {
                0 | 1 if !reg.is_full() => {
                    let parent = if !sprites.is_empty() && rng.below(2) == 0 {
                        Some(sprites[rng.below(sprites.len())])
                    } else {
                        None
                    };
                    let z = rng.z(6);
                    let id = reg.allocate_image(&screen, image(z), parent).unwrap();
                    touched.push(id);
                }
                2 if !placed.is_empty() => {
                    let id = placed[rng.below(placed.len())];
                    reg.remove(id);
                    placed.retain(|&p| p != id);
                }
                3 if !placed.is_empty() => {
                    let id = placed[rng.below(placed.len())];
                    let z = rng.z(6);
                    reg.update_image(id, image(z));
                    touched.push(id);
                }
                4 if !reg.is_full() && sprites.len() < 3 => {
                    let z = rng.z(4);
                    let sprite = reg
                        .allocate_sprite(sprite_props(z, 1.0, Point::ZERO))
                        .unwrap();
                    sprites.push(sprite);
                }
                5 if !sprites.is_empty() => {
                    let sprite = sprites[rng.below(sprites.len())];
                    touched.extend_from_slice(reg.sprite(sprite).observers().as_slice());
                    let z = rng.z(4);
                    reg.update_sprite(sprite, sprite_props(z, 1.0, Point::ZERO));
                }
                6 if !sprites.is_empty() && rng.below(3) == 0 => {
                    let sprite = sprites.swap_remove(rng.below(sprites.len()));
                    touched.extend_from_slice(reg.sprite(sprite).observers().as_slice());
                    reg.remove_sprite(sprite);
                }
                7 if !sprites.is_empty() && !placed.is_empty() => {
                    let sprite = sprites[rng.below(sprites.len())];
                    let id = placed[rng.below(placed.len())];
                    reg.register_observer(sprite, id);
                    touched.push(id);
                }
                8 if !sprites.is_empty() && !placed.is_empty() => {
                    let sprite = sprites[rng.below(sprites.len())];
                    let id = placed[rng.below(placed.len())];
                    reg.unregister_observer(sprite, id);
                    touched.push(id);
                }
                _ => {
                    let _ = reg.flush(step);
                }
            }

            for id in touched {
                let moved = before
                    .iter()
                    .find(|&&(b, _)| b == id)
                    .is_none_or(|&(_, z)| z != reg.layer(id).effective().z);
                if moved {
                    placed.retain(|&p| p != id);
                    placed.push(id);
                }
            }

            assert_eq!(reg.len(), placed.len(), "step {step}: layer count drifted");
            assert_dense_by_z(&reg);
            let mut expected = placed.clone();
            expected.sort_by_key(|&id| reg.layer(id).effective().z);
            let actual: Vec<LayerId> = reg.planes().iter().map(|&(id, _)| id).collect();
            assert_eq!(actual, expected, "step {step}: equal z must keep placement order");
        }
    }
}
