// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprites and their observer sets.
//!
//! A sprite groups layers: its properties compose into every attached layer
//! (see [`LayerRegistry::update_sprite`](super::LayerRegistry::update_sprite)).
//! The sprite keeps a bounded set of observers; a layer keeps a non-owning
//! back-reference to at most one sprite.

use alloc::vec::Vec;

use super::id::LayerId;
use super::props::SpriteProperties;

/// A bounded set of layers observing one sprite, in attachment order.
#[derive(Clone, Debug)]
pub struct ObserverSet {
    items: Vec<LayerId>,
    capacity: usize,
}

impl ObserverSet {
    /// Creates an empty set holding at most `capacity` observers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds `layer`. Returns `false` if it is already present or the set is
    /// full.
    pub fn insert(&mut self, layer: LayerId) -> bool {
        if self.items.contains(&layer) || self.items.len() >= self.capacity {
            return false;
        }
        self.items.push(layer);
        true
    }

    /// Removes `layer`. Returns whether it was present.
    pub fn remove(&mut self, layer: LayerId) -> bool {
        match self.items.iter().position(|&l| l == layer) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Returns whether `layer` is in the set.
    #[must_use]
    pub fn contains(&self, layer: LayerId) -> bool {
        self.items.contains(&layer)
    }

    /// Returns the number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the observers in attachment order.
    #[must_use]
    pub fn as_slice(&self) -> &[LayerId] {
        &self.items
    }
}

/// A non-rendering property group.
#[derive(Clone, Debug)]
pub struct Sprite {
    pub(crate) properties: SpriteProperties,
    pub(crate) observers: ObserverSet,
}

impl Sprite {
    pub(crate) fn new(properties: SpriteProperties, capacity: usize) -> Self {
        Self {
            properties,
            observers: ObserverSet::with_capacity(capacity),
        }
    }

    /// Returns the sprite's current properties.
    #[must_use]
    pub fn properties(&self) -> &SpriteProperties {
        &self.properties
    }

    /// Returns the attached layers.
    #[must_use]
    pub fn observers(&self) -> &ObserverSet {
        &self.observers
    }

    /// Replaces the properties and returns the previous z.
    pub(crate) fn replace(&mut self, properties: SpriteProperties) -> u8 {
        let old_z = self.properties.common.z;
        self.properties = properties;
        old_z
    }
}
