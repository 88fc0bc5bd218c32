// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer data model.
//!
//! A *layer* is a rectangle of pixels scanned out by one display-controller
//! plane. There are two kinds:
//!
//! - **Image layers** show an existing texture unchanged.
//! - **Item layers** own a pair of buffers the application draws into; one
//!   is scanned out while the other is drawn (see [`ItemLayer`]).
//!
//! A *sprite* ([`Sprite`]) has no pixels. It groups layers: every layer
//! attached to it inherits its z offset, position offset, enabled flag and
//! opacity. Each layer has at most one sprite.
//!
//! The [`LayerRegistry`] owns both and keeps plane indices ordered by
//! effective z.

mod id;
mod item;
mod plane;
mod props;
mod registry;
mod sprite;

pub use id::{LayerId, SpriteId};
pub use item::{ASAP, FrameState, ItemLayer, ItemLayerBuffer};
pub use plane::{EffectiveProperties, ItemPlane, Layer, LayerKind, PlaneSource};
pub use props::{CommonProperties, ImageLayerProperties, ItemLayerProperties, SpriteProperties};
pub use registry::LayerRegistry;
pub use sprite::{ObserverSet, Sprite};
