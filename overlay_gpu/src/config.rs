// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU configuration.

/// Build-time settings of the GPU drawing engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuConfig {
    /// Tessellation window passed to the driver at initialization.
    pub tessellation_size: (u32, u32),
    /// Whether to enable premultiplied-alpha blending.
    pub premultiply: bool,
    /// Use point filtering for pure scales with a unit axis.
    ///
    /// Works around a sampling defect where bilinear filtering combined with
    /// a source rectangle blends transparent pixels into texture edges.
    pub point_filter_for_unit_scale: bool,
    /// Byte alignment the GPU expects of texture addresses.
    pub image_alignment: usize,
    /// Number of texture descriptors reused round-robin.
    pub texture_ring_size: usize,
    /// Size in bytes of the preprocess (rotation cache) memory region.
    pub preprocess_cache_capacity: usize,
}

impl GpuConfig {
    /// VGLite on i.MX RT1170.
    #[must_use]
    pub const fn rt1170() -> Self {
        Self {
            tessellation_size: (64, 64),
            premultiply: true,
            point_filter_for_unit_scale: true,
            image_alignment: 8,
            texture_ring_size: 16,
            preprocess_cache_capacity: 2 * 1024 * 1024,
        }
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self::rt1170()
    }
}
