// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated GPU and CPU fallback renderer.
//!
//! [`SimGpu`] draws nothing. It validates the call protocol the drawing
//! engine must follow (initialize first, release gradients only after a
//! finish) and records one [`SimGpuOp`] per command so tests can inspect what
//! a frame submitted.

use std::collections::BTreeSet;

use overlay_core::format::Rgba32;
use overlay_core::geometry::{Point, Rect};
use overlay_core::surface::{SurfaceDescriptor, Texture};
use overlay_gpu::buffer::GpuBuffer;
use overlay_gpu::device::{
    FillRule, Filter, GpuBlend, GpuDevice, GpuError, GradientHandle, LinearGradientDesc,
};
use overlay_gpu::engine::SoftwareRenderer;
use overlay_gpu::path::PathData;
use overlay_gpu::transform::{Matrix, Transform};

/// One command submitted to a [`SimGpu`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimGpuOp {
    /// Rectangle clear.
    Clear {
        /// Target address.
        target: usize,
        /// Cleared area.
        rect: Rect,
        /// Color as `0xAABBGGRR`.
        color: u32,
    },
    /// Solid path fill.
    Draw {
        /// Target address.
        target: usize,
        /// Fill rule.
        rule: FillRule,
        /// Blend mode.
        blend: GpuBlend,
        /// Color as `0xAABBGGRR`.
        color: u32,
    },
    /// Image blit.
    Blit {
        /// Target address.
        target: usize,
        /// Source address.
        source: usize,
        /// Sampling filter.
        filter: Filter,
    },
    /// Gradient path fill.
    Gradient {
        /// Target address.
        target: usize,
        /// Gradient used.
        gradient: GradientHandle,
    },
}

/// A GPU that records work instead of drawing.
#[derive(Debug, Default)]
pub struct SimGpu {
    initialized: bool,
    premultiply: bool,
    scissor: Option<Rect>,
    ops: Vec<SimGpuOp>,
    queued: usize,
    finishes: u32,
    next_gradient: u32,
    live_gradients: BTreeSet<u32>,
    uploaded_paths: usize,
}

impl SimGpu {
    /// Creates an uninitialized device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded command.
    #[must_use]
    pub fn ops(&self) -> &[SimGpuOp] {
        &self.ops
    }

    /// Returns commands submitted since the last finish.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued
    }

    /// Returns how many times the device was drained.
    #[must_use]
    pub fn finishes(&self) -> u32 {
        self.finishes
    }

    /// Returns whether premultiplied blending is on.
    #[must_use]
    pub fn is_premultiplied(&self) -> bool {
        self.premultiply
    }

    /// Returns gradients created and not yet released.
    #[must_use]
    pub fn live_gradients(&self) -> usize {
        self.live_gradients.len()
    }

    /// Returns paths currently resident in GPU memory.
    #[must_use]
    pub fn uploaded_paths(&self) -> usize {
        self.uploaded_paths
    }

    /// Returns the active scissor rectangle.
    #[must_use]
    pub fn scissor(&self) -> Option<Rect> {
        self.scissor
    }

    fn submit(&mut self, op: SimGpuOp) -> Result<(), GpuError> {
        if !self.initialized {
            return Err(GpuError::NotInitialized);
        }
        self.ops.push(op);
        self.queued += 1;
        Ok(())
    }
}

impl GpuDevice for SimGpu {
    fn init(&mut self, tessellation_width: u32, tessellation_height: u32) -> Result<(), GpuError> {
        if tessellation_width == 0 || tessellation_height == 0 {
            return Err(GpuError::Sdk(-1));
        }
        self.initialized = true;
        Ok(())
    }

    fn close(&mut self) {
        self.initialized = false;
    }

    fn enable_premultiply(&mut self) -> Result<(), GpuError> {
        if !self.initialized {
            return Err(GpuError::NotInitialized);
        }
        self.premultiply = true;
        Ok(())
    }

    fn disable_premultiply(&mut self) {
        self.premultiply = false;
    }

    fn finish(&mut self) -> Result<(), GpuError> {
        self.queued = 0;
        self.finishes += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), GpuError> {
        Ok(())
    }

    fn clear(&mut self, target: &GpuBuffer, rect: Rect, color: u32) -> Result<(), GpuError> {
        self.submit(SimGpuOp::Clear {
            target: target.address,
            rect,
            color,
        })
    }

    fn draw(
        &mut self,
        target: &GpuBuffer,
        _: &PathData,
        rule: FillRule,
        _: &Matrix,
        blend: GpuBlend,
        color: u32,
    ) -> Result<(), GpuError> {
        self.submit(SimGpuOp::Draw {
            target: target.address,
            rule,
            blend,
            color,
        })
    }

    fn blit(
        &mut self,
        target: &GpuBuffer,
        source: &GpuBuffer,
        _: &Matrix,
        _: GpuBlend,
        _: u32,
        filter: Filter,
    ) -> Result<(), GpuError> {
        self.submit(SimGpuOp::Blit {
            target: target.address,
            source: source.address,
            filter,
        })
    }

    fn blit_rect(
        &mut self,
        target: &GpuBuffer,
        source: &GpuBuffer,
        _: [u32; 4],
        _: &Matrix,
        _: GpuBlend,
        _: u32,
        filter: Filter,
    ) -> Result<(), GpuError> {
        self.submit(SimGpuOp::Blit {
            target: target.address,
            source: source.address,
            filter,
        })
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.scissor = Some(rect);
    }

    fn enable_scissor(&mut self) {}

    fn disable_scissor(&mut self) {
        self.scissor = None;
    }

    fn upload_path(&mut self, _: &PathData) -> Result<(), GpuError> {
        self.uploaded_paths += 1;
        Ok(())
    }

    fn clear_path(&mut self, _: &PathData) -> Result<(), GpuError> {
        self.uploaded_paths = self.uploaded_paths.saturating_sub(1);
        Ok(())
    }

    fn create_linear_gradient(
        &mut self,
        _: &LinearGradientDesc,
    ) -> Result<GradientHandle, GpuError> {
        if !self.initialized {
            return Err(GpuError::NotInitialized);
        }
        self.next_gradient += 1;
        self.live_gradients.insert(self.next_gradient);
        Ok(GradientHandle(self.next_gradient))
    }

    fn draw_linear_gradient(
        &mut self,
        target: &GpuBuffer,
        _: &PathData,
        _: FillRule,
        _: &Matrix,
        gradient: GradientHandle,
        _: GpuBlend,
        _: Filter,
    ) -> Result<(), GpuError> {
        self.submit(SimGpuOp::Gradient {
            target: target.address,
            gradient,
        })
    }

    fn release_linear_gradient(&mut self, gradient: GradientHandle) {
        if self.queued != 0 {
            log::error!(
                "gradient {} released while {} commands are queued",
                gradient.0,
                self.queued
            );
        }
        self.live_gradients.remove(&gradient.0);
    }
}

/// One blend handed to a [`SimRenderer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CpuBlend {
    /// Image blend.
    Image {
        /// Source address.
        source: usize,
        /// Placement.
        dest: Point,
    },
    /// Tinted coverage mask.
    AlphaMap {
        /// Mask address.
        source: usize,
        /// Tint.
        color: Rgba32,
    },
    /// Transformed image.
    Transformed {
        /// Source address.
        source: usize,
    },
}

/// A CPU fallback renderer that records blends.
#[derive(Debug, Default)]
pub struct SimRenderer {
    blends: Vec<CpuBlend>,
}

impl SimRenderer {
    /// Returns every recorded blend.
    #[must_use]
    pub fn blends(&self) -> &[CpuBlend] {
        &self.blends
    }
}

impl SoftwareRenderer for SimRenderer {
    fn blend_image(
        &mut self,
        _: &SurfaceDescriptor,
        image: &Texture,
        dest: Point,
        _: Rect,
        _: u16,
    ) {
        self.blends.push(CpuBlend::Image {
            source: image.surface.address,
            dest,
        });
    }

    fn blend_alpha_map(
        &mut self,
        _: &SurfaceDescriptor,
        alpha_map: &Texture,
        _: Point,
        _: Rect,
        color: Rgba32,
        _: u16,
    ) {
        self.blends.push(CpuBlend::AlphaMap {
            source: alpha_map.surface.address,
            color,
        });
    }

    fn blend_transformed(
        &mut self,
        _: &SurfaceDescriptor,
        texture: &Texture,
        _: &Transform,
        _: kurbo::Point,
        _: kurbo::Rect,
        _: Rect,
        _: Rgba32,
        _: u16,
    ) {
        self.blends.push(CpuBlend::Transformed {
            source: texture.surface.address,
        });
    }
}
