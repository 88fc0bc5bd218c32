// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The GPU driver seam.
//!
//! [`GpuDevice`] mirrors the subset of the VGLite driver the drawing engine
//! uses. Calls queue work; [`flush`](GpuDevice::flush) submits it and
//! [`finish`](GpuDevice::finish) also waits for completion. Anything the GPU
//! reads (paths, gradients, source images) must stay alive until the next
//! `finish`.

use alloc::vec::Vec;

use overlay_core::geometry::Rect;

use crate::buffer::GpuBuffer;
use crate::path::PathData;
use crate::transform::Matrix;

/// Errors reported by a [`GpuDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GpuError {
    /// The driver returned an error code.
    #[error("gpu driver error {0}")]
    Sdk(i32),
    /// The device has not been initialized.
    #[error("gpu not initialized")]
    NotInitialized,
    /// A path could not be uploaded to GPU memory.
    #[error("path upload failed ({0})")]
    PathUpload(i32),
}

/// How drawn pixels combine with the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuBlend {
    /// Source replaces destination.
    None,
    /// Source over destination.
    SrcOver,
}

/// Image sampling filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Nearest neighbour.
    Point,
    /// Bilinear interpolation.
    Bilinear,
}

/// Path fill rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillRule {
    /// Non-zero winding.
    NonZero,
    /// Even-odd.
    EvenOdd,
}

/// Behaviour of a gradient outside its start and end points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpreadMode {
    /// Extend the end colors.
    #[default]
    Pad,
    /// Repeat the ramp.
    Repeat,
    /// Mirror the ramp.
    Reflect,
}

/// One color stop in GPU form: position and straight-alpha channels in
/// `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRamp {
    /// Position along the gradient.
    pub stop: f32,
    /// Red.
    pub red: f32,
    /// Green.
    pub green: f32,
    /// Blue.
    pub blue: f32,
    /// Alpha.
    pub alpha: f32,
}

/// Everything needed to create a linear gradient on the GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradientDesc {
    /// Color stops in ascending position order.
    pub stops: Vec<ColorRamp>,
    /// Gradient start point.
    pub start: (f32, f32),
    /// Gradient end point.
    pub end: (f32, f32),
    /// Spread outside the ramp.
    pub spread: SpreadMode,
    /// Gradient-to-target transform.
    pub matrix: Matrix,
}

/// A gradient living in GPU memory until released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GradientHandle(pub u32);

/// Operations of a VGLite-style 2D GPU.
pub trait GpuDevice {
    /// Initializes the driver with a tessellation window.
    fn init(&mut self, tessellation_width: u32, tessellation_height: u32) -> Result<(), GpuError>;

    /// Releases driver resources.
    fn close(&mut self);

    /// Enables premultiplied-alpha blending.
    fn enable_premultiply(&mut self) -> Result<(), GpuError>;

    /// Disables premultiplied-alpha blending.
    fn disable_premultiply(&mut self);

    /// Submits queued work and waits for it to complete.
    fn finish(&mut self) -> Result<(), GpuError>;

    /// Submits queued work without waiting.
    fn flush(&mut self) -> Result<(), GpuError>;

    /// Fills `rect` of `target` with `color` (`0xAABBGGRR`), no blending.
    fn clear(&mut self, target: &GpuBuffer, rect: Rect, color: u32) -> Result<(), GpuError>;

    /// Fills `path` into `target`.
    fn draw(
        &mut self,
        target: &GpuBuffer,
        path: &PathData,
        rule: FillRule,
        matrix: &Matrix,
        blend: GpuBlend,
        color: u32,
    ) -> Result<(), GpuError>;

    /// Copies all of `source` into `target` through `matrix`.
    fn blit(
        &mut self,
        target: &GpuBuffer,
        source: &GpuBuffer,
        matrix: &Matrix,
        blend: GpuBlend,
        color: u32,
        filter: Filter,
    ) -> Result<(), GpuError>;

    /// Copies the `[x, y, width, height]` region of `source` into `target`
    /// through `matrix`.
    fn blit_rect(
        &mut self,
        target: &GpuBuffer,
        source: &GpuBuffer,
        rect: [u32; 4],
        matrix: &Matrix,
        blend: GpuBlend,
        color: u32,
        filter: Filter,
    ) -> Result<(), GpuError>;

    /// Sets the scissor rectangle used while scissoring is enabled.
    fn set_scissor(&mut self, rect: Rect);

    /// Enables scissoring.
    fn enable_scissor(&mut self);

    /// Disables scissoring.
    fn disable_scissor(&mut self);

    /// Copies a path stream into GPU memory.
    fn upload_path(&mut self, path: &PathData) -> Result<(), GpuError>;

    /// Releases a path's GPU memory.
    fn clear_path(&mut self, path: &PathData) -> Result<(), GpuError>;

    /// Creates a linear gradient.
    fn create_linear_gradient(
        &mut self,
        gradient: &LinearGradientDesc,
    ) -> Result<GradientHandle, GpuError>;

    /// Fills `path` with a gradient.
    fn draw_linear_gradient(
        &mut self,
        target: &GpuBuffer,
        path: &PathData,
        rule: FillRule,
        matrix: &Matrix,
        gradient: GradientHandle,
        blend: GpuBlend,
        filter: Filter,
    ) -> Result<(), GpuError>;

    /// Releases a gradient. Only safe once the GPU has finished with it.
    fn release_linear_gradient(&mut self, gradient: GradientHandle);
}

impl<D: GpuDevice + ?Sized> GpuDevice for &mut D {
    fn init(&mut self, tessellation_width: u32, tessellation_height: u32) -> Result<(), GpuError> {
        (**self).init(tessellation_width, tessellation_height)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn enable_premultiply(&mut self) -> Result<(), GpuError> {
        (**self).enable_premultiply()
    }

    fn disable_premultiply(&mut self) {
        (**self).disable_premultiply();
    }

    fn finish(&mut self) -> Result<(), GpuError> {
        (**self).finish()
    }

    fn flush(&mut self) -> Result<(), GpuError> {
        (**self).flush()
    }

    fn clear(&mut self, target: &GpuBuffer, rect: Rect, color: u32) -> Result<(), GpuError> {
        (**self).clear(target, rect, color)
    }

    fn draw(
        &mut self,
        target: &GpuBuffer,
        path: &PathData,
        rule: FillRule,
        matrix: &Matrix,
        blend: GpuBlend,
        color: u32,
    ) -> Result<(), GpuError> {
        (**self).draw(target, path, rule, matrix, blend, color)
    }

    fn blit(
        &mut self,
        target: &GpuBuffer,
        source: &GpuBuffer,
        matrix: &Matrix,
        blend: GpuBlend,
        color: u32,
        filter: Filter,
    ) -> Result<(), GpuError> {
        (**self).blit(target, source, matrix, blend, color, filter)
    }

    fn blit_rect(
        &mut self,
        target: &GpuBuffer,
        source: &GpuBuffer,
        rect: [u32; 4],
        matrix: &Matrix,
        blend: GpuBlend,
        color: u32,
        filter: Filter,
    ) -> Result<(), GpuError> {
        (**self).blit_rect(target, source, rect, matrix, blend, color, filter)
    }

    fn set_scissor(&mut self, rect: Rect) {
        (**self).set_scissor(rect);
    }

    fn enable_scissor(&mut self) {
        (**self).enable_scissor();
    }

    fn disable_scissor(&mut self) {
        (**self).disable_scissor();
    }

    fn upload_path(&mut self, path: &PathData) -> Result<(), GpuError> {
        (**self).upload_path(path)
    }

    fn clear_path(&mut self, path: &PathData) -> Result<(), GpuError> {
        (**self).clear_path(path)
    }

    fn create_linear_gradient(
        &mut self,
        gradient: &LinearGradientDesc,
    ) -> Result<GradientHandle, GpuError> {
        (**self).create_linear_gradient(gradient)
    }

    fn draw_linear_gradient(
        &mut self,
        target: &GpuBuffer,
        path: &PathData,
        rule: FillRule,
        matrix: &Matrix,
        gradient: GradientHandle,
        blend: GpuBlend,
        filter: Filter,
    ) -> Result<(), GpuError> {
        (**self).draw_linear_gradient(target, path, rule, matrix, gradient, blend, filter)
    }

    fn release_linear_gradient(&mut self, gradient: GradientHandle) {
        (**self).release_linear_gradient(gradient);
    }
}
