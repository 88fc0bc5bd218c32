// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording doubles for the GPU and the software renderer.

use alloc::vec::Vec;

use overlay_core::format::Rgba32;
use overlay_core::geometry::{Point, Rect};
use overlay_core::surface::{SurfaceDescriptor, Texture};

use crate::buffer::GpuBuffer;
use crate::device::{
    FillRule, Filter, GpuBlend, GpuDevice, GpuError, GradientHandle, LinearGradientDesc,
};
use crate::engine::SoftwareRenderer;
use crate::path::PathData;
use crate::transform::{Matrix, Transform};

/// One call made on a [`RecordingDevice`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum GpuCall {
    Init(u32, u32),
    Close,
    EnablePremultiply,
    DisablePremultiply,
    Finish,
    Flush,
    Clear {
        rect: Rect,
        color: u32,
    },
    Draw {
        ops: Vec<u8>,
        rule: FillRule,
        matrix: Matrix,
        blend: GpuBlend,
        color: u32,
    },
    Blit {
        target: GpuBuffer,
        source: GpuBuffer,
        matrix: Matrix,
        blend: GpuBlend,
        color: u32,
        filter: Filter,
    },
    BlitRect {
        source: GpuBuffer,
        rect: [u32; 4],
        matrix: Matrix,
        blend: GpuBlend,
        color: u32,
        filter: Filter,
    },
    SetScissor(Rect),
    EnableScissor,
    DisableScissor,
    UploadPath,
    ClearPath,
    CreateGradient(LinearGradientDesc),
    DrawGradient {
        gradient: GradientHandle,
        rule: FillRule,
        blend: GpuBlend,
        filter: Filter,
    },
    ReleaseGradient(GradientHandle),
}

/// A [`GpuDevice`] that records every call.
#[derive(Debug, Default)]
pub(crate) struct RecordingDevice {
    pub(crate) calls: Vec<GpuCall>,
    pub(crate) fail_init: bool,
    pub(crate) fail_premultiply: bool,
    pub(crate) fail_upload: bool,
    next_gradient: u32,
}

impl RecordingDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded calls equal to `call`.
    pub(crate) fn count(&self, call: &GpuCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl GpuDevice for RecordingDevice {
    fn init(&mut self, w: u32, h: u32) -> Result<(), GpuError> {
        self.calls.push(GpuCall::Init(w, h));
        if self.fail_init {
            Err(GpuError::Sdk(-1))
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {
        self.calls.push(GpuCall::Close);
    }

    fn enable_premultiply(&mut self) -> Result<(), GpuError> {
        self.calls.push(GpuCall::EnablePremultiply);
        if self.fail_premultiply {
            Err(GpuError::Sdk(-2))
        } else {
            Ok(())
        }
    }

    fn disable_premultiply(&mut self) {
        self.calls.push(GpuCall::DisablePremultiply);
    }

    fn finish(&mut self) -> Result<(), GpuError> {
        self.calls.push(GpuCall::Finish);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), GpuError> {
        self.calls.push(GpuCall::Flush);
        Ok(())
    }

    fn clear(&mut self, _: &GpuBuffer, rect: Rect, color: u32) -> Result<(), GpuError> {
        self.calls.push(GpuCall::Clear { rect, color });
        Ok(())
    }

    fn draw(
        &mut self,
        _: &GpuBuffer,
        path: &PathData,
        rule: FillRule,
        matrix: &Matrix,
        blend: GpuBlend,
        color: u32,
    ) -> Result<(), GpuError> {
        self.calls.push(GpuCall::Draw {
            ops: path.ops().unwrap_or_default(),
            rule,
            matrix: *matrix,
            blend,
            color,
        });
        Ok(())
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
        self.calls.push(GpuCall::Blit {
            target: *target,
            source: *source,
            matrix: *matrix,
            blend,
            color,
            filter,
        });
        Ok(())
    }

    fn blit_rect(
        &mut self,
        _: &GpuBuffer,
        source: &GpuBuffer,
        rect: [u32; 4],
        matrix: &Matrix,
        blend: GpuBlend,
        color: u32,
        filter: Filter,
    ) -> Result<(), GpuError> {
        self.calls.push(GpuCall::BlitRect {
            source: *source,
            rect,
            matrix: *matrix,
            blend,
            color,
            filter,
        });
        Ok(())
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.calls.push(GpuCall::SetScissor(rect));
    }

    fn enable_scissor(&mut self) {
        self.calls.push(GpuCall::EnableScissor);
    }

    fn disable_scissor(&mut self) {
        self.calls.push(GpuCall::DisableScissor);
    }

    fn upload_path(&mut self, _: &PathData) -> Result<(), GpuError> {
        self.calls.push(GpuCall::UploadPath);
        if self.fail_upload {
            Err(GpuError::PathUpload(-3))
        } else {
            Ok(())
        }
    }

    fn clear_path(&mut self, _: &PathData) -> Result<(), GpuError> {
        self.calls.push(GpuCall::ClearPath);
        Ok(())
    }

    fn create_linear_gradient(
        &mut self,
        gradient: &LinearGradientDesc,
    ) -> Result<GradientHandle, GpuError> {
        self.calls.push(GpuCall::CreateGradient(gradient.clone()));
        self.next_gradient += 1;
        Ok(GradientHandle(self.next_gradient))
    }

    fn draw_linear_gradient(
        &mut self,
        _: &GpuBuffer,
        _: &PathData,
        rule: FillRule,
        _: &Matrix,
        gradient: GradientHandle,
        blend: GpuBlend,
        filter: Filter,
    ) -> Result<(), GpuError> {
        self.calls.push(GpuCall::DrawGradient {
            gradient,
            rule,
            blend,
            filter,
        });
        Ok(())
    }

    fn release_linear_gradient(&mut self, gradient: GradientHandle) {
        self.calls.push(GpuCall::ReleaseGradient(gradient));
    }
}

/// One call made on a [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CpuCall {
    Image {
        target: usize,
        image: usize,
        dest: Point,
    },
    AlphaMap {
        alpha_map: usize,
        color: Rgba32,
        const_alpha: u16,
    },
    Transformed {
        texture: usize,
        transform: Transform,
    },
}

/// A [`SoftwareRenderer`] that records every call.
#[derive(Debug, Default)]
pub(crate) struct RecordingRenderer {
    pub(crate) calls: Vec<CpuCall>,
}

impl SoftwareRenderer for RecordingRenderer {
    fn blend_image(
        &mut self,
        target: &SurfaceDescriptor,
        image: &Texture,
        dest: Point,
        _: Rect,
        _: u16,
    ) {
        self.calls.push(CpuCall::Image {
            target: target.address,
            image: image.surface.address,
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
        const_alpha: u16,
    ) {
        self.calls.push(CpuCall::AlphaMap {
            alpha_map: alpha_map.surface.address,
            color,
            const_alpha,
        });
    }

    fn blend_transformed(
        &mut self,
        _: &SurfaceDescriptor,
        texture: &Texture,
        transform: &Transform,
        _: kurbo::Point,
        _: kurbo::Rect,
        _: Rect,
        _: Rgba32,
        _: u16,
    ) {
        self.calls.push(CpuCall::Transformed {
            texture: texture.surface.address,
            transform: *transform,
        });
    }
}
