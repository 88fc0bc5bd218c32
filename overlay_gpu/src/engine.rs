// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing engine adapter.
//!
//! [`DrawingEngine`] receives the GUI engine's draw calls for the bound item
//! layer buffer and routes each one to the GPU or to a [`SoftwareRenderer`].
//! Sources the GPU cannot sample (indexed, 24-bit, 1-bit, and run-length
//! encoded formats) go to the CPU. Before the CPU touches the target, queued
//! GPU work is drained so the two never write the same pixels out of order.
//!
//! Gradients live in GPU memory that the GPU reads while executing the
//! queued batch, so they are released only after the next
//! [`finish`](DrawingEngine::finish).

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Stroke;
use overlay_core::error::{ErrorCode, fatal};
use overlay_core::format::{PixelFormat, Rgba32};
use overlay_core::geometry::{Point, Rect};
use overlay_core::memory::MemoryAllocator;
use overlay_core::surface::{SurfaceDescriptor, Texture};
use overlay_core::trace::Tracer;

use crate::buffer::GpuBuffer;
use crate::config::GpuConfig;
use crate::device::{
    ColorRamp, FillRule, Filter, GpuBlend, GpuDevice, GradientHandle, LinearGradientDesc,
    SpreadMode,
};
use crate::path::{GpuPath, KurboStroker, PathData, PathStroker, rect_path, rounded_rect_path};
use crate::rotation_cache::{CacheKey, RotationCache};
use crate::transform::{Matrix, Transform};

/// How a primitive combines with the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Replace the target pixels.
    Source,
    /// Composite over the target pixels.
    #[default]
    SourceOver,
}

/// A color stop of a [`LinearGradient`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient, nominally `0.0..=1.0`.
    pub position: f32,
    /// Straight-alpha color.
    pub color: Rgba32,
}

/// A linear gradient paint.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    /// Start point.
    pub start: kurbo::Point,
    /// End point.
    pub end: kurbo::Point,
    /// Stops in ascending position order.
    pub stops: Vec<GradientStop>,
    /// Spread outside the stops.
    pub spread: SpreadMode,
    /// Gradient-to-target transform.
    pub transform: Transform,
}

impl LinearGradient {
    /// Converts to the GPU description, folding `opacity` (`0..=256`) into
    /// every stop's alpha.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "the GPU works in single precision")]
    pub fn to_gpu(&self, opacity: u16) -> LinearGradientDesc {
        let opacity = f32::from(opacity) / 256.0;
        LinearGradientDesc {
            stops: self
                .stops
                .iter()
                .map(|s| ColorRamp {
                    stop: s.position.min(1.0),
                    red: f32::from(s.color.red) / 255.0,
                    green: f32::from(s.color.green) / 255.0,
                    blue: f32::from(s.color.blue) / 255.0,
                    alpha: f32::from(s.color.alpha) / 255.0 * opacity,
                })
                .collect(),
            start: (self.start.x as f32, self.start.y as f32),
            end: (self.end.x as f32, self.end.y as f32),
            spread: self.spread,
            matrix: Matrix::from_transform(&self.transform),
        }
    }
}

/// Paint for a path fill or stroke.
#[derive(Clone, Debug, PartialEq)]
pub enum Brush {
    /// A single color.
    Solid(Rgba32),
    /// A linear gradient.
    LinearGradient(LinearGradient),
}

/// CPU fallback for sources the GPU cannot sample.
///
/// `const_alpha` is in `0..=256`, where 256 is fully opaque.
pub trait SoftwareRenderer {
    /// Blends the `source` region of `image` at `dest` into `target`.
    fn blend_image(
        &mut self,
        target: &SurfaceDescriptor,
        image: &Texture,
        dest: Point,
        source: Rect,
        const_alpha: u16,
    );

    /// Blends the `source` region of a coverage mask tinted with `color` at
    /// `dest` into `target`.
    fn blend_alpha_map(
        &mut self,
        target: &SurfaceDescriptor,
        alpha_map: &Texture,
        dest: Point,
        source: Rect,
        color: Rgba32,
        const_alpha: u16,
    );

    /// Blends the `source` region of `texture` through `transform`, placed
    /// at `dest`.
    fn blend_transformed(
        &mut self,
        target: &SurfaceDescriptor,
        texture: &Texture,
        transform: &Transform,
        dest: kurbo::Point,
        source: kurbo::Rect,
        clip: Rect,
        color: Rgba32,
        const_alpha: u16,
    );
}

/// Scales an 8-bit alpha by `const_alpha` in `0..=256`.
fn scale_alpha(alpha: u8, const_alpha: u16) -> u8 {
    u8::try_from(u32::from(alpha) * u32::from(const_alpha) / 256).unwrap_or(u8::MAX)
}

fn with_alpha(color: Rgba32, alpha: u8) -> u32 {
    Rgba32 { alpha, ..color }.to_abgr()
}

fn to_kurbo(rect: Rect) -> kurbo::Rect {
    kurbo::Rect::new(
        f64::from(rect.x),
        f64::from(rect.y),
        f64::from(rect.right()),
        f64::from(rect.bottom()),
    )
}

#[expect(clippy::cast_possible_truncation, reason = "source rects are whole pixels")]
fn source_rect(rect: kurbo::Rect) -> [u32; 4] {
    [
        rect.x0 as u32,
        rect.y0 as u32,
        rect.width() as u32,
        rect.height() as u32,
    ]
}

/// Negative origins are clamped to the texture edge.
fn region_rect(rect: Rect) -> [u32; 4] {
    [
        u32::try_from(rect.x).unwrap_or(0),
        u32::try_from(rect.y).unwrap_or(0),
        rect.width,
        rect.height,
    ]
}

// ---------------------------------------------------------------------------
// TextureRing
// ---------------------------------------------------------------------------

/// Fixed set of texture descriptors reused round-robin.
///
/// Each draw call prepares its source in the next slot. The GPU may still
/// reference a slot from a queued call, so the ring must be at least as
/// large as the number of textured calls between two finishes that share a
/// slot's lifetime.
#[derive(Debug)]
struct TextureRing {
    slots: Vec<Option<GpuBuffer>>,
    next: usize,
}

impl TextureRing {
    fn new(size: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize(size.max(1), None);
        Self { slots, next: 0 }
    }

    fn prepare(&mut self, buffer: GpuBuffer) -> GpuBuffer {
        let slot = self.next;
        self.next = (self.next + 1) % self.slots.len();
        self.slots[slot] = Some(buffer);
        buffer
    }
}

// ---------------------------------------------------------------------------
// DrawingEngine
// ---------------------------------------------------------------------------

/// GPU drawing with CPU fallback into one bound target buffer.
pub struct DrawingEngine<D, R, A> {
    device: D,
    renderer: R,
    config: GpuConfig,
    target: Option<(SurfaceDescriptor, GpuBuffer)>,
    textures: TextureRing,
    /// Gradients the GPU may still read; released on the next finish.
    pending_gradients: Vec<GradientHandle>,
    cache: RotationCache<A>,
    premultiply: bool,
    stroker: Box<dyn PathStroker>,
    stroke_style: Stroke,
}

impl<D: fmt::Debug, R: fmt::Debug, A: fmt::Debug> fmt::Debug for DrawingEngine<D, R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingEngine")
            .field("device", &self.device)
            .field("renderer", &self.renderer)
            .field("config", &self.config)
            .field("target", &self.target)
            .field("pending_gradients", &self.pending_gradients)
            .field("cache", &self.cache)
            .field("premultiply", &self.premultiply)
            .field("stroke_style", &self.stroke_style)
            .finish_non_exhaustive()
    }
}

impl<D: GpuDevice, R: SoftwareRenderer, A: MemoryAllocator> DrawingEngine<D, R, A> {
    /// Creates an engine. The rotation cache draws from `cache_allocator`.
    ///
    /// Call [`init`](Self::init) before drawing.
    pub fn new(device: D, renderer: R, cache_allocator: A, config: GpuConfig) -> Self {
        Self {
            device,
            renderer,
            textures: TextureRing::new(config.texture_ring_size),
            cache: RotationCache::new(
                cache_allocator,
                config.preprocess_cache_capacity,
                config.image_alignment,
            ),
            config,
            target: None,
            pending_gradients: Vec::new(),
            premultiply: false,
            stroker: Box::new(KurboStroker),
            stroke_style: Stroke::new(1.0),
        }
    }

    /// Brings up the GPU.
    ///
    /// A failure to enable premultiplied blending is logged and drawing
    /// continues with straight alpha.
    ///
    /// # Panics
    ///
    /// Halts with [`ErrorCode::GpuInitializationFailed`] if the driver
    /// cannot be initialized.
    pub fn init(&mut self) {
        let (w, h) = self.config.tessellation_size;
        if let Err(err) = self.device.init(w, h) {
            log::error!("gpu init failed: {err}");
            fatal(ErrorCode::GpuInitializationFailed, 0);
        }
        if self.config.premultiply {
            match self.device.enable_premultiply() {
                Ok(()) => self.premultiply = true,
                Err(err) => log::warn!("premultiplied blending unavailable: {err}"),
            }
        }
    }

    /// Shuts the GPU down after draining it.
    pub fn close(&mut self) {
        self.finish();
        self.cache.clear();
        self.device.close();
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GpuConfig {
        &self.config
    }

    /// Returns the device.
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns the device mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Returns the software renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Returns the rotation cache.
    #[must_use]
    pub fn rotation_cache(&self) -> &RotationCache<A> {
        &self.cache
    }

    /// Returns whether premultiplied blending is active.
    #[must_use]
    pub fn is_premultiplied(&self) -> bool {
        self.premultiply
    }

    /// Replaces the stroker used to outline path strokes.
    pub fn set_stroker(&mut self, stroker: Box<dyn PathStroker>) {
        self.stroker = stroker;
    }

    /// Sets the width, joins, and caps used by subsequent strokes.
    pub fn set_stroke_properties(&mut self, style: Stroke) {
        self.stroke_style = style;
    }

    /// Binds the buffer subsequent calls draw into.
    ///
    /// # Panics
    ///
    /// Halts with [`ErrorCode::UnsupportedPixelFormat`] if the GPU cannot
    /// render into the surface's format.
    pub fn set_buffer(&mut self, surface: SurfaceDescriptor) {
        let Some(buffer) = GpuBuffer::from_surface(&surface) else {
            log::error!("gpu cannot render into {:?}", surface.format);
            fatal(
                ErrorCode::UnsupportedPixelFormat,
                i64::from(surface.format as u8),
            );
        };
        self.target = Some((surface, buffer));
    }

    /// Unbinds the target buffer.
    pub fn release_buffer(&mut self) {
        self.target = None;
    }

    /// Returns the bound target surface, if any.
    #[must_use]
    pub fn buffer(&self) -> Option<&SurfaceDescriptor> {
        self.target.as_ref().map(|(surface, _)| surface)
    }

    #[track_caller]
    fn target(&self) -> (SurfaceDescriptor, GpuBuffer) {
        match self.target {
            Some(target) => target,
            None => fatal(ErrorCode::DrawingBufferNotSet, 0),
        }
    }

    /// Submits queued GPU work without waiting.
    pub fn flush(&mut self) {
        if let Err(err) = self.device.flush() {
            log::error!("gpu flush failed: {err}");
        }
    }

    /// Waits for all queued GPU work, then releases deferred gradients.
    pub fn finish(&mut self) {
        if let Err(err) = self.device.finish() {
            log::error!("gpu finish failed: {err}");
        }
        for gradient in self.pending_gradients.drain(..) {
            self.device.release_linear_gradient(gradient);
        }
    }

    /// Makes the target safe for CPU access.
    pub fn synchronize_for_cpu_access(&mut self) {
        self.finish();
    }

    /// Drops every cached copy of the texture at `address`.
    pub fn remove_texture(&mut self, address: usize) {
        self.cache.remove(address);
    }

    /// Forwards recorded rotation cache events into `tracer`.
    pub fn drain_trace(&mut self, tracer: &mut Tracer<'_>) {
        self.cache.drain_trace(tracer);
    }

    // -- Rectangles --------------------------------------------------------

    /// Fills `rect` with `color`, replacing the target pixels.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba32) {
        let (_, target) = self.target();
        if let Err(err) = self.device.clear(&target, rect, color.to_abgr()) {
            log::error!("gpu clear failed: {err}");
        }
    }

    /// Draws `rect` in `color`.
    ///
    /// Replace mode and opaque colors use a plain fill; anything else is a
    /// blended quad.
    pub fn blend_rect(&mut self, rect: Rect, color: Rgba32, mode: BlendMode) {
        if mode == BlendMode::Source || color.is_opaque() {
            self.fill_rect(rect, color);
            return;
        }
        let (_, target) = self.target();
        let path = rect_path(to_kurbo(rect));
        if let Err(err) = self.device.draw(
            &target,
            &path,
            FillRule::EvenOdd,
            &Matrix::IDENTITY,
            GpuBlend::SrcOver,
            color.to_abgr(),
        ) {
            log::error!("gpu rect draw failed: {err}");
        }
    }

    /// Draws a rounded rectangle clipped to `clip`.
    pub fn blend_rounded_rect(
        &mut self,
        rect: kurbo::Rect,
        radius: f64,
        clip: Rect,
        color: Rgba32,
        mode: BlendMode,
    ) {
        let (_, target) = self.target();
        let path = rounded_rect_path(rect, radius);
        let blend = match mode {
            BlendMode::SourceOver => GpuBlend::SrcOver,
            BlendMode::Source => GpuBlend::None,
        };
        self.device.set_scissor(clip);
        self.device.enable_scissor();
        if let Err(err) = self.device.draw(
            &target,
            &path,
            FillRule::EvenOdd,
            &Matrix::IDENTITY,
            blend,
            color.to_abgr(),
        ) {
            log::error!("gpu rounded rect draw failed: {err}");
        }
        self.device.disable_scissor();
    }

    // -- Images ------------------------------------------------------------

    fn prepare_texture(&mut self, texture: &Texture) -> Option<GpuBuffer> {
        let buffer = GpuBuffer::from_surface(&texture.surface)?;
        Some(self.textures.prepare(buffer))
    }

    /// Blends the `source` region of `image` at `dest`. `const_alpha` is in
    /// `0..=256`.
    ///
    /// No scissor is set; the caller bounds the draw through `source`.
    pub fn blend_image(&mut self, image: &Texture, dest: Point, source: Rect, const_alpha: u16) {
        let (surface, _) = self.target();
        match self.prepare_texture(image) {
            Some(prepared) => {
                let color = with_alpha(Rgba32::WHITE, scale_alpha(0xff, const_alpha));
                self.blend_texture(&prepared, dest, source, color);
            }
            None => {
                self.synchronize_for_cpu_access();
                self.renderer
                    .blend_image(&surface, image, dest, source, const_alpha);
            }
        }
    }

    /// Blends the `source` region of a coverage mask tinted with `color` at
    /// `dest`.
    ///
    /// Only 8-bit masks are drawn on the GPU.
    pub fn blend_alpha_map(
        &mut self,
        alpha_map: &Texture,
        dest: Point,
        source: Rect,
        color: Rgba32,
        const_alpha: u16,
    ) {
        let (surface, _) = self.target();
        if alpha_map.surface.format == PixelFormat::Alpha8
            && let Some(prepared) = self.prepare_texture(alpha_map)
        {
            let abgr = with_alpha(color, scale_alpha(color.alpha, const_alpha));
            self.blend_texture(&prepared, dest, source, abgr);
        } else {
            self.synchronize_for_cpu_access();
            self.renderer
                .blend_alpha_map(&surface, alpha_map, dest, source, color, const_alpha);
        }
    }

    /// Untransformed blit of the `region` of `source`: identity plus
    /// translation, point sampled.
    fn blend_texture(&mut self, source: &GpuBuffer, dest: Point, region: Rect, color: u32) {
        let (_, target) = self.target();
        let matrix = Matrix::IDENTITY.translated(dest.x as f32, dest.y as f32);
        if let Err(err) = self.device.blit_rect(
            &target,
            source,
            region_rect(region),
            &matrix,
            GpuBlend::SrcOver,
            color,
            Filter::Point,
        ) {
            log::error!("gpu blit failed: {err}");
        }
    }

    /// Blends the `source` region of `image` through `transform`, placed at
    /// `dest`. Rotated images are drawn from the rotation cache.
    pub fn blend_transformed_image(
        &mut self,
        image: &Texture,
        transform: &Transform,
        dest: kurbo::Point,
        source: kurbo::Rect,
        clip: Rect,
        const_alpha: u16,
    ) {
        self.blend_transformed(image, transform, dest, source, clip, Rgba32::WHITE, const_alpha);
    }

    /// Blends the `source` region of a coverage mask through `transform`,
    /// tinted with `color`.
    pub fn blend_transformed_alpha_map(
        &mut self,
        alpha_map: &Texture,
        transform: &Transform,
        dest: kurbo::Point,
        source: kurbo::Rect,
        clip: Rect,
        color: Rgba32,
    ) {
        if alpha_map.surface.format == PixelFormat::Alpha8 {
            self.blend_transformed(alpha_map, transform, dest, source, clip, color, 256);
        } else {
            let (surface, _) = self.target();
            self.synchronize_for_cpu_access();
            self.renderer.blend_transformed(
                &surface, alpha_map, transform, dest, source, clip, color, 256,
            );
        }
    }

    fn blend_transformed(
        &mut self,
        texture: &Texture,
        transform: &Transform,
        dest: kurbo::Point,
        source: kurbo::Rect,
        clip: Rect,
        color: Rgba32,
        const_alpha: u16,
    ) {
        let (surface, target) = self.target();
        let Some(prepared) = self.prepare_texture(texture) else {
            self.synchronize_for_cpu_access();
            self.renderer.blend_transformed(
                &surface,
                texture,
                transform,
                dest,
                source,
                clip,
                color,
                const_alpha,
            );
            return;
        };
        let image = if texture.rotated {
            let key = CacheKey::from(texture);
            self.cache
                .get(key)
                .or_else(|| self.cache.add(key, &prepared, &mut self.device))
                .unwrap_or(prepared)
        } else {
            prepared
        };

        if !image.stride.is_multiple_of(16) {
            log::debug!("texture stride {} is not a multiple of 16", image.stride);
        }
        if !image.address.is_multiple_of(self.config.image_alignment) {
            log::debug!(
                "texture address {:#x} is not {}-byte aligned",
                image.address,
                self.config.image_alignment
            );
        }

        let matrix = Matrix::for_blit(transform, dest);
        let filter = if self.config.point_filter_for_unit_scale && transform.is_unit_axis_scale()
        {
            Filter::Point
        } else {
            Filter::Bilinear
        };
        let abgr = with_alpha(color, scale_alpha(color.alpha, const_alpha));

        self.device.set_scissor(clip);
        self.device.enable_scissor();
        if let Err(err) = self.device.blit_rect(
            &target,
            &image,
            source_rect(source),
            &matrix,
            GpuBlend::SrcOver,
            abgr,
            filter,
        ) {
            log::error!("gpu transformed blit failed: {err}");
        }
        self.device.disable_scissor();
    }

    // -- Paths -------------------------------------------------------------

    /// Fills and/or strokes `path` through `transform`, clipped to `clip`.
    ///
    /// Streams are built on first use and cached on the path. `opacity` is
    /// in `0..=256`.
    pub fn blend_path(
        &mut self,
        path: &mut GpuPath,
        transform: &Transform,
        clip: Rect,
        fill: Option<&Brush>,
        stroke: Option<&Brush>,
        opacity: u16,
    ) {
        let (_, target) = self.target();
        let matrix = Matrix::from_transform(transform);
        self.device.set_scissor(clip);
        self.device.enable_scissor();

        if let Some(brush) = fill {
            let rule = path.fill_rule().to_gpu();
            let data = path.fill_data();
            self.paint(&target, data, rule, &matrix, brush, opacity);
        }
        if let Some(brush) = stroke {
            let data = path.stroke_data(self.stroker.as_mut(), &self.stroke_style);
            self.paint(&target, data, FillRule::NonZero, &matrix, brush, opacity);
        }

        self.device.disable_scissor();
    }

    fn paint(
        &mut self,
        target: &GpuBuffer,
        data: &PathData,
        rule: FillRule,
        matrix: &Matrix,
        brush: &Brush,
        opacity: u16,
    ) {
        if let Err(err) = self.device.upload_path(data) {
            log::debug!("path upload failed: {err}");
        }
        match brush {
            Brush::Solid(color) => {
                let abgr = with_alpha(*color, scale_alpha(color.alpha, opacity));
                if let Err(err) =
                    self.device
                        .draw(target, data, rule, matrix, GpuBlend::SrcOver, abgr)
                {
                    log::error!("gpu path draw failed: {err}");
                }
            }
            Brush::LinearGradient(gradient) => {
                let gradient = match self.device.create_linear_gradient(&gradient.to_gpu(opacity))
                {
                    Ok(handle) => handle,
                    Err(err) => {
                        log::error!("gradient creation failed: {err}");
                        return;
                    }
                };
                self.pending_gradients.push(gradient);
                if self.premultiply {
                    self.device.disable_premultiply();
                }
                if let Err(err) = self.device.draw_linear_gradient(
                    target,
                    data,
                    rule,
                    matrix,
                    gradient,
                    GpuBlend::SrcOver,
                    Filter::Point,
                ) {
                    log::error!("gpu gradient draw failed: {err}");
                }
                if self.premultiply
                    && let Err(err) = self.device.enable_premultiply()
                {
                    log::warn!("premultiplied blending could not be restored: {err}");
                    self.premultiply = false;
                }
            }
        }
    }

    /// Releases the GPU memory of `path`'s streams.
    pub fn release_path(&mut self, path: &mut GpuPath) {
        path.release(&mut self.device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ImageMode;
    use crate::path::{PathSegment, op};
    use crate::testing::{CpuCall, GpuCall, RecordingDevice, RecordingRenderer};
    use overlay_core::geometry::Size;
    use overlay_core::memory::BlockAllocator;

    type Engine = DrawingEngine<RecordingDevice, RecordingRenderer, BlockAllocator>;

    const TARGET: usize = 0x2000_0000;

    fn engine() -> Engine {
        let config = GpuConfig {
            preprocess_cache_capacity: 64 * 1024,
            ..GpuConfig::rt1170()
        };
        let mut e = DrawingEngine::new(
            RecordingDevice::new(),
            RecordingRenderer::default(),
            BlockAllocator::new(0x3000_0000, 64 * 1024, 256),
            config,
        );
        e.init();
        e.set_buffer(SurfaceDescriptor::packed(
            TARGET,
            Size::new(100, 100),
            PixelFormat::Argb32,
        ));
        e.device_mut().calls.clear();
        e
    }

    fn texture(address: usize, format: PixelFormat) -> Texture {
        Texture::new(SurfaceDescriptor::packed(address, Size::new(16, 16), format))
    }

    fn clip() -> Rect {
        Rect::new(0, 0, 100, 100)
    }

    #[test]
    fn init_enables_premultiply() {
        let mut e = DrawingEngine::new(
            RecordingDevice::new(),
            RecordingRenderer::default(),
            BlockAllocator::new(0, 1024, 256),
            GpuConfig::rt1170(),
        );
        e.init();
        assert_eq!(
            e.device().calls,
            [GpuCall::Init(64, 64), GpuCall::EnablePremultiply]
        );
        assert!(e.is_premultiplied(), "premultiply is active");
    }

    #[test]
    fn premultiply_failure_is_not_fatal() {
        let mut device = RecordingDevice::new();
        device.fail_premultiply = true;
        let mut e = DrawingEngine::new(
            device,
            RecordingRenderer::default(),
            BlockAllocator::new(0, 1024, 256),
            GpuConfig::rt1170(),
        );
        e.init();
        assert!(!e.is_premultiplied(), "falls back to straight alpha");
    }

    #[test]
    #[should_panic(expected = "gpu initialization failed")]
    fn init_failure_is_fatal() {
        let mut device = RecordingDevice::new();
        device.fail_init = true;
        let mut e = DrawingEngine::new(
            device,
            RecordingRenderer::default(),
            BlockAllocator::new(0, 1024, 256),
            GpuConfig::rt1170(),
        );
        e.init();
    }

    #[test]
    #[should_panic(expected = "drawing buffer not set")]
    fn drawing_without_buffer_is_fatal() {
        let mut e = engine();
        e.release_buffer();
        e.fill_rect(clip(), Rgba32::BLACK);
    }

    #[test]
    fn opaque_or_replace_rect_is_a_fill() {
        let mut e = engine();
        let rect = Rect::new(1, 2, 3, 4);
        e.blend_rect(rect, Rgba32::new(1, 2, 3, 0xff), BlendMode::SourceOver);
        e.blend_rect(rect, Rgba32::new(1, 2, 3, 0x80), BlendMode::Source);
        assert_eq!(
            e.device().calls,
            [
                GpuCall::Clear {
                    rect,
                    color: 0xff03_0201
                },
                GpuCall::Clear {
                    rect,
                    color: 0x8003_0201
                },
            ]
        );
    }

    #[test]
    fn translucent_rect_is_a_blended_quad() {
        let mut e = engine();
        e.blend_rect(
            Rect::new(0, 0, 10, 10),
            Rgba32::new(0, 0, 0xff, 0x40),
            BlendMode::SourceOver,
        );
        assert_eq!(
            e.device().calls,
            [GpuCall::Draw {
                ops: alloc::vec![op::MOVE, op::LINE, op::LINE, op::LINE, op::END],
                rule: FillRule::EvenOdd,
                matrix: Matrix::IDENTITY,
                blend: GpuBlend::SrcOver,
                color: 0x40ff_0000,
            }]
        );
    }

    #[test]
    fn rounded_rect_is_scissored() {
        let mut e = engine();
        let clip = Rect::new(5, 5, 20, 20);
        e.blend_rounded_rect(
            kurbo::Rect::new(0.0, 0.0, 30.0, 30.0),
            4.0,
            clip,
            Rgba32::WHITE,
            BlendMode::Source,
        );
        let calls = &e.device().calls;
        assert_eq!(calls[0], GpuCall::SetScissor(clip));
        assert_eq!(calls[1], GpuCall::EnableScissor);
        assert!(
            matches!(calls[2], GpuCall::Draw { blend: GpuBlend::None, rule: FillRule::EvenOdd, .. }),
            "{:?}",
            calls[2]
        );
        assert_eq!(calls[3], GpuCall::DisableScissor);
    }

    #[test]
    fn blend_image_uses_point_filter_and_scaled_white() {
        let mut e = engine();
        e.blend_image(&texture(0x100, PixelFormat::Argb32), Point::new(7, 9), clip(), 128);
        let GpuCall::BlitRect {
            matrix,
            color,
            filter,
            source,
            ..
        } = blit_rect(&e)
        else {
            unreachable!()
        };
        assert_eq!(filter, Filter::Point);
        // 255 * 128 / 256 = 127
        assert_eq!(color, 0x7fff_ffff);
        assert_eq!(matrix, Matrix::IDENTITY.translated(7.0, 9.0));
        assert_eq!(source.image_mode, ImageMode::Multiply);
    }

    #[test]
    fn blend_image_blits_only_the_source_region() {
        let mut e = engine();
        e.blend_image(
            &texture(0x100, PixelFormat::Argb32),
            Point::new(3, 4),
            Rect::new(2, 6, 8, 5),
            256,
        );
        let GpuCall::BlitRect { rect, .. } = blit_rect(&e) else {
            unreachable!()
        };
        assert_eq!(rect, [2, 6, 8, 5]);
        assert!(
            !e.device()
                .calls
                .iter()
                .any(|c| matches!(c, GpuCall::SetScissor(_) | GpuCall::EnableScissor)),
            "untransformed blits are not scissored"
        );
    }

    #[test]
    fn alpha_map_region_reaches_the_gpu() {
        let mut e = engine();
        e.blend_alpha_map(
            &texture(0x100, PixelFormat::Alpha8),
            Point::ZERO,
            Rect::new(-4, 1, 12, 3),
            Rgba32::WHITE,
            256,
        );
        let GpuCall::BlitRect { rect, filter, .. } = blit_rect(&e) else {
            unreachable!()
        };
        assert_eq!(rect, [0, 1, 12, 3], "negative origin clamps to the edge");
        assert_eq!(filter, Filter::Point);
    }

    #[test]
    fn unsupported_formats_fall_back_to_cpu_after_gpu_sync() {
        let mut e = engine();
        e.blend_image(&texture(0x100, PixelFormat::RleArgb32), Point::ZERO, clip(), 256);
        e.blend_image(&texture(0x200, PixelFormat::Rgb332), Point::new(1, 1), clip(), 256);
        assert_eq!(e.device().count(&GpuCall::Finish), 2);
        assert_eq!(
            e.renderer().calls,
            [
                CpuCall::Image {
                    target: TARGET,
                    image: 0x100,
                    dest: Point::ZERO
                },
                CpuCall::Image {
                    target: TARGET,
                    image: 0x200,
                    dest: Point::new(1, 1)
                },
            ]
        );
    }

    #[test]
    fn alpha_maps_route_by_format() {
        let mut e = engine();
        let tint = Rgba32::new(0x10, 0x20, 0x30, 0xff);
        e.blend_alpha_map(&texture(0x100, PixelFormat::Alpha8), Point::ZERO, clip(), tint, 256);
        assert!(
            e.device()
                .calls
                .iter()
                .any(|c| matches!(c, GpuCall::BlitRect { color: 0xff30_2010, .. })),
            "A8 goes to the GPU"
        );
        e.blend_alpha_map(&texture(0x200, PixelFormat::Alpha1), Point::ZERO, clip(), tint, 100);
        assert_eq!(
            e.renderer().calls,
            [CpuCall::AlphaMap {
                alpha_map: 0x200,
                color: tint,
                const_alpha: 100
            }]
        );
    }

    fn blit_rect(e: &Engine) -> GpuCall {
        e.device()
            .calls
            .iter()
            .find(|c| matches!(c, GpuCall::BlitRect { .. }))
            .cloned()
            .unwrap()
    }

    #[test]
    fn unit_axis_scale_uses_point_filter() {
        let mut e = engine();
        let image = texture(0x100, PixelFormat::Argb32);
        e.blend_transformed_image(
            &image,
            &Transform::scale(2.0, 1.0),
            kurbo::Point::new(10.0, 20.0),
            kurbo::Rect::new(0.0, 0.0, 16.0, 16.0),
            clip(),
            256,
        );
        let GpuCall::BlitRect {
            filter,
            matrix,
            rect,
            color,
            ..
        } = blit_rect(&e)
        else {
            unreachable!()
        };
        assert_eq!(filter, Filter::Point);
        assert_eq!(rect, [0, 0, 16, 16]);
        assert_eq!(color, 0xffff_ffff);
        assert_eq!(matrix.m[0], [2.0, 0.0, 20.0]);
        assert_eq!(matrix.m[1], [0.0, 1.0, 20.0]);
    }

    #[test]
    fn rotation_uses_bilinear() {
        let mut e = engine();
        let image = texture(0x100, PixelFormat::Argb32);
        e.blend_transformed_image(
            &image,
            &Transform::from(kurbo::Affine::rotate(0.3)),
            kurbo::Point::ZERO,
            kurbo::Rect::new(0.0, 0.0, 16.0, 16.0),
            clip(),
            256,
        );
        let GpuCall::BlitRect { filter, .. } = blit_rect(&e) else {
            unreachable!()
        };
        assert_eq!(filter, Filter::Bilinear);
    }

    #[test]
    fn rotated_textures_are_drawn_from_cache() {
        let mut e = engine();
        let mut image = texture(0x100, PixelFormat::Argb32);
        image.rotated = true;
        let rotate = Transform::from(kurbo::Affine::rotate(1.0));
        let region = kurbo::Rect::new(0.0, 0.0, 16.0, 16.0);

        e.blend_transformed_image(&image, &rotate, kurbo::Point::ZERO, region, clip(), 256);
        assert_eq!(e.rotation_cache().len(), 1);
        let GpuCall::BlitRect { source, .. } = blit_rect(&e) else {
            unreachable!()
        };
        assert!(source.tiled, "drawn from the tiled copy");

        e.device_mut().calls.clear();
        e.blend_transformed_image(&image, &rotate, kurbo::Point::ZERO, region, clip(), 256);
        assert!(
            !e.device()
                .calls
                .iter()
                .any(|c| matches!(c, GpuCall::Blit { .. })),
            "second draw hits the cache"
        );

        e.remove_texture(0x100);
        assert!(e.rotation_cache().is_empty(), "texture removed");
    }

    #[test]
    fn transformed_non_a8_alpha_map_falls_back() {
        let mut e = engine();
        e.blend_transformed_alpha_map(
            &texture(0x100, PixelFormat::Alpha1),
            &Transform::IDENTITY,
            kurbo::Point::ZERO,
            kurbo::Rect::new(0.0, 0.0, 16.0, 16.0),
            clip(),
            Rgba32::BLACK,
        );
        assert_eq!(
            e.renderer().calls,
            [CpuCall::Transformed {
                texture: 0x100,
                transform: Transform::IDENTITY
            }]
        );
    }

    fn square() -> GpuPath {
        let mut path = GpuPath::new();
        path.push(PathSegment::MoveTo(kurbo::Point::new(0.0, 0.0)));
        path.push(PathSegment::LineTo(kurbo::Point::new(10.0, 0.0)));
        path.push(PathSegment::LineTo(kurbo::Point::new(10.0, 10.0)));
        path.push(PathSegment::Close);
        path
    }

    #[test]
    fn solid_path_fill_applies_opacity_and_rule() {
        let mut e = engine();
        let mut path = square();
        e.blend_path(
            &mut path,
            &Transform::translate(5.0, 6.0),
            clip(),
            Some(&Brush::Solid(Rgba32::new(0xff, 0, 0, 0xff))),
            None,
            128,
        );
        let draw = e
            .device()
            .calls
            .iter()
            .find(|c| matches!(c, GpuCall::Draw { .. }))
            .cloned()
            .unwrap();
        let GpuCall::Draw {
            rule,
            color,
            matrix,
            ..
        } = draw
        else {
            unreachable!()
        };
        assert_eq!(rule, FillRule::NonZero);
        assert_eq!(color, 0x7f00_00ff);
        assert_eq!(matrix.m[0][2], 5.0);
        assert_eq!(matrix.m[1][2], 6.0);
        assert!(path.has_fill(), "fill stream cached on the path");
        assert_eq!(e.device().calls.last(), Some(&GpuCall::DisableScissor));
    }

    #[test]
    fn stroke_is_drawn_non_zero() {
        let mut e = engine();
        let mut path = square();
        path.set_fill_rule(crate::path::PathFillRule::OddEven);
        e.set_stroke_properties(Stroke::new(2.0));
        e.blend_path(
            &mut path,
            &Transform::IDENTITY,
            clip(),
            Some(&Brush::Solid(Rgba32::BLACK)),
            Some(&Brush::Solid(Rgba32::WHITE)),
            256,
        );
        let rules: Vec<FillRule> = e
            .device()
            .calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::Draw { rule, .. } => Some(*rule),
                _ => None,
            })
            .collect();
        assert_eq!(rules, [FillRule::EvenOdd, FillRule::NonZero]);
        assert!(path.has_stroke(), "stroke stream cached");
    }

    #[test]
    fn gradients_are_released_after_finish() {
        let mut e = engine();
        let mut path = square();
        let gradient = LinearGradient {
            start: kurbo::Point::new(0.0, 0.0),
            end: kurbo::Point::new(10.0, 0.0),
            stops: alloc::vec![
                GradientStop {
                    position: 0.0,
                    color: Rgba32::new(0xff, 0, 0, 0xff),
                },
                GradientStop {
                    position: 1.5,
                    color: Rgba32::new(0, 0, 0xff, 0xff),
                },
            ],
            spread: SpreadMode::Reflect,
            transform: Transform::IDENTITY,
        };
        e.blend_path(
            &mut path,
            &Transform::IDENTITY,
            clip(),
            Some(&Brush::LinearGradient(gradient)),
            None,
            128,
        );

        let calls = e.device().calls.clone();
        let GpuCall::CreateGradient(desc) = calls
            .iter()
            .find(|c| matches!(c, GpuCall::CreateGradient(_)))
            .unwrap()
        else {
            unreachable!()
        };
        assert_eq!(desc.stops[1].stop, 1.0, "stops are clamped");
        assert_eq!(desc.stops[0].alpha, 0.5, "opacity folds into alpha");
        assert_eq!(desc.spread, SpreadMode::Reflect);

        let draw = calls
            .iter()
            .position(|c| matches!(c, GpuCall::DrawGradient { .. }))
            .unwrap();
        assert_eq!(calls[draw - 1], GpuCall::DisablePremultiply);
        assert_eq!(calls[draw + 1], GpuCall::EnablePremultiply);
        assert_eq!(
            e.device().count(&GpuCall::ReleaseGradient(GradientHandle(1))),
            0,
            "still in flight"
        );

        e.finish();
        assert_eq!(
            e.device().calls[e.device().calls.len() - 2..],
            [GpuCall::Finish, GpuCall::ReleaseGradient(GradientHandle(1))]
        );
    }

    #[test]
    fn upload_failure_still_draws() {
        let mut e = engine();
        e.device_mut().fail_upload = true;
        let mut path = square();
        e.blend_path(
            &mut path,
            &Transform::IDENTITY,
            clip(),
            Some(&Brush::Solid(Rgba32::BLACK)),
            None,
            256,
        );
        assert!(
            e.device()
                .calls
                .iter()
                .any(|c| matches!(c, GpuCall::Draw { .. })),
            "upload errors are diagnostics only"
        );
    }

    #[test]
    fn release_path_clears_both_streams() {
        let mut e = engine();
        let mut path = square();
        e.blend_path(
            &mut path,
            &Transform::IDENTITY,
            clip(),
            Some(&Brush::Solid(Rgba32::BLACK)),
            Some(&Brush::Solid(Rgba32::BLACK)),
            256,
        );
        e.device_mut().calls.clear();
        e.release_path(&mut path);
        assert_eq!(e.device().calls, [GpuCall::ClearPath, GpuCall::ClearPath]);
        assert!(!path.has_fill() && !path.has_stroke(), "streams dropped");
    }
}
