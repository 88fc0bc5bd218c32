// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated overlay frame loop that exercises the tracing and diagnostics
//! pipeline.
//!
//! Drives a [`PlatformContext`] over the host [`SimBoard`] with a 60 Hz
//! vblank thread. A background item layer is redrawn every frame with a
//! rotated texture, and a cursor layer attached to a sprite moves across the
//! screen. Events go to both a
//! [`PrettyPrintSink`](overlay_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](overlay_debug::recorder::RecorderSink), and the recording
//! is exported as a Chrome trace JSON file.
//!
//! Usage: `frame_demo [OUTPUT]` (default `trace.json`).

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

use overlay_backend_sim::vblank::VblankTicker;
use overlay_backend_sim::{MemoryMap, SimBoard};
use overlay_core::compositor::LayerEngine;
use overlay_core::config::CompositorConfig;
use overlay_core::format::{ColorDepth, PixelFormat, Rgba32};
use overlay_core::geometry::{Point, Rect, Size};
use overlay_core::layer::{
    ASAP, CommonProperties, ItemLayerProperties, LayerId, SpriteId, SpriteProperties,
};
use overlay_core::output::Screen;
use overlay_core::surface::{SurfaceDescriptor, Texture};
use overlay_core::time::Timestamp;
use overlay_core::trace::{
    CacheEvent, CommitEvent, FrameSummary, LayerAllocatedEvent, LayerReleasedEvent,
    PhaseBeginEvent, PhaseEndEvent, ReindexEvent, SwapEvent, TraceSink, Tracer,
};
use overlay_debug::pretty::PrettyPrintSink;
use overlay_debug::recorder::RecorderSink;
use overlay_gpu::config::GpuConfig;
use overlay_gpu::transform::Transform;
use overlay_platform::context::PlatformContext;

const FRAME_COUNT: u32 = 60;
const FRAME_INTERVAL_MS: u64 = 16;
const CURSOR_SIZE: u32 = 32;
/// Source texture for the rotated blit, somewhere in the preload region.
const TEXTURE_ADDRESS: usize = 0x8200_0000;

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "trace.json".into());

    // -- platform ----------------------------------------------------------
    let parts = SimBoard::parts(&MemoryMap::rt1170(), Screen::rk055(), Duration::from_millis(1));
    let mut ctx = PlatformContext::new(parts, CompositorConfig::host(), GpuConfig::rt1170());
    ctx.initialize();
    let ticker = VblankTicker::spawn(ctx.irq_handle(), VblankTicker::REFRESH_60HZ)?;

    // -- sinks -------------------------------------------------------------
    let mut sinks = Sinks {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())),
        recorder: RecorderSink::new(),
    };

    // -- scene -------------------------------------------------------------
    let mut scene = Scene::new(&mut ctx)?;
    ctx.drain_trace(&mut Tracer::new(&mut sinks));

    while scene.frames < FRAME_COUNT {
        ctx.run_once(&mut |ctx: &mut PlatformContext<SimBoard>, now| scene.step(ctx, now));
        ctx.drain_trace(&mut Tracer::new(&mut sinks));
    }

    scene.teardown(&mut ctx);
    ctx.present_frame();
    ctx.drain_trace(&mut Tracer::new(&mut sinks));
    let vblanks = ticker.stop();

    // -- export Chrome trace -----------------------------------------------
    let mut writer = BufWriter::new(File::create(&path)?);
    overlay_debug::chrome::export(sinks.recorder.as_bytes(), &mut writer)?;

    println!("Wrote {path} ({FRAME_COUNT} frames, {vblanks} vblanks)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

struct Scene {
    background: LayerId,
    cursor: LayerId,
    sprite: SpriteId,
    screen: Size,
    texture: Texture,
    frames: u32,
}

impl Scene {
    fn new(ctx: &mut PlatformContext<SimBoard>) -> Result<Self, Box<dyn Error>> {
        let screen = ctx.available_screens()[0];
        let engine = ctx.layer_engine();

        let background = engine.allocate_item_layer(
            &screen,
            ItemLayerProperties {
                common: CommonProperties::default(),
                size: screen.size,
                color_depth: ColorDepth::Bpp16,
            },
            None,
        )?;
        let sprite = engine.allocate_sprite_layer(SpriteProperties {
            common: CommonProperties {
                z: 1,
                ..CommonProperties::default()
            },
        })?;
        let cursor = engine.allocate_item_layer(
            &screen,
            ItemLayerProperties {
                common: CommonProperties::default(),
                size: Size::new(CURSOR_SIZE, CURSOR_SIZE),
                color_depth: ColorDepth::Bpp32,
            },
            Some(sprite),
        )?;

        Ok(Self {
            background,
            cursor,
            sprite,
            screen: screen.size,
            texture: Texture {
                surface: SurfaceDescriptor::packed(
                    TEXTURE_ADDRESS,
                    Size::new(64, 64),
                    PixelFormat::Argb32,
                ),
                rotated: true,
                generation: 0,
            },
            frames: 0,
        })
    }

    fn step(&mut self, ctx: &mut PlatformContext<SimBoard>, now: Timestamp) {
        let frame = self.frames;
        let shade = u8::try_from(frame % 256).unwrap_or(u8::MAX);
        let full = Rect::new(0, 0, self.screen.width, self.screen.height);

        ctx.begin_frame(self.background, ASAP);
        let engine = ctx.drawing_engine();
        engine.fill_rect(full, Rgba32::new(0x20, 0x20, shade, 0xff));
        let x = u16::try_from(frame * 4 % self.screen.width).unwrap_or(0);
        let offset = Transform::translate(f32::from(x), 48.0);
        engine.blend_transformed_image(
            &self.texture,
            &offset,
            kurbo::Point::ZERO,
            kurbo::Rect::new(0.0, 0.0, 64.0, 64.0),
            full,
            256,
        );
        ctx.end_frame(self.background);

        ctx.begin_frame(self.cursor, ASAP);
        ctx.drawing_engine().fill_rect(
            Rect::new(0, 0, CURSOR_SIZE, CURSOR_SIZE),
            Rgba32::new(0xff, 0xff, 0xff, 0xc0),
        );
        ctx.end_frame(self.cursor);

        let x = i32::try_from(frame * 6 % self.screen.width).unwrap_or(0);
        ctx.layer_engine().update_sprite_layer(
            self.sprite,
            SpriteProperties {
                common: CommonProperties {
                    position: Point::new(x, 120),
                    z: 1,
                    ..CommonProperties::default()
                },
            },
        );

        ctx.present_frame();
        self.frames += 1;
        ctx.schedule_engine_update(now.saturating_add_millis(FRAME_INTERVAL_MS));
    }

    fn teardown(self, ctx: &mut PlatformContext<SimBoard>) {
        ctx.wait_until_async_read_finished(
            self.texture.surface.address,
            self.texture.surface.address + self.texture.surface.byte_len(),
        );
        let engine = ctx.layer_engine();
        engine.deallocate_layer(self.cursor);
        engine.deallocate_sprite_layer(self.sprite);
        engine.deallocate_layer(self.background);
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Forwards every event to the console and the recorder.
struct Sinks {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
}

impl TraceSink for Sinks {
    fn on_layer_allocated(&mut self, e: &LayerAllocatedEvent) {
        self.pretty.on_layer_allocated(e);
        self.recorder.on_layer_allocated(e);
    }

    fn on_layer_released(&mut self, e: &LayerReleasedEvent) {
        self.pretty.on_layer_released(e);
        self.recorder.on_layer_released(e);
    }

    fn on_reindex(&mut self, e: &ReindexEvent) {
        self.pretty.on_reindex(e);
        self.recorder.on_reindex(e);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.pretty.on_commit(e);
        self.recorder.on_commit(e);
    }

    fn on_swap(&mut self, e: &SwapEvent) {
        self.pretty.on_swap(e);
        self.recorder.on_swap(e);
    }

    fn on_cache(&mut self, e: &CacheEvent) {
        self.pretty.on_cache(e);
        self.recorder.on_cache(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.pretty.on_phase_begin(e);
        self.recorder.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.pretty.on_phase_end(e);
        self.recorder.on_phase_end(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.pretty.on_frame_summary(s);
        self.recorder.on_frame_summary(s);
    }
}
