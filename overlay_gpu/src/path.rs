// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path segments and their encoding into GPU op-code streams.
//!
//! The GPU consumes paths as a flat stream of words: an op code followed by
//! its coordinates, terminated by [`op::END`]. Both [`PathFormat`]s store op
//! codes in the same word size as the coordinates.
//!
//! [`GpuPath`] holds the abstract segments of an engine path and builds its
//! fill and stroke streams lazily, keeping them until
//! [`clear_fill`](GpuPath::clear_fill) or
//! [`clear_stroke`](GpuPath::clear_stroke) drops them. Arcs are expanded to
//! cubic Béziers with kurbo. Stroke outlines come from a [`PathStroker`],
//! which feeds a [`StrokeSink`].

use alloc::vec::Vec;

use kurbo::{Arc, BezPath, PathEl, Point, RoundedRect, Shape, Stroke, StrokeOpts, SvgArc, Vec2};

use crate::device::{FillRule, GpuDevice};

/// Tolerance used when flattening arcs and rounded corners into curves.
pub const CURVE_TOLERANCE: f64 = 0.1;

/// GPU path op codes.
pub mod op {
    /// Terminates a stream.
    pub const END: u8 = 0x00;
    /// Closes the current subpath.
    pub const CLOSE: u8 = 0x01;
    /// Starts a subpath at one point.
    pub const MOVE: u8 = 0x02;
    /// Straight line to one point.
    pub const LINE: u8 = 0x04;
    /// Quadratic Bézier through a control point to an end point.
    pub const QUAD: u8 = 0x06;
    /// Cubic Bézier through two control points to an end point.
    pub const CUBIC: u8 = 0x08;
}

/// Word size of a path stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathFormat {
    /// Signed 16-bit integer words, for pixel-aligned shapes.
    S16,
    /// 32-bit float words.
    Fp32,
}

/// The words of an encoded path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathCoords {
    /// 16-bit words.
    S16(Vec<i16>),
    /// Raw bits of 32-bit float words. Op codes are stored as integers.
    Fp32(Vec<u32>),
}

impl PathCoords {
    /// Returns the number of words.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::S16(words) => words.len(),
            Self::Fp32(words) => words.len(),
        }
    }

    /// Returns whether the stream holds no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the stream size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Self::S16(words) => words.len() * 2,
            Self::Fp32(words) => words.len() * 4,
        }
    }
}

/// An encoded path ready for the GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct PathData {
    /// Word size.
    pub format: PathFormat,
    /// Bounding box as `[min_x, min_y, max_x, max_y]`.
    pub bounds: [f32; 4],
    /// The stream.
    pub coords: PathCoords,
}

impl PathData {
    /// Decodes the op codes of the stream, skipping coordinates.
    ///
    /// Returns `None` if the stream contains an unknown op code.
    #[must_use]
    pub fn ops(&self) -> Option<Vec<u8>> {
        let words: Vec<i64> = match &self.coords {
            PathCoords::S16(words) => words.iter().map(|&w| i64::from(w)).collect(),
            PathCoords::Fp32(words) => words.iter().map(|&w| i64::from(w)).collect(),
        };
        let mut ops = Vec::new();
        let mut i = 0;
        while i < words.len() {
            let code = u8::try_from(words[i]).ok()?;
            let args = match code {
                op::END | op::CLOSE => 0,
                op::MOVE | op::LINE => 2,
                op::QUAD => 4,
                op::CUBIC => 6,
                _ => return None,
            };
            ops.push(code);
            i += 1 + args;
        }
        Some(ops)
    }
}

// ---------------------------------------------------------------------------
// PathBuilder
// ---------------------------------------------------------------------------

/// Appends op codes and coordinates to a stream while tracking bounds.
#[derive(Clone, Debug)]
pub struct PathBuilder {
    coords: PathCoords,
    bounds: Option<kurbo::Rect>,
    current: Point,
}

impl PathBuilder {
    /// Creates an empty builder for `format`.
    #[must_use]
    pub fn new(format: PathFormat) -> Self {
        let coords = match format {
            PathFormat::S16 => PathCoords::S16(Vec::new()),
            PathFormat::Fp32 => PathCoords::Fp32(Vec::new()),
        };
        Self {
            coords,
            bounds: None,
            current: Point::ZERO,
        }
    }

    /// Returns the point the next segment starts from.
    #[must_use]
    pub fn current(&self) -> Point {
        self.current
    }

    fn push_op(&mut self, code: u8) {
        match &mut self.coords {
            PathCoords::S16(words) => words.push(i16::from(code)),
            PathCoords::Fp32(words) => words.push(u32::from(code)),
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "stream coordinates are narrowed to the path word size"
    )]
    fn push_point(&mut self, p: Point) {
        match &mut self.coords {
            PathCoords::S16(words) => {
                words.push(p.x as i16);
                words.push(p.y as i16);
            }
            PathCoords::Fp32(words) => {
                words.push((p.x as f32).to_bits());
                words.push((p.y as f32).to_bits());
            }
        }
        let dot = kurbo::Rect::from_points(p, p);
        self.bounds = Some(self.bounds.map_or(dot, |b| b.union_pt(p)));
    }

    /// Starts a subpath.
    pub fn move_to(&mut self, p: Point) {
        self.push_op(op::MOVE);
        self.push_point(p);
        self.current = p;
    }

    /// Adds a line.
    pub fn line_to(&mut self, p: Point) {
        self.push_op(op::LINE);
        self.push_point(p);
        self.current = p;
    }

    /// Adds a quadratic Bézier.
    pub fn quad_to(&mut self, c: Point, p: Point) {
        self.push_op(op::QUAD);
        self.push_point(c);
        self.push_point(p);
        self.current = p;
    }

    /// Adds a cubic Bézier.
    pub fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.push_op(op::CUBIC);
        self.push_point(c1);
        self.push_point(c2);
        self.push_point(p);
        self.current = p;
    }

    /// Adds an elliptical arc from the current point as cubic Béziers.
    ///
    /// A degenerate arc (zero radius, or ending where it starts) becomes a
    /// straight line.
    pub fn arc_to(&mut self, radii: Vec2, rotation: f64, large_arc: bool, sweep: bool, to: Point) {
        let svg = SvgArc {
            from: self.current,
            to,
            radii,
            x_rotation: rotation,
            large_arc,
            sweep,
        };
        match Arc::from_svg_arc(&svg) {
            Some(arc) => {
                for el in arc.append_iter(CURVE_TOLERANCE) {
                    self.push_el(el);
                }
                self.current = to;
            }
            None => self.line_to(to),
        }
    }

    /// Closes the current subpath.
    pub fn close(&mut self) {
        self.push_op(op::CLOSE);
    }

    fn push_el(&mut self, el: PathEl) {
        match el {
            PathEl::MoveTo(p) => self.move_to(p),
            PathEl::LineTo(p) => self.line_to(p),
            PathEl::QuadTo(c, p) => self.quad_to(c, p),
            PathEl::CurveTo(c1, c2, p) => self.cubic_to(c1, c2, p),
            PathEl::ClosePath => self.close(),
        }
    }

    /// Terminates the stream and returns it.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "bounds are stored as f32")]
    pub fn finish(mut self) -> PathData {
        self.push_op(op::END);
        let format = match self.coords {
            PathCoords::S16(_) => PathFormat::S16,
            PathCoords::Fp32(_) => PathFormat::Fp32,
        };
        let b = self.bounds.unwrap_or(kurbo::Rect::ZERO);
        PathData {
            format,
            bounds: [b.x0 as f32, b.y0 as f32, b.x1 as f32, b.y1 as f32],
            coords: self.coords,
        }
    }
}

/// Encodes an axis-aligned rectangle as a 16-bit stream.
///
/// The stream is a move and three lines with no close op; the fill closes
/// the outline implicitly.
#[must_use]
pub fn rect_path(rect: kurbo::Rect) -> PathData {
    let mut b = PathBuilder::new(PathFormat::S16);
    b.move_to(Point::new(rect.x0, rect.y0));
    b.line_to(Point::new(rect.x1, rect.y0));
    b.line_to(Point::new(rect.x1, rect.y1));
    b.line_to(Point::new(rect.x0, rect.y1));
    b.finish()
}

/// Encodes a rounded rectangle as a 16-bit stream.
///
/// Corners become cubic Béziers. The close op is omitted for the same
/// reason as in [`rect_path`].
#[must_use]
pub fn rounded_rect_path(rect: kurbo::Rect, radius: f64) -> PathData {
    let shape = RoundedRect::from_rect(rect, radius);
    let mut b = PathBuilder::new(PathFormat::S16);
    for el in shape.path_elements(CURVE_TOLERANCE) {
        if el != PathEl::ClosePath {
            b.push_el(el);
        }
    }
    b.finish()
}

// ---------------------------------------------------------------------------
// Strokes
// ---------------------------------------------------------------------------

/// Receives stroke outline segments.
pub trait StrokeSink {
    /// Starts an outline.
    fn move_to(&mut self, p: Point);
    /// Straight outline edge.
    fn line_to(&mut self, p: Point);
    /// Quadratic outline edge.
    fn quad_to(&mut self, c: Point, p: Point);
    /// Cubic outline edge.
    fn cubic_to(&mut self, c1: Point, c2: Point, p: Point);
    /// Elliptical outline edge, used for round joins and caps.
    fn arc_to(&mut self, radii: Vec2, rotation: f64, large_arc: bool, sweep: bool, to: Point);
    /// Closes the outline.
    fn close(&mut self);
}

impl StrokeSink for PathBuilder {
    fn move_to(&mut self, p: Point) {
        Self::move_to(self, p);
    }

    fn line_to(&mut self, p: Point) {
        Self::line_to(self, p);
    }

    fn quad_to(&mut self, c: Point, p: Point) {
        Self::quad_to(self, c, p);
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) {
        Self::cubic_to(self, c1, c2, p);
    }

    fn arc_to(&mut self, radii: Vec2, rotation: f64, large_arc: bool, sweep: bool, to: Point) {
        Self::arc_to(self, radii, rotation, large_arc, sweep, to);
    }

    fn close(&mut self) {
        Self::close(self);
    }
}

/// Turns a centerline into the outline that fills as its stroke.
pub trait PathStroker {
    /// Emits the outline of `path` stroked with `style` into `sink`.
    fn stroke(&mut self, path: &BezPath, style: &Stroke, sink: &mut dyn StrokeSink);
}

/// A [`PathStroker`] backed by kurbo's stroker.
///
/// Every outline subpath is emitted as a closed polygon, including the ones
/// kurbo leaves open around an open centerline.
#[derive(Clone, Copy, Debug, Default)]
pub struct KurboStroker;

impl PathStroker for KurboStroker {
    fn stroke(&mut self, path: &BezPath, style: &Stroke, sink: &mut dyn StrokeSink) {
        let outline = kurbo::stroke(path.iter(), style, &StrokeOpts::default(), CURVE_TOLERANCE);
        let mut open = false;
        for el in outline.iter() {
            match el {
                PathEl::MoveTo(p) => {
                    if open {
                        sink.close();
                    }
                    sink.move_to(p);
                    open = true;
                }
                PathEl::LineTo(p) => sink.line_to(p),
                PathEl::QuadTo(c, p) => sink.quad_to(c, p),
                PathEl::CurveTo(c1, c2, p) => sink.cubic_to(c1, c2, p),
                PathEl::ClosePath => {
                    if open {
                        sink.close();
                    }
                    open = false;
                }
            }
        }
        if open {
            sink.close();
        }
    }
}

// ---------------------------------------------------------------------------
// GpuPath
// ---------------------------------------------------------------------------

/// One segment of an engine path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
    /// Start a subpath.
    MoveTo(Point),
    /// Straight line.
    LineTo(Point),
    /// Quadratic Bézier.
    QuadTo(Point, Point),
    /// Cubic Bézier.
    CubicTo(Point, Point, Point),
    /// Elliptical arc.
    ArcTo {
        /// Ellipse radii.
        radii: Vec2,
        /// Rotation of the ellipse's x axis, in radians.
        rotation: f64,
        /// Take the longer of the two candidate arcs.
        large_arc: bool,
        /// Sweep in the positive-angle direction.
        clockwise: bool,
        /// End point.
        to: Point,
    },
    /// Close the current subpath.
    Close,
}

/// Engine-level fill rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PathFillRule {
    /// Non-zero winding.
    #[default]
    Winding,
    /// Even-odd.
    OddEven,
}

impl PathFillRule {
    /// Returns the GPU fill rule.
    #[must_use]
    pub const fn to_gpu(self) -> FillRule {
        match self {
            Self::Winding => FillRule::NonZero,
            Self::OddEven => FillRule::EvenOdd,
        }
    }
}

/// An engine path with lazily built, cached GPU streams.
#[derive(Clone, Debug, Default)]
pub struct GpuPath {
    segments: Vec<PathSegment>,
    fill_rule: PathFillRule,
    fill: Option<PathData>,
    stroke: Option<PathData>,
}

impl GpuPath {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a segment. Cached streams are not invalidated.
    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the fill rule.
    #[must_use]
    pub fn fill_rule(&self) -> PathFillRule {
        self.fill_rule
    }

    /// Sets the fill rule.
    pub fn set_fill_rule(&mut self, rule: PathFillRule) {
        self.fill_rule = rule;
    }

    /// Returns whether a fill stream is cached.
    #[must_use]
    pub fn has_fill(&self) -> bool {
        self.fill.is_some()
    }

    /// Returns whether a stroke stream is cached.
    #[must_use]
    pub fn has_stroke(&self) -> bool {
        self.stroke.is_some()
    }

    /// Returns the fill stream, building it on first use.
    ///
    /// A close op is emitted only when the next segment does not start a
    /// new subpath.
    pub fn fill_data(&mut self) -> &PathData {
        self.fill.get_or_insert_with(|| {
            let mut b = PathBuilder::new(PathFormat::Fp32);
            for (i, segment) in self.segments.iter().enumerate() {
                match *segment {
                    PathSegment::Close => {
                        if !matches!(self.segments.get(i + 1), Some(PathSegment::MoveTo(_))) {
                            b.close();
                        }
                    }
                    other => append_segment(&mut b, other),
                }
            }
            b.finish()
        })
    }

    /// Returns the stroke stream, building it with `stroker` on first use.
    pub fn stroke_data(&mut self, stroker: &mut dyn PathStroker, style: &Stroke) -> &PathData {
        let segments = &self.segments;
        self.stroke.get_or_insert_with(|| {
            let mut b = PathBuilder::new(PathFormat::Fp32);
            stroker.stroke(&to_bez_path(segments), style, &mut b);
            b.finish()
        })
    }

    /// Drops the cached fill stream.
    pub fn clear_fill(&mut self) {
        self.fill = None;
    }

    /// Drops the cached stroke stream.
    pub fn clear_stroke(&mut self) {
        self.stroke = None;
    }

    /// Releases both streams' GPU memory and drops them.
    pub fn release(&mut self, device: &mut impl GpuDevice) {
        for data in [self.fill.take(), self.stroke.take()].into_iter().flatten() {
            if let Err(err) = device.clear_path(&data) {
                log::debug!("path release failed: {err}");
            }
        }
    }
}

fn append_segment(b: &mut PathBuilder, segment: PathSegment) {
    match segment {
        PathSegment::MoveTo(p) => b.move_to(p),
        PathSegment::LineTo(p) => b.line_to(p),
        PathSegment::QuadTo(c, p) => b.quad_to(c, p),
        PathSegment::CubicTo(c1, c2, p) => b.cubic_to(c1, c2, p),
        PathSegment::ArcTo {
            radii,
            rotation,
            large_arc,
            clockwise,
            to,
        } => b.arc_to(radii, rotation, large_arc, clockwise, to),
        PathSegment::Close => b.close(),
    }
}

/// Converts segments to a kurbo path, expanding arcs to cubics.
#[must_use]
pub fn to_bez_path(segments: &[PathSegment]) -> BezPath {
    let mut path = BezPath::new();
    let mut current = Point::ZERO;
    for segment in segments {
        match *segment {
            PathSegment::MoveTo(p) => {
                path.move_to(p);
                current = p;
            }
            PathSegment::LineTo(p) => {
                path.line_to(p);
                current = p;
            }
            PathSegment::QuadTo(c, p) => {
                path.quad_to(c, p);
                current = p;
            }
            PathSegment::CubicTo(c1, c2, p) => {
                path.curve_to(c1, c2, p);
                current = p;
            }
            PathSegment::ArcTo {
                radii,
                rotation,
                large_arc,
                clockwise,
                to,
            } => {
                let svg = SvgArc {
                    from: current,
                    to,
                    radii,
                    x_rotation: rotation,
                    large_arc,
                    sweep: clockwise,
                };
                match Arc::from_svg_arc(&svg) {
                    Some(arc) => path.extend(arc.append_iter(CURVE_TOLERANCE)),
                    None => path.line_to(to),
                }
                current = to;
            }
            PathSegment::Close => path.close_path(),
        }
    }
    path
}
