// Copyright 2026 the Subduction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 3×3 transforms.
//!
//! [`Transform`] uses the row-vector convention of the GUI engine: a point
//! `(x, y)` maps to `(m11·x + m21·y + dx, m12·x + m22·y + dy)` divided by
//! `m13·x + m23·y + m33`. [`Matrix`] is the GPU's column-vector layout of the
//! same numbers.

use kurbo::{Affine, Point};

/// The cheapest class of operation a [`Transform`] performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransformKind {
    /// No effect.
    Identity,
    /// Translation only.
    Translate,
    /// Axis-aligned scale, possibly with translation.
    Scale,
    /// Rotation (orthogonal axes), possibly with scale and translation.
    Rotate,
    /// Non-orthogonal axes.
    Shear,
    /// Perspective.
    Project,
}

/// A 2D projective transform in row-vector form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Row 1, column 1.
    pub m11: f32,
    /// Row 1, column 2.
    pub m12: f32,
    /// Row 1, column 3.
    pub m13: f32,
    /// Row 2, column 1.
    pub m21: f32,
    /// Row 2, column 2.
    pub m22: f32,
    /// Row 2, column 3.
    pub m23: f32,
    /// Horizontal translation.
    pub dx: f32,
    /// Vertical translation.
    pub dy: f32,
    /// Row 3, column 3.
    pub m33: f32,
}

const EPSILON: f32 = 1e-5;

fn fuzzy_zero(v: f32) -> bool {
    v.abs() <= EPSILON
}

fn fuzzy_eq(a: f32, b: f32) -> bool {
    fuzzy_zero(a - b)
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        m11: 1.0,
        m12: 0.0,
        m13: 0.0,
        m21: 0.0,
        m22: 1.0,
        m23: 0.0,
        dx: 0.0,
        dy: 0.0,
        m33: 1.0,
    };

    /// A translation.
    #[must_use]
    pub const fn translate(dx: f32, dy: f32) -> Self {
        Self {
            dx,
            dy,
            ..Self::IDENTITY
        }
    }

    /// An axis-aligned scale.
    #[must_use]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m11: sx,
            m22: sy,
            ..Self::IDENTITY
        }
    }

    /// Classifies the transform.
    #[must_use]
    pub fn kind(&self) -> TransformKind {
        if !fuzzy_zero(self.m13) || !fuzzy_zero(self.m23) || !fuzzy_eq(self.m33, 1.0) {
            return TransformKind::Project;
        }
        if !fuzzy_zero(self.m12) || !fuzzy_zero(self.m21) {
            let dot = self.m11 * self.m21 + self.m12 * self.m22;
            return if fuzzy_zero(dot) {
                TransformKind::Rotate
            } else {
                TransformKind::Shear
            };
        }
        if !fuzzy_eq(self.m11, 1.0) || !fuzzy_eq(self.m22, 1.0) {
            return TransformKind::Scale;
        }
        if !fuzzy_zero(self.dx) || !fuzzy_zero(self.dy) {
            return TransformKind::Translate;
        }
        TransformKind::Identity
    }

    /// Returns whether this is a pure scale with at least one axis at unit
    /// magnitude.
    #[must_use]
    pub fn is_unit_axis_scale(&self) -> bool {
        self.kind() == TransformKind::Scale
            && (fuzzy_eq(self.m11.abs(), 1.0) || fuzzy_eq(self.m22.abs(), 1.0))
    }

    /// Maps a point, including the perspective divide.
    #[must_use]
    pub fn map(&self, p: Point) -> Point {
        let (x, y) = (p.x, p.y);
        let m = |v: f32| f64::from(v);
        let w = m(self.m13) * x + m(self.m23) * y + m(self.m33);
        Point::new(
            (m(self.m11) * x + m(self.m21) * y + m(self.dx)) / w,
            (m(self.m12) * x + m(self.m22) * y + m(self.dy)) / w,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Affine> for Transform {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the GPU works in single precision"
    )]
    fn from(affine: Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self {
            m11: a as f32,
            m12: b as f32,
            m21: c as f32,
            m22: d as f32,
            dx: e as f32,
            dy: f as f32,
            ..Self::IDENTITY
        }
    }
}

/// The GPU's 3×3 matrix, indexed `m[row][column]` for column vectors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    /// Elements.
    pub m: [[f32; 3]; 3],
}

impl Matrix {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Post-multiplies a translation, like the driver's translate helper.
    #[must_use]
    pub fn translated(mut self, x: f32, y: f32) -> Self {
        for row in &mut self.m {
            row[2] += row[0] * x + row[1] * y;
        }
        self
    }

    /// Transposes `transform` into GPU layout.
    #[must_use]
    pub fn from_transform(t: &Transform) -> Self {
        Self {
            m: [
                [t.m11, t.m21, t.dx],
                [t.m12, t.m22, t.dy],
                [t.m13, t.m23, t.m33],
            ],
        }
    }

    /// Builds the blit matrix for drawing a texture at `origin` under
    /// `transform`: the destination offset is applied before the transform.
    #[must_use]
    pub fn for_blit(t: &Transform, origin: Point) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the GPU works in single precision"
        )]
        let (x, y) = (origin.x as f32, origin.y as f32);
        let mut m = Self::from_transform(t);
        m.m[0][2] = t.dx + t.m11 * x + t.m21 * y;
        m.m[1][2] = t.dy + t.m12 * x + t.m22 * y;
        m
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
