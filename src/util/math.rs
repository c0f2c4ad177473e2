//! Math type re-exports and SWF-specific value types.
//!
//! SWF stores lengths in twips (1/20 of a pixel), scales in 16.16 fixed point
//! and color multipliers in 8.8 fixed point. Everything in the in-memory
//! model is already converted to pixels and unit floats.

pub use glam::{Affine2, Mat2, Vec2};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Twips per pixel.
pub const TWIPS_PER_PIXEL: f32 = 20.0;

/// Convert a twip value to pixels.
#[inline]
pub fn twips_to_px(twips: i32) -> f32 {
    twips as f32 / TWIPS_PER_PIXEL
}

/// Convert pixels to the nearest twip value.
#[inline]
pub fn px_to_twips(px: f32) -> i32 {
    (px * TWIPS_PER_PIXEL).round() as i32
}

/// Convert a 16.16 fixed point value to float.
#[inline]
pub fn fixed16_to_f32(value: i32) -> f32 {
    value as f32 / 65536.0
}

/// Convert a float to 16.16 fixed point.
#[inline]
pub fn f32_to_fixed16(value: f32) -> i32 {
    (value * 65536.0).round() as i32
}

/// Convert an 8.8 fixed point value to float.
#[inline]
pub fn fixed8_to_f32(value: i32) -> f32 {
    value as f32 / 256.0
}

/// Convert a float to 8.8 fixed point.
#[inline]
pub fn f32_to_fixed8(value: f32) -> i32 {
    (value * 256.0).round() as i32
}

// ============================================================================
// Color
// ============================================================================

/// 8-bit RGBA color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB components.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Alpha as a unit float (`a / 255`).
    #[inline]
    pub fn alpha_unit(&self) -> f32 {
        self.a as f32 * (1.0 / 255.0)
    }

    /// Components as unit floats.
    pub fn to_unit(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.alpha_unit(),
        ]
    }

    /// Build from unit floats, clamping to range.
    pub fn from_unit(c: [f32; 4]) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(c[0]), q(c[1]), q(c[2]), q(c[3]))
    }

    /// Linear interpolation between two colors (`t` in 0..=1).
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let l = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8;
        Self::new(l(self.r, other.r), l(self.g, other.g), l(self.b, other.b), l(self.a, other.a))
    }
}

impl fmt::Debug for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

// ============================================================================
// Rect
// ============================================================================

/// Axis-aligned rectangle in pixels.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Top-left corner.
    #[inline]
    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.x_min, self.y_min)
    }

    /// Bottom-right corner.
    #[inline]
    pub fn bottom_right(&self) -> Vec2 {
        Vec2::new(self.x_max, self.y_max)
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rect([{}, {}] - [{}, {}])", self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

// ============================================================================
// Matrix
// ============================================================================

/// SWF 2x3 affine matrix.
///
/// Maps `(x, y)` to
/// `(scale_x * x + rotate_skew1 * y + translate_x, rotate_skew0 * x + scale_y * y + translate_y)`.
/// Translation is in pixels.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Matrix {
    pub scale_x: f32,
    pub rotate_skew0: f32,
    pub rotate_skew1: f32,
    pub scale_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Matrix {
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        rotate_skew0: 0.0,
        rotate_skew1: 0.0,
        scale_y: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// Pure translation in pixels.
    pub fn translate(x: f32, y: f32) -> Self {
        Self { translate_x: x, translate_y: y, ..Self::IDENTITY }
    }

    /// Pure scale.
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self { scale_x: sx, scale_y: sy, ..Self::IDENTITY }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True if the matrix carries a scale term.
    #[inline]
    pub fn has_scale(&self) -> bool {
        self.scale_x != 1.0 || self.scale_y != 1.0
    }

    /// True if the matrix carries a rotate/skew term.
    #[inline]
    pub fn has_rotate(&self) -> bool {
        self.rotate_skew0 != 0.0 || self.rotate_skew1 != 0.0
    }

    /// Components in SVG `matrix(a, b, c, d, e, f)` order.
    pub fn to_svg_components(&self) -> [f32; 6] {
        [
            self.scale_x,
            self.rotate_skew0,
            self.rotate_skew1,
            self.scale_y,
            self.translate_x,
            self.translate_y,
        ]
    }

    /// Convert to a glam affine transform.
    pub fn to_affine(&self) -> Affine2 {
        Affine2::from_cols_array(&self.to_svg_components())
    }

    /// Convert back from a glam affine transform.
    pub fn from_affine(a: &Affine2) -> Self {
        let c = a.to_cols_array();
        Self {
            scale_x: c[0],
            rotate_skew0: c[1],
            rotate_skew1: c[2],
            scale_y: c[3],
            translate_x: c[4],
            translate_y: c[5],
        }
    }

    /// `self * child`: apply `child` first, then `self`.
    pub fn concat(&self, child: &Self) -> Self {
        Self::from_affine(&(self.to_affine() * child.to_affine()))
    }

    /// Transform a point.
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.scale_x * p.x + self.rotate_skew1 * p.y + self.translate_x,
            self.rotate_skew0 * p.x + self.scale_y * p.y + self.translate_y,
        )
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ============================================================================
// Color transform
// ============================================================================

/// Color transform: `out = in * mul + add` per RGBA channel, unit floats.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct ColorTransform {
    pub mul: [f32; 4],
    pub add: [f32; 4],
}

impl ColorTransform {
    pub const IDENTITY: Self = Self { mul: [1.0; 4], add: [0.0; 4] };

    /// Identity means `mul == (1,1,1,1)` and `add == (0,0,0,0)`.
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Compose: apply `self` first, then `outer`.
    pub fn then(&self, outer: &Self) -> Self {
        let mut out = Self::IDENTITY;
        for i in 0..4 {
            out.mul[i] = self.mul[i] * outer.mul[i];
            out.add[i] = self.add[i] * outer.mul[i] + outer.add[i];
        }
        out
    }

    /// Apply to a color.
    pub fn apply(&self, color: Rgba) -> Rgba {
        let c = color.to_unit();
        let mut out = [0.0f32; 4];
        for i in 0..4 {
            out[i] = c[i] * self.mul[i] + self.add[i];
        }
        Rgba::from_unit(out)
    }
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twips() {
        assert_eq!(twips_to_px(200), 10.0);
        assert_eq!(twips_to_px(-30), -1.5);
        assert_eq!(px_to_twips(10.0), 200);
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(fixed16_to_f32(65536), 1.0);
        assert_eq!(fixed16_to_f32(32768), 0.5);
        assert_eq!(f32_to_fixed16(-2.0), -131072);
        assert_eq!(fixed8_to_f32(128), 0.5);
        assert_eq!(f32_to_fixed8(1.0), 256);
    }

    #[test]
    fn test_matrix_affine_roundtrip() {
        let m = Matrix {
            scale_x: 2.0,
            rotate_skew0: 0.5,
            rotate_skew1: -0.25,
            scale_y: 3.0,
            translate_x: 10.0,
            translate_y: -4.0,
        };
        let p = Vec2::new(1.0, 2.0);
        let a = m.to_affine().transform_point2(p);
        let b = m.transform_point(p);
        assert!((a - b).length() < 1e-6);
        assert_eq!(Matrix::from_affine(&m.to_affine()), m);
    }

    #[test]
    fn test_matrix_concat_order() {
        let parent = Matrix::translate(10.0, 0.0);
        let child = Matrix::scale(2.0, 2.0);
        let m = parent.concat(&child);
        // scale first, then translate
        assert_eq!(m.transform_point(Vec2::new(1.0, 1.0)), Vec2::new(12.0, 2.0));
    }

    #[test]
    fn test_color_transform() {
        assert!(ColorTransform::IDENTITY.is_identity());
        assert!(ColorTransform::default().is_identity());

        let half = ColorTransform { mul: [0.5, 0.5, 0.5, 1.0], add: [0.0; 4] };
        assert!(!half.is_identity());
        assert_eq!(half.apply(Rgba::WHITE), Rgba::new(128, 128, 128, 255));

        let tint = ColorTransform { mul: [1.0; 4], add: [0.1, 0.0, 0.0, 0.0] };
        let both = half.then(&tint);
        assert_eq!(both.mul, [0.5, 0.5, 0.5, 1.0]);
        assert!((both.add[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_rgba_lerp() {
        let a = Rgba::new(0, 0, 0, 0);
        let b = Rgba::new(200, 100, 50, 255);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5), Rgba::new(100, 50, 25, 128));
    }
}
