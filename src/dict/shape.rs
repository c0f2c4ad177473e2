//! Shape model shared by Shape and Morph entries.
//!
//! Geometry is already tessellated: fills are triangle soups (index triples
//! into a vertex list) and lines are open polylines. Morph shapes carry a
//! second vertex set which playback interpolates by the placement ratio.

use serde::{Deserialize, Serialize};

use crate::stream::NO_CHARACTER;
use crate::util::{Error, Matrix, Rect, Result, Rgba, Vec2};

/// Convert a 16-bit morph ratio to an interpolation factor in 0..=1.
#[inline]
pub fn ratio_to_t(ratio: u16) -> f32 {
    ratio as f32 / 65535.0
}

/// Interpolate two vertex lists. An empty `end` list means "no morph".
fn lerp_verts(start: &[Vec2], end: &[Vec2], t: f32) -> Vec<Vec2> {
    if end.len() != start.len() || t == 0.0 {
        return start.to_vec();
    }
    start.iter().zip(end).map(|(a, b)| a.lerp(*b, t)).collect()
}

// ============================================================================
// Styles
// ============================================================================

/// Coarse fill style classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillStyleKind {
    Solid,
    LinearGradient,
    RadialGradient,
    FocalGradient,
    Bitmap,
}

/// Gradient geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientKind {
    Linear,
    Radial,
    Focal,
}

/// One gradient control point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the gradient, 0..=255.
    pub ratio: u8,
    pub start_color: Rgba,
    pub end_color: Rgba,
}

/// Fill style of one fill draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FillStyle {
    Solid {
        start_color: Rgba,
        end_color: Rgba,
    },
    Gradient {
        kind: GradientKind,
        stops: Vec<GradientStop>,
        start_matrix: Matrix,
        end_matrix: Matrix,
        /// Focal point in -1..=1, only meaningful for focal gradients.
        #[serde(default)]
        focal_point: f32,
    },
    Bitmap {
        /// `0xFFFF` means "no bitmap"; such draws are transparent placeholders.
        bitmap_id: u16,
        start_matrix: Matrix,
        end_matrix: Matrix,
        #[serde(default)]
        clamp: bool,
        #[serde(default)]
        smooth: bool,
    },
}

impl FillStyle {
    /// Solid color that does not morph.
    pub fn solid(color: Rgba) -> Self {
        Self::Solid { start_color: color, end_color: color }
    }

    /// Bitmap fill with the same matrix at both morph ends.
    pub fn bitmap(bitmap_id: u16, matrix: Matrix) -> Self {
        Self::Bitmap {
            bitmap_id,
            start_matrix: matrix,
            end_matrix: matrix,
            clamp: false,
            smooth: true,
        }
    }

    pub fn kind(&self) -> FillStyleKind {
        match self {
            Self::Solid { .. } => FillStyleKind::Solid,
            Self::Gradient { kind: GradientKind::Linear, .. } => FillStyleKind::LinearGradient,
            Self::Gradient { kind: GradientKind::Radial, .. } => FillStyleKind::RadialGradient,
            Self::Gradient { kind: GradientKind::Focal, .. } => FillStyleKind::FocalGradient,
            Self::Bitmap { .. } => FillStyleKind::Bitmap,
        }
    }

    /// Referenced bitmap id, if this is a bitmap fill.
    pub fn bitmap_id(&self) -> Option<u16> {
        match self {
            Self::Bitmap { bitmap_id, .. } => Some(*bitmap_id),
            _ => None,
        }
    }

    /// Solid color at morph position `t`; gradients report their first stop.
    pub fn color_at(&self, t: f32) -> Option<Rgba> {
        match self {
            Self::Solid { start_color, end_color } => Some(start_color.lerp(end_color, t)),
            Self::Gradient { stops, .. } => stops.first().map(|s| s.start_color.lerp(&s.end_color, t)),
            Self::Bitmap { .. } => None,
        }
    }
}

/// Stroke style of one line draw.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub start_width: f32,
    pub end_width: f32,
    pub start_color: Rgba,
    pub end_color: Rgba,
}

impl LineStyle {
    /// Non-morphing stroke.
    pub fn new(width: f32, color: Rgba) -> Self {
        Self { start_width: width, end_width: width, start_color: color, end_color: color }
    }

    pub fn width_at(&self, t: f32) -> f32 {
        self.start_width + (self.end_width - self.start_width) * t
    }

    pub fn color_at(&self, t: f32) -> Rgba {
        self.start_color.lerp(&self.end_color, t)
    }
}

// ============================================================================
// Draws
// ============================================================================

/// Triangulated fill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillDraw {
    pub style: FillStyle,
    pub start_verts: Vec<Vec2>,
    /// Morph end vertices; empty for static shapes.
    #[serde(default)]
    pub end_verts: Vec<Vec2>,
    /// Index triples into the vertex list.
    pub indices: Vec<u16>,
}

impl FillDraw {
    pub fn new(style: FillStyle, start_verts: Vec<Vec2>, indices: Vec<u16>) -> Self {
        Self { style, start_verts, end_verts: Vec::new(), indices }
    }

    /// Bitmap fill without a bitmap: nothing to draw.
    #[inline]
    pub fn is_transparent_placeholder(&self) -> bool {
        self.style.bitmap_id() == Some(NO_CHARACTER)
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangles of the start geometry. Triangles with an index past the
    /// vertex list are left out; [`validate`](Self::validate) reports them.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec2; 3]> + '_ {
        let vert = move |i: u16| self.start_verts.get(i as usize).copied();
        self.indices
            .chunks_exact(3)
            .filter_map(move |tri| Some([vert(tri[0])?, vert(tri[1])?, vert(tri[2])?]))
    }

    /// Closed outline of every triangle: `v1, v2, v3, v1`.
    pub fn outline_points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.triangles().flat_map(|[a, b, c]| [a, b, c, a])
    }

    /// Vertices at morph position `t`.
    pub fn verts_at(&self, t: f32) -> Vec<Vec2> {
        lerp_verts(&self.start_verts, &self.end_verts, t)
    }

    /// Check index and morph invariants.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(Error::invalid(format!(
                "fill draw has {} indices, not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= self.start_verts.len()) {
            return Err(Error::invalid(format!(
                "fill draw index {} out of range ({} vertices)",
                bad,
                self.start_verts.len()
            )));
        }
        if !self.end_verts.is_empty() && self.end_verts.len() != self.start_verts.len() {
            return Err(Error::invalid("fill draw morph vertex count mismatch"));
        }
        Ok(())
    }
}

/// Open polyline stroke.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineDraw {
    pub style: LineStyle,
    pub start_verts: Vec<Vec2>,
    #[serde(default)]
    pub end_verts: Vec<Vec2>,
}

impl LineDraw {
    pub fn new(style: LineStyle, start_verts: Vec<Vec2>) -> Self {
        Self { style, start_verts, end_verts: Vec::new() }
    }

    pub fn verts_at(&self, t: f32) -> Vec<Vec2> {
        lerp_verts(&self.start_verts, &self.end_verts, t)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.end_verts.is_empty() && self.end_verts.len() != self.start_verts.len() {
            return Err(Error::invalid("line draw morph vertex count mismatch"));
        }
        Ok(())
    }
}

// ============================================================================
// Shape
// ============================================================================

/// Shape or morph shape geometry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub start_bounds: Rect,
    /// Equal to `start_bounds` for static shapes.
    #[serde(default)]
    pub end_bounds: Rect,
    #[serde(default)]
    pub fill_draws: Vec<FillDraw>,
    #[serde(default)]
    pub line_draws: Vec<LineDraw>,
}

impl Shape {
    pub fn new(bounds: Rect) -> Self {
        Self { start_bounds: bounds, end_bounds: bounds, ..Default::default() }
    }

    pub fn with_fill(mut self, fill: FillDraw) -> Self {
        self.fill_draws.push(fill);
        self
    }

    pub fn with_line(mut self, line: LineDraw) -> Self {
        self.line_draws.push(line);
        self
    }

    /// Bounds at morph position `t`.
    pub fn bounds_at(&self, t: f32) -> Rect {
        let l = |a: f32, b: f32| a + (b - a) * t;
        Rect::new(
            l(self.start_bounds.x_min, self.end_bounds.x_min),
            l(self.start_bounds.y_min, self.end_bounds.y_min),
            l(self.start_bounds.x_max, self.end_bounds.x_max),
            l(self.start_bounds.y_max, self.end_bounds.y_max),
        )
    }

    /// Ids of bitmaps referenced by fill styles (placeholders excluded).
    pub fn bitmap_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.fill_draws
            .iter()
            .filter_map(|d| d.style.bitmap_id())
            .filter(|&id| id != NO_CHARACTER)
    }

    pub fn validate(&self) -> Result<()> {
        for draw in &self.fill_draws {
            draw.validate()?;
        }
        for draw in &self.line_draws {
            draw.validate()?;
        }
        Ok(())
    }
}
