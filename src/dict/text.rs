//! Fonts, static text and edit text entries.

use serde::{Deserialize, Serialize};

use crate::util::{twips_to_px, Matrix, Rect, Rgba};

/// Paragraph alignment of an edit text field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    Justify,
}

impl TextAlign {
    /// Map the wire value (0 left, 1 right, 2 center, 3 justify).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Center),
            3 => Some(Self::Justify),
            _ => None,
        }
    }

    /// SVG `text-anchor` keyword. Justify has no equivalent and falls back to start.
    pub fn svg_anchor(&self) -> &'static str {
        match self {
            Self::Left => "start",
            Self::Center => "middle",
            Self::Right => "end",
            Self::Justify => "start",
        }
    }
}

/// Font entry. Glyph outlines stay with the engine's font system.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Font {
    /// Display name used for font-family resolution.
    pub name: String,
    /// Character code per glyph index.
    #[serde(default)]
    pub glyph_codes: Vec<u16>,
    #[serde(default)]
    pub ascent: f32,
    #[serde(default)]
    pub descent: f32,
    #[serde(default)]
    pub leading: f32,
}

impl Font {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Character for a glyph index, if the code table maps it.
    pub fn char_for_glyph(&self, index: u32) -> Option<char> {
        self.glyph_codes
            .get(index as usize)
            .and_then(|&code| char::from_u32(code as u32))
    }
}

/// Editable (dynamic/input) text field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditText {
    pub bounds: Rect,
    pub font_id: u16,
    /// Font height in twips.
    pub font_height: u16,
    pub color: Rgba,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub max_length: u16,
    #[serde(default)]
    pub left_margin: f32,
    #[serde(default)]
    pub right_margin: f32,
    #[serde(default)]
    pub leading: f32,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub word_wrap: bool,
    /// Bound variable name.
    #[serde(default)]
    pub variable: String,
    #[serde(default)]
    pub initial_text: String,
}

impl EditText {
    pub fn new(bounds: Rect, font_id: u16, font_height: u16, color: Rgba, initial_text: impl Into<String>) -> Self {
        Self {
            bounds,
            font_id,
            font_height,
            color,
            align: TextAlign::Left,
            max_length: 0,
            left_margin: 0.0,
            right_margin: 0.0,
            leading: 0.0,
            multiline: false,
            word_wrap: false,
            variable: String::new(),
            initial_text: initial_text.into(),
        }
    }

    /// Font size in pixels (`font_height / 20`).
    #[inline]
    pub fn font_size(&self) -> f32 {
        twips_to_px(self.font_height as i32)
    }

    /// Text origin: left edge, baseline at the bottom of the bounds.
    pub fn origin(&self) -> (f32, f32) {
        (self.bounds.x_min, self.bounds.y_max)
    }
}

/// Glyph reference inside a text record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlyphEntry {
    pub index: u32,
    /// Advance in pixels.
    pub advance: f32,
}

/// Static text record; unset fields carry over from the previous record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    #[serde(default)]
    pub font_id: Option<u16>,
    #[serde(default)]
    pub color: Option<Rgba>,
    #[serde(default)]
    pub x_offset: Option<f32>,
    #[serde(default)]
    pub y_offset: Option<f32>,
    /// Height in twips.
    #[serde(default)]
    pub text_height: Option<u16>,
    #[serde(default)]
    pub glyphs: Vec<GlyphEntry>,
}

/// Static text entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub bounds: Rect,
    #[serde(default)]
    pub matrix: Matrix,
    #[serde(default)]
    pub records: Vec<TextRecord>,
}

/// A text record with the carried-over state resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub font_id: Option<u16>,
    pub color: Rgba,
    pub x: f32,
    pub y: f32,
    /// Height in twips.
    pub height: u16,
    pub glyphs: Vec<GlyphEntry>,
}

impl TextRun {
    /// Height in pixels.
    pub fn size(&self) -> f32 {
        twips_to_px(self.height as i32)
    }

    /// Decode glyph indices through `font`; unmapped glyphs become U+FFFD.
    pub fn decode(&self, font: Option<&Font>) -> String {
        self.glyphs
            .iter()
            .map(|g| font.and_then(|f| f.char_for_glyph(g.index)).unwrap_or('\u{FFFD}'))
            .collect()
    }
}

impl Text {
    /// Resolve records into runs. The pen advances by glyph advances, so a
    /// record without an x offset continues where the previous one ended.
    pub fn runs(&self) -> Vec<TextRun> {
        let mut runs = Vec::with_capacity(self.records.len());
        let mut font_id = None;
        let mut color = Rgba::BLACK;
        let (mut x, mut y) = (0.0f32, 0.0f32);
        let mut height = 0u16;

        for record in &self.records {
            if record.font_id.is_some() {
                font_id = record.font_id;
            }
            if let Some(c) = record.color {
                color = c;
            }
            if let Some(v) = record.x_offset {
                x = v;
            }
            if let Some(v) = record.y_offset {
                y = v;
            }
            if let Some(h) = record.text_height {
                height = h;
            }

            runs.push(TextRun { font_id, color, x, y, height, glyphs: record.glyphs.clone() });
            x += record.glyphs.iter().map(|g| g.advance).sum::<f32>();
        }
        runs
    }
}
