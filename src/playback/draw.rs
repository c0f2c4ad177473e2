//! Flattening display lists into draw calls.
//!
//! Nested sprites contribute their frame-0 display list. Each nesting level
//! concatenates the placement matrix and composes the color transform; a
//! sprite already on the ancestry stack is not entered again.

use glam::Affine2;
use smallvec::SmallVec;

use super::timeline::{DisplayList, DisplayObject};
use crate::dict::{ratio_to_t, Dictionary, EditText, EntryPayload, FillStyle, Shape, Text};
use crate::util::{ColorTransform, Matrix, Rgba, Vec2};

/// GPU-ready vertex: position in stage pixels, straight-alpha unit color.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl DrawVertex {
    pub fn new(position: Vec2, color: Rgba) -> Self {
        Self { position: position.to_array(), color: color.to_unit() }
    }
}

/// One draw call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Indexed triangle list. `bitmap_id` names the texture of bitmap fills.
    Mesh {
        character_id: u16,
        vertices: Vec<DrawVertex>,
        indices: Vec<u16>,
        bitmap_id: Option<u16>,
    },
    /// Open line strip.
    Lines {
        character_id: u16,
        vertices: Vec<DrawVertex>,
        width: f32,
    },
    /// Text run positioned by `transform`.
    Text {
        character_id: u16,
        transform: Affine2,
        text: String,
        font: Option<String>,
        size: f32,
        color: Rgba,
    },
}

impl DrawCommand {
    pub fn character_id(&self) -> u16 {
        match self {
            Self::Mesh { character_id, .. } | Self::Lines { character_id, .. } | Self::Text { character_id, .. } => {
                *character_id
            }
        }
    }

    /// Vertex data as raw bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        match self {
            Self::Mesh { vertices, .. } | Self::Lines { vertices, .. } => bytemuck::cast_slice(vertices),
            Self::Text { .. } => &[],
        }
    }
}

/// Recursive display list walker.
pub(crate) struct Flattener<'d> {
    dict: &'d Dictionary,
    version: u8,
    ancestry: SmallVec<[u16; 8]>,
    out: Vec<DrawCommand>,
}

impl<'d> Flattener<'d> {
    pub fn new(dict: &'d Dictionary, version: u8) -> Self {
        Self { dict, version, ancestry: SmallVec::new(), out: Vec::new() }
    }

    /// Mark a sprite as being rendered.
    pub fn enter(&mut self, sprite_id: u16) {
        self.ancestry.push(sprite_id);
    }

    pub fn finish(self) -> Vec<DrawCommand> {
        self.out
    }

    pub fn display_list(&mut self, list: &DisplayList, matrix: &Matrix, cx: &ColorTransform) {
        for (_, obj) in list.iter() {
            self.object(obj, matrix, cx);
        }
    }

    fn object(&mut self, obj: &DisplayObject, parent: &Matrix, parent_cx: &ColorTransform) {
        let id = obj.character_id;
        let Some(entry) = self.dict.get(id) else {
            tracing::trace!(id, "Unresolved display object");
            return;
        };
        let matrix = parent.concat(&obj.matrix);
        let cx = obj.color_transform.then(parent_cx);

        match &entry.payload {
            EntryPayload::Shape(shape) => self.shape(id, shape, 0.0, &matrix, &cx),
            EntryPayload::Morph(shape) => self.shape(id, shape, ratio_to_t(obj.ratio), &matrix, &cx),
            EntryPayload::EditText(et) => self.edit_text(id, et, &matrix, &cx),
            EntryPayload::Text(text) => self.text(id, text, &matrix, &cx),
            EntryPayload::Sprite(sprite) => {
                if self.ancestry.contains(&id) {
                    tracing::debug!(id, depth = self.ancestry.len(), "Cyclic sprite not entered");
                    return;
                }
                if sprite.frame_count == 0 {
                    return;
                }
                let list = match DisplayList::at_frame(sprite, Some(id), self.dict, self.version, 0) {
                    Ok(list) => list,
                    Err(e) => {
                        tracing::warn!(id, error = %e, "Sprite frame 0 unavailable");
                        return;
                    }
                };
                self.ancestry.push(id);
                self.display_list(&list, &matrix, &cx);
                self.ancestry.pop();
            }
            EntryPayload::Font(_) | EntryPayload::Bitmap(_) => {}
        }
    }

    fn shape(&mut self, id: u16, shape: &Shape, t: f32, matrix: &Matrix, cx: &ColorTransform) {
        let xf = matrix.to_affine();
        for draw in &shape.fill_draws {
            if draw.is_transparent_placeholder() {
                continue;
            }
            let color = match &draw.style {
                FillStyle::Bitmap { .. } => Rgba::WHITE,
                style => style.color_at(t).unwrap_or(Rgba::TRANSPARENT),
            };
            let color = cx.apply(color);
            let vertices = draw
                .verts_at(t)
                .into_iter()
                .map(|p| DrawVertex::new(xf.transform_point2(p), color))
                .collect();
            self.out.push(DrawCommand::Mesh {
                character_id: id,
                vertices,
                indices: draw.indices.clone(),
                bitmap_id: draw.style.bitmap_id(),
            });
        }
        for draw in &shape.line_draws {
            let color = cx.apply(draw.style.color_at(t));
            let vertices = draw
                .verts_at(t)
                .into_iter()
                .map(|p| DrawVertex::new(xf.transform_point2(p), color))
                .collect();
            self.out.push(DrawCommand::Lines { character_id: id, vertices, width: draw.style.width_at(t) });
        }
    }

    fn edit_text(&mut self, id: u16, et: &EditText, matrix: &Matrix, cx: &ColorTransform) {
        let (x, y) = et.origin();
        let transform = matrix.to_affine() * Affine2::from_translation(Vec2::new(x, y));
        self.out.push(DrawCommand::Text {
            character_id: id,
            transform,
            text: et.initial_text.clone(),
            font: self.dict.font_name(et.font_id).map(str::to_string),
            size: et.font_size(),
            color: cx.apply(et.color),
        });
    }

    fn text(&mut self, id: u16, text: &Text, matrix: &Matrix, cx: &ColorTransform) {
        let base = matrix.concat(&text.matrix).to_affine();
        for run in text.runs() {
            let font = run.font_id.and_then(|f| self.dict.get(f)).and_then(|e| e.as_font());
            self.out.push(DrawCommand::Text {
                character_id: id,
                transform: base * Affine2::from_translation(Vec2::new(run.x, run.y)),
                text: run.decode(font),
                font: font.map(|f| f.name.clone()),
                size: run.size(),
                color: cx.apply(run.color),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::{DictionaryEntry, FillDraw, LineDraw, LineStyle, Shape};
    use crate::sprite::{PlaceObject2Params, SpriteBuilder};
    use crate::util::Rect;

    fn tri_shape() -> Shape {
        Shape::new(Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_fill(FillDraw::new(
                FillStyle::solid(Rgba::new(255, 0, 0, 255)),
                vec![Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)],
                vec![0, 1, 2],
            ))
            .with_line(LineDraw::new(LineStyle::new(2.0, Rgba::WHITE), vec![Vec2::ZERO, Vec2::splat(10.0)]))
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<DrawVertex>(), 24);
        let cmd = DrawCommand::Lines {
            character_id: 1,
            vertices: vec![DrawVertex::new(Vec2::ONE, Rgba::WHITE)],
            width: 1.0,
        };
        assert_eq!(cmd.vertex_bytes().len(), 24);
    }

    #[test]
    fn test_nested_transform_and_color() {
        let mut dict = Dictionary::new();
        dict.insert(DictionaryEntry::new(1, EntryPayload::Shape(tri_shape()))).unwrap();

        let mut b = SpriteBuilder::new();
        b.place(&PlaceObject2Params::new(1).with_character(1).with_matrix(Matrix::translate(1.0, 0.0)))
            .unwrap();
        b.show_frame();
        dict.insert(DictionaryEntry::new(2, EntryPayload::Sprite(b.build().unwrap()))).unwrap();

        let mut list = DisplayList::new();
        let half = ColorTransform { mul: [0.5, 1.0, 1.0, 1.0], add: [0.0; 4] };
        list.apply(
            &PlaceObject2Params::new(1)
                .with_character(2)
                .with_matrix(Matrix::translate(100.0, 0.0))
                .with_color_transform(half),
        );

        let mut f = Flattener::new(&dict, 10);
        f.display_list(&list, &Matrix::IDENTITY, &ColorTransform::IDENTITY);
        let cmds = f.finish();
        assert_eq!(cmds.len(), 2);
        match &cmds[0] {
            DrawCommand::Mesh { vertices, indices, .. } => {
                assert_eq!(indices, &vec![0, 1, 2]);
                assert_eq!(vertices[1].position, [111.0, 0.0]);
                assert!((vertices[0].color[0] - 128.0 / 255.0).abs() < 0.01);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&cmds[1], DrawCommand::Lines { width, .. } if *width == 2.0));
    }

    #[test]
    fn test_self_referencing_sprite_terminates() {
        let mut dict = Dictionary::new();
        dict.insert(DictionaryEntry::new(1, EntryPayload::Shape(tri_shape()))).unwrap();
        let mut b = SpriteBuilder::new();
        b.place(&PlaceObject2Params::new(1).with_character(1)).unwrap();
        b.place(&PlaceObject2Params::new(2).with_character(5)).unwrap();
        b.show_frame();
        dict.insert(DictionaryEntry::new(5, EntryPayload::Sprite(b.build().unwrap()))).unwrap();

        let mut list = DisplayList::new();
        list.apply(&PlaceObject2Params::new(1).with_character(5));
        let mut f = Flattener::new(&dict, 10);
        f.display_list(&list, &Matrix::IDENTITY, &ColorTransform::IDENTITY);
        // Sprite 5 renders its shape once; the inner self-placement is cut.
        assert_eq!(f.finish().len(), 2);
    }

    #[test]
    fn test_morph_ratio_interpolates() {
        let mut fill = FillDraw::new(
            FillStyle::Solid { start_color: Rgba::BLACK, end_color: Rgba::WHITE },
            vec![Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)],
            vec![0, 1, 2],
        );
        fill.end_verts = vec![Vec2::ZERO, Vec2::new(20.0, 0.0), Vec2::new(0.0, 20.0)];
        let mut dict = Dictionary::new();
        dict.insert(DictionaryEntry::new(
            3,
            EntryPayload::Morph(Shape::new(Rect::default()).with_fill(fill)),
        ))
        .unwrap();

        let mut list = DisplayList::new();
        list.apply(&PlaceObject2Params::new(1).with_character(3).with_ratio(65535));
        let mut f = Flattener::new(&dict, 10);
        f.display_list(&list, &Matrix::IDENTITY, &ColorTransform::IDENTITY);
        match &f.finish()[0] {
            DrawCommand::Mesh { vertices, .. } => {
                assert_eq!(vertices[1].position, [20.0, 0.0]);
                assert_eq!(vertices[1].color, [1.0, 1.0, 1.0, 1.0]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
