//! Integration tests for SVG export of in-memory documents.

use swf_scene::dict::{
    Bitmap, Dictionary, DictionaryEntry, EditText, EntryPayload, FillDraw, FillStyle, Font, LineDraw, LineStyle,
    Shape,
};
use swf_scene::export::{export_svg, to_svg_string, ExportOptions};
use swf_scene::sprite::{ClipActionRecord, ClipActions, PlaceObject2Params, Sprite, SpriteBuilder};
use swf_scene::stream::{TagCode, NO_CHARACTER};
use swf_scene::util::{ColorTransform, Matrix, Rect, Rgba, Vec2};
use swf_scene::{Document, Error};

use tempfile::TempDir;

/// Red triangle (0,0)-(10,0)-(0,10) plus a white 2px line (0,0)-(10,10).
fn triangle_shape() -> Shape {
    Shape::new(Rect::new(0.0, 0.0, 10.0, 10.0))
        .with_fill(FillDraw::new(
            FillStyle::solid(Rgba::new(255, 0, 0, 255)),
            vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)],
            vec![0, 1, 2],
        ))
        .with_line(LineDraw::new(
            LineStyle::new(2.0, Rgba::WHITE),
            vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)],
        ))
}

fn dict_with(entries: Vec<(u16, EntryPayload)>) -> Dictionary {
    let mut dict = Dictionary::new();
    for (id, payload) in entries {
        dict.insert(DictionaryEntry::new(id, payload)).expect("Failed to insert entry");
    }
    dict
}

fn one_frame(places: &[PlaceObject2Params]) -> Sprite {
    let mut b = SpriteBuilder::new();
    for p in places {
        b.place(p).expect("Failed to encode placement");
    }
    b.show_frame();
    b.build().expect("Failed to build sprite")
}

fn render(doc: &Document) -> String {
    to_svg_string(doc, "img", &ExportOptions::default()).expect("Export failed")
}

/// Body of the definition group `<g id="id">`, up to its closing tag.
fn group<'a>(svg: &'a str, id: u16) -> &'a str {
    let open = format!("\t\t<g id=\"{}\">", id);
    let start = svg.find(&open).unwrap_or_else(|| panic!("group {} missing", id));
    let body = &svg[start + open.len()..];
    let end = body.find("\t\t</g>").expect("unclosed group");
    &body[..end]
}

#[test]
fn test_single_shape_document() {
    let dict = dict_with(vec![(1, EntryPayload::Shape(triangle_shape()))]);
    let doc = Document::new(100.0, 100.0, dict, one_frame(&[PlaceObject2Params::new(1).with_character(1)]));
    let svg = render(&doc);

    let g = group(&svg, 1);
    assert_eq!(g.matches("<polygon").count(), 1);
    assert!(g.contains(r#"<polygon fill="rgba(255,0,0,1.0)" points="0,0 10,0 0,10 0,0"/>"#));
    assert_eq!(g.matches("<polyline").count(), 1);
    assert!(g.contains(
        r#"<polyline fill="none" stroke="rgba(255,255,255,1.0)" stroke-width="2" points="0,0 10,10"/>"#
    ));

    let root = format!("\t<g id=\"{}\">", doc.dictionary.slot_count());
    let root_body = &svg[svg.find(&root).expect("root group missing")..];
    assert!(root_body.contains("<use xlink:href=\"#1\"/>"));
    assert!(!root_body.contains("transform"));
}

#[test]
fn test_skipped_placements_do_not_affect_siblings() {
    let dict = dict_with(vec![
        (1, EntryPayload::Shape(triangle_shape())),
        (3, EntryPayload::Font(Font::new("Arial"))),
    ]);
    let main = one_frame(&[
        PlaceObject2Params::new(1).with_character(99),
        PlaceObject2Params::new(2).with_character(3),
        PlaceObject2Params::new(3).with_character(1).with_matrix(Matrix::translate(5.0, 5.0)),
    ]);
    let doc = Document::new(100.0, 100.0, dict, main);

    let mut buf = Vec::new();
    let stats = swf_scene::export::write_svg(&doc, &mut buf, "", &ExportOptions::default()).unwrap();
    let svg = String::from_utf8(buf).unwrap();

    assert_eq!(stats.placements, 1);
    assert_eq!(stats.skipped_placements, 2);
    assert!(svg.contains(r##"<use xlink:href="#1" transform="matrix(1, 0, 0, 1, 5, 5)"/>"##));
    assert!(!svg.contains("#99"));
    assert!(!svg.contains("#3\""));
    // Fonts get no group.
    assert!(!svg.contains("<g id=\"3\">"));
}

#[test]
fn test_placeholder_bitmap_fill_skipped_lines_kept() {
    let shape = Shape::new(Rect::new(0.0, 0.0, 10.0, 10.0))
        .with_fill(FillDraw::new(
            FillStyle::bitmap(NO_CHARACTER, Matrix::IDENTITY),
            vec![Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)],
            vec![0, 1, 2],
        ))
        .with_line(LineDraw::new(LineStyle::new(1.0, Rgba::BLACK), vec![Vec2::ZERO, Vec2::ONE]));
    let dict = dict_with(vec![(7, EntryPayload::Shape(shape))]);
    let doc = Document::new(10.0, 10.0, dict, one_frame(&[PlaceObject2Params::new(1).with_character(7)]));

    let mut buf = Vec::new();
    let stats = swf_scene::export::write_svg(&doc, &mut buf, "img", &ExportOptions::default()).unwrap();
    let svg = String::from_utf8(buf).unwrap();
    let g = group(&svg, 7);

    assert!(!g.contains("<polygon"));
    assert!(!g.contains("<image"));
    assert!(!g.contains("<clipPath"));
    assert!(!svg.contains("<filter"));
    assert_eq!(g.matches("<polyline").count(), 1);
    assert_eq!(stats.skipped_fills, 1);
}

#[test]
fn test_one_filter_per_placement_none_for_identity() {
    let dict = dict_with(vec![(1, EntryPayload::Shape(triangle_shape()))]);
    let half_red = ColorTransform { mul: [0.5, 1.0, 1.0, 1.0], add: [0.0; 4] };
    let main = one_frame(&[
        PlaceObject2Params::new(1).with_character(1).with_color_transform(half_red),
        PlaceObject2Params::new(2).with_character(1).with_color_transform(half_red),
        PlaceObject2Params::new(3).with_character(1).with_color_transform(ColorTransform::IDENTITY),
    ]);
    let doc = Document::new(10.0, 10.0, dict, main);
    let svg = render(&doc);
    let root = doc.dictionary.slot_count();

    assert_eq!(svg.matches("<filter").count(), 2);
    assert!(svg.contains(&format!("<filter id=\"cf_{}_1_0\"", root)));
    assert!(svg.contains(&format!("<filter id=\"cf_{}_1_1\"", root)));
    assert!(svg.contains(r#"values="0.5 0 0 0 0 0 1 0 0 0 0 0 1 0 0 0 0 0 1 0""#));
    assert!(svg.contains(&format!("<use xlink:href=\"#1\" filter=\"url(#cf_{}_1_1)\"/>", root)));
    // The identity placement references the group without a filter.
    assert_eq!(svg.matches("<use xlink:href=\"#1\"/>").count(), 1);
}

#[test]
fn test_font_height_in_twips() {
    let dict = dict_with(vec![
        (1, EntryPayload::Font(Font::new("Verdana"))),
        (2, EntryPayload::EditText(EditText::new(Rect::new(0.0, 0.0, 50.0, 12.0), 1, 200, Rgba::BLACK, "Hi"))),
    ]);
    let doc = Document::new(50.0, 12.0, dict, Sprite::default());
    let svg = render(&doc);
    let g = group(&svg, 2);
    assert!(g.contains(r#"font-family="Verdana" font-size="10""#));
    assert!(g.contains(r#"text-anchor="start">Hi</text>"#));
}

#[test]
fn test_sprite_in_sprite_and_self_reference() {
    let mut inner = SpriteBuilder::new();
    inner.place(&PlaceObject2Params::new(1).with_character(1)).unwrap();
    inner.show_frame();

    let mut outer = SpriteBuilder::new();
    outer.place(&PlaceObject2Params::new(1).with_character(2)).unwrap();
    outer.place(&PlaceObject2Params::new(2).with_character(3)).unwrap();
    outer.show_frame();
    // Later frames are not part of the static export.
    outer.place(&PlaceObject2Params::new(3).with_character(1)).unwrap();
    outer.show_frame();

    let dict = dict_with(vec![
        (1, EntryPayload::Shape(triangle_shape())),
        (2, EntryPayload::Sprite(inner.build().unwrap())),
        (3, EntryPayload::Sprite(outer.build().unwrap())),
    ]);
    let doc = Document::new(10.0, 10.0, dict, one_frame(&[PlaceObject2Params::new(1).with_character(3)]));

    let mut buf = Vec::new();
    let stats = swf_scene::export::write_svg(&doc, &mut buf, "", &ExportOptions::default()).unwrap();
    let svg = String::from_utf8(buf).unwrap();

    assert!(group(&svg, 2).contains("\t\t\t<use xlink:href=\"#1\"/>"));
    let g3 = group(&svg, 3);
    assert!(g3.contains("<use xlink:href=\"#2\"/>"));
    assert!(!g3.contains("#3"));
    assert!(!g3.contains("#1"));
    assert_eq!(stats.sprites, 2);
    assert_eq!(stats.skipped_placements, 1);
}

#[test]
fn test_mutually_recursive_sprites_terminate() {
    let mut a = SpriteBuilder::new();
    a.place(&PlaceObject2Params::new(1).with_character(5)).unwrap();
    a.show_frame();
    let mut b = SpriteBuilder::new();
    b.place(&PlaceObject2Params::new(1).with_character(4)).unwrap();
    b.show_frame();

    let dict = dict_with(vec![
        (4, EntryPayload::Sprite(a.build().unwrap())),
        (5, EntryPayload::Sprite(b.build().unwrap())),
    ]);
    let doc = Document::new(10.0, 10.0, dict, one_frame(&[PlaceObject2Params::new(1).with_character(4)]));
    assert_eq!(doc.sprite_graph().unwrap().cyclic_sprites(), vec![4, 5]);

    let mut buf = Vec::new();
    let stats = swf_scene::export::write_svg(&doc, &mut buf, "", &ExportOptions::default()).unwrap();
    assert_eq!(stats.skipped_placements, 2);
    assert_eq!(stats.placements, 1);
}

#[test]
fn test_clip_actions_do_not_desync_following_commands() {
    let actions = ClipActions {
        all_event_flags: 0x0002_0001,
        records: vec![ClipActionRecord { event_flags: 0x0002_0000, key_code: Some(13), offset: 0, len: 5 }],
    };
    let main = one_frame(&[
        PlaceObject2Params::new(1).with_character(1).with_clip_actions(actions),
        PlaceObject2Params::new(2).with_character(1).with_name("after"),
    ]);
    let dict = dict_with(vec![(1, EntryPayload::Shape(triangle_shape()))]);
    let doc = Document::new(10.0, 10.0, dict, main);
    let svg = render(&doc);
    assert_eq!(svg.matches("<use xlink:href=\"#1\"").count(), 2);
    assert!(svg.contains(r#"data-name="after""#));
}

#[test]
fn test_export_writes_file_atomically() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("scene.svg");

    let fill = FillDraw::new(
        FillStyle::bitmap(4, Matrix::scale(2.0, 2.0)),
        vec![Vec2::ZERO, Vec2::new(64.0, 0.0), Vec2::new(0.0, 32.0)],
        vec![0, 1, 2],
    );
    let dict = dict_with(vec![
        (4, EntryPayload::Bitmap(Bitmap::new(32, 16))),
        (5, EntryPayload::Shape(Shape::new(Rect::default()).with_fill(fill))),
    ]);
    let doc = Document::new(64.0, 32.0, dict, one_frame(&[PlaceObject2Params::new(1).with_character(5)]));

    let stats = export_svg(&doc, &path, &ExportOptions::default()).expect("Export failed");
    assert_eq!(stats.images, 1);
    assert!(path.exists());
    assert!(!dir.path().join("scene.svg.partial").exists());

    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains(r#"<clipPath id="clip_5_0">"#));
    assert!(svg.contains(
        r#"xlink:href="scene/image_characterid_4.png" width="32" height="16" transform="matrix(2, 0, 0, 2, 0, 0)""#
    ));
}

#[test]
fn test_failed_export_leaves_no_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("broken.svg");

    let dict = dict_with(vec![(1, EntryPayload::Shape(triangle_shape()))]);
    let mut b = SpriteBuilder::new();
    b.place(&PlaceObject2Params::new(1).with_character(1)).unwrap();
    // Flags announce a character but the depth is cut off.
    b.command(TagCode::PlaceObject2, &[0x02, 0x01]);
    b.show_frame();
    let doc = Document::new(10.0, 10.0, dict, b.build().unwrap());

    let err = export_svg(&doc, &path, &ExportOptions::default()).unwrap_err();
    assert!(matches!(err, Error::StreamUnderrun { .. }), "unexpected error: {}", err);
    assert!(!path.exists());
    assert!(!dir.path().join("broken.svg.partial").exists());
}

#[test]
fn test_frame_selection_and_options_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let cfg = dir.path().join("opts.json");
    std::fs::write(&cfg, r#"{ "frame": 1, "view_box": false, "precision": 2 }"#).unwrap();
    let opts = ExportOptions::load(&cfg).unwrap();

    let mut b = SpriteBuilder::new();
    b.place(&PlaceObject2Params::new(1).with_character(1)).unwrap();
    b.show_frame();
    b.place(&PlaceObject2Params::new(1).moving().with_matrix(Matrix::translate(1.0 / 3.0, 0.0))).unwrap();
    b.show_frame();
    let dict = dict_with(vec![(1, EntryPayload::Shape(triangle_shape()))]);
    let doc = Document::new(10.0, 10.0, dict, b.build().unwrap());

    let svg = to_svg_string(&doc, "", &opts).unwrap();
    assert!(!svg.contains("viewBox"));
    // Frame 1 shows the shape placed in frame 0 at its moved position.
    assert_eq!(svg.matches("<use").count(), 1);
    assert!(svg.contains(r##"<use xlink:href="#1" transform="matrix(1, 0, 0, 1, 0.33, 0)"/>"##));

    assert!(matches!(ExportOptions::load(dir.path().join("missing.json")), Err(Error::FileNotFound(_))));
}

#[test]
fn test_later_frame_exports_standing_placements() {
    let half_red = ColorTransform { mul: [0.5, 1.0, 1.0, 1.0], add: [0.0; 4] };
    let mut b = SpriteBuilder::new();
    b.place(&PlaceObject2Params::new(1).with_character(1).with_name("a")).unwrap();
    b.place(&PlaceObject2Params::new(2).with_character(1)).unwrap();
    b.place(&PlaceObject2Params::new(3).with_character(9)).unwrap();
    b.show_frame();
    b.place(&PlaceObject2Params::new(1).moving().with_matrix(Matrix::translate(5.0, 0.0))).unwrap();
    b.place(&PlaceObject2Params::new(2).moving().with_color_transform(half_red)).unwrap();
    b.show_frame();
    b.remove(1).unwrap();
    b.show_frame();
    let dict = dict_with(vec![(1, EntryPayload::Shape(triangle_shape()))]);
    let doc = Document::new(10.0, 10.0, dict, b.build().unwrap());
    let root = format!("\t<g id=\"{}\">", doc.dictionary.slot_count());

    let opts = ExportOptions::default().with_frame(1);
    let svg = to_svg_string(&doc, "", &opts).unwrap();
    let body = &svg[svg.find(&root).expect("root group missing")..];
    assert_eq!(body.matches("<use").count(), 2);
    let moved = body.find(r##"<use xlink:href="#1" transform="matrix(1, 0, 0, 1, 5, 0)" data-name="a"/>"##).unwrap();
    // The color change made by command 4 names the filter.
    let root_id = doc.dictionary.slot_count();
    let tinted = body.find(&format!(r##"<use xlink:href="#1" filter="url(#cf_{}_1_4)"/>"##, root_id)).unwrap();
    assert!(moved < tinted);
    assert!(body.contains(&format!(r#"<filter id="cf_{}_1_4""#, root_id)));

    let opts = ExportOptions::default().with_frame(2);
    let svg = to_svg_string(&doc, "", &opts).unwrap();
    let body = &svg[svg.find(&root).expect("root group missing")..];
    assert_eq!(body.matches("<use").count(), 1);
    assert!(!body.contains("data-name"));

    let opts = ExportOptions::default().with_frame(3);
    assert!(matches!(to_svg_string(&doc, "", &opts), Err(Error::FrameOutOfBounds { frame: 3, count: 3 })));
}

#[test]
fn test_out_of_range_fill_index_is_rejected() {
    let bad = Shape::new(Rect::new(0.0, 0.0, 10.0, 10.0)).with_fill(FillDraw::new(
        FillStyle::solid(Rgba::WHITE),
        vec![Vec2::ZERO],
        vec![0, 1, 2],
    ));
    let dict = dict_with(vec![(1, EntryPayload::Shape(bad))]);
    let doc = Document::new(10.0, 10.0, dict, one_frame(&[PlaceObject2Params::new(1).with_character(1)]));

    assert!(matches!(to_svg_string(&doc, "", &ExportOptions::default()), Err(Error::InvalidStructure(_))));

    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("bad.svg");
    assert!(export_svg(&doc, &path, &ExportOptions::default()).is_err());
    assert!(!path.exists());
}
