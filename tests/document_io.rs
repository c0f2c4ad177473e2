//! Integration tests for document persistence and playback.

use swf_scene::dict::{Dictionary, DictionaryEntry, EntryPayload, FillDraw, FillStyle, Shape};
use swf_scene::playback::{DrawCommand, Timeline};
use swf_scene::sprite::{CommandParams, PlaceObject2Params, SpriteBuilder};
use swf_scene::util::{Matrix, Rect, Rgba, Vec2};
use swf_scene::{Document, Error};

use tempfile::TempDir;

fn sample_document() -> Document {
    let mut dict = Dictionary::new();
    let square = Shape::new(Rect::new(0.0, 0.0, 10.0, 10.0)).with_fill(FillDraw::new(
        FillStyle::solid(Rgba::new(0, 128, 255, 255)),
        vec![Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0), Vec2::new(0.0, 10.0)],
        vec![0, 1, 2, 0, 2, 3],
    ));
    dict.insert(DictionaryEntry::new(1, EntryPayload::Shape(square))).unwrap();

    let mut spinner = SpriteBuilder::new();
    spinner.place(&PlaceObject2Params::new(1).with_character(1).with_matrix(Matrix::translate(2.0, 0.0))).unwrap();
    spinner.show_frame();
    dict.insert(DictionaryEntry::new(2, EntryPayload::Sprite(spinner.build().unwrap()))).unwrap();

    let mut main = SpriteBuilder::new();
    main.label("intro").unwrap();
    main.place(&PlaceObject2Params::new(1).with_character(2).with_name("spinner")).unwrap();
    main.show_frame();
    main.place(&PlaceObject2Params::new(1).moving().with_matrix(Matrix::translate(10.0, 0.0))).unwrap();
    main.show_frame();
    main.remove(1).unwrap();
    main.show_frame();

    Document::new(320.0, 240.0, dict, main.build().unwrap()).with_frame_rate(12.0)
}

#[test]
fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("movie.json");

    let doc = sample_document();
    doc.save(&path).expect("Failed to save");
    let loaded = Document::load(&path).expect("Failed to load");

    assert_eq!(loaded.to_json().unwrap(), doc.to_json().unwrap());
    assert_eq!(loaded.main.frame_count, 3);
    assert_eq!(loaded.dictionary.len(), 2);
    assert_eq!(loaded.duration(), 0.25);
    assert_eq!(loaded.main.frame_by_label("intro", loaded.version).unwrap(), Some(0));

    // Command bytes survive and decode lazily.
    let params = loaded.main.decode_command(1, loaded.version).unwrap();
    match params {
        CommandParams::PlaceObject2(p) => {
            assert_eq!(p.character_id, Some(2));
            assert_eq!(p.name.as_deref(), Some("spinner"));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_load_errors() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    assert!(matches!(Document::load(dir.path().join("absent.json")), Err(Error::FileNotFound(_))));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();
    assert!(matches!(Document::load(&bad), Err(Error::Json(_))));

    // Frame table pointing past the command list.
    let mut doc = sample_document();
    doc.main.frame_offsets[1] = 99;
    let broken = dir.path().join("broken.json");
    doc.save(&broken).unwrap();
    assert!(matches!(Document::load(&broken), Err(Error::InvalidStructure(_))));
}

#[test]
fn test_playback_steps_through_frames() {
    let doc = sample_document();
    let mut timeline = Timeline::new(&doc);

    assert_eq!(timeline.advance().unwrap(), 0);
    let draws = timeline.draw_list();
    assert_eq!(draws.len(), 1);
    match &draws[0] {
        DrawCommand::Mesh { character_id, vertices, indices, bitmap_id } => {
            assert_eq!(*character_id, 1);
            assert_eq!(indices.len(), 6);
            assert_eq!(vertices[1].position, [12.0, 0.0]);
            assert_eq!(*bitmap_id, None);
        }
        other => panic!("unexpected draw {:?}", other),
    }

    assert_eq!(timeline.advance().unwrap(), 1);
    match &timeline.draw_list()[0] {
        DrawCommand::Mesh { vertices, .. } => assert_eq!(vertices[1].position, [22.0, 0.0]),
        other => panic!("unexpected draw {:?}", other),
    }
    assert_eq!(timeline.display_list().get(1).unwrap().name.as_deref(), Some("spinner"));

    assert_eq!(timeline.advance().unwrap(), 2);
    assert!(timeline.draw_list().is_empty());

    // Looping back replays from the first frame.
    assert_eq!(timeline.advance().unwrap(), 0);
    assert_eq!(timeline.draw_list().len(), 1);
}

#[test]
fn test_sprite_timeline_and_shared_document() {
    let doc = sample_document();
    let mut sprite = Timeline::for_sprite(&doc, 2).unwrap();
    sprite.goto_frame(0).unwrap();
    assert_eq!(sprite.display_list().len(), 1);
    assert!(matches!(Timeline::for_sprite(&doc, 1), Err(Error::KindMismatch { .. })));

    // Read-only walks may share one document across threads.
    std::thread::scope(|s| {
        let a = s.spawn(|| {
            let mut tl = Timeline::new(&doc);
            tl.goto_label("intro").unwrap();
            tl.draw_list().len()
        });
        let b = s.spawn(|| swf_scene::export::to_svg_string(&doc, "", &Default::default()).unwrap());
        assert_eq!(a.join().unwrap(), 1);
        assert!(b.join().unwrap().contains("data-name=\"spinner\""));
    });
}
