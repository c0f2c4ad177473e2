//! Display list and frame cursor.

use std::collections::BTreeMap;

use serde::Serialize;

use super::draw::{DrawCommand, Flattener};
use crate::dict::Dictionary;
use crate::document::Document;
use crate::sprite::{CommandContext, CommandParams, Dispatcher, OnError, PlaceObject2Params, Scope, Sprite};
use crate::stream::TagCode;
use crate::util::{ColorTransform, Error, Matrix, Result};

/// One placed character instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayObject {
    pub character_id: u16,
    pub matrix: Matrix,
    pub color_transform: ColorTransform,
    /// Morph ratio, 0..=65535.
    pub ratio: u16,
    pub name: Option<String>,
    pub clip_depth: Option<u16>,
    /// Index of the last command that placed or modified this object.
    pub command: usize,
}

impl DisplayObject {
    pub fn new(character_id: u16) -> Self {
        Self {
            character_id,
            matrix: Matrix::IDENTITY,
            color_transform: ColorTransform::IDENTITY,
            ratio: 0,
            name: None,
            clip_depth: None,
            command: 0,
        }
    }

    /// Overwrite the fields a placement carries.
    fn update(&mut self, params: &PlaceObject2Params) {
        if let Some(m) = params.matrix {
            self.matrix = m;
        }
        if let Some(cx) = params.color_transform {
            self.color_transform = cx;
        }
        if let Some(r) = params.ratio {
            self.ratio = r;
        }
        if let Some(name) = &params.name {
            self.name = Some(name.clone());
        }
        if let Some(d) = params.clip_depth {
            self.clip_depth = Some(d);
        }
    }
}

/// Depth-ordered set of display objects.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DisplayList {
    objects: BTreeMap<u16, DisplayObject>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, depth: u16) -> Option<&DisplayObject> {
        self.objects.get(&depth)
    }

    /// Objects from the lowest depth up.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &DisplayObject)> + '_ {
        self.objects.iter().map(|(&d, o)| (d, o))
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn remove(&mut self, depth: u16) -> Option<DisplayObject> {
        self.objects.remove(&depth)
    }

    /// Apply a placement: add, move, or replace the character at a depth.
    pub fn apply(&mut self, params: &PlaceObject2Params) {
        let depth = params.depth;
        match (params.is_move, params.character_id) {
            (false, Some(id)) => {
                let mut obj = DisplayObject::new(id);
                obj.update(params);
                self.objects.insert(depth, obj);
            }
            (true, Some(id)) => {
                let obj = self.objects.entry(depth).or_insert_with(|| DisplayObject::new(id));
                obj.character_id = id;
                obj.update(params);
            }
            (true, None) => match self.objects.get_mut(&depth) {
                Some(obj) => obj.update(params),
                None => tracing::debug!(depth, "Move of empty depth"),
            },
            (false, None) => tracing::debug!(depth, "Placement without character or move flag"),
        }
    }

    /// Apply a placement decoded from command `index`.
    pub fn apply_command(&mut self, params: &PlaceObject2Params, index: usize) {
        self.apply(params);
        if params.is_move || params.character_id.is_some() {
            if let Some(obj) = self.objects.get_mut(&params.depth) {
                obj.command = index;
            }
        }
    }

    /// Display list after replaying frames `0..=frame` of `sprite`.
    /// Commands that fail are logged and skipped.
    pub fn at_frame(sprite: &Sprite, host_id: Option<u16>, dictionary: &Dictionary, version: u8, frame: u32) -> Result<Self> {
        Self::replay(&playback_dispatcher(), sprite, host_id, dictionary, version, frame, OnError::Skip)
    }

    /// Placements standing after frames `0..=frame`, characters unchecked.
    /// Any decode failure is returned.
    pub fn snapshot(sprite: &Sprite, host_id: Option<u16>, dictionary: &Dictionary, version: u8, frame: u32) -> Result<Self> {
        Self::replay(&snapshot_dispatcher(), sprite, host_id, dictionary, version, frame, OnError::Abort)
    }

    fn replay(
        dispatcher: &Dispatcher<DisplayList>,
        sprite: &Sprite,
        host_id: Option<u16>,
        dictionary: &Dictionary,
        version: u8,
        frame: u32,
        on_error: OnError,
    ) -> Result<Self> {
        let mut list = Self::new();
        let scope = Scope::new(sprite, host_id, dictionary, version);
        for f in 0..=frame {
            dispatcher.walk_frame(&mut list, &scope, f, on_error)?;
        }
        Ok(list)
    }
}

fn on_record(list: &mut DisplayList, ctx: &mut CommandContext<'_>) -> Result<()> {
    let params = PlaceObject2Params::decode(&mut ctx.stream, ctx.version)?;
    list.apply_command(&params, ctx.index);
    Ok(())
}

fn on_place(list: &mut DisplayList, ctx: &mut CommandContext<'_>) -> Result<()> {
    let params = PlaceObject2Params::decode(&mut ctx.stream, ctx.version)?;
    if let Some(id) = params.character_id {
        let kind = ctx.dictionary.resolve(id)?.kind();
        if !kind.is_placeable() {
            return Err(Error::KindMismatch {
                id,
                expected: "placeable character".into(),
                actual: kind.to_string(),
            });
        }
    }
    list.apply_command(&params, ctx.index);
    Ok(())
}

fn on_remove(list: &mut DisplayList, ctx: &mut CommandContext<'_>) -> Result<()> {
    let depth = match CommandParams::decode(ctx.tag, &mut ctx.stream, ctx.version)? {
        CommandParams::RemoveObject { depth, .. } | CommandParams::RemoveObject2 { depth } => depth,
        other => return Err(Error::UnsupportedTag(other.tag())),
    };
    if list.remove(depth).is_none() {
        tracing::trace!(depth, "Remove of empty depth");
    }
    Ok(())
}

/// Handlers for live playback.
pub fn playback_dispatcher() -> Dispatcher<DisplayList> {
    Dispatcher::new()
        .with(TagCode::PlaceObject2, on_place)
        .with(TagCode::RemoveObject, on_remove)
        .with(TagCode::RemoveObject2, on_remove)
}

/// Handlers that record placements without resolving their characters.
fn snapshot_dispatcher() -> Dispatcher<DisplayList> {
    Dispatcher::new()
        .with(TagCode::PlaceObject2, on_record)
        .with(TagCode::RemoveObject, on_remove)
        .with(TagCode::RemoveObject2, on_remove)
}

// ============================================================================
// Timeline
// ============================================================================

/// Playback cursor over one timeline of a document.
pub struct Timeline<'d> {
    doc: &'d Document,
    host_id: Option<u16>,
    sprite: &'d Sprite,
    dispatcher: Dispatcher<DisplayList>,
    current: Option<u32>,
    display: DisplayList,
}

impl<'d> Timeline<'d> {
    /// Cursor over the main timeline.
    pub fn new(doc: &'d Document) -> Self {
        Self::with_sprite(doc, None, &doc.main)
    }

    /// Cursor over a sprite's own timeline.
    pub fn for_sprite(doc: &'d Document, id: u16) -> Result<Self> {
        let sprite = doc.dictionary.resolve_sprite(id)?;
        Ok(Self::with_sprite(doc, Some(id), sprite))
    }

    fn with_sprite(doc: &'d Document, host_id: Option<u16>, sprite: &'d Sprite) -> Self {
        Self {
            doc,
            host_id,
            sprite,
            dispatcher: playback_dispatcher(),
            current: None,
            display: DisplayList::new(),
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.sprite.frame_count
    }

    /// Frame shown, `None` before the first seek.
    pub fn current_frame(&self) -> Option<u32> {
        self.current
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.display
    }

    pub fn reset(&mut self) {
        self.display.clear();
        self.current = None;
    }

    fn play(&mut self, frame: u32) -> Result<()> {
        let scope = Scope::new(self.sprite, self.host_id, &self.doc.dictionary, self.doc.version);
        let stats = self.dispatcher.walk_frame(&mut self.display, &scope, frame, OnError::Skip)?;
        tracing::trace!(frame, handled = stats.handled, failed = stats.failed, "Played frame");
        self.current = Some(frame);
        Ok(())
    }

    /// Seek to `frame`. Seeking backwards replays from frame 0.
    pub fn goto_frame(&mut self, frame: u32) -> Result<()> {
        if frame >= self.frame_count() {
            return Err(Error::FrameOutOfBounds { frame, count: self.frame_count() });
        }
        let start = match self.current {
            Some(c) if c == frame => return Ok(()),
            Some(c) if c < frame => c + 1,
            _ => {
                self.reset();
                0
            }
        };
        for f in start..=frame {
            self.play(f)?;
        }
        Ok(())
    }

    /// Seek to the frame carrying a label.
    pub fn goto_label(&mut self, label: &str) -> Result<()> {
        let frame = self
            .sprite
            .frame_by_label(label, self.doc.version)?
            .ok_or_else(|| Error::other(format!("no frame labelled '{}'", label)))?;
        self.goto_frame(frame)
    }

    /// Step one frame, looping to 0 after the last. Returns the new frame.
    pub fn advance(&mut self) -> Result<u32> {
        let next = match self.current {
            Some(c) if c + 1 < self.frame_count() => c + 1,
            _ => 0,
        };
        self.goto_frame(next)?;
        Ok(next)
    }

    /// Flatten the current display list into draw commands.
    pub fn draw_list(&self) -> Vec<DrawCommand> {
        let mut flattener = Flattener::new(&self.doc.dictionary, self.doc.version);
        if let Some(host) = self.host_id {
            flattener.enter(host);
        }
        flattener.display_list(&self.display, &Matrix::IDENTITY, &ColorTransform::IDENTITY);
        flattener.finish()
    }
}
