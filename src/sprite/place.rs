//! Command parameter records.
//!
//! `PlaceObject2` carries a flags byte followed by the optional fields it
//! announces, always in wire order: depth, character id, matrix, color
//! transform, ratio, name, clip depth, clip actions. Decoding reads every
//! announced field, so the stream ends up exactly past the record whatever
//! the consumer does with the result.

use serde::{Deserialize, Serialize};

use crate::stream::{place_flags, BitStream, BitWriter, TagCode, CLIP_EVENT_FLAGS32_VERSION, CLIP_EVENT_KEY_PRESS};
use crate::util::{ColorTransform, Error, Matrix, Result};

// ============================================================================
// Clip actions
// ============================================================================

/// Event handler record inside a clip action list. Action bytecode is not
/// interpreted; only its extent is kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipActionRecord {
    pub event_flags: u32,
    pub key_code: Option<u8>,
    /// Offset of the action bytes within the command range.
    pub offset: u32,
    pub len: u32,
}

/// Clip action list attached to a placement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipActions {
    pub all_event_flags: u32,
    pub records: Vec<ClipActionRecord>,
}

fn malformed(what: &str, err: Error) -> Error {
    match err {
        Error::StreamUnderrun { offset, needed, .. } => Error::MalformedClipActions(format!(
            "{} truncated at byte {} ({} byte(s) missing)",
            what, offset, needed
        )),
        other => other,
    }
}

fn read_event_flags(stream: &mut BitStream<'_>, version: u8) -> Result<u32> {
    if version >= CLIP_EVENT_FLAGS32_VERSION {
        stream.read_u32()
    } else {
        stream.read_u16().map(u32::from)
    }
}

fn write_event_flags(w: &mut BitWriter, flags: u32, version: u8) -> Result<()> {
    if version >= CLIP_EVENT_FLAGS32_VERSION {
        w.write_u32(flags)
    } else {
        let narrow = u16::try_from(flags)
            .map_err(|_| Error::invalid(format!("event flags {:#x} need version 6", flags)))?;
        w.write_u16(narrow)
    }
}

impl ClipActions {
    /// Walk the record list. The list must run to the end of the command:
    /// a terminator that stops short of it, or record sizes that overrun
    /// it, are rejected.
    pub fn decode(stream: &mut BitStream<'_>, version: u8) -> Result<Self> {
        let _reserved = stream.read_u16().map_err(|e| malformed("header", e))?;
        let all_event_flags = read_event_flags(stream, version).map_err(|e| malformed("header", e))?;

        let mut records = Vec::new();
        loop {
            let event_flags =
                read_event_flags(stream, version).map_err(|e| malformed("end-of-list marker", e))?;
            if event_flags == 0 {
                break;
            }
            let size = stream.read_u32().map_err(|e| malformed("record size", e))? as usize;

            let mut body = size;
            let mut key_code = None;
            if version >= CLIP_EVENT_FLAGS32_VERSION && event_flags & CLIP_EVENT_KEY_PRESS != 0 {
                key_code = Some(stream.read_u8().map_err(|e| malformed("key code", e))?);
                body = size.checked_sub(1).ok_or_else(|| {
                    Error::MalformedClipActions("key press record with zero size".into())
                })?;
            }

            let offset = stream.position();
            stream.skip(body).map_err(|e| malformed("action record", e))?;
            records.push(ClipActionRecord {
                event_flags,
                key_code,
                offset: offset as u32,
                len: body as u32,
            });
        }

        if !stream.is_at_end() {
            return Err(Error::MalformedClipActions(format!(
                "{} byte(s) after end-of-list marker",
                stream.remaining()
            )));
        }
        Ok(Self { all_event_flags, records })
    }

    /// Encode with zero-filled action bodies of the recorded lengths.
    pub fn encode(&self, w: &mut BitWriter, version: u8) -> Result<()> {
        w.write_u16(0)?;
        write_event_flags(w, self.all_event_flags, version)?;
        for record in &self.records {
            if record.event_flags == 0 {
                return Err(Error::invalid("clip action record with no event flags"));
            }
            write_event_flags(w, record.event_flags, version)?;
            let key = record.key_code.filter(|_| version >= CLIP_EVENT_FLAGS32_VERSION);
            w.write_u32(record.len + key.map_or(0, |_| 1))?;
            if let Some(code) = key {
                w.write_u8(code)?;
            }
            w.write_bytes(&vec![0u8; record.len as usize])?;
        }
        write_event_flags(w, 0, version)
    }
}

// ============================================================================
// PlaceObject2
// ============================================================================

/// Decoded `PlaceObject2` parameters. Fields are `Some` exactly when the
/// flags byte announced them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceObject2Params {
    /// Modify the object already at `depth` instead of adding a new one.
    pub is_move: bool,
    pub depth: u16,
    pub character_id: Option<u16>,
    pub matrix: Option<Matrix>,
    pub color_transform: Option<ColorTransform>,
    pub ratio: Option<u16>,
    pub name: Option<String>,
    pub clip_depth: Option<u16>,
    pub clip_actions: Option<ClipActions>,
}

impl PlaceObject2Params {
    pub fn new(depth: u16) -> Self {
        Self { depth, ..Default::default() }
    }

    pub fn with_character(mut self, id: u16) -> Self {
        self.character_id = Some(id);
        self
    }

    pub fn with_matrix(mut self, matrix: Matrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn with_color_transform(mut self, cx: ColorTransform) -> Self {
        self.color_transform = Some(cx);
        self
    }

    pub fn with_ratio(mut self, ratio: u16) -> Self {
        self.ratio = Some(ratio);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_clip_depth(mut self, depth: u16) -> Self {
        self.clip_depth = Some(depth);
        self
    }

    pub fn with_clip_actions(mut self, actions: ClipActions) -> Self {
        self.clip_actions = Some(actions);
        self
    }

    pub fn moving(mut self) -> Self {
        self.is_move = true;
        self
    }

    /// Flags byte implied by the present fields.
    pub fn flags(&self) -> u8 {
        use place_flags::*;
        let mut flags = 0;
        if self.is_move {
            flags |= MOVE;
        }
        if self.character_id.is_some() {
            flags |= HAS_CHARACTER;
        }
        if self.matrix.is_some() {
            flags |= HAS_MATRIX;
        }
        if self.color_transform.is_some() {
            flags |= HAS_COLOR_TRANSFORM;
        }
        if self.ratio.is_some() {
            flags |= HAS_RATIO;
        }
        if self.name.is_some() {
            flags |= HAS_NAME;
        }
        if self.clip_depth.is_some() {
            flags |= HAS_CLIP_DEPTH;
        }
        if self.clip_actions.is_some() {
            flags |= HAS_CLIP_ACTIONS;
        }
        flags
    }

    /// Effective color transform (identity when absent).
    pub fn color_transform_or_identity(&self) -> ColorTransform {
        self.color_transform.unwrap_or(ColorTransform::IDENTITY)
    }

    pub fn decode(stream: &mut BitStream<'_>, version: u8) -> Result<Self> {
        use place_flags::*;
        let flags = stream.read_u8()?;
        let depth = stream.read_u16()?;
        let mut params = Self::new(depth);
        params.is_move = flags & MOVE != 0;

        if flags & HAS_CHARACTER != 0 {
            params.character_id = Some(stream.read_u16()?);
        }
        if flags & HAS_MATRIX != 0 {
            params.matrix = Some(stream.read_matrix()?);
        }
        if flags & HAS_COLOR_TRANSFORM != 0 {
            params.color_transform = Some(stream.read_color_xform_rgba()?);
        }
        if flags & HAS_RATIO != 0 {
            params.ratio = Some(stream.read_u16()?);
        }
        if flags & HAS_NAME != 0 {
            params.name = Some(stream.read_string()?);
        }
        if flags & HAS_CLIP_DEPTH != 0 {
            params.clip_depth = Some(stream.read_u16()?);
        }
        if flags & HAS_CLIP_ACTIONS != 0 {
            params.clip_actions = Some(ClipActions::decode(stream, version)?);
        }
        Ok(params)
    }

    pub fn encode(&self, w: &mut BitWriter, version: u8) -> Result<()> {
        w.write_u8(self.flags())?;
        w.write_u16(self.depth)?;
        if let Some(id) = self.character_id {
            w.write_u16(id)?;
        }
        if let Some(m) = &self.matrix {
            w.write_matrix(m)?;
        }
        if let Some(cx) = &self.color_transform {
            w.write_color_xform_rgba(cx)?;
        }
        if let Some(r) = self.ratio {
            w.write_u16(r)?;
        }
        if let Some(name) = &self.name {
            w.write_string(name)?;
        }
        if let Some(d) = self.clip_depth {
            w.write_u16(d)?;
        }
        if let Some(actions) = &self.clip_actions {
            actions.encode(w, version)?;
        }
        Ok(())
    }

    /// Encode into a standalone payload.
    pub fn to_bytes(&self, version: u8) -> Result<Vec<u8>> {
        let mut w = BitWriter::new();
        self.encode(&mut w, version)?;
        Ok(w.into_bytes())
    }
}

// ============================================================================
// Command parameters
// ============================================================================

/// Parameters of a decoded command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum CommandParams {
    PlaceObject2(PlaceObject2Params),
    RemoveObject { character_id: u16, depth: u16 },
    RemoveObject2 { depth: u16 },
    FrameLabel { name: String },
}

impl CommandParams {
    /// Decode the parameters of a `tag` command. Opcodes without a decoder
    /// yield `UnsupportedTag`.
    pub fn decode(tag: TagCode, stream: &mut BitStream<'_>, version: u8) -> Result<Self> {
        match tag {
            TagCode::PlaceObject2 => Ok(Self::PlaceObject2(PlaceObject2Params::decode(stream, version)?)),
            TagCode::RemoveObject => Ok(Self::RemoveObject {
                character_id: stream.read_u16()?,
                depth: stream.read_u16()?,
            }),
            TagCode::RemoveObject2 => Ok(Self::RemoveObject2 { depth: stream.read_u16()? }),
            TagCode::FrameLabel => {
                let name = stream.read_string()?;
                // Optional named-anchor byte.
                if stream.remaining() == 1 {
                    stream.skip(1)?;
                }
                Ok(Self::FrameLabel { name })
            }
            other => Err(Error::UnsupportedTag(other)),
        }
    }

    pub fn tag(&self) -> TagCode {
        match self {
            Self::PlaceObject2(_) => TagCode::PlaceObject2,
            Self::RemoveObject { .. } => TagCode::RemoveObject,
            Self::RemoveObject2 { .. } => TagCode::RemoveObject2,
            Self::FrameLabel { .. } => TagCode::FrameLabel,
        }
    }

    /// Encode into a standalone payload.
    pub fn to_bytes(&self, version: u8) -> Result<Vec<u8>> {
        let mut w = BitWriter::new();
        match self {
            Self::PlaceObject2(p) => p.encode(&mut w, version)?,
            Self::RemoveObject { character_id, depth } => {
                w.write_u16(*character_id)?;
                w.write_u16(*depth)?;
            }
            Self::RemoveObject2 { depth } => w.write_u16(*depth)?,
            Self::FrameLabel { name } => w.write_string(name)?,
        }
        Ok(w.into_bytes())
    }
}
