//! SWF format constants and tag codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Character id meaning "no character" (e.g. a bitmap fill without a bitmap).
pub const NO_CHARACTER: u16 = 0xFFFF;

/// First SWF version that uses 32-bit clip event flags.
pub const CLIP_EVENT_FLAGS32_VERSION: u8 = 6;

/// Clip event flag for key presses; such records carry an extra key code byte.
pub const CLIP_EVENT_KEY_PRESS: u32 = 0x0002_0000;

/// Gradient square half-size in pixels (16384 twips).
pub const GRADIENT_SQUARE_HALF: f32 = 819.2;

// ============================================================================
// PlaceObject2 flags
// ============================================================================

/// PlaceObject2 `flags1` bits, in wire order of the fields they guard.
pub mod place_flags {
    pub const MOVE: u8 = 0x01;
    pub const HAS_CHARACTER: u8 = 0x02;
    pub const HAS_MATRIX: u8 = 0x04;
    pub const HAS_COLOR_TRANSFORM: u8 = 0x08;
    pub const HAS_RATIO: u8 = 0x10;
    pub const HAS_NAME: u8 = 0x20;
    pub const HAS_CLIP_DEPTH: u8 = 0x40;
    pub const HAS_CLIP_ACTIONS: u8 = 0x80;
}

// ============================================================================
// Tag codes
// ============================================================================

/// Opcode of a sprite command.
///
/// Only tags that can appear inside a sprite's command stream are named;
/// anything else is carried as `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum TagCode {
    ShowFrame,
    PlaceObject,
    RemoveObject,
    DoAction,
    StartSound,
    PlaceObject2,
    RemoveObject2,
    FrameLabel,
    DoInitAction,
    PlaceObject3,
    StartSound2,
    /// Engine extension carrying a Lua script.
    DoLua,
    Unknown(u16),
}

impl TagCode {
    /// Numeric code of the engine's Lua script tag (outside the range Adobe assigns).
    pub const DO_LUA_CODE: u16 = 1000;

    /// Map a numeric tag code.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::ShowFrame,
            4 => Self::PlaceObject,
            5 => Self::RemoveObject,
            12 => Self::DoAction,
            15 => Self::StartSound,
            26 => Self::PlaceObject2,
            28 => Self::RemoveObject2,
            43 => Self::FrameLabel,
            59 => Self::DoInitAction,
            70 => Self::PlaceObject3,
            89 => Self::StartSound2,
            Self::DO_LUA_CODE => Self::DoLua,
            other => Self::Unknown(other),
        }
    }

    /// Numeric tag code.
    pub fn code(&self) -> u16 {
        match self {
            Self::ShowFrame => 1,
            Self::PlaceObject => 4,
            Self::RemoveObject => 5,
            Self::DoAction => 12,
            Self::StartSound => 15,
            Self::PlaceObject2 => 26,
            Self::RemoveObject2 => 28,
            Self::FrameLabel => 43,
            Self::DoInitAction => 59,
            Self::PlaceObject3 => 70,
            Self::StartSound2 => 89,
            Self::DoLua => Self::DO_LUA_CODE,
            Self::Unknown(code) => *code,
        }
    }

    /// Tag name as used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShowFrame => "ShowFrame",
            Self::PlaceObject => "PlaceObject",
            Self::RemoveObject => "RemoveObject",
            Self::DoAction => "DoAction",
            Self::StartSound => "StartSound",
            Self::PlaceObject2 => "PlaceObject2",
            Self::RemoveObject2 => "RemoveObject2",
            Self::FrameLabel => "FrameLabel",
            Self::DoInitAction => "DoInitAction",
            Self::PlaceObject3 => "PlaceObject3",
            Self::StartSound2 => "StartSound2",
            Self::DoLua => "DoLua",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// True for every named tag. Unknown tags are still safe no-ops.
    #[inline]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<u16> for TagCode {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

impl From<TagCode> for u16 {
    fn from(tag: TagCode) -> Self {
        tag.code()
    }
}

impl fmt::Display for TagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({})", code),
            other => f.write_str(other.name()),
        }
    }
}
