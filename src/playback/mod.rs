//! Frame-by-frame playback.
//!
//! [`Timeline`] replays the placement commands of one timeline into a
//! [`DisplayList`]; [`Timeline::draw_list`] flattens that list, nested
//! sprites included, into [`DrawCommand`]s ready for a renderer.
//!
//! Playback is forgiving: a command that fails to decode or references a
//! missing character is logged and skipped, the rest of the frame still plays.

mod draw;
mod timeline;

pub use draw::{DrawCommand, DrawVertex};
pub use timeline::{playback_dispatcher, DisplayList, DisplayObject, Timeline};
