//! # swf-scene
//!
//! Interpreter for the display-list side of SWF movies: a character
//! dictionary, per-sprite tag streams of placement commands, an SVG exporter
//! and a frame-by-frame playback cursor.
//!
//! Documents are JSON (see [`document::Document`]) holding pre-tessellated
//! shapes and the raw command bytes of every timeline. Command bodies are
//! decoded lazily, one bounded [`stream::BitStream`] per command.
//!
//! ## Modules
//!
//! - [`util`] - Errors, twips and fixed-point math, matrices and color transforms
//! - [`stream`] - Tag codes and the bit-level reader/writer
//! - [`dict`] - Character dictionary (shapes, morphs, fonts, text, bitmaps)
//! - [`sprite`] - Sprite timelines, command decoding and tag dispatch
//! - [`document`] - Document container and JSON I/O
//! - [`export`] - SVG exporter
//! - [`playback`] - Display list replay and draw command flattening
//!
//! ## Example
//!
//! ```ignore
//! use swf_scene::prelude::*;
//!
//! let doc = Document::load("movie.json")?;
//! let stats = export_svg(&doc, Path::new("movie.svg"), &ExportOptions::default())?;
//! println!("{} placements", stats.placements);
//! ```

pub mod util;
pub mod stream;
pub mod dict;
pub mod sprite;
pub mod document;
pub mod export;
pub mod playback;

// Re-export commonly used types
pub use util::{Error, Result};
pub use document::Document;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{ColorTransform, Error, Matrix, Rect, Result, Rgba};
    pub use crate::dict::{Dictionary, DictionaryEntry, EntryKind, EntryPayload};
    pub use crate::sprite::{CommandParams, Dispatcher, PlaceObject2Params, Sprite, SpriteBuilder};
    pub use crate::stream::{BitStream, TagCode};
    pub use crate::document::Document;
    pub use crate::export::{export_svg, ExportOptions, ExportStats};
    pub use crate::playback::{DrawCommand, Timeline};
}
