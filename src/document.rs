//! Loaded SWF document: header fields, dictionary and main timeline.
//!
//! Binary tag parsing lives with the external loader; documents reach this
//! crate already split into dictionary entries and command ranges, and can be
//! persisted as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dict::Dictionary;
use crate::sprite::{Sprite, SpriteGraph};
use crate::util::{Error, Result};

/// Format version assumed when none is given.
pub const DEFAULT_VERSION: u8 = 10;

fn default_version() -> u8 {
    DEFAULT_VERSION
}

fn default_frame_rate() -> f32 {
    24.0
}

/// Immutable scene: shared read-only by exporters and players.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_version")]
    pub version: u8,
    /// Stage size in pixels.
    pub frame_width: f32,
    pub frame_height: f32,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    #[serde(default)]
    pub dictionary: Dictionary,
    /// Root timeline.
    pub main: Sprite,
}

impl Document {
    pub fn new(frame_width: f32, frame_height: f32, dictionary: Dictionary, main: Sprite) -> Self {
        Self {
            version: DEFAULT_VERSION,
            frame_width,
            frame_height,
            frame_rate: default_frame_rate(),
            dictionary,
            main,
        }
    }

    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn with_frame_rate(mut self, fps: f32) -> Self {
        self.frame_rate = fps;
        self
    }

    /// Load and validate a JSON document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let doc: Self = serde_json::from_reader(BufReader::new(file))?;
        doc.validate()?;
        tracing::debug!(
            path = %path.display(),
            entries = doc.dictionary.len(),
            frames = doc.main.frame_count,
            "Loaded document"
        );
        Ok(doc)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut w = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the main timeline and every dictionary entry.
    pub fn validate(&self) -> Result<()> {
        if !(self.frame_width >= 0.0 && self.frame_height >= 0.0) {
            return Err(Error::invalid(format!(
                "bad stage size {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        self.main
            .validate()
            .map_err(|e| Error::invalid(format!("main timeline: {}", e)))?;
        self.dictionary.validate()
    }

    /// Containment graph of the document's sprites.
    pub fn sprite_graph(&self) -> Result<SpriteGraph> {
        SpriteGraph::build(&self.dictionary, self.version)
    }

    /// Sprite by id, or the main timeline for `None`.
    pub fn timeline(&self, id: Option<u16>) -> Result<&Sprite> {
        match id {
            Some(id) => self.dictionary.resolve_sprite(id),
            None => Ok(&self.main),
        }
    }

    /// Duration of the main timeline in seconds.
    pub fn duration(&self) -> f32 {
        if self.frame_rate > 0.0 {
            self.main.frame_count as f32 / self.frame_rate
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::{DictionaryEntry, EntryPayload, Shape};
    use crate::sprite::{PlaceObject2Params, SpriteBuilder};
    use crate::util::Rect;

    fn sample() -> Document {
        let mut dict = Dictionary::new();
        dict.insert(DictionaryEntry::new(1, EntryPayload::Shape(Shape::new(Rect::new(0.0, 0.0, 10.0, 10.0)))))
            .unwrap();
        let mut b = SpriteBuilder::new();
        b.place(&PlaceObject2Params::new(1).with_character(1)).unwrap();
        b.show_frame();
        Document::new(550.0, 400.0, dict, b.build().unwrap())
    }

    #[test]
    fn test_json_roundtrip() {
        let doc = sample();
        let json = doc.to_json().unwrap();
        let back = Document::from_json(&json).unwrap();
        assert_eq!(back.version, DEFAULT_VERSION);
        assert_eq!(back.frame_width, 550.0);
        assert_eq!(back.main, doc.main);
        assert_eq!(back.dictionary.len(), 1);
    }

    #[test]
    fn test_defaults_applied() {
        let json = r#"{"frame_width": 10, "frame_height": 20,
            "main": {"frame_count": 0, "frame_offsets": [], "commands": []}}"#;
        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.version, DEFAULT_VERSION);
        assert_eq!(doc.frame_rate, 24.0);
        assert!(doc.dictionary.is_empty());
    }

    #[test]
    fn test_invalid_main_rejected() {
        let mut doc = sample();
        doc.main.frame_count = 5;
        assert!(matches!(doc.validate(), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_timeline_lookup() {
        let doc = sample();
        assert!(doc.timeline(None).is_ok());
        assert!(matches!(doc.timeline(Some(1)), Err(Error::KindMismatch { .. })));
        assert!(matches!(doc.timeline(Some(9)), Err(Error::UnresolvedReference(9))));
    }

    #[test]
    fn test_missing_file() {
        let err = Document::load("/nonexistent/doc.json").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
