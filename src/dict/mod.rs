//! Character dictionary.
//!
//! Every reusable resource of a document (shape, morph shape, sprite, font,
//! text, edit text, bitmap) is a dictionary entry with a 16-bit character id.
//! Entries reference each other only by id and are resolved through the
//! dictionary at use time, so sharing and cyclic references (a sprite that
//! places itself) never duplicate data.
//!
//! The dictionary is populated once by a loader and is read-only afterwards.

mod shape;
mod text;

pub use shape::*;
pub use text::*;

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::sprite::Sprite;
use crate::stream::NO_CHARACTER;
use crate::util::{Error, Result};

/// Bitmap entry. Pixel data is owned by the engine's image system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Kind of a dictionary entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Shape,
    Morph,
    Sprite,
    Font,
    Text,
    EditText,
    Bitmap,
}

impl EntryKind {
    pub const ALL: [EntryKind; 7] = [
        Self::Shape,
        Self::Morph,
        Self::Sprite,
        Self::Font,
        Self::Text,
        Self::EditText,
        Self::Bitmap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Shape => "shape",
            Self::Morph => "morph",
            Self::Sprite => "sprite",
            Self::Font => "font",
            Self::Text => "text",
            Self::EditText => "edit_text",
            Self::Bitmap => "bitmap",
        }
    }

    /// Kinds a placement may instantiate directly. Fonts and bitmaps are
    /// only reached indirectly (text entries, fill styles).
    #[inline]
    pub fn is_placeable(&self) -> bool {
        matches!(self, Self::Shape | Self::Morph | Self::Text | Self::EditText | Self::Sprite)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed payload of an entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryPayload {
    Shape(Shape),
    Morph(Shape),
    Sprite(Sprite),
    Font(Font),
    Text(Text),
    EditText(EditText),
    Bitmap(Bitmap),
}

impl EntryPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Shape(_) => EntryKind::Shape,
            Self::Morph(_) => EntryKind::Morph,
            Self::Sprite(_) => EntryKind::Sprite,
            Self::Font(_) => EntryKind::Font,
            Self::Text(_) => EntryKind::Text,
            Self::EditText(_) => EntryKind::EditText,
            Self::Bitmap(_) => EntryKind::Bitmap,
        }
    }
}

/// One dictionary entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub id: u16,
    pub payload: EntryPayload,
}

impl DictionaryEntry {
    pub fn new(id: u16, payload: EntryPayload) -> Self {
        Self { id, payload }
    }

    #[inline]
    pub fn kind(&self) -> EntryKind {
        self.payload.kind()
    }

    /// Geometry for Shape and Morph entries.
    pub fn as_shape(&self) -> Option<&Shape> {
        match &self.payload {
            EntryPayload::Shape(s) | EntryPayload::Morph(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sprite(&self) -> Option<&Sprite> {
        match &self.payload {
            EntryPayload::Sprite(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_font(&self) -> Option<&Font> {
        match &self.payload {
            EntryPayload::Font(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&Bitmap> {
        match &self.payload {
            EntryPayload::Bitmap(b) => Some(b),
            _ => None,
        }
    }
}

/// Entry counts per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub shape: usize,
    pub morph: usize,
    pub sprite: usize,
    pub font: usize,
    pub text: usize,
    pub edit_text: usize,
    pub bitmap: usize,
}

impl KindCounts {
    pub fn get(&self, kind: EntryKind) -> usize {
        match kind {
            EntryKind::Shape => self.shape,
            EntryKind::Morph => self.morph,
            EntryKind::Sprite => self.sprite,
            EntryKind::Font => self.font,
            EntryKind::Text => self.text,
            EntryKind::EditText => self.edit_text,
            EntryKind::Bitmap => self.bitmap,
        }
    }

    pub fn total(&self) -> usize {
        EntryKind::ALL.iter().map(|&k| self.get(k)).sum()
    }
}

// ============================================================================
// Dictionary
// ============================================================================

/// Id-indexed arena of entries with O(1) lookup.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(try_from = "Vec<DictionaryEntry>")]
pub struct Dictionary {
    slots: Vec<Option<DictionaryEntry>>,
    len: usize,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries in file order.
    pub fn from_entries(entries: impl IntoIterator<Item = DictionaryEntry>) -> Result<Self> {
        let mut dict = Self::new();
        for entry in entries {
            dict.insert(entry)?;
        }
        Ok(dict)
    }

    /// Register an entry. Ids are unique and `0xFFFF` is reserved.
    pub fn insert(&mut self, entry: DictionaryEntry) -> Result<()> {
        let id = entry.id;
        if id == NO_CHARACTER {
            return Err(Error::invalid("character id 0xFFFF is reserved"));
        }
        let index = id as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        if self.slots[index].is_some() {
            return Err(Error::DuplicateCharacter(id));
        }
        self.slots[index] = Some(entry);
        self.len += 1;
        Ok(())
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the highest assigned id.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, id: u16) -> bool {
        self.get(id).is_some()
    }

    /// Entry by id, `None` when unassigned.
    #[inline]
    pub fn get(&self, id: u16) -> Option<&DictionaryEntry> {
        self.slots.get(id as usize).and_then(|s| s.as_ref())
    }

    /// Entry by id; an unassigned id is an error.
    pub fn resolve(&self, id: u16) -> Result<&DictionaryEntry> {
        self.get(id).ok_or(Error::UnresolvedReference(id))
    }

    fn mismatch(entry: &DictionaryEntry, expected: &str) -> Error {
        Error::KindMismatch {
            id: entry.id,
            expected: expected.to_string(),
            actual: entry.kind().to_string(),
        }
    }

    /// Shape geometry of a Shape or Morph entry.
    pub fn resolve_shape(&self, id: u16) -> Result<&Shape> {
        let entry = self.resolve(id)?;
        entry.as_shape().ok_or_else(|| Self::mismatch(entry, "shape"))
    }

    pub fn resolve_sprite(&self, id: u16) -> Result<&Sprite> {
        let entry = self.resolve(id)?;
        entry.as_sprite().ok_or_else(|| Self::mismatch(entry, "sprite"))
    }

    pub fn resolve_font(&self, id: u16) -> Result<&Font> {
        let entry = self.resolve(id)?;
        entry.as_font().ok_or_else(|| Self::mismatch(entry, "font"))
    }

    pub fn resolve_bitmap(&self, id: u16) -> Result<&Bitmap> {
        let entry = self.resolve(id)?;
        entry.as_bitmap().ok_or_else(|| Self::mismatch(entry, "bitmap"))
    }

    /// Bitmap reference from a fill style: `0xFFFF` is a legitimate absence.
    pub fn bitmap_ref(&self, id: u16) -> Result<Option<&Bitmap>> {
        if id == NO_CHARACTER {
            return Ok(None);
        }
        self.resolve_bitmap(id).map(Some)
    }

    /// Display name of a font, if `id` is a font entry.
    pub fn font_name(&self, id: u16) -> Option<&str> {
        self.get(id).and_then(|e| e.as_font()).map(|f| f.name.as_str())
    }

    /// Entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = &DictionaryEntry> + '_ {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Sprite entries in id order.
    pub fn sprites(&self) -> impl Iterator<Item = (u16, &Sprite)> + '_ {
        self.entries().filter_map(|e| e.as_sprite().map(|s| (e.id, s)))
    }

    pub fn counts(&self) -> KindCounts {
        let mut c = KindCounts::default();
        for entry in self.entries() {
            match entry.kind() {
                EntryKind::Shape => c.shape += 1,
                EntryKind::Morph => c.morph += 1,
                EntryKind::Sprite => c.sprite += 1,
                EntryKind::Font => c.font += 1,
                EntryKind::Text => c.text += 1,
                EntryKind::EditText => c.edit_text += 1,
                EntryKind::Bitmap => c.bitmap += 1,
            }
        }
        c
    }

    /// Check the structural invariants of every entry.
    pub fn validate(&self) -> Result<()> {
        for entry in self.entries() {
            let checked = match &entry.payload {
                EntryPayload::Shape(s) | EntryPayload::Morph(s) => s.validate(),
                EntryPayload::Sprite(s) => s.validate(),
                _ => Ok(()),
            };
            checked.map_err(|e| Error::invalid(format!("character {}: {}", entry.id, e)))?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<DictionaryEntry>> for Dictionary {
    type Error = Error;

    fn try_from(entries: Vec<DictionaryEntry>) -> Result<Self> {
        Self::from_entries(entries)
    }
}

impl Serialize for Dictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Rect, Rgba};

    fn shape_entry(id: u16) -> DictionaryEntry {
        DictionaryEntry::new(id, EntryPayload::Shape(Shape::new(Rect::default())))
    }

    #[test]
    fn test_insert_and_resolve() {
        let mut dict = Dictionary::new();
        dict.insert(shape_entry(3)).unwrap();
        dict.insert(DictionaryEntry::new(1, EntryPayload::Font(Font::new("Sans")))).unwrap();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.slot_count(), 4);
        assert!(dict.resolve_shape(3).is_ok());
        assert_eq!(dict.font_name(1), Some("Sans"));
        assert!(matches!(dict.resolve(2), Err(Error::UnresolvedReference(2))));
        assert!(matches!(dict.resolve(900), Err(Error::UnresolvedReference(900))));
        assert!(matches!(dict.resolve_sprite(3), Err(Error::KindMismatch { id: 3, .. })));

        let ids: Vec<u16> = dict.entries().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_duplicate_and_reserved_ids() {
        let mut dict = Dictionary::new();
        dict.insert(shape_entry(5)).unwrap();
        assert!(matches!(dict.insert(shape_entry(5)), Err(Error::DuplicateCharacter(5))));
        assert!(dict.insert(shape_entry(NO_CHARACTER)).is_err());
    }

    #[test]
    fn test_bitmap_ref_absent_is_not_an_error() {
        let mut dict = Dictionary::new();
        dict.insert(DictionaryEntry::new(9, EntryPayload::Bitmap(Bitmap::new(64, 32)))).unwrap();
        assert!(dict.bitmap_ref(NO_CHARACTER).unwrap().is_none());
        assert_eq!(dict.bitmap_ref(9).unwrap(), Some(&Bitmap::new(64, 32)));
        assert!(dict.bitmap_ref(10).is_err());
    }

    #[test]
    fn test_placeable_kinds() {
        assert!(EntryKind::Shape.is_placeable());
        assert!(EntryKind::Sprite.is_placeable());
        assert!(EntryKind::EditText.is_placeable());
        assert!(!EntryKind::Font.is_placeable());
        assert!(!EntryKind::Bitmap.is_placeable());
    }

    #[test]
    fn test_serde_roundtrip_rejects_duplicates() {
        let mut dict = Dictionary::new();
        dict.insert(shape_entry(2)).unwrap();
        dict.insert(DictionaryEntry::new(
            4,
            EntryPayload::EditText(EditText::new(Rect::default(), 1, 200, Rgba::BLACK, "x")),
        ))
        .unwrap();

        let json = serde_json::to_string(&dict).unwrap();
        let back: Dictionary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.counts(), dict.counts());

        let dup = format!("[{0},{0}]", serde_json::to_string(&shape_entry(2)).unwrap());
        assert!(serde_json::from_str::<Dictionary>(&dup).is_err());
    }
}
