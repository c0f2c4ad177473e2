//! Sprite containment graph.
//!
//! Edge `a -> b` means frame 0 of sprite `a` places sprite `b`. Exporters
//! and players consult it before following a placement so that a sprite
//! never ends up inside itself.

use std::collections::{BTreeMap, HashSet};

use super::{Dispatcher, OnError, PlaceObject2Params, Scope};
use crate::dict::{Dictionary, EntryKind};
use crate::stream::TagCode;
use crate::util::Result;

/// Frame-0 containment edges between sprites.
#[derive(Clone, Debug, Default)]
pub struct SpriteGraph {
    edges: BTreeMap<u16, Vec<u16>>,
}

impl SpriteGraph {
    /// Scan frame 0 of every sprite in the dictionary.
    pub fn build(dict: &Dictionary, version: u8) -> Result<Self> {
        let dispatcher = Dispatcher::<Vec<u16>>::new().with(TagCode::PlaceObject2, |children, ctx| {
            let params = PlaceObject2Params::decode(&mut ctx.stream, ctx.version)?;
            if let Some(id) = params.character_id {
                if ctx.dictionary.get(id).map(|e| e.kind()) == Some(EntryKind::Sprite) {
                    children.push(id);
                }
            }
            Ok(())
        });

        let mut edges = BTreeMap::new();
        for (id, sprite) in dict.sprites() {
            let mut children = Vec::new();
            if sprite.frame_count > 0 {
                let scope = Scope::new(sprite, Some(id), dict, version);
                dispatcher.walk_frame(&mut children, &scope, 0, OnError::Abort)?;
            }
            children.sort_unstable();
            children.dedup();
            edges.insert(id, children);
        }
        Ok(Self { edges })
    }

    /// Sprites placed by frame 0 of `id`.
    pub fn children(&self, id: u16) -> &[u16] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `to` is reachable from `from` (a sprite reaches itself).
    pub fn reaches(&self, from: u16, to: u16) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend_from_slice(self.children(id));
            }
        }
        false
    }

    /// Placing `target` inside `host` would close a cycle.
    pub fn closes_cycle(&self, host: u16, target: u16) -> bool {
        self.reaches(target, host)
    }

    /// Sprites that sit on a containment cycle.
    pub fn cyclic_sprites(&self) -> Vec<u16> {
        self.edges
            .iter()
            .filter(|(&id, children)| children.iter().any(|&c| self.reaches(c, id)))
            .map(|(&id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::{DictionaryEntry, EntryPayload};
    use crate::sprite::{Sprite, SpriteBuilder};

    fn placing(ids: &[u16]) -> Sprite {
        let mut b = SpriteBuilder::new();
        for (depth, &id) in ids.iter().enumerate() {
            b.place(&PlaceObject2Params::new(depth as u16 + 1).with_character(id)).unwrap();
        }
        b.show_frame();
        b.build().unwrap()
    }

    #[test]
    fn test_self_and_mutual_cycles() {
        let mut dict = Dictionary::new();
        dict.insert(DictionaryEntry::new(1, EntryPayload::Sprite(placing(&[1])))).unwrap();
        dict.insert(DictionaryEntry::new(2, EntryPayload::Sprite(placing(&[3])))).unwrap();
        dict.insert(DictionaryEntry::new(3, EntryPayload::Sprite(placing(&[2, 4])))).unwrap();
        dict.insert(DictionaryEntry::new(4, EntryPayload::Sprite(placing(&[])))).unwrap();

        let graph = SpriteGraph::build(&dict, 10).unwrap();
        assert!(graph.closes_cycle(1, 1));
        assert!(graph.closes_cycle(2, 3));
        assert!(graph.closes_cycle(3, 2));
        assert!(!graph.closes_cycle(3, 4));
        assert_eq!(graph.children(3), &[2, 4]);
        assert_eq!(graph.cyclic_sprites(), vec![1, 2, 3]);
    }

    #[test]
    fn test_non_sprite_targets_are_not_edges() {
        let mut dict = Dictionary::new();
        dict.insert(DictionaryEntry::new(1, EntryPayload::Sprite(placing(&[7, 99])))).unwrap();
        dict.insert(DictionaryEntry::new(7, EntryPayload::Shape(Default::default()))).unwrap();
        let graph = SpriteGraph::build(&dict, 10).unwrap();
        assert!(graph.children(1).is_empty());
    }
}
