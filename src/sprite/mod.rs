//! Sprite timelines.
//!
//! A sprite is a flat list of commands plus a frame offset table that
//! partitions the list into frames: frame `k` spans
//! `commands[frame_offsets[k]..frame_offsets[k + 1]]` and the last frame runs
//! to the end of the list.
//!
//! Commands keep only their opcode and a byte range into the sprite's
//! payload buffer. Parameters are decoded on demand (see [`CommandParams`]),
//! possibly several times, by rewinding the command's [`BitStream`].

mod builder;
mod dispatch;
mod graph;
mod place;

pub use builder::*;
pub use dispatch::*;
pub use graph::*;
pub use place::*;

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::stream::{BitStream, TagCode};
use crate::util::{Error, Result};

/// One timeline command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteCommand {
    pub tag: TagCode,
    /// Frame the command was recorded in.
    pub frame: u32,
    /// Byte range into [`Sprite::bytes`].
    pub start: u32,
    pub end: u32,
}

impl SpriteCommand {
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode parameters from the owning sprite's payload buffer.
    pub fn decode(&self, bytes: &[u8], version: u8) -> Result<CommandParams> {
        let data = bytes
            .get(self.range())
            .ok_or_else(|| Error::invalid(format!("command range {:?} outside payload", self.range())))?;
        CommandParams::decode(self.tag, &mut BitStream::new(data), version)
    }
}

/// Sprite (movie clip) or main timeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub frame_count: u32,
    pub frame_offsets: Vec<u32>,
    pub commands: Vec<SpriteCommand>,
    /// Payload buffer the command ranges point into.
    #[serde(default)]
    pub bytes: Vec<u8>,
}

impl Sprite {
    #[inline]
    pub fn num_commands(&self) -> usize {
        self.commands.len()
    }

    /// Command by index.
    pub fn command(&self, index: usize) -> Result<&SpriteCommand> {
        self.commands.get(index).ok_or_else(|| {
            Error::invalid(format!("command {} out of range ({})", index, self.commands.len()))
        })
    }

    /// Raw parameter bytes of a command.
    pub fn command_bytes(&self, index: usize) -> Result<&[u8]> {
        let cmd = self.command(index)?;
        self.bytes.get(cmd.range()).ok_or_else(|| {
            Error::invalid(format!("command {} range {:?} outside payload", index, cmd.range()))
        })
    }

    /// Fresh stream positioned at the start of a command's range.
    pub fn command_stream(&self, index: usize) -> Result<BitStream<'_>> {
        Ok(BitStream::new(self.command_bytes(index)?))
    }

    /// Decode a command's parameters.
    pub fn decode_command(&self, index: usize, version: u8) -> Result<CommandParams> {
        let tag = self.command(index)?.tag;
        let mut stream = self.command_stream(index)?;
        CommandParams::decode(tag, &mut stream, version)
    }

    /// Command index range of frame `frame`.
    pub fn frame_range(&self, frame: u32) -> Result<Range<usize>> {
        if frame >= self.frame_count || frame as usize >= self.frame_offsets.len() {
            return Err(Error::FrameOutOfBounds { frame, count: self.frame_count });
        }
        let start = self.frame_offsets[frame as usize] as usize;
        let end = self
            .frame_offsets
            .get(frame as usize + 1)
            .map(|&o| o as usize)
            .unwrap_or(self.commands.len());
        if start > end || end > self.commands.len() {
            return Err(Error::InvalidFrameTable(format!(
                "frame {} spans commands {}..{} of {}",
                frame,
                start,
                end,
                self.commands.len()
            )));
        }
        Ok(start..end)
    }

    /// Commands of a frame with their indices.
    pub fn frame_commands(&self, frame: u32) -> Result<impl Iterator<Item = (usize, &SpriteCommand)> + '_> {
        let range = self.frame_range(frame)?;
        Ok(range.clone().zip(&self.commands[range]))
    }

    /// Frame that contains command `index`.
    pub fn frame_of_command(&self, index: usize) -> Option<u32> {
        if index >= self.commands.len() {
            return None;
        }
        let pos = self.frame_offsets.partition_point(|&o| o as usize <= index);
        pos.checked_sub(1).map(|f| f as u32)
    }

    /// Frame carrying the `FrameLabel` command named `label`.
    pub fn frame_by_label(&self, label: &str, version: u8) -> Result<Option<u32>> {
        for (index, cmd) in self.commands.iter().enumerate() {
            if cmd.tag != TagCode::FrameLabel {
                continue;
            }
            if let CommandParams::FrameLabel { name } = self.decode_command(index, version)? {
                if name == label {
                    return Ok(self.frame_of_command(index));
                }
            }
        }
        Ok(None)
    }

    /// Check frame table and command ranges.
    pub fn validate(&self) -> Result<()> {
        if self.frame_offsets.len() != self.frame_count as usize {
            return Err(Error::InvalidFrameTable(format!(
                "{} offsets for {} frames",
                self.frame_offsets.len(),
                self.frame_count
            )));
        }
        if let Some(w) = self.frame_offsets.windows(2).find(|w| w[0] > w[1]) {
            return Err(Error::InvalidFrameTable(format!(
                "offsets decrease ({} > {})",
                w[0], w[1]
            )));
        }
        if let Some(&last) = self.frame_offsets.last() {
            if last as usize > self.commands.len() {
                return Err(Error::InvalidFrameTable(format!(
                    "offset {} past {} commands",
                    last,
                    self.commands.len()
                )));
            }
        }
        for (index, cmd) in self.commands.iter().enumerate() {
            if cmd.start > cmd.end || cmd.end as usize > self.bytes.len() {
                return Err(Error::InvalidFrameTable(format!(
                    "command {} range {}..{} outside {} payload bytes",
                    index,
                    cmd.start,
                    cmd.end,
                    self.bytes.len()
                )));
            }
        }
        Ok(())
    }
}
