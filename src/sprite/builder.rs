//! Programmatic sprite construction.

use super::{CommandParams, PlaceObject2Params, Sprite, SpriteCommand};
use crate::stream::TagCode;
use crate::util::{Error, Result};

/// Builds a [`Sprite`] command by command.
///
/// Commands go into the current frame until [`show_frame`](Self::show_frame)
/// closes it. Commands left after the last `show_frame` form a final frame.
#[derive(Debug, Clone)]
pub struct SpriteBuilder {
    version: u8,
    bytes: Vec<u8>,
    commands: Vec<SpriteCommand>,
    frame_offsets: Vec<u32>,
    frame_start: usize,
}

impl Default for SpriteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteBuilder {
    pub fn new() -> Self {
        Self {
            version: crate::document::DEFAULT_VERSION,
            bytes: Vec::new(),
            commands: Vec::new(),
            frame_offsets: Vec::new(),
            frame_start: 0,
        }
    }

    /// Format version used when encoding parameters.
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Append a command with a raw payload.
    pub fn command(&mut self, tag: TagCode, payload: &[u8]) -> &mut Self {
        let start = self.bytes.len() as u32;
        self.bytes.extend_from_slice(payload);
        self.commands.push(SpriteCommand {
            tag,
            frame: self.frame_offsets.len() as u32,
            start,
            end: self.bytes.len() as u32,
        });
        self
    }

    /// Append a decoded command.
    pub fn params(&mut self, params: &CommandParams) -> Result<&mut Self> {
        let payload = params.to_bytes(self.version)?;
        Ok(self.command(params.tag(), &payload))
    }

    pub fn place(&mut self, params: &PlaceObject2Params) -> Result<&mut Self> {
        self.params(&CommandParams::PlaceObject2(params.clone()))
    }

    pub fn remove(&mut self, depth: u16) -> Result<&mut Self> {
        self.params(&CommandParams::RemoveObject2 { depth })
    }

    pub fn label(&mut self, name: &str) -> Result<&mut Self> {
        self.params(&CommandParams::FrameLabel { name: name.to_string() })
    }

    /// Close the current frame.
    pub fn show_frame(&mut self) -> &mut Self {
        self.frame_offsets.push(self.frame_start as u32);
        self.frame_start = self.commands.len();
        self
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_offsets.len() as u32 + u32::from(self.commands.len() > self.frame_start)
    }

    pub fn build(mut self) -> Result<Sprite> {
        if self.commands.len() > self.frame_start {
            self.frame_offsets.push(self.frame_start as u32);
        }
        if self.bytes.len() > u32::MAX as usize {
            return Err(Error::invalid("sprite payload exceeds 4 GiB"));
        }
        let sprite = Sprite {
            frame_count: self.frame_offsets.len() as u32,
            frame_offsets: self.frame_offsets,
            commands: self.commands,
            bytes: self.bytes,
        };
        sprite.validate()?;
        Ok(sprite)
    }
}
