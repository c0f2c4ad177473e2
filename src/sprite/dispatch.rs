//! Opcode dispatch over sprite command ranges.
//!
//! A [`Dispatcher`] maps tag codes to handlers. Walking a frame hands each
//! command to its handler together with a [`CommandContext`] holding a fresh
//! stream over the command's bytes, so handlers never see each other's
//! cursor state.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use super::Sprite;
use crate::dict::Dictionary;
use crate::stream::{BitStream, TagCode};
use crate::util::Result;

/// Everything a handler may need about the command being dispatched.
pub struct CommandContext<'a> {
    /// Sprite whose timeline is walked; `None` for the main timeline.
    pub host_id: Option<u16>,
    /// Command index within the host.
    pub index: usize,
    pub tag: TagCode,
    pub stream: BitStream<'a>,
    pub dictionary: &'a Dictionary,
    pub version: u8,
}

/// Timeline being walked together with its surroundings.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub sprite: &'a Sprite,
    pub host_id: Option<u16>,
    pub dictionary: &'a Dictionary,
    pub version: u8,
}

impl<'a> Scope<'a> {
    pub fn new(sprite: &'a Sprite, host_id: Option<u16>, dictionary: &'a Dictionary, version: u8) -> Self {
        Self { sprite, host_id, dictionary, version }
    }

    /// Build the context for command `index`.
    pub fn context(&self, index: usize) -> Result<CommandContext<'a>> {
        let cmd = self.sprite.command(index)?;
        Ok(CommandContext {
            host_id: self.host_id,
            index,
            tag: cmd.tag,
            stream: self.sprite.command_stream(index)?,
            dictionary: self.dictionary,
            version: self.version,
        })
    }
}

/// Handler signature: mutable consumer state plus the command context.
/// Non-capturing closures coerce to it.
pub type Handler<C> = fn(&mut C, &mut CommandContext<'_>) -> Result<()>;

/// Outcome of dispatching one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatched {
    Handled,
    /// No handler registered for the opcode.
    Ignored,
}

/// What a walk does when a handler fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnError {
    /// Stop and return the error.
    #[default]
    Abort,
    /// Log the error and continue with the next command.
    Skip,
}

/// Counters for one walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub handled: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl WalkStats {
    pub fn total(&self) -> usize {
        self.handled + self.ignored + self.failed
    }
}

/// Opcode to handler table.
pub struct Dispatcher<C> {
    handlers: HashMap<TagCode, Handler<C>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self { handlers: HashMap::new() }
    }
}

impl<C> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.handlers.keys().map(|t| t.code()).collect();
        tags.sort_unstable();
        f.debug_struct("Dispatcher").field("tags", &tags).finish()
    }
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; returns true if it replaced an existing one.
    pub fn register(&mut self, tag: TagCode, handler: Handler<C>) -> bool {
        self.handlers.insert(tag, handler).is_some()
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, tag: TagCode, handler: Handler<C>) -> Self {
        self.register(tag, handler);
        self
    }

    pub fn handles(&self, tag: TagCode) -> bool {
        self.handlers.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke the handler for `ctx.tag`, if any.
    pub fn dispatch(&self, state: &mut C, ctx: &mut CommandContext<'_>) -> Result<Dispatched> {
        match self.handlers.get(&ctx.tag) {
            Some(handler) => {
                handler(state, ctx)?;
                Ok(Dispatched::Handled)
            }
            None => {
                tracing::trace!(tag = %ctx.tag, command = ctx.index, "No handler");
                Ok(Dispatched::Ignored)
            }
        }
    }

    /// Dispatch every command in `range` of the scope's sprite, in order.
    pub fn walk_range(
        &self,
        state: &mut C,
        scope: &Scope<'_>,
        range: Range<usize>,
        on_error: OnError,
    ) -> Result<WalkStats> {
        let mut stats = WalkStats::default();
        for index in range {
            let outcome = scope.context(index).and_then(|mut ctx| self.dispatch(state, &mut ctx));
            match outcome {
                Ok(Dispatched::Handled) => stats.handled += 1,
                Ok(Dispatched::Ignored) => stats.ignored += 1,
                Err(e) if on_error == OnError::Skip => {
                    tracing::warn!(host = ?scope.host_id, command = index, error = %e, "Skipping command");
                    stats.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(stats)
    }

    /// Dispatch the commands of one frame.
    pub fn walk_frame(&self, state: &mut C, scope: &Scope<'_>, frame: u32, on_error: OnError) -> Result<WalkStats> {
        let range = scope.sprite.frame_range(frame)?;
        self.walk_range(state, scope, range, on_error)
    }
}
