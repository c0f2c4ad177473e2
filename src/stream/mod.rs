//! Low-level SWF bit stream access.
//!
//! Sprite commands are stored as independent byte ranges. Each range is read
//! through a [`BitStream`], which knows the SWF field encodings:
//!
//! ```text
//! UI8/UI16/UI32   little-endian, byte aligned
//! UB[n]/SB[n]     bit fields, most significant bit first
//! FB[n]           16.16 fixed point bit field
//! MATRIX          HasScale, [NScaleBits, ScaleX, ScaleY],
//!                 HasRotate, [NRotateBits, RotateSkew0, RotateSkew1],
//!                 NTranslateBits, TranslateX, TranslateY (twips)
//! CXFORM[ALPHA]   HasAdd, HasMult, NBits, [mult terms], [add terms]
//! STRING          UTF-8 bytes, NUL terminated
//! ```
//!
//! [`BitWriter`] produces the same encodings.

mod format;
mod reader;
mod writer;

pub use format::*;
pub use reader::*;
pub use writer::*;
