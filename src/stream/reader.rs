//! Bit stream reader over one command's byte range.
//!
//! SWF packs bit fields most-significant-bit first; byte-sized integers are
//! little-endian and always start on a byte boundary. Every read is bounds
//! checked against the range the stream was created over, so a truncated
//! command fails with [`Error::StreamUnderrun`] instead of yielding garbage.

use crate::util::{
    fixed16_to_f32, fixed8_to_f32, twips_to_px, ColorTransform, Error, Matrix, Rect, Result, Rgba,
};

/// Saved cursor position, see [`BitStream::checkpoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    byte_pos: usize,
    bit_pos: u8,
}

/// Sequential, checkpointable cursor over a fixed byte range.
#[derive(Clone, Debug)]
pub struct BitStream<'a> {
    data: &'a [u8],
    byte_pos: usize,
    /// Bits already consumed from `data[byte_pos]` (0..8).
    bit_pos: u8,
}

impl<'a> BitStream<'a> {
    /// Create a stream over `data`; position 0 is the start of the range.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, byte_pos: 0, bit_pos: 0 }
    }

    /// Length of the underlying range in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current byte position (a partially read byte counts as unread).
    #[inline]
    pub fn position(&self) -> usize {
        self.byte_pos
    }

    /// Bytes left after aligning to the next byte boundary.
    pub fn remaining(&self) -> usize {
        let pos = self.byte_pos + usize::from(self.bit_pos > 0);
        self.data.len().saturating_sub(pos)
    }

    /// True once every byte of the range has been consumed.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Reset the cursor to the start of the range.
    pub fn rewind(&mut self) {
        self.byte_pos = 0;
        self.bit_pos = 0;
    }

    /// Save the current position.
    #[inline]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { byte_pos: self.byte_pos, bit_pos: self.bit_pos }
    }

    /// Return to a saved position.
    #[inline]
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.byte_pos = checkpoint.byte_pos;
        self.bit_pos = checkpoint.bit_pos;
    }

    /// Skip the rest of a partially read byte.
    #[inline]
    pub fn align(&mut self) {
        if self.bit_pos > 0 {
            self.byte_pos += 1;
            self.bit_pos = 0;
        }
    }

    fn underrun(&self, needed: usize) -> Error {
        Error::StreamUnderrun { offset: self.byte_pos, needed, len: self.data.len() }
    }

    /// Align and make sure `count` whole bytes are available.
    fn ensure_bytes(&mut self, count: usize) -> Result<()> {
        self.align();
        let available = self.data.len().saturating_sub(self.byte_pos);
        if count > available {
            return Err(self.underrun(count - available));
        }
        Ok(())
    }

    // ========================================================================
    // Byte-aligned reads
    // ========================================================================

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure_bytes(1)?;
        let v = self.data[self.byte_pos];
        self.byte_pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure_bytes(2)?;
        let p = self.byte_pos;
        self.byte_pos += 2;
        Ok(u16::from_le_bytes([self.data[p], self.data[p + 1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure_bytes(4)?;
        let p = self.byte_pos;
        self.byte_pos += 4;
        Ok(u32::from_le_bytes([
            self.data[p],
            self.data[p + 1],
            self.data[p + 2],
            self.data[p + 3],
        ]))
    }

    /// Borrow the next `count` bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.ensure_bytes(count)?;
        let p = self.byte_pos;
        self.byte_pos += count;
        Ok(&self.data[p..p + count])
    }

    /// Skip `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Null-terminated UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        self.align();
        let rest = self.data.get(self.byte_pos..).unwrap_or(&[]);
        let Some(end) = rest.iter().position(|&b| b == 0) else {
            return Err(self.underrun(1));
        };
        let s = String::from_utf8(rest[..end].to_vec())?;
        self.byte_pos += end + 1;
        Ok(s)
    }

    pub fn read_rgb(&mut self) -> Result<Rgba> {
        let b = self.read_bytes(3)?;
        Ok(Rgba::rgb(b[0], b[1], b[2]))
    }

    pub fn read_rgba(&mut self) -> Result<Rgba> {
        let b = self.read_bytes(4)?;
        Ok(Rgba::new(b[0], b[1], b[2], b[3]))
    }

    // ========================================================================
    // Bit-packed reads
    // ========================================================================

    /// Unsigned bit field of `n` bits (n <= 32).
    pub fn read_ubits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(Error::invalid(format!("bit field too wide: {}", n)));
        }
        let available = (self.data.len().saturating_sub(self.byte_pos)) * 8 - self.bit_pos as usize;
        if n as usize > available {
            let missing_bits = n as usize - available;
            return Err(self.underrun(missing_bits.div_ceil(8)));
        }

        let mut value: u32 = 0;
        for _ in 0..n {
            let byte = self.data[self.byte_pos];
            let bit = (byte >> (7 - self.bit_pos)) & 1;
            value = (value << 1) | bit as u32;
            self.bit_pos += 1;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }
        Ok(value)
    }

    /// Signed (two's complement) bit field of `n` bits.
    pub fn read_sbits(&mut self, n: u32) -> Result<i32> {
        if n == 0 {
            return Ok(0);
        }
        let raw = self.read_ubits(n)?;
        if n < 32 && raw & (1 << (n - 1)) != 0 {
            Ok((raw | !((1u32 << n) - 1)) as i32)
        } else {
            Ok(raw as i32)
        }
    }

    /// 16.16 fixed point bit field.
    pub fn read_fbits(&mut self, n: u32) -> Result<f32> {
        Ok(fixed16_to_f32(self.read_sbits(n)?))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_ubits(1)? != 0)
    }

    // ========================================================================
    // Compound records
    // ========================================================================

    /// MATRIX record: optional scale pair, optional rotate/skew pair,
    /// translate pair in twips.
    pub fn read_matrix(&mut self) -> Result<Matrix> {
        self.align();
        let mut m = Matrix::IDENTITY;

        if self.read_bool()? {
            let n = self.read_ubits(5)?;
            m.scale_x = self.read_fbits(n)?;
            m.scale_y = self.read_fbits(n)?;
        }
        if self.read_bool()? {
            let n = self.read_ubits(5)?;
            m.rotate_skew0 = self.read_fbits(n)?;
            m.rotate_skew1 = self.read_fbits(n)?;
        }
        let n = self.read_ubits(5)?;
        m.translate_x = twips_to_px(self.read_sbits(n)?);
        m.translate_y = twips_to_px(self.read_sbits(n)?);

        self.align();
        Ok(m)
    }

    /// CXFORM record (RGB only; alpha stays identity).
    pub fn read_color_xform_rgb(&mut self) -> Result<ColorTransform> {
        self.read_color_xform(3)
    }

    /// CXFORMWITHALPHA record.
    pub fn read_color_xform_rgba(&mut self) -> Result<ColorTransform> {
        self.read_color_xform(4)
    }

    fn read_color_xform(&mut self, channels: usize) -> Result<ColorTransform> {
        self.align();
        let mut cx = ColorTransform::IDENTITY;

        let has_add = self.read_bool()?;
        let has_mult = self.read_bool()?;
        let n = self.read_ubits(4)?;

        if has_mult {
            for i in 0..channels {
                cx.mul[i] = fixed8_to_f32(self.read_sbits(n)?);
            }
        }
        if has_add {
            for i in 0..channels {
                cx.add[i] = self.read_sbits(n)? as f32 / 255.0;
            }
        }

        self.align();
        Ok(cx)
    }

    /// RECT record in twips, returned in pixels.
    pub fn read_rect(&mut self) -> Result<Rect> {
        self.align();
        let n = self.read_ubits(5)?;
        let x_min = twips_to_px(self.read_sbits(n)?);
        let x_max = twips_to_px(self.read_sbits(n)?);
        let y_min = twips_to_px(self.read_sbits(n)?);
        let y_max = twips_to_px(self.read_sbits(n)?);
        self.align();
        Ok(Rect::new(x_min, y_min, x_max, y_max))
    }
}
