//! Bit stream writer, the encoding counterpart of [`BitStream`](super::BitStream).
//!
//! Used to assemble sprite command payloads in memory: external loaders that
//! re-encode commands, document builders and test fixtures.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::util::{
    f32_to_fixed16, f32_to_fixed8, px_to_twips, ColorTransform, Error, Matrix, Rect, Result, Rgba,
};

/// Number of bits needed to store `value` as a signed bit field.
#[inline]
pub fn sbits_needed(value: i32) -> u32 {
    if value >= 0 {
        33 - (value as u32).leading_zeros()
    } else {
        33 - (!value as u32).leading_zeros()
    }
}

/// Output buffer for SWF bit fields and little-endian integers.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_buf: u8,
    bit_count: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far, counting a partially filled byte.
    pub fn len(&self) -> usize {
        self.buf.len() + usize::from(self.bit_count > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush a partially filled byte (zero padded).
    pub fn align(&mut self) {
        if self.bit_count > 0 {
            self.buf.push(self.bit_buf);
            self.bit_buf = 0;
            self.bit_count = 0;
        }
    }

    /// Finish and return the encoded bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align();
        self.buf
    }

    // ========================================================================
    // Byte-aligned writes
    // ========================================================================

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.align();
        self.buf.write_u8(value)?;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.align();
        self.buf.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.align();
        self.buf.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.align();
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Null-terminated string; interior NUL bytes cannot be represented.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        if s.as_bytes().contains(&0) {
            return Err(Error::invalid(format!("string contains NUL: {:?}", s)));
        }
        self.write_bytes(s.as_bytes())?;
        self.write_u8(0)
    }

    pub fn write_rgb(&mut self, c: Rgba) -> Result<()> {
        self.write_bytes(&[c.r, c.g, c.b])
    }

    pub fn write_rgba(&mut self, c: Rgba) -> Result<()> {
        self.write_bytes(&[c.r, c.g, c.b, c.a])
    }

    // ========================================================================
    // Bit-packed writes
    // ========================================================================

    /// Low `n` bits of `value`, most significant first.
    pub fn write_ubits(&mut self, n: u32, value: u32) -> Result<()> {
        if n > 32 {
            return Err(Error::invalid(format!("bit field too wide: {}", n)));
        }
        for i in (0..n).rev() {
            let bit = ((value >> i) & 1) as u8;
            self.bit_buf |= bit << (7 - self.bit_count);
            self.bit_count += 1;
            if self.bit_count == 8 {
                self.buf.push(self.bit_buf);
                self.bit_buf = 0;
                self.bit_count = 0;
            }
        }
        Ok(())
    }

    pub fn write_sbits(&mut self, n: u32, value: i32) -> Result<()> {
        if n < 32 && n > 0 && sbits_needed(value) > n {
            return Err(Error::invalid(format!("{} does not fit in {} signed bits", value, n)));
        }
        self.write_ubits(n, value as u32)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_ubits(1, value as u32)
    }

    /// Write a bit count into a field of `field_bits` bits, checking range.
    fn write_nbits(&mut self, field_bits: u32, n: u32, what: &str) -> Result<()> {
        if n >= (1 << field_bits) {
            return Err(Error::invalid(format!("{} needs {} bits, field holds {}", what, n, field_bits)));
        }
        self.write_ubits(field_bits, n)
    }

    // ========================================================================
    // Compound records
    // ========================================================================

    /// MATRIX record with minimal bit widths.
    pub fn write_matrix(&mut self, m: &Matrix) -> Result<()> {
        self.align();

        self.write_bool(m.has_scale())?;
        if m.has_scale() {
            let (sx, sy) = (f32_to_fixed16(m.scale_x), f32_to_fixed16(m.scale_y));
            let n = sbits_needed(sx).max(sbits_needed(sy));
            self.write_nbits(5, n, "matrix scale")?;
            self.write_sbits(n, sx)?;
            self.write_sbits(n, sy)?;
        }

        self.write_bool(m.has_rotate())?;
        if m.has_rotate() {
            let (r0, r1) = (f32_to_fixed16(m.rotate_skew0), f32_to_fixed16(m.rotate_skew1));
            let n = sbits_needed(r0).max(sbits_needed(r1));
            self.write_nbits(5, n, "matrix rotate")?;
            self.write_sbits(n, r0)?;
            self.write_sbits(n, r1)?;
        }

        let (tx, ty) = (px_to_twips(m.translate_x), px_to_twips(m.translate_y));
        let n = if tx == 0 && ty == 0 { 0 } else { sbits_needed(tx).max(sbits_needed(ty)) };
        self.write_nbits(5, n, "matrix translate")?;
        self.write_sbits(n, tx)?;
        self.write_sbits(n, ty)?;

        self.align();
        Ok(())
    }

    /// CXFORM record (RGB channels only).
    pub fn write_color_xform_rgb(&mut self, cx: &ColorTransform) -> Result<()> {
        self.write_color_xform(cx, 3)
    }

    /// CXFORMWITHALPHA record.
    pub fn write_color_xform_rgba(&mut self, cx: &ColorTransform) -> Result<()> {
        self.write_color_xform(cx, 4)
    }

    fn write_color_xform(&mut self, cx: &ColorTransform, channels: usize) -> Result<()> {
        self.align();

        let mul: Vec<i32> = cx.mul[..channels].iter().map(|&v| f32_to_fixed8(v)).collect();
        let add: Vec<i32> = cx.add[..channels].iter().map(|&v| (v * 255.0).round() as i32).collect();
        let has_mult = mul.iter().any(|&v| v != 256);
        let has_add = add.iter().any(|&v| v != 0);

        let mut n = 1;
        if has_mult {
            n = mul.iter().fold(n, |acc, &v| acc.max(sbits_needed(v)));
        }
        if has_add {
            n = add.iter().fold(n, |acc, &v| acc.max(sbits_needed(v)));
        }

        self.write_bool(has_add)?;
        self.write_bool(has_mult)?;
        self.write_nbits(4, n, "color transform")?;
        if has_mult {
            for &v in &mul {
                self.write_sbits(n, v)?;
            }
        }
        if has_add {
            for &v in &add {
                self.write_sbits(n, v)?;
            }
        }

        self.align();
        Ok(())
    }

    /// RECT record (pixels in, twips on the wire).
    pub fn write_rect(&mut self, r: &Rect) -> Result<()> {
        self.align();
        let v = [
            px_to_twips(r.x_min),
            px_to_twips(r.x_max),
            px_to_twips(r.y_min),
            px_to_twips(r.y_max),
        ];
        let n = v.iter().fold(1, |acc, &x| acc.max(sbits_needed(x)));
        self.write_nbits(5, n, "rect")?;
        for x in v {
            self.write_sbits(n, x)?;
        }
        self.align();
        Ok(())
    }
}
