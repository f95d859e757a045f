//! Variable-length integer encoding
//!
//! Byte-compatible with the historic "vlong" layout: values in -112..=127
//! take one byte; otherwise a length/sign marker byte is followed by the
//! big-endian magnitude (ones' complement for negatives) with leading zero
//! bytes dropped. `420` encodes as `8E 01 A4`.

use crate::serialisation::error::{SerialisationError, SerialisationResult};

/// Bounds-checked cursor over a byte slice
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    serialiser: &'static str,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], serialiser: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            serialiser,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_byte(&mut self, context: &'static str) -> SerialisationResult<u8> {
        let byte = *self.data.get(self.pos).ok_or_else(|| self.eof(context))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> SerialisationResult<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(self.eof(context));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_vlong(&mut self, context: &'static str) -> SerialisationResult<i64> {
        let first = self.read_byte(context)? as i8;
        let len = decode_size(first);
        if len == 1 {
            return Ok(first as i64);
        }
        let mut value: i64 = 0;
        for _ in 0..len - 1 {
            value = (value << 8) | self.read_byte(context)? as i64;
        }
        Ok(if is_negative(first) { !value } else { value })
    }

    /// Fail unless every byte was consumed
    pub fn finish(&self) -> SerialisationResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SerialisationError::Corrupt {
                serialiser: self.serialiser,
                reason: format!("{} trailing bytes", self.data.len() - self.pos),
            })
        }
    }

    fn eof(&self, context: &'static str) -> SerialisationError {
        SerialisationError::Corrupt {
            serialiser: self.serialiser,
            reason: format!("unexpected end of input reading {}", context),
        }
    }
}

pub fn write_vlong(out: &mut Vec<u8>, value: i64) {
    if (-112..=127).contains(&value) {
        out.push(value as i8 as u8);
        return;
    }

    let mut len: i32 = -112;
    let mut magnitude = value;
    if value < 0 {
        magnitude = !value;
        len = -120;
    }

    let mut tmp = magnitude;
    while tmp != 0 {
        tmp >>= 8;
        len -= 1;
    }
    out.push(len as i8 as u8);

    let byte_count = if len < -120 { -(len + 120) } else { -(len + 112) };
    for idx in (0..byte_count).rev() {
        out.push(((magnitude >> (idx * 8)) & 0xFF) as u8);
    }
}

fn decode_size(first: i8) -> usize {
    if first >= -112 {
        1
    } else if first < -120 {
        (-119 - first as i32) as usize
    } else {
        (-111 - first as i32) as usize
    }
}

fn is_negative(first: i8) -> bool {
    first < -120 || (-112..0).contains(&first)
}
