//! Length-checked little-endian cursor over a borrowed byte span
//!
//! Every read is bounds-checked against the span; nothing here can read past
//! the end of the caller's buffer.

use super::DecodeError;

/// Cursor over a read-only byte span
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Cursor positioned at `offset`
    #[inline]
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, pos: offset }
    }

    /// Current absolute position
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current position
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Borrow the next `len` bytes and advance
    #[inline]
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::Truncated {
            offset: self.pos,
            needed: len,
            available: self.remaining(),
        })?;
        if end > self.data.len() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Fail unless `len` bytes are available from the current position
    #[inline]
    pub fn require(&self, len: usize) -> Result<(), DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.take(len).map(|_| ())
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    #[inline]
    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        self.array::<2>().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        self.array::<4>().map(i32::from_le_bytes)
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        self.array::<4>().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        self.array::<4>().map(f32::from_le_bytes)
    }

    /// Read `N` consecutive f32 values
    #[inline]
    pub fn f32_array<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        let mut out = [0f32; N];
        for slot in out.iter_mut() {
            *slot = self.f32()?;
        }
        Ok(out)
    }

    /// Fixed-width NUL-padded text field
    #[inline]
    pub fn fixed_str(&mut self, width: usize) -> Result<String, DecodeError> {
        self.take(width).map(fixed_str)
    }
}

/// Peek a little-endian u32 at `offset` without a cursor
#[inline]
pub fn peek_u32(data: &[u8], offset: usize) -> Result<u32, DecodeError> {
    ByteReader::at(data, offset).u32()
}

/// Decode a fixed-width text field
///
/// Cut at the first NUL, lossy UTF-8, surrounding whitespace trimmed.
pub fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}
