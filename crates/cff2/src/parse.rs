//! Bounds-checked big-endian reading with offset-carrying errors.

use font_types::Uint24;
use read_fonts::FontData;

use crate::error::FormatError;

/// A forward-only reader over a byte slice.
///
/// `base` is the position of the slice within the enclosing table so that
/// errors report table-relative offsets.
#[derive(Clone)]
pub(crate) struct Cursor<'a> {
    data: FontData<'a>,
    pos: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_base(bytes, 0)
    }

    pub fn with_base(bytes: &'a [u8], base: usize) -> Self {
        Self { data: FontData::new(bytes), pos: 0, base }
    }

    /// Position relative to the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Position relative to the enclosing table.
    pub fn table_offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn eof(&self) -> FormatError {
        FormatError::UnexpectedEnd { offset: self.table_offset() }
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        let value = self.data.read_at::<u8>(self.pos).map_err(|_| self.eof())?;
        self.pos += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        let value = self.data.read_at::<u16>(self.pos).map_err(|_| self.eof())?;
        self.pos += 2;
        Ok(value)
    }

    pub fn read_i16(&mut self) -> Result<i16, FormatError> {
        let value = self.data.read_at::<i16>(self.pos).map_err(|_| self.eof())?;
        self.pos += 2;
        Ok(value)
    }

    pub fn read_u24(&mut self) -> Result<u32, FormatError> {
        let value = self.data.read_at::<Uint24>(self.pos).map_err(|_| self.eof())?;
        self.pos += 3;
        Ok(value.to_u32())
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        let value = self.data.read_at::<u32>(self.pos).map_err(|_| self.eof())?;
        self.pos += 4;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32, FormatError> {
        let value = self.data.read_at::<i32>(self.pos).map_err(|_| self.eof())?;
        self.pos += 4;
        Ok(value)
    }

    /// Reads an unsigned big-endian integer of `size` bytes (1..=4).
    pub fn read_offset(&mut self, size: u8) -> Result<u32, FormatError> {
        Ok(match size {
            1 => self.read_u8()? as u32,
            2 => self.read_u16()? as u32,
            3 => self.read_u24()?,
            4 => self.read_u32()?,
            _ => {
                return Err(FormatError::InvalidIndexOffsetSize {
                    offset: self.table_offset(),
                    size,
                });
            }
        })
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        let bytes = self
            .data
            .as_bytes()
            .get(self.pos..self.pos.saturating_add(len))
            .ok_or_else(|| self.eof())?;
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), FormatError> {
        self.read_bytes(len).map(|_| ())
    }
}

/// Returns `data[start..start + len]` or an `UnexpectedEnd` at `start`.
pub(crate) fn slice_at(data: &[u8], start: usize, len: usize) -> Result<&[u8], FormatError> {
    start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or(FormatError::UnexpectedEnd { offset: start })
}
