//! FDSelect: maps glyphs to Font DICTs.
//!
//! See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2#fdselect>

use crate::{error::FormatError, parse::Cursor};

#[derive(Clone, PartialEq, Debug)]
enum Ranges {
    /// One Font DICT index per glyph.
    Format0(Vec<u8>),
    /// `(first glyph, font DICT)` ranges, each ending where the next starts.
    Ranged(Vec<(u32, u16)>, u32),
}

/// A decoded FDSelect structure.
#[derive(Clone, PartialEq, Debug)]
pub struct FdSelect {
    format: u8,
    ranges: Ranges,
    size: usize,
}

impl FdSelect {
    /// Reads the FDSelect at `offset` in `table`.
    pub fn read(table: &[u8], offset: usize, glyph_count: usize) -> Result<Self, FormatError> {
        let rest = table.get(offset..).ok_or(FormatError::UnexpectedEnd { offset })?;
        let mut cursor = Cursor::with_base(rest, offset);
        let format = cursor.read_u8()?;
        let ranges = match format {
            0 => Ranges::Format0(cursor.read_bytes(glyph_count)?.to_vec()),
            3 | 4 => {
                let wide = format == 4;
                let count = if wide { cursor.read_u32()? } else { cursor.read_u16()? as u32 };
                let mut ranges = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let first = if wide { cursor.read_u32()? } else { cursor.read_u16()? as u32 };
                    let fd = if wide { cursor.read_u16()? } else { cursor.read_u8()? as u16 };
                    ranges.push((first, fd));
                }
                let sentinel = if wide { cursor.read_u32()? } else { cursor.read_u16()? as u32 };
                Ranges::Ranged(ranges, sentinel)
            }
            _ => return Err(FormatError::InvalidFdSelectFormat(format)),
        };
        Ok(Self { format, ranges, size: cursor.position() })
    }

    pub fn format(&self) -> u8 {
        self.format
    }

    /// Encoded size in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.size
    }

    /// Font DICT index of `glyph`.
    pub fn font_index(&self, glyph: u32) -> Option<u16> {
        match &self.ranges {
            Ranges::Format0(fds) => fds.get(glyph as usize).map(|&fd| fd as u16),
            Ranges::Ranged(ranges, sentinel) => {
                if glyph >= *sentinel {
                    return None;
                }
                let ix = match ranges.binary_search_by(|(first, _)| first.cmp(&glyph)) {
                    Ok(ix) => ix,
                    Err(ix) => ix.checked_sub(1)?,
                };
                ranges.get(ix).map(|&(_, fd)| fd)
            }
        }
    }
}
