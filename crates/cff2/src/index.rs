//! CFF2 INDEX: a count-prefixed array of variable length objects.
//!
//! See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2#5-index-data>

use std::ops::Range;

use crate::{
    config::subr_bias,
    error::FormatError,
    parse::{Cursor, slice_at},
};

/// A validated INDEX borrowed from the table data.
#[derive(Clone, Copy, Debug, Default)]
pub struct Index<'a> {
    /// The complete INDEX, header included.
    data: &'a [u8],
    count: usize,
    off_size: u8,
    offset: usize,
}

impl<'a> Index<'a> {
    /// Reads the INDEX starting at `offset` in `table`.
    ///
    /// Offsets are validated up front: the first must be 1 and they must
    /// not decrease.
    pub fn read(table: &'a [u8], offset: usize) -> Result<Self, FormatError> {
        let rest = table.get(offset..).ok_or(FormatError::UnexpectedEnd { offset })?;
        let mut cursor = Cursor::with_base(rest, offset);
        let count = cursor.read_u32()? as usize;
        if count == 0 {
            return Ok(Self { data: slice_at(table, offset, 4)?, count, off_size: 0, offset });
        }
        let off_size = cursor.read_u8()?;
        if !(1..=4).contains(&off_size) {
            return Err(FormatError::InvalidIndexOffsetSize { offset: offset + 4, size: off_size });
        }
        let mut prev = cursor.read_offset(off_size)?;
        if prev != 1 {
            return Err(FormatError::InvalidIndexOffsets { offset });
        }
        for _ in 0..count {
            let next = cursor.read_offset(off_size)?;
            if next < prev {
                return Err(FormatError::InvalidIndexOffsets { offset });
            }
            prev = next;
        }
        let total = cursor.position() + prev as usize - 1;
        let data = slice_at(table, offset, total)
            .map_err(|_| FormatError::UnexpectedEnd { offset: offset + total })?;
        Ok(Self { data, count, off_size, offset })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Offset of the INDEX within the table.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total size in bytes, header included.
    pub fn size_in_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Bias added to subroutine operands that index into this INDEX.
    pub fn subr_bias(&self) -> i32 {
        subr_bias(self.count)
    }

    fn object_offset(&self, index: usize) -> Option<usize> {
        let size = self.off_size as usize;
        let mut cursor = Cursor::new(self.data.get(5 + index * size..)?);
        cursor.read_offset(self.off_size).ok().map(|off| off as usize)
    }

    /// Byte range of object `index` within the INDEX.
    fn local_range(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.count {
            return None;
        }
        // offsets are 1-based, relative to the byte before the object data
        let data_base = 4 + (self.count + 1) * self.off_size as usize;
        let start = self.object_offset(index)?;
        let end = self.object_offset(index + 1)?;
        Some(data_base + start..data_base + end)
    }

    /// Byte range of object `index` within the table.
    pub fn object_range(&self, index: usize) -> Option<Range<usize>> {
        self.local_range(index).map(|range| self.offset + range.start..self.offset + range.end)
    }

    /// Returns the bytes of object `index`.
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        self.data.get(self.local_range(index)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.count).filter_map(|i| self.get(i))
    }
}

/// Serializes objects into a CFF2 INDEX using the smallest offset size.
pub fn encode_index<T: AsRef<[u8]>>(items: &[T]) -> Vec<u8> {
    let mut out = (items.len() as u32).to_be_bytes().to_vec();
    if items.is_empty() {
        return out;
    }
    let data_len: usize = items.iter().map(|item| item.as_ref().len()).sum();
    let off_size: u8 = match data_len + 1 {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        0x1_0000..=0xff_ffff => 3,
        _ => 4,
    };
    out.push(off_size);
    let mut offset = 1u32;
    let push_offset = |out: &mut Vec<u8>, value: u32| {
        out.extend_from_slice(&value.to_be_bytes()[4 - off_size as usize..]);
    };
    push_offset(&mut out, offset);
    for item in items {
        offset += item.as_ref().len() as u32;
        push_offset(&mut out, offset);
    }
    for item in items {
        out.extend_from_slice(item.as_ref());
    }
    out
}
