//! Lazy, cached access to the sections of a CFF2 table.

use std::{ops::Range, sync::OnceLock};

use font_types::GlyphId;
use log::debug;

use crate::{
    charstring::{CharStringContext, DecodedCharString, PathCommand, interpret},
    config::{HEADER_SIZE, Options},
    dict::{FontDict, PrivateDict, TopDict},
    error::{Error, FormatError, Result},
    fd_select::FdSelect,
    index::Index,
    parse::{Cursor, slice_at},
    scalar::{DesignCoordinates, ScalarCache},
    varstore::VariationStore,
};

/// The fixed CFF2 header.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cff2Header {
    pub major: u8,
    pub minor: u8,
    /// Offset of the Top DICT.
    pub header_size: u8,
    pub top_dict_length: u16,
}

impl Cff2Header {
    /// Byte range of the Top DICT.
    pub fn top_dict_range(&self) -> Range<usize> {
        let start = self.header_size as usize;
        start..start + self.top_dict_length as usize
    }
}

/// Reads a CFF2 table.
///
/// Sections are decoded on first access and cached, so a reader can be
/// shared between threads. Each accessor has an uncached `read_*`
/// counterpart that decodes from an explicit position.
pub struct Cff2Reader<'a> {
    data: &'a [u8],
    options: Options,
    header: OnceLock<Result<Cff2Header>>,
    top_dict: OnceLock<Result<TopDict>>,
    global_subrs: OnceLock<Result<Index<'a>>>,
    charstrings: OnceLock<Result<Index<'a>>>,
    scalar_cache: OnceLock<Result<ScalarCache>>,
    font_dicts: OnceLock<Result<Vec<FontDict>>>,
    fd_select: OnceLock<Result<Option<FdSelect>>>,
    private_dicts: OnceLock<Result<Vec<PrivateDict>>>,
    local_subrs: OnceLock<Result<Vec<Option<Index<'a>>>>>,
}

fn cached<T>(cell: &OnceLock<Result<T>>, init: impl FnOnce() -> Result<T>) -> Result<&T> {
    cell.get_or_init(init).as_ref().map_err(Error::clone)
}

impl<'a> Cff2Reader<'a> {
    pub fn new(data: &'a [u8], options: Options) -> Self {
        Self {
            data,
            options,
            header: OnceLock::new(),
            top_dict: OnceLock::new(),
            global_subrs: OnceLock::new(),
            charstrings: OnceLock::new(),
            scalar_cache: OnceLock::new(),
            font_dicts: OnceLock::new(),
            fd_select: OnceLock::new(),
            private_dicts: OnceLock::new(),
            local_subrs: OnceLock::new(),
        }
    }

    /// The raw table.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn header(&self) -> Result<Cff2Header> {
        cached(&self.header, || self.read_header()).copied()
    }

    pub fn top_dict(&self) -> Result<&TopDict> {
        cached(&self.top_dict, || self.read_top_dict())
    }

    /// The Global Subrs INDEX, which directly follows the Top DICT.
    pub fn global_subrs(&self) -> Result<Index<'a>> {
        cached(&self.global_subrs, || {
            let offset = self.header()?.top_dict_range().end;
            let index = Index::read(self.data, offset)?;
            debug!("Global Subrs: {} subroutines at {offset}", index.len());
            Ok(index)
        })
        .copied()
    }

    pub fn charstrings(&self) -> Result<Index<'a>> {
        cached(&self.charstrings, || {
            let offset = self.top_dict()?.charstrings_offset.ok_or(FormatError::MissingCharStrings)?;
            self.read_charstrings(offset)
        })
        .copied()
    }

    /// The Variation Store; a table without one has zero regions.
    pub fn variation_store(&self) -> Result<&VariationStore> {
        Ok(self.scalar_cache()?.store())
    }

    /// Region scalar cache over this table's Variation Store.
    pub fn scalar_cache(&self) -> Result<&ScalarCache> {
        cached(&self.scalar_cache, || self.read_variation_store().map(ScalarCache::new))
    }

    /// Font DICTs of the FDArray; empty when the Top DICT has none.
    pub fn font_dicts(&self) -> Result<&[FontDict]> {
        cached(&self.font_dicts, || {
            let Some(offset) = self.top_dict()?.fd_array_offset else {
                return Ok(Vec::new());
            };
            self.read_font_dicts(offset)
        })
        .map(Vec::as_slice)
    }

    pub fn fd_select(&self) -> Result<Option<&FdSelect>> {
        cached(&self.fd_select, || {
            let Some(offset) = self.top_dict()?.fd_select_offset else {
                return Ok(None);
            };
            let glyph_count = self.glyph_count()?;
            let fd_select = FdSelect::read(self.data, offset, glyph_count)?;
            debug!("FDSelect: format {} at {offset}", fd_select.format());
            Ok(Some(fd_select))
        })
        .map(Option::as_ref)
    }

    /// Private DICTs in Font DICT order.
    ///
    /// Without an FDArray this holds the Private DICT referenced from the
    /// Top DICT, if any.
    pub fn private_dicts(&self) -> Result<&[PrivateDict]> {
        cached(&self.private_dicts, || {
            let ranges: Vec<(usize, usize)> = if self.top_dict()?.fd_array_offset.is_some() {
                self.font_dicts()?
                    .iter()
                    .map(|fd| fd.private_dict_range.unwrap_or_default())
                    .collect()
            } else {
                self.top_dict()?.private_dict_range.into_iter().collect()
            };
            ranges
                .into_iter()
                .map(|(size, offset)| self.read_private_dict(size, offset))
                .collect()
        })
        .map(Vec::as_slice)
    }

    /// The first Private DICT (the only one for a font without an FDArray).
    pub fn private_dict(&self) -> Result<Option<&PrivateDict>> {
        Ok(self.private_dicts()?.first())
    }

    /// Local Subrs INDEX of each Private DICT.
    pub fn local_subrs(&self) -> Result<&[Option<Index<'a>>]> {
        cached(&self.local_subrs, || {
            self.private_dicts()?
                .iter()
                .map(|private| {
                    private
                        .subrs_offset
                        .map(|offset| Index::read(self.data, private.offset + offset))
                        .transpose()
                        .map_err(Error::from)
                })
                .collect()
        })
        .map(Vec::as_slice)
    }

    /// Number of glyphs in the CharStrings INDEX.
    pub fn glyph_count(&self) -> Result<usize> {
        Ok(self.charstrings()?.len())
    }

    /// Font axis count: from the options, else from the Variation Store.
    pub fn axis_count(&self) -> Result<usize> {
        match self.options.axis_count {
            Some(count) => Ok(count),
            None => Ok(self.variation_store()?.axis_count()),
        }
    }

    /// Byte range of the Variation Store, its length prefix included.
    pub fn variation_store_range(&self) -> Result<Option<Range<usize>>> {
        let Some(offset) = self.top_dict()?.variation_store_offset else {
            return Ok(None);
        };
        let mut cursor = Cursor::with_base(self.data.get(offset..).unwrap_or_default(), offset);
        let length = cursor.read_u16()? as usize;
        slice_at(self.data, offset + 2, length)?;
        Ok(Some(offset..offset + 2 + length))
    }

    pub fn read_header(&self) -> Result<Cff2Header> {
        let mut cursor = Cursor::new(self.data);
        let major = cursor.read_u8()?;
        let minor = cursor.read_u8()?;
        if (major, minor) != (2, 0) {
            return Err(FormatError::UnsupportedVersion { major, minor }.into());
        }
        let header_size = cursor.read_u8()?;
        if (header_size as usize) < HEADER_SIZE {
            return Err(FormatError::InvalidHeaderSize { header_size }.into());
        }
        let top_dict_length = cursor.read_u16()?;
        debug!("CFF2 header: size {header_size}, Top DICT length {top_dict_length}");
        Ok(Cff2Header { major, minor, header_size, top_dict_length })
    }

    pub fn read_top_dict(&self) -> Result<TopDict> {
        let range = self.header()?.top_dict_range();
        let bytes = slice_at(self.data, range.start, range.len())?;
        TopDict::parse(bytes, range.start)
    }

    /// Decodes the length-prefixed Variation Store named by the Top DICT
    /// and checks it against the font's axis count.
    pub fn read_variation_store(&self) -> Result<VariationStore> {
        let Some(range) = self.variation_store_range()? else {
            return Ok(VariationStore::default());
        };
        let start = range.start + 2;
        let bytes = slice_at(self.data, start, range.end - start)?;
        let store = VariationStore::decode_at(bytes, start)?;
        if let Some(expected) = self.options.axis_count {
            store.ensure_axis_count(expected)?;
        }
        debug!(
            "Variation Store: {} regions, {} data blocks at {}",
            store.regions().len(),
            store.data_count(),
            range.start
        );
        Ok(store)
    }

    pub fn read_private_dict(&self, size: usize, offset: usize) -> Result<PrivateDict> {
        PrivateDict::parse(self.data, size, offset, self.axis_count()?)
    }

    pub fn read_charstrings(&self, offset: usize) -> Result<Index<'a>> {
        let index = Index::read(self.data, offset)?;
        debug!("CharStrings: {} glyphs at {offset}", index.len());
        Ok(index)
    }

    pub fn read_font_dicts(&self, offset: usize) -> Result<Vec<FontDict>> {
        let index = Index::read(self.data, offset)?;
        debug!("FDArray: {} font DICTs at {offset}", index.len());
        (0..index.len())
            .map(|i| {
                let range = index.object_range(i).unwrap_or_default();
                FontDict::parse(index.get(i).unwrap_or_default(), range.start)
            })
            .collect()
    }

    /// Index of the Font DICT (and Private DICT) used by `glyph`.
    pub fn font_dict_index(&self, glyph: GlyphId) -> Result<usize> {
        let count = self.private_dicts()?.len();
        let index = match self.fd_select()? {
            Some(fd_select) => fd_select
                .font_index(glyph.to_u32())
                .map(usize::from)
                .ok_or(FormatError::GlyphNotInFdSelect { glyph: glyph.to_u32() })?,
            None => 0,
        };
        if count > 0 && index >= count {
            return Err(FormatError::FontDictOutOfRange { index, count }.into());
        }
        Ok(index)
    }

    /// Charstring bytes of `glyph`.
    pub fn charstring(&self, glyph: GlyphId) -> Result<&'a [u8]> {
        let charstrings = self.charstrings()?;
        charstrings.get(glyph.to_u32() as usize).ok_or_else(|| {
            FormatError::GlyphOutOfRange { glyph: glyph.to_u32(), count: charstrings.len() }.into()
        })
    }

    /// Interpretation context for `glyph`.
    pub fn context(&self, glyph: GlyphId) -> Result<CharStringContext<'a>> {
        let fd = self.font_dict_index(glyph)?;
        let local_subrs = self.local_subrs()?.get(fd).copied().flatten();
        let vsindex = self.private_dicts()?.get(fd).map_or(0, |private| private.vsindex);
        Ok(CharStringContext::new(self.global_subrs()?, local_subrs, self.axis_count()?)
            .default_store_index(vsindex)
            .nesting_limit(self.options.nesting_limit))
    }

    /// Interprets the charstring of `glyph`.
    ///
    /// With a Variation Store present, the data block selected by `vsindex`
    /// must exist.
    pub fn decode_glyph(&self, glyph: GlyphId) -> Result<DecodedCharString> {
        let bytes = self.charstring(glyph)?;
        let decoded = interpret(bytes, &self.context(glyph)?)?;
        if self.top_dict()?.variation_store_offset.is_some() {
            let count = self.variation_store()?.data_count();
            if decoded.store_index as usize >= count {
                return Err(FormatError::StoreIndexOutOfRange { index: decoded.store_index, count }.into());
            }
        }
        Ok(decoded)
    }

    /// Outline of `glyph` at a design location.
    ///
    /// Axis order comes from [`Options::axis_tags`].
    pub fn outline(&self, glyph: GlyphId, coords: &DesignCoordinates) -> Result<Vec<PathCommand>> {
        let decoded = self.decode_glyph(glyph)?;
        let vector = coords.to_vector(&self.options.axis_tags);
        let scalars = self.scalar_cache()?.block_scalars(decoded.store_index as usize, &vector);
        Ok(decoded.outline_at(&scalars))
    }
}
