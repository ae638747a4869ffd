//! Item variation store decoding.
//!
//! See <https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#item-variation-store>

use read_fonts::{
    FontData, FontRead, ReadError,
    tables::variations::{ItemVariationData as RawItemData, ItemVariationStore, VariationRegionList},
    types::F2Dot14,
};

use crate::error::{ConsistencyError, FormatError, Result};

/// Flag in `wordDeltaCount` selecting 32/16-bit rather than 16/8-bit deltas.
const LONG_WORDS: u16 = 0x8000;
const WORD_DELTA_COUNT_MASK: u16 = 0x7fff;

/// F2DOT14 scale.
const F2DOT14_ONE: f64 = 16384.0;

/// Support of a region along one axis, in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionAxis {
    pub start: f64,
    pub peak: f64,
    pub end: f64,
}

impl RegionAxis {
    pub fn new(start: f64, peak: f64, end: f64) -> Self {
        Self { start, peak, end }
    }
}

/// A variation region: one support triple per font axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub axes: Vec<RegionAxis>,
}

impl Region {
    pub fn new(axes: Vec<RegionAxis>) -> Self {
        Self { axes }
    }

    /// Peak location of the region.
    pub fn peak(&self) -> Vec<f64> {
        self.axes.iter().map(|axis| axis.peak).collect()
    }
}

/// One block of per-item delta rows sharing a list of region indices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemVariationData {
    region_indices: Vec<u16>,
    short_delta_count: usize,
    long_words: bool,
    rows: Vec<Vec<i32>>,
}

impl ItemVariationData {
    pub fn region_indices(&self) -> &[u16] {
        &self.region_indices
    }

    /// Number of leading deltas per row stored in the wide form.
    pub fn short_delta_count(&self) -> usize {
        self.short_delta_count
    }

    /// Whether wide deltas are 32-bit (and narrow ones 16-bit).
    pub fn long_words(&self) -> bool {
        self.long_words
    }

    pub fn item_count(&self) -> usize {
        self.rows.len()
    }

    pub fn deltas(&self, item: usize) -> Option<&[i32]> {
        self.rows.get(item).map(Vec::as_slice)
    }
}

/// A decoded item variation store.
///
/// Read-only: a rebuilt table copies the original store bytes unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariationStore {
    axis_count: usize,
    regions: Vec<Region>,
    data: Vec<ItemVariationData>,
}

impl VariationStore {
    /// Decodes an item variation store (without the CFF2 length prefix).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_at(bytes, 0)
    }

    /// Decodes a store located at `base` within the enclosing table, so
    /// errors report table offsets.
    pub(crate) fn decode_at(bytes: &[u8], base: usize) -> Result<Self> {
        let store = ItemVariationStore::read(FontData::new(bytes)).map_err(truncated(base))?;
        let format = store.format();
        if format != 1 {
            return Err(FormatError::UnsupportedVariationStoreFormat(format).into());
        }

        let region_list_offset = store.variation_region_list_offset();
        let (axis_count, regions) = if region_list_offset.is_null() {
            (0, Vec::new())
        } else {
            let list = store
                .variation_region_list()
                .map_err(truncated(base + region_list_offset.to_u32() as usize))?;
            decode_region_list(&list, base + region_list_offset.to_u32() as usize)?
        };

        let data = store
            .item_variation_data()
            .iter()
            .enumerate()
            .map(|(block, data)| match data {
                Some(data) => decode_item_data(&data.map_err(truncated(base))?, block, regions.len()),
                // null offsets read as empty blocks
                None => Ok(ItemVariationData::default()),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { axis_count, regions, data })
    }

    /// Fails if the store's axis count differs from the font's.
    pub fn ensure_axis_count(&self, expected: usize) -> Result<()> {
        if !self.regions.is_empty() && self.axis_count != expected {
            return Err(FormatError::InconsistentAxisCount {
                expected,
                actual: self.axis_count,
            }
            .into());
        }
        Ok(())
    }

    pub fn axis_count(&self) -> usize {
        self.axis_count
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    /// Number of item variation data blocks.
    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    pub fn item_data(&self, block: usize) -> Option<&ItemVariationData> {
        self.data.get(block)
    }

    pub fn region_indices(&self, block: usize) -> Option<&[u16]> {
        self.data.get(block).map(ItemVariationData::region_indices)
    }

    pub fn deltas_for_item(&self, block: usize, item: usize) -> Option<&[i32]> {
        self.data.get(block)?.deltas(item)
    }
}

fn truncated(offset: usize) -> impl Fn(ReadError) -> FormatError {
    move |_| FormatError::UnexpectedEnd { offset }
}

fn f2dot14(value: F2Dot14) -> f64 {
    value.to_bits() as f64 / F2DOT14_ONE
}

fn decode_region_list(list: &VariationRegionList, offset: usize) -> Result<(usize, Vec<Region>)> {
    let axis_count = list.axis_count() as usize;
    let mut regions = Vec::with_capacity(list.region_count() as usize);
    for (region_ix, region) in list.variation_regions().iter().enumerate() {
        let region = region.map_err(truncated(offset))?;
        let mut axes = Vec::with_capacity(axis_count);
        for (axis_ix, coords) in region.region_axes().iter().enumerate() {
            let start = f2dot14(coords.start_coord());
            let peak = f2dot14(coords.peak_coord());
            let end = f2dot14(coords.end_coord());
            if start > peak || peak > end {
                return Err(ConsistencyError::RegionOrdering {
                    region: region_ix,
                    axis: axis_ix,
                    start,
                    peak,
                    end,
                }
                .into());
            }
            axes.push(RegionAxis { start, peak, end });
        }
        regions.push(Region { axes });
    }
    Ok((axis_count, regions))
}

fn decode_item_data(data: &RawItemData, block: usize, region_count: usize) -> Result<ItemVariationData> {
    let word_delta_count = data.word_delta_count();
    let region_index_count = data.region_index_count() as usize;
    let long_words = word_delta_count & LONG_WORDS != 0;
    let short_delta_count = (word_delta_count & WORD_DELTA_COUNT_MASK) as usize;
    if short_delta_count > region_index_count {
        return Err(FormatError::InvalidDeltaLayout {
            block,
            word_count: short_delta_count,
            region_count: region_index_count,
        }
        .into());
    }

    let mut region_indices = Vec::with_capacity(region_index_count);
    for index in data.region_indexes() {
        let index = index.get();
        if index as usize >= region_count {
            return Err(FormatError::RegionIndexOutOfRange { block, index, region_count }.into());
        }
        region_indices.push(index);
    }

    let rows: Vec<Vec<i32>> = (0..data.item_count())
        .map(|item| data.delta_set(item).collect::<Vec<_>>())
        .collect();
    Ok(ItemVariationData { region_indices, short_delta_count, long_words, rows })
}
