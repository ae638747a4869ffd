//! Rebuilds a CFF2 table with injected hints.
//!
//! The rebuilt table is laid out as
//!
//! ```text
//! header | Top DICT | Global Subrs | CharStrings | FDSelect | FDArray |
//! (Private DICT | local Subrs)* | Variation Store
//! ```
//!
//! Global Subrs, FDSelect, local Subrs and the Variation Store are copied
//! byte for byte. Offsets are taken from the measured length of each
//! section; DICTs holding offsets are re-encoded until their own length
//! stops changing.

use log::{debug, info};

use crate::{
    config::MAX_LAYOUT_PASSES,
    dict::{DictEntry, DictOperator, PrivateDict, encode_entry, encode_values, rewrite_dict},
    error::{FormatError, Result},
    hints::{FontHints, HintPayload, rewrite_charstring},
    index::{Index, encode_index},
    parse::slice_at,
    reader::Cff2Reader,
};

/// Builds a new CFF2 table from a reader and a hint payload.
pub struct Cff2Builder<'r, 'a> {
    reader: &'r Cff2Reader<'a>,
}

/// A Private DICT and the local Subrs that follow it.
struct PrivateSection<'a> {
    dict: Vec<u8>,
    local_subrs: &'a [u8],
}

impl PrivateSection<'_> {
    fn len(&self) -> usize {
        self.dict.len() + self.local_subrs.len()
    }
}

/// Section offsets of the rebuilt table.
#[derive(Debug)]
struct Layout {
    charstrings: usize,
    fd_select: usize,
    fd_array: usize,
    /// `(size, offset)` of each Private DICT.
    privates: Vec<(usize, usize)>,
    variation_store: usize,
}

fn encode_offsets(operator: DictOperator, operands: &[usize]) -> Vec<u8> {
    let operands: Vec<f64> = operands.iter().map(|&v| v as f64).collect();
    let mut out = Vec::new();
    encode_entry(operator, &operands, &mut out);
    out
}

impl<'r, 'a> Cff2Builder<'r, 'a> {
    pub fn new(reader: &'r Cff2Reader<'a>) -> Self {
        Self { reader }
    }

    /// Builds the table.
    ///
    /// Without a payload, or with an empty one, the original bytes are
    /// returned unchanged.
    pub fn build(&self, payload: Option<&HintPayload>) -> Result<Vec<u8>> {
        let reader = self.reader;
        let Some(payload) = payload.filter(|p| !p.is_empty()) else {
            debug!("No hints to apply, keeping the original table");
            return Ok(reader.data().to_vec());
        };
        let axis_count = reader.axis_count()?;
        let store_range = reader.variation_store_range()?;
        payload.validate(axis_count, store_range.is_some())?;

        let data = reader.data();
        let header = reader.header()?;
        let top_dict = reader.top_dict()?;
        let global_subrs = reader.global_subrs()?.as_bytes();
        let charstrings = self.charstrings(payload, axis_count)?;
        let fd_select = match reader.fd_select()? {
            Some(fd_select) => {
                let offset = top_dict.fd_select_offset.unwrap_or_default();
                slice_at(data, offset, fd_select.size_in_bytes())?
            }
            None => &[][..],
        };
        let privates = self.private_sections(payload.font_hints.as_ref(), axis_count)?;
        let variation_store = match &store_range {
            Some(range) => slice_at(data, range.start, range.len())?,
            None => &[][..],
        };
        let font_dicts = reader.font_dicts()?;
        let has_fd_array = top_dict.fd_array_offset.is_some();
        let font_dict_sources: Vec<&[u8]> = match top_dict.fd_array_offset {
            Some(offset) => Index::read(data, offset)?.iter().collect(),
            None => Vec::new(),
        };

        let top_range = header.top_dict_range();
        let top_source = slice_at(data, top_range.start, top_range.len())?;
        let mut top_len = top_range.len();
        let mut fd_array_len = 0;
        for pass in 1..=MAX_LAYOUT_PASSES {
            let charstrings_offset = header.header_size as usize + top_len + global_subrs.len();
            let fd_select_offset = charstrings_offset + charstrings.len();
            let fd_array_offset = fd_select_offset + fd_select.len();
            let mut offset = fd_array_offset + fd_array_len;
            let mut private_ranges = Vec::with_capacity(privates.len());
            for private in &privates {
                private_ranges.push((private.dict.len(), offset));
                offset += private.len();
            }
            let layout = Layout {
                charstrings: charstrings_offset,
                fd_select: fd_select_offset,
                fd_array: fd_array_offset,
                privates: private_ranges,
                variation_store: offset,
            };

            let top = rewrite_dict(top_source, &top_dict.entries, |entry| top_entry(entry, &layout), &[]);
            let fd_array = if has_fd_array {
                let dicts: Vec<Vec<u8>> = font_dicts
                    .iter()
                    .zip(&font_dict_sources)
                    .enumerate()
                    .map(|(i, (fd, source))| {
                        rewrite_dict(source, &fd.entries, |entry| private_range(entry, &layout, i), &[])
                    })
                    .collect();
                encode_index(&dicts)
            } else {
                Vec::new()
            };

            if top.len() != top_len || fd_array.len() != fd_array_len {
                debug!(
                    "Layout pass {pass}: Top DICT {top_len} -> {}, FDArray {fd_array_len} -> {}",
                    top.len(),
                    fd_array.len()
                );
                top_len = top.len();
                fd_array_len = fd_array.len();
                continue;
            }

            let top_dict_length =
                u16::try_from(top.len()).map_err(|_| FormatError::LayoutDidNotConverge { iterations: pass })?;
            let mut out = Vec::with_capacity(layout.variation_store + variation_store.len());
            out.extend_from_slice(slice_at(data, 0, header.header_size as usize)?);
            out[3..5].copy_from_slice(&top_dict_length.to_be_bytes());
            out.extend_from_slice(&top);
            out.extend_from_slice(global_subrs);
            out.extend_from_slice(&charstrings);
            out.extend_from_slice(fd_select);
            out.extend_from_slice(&fd_array);
            for private in &privates {
                out.extend_from_slice(&private.dict);
                out.extend_from_slice(private.local_subrs);
            }
            out.extend_from_slice(variation_store);
            info!(
                "Rebuilt CFF2 table: {} glyphs rehinted, {} private DICTs, {} -> {} bytes",
                payload.glyphs.len(),
                privates.len(),
                data.len(),
                out.len()
            );
            return Ok(out);
        }
        Err(FormatError::LayoutDidNotConverge { iterations: MAX_LAYOUT_PASSES }.into())
    }

    /// The CharStrings INDEX with the payload glyphs rewritten.
    fn charstrings(&self, payload: &HintPayload, axis_count: usize) -> Result<Vec<u8>> {
        let reader = self.reader;
        let index = reader.charstrings()?;
        if payload.glyphs.is_empty() {
            return Ok(index.as_bytes().to_vec());
        }
        let mut glyphs: Vec<Vec<u8>> = index.iter().map(<[u8]>::to_vec).collect();
        for (&glyph, hints) in &payload.glyphs {
            let bytes = reader.charstring(glyph)?;
            let decoded = reader.decode_glyph(glyph)?;
            let rewritten = rewrite_charstring(glyph, bytes, &decoded, hints, axis_count)?;
            debug!("Glyph {}: {} -> {} bytes", glyph.to_u32(), bytes.len(), rewritten.len());
            glyphs[glyph.to_u32() as usize] = rewritten;
        }
        Ok(encode_index(&glyphs))
    }

    fn private_sections(
        &self,
        font_hints: Option<&FontHints>,
        axis_count: usize,
    ) -> Result<Vec<PrivateSection<'a>>> {
        let reader = self.reader;
        let local_subrs = reader.local_subrs()?;
        reader
            .private_dicts()?
            .iter()
            .zip(local_subrs)
            .map(|(private, subrs)| {
                let dict = rewrite_private(reader.data(), private, subrs.is_some(), font_hints, axis_count)?;
                let local_subrs = subrs.map_or(&[][..], |subrs| subrs.as_bytes());
                Ok(PrivateSection { dict, local_subrs })
            })
            .collect()
    }
}

fn top_entry(entry: &DictEntry, layout: &Layout) -> Option<Vec<u8>> {
    let operands = match entry.operator {
        DictOperator::CharStringsOffset => vec![layout.charstrings],
        DictOperator::FdSelectOffset => vec![layout.fd_select],
        DictOperator::FdArrayOffset => vec![layout.fd_array],
        DictOperator::VariationStoreOffset => vec![layout.variation_store],
        DictOperator::PrivateDictRange => {
            let (size, offset) = layout.privates.first().copied()?;
            vec![size, offset]
        }
        _ => return None,
    };
    Some(encode_offsets(entry.operator, &operands))
}

fn private_range(entry: &DictEntry, layout: &Layout, index: usize) -> Option<Vec<u8>> {
    if entry.operator != DictOperator::PrivateDictRange {
        return None;
    }
    let (size, offset) = layout.privates.get(index).copied()?;
    Some(encode_offsets(entry.operator, &[size, offset]))
}

/// Rewrites a Private DICT with font hint overrides applied and its Subrs
/// offset pointing just past the DICT.
fn rewrite_private(
    table: &[u8],
    private: &PrivateDict,
    has_subrs: bool,
    font_hints: Option<&FontHints>,
    axis_count: usize,
) -> Result<Vec<u8>> {
    let source = slice_at(table, private.offset, private.size)?;
    let overrides = font_hints.map(FontHints::overrides).unwrap_or_default();
    let encode = |operator: DictOperator| {
        overrides.iter().find(|(op, _)| *op == operator).map(|(op, values)| {
            let mut out = Vec::new();
            encode_values(*op, values, axis_count, &mut out);
            out
        })
    };
    let appended: Vec<Vec<u8>> = overrides
        .iter()
        .filter(|(op, _)| private.entry(*op).is_none())
        .filter_map(|(op, _)| encode(*op))
        .collect();

    let mut size = private.size;
    for _ in 0..MAX_LAYOUT_PASSES {
        let dict = rewrite_dict(
            source,
            &private.entries,
            |entry| match entry.operator {
                DictOperator::SubrsOffset if has_subrs => Some(encode_offsets(entry.operator, &[size])),
                operator => encode(operator),
            },
            &appended,
        );
        if !has_subrs || dict.len() == size {
            return Ok(dict);
        }
        size = dict.len();
    }
    Err(FormatError::LayoutDidNotConverge { iterations: MAX_LAYOUT_PASSES }.into())
}
