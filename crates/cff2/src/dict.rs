//! Top, Font and Private DICT parsing and encoding.
//!
//! Entries keep the byte range they were parsed from so a rebuild can copy
//! untouched entries verbatim.
//!
//! See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2#7-top-dict-data>

use std::ops::Range;

use crate::{
    error::{FormatError, Result},
    hints::HintValue,
    number::{ESCAPE, encode_dict_number, parse_dict_operand},
    parse::{Cursor, slice_at},
    stack::Stack,
};

/// DICT operator.
///
/// Operators this crate does not interpret are kept as `Other`/`OtherEscape`
/// so they survive a rebuild unchanged.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DictOperator {
    CharStringsOffset,
    PrivateDictRange,
    VariationStoreOffset,
    FontMatrix,
    FdArrayOffset,
    FdSelectOffset,
    BlueValues,
    OtherBlues,
    FamilyBlues,
    FamilyOtherBlues,
    StdHw,
    StdVw,
    SubrsOffset,
    VariationStoreIndex,
    Blend,
    BlueScale,
    BlueShift,
    BlueFuzz,
    StemSnapH,
    StemSnapV,
    LanguageGroup,
    ExpansionFactor,
    Other(u8),
    OtherEscape(u8),
}

impl DictOperator {
    pub fn from_opcode(opcode: u8) -> Self {
        use DictOperator::*;
        match opcode {
            17 => CharStringsOffset,
            18 => PrivateDictRange,
            24 => VariationStoreOffset,
            6 => BlueValues,
            7 => OtherBlues,
            8 => FamilyBlues,
            9 => FamilyOtherBlues,
            10 => StdHw,
            11 => StdVw,
            19 => SubrsOffset,
            22 => VariationStoreIndex,
            23 => Blend,
            _ => Other(opcode),
        }
    }

    pub fn from_extended_opcode(opcode: u8) -> Self {
        use DictOperator::*;
        match opcode {
            7 => FontMatrix,
            36 => FdArrayOffset,
            37 => FdSelectOffset,
            9 => BlueScale,
            10 => BlueShift,
            11 => BlueFuzz,
            12 => StemSnapH,
            13 => StemSnapV,
            17 => LanguageGroup,
            18 => ExpansionFactor,
            _ => OtherEscape(opcode),
        }
    }

    pub fn encode(self, out: &mut Vec<u8>) {
        use DictOperator::*;
        let (escaped, byte) = match self {
            CharStringsOffset => (false, 17),
            PrivateDictRange => (false, 18),
            VariationStoreOffset => (false, 24),
            BlueValues => (false, 6),
            OtherBlues => (false, 7),
            FamilyBlues => (false, 8),
            FamilyOtherBlues => (false, 9),
            StdHw => (false, 10),
            StdVw => (false, 11),
            SubrsOffset => (false, 19),
            VariationStoreIndex => (false, 22),
            Blend => (false, 23),
            Other(b) => (false, b),
            FontMatrix => (true, 7),
            FdArrayOffset => (true, 36),
            FdSelectOffset => (true, 37),
            BlueScale => (true, 9),
            BlueShift => (true, 10),
            BlueFuzz => (true, 11),
            StemSnapH => (true, 12),
            StemSnapV => (true, 13),
            LanguageGroup => (true, 17),
            ExpansionFactor => (true, 18),
            OtherEscape(b) => (true, b),
        };
        if escaped {
            out.push(ESCAPE);
        }
        out.push(byte);
    }

    /// Array operators whose values are stored as differences from the
    /// previous value.
    pub fn is_delta_array(self) -> bool {
        use DictOperator::*;
        matches!(
            self,
            BlueValues | OtherBlues | FamilyBlues | FamilyOtherBlues | StemSnapH | StemSnapV
        )
    }
}

/// One operator with its operands.
#[derive(Clone, PartialEq, Debug)]
pub struct DictEntry {
    pub operator: DictOperator,
    /// Operand values; blended operands hold their base.
    pub operands: Vec<f64>,
    /// Deltas captured for each operand by a preceding blend operator.
    pub deltas: Vec<Option<Vec<f64>>>,
    /// Bytes of the entry within its DICT, operator included.
    pub range: Range<usize>,
}

impl DictEntry {
    pub fn is_blended(&self) -> bool {
        self.deltas.iter().any(Option::is_some)
    }

    /// Operand `index` with its deltas, as stored (not delta decoded).
    pub fn value(&self, index: usize) -> Option<HintValue> {
        let base = *self.operands.get(index)?;
        let deltas = self.deltas.get(index).cloned().flatten().unwrap_or_default();
        Some(HintValue { base, deltas })
    }

    /// Operand `index` as a non-negative offset or size.
    fn offset(&self, index: usize, dict_base: usize) -> Result<usize> {
        let invalid = FormatError::InvalidDictOperand { offset: dict_base + self.range.start };
        let value = *self.operands.get(index).ok_or(invalid.clone())?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(invalid.into());
        }
        Ok(value as usize)
    }
}

/// Parses DICT data located at `base` within the table.
///
/// Blend operators are applied in place using the operand layout
/// `g0 .. g(K-1) K N blend`; `axis_count` is the expected `N`.
pub fn parse_dict(bytes: &[u8], base: usize, axis_count: usize) -> Result<Vec<DictEntry>> {
    let mut cursor = Cursor::with_base(bytes, base);
    let mut stack = Stack::new();
    let mut captured = Vec::new();
    let mut entries = Vec::new();
    let mut entry_start = 0;
    while !cursor.is_empty() {
        let start = cursor.position();
        let b0 = cursor.read_u8()?;
        match b0 {
            28..=30 | 32..=254 => {
                let value = parse_dict_operand(&mut cursor, b0)?;
                stack
                    .push(value, base + start)
                    .map_err(|_| FormatError::InvalidDictOperand { offset: base + start })?;
            }
            _ => {
                let operator = if b0 == ESCAPE {
                    DictOperator::from_extended_opcode(cursor.read_u8()?)
                } else {
                    DictOperator::from_opcode(b0)
                };
                if operator == DictOperator::Blend {
                    stack.apply_blend(axis_count, base + start, &mut captured, 0)?;
                    continue;
                }
                let deltas = stack
                    .blends()
                    .iter()
                    .map(|slot| {
                        slot.and_then(|ix| captured.get(ix))
                            .map(|c| c.group.deltas.clone())
                    })
                    .collect();
                entries.push(DictEntry {
                    operator,
                    operands: stack.values().to_vec(),
                    deltas,
                    range: entry_start..cursor.position(),
                });
                stack.clear();
                captured.clear();
                entry_start = cursor.position();
            }
        }
    }
    Ok(entries)
}

/// Appends `operator` preceded by plain numeric operands.
pub fn encode_entry(operator: DictOperator, operands: &[f64], out: &mut Vec<u8>) {
    for &value in operands {
        encode_dict_number(value, out);
    }
    operator.encode(out);
}

/// Appends `operator` with absolute `values`.
///
/// Delta array operators are difference encoded, deltas included. When any
/// value carries deltas every value is written as a blend group
/// `(b, d1 .. dN)` in order, followed by `K N blend`.
pub fn encode_values(operator: DictOperator, values: &[HintValue], axis_count: usize, out: &mut Vec<u8>) {
    let mut stored: Vec<HintValue> = values.to_vec();
    if operator.is_delta_array() {
        for i in (1..stored.len()).rev() {
            let (prev, cur) = (&values[i - 1], &mut stored[i]);
            cur.base -= prev.base;
            for (j, delta) in cur.deltas.iter_mut().enumerate() {
                *delta -= prev.deltas.get(j).copied().unwrap_or(0.0);
            }
            // a plain value after a blended one still differs in its deltas
            for j in cur.deltas.len()..prev.deltas.len() {
                cur.deltas.push(-prev.deltas[j]);
            }
        }
    }
    if stored.iter().any(HintValue::is_blended) {
        for value in &stored {
            encode_dict_number(value.base, out);
            for j in 0..axis_count {
                encode_dict_number(value.deltas.get(j).copied().unwrap_or(0.0), out);
            }
        }
        encode_dict_number(stored.len() as f64, out);
        encode_dict_number(axis_count as f64, out);
        DictOperator::Blend.encode(out);
    } else {
        for value in &stored {
            encode_dict_number(value.base, out);
        }
    }
    operator.encode(out);
}

/// Rewrites a DICT: entries for which `replace` returns bytes are replaced,
/// all others are copied from `source`. `appended` entries are added at the
/// end.
pub(crate) fn rewrite_dict(
    source: &[u8],
    entries: &[DictEntry],
    mut replace: impl FnMut(&DictEntry) -> Option<Vec<u8>>,
    appended: &[Vec<u8>],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(source.len());
    for entry in entries {
        match replace(entry) {
            Some(bytes) => out.extend_from_slice(&bytes),
            None => out.extend_from_slice(source.get(entry.range.clone()).unwrap_or_default()),
        }
    }
    for bytes in appended {
        out.extend_from_slice(bytes);
    }
    out
}

/// The Top DICT.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct TopDict {
    pub entries: Vec<DictEntry>,
    pub charstrings_offset: Option<usize>,
    /// `(size, offset)` of a Private DICT referenced directly from the Top DICT.
    pub private_dict_range: Option<(usize, usize)>,
    pub variation_store_offset: Option<usize>,
    pub fd_array_offset: Option<usize>,
    pub fd_select_offset: Option<usize>,
}

impl TopDict {
    /// Parses Top DICT data located at `base` within the table.
    pub fn parse(bytes: &[u8], base: usize) -> Result<Self> {
        let entries = parse_dict(bytes, base, 0)?;
        let mut dict = Self::default();
        for entry in &entries {
            match entry.operator {
                DictOperator::CharStringsOffset => {
                    dict.charstrings_offset = Some(entry.offset(0, base)?);
                }
                DictOperator::PrivateDictRange => {
                    dict.private_dict_range = Some((entry.offset(0, base)?, entry.offset(1, base)?));
                }
                DictOperator::VariationStoreOffset => {
                    dict.variation_store_offset = Some(entry.offset(0, base)?);
                }
                DictOperator::FdArrayOffset => dict.fd_array_offset = Some(entry.offset(0, base)?),
                DictOperator::FdSelectOffset => dict.fd_select_offset = Some(entry.offset(0, base)?),
                _ => {}
            }
        }
        dict.entries = entries;
        Ok(dict)
    }
}

/// A Font DICT from the FDArray.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FontDict {
    pub entries: Vec<DictEntry>,
    /// `(size, offset)` of the Private DICT.
    pub private_dict_range: Option<(usize, usize)>,
}

impl FontDict {
    pub fn parse(bytes: &[u8], base: usize) -> Result<Self> {
        let entries = parse_dict(bytes, base, 0)?;
        let mut private_dict_range = None;
        for entry in &entries {
            if entry.operator == DictOperator::PrivateDictRange {
                private_dict_range = Some((entry.offset(0, base)?, entry.offset(1, base)?));
            }
        }
        Ok(Self { entries, private_dict_range })
    }
}

/// A Private DICT.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct PrivateDict {
    pub entries: Vec<DictEntry>,
    /// Offset of the DICT within the table.
    pub offset: usize,
    pub size: usize,
    /// Local subroutine offset, relative to the start of the DICT.
    pub subrs_offset: Option<usize>,
    /// Default item variation data block for blends.
    pub vsindex: u16,
}

impl PrivateDict {
    /// Parses the `size` bytes at `offset` in `table`.
    pub fn parse(table: &[u8], size: usize, offset: usize, axis_count: usize) -> Result<Self> {
        let bytes = slice_at(table, offset, size)?;
        let entries = parse_dict(bytes, offset, axis_count)?;
        let mut subrs_offset = None;
        let mut vsindex = 0;
        for entry in &entries {
            match entry.operator {
                DictOperator::SubrsOffset => subrs_offset = Some(entry.offset(0, offset)?),
                DictOperator::VariationStoreIndex => {
                    vsindex = u16::try_from(entry.offset(0, offset)?)
                        .map_err(|_| FormatError::InvalidStoreIndex { offset: offset + entry.range.start })?;
                }
                _ => {}
            }
        }
        Ok(Self { entries, offset, size, subrs_offset, vsindex })
    }

    pub fn entry(&self, operator: DictOperator) -> Option<&DictEntry> {
        self.entries.iter().find(|entry| entry.operator == operator)
    }

    /// Absolute values of an array entry; delta arrays are summed.
    pub fn array(&self, operator: DictOperator) -> Option<Vec<HintValue>> {
        let entry = self.entry(operator)?;
        let mut values: Vec<HintValue> = (0..entry.operands.len()).filter_map(|i| entry.value(i)).collect();
        if operator.is_delta_array() {
            for i in 1..values.len() {
                let prev = values[i - 1].clone();
                let cur = &mut values[i];
                cur.base += prev.base;
                if cur.deltas.len() < prev.deltas.len() {
                    cur.deltas.resize(prev.deltas.len(), 0.0);
                }
                for (delta, prev_delta) in cur.deltas.iter_mut().zip(&prev.deltas) {
                    *delta += prev_delta;
                }
            }
        }
        Some(values)
    }

    /// The single value of a number entry.
    pub fn value(&self, operator: DictOperator) -> Option<HintValue> {
        self.entry(operator)?.value(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, number::encode_dict_int32};

    fn top_dict_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        encode_entry(DictOperator::FontMatrix, &[0.001, 0.0, 0.0, 0.001, 0.0, 0.0], &mut out);
        encode_dict_int32(120, &mut out);
        DictOperator::CharStringsOffset.encode(&mut out);
        encode_entry(DictOperator::VariationStoreOffset, &[40.0], &mut out);
        encode_entry(DictOperator::FdArrayOffset, &[300.0], &mut out);
        encode_entry(DictOperator::FdSelectOffset, &[290.0], &mut out);
        out
    }

    #[test]
    fn top_dict_offsets() {
        let bytes = top_dict_bytes();
        let dict = TopDict::parse(&bytes, 5).unwrap();
        assert_eq!(dict.charstrings_offset, Some(120));
        assert_eq!(dict.variation_store_offset, Some(40));
        assert_eq!(dict.fd_array_offset, Some(300));
        assert_eq!(dict.fd_select_offset, Some(290));
        assert_eq!(dict.private_dict_range, None);
        // entries without an offset are kept raw
        assert_eq!(dict.entries[0].operator, DictOperator::FontMatrix);
        assert_eq!(dict.entries[0].operands, vec![0.001, 0.0, 0.0, 0.001, 0.0, 0.0]);
        // entries tile the DICT
        assert_eq!(dict.entries.first().unwrap().range.start, 0);
        assert_eq!(dict.entries.last().unwrap().range.end, bytes.len());
        for pair in dict.entries.windows(2) {
            assert_eq!(pair[0].range.end, pair[1].range.start);
        }
    }

    #[test]
    fn unchanged_rewrite_is_identity() {
        let bytes = top_dict_bytes();
        let dict = TopDict::parse(&bytes, 0).unwrap();
        assert_eq!(rewrite_dict(&bytes, &dict.entries, |_| None, &[]), bytes);
    }

    #[test]
    fn negative_offset_is_rejected() {
        let mut bytes = Vec::new();
        encode_entry(DictOperator::CharStringsOffset, &[-4.0], &mut bytes);
        assert_eq!(
            TopDict::parse(&bytes, 5),
            Err(Error::Format(FormatError::InvalidDictOperand { offset: 5 }))
        );
    }

    #[test]
    fn private_dict_blended_blues() {
        // BlueValues stored as differences: -10 0 500 20, deltas -2 1 3 4
        let mut bytes = Vec::new();
        for (base, delta) in [(-10.0, -2.0), (0.0, 1.0), (500.0, 3.0), (20.0, 4.0)] {
            encode_dict_number(base, &mut bytes);
            encode_dict_number(delta, &mut bytes);
        }
        encode_entry(DictOperator::Blend, &[4.0, 1.0], &mut bytes);
        DictOperator::BlueValues.encode(&mut bytes);
        encode_entry(DictOperator::StdVw, &[80.0], &mut bytes);
        encode_entry(DictOperator::BlueScale, &[0.039625], &mut bytes);
        encode_entry(DictOperator::VariationStoreIndex, &[1.0], &mut bytes);
        encode_entry(DictOperator::SubrsOffset, &[64.0], &mut bytes);

        let mut table = vec![0u8; 10];
        table.extend_from_slice(&bytes);
        let dict = PrivateDict::parse(&table, bytes.len(), 10, 1).unwrap();
        assert_eq!(dict.subrs_offset, Some(64));
        assert_eq!(dict.vsindex, 1);
        assert!(dict.entry(DictOperator::BlueValues).unwrap().is_blended());
        let blues = dict.array(DictOperator::BlueValues).unwrap();
        let bases: Vec<f64> = blues.iter().map(|v| v.base).collect();
        let deltas: Vec<Vec<f64>> = blues.iter().map(|v| v.deltas.clone()).collect();
        assert_eq!(bases, vec![-10.0, -10.0, 490.0, 510.0]);
        assert_eq!(deltas, vec![vec![-2.0], vec![-1.0], vec![2.0], vec![6.0]]);
        assert_eq!(dict.value(DictOperator::StdVw), Some(HintValue::new(80.0)));
        assert_eq!(dict.value(DictOperator::BlueScale).unwrap().base, 0.039625);

        // re-encoding the absolute values reproduces the stored entry
        let mut encoded = Vec::new();
        encode_values(DictOperator::BlueValues, &blues, 1, &mut encoded);
        let range = dict.entry(DictOperator::BlueValues).unwrap().range.clone();
        assert_eq!(encoded, bytes[range].to_vec());
    }

    #[test]
    fn plain_delta_array_encoding() {
        let values = [HintValue::new(-15.0), HintValue::new(0.0), HintValue::new(600.0), HintValue::new(615.0)];
        let mut encoded = Vec::new();
        encode_values(DictOperator::OtherBlues, &values, 2, &mut encoded);
        let entries = parse_dict(&encoded, 0, 2).unwrap();
        assert_eq!(entries[0].operands, vec![-15.0, 15.0, 600.0, 15.0]);
        assert!(!entries[0].is_blended());
    }

    #[test]
    fn blend_axis_count_checked() {
        let mut bytes = Vec::new();
        encode_entry(DictOperator::Blend, &[80.0, 5.0, 1.0, 1.0], &mut bytes);
        DictOperator::StdVw.encode(&mut bytes);
        let err = parse_dict(&bytes, 0, 2).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::AxisCountMismatch { expected: 2, actual: 1, .. })));
    }
}
