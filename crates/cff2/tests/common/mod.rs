//! Hand-assembled CFF2 tables for integration tests.

#![allow(dead_code)]

use cff2_table::{
    DictOperator, encode_charstring_number, encode_dict_int32, encode_dict_number, encode_index,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Assembles a charstring from `(operands, operator bytes)` pairs.
pub fn program(parts: &[(&[f64], &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (operands, operator) in parts {
        for &value in *operands {
            encode_charstring_number(value, &mut out).unwrap();
        }
        out.extend_from_slice(operator);
    }
    out
}

/// Appends a DICT entry with plain operands.
pub fn dict_entry(out: &mut Vec<u8>, operator: DictOperator, operands: &[f64]) {
    for &value in operands {
        encode_dict_number(value, out);
    }
    operator.encode(out);
}

fn offset_entry(out: &mut Vec<u8>, operator: DictOperator, operands: &[usize]) {
    for &value in operands {
        encode_dict_int32(value as i32, out);
    }
    operator.encode(out);
}

/// A Private DICT (without its Subrs entry) and its local subroutines.
#[derive(Clone, Default)]
pub struct PrivateParts {
    pub dict: Vec<u8>,
    pub subrs: Vec<Vec<u8>>,
}

/// Contents of a test table.
#[derive(Clone, Default)]
pub struct TableParts {
    /// Regions as per-axis `(start, peak, end)`; empty means no Variation Store.
    pub regions: Vec<Vec<(f64, f64, f64)>>,
    pub global_subrs: Vec<Vec<u8>>,
    pub charstrings: Vec<Vec<u8>>,
    pub privates: Vec<PrivateParts>,
    /// FDSelect bytes; requires `fd_array`.
    pub fd_select: Option<Vec<u8>>,
    /// Reference Private DICTs through an FDArray instead of the Top DICT.
    pub fd_array: bool,
}

/// Serializes an item variation store with one data block that uses every
/// region, all deltas as 16-bit words and no delta rows.
pub fn store_bytes(regions: &[Vec<(f64, f64, f64)>]) -> Vec<u8> {
    let axis_count = regions.first().map(Vec::len).unwrap_or(0);
    let f2dot14 = |value: f64| ((value * 16384.0) as i16).to_be_bytes();
    let mut region_list = Vec::new();
    region_list.extend_from_slice(&(axis_count as u16).to_be_bytes());
    region_list.extend_from_slice(&(regions.len() as u16).to_be_bytes());
    for region in regions {
        for &(start, peak, end) in region {
            region_list.extend_from_slice(&f2dot14(start));
            region_list.extend_from_slice(&f2dot14(peak));
            region_list.extend_from_slice(&f2dot14(end));
        }
    }
    let mut data = Vec::new();
    data.extend_from_slice(&0u16.to_be_bytes());
    data.extend_from_slice(&(regions.len() as u16).to_be_bytes());
    data.extend_from_slice(&(regions.len() as u16).to_be_bytes());
    for index in 0..regions.len() as u16 {
        data.extend_from_slice(&index.to_be_bytes());
    }
    let header_len = 2 + 4 + 2 + 4;
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(header_len as u32).to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&((header_len + region_list.len()) as u32).to_be_bytes());
    out.extend_from_slice(&region_list);
    out.extend_from_slice(&data);
    out
}

/// Lays the table out as
/// header | Top DICT | Global Subrs | CharStrings | FDSelect | FDArray |
/// (Private DICT | Subrs)* | Variation Store
/// with every offset written as a 5 byte integer.
pub fn build_table(parts: &TableParts) -> Vec<u8> {
    let private_dicts: Vec<Vec<u8>> = parts
        .privates
        .iter()
        .map(|private| {
            let mut dict = private.dict.clone();
            if !private.subrs.is_empty() {
                let size = dict.len() + 6;
                offset_entry(&mut dict, DictOperator::SubrsOffset, &[size]);
            }
            dict
        })
        .collect();
    let local_subrs: Vec<Vec<u8>> = parts
        .privates
        .iter()
        .map(|private| if private.subrs.is_empty() { Vec::new() } else { encode_index(&private.subrs) })
        .collect();
    let global_subrs = encode_index(&parts.global_subrs);
    let charstrings = encode_index(&parts.charstrings);
    let fd_select = parts.fd_select.clone().unwrap_or_default();
    let store = if parts.regions.is_empty() {
        Vec::new()
    } else {
        let store = store_bytes(&parts.regions);
        let mut prefixed = (store.len() as u16).to_be_bytes().to_vec();
        prefixed.extend_from_slice(&store);
        prefixed
    };

    let mut top_len = 6;
    if !store.is_empty() {
        top_len += 6;
    }
    if parts.fd_array {
        top_len += 7;
        if !fd_select.is_empty() {
            top_len += 7;
        }
    } else if !parts.privates.is_empty() {
        top_len += 11;
    }
    let charstrings_offset = 5 + top_len + global_subrs.len();
    let fd_select_offset = charstrings_offset + charstrings.len();
    let fd_array_offset = fd_select_offset + fd_select.len();
    // each Font DICT holds a single 11 byte Private DICT range entry
    let fd_array_len = if parts.fd_array {
        encode_index(&vec![vec![0u8; 11]; parts.privates.len()]).len()
    } else {
        0
    };
    let mut offset = fd_array_offset + fd_array_len;
    let mut private_ranges = Vec::new();
    for (dict, subrs) in private_dicts.iter().zip(&local_subrs) {
        private_ranges.push((dict.len(), offset));
        offset += dict.len() + subrs.len();
    }
    let store_offset = offset;

    let mut top = Vec::new();
    offset_entry(&mut top, DictOperator::CharStringsOffset, &[charstrings_offset]);
    if !store.is_empty() {
        offset_entry(&mut top, DictOperator::VariationStoreOffset, &[store_offset]);
    }
    let mut fd_array = Vec::new();
    if parts.fd_array {
        offset_entry(&mut top, DictOperator::FdArrayOffset, &[fd_array_offset]);
        if !fd_select.is_empty() {
            offset_entry(&mut top, DictOperator::FdSelectOffset, &[fd_select_offset]);
        }
        let font_dicts: Vec<Vec<u8>> = private_ranges
            .iter()
            .map(|&(size, offset)| {
                let mut dict = Vec::new();
                offset_entry(&mut dict, DictOperator::PrivateDictRange, &[size, offset]);
                dict
            })
            .collect();
        fd_array = encode_index(&font_dicts);
    } else if let Some(&(size, offset)) = private_ranges.first() {
        offset_entry(&mut top, DictOperator::PrivateDictRange, &[size, offset]);
    }
    assert_eq!(top.len(), top_len);
    assert_eq!(fd_array.len(), fd_array_len);

    let mut out = vec![2, 0, 5];
    out.extend_from_slice(&(top.len() as u16).to_be_bytes());
    out.extend_from_slice(&top);
    out.extend_from_slice(&global_subrs);
    out.extend_from_slice(&charstrings);
    out.extend_from_slice(&fd_select);
    out.extend_from_slice(&fd_array);
    for (dict, subrs) in private_dicts.iter().zip(&local_subrs) {
        out.extend_from_slice(dict);
        out.extend_from_slice(subrs);
    }
    assert_eq!(out.len(), store_offset);
    out.extend_from_slice(&store);
    out
}

/// One `wght` axis with a single region peaking at the maximum.
pub fn one_axis_regions() -> Vec<Vec<(f64, f64, f64)>> {
    vec![vec![(0.0, 1.0, 1.0)]]
}

/// A two glyph, one axis table:
///
/// * glyph 0: `.notdef` with only an advance width
/// * glyph 1: `10 20 rmoveto (30 +5) 40 rlineto`, the x delta blended, and a
///   call to local subroutine 0 drawing a second line
pub fn sample_parts() -> TableParts {
    let notdef = program(&[(&[500.0], &[14])]);
    let glyph = program(&[
        (&[0.0, 20.0], &[1]),
        (&[10.0, 20.0], &[21]),
        (&[30.0, 5.0, 1.0, 1.0], &[16]),
        (&[40.0], &[5]),
        (&[-107.0], &[10]),
        (&[], &[14]),
    ]);
    let subr = program(&[(&[0.0, -40.0], &[5]), (&[], &[11])]);
    let mut dict = Vec::new();
    dict_entry(&mut dict, DictOperator::BlueValues, &[-15.0, 15.0, 485.0, 15.0]);
    dict_entry(&mut dict, DictOperator::StdVw, &[80.0]);
    TableParts {
        regions: one_axis_regions(),
        global_subrs: vec![program(&[(&[1.0, 1.0], &[5]), (&[], &[11])])],
        charstrings: vec![notdef, glyph],
        privates: vec![PrivateParts { dict, subrs: vec![subr] }],
        fd_select: None,
        fd_array: true,
    }
}

/// FDSelect format 3 sending glyph 0 to FD 0 and glyph 1 to FD 1.
pub const TWO_FD_SELECT: [u8; 11] = [3, 0, 2, 0, 0, 0, 0, 1, 1, 0, 2];

/// Two glyphs with the same program, each calling local subroutine 0 of its
/// own Font DICT: FD 0 draws down by 40, FD 1 by 80.
pub fn two_font_dict_parts() -> TableParts {
    let glyph = program(&[(&[0.0, 0.0], &[21]), (&[-107.0], &[10]), (&[], &[14])]);
    let down = |dy: f64| program(&[(&[0.0, dy], &[5]), (&[], &[11])]);
    TableParts {
        charstrings: vec![glyph.clone(), glyph],
        privates: vec![
            PrivateParts { dict: Vec::new(), subrs: vec![down(-40.0)] },
            PrivateParts { dict: Vec::new(), subrs: vec![down(-80.0)] },
        ],
        fd_select: Some(TWO_FD_SELECT.to_vec()),
        fd_array: true,
        ..Default::default()
    }
}
