//! Operand encodings for charstrings and DICTs.
//!
//! See "Table 3 Operand Encoding" of the CFF2 specification and "3.2
//! Charstring Number Encoding" of the Type 2 charstring format.

use font_types::Fixed;

use crate::{
    error::{ConsistencyError, FormatError},
    parse::Cursor,
};

/// Escape byte introducing a two-byte operator.
pub(crate) const ESCAPE: u8 = 12;

/// Decodes the integer forms shared by DICTs and charstrings.
///
/// `b0` has already been consumed. Handles `28` (16-bit) and `32..=254`;
/// `29` (32-bit) is only valid in DICTs and is handled by the caller.
pub(crate) fn parse_short_int(cursor: &mut Cursor, b0: u8) -> Result<i32, FormatError> {
    Ok(match b0 {
        28 => cursor.read_i16()? as i32,
        32..=246 => b0 as i32 - 139,
        247..=250 => (b0 as i32 - 247) * 256 + cursor.read_u8()? as i32 + 108,
        251..=254 => -(b0 as i32 - 251) * 256 - cursor.read_u8()? as i32 - 108,
        _ => return Err(FormatError::InvalidDictOperand { offset: cursor.table_offset() }),
    })
}

/// Decodes a 16.16 fixed point charstring operand (prefix `255`).
pub(crate) fn parse_fixed(cursor: &mut Cursor) -> Result<f64, FormatError> {
    Ok(Fixed::from_bits(cursor.read_i32()?).to_f64())
}

/// Decodes a DICT operand starting with `b0`.
pub(crate) fn parse_dict_operand(cursor: &mut Cursor, b0: u8) -> Result<f64, FormatError> {
    match b0 {
        29 => Ok(cursor.read_i32()? as f64),
        30 => parse_bcd(cursor),
        28 | 32..=254 => Ok(parse_short_int(cursor, b0)? as f64),
        _ => Err(FormatError::InvalidDictOperand { offset: cursor.table_offset() }),
    }
}

/// Decodes a binary coded decimal real.
fn parse_bcd(cursor: &mut Cursor) -> Result<f64, FormatError> {
    let start = cursor.table_offset();
    let mut text = String::new();
    'outer: loop {
        let byte = cursor.read_u8()?;
        for nibble in [byte >> 4, byte & 0xf] {
            match nibble {
                0..=9 => text.push((b'0' + nibble) as char),
                0xa => text.push('.'),
                0xb => text.push('E'),
                0xc => text.push_str("E-"),
                0xe => text.push('-'),
                0xf => break 'outer,
                _ => return Err(FormatError::InvalidDictOperand { offset: start }),
            }
        }
    }
    if text.is_empty() {
        return Ok(0.0);
    }
    text.parse::<f64>()
        .map_err(|_| FormatError::InvalidDictOperand { offset: start })
}

fn is_integral(value: f64) -> bool {
    value.fract() == 0.0 && value.is_finite()
}

fn push_short_int(value: i32, out: &mut Vec<u8>) -> bool {
    match value {
        -107..=107 => out.push((value + 139) as u8),
        108..=1131 => {
            let v = value - 108;
            out.push(((v >> 8) + 247) as u8);
            out.push((v & 0xff) as u8);
        }
        -1131..=-108 => {
            let v = -value - 108;
            out.push(((v >> 8) + 251) as u8);
            out.push((v & 0xff) as u8);
        }
        -32768..=32767 => {
            out.push(28);
            out.extend_from_slice(&(value as i16).to_be_bytes());
        }
        _ => return false,
    }
    true
}

/// Bounds of a 16.16 charstring operand.
const FIXED_MIN: f64 = i32::MIN as f64 / 65536.0;
const FIXED_MAX: f64 = i32::MAX as f64 / 65536.0;

/// Appends the shortest charstring encoding of `value`.
///
/// Integers that fit in 16 bits use the integer forms, everything else is
/// written as 16.16 fixed point. Values outside the 16.16 range are
/// rejected.
pub fn encode_charstring_number(value: f64, out: &mut Vec<u8>) -> Result<(), ConsistencyError> {
    if is_integral(value) && push_short_int(value as i32, out) {
        return Ok(());
    }
    if !(FIXED_MIN..=FIXED_MAX).contains(&value) {
        return Err(ConsistencyError::ValueOutOfRange { value });
    }
    out.push(255);
    out.extend_from_slice(&Fixed::from_f64(value).to_bits().to_be_bytes());
    Ok(())
}

/// Appends the shortest DICT encoding of `value`.
pub fn encode_dict_number(value: f64, out: &mut Vec<u8>) {
    if is_integral(value) && value.abs() <= i32::MAX as f64 {
        let int = value as i32;
        if !push_short_int(int, out) {
            out.push(29);
            out.extend_from_slice(&int.to_be_bytes());
        }
        return;
    }
    encode_bcd(value, out);
}

/// Appends a DICT integer using the fixed-width 5 byte form.
pub fn encode_dict_int32(value: i32, out: &mut Vec<u8>) {
    out.push(29);
    out.extend_from_slice(&value.to_be_bytes());
}

fn encode_bcd(value: f64, out: &mut Vec<u8>) {
    let text = value.to_string();
    let text = text.strip_prefix("0.").map(|t| format!(".{t}")).unwrap_or(text);
    let text = text.strip_prefix("-0.").map(|t| format!("-.{t}")).unwrap_or(text);
    let mut nibbles: Vec<u8> = text
        .bytes()
        .map(|c| match c {
            b'0'..=b'9' => c - b'0',
            b'.' => 0xa,
            b'-' => 0xe,
            _ => 0xf,
        })
        .collect();
    nibbles.push(0xf);
    if nibbles.len() % 2 != 0 {
        nibbles.push(0xf);
    }
    out.push(30);
    out.extend(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
}
