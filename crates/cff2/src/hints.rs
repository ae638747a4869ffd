//! Hint payloads and their injection into charstrings and Private DICTs.

use font_types::GlyphId;
use indexmap::IndexMap;

use crate::{
    charstring::{DecodedCharString, Operator},
    dict::DictOperator,
    error::{ConsistencyError, FormatError, Result},
    number::encode_charstring_number,
};

/// A hint value: a base plus one delta per font axis when it varies.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct HintValue {
    pub base: f64,
    pub deltas: Vec<f64>,
}

impl HintValue {
    pub fn new(base: f64) -> Self {
        Self { base, deltas: Vec::new() }
    }

    pub fn blended(base: f64, deltas: Vec<f64>) -> Self {
        Self { base, deltas }
    }

    pub fn is_blended(&self) -> bool {
        !self.deltas.is_empty()
    }

    /// Component-wise difference; missing deltas count as zero.
    fn minus(&self, other: &HintValue) -> HintValue {
        let len = self.deltas.len().max(other.deltas.len());
        let deltas = (0..len)
            .map(|i| {
                self.deltas.get(i).copied().unwrap_or(0.0) - other.deltas.get(i).copied().unwrap_or(0.0)
            })
            .collect();
        HintValue { base: self.base - other.base, deltas }
    }

    fn plus(&self, other: &HintValue) -> HintValue {
        let negated = HintValue {
            base: -other.base,
            deltas: other.deltas.iter().map(|d| -d).collect(),
        };
        self.minus(&negated)
    }
}

impl From<f64> for HintValue {
    fn from(base: f64) -> Self {
        Self::new(base)
    }
}

/// One hinting instruction for a glyph.
///
/// Stems are numbered horizontal stems first, then vertical stems, each in
/// the order given. Masks refer to stems by that number.
#[derive(Clone, PartialEq, Debug)]
pub enum HintDirective {
    /// Horizontal stem from `edge` to `edge + width`.
    HStem { edge: HintValue, width: HintValue },
    /// Vertical stem from `edge` to `edge + width`.
    VStem { edge: HintValue, width: HintValue },
    /// Activates `stems` for the path operators starting at top-level path
    /// operator number `before_path_op`.
    HintMask { before_path_op: usize, stems: Vec<usize> },
    /// Counter control group.
    CntrMask { stems: Vec<usize> },
}

/// Hints for one glyph. Replaces all existing hints of the glyph.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct GlyphHints {
    pub directives: Vec<HintDirective>,
}

impl GlyphHints {
    pub fn new(directives: Vec<HintDirective>) -> Self {
        Self { directives }
    }

    fn values(&self) -> impl Iterator<Item = &HintValue> {
        self.directives.iter().flat_map(|directive| match directive {
            HintDirective::HStem { edge, width } | HintDirective::VStem { edge, width } => {
                vec![edge, width]
            }
            _ => Vec::new(),
        })
    }

    fn stems(&self, horizontal: bool) -> Vec<(&HintValue, &HintValue)> {
        self.directives
            .iter()
            .filter_map(|directive| match directive {
                HintDirective::HStem { edge, width } if horizontal => Some((edge, width)),
                HintDirective::VStem { edge, width } if !horizontal => Some((edge, width)),
                _ => None,
            })
            .collect()
    }

    fn stem_count(&self) -> usize {
        self.directives
            .iter()
            .filter(|d| matches!(d, HintDirective::HStem { .. } | HintDirective::VStem { .. }))
            .count()
    }

    fn has_masks(&self) -> bool {
        self.directives
            .iter()
            .any(|d| matches!(d, HintDirective::HintMask { .. } | HintDirective::CntrMask { .. }))
    }
}

/// Font-wide hinting parameters written to every Private DICT.
///
/// Arrays hold absolute values; `None` leaves the existing entry untouched.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FontHints {
    pub blue_values: Option<Vec<HintValue>>,
    pub other_blues: Option<Vec<HintValue>>,
    pub family_blues: Option<Vec<HintValue>>,
    pub family_other_blues: Option<Vec<HintValue>>,
    pub stem_snap_h: Option<Vec<HintValue>>,
    pub stem_snap_v: Option<Vec<HintValue>>,
    pub std_hw: Option<HintValue>,
    pub std_vw: Option<HintValue>,
    pub blue_scale: Option<HintValue>,
    pub blue_shift: Option<HintValue>,
    pub blue_fuzz: Option<HintValue>,
    pub language_group: Option<HintValue>,
}

impl FontHints {
    /// The entries to write, in DICT order.
    pub fn overrides(&self) -> Vec<(DictOperator, Vec<HintValue>)> {
        let arrays = [
            (DictOperator::BlueValues, &self.blue_values),
            (DictOperator::OtherBlues, &self.other_blues),
            (DictOperator::FamilyBlues, &self.family_blues),
            (DictOperator::FamilyOtherBlues, &self.family_other_blues),
            (DictOperator::StemSnapH, &self.stem_snap_h),
            (DictOperator::StemSnapV, &self.stem_snap_v),
        ];
        let numbers = [
            (DictOperator::StdHw, &self.std_hw),
            (DictOperator::StdVw, &self.std_vw),
            (DictOperator::BlueScale, &self.blue_scale),
            (DictOperator::BlueShift, &self.blue_shift),
            (DictOperator::BlueFuzz, &self.blue_fuzz),
            (DictOperator::LanguageGroup, &self.language_group),
        ];
        arrays
            .into_iter()
            .filter_map(|(op, values)| values.clone().map(|v| (op, v)))
            .chain(
                numbers
                    .into_iter()
                    .filter_map(|(op, value)| value.clone().map(|v| (op, vec![v]))),
            )
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides().is_empty()
    }
}

/// Hints to inject into a font.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct HintPayload {
    pub glyphs: IndexMap<GlyphId, GlyphHints>,
    pub font_hints: Option<FontHints>,
}

impl HintPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_glyph(mut self, glyph: impl Into<GlyphId>, hints: GlyphHints) -> Self {
        self.glyphs.insert(glyph.into(), hints);
        self
    }

    pub fn with_font_hints(mut self, font_hints: FontHints) -> Self {
        self.font_hints = Some(font_hints);
        self
    }

    /// Whether applying the payload would change nothing.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty() && self.font_hints.as_ref().is_none_or(FontHints::is_empty)
    }

    /// Checks every value against the font's axis count and every mask
    /// against its glyph's stems.
    pub fn validate(&self, axis_count: usize, has_variation_store: bool) -> Result<()> {
        let font_values = self
            .font_hints
            .iter()
            .flat_map(|hints| hints.overrides())
            .flat_map(|(_, values)| values);
        let glyph_values = self.glyphs.values().flat_map(|g| g.values().cloned());
        for value in font_values.chain(glyph_values) {
            check_value(&value, axis_count, has_variation_store)?;
        }
        for hints in self.glyphs.values() {
            let count = hints.stem_count();
            for directive in &hints.directives {
                let stems = match directive {
                    HintDirective::HintMask { stems, .. } | HintDirective::CntrMask { stems } => stems,
                    _ => continue,
                };
                if let Some(&stem) = stems.iter().find(|&&stem| stem >= count) {
                    return Err(ConsistencyError::MaskStemOutOfRange { stem, count }.into());
                }
            }
        }
        Ok(())
    }
}

fn check_value(value: &HintValue, axis_count: usize, has_variation_store: bool) -> Result<()> {
    if !value.is_blended() {
        return Ok(());
    }
    if !has_variation_store {
        return Err(ConsistencyError::BlendWithoutVariationStore.into());
    }
    if value.deltas.len() != axis_count {
        return Err(ConsistencyError::DeltaCountMismatch {
            expected: axis_count,
            actual: value.deltas.len(),
        }
        .into());
    }
    Ok(())
}

/// Writes charstring operands, as one blend when any value varies.
fn push_values(values: &[HintValue], axis_count: usize, out: &mut Vec<u8>) -> Result<()> {
    if values.iter().any(HintValue::is_blended) {
        for value in values {
            encode_charstring_number(value.base, out)?;
            for i in 0..axis_count {
                encode_charstring_number(value.deltas.get(i).copied().unwrap_or(0.0), out)?;
            }
        }
        encode_charstring_number(values.len() as f64, out)?;
        encode_charstring_number(axis_count as f64, out)?;
        Operator::Blend.encode(out);
    } else {
        for value in values {
            encode_charstring_number(value.base, out)?;
        }
    }
    Ok(())
}

/// Writes a stem operator; each edge is relative to the end of the
/// previous stem.
fn push_stems(
    stems: &[(&HintValue, &HintValue)],
    operator: Operator,
    axis_count: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    if stems.is_empty() {
        return Ok(());
    }
    let mut operands = Vec::with_capacity(stems.len() * 2);
    let mut prev_end = HintValue::default();
    for (edge, width) in stems {
        operands.push(edge.minus(&prev_end));
        operands.push((*width).clone());
        prev_end = edge.plus(width);
    }
    push_values(&operands, axis_count, out)?;
    operator.encode(out);
    Ok(())
}

fn push_mask(operator: Operator, stems: &[usize], stem_count: usize, out: &mut Vec<u8>) {
    let mut mask = vec![0u8; stem_count.div_ceil(8)];
    for &stem in stems {
        if let Some(byte) = mask.get_mut(stem / 8) {
            *byte |= 0x80 >> (stem % 8);
        }
    }
    operator.encode(out);
    out.extend_from_slice(&mask);
}

/// Encoded length of the charstring number starting with `b0`.
fn number_len(b0: u8) -> Option<usize> {
    match b0 {
        28 => Some(3),
        32..=246 => Some(1),
        247..=254 => Some(2),
        255 => Some(5),
        _ => None,
    }
}

/// Rewrites `bytes` with the existing top-level hints replaced by `hints`.
///
/// Every non-hint operator is copied byte for byte. An advance width is
/// moved to the front so the first stack-clearing operator still sees it.
pub fn rewrite_charstring(
    glyph: GlyphId,
    bytes: &[u8],
    decoded: &DecodedCharString,
    hints: &GlyphHints,
    axis_count: usize,
) -> Result<Vec<u8>> {
    if decoded.hints_in_subroutine() {
        return Err(FormatError::HintsInSubroutine { glyph: glyph.to_u32() }.into());
    }
    let tokens = decoded.tokens();
    let mut out = Vec::with_capacity(bytes.len() + 16);

    // (token index, width byte length)
    let mut width = None;
    if let Some(ix) = decoded.width_token()
        && let Some(token) = tokens.get(ix)
        && let Some(len) = bytes.get(token.range.start).copied().and_then(number_len)
    {
        out.extend_from_slice(bytes.get(token.range.start..token.range.start + len).unwrap_or_default());
        width = Some((ix, len));
    }

    let stem_count = hints.stem_count();
    let has_masks = hints.has_masks();
    let (hstem, vstem) = if has_masks {
        (Operator::HStemHm, Operator::VStemHm)
    } else {
        (Operator::HStem, Operator::VStem)
    };
    push_stems(&hints.stems(true), hstem, axis_count, &mut out)?;
    push_stems(&hints.stems(false), vstem, axis_count, &mut out)?;
    for directive in &hints.directives {
        if let HintDirective::CntrMask { stems } = directive {
            push_mask(Operator::CntrMask, stems, stem_count, &mut out);
        }
    }

    let masks_before = |path_op: usize, out: &mut Vec<u8>| {
        for directive in &hints.directives {
            if let HintDirective::HintMask { before_path_op, stems } = directive
                && *before_path_op == path_op
            {
                push_mask(Operator::HintMask, stems, stem_count, out);
            }
        }
    };

    let path_op_count = tokens.iter().filter(|t| t.operator.is_path()).count();
    let late_masks = path_op_count..path_op_count.max(max_mask_target(hints) + 1);
    let mut late_pending = true;
    let mut path_op = 0;
    for (ix, token) in tokens.iter().enumerate() {
        if token.operator.is_path() {
            masks_before(path_op, &mut out);
            path_op += 1;
        } else if token.operator == Operator::EndChar && late_pending {
            late_masks.clone().for_each(|late| masks_before(late, &mut out));
            late_pending = false;
        }
        if token.operator.is_hint() {
            continue;
        }
        let start = match width {
            Some((width_ix, len)) if width_ix == ix => token.range.start + len,
            _ => token.range.start,
        };
        out.extend_from_slice(bytes.get(start..token.range.end).unwrap_or_default());
    }
    if late_pending {
        late_masks.for_each(|late| masks_before(late, &mut out));
    }
    // trailing bytes after the last operator
    let tail = tokens.last().map_or(0, |t| t.range.end);
    out.extend_from_slice(bytes.get(tail..).unwrap_or_default());
    Ok(out)
}

fn max_mask_target(hints: &GlyphHints) -> usize {
    hints
        .directives
        .iter()
        .filter_map(|d| match d {
            HintDirective::HintMask { before_path_op, .. } => Some(*before_path_op),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}
