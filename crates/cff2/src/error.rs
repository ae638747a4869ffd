//! Error types for CFF2 decoding, interpretation and rebuilding.

use std::result;

/// Result type for CFF2 operations.
pub type Result<T> = result::Result<T, Error>;

/// Malformed or truncated binary input.
///
/// Always fatal to the operation that detected it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("unsupported CFF table version {major}.{minor} (expected 2.0)")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("invalid header size {header_size}")]
    InvalidHeaderSize { header_size: u8 },

    #[error("invalid INDEX offset size {size} at offset {offset}")]
    InvalidIndexOffsetSize { offset: usize, size: u8 },

    #[error("invalid INDEX object offsets at offset {offset}")]
    InvalidIndexOffsets { offset: usize },

    #[error("unsupported item variation store format {0}")]
    UnsupportedVariationStoreFormat(u16),

    #[error("variation store declares {actual} axes, font declares {expected}")]
    InconsistentAxisCount { expected: usize, actual: usize },

    #[error("blend declares {actual} axes, font declares {expected} (offset {offset})")]
    AxisCountMismatch { expected: usize, actual: usize, offset: usize },

    #[error("item variation data {block} references region {index} but only {region_count} regions exist")]
    RegionIndexOutOfRange { block: usize, index: u16, region_count: usize },

    #[error("item variation data {block} has {word_count} word deltas but only {region_count} regions")]
    InvalidDeltaLayout { block: usize, word_count: usize, region_count: usize },

    #[error("subroutine {index} out of range (count {count})")]
    SubroutineOutOfRange { index: i32, count: usize },

    #[error("callsubr without a local subroutine INDEX")]
    MissingSubroutines,

    #[error("top DICT has no CharStrings offset")]
    MissingCharStrings,

    #[error("invalid DICT operand at offset {offset}")]
    InvalidDictOperand { offset: usize },

    #[error("invalid FDSelect format {0}")]
    InvalidFdSelectFormat(u8),

    #[error("glyph {glyph} out of range (glyph count {count})")]
    GlyphOutOfRange { glyph: u32, count: usize },

    #[error("font DICT index {index} out of range (count {count})")]
    FontDictOutOfRange { index: usize, count: usize },

    #[error("glyph {glyph} is not covered by FDSelect")]
    GlyphNotInFdSelect { glyph: u32 },

    #[error("invalid vsindex operand at offset {offset}")]
    InvalidStoreIndex { offset: usize },

    #[error("vsindex {index} names a missing item variation data block (count {count})")]
    StoreIndexOutOfRange { index: u16, count: usize },

    #[error("glyph {glyph} declares hints inside a subroutine; cannot rewrite its hints")]
    HintsInSubroutine { glyph: u32 },

    #[error("table layout did not converge after {iterations} passes")]
    LayoutDidNotConverge { iterations: usize },
}

/// Bad bytecode within a single glyph.
///
/// Recoverable at glyph granularity: the caller may skip the glyph,
/// substitute an empty outline or abort.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpretationError {
    #[error("operand stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    #[error("operand stack overflow at offset {offset}")]
    StackOverflow { offset: usize },

    #[error("truncated charstring at offset {offset}")]
    Truncated { offset: usize },

    #[error("blend operand is itself a blended value (offset {offset})")]
    NestedBlend { offset: usize },

    #[error("invalid blend count {count} at offset {offset}")]
    InvalidBlendCount { count: f64, offset: usize },

    #[error("subroutine nesting depth exceeded {limit}")]
    NestingDepthExceeded { limit: u32 },
}

/// Variation data that cannot be trusted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("region {region} axis {axis} violates start <= peak <= end ({start}, {peak}, {end})")]
    RegionOrdering { region: usize, axis: usize, start: f64, peak: f64, end: f64 },

    #[error("hint value has {actual} deltas, font declares {expected} axes")]
    DeltaCountMismatch { expected: usize, actual: usize },

    #[error("blended values supplied for a font without a variation store")]
    BlendWithoutVariationStore,

    #[error("hint mask references stem {stem} but only {count} stems are declared")]
    MaskStemOutOfRange { stem: usize, count: usize },

    #[error("value {value} does not fit a charstring operand")]
    ValueOutOfRange { value: f64 },
}

/// Any error produced by this crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Interpretation(#[from] InterpretationError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

impl Error {
    /// Whether the error is confined to a single glyph.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Interpretation(_))
    }
}
