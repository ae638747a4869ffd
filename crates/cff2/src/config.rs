//! Format constants and decoding options.

use font_types::Tag;

/// Maximum number of operands on the DICT/charstring operand stack.
pub const MAX_STACK: usize = 513;

/// Maximum nesting depth for subroutine calls.
pub const NESTING_DEPTH_LIMIT: u32 = 10;

/// Size of the fixed CFF2 header (major, minor, headerSize, topDictLength).
pub const HEADER_SIZE: usize = 5;

/// Passes allowed for offset layout to reach a fixed point on rebuild.
pub const MAX_LAYOUT_PASSES: usize = 8;

/// Subroutine counts below this use a bias of 107.
pub const SMALL_SUBR_COUNT: usize = 1240;

/// Subroutine counts below this (and at least `SMALL_SUBR_COUNT`) use a bias of 1131.
pub const MEDIUM_SUBR_COUNT: usize = 33900;

/// Computes the bias added to a subroutine operand.
pub fn subr_bias(count: usize) -> i32 {
    if count < SMALL_SUBR_COUNT {
        107
    } else if count < MEDIUM_SUBR_COUNT {
        1131
    } else {
        32768
    }
}

/// What batch decoding does with a glyph whose bytecode is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GlyphErrorPolicy {
    /// Fail the whole operation.
    #[default]
    Abort,
    /// Replace the glyph with an empty outline.
    EmptyOutline,
    /// Leave the glyph out of the result.
    Skip,
}

/// Options for reading and interpreting a CFF2 table.
#[derive(Debug, Clone)]
pub struct Options {
    /// Axis count declared by the font (`fvar`).
    ///
    /// When `None`, the axis count of the variation store is used.
    pub axis_count: Option<usize>,

    /// Axis tags in font order, used to turn design coordinates into vectors.
    pub axis_tags: Vec<Tag>,

    /// Handling of recoverable per-glyph errors in batch decoding.
    pub glyph_error_policy: GlyphErrorPolicy,

    /// Maximum subroutine nesting depth.
    pub nesting_limit: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            axis_count: None,
            axis_tags: Vec::new(),
            glyph_error_policy: GlyphErrorPolicy::default(),
            nesting_limit: NESTING_DEPTH_LIMIT,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis_count(mut self, axis_count: usize) -> Self {
        self.axis_count = Some(axis_count);
        self
    }

    /// Set axis tags (accepts any iterable of 4-character strings).
    ///
    /// Shorter tags are padded with spaces; the axis count is taken from the
    /// number of tags unless set explicitly.
    pub fn axis_tags(mut self, tags: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.axis_tags = tags.into_iter().map(|t| tag_from_str(t.as_ref())).collect();
        if self.axis_count.is_none() {
            self.axis_count = Some(self.axis_tags.len());
        }
        self
    }

    pub fn glyph_error_policy(mut self, policy: GlyphErrorPolicy) -> Self {
        self.glyph_error_policy = policy;
        self
    }

    pub fn nesting_limit(mut self, limit: u32) -> Self {
        self.nesting_limit = limit;
        self
    }
}

/// Build a tag from a string, padding with spaces.
pub fn tag_from_str(tag: &str) -> Tag {
    let mut bytes = [b' '; 4];
    for (dst, src) in bytes.iter_mut().zip(tag.as_bytes()) {
        *dst = *src;
    }
    Tag::new(&bytes)
}
