//! Reading, interpreting and rebuilding the CFF2 table of variable OpenType
//! fonts.
//!
//! [`Cff2Reader`] gives cached access to the sections of a table and
//! interprets glyph charstrings, capturing every blend group so outlines can
//! be evaluated anywhere in the design space. [`Cff2Builder`] writes the
//! table back out with injected hints, keeping the Variation Store and all
//! untouched data byte for byte.
//!
//! # Example
//!
//! ```no_run
//! use cff2_table::{Cff2Reader, DesignCoordinates, GlyphId, Options};
//!
//! let table = std::fs::read("CFF2.bin").unwrap();
//! let reader = Cff2Reader::new(&table, Options::new().axis_tags(["wght"]));
//! let bold = DesignCoordinates::from_iter([("wght", 1.0)]);
//! let outline = reader.outline(GlyphId::new(1), &bold).unwrap();
//! ```

mod blend;
mod builder;
mod charstring;
mod config;
mod dict;
mod error;
mod fd_select;
mod hints;
mod index;
mod number;
mod parallel;
mod parse;
mod reader;
mod scalar;
mod stack;
mod varstore;

pub use blend::{BlendGroup, CapturedBlend, resolve, resolve_item};
pub use builder::Cff2Builder;
pub use charstring::{
    CharStringContext, DecodedCharString, Operator, PathCommand, Token, TraceOp, interpret,
    to_bez_path,
};
pub use config::{GlyphErrorPolicy, MAX_STACK, NESTING_DEPTH_LIMIT, Options, subr_bias, tag_from_str};
pub use dict::{
    DictEntry, DictOperator, FontDict, PrivateDict, TopDict, encode_entry, encode_values, parse_dict,
};
pub use error::{ConsistencyError, Error, FormatError, InterpretationError, Result};
pub use fd_select::FdSelect;
pub use font_types::{GlyphId, Tag};
pub use hints::{FontHints, GlyphHints, HintDirective, HintPayload, HintValue, rewrite_charstring};
pub use index::{Index, encode_index};
pub use number::{encode_charstring_number, encode_dict_int32, encode_dict_number};
pub use parallel::{BatchResult, TableJob, decode_glyphs, rebuild_tables};
pub use reader::{Cff2Header, Cff2Reader};
pub use scalar::{DesignCoordinates, ScalarCache, block_scalars, scalar, scalars};
pub use varstore::{ItemVariationData, Region, RegionAxis, VariationStore};
