//! Parallel glyph decoding and batch table rebuilds.

use font_types::GlyphId;
use log::{info, warn};
use rayon::prelude::*;

use crate::{
    builder::Cff2Builder,
    charstring::DecodedCharString,
    config::{GlyphErrorPolicy, Options},
    error::Result,
    hints::HintPayload,
    reader::Cff2Reader,
};

/// Result of a parallel batch operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    fn tally<T>(results: &[Result<T>]) -> Self {
        let failed = results.iter().filter(|r| r.is_err()).count();
        Self { succeeded: results.len() - failed, failed }
    }
}

/// Interprets every glyph of the table in parallel.
///
/// Recoverable errors are handled according to the reader's
/// [`GlyphErrorPolicy`]; any other error fails the whole batch.
pub fn decode_glyphs(reader: &Cff2Reader) -> Result<Vec<(GlyphId, DecodedCharString)>> {
    let glyph_count = reader.glyph_count()?;
    let policy = reader.options().glyph_error_policy;
    let results: Vec<_> = (0..glyph_count as u32)
        .into_par_iter()
        .map(|gid| {
            let glyph = GlyphId::new(gid);
            (glyph, reader.decode_glyph(glyph))
        })
        .collect();

    let mut glyphs = Vec::with_capacity(results.len());
    let mut substituted = 0;
    for (glyph, result) in results {
        match result {
            Ok(decoded) => glyphs.push((glyph, decoded)),
            Err(e) if e.is_recoverable() && policy != GlyphErrorPolicy::Abort => {
                substituted += 1;
                if policy == GlyphErrorPolicy::EmptyOutline {
                    warn!("Glyph {}: {e}; using an empty outline", glyph.to_u32());
                    glyphs.push((glyph, DecodedCharString::default()));
                } else {
                    warn!("Glyph {}: {e}; skipped", glyph.to_u32());
                }
            }
            Err(e) => return Err(e),
        }
    }
    info!("Decoded {glyph_count} glyphs ({substituted} with errors)");
    Ok(glyphs)
}

/// One table to rebuild.
#[derive(Debug, Clone)]
pub struct TableJob<'a> {
    pub data: &'a [u8],
    pub options: Options,
    pub payload: Option<&'a HintPayload>,
}

impl<'a> TableJob<'a> {
    pub fn new(data: &'a [u8], options: Options) -> Self {
        Self { data, options, payload: None }
    }

    pub fn payload(mut self, payload: &'a HintPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    fn run(&self) -> Result<Vec<u8>> {
        let reader = Cff2Reader::new(self.data, self.options.clone());
        Cff2Builder::new(&reader).build(self.payload)
    }
}

/// Rebuilds independent tables in parallel, one result per job.
pub fn rebuild_tables(jobs: &[TableJob]) -> (Vec<Result<Vec<u8>>>, BatchResult) {
    let results: Vec<_> = jobs.par_iter().map(TableJob::run).collect();
    let batch = BatchResult::tally(&results);
    info!("Rebuilt tables: {} succeeded, {} failed", batch.succeeded, batch.failed);
    (results, batch)
}
