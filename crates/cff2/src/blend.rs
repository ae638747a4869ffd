//! Blend evaluation: interpolating a base value with weighted deltas.
//!
//! Two addressing modes exist and are kept apart:
//!
//! - blend groups captured from charstrings or DICTs pair `deltas[i]` with
//!   `scalars[i]` (the scalar vector of the active data block, see
//!   [`block_scalars`](crate::scalar::block_scalars));
//! - store-backed item deltas pair `deltas[i]` with the scalar of region
//!   `region_indices[i]`.
//!
//! Missing scalars contribute nothing. Results are never rounded.

use crate::varstore::VariationStore;

/// A base value and its per-axis deltas captured by a blend operator.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendGroup {
    pub base: f64,
    pub deltas: Vec<f64>,
    pub axis_count: usize,
}

impl BlendGroup {
    pub fn new(base: f64, deltas: Vec<f64>) -> Self {
        let axis_count = deltas.len();
        Self { base, deltas, axis_count }
    }

    /// See [`resolve`].
    pub fn resolve(&self, scalars: &[f64]) -> f64 {
        resolve(self, scalars)
    }
}

/// A blend group together with where its base landed on the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedBlend {
    pub group: BlendGroup,
    /// Stack slot the base was pushed to.
    pub stack_index: usize,
    /// Position of the base in the flattened operand stream: the operands
    /// consumed by all earlier operators plus `stack_index`.
    pub operand_index: usize,
}

/// Resolves a blend group against a positional scalar vector.
///
/// A group carries one delta per font axis, so only the first
/// `deltas.len()` scalars are used. Regions of a data block beyond the
/// axis count (a single axis with separate min and max regions, say) never
/// contribute.
pub fn resolve(group: &BlendGroup, scalars: &[f64]) -> f64 {
    group.base
        + group
            .deltas
            .iter()
            .enumerate()
            .map(|(i, delta)| delta * scalars.get(i).copied().unwrap_or(0.0))
            .sum::<f64>()
}

/// Resolves store-backed deltas, pairing each delta with the scalar of the
/// region it is keyed by.
pub fn resolve_item(base: f64, deltas: &[i32], region_indices: &[u16], region_scalars: &[f64]) -> f64 {
    base + deltas
        .iter()
        .zip(region_indices)
        .map(|(&delta, &region)| {
            delta as f64 * region_scalars.get(region as usize).copied().unwrap_or(0.0)
        })
        .sum::<f64>()
}

impl VariationStore {
    /// Resolves the row `item` of data block `block` on top of `base`.
    ///
    /// `region_scalars` holds one scalar per region of the store (see
    /// [`scalars`](crate::scalar::scalars)). Returns `None` when the block or
    /// item does not exist.
    pub fn item_value(
        &self,
        block: usize,
        item: usize,
        base: f64,
        region_scalars: &[f64],
    ) -> Option<f64> {
        let data = self.item_data(block)?;
        let deltas = data.deltas(item)?;
        Some(resolve_item(base, deltas, data.region_indices(), region_scalars))
    }

    /// The summed delta of an item; `item_value` with a zero base.
    pub fn item_delta(&self, block: usize, item: usize, region_scalars: &[f64]) -> Option<f64> {
        self.item_value(block, item, 0.0, region_scalars)
    }
}
