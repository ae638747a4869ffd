//! Region scalars: the weight a variation region contributes at a location.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use font_types::Tag;
use indexmap::IndexMap;

use crate::varstore::{Region, VariationStore};

/// Normalized design-space location keyed by axis tag.
///
/// Values are clamped to `[-1.0, 1.0]`; axes that are not set sit at the
/// default location `0.0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignCoordinates {
    values: IndexMap<Tag, f64>,
}

impl DesignCoordinates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the normalized value of an axis.
    pub fn set(&mut self, tag: Tag, value: f64) -> &mut Self {
        self.values.insert(tag, value.clamp(-1.0, 1.0));
        self
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, tag: Tag, value: f64) -> Self {
        self.set(tag, value);
        self
    }

    pub fn get(&self, tag: Tag) -> f64 {
        self.values.get(&tag).copied().unwrap_or(0.0)
    }

    /// Coordinates as a vector in the given axis order.
    pub fn to_vector(&self, axis_tags: &[Tag]) -> Vec<f64> {
        axis_tags.iter().map(|tag| self.get(*tag)).collect()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for DesignCoordinates {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut coords = Self::new();
        for (tag, value) in iter {
            coords.set(crate::config::tag_from_str(tag.as_ref()), value);
        }
        coords
    }
}

/// Computes the scalar of `region` at `coords` (normalized, in axis order).
///
/// Returns a value in `[0, 1]`. Coordinates missing from `coords` are taken
/// to be `0.0`.
pub fn scalar(region: &Region, coords: &[f64]) -> f64 {
    let mut scalar = 1.0;
    for (i, axis) in region.axes.iter().enumerate() {
        let coord = coords.get(i).copied().unwrap_or(0.0);
        if coord < axis.start || coord > axis.end {
            return 0.0;
        }
        if coord == axis.peak {
            continue;
        }
        let factor = if coord < axis.peak {
            if axis.peak == axis.start {
                1.0
            } else {
                (coord - axis.start) / (axis.peak - axis.start)
            }
        } else if axis.end == axis.peak {
            1.0
        } else {
            (axis.end - coord) / (axis.end - axis.peak)
        };
        scalar *= factor;
    }
    scalar
}

/// Computes the scalar of every region in the store.
pub fn scalars(store: &VariationStore, coords: &[f64]) -> Vec<f64> {
    store.regions().iter().map(|region| scalar(region, coords)).collect()
}

/// Scalars for the regions referenced by one item variation data block, in
/// the block's region order.
///
/// This is the scalar vector that charstring and DICT blend groups using
/// `vsindex == block` are resolved against. Returns an empty vector for an
/// unknown block.
pub fn block_scalars(store: &VariationStore, block: usize, coords: &[f64]) -> Vec<f64> {
    store
        .region_indices(block)
        .unwrap_or_default()
        .iter()
        .map(|&index| store.region(index as usize).map_or(0.0, |region| scalar(region, coords)))
        .collect()
}

type CacheKey = (Option<usize>, Vec<u64>);

/// Region scalars of one Variation Store, memoized per coordinate vector.
///
/// The cache owns its store, so scalars computed for one font are never
/// handed out for another. Safe to share across worker threads.
#[derive(Debug, Default)]
pub struct ScalarCache {
    store: VariationStore,
    entries: RwLock<HashMap<CacheKey, Arc<Vec<f64>>>>,
}

impl ScalarCache {
    pub fn new(store: VariationStore) -> Self {
        Self { store, entries: RwLock::default() }
    }

    pub fn store(&self) -> &VariationStore {
        &self.store
    }

    /// All region scalars at `coords`, see [`scalars`].
    pub fn scalars(&self, coords: &[f64]) -> Arc<Vec<f64>> {
        self.get_or_compute((None, key(coords)), || scalars(&self.store, coords))
    }

    /// Scalars of one data block at `coords`, see [`block_scalars`].
    pub fn block_scalars(&self, block: usize, coords: &[f64]) -> Arc<Vec<f64>> {
        self.get_or_compute((Some(block), key(coords)), || block_scalars(&self.store, block, coords))
    }

    fn get_or_compute(&self, key: CacheKey, compute: impl FnOnce() -> Vec<f64>) -> Arc<Vec<f64>> {
        if let Ok(entries) = self.entries.read()
            && let Some(cached) = entries.get(&key)
        {
            return cached.clone();
        }
        let computed = Arc::new(compute());
        match self.entries.write() {
            Ok(mut entries) => entries.entry(key).or_insert(computed).clone(),
            Err(_) => computed,
        }
    }

    /// Number of cached scalar vectors.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(coords: &[f64]) -> Vec<u64> {
    coords.iter().map(|c| c.to_bits()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varstore::{RegionAxis, tests::store_bytes};

    fn region(axes: &[(f64, f64, f64)]) -> Region {
        Region::new(axes.iter().map(|&(s, p, e)| RegionAxis::new(s, p, e)).collect())
    }

    #[test]
    fn single_axis_ramp() {
        let r = region(&[(0.0, 1.0, 1.0)]);
        assert_eq!(scalar(&r, &[0.5]), 0.5);
        assert_eq!(scalar(&r, &[1.0]), 1.0);
        assert_eq!(scalar(&r, &[-0.5]), 0.0);
        assert_eq!(scalar(&r, &[0.0]), 0.0);
    }

    #[test]
    fn tent_descends_after_peak() {
        let r = region(&[(0.0, 0.5, 1.0)]);
        assert_eq!(scalar(&r, &[0.75]), 0.5);
        assert_eq!(scalar(&r, &[0.25]), 0.5);
    }

    #[test]
    fn degenerate_sides_are_full_strength() {
        let r = region(&[(0.5, 0.5, 1.0)]);
        assert_eq!(scalar(&r, &[0.5]), 1.0);
        let r = region(&[(-1.0, 0.0, 0.0)]);
        assert_eq!(scalar(&r, &[-0.5]), 0.5);
        assert_eq!(scalar(&r, &[0.0]), 1.0);
    }

    #[test]
    fn product_over_axes() {
        let r = region(&[(0.0, 1.0, 1.0), (0.0, 1.0, 1.0)]);
        assert_eq!(scalar(&r, &[0.5, 0.5]), 0.25);
    }

    #[test]
    fn out_of_support_short_circuits() {
        let r = region(&[(0.0, 1.0, 1.0), (0.0, 1.0, 1.0)]);
        assert_eq!(scalar(&r, &[-0.1, 1.0]), 0.0);
        assert_eq!(scalar(&r, &[1.0, -0.1]), 0.0);
    }

    #[test]
    fn missing_axes_default_to_zero() {
        let r = region(&[(0.0, 1.0, 1.0), (-1.0, 0.0, 1.0)]);
        assert_eq!(scalar(&r, &[0.5]), 0.5);
        let r = region(&[(0.0, 1.0, 1.0), (0.5, 1.0, 1.0)]);
        assert_eq!(scalar(&r, &[0.5]), 0.0);
    }

    #[test]
    fn peak_property_and_bounds() {
        let regions = [
            region(&[(-1.0, -0.5, 0.0), (0.0, 0.25, 1.0)]),
            region(&[(0.0, 1.0, 1.0), (-1.0, -1.0, -0.5)]),
            region(&[(-0.75, 0.0, 0.75), (0.0, 0.0, 0.0)]),
        ];
        for r in &regions {
            assert_eq!(scalar(r, &r.peak()), 1.0);
            for i in -8..=8 {
                for j in -8..=8 {
                    let s = scalar(r, &[i as f64 / 8.0, j as f64 / 8.0]);
                    assert!((0.0..=1.0).contains(&s), "{s} out of bounds");
                }
            }
        }
    }

    #[test]
    fn store_scalars_and_block_scalars() {
        let bytes = store_bytes(
            &[vec![(0.0, 1.0, 1.0)], vec![(-1.0, -1.0, 0.0)]],
            &[1, 0],
            0,
            &[],
        );
        let store = VariationStore::decode(&bytes).unwrap();
        assert_eq!(scalars(&store, &[-0.5]), vec![0.0, 0.5]);
        assert_eq!(block_scalars(&store, 0, &[-0.5]), vec![0.5, 0.0]);
        assert!(block_scalars(&store, 7, &[-0.5]).is_empty());
    }

    #[test]
    fn empty_store_has_no_scalars() {
        let store = VariationStore::default();
        assert!(scalars(&store, &[0.3]).is_empty());
    }

    #[test]
    fn cache_reuses_vectors() {
        let bytes = store_bytes(&[vec![(0.0, 1.0, 1.0)]], &[0], 0, &[]);
        let cache = ScalarCache::new(VariationStore::decode(&bytes).unwrap());
        let a = cache.scalars(&[0.25]);
        let b = cache.scalars(&[0.25]);
        assert!(Arc::ptr_eq(&a, &b));
        cache.scalars(&[0.5]);
        // block vectors are cached apart from whole-store vectors
        assert_eq!(*cache.block_scalars(0, &[0.5]), vec![0.5]);
        assert!(Arc::ptr_eq(&cache.block_scalars(0, &[0.5]), &cache.block_scalars(0, &[0.5])));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn caches_do_not_share_results_across_stores() {
        let one = store_bytes(&[vec![(0.0, 1.0, 1.0)]], &[0], 0, &[]);
        let two = store_bytes(&[vec![(-1.0, -1.0, 0.0)], vec![(0.0, 0.5, 1.0)]], &[0, 1], 0, &[]);
        let first = ScalarCache::new(VariationStore::decode(&one).unwrap());
        let second = ScalarCache::new(VariationStore::decode(&two).unwrap());
        assert_eq!(*first.scalars(&[0.5]), vec![0.5]);
        assert_eq!(*second.scalars(&[0.5]), vec![0.0, 1.0]);
        assert_eq!(*second.block_scalars(0, &[0.5]), vec![0.0, 1.0]);
    }

    #[test]
    fn design_coordinates_vector() {
        let coords: DesignCoordinates = [("wdth", 2.0), ("wght", 0.5)].into_iter().collect();
        let tags = [Tag::new(b"wght"), Tag::new(b"wdth"), Tag::new(b"opsz")];
        assert_eq!(coords.to_vector(&tags), vec![0.5, 1.0, 0.0]);
    }
}
