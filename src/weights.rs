//! Running weight totals keyed by community.
//!
//! Both nodes and communities track how much edge weight connects them to
//! each community. All local-moving decisions and incremental updates go
//! through these maps, so lookups and updates must stay O(1) amortized.

use crate::error::{Error, Result};
use crate::registry::CommunityId;
use crate::EPSILON;
use rustc_hash::FxHashMap;

/// Total edge weight from an owner (a node or a community) toward each
/// community it touches.
///
/// Pure bookkeeping: no modularity logic lives here, and mutating one map
/// never touches another owner's map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightMap {
    weights: FxHashMap<CommunityId, f64>,
}

impl WeightMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map sized for `capacity` communities.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            weights: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Ensure an entry exists for `community`, defaulting to zero.
    /// An existing entry is left untouched.
    pub fn init(&mut self, community: CommunityId) {
        self.weights.entry(community).or_insert(0.0);
    }

    /// Add `delta` to the weight recorded toward `community`, creating the
    /// entry if absent.
    pub fn increase(&mut self, community: CommunityId, delta: f64) {
        *self.weights.entry(community).or_insert(0.0) += delta;
    }

    /// Subtract `delta` from the weight recorded toward `community`.
    ///
    /// A result meaningfully below zero means the incremental update rules
    /// were violated somewhere; that is fatal, not recoverable.
    pub fn decrease(&mut self, community: CommunityId, delta: f64) -> Result<()> {
        let entry = self.weights.entry(community).or_insert(0.0);
        *entry -= delta;
        if *entry < -EPSILON {
            return Err(Error::Consistency {
                context: "weight map underflow",
                value: *entry,
            });
        }
        Ok(())
    }

    /// The recorded weight toward `community`, or `None` if never initialized.
    pub fn get(&self, community: CommunityId) -> Option<f64> {
        self.weights.get(&community).copied()
    }

    /// The recorded weight toward `community`, treating absent as zero.
    pub fn weight(&self, community: CommunityId) -> f64 {
        self.get(community).unwrap_or(0.0)
    }

    /// Sum of all recorded weights.
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Iterate over `(community, weight)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (CommunityId, f64)> + '_ {
        self.weights.iter().map(|(&c, &w)| (c, w))
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increase_creates_and_accumulates() {
        let mut wm = WeightMap::new();
        let c = CommunityId(3);

        assert_eq!(wm.get(c), None);
        wm.increase(c, 1.5);
        wm.increase(c, 0.5);
        assert_eq!(wm.get(c), Some(2.0));
        assert_eq!(wm.weight(c), 2.0);
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let mut wm = WeightMap::new();
        let c = CommunityId(0);

        wm.init(c);
        assert_eq!(wm.get(c), Some(0.0));

        wm.increase(c, 4.0);
        wm.init(c);
        assert_eq!(wm.get(c), Some(4.0));
    }

    #[test]
    fn test_decrease_is_inverse_of_increase() {
        let mut wm = WeightMap::new();
        let c = CommunityId(1);

        wm.increase(c, 3.0);
        wm.decrease(c, 1.0).unwrap();
        assert_eq!(wm.weight(c), 2.0);
        wm.decrease(c, 2.0).unwrap();
        assert!(wm.weight(c).abs() < EPSILON);
    }

    #[test]
    fn test_decrease_below_zero_is_consistency_error() {
        let mut wm = WeightMap::new();
        let c = CommunityId(7);

        wm.increase(c, 1.0);
        let err = wm.decrease(c, 2.0).unwrap_err();
        assert!(matches!(err, Error::Consistency { .. }));
    }

    #[test]
    fn test_total_sums_all_entries() {
        let mut wm = WeightMap::new();
        wm.increase(CommunityId(0), 1.0);
        wm.increase(CommunityId(1), 2.0);
        wm.increase(CommunityId(2), 3.0);
        assert!((wm.total() - 6.0).abs() < EPSILON);
    }
}
