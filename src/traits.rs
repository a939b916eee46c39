//! Community detection traits.

use crate::error::Result;
use crate::louvain::Partition;
use petgraph::graph::UnGraph;

/// Edge payloads that can act as a weight.
///
/// Unweighted graphs (`()` edges) get unit weights, matching how numeric
/// payloads are read directly.
pub trait EdgeWeight {
    /// The weight this payload contributes.
    fn weight(&self) -> f64;
}

impl EdgeWeight for () {
    fn weight(&self) -> f64 {
        1.0
    }
}

impl EdgeWeight for f64 {
    fn weight(&self) -> f64 {
        *self
    }
}

impl EdgeWeight for f32 {
    fn weight(&self) -> f64 {
        f64::from(*self)
    }
}

macro_rules! impl_edge_weight_for_int {
    ($($ty:ty),*) => {
        $(impl EdgeWeight for $ty {
            fn weight(&self) -> f64 {
                *self as f64
            }
        })*
    };
}

impl_edge_weight_for_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64);

/// Trait for community detection algorithms.
pub trait CommunityDetection {
    /// Detect communities in a graph.
    ///
    /// Returns the partition of node indices into communities.
    fn detect<N, E: EdgeWeight>(&self, graph: &UnGraph<N, E>) -> Result<Partition>;
}
