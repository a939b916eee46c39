//! Multilevel Louvain community detection with incremental bookkeeping.
//!
//! The optimizer maintains per-node and per-community weight aggregates and
//! updates them in O(degree) per move, so a local-moving sweep never rebuilds
//! community state from the graph. Levels are folded into coarser graphs
//! until modularity stops improving.
//!
//! # Example
//!
//! ```
//! use petgraph::graph::UnGraph;
//! use unfold::{CommunityDetection, Louvain};
//!
//! // Two triangles joined by a single bridge edge.
//! let mut graph: UnGraph<(), ()> = UnGraph::new_undirected();
//! let nodes: Vec<_> = (0..6).map(|_| graph.add_node(())).collect();
//! for &(a, b) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
//!     graph.add_edge(nodes[a], nodes[b], ());
//! }
//!
//! let partition = Louvain::new().detect(&graph).unwrap();
//! assert_eq!(partition.num_communities(), 2);
//! assert_eq!(partition.community_of(0), partition.community_of(2));
//! assert_ne!(partition.community_of(0), partition.community_of(3));
//! ```

mod coarsen;
mod error;
mod graph;
mod local_move;
mod louvain;
mod registry;
mod traits;
mod weights;

pub use coarsen::{fold, FoldOutcome};
pub use error::{Error, Result};
pub use graph::LevelGraph;
pub use local_move::{ChangeMap, LocalMover, MoveOutcome};
pub use louvain::{FoldedLevel, Louvain, Partition};
pub use registry::{Community, CommunityId, NodeState, OptimizerState};
pub use traits::{CommunityDetection, EdgeWeight};
pub use weights::WeightMap;

/// Tolerance for floating point comparisons on weight aggregates.
pub(crate) const EPSILON: f64 = 1e-9;
