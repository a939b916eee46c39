//! Per-level community registry and node aggregates.
//!
//! One `OptimizerState` holds everything the local-moving phase mutates: the
//! level graph, one `NodeState` per level node, and an arena of `Community`
//! entries indexed by `CommunityId`. There is no global state; the
//! orchestrator owns the value and lends it out.
//!
//! ## Weight conventions
//!
//! Held invariant across every level:
//!
//! - `Sin` (a community's entry for its own id) counts each intra-community
//!   edge once; a node self-loop contributes its weight once.
//! - `Stot = 2·Sin + boundary`, which equals the summed degree of members.
//! - A node's `ki` is its weighted degree, self-loops counted twice.
//! - `m` is the level's total edge weight, each edge counted once.

use crate::error::{Error, Result};
use crate::graph::LevelGraph;
use crate::weights::WeightMap;
use crate::EPSILON;
use core::fmt;
use std::collections::BTreeSet;

/// Index of a community in the per-level arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommunityId(pub usize);

impl CommunityId {
    /// The arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Aggregate state of one community.
#[derive(Debug, Clone)]
pub struct Community {
    id: CommunityId,
    /// Edge weight toward every community, keyed by id. The entry for this
    /// community's own id is the internal weight `Sin`.
    pub(crate) weights: WeightMap,
    /// Original node ids the community ultimately contains. Used for label
    /// propagation and validation, never for move decisions.
    pub(crate) members: BTreeSet<usize>,
}

impl Community {
    fn new(id: CommunityId) -> Self {
        let mut weights = WeightMap::new();
        weights.init(id);
        Self {
            id,
            weights,
            members: BTreeSet::new(),
        }
    }

    pub(crate) fn from_parts(
        id: CommunityId,
        weights: WeightMap,
        members: BTreeSet<usize>,
    ) -> Self {
        Self {
            id,
            weights,
            members,
        }
    }

    /// This community's arena id.
    pub fn id(&self) -> CommunityId {
        self.id
    }

    /// Internal weight `Sin`: intra-community edges, each counted once.
    pub fn internal_weight(&self) -> f64 {
        self.weights.weight(self.id)
    }

    /// Total incident weight `Stot = 2·Sin + boundary`.
    pub fn incident_weight(&self) -> f64 {
        self.weights.total() + self.internal_weight()
    }

    /// Boundary weight toward `other`.
    pub fn weight_to(&self, other: CommunityId) -> f64 {
        self.weights.weight(other)
    }

    /// Original node ids contained in this community.
    pub fn members(&self) -> &BTreeSet<usize> {
        &self.members
    }

    /// Whether the community has been emptied by moves.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Per-node aggregate state at the current level.
#[derive(Debug, Clone)]
pub struct NodeState {
    /// Community the node currently belongs to.
    pub(crate) community: CommunityId,
    /// Weighted degree `ki`.
    pub(crate) ki: f64,
    /// Edge weight from this node into each community it touches,
    /// including its own.
    pub(crate) weight_to: WeightMap,
    /// Original node ids folded into this level node.
    pub(crate) originals: Vec<usize>,
}

impl NodeState {
    /// The node's current community.
    pub fn community(&self) -> CommunityId {
        self.community
    }

    /// The node's weighted degree `ki`.
    pub fn degree_weight(&self) -> f64 {
        self.ki
    }

    /// Weight from this node into `community`, zero if it touches none.
    pub fn weight_to(&self, community: CommunityId) -> f64 {
        self.weight_to.weight(community)
    }
}

/// The mutable registry pair for one level: node aggregates plus the
/// community arena, alongside the immutable level graph.
#[derive(Debug, Clone)]
pub struct OptimizerState {
    pub(crate) graph: LevelGraph,
    pub(crate) nodes: Vec<NodeState>,
    pub(crate) communities: Vec<Community>,
    pub(crate) total_weight: f64,
}

impl OptimizerState {
    /// Initialize a level with every node in its own singleton community,
    /// each node carrying itself as its only original id.
    pub fn build(graph: LevelGraph) -> Result<Self> {
        let n = graph.node_count();
        let originals = (0..n).map(|i| vec![i]).collect();
        let assignment: Vec<usize> = (0..n).collect();
        Self::from_assignment(graph, originals, &assignment)
    }

    /// Build the registry from scratch with every node pre-assigned to a
    /// community. The identity assignment is level initialization; an
    /// arbitrary assignment must reproduce exactly what the incremental
    /// updates maintain.
    pub fn from_assignment(
        graph: LevelGraph,
        originals: Vec<Vec<usize>>,
        assignment: &[usize],
    ) -> Result<Self> {
        let n = graph.node_count();
        debug_assert_eq!(originals.len(), n);
        if assignment.len() != n {
            return Err(Error::LabelProjection {
                label: assignment.len(),
                node_count: n,
            });
        }

        let arena_size = assignment.iter().max().map_or(0, |&c| c + 1);
        let mut communities: Vec<Community> = (0..arena_size)
            .map(|c| Community::new(CommunityId(c)))
            .collect();

        let mut nodes = Vec::with_capacity(n);
        for (i, owned) in originals.into_iter().enumerate() {
            let ci = CommunityId(assignment[i]);
            let mut weight_to = WeightMap::with_capacity(graph.neighbors(i).len() + 1);
            weight_to.init(ci);

            let sl = graph.self_loop(i);
            if sl > 0.0 {
                weight_to.increase(ci, sl);
                communities[ci.0].weights.increase(ci, sl);
            }

            communities[ci.0].members.extend(owned.iter().copied());
            nodes.push(NodeState {
                community: ci,
                ki: graph.degree_weight(i),
                weight_to,
                originals: owned,
            });
        }

        for i in 0..n {
            let ci = CommunityId(assignment[i]);
            for &(j, w) in graph.neighbors(i) {
                let cj = CommunityId(assignment[j]);
                nodes[i].weight_to.increase(cj, w);

                // Community aggregates see each undirected edge once.
                if i < j {
                    if ci == cj {
                        communities[ci.0].weights.increase(ci, w);
                    } else {
                        communities[ci.0].weights.increase(cj, w);
                        communities[cj.0].weights.increase(ci, w);
                    }
                }
            }
        }

        let total_weight = graph.total_weight();
        Ok(Self {
            graph,
            nodes,
            communities,
            total_weight,
        })
    }

    /// Number of nodes at this level.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total edge weight `m` of the level.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// The level graph this registry was built over.
    pub fn graph(&self) -> &LevelGraph {
        &self.graph
    }

    /// Node aggregates for `node`.
    pub fn node(&self, node: usize) -> &NodeState {
        &self.nodes[node]
    }

    /// Community aggregates for `id`. Pruned communities remain in the
    /// arena but report themselves empty.
    pub fn community(&self, id: CommunityId) -> &Community {
        &self.communities[id.0]
    }

    /// Communities that still have members, in ascending id order.
    pub fn alive_communities(&self) -> impl Iterator<Item = &Community> {
        self.communities.iter().filter(|c| !c.is_empty())
    }

    /// Number of communities that still have members.
    pub fn community_count(&self) -> usize {
        self.alive_communities().count()
    }

    /// Global modularity of the current partition, computed from the
    /// registry aggregates in O(#communities):
    ///
    /// ```text
    /// Q = Σ_c [ Sin_c / m  −  (Stot_c / 2m)² ]
    /// ```
    pub fn modularity(&self) -> f64 {
        let m = self.total_weight;
        if m == 0.0 {
            return 0.0;
        }
        self.alive_communities()
            .map(|c| {
                let sin = c.internal_weight();
                let stot = c.incident_weight();
                sin / m - (stot / (2.0 * m)).powi(2)
            })
            .sum()
    }

    /// Check that the registry still accounts for every edge exactly once:
    /// `Σ_c Sin_c + ½·Σ_c boundary_c` must equal `m`.
    pub(crate) fn check_conservation(&self) -> Result<()> {
        let mut accounted = 0.0;
        for c in self.alive_communities() {
            let sin = c.internal_weight();
            accounted += sin + (c.weights.total() - sin) / 2.0;
        }
        let drift = accounted - self.total_weight;
        if drift.abs() > EPSILON {
            return Err(Error::Consistency {
                context: "edge weight accounting",
                value: drift,
            });
        }
        Ok(())
    }

    /// Check that members sets partition the original node set of size
    /// `original_count`.
    pub(crate) fn check_partition(&self, original_count: usize) -> Result<()> {
        let mut seen = vec![false; original_count];
        for c in self.alive_communities() {
            for &o in c.members() {
                if o >= original_count || seen[o] {
                    return Err(Error::Consistency {
                        context: "community membership partition",
                        value: o as f64,
                    });
                }
                seen[o] = true;
            }
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(Error::Consistency {
                context: "community membership partition",
                value: missing as f64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_plus_tail() -> LevelGraph {
        // 0-1-2 triangle with a tail 2-3.
        LevelGraph::from_edges(
            4,
            &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0), (2, 3, 2.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_build_creates_singletons() {
        let state = OptimizerState::build(triangle_plus_tail()).unwrap();

        assert_eq!(state.node_count(), 4);
        assert_eq!(state.community_count(), 4);
        for i in 0..4 {
            assert_eq!(state.node(i).community(), CommunityId(i));
            let c = state.community(CommunityId(i));
            assert_eq!(c.members().len(), 1);
            assert!(c.members().contains(&i));
            assert!(c.internal_weight().abs() < EPSILON);
        }

        // Stot of a singleton equals the node's degree.
        for i in 0..4 {
            let c = state.community(CommunityId(i));
            assert!((c.incident_weight() - state.node(i).degree_weight()).abs() < EPSILON);
        }

        state.check_conservation().unwrap();
        state.check_partition(4).unwrap();
    }

    #[test]
    fn test_node_weight_maps_record_neighbor_communities() {
        let state = OptimizerState::build(triangle_plus_tail()).unwrap();

        let n2 = state.node(2);
        assert!((n2.weight_to(CommunityId(0)) - 1.0).abs() < EPSILON);
        assert!((n2.weight_to(CommunityId(1)) - 1.0).abs() < EPSILON);
        assert!((n2.weight_to(CommunityId(3)) - 2.0).abs() < EPSILON);
        // Own community entry exists and is zero (no self-loop).
        assert_eq!(n2.weight_to.get(CommunityId(2)), Some(0.0));
    }

    #[test]
    fn test_from_assignment_grouped() {
        let state = OptimizerState::from_assignment(
            triangle_plus_tail(),
            (0..4).map(|i| vec![i]).collect(),
            &[0, 0, 0, 3],
        )
        .unwrap();

        assert_eq!(state.community_count(), 2);
        let c0 = state.community(CommunityId(0));
        assert!((c0.internal_weight() - 3.0).abs() < EPSILON);
        assert!((c0.weight_to(CommunityId(3)) - 2.0).abs() < EPSILON);
        // Stot: 2·3 intra + 2 boundary = 8.
        assert!((c0.incident_weight() - 8.0).abs() < EPSILON);

        state.check_conservation().unwrap();
        state.check_partition(4).unwrap();
    }

    #[test]
    fn test_self_loop_lands_in_internal_weight() {
        let g = LevelGraph::from_edges(2, &[(0, 1, 1.0), (0, 0, 2.5)]).unwrap();
        let state = OptimizerState::build(g).unwrap();

        let c0 = state.community(CommunityId(0));
        assert!((c0.internal_weight() - 2.5).abs() < EPSILON);
        assert!((state.node(0).weight_to(CommunityId(0)) - 2.5).abs() < EPSILON);
        // ki counts the self-loop twice, Stot agrees.
        assert!((state.node(0).degree_weight() - 6.0).abs() < EPSILON);
        assert!((c0.incident_weight() - 6.0).abs() < EPSILON);

        state.check_conservation().unwrap();
    }

    #[test]
    fn test_modularity_of_known_partition() {
        // Two triangles joined by one edge, grouped into the two triangles:
        // Q = 2 · (3/7 − (7/14)²) = 25/70.
        let g = LevelGraph::from_edges(
            6,
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (3, 5, 1.0),
                (2, 3, 1.0),
            ],
        )
        .unwrap();
        let state = OptimizerState::from_assignment(
            g,
            (0..6).map(|i| vec![i]).collect(),
            &[0, 0, 0, 3, 3, 3],
        )
        .unwrap();

        assert!((state.modularity() - 25.0 / 70.0).abs() < 1e-12);
    }

    #[test]
    fn test_assignment_length_mismatch_fails() {
        let err = OptimizerState::from_assignment(
            triangle_plus_tail(),
            (0..4).map(|i| vec![i]).collect(),
            &[0, 0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::LabelProjection { .. }));
    }
}
