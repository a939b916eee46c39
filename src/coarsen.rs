//! Phase 2: graph folding.
//!
//! Builds the next level: one node per surviving community, one edge per
//! pair of communities with boundary weight between them, and the internal
//! weight of each community materialized as an explicit self-loop on its
//! node. The community weight maps are relabeled and carried forward as the
//! new nodes' maps, so local moving can start on the folded level without
//! re-initialization.
//!
//! Total edge weight is conserved: the folded `m` equals the `m` of the
//! level that produced it.

use crate::error::{Error, Result};
use crate::graph::LevelGraph;
use crate::registry::{Community, CommunityId, NodeState, OptimizerState};
use crate::weights::WeightMap;
use crate::EPSILON;
use log::debug;

/// A folded level, ready for the next local-moving run.
#[derive(Debug, Clone)]
pub struct FoldOutcome {
    /// Registry over the folded graph, one singleton community per node.
    pub state: OptimizerState,
    /// Old community arena id to folded node id; `None` for pruned entries.
    pub relabel: Vec<Option<usize>>,
}

/// Fold the current level's communities into the next level's nodes.
pub fn fold(state: &OptimizerState) -> Result<FoldOutcome> {
    // Surviving communities become nodes, in ascending id order.
    let mut relabel: Vec<Option<usize>> = vec![None; state.communities.len()];
    let mut next = 0;
    for (index, community) in state.communities.iter().enumerate() {
        if !community.is_empty() {
            relabel[index] = Some(next);
            next += 1;
        }
    }
    let folded_count = next;

    let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); folded_count];
    let mut self_loop = vec![0.0; folded_count];
    let mut carried: Vec<WeightMap> = Vec::with_capacity(folded_count);

    for community in state.alive_communities() {
        let id = community.id();
        let node = relabel[id.index()].ok_or(Error::Consistency {
            context: "alive community missing from relabel table",
            value: id.index() as f64,
        })?;
        self_loop[node] = community.internal_weight();

        // Relabel the community's weight map into folded node ids. Residue
        // entries left behind by move transfers are dropped.
        let mut weights = WeightMap::with_capacity(community.weights.len());
        weights.init(CommunityId(node));
        weights.increase(CommunityId(node), community.internal_weight());
        for (other, w) in community.weights.iter() {
            if other == id || w.abs() <= EPSILON {
                continue;
            }
            match relabel[other.index()] {
                Some(other_node) => {
                    weights.increase(CommunityId(other_node), w);
                    // Materialize each boundary pair as one undirected edge,
                    // taking the weight from the lower-id side.
                    if node < other_node {
                        adj[node].push((other_node, w));
                        adj[other_node].push((node, w));
                    }
                }
                None => {
                    return Err(Error::Consistency {
                        context: "boundary weight toward pruned community",
                        value: w,
                    });
                }
            }
        }
        carried.push(weights);
    }

    let graph = LevelGraph::from_parts(adj, self_loop);
    let total_weight = graph.total_weight();

    // Carry the relabeled maps forward: each folded node starts as a
    // singleton community sharing its community's aggregates.
    let mut nodes = Vec::with_capacity(folded_count);
    let mut communities = Vec::with_capacity(folded_count);
    for (community, weights) in state.alive_communities().zip(carried) {
        let node = relabel[community.id().index()].ok_or(Error::Consistency {
            context: "alive community missing from relabel table",
            value: community.id().index() as f64,
        })?;
        nodes.push(NodeState {
            community: CommunityId(node),
            ki: graph.degree_weight(node),
            weight_to: weights.clone(),
            originals: community.members().iter().copied().collect(),
        });
        communities.push(Community::from_parts(
            CommunityId(node),
            weights,
            community.members().clone(),
        ));
    }

    debug!(
        "folded {} nodes into {} (m = {:.6})",
        state.node_count(),
        folded_count,
        total_weight
    );

    Ok(FoldOutcome {
        state: OptimizerState {
            graph,
            nodes,
            communities,
            total_weight,
        },
        relabel,
    })
}
