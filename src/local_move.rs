//! Phase 1: greedy local moving.
//!
//! Repeatedly sweeps every node in ascending id order and relocates it to
//! the neighboring community with the highest modularity gain. Each applied
//! move updates the registry incrementally in O(degree) — the registry is
//! left exactly as if it had been rebuilt from scratch with the node
//! pre-assigned to its new community.
//!
//! ## Gain evaluation
//!
//! For a node with weighted degree `ki` and a candidate community `C` with
//! internal weight `Sin` and incident weight `Stot` (both taken with the
//! node outside `C`), where `kiin` is the weight of the node's edges into
//! `C`'s members, the gain of inserting the node is
//!
//! ```text
//! ΔQ(C) = [(Sin + 2·kiin)/2m − ((Stot + ki)/2m)²]
//!       − [Sin/2m − (Stot/2m)² − (ki/2m)²]
//! ```
//!
//! relative to the node sitting in a community of its own. The node's
//! current community is evaluated the same way after backing the node's
//! contribution out of its aggregates, so every candidate is measured from
//! the same baseline and the difference between the winning candidate and
//! staying put is the exact change in global modularity.
//!
//! ## Determinism
//!
//! Node order within a pass is ascending id. Candidate communities are
//! visited in adjacency order, deduplicated on first encounter, and only a
//! strictly larger gain replaces the current best — the first community
//! reaching the maximum wins, and a tie with staying put keeps the node
//! where it is. The final partition depends on these rules, so they are
//! fixed, not incidental.

use crate::error::{Error, Result};
use crate::registry::{CommunityId, OptimizerState};
use log::{debug, trace};

/// Node-to-community reassignments produced by one local-moving run.
///
/// Entry `i` is the community the level's node `i` ended in. Projecting the
/// map through a label vector rewrites each label (a level node id) to that
/// node's final community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMap {
    assignments: Vec<usize>,
}

impl ChangeMap {
    pub(crate) fn from_state(state: &OptimizerState) -> Self {
        Self {
            assignments: state.nodes.iter().map(|n| n.community.index()).collect(),
        }
    }

    /// Number of level nodes covered.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the map covers no nodes.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Final community of level node `node`.
    pub fn get(&self, node: usize) -> Option<usize> {
        self.assignments.get(node).copied()
    }

    /// Rewrite every label through this map. Labels must be level node ids;
    /// anything out of range means the map is being composed onto the wrong
    /// label set.
    pub fn project(&self, labels: &mut [usize]) -> Result<()> {
        for label in labels.iter_mut() {
            match self.assignments.get(*label) {
                Some(&community) => *label = community,
                None => {
                    return Err(Error::LabelProjection {
                        label: *label,
                        node_count: self.assignments.len(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Result of one local-moving run over a level.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    /// Where every level node ended up.
    pub changes: ChangeMap,
    /// Number of applied moves across all passes.
    pub moves: usize,
    /// Summed modularity gain of the applied moves. Each move's gain is the
    /// exact change in global modularity it caused.
    pub gain: f64,
}

/// The Phase-1 greedy optimizer.
#[derive(Debug, Clone)]
pub struct LocalMover {
    /// Cap on full sweeps per level.
    max_passes: usize,
}

impl LocalMover {
    /// Create a mover with the default pass cap.
    pub fn new() -> Self {
        Self { max_passes: 100 }
    }

    /// Set the maximum number of sweeps per level.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Sweep the level until a full pass yields no positive gain.
    pub fn run(&self, state: &mut OptimizerState) -> Result<MoveOutcome> {
        let n = state.node_count();
        let mut total_moves = 0;
        let mut total_gain = 0.0;

        for pass in 0..self.max_passes {
            let mut pass_moves = 0;
            let mut pass_gain = 0.0;

            for node in 0..n {
                if let Some((target, gain)) = self.best_move(state, node) {
                    let from = state.nodes[node].community;
                    apply_move(state, node, target)?;
                    trace!("node {node}: {from} -> {target} (gain {gain:.6})");
                    pass_moves += 1;
                    pass_gain += gain;
                }
            }

            debug!("pass {pass}: {pass_moves} moves, gain {pass_gain:.6}");
            total_moves += pass_moves;
            total_gain += pass_gain;

            if pass_gain <= 0.0 {
                break;
            }
        }

        Ok(MoveOutcome {
            changes: ChangeMap::from_state(state),
            moves: total_moves,
            gain: total_gain,
        })
    }

    /// Evaluate every community reachable over `node`'s incident edges and
    /// return the best strictly-improving relocation, if any. The returned
    /// gain is the exact change in global modularity the move will cause.
    pub(crate) fn best_move(
        &self,
        state: &OptimizerState,
        node: usize,
    ) -> Option<(CommunityId, f64)> {
        let node_state = &state.nodes[node];
        let ki = node_state.ki;
        if ki == 0.0 {
            // Isolated node: every gain is zero.
            return None;
        }

        let current = node_state.community;
        let m = state.total_weight;
        let self_loop = state.graph.self_loop(node);

        // Baseline: re-inserting the node into its own community after
        // backing its contribution out. The node's map entry for its home
        // community includes the self-loop, which is not an edge to other
        // members and must not count as insertion weight.
        let home = &state.communities[current.index()];
        let kiin_home = node_state.weight_to.weight(current);
        let stay_gain = delta_q(
            home.internal_weight() - kiin_home,
            home.incident_weight() - ki,
            ki,
            kiin_home - self_loop,
            m,
        );

        let mut best = current;
        let mut max_gain = stay_gain;
        let mut seen = vec![current];

        for &(neighbor, _) in state.graph.neighbors(node) {
            let candidate = state.nodes[neighbor].community;
            if seen.contains(&candidate) {
                continue;
            }
            seen.push(candidate);

            let community = &state.communities[candidate.index()];
            let sin = community.internal_weight();
            let stot = community.incident_weight();
            let kiin = node_state.weight_to.weight(candidate);

            let gain = delta_q(sin, stot, ki, kiin, m);
            if gain > max_gain {
                max_gain = gain;
                best = candidate;
            }
        }

        if best != current {
            Some((best, max_gain - stay_gain))
        } else {
            None
        }
    }
}

impl Default for LocalMover {
    fn default() -> Self {
        Self::new()
    }
}

/// Modularity gain from inserting a node of degree `ki` into a community
/// with aggregates `(sin, stot)` that do not include the node, where `kiin`
/// is the node's edge weight to its members. Measured against the node
/// sitting in a community of its own.
fn delta_q(sin: f64, stot: f64, ki: f64, kiin: f64, m: f64) -> f64 {
    let two_m = 2.0 * m;
    let joined = (sin + 2.0 * kiin) / two_m - ((stot + ki) / two_m).powi(2);
    let apart = sin / two_m - (stot / two_m).powi(2) - (ki / two_m).powi(2);
    joined - apart
}

/// Relocate `node` into `target`, updating every affected aggregate in
/// O(degree): both communities' weight maps, the maps of every third
/// community the node touches, and every neighbor's node map.
pub(crate) fn apply_move(
    state: &mut OptimizerState,
    node: usize,
    target: CommunityId,
) -> Result<()> {
    let current = state.nodes[node].community;
    debug_assert_ne!(current, target);

    let self_loop = state.graph.self_loop(node);
    let weight_to_current = state.nodes[node].weight_to.weight(current);
    let weight_to_target = state.nodes[node].weight_to.weight(target);
    let originals = state.nodes[node].originals.clone();

    // Old community: the node's intra edges leave the internal weight; its
    // edges to the members staying behind become boundary toward the target.
    // A self-loop moves with the node and never becomes boundary weight.
    {
        let old = &mut state.communities[current.index()];
        old.weights.decrease(current, weight_to_current)?;
        old.weights.increase(target, weight_to_current - self_loop);
        old.weights.decrease(target, weight_to_target)?;
        for o in &originals {
            old.members.remove(o);
        }
    }

    // New community: the node's edges into it become internal, and its edges
    // back to the old community become boundary.
    {
        let new = &mut state.communities[target.index()];
        new.weights.increase(target, weight_to_target + self_loop);
        new.weights.increase(current, weight_to_current - self_loop);
        new.weights.decrease(current, weight_to_target)?;
        new.members.extend(originals.iter().copied());
    }

    // Every other community the node has edges into: transfer the boundary
    // weight from the old community to the new one, on both sides.
    let transfers: Vec<(CommunityId, f64)> = state.nodes[node]
        .weight_to
        .iter()
        .filter(|&(c, w)| c != current && c != target && w.abs() > crate::EPSILON)
        .collect();
    for (other, w) in transfers {
        state.communities[current.index()].weights.decrease(other, w)?;
        state.communities[target.index()].weights.increase(other, w);

        let third = &mut state.communities[other.index()];
        third.weights.decrease(current, w)?;
        third.weights.increase(target, w);
    }

    // Every neighbor now sees the node's edge weight under the new community.
    for &(neighbor, w) in state.graph.neighbors(node) {
        let map = &mut state.nodes[neighbor].weight_to;
        map.increase(target, w);
        map.decrease(current, w)?;
    }

    // The node's own self-loop weight re-keys to the new community.
    if self_loop > 0.0 {
        let map = &mut state.nodes[node].weight_to;
        map.decrease(current, self_loop)?;
        map.increase(target, self_loop);
    }
    state.nodes[node].community = target;

    if state.communities[current.index()].is_empty() {
        // Pruned: drop the dead aggregates so nothing can read them.
        state.communities[current.index()].weights = crate::weights::WeightMap::new();
    }

    Ok(())
}
