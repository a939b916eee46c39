//! Multilevel Louvain community detection.
//!
//! Alternates two phases until modularity stops improving: greedy local
//! moving over the current level, then folding each community into a single
//! node of the next level. Labels for the original nodes are carried through
//! every level by composing the per-level reassignments, so the final
//! partition always refers to the input graph's node indices.

use crate::coarsen::fold;
use crate::error::{Error, Result};
use crate::graph::LevelGraph;
use crate::local_move::LocalMover;
use crate::registry::OptimizerState;
use crate::traits::{CommunityDetection, EdgeWeight};
use log::debug;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;

/// Snapshot of one folded level, recorded when `keep_levels` is enabled.
#[derive(Debug, Clone)]
pub struct FoldedLevel {
    /// Number of nodes (communities of the previous level).
    pub node_count: usize,
    /// Inter-community edges, each once as `(i, j, w)` with `i < j`.
    pub edges: Vec<(usize, usize, f64)>,
    /// Self-loop weight per node: the internal weight of the community the
    /// node replaced, counted once.
    pub self_loops: Vec<f64>,
}

impl FoldedLevel {
    fn from_graph(graph: &LevelGraph) -> Self {
        let node_count = graph.node_count();
        let edges = graph
            .edges()
            .into_iter()
            .filter(|&(i, j, _)| i != j)
            .collect();
        let self_loops = (0..node_count).map(|i| graph.self_loop(i)).collect();
        Self {
            node_count,
            edges,
            self_loops,
        }
    }
}

/// A detected partition of the input graph.
#[derive(Debug, Clone)]
pub struct Partition {
    labels: Vec<usize>,
    modularity: f64,
    level_modularity: Vec<f64>,
    folded: Vec<FoldedLevel>,
}

impl Partition {
    /// Community label per input node, renumbered to consecutive integers
    /// starting at zero.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Consume the partition and return the label vector.
    pub fn into_labels(self) -> Vec<usize> {
        self.labels
    }

    /// Community of `node`, or `None` if the index is out of range.
    pub fn community_of(&self, node: usize) -> Option<usize> {
        self.labels.get(node).copied()
    }

    /// Number of communities in the partition.
    pub fn num_communities(&self) -> usize {
        self.labels.iter().max().map_or(0, |&c| c + 1)
    }

    /// Modularity of the final partition.
    pub fn modularity(&self) -> f64 {
        self.modularity
    }

    /// Number of levels that produced at least one move.
    pub fn levels(&self) -> usize {
        self.level_modularity.len()
    }

    /// Modularity after local moving at each level, in order.
    pub fn level_modularity(&self) -> &[f64] {
        &self.level_modularity
    }

    /// Folded level snapshots; empty unless `keep_levels` was set.
    pub fn folded_levels(&self) -> &[FoldedLevel] {
        &self.folded
    }
}

/// Multilevel Louvain optimizer.
///
/// Configure with the builder methods, then run via [`CommunityDetection`]
/// on a petgraph graph or via [`Louvain::detect_edges`] on a raw edge list.
#[derive(Debug, Clone)]
pub struct Louvain {
    max_passes: usize,
    max_levels: usize,
    min_modularity_gain: f64,
    keep_levels: bool,
}

impl Louvain {
    /// Create an optimizer with default parameters.
    pub fn new() -> Self {
        Self {
            max_passes: 100,
            max_levels: 10,
            min_modularity_gain: 1e-7,
            keep_levels: false,
        }
    }

    /// Cap on local-moving sweeps per level.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Cap on folding rounds.
    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Minimum modularity improvement a level must deliver for folding to
    /// continue.
    pub fn with_min_modularity_gain(mut self, gain: f64) -> Self {
        self.min_modularity_gain = gain;
        self
    }

    /// Record a snapshot of every folded level in the partition.
    pub fn with_keep_levels(mut self, keep: bool) -> Self {
        self.keep_levels = keep;
        self
    }

    /// Run detection on a raw weighted edge list over nodes `0..node_count`.
    ///
    /// Edges are validated: endpoints must be in range and weights finite
    /// and non-negative. Self-loops and parallel edges are allowed.
    pub fn detect_edges(
        &self,
        node_count: usize,
        edges: &[(usize, usize, f64)],
    ) -> Result<Partition> {
        if node_count == 0 {
            return Err(Error::EmptyInput);
        }
        let graph = LevelGraph::from_edges(node_count, edges)?;
        self.optimize(graph)
    }

    fn optimize(&self, graph: LevelGraph) -> Result<Partition> {
        let n = graph.node_count();
        let mut state = OptimizerState::build(graph)?;
        let mut labels: Vec<usize> = (0..n).collect();
        let mut best_q = state.modularity();
        let mut level_modularity = Vec::new();
        let mut folded_levels = Vec::new();
        let mover = LocalMover::new().with_max_passes(self.max_passes);

        for level in 0..self.max_levels {
            let outcome = mover.run(&mut state)?;
            if outcome.moves == 0 {
                break;
            }
            outcome.changes.project(&mut labels)?;

            let q = state.modularity();
            debug!(
                "level {level}: {} moves, {} communities, Q = {q:.6}",
                outcome.moves,
                state.community_count()
            );
            level_modularity.push(q);

            // Each accepted move raises modularity by its exact gain, so q
            // always matches the labels just projected.
            let gained = q - best_q;
            best_q = q;
            if gained <= self.min_modularity_gain {
                break;
            }

            if state.community_count() == state.node_count() {
                // Folding would reproduce the same level.
                break;
            }

            let folded = fold(&state)?;
            for label in labels.iter_mut() {
                *label = folded
                    .relabel
                    .get(*label)
                    .copied()
                    .flatten()
                    .ok_or(Error::LabelProjection {
                        label: *label,
                        node_count: folded.relabel.len(),
                    })?;
            }
            if self.keep_levels {
                folded_levels.push(FoldedLevel::from_graph(folded.state.graph()));
            }
            state = folded.state;
        }

        // Renumber to consecutive community labels.
        let mut unique = labels.clone();
        unique.sort_unstable();
        unique.dedup();
        for label in labels.iter_mut() {
            *label = unique.binary_search(label).unwrap_or(0);
        }

        Ok(Partition {
            labels,
            modularity: best_q,
            level_modularity,
            folded: folded_levels,
        })
    }
}

impl Default for Louvain {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunityDetection for Louvain {
    fn detect<N, E: EdgeWeight>(&self, graph: &UnGraph<N, E>) -> Result<Partition> {
        let edges: Vec<(usize, usize, f64)> = graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), e.weight().weight()))
            .collect();
        self.detect_edges(graph.node_count(), &edges)
    }
}
