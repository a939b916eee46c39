//! Weighted adjacency for a single optimization level.
//!
//! Levels are immutable once built: local moving only reassigns communities,
//! it never touches edges. Self-loops are kept out of the neighbor lists and
//! materialized as an explicit per-node weight, which is how folded levels
//! carry the internal weight of the community they replaced.

use crate::error::{Error, Result};

/// A node set with weighted undirected edges and explicit self-loops.
#[derive(Debug, Clone)]
pub struct LevelGraph {
    /// Neighbor lists: `adj[i]` holds `(neighbor, weight)` pairs. Both
    /// directions of an edge are present; self-loops are not.
    adj: Vec<Vec<(usize, f64)>>,
    /// Self-loop weight per node, counted once.
    self_loop: Vec<f64>,
    /// Total edge weight `m`: every edge and every self-loop counted once.
    total_weight: f64,
}

impl LevelGraph {
    /// Build a level graph from an edge list, validating every edge.
    ///
    /// Parallel edges are kept and contribute their summed weight. An edge
    /// `(i, i, w)` becomes a self-loop of weight `w`.
    pub fn from_edges(node_count: usize, edges: &[(usize, usize, f64)]) -> Result<Self> {
        let mut adj = vec![Vec::new(); node_count];
        let mut self_loop = vec![0.0; node_count];
        let mut total_weight = 0.0;

        for &(a, b, w) in edges {
            if a >= node_count {
                return Err(Error::DanglingEndpoint {
                    endpoint: a,
                    node_count,
                });
            }
            if b >= node_count {
                return Err(Error::DanglingEndpoint {
                    endpoint: b,
                    node_count,
                });
            }
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidEdgeWeight {
                    source: a,
                    target: b,
                    weight: w,
                });
            }

            total_weight += w;
            if a == b {
                self_loop[a] += w;
            } else {
                adj[a].push((b, w));
                adj[b].push((a, w));
            }
        }

        Ok(Self {
            adj,
            self_loop,
            total_weight,
        })
    }

    /// Assemble a level from already-validated parts. Used by folding.
    pub(crate) fn from_parts(adj: Vec<Vec<(usize, f64)>>, self_loop: Vec<f64>) -> Self {
        let mut total_weight: f64 = self_loop.iter().sum();
        for (i, neighbors) in adj.iter().enumerate() {
            for &(j, w) in neighbors {
                // Each edge appears in both lists; count it once.
                if i < j {
                    total_weight += w;
                }
            }
        }
        Self {
            adj,
            self_loop,
            total_weight,
        }
    }

    /// Number of nodes at this level.
    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// Total edge weight `m` of the level.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Weighted neighbors of `node`, excluding any self-loop.
    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adj[node]
    }

    /// Self-loop weight of `node`, counted once.
    pub fn self_loop(&self, node: usize) -> f64 {
        self.self_loop[node]
    }

    /// Weighted degree `ki` of `node`: incident edges plus twice the
    /// self-loop, so that community degree sums stay additive.
    pub fn degree_weight(&self, node: usize) -> f64 {
        let incident: f64 = self.adj[node].iter().map(|&(_, w)| w).sum();
        incident + 2.0 * self.self_loop[node]
    }

    /// Edge list view: each edge once as `(i, j, w)` with `i < j`, followed
    /// by self-loops as `(i, i, w)`.
    pub fn edges(&self) -> Vec<(usize, usize, f64)> {
        let mut out = Vec::new();
        for (i, neighbors) in self.adj.iter().enumerate() {
            for &(j, w) in neighbors {
                if i < j {
                    out.push((i, j, w));
                }
            }
        }
        for (i, &w) in self.self_loop.iter().enumerate() {
            if w > 0.0 {
                out.push((i, i, w));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EPSILON;

    #[test]
    fn test_from_edges_builds_symmetric_adjacency() {
        let g = LevelGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 2.5)]).unwrap();

        assert_eq!(g.node_count(), 3);
        assert_eq!(g.neighbors(0), &[(1, 1.0)]);
        assert_eq!(g.neighbors(1), &[(0, 1.0), (2, 2.5)]);
        assert!((g.total_weight() - 3.5).abs() < EPSILON);
        assert!((g.degree_weight(1) - 3.5).abs() < EPSILON);
    }

    #[test]
    fn test_self_loop_counted_once_in_m_twice_in_degree() {
        let g = LevelGraph::from_edges(2, &[(0, 1, 1.0), (0, 0, 3.0)]).unwrap();

        assert!((g.total_weight() - 4.0).abs() < EPSILON);
        assert!((g.self_loop(0) - 3.0).abs() < EPSILON);
        assert!((g.degree_weight(0) - 7.0).abs() < EPSILON);
        assert!(g.neighbors(0).iter().all(|&(j, _)| j != 0));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = LevelGraph::from_edges(2, &[(0, 1, -1.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidEdgeWeight { .. }));
    }

    #[test]
    fn test_nan_weight_rejected() {
        let err = LevelGraph::from_edges(2, &[(0, 1, f64::NAN)]).unwrap_err();
        assert!(matches!(err, Error::InvalidEdgeWeight { .. }));
    }

    #[test]
    fn test_dangling_endpoint_rejected() {
        let err = LevelGraph::from_edges(2, &[(0, 5, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            Error::DanglingEndpoint {
                endpoint: 5,
                node_count: 2
            }
        );
    }

    #[test]
    fn test_edges_round_trip() {
        let edges = vec![(0, 1, 1.0), (1, 2, 2.0), (2, 2, 0.5)];
        let g = LevelGraph::from_edges(3, &edges).unwrap();
        assert_eq!(g.edges(), edges);
    }
}
