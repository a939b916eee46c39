use core::fmt;

/// Result alias for `unfold`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by graph validation and the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input graph had no nodes.
    EmptyInput,

    /// An edge carried a negative or non-finite weight.
    InvalidEdgeWeight {
        /// Source endpoint.
        source: usize,
        /// Target endpoint.
        target: usize,
        /// The offending weight.
        weight: f64,
    },

    /// An edge referenced a node outside the graph.
    DanglingEndpoint {
        /// The out-of-range endpoint.
        endpoint: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },

    /// Internal bookkeeping drifted out of agreement (a weight aggregate
    /// went negative or pointed at a pruned community). Always a bug,
    /// never a user error.
    Consistency {
        /// Which aggregate failed.
        context: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A change map was composed onto labels it cannot cover.
    LabelProjection {
        /// The label that had no entry.
        label: usize,
        /// Number of level nodes the change map covers.
        node_count: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::InvalidEdgeWeight {
                source,
                target,
                weight,
            } => {
                write!(f, "invalid weight {weight} on edge ({source}, {target})")
            }
            Error::DanglingEndpoint {
                endpoint,
                node_count,
            } => {
                write!(
                    f,
                    "edge endpoint {endpoint} out of range for {node_count} nodes"
                )
            }
            Error::Consistency { context, value } => {
                write!(f, "bookkeeping inconsistency in {context}: {value}")
            }
            Error::LabelProjection { label, node_count } => {
                write!(
                    f,
                    "label {label} cannot be projected through a change map over {node_count} nodes"
                )
            }
        }
    }
}

impl std::error::Error for Error {}
