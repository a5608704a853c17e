use thiserror::Error;

use crate::edge::NodeIndex;

/// Errors raised by the transit graph engine.
///
/// Every variant is a programmer error: the caller handed in a malformed
/// graph or violated an operation's precondition. Nothing here is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("node {node} out of range for graph with {len} nodes")]
    NodeOutOfRange { node: NodeIndex, len: usize },

    #[error("edge {origin}-{destination} has invalid weight {weight}")]
    InvalidWeight {
        origin: NodeIndex,
        destination: NodeIndex,
        weight: f64,
    },

    #[error("{stops} stops supplied for a graph with {nodes} nodes")]
    StopCountMismatch { stops: usize, nodes: usize },

    #[error("operation needs at least {needed} nodes, graph has {found}")]
    TooFewNodes { needed: usize, found: usize },

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition(reason.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
