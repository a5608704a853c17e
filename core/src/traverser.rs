use crate::edge::{Edge, NodeIndex};

/// Final report of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalSummary {
    pub stations_visited: usize,
}

/// Observer notified as traversals and rankings run.
///
/// Every hook defaults to a no-op, so an implementation overrides only what
/// it records. Pass `&mut ()` to run an algorithm without an observer.
pub trait Traverser {
    /// A node was discovered.
    fn visit_node(&mut self, _node: NodeIndex) {}

    /// An edge was followed toward an undiscovered node.
    fn visit(&mut self, _edge: &Edge) {}

    /// DFS backtracked over an edge.
    fn leave(&mut self, _edge: &Edge) {}

    fn summary(&mut self, _summary: &TraversalSummary) {}

    fn record_ranks(&mut self, _ranks: &[f64]) {}
}

impl Traverser for () {}

/// Traverser that keeps everything it is told.
#[derive(Debug, Clone, Default)]
pub struct BasicTraverser {
    pub visited_nodes: Vec<NodeIndex>,
    pub visited_edges: Vec<Edge>,
    pub left_edges: Vec<Edge>,
    pub ranks: Option<Vec<f64>>,
    pub summary: Option<TraversalSummary>,
}

impl BasicTraverser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Traverser for BasicTraverser {
    fn visit_node(&mut self, node: NodeIndex) {
        self.visited_nodes.push(node);
    }

    fn visit(&mut self, edge: &Edge) {
        self.visited_edges.push(*edge);
    }

    fn leave(&mut self, edge: &Edge) {
        self.left_edges.push(*edge);
    }

    fn summary(&mut self, summary: &TraversalSummary) {
        self.summary = Some(*summary);
    }

    fn record_ranks(&mut self, ranks: &[f64]) {
        self.ranks = Some(ranks.to_vec());
    }
}
