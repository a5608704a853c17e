use crate::edge::NodeIndex;
use crate::error::{Error, Result};

/// Ordered sequence of nodes, e.g. one shortest path through the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    nodes: Vec<NodeIndex>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add(&mut self, node: NodeIndex) {
        self.nodes.push(node);
    }

    pub fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.contains(&node)
    }

    pub fn at(&self, position: usize) -> Option<NodeIndex> {
        self.nodes.get(position).copied()
    }

    pub fn reverse(&mut self) {
        self.nodes.reverse();
    }

    pub fn nodes(&self) -> &[NodeIndex] {
        &self.nodes
    }

    /// Pad the path with `value` up to `length` entries.
    ///
    /// # Errors
    ///
    /// Returns `Error::Precondition` when `length` is shorter than the
    /// current path; paths are never truncated.
    pub fn fill_to(&mut self, length: usize, value: NodeIndex) -> Result<()> {
        if length < self.nodes.len() {
            return Err(Error::precondition(format!(
                "path of length {} cannot be filled to {}",
                self.nodes.len(),
                length
            )));
        }
        self.nodes.resize(length, value);
        Ok(())
    }
}

impl From<Vec<NodeIndex>> for Path {
    fn from(nodes: Vec<NodeIndex>) -> Self {
        Self { nodes }
    }
}
