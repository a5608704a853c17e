use std::ops::Index;

use serde::Serialize;

/// Dense node index. Node `k` always identifies `stops[k]` of its graph.
pub type NodeIndex = usize;

/// Kind of connection between two stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Scheduled transit link.
    Route,
    /// Walking or interchange link between nearby stops.
    Transfer,
    /// Hypothetical link under evaluation.
    Theoretical,
}

/// Shape of a stop or route feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Geometry {
    LineString,
    Point,
}

/// A typed, weighted connection between two nodes.
///
/// Edges are values: changing one (as the evolutionary search does)
/// means writing a new record into its slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edge {
    pub kind: EdgeType,
    pub origin: NodeIndex,
    pub destination: NodeIndex,
    pub weight: f64,
}

impl Edge {
    pub fn new(kind: EdgeType, origin: NodeIndex, destination: NodeIndex, weight: f64) -> Self {
        Self {
            kind,
            origin,
            destination,
            weight,
        }
    }

    pub fn route(origin: NodeIndex, destination: NodeIndex, weight: f64) -> Self {
        Self::new(EdgeType::Route, origin, destination, weight)
    }

    pub fn transfer(origin: NodeIndex, destination: NodeIndex, weight: f64) -> Self {
        Self::new(EdgeType::Transfer, origin, destination, weight)
    }

    pub fn theoretical(origin: NodeIndex, destination: NodeIndex, weight: f64) -> Self {
        Self::new(EdgeType::Theoretical, origin, destination, weight)
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == EdgeType::Transfer
    }

    /// Endpoints ordered as a lower-triangular (row, column) pair.
    pub fn triangular(&self) -> (NodeIndex, NodeIndex) {
        if self.origin >= self.destination {
            (self.origin, self.destination)
        } else {
            (self.destination, self.origin)
        }
    }
}

/// Ordered sequence of edges.
///
/// Serves both as a flat serialization of a graph's edges and as the
/// candidate solution type of the critical-edge search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EdgeList {
    edges: Vec<Edge>,
}

impl EdgeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            edges: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Edge> {
        self.edges.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.edges.iter()
    }

    pub fn as_slice(&self) -> &[Edge] {
        &self.edges
    }

    pub fn transfer_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_transfer()).count()
    }
}

impl Index<usize> for EdgeList {
    type Output = Edge;

    fn index(&self, index: usize) -> &Edge {
        &self.edges[index]
    }
}

impl FromIterator<Edge> for EdgeList {
    fn from_iter<I: IntoIterator<Item = Edge>>(iter: I) -> Self {
        Self {
            edges: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Edge>> for EdgeList {
    fn from(edges: Vec<Edge>) -> Self {
        Self { edges }
    }
}

impl IntoIterator for EdgeList {
    type Item = Edge;
    type IntoIter = std::vec::IntoIter<Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.into_iter()
    }
}

impl<'a> IntoIterator for &'a EdgeList {
    type Item = &'a Edge;
    type IntoIter = std::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}
