use std::sync::OnceLock;

use rand::Rng;
use tracing::debug;

use crate::edge::{Edge, EdgeList, EdgeType, NodeIndex};
use crate::error::{Error, Result};
use crate::path::Path;
use crate::stop::Stop;

/// Contents of one adjacency-matrix entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub kind: EdgeType,
    pub weight: f64,
}

impl Cell {
    pub fn new(kind: EdgeType, weight: f64) -> Self {
        Self { kind, weight }
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == EdgeType::Transfer
    }
}

/// Lower-triangular adjacency rows: row `i` holds columns `0..i`.
pub type Matrix = Vec<Vec<Option<Cell>>>;

/// All-pairs distances plus a successor table for path reconstruction.
#[derive(Debug, Clone)]
struct PathTable {
    n: usize,
    dist: Vec<f64>,
    next: Vec<Option<NodeIndex>>,
}

impl PathTable {
    fn distance(&self, i: NodeIndex, j: NodeIndex) -> f64 {
        self.dist[i * self.n + j]
    }
}

/// Weighted, typed, undirected transit graph over dense node indices.
///
/// Each unordered pair holds at most one edge, stored at
/// `(max(i, j), min(i, j))`. A graph is never changed after construction:
/// operations that "modify" it build a new one. The all-pairs shortest
/// path table is the one lazily filled cache.
#[derive(Debug, Clone)]
pub struct Graph {
    num_nodes: usize,
    matrix: Matrix,
    stops: Vec<Stop>,
    /// incoming[k]: ascending neighbor indices of k.
    incoming: Vec<Vec<NodeIndex>>,
    theoretical_edge_weight: f64,
    paths: OnceLock<PathTable>,
}

impl Graph {
    /// Build a graph from an edge list and index-aligned stops.
    ///
    /// Self-loops are ignored; a pair named twice keeps the later edge.
    ///
    /// # Errors
    ///
    /// `StopCountMismatch` if `stops.len() != num_nodes`, `NodeOutOfRange`
    /// for an endpoint outside the graph, `InvalidWeight` for a negative or
    /// non-finite weight.
    pub fn new(edges: &EdgeList, num_nodes: usize, stops: Vec<Stop>) -> Result<Self> {
        if stops.len() != num_nodes {
            return Err(Error::StopCountMismatch {
                stops: stops.len(),
                nodes: num_nodes,
            });
        }

        let mut matrix: Matrix = (0..num_nodes).map(|i| vec![None; i]).collect();
        for edge in edges {
            check_edge(edge, num_nodes)?;
            let (row, col) = edge.triangular();
            if row != col {
                matrix[row][col] = Some(Cell::new(edge.kind, edge.weight));
            }
        }

        Ok(Self::from_parts(matrix, stops))
    }

    /// Build a graph whose stops are placeholders named by index.
    pub fn without_stops(edges: &EdgeList, num_nodes: usize) -> Result<Self> {
        Self::new(edges, num_nodes, (0..num_nodes).map(Stop::placeholder).collect())
    }

    fn from_parts(matrix: Matrix, stops: Vec<Stop>) -> Self {
        let num_nodes = matrix.len();
        let mut incoming = vec![Vec::new(); num_nodes];
        for (row, cells) in matrix.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if cell.is_some() {
                    incoming[row].push(col);
                    incoming[col].push(row);
                }
            }
        }
        for list in &mut incoming {
            list.sort_unstable();
        }

        Self {
            num_nodes,
            matrix,
            stops,
            incoming,
            theoretical_edge_weight: 1.0,
            paths: OnceLock::new(),
        }
    }

    /// Set the weight used by `create_random_edge`.
    pub fn with_theoretical_edge_weight(mut self, weight: f64) -> Self {
        self.theoretical_edge_weight = weight;
        self
    }

    pub fn theoretical_edge_weight(&self) -> f64 {
        self.theoretical_edge_weight
    }

    pub fn len(&self) -> usize {
        self.num_nodes
    }

    pub fn is_empty(&self) -> bool {
        self.num_nodes == 0
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop(&self, node: NodeIndex) -> Option<&Stop> {
        self.stops.get(node)
    }

    pub fn check_node(&self, node: NodeIndex) -> Result<()> {
        if node < self.num_nodes {
            Ok(())
        } else {
            Err(Error::NodeOutOfRange {
                node,
                len: self.num_nodes,
            })
        }
    }

    /// Matrix entry for the unordered pair, if any.
    pub fn cell(&self, i: NodeIndex, j: NodeIndex) -> Option<&Cell> {
        let (row, col) = if i >= j { (i, j) } else { (j, i) };
        self.matrix.get(row)?.get(col)?.as_ref()
    }

    pub fn edge_exists(&self, i: NodeIndex, j: NodeIndex) -> bool {
        self.cell(i, j).is_some()
    }

    /// Edge weight, or 0.0 when the pair is not connected.
    pub fn get_weight(&self, i: NodeIndex, j: NodeIndex) -> f64 {
        self.cell(i, j).map_or(0.0, |c| c.weight)
    }

    /// Edge record oriented from `origin` to `destination`.
    pub fn create_edge(&self, origin: NodeIndex, destination: NodeIndex) -> Option<Edge> {
        self.cell(origin, destination)
            .map(|c| Edge::new(c.kind, origin, destination, c.weight))
    }

    /// Ascending indices of nodes adjacent to `node`.
    pub fn incoming_nodes(&self, node: NodeIndex) -> &[NodeIndex] {
        self.incoming.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The graph is undirected, so neighbors and incoming nodes coincide.
    pub fn neighbors(&self, node: NodeIndex) -> &[NodeIndex] {
        self.incoming_nodes(node)
    }

    pub fn out_degree(&self, node: NodeIndex) -> usize {
        self.incoming_nodes(node).len()
    }

    /// Every edge, origin being the larger index.
    pub fn edges(&self) -> EdgeList {
        self.edges_where(|_| true)
    }

    pub fn edge_count(&self) -> usize {
        self.matrix
            .iter()
            .map(|row| row.iter().filter(|c| c.is_some()).count())
            .sum()
    }

    fn edges_where(&self, keep: impl Fn(&Cell) -> bool) -> EdgeList {
        let mut list = EdgeList::new();
        for (row, cells) in self.matrix.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if let Some(cell) = cell.filter(|c| keep(c)) {
                    list.add(Edge::new(cell.kind, row, col, cell.weight));
                }
            }
        }
        list
    }

    pub fn transfer_edges(&self) -> EdgeList {
        self.edges_where(Cell::is_transfer)
    }

    /// Same nodes and stops, only TRANSFER edges kept.
    pub fn transfer_graph(&self) -> Graph {
        let matrix = self
            .matrix
            .iter()
            .map(|row| row.iter().map(|c| c.filter(Cell::is_transfer)).collect())
            .collect();
        Self::from_parts(matrix, self.stops.clone())
            .with_theoretical_edge_weight(self.theoretical_edge_weight)
    }

    /// Deep copy of the adjacency rows, ready for surgery.
    pub fn make_copy(&self) -> Matrix {
        self.matrix.clone()
    }

    /// Fill the all-pairs shortest path cache (Floyd–Warshall over edge
    /// weights). Repeat calls are free.
    pub fn calculate_path_lengths(&self) {
        self.path_table();
    }

    fn path_table(&self) -> &PathTable {
        self.paths.get_or_init(|| self.floyd_warshall())
    }

    fn floyd_warshall(&self) -> PathTable {
        let n = self.num_nodes;
        let mut dist = vec![f64::INFINITY; n * n];
        let mut next = vec![None; n * n];

        for i in 0..n {
            dist[i * n + i] = 0.0;
            next[i * n + i] = Some(i);
            for &j in self.neighbors(i) {
                dist[i * n + j] = self.get_weight(i, j);
                next[i * n + j] = Some(j);
            }
        }

        for k in 0..n {
            for i in 0..n {
                let ik = dist[i * n + k];
                if ik.is_infinite() {
                    continue;
                }
                for j in 0..n {
                    let through = ik + dist[k * n + j];
                    if through < dist[i * n + j] {
                        dist[i * n + j] = through;
                        next[i * n + j] = next[i * n + k];
                    }
                }
            }
        }

        debug!(nodes = n, "shortest path table filled");
        PathTable { n, dist, next }
    }

    /// Shortest weighted distance; `INFINITY` when unreachable or out of
    /// range.
    pub fn shortest_path(&self, i: NodeIndex, j: NodeIndex) -> f64 {
        if i >= self.num_nodes || j >= self.num_nodes {
            return f64::INFINITY;
        }
        self.path_table().distance(i, j)
    }

    /// Node sequence of one shortest path from `i` to `j`, both included.
    pub fn shortest_route(&self, i: NodeIndex, j: NodeIndex) -> Option<Path> {
        if i >= self.num_nodes || j >= self.num_nodes {
            return None;
        }
        let table = self.path_table();
        let mut path = Path::new();
        let mut current = i;
        path.add(current);
        while current != j {
            current = table.next[current * table.n + j]?;
            path.add(current);
        }
        Some(path)
    }

    /// A THEORETICAL edge between two distinct uniformly random nodes.
    ///
    /// # Errors
    ///
    /// `TooFewNodes` when the graph has fewer than two nodes.
    pub fn create_random_edge<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Edge> {
        if self.num_nodes < 2 {
            return Err(Error::TooFewNodes {
                needed: 2,
                found: self.num_nodes,
            });
        }
        let origin = rng.gen_range(0..self.num_nodes);
        let mut destination = rng.gen_range(0..self.num_nodes - 1);
        if destination >= origin {
            destination += 1;
        }
        Ok(Edge::theoretical(origin, destination, self.theoretical_edge_weight))
    }

    /// Copy of this graph with `extra` edges laid over the matrix.
    ///
    /// An extra edge only fills an empty pair: existing edges keep their
    /// kind and weight. Self-loops are skipped. The receiver is untouched.
    pub fn create_new_graph_with_edges(&self, extra: &EdgeList) -> Result<Graph> {
        let mut matrix = self.make_copy();
        for edge in extra {
            check_edge(edge, self.num_nodes)?;
            let (row, col) = edge.triangular();
            if row != col && matrix[row][col].is_none() {
                matrix[row][col] = Some(Cell::new(edge.kind, edge.weight));
            }
        }
        Ok(Self::from_parts(matrix, self.stops.clone())
            .with_theoretical_edge_weight(self.theoretical_edge_weight))
    }

    /// Outward accessibility of `node` for walk lengths `1..=max_walk`.
    ///
    /// For each length h, takes the distribution of a uniform random walk
    /// of h steps from `node` and reports the exponential of its entropy.
    /// Isolated nodes have accessibility 0 at every length.
    pub fn node_accessibilities(&self, node: NodeIndex, max_walk: u32) -> Vec<f64> {
        let steps = max_walk as usize;
        if node >= self.num_nodes || self.out_degree(node) == 0 {
            return vec![0.0; steps];
        }

        let mut probabilities = vec![0.0; self.num_nodes];
        probabilities[node] = 1.0;
        let mut result = Vec::with_capacity(steps);

        for _ in 0..steps {
            let mut stepped = vec![0.0; self.num_nodes];
            for (from, &p) in probabilities.iter().enumerate() {
                if p == 0.0 {
                    continue;
                }
                let neighbors = self.neighbors(from);
                if neighbors.is_empty() {
                    continue;
                }
                let share = p / neighbors.len() as f64;
                for &to in neighbors {
                    stepped[to] += share;
                }
            }
            probabilities = stepped;

            let entropy: f64 = probabilities
                .iter()
                .filter(|&&p| p > 0.0)
                .map(|&p| -p * p.ln())
                .sum();
            result.push(entropy.exp());
        }

        result
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let cells = self.num_nodes * self.num_nodes.saturating_sub(1) / 2;
        let matrix_mem = cells * size_of::<Option<Cell>>();
        let incoming_mem: usize = self
            .incoming
            .iter()
            .map(|v| v.len() * size_of::<NodeIndex>())
            .sum();
        let stops_mem = self.stops.len() * (size_of::<Stop>() + 48);
        let paths_mem = self.paths.get().map_or(0, |t| {
            t.dist.len() * (size_of::<f64>() + size_of::<Option<NodeIndex>>())
        });

        matrix_mem + incoming_mem + stops_mem + paths_mem
    }
}

fn check_edge(edge: &Edge, num_nodes: usize) -> Result<()> {
    for node in [edge.origin, edge.destination] {
        if node >= num_nodes {
            return Err(Error::NodeOutOfRange {
                node,
                len: num_nodes,
            });
        }
    }
    if !edge.weight.is_finite() || edge.weight < 0.0 {
        return Err(Error::InvalidWeight {
            origin: edge.origin,
            destination: edge.destination,
            weight: edge.weight,
        });
    }
    Ok(())
}
