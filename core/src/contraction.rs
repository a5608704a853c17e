//! Transfer-node contraction.
//!
//! Repeatedly collapses a pair of stops joined by a TRANSFER edge into one
//! synthetic stop until no TRANSFER edge remains. Adapted from Ostrovsky,
//! "Efficiently Merging Graph Nodes With Application to Cluster Analysis"
//! (2007).
//!
//! Surgery happens in a [`ContractionArena`]: slots are never shifted
//! while merging. Merged slots are retired (their generation bumps, so
//! outstanding keys go stale) and the merged stop is appended as a new
//! slot. [`ContractionArena::compact`] then rebuilds a dense [`Graph`]
//! with survivors in slot order and merged stops at the end.

use tracing::{debug, info};

use crate::edge::{Edge, EdgeList, EdgeType, NodeIndex};
use crate::error::{Error, Result};
use crate::graph::{Cell, Graph, Matrix};
use crate::stop::Stop;
use crate::traversal::connected_components;

/// Combine the two cells joining a node to a merged pair.
///
/// Absent inputs count as weight 0. Any TRANSFER input yields TRANSFER;
/// everything else, THEORETICAL included, becomes ROUTE. The weight is the
/// larger of the two.
pub fn merge_edges(a: Option<Cell>, b: Option<Cell>) -> Option<Cell> {
    if a.is_none() && b.is_none() {
        return None;
    }

    let weight = a.map_or(0.0, |c| c.weight).max(b.map_or(0.0, |c| c.weight));
    let kind = if a.is_some_and(|c| c.is_transfer()) || b.is_some_and(|c| c.is_transfer()) {
        EdgeType::Transfer
    } else {
        EdgeType::Route
    };

    Some(Cell::new(kind, weight))
}

/// Generation-tagged handle to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    slot: usize,
    generation: u32,
}

impl NodeKey {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Where another node sits relative to the merged pair `lo < hi`.
///
/// The lower-triangular layout stores `(row, col)` with `row > col`, so the
/// zone decides which two stored cells hold that node's links to the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// `k < lo`: cells `(lo, k)` and `(hi, k)`.
    Below,
    /// `lo < k < hi`: cells `(hi, k)` and `(k, lo)`.
    Between,
    /// `k > hi`: cells `(k, lo)` and `(k, hi)`.
    Above,
}

impl Zone {
    fn of(k: usize, lo: usize, hi: usize) -> Zone {
        if k < lo {
            Zone::Below
        } else if k < hi {
            Zone::Between
        } else {
            Zone::Above
        }
    }

    /// Triangular coordinates of `k`'s links to `lo` and `hi`.
    fn cells(self, k: usize, lo: usize, hi: usize) -> [(usize, usize); 2] {
        match self {
            Zone::Below => [(lo, k), (hi, k)],
            Zone::Between => [(hi, k), (k, lo)],
            Zone::Above => [(k, lo), (k, hi)],
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    stop: Stop,
    generation: u32,
    live: bool,
}

/// Stable-slot workspace for merging nodes without shifting indices.
#[derive(Debug, Clone)]
pub struct ContractionArena {
    slots: Vec<Slot>,
    /// Lower-triangular cells over slot indices.
    cells: Matrix,
    theoretical_edge_weight: f64,
}

impl ContractionArena {
    /// Copy a graph's matrix and stops into fresh slots, one per node.
    pub fn from_graph(graph: &Graph) -> Self {
        let slots = graph
            .stops()
            .iter()
            .map(|stop| Slot {
                stop: stop.clone(),
                generation: 0,
                live: true,
            })
            .collect();

        Self {
            slots,
            cells: graph.make_copy(),
            theoretical_edge_weight: graph.theoretical_edge_weight(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.live).count()
    }

    /// Key for the live slot `slot`.
    pub fn key(&self, slot: usize) -> Result<NodeKey> {
        match self.slots.get(slot) {
            Some(s) if s.live => Ok(NodeKey {
                slot,
                generation: s.generation,
            }),
            Some(_) => Err(Error::precondition(format!("slot {} has been merged away", slot))),
            None => Err(Error::NodeOutOfRange {
                node: slot,
                len: self.slots.len(),
            }),
        }
    }

    pub fn stop(&self, key: NodeKey) -> Result<&Stop> {
        self.resolve(key).map(|s| &s.stop)
    }

    fn resolve(&self, key: NodeKey) -> Result<&Slot> {
        self.slots
            .get(key.slot)
            .filter(|s| s.live && s.generation == key.generation)
            .ok_or_else(|| Error::precondition(format!("stale node key for slot {}", key.slot)))
    }

    fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Merge two live nodes into a new slot appended after every other.
    ///
    /// Each other live node gets one link to the new slot, combining its
    /// links to both halves with [`merge_edges`]. The link between the pair
    /// itself disappears. Both input keys are stale afterwards.
    pub fn merge(&mut self, a: NodeKey, b: NodeKey) -> Result<NodeKey> {
        self.resolve(a)?;
        self.resolve(b)?;
        if a.slot == b.slot {
            return Err(Error::precondition(format!(
                "cannot merge slot {} with itself",
                a.slot
            )));
        }
        let (lo, hi) = if a.slot < b.slot {
            (a.slot, b.slot)
        } else {
            (b.slot, a.slot)
        };

        let merged_slot = self.slots.len();
        let mut row: Vec<Option<Cell>> = vec![None; merged_slot];
        for (k, cell) in row.iter_mut().enumerate() {
            if k == lo || k == hi || !self.slots[k].live {
                continue;
            }
            let [first, second] = Zone::of(k, lo, hi).cells(k, lo, hi);
            *cell = merge_edges(self.cell(first.0, first.1), self.cell(second.0, second.1));
        }

        let stop = self.slots[lo].stop.merge_with(&self.slots[hi].stop);
        self.excise(lo);
        self.excise(hi);

        self.cells.push(row);
        self.slots.push(Slot {
            stop,
            generation: 0,
            live: true,
        });

        debug!(lo, hi, merged_slot, "merged node pair");
        Ok(NodeKey {
            slot: merged_slot,
            generation: 0,
        })
    }

    /// Retire a slot and clear every cell that references it.
    fn excise(&mut self, slot: usize) {
        for cell in self.cells[slot].iter_mut() {
            *cell = None;
        }
        for row in self.cells.iter_mut().skip(slot + 1) {
            if let Some(cell) = row.get_mut(slot) {
                *cell = None;
            }
        }
        let retired = &mut self.slots[slot];
        retired.live = false;
        retired.generation = retired.generation.wrapping_add(1);
    }

    /// Rebuild a dense graph from the live slots, in slot order.
    pub fn compact(&self) -> Result<Graph> {
        let mut index: Vec<Option<NodeIndex>> = vec![None; self.slots.len()];
        let mut stops = Vec::with_capacity(self.live_count());
        for (slot, s) in self.slots.iter().enumerate() {
            if s.live {
                index[slot] = Some(stops.len());
                stops.push(s.stop.clone());
            }
        }

        let mut edges = EdgeList::new();
        for (row, cells) in self.cells.iter().enumerate() {
            let Some(origin) = index[row] else { continue };
            for (col, cell) in cells.iter().enumerate() {
                if let (Some(cell), Some(destination)) = (cell, index[col]) {
                    edges.add(Edge::new(cell.kind, origin, destination, cell.weight));
                }
            }
        }

        let num_nodes = stops.len();
        Ok(Graph::new(&edges, num_nodes, stops)?
            .with_theoretical_edge_weight(self.theoretical_edge_weight))
    }
}

/// Collapse every TRANSFER-connected cluster into a single stop.
///
/// Returns `None` when the graph has no TRANSFER edge to merge. Otherwise
/// returns a new graph with no TRANSFER edges; the input is untouched.
pub fn merge_transfer_nodes(graph: &Graph) -> Result<Option<Graph>> {
    Ok(merge_transfer_nodes_counted(graph)?.map(|(merged, _)| merged))
}

/// [`merge_transfer_nodes`], also reporting how many pairs were merged.
///
/// Each round takes the transfer-only subgraph, finds its first component
/// with more than one node, and merges the first two nodes of that
/// component (a root and the neighbor DFS reached first). One pair per
/// round; the next round rescans the rebuilt graph.
pub fn merge_transfer_nodes_counted(graph: &Graph) -> Result<Option<(Graph, usize)>> {
    if graph.transfer_edges().is_empty() {
        debug!("no transfer edges, nothing to merge");
        return Ok(None);
    }

    let start_nodes = graph.len();
    let mut current = graph.clone();
    let mut merges = 0usize;

    while !current.transfer_edges().is_empty() {
        let transfer_graph = current.transfer_graph();
        let (a, b) = connected_components(&transfer_graph)
            .into_iter()
            .find(|group| group.len() > 1)
            .and_then(|group| Some((*group.first()?, *group.get(1)?)))
            .ok_or_else(|| Error::precondition("transfer edge outside any transfer cluster"))?;

        let mut arena = ContractionArena::from_graph(&current);
        let (ka, kb) = (arena.key(a)?, arena.key(b)?);
        arena.merge(ka, kb)?;
        current = arena.compact()?;
        merges += 1;

        debug!(
            round = merges,
            nodes = current.len(),
            transfers = current.transfer_edges().len(),
            "contraction round complete"
        );
    }

    info!(merges, start_nodes, end_nodes = current.len(), "transfer nodes merged");
    Ok(Some((current, merges)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop::Route;
    use proptest::prelude::*;

    fn route(w: f64) -> Option<Cell> {
        Some(Cell::new(EdgeType::Route, w))
    }

    fn transfer(w: f64) -> Option<Cell> {
        Some(Cell::new(EdgeType::Transfer, w))
    }

    fn theoretical(w: f64) -> Option<Cell> {
        Some(Cell::new(EdgeType::Theoretical, w))
    }

    fn named_graph(names: &[&str], edges: Vec<Edge>) -> Graph {
        let stops = names
            .iter()
            .enumerate()
            .map(|(i, name)| Stop::new(name, *name, i as f64, 0.0, vec![Route::new(format!("r{}", i))]))
            .collect();
        Graph::new(&edges.into(), names.len(), stops).unwrap()
    }

    // --- merge_edges ---

    #[test]
    fn test_merge_edges_both_absent() {
        assert_eq!(merge_edges(None, None), None);
    }

    #[test]
    fn test_merge_edges_transfer_wins() {
        assert_eq!(merge_edges(transfer(0.5), route(3.0)), transfer(3.0));
        assert_eq!(merge_edges(route(1.0), transfer(0.5)), transfer(1.0));
        assert_eq!(merge_edges(None, transfer(0.5)), transfer(0.5));
    }

    #[test]
    fn test_merge_edges_route_max_weight() {
        assert_eq!(merge_edges(route(2.0), route(5.0)), route(5.0));
        assert_eq!(merge_edges(route(2.0), None), route(2.0));
    }

    #[test]
    fn test_merge_edges_theoretical_becomes_route() {
        assert_eq!(merge_edges(theoretical(1.5), None), route(1.5));
        assert_eq!(merge_edges(theoretical(1.5), route(0.5)), route(1.5));
    }

    // --- Arena ---

    #[test]
    fn test_zone_classification() {
        assert_eq!(Zone::of(0, 2, 5), Zone::Below);
        assert_eq!(Zone::of(3, 2, 5), Zone::Between);
        assert_eq!(Zone::of(7, 2, 5), Zone::Above);
        assert_eq!(Zone::Between.cells(3, 2, 5), [(5, 3), (3, 2)]);
    }

    #[test]
    fn test_arena_merge_every_zone() {
        // merge 1 and 3; 0 is below, 2 between, 4 above
        let g = named_graph(
            &["A", "B", "C", "D", "E"],
            vec![
                Edge::transfer(1, 3, 0.1),
                Edge::route(0, 1, 2.0),
                Edge::route(0, 3, 7.0),
                Edge::route(2, 1, 2.0),
                Edge::transfer(2, 3, 0.5),
                Edge::route(4, 3, 6.0),
            ],
        );
        let mut arena = ContractionArena::from_graph(&g);
        let (b, d) = (arena.key(1).unwrap(), arena.key(3).unwrap());
        let merged = arena.merge(b, d).unwrap();
        assert_eq!(merged.slot(), 5);
        assert_eq!(arena.live_count(), 4);
        assert_eq!(arena.stop(merged).unwrap().name, "B / D");

        let out = arena.compact().unwrap();
        // survivors A, C, E keep order; merged node last
        let names: Vec<&str> = out.stops().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "E", "B / D"]);
        assert_eq!(out.cell(3, 0), route(7.0).as_ref());
        assert_eq!(out.cell(3, 1), transfer(2.0).as_ref());
        assert_eq!(out.cell(3, 2), route(6.0).as_ref());
        assert_eq!(out.edge_count(), 3);
    }

    #[test]
    fn test_arena_stale_keys_rejected() {
        let g = named_graph(&["A", "B", "C"], vec![Edge::transfer(0, 1, 1.0)]);
        let mut arena = ContractionArena::from_graph(&g);
        let (a, b) = (arena.key(0).unwrap(), arena.key(1).unwrap());
        let merged = arena.merge(a, b).unwrap();

        assert!(matches!(arena.merge(a, merged), Err(Error::Precondition(_))));
        assert!(matches!(arena.key(1), Err(Error::Precondition(_))));
        assert!(matches!(arena.key(9), Err(Error::NodeOutOfRange { .. })));
        assert!(arena.merge(merged, merged).is_err());
    }

    #[test]
    fn test_arena_chained_merges() {
        let g = named_graph(
            &["A", "B", "C", "D"],
            vec![
                Edge::transfer(0, 1, 1.0),
                Edge::transfer(1, 2, 1.0),
                Edge::route(2, 3, 4.0),
            ],
        );
        let mut arena = ContractionArena::from_graph(&g);
        let ab = arena
            .merge(arena.key(0).unwrap(), arena.key(1).unwrap())
            .unwrap();
        let abc = arena.merge(ab, arena.key(2).unwrap()).unwrap();
        assert_eq!(abc.slot(), 5);

        let out = arena.compact().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.stop(1).unwrap().id, "C-A-B");
        assert_eq!(out.cell(1, 0), route(4.0).as_ref());
    }

    // --- merge_transfer_nodes ---

    #[test]
    fn test_no_transfers_is_noop() {
        let g = named_graph(&["A", "B"], vec![Edge::route(0, 1, 1.0)]);
        assert!(merge_transfer_nodes(&g).unwrap().is_none());
    }

    #[test]
    fn test_end_to_end_four_stops() {
        let g = named_graph(
            &["A", "B", "C", "D"],
            vec![
                Edge::transfer(0, 1, 0.3),
                Edge::route(1, 2, 4.0),
                Edge::route(2, 3, 2.0),
            ],
        );
        let out = merge_transfer_nodes(&g).unwrap().unwrap();

        assert_eq!(out.len(), 3);
        assert!(out.transfer_edges().is_empty());
        let names: Vec<&str> = out.stops().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["C", "D", "A / B"]);
        let ab_to_c = out.create_edge(2, 0).unwrap();
        assert_eq!(ab_to_c.kind, EdgeType::Route);
        assert_eq!(ab_to_c.weight, 4.0);
        assert_eq!(out.get_weight(0, 1), 2.0);
        // input untouched
        assert_eq!(g.len(), 4);
        assert_eq!(g.transfer_edges().len(), 1);
    }

    #[test]
    fn test_cluster_collapses_one_pair_per_round() {
        // triangle of transfers plus a separate transfer pair
        let g = named_graph(
            &["A", "B", "C", "D", "E", "F"],
            vec![
                Edge::transfer(0, 1, 1.0),
                Edge::transfer(1, 2, 1.0),
                Edge::transfer(0, 2, 1.0),
                Edge::route(2, 3, 5.0),
                Edge::transfer(4, 5, 1.0),
                Edge::route(3, 4, 2.0),
            ],
        );
        let (out, merges) = merge_transfer_nodes_counted(&g).unwrap().unwrap();
        assert_eq!(merges, 3);
        assert_eq!(out.len(), 3);
        assert!(out.transfer_edges().is_empty());

        let ids: Vec<&str> = out.stops().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["D", "C-A-B", "E-F"]);
        assert_eq!(out.get_weight(0, 1), 5.0);
        assert_eq!(out.get_weight(0, 2), 2.0);
        assert!(!out.edge_exists(1, 2));
    }

    #[test]
    fn test_merged_stop_routes_union() {
        let g = named_graph(&["A", "B"], vec![Edge::transfer(0, 1, 1.0)]);
        let out = merge_transfer_nodes(&g).unwrap().unwrap();
        assert_eq!(out.len(), 1);
        let routes: Vec<&str> = out.stop(0).unwrap().routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(routes, vec!["r0", "r1"]);
    }

    fn arb_transit_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize, bool, u8)>)> {
        (2usize..12).prop_flat_map(|n| {
            (
                Just(n),
                prop::collection::vec((0..n, 0..n, any::<bool>(), 1u8..10), 0..25),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_contraction_removes_all_transfers((n, raw) in arb_transit_graph()) {
            let edges: EdgeList = raw
                .iter()
                .map(|&(a, b, is_transfer, w)| {
                    if is_transfer {
                        Edge::transfer(a, b, w as f64)
                    } else {
                        Edge::route(a, b, w as f64)
                    }
                })
                .collect();
            let g = Graph::without_stops(&edges, n).unwrap();

            let expected_merges: usize = connected_components(&g.transfer_graph())
                .iter()
                .map(|group| group.len() - 1)
                .sum();

            match merge_transfer_nodes_counted(&g).unwrap() {
                None => prop_assert_eq!(g.transfer_edges().len(), 0),
                Some((out, merges)) => {
                    prop_assert!(out.transfer_edges().is_empty());
                    prop_assert_eq!(merges, expected_merges);
                    prop_assert_eq!(out.len(), n - merges);
                    prop_assert!(out.len() < n);
                }
            }
        }

        #[test]
        fn prop_merge_edges_rule(
            a in prop::option::of((0u8..3, 0.0f64..10.0)),
            b in prop::option::of((0u8..3, 0.0f64..10.0)),
        ) {
            let kind = |k: u8| match k {
                0 => EdgeType::Route,
                1 => EdgeType::Transfer,
                _ => EdgeType::Theoretical,
            };
            let ca = a.map(|(k, w)| Cell::new(kind(k), w));
            let cb = b.map(|(k, w)| Cell::new(kind(k), w));
            let merged = merge_edges(ca, cb);

            match (ca, cb) {
                (None, None) => prop_assert!(merged.is_none()),
                _ => {
                    let m = merged.unwrap();
                    let wa = ca.map_or(0.0, |c| c.weight);
                    let wb = cb.map_or(0.0, |c| c.weight);
                    prop_assert_eq!(m.weight, wa.max(wb));
                    let any_transfer = ca.is_some_and(|c| c.is_transfer())
                        || cb.is_some_and(|c| c.is_transfer());
                    let expected = if any_transfer { EdgeType::Transfer } else { EdgeType::Route };
                    prop_assert_eq!(m.kind, expected);
                    prop_assert_eq!(merge_edges(cb, ca), merged);
                }
            }
        }
    }
}
