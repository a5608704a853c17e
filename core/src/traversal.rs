use std::collections::VecDeque;

use tracing::{debug, info};

use crate::edge::NodeIndex;
use crate::error::Result;
use crate::graph::Graph;
use crate::traverser::{BasicTraverser, TraversalSummary, Traverser};

/// One suspended level of the depth-first recursion.
struct Frame {
    node: NodeIndex,
    parent: Option<NodeIndex>,
    /// Position in `node`'s neighbor list to resume from.
    cursor: usize,
}

/// Depth-first search from `start`, reporting to `traverser`.
///
/// Entering a node through `(parent, node)` reports `visit` then
/// `visit_node`; finishing its subtree reports `leave` on `(node, parent)`.
/// Neighbors are explored in ascending index order and the root gets no
/// edge events. Runs on an explicit frame stack so deep graphs cannot
/// overflow the call stack.
pub fn dfs<T: Traverser + ?Sized>(
    graph: &Graph,
    start: NodeIndex,
    traverser: &mut T,
) -> Result<TraversalSummary> {
    graph.check_node(start)?;

    let mut visited = vec![false; graph.len()];
    let stations_visited = explore(graph, start, &mut visited, traverser);

    let summary = TraversalSummary { stations_visited };
    traverser.summary(&summary);
    Ok(summary)
}

/// Run the DFS body from `start`, marking `visited`. Returns the number of
/// newly discovered nodes.
fn explore<T: Traverser + ?Sized>(
    graph: &Graph,
    start: NodeIndex,
    visited: &mut [bool],
    traverser: &mut T,
) -> usize {
    visited[start] = true;
    traverser.visit_node(start);
    let mut discovered = 1;

    let mut stack = vec![Frame {
        node: start,
        parent: None,
        cursor: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let neighbors = graph.neighbors(frame.node);
        let mut child = None;
        while let Some(&candidate) = neighbors.get(frame.cursor) {
            frame.cursor += 1;
            if !visited[candidate] {
                child = Some(candidate);
                break;
            }
        }

        match child {
            Some(child) => {
                let parent = frame.node;
                visited[child] = true;
                if let Some(edge) = graph.create_edge(parent, child) {
                    traverser.visit(&edge);
                }
                traverser.visit_node(child);
                discovered += 1;
                stack.push(Frame {
                    node: child,
                    parent: Some(parent),
                    cursor: 0,
                });
            }
            None => {
                if let Some(Frame {
                    node,
                    parent: Some(parent),
                    ..
                }) = stack.pop()
                {
                    if let Some(edge) = graph.create_edge(node, parent) {
                        traverser.leave(&edge);
                    }
                }
            }
        }
    }

    discovered
}

/// Partition the graph into connected components.
///
/// Components appear in order of their lowest node index; nodes within a
/// component appear in DFS discovery order.
pub fn connected_components(graph: &Graph) -> Vec<Vec<NodeIndex>> {
    let mut visited = vec![false; graph.len()];
    let mut components = Vec::new();

    for node in 0..graph.len() {
        if visited[node] {
            continue;
        }
        let mut traverser = BasicTraverser::new();
        explore(graph, node, &mut visited, &mut traverser);
        components.push(traverser.visited_nodes);
    }

    components
}

/// Breadth-first search from `start`, reporting to `traverser`.
///
/// The root is reported immediately. Each dequeued node scans its
/// undiscovered neighbors in ascending order, marking each at discovery
/// and reporting `visit` then `visit_node` for it. After every complete
/// queue level the task yields to the scheduler so a long traversal does
/// not starve other work on a single-threaded runtime.
pub async fn bfs<T: Traverser + ?Sized>(
    graph: &Graph,
    start: NodeIndex,
    traverser: &mut T,
) -> Result<TraversalSummary> {
    graph.check_node(start)?;

    let mut visited = vec![false; graph.len()];
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();

    visited[start] = true;
    queue.push_back(start);
    traverser.visit_node(start);
    let mut stations_visited = 1;
    let mut levels = 0u32;

    while !queue.is_empty() {
        for _ in 0..queue.len() {
            let Some(node) = queue.pop_front() else {
                break;
            };
            for &next in graph.neighbors(node) {
                if visited[next] {
                    continue;
                }
                visited[next] = true;
                queue.push_back(next);
                stations_visited += 1;
                if let Some(edge) = graph.create_edge(node, next) {
                    traverser.visit(&edge);
                }
                traverser.visit_node(next);
            }
        }

        levels += 1;
        debug!(level = levels, queued = queue.len(), "bfs level complete");
        tokio::task::yield_now().await;
    }

    info!(stations_visited, levels, "bfs done");

    let summary = TraversalSummary { stations_visited };
    traverser.summary(&summary);
    Ok(summary)
}

/// `bfs`, then hand the summary to `callback` once the traversal completes.
pub async fn bfs_with_callback<T, F>(
    graph: &Graph,
    start: NodeIndex,
    traverser: &mut T,
    callback: F,
) -> Result<TraversalSummary>
where
    T: Traverser + ?Sized,
    F: FnOnce(&TraversalSummary),
{
    let summary = bfs(graph, start, traverser).await?;
    callback(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Edge, EdgeList};
    use crate::error::Error;
    use proptest::prelude::*;

    fn graph(n: usize, pairs: &[(usize, usize)]) -> Graph {
        let edges: EdgeList = pairs.iter().map(|&(a, b)| Edge::route(a, b, 1.0)).collect();
        Graph::without_stops(&edges, n).unwrap()
    }

    /// 0 - 1 - 3
    ///  \
    ///   2       4 (isolated)
    fn tree() -> Graph {
        graph(5, &[(0, 1), (0, 2), (1, 3)])
    }

    fn run_bfs(g: &Graph, start: NodeIndex, t: &mut BasicTraverser) -> Result<TraversalSummary> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(bfs(g, start, t))
    }

    // --- DFS tests ---

    #[test]
    fn test_dfs_event_order() {
        let g = tree();
        let mut t = BasicTraverser::new();
        let summary = dfs(&g, 0, &mut t).unwrap();

        assert_eq!(t.visited_nodes, vec![0, 1, 3, 2]);
        let visited: Vec<(usize, usize)> =
            t.visited_edges.iter().map(|e| (e.origin, e.destination)).collect();
        assert_eq!(visited, vec![(0, 1), (1, 3), (0, 2)]);
        let left: Vec<(usize, usize)> =
            t.left_edges.iter().map(|e| (e.origin, e.destination)).collect();
        assert_eq!(left, vec![(3, 1), (1, 0), (2, 0)]);
        assert_eq!(summary.stations_visited, 4);
        assert_eq!(t.summary, Some(summary));
    }

    #[test]
    fn test_dfs_root_has_no_edge_events() {
        let g = graph(3, &[]);
        let mut t = BasicTraverser::new();
        dfs(&g, 1, &mut t).unwrap();
        assert_eq!(t.visited_nodes, vec![1]);
        assert!(t.visited_edges.is_empty());
        assert!(t.left_edges.is_empty());
    }

    #[test]
    fn test_dfs_without_traverser() {
        let g = tree();
        let summary = dfs(&g, 3, &mut ()).unwrap();
        assert_eq!(summary.stations_visited, 4);
    }

    #[test]
    fn test_dfs_cycle_no_infinite_loop() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let mut t = BasicTraverser::new();
        dfs(&g, 0, &mut t).unwrap();
        assert_eq!(t.visited_nodes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_dfs_deep_chain() {
        let n = 3_000;
        let pairs: Vec<(usize, usize)> = (1..n).map(|i| (i - 1, i)).collect();
        let g = graph(n, &pairs);
        let summary = dfs(&g, 0, &mut ()).unwrap();
        assert_eq!(summary.stations_visited, n);
    }

    #[test]
    fn test_dfs_start_out_of_range() {
        let g = tree();
        assert_eq!(
            dfs(&g, 9, &mut ()).unwrap_err(),
            Error::NodeOutOfRange { node: 9, len: 5 }
        );
    }

    #[test]
    fn test_connected_components() {
        let g = graph(7, &[(0, 3), (3, 5), (1, 2), (6, 2)]);
        assert_eq!(
            connected_components(&g),
            vec![vec![0, 3, 5], vec![1, 2, 6], vec![4]]
        );
    }

    #[test]
    fn test_connected_components_empty_graph() {
        let g = graph(0, &[]);
        assert!(connected_components(&g).is_empty());
    }

    // --- BFS tests ---

    #[tokio::test]
    async fn test_bfs_level_order() {
        let g = tree();
        let mut t = BasicTraverser::new();
        let summary = bfs(&g, 0, &mut t).await.unwrap();
        assert_eq!(t.visited_nodes, vec![0, 1, 2, 3]);
        let visited: Vec<(usize, usize)> =
            t.visited_edges.iter().map(|e| (e.origin, e.destination)).collect();
        assert_eq!(visited, vec![(0, 1), (0, 2), (1, 3)]);
        assert!(t.left_edges.is_empty());
        assert_eq!(summary.stations_visited, 4);
    }

    #[tokio::test]
    async fn test_bfs_reports_each_node_once() {
        // star: the center discovers all leaves in one dequeue
        let g = graph(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
        let mut t = BasicTraverser::new();
        bfs(&g, 0, &mut t).await.unwrap();
        assert_eq!(t.visited_nodes, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_bfs_callback_runs_after_summary() {
        let g = tree();
        let mut t = BasicTraverser::new();
        let mut seen = None;
        bfs_with_callback(&g, 2, &mut t, |s| seen = Some(s.stations_visited))
            .await
            .unwrap();
        assert_eq!(seen, Some(4));
        assert!(t.summary.is_some());
    }

    #[tokio::test]
    async fn test_bfs_start_out_of_range() {
        let g = tree();
        assert!(bfs(&g, 5, &mut ()).await.is_err());
    }

    #[tokio::test]
    async fn test_bfs_interleaves_with_other_tasks() {
        use std::cell::Cell;
        use std::rc::Rc;

        let pairs: Vec<(usize, usize)> = (1..6).map(|i| (i - 1, i)).collect();
        let g = graph(6, &pairs);
        let ticks = Rc::new(Cell::new(0));
        let local = tokio::task::LocalSet::new();

        let counter = Rc::clone(&ticks);
        local.spawn_local(async move {
            loop {
                counter.set(counter.get() + 1);
                tokio::task::yield_now().await;
            }
        });

        let observed = local
            .run_until(async {
                bfs(&g, 0, &mut ()).await.unwrap();
                ticks.get()
            })
            .await;
        // one yield per level of the six-level chain
        assert!(observed >= 6, "other task ran {} times", observed);
    }

    // --- Properties ---

    fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (1usize..20).prop_flat_map(|n| {
            (
                Just(n),
                prop::collection::vec((0..n, 0..n), 0..40),
            )
        })
    }

    /// Component label per node by repeated relaxation, independent of DFS.
    fn reference_components(n: usize, pairs: &[(usize, usize)]) -> Vec<usize> {
        let mut label: Vec<usize> = (0..n).collect();
        let mut changed = true;
        while changed {
            changed = false;
            for &(a, b) in pairs {
                let low = label[a].min(label[b]);
                if label[a] != low || label[b] != low {
                    label[a] = low;
                    label[b] = low;
                    changed = true;
                }
            }
        }
        label
    }

    proptest! {
        #[test]
        fn prop_traversals_visit_exactly_the_component((n, pairs) in arb_graph(), start_seed in 0usize..20) {
            let g = graph(n, &pairs);
            let start = start_seed % n;
            let labels = reference_components(n, &pairs);
            let mut expected: Vec<usize> =
                (0..n).filter(|&v| labels[v] == labels[start]).collect();
            expected.sort_unstable();

            let mut dt = BasicTraverser::new();
            let ds = dfs(&g, start, &mut dt).unwrap();
            let mut dv = dt.visited_nodes.clone();
            dv.sort_unstable();
            prop_assert_eq!(&dv, &expected);
            prop_assert_eq!(ds.stations_visited, expected.len());

            let mut bt = BasicTraverser::new();
            let bs = run_bfs(&g, start, &mut bt).unwrap();
            let mut bv = bt.visited_nodes.clone();
            bv.sort_unstable();
            prop_assert_eq!(&bv, &expected);
            prop_assert_eq!(bs.stations_visited, expected.len());
        }

        #[test]
        fn prop_components_partition_nodes((n, pairs) in arb_graph()) {
            let g = graph(n, &pairs);
            let mut all: Vec<usize> = connected_components(&g).into_iter().flatten().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
        }
    }
}
