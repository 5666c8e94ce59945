//! Weighted directed graphs and the reductions used by the Condorcet methods.
//!
//! Nodes live in an arena and are referred to by their index. The edges are
//! kept in an ordered map so that every traversal is deterministic.

use log::debug;

use std::collections::{BTreeMap, BTreeSet};

pub type NodeId = usize;

#[derive(PartialEq, Debug, Clone)]
pub struct DiGraph<N> {
    nodes: Vec<N>,
    ids: BTreeMap<N, NodeId>,
    alive: Vec<bool>,
    edges: BTreeMap<(NodeId, NodeId), f64>,
}

impl<N: Ord + Clone> Default for DiGraph<N> {
    fn default() -> Self {
        DiGraph::new()
    }
}

impl<N: Ord + Clone> DiGraph<N> {
    pub fn new() -> DiGraph<N> {
        DiGraph {
            nodes: Vec::new(),
            ids: BTreeMap::new(),
            alive: Vec::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Adds the node if it is not present yet, and returns its id.
    pub fn add_node(&mut self, node: N) -> NodeId {
        if let Some(id) = self.ids.get(&node) {
            self.alive[*id] = true;
            return *id;
        }
        let id = self.nodes.len();
        self.nodes.push(node.clone());
        self.ids.insert(node, id);
        self.alive.push(true);
        id
    }

    pub fn node_id(&self, node: &N) -> Option<NodeId> {
        self.ids.get(node).filter(|id| self.alive[**id]).cloned()
    }

    pub fn node(&self, id: NodeId) -> &N {
        &self.nodes[id]
    }

    /// The ids of the nodes still in the graph, in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        (0..self.nodes.len()).filter(|id| self.alive[*id]).collect()
    }

    pub fn remove_node(&mut self, id: NodeId) {
        self.alive[id] = false;
        self.edges.retain(|(u, v), _| *u != id && *v != id);
    }

    /// Adds or replaces the edge.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, weight: f64) {
        debug_assert!(self.alive[from] && self.alive[to]);
        self.edges.insert((from, to), weight);
    }

    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> Option<f64> {
        self.edges.remove(&(from, to))
    }

    pub fn edge_weight(&self, from: NodeId, to: NodeId) -> Option<f64> {
        self.edges.get(&(from, to)).cloned()
    }

    pub fn edges(&self) -> Vec<(NodeId, NodeId, f64)> {
        self.edges.iter().map(|((u, v), w)| (*u, *v, *w)).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .range((id, 0)..(id + 1, 0))
            .map(|((_, v), _)| *v)
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.edges.keys().filter(|(_, v)| *v == id).count()
    }

    /// True if a directed path leads from `from` to `to`.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(u) = stack.pop() {
            if u == to {
                return true;
            }
            if seen.insert(u) {
                stack.extend(self.successors(u));
            }
        }
        false
    }

    pub fn has_cycle(&self) -> bool {
        self.strongly_connected_components()
            .iter()
            .any(|scc| scc.len() > 1)
            || self.edges.keys().any(|(u, v)| u == v)
    }

    /// Tarjan's algorithm. The components are listed in reverse topological
    /// order, each component in the order its nodes were completed.
    pub fn strongly_connected_components(&self) -> Vec<Vec<NodeId>> {
        let n = self.nodes.len();
        let mut state = Tarjan {
            index: 0,
            indices: vec![usize::MAX; n],
            lowlink: vec![usize::MAX; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            components: Vec::new(),
        };
        for v in self.node_ids() {
            if state.indices[v] == usize::MAX {
                self.strong_connect(v, &mut state);
            }
        }
        state.components
    }

    // Depth-first search with an explicit stack of (node, successors, next
    // successor), so that long paths do not exhaust the call stack.
    fn strong_connect(&self, root: NodeId, st: &mut Tarjan) {
        st.visit(root);
        let mut calls: Vec<(NodeId, Vec<NodeId>, usize)> =
            vec![(root, self.successors(root).collect(), 0)];
        while let Some((v, next)) = calls.last_mut().map(|frame| {
            let next = frame.1.get(frame.2).cloned();
            frame.2 += 1;
            (frame.0, next)
        }) {
            match next {
                Some(w) if st.indices[w] == usize::MAX => {
                    st.visit(w);
                    calls.push((w, self.successors(w).collect(), 0));
                }
                Some(w) => {
                    if st.on_stack[w] {
                        st.lowlink[v] = st.lowlink[v].min(st.indices[w]);
                    }
                }
                None => {
                    calls.pop();
                    if let Some((parent, _, _)) = calls.last() {
                        st.lowlink[*parent] = st.lowlink[*parent].min(st.lowlink[v]);
                    }
                    if st.lowlink[v] == st.indices[v] {
                        let mut component = Vec::new();
                        while let Some(w) = st.stack.pop() {
                            st.on_stack[w] = false;
                            component.push(w);
                            if w == v {
                                break;
                            }
                        }
                        st.components.push(component);
                    }
                }
            }
        }
    }
}

struct Tarjan {
    index: usize,
    indices: Vec<usize>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<NodeId>,
    components: Vec<Vec<NodeId>>,
}

impl Tarjan {
    fn visit(&mut self, v: NodeId) {
        self.indices[v] = self.index;
        self.lowlink[v] = self.index;
        self.index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
    }
}

/// For each pair of opposite edges, only keeps the heavier one. Both are
/// removed when their weights are within `tolerance` of each other.
pub fn remove_weak_edges<N: Ord + Clone>(graph: &mut DiGraph<N>, tolerance: f64) {
    for (u, v, w) in graph.edges() {
        if u >= v {
            continue;
        }
        if let Some(w_back) = graph.edge_weight(v, u) {
            if (w - w_back).abs() <= tolerance {
                graph.remove_edge(u, v);
                graph.remove_edge(v, u);
            } else if w > w_back {
                graph.remove_edge(v, u);
            } else {
                graph.remove_edge(u, v);
            }
        }
    }
}

/// One step of [schwartz_set_heuristic].
#[derive(PartialEq, Debug, Clone)]
pub enum GraphAction {
    Nodes(Vec<NodeId>),
    Edges {
        weight: f64,
        edges: Vec<(NodeId, NodeId)>,
    },
}

/// Reduces the graph to its Schwartz set.
///
/// As long as edges remain: the nodes that can be reached from another node
/// but cannot reach it back are removed. If there is none, all the edges of
/// minimal weight (up to `tolerance`) are removed instead. The nodes left in
/// the graph are the undominated ones.
pub fn schwartz_set_heuristic<N: Ord + Clone>(
    graph: &mut DiGraph<N>,
    tolerance: f64,
) -> Vec<GraphAction> {
    let mut actions: Vec<GraphAction> = Vec::new();
    while graph.edge_count() > 0 {
        let sccs = graph.strongly_connected_components();
        let mut component_of: BTreeMap<NodeId, usize> = BTreeMap::new();
        for (idx, scc) in sccs.iter().enumerate() {
            for v in scc.iter() {
                component_of.insert(*v, idx);
            }
        }
        // A node is dominated if its component can be entered from outside.
        let entered: BTreeSet<usize> = graph
            .edges()
            .iter()
            .filter(|(u, v, _)| component_of[u] != component_of[v])
            .map(|(_, v, _)| component_of[v])
            .collect();
        let dominated: Vec<NodeId> = graph
            .node_ids()
            .into_iter()
            .filter(|v| entered.contains(&component_of[v]))
            .collect();

        if !dominated.is_empty() {
            debug!("schwartz_set_heuristic: removing nodes {:?}", dominated);
            for v in dominated.iter() {
                graph.remove_node(*v);
            }
            actions.push(GraphAction::Nodes(dominated));
        } else {
            let weight = graph
                .edges()
                .iter()
                .map(|(_, _, w)| *w)
                .fold(f64::INFINITY, f64::min);
            let weakest: Vec<(NodeId, NodeId)> = graph
                .edges()
                .iter()
                .filter(|(_, _, w)| *w - weight <= tolerance)
                .map(|(u, v, _)| (*u, *v))
                .collect();
            debug!(
                "schwartz_set_heuristic: removing edges {:?} (weight {})",
                weakest, weight
            );
            for (u, v) in weakest.iter() {
                graph.remove_edge(*u, *v);
            }
            actions.push(GraphAction::Edges {
                weight,
                edges: weakest,
            });
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(n: usize, edges: &[(usize, usize, f64)]) -> DiGraph<usize> {
        let mut g = DiGraph::new();
        for i in 0..n {
            g.add_node(i);
        }
        for &(u, v, w) in edges {
            g.add_edge(u, v, w);
        }
        g
    }

    #[test]
    fn reachability_follows_paths() {
        let g = graph(4, &[(0, 1, 1.0), (1, 2, 1.0)]);
        assert!(g.reaches(0, 2));
        assert!(!g.reaches(2, 0));
        assert!(!g.reaches(0, 3));
        assert!(!g.has_cycle());
    }

    #[test]
    fn cycle_detection() {
        let g = graph(3, &[(0, 1, 1.0), (1, 2, 1.0), (2, 0, 1.0)]);
        assert!(g.has_cycle());
        assert_eq!(g.strongly_connected_components().len(), 1);
    }

    #[test]
    fn components_in_reverse_topological_order() {
        // {0, 1} -> {2, 3} -> 4
        let g = graph(
            5,
            &[(0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 2, 1.0), (3, 4, 1.0)],
        );
        assert_eq!(
            g.strongly_connected_components(),
            vec![vec![4], vec![3, 2], vec![1, 0]]
        );
    }

    #[test]
    fn long_paths() {
        let n = 200_000;
        let chain: Vec<(usize, usize, f64)> = (0..n - 1).map(|i| (i, i + 1, 1.0)).collect();
        let mut g = graph(n, &chain);
        assert_eq!(g.strongly_connected_components().len(), n);
        assert!(!g.has_cycle());
        g.add_edge(n - 1, 0, 1.0);
        assert_eq!(g.strongly_connected_components().len(), 1);
        assert!(g.has_cycle());
    }

    #[test]
    fn removing_node_drops_edges() {
        let mut g = graph(3, &[(0, 1, 1.0), (1, 2, 1.0)]);
        g.remove_node(1);
        assert_eq!(g.node_ids(), vec![0, 2]);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_id(&1), None);
        assert_eq!(g.in_degree(2), 0);
    }

    #[test]
    fn weak_edges() {
        let mut g = graph(
            3,
            &[
                (0, 1, 3.0),
                (1, 0, 2.0),
                (1, 2, 1.0),
                (2, 1, 4.0),
                (0, 2, 5.0),
                (2, 0, 5.0),
            ],
        );
        remove_weak_edges(&mut g, 1e-9);
        assert_eq!(g.edges(), vec![(0, 1, 3.0), (2, 1, 4.0)]);
    }

    #[test]
    fn schwartz_removes_dominated_nodes() {
        // 0 beats 1 and 2, 1 beats 2.
        let mut g = graph(3, &[(0, 1, 1.0), (0, 2, 1.0), (1, 2, 1.0)]);
        let actions = schwartz_set_heuristic(&mut g, 1e-9);
        assert_eq!(actions, vec![GraphAction::Nodes(vec![1, 2])]);
        assert_eq!(g.node_ids(), vec![0]);
    }

    #[test]
    fn schwartz_breaks_cycle_at_weakest_edge() {
        // Cycle 0 -> 1 -> 2 -> 0, the edge 2 -> 0 is the weakest.
        let mut g = graph(3, &[(0, 1, 3.0), (1, 2, 2.0), (2, 0, 1.0)]);
        let actions = schwartz_set_heuristic(&mut g, 1e-9);
        assert_eq!(
            actions,
            vec![
                GraphAction::Edges {
                    weight: 1.0,
                    edges: vec![(2, 0)]
                },
                GraphAction::Nodes(vec![1, 2]),
            ]
        );
        assert_eq!(g.node_ids(), vec![0]);
    }

    #[test]
    fn schwartz_keeps_ties() {
        let mut g = graph(3, &[(0, 2, 1.0), (1, 2, 1.0)]);
        schwartz_set_heuristic(&mut g, 1e-9);
        assert_eq!(g.node_ids(), vec![0, 1]);
    }
}
