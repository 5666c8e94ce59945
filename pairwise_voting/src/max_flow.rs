//! Maximum flow over a dense network with real-valued capacities.
//!
//! This is the Edmonds-Karp variant of the Ford-Fulkerson method: each
//! augmenting path is a shortest path (by number of edges) in the residual
//! network, found by breadth-first search. It terminates in O(V E^2)
//! augmentations regardless of the capacities.

use std::collections::VecDeque;

/// Residual capacities at or below this value are treated as saturated.
pub const RESIDUAL_EPSILON: f64 = 1e-9;

/// A capacitated directed graph over the nodes `0..num_nodes`.
///
/// Capacities may be `f64::INFINITY` for pass-through edges.
#[derive(PartialEq, Debug, Clone)]
pub struct FlowNetwork {
    capacity: Vec<Vec<f64>>,
}

impl FlowNetwork {
    pub fn new(num_nodes: usize) -> FlowNetwork {
        FlowNetwork {
            capacity: vec![vec![0.0; num_nodes]; num_nodes],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.capacity.len()
    }

    /// Sets the capacity of the edge. Negative capacities are clamped to zero.
    pub fn set_capacity(&mut self, from: usize, to: usize, capacity: f64) {
        self.capacity[from][to] = capacity.max(0.0);
    }

    pub fn capacity(&self, from: usize, to: usize) -> f64 {
        self.capacity[from][to]
    }

    /// The value of a maximum flow from `source` to `sink`.
    pub fn max_flow(&self, source: usize, sink: usize) -> f64 {
        let n = self.num_nodes();
        if source == sink {
            return 0.0;
        }
        // flow[u][v] = -flow[v][u]; the residual capacity is capacity - flow.
        let mut flow = vec![vec![0.0; n]; n];
        while let Some(path) = self.augmenting_path(&flow, source, sink) {
            let bottleneck = path
                .iter()
                .map(|&(u, v)| self.capacity[u][v] - flow[u][v])
                .fold(f64::INFINITY, f64::min);
            if bottleneck.is_infinite() {
                return f64::INFINITY;
            }
            for &(u, v) in path.iter() {
                flow[u][v] += bottleneck;
                flow[v][u] -= bottleneck;
            }
        }
        flow[source].iter().sum()
    }

    // Breadth-first search restricted to the edges with a positive residual capacity.
    fn augmenting_path(
        &self,
        flow: &[Vec<f64>],
        source: usize,
        sink: usize,
    ) -> Option<Vec<(usize, usize)>> {
        let n = self.num_nodes();
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut visited = vec![false; n];
        visited[source] = true;
        let mut queue = VecDeque::from([source]);
        while let Some(u) = queue.pop_front() {
            for v in 0..n {
                if !visited[v] && self.capacity[u][v] - flow[u][v] > RESIDUAL_EPSILON {
                    visited[v] = true;
                    parent[v] = Some(u);
                    if v == sink {
                        return Some(path_to(&parent, sink));
                    }
                    queue.push_back(v);
                }
            }
        }
        None
    }
}

fn path_to(parent: &[Option<usize>], sink: usize) -> Vec<(usize, usize)> {
    let mut path: Vec<(usize, usize)> = Vec::new();
    let mut v = sink;
    while let Some(u) = parent[v] {
        path.push((u, v));
        v = u;
    }
    path.reverse();
    path
}
