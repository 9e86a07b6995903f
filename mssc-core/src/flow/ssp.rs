//! Successive shortest augmenting paths.
//!
//! Adds a super source and a super sink, then repeatedly augments along a
//! cheapest residual path found with a queue-based Bellman-Ford. Costs may be
//! negative as long as the network itself has no negative cycle; every
//! intermediate flow is then optimal for the amount routed so far.

use std::collections::VecDeque;

use super::{FlowError, FlowNetwork, FlowSolution, FlowSolver};

/// Residual edge. Edges are stored in pairs: `e` and its reverse `e ^ 1`.
#[derive(Debug, Clone, Copy)]
struct ResidualEdge {
    head: usize,
    residual: i64,
    cost: f64,
}

/// Default minimum-cost flow backend.
#[derive(Debug, Clone, Default)]
pub struct SuccessiveShortestPaths {
    edges: Vec<ResidualEdge>,
    adjacency: Vec<Vec<usize>>,
    dist: Vec<f64>,
    parent_edge: Vec<Option<usize>>,
    in_queue: Vec<bool>,
}

impl SuccessiveShortestPaths {
    /// Create a solver with empty work buffers.
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, num_nodes: usize) {
        self.edges.clear();
        self.adjacency.clear();
        self.adjacency.resize(num_nodes, Vec::new());
        self.dist.clear();
        self.dist.resize(num_nodes, f64::INFINITY);
        self.parent_edge.clear();
        self.parent_edge.resize(num_nodes, None);
        self.in_queue.clear();
        self.in_queue.resize(num_nodes, false);
    }

    fn push_edge(&mut self, tail: usize, head: usize, capacity: i64, cost: f64) -> usize {
        let id = self.edges.len();
        self.edges.push(ResidualEdge {
            head,
            residual: capacity,
            cost,
        });
        self.adjacency[tail].push(id);
        self.edges.push(ResidualEdge {
            head: tail,
            residual: 0,
            cost: -cost,
        });
        self.adjacency[head].push(id + 1);
        id
    }

    /// Shortest residual path distances from `source`; returns whether `sink` is reachable.
    fn shortest_paths(&mut self, source: usize, sink: usize) -> bool {
        let num_nodes = self.adjacency.len();
        for v in 0..num_nodes {
            self.dist[v] = f64::INFINITY;
            self.parent_edge[v] = None;
            self.in_queue[v] = false;
        }
        self.dist[source] = 0.0;

        let mut queue = VecDeque::with_capacity(num_nodes);
        queue.push_back(source);
        self.in_queue[source] = true;

        // Each node can improve at most |V| times without a negative cycle.
        let mut relaxations_left = num_nodes * num_nodes * 4 + 16;

        while let Some(u) = queue.pop_front() {
            self.in_queue[u] = false;
            let du = self.dist[u];
            for idx in 0..self.adjacency[u].len() {
                let e = self.adjacency[u][idx];
                let edge = self.edges[e];
                if edge.residual <= 0 {
                    continue;
                }
                let candidate = du + edge.cost;
                // Small slack keeps floating-point ties from cycling.
                if candidate < self.dist[edge.head] - 1e-12 {
                    self.dist[edge.head] = candidate;
                    self.parent_edge[edge.head] = Some(e);
                    if !self.in_queue[edge.head] {
                        self.in_queue[edge.head] = true;
                        queue.push_back(edge.head);
                    }
                    relaxations_left = relaxations_left.saturating_sub(1);
                    if relaxations_left == 0 {
                        log::warn!("Shortest path relaxation budget exhausted (negative cycle?)");
                        return self.dist[sink].is_finite();
                    }
                }
            }
        }

        self.dist[sink].is_finite()
    }
}

impl FlowSolver for SuccessiveShortestPaths {
    fn solve(&mut self, network: &FlowNetwork) -> Result<FlowSolution, FlowError> {
        network.validate()?;

        let n = network.num_nodes();
        let source = n;
        let sink = n + 1;
        self.reset(n + 2);

        let arc_edges: Vec<usize> = network
            .arcs()
            .iter()
            .map(|arc| self.push_edge(arc.tail, arc.head, arc.capacity, arc.cost))
            .collect();

        for (node, &supply) in network.supplies().iter().enumerate() {
            if supply > 0 {
                self.push_edge(source, node, supply, 0.0);
            } else if supply < 0 {
                self.push_edge(node, sink, -supply, 0.0);
            }
        }

        let required = network.total_supply();
        let mut routed = 0;
        let mut cost = 0.0;
        let mut augmentations = 0;

        while routed < required {
            if !self.shortest_paths(source, sink) {
                break;
            }

            // Bottleneck along the path.
            let mut bottleneck = required - routed;
            let mut v = sink;
            while let Some(e) = self.parent_edge[v] {
                bottleneck = bottleneck.min(self.edges[e].residual);
                v = self.edges[e ^ 1].head;
            }

            let mut v = sink;
            while let Some(e) = self.parent_edge[v] {
                self.edges[e].residual -= bottleneck;
                self.edges[e ^ 1].residual += bottleneck;
                cost += bottleneck as f64 * self.edges[e].cost;
                v = self.edges[e ^ 1].head;
            }

            routed += bottleneck;
            augmentations += 1;
        }

        if routed < required {
            return Err(FlowError::Infeasible { routed, required });
        }

        let arc_flow = network
            .arcs()
            .iter()
            .zip(arc_edges.iter())
            .map(|(arc, &e)| arc.capacity - self.edges[e].residual)
            .collect();

        Ok(FlowSolution {
            cost,
            arc_flow,
            augmentations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two workers, two jobs; the cheap diagonal is not the greedy choice.
    #[test]
    fn test_assignment() {
        let mut net = FlowNetwork::new();
        let w0 = net.add_node(1);
        let w1 = net.add_node(1);
        let j0 = net.add_node(-1);
        let j1 = net.add_node(-1);

        let a00 = net.add_arc(w0, j0, 1, 1.0).unwrap();
        let a01 = net.add_arc(w0, j1, 1, 2.0).unwrap();
        let a10 = net.add_arc(w1, j0, 1, 1.5).unwrap();
        let a11 = net.add_arc(w1, j1, 1, 10.0).unwrap();

        let sol = SuccessiveShortestPaths::new().solve(&net).unwrap();

        // w0 -> j1 and w1 -> j0: 2.0 + 1.5 = 3.5 beats 1.0 + 10.0.
        assert!((sol.cost - 3.5).abs() < 1e-12);
        assert_eq!(sol.flow(a00), 0);
        assert_eq!(sol.flow(a01), 1);
        assert_eq!(sol.flow(a10), 1);
        assert_eq!(sol.flow(a11), 0);
    }

    #[test]
    fn test_capacity_limits() {
        // Three units through a hub with a cheap capped route and an expensive open one.
        let mut net = FlowNetwork::new();
        let s = net.add_node(3);
        let hub = net.add_node(0);
        let t = net.add_node(-3);

        net.add_arc(s, hub, 3, 0.0).unwrap();
        let cheap = net.add_arc(hub, t, 2, 1.0).unwrap();
        let dear = net.add_arc(hub, t, 5, 4.0).unwrap();

        let sol = SuccessiveShortestPaths::new().solve(&net).unwrap();
        assert_eq!(sol.flow(cheap), 2);
        assert_eq!(sol.flow(dear), 1);
        assert!((sol.cost - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_infeasible() {
        let mut net = FlowNetwork::new();
        let s = net.add_node(2);
        let t = net.add_node(-2);
        net.add_arc(s, t, 1, 0.0).unwrap();

        let err = SuccessiveShortestPaths::new().solve(&net).unwrap_err();
        assert_eq!(
            err,
            FlowError::Infeasible {
                routed: 1,
                required: 2
            }
        );
    }

    #[test]
    fn test_reuse_solver() {
        let mut solver = SuccessiveShortestPaths::new();

        let mut net = FlowNetwork::new();
        let s = net.add_node(1);
        let t = net.add_node(-1);
        net.add_arc(s, t, 1, 3.0).unwrap();
        assert!((solver.solve(&net).unwrap().cost - 3.0).abs() < 1e-12);

        let mut net = FlowNetwork::new();
        let s = net.add_node(1);
        let t = net.add_node(-1);
        net.add_arc(s, t, 1, 0.5).unwrap();
        assert!((solver.solve(&net).unwrap().cost - 0.5).abs() < 1e-12);
    }
}
