//! Flow network description.

use super::FlowError;

/// Arc identifier (index into the network's arc list).
pub type ArcId = usize;

/// A directed arc with integer capacity and real cost per unit of flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    /// Tail node.
    pub tail: usize,
    /// Head node.
    pub head: usize,
    /// Maximum flow (lower bound is always zero).
    pub capacity: i64,
    /// Cost per unit of flow.
    pub cost: f64,
}

/// Minimum-cost flow problem: nodes with supplies and capacitated arcs.
///
/// Positive supply marks a source, negative supply a sink. Supplies must
/// balance for a flow to exist.
#[derive(Debug, Clone, Default)]
pub struct FlowNetwork {
    supplies: Vec<i64>,
    arcs: Vec<Arc>,
}

impl FlowNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a network with `num_nodes` nodes of zero supply.
    pub fn with_nodes(num_nodes: usize) -> Self {
        Self {
            supplies: vec![0; num_nodes],
            arcs: Vec::new(),
        }
    }

    /// Add a node and return its index.
    pub fn add_node(&mut self, supply: i64) -> usize {
        self.supplies.push(supply);
        self.supplies.len() - 1
    }

    /// Set the supply of an existing node.
    pub fn set_supply(&mut self, node: usize, supply: i64) {
        self.supplies[node] = supply;
    }

    /// Add an arc and return its identifier.
    pub fn add_arc(
        &mut self,
        tail: usize,
        head: usize,
        capacity: i64,
        cost: f64,
    ) -> Result<ArcId, FlowError> {
        let n = self.supplies.len();
        if tail >= n || head >= n {
            return Err(FlowError::InvalidArc(format!(
                "arc ({}, {}) references a node outside 0..{}",
                tail, head, n
            )));
        }
        if capacity < 0 {
            return Err(FlowError::InvalidArc(format!(
                "arc ({}, {}) has negative capacity {}",
                tail, head, capacity
            )));
        }
        if !cost.is_finite() {
            return Err(FlowError::InvalidArc(format!(
                "arc ({}, {}) has non-finite cost",
                tail, head
            )));
        }
        self.arcs.push(Arc {
            tail,
            head,
            capacity,
            cost,
        });
        Ok(self.arcs.len() - 1)
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.supplies.len()
    }

    /// Number of arcs.
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Node supplies.
    pub fn supplies(&self) -> &[i64] {
        &self.supplies
    }

    /// Arcs in insertion order.
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    /// Total positive supply.
    pub fn total_supply(&self) -> i64 {
        self.supplies.iter().filter(|&&s| s > 0).sum()
    }

    /// Check that supplies balance.
    pub fn validate(&self) -> Result<(), FlowError> {
        let balance: i64 = self.supplies.iter().sum();
        if balance != 0 {
            return Err(FlowError::Unbalanced(balance));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_network() {
        let mut net = FlowNetwork::new();
        let s = net.add_node(2);
        let t = net.add_node(-2);
        let a = net.add_arc(s, t, 2, 1.5).unwrap();

        assert_eq!(net.num_nodes(), 2);
        assert_eq!(net.num_arcs(), 1);
        assert_eq!(net.arcs()[a].cost, 1.5);
        assert_eq!(net.total_supply(), 2);
        assert!(net.validate().is_ok());
    }

    #[test]
    fn test_invalid_arcs() {
        let mut net = FlowNetwork::with_nodes(2);
        assert!(net.add_arc(0, 5, 1, 0.0).is_err());
        assert!(net.add_arc(0, 1, -1, 0.0).is_err());
        assert!(net.add_arc(0, 1, 1, f64::INFINITY).is_err());
    }

    #[test]
    fn test_unbalanced() {
        let mut net = FlowNetwork::with_nodes(2);
        net.set_supply(0, 3);
        net.set_supply(1, -2);
        assert_eq!(net.validate(), Err(FlowError::Unbalanced(1)));
    }
}
