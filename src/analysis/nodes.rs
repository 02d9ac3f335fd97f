//! Equipotential grouping.
//!
//! Partitions the live terminals into nodes connected by zero-resistance
//! links: healthy or shorted wires, and element-internal paths whose
//! computed resistance is exactly zero. Built as an explicit edge list plus
//! a union-find pass, O(E α(T)); rebuilt from scratch on every analysis
//! pass, never patched incrementally.

use std::collections::HashMap;

use crate::workbench::{ElementId, FaultState, NodeId, TerminalId, WireId, Workbench};

use super::classify;

/// What carries a zero-resistance link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkVia {
    Element(ElementId),
    Wire(WireId),
}

/// One zero-resistance link between two terminals. Retained after grouping
/// so the solver can split a node at an ammeter to recover its branch
/// current.
#[derive(Debug, Clone, Copy)]
pub struct ZeroLink {
    pub a: TerminalId,
    pub b: TerminalId,
    pub via: LinkVia,
}

/// A computed equipotential node.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub terminals: Vec<TerminalId>,
    /// Potential relative to the region reference; NaN while undefined.
    pub potential: f64,
}

/// The node partition of one analysis pass.
#[derive(Debug, Clone)]
pub struct NodeSet {
    /// Terminal arena index -> node, None for dead slots.
    membership: Vec<Option<NodeId>>,
    nodes: Vec<Node>,
    zero_links: Vec<ZeroLink>,
}

impl NodeSet {
    /// Group the workbench's terminals into equipotential nodes.
    pub fn build(bench: &Workbench) -> NodeSet {
        let capacity = bench.terminal_capacity();
        let mut uf = UnionFind::new(capacity);
        let mut zero_links = Vec::new();

        // Element-internal zero-resistance paths. The rheostat's up pair
        // and virtual tap union here, so the tap participates as a single
        // vertex before any wire is considered.
        for element in bench.elements() {
            for link in classify::internal_links(element) {
                if link.resistance != 0.0 {
                    continue;
                }
                let (Some(a), Some(b)) = (
                    element.terminal_by_key(link.a),
                    element.terminal_by_key(link.b),
                ) else {
                    continue;
                };
                uf.union(a.0, b.0);
                zero_links.push(ZeroLink {
                    a,
                    b,
                    via: LinkVia::Element(element.id),
                });
            }
        }

        // Wire links. An Open wire is removed; a Short wire conducts even
        // though it is broken.
        for wire in bench.wires() {
            if wire.fault == FaultState::Open {
                continue;
            }
            let (Some(a), Some(b)) = bench.wire_endpoints(wire.id) else {
                continue;
            };
            uf.union(a.0, b.0);
            zero_links.push(ZeroLink {
                a,
                b,
                via: LinkVia::Wire(wire.id),
            });
        }

        // One node per surviving root, members in arena order.
        let mut membership = vec![None; capacity];
        let mut nodes: Vec<Node> = Vec::new();
        let mut root_to_node: HashMap<usize, NodeId> = HashMap::new();
        for terminal in bench.terminals() {
            let root = uf.find(terminal.id.0);
            let node_id = *root_to_node.entry(root).or_insert_with(|| {
                let id = NodeId(nodes.len());
                nodes.push(Node {
                    id,
                    terminals: Vec::new(),
                    potential: f64::NAN,
                });
                id
            });
            nodes[node_id.0].terminals.push(terminal.id);
            membership[terminal.id.0] = Some(node_id);
        }

        tracing::debug!(
            "grouped {} terminals into {} nodes ({} zero links)",
            membership.iter().flatten().count(),
            nodes.len(),
            zero_links.len()
        );

        NodeSet {
            membership,
            nodes,
            zero_links,
        }
    }

    /// The node a terminal belongs to.
    pub fn node_of(&self, terminal: TerminalId) -> Option<NodeId> {
        self.membership.get(terminal.0).copied().flatten()
    }

    /// Whether two terminals sit at the same potential point.
    pub fn is_equipotential(&self, a: TerminalId, b: TerminalId) -> bool {
        match (self.node_of(a), self.node_of(b)) {
            (Some(na), Some(nb)) => na == nb,
            _ => false,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The zero-resistance links the partition was built from.
    pub fn zero_links(&self) -> &[ZeroLink] {
        &self.zero_links
    }

    /// Potential of the node containing a terminal; NaN when ungrouped or
    /// unsolved.
    pub fn potential_of(&self, terminal: TerminalId) -> f64 {
        self.node_of(terminal)
            .and_then(|n| self.node(n))
            .map(|n| n.potential)
            .unwrap_or(f64::NAN)
    }

    pub(crate) fn set_potential(&mut self, id: NodeId, potential: f64) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.potential = potential;
        }
    }
}

/// Union-find with path compression and union by rank. Shared with the
/// solver's region discovery.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cursor = x;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }
        root
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Battery, ElementKind, Resistor, Rheostat, Switch};
    use crate::workbench::{ElementId, TerminalKey};

    fn terminal(bench: &Workbench, e: ElementId, idx: usize) -> TerminalId {
        bench.element(e).unwrap().terminals[idx]
    }

    #[test]
    fn healthy_wire_merges_endpoints() {
        let mut bench = Workbench::new();
        let r1 = bench
            .add_element(ElementKind::Resistor(Resistor::new(2.0)))
            .unwrap();
        let r2 = bench
            .add_element(ElementKind::Resistor(Resistor::new(4.0)))
            .unwrap();
        bench
            .connect(terminal(&bench, r1, 1), terminal(&bench, r2, 0))
            .unwrap();

        let nodes = NodeSet::build(&bench);
        assert!(nodes.is_equipotential(terminal(&bench, r1, 1), terminal(&bench, r2, 0)));
        // A resistor's own terminals stay apart.
        assert!(!nodes.is_equipotential(terminal(&bench, r1, 0), terminal(&bench, r1, 1)));
    }

    #[test]
    fn open_wire_splits_short_wire_conducts() {
        let mut bench = Workbench::new();
        let r1 = bench
            .add_element(ElementKind::Resistor(Resistor::new(2.0)))
            .unwrap();
        let r2 = bench
            .add_element(ElementKind::Resistor(Resistor::new(4.0)))
            .unwrap();
        let wire = bench
            .connect(terminal(&bench, r1, 1), terminal(&bench, r2, 0))
            .unwrap();

        bench.set_wire_fault(wire, FaultState::Open).unwrap();
        let nodes = NodeSet::build(&bench);
        assert!(!nodes.is_equipotential(terminal(&bench, r1, 1), terminal(&bench, r2, 0)));

        bench.set_wire_fault(wire, FaultState::Short).unwrap();
        let nodes = NodeSet::build(&bench);
        assert!(nodes.is_equipotential(terminal(&bench, r1, 1), terminal(&bench, r2, 0)));
    }

    #[test]
    fn closed_switch_merges_open_switch_splits() {
        let mut bench = Workbench::new();
        let sw = bench
            .add_element(ElementKind::Switch(Switch::new(true)))
            .unwrap();
        let (a, b) = (terminal(&bench, sw, 0), terminal(&bench, sw, 1));

        let nodes = NodeSet::build(&bench);
        assert!(nodes.is_equipotential(a, b));

        bench.set_switch_closed(sw, false).unwrap();
        let nodes = NodeSet::build(&bench);
        assert!(!nodes.is_equipotential(a, b));
    }

    #[test]
    fn battery_poles_never_merge() {
        let mut bench = Workbench::new();
        let bat = bench
            .add_element(ElementKind::Battery(Battery::new(6.0)))
            .unwrap();
        let (neg, pos) = (terminal(&bench, bat, 0), terminal(&bench, bat, 1));

        let nodes = NodeSet::build(&bench);
        assert!(!nodes.is_equipotential(neg, pos));

        bench.set_element_fault(bat, FaultState::Short).unwrap();
        let nodes = NodeSet::build(&bench);
        assert!(!nodes.is_equipotential(neg, pos));
    }

    #[test]
    fn rheostat_tap_is_one_vertex() {
        let mut bench = Workbench::new();
        let rh = bench
            .add_element(ElementKind::Rheostat(Rheostat::new(20.0, 0.5)))
            .unwrap();
        let element = bench.element(rh).unwrap();
        let left_up = element.terminal_by_key(TerminalKey::LeftUp).unwrap();
        let right_up = element.terminal_by_key(TerminalKey::RightUp).unwrap();
        let tap = element.terminal_by_key(TerminalKey::MiddleUp).unwrap();
        let left_down = element.terminal_by_key(TerminalKey::LeftDown).unwrap();

        let nodes = NodeSet::build(&bench);
        assert!(nodes.is_equipotential(left_up, right_up));
        assert!(nodes.is_equipotential(left_up, tap));
        assert!(!nodes.is_equipotential(tap, left_down));
    }

    #[test]
    fn tap_at_extreme_merges_with_end_post() {
        let mut bench = Workbench::new();
        let rh = bench
            .add_element(ElementKind::Rheostat(Rheostat::new(20.0, 0.0)))
            .unwrap();
        let element = bench.element(rh).unwrap();
        let tap = element.terminal_by_key(TerminalKey::MiddleUp).unwrap();
        let left_down = element.terminal_by_key(TerminalKey::LeftDown).unwrap();
        let right_down = element.terminal_by_key(TerminalKey::RightDown).unwrap();

        let nodes = NodeSet::build(&bench);
        assert!(nodes.is_equipotential(tap, left_down));
        assert!(!nodes.is_equipotential(tap, right_down));
    }

    #[test]
    fn short_wire_bypasses_resistor() {
        // R1 between A and B, plus a shorted wire directly from A to B:
        // the two sides of the resistor become one node.
        let mut bench = Workbench::new();
        let r1 = bench
            .add_element(ElementKind::Resistor(Resistor::new(2.0)))
            .unwrap();
        let (a, b) = (terminal(&bench, r1, 0), terminal(&bench, r1, 1));
        let wire = bench.connect(a, b).unwrap();
        bench.set_wire_fault(wire, FaultState::Short).unwrap();

        let nodes = NodeSet::build(&bench);
        assert!(nodes.is_equipotential(a, b));
    }

    #[test]
    fn grouping_is_idempotent() {
        let mut bench = Workbench::new();
        let r1 = bench
            .add_element(ElementKind::Resistor(Resistor::new(2.0)))
            .unwrap();
        let r2 = bench
            .add_element(ElementKind::Resistor(Resistor::new(4.0)))
            .unwrap();
        bench
            .connect(terminal(&bench, r1, 1), terminal(&bench, r2, 0))
            .unwrap();

        let first = NodeSet::build(&bench);
        let second = NodeSet::build(&bench);
        assert_eq!(first.len(), second.len());
        for t in bench.terminals() {
            assert_eq!(first.node_of(t.id), second.node_of(t.id));
        }
    }
}
