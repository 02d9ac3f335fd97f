//! The network solver.
//!
//! One full pass over the workbench: group terminals into equipotential
//! nodes, discover the battery regions, fold each region's resistive
//! network, and distribute potentials, branch currents, meter readings,
//! polarities and work states back onto the graph. Rerun in full after
//! every structural or state change; the pass is a pure function of the
//! current graph and therefore idempotent.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::components::{Element, ElementKind};
use crate::workbench::{
    ElementId, FaultState, FlowDirection, NodeId, Polarity, TerminalId, TerminalKey, Workbench,
    WorkState,
};

use super::nodes::{LinkVia, NodeSet, UnionFind};
use super::paths::{self, PathVia};
use super::reduce::{self, BranchEdge, Reduction};
use super::CURRENT_EPSILON;

/// How one battery's region resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionOutcome {
    /// A series/parallel network joins the battery poles.
    Solved {
        total_resistance: f64,
        current: f64,
    },
    /// No conducting path between the poles: current is zero, unreached
    /// nodes keep undefined potential. Not an error.
    Open,
    /// The poles collapsed into one node: an unbounded current flows
    /// through the zero-resistance loop and every resistive branch is
    /// bypassed. Not an error.
    ShortCircuit,
    /// More than one battery, or a mesh that series/parallel combination
    /// cannot fold. The region is skipped; independent regions still
    /// solve.
    Unsupported,
}

/// Analysis result for one battery.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub battery: ElementId,
    pub outcome: RegionOutcome,
}

/// One solved resistive branch with its signed current
/// (positive from `terminal_a` to `terminal_b`).
#[derive(Debug, Clone, Copy)]
pub struct SolvedBranch {
    pub element: ElementId,
    pub terminal_a: TerminalId,
    pub terminal_b: TerminalId,
    pub current: f64,
}

/// The read-only result of one analysis pass.
#[derive(Debug)]
pub struct Analysis {
    nodes: NodeSet,
    branches: Vec<SolvedBranch>,
    element_currents: HashMap<ElementId, f64>,
    meter_readings: HashMap<ElementId, f64>,
    regions: Vec<Region>,
}

impl Analysis {
    /// The node partition of this pass.
    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn node_of(&self, terminal: TerminalId) -> Option<NodeId> {
        self.nodes.node_of(terminal)
    }

    pub fn is_equipotential(&self, a: TerminalId, b: TerminalId) -> bool {
        self.nodes.is_equipotential(a, b)
    }

    /// Potential of the node holding a terminal; NaN while undefined.
    pub fn potential(&self, terminal: TerminalId) -> f64 {
        self.nodes.potential_of(terminal)
    }

    /// Signed branch current through an element, where defined. For the
    /// rheostat this is the current of its more heavily loaded segment;
    /// see [`Analysis::branches`] for the per-segment values.
    pub fn branch_current(&self, element: ElementId) -> Option<f64> {
        self.element_currents.get(&element).copied()
    }

    /// Ammeter or voltmeter reading. NaN marks an undefined reading
    /// (meter in an unsolved region); infinity marks a pegged ammeter in
    /// a short-circuit loop.
    pub fn meter_reading(&self, element: ElementId) -> Option<f64> {
        self.meter_readings.get(&element).copied()
    }

    /// Every solved resistive branch with its current.
    pub fn branches(&self) -> &[SolvedBranch] {
        &self.branches
    }

    /// Per-battery region outcomes, in battery id order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

struct Source {
    element: ElementId,
    voltage: f64,
    neg_terminal: TerminalId,
    pos_terminal: TerminalId,
    neg_node: NodeId,
    pos_node: NodeId,
}

/// Run one full analysis pass, writing potentials, polarities, directions
/// and work states back onto the workbench.
pub fn analyze(bench: &mut Workbench) -> Analysis {
    reset(bench);
    let mut nodes = NodeSet::build(bench);

    // Resistive edges of the reduced node graph. Zero-resistance links are
    // already folded into the nodes themselves.
    let mut edges: Vec<BranchEdge> = Vec::new();
    for path in paths::enumerate_paths(bench) {
        let PathVia::Element(element) = path.via else {
            continue;
        };
        if path.resistance <= 0.0 {
            continue;
        }
        let (Some(a), Some(b)) = (nodes.node_of(path.from), nodes.node_of(path.to)) else {
            continue;
        };
        edges.push(BranchEdge {
            element,
            a,
            b,
            terminal_a: path.from,
            terminal_b: path.to,
            resistance: path.resistance,
        });
    }

    // Healthy batteries. A faulted battery is a dead source: an Open one
    // breaks the loop, a Short one still refuses to conduct internally
    // (the EMF path is not a conductor).
    let sources: Vec<Source> = bench
        .elements()
        .filter_map(|element| {
            let ElementKind::Battery(battery) = &element.kind else {
                return None;
            };
            if element.fault != FaultState::None {
                return None;
            }
            let neg_terminal = element.terminal_by_key(TerminalKey::Left)?;
            let pos_terminal = element.terminal_by_key(TerminalKey::Right)?;
            Some(Source {
                element: element.id,
                voltage: battery.voltage,
                neg_terminal,
                pos_terminal,
                neg_node: nodes.node_of(neg_terminal)?,
                pos_node: nodes.node_of(pos_terminal)?,
            })
        })
        .collect();

    // Region discovery: connected components of the node graph under
    // resistive edges plus battery EMF edges.
    let mut uf = UnionFind::new(nodes.len());
    for edge in &edges {
        uf.union(edge.a.0, edge.b.0);
    }
    for source in &sources {
        uf.union(source.neg_node.0, source.pos_node.0);
    }
    let root_of_node: Vec<usize> = (0..nodes.len()).map(|i| uf.find(i)).collect();

    let mut sources_by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, source) in sources.iter().enumerate() {
        sources_by_root
            .entry(root_of_node[source.neg_node.0])
            .or_default()
            .push(index);
    }

    let mut branches: Vec<SolvedBranch> = Vec::new();
    let mut element_currents: HashMap<ElementId, f64> = HashMap::new();
    let mut regions: Vec<Region> = Vec::new();
    let mut solved_sources: Vec<(TerminalId, TerminalId, f64)> = Vec::new();
    let mut unsupported_roots: HashSet<usize> = HashSet::new();

    for (root, source_indices) in &sources_by_root {
        if source_indices.len() > 1 {
            // Multi-source region: out of scope for a single-EMF solver.
            tracing::debug!(
                "region with {} batteries is unsupported",
                source_indices.len()
            );
            unsupported_roots.insert(*root);
            for &index in source_indices {
                regions.push(Region {
                    battery: sources[index].element,
                    outcome: RegionOutcome::Unsupported,
                });
            }
            continue;
        }

        let source = &sources[source_indices[0]];
        let region_edge_indices: Vec<usize> = edges
            .iter()
            .enumerate()
            .filter(|(_, e)| root_of_node[e.a.0] == *root)
            .map(|(i, _)| i)
            .collect();
        let local: Vec<BranchEdge> = region_edge_indices
            .iter()
            .map(|&i| edges[i].clone())
            .collect();

        if source.pos_node == source.neg_node {
            // The poles merged through a zero-resistance chain: short
            // circuit. Every resistive branch is bypassed and the whole
            // region sits at the reference potential.
            for (index, &node_root) in root_of_node.iter().enumerate() {
                if node_root == *root {
                    nodes.set_potential(NodeId(index), 0.0);
                }
            }
            for &i in &region_edge_indices {
                let edge = &edges[i];
                branches.push(SolvedBranch {
                    element: edge.element,
                    terminal_a: edge.terminal_a,
                    terminal_b: edge.terminal_b,
                    current: 0.0,
                });
                element_currents.entry(edge.element).or_insert(0.0);
            }
            element_currents.insert(source.element, f64::INFINITY);
            solved_sources.push((source.pos_terminal, source.neg_terminal, f64::INFINITY));
            regions.push(Region {
                battery: source.element,
                outcome: RegionOutcome::ShortCircuit,
            });
            tracing::debug!("battery {} is short-circuited", source.element);
            continue;
        }

        match reduce::reduce(&local, source.pos_node, source.neg_node) {
            Reduction::NoPath => {
                // Open circuit: reference pinned, everything else stays
                // undefined, zero current everywhere.
                nodes.set_potential(source.neg_node, 0.0);
                for &i in &region_edge_indices {
                    let edge = &edges[i];
                    branches.push(SolvedBranch {
                        element: edge.element,
                        terminal_a: edge.terminal_a,
                        terminal_b: edge.terminal_b,
                        current: 0.0,
                    });
                    element_currents.entry(edge.element).or_insert(0.0);
                }
                element_currents.insert(source.element, 0.0);
                solved_sources.push((source.pos_terminal, source.neg_terminal, 0.0));
                regions.push(Region {
                    battery: source.element,
                    outcome: RegionOutcome::Open,
                });
            }
            Reduction::Irreducible => {
                tracing::debug!(
                    "region of battery {} is not series/parallel reducible",
                    source.element
                );
                unsupported_roots.insert(*root);
                regions.push(Region {
                    battery: source.element,
                    outcome: RegionOutcome::Unsupported,
                });
            }
            Reduction::Reduced(network) => {
                let current = source.voltage / network.total_resistance;
                let distribution = network.distribute(&local, source.voltage, 0.0);
                for (node, potential) in &distribution.potentials {
                    nodes.set_potential(*node, *potential);
                }

                // Idle branches carry no current, so both their ends sit
                // at the same potential: propagate outward to fixpoint.
                loop {
                    let mut changed = false;
                    for &idle in network.idle_edges() {
                        let edge = &local[idle];
                        let va = nodes.node(edge.a).map_or(f64::NAN, |n| n.potential);
                        let vb = nodes.node(edge.b).map_or(f64::NAN, |n| n.potential);
                        if va.is_finite() && !vb.is_finite() {
                            nodes.set_potential(edge.b, va);
                            changed = true;
                        } else if vb.is_finite() && !va.is_finite() {
                            nodes.set_potential(edge.a, vb);
                            changed = true;
                        }
                    }
                    if !changed {
                        break;
                    }
                }

                for (local_index, &global_index) in region_edge_indices.iter().enumerate() {
                    let edge = &edges[global_index];
                    let branch_current = distribution.currents[local_index];
                    branches.push(SolvedBranch {
                        element: edge.element,
                        terminal_a: edge.terminal_a,
                        terminal_b: edge.terminal_b,
                        current: branch_current,
                    });
                    let entry = element_currents.entry(edge.element).or_insert(0.0);
                    if branch_current.abs() > entry.abs() {
                        *entry = branch_current;
                    }
                }
                element_currents.insert(source.element, current);
                solved_sources.push((source.pos_terminal, source.neg_terminal, current));
                regions.push(Region {
                    battery: source.element,
                    outcome: RegionOutcome::Solved {
                        total_resistance: network.total_resistance,
                        current,
                    },
                });
                tracing::debug!(
                    "battery {} drives {:.6} A through {:.6} ohm",
                    source.element,
                    current,
                    network.total_resistance
                );
            }
        }
    }
    regions.sort_by_key(|r| r.battery);

    // Meter readings, derived from the solved state.
    let mut meter_readings: HashMap<ElementId, f64> = HashMap::new();
    for element in bench.elements() {
        match &element.kind {
            ElementKind::Ammeter(_) => {
                let reading = ammeter_reading(
                    &nodes,
                    &branches,
                    &solved_sources,
                    &root_of_node,
                    &unsupported_roots,
                    element,
                );
                meter_readings.insert(element.id, reading);
            }
            ElementKind::Voltmeter(_) => {
                let reading = match (
                    element.terminal_by_key(TerminalKey::Left),
                    element.terminal_by_key(TerminalKey::Right),
                ) {
                    (Some(left), Some(right)) => {
                        nodes.potential_of(left) - nodes.potential_of(right)
                    }
                    _ => f64::NAN,
                };
                meter_readings.insert(element.id, reading);
            }
            _ => {}
        }
    }
    for (&element, &reading) in &meter_readings {
        if bench.element(element).is_some_and(|e| matches!(e.kind, ElementKind::Ammeter(_))) {
            element_currents.insert(element, reading);
        }
    }

    write_back(bench, &nodes, &branches, &element_currents, &meter_readings);

    Analysis {
        nodes,
        branches,
        element_currents,
        meter_readings,
        regions,
    }
}

/// Clear everything the previous pass derived.
fn reset(bench: &mut Workbench) {
    let terminals: Vec<(TerminalId, bool, bool)> = bench
        .terminals()
        .map(|t| {
            let owner = bench.element(t.owner);
            let battery_owned = owner.is_some_and(|e| e.is_battery());
            let short_owned = owner.is_some_and(|e| e.fault == FaultState::Short);
            (t.id, battery_owned, short_owned)
        })
        .collect();
    for (id, battery_owned, short_owned) in terminals {
        if let Some(terminal) = bench.terminal_mut(id) {
            terminal.potential = f64::NAN;
            terminal.direction = if short_owned {
                FlowDirection::TwoWay
            } else {
                FlowDirection::Unknown
            };
            if !battery_owned {
                terminal.polarity = Polarity::Unset;
            }
        }
    }

    let elements: Vec<ElementId> = bench
        .elements()
        .filter(|e| !matches!(e.kind, ElementKind::Switch(_)))
        .map(|e| e.id)
        .collect();
    for id in elements {
        if let Some(element) = bench.element_mut(id) {
            element.work = WorkState::StoppedOrOpen;
        }
    }
}

/// Current through an ammeter, recovered by cutting its node's
/// zero-resistance subgraph at the meter's own internal link and summing
/// the signed currents entering the side that holds its Left terminal.
fn ammeter_reading(
    nodes: &NodeSet,
    branches: &[SolvedBranch],
    solved_sources: &[(TerminalId, TerminalId, f64)],
    root_of_node: &[usize],
    unsupported_roots: &HashSet<usize>,
    element: &Element,
) -> f64 {
    let (Some(left), Some(right)) = (
        element.terminal_by_key(TerminalKey::Left),
        element.terminal_by_key(TerminalKey::Right),
    ) else {
        return f64::NAN;
    };
    let (Some(node_left), Some(node_right)) = (nodes.node_of(left), nodes.node_of(right)) else {
        return f64::NAN;
    };
    if unsupported_roots.contains(&root_of_node[node_left.0]) {
        return f64::NAN;
    }
    if node_left != node_right {
        // Open-faulted meter: nothing flows through it.
        return 0.0;
    }

    // Split the node at the meter: walk its zero links, skipping the
    // meter's own body.
    let mut adjacency: HashMap<TerminalId, Vec<TerminalId>> = HashMap::new();
    for link in nodes.zero_links() {
        if nodes.node_of(link.a) != Some(node_left) {
            continue;
        }
        if link.via == LinkVia::Element(element.id) {
            continue;
        }
        adjacency.entry(link.a).or_default().push(link.b);
        adjacency.entry(link.b).or_default().push(link.a);
    }
    let mut component = HashSet::from([left]);
    let mut stack = vec![left];
    while let Some(current) = stack.pop() {
        for &next in adjacency.get(&current).into_iter().flatten() {
            if component.insert(next) {
                stack.push(next);
            }
        }
    }
    if component.contains(&right) {
        // A parallel zero path bypasses the meter.
        return 0.0;
    }

    // KCL over the cut: everything entering the Left side leaves through
    // the meter.
    let mut entering = 0.0;
    for branch in branches {
        if component.contains(&branch.terminal_a) {
            entering -= branch.current;
        }
        if component.contains(&branch.terminal_b) {
            entering += branch.current;
        }
    }
    for &(pos_terminal, neg_terminal, current) in solved_sources {
        let coefficient = i32::from(component.contains(&pos_terminal))
            - i32::from(component.contains(&neg_terminal));
        if coefficient != 0 {
            entering += f64::from(coefficient) * current;
        }
    }
    entering
}

/// Push the solved state back onto the graph: terminal potentials,
/// polarities, flow directions and work states.
fn write_back(
    bench: &mut Workbench,
    nodes: &NodeSet,
    branches: &[SolvedBranch],
    element_currents: &HashMap<ElementId, f64>,
    meter_readings: &HashMap<ElementId, f64>,
) {
    for node in nodes.nodes() {
        if !node.potential.is_finite() {
            continue;
        }
        for &terminal in &node.terminals {
            if let Some(t) = bench.terminal_mut(terminal) {
                t.potential = node.potential;
            }
        }
    }

    // Current direction and polarity on solved branches. Current enters a
    // passive element at its higher-potential side.
    for branch in branches {
        if !branch.current.is_finite() || branch.current.abs() <= CURRENT_EPSILON {
            continue;
        }
        let (inlet, outlet) = if branch.current > 0.0 {
            (branch.terminal_a, branch.terminal_b)
        } else {
            (branch.terminal_b, branch.terminal_a)
        };
        if let Some(t) = bench.terminal_mut(inlet) {
            if t.direction != FlowDirection::TwoWay {
                t.direction = FlowDirection::Inward;
            }
            t.polarity = Polarity::Positive;
        }
        if let Some(t) = bench.terminal_mut(outlet) {
            if t.direction != FlowDirection::TwoWay {
                t.direction = FlowDirection::Outward;
            }
            t.polarity = Polarity::Negative;
        }
    }

    // Ammeter flow direction follows the reading sign.
    let meter_flow: Vec<(ElementId, f64)> = bench
        .elements()
        .filter(|e| matches!(e.kind, ElementKind::Ammeter(_)))
        .filter_map(|e| meter_readings.get(&e.id).map(|&r| (e.id, r)))
        .collect();
    for (element, reading) in meter_flow {
        if !reading.is_finite() || reading.abs() <= CURRENT_EPSILON {
            continue;
        }
        let Some(e) = bench.element(element) else {
            continue;
        };
        let (Some(left), Some(right)) = (
            e.terminal_by_key(TerminalKey::Left),
            e.terminal_by_key(TerminalKey::Right),
        ) else {
            continue;
        };
        let (inlet, outlet) = if reading > 0.0 { (left, right) } else { (right, left) };
        if let Some(t) = bench.terminal_mut(inlet) {
            t.direction = FlowDirection::Inward;
        }
        if let Some(t) = bench.terminal_mut(outlet) {
            t.direction = FlowDirection::Outward;
        }
    }

    // Work states: anything carrying current works; a voltmeter works
    // when its reading is defined; switches mirror their own state.
    let updates: Vec<(ElementId, WorkState)> = bench
        .elements()
        .filter_map(|element| {
            let work = match &element.kind {
                ElementKind::Switch(_) => return None,
                ElementKind::Voltmeter(_) => meter_readings
                    .get(&element.id)
                    .is_some_and(|r| r.is_finite()),
                _ => element_currents
                    .get(&element.id)
                    .is_some_and(|i| i.abs() > CURRENT_EPSILON),
            };
            Some((
                element.id,
                if work {
                    WorkState::Working
                } else {
                    WorkState::StoppedOrOpen
                },
            ))
        })
        .collect();
    for (element, work) in updates {
        if let Some(e) = bench.element_mut(element) {
            e.work = work;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Ammeter, Battery, Lamp, Resistor, Rheostat, Switch, Voltmeter};
    use approx::assert_relative_eq;

    fn t(bench: &Workbench, element: ElementId, key: TerminalKey) -> TerminalId {
        bench.element(element).unwrap().terminal_by_key(key).unwrap()
    }

    fn battery(bench: &mut Workbench, voltage: f64) -> ElementId {
        bench
            .add_element(ElementKind::Battery(Battery::new(voltage)))
            .unwrap()
    }

    fn resistor(bench: &mut Workbench, resistance: f64) -> ElementId {
        bench
            .add_element(ElementKind::Resistor(Resistor::new(resistance)))
            .unwrap()
    }

    /// 6 V battery in series with 2 ohm and 4 ohm resistors.
    fn series_rig() -> (Workbench, ElementId, ElementId, ElementId) {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let r1 = resistor(&mut bench, 2.0);
        let r2 = resistor(&mut bench, 4.0);
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, r1, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r1, TerminalKey::Right), t(&bench, r2, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r2, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
            .unwrap();
        (bench, bat, r1, r2)
    }

    fn solved(analysis: &Analysis, bat: ElementId) -> (f64, f64) {
        let region = analysis
            .regions()
            .iter()
            .find(|r| r.battery == bat)
            .expect("region for battery");
        match region.outcome {
            RegionOutcome::Solved {
                total_resistance,
                current,
            } => (total_resistance, current),
            other => panic!("expected a solved region, got {:?}", other),
        }
    }

    #[test]
    fn series_circuit_resolves_currents_and_potentials() {
        let (mut bench, bat, r1, r2) = series_rig();
        let analysis = analyze(&mut bench);

        let (total, current) = solved(&analysis, bat);
        assert_relative_eq!(total, 6.0);
        assert_relative_eq!(current, 1.0);

        // Reference at the negative pole, EMF at the positive pole.
        assert_relative_eq!(analysis.potential(t(&bench, bat, TerminalKey::Left)), 0.0);
        assert_relative_eq!(analysis.potential(t(&bench, bat, TerminalKey::Right)), 6.0);

        // 2 V across R1, 4 V across R2.
        let drop_r1 = analysis.potential(t(&bench, r1, TerminalKey::Left))
            - analysis.potential(t(&bench, r1, TerminalKey::Right));
        let drop_r2 = analysis.potential(t(&bench, r2, TerminalKey::Left))
            - analysis.potential(t(&bench, r2, TerminalKey::Right));
        assert_relative_eq!(drop_r1, 2.0);
        assert_relative_eq!(drop_r2, 4.0);

        assert_relative_eq!(analysis.branch_current(r1).unwrap(), 1.0);
        assert_relative_eq!(analysis.branch_current(r2).unwrap(), 1.0);
        assert_relative_eq!(analysis.branch_current(bat).unwrap(), 1.0);

        // Potentials are written back onto the terminals too.
        let far = bench.terminal(t(&bench, bat, TerminalKey::Right)).unwrap();
        assert_relative_eq!(far.potential, 6.0);
    }

    #[test]
    fn series_circuit_polarity_and_direction() {
        let (mut bench, _bat, r1, _r2) = series_rig();
        analyze(&mut bench);

        let inlet = bench.terminal(t(&bench, r1, TerminalKey::Left)).unwrap();
        let outlet = bench.terminal(t(&bench, r1, TerminalKey::Right)).unwrap();
        assert_eq!(inlet.polarity, Polarity::Positive);
        assert_eq!(inlet.direction, FlowDirection::Inward);
        assert_eq!(outlet.polarity, Polarity::Negative);
        assert_eq!(outlet.direction, FlowDirection::Outward);

        assert_eq!(bench.element(r1).unwrap().work, WorkState::Working);
    }

    #[test]
    fn parallel_resistors_combine_reciprocally() {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let r1 = resistor(&mut bench, 6.0);
        let r2 = resistor(&mut bench, 3.0);
        for r in [r1, r2] {
            bench
                .connect(t(&bench, bat, TerminalKey::Right), t(&bench, r, TerminalKey::Left))
                .unwrap();
            bench
                .connect(t(&bench, r, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
                .unwrap();
        }

        let analysis = analyze(&mut bench);
        let (total, current) = solved(&analysis, bat);
        assert_relative_eq!(total, 2.0);
        assert_relative_eq!(current, 3.0);
        assert_relative_eq!(analysis.branch_current(r1).unwrap(), 1.0);
        assert_relative_eq!(analysis.branch_current(r2).unwrap(), 2.0);
    }

    #[test]
    fn shorted_wire_bypasses_a_resistor() {
        let (mut bench, bat, r1, r2) = series_rig();
        let bypass = bench
            .connect(t(&bench, r1, TerminalKey::Left), t(&bench, r1, TerminalKey::Right))
            .unwrap();
        bench.set_wire_fault(bypass, FaultState::Short).unwrap();

        let analysis = analyze(&mut bench);
        assert!(analysis.is_equipotential(
            t(&bench, r1, TerminalKey::Left),
            t(&bench, r1, TerminalKey::Right)
        ));
        let (total, current) = solved(&analysis, bat);
        assert_relative_eq!(total, 4.0);
        assert_relative_eq!(current, 1.5);
        assert_relative_eq!(analysis.branch_current(r1).unwrap(), 0.0);
        assert_relative_eq!(analysis.branch_current(r2).unwrap(), 1.5);
    }

    #[test]
    fn open_switch_leaves_subcircuit_undefined() {
        // Main loop: battery + R1, solving normally. A hanging chain
        // (open switch -> R2 -> lamp) is reachable only through the
        // switch.
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let r1 = resistor(&mut bench, 2.0);
        let sw = bench
            .add_element(ElementKind::Switch(Switch::new(false)))
            .unwrap();
        let r2 = resistor(&mut bench, 4.0);
        let lamp = bench
            .add_element(ElementKind::Lamp(Lamp::new(2.5, 1.25)))
            .unwrap();
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, r1, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r1, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, sw, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, sw, TerminalKey::Right), t(&bench, r2, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r2, TerminalKey::Right), t(&bench, lamp, TerminalKey::Left))
            .unwrap();

        let analysis = analyze(&mut bench);
        let (total, current) = solved(&analysis, bat);
        assert_relative_eq!(total, 2.0);
        assert_relative_eq!(current, 3.0);

        // Everything past the open switch stays undefined.
        for terminal in [
            t(&bench, sw, TerminalKey::Right),
            t(&bench, r2, TerminalKey::Left),
            t(&bench, r2, TerminalKey::Right),
            t(&bench, lamp, TerminalKey::Left),
            t(&bench, lamp, TerminalKey::Right),
        ] {
            assert!(analysis.potential(terminal).is_nan());
        }
        // The switch's near side sits on the live positive node.
        assert_relative_eq!(analysis.potential(t(&bench, sw, TerminalKey::Left)), 6.0);
        assert_eq!(bench.element(lamp).unwrap().work, WorkState::StoppedOrOpen);

        // Closing the switch still leaves the chain pendant (it dead-ends
        // at the lamp), but now at a defined potential.
        bench.set_switch_closed(sw, true).unwrap();
        let analysis = analyze(&mut bench);
        assert_relative_eq!(analysis.potential(t(&bench, lamp, TerminalKey::Left)), 6.0);
        assert_relative_eq!(analysis.branch_current(r2).unwrap(), 0.0);
    }

    #[test]
    fn rheostat_tap_scales_loop_resistance() {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let rh = bench
            .add_element(ElementKind::Rheostat(Rheostat::new(12.0, 0.5)))
            .unwrap();
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, rh, TerminalKey::LeftUp))
            .unwrap();
        bench
            .connect(t(&bench, rh, TerminalKey::LeftDown), t(&bench, bat, TerminalKey::Left))
            .unwrap();

        let analysis = analyze(&mut bench);
        let (total, current) = solved(&analysis, bat);
        assert_relative_eq!(total, 6.0);
        assert_relative_eq!(current, 1.0);
        assert_relative_eq!(analysis.branch_current(rh).unwrap().abs(), 1.0);

        bench.set_rheostat_tap(rh, 0.25).unwrap();
        let analysis = analyze(&mut bench);
        let (total, current) = solved(&analysis, bat);
        assert_relative_eq!(total, 3.0);
        assert_relative_eq!(current, 2.0);

        // The unused right segment carries nothing but stays at a
        // defined potential through the idle closure.
        assert_relative_eq!(analysis.potential(t(&bench, rh, TerminalKey::RightDown)), 6.0);
    }

    #[test]
    fn rheostat_tap_at_zero_shorts_the_loop() {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let rh = bench
            .add_element(ElementKind::Rheostat(Rheostat::new(12.0, 0.0)))
            .unwrap();
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, rh, TerminalKey::LeftUp))
            .unwrap();
        bench
            .connect(t(&bench, rh, TerminalKey::LeftDown), t(&bench, bat, TerminalKey::Left))
            .unwrap();

        let analysis = analyze(&mut bench);
        let region = analysis.regions().iter().find(|r| r.battery == bat).unwrap();
        assert_eq!(region.outcome, RegionOutcome::ShortCircuit);
        assert!(analysis.branch_current(bat).unwrap().is_infinite());
    }

    #[test]
    fn removing_the_joining_wire_splits_the_node() {
        // R1: pos -> A, R2: pos -> B, a wire joins A and B, and A returns
        // to the negative pole.
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let r1 = resistor(&mut bench, 2.0);
        let r2 = resistor(&mut bench, 4.0);
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, r1, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, r2, TerminalKey::Left))
            .unwrap();
        let join = bench
            .connect(t(&bench, r1, TerminalKey::Right), t(&bench, r2, TerminalKey::Right))
            .unwrap();
        bench
            .connect(t(&bench, r1, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
            .unwrap();

        let analysis = analyze(&mut bench);
        assert!(analysis.is_equipotential(
            t(&bench, r1, TerminalKey::Right),
            t(&bench, r2, TerminalKey::Right)
        ));
        let (total, _) = solved(&analysis, bat);
        assert_relative_eq!(total, 2.0 * 4.0 / 6.0);

        bench.remove_wire(join).unwrap();
        let analysis = analyze(&mut bench);
        assert!(!analysis.is_equipotential(
            t(&bench, r1, TerminalKey::Right),
            t(&bench, r2, TerminalKey::Right)
        ));
        // R1's side still loops: its node keeps the reference potential.
        assert_relative_eq!(analysis.potential(t(&bench, r1, TerminalKey::Right)), 0.0);
        // R2's side dangles but is reachable with zero current: it floats
        // up to the positive potential.
        assert_relative_eq!(analysis.potential(t(&bench, r2, TerminalKey::Right)), 6.0);
        assert_relative_eq!(analysis.branch_current(r2).unwrap(), 0.0);
        let (total, current) = solved(&analysis, bat);
        assert_relative_eq!(total, 2.0);
        assert_relative_eq!(current, 3.0);
    }

    #[test]
    fn meters_read_without_loading_the_loop() {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let am = bench
            .add_element(ElementKind::Ammeter(Ammeter::new()))
            .unwrap();
        let r1 = resistor(&mut bench, 2.0);
        let r2 = resistor(&mut bench, 4.0);
        let vm = bench
            .add_element(ElementKind::Voltmeter(Voltmeter::new()))
            .unwrap();
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, am, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, am, TerminalKey::Right), t(&bench, r1, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r1, TerminalKey::Right), t(&bench, r2, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r2, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, vm, TerminalKey::Left), t(&bench, r2, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, vm, TerminalKey::Right), t(&bench, r2, TerminalKey::Right))
            .unwrap();

        let analysis = analyze(&mut bench);
        // Ideal meters: the loop still sees exactly 6 ohms.
        let (total, current) = solved(&analysis, bat);
        assert_relative_eq!(total, 6.0);
        assert_relative_eq!(current, 1.0);

        assert_relative_eq!(analysis.meter_reading(am).unwrap(), 1.0);
        assert_relative_eq!(analysis.meter_reading(vm).unwrap(), 4.0);
        assert_eq!(bench.element(am).unwrap().work, WorkState::Working);
        assert_eq!(bench.element(vm).unwrap().work, WorkState::Working);
        // The voltmeter branch carries no current.
        assert!(analysis.branch_current(vm).is_none());
    }

    #[test]
    fn ammeter_bypassed_by_closed_switch_reads_zero() {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let am = bench
            .add_element(ElementKind::Ammeter(Ammeter::new()))
            .unwrap();
        let sw = bench
            .add_element(ElementKind::Switch(Switch::new(true)))
            .unwrap();
        let r1 = resistor(&mut bench, 3.0);
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, am, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, am, TerminalKey::Right), t(&bench, r1, TerminalKey::Left))
            .unwrap();
        // Closed switch straight across the meter.
        bench
            .connect(t(&bench, am, TerminalKey::Left), t(&bench, sw, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, sw, TerminalKey::Right), t(&bench, am, TerminalKey::Right))
            .unwrap();
        bench
            .connect(t(&bench, r1, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
            .unwrap();

        let analysis = analyze(&mut bench);
        assert_relative_eq!(analysis.meter_reading(am).unwrap(), 0.0);
    }

    #[test]
    fn battery_short_circuit_is_reported_not_solved() {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let lamp = bench
            .add_element(ElementKind::Lamp(Lamp::new(2.5, 1.25)))
            .unwrap();
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, lamp, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, lamp, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
            .unwrap();
        // The killer: a healthy wire straight across the poles.
        bench
            .connect(t(&bench, bat, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
            .unwrap();

        let analysis = analyze(&mut bench);
        let region = analysis.regions().iter().find(|r| r.battery == bat).unwrap();
        assert_eq!(region.outcome, RegionOutcome::ShortCircuit);
        assert!(analysis.branch_current(bat).unwrap().is_infinite());
        // The lamp is bypassed: no current, no light, zero potential
        // difference.
        assert_relative_eq!(analysis.branch_current(lamp).unwrap(), 0.0);
        assert_eq!(bench.element(lamp).unwrap().work, WorkState::StoppedOrOpen);
        assert_relative_eq!(analysis.potential(t(&bench, lamp, TerminalKey::Left)), 0.0);
    }

    #[test]
    fn two_batteries_in_one_region_are_unsupported() {
        let mut bench = Workbench::new();
        // Region 1: two batteries in parallel with one resistor.
        let bat1 = battery(&mut bench, 6.0);
        let bat2 = battery(&mut bench, 4.5);
        let r1 = resistor(&mut bench, 2.0);
        for bat in [bat1, bat2] {
            bench
                .connect(t(&bench, bat, TerminalKey::Right), t(&bench, r1, TerminalKey::Left))
                .unwrap();
            bench
                .connect(t(&bench, r1, TerminalKey::Right), t(&bench, bat, TerminalKey::Left))
                .unwrap();
        }
        // Region 2: an independent healthy loop.
        let bat3 = battery(&mut bench, 6.0);
        let r2 = resistor(&mut bench, 3.0);
        bench
            .connect(t(&bench, bat3, TerminalKey::Right), t(&bench, r2, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r2, TerminalKey::Right), t(&bench, bat3, TerminalKey::Left))
            .unwrap();

        let analysis = analyze(&mut bench);
        for bat in [bat1, bat2] {
            let region = analysis.regions().iter().find(|r| r.battery == bat).unwrap();
            assert_eq!(region.outcome, RegionOutcome::Unsupported);
        }
        // The shared resistor got no current and no potential.
        assert!(analysis.branch_current(r1).is_none());
        assert!(analysis.potential(t(&bench, r1, TerminalKey::Left)).is_nan());

        // The independent region still solves.
        let (total, current) = solved(&analysis, bat3);
        assert_relative_eq!(total, 3.0);
        assert_relative_eq!(current, 2.0);
    }

    #[test]
    fn wheatstone_bridge_region_is_unsupported() {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let arms: Vec<ElementId> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .into_iter()
            .map(|r| resistor(&mut bench, r))
            .collect();
        let (r_a, r_b, bridge, r_c, r_d) = (arms[0], arms[1], arms[2], arms[3], arms[4]);
        let pos = t(&bench, bat, TerminalKey::Right);
        let neg = t(&bench, bat, TerminalKey::Left);
        // pos -> n1 (r_a), pos -> n2 (r_b), n1 <-> n2 (bridge),
        // n1 -> neg (r_c), n2 -> neg (r_d).
        bench.connect(pos, t(&bench, r_a, TerminalKey::Left)).unwrap();
        bench.connect(pos, t(&bench, r_b, TerminalKey::Left)).unwrap();
        bench
            .connect(t(&bench, r_a, TerminalKey::Right), t(&bench, bridge, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r_b, TerminalKey::Right), t(&bench, bridge, TerminalKey::Right))
            .unwrap();
        bench
            .connect(t(&bench, r_a, TerminalKey::Right), t(&bench, r_c, TerminalKey::Left))
            .unwrap();
        bench
            .connect(t(&bench, r_b, TerminalKey::Right), t(&bench, r_d, TerminalKey::Left))
            .unwrap();
        bench.connect(t(&bench, r_c, TerminalKey::Right), neg).unwrap();
        bench.connect(t(&bench, r_d, TerminalKey::Right), neg).unwrap();

        let analysis = analyze(&mut bench);
        let region = analysis.regions().iter().find(|r| r.battery == bat).unwrap();
        assert_eq!(region.outcome, RegionOutcome::Unsupported);
        assert!(analysis.branch_current(bridge).is_none());
    }

    #[test]
    fn unwired_battery_reports_open() {
        let mut bench = Workbench::new();
        let bat = battery(&mut bench, 6.0);
        let analysis = analyze(&mut bench);
        let region = analysis.regions().iter().find(|r| r.battery == bat).unwrap();
        assert_eq!(region.outcome, RegionOutcome::Open);
        assert_relative_eq!(analysis.branch_current(bat).unwrap(), 0.0);
        assert_relative_eq!(analysis.potential(t(&bench, bat, TerminalKey::Left)), 0.0);
        assert!(analysis.potential(t(&bench, bat, TerminalKey::Right)).is_nan());
    }

    #[test]
    fn analysis_is_idempotent() {
        let (mut bench, bat, r1, r2) = series_rig();
        let first = analyze(&mut bench);
        let second = analyze(&mut bench);

        assert_eq!(first.nodes().len(), second.nodes().len());
        for terminal in bench.terminals() {
            assert_eq!(first.node_of(terminal.id), second.node_of(terminal.id));
            let (p1, p2) = (first.potential(terminal.id), second.potential(terminal.id));
            assert!(p1 == p2 || (p1.is_nan() && p2.is_nan()));
        }
        for element in [bat, r1, r2] {
            assert_eq!(first.branch_current(element), second.branch_current(element));
        }
        assert_eq!(first.regions().len(), second.regions().len());
        for (a, b) in first.regions().iter().zip(second.regions().iter()) {
            assert_eq!(a.battery, b.battery);
            assert_eq!(a.outcome, b.outcome);
        }
    }

    #[test]
    fn faulted_battery_is_a_dead_source() {
        let (mut bench, bat, r1, _r2) = series_rig();
        bench.set_element_fault(bat, FaultState::Open).unwrap();
        let analysis = analyze(&mut bench);
        assert!(analysis.regions().is_empty());
        assert!(analysis.branch_current(r1).is_none());
        assert!(analysis.potential(t(&bench, r1, TerminalKey::Left)).is_nan());
    }
}
