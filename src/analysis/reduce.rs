//! Series/parallel reduction of the resistive node network.
//!
//! The solver hands this module the resistive edges between equipotential
//! nodes and the battery's two source nodes. The network is folded into a
//! single equivalent edge by repeatedly:
//!
//! - pruning pendant branches (they carry no current),
//! - merging parallel edges (reciprocal sum), and
//! - merging series chains through interior nodes (plain sum),
//!
//! while recording the fold as a tree. Unfolding the tree afterwards
//! recovers every branch current and interior node potential exactly.
//! Networks that survive the fixpoint (bridge meshes) are reported
//! irreducible rather than approximated.

use std::collections::HashMap;

use crate::workbench::{ElementId, NodeId, TerminalId};

/// One resistive edge of the reduced node graph.
#[derive(Debug, Clone)]
pub struct BranchEdge {
    pub element: ElementId,
    pub a: NodeId,
    pub b: NodeId,
    /// The element terminal sitting in node `a` / node `b`; used to split
    /// a node's zero-resistance subgraph for ammeter readings.
    pub terminal_a: TerminalId,
    pub terminal_b: TerminalId,
    /// Strictly positive: zero-resistance links live inside nodes.
    pub resistance: f64,
}

/// Outcome of reducing a network between two source nodes.
#[derive(Debug)]
pub enum Reduction {
    /// No resistive chain joins the source nodes: the circuit is open.
    NoPath,
    /// The source nodes are joined, but the network between them is not a
    /// series/parallel composition.
    Irreducible,
    Reduced(ReducedNetwork),
}

/// A fully folded network, ready to distribute currents and potentials.
#[derive(Debug)]
pub struct ReducedNetwork {
    pub total_resistance: f64,
    pos: NodeId,
    tree: RTree,
    /// Input edge indices that carry no current: self-loops and pendant
    /// branches pruned before folding.
    idle: Vec<usize>,
}

/// Branch currents and node potentials recovered from a fold.
#[derive(Debug)]
pub struct Distribution {
    /// Signed current per input edge, positive from `a` to `b`. Idle edges
    /// carry 0.
    pub currents: Vec<f64>,
    /// Potential of every node on a current-carrying path.
    pub potentials: HashMap<NodeId, f64>,
}

#[derive(Debug)]
struct RTree {
    a: NodeId,
    b: NodeId,
    resistance: f64,
    kind: RKind,
}

#[derive(Debug)]
enum RKind {
    Leaf(usize),
    Series {
        first: Box<RTree>,
        second: Box<RTree>,
        mid: NodeId,
    },
    Parallel {
        left: Box<RTree>,
        right: Box<RTree>,
    },
}

impl RTree {
    fn leaf(index: usize, edge: &BranchEdge) -> Self {
        RTree {
            a: edge.a,
            b: edge.b,
            resistance: edge.resistance,
            kind: RKind::Leaf(index),
        }
    }

    fn other(&self, node: NodeId) -> NodeId {
        if self.a == node {
            self.b
        } else {
            self.a
        }
    }

    fn collect_leaves(&self, out: &mut Vec<usize>) {
        match &self.kind {
            RKind::Leaf(index) => out.push(*index),
            RKind::Series { first, second, .. } => {
                first.collect_leaves(out);
                second.collect_leaves(out);
            }
            RKind::Parallel { left, right } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }

    fn touches(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }
}

/// Fold the network between `pos` and `neg`. The caller guarantees
/// `pos != neg` (equal source nodes are the short-circuit case, handled
/// before reduction) and strictly positive edge resistances.
pub fn reduce(edges: &[BranchEdge], pos: NodeId, neg: NodeId) -> Reduction {
    let mut idle = Vec::new();
    let mut work: Vec<RTree> = Vec::new();
    for (index, edge) in edges.iter().enumerate() {
        if edge.a == edge.b {
            // Both ends in one node: bypassed, no potential difference.
            idle.push(index);
        } else {
            work.push(RTree::leaf(index, edge));
        }
    }

    loop {
        let mut changed = false;
        changed |= prune_pendants(&mut work, &mut idle, pos, neg);
        changed |= merge_parallel(&mut work);
        changed |= merge_series(&mut work, pos, neg);
        if !changed {
            break;
        }
    }

    match work.len() {
        0 => Reduction::NoPath,
        1 if work[0].touches(pos) && work[0].touches(neg) => {
            let tree = work.remove(0);
            Reduction::Reduced(ReducedNetwork {
                total_resistance: tree.resistance,
                pos,
                tree,
                idle,
            })
        }
        _ => {
            if connected(&work, pos, neg) {
                Reduction::Irreducible
            } else {
                Reduction::NoPath
            }
        }
    }
}

/// Drop edges hanging off degree-1 nodes (other than the source nodes)
/// until none remain. Their whole subtrees carry no current.
fn prune_pendants(work: &mut Vec<RTree>, idle: &mut Vec<usize>, pos: NodeId, neg: NodeId) -> bool {
    let mut pruned_any = false;
    loop {
        let mut degree: HashMap<NodeId, usize> = HashMap::new();
        for tree in work.iter() {
            *degree.entry(tree.a).or_default() += 1;
            *degree.entry(tree.b).or_default() += 1;
        }
        let before = work.len();
        let mut kept = Vec::with_capacity(before);
        for tree in work.drain(..) {
            let pendant = [tree.a, tree.b]
                .into_iter()
                .any(|n| n != pos && n != neg && degree.get(&n).copied() == Some(1));
            if pendant {
                tree.collect_leaves(idle);
            } else {
                kept.push(tree);
            }
        }
        *work = kept;
        if work.len() == before {
            return pruned_any;
        }
        pruned_any = true;
    }
}

/// Merge every group of edges sharing an endpoint pair into one
/// equivalent edge: 1/R = sum(1/R_i).
fn merge_parallel(work: &mut Vec<RTree>) -> bool {
    let mut by_pair: HashMap<(NodeId, NodeId), Vec<RTree>> = HashMap::new();
    let mut merged_any = false;
    for tree in work.drain(..) {
        let key = if tree.a <= tree.b {
            (tree.a, tree.b)
        } else {
            (tree.b, tree.a)
        };
        by_pair.entry(key).or_default().push(tree);
    }
    let mut groups: Vec<_> = by_pair.into_values().collect();
    // Deterministic fold order regardless of hash seed.
    groups.sort_by_key(|group| group.iter().map(|t| min_leaf(t)).min());
    for mut group in groups {
        group.sort_by_key(|t| min_leaf(t));
        let mut iter = group.into_iter();
        let mut combined = match iter.next() {
            Some(first) => first,
            None => continue,
        };
        for next in iter {
            merged_any = true;
            let (a, b) = (combined.a, combined.b);
            let resistance =
                combined.resistance * next.resistance / (combined.resistance + next.resistance);
            combined = RTree {
                a,
                b,
                resistance,
                kind: RKind::Parallel {
                    left: Box::new(combined),
                    right: Box::new(next),
                },
            };
        }
        work.push(combined);
    }
    merged_any
}

/// Merge the two edges meeting at an interior degree-2 node into one
/// series edge: R = R1 + R2.
fn merge_series(work: &mut Vec<RTree>, pos: NodeId, neg: NodeId) -> bool {
    let mut merged_any = false;
    loop {
        let mut incidence: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (index, tree) in work.iter().enumerate() {
            incidence.entry(tree.a).or_default().push(index);
            incidence.entry(tree.b).or_default().push(index);
        }
        let mut candidates: Vec<_> = incidence
            .iter()
            .filter(|(node, edges)| **node != pos && **node != neg && edges.len() == 2)
            .map(|(node, edges)| (*node, edges[0], edges[1]))
            .collect();
        candidates.sort_by_key(|(node, _, _)| node.0);

        let Some((mid, i, j)) = candidates.into_iter().find(|(node, i, j)| {
            // Two edges between the same pair are a parallel group, not a
            // chain; leave them to merge_parallel.
            work[*i].other(*node) != work[*j].other(*node)
        }) else {
            return merged_any;
        };

        let (i, j) = (i.min(j), i.max(j));
        let second = work.swap_remove(j);
        let first = work.swap_remove(i);
        // Orient the chain: first runs a -> mid, second runs mid -> b.
        let a = first.other(mid);
        let b = second.other(mid);
        work.push(RTree {
            a,
            b,
            resistance: first.resistance + second.resistance,
            kind: RKind::Series {
                first: Box::new(first),
                second: Box::new(second),
                mid,
            },
        });
        merged_any = true;
    }
}

fn min_leaf(tree: &RTree) -> usize {
    let mut leaves = Vec::new();
    tree.collect_leaves(&mut leaves);
    leaves.into_iter().min().unwrap_or(usize::MAX)
}

fn connected(work: &[RTree], from: NodeId, to: NodeId) -> bool {
    let mut frontier = vec![from];
    let mut seen = vec![from];
    while let Some(node) = frontier.pop() {
        if node == to {
            return true;
        }
        for tree in work {
            if tree.touches(node) {
                let far = tree.other(node);
                if !seen.contains(&far) {
                    seen.push(far);
                    frontier.push(far);
                }
            }
        }
    }
    false
}

impl ReducedNetwork {
    /// Indices of input edges that carry no current.
    pub fn idle_edges(&self) -> &[usize] {
        &self.idle
    }

    /// Unfold the reduction: distribute the source potential difference
    /// into per-edge currents and per-node potentials. Series children
    /// share their parent's current and pin the interior node potential;
    /// parallel children split the current by conductance. Each node's
    /// potential is assigned when first reached.
    pub fn distribute(&self, edges: &[BranchEdge], v_pos: f64, v_neg: f64) -> Distribution {
        let mut currents = vec![0.0; edges.len()];
        let mut potentials = HashMap::new();

        let source_current = (v_pos - v_neg) / self.total_resistance;
        let (va, vb, i) = if self.tree.a == self.pos {
            (v_pos, v_neg, source_current)
        } else {
            (v_neg, v_pos, -source_current)
        };
        assign(&self.tree, va, vb, i, &mut currents, &mut potentials);

        Distribution {
            currents,
            potentials,
        }
    }
}

fn assign(
    tree: &RTree,
    v_a: f64,
    v_b: f64,
    current: f64,
    currents: &mut [f64],
    potentials: &mut HashMap<NodeId, f64>,
) {
    potentials.entry(tree.a).or_insert(v_a);
    potentials.entry(tree.b).or_insert(v_b);
    match &tree.kind {
        RKind::Leaf(index) => currents[*index] = current,
        RKind::Series { first, second, mid } => {
            let v_mid = v_a - current * first.resistance;
            potentials.entry(*mid).or_insert(v_mid);
            let (fa, fb, fi) = if first.a == tree.a {
                (v_a, v_mid, current)
            } else {
                (v_mid, v_a, -current)
            };
            assign(first, fa, fb, fi, currents, potentials);
            let (sa, sb, si) = if second.a == *mid {
                (v_mid, v_b, current)
            } else {
                (v_b, v_mid, -current)
            };
            assign(second, sa, sb, si, currents, potentials);
        }
        RKind::Parallel { left, right } => {
            for child in [left, right] {
                let child_current = (v_a - v_b) / child.resistance;
                let (ca, cb, ci) = if child.a == tree.a {
                    (v_a, v_b, child_current)
                } else {
                    (v_b, v_a, -child_current)
                };
                assign(child, ca, cb, ci, currents, potentials);
            }
        }
    }
}
