//! Path enumeration.
//!
//! Produces the reduced edge set of [`PathElement`]s used for traversal
//! and resistance reduction: one directed edge per traversable link, either
//! through an element body or through a wire. Transient data, rebuilt on
//! every analysis pass.

use std::collections::HashSet;

use crate::workbench::{ElementId, FaultState, TerminalId, WireId, Workbench};

use super::classify;

/// What a path element traverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathVia {
    Element(ElementId),
    Wire(WireId),
}

/// One directed traversal edge between two terminals.
#[derive(Debug, Clone, Copy)]
pub struct PathElement {
    pub from: TerminalId,
    pub via: PathVia,
    pub to: TerminalId,
    /// 0.0 for wires and zero-resistance element paths.
    pub resistance: f64,
}

impl PathElement {
    /// Whether `other` is the same link traversed the opposite way.
    pub fn is_mirror_of(&self, other: &PathElement) -> bool {
        self.via == other.via && self.from == other.to && self.to == other.from
    }
}

/// The path elements leaving a terminal: through the owning element's
/// internal paths, and through every attached wire (resolved across the
/// far junction, honoring the rheostat tap redirection; Open wires are
/// excluded, Short wires always conduct).
///
/// `exclude` removes the mirror of the edge just traversed, so a recursive
/// walk does not immediately backtrack. This is a local guard only; full
/// traversals carry a visited set (see [`reachable_terminals`]).
pub fn path_elements_from(
    bench: &Workbench,
    terminal: TerminalId,
    exclude: Option<&PathElement>,
) -> Vec<PathElement> {
    let start = bench.resolve_electrical(terminal);
    let mut out = Vec::new();

    // Through the element body.
    if let Some(element) = bench.terminal(start).and_then(|t| bench.element(t.owner)) {
        if let Some(key) = element.key_of(start) {
            for link in classify::internal_links(element) {
                let other_key = if link.a == key {
                    link.b
                } else if link.b == key {
                    link.a
                } else {
                    continue;
                };
                let Some(to) = element.terminal_by_key(other_key) else {
                    continue;
                };
                out.push(PathElement {
                    from: start,
                    via: PathVia::Element(element.id),
                    to,
                    resistance: link.resistance,
                });
            }
        }
    }

    // Through attached wires.
    for jid in bench.electrical_junctions(start) {
        let Some(junction) = bench.junction(jid) else {
            continue;
        };
        let Some(wire) = bench.wire(junction.owner) else {
            continue;
        };
        if wire.fault == FaultState::Open {
            continue;
        }
        let Some(far) = bench.far_terminal(jid) else {
            continue;
        };
        out.push(PathElement {
            from: start,
            via: PathVia::Wire(wire.id),
            to: far,
            resistance: 0.0,
        });
    }

    if let Some(excluded) = exclude {
        out.retain(|p| !p.is_mirror_of(excluded));
    }
    out
}

/// The deduplicated global edge set: every element-internal link and every
/// conducting wire, each once, in canonical direction.
pub fn enumerate_paths(bench: &Workbench) -> Vec<PathElement> {
    let mut out = Vec::new();

    for element in bench.elements() {
        for link in classify::internal_links(element) {
            let (Some(from), Some(to)) = (
                element.terminal_by_key(link.a),
                element.terminal_by_key(link.b),
            ) else {
                continue;
            };
            out.push(PathElement {
                from,
                via: PathVia::Element(element.id),
                to,
                resistance: link.resistance,
            });
        }
    }

    for wire in bench.wires() {
        if wire.fault == FaultState::Open {
            continue;
        }
        let (Some(from), Some(to)) = bench.wire_endpoints(wire.id) else {
            continue;
        };
        out.push(PathElement {
            from,
            via: PathVia::Wire(wire.id),
            to,
            resistance: 0.0,
        });
    }

    out
}

/// Every terminal reachable from `start` through any conducting link.
/// Visited-set traversal: cycles anywhere in the graph are safe.
pub fn reachable_terminals(bench: &Workbench, start: TerminalId) -> HashSet<TerminalId> {
    let start = bench.resolve_electrical(start);
    let mut visited = HashSet::new();
    if bench.terminal(start).is_none() {
        return visited;
    }
    let mut stack = vec![start];
    visited.insert(start);
    while let Some(current) = stack.pop() {
        for path in path_elements_from(bench, current, None) {
            if visited.insert(path.to) {
                stack.push(path.to);
            }
        }
    }
    visited
}

/// Whether any conducting chain joins two terminals.
pub fn is_connected(bench: &Workbench, a: TerminalId, b: TerminalId) -> bool {
    reachable_terminals(bench, a).contains(&bench.resolve_electrical(b))
}
