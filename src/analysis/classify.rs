//! Fault and branch classification.
//!
//! Owns the per-kind internal link table (which terminal pairs of an
//! element conduct, and at what resistance) and the per-terminal
//! pass-through and branch rules consumed by grouping and path enumeration.

use crate::components::{Element, ElementKind};
use crate::workbench::{FaultState, TerminalId, TerminalKey, Workbench, WorkState};

/// One internal conduction path of an element, by terminal key.
#[derive(Debug, Clone, Copy)]
pub struct InternalLink {
    pub a: TerminalKey,
    pub b: TerminalKey,
    /// Exactly 0.0 marks a zero-resistance link (merged during grouping).
    pub resistance: f64,
}

const fn link(a: TerminalKey, b: TerminalKey, resistance: f64) -> InternalLink {
    InternalLink { a, b, resistance }
}

/// The internal conduction paths of an element under its current fault,
/// work state and parameters.
///
/// An `Open` fault removes every path. A `Short` fault collapses the
/// element to zero-resistance links, except for the battery: its EMF
/// path is never treated as an internal conductor.
pub fn internal_links(element: &Element) -> Vec<InternalLink> {
    match element.fault {
        FaultState::Open => return Vec::new(),
        FaultState::Short => return short_links(element),
        FaultState::None => {}
    }

    use TerminalKey::*;
    match &element.kind {
        ElementKind::Battery(_) | ElementKind::Voltmeter(_) => Vec::new(),
        ElementKind::Resistor(r) => vec![link(Left, Right, r.resistance)],
        ElementKind::Lamp(l) => vec![link(Left, Right, l.resistance())],
        ElementKind::Fan(f) => vec![link(Left, Right, f.resistance)],
        ElementKind::Ammeter(_) => vec![link(Left, Right, 0.0)],
        ElementKind::Switch(s) => {
            if s.closed {
                vec![link(Left, Right, 0.0)]
            } else {
                Vec::new()
            }
        }
        // The up pair and the tap are one electrical point; the two
        // resistance segments hang off the tap. No direct LeftDown to
        // RightDown link: that path runs through the tap.
        ElementKind::Rheostat(r) => vec![
            link(LeftUp, MiddleUp, 0.0),
            link(RightUp, MiddleUp, 0.0),
            link(MiddleUp, LeftDown, r.left_segment()),
            link(MiddleUp, RightDown, r.right_segment()),
        ],
    }
}

fn short_links(element: &Element) -> Vec<InternalLink> {
    use TerminalKey::*;
    match &element.kind {
        ElementKind::Battery(_) => Vec::new(),
        ElementKind::Rheostat(_) => vec![
            link(LeftUp, MiddleUp, 0.0),
            link(RightUp, MiddleUp, 0.0),
            link(MiddleUp, LeftDown, 0.0),
            link(MiddleUp, RightDown, 0.0),
        ],
        _ => vec![link(Left, Right, 0.0)],
    }
}

/// Pairwise internal resistance between two terminal keys of an element.
/// `None` means no internal path (open switch, open fault, voltmeter,
/// unrelated pair).
pub fn internal_resistance(element: &Element, a: TerminalKey, b: TerminalKey) -> Option<f64> {
    internal_links(element)
        .iter()
        .find(|l| (l.a == a && l.b == b) || (l.a == b && l.b == a))
        .map(|l| l.resistance)
}

/// Whether a terminal's owner conducts straight through: Short-faulted,
/// an ammeter, or a closed switch. Pass-through terminals are merged into
/// their neighbors' nodes instead of forming resistive edges.
pub fn is_pass_through(bench: &Workbench, terminal: TerminalId) -> bool {
    let Some(element) = bench
        .terminal(terminal)
        .and_then(|t| bench.element(t.owner))
    else {
        return false;
    };
    if element.fault == FaultState::Short {
        return true;
    }
    match &element.kind {
        ElementKind::Ammeter(_) => true,
        ElementKind::Switch(_) => element.work == WorkState::Working,
        _ => false,
    }
}

/// Whether more than one independent current path leaves a terminal.
pub fn has_branch(bench: &Workbench, terminal: TerminalId) -> bool {
    let Some(term) = bench.terminal(terminal) else {
        return false;
    };
    let Some(element) = bench.element(term.owner) else {
        return false;
    };

    match &element.kind {
        // The battery body is the EMF path: only extra junctions on the
        // pole itself fork the current.
        ElementKind::Battery(_) => bench.junction_count(terminal) > 1,
        ElementKind::Rheostat(_) => rheostat_branch(bench, element, term.key),
        _ => {
            let own = term.junctions.len();
            let wired_siblings = bench
                .siblings(terminal)
                .into_iter()
                .filter(|&s| bench.junction_count(s) > 0)
                .count();
            wired_siblings + own.saturating_sub(1) >= 2
        }
    }
}

fn rheostat_branch(bench: &Workbench, element: &Element, key: TerminalKey) -> bool {
    let count_at = |key: TerminalKey| {
        element
            .terminal_by_key(key)
            .map(|t| bench.junction_count(t))
            .unwrap_or(0)
    };
    match key {
        // The tap vertex: forks when both up posts together carry more
        // than one wire, or when both ends of the element are in play.
        TerminalKey::LeftUp | TerminalKey::RightUp | TerminalKey::MiddleUp => {
            let tap_junctions = element
                .terminal_by_key(TerminalKey::MiddleUp)
                .map(|t| bench.junction_count(t))
                .unwrap_or(0);
            tap_junctions > 1
                || (count_at(TerminalKey::LeftDown) > 0 && count_at(TerminalKey::RightDown) > 0)
        }
        TerminalKey::LeftDown | TerminalKey::RightDown => count_at(key) > 1,
        _ => false,
    }
}
