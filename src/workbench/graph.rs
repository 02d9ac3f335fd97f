//! The workbench: arena storage for elements, wires, terminals and
//! junctions, plus every topology mutation and adjacency query.
//!
//! All four collections are index arenas with tombstoned slots, so handles
//! stay stable across removals and the object graph carries no reference
//! cycles. Malformed topologies (dangling wire ends, both ends of a wire on
//! one terminal) are legal states: adjacency queries treat them as
//! no-connection instead of rejecting them.

use crate::components::{Element, ElementKind};
use crate::error::{Result, VoltLabError};

use super::types::{
    ElementId, FaultState, FlowDirection, JunctionId, Point, Polarity, TerminalId, TerminalKey,
    WireArea, WireEnd, WireId, WorkState,
};

/// A connection point on a circuit element.
#[derive(Debug, Clone)]
pub struct Terminal {
    pub id: TerminalId,
    pub owner: ElementId,
    pub key: TerminalKey,
    /// Virtual terminals (the rheostat tap) participate in analysis but
    /// cannot be wired.
    pub is_virtual: bool,
    /// Potential relative to the region reference, NaN while undefined.
    pub potential: f64,
    pub polarity: Polarity,
    pub direction: FlowDirection,
    /// Junctions plugged into this terminal. Relation only: the wires own
    /// their junctions.
    pub junctions: Vec<JunctionId>,
}

/// A wire between two terminal endpoints, drawn as a Bezier curve.
#[derive(Debug, Clone)]
pub struct Wire {
    pub id: WireId,
    /// StartPoint, StartHandle, EndHandle, EndPoint. Only index 0 and 3 are
    /// electrical; the handles are control points.
    pub junctions: [JunctionId; 4],
    pub fault: FaultState,
}

impl Wire {
    /// The electrical endpoint junction for a wire end.
    pub fn endpoint(&self, end: WireEnd) -> JunctionId {
        match end {
            WireEnd::Start => self.junctions[0],
            WireEnd::End => self.junctions[3],
        }
    }
}

/// A point owned by exactly one wire, optionally plugged into a terminal.
#[derive(Debug, Clone)]
pub struct Junction {
    pub id: JunctionId,
    pub owner: WireId,
    pub area: WireArea,
    pub position: Point,
    /// The terminal this junction is plugged into, if any. Weak relation:
    /// the junction does not own the terminal.
    pub terminal: Option<TerminalId>,
}

/// The workbench: one mutable topology graph, analyzed as a whole.
#[derive(Debug, Default)]
pub struct Workbench {
    elements: Vec<Option<Element>>,
    wires: Vec<Option<Wire>>,
    terminals: Vec<Option<Terminal>>,
    junctions: Vec<Option<Junction>>,
}

impl Workbench {
    /// Create an empty workbench.
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Element Mutations ============

    /// Place a new element. Kind parameters are validated here; invalid
    /// values never enter the workbench.
    pub fn add_element(&mut self, kind: ElementKind) -> Result<ElementId> {
        kind.validate()?;

        let id = ElementId(self.elements.len());
        let is_battery = matches!(kind, ElementKind::Battery(_));
        let mut terminals = Vec::with_capacity(kind.terminal_layout().len());
        for layout in kind.terminal_layout() {
            let tid = TerminalId(self.terminals.len());
            // Battery poles carry fixed polarity; everything else is
            // assigned by the solver.
            let polarity = match (is_battery, layout.key) {
                (true, TerminalKey::Left) => Polarity::Negative,
                (true, TerminalKey::Right) => Polarity::Positive,
                _ => Polarity::Unset,
            };
            self.terminals.push(Some(Terminal {
                id: tid,
                owner: id,
                key: layout.key,
                is_virtual: layout.is_virtual,
                potential: f64::NAN,
                polarity,
                direction: FlowDirection::Unknown,
                junctions: Vec::new(),
            }));
            terminals.push(tid);
        }

        tracing::debug!("add {} as {}", kind.name(), id);
        let work = match &kind {
            ElementKind::Switch(s) if s.closed => WorkState::Working,
            _ => WorkState::StoppedOrOpen,
        };
        self.elements.push(Some(Element {
            id,
            kind,
            position: Point::ORIGIN,
            scale: 1.0,
            fault: FaultState::None,
            work,
            terminals,
        }));
        Ok(id)
    }

    /// Remove an element, unplugging every junction attached to its
    /// terminals.
    pub fn remove_element(&mut self, id: ElementId) -> Result<()> {
        let element = self.require_element(id)?.clone();
        for &tid in &element.terminals {
            if let Some(terminal) = self.terminals[tid.0].take() {
                for jid in terminal.junctions {
                    if let Some(junction) = self.junction_mut(jid) {
                        junction.terminal = None;
                    }
                }
            }
        }
        tracing::debug!("remove {} ({})", id, element.kind.name());
        self.elements[id.0] = None;
        Ok(())
    }

    pub fn move_element(&mut self, id: ElementId, position: Point) -> Result<()> {
        self.require_element_mut(id)?.position = position;
        Ok(())
    }

    pub fn set_scale(&mut self, id: ElementId, scale: f64) -> Result<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(VoltLabError::invalid_parameter("scale", "must be positive"));
        }
        self.require_element_mut(id)?.scale = scale;
        Ok(())
    }

    /// Inject or clear a fault on an element.
    pub fn set_element_fault(&mut self, id: ElementId, fault: FaultState) -> Result<()> {
        self.require_element_mut(id)?.fault = fault;
        Ok(())
    }

    // ============ Kind-Specific Parameter Setters ============

    pub fn set_battery_voltage(&mut self, id: ElementId, voltage: f64) -> Result<()> {
        crate::error::check_resistance("voltage", voltage)?;
        match &mut self.require_element_mut(id)?.kind {
            ElementKind::Battery(b) => {
                b.voltage = voltage;
                Ok(())
            }
            other => Err(kind_mismatch(id, "battery", other)),
        }
    }

    /// Set the resistance of a resistor or fan.
    pub fn set_resistance(&mut self, id: ElementId, resistance: f64) -> Result<()> {
        crate::error::check_resistance("resistance", resistance)?;
        match &mut self.require_element_mut(id)?.kind {
            ElementKind::Resistor(r) => {
                r.resistance = resistance;
                Ok(())
            }
            ElementKind::Fan(f) => {
                f.resistance = resistance;
                Ok(())
            }
            other => Err(kind_mismatch(id, "resistor or fan", other)),
        }
    }

    pub fn set_lamp_rating(
        &mut self,
        id: ElementId,
        rated_voltage: f64,
        rated_power: f64,
    ) -> Result<()> {
        let lamp = crate::components::Lamp::new(rated_voltage, rated_power);
        ElementKind::Lamp(lamp.clone()).validate()?;
        match &mut self.require_element_mut(id)?.kind {
            ElementKind::Lamp(l) => {
                *l = lamp;
                Ok(())
            }
            other => Err(kind_mismatch(id, "lamp", other)),
        }
    }

    pub fn set_rheostat_max_resistance(&mut self, id: ElementId, max: f64) -> Result<()> {
        crate::error::check_resistance("max_resistance", max)?;
        match &mut self.require_element_mut(id)?.kind {
            ElementKind::Rheostat(r) => {
                r.max_resistance = max;
                Ok(())
            }
            other => Err(kind_mismatch(id, "rheostat", other)),
        }
    }

    /// Move the rheostat slider to a fraction in [0, 1].
    pub fn set_rheostat_tap(&mut self, id: ElementId, tap: f64) -> Result<()> {
        crate::error::check_fraction("tap", tap)?;
        match &mut self.require_element_mut(id)?.kind {
            ElementKind::Rheostat(r) => {
                r.tap = tap;
                Ok(())
            }
            other => Err(kind_mismatch(id, "rheostat", other)),
        }
    }

    /// Open or close a switch. The switch's work state mirrors the flag.
    pub fn set_switch_closed(&mut self, id: ElementId, closed: bool) -> Result<()> {
        let element = self.require_element_mut(id)?;
        match &mut element.kind {
            ElementKind::Switch(s) => {
                s.closed = closed;
                element.work = if closed {
                    WorkState::Working
                } else {
                    WorkState::StoppedOrOpen
                };
                Ok(())
            }
            other => Err(kind_mismatch(id, "switch", other)),
        }
    }

    // ============ Wire Mutations ============

    /// Lay a new wire between two points, both ends dangling.
    pub fn add_wire(&mut self, start: Point, end: Point) -> WireId {
        let id = WireId(self.wires.len());
        let areas = [
            WireArea::StartPoint,
            WireArea::StartHandle,
            WireArea::EndHandle,
            WireArea::EndPoint,
        ];
        let positions = [
            start,
            start.lerp(end, 1.0 / 3.0),
            start.lerp(end, 2.0 / 3.0),
            end,
        ];
        let mut junctions = [JunctionId(0); 4];
        for (slot, (area, position)) in junctions
            .iter_mut()
            .zip(areas.into_iter().zip(positions.into_iter()))
        {
            let jid = JunctionId(self.junctions.len());
            self.junctions.push(Some(Junction {
                id: jid,
                owner: id,
                area,
                position,
                terminal: None,
            }));
            *slot = jid;
        }
        tracing::debug!("add wire {}", id);
        self.wires.push(Some(Wire {
            id,
            junctions,
            fault: FaultState::None,
        }));
        id
    }

    /// Remove a wire, unplugging its endpoints first.
    pub fn remove_wire(&mut self, id: WireId) -> Result<()> {
        let wire = self.require_wire(id)?.clone();
        for jid in wire.junctions {
            if let Some(junction) = self.junctions[jid.0].take() {
                if let Some(tid) = junction.terminal {
                    if let Some(terminal) = self.terminal_mut(tid) {
                        terminal.junctions.retain(|&j| j != jid);
                    }
                }
            }
        }
        tracing::debug!("remove wire {}", id);
        self.wires[id.0] = None;
        Ok(())
    }

    /// Plug a wire end into a terminal, unplugging it first if needed.
    pub fn plug(&mut self, wire: WireId, end: WireEnd, terminal: TerminalId) -> Result<()> {
        let target = self.require_terminal(terminal)?;
        if target.is_virtual {
            return Err(VoltLabError::VirtualTerminal { id: terminal });
        }
        let jid = self.require_wire(wire)?.endpoint(end);

        self.unplug(wire, end)?;
        if let Some(junction) = self.junction_mut(jid) {
            junction.terminal = Some(terminal);
        }
        if let Some(t) = self.terminal_mut(terminal) {
            t.junctions.push(jid);
        }
        tracing::debug!("plug {} of {} into {}", jid, wire, terminal);
        Ok(())
    }

    /// Unplug a wire end from whatever terminal it is on. No-op when
    /// already dangling.
    pub fn unplug(&mut self, wire: WireId, end: WireEnd) -> Result<()> {
        let jid = self.require_wire(wire)?.endpoint(end);
        let previous = self.junction_mut(jid).and_then(|j| j.terminal.take());
        if let Some(tid) = previous {
            if let Some(terminal) = self.terminal_mut(tid) {
                terminal.junctions.retain(|&j| j != jid);
            }
        }
        Ok(())
    }

    /// Convenience: lay a wire and plug both ends.
    pub fn connect(&mut self, a: TerminalId, b: TerminalId) -> Result<WireId> {
        let wire = self.add_wire(Point::ORIGIN, Point::ORIGIN);
        self.plug(wire, WireEnd::Start, a)?;
        self.plug(wire, WireEnd::End, b)?;
        Ok(wire)
    }

    /// Reposition a junction (endpoint drag or handle shaping).
    pub fn move_junction(&mut self, id: JunctionId, position: Point) -> Result<()> {
        match self.junction_mut(id) {
            Some(junction) => {
                junction.position = position;
                Ok(())
            }
            None => Err(VoltLabError::UnknownJunction { id }),
        }
    }

    /// Inject or clear a fault on a wire.
    pub fn set_wire_fault(&mut self, id: WireId, fault: FaultState) -> Result<()> {
        self.require_wire_mut(id)?.fault = fault;
        Ok(())
    }

    // ============ Accessors ============

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn terminal(&self, id: TerminalId) -> Option<&Terminal> {
        self.terminals.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn junction(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.get(id.0).and_then(|slot| slot.as_ref())
    }

    /// Live elements, in arena order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter_map(|slot| slot.as_ref())
    }

    /// Live wires, in arena order.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.iter().filter_map(|slot| slot.as_ref())
    }

    /// Live terminals, in arena order.
    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.terminals.iter().filter_map(|slot| slot.as_ref())
    }

    /// Arena length of the terminal store, including dead slots. Sizes the
    /// union-find used by equipotential grouping.
    pub fn terminal_capacity(&self) -> usize {
        self.terminals.len()
    }

    // ============ Adjacency Queries ============

    /// The electrical identity of a terminal: a rheostat up terminal
    /// resolves to its owner's virtual tap, everything else to itself.
    pub fn resolve_electrical(&self, id: TerminalId) -> TerminalId {
        let Some(terminal) = self.terminal(id) else {
            return id;
        };
        if !matches!(terminal.key, TerminalKey::LeftUp | TerminalKey::RightUp) {
            return id;
        }
        match self.element(terminal.owner) {
            Some(element) if element.is_rheostat() => element
                .terminal_by_key(TerminalKey::MiddleUp)
                .unwrap_or(id),
            _ => id,
        }
    }

    /// The junctions electrically present at a terminal. For a rheostat
    /// tap this is the union of both up terminals' junction lists.
    pub fn electrical_junctions(&self, id: TerminalId) -> Vec<JunctionId> {
        let Some(terminal) = self.terminal(id) else {
            return Vec::new();
        };
        if terminal.key != TerminalKey::MiddleUp {
            return terminal.junctions.clone();
        }
        let Some(element) = self.element(terminal.owner) else {
            return terminal.junctions.clone();
        };
        let mut junctions = terminal.junctions.clone();
        for key in [TerminalKey::LeftUp, TerminalKey::RightUp] {
            if let Some(up) = element.terminal_by_key(key).and_then(|t| self.terminal(t)) {
                junctions.extend(up.junctions.iter().copied());
            }
        }
        junctions
    }

    /// Number of junctions electrically present at a terminal.
    pub fn junction_count(&self, id: TerminalId) -> usize {
        self.electrical_junctions(id).len()
    }

    /// The opposite electrical endpoint of the wire owning a junction.
    /// None for handles and malformed junctions.
    pub fn opposite_endpoint(&self, id: JunctionId) -> Option<JunctionId> {
        let junction = self.junction(id)?;
        let wire = self.wire(junction.owner)?;
        match junction.area {
            WireArea::StartPoint => Some(wire.junctions[3]),
            WireArea::EndPoint => Some(wire.junctions[0]),
            _ => None,
        }
    }

    /// The terminal on the far side of the wire a junction belongs to,
    /// resolved through the rheostat tap redirection. None when the far
    /// end dangles.
    pub fn far_terminal(&self, id: JunctionId) -> Option<TerminalId> {
        let opposite = self.opposite_endpoint(id)?;
        let terminal = self.junction(opposite)?.terminal?;
        Some(self.resolve_electrical(terminal))
    }

    /// Both resolved endpoint terminals of a wire.
    pub fn wire_endpoints(&self, id: WireId) -> (Option<TerminalId>, Option<TerminalId>) {
        let Some(wire) = self.wire(id) else {
            return (None, None);
        };
        let resolve = |jid: JunctionId| {
            self.junction(jid)
                .and_then(|j| j.terminal)
                .map(|t| self.resolve_electrical(t))
        };
        (resolve(wire.junctions[0]), resolve(wire.junctions[3]))
    }

    /// The other real terminals of the element owning a terminal.
    pub fn siblings(&self, id: TerminalId) -> Vec<TerminalId> {
        let Some(terminal) = self.terminal(id) else {
            return Vec::new();
        };
        let Some(element) = self.element(terminal.owner) else {
            return Vec::new();
        };
        element
            .terminals
            .iter()
            .copied()
            .filter(|&t| t != id)
            .filter(|&t| self.terminal(t).is_some_and(|term| !term.is_virtual))
            .collect()
    }

    // ============ Internal Helpers ============

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub(crate) fn terminal_mut(&mut self, id: TerminalId) -> Option<&mut Terminal> {
        self.terminals.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    fn junction_mut(&mut self, id: JunctionId) -> Option<&mut Junction> {
        self.junctions.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    fn require_element(&self, id: ElementId) -> Result<&Element> {
        self.element(id).ok_or(VoltLabError::UnknownElement { id })
    }

    fn require_element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.element_mut(id)
            .ok_or(VoltLabError::UnknownElement { id })
    }

    fn require_wire(&self, id: WireId) -> Result<&Wire> {
        self.wire(id).ok_or(VoltLabError::UnknownWire { id })
    }

    fn require_wire_mut(&mut self, id: WireId) -> Result<&mut Wire> {
        self.wires
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .ok_or(VoltLabError::UnknownWire { id })
    }

    fn require_terminal(&self, id: TerminalId) -> Result<&Terminal> {
        self.terminal(id)
            .ok_or(VoltLabError::UnknownTerminal { id })
    }
}

fn kind_mismatch(id: ElementId, expected: &'static str, found: &ElementKind) -> VoltLabError {
    VoltLabError::KindMismatch {
        id,
        expected,
        found: found.name(),
    }
}
