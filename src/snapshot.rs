//! Serializable snapshot of the component/wire graph.
//!
//! The snapshot is the persistence schema of the engine: for every element
//! its kind tag, placement and kind-specific parameters, and for every wire
//! its four junction coordinates and endpoint attachments. Computed state
//! (potentials, work states, node membership, meter readings) never
//! round-trips through storage; it is rebuilt by the next analysis pass.
//!
//! The concrete on-disk encoding belongs to the caller; [`Snapshot`] is
//! plain serde data, with JSON helpers for convenience.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::{
    Ammeter, Battery, ElementKind, Fan, Lamp, Resistor, Rheostat, Switch, Voltmeter,
};
use crate::error::{Result, VoltLabError};
use crate::workbench::{ElementId, FaultState, Point, TerminalKey, WireEnd, Workbench};

/// Persisted parameters of one element, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementRecord {
    Battery { voltage: f64 },
    Resistor { resistance: f64 },
    Rheostat { max_resistance: f64, tap: f64 },
    Lamp { rated_voltage: f64, rated_power: f64 },
    Switch { closed: bool },
    Ammeter,
    Voltmeter,
    Fan { resistance: f64 },
}

/// One persisted element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub record: ElementRecord,
    pub position: Point,
    pub scale: f64,
    pub fault: FaultState,
}

/// A wire endpoint attachment: element by document index, terminal by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub element: usize,
    pub terminal: TerminalKey,
}

/// One persisted wire: endpoint and handle coordinates plus attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSnapshot {
    /// StartPoint, StartHandle, EndHandle, EndPoint coordinates.
    pub points: [Point; 4],
    pub fault: FaultState,
    pub start: Option<AttachmentRef>,
    pub end: Option<AttachmentRef>,
}

/// A serializable snapshot of the whole workbench.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub elements: Vec<ElementSnapshot>,
    pub wires: Vec<WireSnapshot>,
}

impl Snapshot {
    /// Capture the persisted fields of a workbench.
    pub fn capture(bench: &Workbench) -> Snapshot {
        let index_of: HashMap<ElementId, usize> = bench
            .elements()
            .enumerate()
            .map(|(index, element)| (element.id, index))
            .collect();

        let elements = bench
            .elements()
            .map(|element| ElementSnapshot {
                record: record_of(&element.kind),
                position: element.position,
                scale: element.scale,
                fault: element.fault,
            })
            .collect();

        let wires = bench
            .wires()
            .map(|wire| {
                let point_at = |slot: usize| {
                    bench
                        .junction(wire.junctions[slot])
                        .map(|j| j.position)
                        .unwrap_or_default()
                };
                let attachment = |slot: usize| {
                    let terminal = bench.junction(wire.junctions[slot])?.terminal?;
                    let term = bench.terminal(terminal)?;
                    Some(AttachmentRef {
                        element: *index_of.get(&term.owner)?,
                        terminal: term.key,
                    })
                };
                WireSnapshot {
                    points: [point_at(0), point_at(1), point_at(2), point_at(3)],
                    fault: wire.fault,
                    start: attachment(0),
                    end: attachment(3),
                }
            })
            .collect();

        Snapshot { elements, wires }
    }

    /// Rebuild a workbench from persisted fields, re-validating every
    /// parameter on the way in.
    pub fn restore(&self) -> Result<Workbench> {
        let mut bench = Workbench::new();

        let mut element_ids = Vec::with_capacity(self.elements.len());
        for snapshot in &self.elements {
            let id = bench.add_element(kind_of(&snapshot.record))?;
            bench.move_element(id, snapshot.position)?;
            bench.set_scale(id, snapshot.scale)?;
            bench.set_element_fault(id, snapshot.fault)?;
            element_ids.push(id);
        }

        for snapshot in &self.wires {
            let wire = bench.add_wire(snapshot.points[0], snapshot.points[3]);
            let junctions = bench
                .wire(wire)
                .map(|w| w.junctions)
                .ok_or_else(|| VoltLabError::snapshot("wire vanished during restore"))?;
            for (junction, point) in junctions.into_iter().zip(snapshot.points) {
                bench.move_junction(junction, point)?;
            }
            bench.set_wire_fault(wire, snapshot.fault)?;

            for (end, attachment) in [(WireEnd::Start, &snapshot.start), (WireEnd::End, &snapshot.end)]
            {
                let Some(attachment) = attachment else {
                    continue;
                };
                let element_id = element_ids.get(attachment.element).copied().ok_or_else(|| {
                    VoltLabError::snapshot(format!(
                        "wire references element index {} of {}",
                        attachment.element,
                        element_ids.len()
                    ))
                })?;
                let terminal = bench
                    .element(element_id)
                    .and_then(|e| e.terminal_by_key(attachment.terminal))
                    .ok_or_else(|| {
                        VoltLabError::snapshot(format!(
                            "element index {} has no terminal {}",
                            attachment.element, attachment.terminal
                        ))
                    })?;
                bench.plug(wire, end, terminal)?;
            }
        }

        Ok(bench)
    }

    /// Encode as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(input: &str) -> Result<Snapshot> {
        Ok(serde_json::from_str(input)?)
    }
}

fn record_of(kind: &ElementKind) -> ElementRecord {
    match kind {
        ElementKind::Battery(b) => ElementRecord::Battery { voltage: b.voltage },
        ElementKind::Resistor(r) => ElementRecord::Resistor {
            resistance: r.resistance,
        },
        ElementKind::Rheostat(r) => ElementRecord::Rheostat {
            max_resistance: r.max_resistance,
            tap: r.tap,
        },
        ElementKind::Lamp(l) => ElementRecord::Lamp {
            rated_voltage: l.rated_voltage,
            rated_power: l.rated_power,
        },
        ElementKind::Switch(s) => ElementRecord::Switch { closed: s.closed },
        ElementKind::Ammeter(_) => ElementRecord::Ammeter,
        ElementKind::Voltmeter(_) => ElementRecord::Voltmeter,
        ElementKind::Fan(f) => ElementRecord::Fan {
            resistance: f.resistance,
        },
    }
}

fn kind_of(record: &ElementRecord) -> ElementKind {
    match record {
        ElementRecord::Battery { voltage } => ElementKind::Battery(Battery::new(*voltage)),
        ElementRecord::Resistor { resistance } => ElementKind::Resistor(Resistor::new(*resistance)),
        ElementRecord::Rheostat {
            max_resistance,
            tap,
        } => ElementKind::Rheostat(Rheostat::new(*max_resistance, *tap)),
        ElementRecord::Lamp {
            rated_voltage,
            rated_power,
        } => ElementKind::Lamp(Lamp::new(*rated_voltage, *rated_power)),
        ElementRecord::Switch { closed } => ElementKind::Switch(Switch::new(*closed)),
        ElementRecord::Ammeter => ElementKind::Ammeter(Ammeter::new()),
        ElementRecord::Voltmeter => ElementKind::Voltmeter(Voltmeter::new()),
        ElementRecord::Fan { resistance } => ElementKind::Fan(Fan::new(*resistance)),
    }
}
