//! Component models for the workbench.
//!
//! This module provides models for all supported circuit elements:
//! - Source: Battery
//! - Loads: Resistor, Lamp, Fan
//! - Controls: Switch, Rheostat
//! - Meters: Ammeter, Voltmeter
//!
//! Each element exposes a fixed terminal layout determined by its kind and
//! kind-specific resistance behavior consumed by the analysis passes.

mod controls;
mod loads;
mod meters;
mod sources;

pub use controls::{Rheostat, Switch};
pub use loads::{Fan, Lamp, Resistor};
pub use meters::{Ammeter, Voltmeter};
pub use sources::Battery;

use crate::error::Result;
use crate::workbench::{ElementId, FaultState, Point, TerminalId, TerminalKey, WorkState};

/// A circuit element kind with its parameters. Closed set: the analysis
/// passes dispatch on this tag instead of inspecting types at runtime.
#[derive(Debug, Clone)]
pub enum ElementKind {
    Battery(Battery),
    Resistor(Resistor),
    Rheostat(Rheostat),
    Lamp(Lamp),
    Switch(Switch),
    Ammeter(Ammeter),
    Voltmeter(Voltmeter),
    Fan(Fan),
}

/// One entry of an element's fixed terminal layout.
#[derive(Debug, Clone, Copy)]
pub struct TerminalLayout {
    pub key: TerminalKey,
    pub is_virtual: bool,
}

const fn real(key: TerminalKey) -> TerminalLayout {
    TerminalLayout {
        key,
        is_virtual: false,
    }
}

/// Layout shared by every two-terminal element.
const TWO_TERMINAL: &[TerminalLayout] = &[real(TerminalKey::Left), real(TerminalKey::Right)];

/// Rheostat layout: four binding posts plus the virtual slider tap. The up
/// pair and the tap are one electrical vertex; the resistance element runs
/// between the two down posts.
const RHEOSTAT_TERMINALS: &[TerminalLayout] = &[
    real(TerminalKey::LeftUp),
    real(TerminalKey::RightUp),
    real(TerminalKey::LeftDown),
    real(TerminalKey::RightDown),
    TerminalLayout {
        key: TerminalKey::MiddleUp,
        is_virtual: true,
    },
];

impl ElementKind {
    /// Human-readable kind name.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Battery(_) => "battery",
            ElementKind::Resistor(_) => "resistor",
            ElementKind::Rheostat(_) => "rheostat",
            ElementKind::Lamp(_) => "lamp",
            ElementKind::Switch(_) => "switch",
            ElementKind::Ammeter(_) => "ammeter",
            ElementKind::Voltmeter(_) => "voltmeter",
            ElementKind::Fan(_) => "fan",
        }
    }

    /// The fixed, ordered terminal layout for this kind.
    pub fn terminal_layout(&self) -> &'static [TerminalLayout] {
        match self {
            ElementKind::Rheostat(_) => RHEOSTAT_TERMINALS,
            _ => TWO_TERMINAL,
        }
    }

    /// Validate kind parameters. Out-of-domain values are hard errors,
    /// rejected before they ever enter the workbench.
    pub fn validate(&self) -> Result<()> {
        match self {
            ElementKind::Battery(b) => b.validate(),
            ElementKind::Resistor(r) => r.validate(),
            ElementKind::Rheostat(r) => r.validate(),
            ElementKind::Lamp(l) => l.validate(),
            ElementKind::Fan(f) => f.validate(),
            ElementKind::Switch(_) | ElementKind::Ammeter(_) | ElementKind::Voltmeter(_) => Ok(()),
        }
    }

    /// Base display size in logical units, before scaling.
    pub fn base_size(&self) -> (f64, f64) {
        match self {
            ElementKind::Battery(_) => (120.0, 60.0),
            ElementKind::Resistor(_) => (90.0, 30.0),
            ElementKind::Rheostat(_) => (140.0, 70.0),
            ElementKind::Lamp(_) => (60.0, 80.0),
            ElementKind::Switch(_) => (90.0, 40.0),
            ElementKind::Ammeter(_) | ElementKind::Voltmeter(_) => (80.0, 80.0),
            ElementKind::Fan(_) => (90.0, 90.0),
        }
    }
}

/// A circuit element placed on the workbench.
///
/// Owned exclusively by the [`Workbench`](crate::workbench::Workbench)
/// arena; terminals are referenced by handle in layout order.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub position: Point,
    /// Display scale factor applied to [`ElementKind::base_size`].
    pub scale: f64,
    pub fault: FaultState,
    pub work: WorkState,
    /// Terminal handles, in [`ElementKind::terminal_layout`] order.
    pub terminals: Vec<TerminalId>,
}

impl Element {
    /// Terminal handle for a layout key, if this kind has it.
    pub fn terminal_by_key(&self, key: TerminalKey) -> Option<TerminalId> {
        self.kind
            .terminal_layout()
            .iter()
            .position(|layout| layout.key == key)
            .and_then(|idx| self.terminals.get(idx).copied())
    }

    /// Layout key of one of this element's terminal handles.
    pub fn key_of(&self, terminal: TerminalId) -> Option<TerminalKey> {
        self.terminals
            .iter()
            .position(|&t| t == terminal)
            .map(|idx| self.kind.terminal_layout()[idx].key)
    }

    /// Display size (base size scaled).
    pub fn size(&self) -> (f64, f64) {
        let (w, h) = self.kind.base_size();
        (w * self.scale, h * self.scale)
    }

    pub fn as_battery(&self) -> Option<&Battery> {
        match &self.kind {
            ElementKind::Battery(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_rheostat(&self) -> Option<&Rheostat> {
        match &self.kind {
            ElementKind::Rheostat(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_switch(&self) -> Option<&Switch> {
        match &self.kind {
            ElementKind::Switch(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_battery(&self) -> bool {
        matches!(self.kind, ElementKind::Battery(_))
    }

    pub fn is_rheostat(&self) -> bool {
        matches!(self.kind, ElementKind::Rheostat(_))
    }
}
