// Primitive unit actions, resource footprints and joint actions

use crate::types::{Coord, Direction, Side, UnitId, UnitKind};
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ticks a unit waits when it has nothing better to do
pub const DEFAULT_WAIT_TICKS: u32 = 10;

/// A single primitive order for one unit. Lasts `duration` ticks once issued.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitAction {
    Wait { ticks: u32 },
    Move { dir: Direction },
    Harvest { dir: Direction },
    Return { dir: Direction },
    Produce { dir: Direction, kind: UnitKind },
    Attack { target: Coord },
}

impl UnitAction {
    /// Ticks until the action takes effect when performed by `actor`
    pub fn duration(&self, actor: UnitKind) -> u32 {
        let stats = actor.stats();
        let ticks = match self {
            UnitAction::Wait { ticks } => *ticks,
            UnitAction::Move { .. } => stats.move_time,
            UnitAction::Harvest { .. } => stats.harvest_time,
            UnitAction::Return { .. } => stats.return_time,
            UnitAction::Produce { kind, .. } => kind.stats().produce_time,
            UnitAction::Attack { .. } => stats.attack_time,
        };
        ticks.max(1)
    }

    pub fn label(&self) -> String {
        match self {
            UnitAction::Wait { ticks } => format!("wait({})", ticks),
            UnitAction::Move { dir } => format!("move({})", dir.as_str()),
            UnitAction::Harvest { dir } => format!("harvest({})", dir.as_str()),
            UnitAction::Return { dir } => format!("return({})", dir.as_str()),
            UnitAction::Produce { dir, kind } => {
                format!("produce({}, {})", kind.as_str(), dir.as_str())
            }
            UnitAction::Attack { target } => format!("attack{}", target),
        }
    }
}

/// Cells and currency an action (or a set of actions) claims while in flight.
/// Cells are stored as row-major indices into the world grid.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    cells: BTreeSet<usize>,
    currency: [i32; Side::COUNT],
}

impl ResourceUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, cell: usize) -> Self {
        self.cells.insert(cell);
        self
    }

    pub fn with_currency(mut self, side: Side, amount: i32) -> Self {
        if side.is_valid() {
            self.currency[side.index()] += amount;
        }
        self
    }

    pub fn cells(&self) -> &BTreeSet<usize> {
        &self.cells
    }

    pub fn claims_cell(&self, cell: usize) -> bool {
        self.cells.contains(&cell)
    }

    pub fn currency(&self, side: Side) -> i32 {
        if side.is_valid() {
            self.currency[side.index()]
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.currency.iter().all(|c| *c == 0)
    }

    /// Whether `other` can be added on top of this usage in `world`:
    /// no shared cells, none of `other`'s cells occupied, and the combined
    /// currency within each side's balance.
    pub fn consistent_with(&self, other: &ResourceUsage, world: &World) -> bool {
        if other.cells.iter().any(|cell| self.cells.contains(cell)) {
            return false;
        }
        if other.cells.iter().any(|cell| !world.is_cell_free(*cell)) {
            return false;
        }
        Side::both().into_iter().all(|side| {
            let extra = other.currency(side);
            extra == 0 || self.currency(side) + extra <= world.currency(side)
        })
    }

    pub fn merge(&mut self, other: &ResourceUsage) {
        self.cells.extend(other.cells.iter().copied());
        for (mine, theirs) in self.currency.iter_mut().zip(other.currency.iter()) {
            *mine += theirs;
        }
    }
}

/// Primitive actions for a subset of one side's units plus the combined
/// footprint of everything admitted so far (including the base usage it was
/// started from).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct JointAction {
    actions: Vec<(UnitId, UnitAction)>,
    usage: ResourceUsage,
}

impl JointAction {
    /// Empty joint action on top of an existing footprint
    pub fn with_base(usage: ResourceUsage) -> Self {
        JointAction {
            actions: Vec::new(),
            usage,
        }
    }

    /// Admits `action` for `unit` if it is legal and its footprint is
    /// consistent with everything already admitted. Returns whether it was added.
    pub fn admit(&mut self, world: &World, unit: UnitId, action: UnitAction) -> bool {
        if self.contains(unit) {
            return false;
        }
        let Some(footprint) = world.footprint(unit, &action) else {
            return false;
        };
        if !self.usage.consistent_with(&footprint, world) {
            return false;
        }
        self.usage.merge(&footprint);
        self.actions.push((unit, action));
        true
    }

    pub fn actions(&self) -> &[(UnitId, UnitAction)] {
        &self.actions
    }

    pub fn get(&self, unit: UnitId) -> Option<&UnitAction> {
        self.actions
            .iter()
            .find(|(id, _)| *id == unit)
            .map(|(_, action)| action)
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.get(unit).is_some()
    }

    pub fn usage(&self) -> &ResourceUsage {
        &self.usage
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Compact one-line description for logs
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self
            .actions
            .iter()
            .map(|(id, action)| format!("{}:{}", id, action.label()))
            .collect();
        format!("[{}]", parts.join(" "))
    }
}
