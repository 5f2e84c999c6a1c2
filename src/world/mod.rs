// Turn-quantized grid world: units, in-flight assignments and the tick clock
//
// Units are kept sorted by id so lookups are a binary search and every scan
// over units is deterministic. The wall layout never changes during a game
// and is shared between clones.

pub mod maps;

use crate::action::{JointAction, ResourceUsage, UnitAction, DEFAULT_WAIT_TICKS};
use crate::model::{ForwardModel, TickOutcome};
use crate::types::{Coord, Direction, Side, UnitId, UnitKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resources a worker picks up per harvest action
pub const HARVEST_AMOUNT: i32 = 1;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    /// None for neutral units (resource fields)
    pub side: Option<Side>,
    pub pos: Coord,
    pub hp: i32,
    /// Carried amount for workers, remaining amount for resource fields
    pub resources: i32,
}

impl Unit {
    pub fn is_owned_by(&self, side: Side) -> bool {
        self.side == Some(side)
    }

    pub fn is_enemy_of(&self, side: Side) -> bool {
        matches!(self.side, Some(owner) if owner != side)
    }
}

/// An action a unit is currently executing
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub unit: UnitId,
    pub action: UnitAction,
    pub issued_at: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct World {
    width: i32,
    height: i32,
    walls: Arc<Vec<bool>>,
    units: Vec<Unit>,
    assignments: Vec<Assignment>,
    currency: [i32; Side::COUNT],
    tick: u32,
    max_ticks: u32,
    next_id: u64,
    /// Sides that have owned at least one unit; only those can be eliminated
    fielded: [bool; Side::COUNT],
}

impl World {
    pub const DEFAULT_MAX_TICKS: u32 = 3000;

    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        World {
            width,
            height,
            walls: Arc::new(vec![false; (width * height) as usize]),
            units: Vec::new(),
            assignments: Vec::new(),
            currency: [0; Side::COUNT],
            tick: 0,
            max_ticks: Self::DEFAULT_MAX_TICKS,
            next_id: 0,
            fielded: [false; Side::COUNT],
        }
    }

    /// Marks a cell as wall. Intended for map construction only.
    pub fn set_wall(&mut self, pos: Coord) {
        if self.in_bounds(&pos) {
            let idx = self.index_of(&pos);
            Arc::make_mut(&mut self.walls)[idx] = true;
        }
    }

    pub fn set_currency(&mut self, side: Side, amount: i32) {
        if side.is_valid() {
            self.currency[side.index()] = amount;
        }
    }

    pub fn set_max_ticks(&mut self, max_ticks: u32) {
        self.max_ticks = max_ticks;
    }

    /// Places a new unit with full hit points.
    /// Resource fields start with one unit of resource; use `set_resources` to change it.
    pub fn add_unit(&mut self, kind: UnitKind, side: Option<Side>, pos: Coord) -> Result<UnitId, String> {
        if !self.is_free(&pos) {
            return Err(format!("cannot place {} at {}: cell not free", kind.as_str(), pos));
        }
        if let Some(owner) = side {
            if !owner.is_valid() {
                return Err(format!("invalid side {}", owner.0));
            }
        }
        let resources = if kind == UnitKind::Resource { 1 } else { 0 };
        Ok(self.spawn(kind, side, pos, resources))
    }

    pub fn set_resources(&mut self, id: UnitId, amount: i32) -> bool {
        match self.unit_index(id) {
            Some(idx) => {
                self.units[idx].resources = amount;
                true
            }
            None => false,
        }
    }

    fn spawn(&mut self, kind: UnitKind, side: Option<Side>, pos: Coord, resources: i32) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        if let Some(owner) = side {
            self.fielded[owner.index()] = true;
        }
        self.units.push(Unit {
            id,
            kind,
            side,
            pos,
            hp: kind.stats().hp,
            resources,
        });
        id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    pub fn currency(&self, side: Side) -> i32 {
        if side.is_valid() {
            self.currency[side.index()]
        } else {
            0
        }
    }

    pub fn in_bounds(&self, pos: &Coord) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Row-major cell index. Only meaningful for in-bounds coordinates.
    pub fn index_of(&self, pos: &Coord) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    pub fn coord_of(&self, cell: usize) -> Coord {
        let cell = cell as i32;
        Coord::new(cell % self.width, cell / self.width)
    }

    pub fn is_wall(&self, pos: &Coord) -> bool {
        self.in_bounds(pos) && self.walls[self.index_of(pos)]
    }

    /// In bounds, not a wall, and not occupied by any unit
    pub fn is_free(&self, pos: &Coord) -> bool {
        self.in_bounds(pos) && !self.walls[self.index_of(pos)] && self.unit_at(pos).is_none()
    }

    pub fn is_cell_free(&self, cell: usize) -> bool {
        cell < self.walls.len() && self.is_free(&self.coord_of(cell))
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    fn unit_index(&self, id: UnitId) -> Option<usize> {
        self.units.binary_search_by_key(&id, |u| u.id).ok()
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.unit_index(id).map(|idx| &self.units[idx])
    }

    pub fn unit_at(&self, pos: &Coord) -> Option<&Unit> {
        self.units.iter().find(|u| u.pos == *pos)
    }

    pub fn units_of(&self, side: Side) -> impl Iterator<Item = &Unit> + '_ {
        self.units.iter().filter(move |u| u.side == Some(side))
    }

    pub fn count_kind(&self, side: Side, kind: UnitKind) -> usize {
        self.units_of(side).filter(|u| u.kind == kind).count()
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn assignment(&self, id: UnitId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.unit == id)
    }

    pub fn is_busy(&self, id: UnitId) -> bool {
        self.assignment(id).is_some()
    }

    /// Units of `side` without an in-flight assignment, in id order
    pub fn free_units(&self, side: Side) -> Vec<UnitId> {
        self.units_of(side)
            .filter(|u| !self.is_busy(u.id))
            .map(|u| u.id)
            .collect()
    }

    pub fn can_act(&self, side: Side) -> bool {
        side.is_valid() && !self.is_over() && self.units_of(side).any(|u| !self.is_busy(u.id))
    }

    fn eliminated(&self, side: Side) -> bool {
        self.fielded[side.index()] && self.units_of(side).next().is_none()
    }

    /// Tick limit reached, or a side that once fielded units has none left
    pub fn is_over(&self) -> bool {
        self.tick >= self.max_ticks || Side::both().into_iter().any(|side| self.eliminated(side))
    }

    /// The surviving side when the game ended by elimination
    pub fn winner(&self) -> Option<Side> {
        match (self.eliminated(Side(0)), self.eliminated(Side(1))) {
            (true, false) => Some(Side(1)),
            (false, true) => Some(Side(0)),
            _ => None,
        }
    }

    /// Footprint an action would have if performed by `unit` while in flight,
    /// without any legality checks
    fn usage_of(&self, unit: &Unit, action: &UnitAction) -> ResourceUsage {
        match action {
            UnitAction::Move { dir } => {
                let dest = dir.apply(&unit.pos);
                if self.in_bounds(&dest) {
                    ResourceUsage::new().with_cell(self.index_of(&dest))
                } else {
                    ResourceUsage::new()
                }
            }
            UnitAction::Produce { dir, kind } => {
                let dest = dir.apply(&unit.pos);
                let mut usage = ResourceUsage::new();
                if self.in_bounds(&dest) {
                    usage = usage.with_cell(self.index_of(&dest));
                }
                match unit.side {
                    Some(side) => usage.with_currency(side, kind.stats().cost),
                    None => usage,
                }
            }
            _ => ResourceUsage::new(),
        }
    }

    /// Combined footprint of every in-flight assignment
    pub fn in_flight_usage(&self) -> ResourceUsage {
        let mut usage = ResourceUsage::new();
        for assignment in &self.assignments {
            if let Some(unit) = self.unit(assignment.unit) {
                usage.merge(&self.usage_of(unit, &assignment.action));
            }
        }
        usage
    }

    /// Footprint of `action` for `id`, or None if the unit cannot legally
    /// perform it in the current state
    pub fn footprint(&self, id: UnitId, action: &UnitAction) -> Option<ResourceUsage> {
        let unit = self.unit(id)?;
        let side = unit.side?;
        let kind = unit.kind;
        let legal = match action {
            UnitAction::Wait { .. } => true,
            UnitAction::Move { dir } => kind.can_move() && self.is_free(&dir.apply(&unit.pos)),
            UnitAction::Harvest { dir } => {
                kind.can_harvest()
                    && unit.resources == 0
                    && self
                        .unit_at(&dir.apply(&unit.pos))
                        .is_some_and(|t| t.kind == UnitKind::Resource && t.resources > 0)
            }
            UnitAction::Return { dir } => {
                kind.can_harvest()
                    && unit.resources > 0
                    && self
                        .unit_at(&dir.apply(&unit.pos))
                        .is_some_and(|t| t.kind.is_stockpile() && t.is_owned_by(side))
            }
            UnitAction::Produce { dir, kind: product } => {
                kind.produces().contains(product)
                    && self.is_free(&dir.apply(&unit.pos))
                    && self.currency(side) >= product.stats().cost
            }
            UnitAction::Attack { target } => {
                kind.can_attack()
                    && unit.pos.distance(target) <= kind.stats().range
                    && self.unit_at(target).is_some_and(|t| t.is_enemy_of(side))
            }
        };
        if legal {
            Some(self.usage_of(unit, action))
        } else {
            None
        }
    }

    /// Every primitive action the unit could legally start right now.
    /// Always contains a wait.
    pub fn legal_actions(&self, id: UnitId) -> Vec<UnitAction> {
        let mut actions = vec![UnitAction::Wait {
            ticks: DEFAULT_WAIT_TICKS,
        }];
        let Some(unit) = self.unit(id) else {
            return actions;
        };
        let Some(side) = unit.side else {
            return actions;
        };
        let kind = unit.kind;

        for dir in Direction::all() {
            let dest = dir.apply(&unit.pos);
            if kind.can_move() && self.is_free(&dest) {
                actions.push(UnitAction::Move { dir });
            }
            if kind.can_harvest() {
                if let Some(target) = self.unit_at(&dest) {
                    if unit.resources == 0 && target.kind == UnitKind::Resource && target.resources > 0 {
                        actions.push(UnitAction::Harvest { dir });
                    }
                    if unit.resources > 0 && target.kind.is_stockpile() && target.is_owned_by(side) {
                        actions.push(UnitAction::Return { dir });
                    }
                }
            }
            for product in kind.produces() {
                if self.is_free(&dest) && self.currency(side) >= product.stats().cost {
                    actions.push(UnitAction::Produce { dir, kind: *product });
                }
            }
        }

        if kind.can_attack() {
            let range = kind.stats().range;
            for enemy in self.units.iter().filter(|u| u.is_enemy_of(side)) {
                if unit.pos.distance(&enemy.pos) <= range {
                    actions.push(UnitAction::Attack { target: enemy.pos });
                }
            }
        }
        actions
    }

    /// Starts the actions of a joint action on their units. Actions for busy,
    /// missing or neutral units, illegal actions, and actions whose footprint
    /// collides with in-flight work are skipped. Returns how many were started.
    pub fn issue(&mut self, joint: &JointAction) -> usize {
        let mut committed = self.in_flight_usage();
        let mut issued = 0;
        for (id, action) in joint.actions() {
            if self.is_busy(*id) {
                continue;
            }
            let Some(footprint) = self.footprint(*id, action) else {
                continue;
            };
            if !committed.consistent_with(&footprint, self) {
                continue;
            }
            committed.merge(&footprint);
            self.assignments.push(Assignment {
                unit: *id,
                action: *action,
                issued_at: self.tick,
            });
            issued += 1;
        }
        issued
    }

    /// Advances the clock by one tick and resolves every assignment that is due.
    /// Returns true if the game is over afterwards.
    pub fn cycle(&mut self) -> bool {
        self.tick += 1;
        let now = self.tick;

        let mut due = Vec::new();
        let mut pending = Vec::with_capacity(self.assignments.len());
        for assignment in self.assignments.drain(..) {
            let kind = self
                .units
                .binary_search_by_key(&assignment.unit, |u| u.id)
                .ok()
                .map(|idx| self.units[idx].kind);
            match kind {
                Some(kind) if assignment.issued_at + assignment.action.duration(kind) <= now => {
                    due.push(assignment)
                }
                Some(_) => pending.push(assignment),
                None => {}
            }
        }
        self.assignments = pending;

        for assignment in due {
            self.execute(assignment.unit, assignment.action);
        }
        self.is_over()
    }

    fn execute(&mut self, id: UnitId, action: UnitAction) {
        let Some(idx) = self.unit_index(id) else {
            return;
        };
        let actor = self.units[idx].clone();
        let Some(side) = actor.side else {
            return;
        };

        match action {
            UnitAction::Wait { .. } => {}
            UnitAction::Move { dir } => {
                let dest = dir.apply(&actor.pos);
                if self.is_free(&dest) {
                    self.units[idx].pos = dest;
                }
            }
            UnitAction::Harvest { dir } => {
                let dest = dir.apply(&actor.pos);
                let Some(target) = self.unit_at(&dest).map(|t| t.id) else {
                    return;
                };
                let Some(t_idx) = self.unit_index(target) else {
                    return;
                };
                if self.units[t_idx].kind != UnitKind::Resource || actor.resources > 0 {
                    return;
                }
                let taken = HARVEST_AMOUNT.min(self.units[t_idx].resources);
                self.units[t_idx].resources -= taken;
                self.units[idx].resources += taken;
                if self.units[t_idx].resources <= 0 {
                    self.remove_unit(target);
                }
            }
            UnitAction::Return { dir } => {
                let dest = dir.apply(&actor.pos);
                let accepts = self
                    .unit_at(&dest)
                    .is_some_and(|t| t.kind.is_stockpile() && t.is_owned_by(side));
                if accepts {
                    self.currency[side.index()] += actor.resources;
                    self.units[idx].resources = 0;
                }
            }
            UnitAction::Produce { dir, kind } => {
                let dest = dir.apply(&actor.pos);
                let cost = kind.stats().cost;
                if self.is_free(&dest) && self.currency[side.index()] >= cost {
                    self.currency[side.index()] -= cost;
                    self.spawn(kind, Some(side), dest, 0);
                }
            }
            UnitAction::Attack { target } => {
                if actor.pos.distance(&target) > actor.kind.stats().range {
                    return;
                }
                let Some(victim) = self.unit_at(&target).filter(|t| t.is_enemy_of(side)).map(|t| t.id) else {
                    return;
                };
                let Some(v_idx) = self.unit_index(victim) else {
                    return;
                };
                self.units[v_idx].hp -= actor.kind.stats().damage;
                if self.units[v_idx].hp <= 0 {
                    self.remove_unit(victim);
                }
            }
        }
    }

    fn remove_unit(&mut self, id: UnitId) {
        if let Some(idx) = self.unit_index(id) {
            self.units.remove(idx);
        }
        self.assignments.retain(|a| a.unit != id);
    }

    /// Renders the grid as ASCII using the map legend
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = Coord::new(x, y);
                let symbol = match self.unit_at(&pos) {
                    Some(unit) => maps::symbol_for(unit.kind, unit.side),
                    None if self.is_wall(&pos) => '#',
                    None => '.',
                };
                out.push(symbol);
            }
            out.push('\n');
        }
        out
    }
}

impl ForwardModel for World {
    type Joint = JointAction;

    fn apply(&mut self, joint: &JointAction) {
        self.issue(joint);
    }

    fn advance_one_tick(&mut self) -> TickOutcome {
        let ended = self.cycle();
        TickOutcome {
            ended,
            winner: if ended { self.winner() } else { None },
        }
    }

    fn current_tick(&self) -> u32 {
        self.tick
    }

    fn can_act(&self, side: Side) -> bool {
        World::can_act(self, side)
    }

    fn is_over(&self) -> bool {
        World::is_over(self)
    }

    fn idle_joint(&self) -> JointAction {
        JointAction::default()
    }
}
