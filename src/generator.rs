// Candidate generation for one side at one decision tick
//
// For every free unit without an active intent the generator builds an
// ordered list of candidate intents according to the unit's role. Units that
// still follow an intent from an earlier decision are converted up front into
// the base joint action and take no part in the search. An intent that can
// no longer be carried out is dropped and its unit is searched again.

use crate::action::{JointAction, UnitAction};
use crate::assembler;
use crate::candidate::{CandidateAction, Intent};
use crate::config::CandidateConfig;
use crate::search::table::ChoiceVector;
use crate::types::{Coord, Role, Side, UnitId, UnitKind};
use crate::world::{Unit, World};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Persisted intents keyed by unit, carried between decisions by the engine
pub type ActiveIntents = BTreeMap<UnitId, CandidateAction>;

/// Candidate list of one searchable agent
#[derive(Debug, Clone)]
pub struct AgentChoices {
    pub unit: UnitId,
    pub candidates: Vec<CandidateAction>,
}

#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    settings: CandidateConfig,
    side: Side,
    agents: Vec<AgentChoices>,
    base: JointAction,
    active: Vec<CandidateAction>,
    stalled: Vec<UnitId>,
    committed_currency: i32,
    reserved: Vec<Coord>,
}

impl CandidateGenerator {
    pub fn new(settings: &CandidateConfig) -> Self {
        CandidateGenerator {
            settings: settings.clone(),
            side: Side(0),
            agents: Vec::new(),
            base: JointAction::default(),
            active: Vec::new(),
            stalled: Vec::new(),
            committed_currency: 0,
            reserved: Vec::new(),
        }
    }

    /// Rebuilds candidate lists and the base joint action for `side`.
    /// Returns false when no agent has any candidate.
    pub fn reset(&mut self, world: &World, side: Side, rng: &mut StdRng, intents: &ActiveIntents) -> bool {
        self.side = side;
        self.agents.clear();
        self.active.clear();
        self.stalled.clear();
        self.reserved.clear();
        self.committed_currency = 0;
        self.base = JointAction::with_base(world.in_flight_usage());

        for unit in world.units_of(side) {
            if world.is_busy(unit.id) {
                continue;
            }
            if let Some(intent) = intents.get(&unit.id) {
                let admitted = intent
                    .to_primitive(world, self.base.usage())
                    .is_some_and(|action| self.base.admit(world, unit.id, action));
                if admitted {
                    self.active.push(*intent);
                    continue;
                }
                self.stalled.push(unit.id);
            }
            let candidates = self.candidates_for(world, unit, rng);
            self.agents.push(AgentChoices {
                unit: unit.id,
                candidates,
            });
        }

        self.randomize_order(rng);
        self.has_choices()
    }

    fn candidates_for(&mut self, world: &World, unit: &Unit, rng: &mut StdRng) -> Vec<CandidateAction> {
        let mut out = Vec::new();
        match unit.kind.role() {
            Role::Harvester => {
                if let Some(harvest) = self.harvest_candidate(world, unit) {
                    out.push(harvest);
                }
                if let Some(build) = self.build_candidate(world, unit) {
                    out.push(build);
                }
                if let Some(wander) = random_move(world, unit, rng) {
                    out.push(wander);
                }
            }
            Role::Producer => {
                for kind in unit.kind.produces() {
                    if let Some(train) = self.train_candidate(world, unit, *kind) {
                        out.push(train);
                    }
                }
            }
            Role::Barracks => {
                for kind in unit.kind.produces() {
                    if let Some(train) = self.train_candidate(world, unit, *kind) {
                        out.push(train);
                    }
                }
                out.push(CandidateAction::new(unit.id, Intent::Idle));
            }
            Role::Combat => {
                if let Some(attack) = nearest_enemy(world, unit) {
                    out.push(CandidateAction::new(unit.id, Intent::Attack { target: attack }));
                }
                if let Some(wander) = random_move(world, unit, rng) {
                    out.push(wander);
                }
            }
            Role::Passive => out.push(CandidateAction::new(unit.id, Intent::Idle)),
        }
        out
    }

    fn affordable(&self, world: &World, cost: i32) -> bool {
        self.committed_currency + cost <= world.currency(self.side)
    }

    fn train_candidate(&mut self, world: &World, unit: &Unit, kind: UnitKind) -> Option<CandidateAction> {
        if kind == UnitKind::Worker && world.count_kind(self.side, UnitKind::Worker) >= self.settings.max_workers {
            return None;
        }
        let cost = kind.stats().cost;
        if !self.affordable(world, cost) {
            return None;
        }
        self.committed_currency += cost;
        Some(CandidateAction::new(unit.id, Intent::Train { kind }))
    }

    fn harvest_candidate(&self, world: &World, unit: &Unit) -> Option<CandidateAction> {
        let target = nearest(world, unit.pos, |u| u.kind == UnitKind::Resource)?;
        let base = nearest(world, unit.pos, |u| u.kind.is_stockpile() && u.is_owned_by(self.side))?;
        Some(CandidateAction::new(unit.id, Intent::Harvest { target, base }))
    }

    fn build_candidate(&mut self, world: &World, unit: &Unit) -> Option<CandidateAction> {
        let kind = UnitKind::Barracks;
        if world.count_kind(self.side, kind) > 0 {
            return None;
        }
        let crowded = world.units().iter().any(|u| {
            (u.kind == UnitKind::Resource || u.kind.is_stockpile())
                && u.pos.distance(&unit.pos) < self.settings.build_clearance
        });
        if crowded {
            return None;
        }
        let cost = kind.stats().cost;
        if !self.affordable(world, cost) {
            return None;
        }
        let at = find_building_position(unit.pos, &self.reserved, world)?;
        self.reserved.push(at);
        self.committed_currency += cost;
        Some(CandidateAction::new(unit.id, Intent::Build { kind, at }))
    }

    /// Shuffles every candidate list so list position carries no preference
    pub fn randomize_order(&mut self, rng: &mut StdRng) {
        for agent in &mut self.agents {
            agent.candidates.shuffle(rng);
        }
    }

    pub fn agents(&self) -> &[AgentChoices] {
        &self.agents
    }

    /// In-flight footprint plus the primitives of active intents
    pub fn base_joint(&self) -> &JointAction {
        &self.base
    }

    /// Intents that were converted into the base joint action this tick
    pub fn active_intents(&self) -> &[CandidateAction] {
        &self.active
    }

    /// Units whose intent produced no admissible primitive this tick.
    /// They are agents again and their intents should be forgotten.
    pub fn stalled_intents(&self) -> &[UnitId] {
        &self.stalled
    }

    /// Cells reserved for buildings during this reset
    pub fn reserved_sites(&self) -> &[Coord] {
        &self.reserved
    }

    pub fn has_choices(&self) -> bool {
        self.agents.iter().any(|agent| !agent.candidates.is_empty())
    }

    /// Number of distinct choice vectors. Empty lists count as a single "none" option.
    pub fn space_size(&self) -> u64 {
        self.agents.iter().fold(1u64, |size, agent| {
            size.saturating_mul(agent.candidates.len().max(1) as u64)
        })
    }

    pub fn candidate(&self, agent: usize, choice: usize) -> Option<&CandidateAction> {
        self.agents.get(agent)?.candidates.get(choice)
    }

    /// Candidates selected by a choice vector, one slot per agent
    pub fn selections<'a>(&'a self, choices: &'a ChoiceVector) -> impl Iterator<Item = Option<&'a CandidateAction>> + 'a {
        (0..self.agents.len()).map(move |agent| choices.get(agent).and_then(|choice| self.candidate(agent, choice)))
    }

    /// Candidate vector of a random consistent joint action
    pub fn random_choices(&self, world: &World, rng: &mut StdRng) -> ChoiceVector {
        assembler::assemble_random(world, self, rng).0
    }

    /// Fresh random draw for one agent: candidates are tried in random order
    /// and the first whose primitive fits the base footprint is returned
    pub fn draw_for_agent(&self, agent: usize, world: &World, rng: &mut StdRng) -> Option<usize> {
        let candidates = &self.agents.get(agent)?.candidates;
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.shuffle(rng);
        order.into_iter().find(|&idx| {
            let candidate = &candidates[idx];
            candidate
                .to_primitive(world, self.base.usage())
                .and_then(|action| world.footprint(candidate.unit, &action))
                .is_some_and(|footprint| self.base.usage().consistent_with(&footprint, world))
        })
    }

    /// Cartesian product of the candidate lists in list order, at most `limit` vectors
    pub fn enumerate(&self, limit: usize) -> Vec<ChoiceVector> {
        let mut out = Vec::new();
        if limit == 0 {
            return out;
        }
        let mut current: Vec<usize> = vec![0; self.agents.len()];
        loop {
            let choices = current
                .iter()
                .zip(&self.agents)
                .map(|(idx, agent)| if agent.candidates.is_empty() { None } else { Some(*idx) })
                .collect();
            out.push(ChoiceVector::new(choices));
            if out.len() >= limit {
                return out;
            }

            // Odometer increment, first agent varies fastest
            let mut carried = true;
            for (slot, agent) in current.iter_mut().zip(&self.agents) {
                let len = agent.candidates.len().max(1);
                *slot += 1;
                if *slot < len {
                    carried = false;
                    break;
                }
                *slot = 0;
            }
            if carried {
                return out;
            }
        }
    }

    /// Primitive action the base joint action holds for a unit, if any
    pub fn base_action(&self, unit: UnitId) -> Option<&UnitAction> {
        self.base.get(unit)
    }
}

/// Nearest unit matching `filter`; ties go to the lowest id
fn nearest<F>(world: &World, from: Coord, filter: F) -> Option<UnitId>
where
    F: Fn(&Unit) -> bool,
{
    let mut best: Option<(i32, UnitId)> = None;
    for unit in world.units().iter().filter(|u| filter(u)) {
        let d = unit.pos.distance(&from);
        if best.map_or(true, |(best_d, _)| d < best_d) {
            best = Some((d, unit.id));
        }
    }
    best.map(|(_, id)| id)
}

fn nearest_enemy(world: &World, unit: &Unit) -> Option<UnitId> {
    let side = unit.side?;
    nearest(world, unit.pos, |u| u.is_enemy_of(side))
}

fn random_move(world: &World, unit: &Unit, rng: &mut StdRng) -> Option<CandidateAction> {
    if !unit.kind.can_move() {
        return None;
    }
    let open: Vec<Coord> = (0..world.height())
        .flat_map(|y| (0..world.width()).map(move |x| Coord::new(x, y)))
        .filter(|pos| world.is_free(pos))
        .collect();
    if open.is_empty() {
        return None;
    }
    let to = open[rng.random_range(0..open.len())];
    Some(CandidateAction::new(unit.id, Intent::Move { to }))
}

/// Spirals outward from `origin` ring by ring, scanning the top, right,
/// bottom and left edges, and returns the first free cell not in `reserved`
pub fn find_building_position(origin: Coord, reserved: &[Coord], world: &World) -> Option<Coord> {
    let rings = world.width().max(world.height());
    let usable = |pos: Coord| world.is_free(&pos) && !reserved.contains(&pos);

    for l in 1..rings {
        let edges = [
            (-l..=l).map(|d| Coord::new(origin.x + d, origin.y - l)).collect::<Vec<_>>(),
            (-l..=l).map(|d| Coord::new(origin.x + l, origin.y + d)).collect(),
            (-l..=l).map(|d| Coord::new(origin.x + d, origin.y + l)).collect(),
            (-l..=l).map(|d| Coord::new(origin.x - l, origin.y + d)).collect(),
        ];
        for edge in edges {
            if let Some(pos) = edge.into_iter().find(|pos| usable(*pos)) {
                return Some(pos);
            }
        }
    }
    None
}
