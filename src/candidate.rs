// Candidate actions: coarse per-unit intents that expand into one primitive
// action per tick until they complete

use crate::action::{ResourceUsage, UnitAction};
use crate::pathfinding;
use crate::types::{Coord, Direction, UnitId, UnitKind};
use crate::world::World;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Stand still, striking any enemy that comes within range
    Idle,
    Move { to: Coord },
    /// Shuttle between a resource field and a stockpile
    Harvest { target: UnitId, base: UnitId },
    Attack { target: UnitId },
    /// Produce one unit into the first free neighbouring cell
    Train { kind: UnitKind },
    /// Walk next to `at` and construct a building there
    Build { kind: UnitKind, at: Coord },
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateAction {
    pub unit: UnitId,
    pub intent: Intent,
}

impl CandidateAction {
    pub fn new(unit: UnitId, intent: Intent) -> Self {
        CandidateAction { unit, intent }
    }

    /// Intents that keep driving the unit across ticks once admitted.
    /// Idle and Train are re-decided every time the unit is free.
    pub fn persists(&self) -> bool {
        matches!(
            self.intent,
            Intent::Move { .. } | Intent::Harvest { .. } | Intent::Attack { .. } | Intent::Build { .. }
        )
    }

    /// True once the intent has nothing left to do in `world`.
    /// A vanished unit completes every intent.
    pub fn is_complete(&self, world: &World) -> bool {
        let Some(unit) = world.unit(self.unit) else {
            return true;
        };
        match self.intent {
            Intent::Idle | Intent::Train { .. } => false,
            Intent::Move { to } => unit.pos == to,
            Intent::Harvest { target, base } => world.unit(target).is_none() || world.unit(base).is_none(),
            Intent::Attack { target } => world.unit(target).is_none(),
            // Finished when anything immobile stands on the site: our building or an obstruction
            Intent::Build { at, .. } => world.unit_at(&at).is_some_and(|u| !u.kind.can_move()),
        }
    }

    /// Primitive action the intent asks for this tick, or None when it has
    /// nothing to do. Cells claimed by `committed` are treated as blocked.
    pub fn to_primitive(&self, world: &World, committed: &ResourceUsage) -> Option<UnitAction> {
        let unit = world.unit(self.unit)?;
        let side = unit.side?;
        let stats = unit.kind.stats();

        match self.intent {
            Intent::Idle => {
                if !unit.kind.can_attack() {
                    return None;
                }
                world
                    .units()
                    .iter()
                    .filter(|u| u.is_enemy_of(side) && unit.pos.distance(&u.pos) <= stats.range)
                    .min_by_key(|u| unit.pos.distance(&u.pos))
                    .map(|enemy| UnitAction::Attack { target: enemy.pos })
            }
            Intent::Move { to } => {
                if unit.pos == to {
                    return None;
                }
                pathfinding::step_to(world, unit.pos, to, committed).map(|dir| UnitAction::Move { dir })
            }
            Intent::Harvest { target, base } => {
                if unit.resources == 0 {
                    let field = world.unit(target)?;
                    match Direction::between(&unit.pos, &field.pos) {
                        Some(dir) => Some(UnitAction::Harvest { dir }),
                        None => pathfinding::step_next_to(world, unit.pos, field.pos, committed)
                            .map(|dir| UnitAction::Move { dir }),
                    }
                } else {
                    let stockpile = world.unit(base)?;
                    match Direction::between(&unit.pos, &stockpile.pos) {
                        Some(dir) => Some(UnitAction::Return { dir }),
                        None => pathfinding::step_next_to(world, unit.pos, stockpile.pos, committed)
                            .map(|dir| UnitAction::Move { dir }),
                    }
                }
            }
            Intent::Attack { target } => {
                let enemy = world.unit(target)?;
                if unit.pos.distance(&enemy.pos) <= stats.range {
                    Some(UnitAction::Attack { target: enemy.pos })
                } else {
                    pathfinding::step_within_range(world, unit.pos, enemy.pos, stats.range, committed)
                        .map(|dir| UnitAction::Move { dir })
                }
            }
            Intent::Train { kind } => Direction::all()
                .into_iter()
                .find(|dir| {
                    let dest = dir.apply(&unit.pos);
                    world.is_free(&dest) && !committed.claims_cell(world.index_of(&dest))
                })
                .map(|dir| UnitAction::Produce { dir, kind }),
            Intent::Build { kind, at } => match Direction::between(&unit.pos, &at) {
                Some(dir) if world.is_free(&at) => Some(UnitAction::Produce { dir, kind }),
                Some(_) => None,
                None => pathfinding::step_next_to(world, unit.pos, at, committed).map(|dir| UnitAction::Move { dir }),
            },
        }
    }

    pub fn label(&self) -> String {
        match self.intent {
            Intent::Idle => format!("{}:idle", self.unit),
            Intent::Move { to } => format!("{}:move{}", self.unit, to),
            Intent::Harvest { target, base } => format!("{}:harvest({}->{})", self.unit, target, base),
            Intent::Attack { target } => format!("{}:attack({})", self.unit, target),
            Intent::Train { kind } => format!("{}:train({})", self.unit, kind.as_str()),
            Intent::Build { kind, at } => format!("{}:build({}@{})", self.unit, kind.as_str(), at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn economy() -> World {
        World::from_ascii(
            "\
            ......
            .RWB..
            ......",
            5,
        )
        .unwrap()
    }

    fn find(world: &World, kind: UnitKind) -> UnitId {
        world.units().iter().find(|u| u.kind == kind).unwrap().id
    }

    #[test]
    fn test_harvest_expands_to_harvest_then_return() {
        let mut world = economy();
        let worker = find(&world, UnitKind::Worker);
        let candidate = CandidateAction::new(
            worker,
            Intent::Harvest {
                target: find(&world, UnitKind::Resource),
                base: find(&world, UnitKind::Base),
            },
        );
        let none = ResourceUsage::new();
        assert_eq!(
            candidate.to_primitive(&world, &none),
            Some(UnitAction::Harvest { dir: Direction::Left })
        );

        let mut joint = crate::action::JointAction::default();
        assert!(joint.admit(&world, worker, UnitAction::Harvest { dir: Direction::Left }));
        world.issue(&joint);
        for _ in 0..20 {
            world.cycle();
        }
        assert_eq!(
            candidate.to_primitive(&world, &none),
            Some(UnitAction::Return { dir: Direction::Right })
        );
        assert!(!candidate.is_complete(&world));
    }

    #[test]
    fn test_train_skips_committed_cells() {
        let world = economy();
        let base = find(&world, UnitKind::Base);
        let candidate = CandidateAction::new(base, Intent::Train { kind: UnitKind::Worker });
        let up = world.index_of(&Coord::new(3, 0));
        let committed = ResourceUsage::new().with_cell(up);
        assert_eq!(
            candidate.to_primitive(&world, &committed),
            Some(UnitAction::Produce {
                dir: Direction::Right,
                kind: UnitKind::Worker
            })
        );
    }

    #[test]
    fn test_move_completion() {
        let world = economy();
        let worker = find(&world, UnitKind::Worker);
        let here = CandidateAction::new(worker, Intent::Move { to: Coord::new(2, 1) });
        assert!(here.is_complete(&world));
        assert_eq!(here.to_primitive(&world, &ResourceUsage::new()), None);

        let there = CandidateAction::new(worker, Intent::Move { to: Coord::new(2, 2) });
        assert!(!there.is_complete(&world));
        assert_eq!(
            there.to_primitive(&world, &ResourceUsage::new()),
            Some(UnitAction::Move { dir: Direction::Down })
        );
    }

    #[test]
    fn test_idle_attacks_only_in_range() {
        let world = World::from_ascii("L.w", 1).unwrap();
        let light = find(&world, UnitKind::Light);
        let idle = CandidateAction::new(light, Intent::Idle);
        assert_eq!(idle.to_primitive(&world, &ResourceUsage::new()), None);

        let world = World::from_ascii("Lw.", 1).unwrap();
        let light = find(&world, UnitKind::Light);
        let idle = CandidateAction::new(light, Intent::Idle);
        assert_eq!(
            idle.to_primitive(&world, &ResourceUsage::new()),
            Some(UnitAction::Attack { target: Coord::new(1, 0) })
        );
    }

    #[test]
    fn test_vanished_unit_completes_intent() {
        let world = economy();
        let ghost = CandidateAction::new(UnitId(999), Intent::Idle);
        assert!(ghost.is_complete(&world));
        assert_eq!(ghost.to_primitive(&world, &ResourceUsage::new()), None);
        assert_eq!(world.currency(Side(0)), 0);
    }

    #[test]
    fn test_build_walks_then_produces() {
        let world = economy();
        let worker = find(&world, UnitKind::Worker);
        let far = CandidateAction::new(
            worker,
            Intent::Build {
                kind: UnitKind::Barracks,
                at: Coord::new(5, 2),
            },
        );
        assert!(matches!(
            far.to_primitive(&world, &ResourceUsage::new()),
            Some(UnitAction::Move { .. })
        ));

        let near = CandidateAction::new(
            worker,
            Intent::Build {
                kind: UnitKind::Barracks,
                at: Coord::new(2, 2),
            },
        );
        assert_eq!(
            near.to_primitive(&world, &ResourceUsage::new()),
            Some(UnitAction::Produce {
                dir: Direction::Down,
                kind: UnitKind::Barracks
            })
        );
    }
}
