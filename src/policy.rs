// Stand-in policies that play out the remainder of a rollout

use crate::action::{JointAction, UnitAction, DEFAULT_WAIT_TICKS};
use crate::candidate::CandidateAction;
use crate::error::RolloutError;
use crate::model::{ForwardModel, RolloutPolicy};
use crate::types::{Side, UnitId};
use crate::world::World;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeSet;

/// Issues nothing; every unit stays idle
#[derive(Debug, Clone, Copy, Default)]
pub struct PassivePolicy;

impl RolloutPolicy<World> for PassivePolicy {
    fn decide(&self, _side: Side, world: &World, _rng: &mut StdRng) -> Result<JointAction, RolloutError> {
        Ok(world.idle_joint())
    }

    fn name(&self) -> &'static str {
        "passive"
    }
}

/// Picks a random legal primitive for every free unit, with attack, harvest
/// and return weighted `bias` times higher than anything else
#[derive(Debug, Clone, Copy)]
pub struct RandomBiasedPolicy {
    pub bias: u32,
    pub wait_ticks: u32,
}

impl Default for RandomBiasedPolicy {
    fn default() -> Self {
        RandomBiasedPolicy {
            bias: 5,
            wait_ticks: DEFAULT_WAIT_TICKS,
        }
    }
}

impl RandomBiasedPolicy {
    pub fn new(bias: u32, wait_ticks: u32) -> Self {
        RandomBiasedPolicy { bias, wait_ticks }
    }

    fn weight(&self, action: &UnitAction) -> u32 {
        match action {
            UnitAction::Attack { .. } | UnitAction::Harvest { .. } | UnitAction::Return { .. } => self.bias.max(1),
            _ => 1,
        }
    }
}

impl RolloutPolicy<World> for RandomBiasedPolicy {
    fn decide(&self, side: Side, world: &World, rng: &mut StdRng) -> Result<JointAction, RolloutError> {
        let mut joint = JointAction::with_base(world.in_flight_usage());

        for unit in world.free_units(side) {
            let mut options: Vec<UnitAction> = world
                .legal_actions(unit)
                .into_iter()
                .map(|action| match action {
                    UnitAction::Wait { .. } => UnitAction::Wait {
                        ticks: self.wait_ticks,
                    },
                    other => other,
                })
                .collect();

            // Weighted draw without replacement until one fits the joint footprint
            while !options.is_empty() {
                let total: u32 = options.iter().map(|a| self.weight(a)).sum();
                let mut pick = rng.random_range(0..total);
                let idx = options
                    .iter()
                    .position(|a| {
                        let w = self.weight(a);
                        if pick < w {
                            true
                        } else {
                            pick -= w;
                            false
                        }
                    })
                    .unwrap_or(0);
                let action = options.swap_remove(idx);
                if joint.admit(world, unit, action) {
                    break;
                }
            }
        }
        Ok(joint)
    }

    fn name(&self) -> &'static str {
        "random_biased"
    }
}

/// Keeps executing persistent intents for the units that own them and lets
/// `fallback` drive every other unit of the side
pub struct IntentPolicy<'a> {
    intents: Vec<CandidateAction>,
    fallback: &'a dyn RolloutPolicy<World>,
}

impl<'a> IntentPolicy<'a> {
    pub fn new(intents: Vec<CandidateAction>, fallback: &'a dyn RolloutPolicy<World>) -> Self {
        IntentPolicy {
            intents: intents.into_iter().filter(|c| c.persists()).collect(),
            fallback,
        }
    }

    pub fn intents(&self) -> &[CandidateAction] {
        &self.intents
    }
}

impl RolloutPolicy<World> for IntentPolicy<'_> {
    fn decide(&self, side: Side, world: &World, rng: &mut StdRng) -> Result<JointAction, RolloutError> {
        let mut joint = JointAction::with_base(world.in_flight_usage());
        let mut driven: BTreeSet<UnitId> = BTreeSet::new();

        for intent in &self.intents {
            let Some(unit) = world.unit(intent.unit) else {
                continue;
            };
            if !unit.is_owned_by(side) || intent.is_complete(world) {
                continue;
            }
            driven.insert(unit.id);
            if world.is_busy(unit.id) {
                continue;
            }
            if let Some(action) = intent.to_primitive(world, joint.usage()) {
                joint.admit(world, unit.id, action);
            }
        }

        let rest = self.fallback.decide(side, world, rng)?;
        for (unit, action) in rest.actions() {
            if !driven.contains(unit) {
                joint.admit(world, *unit, *action);
            }
        }
        Ok(joint)
    }

    fn name(&self) -> &'static str {
        "intent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Intent;
    use crate::types::{Coord, UnitKind};
    use rand::SeedableRng;

    #[test]
    fn test_random_biased_assigns_every_free_unit() {
        let world = World::from_ascii(
            "\
            R.......
            RWB.....
            .W......
            .....bw.",
            10,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let joint = RandomBiasedPolicy::default().decide(Side(0), &world, &mut rng).unwrap();
        // Two workers and the base; wait is always admissible
        assert_eq!(joint.len(), 3);
        for (unit, _) in joint.actions() {
            assert!(world.unit(*unit).unwrap().is_owned_by(Side(0)));
        }
    }

    #[test]
    fn test_random_biased_is_deterministic_per_seed() {
        let world = World::from_ascii("RW.B\n....\nw..b", 10).unwrap();
        let policy = RandomBiasedPolicy::default();
        let a = policy.decide(Side(0), &world, &mut StdRng::seed_from_u64(4)).unwrap();
        let b = policy.decide(Side(0), &world, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_intent_policy_overrides_fallback() {
        let world = World::from_ascii("RW..B", 10).unwrap();
        let worker = world.units().iter().find(|u| u.kind == UnitKind::Worker).unwrap().id;
        let intents = vec![CandidateAction::new(worker, Intent::Move { to: Coord::new(3, 0) })];
        let fallback = RandomBiasedPolicy::default();
        let policy = IntentPolicy::new(intents, &fallback);
        let mut rng = StdRng::seed_from_u64(2);
        let joint = policy.decide(Side(0), &world, &mut rng).unwrap();
        assert_eq!(
            joint.get(worker),
            Some(&UnitAction::Move {
                dir: crate::types::Direction::Right
            })
        );
    }

    #[test]
    fn test_intent_policy_drops_single_shot_intents() {
        let world = World::from_ascii("B.", 1).unwrap();
        let base = world.units()[0].id;
        let policy = IntentPolicy::new(
            vec![CandidateAction::new(base, Intent::Train { kind: UnitKind::Worker })],
            &PassivePolicy,
        );
        assert!(policy.intents().is_empty());
    }
}
