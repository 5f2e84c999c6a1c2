// Greedy joint-action assembly
//
// Agents are visited in generator order. Each selected candidate is converted
// to a primitive against the footprint admitted so far and kept only if its
// own footprint is consistent with it. Rejected agents idle for the tick;
// there is no retry and no backtracking.

use crate::action::JointAction;
use crate::candidate::CandidateAction;
use crate::generator::CandidateGenerator;
use crate::search::table::ChoiceVector;
use crate::world::World;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub fn assemble<'a, I>(world: &World, base: &JointAction, selections: I) -> JointAction
where
    I: IntoIterator<Item = Option<&'a CandidateAction>>,
{
    let mut joint = base.clone();
    for candidate in selections.into_iter().flatten() {
        if let Some(action) = candidate.to_primitive(world, joint.usage()) {
            joint.admit(world, candidate.unit, action);
        }
    }
    joint
}

/// Decodes a choice vector against `world` on top of the generator's base joint action
pub fn assemble_choices(world: &World, generator: &CandidateGenerator, choices: &ChoiceVector) -> JointAction {
    assemble(world, generator.base_joint(), generator.selections(choices))
}

/// Random assembly: every agent tries its candidates in a random order and
/// keeps the first one that is admitted. Returns the admitted choices too.
pub fn assemble_random(world: &World, generator: &CandidateGenerator, rng: &mut StdRng) -> (ChoiceVector, JointAction) {
    let mut joint = generator.base_joint().clone();
    let mut slots = Vec::with_capacity(generator.agents().len());

    for agent in generator.agents() {
        let mut order: Vec<usize> = (0..agent.candidates.len()).collect();
        order.shuffle(rng);
        let chosen = order.into_iter().find(|&idx| {
            let candidate = &agent.candidates[idx];
            candidate
                .to_primitive(world, joint.usage())
                .is_some_and(|action| joint.admit(world, candidate.unit, action))
        });
        slots.push(chosen);
    }
    (ChoiceVector::new(slots), joint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::UnitAction;
    use crate::candidate::Intent;
    use crate::types::{Coord, Direction, Side, UnitKind};

    #[test]
    fn test_currency_overflow_idles_later_agent() {
        let mut world = World::from_ascii("B..B", 1).unwrap();
        world.set_currency(Side(0), 1);
        let trains: Vec<CandidateAction> = world
            .units()
            .iter()
            .map(|u| CandidateAction::new(u.id, Intent::Train { kind: UnitKind::Worker }))
            .collect();
        let joint = assemble(&world, &JointAction::default(), trains.iter().map(Some));
        assert_eq!(joint.len(), 1);
        assert_eq!(
            joint.get(trains[0].unit),
            Some(&UnitAction::Produce {
                dir: Direction::Right,
                kind: UnitKind::Worker
            })
        );
        assert!(!joint.contains(trains[1].unit));
    }

    #[test]
    fn test_none_selections_are_idle() {
        let world = World::from_ascii("W..", 1).unwrap();
        let worker = world.units()[0].id;
        let moving = CandidateAction::new(worker, Intent::Move { to: Coord::new(2, 0) });
        let joint = assemble(&world, &JointAction::default(), vec![None, Some(&moving)]);
        assert_eq!(joint.len(), 1);
        let joint = assemble(&world, &JointAction::default(), vec![None]);
        assert!(joint.is_empty());
    }
}
