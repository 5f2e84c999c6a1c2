// Match runner: plays one game between two controllers
//
// Both sides decide on the same world state each tick, then both joint
// actions are issued (side 0 first) and the clock advances.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::action::JointAction;
use crate::config::{Config, OpponentKind, PolicyKind};
use crate::debug_logger::{DecisionLogEntry, DebugLogger};
use crate::engine::{policy_for, Decision, Engine};
use crate::model::RolloutPolicy;
use crate::search::budget::Budget;
use crate::types::Side;
use crate::world::{maps, World};

/// Who picks the joint actions for one side
pub enum Controller {
    Search(Box<Engine>),
    Scripted(Arc<dyn RolloutPolicy<World>>),
}

impl Controller {
    pub fn name(&self) -> &'static str {
        match self {
            Controller::Search(_) => "search",
            Controller::Scripted(policy) => policy.name(),
        }
    }

    /// Opponent described by the match configuration
    pub fn opponent(config: &Config) -> Self {
        match config.match_play.opponent {
            OpponentKind::Engine => Controller::Search(Box::new(Engine::new(config.clone()))),
            OpponentKind::RandomBiased => Controller::Scripted(policy_for(PolicyKind::RandomBiased, config)),
            OpponentKind::Passive => Controller::Scripted(policy_for(PolicyKind::Passive, config)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub winner: Option<Side>,
    pub ticks: u32,
    /// Joint actions handed out per side
    pub decisions: [u64; Side::COUNT],
    /// Unit actions accepted by the world per side
    pub issued: [u64; Side::COUNT],
}

pub struct Arena {
    world: World,
    controllers: [Controller; Side::COUNT],
    budget: Budget,
    rng: StdRng,
    logger: DebugLogger,
}

impl Arena {
    pub fn new(world: World, controllers: [Controller; Side::COUNT], budget: Budget, seed: u64) -> Self {
        Arena {
            world,
            controllers,
            budget,
            rng: StdRng::seed_from_u64(seed),
            logger: DebugLogger::disabled(),
        }
    }

    /// Arena for the configured map, with a search engine on side 0
    pub fn from_config(config: &Config, seed: u64) -> Result<Self, String> {
        let mut world = maps::load_preset(
            &config.match_play.map,
            config.match_play.starting_currency,
            config.match_play.resource_amount,
        )?;
        world.set_max_ticks(config.match_play.max_ticks);
        let controllers = [
            Controller::Search(Box::new(Engine::new(config.clone()))),
            Controller::opponent(config),
        ];
        Ok(Self::new(world, controllers, config.budget.to_budget(), seed))
    }

    pub fn with_logger(mut self, logger: DebugLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn controller(&self, side: Side) -> &Controller {
        &self.controllers[side.index()]
    }

    fn decide(&mut self, side: Side) -> Option<JointAction> {
        if !self.world.can_act(side) {
            return None;
        }
        match &mut self.controllers[side.index()] {
            Controller::Search(engine) => {
                let intents = engine.active_intents();
                let Decision::Act(joint) = engine.decide(side, &self.world, self.budget) else {
                    return None;
                };
                if self.logger.is_enabled() {
                    if let Some(report) = engine.last_report() {
                        self.logger.log_decision(DecisionLogEntry::new(
                            &self.world,
                            side,
                            report.decision_seed,
                            report.iterations,
                            report.best_mean,
                            intents,
                            joint.clone(),
                        ));
                    }
                }
                Some(joint)
            }
            Controller::Scripted(policy) => match policy.decide(side, &self.world, &mut self.rng) {
                Ok(joint) => Some(joint),
                Err(e) => {
                    debug!("{} policy failed for {}: {}", policy.name(), side, e);
                    None
                }
            },
        }
    }

    /// Plays one tick. Returns true once the game is over.
    pub fn step(&mut self, result: &mut MatchResult) -> bool {
        let joints: Vec<(Side, Option<JointAction>)> = Side::both().into_iter().map(|side| (side, self.decide(side))).collect();
        for (side, joint) in joints {
            if let Some(joint) = joint {
                result.decisions[side.index()] += 1;
                result.issued[side.index()] += self.world.issue(&joint) as u64;
            }
        }
        self.world.cycle()
    }

    /// Plays until the game ends
    pub fn run(&mut self) -> MatchResult {
        let mut result = MatchResult {
            winner: None,
            ticks: 0,
            decisions: [0; Side::COUNT],
            issued: [0; Side::COUNT],
        };
        while !self.world.is_over() {
            if self.step(&mut result) {
                break;
            }
        }
        result.winner = self.world.winner();
        result.ticks = self.world.tick();

        info!(
            "Match over at tick {}: winner {} ({} vs {})",
            result.ticks,
            result.winner.map_or_else(|| "none".to_string(), |side| side.to_string()),
            self.controllers[0].name(),
            self.controllers[1].name()
        );
        result
    }
}

/// Plays one match on the configured map with the given seed
pub fn play_match(config: &Config, seed: u64) -> Result<MatchResult, String> {
    let mut arena = Arena::from_config(config, seed)?;
    Ok(arena.run())
}
