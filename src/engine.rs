// Decision engine: one anytime search per decision tick
//
// The engine owns everything that outlives a single decision: configuration,
// rollout stand-ins, the intents units are still following, run statistics
// and the profiler. The search itself and its table live for one call only.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::action::JointAction;
use crate::assembler;
use crate::candidate::CandidateAction;
use crate::config::{Config, EvaluationKind, PolicyKind, SearchVariant};
use crate::eval::{EconomyEvaluation, SimpleSqrtEvaluation};
use crate::generator::{ActiveIntents, CandidateGenerator};
use crate::model::{Evaluator, RolloutPolicy};
use crate::policy::{PassivePolicy, RandomBiasedPolicy};
use crate::profiler::{Profiler, Section};
use crate::rollout::RolloutParams;
use crate::search::budget::Budget;
use crate::search::stats::SearchStats;
use crate::search::{derive_seed, AnytimeSearch, RolloutSettings, SearchOutcome, SearchPhase, Strategy, TraceEntry};
use crate::types::Side;
use crate::world::World;

/// What the engine hands back for one decision tick
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Act(JointAction),
    /// Invalid side, finished game, or every unit of the side is busy
    NoActionNeeded,
}

impl Decision {
    pub fn joint(&self) -> Option<&JointAction> {
        match self {
            Decision::Act(joint) => Some(joint),
            Decision::NoActionNeeded => None,
        }
    }
}

/// Summary of the most recent decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub tick: u32,
    pub side: Side,
    pub decision_seed: u64,
    pub agents: usize,
    pub iterations: u64,
    pub failed: u64,
    pub table_size: usize,
    pub best_mean: Option<f64>,
    pub elapsed_ms: u64,
    pub phases: Vec<SearchPhase>,
    pub trace: Vec<TraceEntry>,
}

pub fn policy_for(kind: PolicyKind, config: &Config) -> Arc<dyn RolloutPolicy<World>> {
    match kind {
        PolicyKind::RandomBiased => Arc::new(RandomBiasedPolicy::new(config.rollout.bias, config.rollout.wait_ticks)),
        PolicyKind::Passive => Arc::new(PassivePolicy),
    }
}

pub fn evaluator_for(kind: EvaluationKind) -> Arc<dyn Evaluator<World>> {
    match kind {
        EvaluationKind::SimpleSqrt => Arc::new(SimpleSqrtEvaluation),
        EvaluationKind::Economy => Arc::new(EconomyEvaluation),
    }
}

pub struct Engine {
    config: Config,
    settings: RolloutSettings,
    seed: u64,
    intents: ActiveIntents,
    stats: SearchStats,
    profiler: Profiler,
    last_report: Option<DecisionReport>,
}

impl Engine {
    /// Creates an engine whose evaluator and rollout policies follow the configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the engine's lifetime
    pub fn new(config: Config) -> Self {
        let evaluator = evaluator_for(config.evaluation.kind);
        let own = policy_for(config.rollout.own_policy, &config);
        let opponent = policy_for(config.rollout.opponent_policy, &config);
        Self::with_components(config, evaluator, own, opponent)
    }

    /// Creates an engine with explicit rollout stand-ins
    pub fn with_components(
        config: Config,
        evaluator: Arc<dyn Evaluator<World>>,
        own_policy: Arc<dyn RolloutPolicy<World>>,
        opponent_policy: Arc<dyn RolloutPolicy<World>>,
    ) -> Self {
        let settings = RolloutSettings {
            params: RolloutParams {
                horizon: config.rollout.lookahead_ticks,
                discount: config.rollout.discount,
                discount_period: config.rollout.discount_period_ticks,
            },
            follow_intents: config.rollout.follow_intents,
            own_policy,
            opponent_policy,
            evaluator,
        };
        let seed = config.search.seed.unwrap_or_else(rand::random::<u64>);
        let profiler = Profiler::new(config.profiling.clone());
        Engine {
            config,
            settings,
            seed,
            intents: ActiveIntents::new(),
            stats: SearchStats::new(),
            profiler,
            last_report: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn last_report(&self) -> Option<&DecisionReport> {
        self.last_report.as_ref()
    }

    /// Intents units are still following, in unit order
    pub fn active_intents(&self) -> Vec<CandidateAction> {
        self.intents.values().copied().collect()
    }

    /// Replaces the remembered intents, e.g. when replaying a logged decision
    pub fn restore_intents(&mut self, intents: &[CandidateAction]) {
        self.intents = intents.iter().map(|c| (c.unit, *c)).collect();
    }

    /// Clears statistics, remembered intents and profiling data between matches
    pub fn reset_session(&mut self) {
        self.stats.reset();
        self.intents.clear();
        self.profiler.reset();
        self.last_report = None;
    }

    fn strategy(&self) -> Strategy {
        match self.config.search.variant {
            SearchVariant::HillClimb => Strategy::HillClimb {
                mutation_rate: self.config.search.mutation_rate,
                select_from_table: self.config.search.select_from_table,
            },
            SearchVariant::Table => Strategy::Table {
                max_population: self.config.search.max_population,
            },
        }
    }

    /// Seed of the decision at `tick` for `side`
    pub fn decision_seed(&self, tick: u32, side: Side) -> u64 {
        derive_seed(self.seed, ((tick as u64) << 8) | side.0 as u64)
    }

    /// Chooses a joint action for `side` within `budget`
    pub fn decide(&mut self, side: Side, world: &World, budget: Budget) -> Decision {
        let seed = self.decision_seed(world.tick(), side);
        self.decide_seeded(side, world, budget, seed)
    }

    /// Same as `decide` with an explicit decision seed
    pub fn decide_seeded(&mut self, side: Side, world: &World, budget: Budget, decision_seed: u64) -> Decision {
        if !side.is_valid() || world.is_over() || !world.can_act(side) {
            return Decision::NoActionNeeded;
        }
        let start = Instant::now();

        self.intents
            .retain(|_, intent| !intent.is_complete(world) && world.unit(intent.unit).is_some_and(|u| u.is_owned_by(side)));

        let mut rng = StdRng::seed_from_u64(decision_seed);
        let mut generator = CandidateGenerator::new(&self.config.candidates);
        let has_choices = self.profiler.track(Section::Generation, || {
            generator.reset(world, side, &mut rng, &self.intents)
        });
        for unit in generator.stalled_intents() {
            if let Some(intent) = self.intents.remove(unit) {
                debug!("Dropping stalled intent {}", intent.label());
            }
        }
        self.stats.decisions += 1;

        let outcome = if has_choices {
            AnytimeSearch::new(
                world,
                side,
                &generator,
                &self.settings,
                self.strategy(),
                self.config.search.batch_size,
                decision_seed,
                rng,
            )
            .run(budget, &mut self.stats, &self.profiler)
        } else {
            self.stats.empty_decisions += 1;
            SearchOutcome::empty()
        };

        let joint = match &outcome.best {
            Some(choices) => {
                let joint = assembler::assemble_choices(world, &generator, choices);
                // Remember multi-tick intents of agents that were actually admitted
                for candidate in generator.selections(choices).flatten() {
                    if candidate.persists() && joint.contains(candidate.unit) {
                        self.intents.insert(candidate.unit, *candidate);
                    }
                }
                joint
            }
            None => generator.base_joint().clone(),
        };

        let elapsed = start.elapsed();
        self.stats.actions_issued += joint.len() as u64;
        self.profiler.record_decision(elapsed);

        debug!("Tick {} {}: joint {}", world.tick(), side, joint.describe());
        info!(
            "Tick {} {}: {} actions (agents: {}, iterations: {}, failed: {}, best: {}, time: {}ms)",
            world.tick(),
            side,
            joint.len(),
            generator.agents().len(),
            outcome.iterations,
            outcome.failed,
            outcome
                .best_mean
                .map_or_else(|| "n/a".to_string(), |mean| format!("{:.4}", mean)),
            elapsed.as_millis()
        );

        self.last_report = Some(DecisionReport {
            tick: world.tick(),
            side,
            decision_seed,
            agents: generator.agents().len(),
            iterations: outcome.iterations,
            failed: outcome.failed,
            table_size: outcome.table_size,
            best_mean: outcome.best_mean,
            elapsed_ms: elapsed.as_millis() as u64,
            phases: outcome.phases,
            trace: outcome.trace,
        });

        Decision::Act(joint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default_hardcoded();
        config.search.seed = Some(17);
        config.rollout.lookahead_ticks = 30;
        config
    }

    fn world() -> World {
        let mut world = World::from_ascii(
            "\
            R.......
            RWB.....
            ........
            ........
            ....bw.R",
            10,
        )
        .unwrap();
        world.set_currency(Side(0), 5);
        world.set_currency(Side(1), 5);
        world
    }

    #[test]
    fn test_invalid_side_needs_no_action() {
        let mut engine = Engine::new(config());
        assert_eq!(
            engine.decide(Side(2), &world(), Budget::Iterations(3)),
            Decision::NoActionNeeded
        );
        assert_eq!(engine.stats().decisions, 0);
    }

    #[test]
    fn test_finished_game_needs_no_action() {
        let mut world = world();
        world.set_max_ticks(0);
        let mut engine = Engine::new(config());
        assert_eq!(engine.decide(Side(0), &world, Budget::Iterations(3)), Decision::NoActionNeeded);
    }

    #[test]
    fn test_iteration_budget_is_exact() {
        let mut engine = Engine::new(config());
        let decision = engine.decide(Side(0), &world(), Budget::Iterations(6));
        assert!(matches!(decision, Decision::Act(_)));
        let report = engine.last_report().unwrap();
        assert_eq!(report.iterations, 6);
        assert_eq!(report.trace.len(), 6);
        assert_eq!(engine.stats().rollouts, 6);
        assert_eq!(
            report.phases,
            vec![SearchPhase::Idle, SearchPhase::Seeded, SearchPhase::Searching, SearchPhase::Decided]
        );
    }

    #[test]
    fn test_nothing_to_search_never_enters_searching() {
        // A base with no currency has nothing to train
        let world = World::from_ascii("B...\n...b", 1).unwrap();
        let mut engine = Engine::new(config());
        engine.decide(Side(0), &world, Budget::Iterations(5));
        let report = engine.last_report().unwrap();
        assert_eq!(report.phases, vec![SearchPhase::Idle, SearchPhase::Decided]);
        assert!(!report.phases.contains(&SearchPhase::Searching));
    }

    #[test]
    fn test_unreachable_intent_is_forgotten() {
        use crate::candidate::Intent;
        use crate::types::{Coord, UnitKind};

        let mut world = World::from_ascii("W..K\n....\n...b", 1).unwrap();
        world.set_currency(Side(0), 0);
        let worker = world.units().iter().find(|u| u.kind == UnitKind::Worker).unwrap().id;
        let blocked = Coord::new(3, 0);
        let mut engine = Engine::new(config());
        engine.restore_intents(&[CandidateAction::new(worker, Intent::Move { to: blocked })]);

        let targets_blocked = |engine: &Engine| {
            engine
                .active_intents()
                .iter()
                .any(|c| c.unit == worker && c.intent == Intent::Move { to: blocked })
        };

        let mut worker_actions = 0;
        for _ in 0..50 {
            if let Decision::Act(joint) = engine.decide(Side(0), &world, Budget::Iterations(3)) {
                if joint.contains(worker) {
                    worker_actions += 1;
                }
                assert!(!targets_blocked(&engine));
                world.issue(&joint);
            }
            world.cycle();
        }
        assert!(worker_actions > 0, "worker never moved again");
    }

    #[test]
    fn test_reset_session_clears_state() {
        let mut engine = Engine::new(config());
        engine.decide(Side(0), &world(), Budget::Iterations(2));
        engine.reset_session();
        assert_eq!(engine.stats(), &SearchStats::default());
        assert!(engine.active_intents().is_empty());
        assert!(engine.last_report().is_none());
    }
}
