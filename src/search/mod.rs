// Anytime local search over choice vectors
//
// One core drives both strategies. Hill climbing keeps a single incumbent and
// replaces it whenever a mutated challenger scores strictly better; the table
// strategy scores a fixed population round robin. Every rollout gets its own
// RNG derived from the decision seed and the iteration index, so a fixed seed,
// batch size and iteration budget reproduce the same trace on any thread count.

pub mod budget;
pub mod stats;
pub mod table;

use crate::assembler;
use crate::candidate::CandidateAction;
use crate::error::RolloutError;
use crate::generator::CandidateGenerator;
use crate::model::{Evaluator, RolloutPolicy};
use crate::policy::IntentPolicy;
use crate::profiler::{Profiler, Section};
use crate::rollout::{self, RolloutParams, RolloutResult};
use crate::types::Side;
use crate::world::World;
use budget::{Budget, BudgetTracker};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stats::SearchStats;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use table::{ChoiceVector, SearchTable};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    HillClimb { mutation_rate: f64, select_from_table: bool },
    Table { max_population: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchPhase {
    Idle,
    Seeded,
    Searching,
    Decided,
}

/// One evaluated (or failed) rollout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub iteration: u64,
    /// Table entry that was rolled out
    pub entry: usize,
    /// Discounted rollout value; None when the rollout failed
    pub value: Option<f64>,
    /// Mean of the hill-climbing incumbent after this iteration
    pub incumbent_mean: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Phases entered during the decision, in order
    pub phases: Vec<SearchPhase>,
    /// Table index of the chosen entry
    pub best_entry: Option<usize>,
    pub best: Option<ChoiceVector>,
    pub best_mean: Option<f64>,
    pub iterations: u64,
    pub failed: u64,
    pub table_size: usize,
    pub trace: Vec<TraceEntry>,
}

impl SearchOutcome {
    /// Outcome of a decision with nothing to search
    pub fn empty() -> Self {
        SearchOutcome {
            phases: vec![SearchPhase::Idle, SearchPhase::Decided],
            best_entry: None,
            best: None,
            best_mean: None,
            iterations: 0,
            failed: 0,
            table_size: 0,
            trace: Vec::new(),
        }
    }
}

/// Rollout stand-ins and parameters shared by every rollout of a decision
#[derive(Clone)]
pub struct RolloutSettings {
    pub params: RolloutParams,
    /// Keep executing the evaluated joint action's persistent intents during playout
    pub follow_intents: bool,
    pub own_policy: Arc<dyn RolloutPolicy<World>>,
    pub opponent_policy: Arc<dyn RolloutPolicy<World>>,
    pub evaluator: Arc<dyn Evaluator<World>>,
}

/// Mixes a base seed with an index (splitmix64 finaliser)
pub fn derive_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_add(0x9E37_79B9_7F4A_7C15).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub struct AnytimeSearch<'a> {
    world: &'a World,
    side: Side,
    generator: &'a CandidateGenerator,
    settings: &'a RolloutSettings,
    strategy: Strategy,
    batch_size: usize,
    seed: u64,
    rng: StdRng,
    phases: Vec<SearchPhase>,
    table: SearchTable,
    incumbent: Option<usize>,
    iterations: u64,
    failed: u64,
    trace: Vec<TraceEntry>,
}

impl<'a> AnytimeSearch<'a> {
    /// `generator` must already be reset for `world` and `side`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        world: &'a World,
        side: Side,
        generator: &'a CandidateGenerator,
        settings: &'a RolloutSettings,
        strategy: Strategy,
        batch_size: usize,
        seed: u64,
        rng: StdRng,
    ) -> Self {
        AnytimeSearch {
            world,
            side,
            generator,
            settings,
            strategy,
            batch_size: batch_size.max(1),
            seed,
            rng,
            phases: vec![SearchPhase::Idle],
            table: SearchTable::new(),
            incumbent: None,
            iterations: 0,
            failed: 0,
            trace: Vec::new(),
        }
    }

    fn enter(&mut self, phase: SearchPhase) {
        self.phases.push(phase);
    }

    /// Runs until the budget is exhausted and returns the chosen choice vector
    pub fn run(mut self, budget: Budget, stats: &mut SearchStats, profiler: &Profiler) -> SearchOutcome {
        let tracker = BudgetTracker::start(budget);

        if !self.generator.has_choices() {
            return SearchOutcome::empty();
        }

        profiler.track(Section::Assembly, || self.seed_table());
        self.enter(SearchPhase::Seeded);
        debug!(
            "Seeded {} table entries over {} agents (space {})",
            self.table.len(),
            self.generator.agents().len(),
            self.generator.space_size()
        );

        self.enter(SearchPhase::Searching);
        while !tracker.exhausted(self.iterations) {
            let mut batch = self.batch_size as u64;
            if let Some(remaining) = tracker.remaining_iterations(self.iterations) {
                batch = batch.min(remaining);
            }
            let planned = profiler.track(Section::Assembly, || self.plan(batch as usize));
            let results = self.evaluate(&planned, profiler);
            self.merge(&planned, results, stats);
        }

        self.enter(SearchPhase::Decided);
        let chosen = self.select();
        SearchOutcome {
            phases: self.phases,
            best_entry: chosen,
            best: chosen.and_then(|idx| self.table.get(idx)).map(|e| e.choices.clone()),
            best_mean: chosen
                .and_then(|idx| self.table.get(idx))
                .filter(|e| e.visits > 0)
                .map(|e| e.mean()),
            iterations: self.iterations,
            failed: self.failed,
            table_size: self.table.len(),
            trace: self.trace,
        }
    }

    fn seed_table(&mut self) {
        match self.strategy {
            Strategy::HillClimb { .. } => {
                let choices = self.generator.random_choices(self.world, &mut self.rng);
                self.incumbent = Some(self.table.push(choices));
            }
            Strategy::Table { max_population } => {
                let cap = max_population.max(1);
                let mut population: Vec<ChoiceVector> = if self.generator.space_size() > 2 * cap as u64 {
                    (0..cap)
                        .map(|_| self.generator.random_choices(self.world, &mut self.rng))
                        .collect()
                } else {
                    self.generator.enumerate(2 * cap)
                };
                while population.len() > cap {
                    let idx = self.rng.random_range(0..population.len());
                    population.remove(idx);
                }
                for choices in population {
                    self.table.push(choices);
                }
            }
        }
    }

    /// Table entries to roll out next, as (iteration, entry) pairs
    fn plan(&mut self, count: usize) -> Vec<(u64, usize)> {
        let mut planned = Vec::with_capacity(count);
        for k in 0..count as u64 {
            let iteration = self.iterations + k;
            let entry = match self.strategy {
                Strategy::HillClimb { mutation_rate, .. } => {
                    let incumbent = self.incumbent.unwrap_or(0);
                    let unevaluated = self.table.get(incumbent).is_some_and(|e| e.visits == 0);
                    if iteration == 0 && unevaluated {
                        incumbent
                    } else {
                        let challenger = self.mutate(incumbent, mutation_rate);
                        self.table.push(challenger)
                    }
                }
                Strategy::Table { .. } => (iteration % self.table.len() as u64) as usize,
            };
            planned.push((iteration, entry));
        }
        planned
    }

    /// Copy of the incumbent with each slot redrawn with probability `rate`
    fn mutate(&mut self, incumbent: usize, rate: f64) -> ChoiceVector {
        let mut choices = self
            .table
            .get(incumbent)
            .map(|e| e.choices.clone())
            .unwrap_or_else(|| ChoiceVector::new(vec![None; self.generator.agents().len()]));
        for agent in 0..choices.len() {
            if self.rng.random::<f64>() < rate {
                let draw = self.generator.draw_for_agent(agent, self.world, &mut self.rng);
                choices.set(agent, draw);
            }
        }
        choices
    }

    fn evaluate(&self, planned: &[(u64, usize)], profiler: &Profiler) -> Vec<Result<RolloutResult, RolloutError>> {
        if planned.len() <= 1 {
            return planned
                .iter()
                .map(|(iteration, entry)| self.contained_rollout(*iteration, *entry, profiler))
                .collect();
        }

        // Indexed collect keeps iteration order
        planned
            .par_iter()
            .map(|(iteration, entry)| self.contained_rollout(*iteration, *entry, profiler))
            .collect()
    }

    /// A panicking policy or evaluator fails only its own rollout
    fn contained_rollout(&self, iteration: u64, entry: usize, profiler: &Profiler) -> Result<RolloutResult, RolloutError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.rollout_entry(iteration, entry, profiler))).unwrap_or_else(|payload| {
            let reason = panic_message(payload.as_ref());
            warn!("Rollout {} panicked: {}", iteration, reason);
            Err(RolloutError::Panicked(reason))
        })
    }

    fn rollout_entry(&self, iteration: u64, entry: usize, profiler: &Profiler) -> Result<RolloutResult, RolloutError> {
        let choices = self
            .table
            .get(entry)
            .map(|e| e.choices.clone())
            .unwrap_or_else(|| ChoiceVector::new(Vec::new()));
        let joint = profiler.track(Section::Assembly, || {
            assembler::assemble_choices(self.world, self.generator, &choices)
        });
        let mut rng = StdRng::seed_from_u64(derive_seed(self.seed, iteration));
        let settings = self.settings;

        if settings.follow_intents {
            let intents = self.rollout_intents(&choices);
            let own = IntentPolicy::new(intents, &*settings.own_policy);
            rollout::run_rollout(
                self.world,
                &joint,
                self.side,
                &settings.params,
                &own,
                &*settings.opponent_policy,
                &*settings.evaluator,
                &mut rng,
                profiler,
            )
        } else {
            rollout::run_rollout(
                self.world,
                &joint,
                self.side,
                &settings.params,
                &*settings.own_policy,
                &*settings.opponent_policy,
                &*settings.evaluator,
                &mut rng,
                profiler,
            )
        }
    }

    /// Active intents plus the intents selected by `choices`
    fn rollout_intents(&self, choices: &ChoiceVector) -> Vec<CandidateAction> {
        let mut intents: Vec<CandidateAction> = self.generator.active_intents().to_vec();
        intents.extend(self.generator.selections(choices).flatten().copied());
        intents
    }

    fn merge(
        &mut self,
        planned: &[(u64, usize)],
        results: Vec<Result<RolloutResult, RolloutError>>,
        stats: &mut SearchStats,
    ) {
        for ((iteration, entry), result) in planned.iter().zip(results) {
            let value = match result {
                Ok(outcome) => {
                    stats.record_rollout(outcome.elapsed);
                    self.table.record(*entry, outcome.value);
                    self.consider(*entry, stats);
                    Some(outcome.value)
                }
                Err(e) => {
                    debug!("Rollout {} failed: {}", iteration, e);
                    stats.record_failure();
                    self.failed += 1;
                    None
                }
            };
            self.trace.push(TraceEntry {
                iteration: *iteration,
                entry: *entry,
                value,
                incumbent_mean: self
                    .incumbent
                    .and_then(|idx| self.table.get(idx))
                    .filter(|e| e.visits > 0)
                    .map(|e| e.mean()),
            });
            self.iterations += 1;
        }
    }

    /// Hill-climbing acceptance: strictly better mean replaces the incumbent
    fn consider(&mut self, entry: usize, stats: &mut SearchStats) {
        let Strategy::HillClimb { .. } = self.strategy else {
            return;
        };
        let Some(incumbent) = self.incumbent else {
            self.incumbent = Some(entry);
            return;
        };
        if entry == incumbent {
            return;
        }
        let challenger = self.table.get(entry).map_or(f64::NEG_INFINITY, |e| e.mean());
        let current = self.table.get(incumbent).map_or(f64::NEG_INFINITY, |e| e.mean());
        if challenger > current {
            debug!("Challenger {} replaces incumbent ({:.4} > {:.4})", entry, challenger, current);
            self.incumbent = Some(entry);
            stats.improvements += 1;
        }
    }

    fn select(&self) -> Option<usize> {
        match self.strategy {
            Strategy::HillClimb {
                select_from_table: false,
                ..
            } => self.incumbent,
            _ => self.table.best().or(if self.table.is_empty() { None } else { Some(0) }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::eval::SimpleSqrtEvaluation;
    use crate::generator::ActiveIntents;
    use crate::policy::{PassivePolicy, RandomBiasedPolicy};

    struct Flat;

    impl Evaluator<World> for Flat {
        fn evaluate(&self, _side: Side, _other: Side, _world: &World) -> Result<f32, RolloutError> {
            Ok(0.25)
        }

        fn name(&self) -> &'static str {
            "flat"
        }
    }

    struct Exploding;

    impl Evaluator<World> for Exploding {
        fn evaluate(&self, _side: Side, _other: Side, _world: &World) -> Result<f32, RolloutError> {
            panic!("evaluator blew up")
        }

        fn name(&self) -> &'static str {
            "exploding"
        }
    }

    /// First entry holding the highest mean of the entries seen in `trace`
    fn best_from_trace(trace: &[TraceEntry]) -> Option<(usize, f64)> {
        let mut sums: Vec<(f64, u32)> = Vec::new();
        for t in trace {
            let Some(value) = t.value else { continue };
            if sums.len() <= t.entry {
                sums.resize(t.entry + 1, (0.0, 0));
            }
            sums[t.entry].0 += value;
            sums[t.entry].1 += 1;
        }
        let mut best: Option<(usize, f64)> = None;
        for (entry, (sum, visits)) in sums.into_iter().enumerate() {
            if visits == 0 {
                continue;
            }
            let mean = sum / visits as f64;
            if best.map_or(true, |(_, m)| mean > m) {
                best = Some((entry, mean));
            }
        }
        best
    }

    fn settings() -> RolloutSettings {
        RolloutSettings {
            params: RolloutParams {
                horizon: 30,
                ..RolloutParams::default()
            },
            follow_intents: true,
            own_policy: Arc::new(RandomBiasedPolicy::default()),
            opponent_policy: Arc::new(RandomBiasedPolicy::default()),
            evaluator: Arc::new(SimpleSqrtEvaluation),
        }
    }

    fn setup(seed: u64) -> (World, CandidateGenerator) {
        let mut world = World::from_ascii(
            "\
            R.......
            RWB.....
            ........
            ........
            ........
            ....bw.R",
            10,
        )
        .unwrap();
        world.set_currency(Side(0), 5);
        world.set_currency(Side(1), 5);
        let mut generator = CandidateGenerator::new(&Config::default_hardcoded().candidates);
        generator.reset(&world, Side(0), &mut StdRng::seed_from_u64(seed), &ActiveIntents::new());
        (world, generator)
    }

    #[test]
    fn test_derive_seed_spreads_indices() {
        assert_ne!(derive_seed(1, 0), derive_seed(1, 1));
        assert_ne!(derive_seed(1, 0), derive_seed(2, 0));
        assert_eq!(derive_seed(9, 4), derive_seed(9, 4));
    }

    #[test]
    fn test_table_trace_independent_of_batch_size() {
        let (world, generator) = setup(3);
        let settings = settings();
        let run = |batch: usize| {
            AnytimeSearch::new(
                &world,
                Side(0),
                &generator,
                &settings,
                Strategy::Table { max_population: 4 },
                batch,
                77,
                StdRng::seed_from_u64(5),
            )
            .run(Budget::Iterations(9), &mut SearchStats::new(), &Profiler::disabled())
        };
        let sequential = run(1);
        let batched = run(4);
        assert_eq!(sequential.trace, batched.trace);
        assert_eq!(sequential.best, batched.best);
        assert_eq!(sequential.iterations, 9);
    }

    #[test]
    fn test_parallel_hill_climb_is_reproducible() {
        let (world, generator) = setup(8);
        let settings = settings();
        let strategy = Strategy::HillClimb {
            mutation_rate: 0.5,
            select_from_table: false,
        };
        let run = || {
            AnytimeSearch::new(&world, Side(0), &generator, &settings, strategy, 3, 21, StdRng::seed_from_u64(2))
                .run(Budget::Iterations(10), &mut SearchStats::new(), &Profiler::disabled())
        };
        let first = run();
        let second = run();
        assert_eq!(first.trace, second.trace);
        assert_eq!(first.best, second.best);
        assert_eq!(first.trace.len(), 10);
    }

    #[test]
    fn test_hill_climb_can_select_table_best() {
        let (world, generator) = setup(4);
        let settings = settings();
        let run = |select_from_table: bool| {
            let strategy = Strategy::HillClimb {
                mutation_rate: 0.5,
                select_from_table,
            };
            AnytimeSearch::new(&world, Side(0), &generator, &settings, strategy, 1, 41, StdRng::seed_from_u64(6))
                .run(Budget::Iterations(12), &mut SearchStats::new(), &Profiler::disabled())
        };

        let from_table = run(true);
        let (entry, mean) = best_from_trace(&from_table.trace).unwrap();
        assert_eq!(from_table.best_entry, Some(entry));
        assert_eq!(from_table.best_mean, Some(mean));

        // Every challenger is rolled out once and only a strictly better one is
        // accepted, so the last incumbent is the first entry with the best mean
        let incumbent = run(false);
        assert_eq!(incumbent.trace, from_table.trace);
        assert_eq!(incumbent.best_entry, from_table.best_entry);
    }

    #[test]
    fn test_equal_means_select_first_entry() {
        let (world, generator) = setup(2);
        let settings = RolloutSettings {
            follow_intents: false,
            own_policy: Arc::new(PassivePolicy),
            opponent_policy: Arc::new(PassivePolicy),
            evaluator: Arc::new(Flat),
            ..settings()
        };
        let strategies = [
            Strategy::HillClimb {
                mutation_rate: 0.5,
                select_from_table: true,
            },
            Strategy::Table { max_population: 4 },
        ];
        for strategy in strategies {
            let outcome = AnytimeSearch::new(&world, Side(0), &generator, &settings, strategy, 1, 9, StdRng::seed_from_u64(1))
                .run(Budget::Iterations(8), &mut SearchStats::new(), &Profiler::disabled());
            assert_eq!(outcome.best_entry, Some(0), "{:?}", strategy);
            assert_eq!(best_from_trace(&outcome.trace).map(|(entry, _)| entry), Some(0));
        }
    }

    #[test]
    fn test_panicking_evaluator_fails_only_its_rollouts() {
        let (world, generator) = setup(5);
        let settings = RolloutSettings {
            evaluator: Arc::new(Exploding),
            ..settings()
        };
        for batch in [1, 3] {
            let mut stats = SearchStats::new();
            let outcome = AnytimeSearch::new(
                &world,
                Side(0),
                &generator,
                &settings,
                Strategy::Table { max_population: 3 },
                batch,
                12,
                StdRng::seed_from_u64(12),
            )
            .run(Budget::Iterations(6), &mut stats, &Profiler::disabled());
            assert_eq!(outcome.iterations, 6);
            assert_eq!(outcome.failed, 6);
            assert_eq!(stats.failed_rollouts, 6);
            assert!(outcome.trace.iter().all(|t| t.value.is_none()));
            assert_eq!(outcome.best_mean, None);
        }
    }

    #[test]
    fn test_table_population_is_capped() {
        let (world, generator) = setup(1);
        let settings = settings();
        let search = AnytimeSearch::new(
            &world,
            Side(0),
            &generator,
            &settings,
            Strategy::Table { max_population: 1 },
            1,
            3,
            StdRng::seed_from_u64(3),
        );
        let outcome = search.run(Budget::Iterations(3), &mut SearchStats::new(), &Profiler::disabled());
        assert_eq!(outcome.table_size, 1);
        assert!(outcome.trace.iter().all(|t| t.entry == 0));
    }
}
