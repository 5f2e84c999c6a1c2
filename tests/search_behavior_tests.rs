// Integration tests for the anytime search as seen through the engine
//
// Covers determinism under a fixed seed, monotone hill climbing, budget
// accounting, and containment of failing rollouts.

use evo_rts_search::config::{Config, SearchVariant};
use evo_rts_search::engine::{Decision, Engine};
use evo_rts_search::error::RolloutError;
use evo_rts_search::model::Evaluator;
use evo_rts_search::policy::RandomBiasedPolicy;
use evo_rts_search::search::budget::Budget;
use evo_rts_search::types::Side;
use evo_rts_search::world::World;
use std::sync::Arc;
use std::time::Duration;

fn config(seed: u64) -> Config {
    let mut config = Config::default_hardcoded();
    config.search.seed = Some(seed);
    config.rollout.lookahead_ticks = 40;
    config
}

fn skirmish() -> World {
    let mut world = World::from_ascii(
        "\
        R.......
        RWB.....
        .W......
        ........
        ......w.
        .....bwR",
        10,
    )
    .unwrap();
    world.set_currency(Side(0), 6);
    world.set_currency(Side(1), 6);
    world
}

struct Broken;

impl Evaluator<World> for Broken {
    fn evaluate(&self, _side: Side, _other: Side, _world: &World) -> Result<f32, RolloutError> {
        Err(RolloutError::Evaluation {
            evaluator: "broken",
            reason: "always fails".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[test]
fn test_same_seed_same_decision_and_trace() {
    let world = skirmish();
    for variant in [SearchVariant::HillClimb, SearchVariant::Table] {
        let mut cfg = config(99);
        cfg.search.variant = variant;
        cfg.search.max_population = 6;

        let mut a = Engine::new(cfg.clone());
        let mut b = Engine::new(cfg);
        let da = a.decide(Side(0), &world, Budget::Iterations(12));
        let db = b.decide(Side(0), &world, Budget::Iterations(12));

        assert_eq!(da, db, "{:?} decisions differ", variant);
        assert_eq!(a.last_report().unwrap().trace, b.last_report().unwrap().trace);
    }
}

#[test]
fn test_parallel_batches_reproduce() {
    let world = skirmish();
    let mut cfg = config(5);
    cfg.search.batch_size = 4;

    let mut a = Engine::new(cfg.clone());
    let mut b = Engine::new(cfg);
    let da = a.decide(Side(0), &world, Budget::Iterations(10));
    let db = b.decide(Side(0), &world, Budget::Iterations(10));

    assert_eq!(da, db);
    let report = a.last_report().unwrap();
    assert_eq!(report.iterations, 10);
    assert_eq!(report.trace, b.last_report().unwrap().trace);
    let iterations: Vec<u64> = report.trace.iter().map(|t| t.iteration).collect();
    assert_eq!(iterations, (0..10).collect::<Vec<_>>(), "trace is merged in iteration order");
}

#[test]
fn test_hill_climb_incumbent_never_gets_worse() {
    let world = skirmish();
    let mut cfg = config(31);
    cfg.search.variant = SearchVariant::HillClimb;
    cfg.search.mutation_rate = 0.5;
    let mut engine = Engine::new(cfg);

    engine.decide(Side(0), &world, Budget::Iterations(30));
    let means: Vec<f64> = engine
        .last_report()
        .unwrap()
        .trace
        .iter()
        .filter_map(|t| t.incumbent_mean)
        .collect();

    assert!(!means.is_empty());
    for pair in means.windows(2) {
        assert!(pair[1] >= pair[0], "incumbent mean dropped from {} to {}", pair[0], pair[1]);
    }
    assert_eq!(engine.last_report().unwrap().best_mean, means.last().copied());
}

#[test]
fn test_zero_iteration_budget_runs_no_rollouts() {
    let world = skirmish();
    let mut engine = Engine::new(config(2));
    let decision = engine.decide(Side(0), &world, Budget::Iterations(0));

    assert!(matches!(decision, Decision::Act(_)));
    assert_eq!(engine.stats().rollouts, 0);
    assert_eq!(engine.last_report().unwrap().iterations, 0);
}

#[test]
fn test_side_without_choices_skips_search() {
    // A base with no currency has nothing to train
    let world = World::from_ascii("B...\n...b", 1).unwrap();
    let mut engine = Engine::new(config(8));
    let decision = engine.decide(Side(0), &world, Budget::Iterations(20));

    assert_eq!(decision.joint().map(|j| j.len()), Some(0));
    assert_eq!(engine.stats().rollouts, 0);
    assert_eq!(engine.stats().empty_decisions, 1);
    assert_eq!(engine.stats().decisions, 1);
}

#[test]
fn test_time_budget_is_respected() {
    let world = skirmish();
    let mut engine = Engine::new(config(13));

    let start = std::time::Instant::now();
    let decision = engine.decide(Side(0), &world, Budget::Time(Duration::from_millis(30)));
    let elapsed = start.elapsed();

    assert!(matches!(decision, Decision::Act(_)));
    assert!(engine.last_report().unwrap().iterations >= 1);
    assert!(elapsed < Duration::from_secs(2), "decision took {:?}", elapsed);
}

#[test]
fn test_failing_evaluator_is_contained() {
    let world = skirmish();
    let policy = Arc::new(RandomBiasedPolicy::default());
    let mut engine = Engine::with_components(config(3), Arc::new(Broken), policy.clone(), policy);

    let decision = engine.decide(Side(0), &world, Budget::Iterations(6));
    let joint = decision.joint().expect("a decision is still produced");

    let report = engine.last_report().unwrap();
    assert_eq!(report.iterations, 6);
    assert_eq!(report.failed, 6);
    assert_eq!(report.best_mean, None);
    assert_eq!(engine.stats().failed_rollouts, 6);
    assert_eq!(engine.stats().rollouts, 6, "failed rollouts still count against the budget");

    // Every action handed back is still legal and fits together
    let mut replay = world.clone();
    assert_eq!(replay.issue(joint), joint.len());
}
