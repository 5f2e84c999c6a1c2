// Replay round trip: decisions logged during a short match are loaded back
// from JSONL and reproduced exactly from their seeds and iteration counts.

use evo_rts_search::config::Config;
use evo_rts_search::debug_logger::{DebugLogger, DecisionLogEntry};
use evo_rts_search::engine::{Decision, Engine};
use evo_rts_search::replay::ReplayEngine;
use evo_rts_search::search::budget::Budget;
use evo_rts_search::types::Side;
use evo_rts_search::world::World;
use std::path::PathBuf;

fn log_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}_{}.jsonl", name, std::process::id()))
}

fn config() -> Config {
    let mut config = Config::default_hardcoded();
    config.search.seed = Some(21);
    config.search.batch_size = 2;
    config.rollout.lookahead_ticks = 30;
    config
}

#[tokio::test]
async fn test_logged_decisions_replay_identically() {
    let path = log_path("replay_round_trip");
    let logger = DebugLogger::new(true, &path.to_string_lossy()).await;

    let mut world = World::from_ascii(
        "\
        R.......
        RWB.....
        ........
        .....bw.",
        10,
    )
    .unwrap();
    world.set_currency(Side(0), 3);
    let mut engine = Engine::new(config());

    let mut logged = 0;
    for _ in 0..40 {
        let intents = engine.active_intents();
        if let Decision::Act(joint) = engine.decide(Side(0), &world, Budget::Iterations(4)) {
            let report = engine.last_report().unwrap();
            let entry = DecisionLogEntry::new(
                &world,
                Side(0),
                report.decision_seed,
                report.iterations,
                report.best_mean,
                intents,
                joint.clone(),
            );
            logger.write_entry(&entry).await;
            logged += 1;
            world.issue(&joint);
        }
        world.cycle();
    }
    assert!(logged > 0);

    let replay = ReplayEngine::new(config(), false);
    let entries = replay.load_log_file(&path).expect("log file should parse");
    assert_eq!(entries.len(), logged);

    let results = replay.replay_all(&entries);
    assert_eq!(results.len(), logged);
    let stats = replay.generate_stats(&results);
    assert_eq!(stats.mismatches, 0, "every logged decision should replay identically");

    let _ = std::fs::remove_file(path);
}

#[test]
fn test_missing_log_file_is_an_error() {
    let replay = ReplayEngine::new(config(), false);
    assert!(replay.load_log_file("/nonexistent/decisions.jsonl").is_err());
}
