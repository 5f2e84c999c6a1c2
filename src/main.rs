use log::{error, info};
use std::env;

use evo_rts_search::arena::{Arena, Controller};
use evo_rts_search::config::Config;
use evo_rts_search::debug_logger::DebugLogger;
use evo_rts_search::types::Side;

// Usage: evo-rts-search [config_path] [match_seed]
#[tokio::main]
async fn main() {
    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            error!("Could not load config from '{}': {}", path, e);
            Config::default_hardcoded()
        }),
        None => Config::load_or_default(),
    };
    let match_seed = args
        .get(2)
        .and_then(|s| s.parse::<u64>().ok())
        .or(config.search.seed)
        .unwrap_or_else(rand::random::<u64>);

    info!(
        "Starting match on '{}' against {:?} (seed {})",
        config.match_play.map, config.match_play.opponent, match_seed
    );

    let logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path).await;
    let mut arena = match Arena::from_config(&config, match_seed) {
        Ok(arena) => arena.with_logger(logger),
        Err(e) => {
            error!("Failed to set up match: {}", e);
            std::process::exit(1);
        }
    };

    // The search is CPU bound; keep it off the async workers so log writes can progress
    let handle = tokio::task::spawn_blocking(move || {
        let start = std::time::Instant::now();
        let result = arena.run();
        (arena, result, start.elapsed().as_millis() as u64)
    });
    let (arena, result, total_ms) = match handle.await {
        Ok(done) => done,
        Err(e) => {
            error!("Match task failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", arena.world().render());
    println!(
        "Winner: {} after {} ticks (decisions {:?}, actions {:?})",
        result.winner.map_or_else(|| "draw".to_string(), |side| side.to_string()),
        result.ticks,
        result.decisions,
        result.issued
    );

    if let Controller::Search(engine) = arena.controller(Side(0)) {
        engine.stats().print_summary();
        engine.profiler().print_report(total_ms);
    }

    // Let pending log writes land before the runtime shuts down
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}
