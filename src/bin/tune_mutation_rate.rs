//! Sweep tool for the hill-climbing mutation rate
//!
//! Plays a batch of seeded matches for each candidate rate against the
//! configured opponent and reports the win rate of the search side.
//!
//! Usage: tune_mutation_rate [config_path] [matches_per_rate] [rates]
//!   rates: comma-separated list, default 0.05,0.1,0.2,0.35,0.5

use evo_rts_search::arena::play_match;
use evo_rts_search::config::{Config, SearchVariant};
use evo_rts_search::types::Side;
use rayon::prelude::*;
use std::env;

#[derive(Debug)]
struct SweepResult {
    rate: f64,
    wins: usize,
    losses: usize,
    draws: usize,
    avg_ticks: f64,
}

impl SweepResult {
    fn win_rate(&self) -> f64 {
        let total = self.wins + self.losses + self.draws;
        if total == 0 {
            0.0
        } else {
            self.wins as f64 / total as f64 * 100.0
        }
    }
}

fn parse_rates(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|r| {
            r.trim()
                .parse::<f64>()
                .map_err(|e| format!("Invalid rate '{}': {}", r, e))
        })
        .collect()
}

fn sweep(config: &Config, rate: f64, matches: usize) -> SweepResult {
    let mut config = config.clone();
    config.search.variant = SearchVariant::HillClimb;
    config.search.mutation_rate = rate;

    let results: Vec<_> = (0..matches as u64)
        .into_par_iter()
        .filter_map(|seed| {
            let mut per_match = config.clone();
            per_match.search.seed = Some(seed);
            match play_match(&per_match, seed) {
                Ok(result) => Some(result),
                Err(e) => {
                    eprintln!("Match {} failed: {}", seed, e);
                    None
                }
            }
        })
        .collect();

    let wins = results.iter().filter(|r| r.winner == Some(Side(0))).count();
    let losses = results.iter().filter(|r| r.winner == Some(Side(1))).count();
    let avg_ticks = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.ticks as f64).sum::<f64>() / results.len() as f64
    };

    SweepResult {
        rate,
        wins,
        losses,
        draws: results.len() - wins - losses,
        avg_ticks,
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            eprintln!("Warning: Could not load config from '{}': {}", path, e);
            Config::default_hardcoded()
        }),
        None => Config::load_or_default(),
    };
    let matches: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
    let rates = match args.get(3).map(|s| parse_rates(s)) {
        Some(Ok(rates)) => rates,
        Some(Err(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        None => vec![0.05, 0.1, 0.2, 0.35, 0.5],
    };

    println!("\n═══════════════════════════════════════════════════════════");
    println!("           MUTATION RATE SWEEP");
    println!("═══════════════════════════════════════════════════════════");
    println!("Map:                 {}", config.match_play.map);
    println!("Opponent:            {:?}", config.match_play.opponent);
    println!("Matches per rate:    {}", matches);
    println!("═══════════════════════════════════════════════════════════\n");

    let mut best: Option<SweepResult> = None;
    for rate in rates {
        let result = sweep(&config, rate, matches);
        println!(
            "  rate {:.2}: {:>5.1}% wins ({}W/{}L/{}D), avg {:.0} ticks",
            result.rate,
            result.win_rate(),
            result.wins,
            result.losses,
            result.draws,
            result.avg_ticks
        );
        if best.as_ref().map_or(true, |b| result.win_rate() > b.win_rate()) {
            best = Some(result);
        }
    }

    if let Some(best) = best {
        println!("\n═══════════════════════════════════════════════════════════");
        println!("Best Mutation Rate:  {:.2} ({:.1}% wins)", best.rate, best.win_rate());
        println!("═══════════════════════════════════════════════════════════\n");
        println!("Recommended Search.toml update:");
        println!("```toml");
        println!("[search]");
        println!("mutation_rate = {:.2}", best.rate);
        println!("```\n");
    }
}
