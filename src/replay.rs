// Replay module for reproducing logged decisions
//
// This module provides functionality to:
// 1. Parse JSONL decision logs
// 2. Re-run the search on each logged world with the logged seed and iteration count
// 3. Compare the replayed joint action with the logged one
// 4. Generate a report

use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::action::JointAction;
use crate::config::Config;
use crate::debug_logger::DecisionLogEntry;
use crate::engine::{Decision, Engine};
use crate::search::budget::Budget;

/// Result of replaying a single decision
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub tick: u32,
    pub original: JointAction,
    pub replayed: JointAction,
    pub matches: bool,
    pub original_mean: Option<f64>,
    pub replayed_mean: Option<f64>,
    pub iterations: u64,
    pub computation_time_ms: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_decisions: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for analyzing decision logs
pub struct ReplayEngine {
    config: Config,
    verbose: bool,
}

impl ReplayEngine {
    /// Creates a new replay engine with the given configuration
    pub fn new(config: Config, verbose: bool) -> Self {
        ReplayEngine { config, verbose }
    }

    /// Loads all log entries from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<DecisionLogEntry>, String> {
        let file = File::open(log_path.as_ref()).map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: DecisionLogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Replays a single log entry and compares the result
    pub fn replay_entry(&self, entry: &DecisionLogEntry) -> Result<ReplayResult, String> {
        if self.verbose {
            info!("Replaying tick {} for {}...", entry.tick, entry.side);
        }

        let mut engine = Engine::new(self.config.clone());
        engine.restore_intents(&entry.intents);

        let start_time = Instant::now();
        let decision = engine.decide_seeded(
            entry.side,
            &entry.world,
            Budget::Iterations(entry.iterations),
            entry.decision_seed,
        );
        let computation_time = start_time.elapsed().as_millis();

        let replayed = match decision {
            Decision::Act(joint) => joint,
            Decision::NoActionNeeded => {
                return Err(format!("Tick {}: {} had nothing to decide on replay", entry.tick, entry.side));
            }
        };
        let replayed_mean = engine.last_report().and_then(|r| r.best_mean);
        let matches = replayed == entry.chosen;

        if self.verbose {
            if matches {
                info!(
                    "Tick {}: ✓ MATCH - {} (mean: {:?}, iterations: {}, time: {}ms)",
                    entry.tick,
                    replayed.describe(),
                    replayed_mean,
                    entry.iterations,
                    computation_time
                );
            } else {
                warn!(
                    "Tick {}: ✗ MISMATCH - Original: {}, Replayed: {} (iterations: {}, time: {}ms)",
                    entry.tick,
                    entry.chosen.describe(),
                    replayed.describe(),
                    entry.iterations,
                    computation_time
                );
            }
        }

        Ok(ReplayResult {
            tick: entry.tick,
            original: entry.chosen.clone(),
            replayed,
            matches,
            original_mean: entry.best_mean,
            replayed_mean,
            iterations: entry.iterations,
            computation_time_ms: computation_time,
        })
    }

    /// Replays all entries in a log file
    pub fn replay_all(&self, entries: &[DecisionLogEntry]) -> Vec<ReplayResult> {
        let mut results = Vec::new();

        for entry in entries {
            match self.replay_entry(entry) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Failed to replay tick {}: {}", entry.tick, e);
                }
            }
        }

        results
    }

    /// Replays the decisions made at specific ticks
    pub fn replay_ticks(&self, entries: &[DecisionLogEntry], ticks: &[u32]) -> Result<Vec<ReplayResult>, String> {
        let mut results = Vec::new();

        for tick in ticks {
            let matching: Vec<&DecisionLogEntry> = entries.iter().filter(|e| e.tick == *tick).collect();
            if matching.is_empty() {
                return Err(format!("Tick {} not found in log file", tick));
            }

            for entry in matching {
                match self.replay_entry(entry) {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        warn!("Failed to replay tick {}: {}", tick, e);
                    }
                }
            }
        }

        Ok(results)
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_decisions = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let mismatches = total_decisions - matches;
        let match_rate = if total_decisions > 0 {
            (matches as f64 / total_decisions as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_decisions,
            matches,
            mismatches,
            match_rate,
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Decisions: {}", stats.total_decisions);
        println!("Matches:         {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:      {}", stats.mismatches);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 =
                results.iter().map(|r| r.computation_time_ms as f64).sum::<f64>() / results.len() as f64;
            let avg_iterations: f64 =
                results.iter().map(|r| r.iterations as f64).sum::<f64>() / results.len() as f64;

            println!("Average Iterations:         {:.1}", avg_iterations);
            println!("Average Computation Time:   {:.1}ms\n", avg_time);
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!(
                    "Tick {}: {} → {} (iterations: {}, time: {}ms)",
                    result.tick,
                    result.original.describe(),
                    result.replayed.describe(),
                    result.iterations,
                    result.computation_time_ms
                );
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use crate::world::World;

    fn config() -> Config {
        let mut config = Config::default_hardcoded();
        config.search.seed = Some(5);
        config.rollout.lookahead_ticks = 20;
        config
    }

    #[test]
    fn test_replay_reproduces_logged_decision() {
        let world = World::from_ascii("R.......\nRWB.....\n........\n.....bw.", 10).unwrap();
        let mut engine = Engine::new(config());
        let intents = engine.active_intents();
        let decision = engine.decide(Side(0), &world, Budget::Iterations(5));
        let report = engine.last_report().unwrap().clone();
        let entry = DecisionLogEntry::new(
            &world,
            Side(0),
            report.decision_seed,
            report.iterations,
            report.best_mean,
            intents,
            decision.joint().unwrap().clone(),
        );

        let replay = ReplayEngine::new(config(), false);
        let result = replay.replay_entry(&entry).unwrap();
        assert!(result.matches);
        assert_eq!(result.replayed_mean, report.best_mean);
        assert_eq!(replay.generate_stats(&[result]).match_rate, 100.0);
    }

    #[test]
    fn test_generate_stats_empty() {
        let replay = ReplayEngine::new(config(), false);
        let stats = replay.generate_stats(&[]);
        assert_eq!(stats.total_decisions, 0);
        assert_eq!(stats.match_rate, 0.0);
    }
}
