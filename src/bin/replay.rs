// Standalone replay tool for decision logs
//
// Usage:
//   cargo run --bin replay -- <log_file> [options]
//
// Options:
//   --all                  Replay all decisions
//   --ticks <t1,t2>        Replay decisions made at specific ticks (comma-separated)
//   --verbose              Show detailed output for each decision
//   --config <path>        Path to Search.toml (default: Search.toml)

use std::env;
use std::process;

use evo_rts_search::config::Config;
use evo_rts_search::replay::ReplayEngine;

fn print_usage() {
    eprintln!("Decision Replay Tool");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  replay <log_file> [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --all                   Replay all decisions in the log");
    eprintln!("  --ticks <T1,T2,...>     Replay decisions at specific ticks (comma-separated)");
    eprintln!("  --verbose               Show detailed output for each decision");
    eprintln!("  --config <path>         Path to Search.toml (default: Search.toml)");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  replay search_debug.jsonl --all");
    eprintln!("  replay search_debug.jsonl --ticks 0,40,120 --verbose");
}

fn parse_ticks(s: &str) -> Result<Vec<u32>, String> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<u32>()
                .map_err(|e| format!("Invalid tick '{}': {}", t, e))
        })
        .collect()
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.contains(&"--help".to_string()) {
        print_usage();
        process::exit(if args.contains(&"--help".to_string()) { 0 } else { 1 });
    }

    let log_file = &args[1];
    let mut config_path = "Search.toml".to_string();
    let mut verbose = false;
    let mut ticks: Option<Vec<u32>> = None;
    let mut replay_all = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--all" => {
                replay_all = true;
            }
            "--ticks" => {
                let Some(arg) = args.get(i + 1) else {
                    eprintln!("Error: --ticks requires an argument");
                    process::exit(1);
                };
                match parse_ticks(arg) {
                    Ok(t) => ticks = Some(t),
                    Err(e) => {
                        eprintln!("Error parsing ticks: {}", e);
                        process::exit(1);
                    }
                }
                i += 1;
            }
            "--config" => {
                let Some(arg) = args.get(i + 1) else {
                    eprintln!("Error: --config requires an argument");
                    process::exit(1);
                };
                config_path = arg.clone();
                i += 1;
            }
            "--verbose" => {
                verbose = true;
            }
            _ => {
                eprintln!("Error: Unknown option '{}'", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if !replay_all && ticks.is_none() {
        eprintln!("Error: Must specify --all or --ticks");
        print_usage();
        process::exit(1);
    }

    let config = Config::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });

    println!("Loaded configuration from: {}", config_path);
    println!("Replay log file: {}", log_file);
    println!();

    let engine = ReplayEngine::new(config, verbose);

    let entries = match engine.load_log_file(log_file) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error loading log file: {}", e);
            process::exit(1);
        }
    };

    if entries.is_empty() {
        eprintln!("Error: Log file is empty");
        process::exit(1);
    }

    println!("Loaded {} log entries\n", entries.len());

    let results = match ticks {
        Some(ticks) if !replay_all => {
            println!("Replaying decisions at {} tick(s)...\n", ticks.len());
            match engine.replay_ticks(&entries, &ticks) {
                Ok(results) => results,
                Err(e) => {
                    eprintln!("Error during replay: {}", e);
                    process::exit(1);
                }
            }
        }
        _ => {
            println!("Replaying all {} decisions...\n", entries.len());
            engine.replay_all(&entries)
        }
    };

    engine.print_report(&results);

    if results.iter().any(|r| !r.matches) {
        process::exit(2);
    }
}
