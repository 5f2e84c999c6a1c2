//! Performance profiling module for tracking where decision time is spent
//!
//! Counters are atomics so rollouts evaluated on the rayon pool can record
//! into the same profiler without locking. Everything is a no-op unless
//! profiling is enabled in the configuration.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::ProfilingConfig;

/// Instrumented phases of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Generation,
    Assembly,
    Rollout,
    Evaluation,
}

impl Section {
    fn label(self) -> &'static str {
        match self {
            Section::Generation => "Candidate Generation",
            Section::Assembly => "Joint Assembly",
            Section::Rollout => "Rollout Simulation",
            Section::Evaluation => "Evaluation",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }

    fn all() -> [Section; 4] {
        [Section::Generation, Section::Assembly, Section::Rollout, Section::Evaluation]
    }
}

#[derive(Debug, Default)]
struct Counter {
    time_ns: AtomicU64,
    calls: AtomicUsize,
}

/// Profiling aggregator shared by the engine and its rollout workers
#[derive(Debug)]
pub struct Profiler {
    config: ProfilingConfig,
    sections: [Counter; 4],
    decision_times_us: Mutex<Vec<u64>>,
}

impl Profiler {
    pub fn new(config: ProfilingConfig) -> Self {
        Profiler {
            config,
            sections: Default::default(),
            decision_times_us: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(ProfilingConfig {
            enabled: false,
            log_to_stderr: false,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Runs `f`, attributing its wall time to `section`
    pub fn track<F, R>(&self, section: Section, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.config.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        self.record(section, start.elapsed());
        result
    }

    pub fn record(&self, section: Section, elapsed: Duration) {
        if !self.config.enabled {
            return;
        }
        let counter = &self.sections[section.slot()];
        counter.time_ns.fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        counter.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the wall time of one complete decision
    pub fn record_decision(&self, elapsed: Duration) {
        if !self.config.enabled {
            return;
        }
        self.decision_times_us.lock().push(elapsed.as_micros() as u64);
    }

    pub fn calls(&self, section: Section) -> usize {
        self.sections[section.slot()].calls.load(Ordering::Relaxed)
    }

    pub fn time_ns(&self, section: Section) -> u64 {
        self.sections[section.slot()].time_ns.load(Ordering::Relaxed)
    }

    /// Decision latency percentile in microseconds (0.0..=1.0)
    pub fn decision_percentile_us(&self, quantile: f64) -> Option<u64> {
        let mut times = self.decision_times_us.lock().clone();
        if times.is_empty() {
            return None;
        }
        times.sort_unstable();
        let rank = ((times.len() - 1) as f64 * quantile.clamp(0.0, 1.0)).round() as usize;
        times.get(rank).copied()
    }

    pub fn reset(&self) {
        for counter in &self.sections {
            counter.time_ns.store(0, Ordering::Relaxed);
            counter.calls.store(0, Ordering::Relaxed);
        }
        self.decision_times_us.lock().clear();
    }

    /// Prints profiling report to stderr
    pub fn print_report(&self, total_time_ms: u64) {
        if !self.config.enabled || !self.config.log_to_stderr {
            return;
        }

        let total_time_ns = total_time_ms * 1_000_000;

        eprintln!("\n═══════════════════════════════════════════════════════════");
        eprintln!("                 PERFORMANCE PROFILE");
        eprintln!("═══════════════════════════════════════════════════════════");
        eprintln!("Total Time: {}ms\n", total_time_ms);

        for section in Section::all() {
            let time_ns = self.time_ns(section);
            let calls = self.calls(section);
            let pct = if total_time_ns > 0 {
                100.0 * time_ns as f64 / total_time_ns as f64
            } else {
                0.0
            };
            let avg_us = if calls > 0 {
                time_ns as f64 / (calls * 1000) as f64
            } else {
                0.0
            };

            eprintln!("{}:", section.label());
            eprintln!("  Time:     {:.2}ms ({:.1}%)", time_ns as f64 / 1_000_000.0, pct);
            eprintln!("  Calls:    {}", calls);
            eprintln!("  Avg:      {:.2}µs/call", avg_us);
            eprintln!();
        }

        if let (Some(p50), Some(p95), Some(max)) = (
            self.decision_percentile_us(0.5),
            self.decision_percentile_us(0.95),
            self.decision_percentile_us(1.0),
        ) {
            eprintln!("Decision Latency:");
            eprintln!("  p50:      {:.2}ms", p50 as f64 / 1000.0);
            eprintln!("  p95:      {:.2}ms", p95 as f64 / 1000.0);
            eprintln!("  max:      {:.2}ms", max as f64 / 1000.0);
        }
        eprintln!("═══════════════════════════════════════════════════════════\n");
    }
}
