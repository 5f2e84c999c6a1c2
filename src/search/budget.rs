// Per-decision search budget

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Stop starting new rollouts once this much wall-clock time has passed
    Time(Duration),
    /// Perform exactly this many rollouts
    Iterations(u64),
}

impl Budget {
    pub fn millis(ms: u64) -> Self {
        Budget::Time(Duration::from_millis(ms))
    }
}

/// Tracks consumption of a budget from the moment a decision starts
#[derive(Debug, Clone, Copy)]
pub struct BudgetTracker {
    budget: Budget,
    started: Instant,
}

impl BudgetTracker {
    pub fn start(budget: Budget) -> Self {
        BudgetTracker {
            budget,
            started: Instant::now(),
        }
    }

    /// Checked at the top of every iteration
    pub fn exhausted(&self, iterations_done: u64) -> bool {
        match self.budget {
            Budget::Time(limit) => self.started.elapsed() >= limit,
            Budget::Iterations(count) => iterations_done >= count,
        }
    }

    /// Iterations still allowed, or None under a time budget
    pub fn remaining_iterations(&self, iterations_done: u64) -> Option<u64> {
        match self.budget {
            Budget::Time(_) => None,
            Budget::Iterations(count) => Some(count.saturating_sub(iterations_done)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_budget_counts_exactly() {
        let tracker = BudgetTracker::start(Budget::Iterations(3));
        assert!(!tracker.exhausted(2));
        assert!(tracker.exhausted(3));
        assert_eq!(tracker.remaining_iterations(1), Some(2));
        assert_eq!(tracker.remaining_iterations(7), Some(0));
    }

    #[test]
    fn test_zero_time_budget_is_exhausted_immediately() {
        let tracker = BudgetTracker::start(Budget::Time(Duration::ZERO));
        assert!(tracker.exhausted(0));
        assert_eq!(tracker.remaining_iterations(0), None);
    }
}
